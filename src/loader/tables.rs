//! CSV table reading against a [`SourceRecord`] schema.

use super::schema::{normalize_headers, SourceRecord};
use crate::error::{LoadError, LoadResult};
use crate::models::{DeprivationRecord, LoadStats, PracticeRecord};
use std::collections::HashSet;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::{debug, info, warn};

/// Rows of one source plus the accounting of how they were read.
#[derive(Debug, Clone)]
pub struct Table<T> {
    pub rows: Vec<T>,
    pub stats: LoadStats,
}

/// Read a CSV file into typed rows.
///
/// A missing file, an unreadable header or a missing required column is
/// fatal. Rows that fail coercion or validation are skipped and counted.
pub fn read_table<T: SourceRecord>(path: &Path) -> LoadResult<Table<T>> {
    if !path.is_file() {
        return Err(LoadError::MissingFile {
            path: path.to_path_buf(),
        });
    }

    let file = File::open(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    read_table_from(file, path)
}

/// Read typed rows from any reader. `origin` is only used in messages.
pub fn read_table_from<T: SourceRecord, R: Read>(reader: R, origin: &Path) -> LoadResult<Table<T>> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(reader);

    let raw_headers = csv_reader
        .headers()
        .map_err(|source| LoadError::Csv {
            path: origin.to_path_buf(),
            source,
        })?
        .clone();
    let headers = normalize_headers(&raw_headers);

    for column in T::REQUIRED_COLUMNS {
        if !headers.iter().any(|h| h == *column) {
            return Err(LoadError::MissingColumn {
                path: origin.to_path_buf(),
                column: column.to_string(),
            });
        }
    }

    let mut stats = LoadStats::new(T::SOURCE);
    stats.files = 1;
    let mut rows = Vec::new();

    for (index, result) in csv_reader.records().enumerate() {
        let line = index + 2;
        stats.rows_read += 1;

        let record = match result {
            Ok(record) => record,
            Err(e) if matches!(e.kind(), csv::ErrorKind::Io(_)) => {
                return Err(LoadError::Csv {
                    path: origin.to_path_buf(),
                    source: e,
                });
            }
            Err(e) => {
                debug!("{}:{}: unreadable row: {}", origin.display(), line, e);
                stats.rows_malformed += 1;
                continue;
            }
        };

        let row: T = match record.deserialize(Some(&headers)) {
            Ok(row) => row,
            Err(e) => {
                debug!("{}:{}: {}", origin.display(), line, e);
                stats.rows_malformed += 1;
                continue;
            }
        };

        if let Err(reason) = row.validate() {
            debug!("{}:{}: {}", origin.display(), line, reason);
            stats.rows_malformed += 1;
            continue;
        }

        if !row.keep() {
            stats.rows_filtered += 1;
            continue;
        }

        stats.rows_kept += 1;
        rows.push(row);
    }

    if stats.rows_malformed > 0 {
        warn!(
            "{}: skipped {} malformed rows",
            origin.display(),
            stats.rows_malformed
        );
    }

    Ok(Table { rows, stats })
}

/// Load the SIMD lookup.
pub fn load_deprivation(path: &Path) -> LoadResult<Table<DeprivationRecord>> {
    let table = read_table::<DeprivationRecord>(path)?;
    info!("Loaded {} data zones from {}", table.rows.len(), path.display());
    Ok(table)
}

/// Load the practice registry, keeping the first row for each practice id.
pub fn load_practices(path: &Path) -> LoadResult<Table<PracticeRecord>> {
    let mut table = read_table::<PracticeRecord>(path)?;
    dedupe_practices(&mut table);
    info!("Loaded {} practices from {}", table.rows.len(), path.display());
    Ok(table)
}

fn dedupe_practices(table: &mut Table<PracticeRecord>) {
    let mut seen: HashSet<String> = HashSet::new();
    let before = table.rows.len();

    table.rows.retain(|practice| {
        let fresh = seen.insert(practice.practice_id.clone());
        if !fresh {
            debug!("Duplicate practice id {}", practice.practice_id);
        }
        fresh
    });

    let duplicates = before - table.rows.len();
    if duplicates > 0 {
        warn!("Ignored {} duplicate practice rows", duplicates);
        table.stats.rows_duplicate += duplicates;
        table.stats.rows_kept -= duplicates;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Decile, PrescriptionRecord};
    use std::io::Write;

    fn origin() -> &'static Path {
        Path::new("test.csv")
    }

    #[test]
    fn test_reads_deprivation_with_source_headers() {
        let csv = "DataZone,SIMD2020v2_Decile\nS01006506,1\nS01006507,10\n";
        let table = read_table_from::<DeprivationRecord, _>(csv.as_bytes(), origin()).unwrap();

        assert_eq!(table.rows.len(), 2);
        assert_eq!(table.rows[0].zone_id, "S01006506");
        assert_eq!(table.rows[0].decile, Decile::MOST_DEPRIVED);
        assert_eq!(table.stats.rows_kept, 2);
    }

    #[test]
    fn test_out_of_range_decile_is_skipped() {
        let csv = "DataZone,Decile\nS01,0\nS02,11\nS03,x\nS04,5\n";
        let table = read_table_from::<DeprivationRecord, _>(csv.as_bytes(), origin()).unwrap();

        assert_eq!(table.rows.len(), 1);
        assert_eq!(table.stats.rows_read, 4);
        assert_eq!(table.stats.rows_malformed, 3);
    }

    #[test]
    fn test_missing_column_is_fatal() {
        let csv = "PracticeCode,DataZone\n10002,S01\n";
        let result = read_table_from::<PracticeRecord, _>(csv.as_bytes(), origin());

        match result {
            Err(LoadError::MissingColumn { column, .. }) => assert_eq!(column, "health_board"),
            other => panic!("expected missing column, got {:?}", other.map(|t| t.rows.len())),
        }
    }

    #[test]
    fn test_malformed_population_skips_row() {
        let csv = "PracticeCode,GPPracticeName,PracticeListSize,Postcode,HB,DataZone,GPCluster\n\
                   10002,MUIRHEAD,5000,DD2 5NH,S08000030,S01007001,Strathmore\n\
                   10017,BLAIRGOWRIE,lots,PH10 6EE,S08000030,S01007002,Strathmore\n\
                   10036,ALYTH,-4,PH11 8EQ,S08000030,S01007003,Strathmore\n";
        let table = read_table_from::<PracticeRecord, _>(csv.as_bytes(), origin()).unwrap();

        assert_eq!(table.rows.len(), 1);
        assert_eq!(table.rows[0].practice_id, "10002");
        assert_eq!(table.rows[0].health_board, "S08000030");
        assert_eq!(table.stats.rows_malformed, 2);
    }

    #[test]
    fn test_extract_rows_filtered_by_drug() {
        let csv = "HBT,GPPractice,BNFItemCode,BNFItemDescription,NumberOfPaidItems\n\
                   S08000015,10002,0301011R0,SALBUTAMOL 100MICROGRAMS/DOSE INHALER,12\n\
                   S08000015,10002,0407010H0,PARACETAMOL 500MG TABLETS,40\n\
                   S08000015,10002,0302000C0,BECLOMETASONE 100MICROGRAMS/DOSE INHALER,n/a\n";
        let table = read_table_from::<PrescriptionRecord, _>(csv.as_bytes(), origin()).unwrap();

        assert_eq!(table.rows.len(), 1);
        assert_eq!(table.rows[0].item_count, 12);
        assert_eq!(table.stats.rows_filtered, 1);
        assert_eq!(table.stats.rows_malformed, 1);
    }

    #[test]
    fn test_missing_file_is_fatal() {
        let result = read_table::<DeprivationRecord>(Path::new("/nonexistent/simd.csv"));
        assert!(matches!(result, Err(LoadError::MissingFile { .. })));
    }

    #[test]
    fn test_duplicate_practice_keeps_first() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("practices.csv");
        let mut file = File::create(&path).unwrap();
        writeln!(
            file,
            "PracticeCode,GPPracticeName,PracticeListSize,Postcode,HB,DataZone,GPCluster"
        )
        .unwrap();
        writeln!(file, "10002,FIRST,5000,DD2 5NH,S08000030,S01,C1").unwrap();
        writeln!(file, "10002,SECOND,6000,DD2 5NH,S08000030,S01,C1").unwrap();
        drop(file);

        let table = load_practices(&path).unwrap();
        assert_eq!(table.rows.len(), 1);
        assert_eq!(table.rows[0].practice_name, "FIRST");
        assert_eq!(table.stats.rows_duplicate, 1);
        assert_eq!(table.stats.rows_kept, 1);
    }
}
