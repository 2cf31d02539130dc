//! Report document generation.
//!
//! The document is assembled once as a list of blocks and then rendered
//! either as Markdown (charts linked as sibling SVG files) or as a single
//! self-contained HTML page (charts inlined).

use super::boxplot::{decile_boxes, BoxStats};
use super::svg::escape;
use super::table::{html_table, markdown_cell, markdown_table, ranked_rows};
use crate::analysis::rates_by_decile;
use crate::loader::INHALER_DRUGS;
use crate::models::{Decile, Report, ReportMetadata};
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

/// File names the Markdown document links its charts by.
#[derive(Debug, Clone, PartialEq)]
pub struct ChartFiles {
    pub boxplot: String,
    pub map: String,
}

impl ChartFiles {
    /// Chart names derived from the report's file stem.
    pub fn for_report(report_path: &Path) -> Self {
        let stem = report_path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| "report".to_string());
        Self {
            boxplot: format!("{}_boxplot.svg", stem),
            map: format!("{}_map.svg", stem),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Chart {
    Boxplot,
    Map,
}

#[derive(Debug, Clone, PartialEq)]
enum Block {
    Heading(u8, String),
    Paragraph(String),
    Bullets(Vec<String>),
    Table {
        headers: Vec<String>,
        rows: Vec<Vec<String>>,
    },
    Figure {
        chart: Chart,
        caption: String,
    },
    RankedTable,
}

/// Generate the Markdown report.
pub fn generate_markdown_report(report: &Report, charts: &ChartFiles) -> String {
    let mut output = String::new();

    for block in document_blocks(report) {
        match block {
            Block::Heading(level, text) => {
                output.push_str(&format!("{} {}\n\n", "#".repeat(usize::from(level)), text));
            }
            Block::Paragraph(text) => {
                output.push_str(&text);
                output.push_str("\n\n");
            }
            Block::Bullets(items) => {
                for item in items {
                    output.push_str(&format!("- {}\n", item));
                }
                output.push('\n');
            }
            Block::Table { headers, rows } => {
                output.push_str(&format!("| {} |\n", headers.join(" | ")));
                output.push_str(&format!("|{}\n", ":---|".repeat(headers.len())));
                for row in rows {
                    let cells: Vec<String> = row.iter().map(|c| markdown_cell(c)).collect();
                    output.push_str(&format!("| {} |\n", cells.join(" | ")));
                }
                output.push('\n');
            }
            Block::Figure { chart, caption } => {
                let file = match chart {
                    Chart::Boxplot => &charts.boxplot,
                    Chart::Map => &charts.map,
                };
                output.push_str(&format!("![{}]({})\n\n*{}*\n\n", caption, file, caption));
            }
            Block::RankedTable => {
                let rows = ranked_rows(&report.practice_rates, report.top_n, &report.highlight);
                output.push_str(&markdown_table(&rows));
                output.push('\n');
            }
        }
    }

    output.push_str(&generate_footer());
    output
}

/// Generate the self-contained HTML report.
pub fn generate_html_report(report: &Report) -> String {
    let mut body = String::new();

    for block in document_blocks(report) {
        match block {
            Block::Heading(level, text) => {
                body.push_str(&format!("<h{l}>{}</h{l}>\n", escape(&text), l = level));
            }
            Block::Paragraph(text) => {
                body.push_str(&format!("<p>{}</p>\n", escape(&text)));
            }
            Block::Bullets(items) => {
                body.push_str("<ul>\n");
                for item in items {
                    body.push_str(&format!("<li>{}</li>\n", escape(&item)));
                }
                body.push_str("</ul>\n");
            }
            Block::Table { headers, rows } => {
                body.push_str("<table>\n<thead><tr>");
                for header in &headers {
                    body.push_str(&format!("<th>{}</th>", escape(header)));
                }
                body.push_str("</tr></thead>\n<tbody>\n");
                for row in rows {
                    body.push_str("<tr>");
                    for cell in row {
                        body.push_str(&format!("<td>{}</td>", escape(&cell)));
                    }
                    body.push_str("</tr>\n");
                }
                body.push_str("</tbody>\n</table>\n");
            }
            Block::Figure { chart, caption } => {
                let svg = match chart {
                    Chart::Boxplot => &report.boxplot_svg,
                    Chart::Map => &report.map_svg,
                };
                body.push_str(&format!(
                    "<figure>\n{}<figcaption>{}</figcaption>\n</figure>\n",
                    svg,
                    escape(&caption)
                ));
            }
            Block::RankedTable => {
                let rows = ranked_rows(&report.practice_rates, report.top_n, &report.highlight);
                body.push_str(&html_table(&rows));
            }
        }
    }

    format!(
        "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n<title>{}</title>\n<style>\n{}</style>\n</head>\n<body>\n{}<footer>{}</footer>\n</body>\n</html>\n",
        TITLE,
        STYLE,
        body,
        FOOTER
    )
}

const TITLE: &str = "Deprivation and Inhaler Prescribing in Scottish GP Practices";

const FOOTER: &str = "Report generated by inhaler-report";

const STYLE: &str = "body { font-family: sans-serif; max-width: 52em; margin: 2em auto; line-height: 1.5; }
table { border-collapse: collapse; margin: 1em 0; }
th, td { border: 1px solid #ccc; padding: 0.3em 0.6em; }
tr.highlight { background: #ffe08a; font-weight: bold; }
figure { margin: 1.5em 0; }
figcaption { font-style: italic; }
";

fn generate_footer() -> String {
    format!("---\n\n*{}*\n", FOOTER)
}

/// Assemble the document structure shared by both output formats.
fn document_blocks(report: &Report) -> Vec<Block> {
    let groups = rates_by_decile(&report.practice_rates, &report.boxplot_exclude);
    let boxes = decile_boxes(&groups);

    let mut blocks = vec![Block::Heading(1, TITLE.to_string())];
    blocks.extend(metadata_blocks(&report.metadata));
    blocks.extend(introduction_blocks());
    blocks.extend(method_blocks());
    blocks.extend(findings_blocks(report, &boxes));
    blocks.extend(board_blocks(report));
    blocks.extend(data_quality_blocks(report));
    blocks.extend(discussion_blocks());
    blocks
}

fn metadata_blocks(metadata: &ReportMetadata) -> Vec<Block> {
    let mut items = vec![
        format!(
            "Generated: {}",
            metadata.generated_at.format("%Y-%m-%d %H:%M:%S UTC")
        ),
        format!("Monthly extracts: {}", metadata.extract_count),
        format!("Build duration: {:.1}s", metadata.duration_seconds),
    ];
    for input in &metadata.inputs {
        items.push(format!("Input: {}", input));
    }

    vec![Block::Heading(2, "Metadata".to_string()), Block::Bullets(items)]
}

fn introduction_blocks() -> Vec<Block> {
    vec![
        Block::Heading(2, "Introduction".to_string()),
        Block::Paragraph(
            "Asthma and COPD are more common, and more often poorly controlled, in deprived \
             communities. This report looks at whether GP practices serving more deprived \
             areas of Scotland prescribe more inhalers per registered patient, using the \
             Scottish Index of Multiple Deprivation (SIMD) decile of each practice's data zone."
                .to_string(),
        ),
    ]
}

fn method_blocks() -> Vec<Block> {
    vec![
        Block::Heading(2, "Data Sources".to_string()),
        Block::Bullets(vec![
            format!(
                "Prescribing: a year of monthly extracts, keeping items whose description names {}.",
                INHALER_DRUGS.join(", ")
            ),
            "Practices: the GP practice registry supplies list size, cluster, health board, \
             postcode and data zone."
                .to_string(),
            "Deprivation: each practice takes the SIMD decile of its data zone \
             (1 = most deprived, 10 = least deprived)."
                .to_string(),
        ]),
        Block::Heading(2, "Method".to_string()),
        Block::Bullets(vec![
            "Rate: inhaler items over the year divided by the practice list size.".to_string(),
            "Health boards: the unweighted mean of member practice rates. The decile shown \
             for a board is that of its first practice with a known decile, an approximation since boards cover \
             many data zones."
                .to_string(),
        ]),
    ]
}

/// Median of a decile's box, if that decile has practices.
fn median_for(boxes: &[BoxStats], decile: Decile) -> Option<f64> {
    boxes.iter().find(|b| b.decile == decile).map(|b| b.median)
}

/// Plain-language summary of the decile distribution.
fn findings_summary(boxes: &[BoxStats]) -> String {
    if boxes.is_empty() {
        return "No practice has both a rate and a SIMD decile, so no comparison can be made."
            .to_string();
    }

    let charted: usize = boxes.iter().map(|b| b.count).sum();
    let mut text = format!(
        "{} practices are charted across {} deciles.",
        charted,
        boxes.len()
    );

    if let (Some(most), Some(least)) = (
        median_for(boxes, Decile::MOST_DEPRIVED),
        median_for(boxes, Decile::LEAST_DEPRIVED),
    ) {
        text.push_str(&format!(
            " Practices in the most deprived decile had a median of {:.2} inhaler items per \
             patient, against {:.2} in the least deprived decile",
            most, least
        ));
        if least > 0.0 {
            text.push_str(&format!(" ({:.1} times as many).", most / least));
        } else {
            text.push('.');
        }
    }

    let half_mean = |range: std::ops::RangeInclusive<u8>| {
        let medians: Vec<f64> = boxes
            .iter()
            .filter(|b| range.contains(&b.decile.get()))
            .map(|b| b.median)
            .collect();
        crate::analysis::mean(&medians)
    };
    if let (Some(deprived), Some(affluent)) = (half_mean(1..=5), half_mean(6..=10)) {
        let direction = if deprived > affluent { "higher" } else { "lower" };
        text.push_str(&format!(
            " Across deciles 1 to 5 the median rate averages {:.2}, {} than the {:.2} of deciles 6 to 10.",
            deprived, direction, affluent
        ));
    }

    text
}

fn findings_blocks(report: &Report, boxes: &[BoxStats]) -> Vec<Block> {
    let mut blocks = vec![
        Block::Heading(2, "Findings".to_string()),
        Block::Paragraph(findings_summary(boxes)),
    ];

    if !boxes.is_empty() {
        blocks.push(Block::Table {
            headers: vec![
                "SIMD decile".to_string(),
                "Practices".to_string(),
                "Median".to_string(),
                "Lower quartile".to_string(),
                "Upper quartile".to_string(),
            ],
            rows: boxes
                .iter()
                .map(|b| {
                    vec![
                        b.decile.to_string(),
                        b.count.to_string(),
                        format!("{:.2}", b.median),
                        format!("{:.2}", b.q1),
                        format!("{:.2}", b.q3),
                    ]
                })
                .collect(),
        });
    }

    let mut caption = "Inhaler items per registered patient by SIMD decile".to_string();
    if !report.boxplot_exclude.is_empty() {
        caption.push_str(&format!(
            " (excluding {})",
            report.boxplot_exclude.join(", ")
        ));
    }
    blocks.push(Block::Heading(3, "Distribution by decile".to_string()));
    blocks.push(Block::Figure {
        chart: Chart::Boxplot,
        caption,
    });

    blocks.push(Block::Heading(3, "Geography".to_string()));
    blocks.push(Block::Figure {
        chart: Chart::Map,
        caption: "Health boards shaded by mean practice rate; practices coloured by SIMD decile"
            .to_string(),
    });

    blocks.push(Block::Heading(3, format!("Top {} practices", report.top_n)));
    blocks.push(Block::RankedTable);
    if !report.highlight.is_empty() {
        blocks.push(Block::Paragraph(format!(
            "Highlighted practices ({}) serve atypical populations, so their list size is a \
             poor denominator and their rate is not representative.",
            report.highlight.join(", ")
        )));
    }

    blocks
}

fn board_blocks(report: &Report) -> Vec<Block> {
    if report.board_rates.is_empty() {
        return Vec::new();
    }

    let rows = report
        .board_rates
        .iter()
        .map(|b| {
            vec![
                b.health_board.clone(),
                b.practice_count.to_string(),
                b.mean_rate
                    .map(|r| format!("{:.2}", r))
                    .unwrap_or_else(|| "n/a".to_string()),
                b.representative_decile
                    .map(|d| d.to_string())
                    .unwrap_or_else(|| "n/a".to_string()),
                match b.decile_range {
                    Some((low, high)) if low != high => format!("{}-{}", low, high),
                    Some((low, _)) => low.to_string(),
                    None => "n/a".to_string(),
                },
            ]
        })
        .collect();

    vec![
        Block::Heading(3, "Health boards".to_string()),
        Block::Table {
            headers: vec![
                "Health board".to_string(),
                "Practices".to_string(),
                "Mean rate".to_string(),
                "Representative decile".to_string(),
                "Decile range".to_string(),
            ],
            rows,
        },
    ]
}

fn data_quality_blocks(report: &Report) -> Vec<Block> {
    let mut items: Vec<String> = report
        .load_stats
        .iter()
        .map(|s| {
            let mut line = format!(
                "{}: {} of {} rows kept from {} file(s)",
                s.source, s.rows_kept, s.rows_read, s.files
            );
            if s.rows_skipped() == 0 {
                return line;
            }
            if s.rows_malformed > 0 {
                line.push_str(&format!(", {} malformed", s.rows_malformed));
            }
            if s.rows_filtered > 0 {
                line.push_str(&format!(", {} other drugs", s.rows_filtered));
            }
            if s.rows_duplicate > 0 {
                line.push_str(&format!(", {} duplicates", s.rows_duplicate));
            }
            line
        })
        .collect();

    let join = &report.join_stats;
    items.push(format!(
        "{} prescription lines from {} practices not in the registry were dropped",
        join.lines_dropped,
        join.unknown_practices.len()
    ));
    items.push(format!(
        "{} practices have no SIMD decile and are left out of the charts and table",
        join.practices_without_decile.len()
    ));

    let no_rate = report
        .practice_rates
        .iter()
        .filter(|p| p.decile.is_some() && p.rate.is_none())
        .count();
    if no_rate > 0 {
        items.push(format!(
            "{} practices have an empty list size and no rate",
            no_rate
        ));
    }

    let mixed = report
        .board_rates
        .iter()
        .filter(|b| !b.has_uniform_decile())
        .count();
    if mixed > 0 {
        items.push(format!(
            "{} health boards span more than one decile; their representative decile is approximate",
            mixed
        ));
    }

    vec![
        Block::Heading(2, "Data Quality".to_string()),
        Block::Bullets(items),
    ]
}

fn discussion_blocks() -> Vec<Block> {
    vec![
        Block::Heading(2, "Discussion".to_string()),
        Block::Paragraph(
            "Inhaler prescribing is a proxy for respiratory disease burden, not a measure of \
             it, and these figures are descriptive only. Where higher rates cluster in more \
             deprived practices, resources such as Personalised Asthma Action Plans (PAAPs) \
             and respiratory review clinics could be weighted towards those practices and \
             clusters."
                .to_string(),
        ),
    ]
}

/// Write the Markdown report and its two chart files. Returns every path
/// written.
pub fn write_markdown_report(report: &Report, path: &Path) -> Result<Vec<PathBuf>> {
    let charts = ChartFiles::for_report(path);
    let dir = path.parent().unwrap_or_else(|| Path::new(""));

    let boxplot_path = dir.join(&charts.boxplot);
    let map_path = dir.join(&charts.map);

    std::fs::write(&boxplot_path, &report.boxplot_svg)
        .with_context(|| format!("Failed to write chart to {}", boxplot_path.display()))?;
    std::fs::write(&map_path, &report.map_svg)
        .with_context(|| format!("Failed to write chart to {}", map_path.display()))?;

    let content = generate_markdown_report(report, &charts);
    std::fs::write(path, content)
        .with_context(|| format!("Failed to write report to {}", path.display()))?;

    Ok(vec![path.to_path_buf(), boxplot_path, map_path])
}

/// Write the self-contained HTML report.
pub fn write_html_report(report: &Report, path: &Path) -> Result<Vec<PathBuf>> {
    let content = generate_html_report(report);
    std::fs::write(path, content)
        .with_context(|| format!("Failed to write report to {}", path.display()))?;

    Ok(vec![path.to_path_buf()])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{HealthBoardRate, JoinStats, LoadStats, PracticeRate};
    use chrono::Utc;

    fn practice(name: &str, rate: f64, decile: u8) -> PracticeRate {
        PracticeRate {
            practice_id: name.to_string(),
            practice_name: name.to_string(),
            cluster_id: "Leith".to_string(),
            health_board: "S08000024".to_string(),
            postcode: "EH6 6AA".to_string(),
            population: 1000,
            total_items: (rate * 1000.0) as u64,
            rate: Some(rate),
            decile: Decile::new(decile),
        }
    }

    fn create_test_report() -> Report {
        Report {
            metadata: ReportMetadata {
                generated_at: Utc::now(),
                inputs: vec!["data/simd.csv".to_string()],
                extract_count: 12,
                duration_seconds: 1.5,
            },
            load_stats: vec![LoadStats {
                source: "prescriptions".to_string(),
                files: 12,
                rows_read: 100,
                rows_kept: 60,
                rows_malformed: 2,
                rows_filtered: 38,
                rows_duplicate: 0,
            }],
            join_stats: JoinStats {
                lines_in: 60,
                lines_joined: 58,
                lines_dropped: 2,
                unknown_practices: vec!["99996".to_string()],
                practices_without_decile: Vec::new(),
            },
            practice_rates: vec![
                practice("DEPRIVED ONE", 0.40, 1),
                practice("DEPRIVED TWO", 0.30, 1),
                practice("AFFLUENT", 0.10, 10),
                practice("EDINBURGH ACCESS PRACTICE", 2.50, 1),
            ],
            board_rates: vec![HealthBoardRate {
                health_board: "S08000024".to_string(),
                mean_rate: Some(0.825),
                representative_decile: Decile::new(1),
                decile_range: Some((Decile::MOST_DEPRIVED, Decile::LEAST_DEPRIVED)),
                practice_count: 4,
                rated_practice_count: 4,
            }],
            boxplot_svg: "<svg id=\"boxplot\"></svg>".to_string(),
            map_svg: "<svg id=\"map\"></svg>".to_string(),
            boxplot_exclude: vec!["EDINBURGH ACCESS PRACTICE".to_string()],
            highlight: vec!["EDINBURGH ACCESS PRACTICE".to_string()],
            top_n: 12,
        }
    }

    #[test]
    fn test_generate_markdown_report() {
        let report = create_test_report();
        let charts = ChartFiles::for_report(Path::new("out/report.md"));
        let markdown = generate_markdown_report(&report, &charts);

        assert!(markdown.contains(&format!("# {}", TITLE)));
        assert!(markdown.contains("## Metadata"));
        assert!(markdown.contains("## Data Sources"));
        assert!(markdown.contains("## Method"));
        assert!(markdown.contains("## Findings"));
        assert!(markdown.contains("](report_boxplot.svg)"));
        assert!(markdown.contains("](report_map.svg)"));
        assert!(markdown.contains("**EDINBURGH ACCESS PRACTICE** ⚑"));
        assert!(markdown.contains("## Data Quality"));
        assert!(markdown.contains("2 prescription lines from 1 practices"));
    }

    #[test]
    fn test_outlier_out_of_boxplot_but_in_table() {
        let report = create_test_report();
        let blocks = document_blocks(&report);

        let decile_table = blocks.iter().find_map(|b| match b {
            Block::Table { headers, rows } if headers[0] == "SIMD decile" => Some(rows.clone()),
            _ => None,
        });
        let rows = decile_table.unwrap();
        // Decile 1 box holds the two ordinary practices only
        assert_eq!(rows[0][0], "1");
        assert_eq!(rows[0][1], "2");

        let ranked = ranked_rows(&report.practice_rates, report.top_n, &report.highlight);
        assert_eq!(ranked[0].practice_name, "EDINBURGH ACCESS PRACTICE");
    }

    #[test]
    fn test_findings_compare_extreme_deciles() {
        let report = create_test_report();
        let groups = rates_by_decile(&report.practice_rates, &report.boxplot_exclude);
        let text = findings_summary(&decile_boxes(&groups));

        assert!(text.contains("median of 0.35"));
        assert!(text.contains("0.10 in the least deprived"));
        assert!(text.contains("3.5 times as many"));
        assert!(text.contains("higher"));
    }

    #[test]
    fn test_markdown_table_cells_escaped() {
        let mut report = create_test_report();
        report.board_rates[0].health_board = "S08|024".to_string();
        let charts = ChartFiles::for_report(Path::new("report.md"));
        let markdown = generate_markdown_report(&report, &charts);

        assert!(markdown.contains("| S08\\|024 | 4 |"));
        assert!(!markdown.contains("| S08|024 |"));
    }

    #[test]
    fn test_findings_without_data() {
        assert!(findings_summary(&[]).contains("no comparison"));
    }

    #[test]
    fn test_generate_html_inlines_charts() {
        let report = create_test_report();
        let html = generate_html_report(&report);

        assert!(html.starts_with("<!DOCTYPE html>"));
        assert!(html.contains("<svg id=\"boxplot\"></svg>"));
        assert!(html.contains("<svg id=\"map\"></svg>"));
        assert!(html.contains("<tr class=\"highlight\">"));
    }

    #[test]
    fn test_write_markdown_report_writes_charts() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("simd.md");
        let written = write_markdown_report(&create_test_report(), &path).unwrap();

        assert_eq!(written.len(), 3);
        assert!(dir.path().join("simd_boxplot.svg").exists());
        assert!(dir.path().join("simd_map.svg").exists());
        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains("simd_map.svg"));
    }
}
