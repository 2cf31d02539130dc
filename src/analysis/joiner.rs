//! Joins prescriptions to practices, and practices to deprivation.
//!
//! There is no key shared by all three sources, so the join runs in two
//! steps: prescriptions to the practice registry on the practice id, then
//! the practice's data zone to the SIMD lookup. A prescription whose
//! practice is not registered is dropped; a practice whose data zone has
//! no decile is kept with a null decile.

use crate::models::{Decile, DeprivationRecord, JoinStats, JoinedLine, PracticeRecord, PrescriptionRecord};
use std::collections::{HashMap, HashSet};
use tracing::{debug, info, warn};

/// Join prescription lines to their practice and decile, in input order.
pub fn join(
    prescriptions: &[PrescriptionRecord],
    practices: &[PracticeRecord],
    deprivation: &[DeprivationRecord],
) -> (Vec<JoinedLine>, JoinStats) {
    let practice_index: HashMap<&str, &PracticeRecord> = practices
        .iter()
        .map(|p| (p.practice_id.as_str(), p))
        .collect();

    let zone_deciles = zone_index(deprivation);

    let mut stats = JoinStats {
        lines_in: prescriptions.len(),
        ..JoinStats::default()
    };
    let mut unknown_seen: HashSet<&str> = HashSet::new();
    let mut undecided_seen: HashSet<&str> = HashSet::new();
    let mut lines = Vec::with_capacity(prescriptions.len());

    for prescription in prescriptions {
        let Some(practice) = practice_index.get(prescription.practice_id.as_str()) else {
            stats.lines_dropped += 1;
            if unknown_seen.insert(prescription.practice_id.as_str()) {
                debug!("Practice {} is not in the registry", prescription.practice_id);
                stats.unknown_practices.push(prescription.practice_id.clone());
            }
            continue;
        };

        let decile = zone_deciles.get(practice.zone_id.as_str()).copied();
        if decile.is_none() && undecided_seen.insert(practice.practice_id.as_str()) {
            debug!(
                "Practice {} is in data zone {} with no SIMD decile",
                practice.practice_id, practice.zone_id
            );
            stats.practices_without_decile.push(practice.practice_id.clone());
        }

        stats.lines_joined += 1;
        lines.push(JoinedLine {
            practice_id: practice.practice_id.clone(),
            practice_name: practice.practice_name.clone(),
            cluster_id: practice.cluster_id.clone(),
            health_board: practice.health_board.clone(),
            postcode: practice.postcode.clone(),
            zone_id: practice.zone_id.clone(),
            population: practice.population,
            drug_description: prescription.drug_description.clone(),
            item_count: prescription.item_count,
            decile,
        });
    }

    if stats.lines_dropped > 0 {
        warn!(
            "Dropped {} prescription lines from {} practices missing from the registry",
            stats.lines_dropped,
            stats.unknown_practices.len()
        );
    }
    if !stats.practices_without_decile.is_empty() {
        warn!(
            "{} practices have no SIMD decile and will be left out of the charts",
            stats.practices_without_decile.len()
        );
    }
    info!(
        "Joined {} of {} prescription lines",
        stats.lines_joined, stats.lines_in
    );

    (lines, stats)
}

/// Decile per data zone. The first row for a zone wins.
fn zone_index(deprivation: &[DeprivationRecord]) -> HashMap<&str, Decile> {
    let mut index = HashMap::with_capacity(deprivation.len());
    for record in deprivation {
        index.entry(record.zone_id.as_str()).or_insert(record.decile);
    }
    index
}
