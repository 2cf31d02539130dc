//! Rate aggregation and ranking.
//!
//! This module turns joined prescription lines into one rate per practice
//! and one mean rate per health board, and provides the grouping and
//! ranking utilities the report views are built from.

use crate::error::AggregateError;
use crate::models::{Decile, HealthBoardRate, JoinedLine, PracticeRate};
use std::collections::HashMap;
use tracing::{debug, info, warn};

/// Items per registered patient. `None` when the decile is unresolved or
/// the practice has no registered patients.
pub fn compute_rate(total_items: u64, population: u32, decile: Option<Decile>) -> Option<f64> {
    if population == 0 || decile.is_none() {
        return None;
    }
    Some(total_items as f64 / f64::from(population))
}

/// Fail when an attribute that must be constant per practice changes.
fn ensure_constant<T: PartialEq + std::fmt::Debug>(
    practice_id: &str,
    field: &'static str,
    first: &T,
    other: &T,
) -> Result<(), AggregateError> {
    if first == other {
        Ok(())
    } else {
        Err(AggregateError::InconsistentAttribute {
            practice_id: practice_id.to_string(),
            field,
            first: format!("{:?}", first),
            other: format!("{:?}", other),
        })
    }
}

/// Sum items per practice and compute each practice's rate.
///
/// Practices come out in the order they were first seen. The practice
/// attributes on every line of a practice must agree; they are copied
/// from the registry by the join, so a mismatch means the join is broken.
pub fn practice_rates(lines: &[JoinedLine]) -> Result<Vec<PracticeRate>, AggregateError> {
    let mut order: HashMap<&str, usize> = HashMap::new();
    let mut rates: Vec<PracticeRate> = Vec::new();

    for line in lines {
        match order.get(line.practice_id.as_str()) {
            Some(&idx) => {
                let rate = &mut rates[idx];
                let id = line.practice_id.as_str();
                ensure_constant(id, "practice_name", &rate.practice_name, &line.practice_name)?;
                ensure_constant(id, "cluster_id", &rate.cluster_id, &line.cluster_id)?;
                ensure_constant(id, "health_board", &rate.health_board, &line.health_board)?;
                ensure_constant(id, "postcode", &rate.postcode, &line.postcode)?;
                ensure_constant(id, "population", &rate.population, &line.population)?;
                ensure_constant(id, "decile", &rate.decile, &line.decile)?;
                rate.total_items += line.item_count;
            }
            None => {
                order.insert(line.practice_id.as_str(), rates.len());
                rates.push(PracticeRate {
                    practice_id: line.practice_id.clone(),
                    practice_name: line.practice_name.clone(),
                    cluster_id: line.cluster_id.clone(),
                    health_board: line.health_board.clone(),
                    postcode: line.postcode.clone(),
                    population: line.population,
                    total_items: line.item_count,
                    rate: None,
                    decile: line.decile,
                });
            }
        }
    }

    for rate in &mut rates {
        rate.rate = compute_rate(rate.total_items, rate.population, rate.decile);
        if rate.population == 0 {
            debug!("Practice {} has an empty list; rate left null", rate.practice_id);
        }
    }

    info!(
        "Computed rates for {} practices ({} without a rate)",
        rates.len(),
        rates.iter().filter(|r| r.rate.is_none()).count()
    );

    Ok(rates)
}

/// Mean practice rate per health board, in first-seen order.
///
/// The representative decile is the first non-null decile among the
/// board's practices. Boards span many data zones, so this is an
/// approximation; boards whose practices disagree are logged.
pub fn board_rates(rates: &[PracticeRate]) -> Vec<HealthBoardRate> {
    let grouped = group_by_board(rates);
    let mut boards = Vec::with_capacity(grouped.len());

    for (health_board, members) in grouped {
        let rated: Vec<f64> = members.iter().filter_map(|p| p.rate).collect();
        let mean_rate = mean(&rated);

        let deciles: Vec<Decile> = members.iter().filter_map(|p| p.decile).collect();
        let representative_decile = deciles.first().copied();
        let decile_range = match (deciles.iter().min(), deciles.iter().max()) {
            (Some(&low), Some(&high)) => Some((low, high)),
            _ => None,
        };

        boards.push(HealthBoardRate {
            health_board,
            mean_rate,
            representative_decile,
            decile_range,
            practice_count: members.len(),
            rated_practice_count: rated.len(),
        });
    }

    let mixed: Vec<&str> = boards
        .iter()
        .filter(|b| !b.has_uniform_decile())
        .map(|b| b.health_board.as_str())
        .collect();
    if !mixed.is_empty() {
        warn!(
            "{} health boards span several deciles; their representative decile is the first observed: {}",
            mixed.len(),
            mixed.join(", ")
        );
    }

    boards
}

/// Arithmetic mean, `None` for an empty slice.
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

/// Group practices by health board, preserving first-seen order.
pub fn group_by_board(rates: &[PracticeRate]) -> Vec<(String, Vec<&PracticeRate>)> {
    let mut order: HashMap<&str, usize> = HashMap::new();
    let mut grouped: Vec<(String, Vec<&PracticeRate>)> = Vec::new();

    for rate in rates {
        let idx = *order.entry(rate.health_board.as_str()).or_insert_with(|| {
            grouped.push((rate.health_board.clone(), Vec::new()));
            grouped.len() - 1
        });
        grouped[idx].1.push(rate);
    }

    grouped
}

/// Presentable practice rates grouped by decile, index 0 being decile 1.
///
/// Practices named in `exclude` are left out.
pub fn rates_by_decile(rates: &[PracticeRate], exclude: &[String]) -> [Vec<f64>; 10] {
    let mut grouped: [Vec<f64>; 10] = Default::default();

    for practice in rates {
        if exclude.iter().any(|name| name == &practice.practice_name) {
            continue;
        }
        if let (Some(rate), Some(decile)) = (practice.rate, practice.decile) {
            grouped[decile.index()].push(rate);
        }
    }

    grouped
}

/// Sort practices by rate, highest first. Ties keep their input order.
pub fn sort_by_rate(rates: &mut [&PracticeRate]) {
    rates.sort_by(|a, b| {
        b.rate
            .partial_cmp(&a.rate)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
}

/// The `n` presentable practices with the highest rates.
pub fn top_practices(rates: &[PracticeRate], n: usize) -> Vec<&PracticeRate> {
    let mut ranked: Vec<&PracticeRate> = rates.iter().filter(|r| r.is_presentable()).collect();
    sort_by_rate(&mut ranked);
    ranked.truncate(n);
    ranked
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(practice: &str, board: &str, population: u32, items: u64, decile: Option<u8>) -> JoinedLine {
        JoinedLine {
            practice_id: practice.to_string(),
            practice_name: format!("PRACTICE {}", practice),
            cluster_id: "Cluster".to_string(),
            health_board: board.to_string(),
            postcode: "EH1 1AA".to_string(),
            zone_id: "S01000001".to_string(),
            population,
            drug_description: "SALBUTAMOL".to_string(),
            item_count: items,
            decile: decile.and_then(Decile::new),
        }
    }

    fn rate(name: &str, board: &str, value: Option<f64>, decile: Option<u8>) -> PracticeRate {
        PracticeRate {
            practice_id: name.to_string(),
            practice_name: name.to_string(),
            cluster_id: "Cluster".to_string(),
            health_board: board.to_string(),
            postcode: "EH1 1AA".to_string(),
            population: 1000,
            total_items: 0,
            rate: value,
            decile: decile.and_then(Decile::new),
        }
    }

    #[test]
    fn test_rate_is_items_over_population() {
        let lines = vec![
            line("X", "B1", 1000, 100, Some(3)),
            line("X", "B1", 1000, 150, Some(3)),
        ];
        let rates = practice_rates(&lines).unwrap();

        assert_eq!(rates.len(), 1);
        assert_eq!(rates[0].total_items, 250);
        assert_eq!(rates[0].rate, Some(0.25));
    }

    #[test]
    fn test_zero_population_gives_null_rate() {
        let rates = practice_rates(&[line("Y", "B1", 0, 40, Some(3))]).unwrap();
        assert_eq!(rates[0].rate, None);
        assert_eq!(rates[0].total_items, 40);
    }

    #[test]
    fn test_null_decile_gives_null_rate() {
        let rates = practice_rates(&[line("Z", "B1", 500, 40, None)]).unwrap();
        assert_eq!(rates[0].rate, None);
        assert!(!rates[0].is_presentable());
    }

    #[test]
    fn test_inconsistent_attribute_fails_loudly() {
        let mut second = line("X", "B1", 1000, 1, Some(3));
        second.population = 2000;
        let result = practice_rates(&[line("X", "B1", 1000, 1, Some(3)), second]);

        match result {
            Err(AggregateError::InconsistentAttribute { field, .. }) => assert_eq!(field, "population"),
            other => panic!("expected inconsistency, got {:?}", other),
        }
    }

    #[test]
    fn test_sum_is_order_independent() {
        let mut lines = vec![
            line("A", "B1", 100, 5, Some(1)),
            line("B", "B1", 100, 7, Some(2)),
            line("A", "B1", 100, 11, Some(1)),
            line("B", "B1", 100, 13, Some(2)),
        ];
        let forward = practice_rates(&lines).unwrap();
        lines.reverse();
        let backward = practice_rates(&lines).unwrap();

        let total = |rates: &[PracticeRate], id: &str| {
            rates.iter().find(|r| r.practice_id == id).map(|r| r.total_items)
        };
        assert_eq!(total(&forward, "A"), Some(16));
        assert_eq!(total(&forward, "A"), total(&backward, "A"));
        assert_eq!(total(&forward, "B"), total(&backward, "B"));
    }

    #[test]
    fn test_board_mean_ignores_nulls() {
        let rates = vec![
            rate("P1", "B1", Some(0.2), Some(2)),
            rate("P2", "B1", Some(0.4), Some(5)),
            rate("P3", "B1", None, None),
            rate("P4", "B2", None, Some(8)),
        ];
        let boards = board_rates(&rates);

        assert_eq!(boards.len(), 2);
        assert_eq!(boards[0].health_board, "B1");
        assert!((boards[0].mean_rate.unwrap() - 0.3).abs() < 1e-12);
        assert_eq!(boards[0].practice_count, 3);
        assert_eq!(boards[0].rated_practice_count, 2);
        assert_eq!(boards[0].representative_decile, Decile::new(2));
        assert!(!boards[0].has_uniform_decile());

        assert_eq!(boards[1].mean_rate, None);
        assert_eq!(boards[1].representative_decile, Decile::new(8));
    }

    #[test]
    fn test_rates_by_decile_excludes_named_and_null() {
        let rates = vec![
            rate("A", "B1", Some(0.1), Some(1)),
            rate("OUTLIER", "B1", Some(9.0), Some(1)),
            rate("C", "B1", Some(0.3), None),
            rate("D", "B1", Some(0.2), Some(10)),
        ];
        let grouped = rates_by_decile(&rates, &["OUTLIER".to_string()]);

        assert_eq!(grouped[0], vec![0.1]);
        assert_eq!(grouped[9], vec![0.2]);
        assert_eq!(grouped.iter().map(Vec::len).sum::<usize>(), 2);
    }

    #[test]
    fn test_top_practices_sorted_with_stable_ties() {
        let rates = vec![
            rate("first", "B1", Some(0.5), Some(1)),
            rate("null", "B1", None, Some(1)),
            rate("top", "B1", Some(0.9), Some(2)),
            rate("second", "B1", Some(0.5), Some(3)),
            rate("low", "B1", Some(0.1), Some(4)),
        ];
        let top = top_practices(&rates, 3);
        let names: Vec<&str> = top.iter().map(|r| r.practice_name.as_str()).collect();

        assert_eq!(names, vec!["top", "first", "second"]);
    }

    #[test]
    fn test_mean_empty() {
        assert_eq!(mean(&[]), None);
        assert_eq!(mean(&[1.0, 2.0, 3.0]), Some(2.0));
    }
}
