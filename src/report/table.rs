//! Ranked practice table.

use super::svg::escape;
use crate::analysis::top_practices;
use crate::models::PracticeRate;

/// One row of the ranked table.
#[derive(Debug, Clone, PartialEq)]
pub struct RankedRow {
    pub rank: usize,
    pub practice_name: String,
    pub cluster_id: String,
    pub rate: f64,
    pub decile: u8,
    /// Named in the highlight list as a known non-representative practice.
    pub highlighted: bool,
}

/// Top `n` practices by rate, highest first.
pub fn ranked_rows(rates: &[PracticeRate], n: usize, highlight: &[String]) -> Vec<RankedRow> {
    top_practices(rates, n)
        .into_iter()
        .enumerate()
        .filter_map(|(i, practice)| {
            Some(RankedRow {
                rank: i + 1,
                practice_name: practice.practice_name.clone(),
                cluster_id: practice.cluster_id.clone(),
                rate: practice.rate?,
                decile: practice.decile?.get(),
                highlighted: highlight.iter().any(|h| h == &practice.practice_name),
            })
        })
        .collect()
}

/// Escape a value for a Markdown table cell.
pub fn markdown_cell(text: &str) -> String {
    text.replace('|', "\\|")
}

/// Markdown table; highlighted rows are bold and flagged.
pub fn markdown_table(rows: &[RankedRow]) -> String {
    let mut table = String::new();

    table.push_str("| # | Practice | Cluster | Items per patient | SIMD decile |\n");
    table.push_str("|:---:|:---|:---|:---:|:---:|\n");

    for row in rows {
        let name = markdown_cell(&row.practice_name);
        let name = if row.highlighted {
            format!("**{}** ⚑", name)
        } else {
            name
        };
        table.push_str(&format!(
            "| {} | {} | {} | {:.2} | {} |\n",
            row.rank,
            name,
            markdown_cell(&row.cluster_id),
            row.rate,
            row.decile
        ));
    }

    table
}

/// HTML table; highlighted rows carry the `highlight` class.
pub fn html_table(rows: &[RankedRow]) -> String {
    let mut table = String::new();

    table.push_str("<table class=\"ranked\">\n<thead><tr><th>#</th><th>Practice</th><th>Cluster</th><th>Items per patient</th><th>SIMD decile</th></tr></thead>\n<tbody>\n");

    for row in rows {
        let class = if row.highlighted { " class=\"highlight\"" } else { "" };
        table.push_str(&format!(
            "<tr{}><td>{}</td><td>{}</td><td>{}</td><td>{:.2}</td><td>{}</td></tr>\n",
            class,
            row.rank,
            escape(&row.practice_name),
            escape(&row.cluster_id),
            row.rate,
            row.decile
        ));
    }

    table.push_str("</tbody>\n</table>\n");
    table
}
