//! Report presentation: charts, the ranked table and the document.

pub mod boxplot;
pub mod generator;
pub mod map;
pub mod palette;
pub mod svg;
pub mod table;

pub use generator::{write_html_report, write_markdown_report};

use crate::analysis::rates_by_decile;
use crate::models::{Report, ReportMetadata};
use crate::pipeline::PipelineOutput;

/// Presentation settings taken from configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportOptions {
    pub top_n: usize,
    pub boxplot_exclude: Vec<String>,
    pub highlight: Vec<String>,
}

/// Render both charts and assemble the report envelope.
pub fn build_report(output: PipelineOutput, options: &ReportOptions, metadata: ReportMetadata) -> Report {
    let groups = rates_by_decile(&output.practice_rates, &options.boxplot_exclude);
    let boxplot_svg = boxplot::render_boxplot(&boxplot::decile_boxes(&groups));
    let map_svg = map::render_map(
        &output.board_rates,
        &output.practice_rates,
        &output.boundaries,
    );

    Report {
        metadata,
        load_stats: output.load_stats,
        join_stats: output.join_stats,
        practice_rates: output.practice_rates,
        board_rates: output.board_rates,
        boxplot_svg,
        map_svg,
        boxplot_exclude: options.boxplot_exclude.clone(),
        highlight: options.highlight.clone(),
        top_n: options.top_n,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::BoundaryGeometry;
    use crate::models::{Decile, JoinStats, PracticeRate};
    use chrono::Utc;

    #[test]
    fn test_build_report_renders_charts() {
        let output = PipelineOutput {
            load_stats: Vec::new(),
            join_stats: JoinStats::default(),
            practice_rates: vec![PracticeRate {
                practice_id: "10001".to_string(),
                practice_name: "LEITH".to_string(),
                cluster_id: "Leith".to_string(),
                health_board: "S08000024".to_string(),
                postcode: "EH6 6AA".to_string(),
                population: 100,
                total_items: 20,
                rate: Some(0.2),
                decile: Decile::new(2),
            }],
            board_rates: Vec::new(),
            boundaries: BoundaryGeometry::default(),
            extract_files: Vec::new(),
        };
        let options = ReportOptions {
            top_n: 5,
            boxplot_exclude: Vec::new(),
            highlight: Vec::new(),
        };
        let metadata = ReportMetadata {
            generated_at: Utc::now(),
            inputs: Vec::new(),
            extract_count: 0,
            duration_seconds: 0.0,
        };

        let report = build_report(output, &options, metadata);
        assert!(report.boxplot_svg.starts_with("<svg"));
        assert!(!report.boxplot_svg.contains("No practices to plot"));
        assert!(report.map_svg.contains("No boundary data"));
        assert_eq!(report.top_n, 5);
    }
}
