//! Decile boxplot.
//!
//! One box per SIMD decile showing the distribution of practice rates.
//! Quartiles use linear interpolation between order statistics; whiskers
//! reach the most extreme values within 1.5 IQR of the box and anything
//! beyond is drawn as an outlier point.

use super::palette::decile_fill;
use super::svg::{nice_step, Anchor, SvgCanvas};
use crate::models::Decile;

const WIDTH: f64 = 760.0;
const HEIGHT: f64 = 440.0;
const LEFT: f64 = 80.0;
const RIGHT: f64 = 20.0;
const TOP: f64 = 50.0;
const BOTTOM: f64 = 70.0;

/// Summary of one decile's rate distribution.
#[derive(Debug, Clone, PartialEq)]
pub struct BoxStats {
    pub decile: Decile,
    pub count: usize,
    pub q1: f64,
    pub median: f64,
    pub q3: f64,
    pub whisker_low: f64,
    pub whisker_high: f64,
    pub outliers: Vec<f64>,
}

/// Quantile of sorted data by linear interpolation. `None` when empty.
pub fn quantile(sorted: &[f64], p: f64) -> Option<f64> {
    if sorted.is_empty() {
        return None;
    }
    let pos = p.clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    Some(sorted[lo] + (sorted[hi] - sorted[lo]) * (pos - lo as f64))
}

/// Five-number summary with 1.5 IQR whiskers. `None` for an empty group.
pub fn box_stats(decile: Decile, values: &[f64]) -> Option<BoxStats> {
    let mut sorted: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

    let q1 = quantile(&sorted, 0.25)?;
    let median = quantile(&sorted, 0.5)?;
    let q3 = quantile(&sorted, 0.75)?;
    let iqr = q3 - q1;
    let low_fence = q1 - 1.5 * iqr;
    let high_fence = q3 + 1.5 * iqr;

    let inside: Vec<f64> = sorted
        .iter()
        .copied()
        .filter(|v| *v >= low_fence && *v <= high_fence)
        .collect();
    let outliers: Vec<f64> = sorted
        .iter()
        .copied()
        .filter(|v| *v < low_fence || *v > high_fence)
        .collect();

    Some(BoxStats {
        decile,
        count: sorted.len(),
        q1,
        median,
        q3,
        whisker_low: inside.first().copied().unwrap_or(q1),
        whisker_high: inside.last().copied().unwrap_or(q3),
        outliers,
    })
}

/// Box statistics for every non-empty decile group.
pub fn decile_boxes(groups: &[Vec<f64>; 10]) -> Vec<BoxStats> {
    Decile::all()
        .filter_map(|d| box_stats(d, &groups[d.index()]))
        .collect()
}

/// Render the boxplot as an SVG document.
pub fn render_boxplot(boxes: &[BoxStats]) -> String {
    let mut canvas = SvgCanvas::new(WIDTH, HEIGHT);
    canvas.text(
        WIDTH / 2.0,
        28.0,
        Anchor::Middle,
        16,
        "Inhaler items per registered patient by SIMD decile",
    );

    let plot_w = WIDTH - LEFT - RIGHT;
    let plot_h = HEIGHT - TOP - BOTTOM;
    let bottom = TOP + plot_h;

    if boxes.is_empty() {
        canvas.text(WIDTH / 2.0, TOP + plot_h / 2.0, Anchor::Middle, 14, "No practices to plot");
        return canvas.finish();
    }

    let data_max = boxes
        .iter()
        .map(|b| b.outliers.last().copied().unwrap_or(b.whisker_high).max(b.whisker_high))
        .fold(0.0_f64, f64::max);
    let step = nice_step(data_max, 5);
    let y_max = ((data_max / step).ceil() * step).max(step);
    let y = |v: f64| bottom - (v / y_max) * plot_h;

    // Grid and y ticks
    let ticks = (y_max / step).round() as usize;
    for i in 0..=ticks {
        let value = step * i as f64;
        let ty = y(value);
        canvas.line(LEFT, ty, LEFT + plot_w, ty, "#e5e5e5", 1.0);
        canvas.text(LEFT - 8.0, ty + 4.0, Anchor::End, 11, &format!("{:.2}", value));
    }
    canvas.line(LEFT, TOP, LEFT, bottom, "#333333", 1.0);
    canvas.line(LEFT, bottom, LEFT + plot_w, bottom, "#333333", 1.0);

    let band = plot_w / 10.0;
    let box_w = band * 0.6;

    for decile in Decile::all() {
        let cx = LEFT + band * (decile.index() as f64 + 0.5);
        canvas.text(cx, bottom + 18.0, Anchor::Middle, 12, &decile.to_string());
    }

    for b in boxes {
        let cx = LEFT + band * (b.decile.index() as f64 + 0.5);
        let x0 = cx - box_w / 2.0;
        let fill = decile_fill(b.decile);

        canvas.line(cx, y(b.whisker_high), cx, y(b.q3), "#333333", 1.0);
        canvas.line(cx, y(b.q1), cx, y(b.whisker_low), "#333333", 1.0);
        canvas.line(cx - box_w / 4.0, y(b.whisker_high), cx + box_w / 4.0, y(b.whisker_high), "#333333", 1.0);
        canvas.line(cx - box_w / 4.0, y(b.whisker_low), cx + box_w / 4.0, y(b.whisker_low), "#333333", 1.0);
        canvas.rect(x0, y(b.q3), box_w, y(b.q1) - y(b.q3), fill, "#333333");

        let median_stroke = if b.decile.get() <= 5 { "#ffffff" } else { "#333333" };
        canvas.line(x0, y(b.median), x0 + box_w, y(b.median), median_stroke, 2.0);

        for &outlier in &b.outliers {
            canvas.circle(cx, y(outlier), 2.5, "none", "#333333");
        }
    }

    canvas.text(
        LEFT + plot_w / 2.0,
        HEIGHT - 20.0,
        Anchor::Middle,
        13,
        "SIMD decile (1 = most deprived, 10 = least deprived)",
    );
    canvas.vertical_text(22.0, TOP + plot_h / 2.0, 13, "Inhaler items per patient");

    canvas.finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(n: u8) -> Decile {
        Decile::new(n).unwrap()
    }

    #[test]
    fn test_quantile_interpolates() {
        let v = [1.0, 2.0, 3.0, 4.0];
        assert_eq!(quantile(&v, 0.0), Some(1.0));
        assert_eq!(quantile(&v, 0.5), Some(2.5));
        assert_eq!(quantile(&v, 0.25), Some(1.75));
        assert_eq!(quantile(&v, 1.0), Some(4.0));
        assert_eq!(quantile(&[], 0.5), None);
    }

    #[test]
    fn test_box_stats_flags_outliers() {
        let values = [0.10, 0.12, 0.11, 0.13, 0.12, 0.95];
        let stats = box_stats(d(1), &values).unwrap();

        assert_eq!(stats.count, 6);
        assert_eq!(stats.outliers, vec![0.95]);
        assert_eq!(stats.whisker_high, 0.13);
        assert_eq!(stats.whisker_low, 0.10);
        assert!(stats.q1 <= stats.median && stats.median <= stats.q3);
    }

    #[test]
    fn test_single_value_box() {
        let stats = box_stats(d(4), &[0.3]).unwrap();
        assert_eq!(stats.q1, 0.3);
        assert_eq!(stats.q3, 0.3);
        assert!(stats.outliers.is_empty());
    }

    #[test]
    fn test_decile_boxes_skip_empty_groups() {
        let mut groups: [Vec<f64>; 10] = Default::default();
        groups[0] = vec![0.2, 0.3];
        groups[9] = vec![0.1];
        let boxes = decile_boxes(&groups);

        assert_eq!(boxes.len(), 2);
        assert_eq!(boxes[0].decile, d(1));
        assert_eq!(boxes[1].decile, d(10));
    }

    #[test]
    fn test_render_uses_decile_colours() {
        let mut groups: [Vec<f64>; 10] = Default::default();
        groups[0] = vec![0.2, 0.3, 0.25];
        groups[9] = vec![0.1, 0.12];
        let svg = render_boxplot(&decile_boxes(&groups));

        assert!(svg.contains("#08306b"));
        assert!(svg.contains("#f7fbff"));
        assert!(svg.contains("SIMD decile"));
    }

    #[test]
    fn test_render_empty() {
        let svg = render_boxplot(&[]);
        assert!(svg.contains("No practices to plot"));
    }
}
