//! Choropleth map of health boards with a practice point layer.
//!
//! Boards are filled by their mean practice rate; practices are drawn on
//! top at their postcode location, coloured by SIMD decile. Coordinates
//! are fitted into the frame with an equirectangular correction when they
//! look like longitude/latitude.

use super::palette::{ContinuousScale, NO_DATA};
use super::svg::{Anchor, SvgCanvas};
use crate::loader::BoundaryGeometry;
use crate::models::{HealthBoardRate, PracticeRate};
use geo::{BoundingRect, LineString, Point, Rect};
use std::collections::HashMap;
use std::fmt::Write;
use tracing::debug;

const WIDTH: f64 = 760.0;
const HEIGHT: f64 = 820.0;
const MARGIN: f64 = 20.0;
const TITLE_SPACE: f64 = 40.0;
const LEGEND_WIDTH: f64 = 150.0;

/// Maps data coordinates into the SVG frame.
#[derive(Debug, Clone, Copy)]
pub struct Projection {
    min_x: f64,
    max_y: f64,
    x_stretch: f64,
    scale: f64,
    offset_x: f64,
    offset_y: f64,
}

impl Projection {
    /// Fit `bounds` into the rectangle at (`left`, `top`) of the given size.
    pub fn fit(bounds: Rect<f64>, left: f64, top: f64, width: f64, height: f64) -> Self {
        let min = bounds.min();
        let max = bounds.max();

        let geographic = min.x >= -180.0 && max.x <= 180.0 && min.y >= -90.0 && max.y <= 90.0;
        let x_stretch = if geographic {
            ((min.y + max.y) / 2.0).to_radians().cos().max(0.01)
        } else {
            1.0
        };

        let data_w = ((max.x - min.x) * x_stretch).max(f64::EPSILON);
        let data_h = (max.y - min.y).max(f64::EPSILON);
        let scale = (width / data_w).min(height / data_h);

        Self {
            min_x: min.x,
            max_y: max.y,
            x_stretch,
            scale,
            offset_x: left + (width - data_w * scale) / 2.0,
            offset_y: top + (height - data_h * scale) / 2.0,
        }
    }

    /// Frame position of a data point.
    pub fn project(&self, x: f64, y: f64) -> (f64, f64) {
        (
            self.offset_x + (x - self.min_x) * self.x_stretch * self.scale,
            self.offset_y + (self.max_y - y) * self.scale,
        )
    }
}

/// Smallest rectangle covering the board outlines and the given points.
fn combined_bounds(geometry: &BoundaryGeometry, points: &[Point<f64>]) -> Option<Rect<f64>> {
    let rects = geometry
        .board_shapes
        .iter()
        .filter_map(|b| b.shape.bounding_rect())
        .chain(points.iter().map(|p| p.bounding_rect()));

    rects.reduce(|a, b| {
        Rect::new(
            (a.min().x.min(b.min().x), a.min().y.min(b.min().y)),
            (a.max().x.max(b.max().x), a.max().y.max(b.max().y)),
        )
    })
}

fn ring_path(ring: &LineString<f64>, projection: &Projection, out: &mut String) {
    for (i, coord) in ring.0.iter().enumerate() {
        let (x, y) = projection.project(coord.x, coord.y);
        let _ = write!(out, "{}{:.1},{:.1} ", if i == 0 { "M" } else { "L" }, x, y);
    }
    out.push_str("Z ");
}

fn legend_bar(canvas: &mut SvgCanvas, id: &str, scale: &ContinuousScale, top: f64, title: &str, low: &str, high: &str) {
    let x = WIDTH - LEGEND_WIDTH + 10.0;
    canvas.raw(&format!(
        r#"<defs><linearGradient id="{}" x1="0" x2="1" y1="0" y2="0">{}</linearGradient></defs>"#,
        id,
        scale.gradient_stops()
    ));
    canvas.text(x, top, Anchor::Start, 12, title);
    canvas.raw(&format!(
        r##"<rect x="{:.2}" y="{:.2}" width="120" height="12" fill="url(#{})" stroke="#333333" stroke-width="0.5"/>"##,
        x,
        top + 8.0,
        id
    ));
    canvas.text(x, top + 36.0, Anchor::Start, 10, low);
    canvas.text(x + 120.0, top + 36.0, Anchor::End, 10, high);
}

/// Render the choropleth and point layer as an SVG document.
pub fn render_map(boards: &[HealthBoardRate], practices: &[PracticeRate], geometry: &BoundaryGeometry) -> String {
    let mut canvas = SvgCanvas::new(WIDTH, HEIGHT);
    canvas.text(
        (WIDTH - LEGEND_WIDTH) / 2.0,
        26.0,
        Anchor::Middle,
        16,
        "Mean inhaler rate by health board, practices by SIMD decile",
    );

    let mut located: Vec<(Point<f64>, &PracticeRate)> = Vec::new();
    let mut unlocated = 0usize;
    for practice in practices.iter().filter(|p| p.decile.is_some()) {
        match geometry.point_for(&practice.postcode) {
            Some(point) => located.push((point, practice)),
            None => unlocated += 1,
        }
    }
    if unlocated > 0 {
        debug!("{} practices have no location for postcode", unlocated);
    }

    let points: Vec<Point<f64>> = located.iter().map(|(p, _)| *p).collect();
    let Some(bounds) = combined_bounds(geometry, &points) else {
        canvas.text(WIDTH / 2.0, HEIGHT / 2.0, Anchor::Middle, 14, "No boundary data to map");
        return canvas.finish();
    };

    let projection = Projection::fit(
        bounds,
        MARGIN,
        TITLE_SPACE,
        WIDTH - LEGEND_WIDTH - 2.0 * MARGIN,
        HEIGHT - TITLE_SPACE - MARGIN,
    );

    // Board layer
    let by_board: HashMap<&str, &HealthBoardRate> = boards
        .iter()
        .map(|b| (b.health_board.as_str(), b))
        .collect();
    let means: Vec<f64> = boards.iter().filter_map(|b| b.mean_rate).collect();
    let rate_scale = ContinuousScale::oranges(
        means.iter().copied().fold(f64::INFINITY, f64::min),
        means.iter().copied().fold(f64::NEG_INFINITY, f64::max),
    );

    for board in &geometry.board_shapes {
        let fill = by_board
            .get(board.health_board.as_str())
            .and_then(|b| b.mean_rate)
            .map(|rate| rate_scale.colour(rate).to_hex())
            .unwrap_or_else(|| NO_DATA.to_string());

        let mut path = String::new();
        for polygon in &board.shape.0 {
            ring_path(polygon.exterior(), &projection, &mut path);
            for interior in polygon.interiors() {
                ring_path(interior, &projection, &mut path);
            }
        }
        canvas.raw(&format!(
            r##"<path d="{}" fill="{}" fill-rule="evenodd" stroke="#555555" stroke-width="0.6"><title>{}</title></path>"##,
            path.trim_end(),
            fill,
            super::svg::escape(&board.health_board)
        ));
    }

    // Practice layer
    let decile_scale = ContinuousScale::viridis(1.0, 10.0);
    for (point, practice) in &located {
        let (x, y) = projection.project(point.x(), point.y());
        let decile = practice.decile.map(|d| f64::from(d.get())).unwrap_or(5.5);
        canvas.circle(x, y, 2.5, &decile_scale.colour(decile).to_hex(), "#ffffff");
    }

    // Legends
    if !means.is_empty() {
        legend_bar(
            &mut canvas,
            "rate-scale",
            &rate_scale,
            TITLE_SPACE + 10.0,
            "Board mean rate",
            &format!("{:.2}", rate_scale.min()),
            &format!("{:.2}", rate_scale.max()),
        );
    }
    legend_bar(
        &mut canvas,
        "decile-scale",
        &decile_scale,
        TITLE_SPACE + 70.0,
        "Practice SIMD decile",
        "1",
        "10",
    );

    canvas.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::boundaries::BoardShape;
    use crate::models::Decile;
    use geo::{polygon, MultiPolygon};

    fn geometry() -> BoundaryGeometry {
        let square = polygon![
            (x: -4.0, y: 55.0),
            (x: -3.0, y: 55.0),
            (x: -3.0, y: 56.0),
            (x: -4.0, y: 56.0),
            (x: -4.0, y: 55.0),
        ];
        let mut practice_points = HashMap::new();
        practice_points.insert("EH11AA".to_string(), Point::new(-3.5, 55.5));

        BoundaryGeometry {
            practice_points,
            board_shapes: vec![BoardShape {
                health_board: "S08000024".to_string(),
                shape: MultiPolygon::new(vec![square]),
            }],
        }
    }

    fn practice(postcode: &str, decile: Option<u8>) -> PracticeRate {
        PracticeRate {
            practice_id: "1".to_string(),
            practice_name: "P".to_string(),
            cluster_id: "C".to_string(),
            health_board: "S08000024".to_string(),
            postcode: postcode.to_string(),
            population: 100,
            total_items: 10,
            rate: Some(0.1),
            decile: decile.and_then(Decile::new),
        }
    }

    #[test]
    fn test_projection_keeps_points_in_frame() {
        let bounds = Rect::new((-4.0, 55.0), (-3.0, 56.0));
        let projection = Projection::fit(bounds, 0.0, 0.0, 100.0, 100.0);

        let (x0, y0) = projection.project(-4.0, 56.0);
        let (x1, y1) = projection.project(-3.0, 55.0);
        assert!(x0 >= 0.0 && x1 <= 100.0);
        assert!((y0 - 0.0).abs() < 1e-9);
        assert!((y1 - 100.0).abs() < 1e-9);
        // Longitude is squeezed at Scottish latitudes
        assert!(x1 - x0 < 100.0);
    }

    #[test]
    fn test_render_map_layers() {
        let boards = vec![HealthBoardRate {
            health_board: "S08000024".to_string(),
            mean_rate: Some(0.1),
            representative_decile: Decile::new(3),
            decile_range: None,
            practice_count: 1,
            rated_practice_count: 1,
        }];
        let practices = vec![practice("EH1 1AA", Some(1)), practice("EH1 1AA", None)];
        let svg = render_map(&boards, &practices, &geometry());

        assert_eq!(svg.matches("<path").count(), 1);
        // One practice point; the null-decile practice is left out
        assert_eq!(svg.matches("<circle").count(), 1);
        assert!(svg.contains("#440154"));
        assert!(svg.contains("Board mean rate"));
    }

    #[test]
    fn test_board_without_rate_is_grey() {
        let svg = render_map(&[], &[], &geometry());
        assert!(svg.contains(NO_DATA));
    }

    #[test]
    fn test_empty_geometry() {
        let svg = render_map(&[], &[], &BoundaryGeometry::default());
        assert!(svg.contains("No boundary data"));
    }
}
