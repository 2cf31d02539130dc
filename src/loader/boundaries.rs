//! Geospatial boundary files.
//!
//! Practice locations are GeoJSON points keyed by postcode; health boards
//! are GeoJSON polygons keyed by board code. Property names go through the
//! same normalisation as CSV headers, so `Postcode`, `PC` or `HBCode` all
//! resolve. The geometries are otherwise opaque to the pipeline: they only
//! carry join keys and the map's render payload.

use super::schema::normalize_column;
use crate::error::{LoadError, LoadResult};
use crate::models::LoadStats;
use geo::{Geometry, MultiPolygon, Point};
use geojson::{Feature, GeoJson};
use serde_json::Value;
use std::collections::HashMap;
use std::path::Path;
use tracing::{debug, info};

/// One health board outline.
#[derive(Debug, Clone)]
pub struct BoardShape {
    pub health_board: String,
    pub shape: MultiPolygon<f64>,
}

/// Practice points and board outlines used by the map.
#[derive(Debug, Clone, Default)]
pub struct BoundaryGeometry {
    /// Practice location keyed by normalised postcode.
    pub practice_points: HashMap<String, Point<f64>>,
    /// Board outlines in file order.
    pub board_shapes: Vec<BoardShape>,
}

impl BoundaryGeometry {
    /// Location of a practice by postcode, in any spacing or case.
    pub fn point_for(&self, postcode: &str) -> Option<Point<f64>> {
        self.practice_points.get(&normalize_postcode(postcode)).copied()
    }
}

/// Uppercase a postcode and strip its whitespace.
pub fn normalize_postcode(raw: &str) -> String {
    raw.chars()
        .filter(|c| !c.is_whitespace())
        .map(|c| c.to_ascii_uppercase())
        .collect()
}

/// Read every feature from a GeoJSON file.
fn read_features(path: &Path) -> LoadResult<Vec<Feature>> {
    if !path.is_file() {
        return Err(LoadError::MissingFile {
            path: path.to_path_buf(),
        });
    }

    let content = std::fs::read_to_string(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    parse_features(&content, path)
}

fn parse_features(content: &str, origin: &Path) -> LoadResult<Vec<Feature>> {
    let geojson: GeoJson = content.parse().map_err(|e: geojson::Error| LoadError::Geojson {
        path: origin.to_path_buf(),
        message: e.to_string(),
    })?;

    match geojson {
        GeoJson::FeatureCollection(collection) => Ok(collection.features),
        GeoJson::Feature(feature) => Ok(vec![feature]),
        GeoJson::Geometry(_) => Err(LoadError::Geojson {
            path: origin.to_path_buf(),
            message: "expected features with properties, found a bare geometry".to_string(),
        }),
    }
}

/// Find a property by canonical name and render it as a string.
fn property(feature: &Feature, canonical: &str) -> Option<String> {
    let properties = feature.properties.as_ref()?;

    properties
        .iter()
        .find(|(key, _)| normalize_column(key) == canonical)
        .and_then(|(_, value)| match value {
            Value::String(s) => Some(s.trim().to_string()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        })
        .filter(|s| !s.is_empty())
}

fn geometry(feature: Feature) -> Option<Geometry<f64>> {
    let value = feature.geometry?.value;
    Geometry::<f64>::try_from(value).ok()
}

/// Load practice locations keyed by postcode.
pub fn load_practice_points(path: &Path) -> LoadResult<(HashMap<String, Point<f64>>, LoadStats)> {
    let features = read_features(path)?;
    let (points, stats) = collect_points(features, path);
    info!("Loaded {} practice locations from {}", points.len(), path.display());
    Ok((points, stats))
}

fn collect_points(features: Vec<Feature>, origin: &Path) -> (HashMap<String, Point<f64>>, LoadStats) {
    let mut stats = LoadStats::new("practice locations");
    stats.files = 1;
    let mut points = HashMap::new();

    for feature in features {
        stats.rows_read += 1;

        let Some(postcode) = property(&feature, "postcode") else {
            debug!("{}: location without postcode", origin.display());
            stats.rows_malformed += 1;
            continue;
        };

        let point = match geometry(feature) {
            Some(Geometry::Point(p)) => p,
            Some(Geometry::MultiPoint(mp)) if !mp.0.is_empty() => mp.0[0],
            _ => {
                debug!("{}: {} has no point geometry", origin.display(), postcode);
                stats.rows_malformed += 1;
                continue;
            }
        };

        let key = normalize_postcode(&postcode);
        if points.contains_key(&key) {
            stats.rows_duplicate += 1;
            continue;
        }
        points.insert(key, point);
        stats.rows_kept += 1;
    }

    (points, stats)
}

/// Load health board outlines keyed by board code.
pub fn load_board_shapes(path: &Path) -> LoadResult<(Vec<BoardShape>, LoadStats)> {
    let features = read_features(path)?;
    let (shapes, stats) = collect_shapes(features, path);
    info!("Loaded {} health board outlines from {}", shapes.len(), path.display());
    Ok((shapes, stats))
}

fn collect_shapes(features: Vec<Feature>, origin: &Path) -> (Vec<BoardShape>, LoadStats) {
    let mut stats = LoadStats::new("health boards");
    stats.files = 1;
    let mut shapes = Vec::new();

    for feature in features {
        stats.rows_read += 1;

        let Some(health_board) = property(&feature, "health_board") else {
            debug!("{}: outline without board code", origin.display());
            stats.rows_malformed += 1;
            continue;
        };

        let shape = match geometry(feature) {
            Some(Geometry::Polygon(p)) => MultiPolygon::new(vec![p]),
            Some(Geometry::MultiPolygon(mp)) => mp,
            _ => {
                debug!("{}: {} has no polygon geometry", origin.display(), health_board);
                stats.rows_malformed += 1;
                continue;
            }
        };

        stats.rows_kept += 1;
        shapes.push(BoardShape {
            health_board,
            shape,
        });
    }

    (shapes, stats)
}

/// Load both boundary files.
pub fn load_boundaries(
    locations: &Path,
    boards: &Path,
) -> LoadResult<(BoundaryGeometry, Vec<LoadStats>)> {
    let (practice_points, point_stats) = load_practice_points(locations)?;
    let (board_shapes, shape_stats) = load_board_shapes(boards)?;

    Ok((
        BoundaryGeometry {
            practice_points,
            board_shapes,
        },
        vec![point_stats, shape_stats],
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    const POINTS: &str = r#"{
        "type": "FeatureCollection",
        "features": [
            {"type": "Feature", "properties": {"Postcode": "EH1 1AA"},
             "geometry": {"type": "Point", "coordinates": [-3.19, 55.95]}},
            {"type": "Feature", "properties": {"Postcode": "eh11aa"},
             "geometry": {"type": "Point", "coordinates": [0.0, 0.0]}},
            {"type": "Feature", "properties": {"Name": "no postcode"},
             "geometry": {"type": "Point", "coordinates": [-4.25, 55.86]}},
            {"type": "Feature", "properties": {"PC": "G1 1AA"},
             "geometry": {"type": "LineString", "coordinates": [[0, 0], [1, 1]]}}
        ]
    }"#;

    const BOARDS: &str = r#"{
        "type": "FeatureCollection",
        "features": [
            {"type": "Feature", "properties": {"HBCode": "S08000024", "HBName": "Lothian"},
             "geometry": {"type": "Polygon", "coordinates": [[[-3.5, 55.8], [-2.8, 55.8], [-2.8, 56.0], [-3.5, 55.8]]]}},
            {"type": "Feature", "properties": {"HB": "S08000031"},
             "geometry": {"type": "MultiPolygon", "coordinates": [[[[-4.5, 55.7], [-4.0, 55.7], [-4.0, 56.0], [-4.5, 55.7]]]]}}
        ]
    }"#;

    #[test]
    fn test_normalize_postcode() {
        assert_eq!(normalize_postcode("eh1 1aa"), "EH11AA");
        assert_eq!(normalize_postcode(" EH1  1AA "), "EH11AA");
    }

    #[test]
    fn test_collect_points() {
        let features = parse_features(POINTS, Path::new("points.geojson")).unwrap();
        let (points, stats) = collect_points(features, Path::new("points.geojson"));

        assert_eq!(points.len(), 1);
        assert_eq!(points["EH11AA"].x(), -3.19);
        assert_eq!(stats.rows_read, 4);
        assert_eq!(stats.rows_duplicate, 1);
        assert_eq!(stats.rows_malformed, 2);

        let geometry = BoundaryGeometry {
            practice_points: points,
            board_shapes: Vec::new(),
        };
        assert!(geometry.point_for("eh1 1AA").is_some());
    }

    #[test]
    fn test_collect_shapes() {
        let features = parse_features(BOARDS, Path::new("boards.geojson")).unwrap();
        let (shapes, stats) = collect_shapes(features, Path::new("boards.geojson"));

        assert_eq!(shapes.len(), 2);
        assert_eq!(shapes[0].health_board, "S08000024");
        assert_eq!(shapes[1].health_board, "S08000031");
        assert_eq!(stats.rows_kept, 2);
    }

    #[test]
    fn test_bare_geometry_rejected() {
        let content = r#"{"type": "Point", "coordinates": [0.0, 0.0]}"#;
        let result = parse_features(content, Path::new("bare.geojson"));
        assert!(matches!(result, Err(LoadError::Geojson { .. })));
    }

    #[test]
    fn test_missing_boundary_file_is_fatal() {
        let result = load_board_shapes(Path::new("/nonexistent/boards.geojson"));
        assert!(matches!(result, Err(LoadError::MissingFile { .. })));
    }
}
