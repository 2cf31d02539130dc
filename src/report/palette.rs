//! Colour ramps for the charts.

use crate::models::Decile;

/// Boxplot fill per decile, darkest (most deprived) to lightest.
pub const DECILE_RAMP: [&str; 10] = [
    "#08306b", "#08519c", "#2171b5", "#4292c6", "#6baed6", "#9ecae1", "#c6dbef", "#deebf7",
    "#eff3ff", "#f7fbff",
];

/// Fill for a board without a rate.
pub const NO_DATA: &str = "#d9d9d9";

/// Boxplot fill for a decile.
pub fn decile_fill(decile: Decile) -> &'static str {
    DECILE_RAMP[decile.index()]
}

/// An RGB colour.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgb(pub u8, pub u8, pub u8);

impl Rgb {
    /// Parse `#rrggbb`.
    pub fn from_hex(hex: &str) -> Option<Self> {
        let hex = hex.strip_prefix('#')?;
        if hex.len() != 6 {
            return None;
        }
        let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
        Some(Self(channel(0)?, channel(2)?, channel(4)?))
    }

    pub fn to_hex(self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.0, self.1, self.2)
    }

    fn lerp(self, other: Rgb, t: f64) -> Rgb {
        let mix = |a: u8, b: u8| (f64::from(a) + (f64::from(b) - f64::from(a)) * t).round() as u8;
        Rgb(mix(self.0, other.0), mix(self.1, other.1), mix(self.2, other.2))
    }
}

/// A continuous colour scale over `[min, max]` through evenly spaced stops.
#[derive(Debug, Clone)]
pub struct ContinuousScale {
    stops: Vec<Rgb>,
    min: f64,
    max: f64,
}

impl ContinuousScale {
    /// Build a scale; stops that fail to parse are ignored.
    pub fn new(stops: &[&str], min: f64, max: f64) -> Self {
        let mut parsed: Vec<Rgb> = stops.iter().filter_map(|s| Rgb::from_hex(s)).collect();
        if parsed.is_empty() {
            parsed.push(Rgb(0, 0, 0));
        }
        Self {
            stops: parsed,
            min,
            max,
        }
    }

    /// Light to dark orange, for board mean rates.
    pub fn oranges(min: f64, max: f64) -> Self {
        Self::new(&["#fff5eb", "#fd8d3c", "#7f2704"], min, max)
    }

    /// Dark purple through teal to yellow, for practice deciles.
    pub fn viridis(min: f64, max: f64) -> Self {
        Self::new(&["#440154", "#21918c", "#fde725"], min, max)
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }

    /// Colour of a value, clamped to the scale's domain.
    pub fn colour(&self, value: f64) -> Rgb {
        let span = self.max - self.min;
        let t = if span > 0.0 {
            ((value - self.min) / span).clamp(0.0, 1.0)
        } else {
            0.5
        };

        if self.stops.len() == 1 {
            return self.stops[0];
        }

        let segments = (self.stops.len() - 1) as f64;
        let pos = t * segments;
        let idx = (pos.floor() as usize).min(self.stops.len() - 2);
        self.stops[idx].lerp(self.stops[idx + 1], pos - idx as f64)
    }

    /// SVG `<stop>` elements describing the scale, for a linear gradient.
    pub fn gradient_stops(&self) -> String {
        let last = (self.stops.len() - 1).max(1) as f64;
        self.stops
            .iter()
            .enumerate()
            .map(|(i, c)| {
                format!(
                    r#"<stop offset="{:.0}%" stop-color="{}"/>"#,
                    i as f64 / last * 100.0,
                    c.to_hex()
                )
            })
            .collect::<Vec<_>>()
            .join("")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ramp_darkest_first() {
        assert_eq!(decile_fill(Decile::MOST_DEPRIVED), "#08306b");
        assert_eq!(decile_fill(Decile::LEAST_DEPRIVED), "#f7fbff");
    }

    #[test]
    fn test_hex_round_trip() {
        assert_eq!(Rgb::from_hex("#7f2704"), Some(Rgb(0x7f, 0x27, 0x04)));
        assert_eq!(Rgb(255, 0, 16).to_hex(), "#ff0010");
        assert_eq!(Rgb::from_hex("7f2704"), None);
    }

    #[test]
    fn test_scale_endpoints_and_clamp() {
        let scale = ContinuousScale::new(&["#000000", "#ffffff"], 0.0, 10.0);
        assert_eq!(scale.colour(0.0), Rgb(0, 0, 0));
        assert_eq!(scale.colour(10.0), Rgb(255, 255, 255));
        assert_eq!(scale.colour(-5.0), Rgb(0, 0, 0));
        assert_eq!(scale.colour(5.0), Rgb(128, 128, 128));
    }

    #[test]
    fn test_scale_three_stops() {
        let scale = ContinuousScale::new(&["#000000", "#ff0000", "#ffffff"], 1.0, 10.0);
        assert_eq!(scale.colour(5.5), Rgb(255, 0, 0));
    }

    #[test]
    fn test_degenerate_domain_uses_middle() {
        let scale = ContinuousScale::new(&["#000000", "#ffffff"], 2.0, 2.0);
        assert_eq!(scale.colour(2.0), Rgb(128, 128, 128));
    }
}
