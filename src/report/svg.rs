//! Minimal SVG writing helpers shared by the charts.

use std::fmt::Write;

/// Escape text for use inside SVG/HTML element content or attributes.
pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Text anchor for [`SvgCanvas::text`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Anchor {
    Start,
    Middle,
    End,
}

impl Anchor {
    fn as_str(self) -> &'static str {
        match self {
            Anchor::Start => "start",
            Anchor::Middle => "middle",
            Anchor::End => "end",
        }
    }
}

/// An SVG document being built up element by element.
pub struct SvgCanvas {
    body: String,
    width: f64,
    height: f64,
}

impl SvgCanvas {
    pub fn new(width: f64, height: f64) -> Self {
        Self {
            body: String::new(),
            width,
            height,
        }
    }

    /// Append raw markup.
    pub fn raw(&mut self, markup: &str) {
        self.body.push_str(markup);
        self.body.push('\n');
    }

    pub fn line(&mut self, x1: f64, y1: f64, x2: f64, y2: f64, stroke: &str, width: f64) {
        let _ = writeln!(
            self.body,
            r#"<line x1="{:.2}" y1="{:.2}" x2="{:.2}" y2="{:.2}" stroke="{}" stroke-width="{}"/>"#,
            x1, y1, x2, y2, stroke, width
        );
    }

    pub fn rect(&mut self, x: f64, y: f64, width: f64, height: f64, fill: &str, stroke: &str) {
        let _ = writeln!(
            self.body,
            r#"<rect x="{:.2}" y="{:.2}" width="{:.2}" height="{:.2}" fill="{}" stroke="{}"/>"#,
            x,
            y,
            width.max(0.0),
            height.max(0.0),
            fill,
            stroke
        );
    }

    pub fn circle(&mut self, cx: f64, cy: f64, r: f64, fill: &str, stroke: &str) {
        let _ = writeln!(
            self.body,
            r#"<circle cx="{:.2}" cy="{:.2}" r="{}" fill="{}" stroke="{}" stroke-width="0.5"/>"#,
            cx, cy, r, fill, stroke
        );
    }

    pub fn text(&mut self, x: f64, y: f64, anchor: Anchor, size: u32, content: &str) {
        let _ = writeln!(
            self.body,
            r#"<text x="{:.2}" y="{:.2}" text-anchor="{}" font-size="{}" font-family="sans-serif">{}</text>"#,
            x,
            y,
            anchor.as_str(),
            size,
            escape(content)
        );
    }

    /// Text rotated a quarter turn anticlockwise about its anchor.
    pub fn vertical_text(&mut self, x: f64, y: f64, size: u32, content: &str) {
        let _ = writeln!(
            self.body,
            r#"<text x="{x:.2}" y="{y:.2}" text-anchor="middle" font-size="{size}" font-family="sans-serif" transform="rotate(-90 {x:.2} {y:.2})">{}</text>"#,
            escape(content)
        );
    }

    /// Close the document.
    pub fn finish(self) -> String {
        format!(
            "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{w}\" height=\"{h}\" viewBox=\"0 0 {w} {h}\">\n<rect width=\"100%\" height=\"100%\" fill=\"white\"/>\n{}</svg>\n",
            self.body,
            w = self.width,
            h = self.height
        )
    }
}

/// A tick step of 1, 2 or 5 times a power of ten giving roughly
/// `target` ticks over `range`.
pub fn nice_step(range: f64, target: usize) -> f64 {
    if range <= 0.0 || !range.is_finite() {
        return 1.0;
    }
    let raw = range / target.max(1) as f64;
    let magnitude = 10f64.powf(raw.log10().floor());
    let residual = raw / magnitude;
    let nice = if residual <= 1.0 {
        1.0
    } else if residual <= 2.0 {
        2.0
    } else if residual <= 5.0 {
        5.0
    } else {
        10.0
    };
    nice * magnitude
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape() {
        assert_eq!(escape("A & B <C>"), "A &amp; B &lt;C&gt;");
        assert_eq!(escape("\"q\" 'a'"), "&quot;q&quot; &#39;a&#39;");
    }

    #[test]
    fn test_nice_step() {
        assert!((nice_step(1.0, 5) - 0.2).abs() < 1e-12);
        assert!((nice_step(100.0, 5) - 20.0).abs() < 1e-9);
        assert_eq!(nice_step(0.0, 5), 1.0);
        assert!((nice_step(0.7, 5) - 0.2).abs() < 1e-12);
    }

    #[test]
    fn test_canvas_wraps_body() {
        let mut canvas = SvgCanvas::new(100.0, 50.0);
        canvas.text(10.0, 10.0, Anchor::Start, 12, "Tom & Jerry");
        let svg = canvas.finish();

        assert!(svg.starts_with("<svg"));
        assert!(svg.contains("viewBox=\"0 0 100 50\""));
        assert!(svg.contains("Tom &amp; Jerry"));
        assert!(svg.trim_end().ends_with("</svg>"));
    }
}
