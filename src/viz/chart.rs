//! SVG and ASCII chart primitives.
//!
//! Charts are assembled as plain SVG strings so the output opens in any
//! browser without a native plotting dependency. Each chart also renders to
//! ASCII for quick terminal inspection.

const WIDTH: usize = 640;
const HEIGHT: usize = 400;
const MARGIN: usize = 60;

const ASCII_COLS: usize = 72;
const ASCII_ROWS: usize = 20;

/// Line colors cycled across series.
const PALETTE: &[&str] = &["#1f77b4", "#ff7f0e", "#2ca02c", "#d62728", "#9467bd"];

/// Plot characters cycled across series in ASCII output.
const ASCII_MARKS: &[char] = &['*', 'o', '+', 'x', '#'];

/// One named line on a chart.
#[derive(Debug, Clone)]
pub struct Series {
    pub label: String,
    pub points: Vec<(f32, f32)>,
}

impl Series {
    pub fn new(label: impl Into<String>, points: Vec<(f32, f32)>) -> Self {
        Self {
            label: label.into(),
            points,
        }
    }

    /// Series from y values at consecutive integer x positions.
    pub fn from_values(label: impl Into<String>, values: &[f32]) -> Self {
        let points = values
            .iter()
            .enumerate()
            .map(|(i, &v)| (i as f32, v))
            .collect();
        Self::new(label, points)
    }
}

/// A labelled point annotation.
#[derive(Debug, Clone)]
pub struct Marker {
    pub x: f32,
    pub y: f32,
    pub label: String,
}

#[derive(Debug, Clone, Copy)]
struct Bounds {
    x_min: f32,
    x_max: f32,
    y_min: f32,
    y_max: f32,
}

impl Bounds {
    fn from_points<'a>(points: impl Iterator<Item = &'a (f32, f32)>) -> Self {
        let mut bounds = Bounds {
            x_min: f32::INFINITY,
            x_max: f32::NEG_INFINITY,
            y_min: f32::INFINITY,
            y_max: f32::NEG_INFINITY,
        };
        for &(x, y) in points {
            bounds.x_min = bounds.x_min.min(x);
            bounds.x_max = bounds.x_max.max(x);
            bounds.y_min = bounds.y_min.min(y);
            bounds.y_max = bounds.y_max.max(y);
        }
        bounds.pad_degenerate();
        bounds
    }

    /// Widen zero-extent axes so coordinate mapping stays finite.
    fn pad_degenerate(&mut self) {
        if !self.x_min.is_finite() || !self.x_max.is_finite() {
            self.x_min = 0.0;
            self.x_max = 1.0;
        }
        if !self.y_min.is_finite() || !self.y_max.is_finite() {
            self.y_min = 0.0;
            self.y_max = 1.0;
        }
        if self.x_max == self.x_min {
            self.x_min -= 0.5;
            self.x_max += 0.5;
        }
        if self.y_max == self.y_min {
            self.y_min -= 0.5;
            self.y_max += 0.5;
        }
    }

    fn to_px(&self, x: f32, y: f32) -> (f32, f32) {
        let plot_w = (WIDTH - 2 * MARGIN) as f32;
        let plot_h = (HEIGHT - 2 * MARGIN) as f32;
        let px = MARGIN as f32 + (x - self.x_min) / (self.x_max - self.x_min) * plot_w;
        let py = (HEIGHT - MARGIN) as f32 - (y - self.y_min) / (self.y_max - self.y_min) * plot_h;
        (px, py)
    }

    fn to_cell(&self, x: f32, y: f32) -> (usize, usize) {
        let col = ((x - self.x_min) / (self.x_max - self.x_min) * (ASCII_COLS - 1) as f32)
            .round()
            .clamp(0.0, (ASCII_COLS - 1) as f32) as usize;
        let row = ((self.y_max - y) / (self.y_max - self.y_min) * (ASCII_ROWS - 1) as f32)
            .round()
            .clamp(0.0, (ASCII_ROWS - 1) as f32) as usize;
        (col, row)
    }
}

/// Stack two rendered charts into one SVG document, top over bottom.
pub fn stack_vertical(top: &str, bottom: &str) -> String {
    format!(
        r#"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 {w} {h}"><svg y="0" width="{w}" height="{p}" viewBox="0 0 {w} {p}">{top}</svg><svg y="{p}" width="{w}" height="{p}" viewBox="0 0 {w} {p}">{bottom}</svg></svg>"#,
        w = WIDTH,
        h = HEIGHT * 2,
        p = HEIGHT,
        top = top,
        bottom = bottom
    )
}

fn svg_header(title: &str) -> String {
    let mut svg = format!(
        r#"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 {} {}">"#,
        WIDTH, HEIGHT
    );
    svg.push_str(&format!(
        r#"<rect width="{}" height="{}" fill="white"/>"#,
        WIDTH, HEIGHT
    ));
    svg.push_str(&format!(
        r#"<text x="{}" y="25" text-anchor="middle" font-size="16" font-weight="bold">{}</text>"#,
        WIDTH / 2,
        title
    ));
    svg
}

fn svg_axes(svg: &mut String, bounds: &Bounds, x_label: &str, y_label: &str) {
    let x0 = MARGIN;
    let y0 = HEIGHT - MARGIN;
    svg.push_str(&format!(
        r#"<line x1="{x0}" y1="{y0}" x2="{}" y2="{y0}" stroke="black"/>"#,
        WIDTH - MARGIN
    ));
    svg.push_str(&format!(
        r#"<line x1="{x0}" y1="{}" x2="{x0}" y2="{y0}" stroke="black"/>"#,
        MARGIN
    ));
    // Axis extent labels.
    svg.push_str(&format!(
        r#"<text x="{x0}" y="{}" font-size="10" text-anchor="middle">{:.3}</text>"#,
        y0 + 15,
        bounds.x_min
    ));
    svg.push_str(&format!(
        r#"<text x="{}" y="{}" font-size="10" text-anchor="middle">{:.3}</text>"#,
        WIDTH - MARGIN,
        y0 + 15,
        bounds.x_max
    ));
    svg.push_str(&format!(
        r#"<text x="{}" y="{y0}" font-size="10" text-anchor="end">{:.4}</text>"#,
        x0 - 5,
        bounds.y_min
    ));
    svg.push_str(&format!(
        r#"<text x="{}" y="{}" font-size="10" text-anchor="end">{:.4}</text>"#,
        x0 - 5,
        MARGIN,
        bounds.y_max
    ));
    svg.push_str(&format!(
        r#"<text x="{}" y="{}" text-anchor="middle" font-size="12">{}</text>"#,
        WIDTH / 2,
        HEIGHT - 15,
        x_label
    ));
    svg.push_str(&format!(
        r#"<text x="15" y="{}" text-anchor="middle" font-size="12" transform="rotate(-90 15 {})">{}</text>"#,
        HEIGHT / 2,
        HEIGHT / 2,
        y_label
    ));
}

/// Multi-series line chart with optional point annotations.
#[derive(Debug, Clone)]
pub struct LineChart {
    pub title: String,
    pub x_label: String,
    pub y_label: String,
    pub series: Vec<Series>,
    pub markers: Vec<Marker>,
}

impl LineChart {
    pub fn new(
        title: impl Into<String>,
        x_label: impl Into<String>,
        y_label: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            x_label: x_label.into(),
            y_label: y_label.into(),
            series: Vec::new(),
            markers: Vec::new(),
        }
    }

    pub fn add_series(&mut self, series: Series) -> &mut Self {
        self.series.push(series);
        self
    }

    pub fn add_marker(&mut self, marker: Marker) -> &mut Self {
        self.markers.push(marker);
        self
    }

    fn bounds(&self) -> Bounds {
        Bounds::from_points(self.series.iter().flat_map(|s| s.points.iter()))
    }

    pub fn render_svg(&self) -> String {
        let bounds = self.bounds();
        let mut svg = svg_header(&self.title);
        svg_axes(&mut svg, &bounds, &self.x_label, &self.y_label);

        for (idx, series) in self.series.iter().enumerate() {
            let color = PALETTE[idx % PALETTE.len()];
            let path: Vec<String> = series
                .points
                .iter()
                .map(|&(x, y)| {
                    let (px, py) = bounds.to_px(x, y);
                    format!("{:.1},{:.1}", px, py)
                })
                .collect();
            if !path.is_empty() {
                svg.push_str(&format!(
                    r#"<polyline points="{}" fill="none" stroke="{}" stroke-width="1.5"/>"#,
                    path.join(" "),
                    color
                ));
            }
            // Legend entry.
            svg.push_str(&format!(
                r#"<text x="{}" y="{}" font-size="11" fill="{}">{}</text>"#,
                WIDTH - MARGIN - 130,
                MARGIN + 15 * (idx + 1),
                color,
                series.label
            ));
        }

        for marker in &self.markers {
            let (px, py) = bounds.to_px(marker.x, marker.y);
            svg.push_str(&format!(
                r#"<circle cx="{:.1}" cy="{:.1}" r="3" fill="red"/>"#,
                px, py
            ));
            svg.push_str(&format!(
                r#"<text x="{:.1}" y="{:.1}" font-size="9" fill="red">{}</text>"#,
                px + 4.0,
                py - 4.0,
                marker.label
            ));
        }

        svg.push_str("</svg>");
        svg
    }

    pub fn render_ascii(&self) -> String {
        let bounds = self.bounds();
        let mut grid = vec![vec![' '; ASCII_COLS]; ASCII_ROWS];
        for (idx, series) in self.series.iter().enumerate() {
            let mark = ASCII_MARKS[idx % ASCII_MARKS.len()];
            for &(x, y) in &series.points {
                let (col, row) = bounds.to_cell(x, y);
                grid[row][col] = mark;
            }
        }

        let mut out = String::new();
        out.push_str(&self.title);
        out.push('\n');
        out.push_str(&"-".repeat(self.title.len()));
        out.push('\n');
        out.push_str(&format!("{:>10.4} |", bounds.y_max));
        out.push('\n');
        for row in &grid {
            out.push_str("           |");
            out.extend(row.iter());
            out.push('\n');
        }
        out.push_str(&format!("{:>10.4} +", bounds.y_min));
        out.push_str(&"-".repeat(ASCII_COLS));
        out.push('\n');
        for (idx, series) in self.series.iter().enumerate() {
            out.push_str(&format!(
                "  {} {}\n",
                ASCII_MARKS[idx % ASCII_MARKS.len()],
                series.label
            ));
        }
        out
    }
}

/// Scatter chart, optionally with the identity diagonal as a reference line.
#[derive(Debug, Clone)]
pub struct ScatterChart {
    pub title: String,
    pub x_label: String,
    pub y_label: String,
    pub points: Vec<(f32, f32)>,
    pub diagonal: bool,
}

impl ScatterChart {
    pub fn new(
        title: impl Into<String>,
        x_label: impl Into<String>,
        y_label: impl Into<String>,
        points: Vec<(f32, f32)>,
    ) -> Self {
        Self {
            title: title.into(),
            x_label: x_label.into(),
            y_label: y_label.into(),
            points,
            diagonal: false,
        }
    }

    pub fn with_diagonal(mut self) -> Self {
        self.diagonal = true;
        self
    }

    fn bounds(&self) -> Bounds {
        let mut bounds = Bounds::from_points(self.points.iter());
        if self.diagonal {
            // Square axes so the identity line is at 45 degrees.
            let lo = bounds.x_min.min(bounds.y_min);
            let hi = bounds.x_max.max(bounds.y_max);
            bounds = Bounds {
                x_min: lo,
                x_max: hi,
                y_min: lo,
                y_max: hi,
            };
        }
        bounds
    }

    pub fn render_svg(&self) -> String {
        let bounds = self.bounds();
        let mut svg = svg_header(&self.title);
        svg_axes(&mut svg, &bounds, &self.x_label, &self.y_label);

        if self.diagonal {
            let (x1, y1) = bounds.to_px(bounds.x_min, bounds.y_min);
            let (x2, y2) = bounds.to_px(bounds.x_max, bounds.y_max);
            svg.push_str(&format!(
                r##"<line x1="{:.1}" y1="{:.1}" x2="{:.1}" y2="{:.1}" stroke="#d62728" stroke-dasharray="6 4"/>"##,
                x1, y1, x2, y2
            ));
        }
        for &(x, y) in &self.points {
            let (px, py) = bounds.to_px(x, y);
            svg.push_str(&format!(
                r##"<circle cx="{:.1}" cy="{:.1}" r="2.5" fill="#1f77b4" fill-opacity="0.6"/>"##,
                px, py
            ));
        }
        svg.push_str("</svg>");
        svg
    }

    pub fn render_ascii(&self) -> String {
        let bounds = self.bounds();
        let mut grid = vec![vec![' '; ASCII_COLS]; ASCII_ROWS];
        if self.diagonal {
            for i in 0..ASCII_COLS.min(ASCII_ROWS * 4) {
                let t = i as f32 / (ASCII_COLS - 1) as f32;
                let v = bounds.x_min + t * (bounds.x_max - bounds.x_min);
                let (col, row) = bounds.to_cell(v, v);
                grid[row][col] = '.';
            }
        }
        for &(x, y) in &self.points {
            let (col, row) = bounds.to_cell(x, y);
            grid[row][col] = '*';
        }
        let mut out = String::new();
        out.push_str(&self.title);
        out.push('\n');
        for row in &grid {
            out.extend(row.iter());
            out.push('\n');
        }
        out
    }
}

/// Fixed-bin histogram over a value series.
#[derive(Debug, Clone)]
pub struct Histogram {
    pub title: String,
    pub x_label: String,
    pub values: Vec<f32>,
    pub bins: usize,
}

impl Histogram {
    pub fn new(title: impl Into<String>, x_label: impl Into<String>, values: Vec<f32>) -> Self {
        Self {
            title: title.into(),
            x_label: x_label.into(),
            values,
            bins: 100,
        }
    }

    /// Bin counts plus the value range they cover.
    pub fn bin_counts(&self) -> (Vec<usize>, f32, f32) {
        let mut counts = vec![0usize; self.bins];
        if self.values.is_empty() {
            return (counts, 0.0, 1.0);
        }
        let min = self.values.iter().cloned().fold(f32::INFINITY, f32::min);
        let max = self
            .values
            .iter()
            .cloned()
            .fold(f32::NEG_INFINITY, f32::max);
        let span = if max > min { max - min } else { 1.0 };
        for &v in &self.values {
            let idx = (((v - min) / span) * self.bins as f32) as usize;
            counts[idx.min(self.bins - 1)] += 1;
        }
        (counts, min, max)
    }

    pub fn render_svg(&self) -> String {
        let (counts, min, max) = self.bin_counts();
        let peak = counts.iter().copied().max().unwrap_or(0).max(1);
        let bounds = Bounds {
            x_min: min,
            x_max: max.max(min + 1.0),
            y_min: 0.0,
            y_max: peak as f32,
        };
        let mut svg = svg_header(&self.title);
        svg_axes(&mut svg, &bounds, &self.x_label, "count");

        let plot_w = (WIDTH - 2 * MARGIN) as f32;
        let plot_h = (HEIGHT - 2 * MARGIN) as f32;
        let bar_w = plot_w / self.bins as f32;
        for (i, &count) in counts.iter().enumerate() {
            if count == 0 {
                continue;
            }
            let h = count as f32 / peak as f32 * plot_h;
            let x = MARGIN as f32 + i as f32 * bar_w;
            let y = (HEIGHT - MARGIN) as f32 - h;
            svg.push_str(&format!(
                r##"<rect x="{:.1}" y="{:.1}" width="{:.2}" height="{:.1}" fill="#1f77b4"/>"##,
                x, y, bar_w, h
            ));
        }
        svg.push_str("</svg>");
        svg
    }

    pub fn render_ascii(&self) -> String {
        let (counts, min, max) = self.bin_counts();
        // Fold fine bins down to terminal width.
        let cols = ASCII_COLS.min(self.bins);
        let per_col = self.bins.div_ceil(cols);
        let folded: Vec<usize> = counts
            .chunks(per_col)
            .map(|chunk| chunk.iter().sum())
            .collect();
        let peak = folded.iter().copied().max().unwrap_or(0).max(1);

        let mut out = String::new();
        out.push_str(&self.title);
        out.push('\n');
        for row in (1..=ASCII_ROWS).rev() {
            let threshold = row as f32 / ASCII_ROWS as f32;
            for &count in &folded {
                if count as f32 / peak as f32 >= threshold {
                    out.push('#');
                } else {
                    out.push(' ');
                }
            }
            out.push('\n');
        }
        out.push_str(&format!("{:.3}{:>width$.3}\n", min, max, width = cols - 5));
        out
    }
}
