//! Star history charts rendered as SVG.

pub mod math;
pub mod style;
pub mod svg;

use chrono::{DateTime, Utc};

use crate::error::{Result, StarChartsError};
use crate::types::StarEvent;
use math::{degrees_to_radians, nice_ticks, points_to_pixels, rotate_point, Point};
use style::{stylesheet, ChartStyle, WARNING_COLOR};
use svg::{document, num, Element};

pub const CHART_WIDTH: u32 = 1024;
pub const CHART_HEIGHT: u32 = 400;

const PADDING_LEFT: f64 = 90.0;
const PADDING_RIGHT: f64 = 30.0;
const PADDING_TOP: f64 = 20.0;
const PADDING_BOTTOM: f64 = 60.0;
const MAX_X_TICKS: usize = 8;
const MAX_Y_TICKS: usize = 6;
const SECONDS_PER_DAY: f64 = 86_400.0;
const DEFAULT_DPI: f64 = 92.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeriesPoint {
    pub at: DateTime<Utc>,
    pub count: u32,
}

/// Cumulative star count over time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Series {
    points: Vec<SeriesPoint>,
}

impl Series {
    /// Point `i` is the `i`-th star with count `i + 1`.
    ///
    /// Always yields at least two points so the axes have a span: a single star
    /// gets a second point at `now` with count 1. A repository without stars is
    /// drawn flat at zero from `created_at` to `now`; it never had a star, so no
    /// point claims a count of 1.
    pub fn from_stars(stars: &[StarEvent], created_at: DateTime<Utc>, now: DateTime<Utc>) -> Self {
        let mut points: Vec<SeriesPoint> = stars
            .iter()
            .enumerate()
            .map(|(i, star)| SeriesPoint {
                at: star.starred_at,
                count: i as u32 + 1,
            })
            .collect();

        match points.len() {
            0 => {
                points.push(SeriesPoint { at: created_at, count: 0 });
                points.push(SeriesPoint { at: now, count: 0 });
            }
            1 => points.push(SeriesPoint { at: now, count: 1 }),
            _ => {}
        }

        Self { points }
    }

    pub fn points(&self) -> &[SeriesPoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

/// Font settings, resolved once when the renderer is built.
#[derive(Debug, Clone, PartialEq)]
pub struct Typography {
    pub family: &'static str,
    pub tick_px: f64,
    pub title_px: f64,
}

impl Typography {
    pub fn resolve(dpi: f64) -> Self {
        Self {
            family: "Roboto, 'Helvetica Neue', Arial, sans-serif",
            tick_px: points_to_pixels(dpi, 8.0),
            title_px: points_to_pixels(dpi, 10.0),
        }
    }

    // Rough advance width; the layout only needs it to keep labels apart.
    fn text_width(&self, text: &str, size_px: f64) -> f64 {
        text.chars().count() as f64 * size_px * 0.6
    }
}

/// Axis range and its tick positions, in data units.
#[derive(Debug, Clone)]
struct Axis {
    ticks: Vec<f64>,
    low: f64,
    high: f64,
}

impl Axis {
    fn fit(min: f64, max: f64, max_ticks: usize) -> Self {
        let mut ticks = nice_ticks(min, max, max_ticks, 1.0);
        let low = ticks.first().copied().unwrap_or(min);
        let mut high = ticks.last().copied().unwrap_or(max);
        if high <= low {
            high = low + 1.0;
            ticks = vec![low, high];
        }
        Self { ticks, low, high }
    }

    fn scale(&self, value: f64) -> f64 {
        (value - self.low) / (self.high - self.low)
    }
}

pub struct ChartRenderer {
    width: u32,
    height: u32,
    typography: Typography,
}

impl Default for ChartRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl ChartRenderer {
    pub fn new() -> Self {
        Self::with_dpi(DEFAULT_DPI)
    }

    pub fn with_dpi(dpi: f64) -> Self {
        Self {
            width: CHART_WIDTH,
            height: CHART_HEIGHT,
            typography: Typography::resolve(dpi),
        }
    }

    pub fn typography(&self) -> &Typography {
        &self.typography
    }

    /// Draws `series` with a time axis and a stargazer axis.
    pub fn render(&self, series: &Series, style: &ChartStyle) -> Result<Vec<u8>> {
        if series.len() < 2 {
            return Err(StarChartsError::RenderFailure(format!(
                "a series needs at least 2 points, got {}",
                series.len()
            )));
        }

        let days: Vec<f64> = series.points().iter().map(|p| to_days(p.at)).collect();
        let counts: Vec<f64> = series.points().iter().map(|p| p.count as f64).collect();
        let x_axis = Axis::fit(min_of(&days), max_of(&days), MAX_X_TICKS);
        let y_axis = Axis::fit(min_of(&counts), max_of(&counts), MAX_Y_TICKS);

        let plot_left = PADDING_LEFT;
        let plot_right = self.width as f64 - PADDING_RIGHT;
        let plot_top = PADDING_TOP;
        let plot_bottom = self.height as f64 - PADDING_BOTTOM;
        let to_px = |x: f64| plot_left + x_axis.scale(x) * (plot_right - plot_left);
        let to_py = |y: f64| plot_bottom - y_axis.scale(y) * (plot_bottom - plot_top);

        let tick_px = self.typography.tick_px;
        let title_px = self.typography.title_px;

        let mut grid = Vec::new();
        let mut labels = Vec::new();

        for &tick in &y_axis.ticks {
            let y = to_py(tick);
            grid.push(line(plot_left, y, plot_right, y).attr("class", "grid").attr("stroke-width", 1));
            labels.push(
                self.tick_label(plot_left - 8.0, y + tick_px / 3.0, "end", style)
                    .text(format_count(tick)),
            );
        }
        for &tick in &x_axis.ticks {
            let x = to_px(tick);
            labels.push(
                self.tick_label(x, plot_bottom + tick_px + 8.0, "middle", style)
                    .text(format_day(tick)),
            );
        }

        let widest_y_label = y_axis
            .ticks
            .iter()
            .map(|t| self.typography.text_width(&format_count(*t), tick_px))
            .fold(0.0, f64::max);
        let y_title_anchor = self.rotated_title_anchor(
            "Stargazers",
            plot_left - 8.0 - widest_y_label - 8.0,
            (plot_top + plot_bottom) / 2.0,
        );

        let path = series_path(days.iter().zip(&counts).map(|(&d, &c)| (to_px(d), to_py(c))));

        let svg = document(self.width, self.height)
            .child(Element::new("style").raw(format!(
                "{}text{{font-family:{}}}",
                stylesheet(style.variant),
                self.typography.family
            )))
            .child(
                Element::new("rect")
                    .attr("class", "background")
                    .attr("width", self.width)
                    .attr("height", self.height)
                    .attr_opt("style", style.background_override()),
            )
            .child(Element::new("g").children(grid))
            .child(
                Element::new("path")
                    .attr("class", "series")
                    .attr("d", path)
                    .attr("fill", "none")
                    .attr("stroke-width", 2)
                    .attr("stroke-linejoin", "round")
                    .attr_opt("style", style.line_override()),
            )
            .child(
                Element::new("g")
                    .attr("class", "axis")
                    .attr("stroke-width", 2)
                    .attr_opt("style", style.axis_override())
                    .child(line(plot_left, plot_bottom, plot_right, plot_bottom))
                    .child(line(plot_left, plot_top, plot_left, plot_bottom)),
            )
            .child(Element::new("g").children(labels))
            .child(
                Element::new("text")
                    .attr("class", "title")
                    .attr("x", num((plot_left + plot_right) / 2.0))
                    .attr("y", num(self.height as f64 - 12.0))
                    .attr("text-anchor", "middle")
                    .attr("font-size", num(title_px))
                    .attr_opt("style", style.text_override())
                    .text("Time"),
            )
            .child(
                Element::new("text")
                    .attr("class", "title")
                    .attr("x", num(y_title_anchor.x))
                    .attr("y", num(y_title_anchor.y))
                    .attr("text-anchor", "middle")
                    .attr("font-size", num(title_px))
                    .attr(
                        "transform",
                        format!("rotate(-90 {} {})", num(y_title_anchor.x), num(y_title_anchor.y)),
                    )
                    .attr_opt("style", style.text_override())
                    .text("Stargazers"),
            );

        Ok(svg.render().into_bytes())
    }

    /// A chart-sized document showing `message` in the warning colour.
    pub fn render_error(&self, message: &str) -> Vec<u8> {
        document(self.width, self.height)
            .child(
                Element::new("text")
                    .attr("fill", WARNING_COLOR)
                    .attr("x", num(self.width as f64 / 2.0))
                    .attr("y", num(self.height as f64 / 2.0))
                    .attr("text-anchor", "middle")
                    .attr("dominant-baseline", "middle")
                    .attr("font-family", self.typography.family)
                    .attr("font-size", num(self.typography.title_px))
                    .text(message),
            )
            .render()
            .into_bytes()
    }

    fn tick_label(&self, x: f64, y: f64, anchor: &'static str, style: &ChartStyle) -> Element {
        Element::new("text")
            .attr("class", "tick")
            .attr("x", num(x))
            .attr("y", num(y))
            .attr("text-anchor", anchor)
            .attr("font-size", num(self.typography.tick_px))
            .attr_opt("style", style.text_override())
    }

    /// Anchor for a title rotated by -90 degrees whose rightmost edge must stay
    /// at or left of `right_edge`, vertically centred on `center_y`.
    fn rotated_title_anchor(&self, text: &str, right_edge: f64, center_y: f64) -> Point {
        let size = self.typography.title_px;
        let half_width = self.typography.text_width(text, size) / 2.0;
        let anchor = Point::new(0.0, center_y);
        let theta = degrees_to_radians(-90.0);

        // Corners of the unrotated box: text-anchor middle, baseline at anchor.
        let corners = [
            Point::new(-half_width, center_y),
            Point::new(half_width, center_y),
            Point::new(-half_width, center_y - size),
            Point::new(half_width, center_y - size),
        ];
        let (min_x, max_x) = corners
            .iter()
            .map(|corner| rotate_point(anchor, *corner, theta).x)
            .fold((f64::MAX, f64::MIN), |(lo, hi), x| (lo.min(x), hi.max(x)));

        // Keep the whole glyph box on the canvas.
        let x = (right_edge - max_x).max(-min_x + 2.0);
        Point::new(x, center_y)
    }
}

fn line(x1: f64, y1: f64, x2: f64, y2: f64) -> Element {
    Element::new("line")
        .attr("x1", num(x1))
        .attr("y1", num(y1))
        .attr("x2", num(x2))
        .attr("y2", num(y2))
}

/// Path through the pixel positions. Runs of points landing on the same pixel
/// column collapse to the last one.
fn series_path(points: impl Iterator<Item = (f64, f64)>) -> String {
    let mut kept: Vec<(f64, f64)> = Vec::new();
    for (x, y) in points {
        let kept_len = kept.len();
        match kept.last_mut() {
            Some(last) if kept_len > 1 && last.0.round() == x.round() => *last = (x, y),
            _ => kept.push((x, y)),
        }
    }

    let mut d = String::new();
    for (i, (x, y)) in kept.iter().enumerate() {
        d.push_str(if i == 0 { "M" } else { " L" });
        d.push_str(&num(*x));
        d.push(' ');
        d.push_str(&num(*y));
    }
    d
}

fn to_days(at: DateTime<Utc>) -> f64 {
    at.timestamp() as f64 / SECONDS_PER_DAY
}

fn format_day(days: f64) -> String {
    DateTime::<Utc>::from_timestamp((days * SECONDS_PER_DAY).round() as i64, 0)
        .map(|d| d.format("%Y-%m-%d").to_string())
        .unwrap_or_default()
}

fn format_count(value: f64) -> String {
    format!("{}", value.round() as i64)
}

fn min_of(values: &[f64]) -> f64 {
    values.iter().copied().fold(f64::INFINITY, f64::min)
}

fn max_of(values: &[f64]) -> f64 {
    values.iter().copied().fold(f64::NEG_INFINITY, f64::max)
}
