//! Four-panel HTML chart.
//!
//! Produces one self-contained HTML document with an inline SVG: four panels
//! stacked vertically on a shared date axis, one per metric in canonical
//! order. No scripts, no external assets.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use cryptodash_core::data::EtfMode;
use cryptodash_core::{AlignedTable, Metric};
use std::fmt::Write as _;
use std::path::Path;
use tracing::info;

const WIDTH: f64 = 1100.0;
const PANEL_HEIGHT: f64 = 240.0;
const PANEL_GAP: f64 = 56.0;
const MARGIN_LEFT: f64 = 90.0;
const MARGIN_RIGHT: f64 = 30.0;
const MARGIN_TOP: f64 = 40.0;
const AXIS_SPACE: f64 = 40.0;
const Y_TICKS: usize = 5;
const X_TICKS: usize = 6;

const BACKGROUND: &str = "#111111";
const PANEL_BG: &str = "#1b1b1b";
const GRID: &str = "#333333";
const TEXT: &str = "#dddddd";
const MUTED: &str = "#777777";
const POSITIVE: &str = "#26a69a";
const NEGATIVE: &str = "#ef5350";

/// How a panel draws its column.
#[derive(Debug, Clone, Copy, PartialEq)]
enum Style {
    Line(&'static str),
    Bars(BarColor),
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum BarColor {
    Fixed(&'static str),
    BySign,
}

/// Renders the dashboard chart for an aligned table.
#[derive(Debug, Clone)]
pub struct ChartRenderer {
    pub title: String,
    pub etf_mode: EtfMode,
}

impl Default for ChartRenderer {
    fn default() -> Self {
        Self {
            title: "Crypto Dashboard".to_string(),
            etf_mode: EtfMode::VolumeProxy,
        }
    }
}

impl ChartRenderer {
    pub fn new(etf_mode: EtfMode) -> Self {
        Self {
            etf_mode,
            ..Self::default()
        }
    }

    fn panel_title(&self, metric: Metric) -> &'static str {
        match metric {
            Metric::StablecoinMarketCap => "Stablecoin Liquidity (DeFiLlama)",
            Metric::EtfVolumeProxy => match self.etf_mode {
                EtfMode::VolumeProxy => "IBIT ETF Volume (Yahoo Finance Proxy)",
                EtfMode::NetFlow => "IBIT ETF Net Flow",
            },
            Metric::BtcRealizedCap => "BTC Realized Cap (CoinMetrics)",
            Metric::BinanceBtcOi => "Binance Open Interest",
        }
    }

    fn panel_style(&self, metric: Metric) -> Style {
        match metric {
            Metric::StablecoinMarketCap => Style::Line("#4caf50"),
            Metric::EtfVolumeProxy => match self.etf_mode {
                EtfMode::VolumeProxy => Style::Bars(BarColor::Fixed("#ff9800")),
                EtfMode::NetFlow => Style::Bars(BarColor::BySign),
            },
            Metric::BtcRealizedCap => Style::Line("#42a5f5"),
            Metric::BinanceBtcOi => Style::Line("#ef5350"),
        }
    }

    /// Build the HTML document, or `None` for a vacuous table.
    pub fn render(&self, table: &AlignedTable) -> Option<String> {
        if table.is_vacuous() {
            return None;
        }
        let (first, last) = (table.first_date()?, table.last_date()?);
        let axis = DateAxis::new(first, last);

        let height = MARGIN_TOP + 4.0 * (PANEL_HEIGHT + PANEL_GAP) + AXIS_SPACE;
        let mut svg = format!(
            "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{WIDTH}\" height=\"{height}\" \
             viewBox=\"0 0 {WIDTH} {height}\" font-family=\"sans-serif\" font-size=\"11\">\n\
             <rect width=\"100%\" height=\"100%\" fill=\"{BACKGROUND}\"/>\n"
        );

        for (i, metric) in Metric::ALL.into_iter().enumerate() {
            let top = MARGIN_TOP + i as f64 * (PANEL_HEIGHT + PANEL_GAP);
            let is_bottom = i + 1 == Metric::ALL.len();
            self.render_panel(&mut svg, table, metric, top, &axis, is_bottom);
        }
        svg.push_str("</svg>\n");

        let subtitle = format!("{first} to {last} ({} days)", table.len());
        Some(format!(
            "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n\
             <title>{title}</title>\n\
             <style>body{{background:{BACKGROUND};color:{TEXT};font-family:sans-serif;margin:24px}}\
             h1{{font-weight:400;margin:0 0 4px}}p{{color:{MUTED};margin:0 0 12px}}</style>\n\
             </head>\n<body>\n<h1>{title}</h1>\n<p>{subtitle}</p>\n{svg}</body>\n</html>\n",
            title = escape(&self.title),
        ))
    }

    /// Render and write the chart. Returns `false` (and writes nothing) when
    /// the table is vacuous.
    pub fn write(&self, table: &AlignedTable, path: &Path) -> Result<bool> {
        let Some(html) = self.render(table) else {
            info!("table is empty or all-null, skipping chart");
            return Ok(false);
        };

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create chart directory {}", parent.display()))?;
        }
        std::fs::write(path, html)
            .with_context(|| format!("Failed to write chart {}", path.display()))?;
        info!(path = %path.display(), "chart written");
        Ok(true)
    }

    fn render_panel(
        &self,
        svg: &mut String,
        table: &AlignedTable,
        metric: Metric,
        top: f64,
        axis: &DateAxis,
        is_bottom: bool,
    ) {
        let bottom = top + PANEL_HEIGHT;
        let right = WIDTH - MARGIN_RIGHT;
        let _ = writeln!(
            svg,
            "<text x=\"{MARGIN_LEFT}\" y=\"{}\" fill=\"{TEXT}\" font-size=\"14\">{}</text>",
            top - 10.0,
            escape(self.panel_title(metric))
        );
        let _ = writeln!(
            svg,
            "<rect x=\"{MARGIN_LEFT}\" y=\"{top}\" width=\"{}\" height=\"{PANEL_HEIGHT}\" fill=\"{PANEL_BG}\"/>",
            right - MARGIN_LEFT
        );

        // Shared vertical grid so panels line up by date.
        for date in axis.ticks(X_TICKS) {
            let x = axis.x(date);
            let _ = writeln!(
                svg,
                "<line x1=\"{x:.1}\" y1=\"{top}\" x2=\"{x:.1}\" y2=\"{bottom}\" stroke=\"{GRID}\"/>"
            );
            if is_bottom {
                let _ = writeln!(
                    svg,
                    "<text x=\"{x:.1}\" y=\"{}\" fill=\"{MUTED}\" text-anchor=\"middle\">{date}</text>",
                    bottom + 18.0
                );
            }
        }

        let points: Vec<(NaiveDate, f64)> = table
            .rows()
            .iter()
            .filter_map(|r| r.record.get(metric).map(|v| (r.date, v)))
            .collect();

        if points.is_empty() {
            let _ = writeln!(
                svg,
                "<text x=\"{:.1}\" y=\"{:.1}\" fill=\"{MUTED}\" text-anchor=\"middle\">no data</text>",
                (MARGIN_LEFT + right) / 2.0,
                top + PANEL_HEIGHT / 2.0
            );
            return;
        }

        let style = self.panel_style(metric);
        let scale = ValueScale::new(
            points.iter().map(|(_, v)| *v),
            matches!(style, Style::Bars(_)),
            top,
            bottom,
        );

        for tick in scale.ticks(Y_TICKS) {
            let y = scale.y(tick);
            let _ = writeln!(
                svg,
                "<line x1=\"{MARGIN_LEFT}\" y1=\"{y:.1}\" x2=\"{right}\" y2=\"{y:.1}\" stroke=\"{GRID}\"/>\n\
                 <text x=\"{:.1}\" y=\"{:.1}\" fill=\"{MUTED}\" text-anchor=\"end\">{}</text>",
                MARGIN_LEFT - 6.0,
                y + 4.0,
                compact(tick)
            );
        }

        match style {
            Style::Line(color) => render_line(svg, table, metric, axis, &scale, color),
            Style::Bars(color) => render_bars(svg, &points, axis, &scale, color),
        }
    }
}

/// Polyline broken at nulls (leading gaps only, after forward-fill).
fn render_line(
    svg: &mut String,
    table: &AlignedTable,
    metric: Metric,
    axis: &DateAxis,
    scale: &ValueScale,
    color: &str,
) {
    let mut path = String::new();
    let mut pen_down = false;
    for row in table.rows() {
        match row.record.get(metric) {
            Some(v) => {
                let cmd = if pen_down { 'L' } else { 'M' };
                let _ = write!(path, "{cmd}{:.1},{:.1} ", axis.x(row.date), scale.y(v));
                pen_down = true;
            }
            None => pen_down = false,
        }
    }
    let _ = writeln!(
        svg,
        "<path d=\"{}\" fill=\"none\" stroke=\"{color}\" stroke-width=\"1.5\"/>",
        path.trim_end()
    );
}

fn render_bars(
    svg: &mut String,
    points: &[(NaiveDate, f64)],
    axis: &DateAxis,
    scale: &ValueScale,
    color: BarColor,
) {
    let bar_width = (axis.day_width() * 0.8).max(1.0);
    let zero = scale.y(0.0);
    for &(date, value) in points {
        let y = scale.y(value);
        let (rect_y, rect_h) = if y < zero { (y, zero - y) } else { (zero, y - zero) };
        let fill = match color {
            BarColor::Fixed(c) => c,
            BarColor::BySign if value < 0.0 => NEGATIVE,
            BarColor::BySign => POSITIVE,
        };
        let _ = writeln!(
            svg,
            "<rect x=\"{:.1}\" y=\"{rect_y:.1}\" width=\"{bar_width:.1}\" height=\"{:.1}\" fill=\"{fill}\">\
             <title>{date}: {}</title></rect>",
            axis.x(date) - bar_width / 2.0,
            rect_h.max(0.5),
            compact(value)
        );
    }
}

/// Maps dates onto the shared horizontal axis.
#[derive(Debug, Clone, Copy)]
struct DateAxis {
    first: NaiveDate,
    span_days: i64,
}

impl DateAxis {
    fn new(first: NaiveDate, last: NaiveDate) -> Self {
        Self {
            first,
            span_days: (last - first).num_days().max(0),
        }
    }

    fn plot_width() -> f64 {
        WIDTH - MARGIN_LEFT - MARGIN_RIGHT
    }

    fn x(&self, date: NaiveDate) -> f64 {
        let inset = self.day_width() / 2.0;
        let offset = (date - self.first).num_days() as f64;
        MARGIN_LEFT + inset + offset * self.day_width()
    }

    /// Horizontal space per calendar day.
    fn day_width(&self) -> f64 {
        Self::plot_width() / (self.span_days + 1) as f64
    }

    fn ticks(&self, count: usize) -> Vec<NaiveDate> {
        if self.span_days == 0 || count < 2 {
            return vec![self.first];
        }
        let step = self.span_days as f64 / (count - 1) as f64;
        let mut ticks: Vec<NaiveDate> = (0..count)
            .map(|i| self.first + chrono::Duration::days((i as f64 * step).round() as i64))
            .collect();
        ticks.dedup();
        ticks
    }
}

/// Maps values onto one panel's vertical extent.
#[derive(Debug, Clone, Copy)]
struct ValueScale {
    min: f64,
    max: f64,
    top: f64,
    bottom: f64,
}

impl ValueScale {
    fn new(values: impl Iterator<Item = f64>, include_zero: bool, top: f64, bottom: f64) -> Self {
        let (mut min, mut max) = values.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
            (lo.min(v), hi.max(v))
        });
        if include_zero {
            min = min.min(0.0);
            max = max.max(0.0);
        }
        if (max - min).abs() < f64::EPSILON {
            let pad = if max == 0.0 { 1.0 } else { max.abs() * 0.05 };
            min -= pad;
            max += pad;
        } else {
            let pad = (max - min) * 0.05;
            if !(include_zero && min == 0.0) {
                min -= pad;
            }
            max += pad;
        }
        Self { min, max, top, bottom }
    }

    fn y(&self, value: f64) -> f64 {
        let frac = (value - self.min) / (self.max - self.min);
        self.bottom - frac * (self.bottom - self.top)
    }

    fn ticks(&self, count: usize) -> Vec<f64> {
        let step = (self.max - self.min) / (count - 1) as f64;
        (0..count).map(|i| self.min + i as f64 * step).collect()
    }
}

/// Compact axis label: 1.23T, 45.6B, 7.80M, 12.0K.
fn compact(value: f64) -> String {
    let abs = value.abs();
    if abs >= 1e12 {
        format!("{:.2}T", value / 1e12)
    } else if abs >= 1e9 {
        format!("{:.2}B", value / 1e9)
    } else if abs >= 1e6 {
        format!("{:.2}M", value / 1e6)
    } else if abs >= 1e3 {
        format!("{:.1}K", value / 1e3)
    } else {
        format!("{value:.2}")
    }
}

fn escape(s: &str) -> String {
    s.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;")
}
