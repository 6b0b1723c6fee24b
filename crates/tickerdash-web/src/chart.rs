//! Inline SVG candlestick chart with VWAP, MA and Bollinger overlays.
//!
//! Rising candles are red and falling candles blue, as on Korean trading
//! screens.

use std::fmt::Write;

use tickerdash_core::{BarSeries, IndicatorFrame};

const UP_COLOR: &str = "#e0294a";
const DOWN_COLOR: &str = "#1f6fd1";
const VWAP_COLOR: &str = "#8e44ad";
const MA_COLOR: &str = "#f39c12";
const BAND_COLOR: &str = "#95a5a6";

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChartSize {
    pub width: f64,
    pub height: f64,
    pub padding: f64,
}

impl Default for ChartSize {
    fn default() -> Self {
        Self {
            width: 960.0,
            height: 420.0,
            padding: 40.0,
        }
    }
}

struct Scale {
    min: f64,
    max: f64,
    size: ChartSize,
    count: usize,
}

impl Scale {
    fn slot(&self) -> f64 {
        (self.size.width - 2.0 * self.size.padding) / self.count as f64
    }

    fn x(&self, index: usize) -> f64 {
        self.size.padding + self.slot() * (index as f64 + 0.5)
    }

    fn y(&self, price: f64) -> f64 {
        let plot = self.size.height - 2.0 * self.size.padding;
        let span = (self.max - self.min).max(f64::EPSILON);
        self.size.padding + plot * (self.max - price) / span
    }
}

/// Renders `series` with the overlays from `frame` (which must be computed
/// from the same series).
pub fn candlestick_svg(series: &BarSeries, frame: &IndicatorFrame, size: ChartSize) -> String {
    let ChartSize { width, height, .. } = size;
    let mut svg = format!(
        r#"<svg class="chart" viewBox="0 0 {width} {height}" xmlns="http://www.w3.org/2000/svg" role="img" aria-label="{} price chart">"#,
        series.symbol
    );

    if series.is_empty() {
        let _ = write!(
            svg,
            r#"<text x="{}" y="{}" text-anchor="middle">no price data</text></svg>"#,
            width / 2.0,
            height / 2.0
        );
        return svg;
    }

    let overlays = [&frame.vwap, &frame.ma, &frame.bb_upper, &frame.bb_lower];
    let (mut min, mut max) = series
        .bars
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), bar| {
            (lo.min(bar.low), hi.max(bar.high))
        });
    for value in overlays.iter().flat_map(|column| column.iter().flatten()) {
        min = min.min(*value);
        max = max.max(*value);
    }
    let pad = (max - min) * 0.03;
    let scale = Scale {
        min: min - pad,
        max: max + pad,
        size,
        count: series.len(),
    };

    write_grid(&mut svg, &scale);

    let body_width = (scale.slot() * 0.7).max(1.0);
    for (index, bar) in series.bars.iter().enumerate() {
        let color = if bar.is_up() { UP_COLOR } else { DOWN_COLOR };
        let x = scale.x(index);
        let top = scale.y(bar.open.max(bar.close));
        let bottom = scale.y(bar.open.min(bar.close));
        let _ = write!(
            svg,
            r#"<g class="candle"><line x1="{x:.2}" y1="{:.2}" x2="{x:.2}" y2="{:.2}" stroke="{color}"/><rect x="{:.2}" y="{top:.2}" width="{body_width:.2}" height="{:.2}" fill="{color}"/></g>"#,
            scale.y(bar.high),
            scale.y(bar.low),
            x - body_width / 2.0,
            (bottom - top).max(0.5),
        );
    }

    write_overlay(&mut svg, &scale, &frame.bb_upper, "bb-upper", BAND_COLOR, Some("2 3"));
    write_overlay(&mut svg, &scale, &frame.bb_lower, "bb-lower", BAND_COLOR, Some("2 3"));
    write_overlay(&mut svg, &scale, &frame.ma, "ma", MA_COLOR, None);
    write_overlay(&mut svg, &scale, &frame.vwap, "vwap", VWAP_COLOR, Some("6 4"));

    if let (Some(first), Some(last)) = (series.bars.first(), series.bars.last()) {
        let baseline = height - size.padding / 3.0;
        let _ = write!(
            svg,
            r#"<text class="axis" x="{:.2}" y="{baseline:.2}">{}</text><text class="axis" x="{:.2}" y="{baseline:.2}" text-anchor="end">{}</text>"#,
            size.padding,
            first.ts.format_date(),
            width - size.padding,
            last.ts.format_date(),
        );
    }

    svg.push_str("</svg>");
    svg
}

fn write_grid(svg: &mut String, scale: &Scale) {
    const LINES: usize = 4;
    for step in 0..=LINES {
        let price = scale.min + (scale.max - scale.min) * step as f64 / LINES as f64;
        let y = scale.y(price);
        let _ = write!(
            svg,
            r##"<line class="grid" x1="{:.2}" y1="{y:.2}" x2="{:.2}" y2="{y:.2}" stroke="#e5e5e5"/><text class="axis" x="{:.2}" y="{:.2}" text-anchor="end">{}</text>"##,
            scale.size.padding,
            scale.size.width - scale.size.padding,
            scale.size.padding - 4.0,
            y + 4.0,
            axis_label(price),
        );
    }
}

/// One `<path>`; warm-up gaps break the line instead of dropping to zero.
fn write_overlay(
    svg: &mut String,
    scale: &Scale,
    column: &[Option<f64>],
    class: &str,
    color: &str,
    dash: Option<&str>,
) {
    let mut path = String::new();
    let mut pen_down = false;
    for (index, value) in column.iter().enumerate() {
        match value {
            Some(price) => {
                let cmd = if pen_down { 'L' } else { 'M' };
                let _ = write!(path, "{cmd}{:.2} {:.2} ", scale.x(index), scale.y(*price));
                pen_down = true;
            }
            None => pen_down = false,
        }
    }
    if path.is_empty() {
        return;
    }
    let dash = dash
        .map(|pattern| format!(r#" stroke-dasharray="{pattern}""#))
        .unwrap_or_default();
    let _ = write!(
        svg,
        r#"<path class="{class}" d="{}" fill="none" stroke="{color}" stroke-width="1.5"{dash}/>"#,
        path.trim_end()
    );
}

fn axis_label(price: f64) -> String {
    if price.abs() >= 1_000.0 {
        format!("{price:.0}")
    } else {
        format!("{price:.2}")
    }
}
