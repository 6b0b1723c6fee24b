//! Technical indicators over a bar series.
//!
//! Every function returns one entry per input value. Positions that are still
//! inside an indicator's warm-up window, or where the value is undefined, are
//! `None` rather than NaN.
//!
//! | Column | Function | Default |
//! |--------|----------|---------|
//! | `ma` | [`sma`] | 20 bars |
//! | `vwap` | [`vwap`] | cumulative from the first bar |
//! | `rsi` | [`rsi`] | 14 bars, simple rolling mean |
//! | `macd`, `macd_signal`, `macd_hist` | [`macd`] | 12 / 26 / 9 |
//! | `bb_mid`, `bb_upper`, `bb_lower` | [`bollinger`] | 20 bars, 2 sample std |

use serde::{Deserialize, Serialize};

use crate::{AnalysisError, BarSeries};

/// How average gains and losses are smoothed for RSI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RsiSmoothing {
    /// Plain rolling mean over the last `period` changes.
    #[default]
    Simple,
    /// Wilder's recursive smoothing, seeded with the first simple mean.
    Wilder,
}

/// Indicator windows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndicatorConfig {
    pub ma_window: usize,
    pub rsi_period: usize,
    pub rsi_smoothing: RsiSmoothing,
    pub macd_fast: usize,
    pub macd_slow: usize,
    pub macd_signal: usize,
    pub bollinger_window: usize,
    pub bollinger_k: f64,
}

impl Default for IndicatorConfig {
    fn default() -> Self {
        Self {
            ma_window: 20,
            rsi_period: 14,
            rsi_smoothing: RsiSmoothing::Simple,
            macd_fast: 12,
            macd_slow: 26,
            macd_signal: 9,
            bollinger_window: 20,
            bollinger_k: 2.0,
        }
    }
}

impl IndicatorConfig {
    /// Bars needed before MA, RSI, MACD line and Bollinger all have a value
    /// on the final bar.
    pub fn required_history(&self) -> usize {
        self.ma_window
            .max(self.bollinger_window)
            .max(self.rsi_period + 1)
            .max(self.macd_slow)
            .max(1)
    }
}

/// Simple moving average. The first `window - 1` entries are `None`.
pub fn sma(values: &[f64], window: usize) -> Vec<Option<f64>> {
    let mut out = vec![None; values.len()];
    if window == 0 {
        return out;
    }

    let mut sum = 0.0;
    for (i, value) in values.iter().enumerate() {
        sum += value;
        if i >= window {
            sum -= values[i - window];
        }
        if i + 1 >= window {
            out[i] = Some(sum / window as f64);
        }
    }
    out
}

/// Cumulative volume-weighted average price from the first bar.
///
/// `None` while cumulative volume is still zero.
pub fn vwap(closes: &[f64], volumes: &[f64]) -> Vec<Option<f64>> {
    let mut price_volume = 0.0;
    let mut volume = 0.0;
    closes
        .iter()
        .zip(volumes)
        .map(|(close, vol)| {
            price_volume += close * vol;
            volume += vol;
            (volume > 0.0).then(|| price_volume / volume)
        })
        .collect()
}

fn rsi_from_averages(avg_gain: f64, avg_loss: f64) -> f64 {
    if avg_loss == 0.0 {
        if avg_gain == 0.0 {
            50.0
        } else {
            100.0
        }
    } else {
        100.0 - 100.0 / (1.0 + avg_gain / avg_loss)
    }
}

/// Relative Strength Index. The first `period` entries are `None`.
///
/// A flat window (no gains, no losses) reads 50; a window without losses
/// reads 100.
pub fn rsi(closes: &[f64], period: usize, smoothing: RsiSmoothing) -> Vec<Option<f64>> {
    let mut out = vec![None; closes.len()];
    if period == 0 || closes.len() <= period {
        return out;
    }

    let changes: Vec<(f64, f64)> = closes
        .windows(2)
        .map(|pair| {
            let delta = pair[1] - pair[0];
            (delta.max(0.0), (-delta).max(0.0))
        })
        .collect();
    let p = period as f64;

    // changes[i] is the move into closes[i + 1]. Window sums are recomputed
    // rather than rolled so a window without losses is exactly zero.
    let window_means = |window: &[(f64, f64)]| {
        let gains: f64 = window.iter().map(|c| c.0).sum();
        let losses: f64 = window.iter().map(|c| c.1).sum();
        (gains / p, losses / p)
    };
    let (mut avg_gain, mut avg_loss) = window_means(&changes[..period]);
    out[period] = Some(rsi_from_averages(avg_gain, avg_loss));

    for i in period..changes.len() {
        let (gain, loss) = changes[i];
        match smoothing {
            RsiSmoothing::Simple => {
                (avg_gain, avg_loss) = window_means(&changes[i + 1 - period..=i]);
            }
            RsiSmoothing::Wilder => {
                avg_gain = (avg_gain * (p - 1.0) + gain) / p;
                avg_loss = (avg_loss * (p - 1.0) + loss) / p;
            }
        }
        out[i + 1] = Some(rsi_from_averages(avg_gain, avg_loss));
    }
    out
}

/// Exponential moving average with `alpha = 2 / (span + 1)`, seeded with the
/// first value (no warm-up).
pub fn ema(values: &[f64], span: usize) -> Vec<f64> {
    let alpha = 2.0 / (span.max(1) as f64 + 1.0);
    let mut out = Vec::with_capacity(values.len());
    let mut prev: Option<f64> = None;
    for &value in values {
        let next = match prev {
            Some(prev) => alpha * value + (1.0 - alpha) * prev,
            None => value,
        };
        out.push(next);
        prev = Some(next);
    }
    out
}

/// MACD line, signal line and histogram.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MacdSeries {
    pub line: Vec<Option<f64>>,
    pub signal: Vec<Option<f64>>,
    pub histogram: Vec<Option<f64>>,
}

/// MACD from first-value-seeded EMAs. The line is `None` for the first
/// `slow - 1` bars and the signal for a further `signal - 1` bars.
pub fn macd(closes: &[f64], fast: usize, slow: usize, signal: usize) -> MacdSeries {
    let fast_ema = ema(closes, fast);
    let slow_ema = ema(closes, slow);
    let line: Vec<f64> = fast_ema.iter().zip(&slow_ema).map(|(f, s)| f - s).collect();
    let signal_ema = ema(&line, signal);

    let line_start = slow.max(fast).saturating_sub(1);
    let signal_start = line_start + signal.saturating_sub(1);

    let mut out = MacdSeries {
        line: vec![None; closes.len()],
        signal: vec![None; closes.len()],
        histogram: vec![None; closes.len()],
    };
    for i in 0..closes.len() {
        if i >= line_start {
            out.line[i] = Some(line[i]);
        }
        if i >= signal_start {
            out.signal[i] = Some(signal_ema[i]);
            out.histogram[i] = Some(line[i] - signal_ema[i]);
        }
    }
    out
}

/// Bollinger middle, upper and lower bands.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct BollingerSeries {
    pub mid: Vec<Option<f64>>,
    pub upper: Vec<Option<f64>>,
    pub lower: Vec<Option<f64>>,
}

/// Bollinger bands around an SMA using the sample standard deviation
/// (`n - 1` denominator). Windows shorter than 2 have no deviation.
pub fn bollinger(closes: &[f64], window: usize, k: f64) -> BollingerSeries {
    let mid = sma(closes, window);
    let mut upper = vec![None; closes.len()];
    let mut lower = vec![None; closes.len()];

    if window >= 2 {
        for i in (window - 1)..closes.len() {
            let Some(mean) = mid[i] else { continue };
            let slice = &closes[i + 1 - window..=i];
            let variance = slice.iter().map(|v| (v - mean).powi(2)).sum::<f64>()
                / (window - 1) as f64;
            let band = k * variance.sqrt();
            upper[i] = Some(mean + band);
            lower[i] = Some(mean - band);
        }
    }

    BollingerSeries { mid, upper, lower }
}

/// Per-bar indicator columns aligned with the source series.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct IndicatorFrame {
    pub close: Vec<f64>,
    pub ma: Vec<Option<f64>>,
    pub vwap: Vec<Option<f64>>,
    pub rsi: Vec<Option<f64>>,
    pub macd: Vec<Option<f64>>,
    pub macd_signal: Vec<Option<f64>>,
    pub macd_hist: Vec<Option<f64>>,
    pub bb_mid: Vec<Option<f64>>,
    pub bb_upper: Vec<Option<f64>>,
    pub bb_lower: Vec<Option<f64>>,
}

/// Indicator values on a single bar.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IndicatorSnapshot {
    pub close: f64,
    pub ma: Option<f64>,
    pub vwap: Option<f64>,
    pub rsi: Option<f64>,
    pub macd: Option<f64>,
    pub macd_signal: Option<f64>,
    pub macd_hist: Option<f64>,
    pub bb_mid: Option<f64>,
    pub bb_upper: Option<f64>,
    pub bb_lower: Option<f64>,
}

impl IndicatorFrame {
    pub fn len(&self) -> usize {
        self.close.len()
    }

    pub fn is_empty(&self) -> bool {
        self.close.is_empty()
    }

    pub fn at(&self, index: usize) -> Option<IndicatorSnapshot> {
        let close = *self.close.get(index)?;
        let pick = |column: &[Option<f64>]| column.get(index).copied().flatten();
        Some(IndicatorSnapshot {
            close,
            ma: pick(&self.ma),
            vwap: pick(&self.vwap),
            rsi: pick(&self.rsi),
            macd: pick(&self.macd),
            macd_signal: pick(&self.macd_signal),
            macd_hist: pick(&self.macd_hist),
            bb_mid: pick(&self.bb_mid),
            bb_upper: pick(&self.bb_upper),
            bb_lower: pick(&self.bb_lower),
        })
    }

    /// Values on the most recent bar.
    pub fn latest(&self) -> Option<IndicatorSnapshot> {
        self.at(self.len().checked_sub(1)?)
    }
}

/// Computes every indicator column for `series`.
///
/// # Errors
///
/// [`AnalysisError::EmptySeries`] for an empty series and
/// [`AnalysisError::InsufficientHistory`] when there are fewer bars than
/// [`IndicatorConfig::required_history`].
pub fn compute(series: &BarSeries, config: &IndicatorConfig) -> Result<IndicatorFrame, AnalysisError> {
    if series.is_empty() {
        return Err(AnalysisError::EmptySeries);
    }
    let required = config.required_history();
    if series.len() < required {
        return Err(AnalysisError::InsufficientHistory {
            required,
            available: series.len(),
        });
    }

    let close = series.closes();
    let volumes = series.volumes();
    let macd = macd(&close, config.macd_fast, config.macd_slow, config.macd_signal);
    let bands = bollinger(&close, config.bollinger_window, config.bollinger_k);

    Ok(IndicatorFrame {
        ma: sma(&close, config.ma_window),
        vwap: vwap(&close, &volumes),
        rsi: rsi(&close, config.rsi_period, config.rsi_smoothing),
        macd: macd.line,
        macd_signal: macd.signal,
        macd_hist: macd.histogram,
        bb_mid: bands.mid,
        bb_upper: bands.upper,
        bb_lower: bands.lower,
        close,
    })
}
