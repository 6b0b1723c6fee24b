//! Buy-score heuristic, verdict bands and the guidance checklist.

use serde::{Deserialize, Serialize};

use crate::indicators::IndicatorSnapshot;
use crate::{Fundamental, ValidationError};

/// Thresholds and weights of the buy-score heuristic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    /// Score when the close sits below both VWAP and MA.
    pub weak_score: u8,
    pub base_score: u8,
    pub vwap_bonus: u8,
    pub ma_bonus: u8,
    pub rsi_bonus: u8,
    /// Open band `(low, high)` in which RSI earns the bonus.
    pub rsi_bonus_band: (f64, f64),
    pub strong_buy_at: u8,
    pub accumulate_at: u8,
    /// Open RSI band treated as neutral sentiment.
    pub sentiment_band: (f64, f64),
    /// ROE above this percentage counts as durable.
    pub roe_min_percent: f64,
    /// Debt-to-equity below this (provider percent units) counts as low leverage.
    pub debt_to_equity_max: f64,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            weak_score: 35,
            base_score: 70,
            vwap_bonus: 10,
            ma_bonus: 10,
            rsi_bonus: 10,
            rsi_bonus_band: (40.0, 65.0),
            strong_buy_at: 80,
            accumulate_at: 60,
            sentiment_band: (35.0, 65.0),
            roe_min_percent: 10.0,
            debt_to_equity_max: 100.0,
        }
    }
}

/// Three-way verdict derived from the score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    StrongBuy,
    /// Split buying or wait-and-see.
    Accumulate,
    Avoid,
}

impl Verdict {
    pub fn from_score(score: u8, config: &ScoringConfig) -> Self {
        if score >= config.strong_buy_at {
            Self::StrongBuy
        } else if score >= config.accumulate_at {
            Self::Accumulate
        } else {
            Self::Avoid
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::StrongBuy => "strong_buy",
            Self::Accumulate => "accumulate",
            Self::Avoid => "avoid",
        }
    }

    /// Banner text shown on the dashboard.
    pub const fn label(self) -> &'static str {
        match self {
            Self::StrongBuy => "💎 강력 매수 구간",
            Self::Accumulate => "⚖️ 분할 매수/관망",
            Self::Avoid => "⏳ 진입 금지/위험",
        }
    }
}

/// Score value with the conditions that produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Score {
    pub value: u8,
    pub verdict: Verdict,
    pub above_vwap: bool,
    pub above_ma: bool,
    pub rsi_in_band: bool,
    /// Close below both VWAP and MA; bonuses were not applied.
    pub weak_trend: bool,
}

fn above(close: f64, level: Option<f64>) -> bool {
    level.is_some_and(|level| close > level)
}

fn below(close: f64, level: Option<f64>) -> bool {
    level.is_some_and(|level| close < level)
}

fn within(value: Option<f64>, (low, high): (f64, f64)) -> bool {
    value.is_some_and(|v| low < v && v < high)
}

/// Scores the latest bar. An undefined indicator satisfies no condition.
pub fn score(snapshot: &IndicatorSnapshot, config: &ScoringConfig) -> Score {
    let close = snapshot.close;
    let above_vwap = above(close, snapshot.vwap);
    let above_ma = above(close, snapshot.ma);
    let rsi_in_band = within(snapshot.rsi, config.rsi_bonus_band);
    let weak_trend = below(close, snapshot.vwap) && below(close, snapshot.ma);

    let value = if weak_trend {
        config.weak_score
    } else {
        let mut total = u16::from(config.base_score);
        if above_vwap {
            total += u16::from(config.vwap_bonus);
        }
        if above_ma {
            total += u16::from(config.ma_bonus);
        }
        if rsi_in_band {
            total += u16::from(config.rsi_bonus);
        }
        total.min(100) as u8
    };

    Score {
        value: value.min(100),
        verdict: Verdict::from_score(value, config),
        above_vwap,
        above_ma,
        rsi_in_band,
        weak_trend,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GuidanceTopic {
    Supply,
    Durability,
    Sentiment,
    Trend,
    Volatility,
    Leverage,
}

impl GuidanceTopic {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Supply => "수급",
            Self::Durability => "지속성",
            Self::Sentiment => "심리",
            Self::Trend => "추세",
            Self::Volatility => "변동성",
            Self::Leverage => "재무 안정성",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GuidanceStatus {
    Pass,
    Caution,
    Fail,
}

impl GuidanceStatus {
    pub const fn icon(self) -> &'static str {
        match self {
            Self::Pass => "✅",
            Self::Caution => "⚠️",
            Self::Fail => "❌",
        }
    }
}

/// One line of the checklist next to the chart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuidanceLine {
    pub topic: GuidanceTopic,
    pub status: GuidanceStatus,
    pub text: String,
}

impl GuidanceLine {
    fn new(topic: GuidanceTopic, status: GuidanceStatus, text: impl Into<String>) -> Self {
        Self {
            topic,
            status,
            text: text.into(),
        }
    }
}

/// Builds the guidance checklist. Fundamentals are optional; missing metrics
/// produce a caution line rather than a pass.
pub fn guidance(
    snapshot: &IndicatorSnapshot,
    fundamentals: Option<&Fundamental>,
    config: &ScoringConfig,
) -> Vec<GuidanceLine> {
    use GuidanceStatus::{Caution, Fail, Pass};
    use GuidanceTopic::*;

    let close = snapshot.close;
    let mut lines = Vec::with_capacity(6);

    lines.push(match snapshot.vwap {
        Some(vwap) if close > vwap => GuidanceLine::new(Supply, Pass, "세력 평단 위 지지"),
        Some(_) => GuidanceLine::new(Supply, Fail, "세력 평단 아래 저항"),
        None => GuidanceLine::new(Supply, Caution, "거래량 정보 없음"),
    });

    lines.push(match fundamentals.and_then(Fundamental::roe_percent) {
        Some(roe) if roe > config.roe_min_percent => {
            GuidanceLine::new(Durability, Pass, format!("ROE {roe:.1}% 우량주"))
        }
        Some(roe) => GuidanceLine::new(Durability, Caution, format!("ROE {roe:.1}% 수익성 점검")),
        None => GuidanceLine::new(Durability, Caution, "ROE 정보 없음"),
    });

    let (calm_low, calm_high) = config.sentiment_band;
    lines.push(match snapshot.rsi {
        Some(rsi) if calm_low < rsi && rsi < calm_high => {
            GuidanceLine::new(Sentiment, Pass, format!("RSI {rsi:.1}"))
        }
        Some(rsi) if rsi >= calm_high => {
            GuidanceLine::new(Sentiment, Caution, format!("RSI {rsi:.1} 과열"))
        }
        Some(rsi) => GuidanceLine::new(Sentiment, Caution, format!("RSI {rsi:.1} 침체")),
        None => GuidanceLine::new(Sentiment, Caution, "RSI 계산 불가"),
    });

    lines.push(match (snapshot.macd, snapshot.macd_signal) {
        (Some(line), Some(signal)) if line > signal => {
            GuidanceLine::new(Trend, Pass, "MACD 시그널 상향 (상승 에너지)")
        }
        (Some(_), Some(_)) => GuidanceLine::new(Trend, Caution, "MACD 시그널 하향 (에너지 약화)"),
        _ => GuidanceLine::new(Trend, Caution, "MACD 계산 불가"),
    });

    lines.push(match (snapshot.bb_upper, snapshot.bb_lower) {
        (Some(upper), _) if close > upper => {
            GuidanceLine::new(Volatility, Caution, "볼린저 상단 돌파 (단기 과열)")
        }
        (_, Some(lower)) if close < lower => {
            GuidanceLine::new(Volatility, Caution, "볼린저 하단 이탈 (변동성 확대)")
        }
        (Some(_), Some(_)) => GuidanceLine::new(Volatility, Pass, "볼린저 밴드 내 안정"),
        _ => GuidanceLine::new(Volatility, Caution, "볼린저 밴드 계산 불가"),
    });

    lines.push(match fundamentals.and_then(|f| f.debt_to_equity) {
        Some(de) if de < config.debt_to_equity_max => {
            GuidanceLine::new(Leverage, Pass, format!("부채비율 {de:.0}%"))
        }
        Some(de) => GuidanceLine::new(Leverage, Caution, format!("부채비율 {de:.0}% 부담")),
        None => GuidanceLine::new(Leverage, Caution, "부채비율 정보 없음"),
    });

    lines
}

/// How the latest close compares with the user's average cost.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PositionSummary {
    pub cost_basis: f64,
    pub close: f64,
    pub return_percent: f64,
    /// Cost basis relative to VWAP, in percent; `None` without VWAP.
    pub cost_vs_vwap_percent: Option<f64>,
}

impl PositionSummary {
    pub fn new(cost_basis: f64, snapshot: &IndicatorSnapshot) -> Result<Self, ValidationError> {
        validate_cost_basis(cost_basis)?;
        Ok(Self {
            cost_basis,
            close: snapshot.close,
            return_percent: (snapshot.close / cost_basis - 1.0) * 100.0,
            cost_vs_vwap_percent: snapshot
                .vwap
                .filter(|vwap| *vwap > 0.0)
                .map(|vwap| (cost_basis / vwap - 1.0) * 100.0),
        })
    }

    pub fn is_profitable(&self) -> bool {
        self.return_percent > 0.0
    }
}

pub fn validate_cost_basis(value: f64) -> Result<f64, ValidationError> {
    if value.is_finite() && value > 0.0 {
        Ok(value)
    } else {
        Err(ValidationError::InvalidCostBasis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Symbol;

    fn snapshot(close: f64, vwap: f64, ma: f64, rsi: f64) -> IndicatorSnapshot {
        IndicatorSnapshot {
            close,
            ma: Some(ma),
            vwap: Some(vwap),
            rsi: Some(rsi),
            macd: Some(1.0),
            macd_signal: Some(0.5),
            macd_hist: Some(0.5),
            bb_mid: Some(close),
            bb_upper: Some(close + 10.0),
            bb_lower: Some(close - 10.0),
        }
    }

    #[test]
    fn below_vwap_and_ma_is_weak() {
        let result = score(&snapshot(90.0, 100.0, 95.0, 50.0), &ScoringConfig::default());
        assert_eq!(result.value, 35);
        assert!(result.weak_trend);
        assert_eq!(result.verdict, Verdict::Avoid);
    }

    #[test]
    fn all_bonuses_cap_at_one_hundred() {
        let result = score(&snapshot(110.0, 100.0, 105.0, 50.0), &ScoringConfig::default());
        assert_eq!(result.value, 100);
        assert_eq!(result.verdict, Verdict::StrongBuy);
    }

    #[test]
    fn partial_bonuses() {
        let config = ScoringConfig::default();
        // above VWAP only, RSI outside the bonus band
        let result = score(&snapshot(101.0, 100.0, 105.0, 70.0), &config);
        assert_eq!(result.value, 80);
        assert_eq!(result.verdict, Verdict::StrongBuy);

        // below VWAP but above MA: not weak, MA bonus only
        let result = score(&snapshot(99.0, 100.0, 95.0, 40.0), &config);
        assert!(!result.weak_trend);
        assert_eq!(result.value, 80);

        // RSI band is open at both edges
        let result = score(&snapshot(101.0, 100.0, 105.0, 65.0), &config);
        assert!(!result.weak_trend);
        assert_eq!(result.value, 80);
        let result = score(&snapshot(101.0, 100.0, 105.0, 40.0), &config);
        assert_eq!(result.value, 80);
        let result = score(&snapshot(101.0, 100.0, 105.0, 64.9), &config);
        assert_eq!(result.value, 90);
    }

    #[test]
    fn undefined_vwap_is_not_weak() {
        let mut snap = snapshot(90.0, 100.0, 95.0, 50.0);
        snap.vwap = None;
        let result = score(&snap, &ScoringConfig::default());
        assert_eq!(result.value, 80);
        assert_eq!(result.verdict, Verdict::StrongBuy);
    }

    #[test]
    fn verdict_bands() {
        let config = ScoringConfig::default();
        assert_eq!(Verdict::from_score(80, &config), Verdict::StrongBuy);
        assert_eq!(Verdict::from_score(79, &config), Verdict::Accumulate);
        assert_eq!(Verdict::from_score(60, &config), Verdict::Accumulate);
        assert_eq!(Verdict::from_score(59, &config), Verdict::Avoid);
    }

    #[test]
    fn guidance_reflects_indicators_and_fundamentals() {
        let fundamental = Fundamental::new(Symbol::parse("AAPL").expect("symbol"))
            .with_ratios(Some(0.25), Some(150.0));
        let lines = guidance(
            &snapshot(90.0, 100.0, 95.0, 70.0),
            Some(&fundamental),
            &ScoringConfig::default(),
        );

        let status = |topic| {
            lines
                .iter()
                .find(|line| line.topic == topic)
                .map(|line| line.status)
                .expect("topic present")
        };
        assert_eq!(lines.len(), 6);
        assert_eq!(status(GuidanceTopic::Supply), GuidanceStatus::Fail);
        assert_eq!(status(GuidanceTopic::Durability), GuidanceStatus::Pass);
        assert_eq!(status(GuidanceTopic::Sentiment), GuidanceStatus::Caution);
        assert_eq!(status(GuidanceTopic::Trend), GuidanceStatus::Pass);
        assert_eq!(status(GuidanceTopic::Volatility), GuidanceStatus::Pass);
        assert_eq!(status(GuidanceTopic::Leverage), GuidanceStatus::Caution);
        assert!(lines[1].text.contains("25.0%"));
    }

    #[test]
    fn missing_fundamentals_are_cautions() {
        let lines = guidance(&snapshot(110.0, 100.0, 105.0, 50.0), None, &ScoringConfig::default());
        assert_eq!(lines[1].status, GuidanceStatus::Caution);
        assert_eq!(lines[5].status, GuidanceStatus::Caution);
    }

    #[test]
    fn position_summary_from_cost_basis() {
        let position =
            PositionSummary::new(80.0, &snapshot(100.0, 90.0, 95.0, 50.0)).expect("position");
        assert!((position.return_percent - 25.0).abs() < 1e-9);
        let vs_vwap = position.cost_vs_vwap_percent.expect("vwap known");
        assert!((vs_vwap - (80.0 / 90.0 - 1.0) * 100.0).abs() < 1e-9);
        assert!(position.is_profitable());

        assert_eq!(
            PositionSummary::new(0.0, &snapshot(1.0, 1.0, 1.0, 50.0)),
            Err(ValidationError::InvalidCostBasis)
        );
        assert!(validate_cost_basis(f64::NAN).is_err());
    }
}
