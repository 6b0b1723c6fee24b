//! Server-side HTML. Every user-supplied string goes through [`escape`].

use std::fmt::Write;

use tickerdash_core::{
    Analysis, Interval, ScanPreset, ScanReport, SessionState, Verdict,
};

use crate::chart::{self, ChartSize};

const STYLE: &str = r#"
body{margin:0;font-family:-apple-system,"Segoe UI","Noto Sans KR",sans-serif;display:flex;color:#222}
aside{width:260px;min-height:100vh;background:#f4f5f7;padding:16px;box-sizing:border-box}
main{flex:1;padding:24px;min-width:0}
aside form{margin-bottom:14px}
aside input[type=text],aside select{width:100%;padding:6px;box-sizing:border-box;margin-bottom:6px}
aside button{width:100%;padding:6px;margin-bottom:6px;cursor:pointer}
.history a,.presets a{display:block;padding:3px 0}
.metrics{display:grid;grid-template-columns:repeat(auto-fit,minmax(150px,1fr));gap:12px;margin:16px 0}
.metric{background:#fafafa;border:1px solid #eee;border-radius:6px;padding:10px}
.metric .label{font-size:13px;color:#666}.metric .value{font-size:22px;font-weight:600}
.row{display:flex;gap:24px;flex-wrap:wrap}.row .chart-col{flex:2;min-width:320px}.row .guide-col{flex:1;min-width:240px}
.chart{width:100%;height:auto}.axis{font-size:11px;fill:#777}
.banner{padding:12px;border-radius:6px;margin:12px 0}
.banner.success{background:#e6f6ea}.banner.info{background:#e7f0fb}.banner.error{background:#fdecea}.banner.warning{background:#fff6e0}
.caption{color:#888;font-size:12px}
table{border-collapse:collapse}td,th{padding:6px 10px;border-bottom:1px solid #eee;text-align:right}td:first-child,th:first-child{text-align:left}
"#;

pub fn escape(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for ch in input.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}

/// Fixed decimals with thousands separators: `71500.0` → `71,500.00`.
pub fn format_number(value: f64, decimals: usize) -> String {
    if !value.is_finite() {
        return String::from("-");
    }
    let formatted = format!("{:.*}", decimals, value.abs());
    let (int_part, frac_part) = formatted
        .split_once('.')
        .map_or((formatted.as_str(), None), |(i, f)| (i, Some(f)));

    let mut grouped = String::new();
    for (index, digit) in int_part.chars().enumerate() {
        if index > 0 && (int_part.len() - index) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }
    let sign = if value < 0.0 && formatted.chars().any(|c| c != '0' && c != '.') {
        "-"
    } else {
        ""
    };
    match frac_part {
        Some(frac) => format!("{sign}{grouped}.{frac}"),
        None => format!("{sign}{grouped}"),
    }
}

/// `조`/`억` for won, `T`/`B`/`M` otherwise.
pub fn format_market_cap(value: f64, currency: Option<&str>) -> String {
    if currency == Some("KRW") {
        if value >= 1e12 {
            return format!("{:.1}조", value / 1e12);
        }
        return format!("{}억", format_number(value / 1e8, 0));
    }
    match value {
        v if v >= 1e12 => format!("{:.2}T", v / 1e12),
        v if v >= 1e9 => format!("{:.2}B", v / 1e9),
        v => format!("{:.1}M", v / 1e6),
    }
}

fn optional(value: Option<f64>, render: impl Fn(f64) -> String) -> String {
    value.map_or_else(|| String::from("-"), render)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BannerKind {
    Success,
    Info,
    Warning,
    Error,
}

impl BannerKind {
    const fn class(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Info => "info",
            Self::Warning => "warning",
            Self::Error => "error",
        }
    }
}

pub fn banner(kind: BannerKind, message: &str) -> String {
    format!(
        r#"<div class="banner {}">{}</div>"#,
        kind.class(),
        escape(message)
    )
}

/// Sidebar inputs for one session.
pub struct Sidebar<'a> {
    pub session: &'a SessionState,
    pub presets: &'a [ScanPreset],
}

fn sidebar(side: &Sidebar<'_>) -> String {
    let session = side.session;
    let mut html = String::from("<aside><h3>📡 글로벌 마켓 엔진</h3>");

    let _ = write!(
        html,
        r#"<form method="get" action="/"><input type="text" name="q" value="{}" placeholder="종목명/티커"><select name="interval">"#,
        escape(&session.selected)
    );
    for interval in Interval::ALL {
        let selected = if interval == session.interval { " selected" } else { "" };
        let _ = write!(
            html,
            r#"<option value="{}"{selected}>{}</option>"#,
            interval.as_str(),
            interval.label()
        );
    }
    html.push_str(r#"</select><button type="submit">🔍 조회</button></form>"#);

    html.push_str(
        r#"<form method="post" action="/refresh"><button type="submit">🔄 데이터 강제 갱신</button></form>"#,
    );

    if !session.history.is_empty() {
        html.push_str(r#"<h4>최근 검색</h4><div class="history">"#);
        for query in &session.history {
            let _ = write!(
                html,
                r#"<a href="/?q={}">{}</a>"#,
                urlencoding::encode(query),
                escape(query)
            );
        }
        html.push_str("</div>");
    }

    html.push_str(r#"<h4>섹터 스캔</h4><div class="presets">"#);
    for preset in side.presets {
        let _ = write!(
            html,
            r#"<a href="/scan/{}">{}</a>"#,
            preset.id,
            escape(preset.label)
        );
    }
    html.push_str("</div>");

    let cost = session
        .cost_basis
        .map(|value| format!("{value}"))
        .unwrap_or_default();
    let _ = write!(
        html,
        r#"<h4>내 평단가</h4><form method="post" action="/cost-basis"><input type="text" name="cost_basis" value="{cost}" placeholder="비우면 해제"><button type="submit">💾 저장</button></form></aside>"#
    );
    html
}

/// Full document around `main`.
pub fn page(title: &str, side: &Sidebar<'_>, main: &str) -> String {
    format!(
        r#"<!DOCTYPE html><html lang="ko"><head><meta charset="utf-8"><meta name="viewport" content="width=device-width, initial-scale=1"><title>{}</title><style>{STYLE}</style></head><body>{}<main><h1>🛡️ tickerdash 투자 전략실</h1>{main}</main></body></html>"#,
        escape(title),
        sidebar(side),
    )
}

fn metric(label: &str, value: &str) -> String {
    format!(
        r#"<div class="metric"><div class="label">{label}</div><div class="value">{}</div></div>"#,
        escape(value)
    )
}

fn verdict_banner(verdict: Verdict) -> String {
    let kind = match verdict {
        Verdict::StrongBuy => BannerKind::Success,
        Verdict::Accumulate => BannerKind::Info,
        Verdict::Avoid => BannerKind::Error,
    };
    banner(kind, verdict.label())
}

/// Header, metrics, chart, guidance and verdict for one analysis.
pub fn dashboard(analysis: &Analysis) -> String {
    let latest = &analysis.latest;
    let fundamentals = analysis.snapshot.fundamentals.as_ref();
    let currency = fundamentals
        .and_then(|f| f.currency.as_deref())
        .unwrap_or_else(|| analysis.resolution.symbol.market().currency());
    let decimals = if currency == "KRW" { 0 } else { 2 };

    let mut html = format!(
        "<h2>{} ({})</h2>",
        escape(&analysis.name),
        escape(analysis.resolution.symbol.as_str())
    );
    for warning in &analysis.warnings {
        html.push_str(&banner(BannerKind::Warning, warning));
    }

    html.push_str(r#"<div class="metrics">"#);
    html.push_str(&metric("📈 현재가", &format_number(latest.close, decimals)));
    html.push_str(&metric("🟢 스마트 승률", &format!("{}%", analysis.score.value)));
    html.push_str(&metric(
        "🎯 세력 평단",
        &optional(latest.vwap, |v| format_number(v, decimals)),
    ));
    html.push_str(&metric(
        "📊 ROE",
        &optional(fundamentals.and_then(|f| f.roe_percent()), |v| format!("{v:.1}%")),
    ));
    html.push_str(&metric(
        "🏦 부채비율",
        &optional(fundamentals.and_then(|f| f.debt_to_equity), |v| format!("{v:.0}%")),
    ));
    html.push_str(&metric(
        "💰 시가총액",
        &optional(fundamentals.and_then(|f| f.market_cap), |v| {
            format_market_cap(v, Some(currency))
        }),
    ));
    if let Some(position) = &analysis.position {
        html.push_str(&metric(
            "💼 내 수익률",
            &format!("{:+.2}%", position.return_percent),
        ));
    }
    html.push_str("</div>");

    html.push_str(r#"<div class="row"><div class="chart-col">"#);
    html.push_str(&chart::candlestick_svg(
        &analysis.snapshot.bars,
        &analysis.frame,
        ChartSize::default(),
    ));
    html.push_str(r#"</div><div class="guide-col"><h3>🔍 핵심 지표 및 가이드</h3><ul>"#);
    for line in &analysis.guidance {
        let _ = write!(
            html,
            "<li>{} <strong>{}:</strong> {}</li>",
            line.status.icon(),
            line.topic.label(),
            escape(&line.text)
        );
    }
    html.push_str("</ul><hr>");
    html.push_str(&verdict_banner(analysis.verdict));
    if let Some(position) = &analysis.position {
        let note = match position.cost_vs_vwap_percent {
            Some(gap) => format!(
                "평단 {} · 세력 평단 대비 {gap:+.1}%",
                format_number(position.cost_basis, decimals)
            ),
            None => format!("평단 {}", format_number(position.cost_basis, decimals)),
        };
        let _ = write!(html, r#"<p class="caption">{}</p>"#, escape(&note));
    }
    let _ = write!(
        html,
        r#"<p class="caption">마지막 동기화: {}{}</p></div></div>"#,
        analysis.synced_at.format_clock(),
        if analysis.snapshot.cache_hit { " (캐시)" } else { "" }
    );
    html
}

pub fn scan_report(report: &ScanReport) -> String {
    let mut html = format!(
        "<h2>{} 스캔</h2><p>{}개 종목 중 {}점 이상 {}개</p>",
        escape(&report.label),
        report.evaluated,
        report.cutoff,
        report.hits.len()
    );

    if report.hits.is_empty() {
        html.push_str(&banner(BannerKind::Info, "조건을 만족하는 종목이 없습니다."));
    } else {
        html.push_str("<table><tr><th>종목</th><th>현재가</th><th>점수</th><th>판정</th></tr>");
        for hit in &report.hits {
            let _ = write!(
                html,
                r#"<tr><td><a href="/?q={}">{}</a></td><td>{}</td><td>{}</td><td>{}</td></tr>"#,
                urlencoding::encode(hit.symbol.as_str()),
                escape(hit.symbol.as_str()),
                format_number(hit.close, 2),
                hit.score,
                hit.verdict.label()
            );
        }
        html.push_str("</table>");
    }

    if !report.failures.is_empty() {
        html.push_str("<h4>실패한 종목</h4><ul>");
        for failure in &report.failures {
            let _ = write!(
                html,
                "<li>{} <code>{}</code> {}</li>",
                escape(failure.symbol.as_str()),
                escape(&failure.code),
                escape(&failure.message)
            );
        }
        html.push_str("</ul>");
    }
    let _ = write!(
        html,
        r#"<p class="caption">완료: {}</p>"#,
        report.completed_at.format_clock()
    );
    html
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escapes_markup() {
        assert_eq!(
            escape(r#"<script>alert("x")</script> & 'y'"#),
            "&lt;script&gt;alert(&quot;x&quot;)&lt;/script&gt; &amp; &#39;y&#39;"
        );
    }

    #[test]
    fn groups_thousands() {
        assert_eq!(format_number(71_500.0, 0), "71,500");
        assert_eq!(format_number(1_234_567.891, 2), "1,234,567.89");
        assert_eq!(format_number(-950.5, 1), "-950.5");
        assert_eq!(format_number(f64::NAN, 2), "-");
    }

    #[test]
    fn market_cap_units_follow_currency() {
        assert_eq!(format_market_cap(4.3e14, Some("KRW")), "430.0조");
        assert_eq!(format_market_cap(5.0e11, Some("KRW")), "5,000억");
        assert_eq!(format_market_cap(3.1e12, Some("USD")), "3.10T");
        assert_eq!(format_market_cap(2.5e9, None), "2.50B");
    }
}
