//! Preset sector scans against a scripted source.

use std::sync::Arc;

use tickerdash_core::{
    DashboardError, ProviderPolicy, ThrottlingQueue, ValidationError, Verdict,
};
use tickerdash_tests::{downtrend, service_with, uptrend, DashboardService, StubSource};

fn fast(service: DashboardService) -> DashboardService {
    service.with_throttle(ThrottlingQueue::from_policy(&ProviderPolicy::offline()))
}

#[tokio::test]
async fn scan_keeps_going_when_one_ticker_fails() {
    // Given: a big-tech scan where META has no chart
    let source = Arc::new(StubSource::new(uptrend(120)).failing_for(&["META"]));
    let service = fast(service_with(source));

    // When: the user scans with no cutoff
    let report = service.scan("bigtech", Some(0)).await.expect("scan runs");

    // Then: every other ticker is a hit and META is reported as a failure
    assert_eq!(report.evaluated, 5);
    assert_eq!(report.hits.len(), 4);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].symbol.as_str(), "META");
    assert_eq!(report.failures[0].code, "source.not_found");
}

#[tokio::test]
async fn hits_respect_the_cutoff_and_are_sorted_best_first() {
    let service = fast(service_with(Arc::new(StubSource::new(uptrend(120)))));

    let report = service.scan("semis", Some(80)).await.expect("scan");

    assert_eq!(report.cutoff, 80);
    assert!(!report.hits.is_empty());
    assert!(report.hits.iter().all(|hit| hit.score >= 80));
    assert!(report
        .hits
        .iter()
        .all(|hit| hit.verdict == Verdict::StrongBuy));
    assert!(report
        .hits
        .windows(2)
        .all(|pair| pair[0].score >= pair[1].score));
}

#[tokio::test]
async fn weak_market_produces_an_empty_hit_list() {
    let service = fast(service_with(Arc::new(StubSource::new(downtrend(120)))));

    let report = service.scan("kr-bluechip", None).await.expect("scan");

    assert_eq!(report.cutoff, service.scan_cutoff());
    assert!(report.hits.is_empty());
    assert!(report.failures.is_empty());
}

#[tokio::test]
async fn unknown_preset_is_a_validation_error() {
    let service = fast(service_with(Arc::new(StubSource::new(uptrend(120)))));

    let error = service.scan("crypto", None).await.expect_err("no such preset");

    assert!(matches!(
        error,
        DashboardError::Validation(ValidationError::UnknownPreset { .. })
    ));
    assert_eq!(error.code(), "validation.preset");
}

#[tokio::test]
async fn offline_scan_covers_every_preset() {
    let service = DashboardService::offline();

    for preset in service.presets() {
        let report = service.scan(preset.id, Some(0)).await.expect("scan");
        assert_eq!(report.evaluated, preset.tickers.len(), "{}", preset.id);
        assert_eq!(
            report.hits.len() + report.failures.len(),
            preset.tickers.len(),
            "{}",
            preset.id
        );
    }
}
