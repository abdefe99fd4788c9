mod support;

use std::sync::atomic::Ordering;
use std::sync::Arc;

use pagecap_lib::{CaptureOrchestrator, CaptureRequest, ProgressPhase, ProgressReporter};
use support::{config, FakeLauncher};
use tempfile::TempDir;

#[tokio::test(start_paused = true)]
async fn capture_writes_sections_metadata_and_cache() {
    let dir = TempDir::new().expect("tempdir");
    let launcher = Arc::new(FakeLauncher::default());
    let orchestrator = CaptureOrchestrator::new(config(&dir), launcher.clone());
    let request = CaptureRequest::new("example", "https://www.Example.com/pricing");

    let (progress, mut events) = ProgressReporter::channel();
    let result = orchestrator.capture(&request, &progress).await;
    drop(progress);

    assert!(result.success, "{:?}", result.error);
    assert!(!result.from_cache);
    let types: Vec<_> = result
        .sections
        .iter()
        .map(|s| s.section_type.as_str())
        .collect();
    assert_eq!(types, vec!["header", "hero", "footer"]);
    for section in &result.sections {
        let path = section.screenshot_path.as_ref().expect("section shot");
        assert!(path.exists(), "{} missing", path.display());
        assert!(section.styles.is_some());
    }
    assert!(result.full_page_path.as_ref().is_some_and(|p| p.exists()));
    assert_eq!(result.metadata.viewport_width, 1440);
    assert_eq!(result.metadata.full_page_height, 930.0);

    let raw = result.raw_data.expect("raw data");
    assert_eq!(raw.colors[0].hex, "#111111");
    assert_eq!(raw.colors[0].count, 2);

    let metadata = dir.path().join("out/example/reference/metadata.json");
    let written: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(metadata).expect("metadata"))
            .expect("metadata json");
    assert_eq!(written["sections"].as_array().map(Vec::len), Some(3));
    assert!(dir.path().join("cache/example.com.json").exists());

    let mut percents = Vec::new();
    let mut last_phase = None;
    while let Some(event) = events.recv().await {
        percents.push(event.percent);
        last_phase = Some(event.phase);
    }
    assert!(percents.windows(2).all(|w| w[0] <= w[1]));
    assert_eq!(last_phase, Some(ProgressPhase::Complete));
    assert_eq!(launcher.counters.closes.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn second_capture_within_ttl_skips_the_browser() {
    let dir = TempDir::new().expect("tempdir");
    let launcher = Arc::new(FakeLauncher::default());
    let orchestrator = CaptureOrchestrator::new(config(&dir), launcher.clone());
    let request = CaptureRequest::new("example", "https://example.com");

    let first = orchestrator.capture(&request, &ProgressReporter::silent()).await;
    assert!(first.success);
    let second = orchestrator
        .capture(
            &CaptureRequest::new("example", "https://www.example.com/other"),
            &ProgressReporter::silent(),
        )
        .await;

    assert!(second.success);
    assert!(second.from_cache);
    assert_eq!(second.sections.len(), first.sections.len());
    assert_eq!(launcher.counters.launches.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn skip_cache_recaptures_but_still_writes() {
    let dir = TempDir::new().expect("tempdir");
    let launcher = Arc::new(FakeLauncher::default());
    let orchestrator = CaptureOrchestrator::new(config(&dir), launcher.clone());

    let mut request = CaptureRequest::new("example", "https://example.com");
    orchestrator.capture(&request, &ProgressReporter::silent()).await;
    request.skip_cache = true;
    let result = orchestrator.capture(&request, &ProgressReporter::silent()).await;

    assert!(result.success);
    assert!(!result.from_cache);
    assert_eq!(launcher.counters.launches.load(Ordering::SeqCst), 2);
    assert!(orchestrator.cache().get("https://example.com").is_some());
}

#[tokio::test(start_paused = true)]
async fn disabled_styles_leave_sections_bare() {
    let dir = TempDir::new().expect("tempdir");
    let mut cfg = config(&dir);
    cfg.style.extract_styles = false;
    cfg.cache.enabled = false;
    let orchestrator = CaptureOrchestrator::new(cfg, Arc::new(FakeLauncher::default()));

    let result = orchestrator
        .capture(
            &CaptureRequest::new("example", "https://example.com"),
            &ProgressReporter::silent(),
        )
        .await;

    assert!(result.success);
    assert!(result.sections.iter().all(|s| s.styles.is_none()));
    assert!(!dir.path().join("cache/example.com.json").exists());
}
