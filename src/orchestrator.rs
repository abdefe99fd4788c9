//! Single-viewport capture.
//!
//! cache check → launch → navigate + stabilize → full-page screenshot →
//! detection → per-section screenshots and styles → raw page data →
//! metadata + cache write.
//!
//! [`CaptureOrchestrator::capture`] never returns an error: every failure is
//! folded into a `success: false` [`CaptureResult`], and the page is closed on
//! every path once launched.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tracing::{debug, error, info, warn};

use crate::artifacts::{self, ArtifactLayout};
use crate::browser::{scripts, BrowserLauncher, LaunchOptions, PageDriver, ScreenshotRequest};
use crate::cache::{normalize_domain, Cache};
use crate::config::Config;
use crate::detector::{Detection, SectionDetector};
use crate::progress::{ProgressPhase, ProgressReporter};
use crate::raw_data;
use crate::retry::RetryPolicy;
use crate::stabilizer::{ContentStabilizer, StabilizeReport};
use crate::style::StyleExtractor;
use crate::types::{BoundingBox, CaptureMetadata, CaptureResult, DetectedSection};
use crate::{CaptureError, Result, Viewport};

/// One capture invocation. Unset options fall back to the configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct CaptureRequest {
    pub website_id: String,
    pub url: String,
    pub viewport: Option<Viewport>,
    pub max_retries: Option<u32>,
    pub page_timeout: Option<Duration>,
    pub skip_cache: bool,
    pub headless: Option<bool>,
}

impl CaptureRequest {
    pub fn new(website_id: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            website_id: website_id.into(),
            url: url.into(),
            viewport: None,
            max_retries: None,
            page_timeout: None,
            skip_cache: false,
            headless: None,
        }
    }
}

/// Request options resolved against the configuration.
#[derive(Debug, Clone)]
pub(crate) struct Resolved {
    pub viewport: Viewport,
    pub policy: RetryPolicy,
    pub page_timeout: Duration,
    pub headless: bool,
}

pub struct CaptureOrchestrator {
    config: Config,
    launcher: Arc<dyn BrowserLauncher>,
    cache: Cache,
    stabilizer: ContentStabilizer,
    detector: SectionDetector,
    extractor: StyleExtractor,
}

impl CaptureOrchestrator {
    pub fn new(config: Config, launcher: Arc<dyn BrowserLauncher>) -> Self {
        Self {
            cache: Cache::new(&config.cache),
            stabilizer: ContentStabilizer::new(config.stabilizer.clone()),
            detector: SectionDetector::new(config.detector.clone()),
            extractor: StyleExtractor::new(config.style.clone()),
            config,
            launcher,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn cache(&self) -> &Cache {
        &self.cache
    }

    pub(crate) fn stabilizer(&self) -> &ContentStabilizer {
        &self.stabilizer
    }

    pub(crate) fn resolve(&self, request: &CaptureRequest) -> Resolved {
        let capture = &self.config.capture;
        Resolved {
            viewport: request.viewport.unwrap_or(capture.viewport),
            policy: RetryPolicy::new(
                request.max_retries.unwrap_or(capture.max_retries),
                capture.retry_backoff,
            ),
            page_timeout: request.page_timeout.unwrap_or(capture.page_timeout),
            headless: request.headless.unwrap_or(capture.headless),
        }
    }

    pub async fn capture(&self, request: &CaptureRequest, progress: &ProgressReporter) -> CaptureResult {
        let resolved = self.resolve(request);
        let metadata = CaptureMetadata {
            url: request.url.clone(),
            captured_at: Utc::now(),
            viewport_width: resolved.viewport.width,
            viewport_height: resolved.viewport.height,
            full_page_height: 0.0,
        };

        let fail = |err: CaptureError| {
            error!(url = %request.url, error = %err, "capture failed");
            progress.emit(ProgressPhase::Failed, 100, err.to_string());
            CaptureResult::failure(metadata.clone(), err.to_string())
        };

        if let Err(err) = normalize_domain(&request.url) {
            return fail(err);
        }

        if !request.skip_cache {
            if let Some(entry) = self.cache.get(&request.url) {
                info!(domain = %entry.domain, captured_at = %entry.captured_at, "serving capture from cache");
                progress.emit(ProgressPhase::Complete, 100, "Loaded from cache");
                return entry.into_result();
            }
        }

        progress.emit(ProgressPhase::Initializing, 0, "Preparing capture");
        let layout = match ArtifactLayout::new(&self.config.capture.output_dir, &request.website_id)
            .and_then(|layout| layout.prepare().map(|_| layout))
        {
            Ok(layout) => layout,
            Err(err) => return fail(err),
        };

        progress.emit(ProgressPhase::Launching, 5, "Launching browser");
        let mut page = match self.launch(&resolved).await {
            Ok(page) => page,
            Err(err) => return fail(err),
        };

        let outcome = self
            .run(page.as_mut(), request, &resolved, &layout, metadata.clone(), progress)
            .await;
        self.release(page.as_mut()).await;

        match outcome {
            Ok(result) => {
                if let Err(err) = self.cache.put(&request.url, &result) {
                    warn!(error = %err, "cache write failed");
                }
                info!(
                    url = %request.url,
                    sections = result.sections.len(),
                    "capture complete"
                );
                progress.emit(ProgressPhase::Complete, 100, "Capture complete");
                result
            }
            Err(err) => fail(err),
        }
    }

    /// Launches with retry; each attempt is bounded by the launch timeout.
    pub(crate) async fn launch(&self, resolved: &Resolved) -> Result<Box<dyn PageDriver>> {
        let options = LaunchOptions {
            viewport: resolved.viewport,
            headless: resolved.headless,
            command_timeout: LaunchOptions::default()
                .command_timeout
                .max(resolved.page_timeout),
        };
        let launch_timeout = self.config.capture.launch_timeout;
        let launcher = &self.launcher;
        resolved
            .policy
            .run("browser launch", |attempt| {
                let options = options.clone();
                async move {
                    debug!(attempt, "launching browser");
                    tokio::time::timeout(launch_timeout, launcher.launch(&options))
                        .await
                        .unwrap_or_else(|_| Err(CaptureError::timeout("browser launch", launch_timeout)))
                }
            })
            .await
    }

    pub(crate) async fn release(&self, page: &mut dyn PageDriver) {
        if let Err(err) = page.close().await {
            warn!(error = %err, "failed to close browser");
        }
    }

    async fn run(
        &self,
        page: &mut dyn PageDriver,
        request: &CaptureRequest,
        resolved: &Resolved,
        layout: &ArtifactLayout,
        mut metadata: CaptureMetadata,
        progress: &ProgressReporter,
    ) -> Result<CaptureResult> {
        self.load(page, &request.url, resolved, progress).await?;

        progress.emit(ProgressPhase::Capturing, 45, "Capturing full page");
        let full_page_path = layout.full_page();
        self.shoot(page, &ScreenshotRequest::full_page(&full_page_path), resolved.policy)
            .await?;

        let (detection, sections) = self
            .detect_and_capture(page, layout, resolved.policy, progress)
            .await?;
        metadata.full_page_height = detection.metrics.page_height;

        progress.emit(ProgressPhase::Extracting, 90, "Collecting design tokens");
        let raw_data = match raw_data::collect(page).await {
            Ok(data) => Some(data),
            Err(err) => {
                warn!(error = %err, "raw page data extraction failed");
                None
            }
        };

        artifacts::write_metadata(layout, &metadata, &sections)?;

        Ok(CaptureResult {
            success: true,
            full_page_path: Some(full_page_path),
            sections,
            metadata,
            raw_data,
            error: None,
            from_cache: false,
        })
    }

    /// Navigation plus stabilization, retried together.
    pub(crate) async fn load(
        &self,
        page: &mut dyn PageDriver,
        url: &str,
        resolved: &Resolved,
        progress: &ProgressReporter,
    ) -> Result<StabilizeReport> {
        let mut attempt = 1;
        loop {
            progress.emit(ProgressPhase::Navigating, 10, format!("Loading {url}"));
            let outcome = match page.goto(url, resolved.page_timeout).await {
                Ok(()) => self.stabilizer.stabilize(&mut *page, progress).await,
                Err(err) => Err(err),
            };
            match outcome {
                Ok(report) => return Ok(report),
                Err(err) if resolved.policy.should_retry(attempt, &err) => {
                    resolved.policy.pause("navigation", attempt, &err).await;
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }

    pub(crate) async fn shoot(
        &self,
        page: &mut dyn PageDriver,
        request: &ScreenshotRequest,
        policy: RetryPolicy,
    ) -> Result<()> {
        let mut attempt = 1;
        loop {
            match page.screenshot(request).await {
                Ok(()) => return Ok(()),
                Err(err) if policy.should_retry(attempt, &err) => {
                    policy.pause("screenshot", attempt, &err).await;
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }

    /// Detects sections on the current page and shoots each one into
    /// `layout`. Sections whose screenshot fails are dropped.
    pub(crate) async fn detect_and_capture(
        &self,
        page: &mut dyn PageDriver,
        layout: &ArtifactLayout,
        policy: RetryPolicy,
        progress: &ProgressReporter,
    ) -> Result<(Detection, Vec<DetectedSection>)> {
        progress.emit(ProgressPhase::Sections, 50, "Detecting sections");
        let detection = self.detector.detect(page).await?;

        let total = detection.sections.len();
        let mut captured = Vec::with_capacity(total);
        for (index, section) in detection.sections.iter().enumerate() {
            progress.section(
                ProgressReporter::scaled(55, 85, index, total),
                index + 1,
                total,
                format!("Capturing {} section", section.section_type),
            );
            let path = layout.section(&section.screenshot_file_name(index));
            if let Err(err) = self.shoot_section(page, section, &path, policy).await {
                warn!(section = %section.id, error = %err, "section screenshot failed; dropping section");
                continue;
            }

            let mut section = section.clone();
            section.screenshot_path = Some(path);
            if self.config.style.extract_styles {
                match self.extractor.extract(page, &section).await {
                    Ok(styles) => section.styles = styles,
                    Err(err) => warn!(section = %section.id, error = %err, "style extraction failed"),
                }
            }
            captured.push(section);
        }

        debug!(detected = total, captured = captured.len(), "sections captured");
        Ok((detection, captured))
    }

    /// Scrolls past the section and back so observer-driven content mounts,
    /// waits for visible images, then shoots the section clipped to the
    /// maximum shot height.
    async fn shoot_section(
        &self,
        page: &mut dyn PageDriver,
        section: &DetectedSection,
        path: &Path,
        policy: RetryPolicy,
    ) -> Result<()> {
        let capture = &self.config.capture;
        let b = section.bounding_box;
        page.evaluate(&scripts::scroll_to(b.y + capture.section_overscroll))
            .await?;
        page.evaluate(&scripts::scroll_to(b.y)).await?;

        let timeout_ms = capture.section_image_timeout.as_millis() as u64;
        if let Err(err) = page
            .evaluate(&scripts::settle_viewport_images(timeout_ms))
            .await
        {
            debug!(section = %section.id, error = %err, "viewport image wait skipped");
        }

        let clip = BoundingBox::new(b.x, b.y, b.width, b.height.min(capture.max_section_shot_height));
        self.shoot(page, &ScreenshotRequest::clipped(path, clip), policy)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::browser::fake::ScriptedPage;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use tempfile::TempDir;

    fn three_section_page() -> ScriptedPage {
        let hit = |t: &str, y: f64, h: f64| {
            json!({"type": t, "selector": t, "ref": format!("r-{t}"), "visible": true,
                   "box": {"x": 0.0, "y": y, "width": 1440.0, "height": h}})
        };
        ScriptedPage::new()
            .returning(
                "page_metrics",
                json!({"pageHeight": 930.0, "pageWidth": 1440.0, "viewportWidth": 1440.0, "viewportHeight": 900.0}),
            )
            .returning("scroll_step", json!({"scrollY": 30.0, "scrollHeight": 930.0}))
            .returning("pending_images", json!(0))
            .returning("running_animations", json!(0))
            .returning("hidden_entrance_count", json!(0))
            .returning(
                "selector_probe",
                json!([hit("header", 0.0, 80.0), hit("hero", 80.0, 700.0), hit("footer", 780.0, 150.0)]),
            )
            .returning("fixed_nav_probe", json!({"viewportWidth": 1440.0, "candidates": []}))
            .returning("raw_page_data", json!({"colors": ["rgb(1, 2, 3)"]}))
    }

    /// Hands out one pre-built page, then fails.
    struct OnePage {
        page: Mutex<Option<ScriptedPage>>,
        launches: AtomicUsize,
    }

    #[async_trait]
    impl BrowserLauncher for OnePage {
        async fn launch(&self, _options: &LaunchOptions) -> Result<Box<dyn PageDriver>> {
            self.launches.fetch_add(1, Ordering::SeqCst);
            let page = self.page.lock().map_err(|e| CaptureError::Unknown(e.to_string()))?.take();
            page.map(|p| Box::new(p) as Box<dyn PageDriver>)
                .ok_or_else(|| CaptureError::Config("no page".into()))
        }
    }

    fn config(dir: &TempDir) -> Config {
        let mut config = Config::default();
        config.capture.output_dir = dir.path().join("out");
        config.cache.dir = dir.path().join("cache");
        config
    }

    #[tokio::test(start_paused = true)]
    async fn captures_three_sections_in_order() {
        let dir = TempDir::new().unwrap();
        let launcher = Arc::new(OnePage {
            page: Mutex::new(Some(three_section_page())),
            launches: AtomicUsize::new(0),
        });
        let orchestrator = CaptureOrchestrator::new(config(&dir), launcher.clone());
        let request = CaptureRequest::new("site", "https://example.com");

        let result = orchestrator.capture(&request, &ProgressReporter::silent()).await;

        assert!(result.success, "{:?}", result.error);
        let types: Vec<_> = result.sections.iter().map(|s| s.section_type.as_str()).collect();
        assert_eq!(types, vec!["header", "hero", "footer"]);
        assert!(result.sections.iter().all(|s| s.screenshot_path.is_some()));
        assert_eq!(result.metadata.full_page_height, 930.0);
        assert_eq!(result.raw_data.unwrap().colors[0].hex, "#010203");
        assert!(dir.path().join("out/site/reference/metadata.json").exists());
        assert_eq!(launcher.launches.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn launch_failure_is_retried_then_reported() {
        let dir = TempDir::new().unwrap();
        struct Broken(AtomicUsize);
        #[async_trait]
        impl BrowserLauncher for Broken {
            async fn launch(&self, _options: &LaunchOptions) -> Result<Box<dyn PageDriver>> {
                self.0.fetch_add(1, Ordering::SeqCst);
                Err(CaptureError::browser("chromium crashed"))
            }
        }
        let launcher = Arc::new(Broken(AtomicUsize::new(0)));
        let orchestrator = CaptureOrchestrator::new(config(&dir), launcher.clone());

        let result = orchestrator
            .capture(&CaptureRequest::new("site", "https://example.com"), &ProgressReporter::silent())
            .await;

        assert!(!result.success);
        assert!(result.error.unwrap().contains("chromium crashed"));
        assert_eq!(launcher.0.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn invalid_url_fails_without_launch() {
        let dir = TempDir::new().unwrap();
        let launcher = Arc::new(OnePage {
            page: Mutex::new(None),
            launches: AtomicUsize::new(0),
        });
        let orchestrator = CaptureOrchestrator::new(config(&dir), launcher.clone());

        let result = orchestrator
            .capture(&CaptureRequest::new("site", "mailto:a@b.c"), &ProgressReporter::silent())
            .await;

        assert!(!result.success);
        assert_eq!(launcher.launches.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_section_shot_is_dropped() {
        let dir = TempDir::new().unwrap();
        let orchestrator = CaptureOrchestrator::new(
            config(&dir),
            Arc::new(OnePage {
                page: Mutex::new(None),
                launches: AtomicUsize::new(0),
            }),
        );
        let layout = ArtifactLayout::new(dir.path(), "site").unwrap();

        struct FailingFooter(ScriptedPage);
        #[async_trait]
        impl PageDriver for FailingFooter {
            async fn goto(&mut self, url: &str, timeout: Duration) -> Result<()> {
                self.0.goto(url, timeout).await
            }
            async fn evaluate(&mut self, script: &scripts::PageScript) -> Result<serde_json::Value> {
                self.0.evaluate(script).await
            }
            async fn set_viewport(&mut self, viewport: Viewport) -> Result<()> {
                self.0.set_viewport(viewport).await
            }
            async fn screenshot(&mut self, request: &ScreenshotRequest) -> Result<()> {
                if request.path.ends_with("03-footer.png") {
                    return Err(CaptureError::Screenshot("renderer gone".into()));
                }
                self.0.screenshot(request).await
            }
            async fn close(&mut self) -> Result<()> {
                self.0.close().await
            }
        }

        let mut page = FailingFooter(three_section_page());
        let (detection, sections) = orchestrator
            .detect_and_capture(
                &mut page,
                &layout,
                RetryPolicy::new(1, Duration::ZERO),
                &ProgressReporter::silent(),
            )
            .await
            .unwrap();

        assert_eq!(detection.sections.len(), 3);
        assert_eq!(sections.len(), 2);
        assert!(sections.iter().all(|s| s.section_type.as_str() != "footer"));
        let hero = page.0.screenshots[1].clip.unwrap();
        assert_eq!((hero.y, hero.height), (80.0, 700.0));
        assert!(page.0.count("scroll_to") >= 6);
    }
}
