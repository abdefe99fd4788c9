//! Multi-viewport capture.
//!
//! The page is loaded and stabilized once at desktop size, then resized to
//! each requested viewport in turn: re-settle, full-page screenshot,
//! detection, per-section screenshots and styles. Desktop sections (or the
//! widest captured viewport's) anchor the cross-viewport alignment.
//!
//! - [`align`] - type/ordinal section matching
//! - [`classify`] - style diffs and breakpoint class tokens

pub mod align;
pub mod classify;

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use chrono::Utc;
use tracing::{error, info, warn};

use crate::artifacts::{self, ArtifactLayout};
use crate::browser::{BrowserLauncher, PageDriver, ScreenshotRequest};
use crate::cache::normalize_domain;
use crate::config::Config;
use crate::orchestrator::{CaptureOrchestrator, CaptureRequest, Resolved};
use crate::progress::{ProgressPhase, ProgressReporter};
use crate::types::{
    CaptureMetadata, DetectedSection, ResponsiveCaptureResult, ResponsiveMetadata,
    ResponsiveSectionInfo, ViewportSummary,
};
use crate::viewport::{ViewportConfig, ViewportName};
use crate::{CaptureError, Result};

#[derive(Debug, Clone, PartialEq)]
pub struct ResponsiveRequest {
    /// `viewport` is ignored; the initial load is always at desktop size.
    pub capture: CaptureRequest,
    pub viewports: Vec<ViewportName>,
}

impl ResponsiveRequest {
    pub fn new(capture: CaptureRequest) -> Self {
        Self {
            capture,
            viewports: ViewportName::ALL.to_vec(),
        }
    }
}

/// What one viewport run produced.
#[derive(Debug, Clone)]
struct ViewportRun {
    full_page_path: PathBuf,
    summary: ViewportSummary,
    sections: Vec<DetectedSection>,
}

pub struct ResponsiveCaptureCoordinator {
    orchestrator: CaptureOrchestrator,
}

impl ResponsiveCaptureCoordinator {
    pub fn new(config: Config, launcher: Arc<dyn BrowserLauncher>) -> Self {
        Self {
            orchestrator: CaptureOrchestrator::new(config, launcher),
        }
    }

    /// Never returns an error; see [`CaptureOrchestrator::capture`].
    pub async fn capture(
        &self,
        request: &ResponsiveRequest,
        progress: &ProgressReporter,
    ) -> ResponsiveCaptureResult {
        let url = request.capture.url.clone();
        let captured_at = Utc::now();
        let fail = |err: CaptureError| {
            error!(%url, error = %err, "responsive capture failed");
            progress.emit(ProgressPhase::Failed, 100, err.to_string());
            ResponsiveCaptureResult {
                success: false,
                full_page_paths: BTreeMap::new(),
                sections: Vec::new(),
                metadata: ResponsiveMetadata {
                    url: url.clone(),
                    captured_at,
                    viewports: Vec::new(),
                },
                error: Some(err.to_string()),
            }
        };

        let mut viewports = request.viewports.clone();
        viewports.sort();
        viewports.dedup();
        if viewports.is_empty() {
            return fail(CaptureError::Config("no viewports requested".to_string()));
        }
        if let Err(err) = normalize_domain(&url) {
            return fail(err);
        }
        let layout = match ArtifactLayout::new(
            &self.orchestrator.config().capture.output_dir,
            &request.capture.website_id,
        ) {
            Ok(layout) => layout,
            Err(err) => return fail(err),
        };

        let mut resolved = self.orchestrator.resolve(&request.capture);
        resolved.viewport = ViewportName::Desktop.config().viewport();

        progress.emit(ProgressPhase::Initializing, 0, "Preparing responsive capture");
        progress.emit(ProgressPhase::Launching, 5, "Launching browser");
        let mut page = match self.orchestrator.launch(&resolved).await {
            Ok(page) => page,
            Err(err) => return fail(err),
        };

        let outcome = self
            .run(page.as_mut(), &url, &resolved, &layout, &viewports, progress)
            .await;
        self.orchestrator.release(page.as_mut()).await;

        let runs = match outcome {
            Ok(runs) => runs,
            Err(err) => return fail(err),
        };

        let Some(anchor) = align::anchor_viewport(&runs) else {
            return fail(CaptureError::Unknown("no viewport produced a capture".to_string()));
        };
        let per_viewport: BTreeMap<ViewportName, Vec<DetectedSection>> = runs
            .iter()
            .map(|(name, run)| (*name, run.sections.clone()))
            .collect();
        let sections: Vec<ResponsiveSectionInfo> = align::align(anchor, &per_viewport)
            .into_iter()
            .map(|mut info| {
                info.style_diffs = classify::style_diffs(&info.responsive_styles);
                info.design_classes = classify::design_classes(&info.style_diffs);
                info
            })
            .collect();

        let metadata = ResponsiveMetadata {
            url: url.clone(),
            captured_at,
            viewports: runs.values().map(|run| run.summary.clone()).collect(),
        };
        if let Err(err) = artifacts::write_responsive_metadata(&layout, &metadata) {
            return fail(err);
        }

        info!(%url, ?anchor, sections = sections.len(), viewports = runs.len(), "responsive capture complete");
        progress.emit(ProgressPhase::Complete, 100, "Responsive capture complete");
        ResponsiveCaptureResult {
            success: true,
            full_page_paths: runs
                .into_iter()
                .map(|(name, run)| (name, run.full_page_path))
                .collect(),
            sections,
            metadata,
            error: None,
        }
    }

    /// Loads once, then runs every viewport. A failing viewport is skipped;
    /// the last error is returned only when none succeeds.
    async fn run(
        &self,
        page: &mut dyn PageDriver,
        url: &str,
        resolved: &Resolved,
        layout: &ArtifactLayout,
        viewports: &[ViewportName],
        progress: &ProgressReporter,
    ) -> Result<BTreeMap<ViewportName, ViewportRun>> {
        self.orchestrator.load(page, url, resolved, progress).await?;

        let mut runs = BTreeMap::new();
        let mut last_error = None;
        for (index, name) in viewports.iter().enumerate() {
            progress.emit(
                ProgressPhase::Capturing,
                ProgressReporter::scaled(45, 95, index, viewports.len()),
                format!("Capturing {name} viewport"),
            );
            match self
                .run_viewport(page, url, name.config(), resolved, &layout.for_viewport(*name), progress)
                .await
            {
                Ok(run) => {
                    runs.insert(*name, run);
                }
                Err(err) => {
                    warn!(viewport = %name, error = %err, "viewport capture failed; skipping");
                    last_error = Some(err);
                }
            }
        }

        match last_error {
            Some(err) if runs.is_empty() => Err(err),
            _ => Ok(runs),
        }
    }

    async fn run_viewport(
        &self,
        page: &mut dyn PageDriver,
        url: &str,
        viewport: ViewportConfig,
        resolved: &Resolved,
        layout: &ArtifactLayout,
        progress: &ProgressReporter,
    ) -> Result<ViewportRun> {
        layout.prepare()?;
        page.set_viewport(viewport.viewport()).await?;
        self.orchestrator.stabilizer().resettle(page).await?;

        let full_page_path = layout.full_page();
        self.orchestrator
            .shoot(page, &ScreenshotRequest::full_page(&full_page_path), resolved.policy)
            .await?;

        let (detection, sections) = self
            .orchestrator
            .detect_and_capture(page, layout, resolved.policy, progress)
            .await?;

        let metadata = CaptureMetadata {
            url: url.to_string(),
            captured_at: Utc::now(),
            viewport_width: viewport.width,
            viewport_height: viewport.height,
            full_page_height: detection.metrics.page_height,
        };
        artifacts::write_metadata(layout, &metadata, &sections)?;

        Ok(ViewportRun {
            full_page_path,
            summary: ViewportSummary {
                name: viewport.name,
                width: viewport.width,
                height: viewport.height,
                full_page_height: detection.metrics.page_height,
                section_count: sections.len(),
            },
            sections,
        })
    }
}
