//! Browser automation seam.
//!
//! The capture pipeline talks to a rendered page only through
//! [`PageDriver`], and obtains one per call from a [`BrowserLauncher`];
//! there is no process-wide browser.
//!
//! # Module Structure
//!
//! - [`playwright`] - Node.js Playwright helper spoken to over JSON lines (default)
//! - `chromium` - Native CDP driver on chromiumoxide (`chromium` feature)
//! - [`scripts`] - Named in-page JavaScript probes
//!
//! # Example
//!
//! ```no_run
//! use pagecap_lib::browser::{evaluate_as, launcher_for, scripts, LaunchOptions};
//! use pagecap_lib::config::BrowserConfig;
//! use std::time::Duration;
//!
//! # async fn example() -> pagecap_lib::Result<()> {
//! let launcher = launcher_for(&BrowserConfig::default())?;
//! let mut page = launcher.launch(&LaunchOptions::default()).await?;
//! page.goto("https://example.com", Duration::from_secs(30)).await?;
//! let metrics: scripts::PageMetrics = evaluate_as(page.as_mut(), &scripts::page_metrics()).await?;
//! println!("page is {}px tall", metrics.page_height);
//! page.close().await?;
//! # Ok(())
//! # }
//! ```

#[cfg(feature = "chromium")]
pub mod chromium;
pub mod playwright;
pub mod scripts;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;

use crate::config::{BrowserConfig, DriverKind};
use crate::types::BoundingBox;
use crate::{CaptureError, Result, Viewport};

pub use playwright::PlaywrightLauncher;
pub use scripts::PageScript;

/// Full-page or clipped PNG screenshot written to `path`.
#[derive(Debug, Clone, PartialEq)]
pub struct ScreenshotRequest {
    pub path: PathBuf,
    pub full_page: bool,
    /// Page-coordinate clip rectangle.
    pub clip: Option<BoundingBox>,
}

impl ScreenshotRequest {
    pub fn full_page(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            full_page: true,
            clip: None,
        }
    }

    pub fn clipped(path: impl Into<PathBuf>, clip: BoundingBox) -> Self {
        Self {
            path: path.into(),
            full_page: true,
            clip: Some(clip),
        }
    }
}

#[derive(Debug, Clone)]
pub struct LaunchOptions {
    pub viewport: Viewport,
    pub headless: bool,
    /// Per-command timeout for driver round-trips.
    pub command_timeout: Duration,
}

impl Default for LaunchOptions {
    fn default() -> Self {
        Self {
            viewport: Viewport::default(),
            headless: true,
            command_timeout: Duration::from_secs(60),
        }
    }
}

/// A single rendered page. Operations never run concurrently on one page.
#[async_trait]
pub trait PageDriver: Send {
    async fn goto(&mut self, url: &str, timeout: Duration) -> Result<()>;

    /// Evaluates a probe and returns its JSON result (promises are awaited).
    async fn evaluate(&mut self, script: &PageScript) -> Result<serde_json::Value>;

    async fn set_viewport(&mut self, viewport: Viewport) -> Result<()>;

    async fn screenshot(&mut self, request: &ScreenshotRequest) -> Result<()>;

    /// Releases the page and its browser. Must be safe to call once on any
    /// exit path.
    async fn close(&mut self) -> Result<()>;
}

#[async_trait]
pub trait BrowserLauncher: Send + Sync {
    async fn launch(&self, options: &LaunchOptions) -> Result<Box<dyn PageDriver>>;
}

/// Evaluates `script` and deserializes its result.
pub async fn evaluate_as<T: DeserializeOwned>(
    page: &mut dyn PageDriver,
    script: &PageScript,
) -> Result<T> {
    let value = page.evaluate(script).await?;
    serde_json::from_value(value).map_err(|e| {
        CaptureError::browser(format!("probe '{}' returned unexpected data: {}", script.name, e))
    })
}

/// Picks the launcher configured in `[browser]`.
pub fn launcher_for(config: &BrowserConfig) -> Result<Arc<dyn BrowserLauncher>> {
    match config.driver {
        DriverKind::Playwright => Ok(Arc::new(PlaywrightLauncher::new(
            config.node_command.clone(),
        ))),
        #[cfg(feature = "chromium")]
        DriverKind::Chromium => Ok(Arc::new(chromium::ChromiumLauncher::new(
            config.chrome_path.clone(),
        ))),
        #[cfg(not(feature = "chromium"))]
        DriverKind::Chromium => Err(CaptureError::Config(
            "browser.driver = \"chromium\" requires building with `--features chromium`"
                .to_string(),
        )),
    }
}
