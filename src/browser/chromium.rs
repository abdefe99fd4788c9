//! Native Chrome DevTools Protocol driver on `chromiumoxide`.
//!
//! Avoids the Node.js dependency at the cost of a heavier build; enabled with
//! the `chromium` cargo feature and `browser.driver = "chromium"`.

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig as CdpBrowserConfig};
use chromiumoxide::cdp::browser_protocol::emulation::SetDeviceMetricsOverrideParams;
use chromiumoxide::cdp::browser_protocol::page::{CaptureScreenshotFormat, Viewport as CdpClip};
use chromiumoxide::cdp::js_protocol::runtime::EvaluateParams;
use chromiumoxide::handler::viewport::Viewport as CdpViewport;
use chromiumoxide::page::ScreenshotParams;
use chromiumoxide::Page;
use futures::StreamExt;
use serde_json::Value;
use tokio::task::JoinHandle;
use tracing::debug;

use super::{BrowserLauncher, LaunchOptions, PageDriver, PageScript, ScreenshotRequest};
use crate::{CaptureError, Result, Viewport};

#[derive(Debug, Clone, Default)]
pub struct ChromiumLauncher {
    chrome_path: Option<PathBuf>,
}

impl ChromiumLauncher {
    pub fn new(chrome_path: Option<PathBuf>) -> Self {
        Self { chrome_path }
    }
}

fn cdp_error(context: &str, err: impl std::fmt::Display) -> CaptureError {
    CaptureError::Browser(format!("{context}: {err}"))
}

#[async_trait]
impl BrowserLauncher for ChromiumLauncher {
    async fn launch(&self, options: &LaunchOptions) -> Result<Box<dyn PageDriver>> {
        let mut builder = CdpBrowserConfig::builder()
            .window_size(options.viewport.width, options.viewport.height)
            .viewport(CdpViewport {
                width: options.viewport.width,
                height: options.viewport.height,
                device_scale_factor: None,
                emulating_mobile: false,
                is_landscape: false,
                has_touch: false,
            });
        if !options.headless {
            builder = builder.with_head();
        }
        if let Some(path) = &self.chrome_path {
            builder = builder.chrome_executable(path);
        }
        let config = builder
            .build()
            .map_err(|e| cdp_error("invalid chromium configuration", e))?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| cdp_error("failed to launch chromium executable", e))?;
        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if event.is_err() {
                    break;
                }
            }
        });

        let page = browser
            .new_page("about:blank")
            .await
            .map_err(|e| cdp_error("failed to open page", e))?;
        debug!(viewport = %options.viewport, "chromium page ready");

        Ok(Box::new(ChromiumSession {
            browser,
            page,
            handler_task,
            command_timeout: options.command_timeout,
            closed: false,
        }))
    }
}

pub struct ChromiumSession {
    browser: Browser,
    page: Page,
    handler_task: JoinHandle<()>,
    command_timeout: Duration,
    closed: bool,
}

impl ChromiumSession {
    async fn bounded<T, F>(&self, operation: &str, limit: Duration, fut: F) -> Result<T>
    where
        F: std::future::Future<Output = Result<T>>,
    {
        tokio::time::timeout(limit, fut)
            .await
            .map_err(|_| CaptureError::timeout(operation, limit))?
    }
}

#[async_trait]
impl PageDriver for ChromiumSession {
    async fn goto(&mut self, url: &str, timeout: Duration) -> Result<()> {
        let page = self.page.clone();
        let url = url.to_string();
        self.bounded("navigation", timeout, async move {
            page.goto(url.as_str())
                .await
                .map_err(|e| CaptureError::Navigation(e.to_string()))?;
            page.wait_for_navigation()
                .await
                .map_err(|e| CaptureError::Navigation(e.to_string()))?;
            Ok(())
        })
        .await
    }

    async fn evaluate(&mut self, script: &PageScript) -> Result<Value> {
        let params = EvaluateParams::builder()
            .expression(script.source.clone())
            .await_promise(true)
            .return_by_value(true)
            .build()
            .map_err(|e| cdp_error("invalid evaluate parameters", e))?;
        let page = self.page.clone();
        let name = script.name;
        self.bounded(name, self.command_timeout, async move {
            let result = page
                .evaluate_expression(params)
                .await
                .map_err(|e| CaptureError::Browser(format!("probe '{name}' failed: {e}")))?;
            Ok(result.value().cloned().unwrap_or(Value::Null))
        })
        .await
    }

    async fn set_viewport(&mut self, viewport: Viewport) -> Result<()> {
        let params = SetDeviceMetricsOverrideParams::new(
            i64::from(viewport.width),
            i64::from(viewport.height),
            1.0,
            false,
        );
        let page = self.page.clone();
        self.bounded("resize", self.command_timeout, async move {
            page.execute(params)
                .await
                .map_err(|e| cdp_error("failed to resize viewport", e))?;
            Ok(())
        })
        .await
    }

    async fn screenshot(&mut self, request: &ScreenshotRequest) -> Result<()> {
        let mut params = ScreenshotParams::builder()
            .format(CaptureScreenshotFormat::Png)
            .full_page(request.full_page && request.clip.is_none());
        if let Some(clip) = request.clip {
            params = params.clip(CdpClip {
                x: clip.x,
                y: clip.y,
                width: clip.width,
                height: clip.height,
                scale: 1.0,
            });
        }
        let params = params.build();
        let page = self.page.clone();
        let path = request.path.clone();
        self.bounded("screenshot", self.command_timeout, async move {
            page.save_screenshot(params, &path)
                .await
                .map_err(|e| CaptureError::Screenshot(e.to_string()))?;
            Ok(())
        })
        .await
    }

    async fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        if let Err(err) = self.browser.close().await {
            debug!(error = %err, "chromium close failed");
        }
        let _ = self.browser.wait().await;
        self.handler_task.abort();
        Ok(())
    }
}
