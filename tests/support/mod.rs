//! A fake browser serving a three-section page (header, hero, footer)
//! whose geometry and root styles depend on the current viewport width.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use pagecap_lib::config::Config;
use pagecap_lib::{
    BrowserLauncher, LaunchOptions, PageDriver, PageScript, Result, ScreenshotRequest, Viewport,
};
use serde_json::{json, Value};
use tempfile::TempDir;

/// Section heights (header, hero, footer) at a given width.
fn heights(width: u32) -> [f64; 3] {
    match width {
        w if w >= 1024 => [80.0, 700.0, 150.0],
        w if w >= 768 => [70.0, 800.0, 200.0],
        _ => [60.0, 900.0, 300.0],
    }
}

fn root_style(width: u32) -> Value {
    if width >= 1024 {
        json!({"display": "flex", "paddingLeft": "64px", "paddingRight": "64px"})
    } else {
        json!({"display": "block", "paddingLeft": "16px", "paddingRight": "16px"})
    }
}

#[derive(Debug, Default)]
pub struct Counters {
    pub launches: AtomicUsize,
    pub screenshots: AtomicUsize,
    pub closes: AtomicUsize,
    pub viewports: Mutex<Vec<Viewport>>,
}

pub struct FakePage {
    viewport: Viewport,
    counters: Arc<Counters>,
}

impl FakePage {
    fn page_height(&self) -> f64 {
        heights(self.viewport.width).iter().sum()
    }

    fn hits(&self) -> Value {
        let [header, hero, footer] = heights(self.viewport.width);
        let width = f64::from(self.viewport.width);
        let hit = |kind: &str, y: f64, h: f64| {
            json!({"type": kind, "selector": kind, "ref": format!("r-{kind}"), "visible": true,
                   "box": {"x": 0.0, "y": y, "width": width, "height": h}})
        };
        json!([
            hit("header", 0.0, header),
            hit("hero", header, hero),
            hit("footer", header + hero, footer)
        ])
    }

    fn snapshot(&self) -> Value {
        json!({
            "tree": {
                "tag": "section",
                "attributes": {},
                "box": {"x": 0.0, "y": 0.0, "width": f64::from(self.viewport.width), "height": 100.0},
                "style": root_style(self.viewport.width),
                "children": [{
                    "tag": "h2",
                    "attributes": {},
                    "text": "Hello",
                    "box": {"x": 0.0, "y": 0.0, "width": 200.0, "height": 40.0},
                    "style": {"fontSize": "32px"},
                    "children": []
                }]
            },
            "images": []
        })
    }
}

#[async_trait]
impl PageDriver for FakePage {
    async fn goto(&mut self, _url: &str, _timeout: Duration) -> Result<()> {
        Ok(())
    }

    async fn evaluate(&mut self, script: &PageScript) -> Result<Value> {
        let width = f64::from(self.viewport.width);
        let value = match script.name {
            "page_metrics" => json!({
                "pageHeight": self.page_height(),
                "pageWidth": width,
                "viewportWidth": width,
                "viewportHeight": f64::from(self.viewport.height),
            }),
            "scroll_step" => json!({"scrollY": 0.0, "scrollHeight": self.page_height()}),
            "pending_images" | "running_animations" | "hidden_entrance_count" => json!(0),
            "selector_probe" => self.hits(),
            "fixed_nav_probe" => json!({"viewportWidth": width, "candidates": []}),
            "section_snapshot" => self.snapshot(),
            "raw_page_data" => json!({
                "colors": ["rgb(17, 17, 17)", "rgb(17, 17, 17)", "rgb(255, 255, 255)"],
                "typography": [],
                "spacing": ["16px"],
                "effects": []
            }),
            _ => Value::Null,
        };
        Ok(value)
    }

    async fn set_viewport(&mut self, viewport: Viewport) -> Result<()> {
        self.viewport = viewport;
        if let Ok(mut seen) = self.counters.viewports.lock() {
            seen.push(viewport);
        }
        Ok(())
    }

    async fn screenshot(&mut self, request: &ScreenshotRequest) -> Result<()> {
        self.counters.screenshots.fetch_add(1, Ordering::SeqCst);
        std::fs::write(&request.path, b"\x89PNG\r\n\x1a\n")?;
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        self.counters.closes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[derive(Default)]
pub struct FakeLauncher {
    pub counters: Arc<Counters>,
}

#[async_trait]
impl BrowserLauncher for FakeLauncher {
    async fn launch(&self, options: &LaunchOptions) -> Result<Box<dyn PageDriver>> {
        self.counters.launches.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(FakePage {
            viewport: options.viewport,
            counters: self.counters.clone(),
        }))
    }
}

/// Config rooted in a temp dir with short stabilizer waits.
pub fn config(dir: &TempDir) -> Config {
    let mut config = Config::default();
    config.capture.output_dir = dir.path().join("out");
    config.capture.retry_backoff = Duration::ZERO;
    config.cache.dir = dir.path().join("cache");
    config
}
