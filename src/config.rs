use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{CaptureError, Result, Viewport};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub capture: CaptureConfig,
    pub stabilizer: StabilizerConfig,
    pub detector: DetectorConfig,
    pub style: StyleConfig,
    pub cache: CacheConfig,
    pub browser: BrowserConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    pub viewport: Viewport,
    pub max_retries: u32,
    #[serde(with = "humantime_serde")]
    pub page_timeout: Duration,
    #[serde(with = "humantime_serde")]
    pub launch_timeout: Duration,
    #[serde(with = "humantime_serde")]
    pub retry_backoff: Duration,
    pub headless: bool,
    pub output_dir: PathBuf,
    /// Tallest single section screenshot; taller sections are clipped.
    pub max_section_shot_height: f64,
    /// How far past a section the page is scrolled before shooting it.
    pub section_overscroll: f64,
    #[serde(with = "humantime_serde")]
    pub section_image_timeout: Duration,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            viewport: Viewport::default(),
            max_retries: 3,
            page_timeout: Duration::from_secs(30),
            launch_timeout: Duration::from_secs(30),
            retry_backoff: Duration::from_secs(1),
            headless: true,
            output_dir: PathBuf::from("captures"),
            max_section_shot_height: 900.0,
            section_overscroll: 200.0,
            section_image_timeout: Duration::from_secs(2),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StabilizerConfig {
    pub scroll_distance: f64,
    #[serde(with = "humantime_serde")]
    pub scroll_delay: Duration,
    pub max_scroll_iterations: u32,
    pub stable_height_ticks: u32,
    #[serde(with = "humantime_serde")]
    pub scroll_timeout: Duration,
    #[serde(with = "humantime_serde")]
    pub image_timeout: Duration,
    #[serde(with = "humantime_serde")]
    pub font_timeout: Duration,
    #[serde(with = "humantime_serde")]
    pub font_buffer: Duration,
    #[serde(with = "humantime_serde")]
    pub animation_timeout: Duration,
    #[serde(with = "humantime_serde")]
    pub hidden_stable_window: Duration,
    #[serde(with = "humantime_serde")]
    pub hidden_timeout: Duration,
    #[serde(with = "humantime_serde")]
    pub hero_timeout: Duration,
    #[serde(with = "humantime_serde")]
    pub base_settle: Duration,
    #[serde(with = "humantime_serde")]
    pub poll_interval: Duration,
    pub dismiss_consent: bool,
}

impl Default for StabilizerConfig {
    fn default() -> Self {
        Self {
            scroll_distance: 300.0,
            scroll_delay: Duration::from_millis(500),
            max_scroll_iterations: 1000,
            stable_height_ticks: 5,
            scroll_timeout: Duration::from_secs(30),
            image_timeout: Duration::from_secs(10),
            font_timeout: Duration::from_secs(5),
            font_buffer: Duration::from_millis(100),
            animation_timeout: Duration::from_secs(5),
            hidden_stable_window: Duration::from_secs(1),
            hidden_timeout: Duration::from_secs(3),
            hero_timeout: Duration::from_secs(2),
            base_settle: Duration::from_secs(3),
            poll_interval: Duration::from_millis(100),
            dismiss_consent: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorConfig {
    pub min_section_height: f64,
    pub named_region_min_height: f64,
    pub full_width_min: f64,
    /// Named regions taller than this fraction of the page are wrappers.
    pub max_page_fraction: f64,
    pub min_viewport_fraction: f64,
    pub merge_overlap_ratio: f64,
    pub overlap_threshold: f64,
    pub coverage_threshold: f64,
    pub min_sections: usize,
    pub max_sections: usize,
    pub fallback_enabled: bool,
    pub region_attributes: Vec<String>,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            min_section_height: 50.0,
            named_region_min_height: 200.0,
            full_width_min: 1200.0,
            max_page_fraction: 0.7,
            min_viewport_fraction: 0.5,
            merge_overlap_ratio: 0.3,
            overlap_threshold: 0.8,
            coverage_threshold: 0.5,
            min_sections: 3,
            max_sections: 10,
            fallback_enabled: true,
            region_attributes: vec!["data-framer-name".to_string()],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StyleConfig {
    pub max_depth: usize,
    pub max_children: usize,
    pub orphan_image_min_width: f64,
    pub orphan_image_min_height: f64,
    pub extract_styles: bool,
}

impl Default for StyleConfig {
    fn default() -> Self {
        Self {
            max_depth: 10,
            max_children: 50,
            orphan_image_min_width: 400.0,
            orphan_image_min_height: 200.0,
            extract_styles: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub enabled: bool,
    pub dir: PathBuf,
    #[serde(with = "humantime_serde")]
    pub ttl: Duration,
    #[serde(with = "humantime_serde")]
    pub token_ttl: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            dir: PathBuf::from(".pagecap-cache"),
            ttl: Duration::from_secs(12 * 60 * 60),
            token_ttl: Duration::from_secs(24 * 60 * 60),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DriverKind {
    Playwright,
    Chromium,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserConfig {
    pub driver: DriverKind,
    pub node_command: String,
    pub chrome_path: Option<PathBuf>,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            driver: DriverKind::Playwright,
            node_command: "node".to_string(),
            chrome_path: None,
        }
    }
}

impl Config {
    /// `~/.config/pagecap/config.toml`, if a home directory is known.
    pub fn central_config_path() -> Option<PathBuf> {
        std::env::var_os("HOME")
            .map(PathBuf::from)
            .map(|home| home.join(".config").join("pagecap").join("config.toml"))
    }

    /// Priority: explicit path > central config > built-in defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        if let Some(path) = path {
            return Self::from_file(path);
        }
        match Self::central_config_path() {
            Some(central) if central.exists() => Self::from_file(&central),
            _ => Ok(Self::default()),
        }
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_toml_str(&raw)
            .map_err(|e| CaptureError::Config(format!("{}: {}", path.display(), e)))
    }

    pub fn from_toml_str(raw: &str) -> Result<Self> {
        toml::from_str(raw).map_err(|e| CaptureError::Config(e.to_string()))
    }

    pub fn validate(&self) -> Result<()> {
        if self.capture.max_retries == 0 {
            return Err(CaptureError::Config(
                "capture.max_retries must be at least 1".to_string(),
            ));
        }
        if self.stabilizer.scroll_distance <= 0.0 {
            return Err(CaptureError::Config(
                "stabilizer.scroll_distance must be positive".to_string(),
            ));
        }
        for (name, value) in [
            ("detector.overlap_threshold", self.detector.overlap_threshold),
            ("detector.coverage_threshold", self.detector.coverage_threshold),
            ("detector.max_page_fraction", self.detector.max_page_fraction),
            ("detector.merge_overlap_ratio", self.detector.merge_overlap_ratio),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(CaptureError::Config(format!(
                    "{name} must be within 0.0..=1.0, got {value}"
                )));
            }
        }
        if self.detector.max_sections == 0 {
            return Err(CaptureError::Config(
                "detector.max_sections must be at least 1".to_string(),
            ));
        }
        if self.style.max_depth == 0 {
            return Err(CaptureError::Config(
                "style.max_depth must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
