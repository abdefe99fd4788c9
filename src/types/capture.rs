//! Capture result types returned across the orchestrator boundary.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use super::core::DetectedSection;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaptureMetadata {
    pub url: String,
    pub captured_at: DateTime<Utc>,
    pub viewport_width: u32,
    pub viewport_height: u32,
    pub full_page_height: f64,
}

/// Outcome of a single-viewport capture.
///
/// A capture never fails with an `Err`: infrastructure failures come back
/// as `success: false` with a human-readable `error`. Missing sections are
/// the only signal of partial success.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaptureResult {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_page_path: Option<PathBuf>,
    #[serde(default)]
    pub sections: Vec<DetectedSection>,
    pub metadata: CaptureMetadata,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_data: Option<RawPageData>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Served from the domain cache without launching a browser.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub from_cache: bool,
}

impl CaptureResult {
    pub fn failure(metadata: CaptureMetadata, error: impl Into<String>) -> Self {
        Self {
            success: false,
            full_page_path: None,
            sections: Vec::new(),
            metadata,
            raw_data: None,
            error: Some(error.into()),
            from_cache: false,
        }
    }
}

/// Raw design-token material scraped from every visible element.
///
/// Consumed by the design-token synthesizer; values are aggregated with
/// usage counts, most used first.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawPageData {
    #[serde(default)]
    pub colors: Vec<ColorUsage>,
    #[serde(default)]
    pub typography: Vec<TypographyUsage>,
    #[serde(default)]
    pub spacing: Vec<ValueUsage>,
    #[serde(default)]
    pub effects: Vec<EffectUsage>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColorUsage {
    /// `#rrggbb`, or `#rrggbbaa` when translucent.
    pub hex: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypographyUsage {
    pub font_family: String,
    pub font_size: String,
    pub font_weight: String,
    pub line_height: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValueUsage {
    pub value: String,
    pub count: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EffectKind {
    BoxShadow,
    BorderRadius,
    Filter,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EffectUsage {
    pub kind: EffectKind,
    pub value: String,
    pub count: usize,
}
