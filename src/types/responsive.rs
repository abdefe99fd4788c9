//! Cross-viewport section records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

use super::core::{BoundingBox, DetectedSection};
use super::style::StyleMap;
use crate::viewport::ViewportName;

/// One property whose value changes across breakpoints.
///
/// `base` is the mobile value; `tablet`/`desktop` appear only when the value
/// differs from the previous breakpoint's.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StyleDiff {
    pub property: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tablet: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub desktop: Option<String>,
}

/// A desktop-anchored section with its counterparts at the other viewports.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponsiveSectionInfo {
    #[serde(flatten)]
    pub section: DetectedSection,
    #[serde(default)]
    pub responsive_styles: BTreeMap<ViewportName, StyleMap>,
    #[serde(default)]
    pub responsive_html: BTreeMap<ViewportName, String>,
    #[serde(default)]
    pub responsive_bounding_box: BTreeMap<ViewportName, BoundingBox>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub responsive_screenshots: BTreeMap<ViewportName, PathBuf>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub style_diffs: Vec<StyleDiff>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub design_classes: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewportSummary {
    pub name: ViewportName,
    pub width: u32,
    pub height: u32,
    pub full_page_height: f64,
    pub section_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponsiveMetadata {
    pub url: String,
    pub captured_at: DateTime<Utc>,
    #[serde(default)]
    pub viewports: Vec<ViewportSummary>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponsiveCaptureResult {
    pub success: bool,
    #[serde(default)]
    pub full_page_paths: BTreeMap<ViewportName, PathBuf>,
    #[serde(default)]
    pub sections: Vec<ResponsiveSectionInfo>,
    pub metadata: ResponsiveMetadata,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}
