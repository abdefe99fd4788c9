use crate::cache::CacheEntry;
use crate::error::ErrorPayload;
use crate::types::{CaptureResult, ResponsiveCaptureResult};
use serde::{Deserialize, Serialize};

/// Schema version for output payloads.
pub const PAGECAP_OUTPUT_VERSION: &str = "0.1.0";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "kebab-case")]
pub enum PagecapOutput {
    Capture(CaptureOutput),
    Responsive(ResponsiveOutput),
    Cache(CacheOutput),
    Error(ErrorOutput),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaptureOutput {
    pub version: String,
    pub website_id: String,
    #[serde(flatten)]
    pub result: CaptureResult,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponsiveOutput {
    pub version: String,
    pub website_id: String,
    #[serde(flatten)]
    pub result: ResponsiveCaptureResult,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheAction {
    Prune,
    Clear,
    Show,
    List,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheOutput {
    pub version: String,
    pub action: CacheAction,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub removed: Option<usize>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub entries: Vec<CacheEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorOutput {
    pub version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub error: ErrorPayload,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCategory;
    use crate::types::{BoundingBox, CaptureMetadata, DetectedSection, SectionType};
    use chrono::Utc;
    use std::path::PathBuf;

    #[test]
    fn capture_output_serializes_flat() {
        let mut section = DetectedSection::new(
            "section-01",
            SectionType::Hero,
            BoundingBox::new(0.0, 0.0, 1440.0, 700.0),
        );
        section.screenshot_path = Some(PathBuf::from("sections/01-hero.png"));
        let output = PagecapOutput::Capture(CaptureOutput {
            version: PAGECAP_OUTPUT_VERSION.to_string(),
            website_id: "site".to_string(),
            result: CaptureResult {
                success: true,
                full_page_path: Some(PathBuf::from("full-page.png")),
                sections: vec![section],
                metadata: CaptureMetadata {
                    url: "https://example.com".into(),
                    captured_at: Utc::now(),
                    viewport_width: 1440,
                    viewport_height: 900,
                    full_page_height: 700.0,
                },
                raw_data: None,
                error: None,
                from_cache: false,
            },
        });

        let json = serde_json::to_string(&output).expect("serialize capture output");
        assert!(json.contains("\"mode\":\"capture\""));
        assert!(json.contains("\"websiteId\":\"site\""));
        assert!(json.contains("\"success\":true"));
        assert!(json.contains("\"type\":\"hero\""));
        assert!(!json.contains("fromCache"));
    }

    #[test]
    fn cache_output_serializes() {
        let output = PagecapOutput::Cache(CacheOutput {
            version: PAGECAP_OUTPUT_VERSION.to_string(),
            action: CacheAction::Prune,
            removed: Some(2),
            entries: vec![],
        });
        let json = serde_json::to_string(&output).expect("serialize cache output");
        assert!(json.contains("\"mode\":\"cache\""));
        assert!(json.contains("\"action\":\"prune\""));
        assert!(json.contains("\"removed\":2"));
    }

    #[test]
    fn error_output_serializes() {
        let output = PagecapOutput::Error(ErrorOutput {
            version: PAGECAP_OUTPUT_VERSION.to_string(),
            message: Some("bad".into()),
            error: ErrorPayload {
                category: ErrorCategory::Config,
                message: "bad".into(),
                remediation: None,
            },
        });
        let json = serde_json::to_string(&output).expect("serialize error output");
        assert!(json.contains("\"mode\":\"error\""));
        assert!(json.contains("\"category\":\"config\""));
    }
}
