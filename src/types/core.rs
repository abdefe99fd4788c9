//! Core section types shared by detection, capture and responsive alignment.
//!
//! - [`BoundingBox`] - Page-coordinate rectangle (y includes scroll offset)
//! - [`SectionType`] - Closed set of semantic section kinds
//! - [`DetectedSection`] - One located, typed page region

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use super::style::ExtractedStyles;

/// Rectangle bounds in page coordinates (origin top-left of the document).
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoundingBox {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl BoundingBox {
    /// Negative sizes (which a measurement glitch can produce) clamp to zero.
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width: width.max(0.0),
            height: height.max(0.0),
        }
    }

    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    pub fn area(&self) -> f64 {
        self.width * self.height
    }

    pub fn intersection_area(&self, other: &BoundingBox) -> f64 {
        let w = (self.right().min(other.right()) - self.x.max(other.x)).max(0.0);
        let h = self.vertical_overlap(other);
        w * h
    }

    pub fn vertical_overlap(&self, other: &BoundingBox) -> f64 {
        (self.bottom().min(other.bottom()) - self.y.max(other.y)).max(0.0)
    }

    /// Whether the vertical extents touch at all.
    pub fn overlaps_y_range(&self, top: f64, bottom: f64) -> bool {
        self.y < bottom && self.bottom() > top
    }

    pub fn union(&self, other: &BoundingBox) -> BoundingBox {
        let x = self.x.min(other.x);
        let y = self.y.min(other.y);
        BoundingBox::new(
            x,
            y,
            self.right().max(other.right()) - x,
            self.bottom().max(other.bottom()) - y,
        )
    }
}

/// Semantic kind of a page section.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SectionType {
    Header,
    Hero,
    Features,
    Testimonials,
    Pricing,
    Cta,
    Footer,
}

impl SectionType {
    /// Discovery order for selector-based detection.
    pub const ALL: [SectionType; 7] = [
        SectionType::Header,
        SectionType::Hero,
        SectionType::Features,
        SectionType::Testimonials,
        SectionType::Pricing,
        SectionType::Cta,
        SectionType::Footer,
    ];

    /// The types that cycle through the middle bands of a viewport split.
    pub const REPEATABLE: [SectionType; 3] = [
        SectionType::Features,
        SectionType::Testimonials,
        SectionType::Pricing,
    ];

    /// At most one instance is expected per page.
    pub fn is_singleton(&self) -> bool {
        matches!(
            self,
            SectionType::Header | SectionType::Hero | SectionType::Cta | SectionType::Footer
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SectionType::Header => "header",
            SectionType::Hero => "hero",
            SectionType::Features => "features",
            SectionType::Testimonials => "testimonials",
            SectionType::Pricing => "pricing",
            SectionType::Cta => "cta",
            SectionType::Footer => "footer",
        }
    }
}

impl fmt::Display for SectionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SectionType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SectionType::ALL
            .into_iter()
            .find(|t| t.as_str() == s.trim().to_ascii_lowercase())
            .ok_or_else(|| format!("unknown section type '{s}'"))
    }
}

/// A located page section.
///
/// `screenshot_path` is filled in once by the orchestrator; sections whose
/// screenshot could not be taken are dropped before results are returned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectedSection {
    pub id: String,
    #[serde(rename = "type")]
    pub section_type: SectionType,
    pub bounding_box: BoundingBox,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub screenshot_path: Option<PathBuf>,
    /// In-page marker used to find the element again for style extraction.
    #[serde(default, skip_serializing)]
    pub element_ref: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub styles: Option<ExtractedStyles>,
}

impl DetectedSection {
    pub fn new(id: impl Into<String>, section_type: SectionType, bounding_box: BoundingBox) -> Self {
        Self {
            id: id.into(),
            section_type,
            bounding_box,
            screenshot_path: None,
            element_ref: None,
            styles: None,
        }
    }

    /// `{NN}-{type}.png`, numbered from 01 in page order.
    pub fn screenshot_file_name(&self, index: usize) -> String {
        format!("{:02}-{}.png", index + 1, self.section_type)
    }
}
