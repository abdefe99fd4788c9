//! On-disk layout of capture artifacts.
//!
//! ```text
//! {base}/{website_id}/reference/full-page.png
//! {base}/{website_id}/reference/sections/01-header.png
//! {base}/{website_id}/reference/metadata.json
//! {base}/{website_id}/reference/{mobile,tablet,desktop}/...   (responsive)
//! {base}/{website_id}/reference/responsive-metadata.json      (responsive)
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::types::{BoundingBox, CaptureMetadata, DetectedSection, ResponsiveMetadata, SectionType};
use crate::viewport::ViewportName;
use crate::{CaptureError, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactLayout {
    root: PathBuf,
}

impl ArtifactLayout {
    pub fn new(base: &Path, website_id: &str) -> Result<Self> {
        let valid = !website_id.is_empty()
            && website_id != "."
            && website_id != ".."
            && !website_id.contains(['/', '\\']);
        if !valid {
            return Err(CaptureError::Config(format!(
                "website id '{website_id}' cannot be used as a directory name"
            )));
        }
        Ok(Self {
            root: base.join(website_id).join("reference"),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Layout for one viewport of a responsive capture.
    pub fn for_viewport(&self, name: ViewportName) -> Self {
        Self {
            root: self.root.join(name.as_str()),
        }
    }

    pub fn full_page(&self) -> PathBuf {
        self.root.join("full-page.png")
    }

    pub fn sections_dir(&self) -> PathBuf {
        self.root.join("sections")
    }

    pub fn section(&self, file_name: &str) -> PathBuf {
        self.sections_dir().join(file_name)
    }

    pub fn metadata(&self) -> PathBuf {
        self.root.join("metadata.json")
    }

    pub fn responsive_metadata(&self) -> PathBuf {
        self.root.join("responsive-metadata.json")
    }

    pub fn prepare(&self) -> Result<()> {
        fs::create_dir_all(self.sections_dir())?;
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SectionRecord {
    pub id: String,
    #[serde(rename = "type")]
    pub section_type: SectionType,
    pub bounding_box: BoundingBox,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub screenshot_path: Option<PathBuf>,
}

/// Contents of `metadata.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetadataFile {
    #[serde(flatten)]
    pub metadata: CaptureMetadata,
    pub sections: Vec<SectionRecord>,
}

impl MetadataFile {
    pub fn new(metadata: &CaptureMetadata, sections: &[DetectedSection]) -> Self {
        Self {
            metadata: metadata.clone(),
            sections: sections
                .iter()
                .map(|s| SectionRecord {
                    id: s.id.clone(),
                    section_type: s.section_type,
                    bounding_box: s.bounding_box,
                    screenshot_path: s.screenshot_path.clone(),
                })
                .collect(),
        }
    }
}

pub fn write_metadata(
    layout: &ArtifactLayout,
    metadata: &CaptureMetadata,
    sections: &[DetectedSection],
) -> Result<PathBuf> {
    let path = layout.metadata();
    write_pretty(&path, &MetadataFile::new(metadata, sections))?;
    Ok(path)
}

pub fn write_responsive_metadata(
    layout: &ArtifactLayout,
    metadata: &ResponsiveMetadata,
) -> Result<PathBuf> {
    let path = layout.responsive_metadata();
    write_pretty(&path, metadata)?;
    Ok(path)
}

fn write_pretty<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, serde_json::to_string_pretty(value)?)?;
    Ok(())
}
