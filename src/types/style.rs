//! Style extraction output types.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Allow-listed CSS property (camelCase) → computed value, noise removed.
pub type StyleMap = BTreeMap<String, String>;

/// Styles of one element in the extracted subtree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ElementStyles {
    /// Child-index path from the section root, e.g. `0.2.1`; the root is `0`.
    pub path: String,
    pub tag: String,
    pub styles: StyleMap,
}

/// Where an inherited section background came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackgroundSource {
    Backdrop,
    Ancestor,
}

/// Extracted style contract for one section.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractedStyles {
    pub root: StyleMap,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub elements: Vec<ElementStyles>,
    pub html: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub jsx: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inherited_background: Option<BackgroundSource>,
    #[serde(default, skip_serializing_if = "is_zero")]
    pub injected_images: usize,
}

fn is_zero(value: &usize) -> bool {
    *value == 0
}
