//! Section background inheritance.
//!
//! Page builders often paint a section's background on a full-width child
//! layer, or leave it to an ancestor. When the section root paints nothing,
//! the first backdrop child (then grandchild) and finally the nearest
//! painted ancestor lend it their background.

use serde::Deserialize;

use crate::color::is_painted;
use crate::types::BackgroundSource;

/// Direct children examined for a backdrop layer.
pub const MAX_BACKDROP_CHILDREN: usize = 5;
/// Children of each examined child.
pub const MAX_BACKDROP_GRANDCHILDREN: usize = 3;
/// Minimum width, relative to the root, for a backdrop layer.
pub const BACKDROP_MIN_WIDTH_RATIO: f64 = 0.9;

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Layer {
    #[serde(default)]
    pub width: f64,
    #[serde(default)]
    pub background_color: String,
    #[serde(default)]
    pub background_image: String,
}

impl Layer {
    fn has_gradient(&self) -> bool {
        self.background_image.contains("gradient(")
    }

    fn has_image(&self) -> bool {
        let image = self.background_image.trim();
        !image.is_empty() && image != "none"
    }

    fn paints(&self) -> bool {
        is_painted(&self.background_color) || self.has_image()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct BackdropChild {
    #[serde(flatten)]
    pub layer: Layer,
    #[serde(default)]
    pub children: Vec<Layer>,
}

/// Background candidates around a section root, as reported by the page.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Backdrop {
    pub root: Layer,
    #[serde(default)]
    pub children: Vec<BackdropChild>,
    /// Nearest first.
    #[serde(default)]
    pub ancestors: Vec<Layer>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InheritedBackground {
    pub source: BackgroundSource,
    pub color: Option<String>,
    pub image: Option<String>,
}

impl InheritedBackground {
    fn from_layer(source: BackgroundSource, layer: &Layer) -> Self {
        Self {
            source,
            color: is_painted(&layer.background_color).then(|| layer.background_color.clone()),
            image: layer.has_image().then(|| layer.background_image.clone()),
        }
    }
}

/// `None` when the root already paints its own background or nothing
/// suitable is found.
pub fn inherit_background(backdrop: &Backdrop) -> Option<InheritedBackground> {
    if backdrop.root.paints() {
        return None;
    }

    let min_width = backdrop.root.width * BACKDROP_MIN_WIDTH_RATIO;
    let is_backdrop =
        |layer: &Layer| layer.width >= min_width && (layer.has_gradient() || is_painted(&layer.background_color));

    let children = backdrop.children.iter().take(MAX_BACKDROP_CHILDREN);
    let direct = children.clone().map(|c| &c.layer);
    let nested = children.flat_map(|c| c.children.iter().take(MAX_BACKDROP_GRANDCHILDREN));
    if let Some(layer) = direct.chain(nested).find(|layer| is_backdrop(layer)) {
        return Some(InheritedBackground::from_layer(BackgroundSource::Backdrop, layer));
    }

    backdrop
        .ancestors
        .iter()
        .find(|layer| layer.paints())
        .map(|layer| InheritedBackground::from_layer(BackgroundSource::Ancestor, layer))
}
