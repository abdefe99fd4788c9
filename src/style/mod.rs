//! Per-section style extraction.
//!
//! One probe snapshots the section subtree (bounded by depth and per-node
//! child count), the backdrop candidates around its root, and every image on
//! the page. Everything else happens here:
//!
//! - [`normalize`] - allow-list, noise filtering, value normalization
//! - [`background`] - backdrop/ancestor background inheritance for the root
//! - [`markup`] - HTML and JSX renderings with inlined styles
//!
//! Large images overlapping the section that are not part of its subtree
//! are injected as absolutely positioned cover images.

pub mod background;
pub mod markup;
pub mod normalize;

use std::collections::{BTreeMap, HashSet};

use serde::Deserialize;
use tracing::debug;

use crate::browser::scripts;
use crate::browser::{evaluate_as, PageDriver};
use crate::config::StyleConfig;
use crate::types::{BoundingBox, DetectedSection, ElementStyles, ExtractedStyles};
use crate::Result;

use self::background::{inherit_background, Backdrop};
use self::markup::StyledNode;
use self::normalize::{normalize_styles, normalize_value, STYLE_PROPERTIES};

/// One element of the snapshot tree.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct SnapshotNode {
    pub tag: String,
    #[serde(default)]
    pub attributes: BTreeMap<String, String>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(rename = "box", default)]
    pub bounding_box: BoundingBox,
    #[serde(default)]
    pub style: BTreeMap<String, String>,
    #[serde(default)]
    pub children: Vec<SnapshotNode>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PageImage {
    #[serde(default)]
    pub src: String,
    #[serde(default)]
    pub alt: String,
    #[serde(rename = "box")]
    pub bounding_box: BoundingBox,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct SectionSnapshot {
    #[serde(default)]
    pub tree: Option<SnapshotNode>,
    #[serde(default)]
    pub backdrop: Option<Backdrop>,
    #[serde(default)]
    pub images: Vec<PageImage>,
}

#[derive(Debug, Clone)]
pub struct StyleExtractor {
    config: StyleConfig,
}

impl StyleExtractor {
    pub fn new(config: StyleConfig) -> Self {
        Self { config }
    }

    /// `Ok(None)` when the section's element cannot be found.
    pub async fn extract(
        &self,
        page: &mut dyn PageDriver,
        section: &DetectedSection,
    ) -> Result<Option<ExtractedStyles>> {
        let script = scripts::section_snapshot(
            section.element_ref.as_deref(),
            &section.bounding_box,
            self.config.max_depth,
            self.config.max_children,
            STYLE_PROPERTIES,
        );
        let snapshot: SectionSnapshot = evaluate_as(page, &script).await?;
        let styles = self.build(snapshot, &section.bounding_box);
        if styles.is_none() {
            debug!(section = %section.id, "no element found for section");
        }
        Ok(styles)
    }

    /// Pure half of [`extract`](Self::extract).
    pub fn build(&self, snapshot: SectionSnapshot, section_box: &BoundingBox) -> Option<ExtractedStyles> {
        let tree = snapshot.tree?;

        let mut elements = Vec::new();
        let mut root = styled(&tree, "0".to_string(), &mut elements);

        let inherited = snapshot.backdrop.as_ref().and_then(inherit_background);
        if let Some(bg) = &inherited {
            if let Some(color) = &bg.color {
                root.styles
                    .insert("backgroundColor".into(), normalize_value("backgroundColor", color));
            }
            if let Some(image) = &bg.image {
                root.styles
                    .insert("backgroundImage".into(), normalize_value("backgroundImage", image));
            }
            if let Some(entry) = elements.first_mut() {
                entry.styles = root.styles.clone();
            }
        }
        let root_styles = root.styles.clone();

        let orphans = self.orphan_images(&root, &snapshot.images, section_box);
        let injected_images = orphans.len();
        if injected_images > 0 {
            root.styles
                .entry("position".into())
                .or_insert_with(|| "relative".into());
            let mut children = orphans;
            children.append(&mut root.children);
            root.children = children;
        }

        Some(ExtractedStyles {
            root: root_styles,
            elements,
            html: markup::render_html(&root),
            jsx: markup::render_jsx(&root),
            inherited_background: inherited.map(|bg| bg.source),
            injected_images,
        })
    }

    /// Large page images overlapping the section's y-range that the subtree
    /// does not already contain.
    fn orphan_images(
        &self,
        root: &StyledNode,
        images: &[PageImage],
        section_box: &BoundingBox,
    ) -> Vec<StyledNode> {
        let mut present = Vec::new();
        root.image_sources(&mut present);
        let mut seen: HashSet<String> = present.into_iter().collect();

        images
            .iter()
            .filter(|img| {
                let b = img.bounding_box;
                !img.src.is_empty()
                    && b.width > self.config.orphan_image_min_width
                    && b.height > self.config.orphan_image_min_height
                    && b.overlaps_y_range(section_box.y, section_box.bottom())
            })
            .filter(|img| seen.insert(img.src.clone()))
            .map(|img| orphan_node(img, section_box))
            .collect()
    }
}

/// Builds the styled tree, recording each element's styles under its
/// child-index path.
fn styled(node: &SnapshotNode, path: String, elements: &mut Vec<ElementStyles>) -> StyledNode {
    let styles = normalize_styles(&node.style);
    elements.push(ElementStyles {
        path: path.clone(),
        tag: node.tag.clone(),
        styles: styles.clone(),
    });
    let children = node
        .children
        .iter()
        .enumerate()
        .map(|(index, child)| styled(child, format!("{path}.{index}"), elements))
        .collect();
    StyledNode {
        tag: node.tag.clone(),
        attributes: node.attributes.clone(),
        text: node.text.clone(),
        styles,
        children,
    }
}

fn orphan_node(image: &PageImage, section_box: &BoundingBox) -> StyledNode {
    let b = image.bounding_box;
    let px = |v: f64| format!("{}px", v.round());
    let styles = [
        ("position", "absolute".to_string()),
        ("top", px(b.y - section_box.y)),
        ("left", px(b.x - section_box.x)),
        ("width", px(b.width)),
        ("height", px(b.height)),
        ("objectFit", "cover".to_string()),
        ("zIndex", "0".to_string()),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v))
    .collect();

    let mut attributes = BTreeMap::new();
    attributes.insert("src".to_string(), image.src.clone());
    attributes.insert("alt".to_string(), image.alt.clone());
    StyledNode {
        tag: "img".to_string(),
        attributes,
        text: None,
        styles,
        children: Vec::new(),
    }
}
