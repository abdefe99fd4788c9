//! Cross-viewport section alignment.
//!
//! Sections are matched by type and ordinal: the n-th anchor of a type pairs
//! with the n-th section of that type in every other viewport. Geometry is
//! not consulted, so two same-typed sections that swap order between
//! viewports are paired crosswise.

use std::collections::BTreeMap;

use crate::types::{DetectedSection, ResponsiveSectionInfo, SectionType};
use crate::viewport::ViewportName;

/// The n-th section of `section_type` in `sections`.
fn nth_of_type(
    sections: &[DetectedSection],
    section_type: SectionType,
    n: usize,
) -> Option<&DetectedSection> {
    sections
        .iter()
        .filter(|s| s.section_type == section_type)
        .nth(n)
}

/// Builds one record per anchor section, carrying each viewport's root
/// styles, markup, box and screenshot where a counterpart exists.
pub fn align(
    anchor: ViewportName,
    runs: &BTreeMap<ViewportName, Vec<DetectedSection>>,
) -> Vec<ResponsiveSectionInfo> {
    let Some(anchors) = runs.get(&anchor) else {
        return Vec::new();
    };

    let mut seen: BTreeMap<SectionType, usize> = BTreeMap::new();
    anchors
        .iter()
        .map(|section| {
            let ordinal = seen.entry(section.section_type).or_insert(0);
            let n = *ordinal;
            *ordinal += 1;

            let mut info = ResponsiveSectionInfo {
                section: section.clone(),
                responsive_styles: BTreeMap::new(),
                responsive_html: BTreeMap::new(),
                responsive_bounding_box: BTreeMap::new(),
                responsive_screenshots: BTreeMap::new(),
                style_diffs: Vec::new(),
                design_classes: Vec::new(),
            };
            for (&name, sections) in runs {
                let Some(matched) = nth_of_type(sections, section.section_type, n) else {
                    continue;
                };
                info.responsive_bounding_box
                    .insert(name, matched.bounding_box);
                if let Some(path) = &matched.screenshot_path {
                    info.responsive_screenshots.insert(name, path.clone());
                }
                if let Some(styles) = &matched.styles {
                    info.responsive_styles.insert(name, styles.root.clone());
                    info.responsive_html.insert(name, styles.html.clone());
                }
            }
            info
        })
        .collect()
}

/// Desktop when captured, otherwise the widest captured viewport.
pub fn anchor_viewport<T>(runs: &BTreeMap<ViewportName, T>) -> Option<ViewportName> {
    runs.keys().next_back().copied()
}
