//! Tier 2: named-region and sticky-element detection.
//!
//! Page builders rarely emit semantic tags but do stamp a human-readable
//! region name on each block. Regions are classified by keyword, or by a
//! distinct background when they are tall enough to be a section.

use serde::Deserialize;
use tracing::trace;

use super::{Candidate, CandidateSource};
use crate::browser::scripts::PageMetrics;
use crate::config::DetectorConfig;
use crate::types::{BoundingBox, SectionType};

/// Lowercase name fragments, checked in order.
pub const SECTION_KEYWORDS: &[(&str, SectionType)] = &[
    ("header", SectionType::Header),
    ("navbar", SectionType::Header),
    ("navigation", SectionType::Header),
    ("hero", SectionType::Hero),
    ("testimonial", SectionType::Testimonials),
    ("review", SectionType::Testimonials),
    ("pricing", SectionType::Pricing),
    ("plans", SectionType::Pricing),
    ("call to action", SectionType::Cta),
    ("cta", SectionType::Cta),
    ("signup", SectionType::Cta),
    ("footer", SectionType::Footer),
    ("feature", SectionType::Features),
    ("benefit", SectionType::Features),
    ("service", SectionType::Features),
    ("faq", SectionType::Features),
];

/// Background values meaning "nothing painted".
const TRANSPARENT_BACKGROUNDS: &[&str] = &["", "transparent", "rgba(0, 0, 0, 0)", "none"];

pub fn keyword_type(name: &str) -> Option<SectionType> {
    let name = name.to_ascii_lowercase();
    SECTION_KEYWORDS
        .iter()
        .find(|(keyword, _)| name.contains(keyword))
        .map(|(_, section_type)| *section_type)
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RegionProbe {
    #[serde(default)]
    pub regions: Vec<NamedRegion>,
    #[serde(default)]
    pub sticky: Vec<StickyRegion>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NamedRegion {
    #[serde(rename = "ref")]
    pub element_ref: Option<String>,
    #[serde(default)]
    pub name: String,
    #[serde(rename = "box")]
    pub bounding_box: BoundingBox,
    #[serde(default)]
    pub background_color: String,
    #[serde(default)]
    pub background_image: String,
}

impl NamedRegion {
    pub fn has_distinct_background(&self) -> bool {
        let color = self.background_color.trim();
        let image = self.background_image.trim();
        !TRANSPARENT_BACKGROUNDS.contains(&color) || !TRANSPARENT_BACKGROUNDS.contains(&image)
    }
}

/// A sticky element and its scroll container.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StickyRegion {
    /// Marker of the parent element.
    #[serde(rename = "ref")]
    pub element_ref: Option<String>,
    #[serde(default)]
    pub name: String,
    #[serde(rename = "box")]
    pub bounding_box: BoundingBox,
    pub parent_box: BoundingBox,
    #[serde(default)]
    pub background_color: String,
    #[serde(default)]
    pub background_image: String,
}

impl StickyRegion {
    /// The parent's full extent when it is more than twice as tall as the
    /// sticky element.
    fn as_region(&self) -> Option<NamedRegion> {
        if self.parent_box.height <= 2.0 * self.bounding_box.height {
            return None;
        }
        Some(NamedRegion {
            element_ref: self.element_ref.clone(),
            name: self.name.clone(),
            bounding_box: BoundingBox::new(
                self.parent_box.x.min(self.bounding_box.x),
                self.parent_box.y,
                self.parent_box.width.max(self.bounding_box.width),
                self.parent_box.height,
            ),
            background_color: self.background_color.clone(),
            background_image: self.background_image.clone(),
        })
    }
}

/// Width a region must reach to count as full-bleed. Narrow viewports scale
/// the threshold down so mobile runs can still use this tier.
pub fn full_width_threshold(config: &DetectorConfig, viewport_width: f64) -> f64 {
    config.full_width_min.min(viewport_width * 0.9)
}

pub fn classify_regions(
    probe: RegionProbe,
    metrics: &PageMetrics,
    config: &DetectorConfig,
) -> Vec<Candidate> {
    let min_width = full_width_threshold(config, metrics.viewport_width);
    let max_height = config.max_page_fraction * metrics.page_height;
    let min_distinct_height = config.min_viewport_fraction * metrics.viewport_height;

    let sticky = probe.sticky.iter().filter_map(|s| {
        s.as_region().map(|region| (region, CandidateSource::Sticky))
    });
    let named = probe
        .regions
        .into_iter()
        .map(|region| (region, CandidateSource::NamedRegion));

    let mut semantic = Vec::new();
    let mut distinct = Vec::new();
    for (region, source) in named.chain(sticky) {
        let b = region.bounding_box;
        if b.width < min_width || b.height < config.named_region_min_height || b.height > max_height
        {
            trace!(name = %region.name, "region skipped by size");
            continue;
        }
        if let Some(section_type) = keyword_type(&region.name) {
            semantic.push(Candidate {
                section_type,
                bounding_box: b,
                element_ref: region.element_ref,
                source,
            });
        } else if region.has_distinct_background() && b.height >= min_distinct_height {
            distinct.push(Candidate {
                section_type: SectionType::Features,
                bounding_box: b,
                element_ref: region.element_ref,
                source,
            });
        }
    }

    // Without a named hero, the top-most distinct region starting inside
    // the first viewport takes that role.
    if !semantic.iter().any(|c| c.section_type == SectionType::Hero) {
        if let Some(top) = distinct
            .iter_mut()
            .filter(|c| c.bounding_box.y < metrics.viewport_height)
            .min_by(|a, b| a.bounding_box.y.total_cmp(&b.bounding_box.y))
        {
            top.section_type = SectionType::Hero;
        }
    }

    merge_overlapping(semantic, distinct, config.merge_overlap_ratio)
}

/// Resolves candidates whose vertical overlap exceeds `ratio` of the shorter
/// one: keyword matches beat background matches, then the taller wins.
fn merge_overlapping(semantic: Vec<Candidate>, distinct: Vec<Candidate>, ratio: f64) -> Vec<Candidate> {
    let mut all: Vec<(bool, Candidate)> = semantic
        .into_iter()
        .map(|c| (true, c))
        .chain(distinct.into_iter().map(|c| (false, c)))
        .collect();
    all.sort_by(|a, b| a.1.bounding_box.y.total_cmp(&b.1.bounding_box.y));

    let mut kept: Vec<(bool, Candidate)> = Vec::new();
    for (is_semantic, candidate) in all {
        let conflict = kept.iter().position(|(_, k)| {
            let shorter = k.bounding_box.height.min(candidate.bounding_box.height);
            shorter > 0.0 && k.bounding_box.vertical_overlap(&candidate.bounding_box) / shorter > ratio
        });
        match conflict {
            None => kept.push((is_semantic, candidate)),
            Some(index) => {
                let (kept_semantic, existing) = &kept[index];
                let replace = match (is_semantic, *kept_semantic) {
                    (true, false) => true,
                    (false, true) => false,
                    _ => candidate.bounding_box.height > existing.bounding_box.height,
                };
                if replace {
                    kept[index] = (is_semantic, candidate);
                }
            }
        }
    }
    kept.into_iter().map(|(_, c)| c).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metrics() -> PageMetrics {
        PageMetrics {
            page_height: 5000.0,
            page_width: 1440.0,
            viewport_width: 1440.0,
            viewport_height: 900.0,
            scroll_y: 0.0,
        }
    }

    fn region(name: &str, y: f64, height: f64, bg: &str) -> NamedRegion {
        NamedRegion {
            element_ref: Some(format!("r{y}")),
            name: name.to_string(),
            bounding_box: BoundingBox::new(0.0, y, 1440.0, height),
            background_color: bg.to_string(),
            background_image: "none".to_string(),
        }
    }

    #[test]
    fn keywords_map_to_types() {
        assert_eq!(keyword_type("Hero Section"), Some(SectionType::Hero));
        assert_eq!(keyword_type("FAQ"), Some(SectionType::Features));
        assert_eq!(keyword_type("Customer Testimonials"), Some(SectionType::Testimonials));
        assert_eq!(keyword_type("Wrapper"), None);
    }

    #[test]
    fn size_filters_exclude_wrappers_and_slivers() {
        let probe = RegionProbe {
            regions: vec![
                region("Page Wrapper", 0.0, 4800.0, "rgb(255, 255, 255)"),
                region("Pricing", 1000.0, 150.0, "transparent"),
                region("Pricing", 2000.0, 600.0, "transparent"),
            ],
            sticky: vec![],
        };
        let out = classify_regions(probe, &metrics(), &DetectorConfig::default());
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].section_type, SectionType::Pricing);
        assert_eq!(out[0].bounding_box.y, 2000.0);
    }

    #[test]
    fn distinct_background_needs_half_viewport() {
        let probe = RegionProbe {
            regions: vec![
                region("Block 1", 100.0, 500.0, "rgb(10, 20, 30)"),
                region("Block 2", 1200.0, 300.0, "rgb(10, 20, 30)"),
                region("Block 3", 2000.0, 500.0, "rgba(0, 0, 0, 0)"),
            ],
            sticky: vec![],
        };
        let out = classify_regions(probe, &metrics(), &DetectorConfig::default());
        assert_eq!(out.len(), 1);
        // Top-most distinct region inside the first viewport becomes the hero.
        assert_eq!(out[0].section_type, SectionType::Hero);
    }

    #[test]
    fn narrow_regions_are_ignored_on_desktop() {
        let mut narrow = region("Hero", 0.0, 600.0, "rgb(0, 0, 255)");
        narrow.bounding_box.width = 800.0;
        let probe = RegionProbe {
            regions: vec![narrow],
            sticky: vec![],
        };
        assert!(classify_regions(probe, &metrics(), &DetectorConfig::default()).is_empty());
    }

    #[test]
    fn sticky_child_takes_parent_height() {
        let probe = RegionProbe {
            regions: vec![],
            sticky: vec![StickyRegion {
                element_ref: Some("r9".into()),
                name: "Hero".into(),
                bounding_box: BoundingBox::new(0.0, 0.0, 1440.0, 900.0),
                parent_box: BoundingBox::new(0.0, 0.0, 1440.0, 2700.0),
                background_color: "transparent".into(),
                background_image: "none".into(),
            }],
        };
        let out = classify_regions(probe, &metrics(), &DetectorConfig::default());
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].bounding_box.height, 2700.0);
        assert_eq!(out[0].source, CandidateSource::Sticky);
    }

    #[test]
    fn sticky_without_tall_parent_is_ignored() {
        let sticky = StickyRegion {
            element_ref: None,
            name: "Hero".into(),
            bounding_box: BoundingBox::new(0.0, 0.0, 1440.0, 900.0),
            parent_box: BoundingBox::new(0.0, 0.0, 1440.0, 1500.0),
            background_color: String::new(),
            background_image: String::new(),
        };
        assert!(sticky.as_region().is_none());
    }

    #[test]
    fn overlap_merge_prefers_semantic_then_taller() {
        let probe = RegionProbe {
            regions: vec![
                region("Block", 1000.0, 900.0, "rgb(1, 2, 3)"),
                region("Testimonials", 1100.0, 600.0, "transparent"),
                region("Features A", 2500.0, 500.0, "transparent"),
                region("Features B", 2550.0, 700.0, "transparent"),
            ],
            sticky: vec![],
        };
        let out = classify_regions(probe, &metrics(), &DetectorConfig::default());
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].section_type, SectionType::Testimonials);
        assert_eq!(out[1].bounding_box.height, 700.0);
    }

    #[test]
    fn mobile_viewport_scales_width_threshold() {
        let config = DetectorConfig::default();
        assert_eq!(full_width_threshold(&config, 1440.0), 1200.0);
        assert!((full_width_threshold(&config, 375.0) - 337.5).abs() < 1e-9);
    }
}
