//! Section detection.
//!
//! Three tiers run as a fallback ladder, each only when the previous one
//! covers too little of the page:
//!
//! - [`selectors`] - per-type selector table (semantic tags, roles, class/id
//!   fragments, heading text)
//! - [`regions`] - named page-builder regions and sticky full-bleed blocks
//! - [`split`] - equal viewport-height bands with positional types
//!
//! Whatever tier wins goes through [`postprocess`]: overlap filtering in
//! discovery order, sorting by `y`, and the fixed-navigation merge.

pub mod postprocess;
pub mod regions;
pub mod selectors;
pub mod split;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::browser::scripts::{self, PageMetrics};
use crate::browser::{evaluate_as, PageDriver};
use crate::config::DetectorConfig;
use crate::types::{BoundingBox, DetectedSection, SectionType};
use crate::Result;

use self::postprocess::FixedNavProbe;
use self::regions::RegionProbe;
use self::selectors::SelectorHit;

/// Where a candidate came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CandidateSource {
    Selector(String),
    NamedRegion,
    Sticky,
    ViewportSplit,
    FixedNav,
}

/// A typed region before ids are assigned.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub section_type: SectionType,
    pub bounding_box: BoundingBox,
    pub element_ref: Option<String>,
    pub source: CandidateSource,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DetectionTier {
    Selectors,
    NamedRegions,
    ViewportSplit,
}

#[derive(Debug, Clone)]
pub struct Detection {
    pub sections: Vec<DetectedSection>,
    pub tier: DetectionTier,
    pub coverage: f64,
    pub metrics: PageMetrics,
}

/// `Σ height / page height`; zero for an empty page.
pub fn coverage(candidates: &[Candidate], page_height: f64) -> f64 {
    if page_height <= 0.0 {
        return 0.0;
    }
    candidates
        .iter()
        .map(|c| c.bounding_box.height)
        .sum::<f64>()
        / page_height
}

#[derive(Debug, Clone)]
pub struct SectionDetector {
    config: DetectorConfig,
}

impl SectionDetector {
    pub fn new(config: DetectorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &DetectorConfig {
        &self.config
    }

    fn clears_bar(&self, candidates: &[Candidate], page_height: f64) -> bool {
        candidates.len() >= self.config.min_sections
            && coverage(candidates, page_height) >= self.config.coverage_threshold
    }

    /// Runs the ladder against a stabilized page scrolled to the top.
    ///
    /// Only the page-metrics probe is fatal; a failing tier probe counts as
    /// a tier that found nothing.
    pub async fn detect(&self, page: &mut dyn PageDriver) -> Result<Detection> {
        let metrics: PageMetrics = evaluate_as(page, &scripts::page_metrics()).await?;

        let probe = scripts::selector_probe(&selectors::probe_entries(), selectors::PER_SELECTOR_LIMIT);
        let hits: Vec<SelectorHit> = evaluate_as(page, &probe).await.unwrap_or_else(|err| {
            debug!(error = %err, "selector probe failed");
            Vec::new()
        });
        let tier1 = selectors::select_hits(hits, self.config.min_section_height);

        let (chosen, tier) = if self.clears_bar(&tier1, metrics.page_height) {
            (tier1, DetectionTier::Selectors)
        } else {
            let probe = scripts::named_region_probe(&self.config.region_attributes);
            let regions: RegionProbe = evaluate_as(page, &probe).await.unwrap_or_else(|err| {
                debug!(error = %err, "named region probe failed");
                RegionProbe::default()
            });
            self.fall_back(tier1, regions, &metrics)
        };

        let nav = evaluate_as::<FixedNavProbe>(page, &scripts::fixed_nav_probe())
            .await
            .map_err(|err| debug!(error = %err, "fixed nav probe failed"))
            .ok()
            .and_then(|probe| probe.navigation_bar());

        let sections = self.finalize(chosen, nav);
        let coverage = coverage_of(&sections, metrics.page_height);
        info!(
            ?tier,
            sections = sections.len(),
            coverage,
            "sections detected"
        );
        Ok(Detection {
            sections,
            tier,
            coverage,
            metrics,
        })
    }

    /// Tier 2 replaces tier 1 only with enough sections and strictly better
    /// coverage; if neither clears the bar, tier 3 takes over.
    pub fn fall_back(
        &self,
        tier1: Vec<Candidate>,
        regions: RegionProbe,
        metrics: &PageMetrics,
    ) -> (Vec<Candidate>, DetectionTier) {
        let page_height = metrics.page_height;
        let tier1_coverage = coverage(&tier1, page_height);
        let tier2 = regions::classify_regions(regions, metrics, &self.config);
        let tier2_coverage = coverage(&tier2, page_height);
        debug!(
            tier1 = tier1.len(),
            tier1_coverage,
            tier2 = tier2.len(),
            tier2_coverage,
            "selector coverage insufficient"
        );

        let (best, tier) =
            if tier2.len() >= self.config.min_sections && tier2_coverage > tier1_coverage {
                (tier2, DetectionTier::NamedRegions)
            } else {
                (tier1, DetectionTier::Selectors)
            };

        if self.clears_bar(&best, page_height) || !self.config.fallback_enabled {
            return (best, tier);
        }
        let bands = split::split_bands(
            metrics.page_width.max(metrics.viewport_width),
            page_height,
            metrics.viewport_height,
            self.config.max_sections,
            self.config.min_section_height,
        );
        (bands, DetectionTier::ViewportSplit)
    }

    /// Overlap filter, y-ordering, nav merge and id assignment.
    pub fn finalize(&self, candidates: Vec<Candidate>, nav: Option<BoundingBox>) -> Vec<DetectedSection> {
        let mut kept = postprocess::filter_overlaps(candidates, self.config.overlap_threshold);
        postprocess::sort_by_position(&mut kept);
        if let Some(nav) = nav {
            postprocess::merge_fixed_nav(&mut kept, nav, self.config.overlap_threshold);
        }
        kept.into_iter()
            .enumerate()
            .map(|(index, candidate)| {
                let mut section = DetectedSection::new(
                    format!("section-{:02}", index + 1),
                    candidate.section_type,
                    candidate.bounding_box,
                );
                section.element_ref = candidate.element_ref;
                section
            })
            .collect()
    }
}

fn coverage_of(sections: &[DetectedSection], page_height: f64) -> f64 {
    if page_height <= 0.0 {
        return 0.0;
    }
    sections.iter().map(|s| s.bounding_box.height).sum::<f64>() / page_height
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::browser::fake::ScriptedPage;
    use crate::CaptureError;
    use serde_json::{json, Value};

    fn metrics(page_height: f64) -> Value {
        json!({"pageHeight": page_height, "pageWidth": 1440.0, "viewportWidth": 1440.0, "viewportHeight": 900.0})
    }

    fn hit(section_type: &str, y: f64, height: f64) -> Value {
        json!({
            "type": section_type,
            "selector": "test",
            "ref": format!("r{y}"),
            "visible": true,
            "box": {"x": 0.0, "y": y, "width": 1440.0, "height": height}
        })
    }

    fn candidate(section_type: SectionType, y: f64, height: f64) -> Candidate {
        Candidate {
            section_type,
            bounding_box: BoundingBox::new(0.0, y, 1440.0, height),
            element_ref: None,
            source: CandidateSource::Selector("test".into()),
        }
    }

    #[tokio::test]
    async fn tier_one_at_sixty_percent_is_accepted_unmodified() {
        let mut page = ScriptedPage::new()
            .returning("page_metrics", metrics(1000.0))
            .returning(
                "selector_probe",
                json!([
                    hit("header", 0.0, 100.0),
                    hit("features", 200.0, 150.0),
                    hit("pricing", 500.0, 200.0),
                    hit("footer", 850.0, 150.0),
                ]),
            );
        let detector = SectionDetector::new(DetectorConfig::default());

        let detection = detector.detect(&mut page).await.unwrap();

        assert_eq!(detection.tier, DetectionTier::Selectors);
        assert!((detection.coverage - 0.6).abs() < 1e-9);
        let boxes: Vec<_> = detection
            .sections
            .iter()
            .map(|s| (s.section_type, s.bounding_box.y, s.bounding_box.height))
            .collect();
        assert_eq!(
            boxes,
            vec![
                (SectionType::Header, 0.0, 100.0),
                (SectionType::Features, 200.0, 150.0),
                (SectionType::Pricing, 500.0, 200.0),
                (SectionType::Footer, 850.0, 150.0),
            ]
        );
        assert_eq!(page.count("named_region_probe"), 0);
    }

    #[tokio::test]
    async fn three_section_page_in_order() {
        let mut page = ScriptedPage::new()
            .returning("page_metrics", metrics(930.0))
            .returning(
                "selector_probe",
                json!([
                    hit("header", 0.0, 80.0),
                    hit("hero", 80.0, 700.0),
                    hit("footer", 780.0, 150.0),
                ]),
            );
        let detection = SectionDetector::new(DetectorConfig::default())
            .detect(&mut page)
            .await
            .unwrap();
        let types: Vec<_> = detection.sections.iter().map(|s| s.section_type).collect();
        assert_eq!(
            types,
            vec![SectionType::Header, SectionType::Hero, SectionType::Footer]
        );
        assert_eq!(detection.sections[0].id, "section-01");
        assert_eq!(detection.sections[1].element_ref.as_deref(), Some("r80"));
    }

    #[tokio::test]
    async fn failing_probes_fall_through_to_viewport_split() {
        let mut page = ScriptedPage::new()
            .returning("page_metrics", metrics(3600.0))
            .on("selector_probe", |_| Err(CaptureError::browser("SyntaxError")))
            .on("named_region_probe", |_| Err(CaptureError::browser("boom")));
        let detection = SectionDetector::new(DetectorConfig::default())
            .detect(&mut page)
            .await
            .unwrap();
        assert_eq!(detection.tier, DetectionTier::ViewportSplit);
        assert_eq!(detection.sections.len(), 4);
        assert_eq!(detection.sections[0].section_type, SectionType::Header);
        assert_eq!(detection.sections[3].section_type, SectionType::Footer);
    }

    #[tokio::test]
    async fn metrics_failure_is_fatal() {
        let mut page = ScriptedPage::new().on("page_metrics", |_| Err(CaptureError::browser("gone")));
        assert!(SectionDetector::new(DetectorConfig::default())
            .detect(&mut page)
            .await
            .is_err());
    }

    #[test]
    fn tier_two_needs_strictly_better_coverage() {
        let detector = SectionDetector::new(DetectorConfig::default());
        let page = PageMetrics {
            page_height: 4000.0,
            page_width: 1440.0,
            viewport_width: 1440.0,
            viewport_height: 900.0,
            scroll_y: 0.0,
        };
        let tier1 = vec![
            candidate(SectionType::Header, 0.0, 100.0),
            candidate(SectionType::Footer, 3800.0, 200.0),
        ];
        let named = |name: &str, y: f64, h: f64| regions::NamedRegion {
            element_ref: None,
            name: name.to_string(),
            bounding_box: BoundingBox::new(0.0, y, 1440.0, h),
            background_color: "transparent".into(),
            background_image: "none".into(),
        };
        let probe = RegionProbe {
            regions: vec![
                named("Hero", 100.0, 900.0),
                named("Features", 1000.0, 900.0),
                named("Pricing", 1900.0, 900.0),
            ],
            sticky: vec![],
        };
        let (chosen, tier) = detector.fall_back(tier1, probe, &page);
        assert_eq!(tier, DetectionTier::NamedRegions);
        assert_eq!(chosen.len(), 3);
    }

    #[test]
    fn fallback_disabled_keeps_best_effort() {
        let detector = SectionDetector::new(DetectorConfig {
            fallback_enabled: false,
            ..DetectorConfig::default()
        });
        let page = PageMetrics {
            page_height: 4000.0,
            page_width: 1440.0,
            viewport_width: 1440.0,
            viewport_height: 900.0,
            scroll_y: 0.0,
        };
        let tier1 = vec![candidate(SectionType::Header, 0.0, 100.0)];
        let (chosen, tier) = detector.fall_back(tier1, RegionProbe::default(), &page);
        assert_eq!(tier, DetectionTier::Selectors);
        assert_eq!(chosen.len(), 1);
    }

    #[test]
    fn finalize_sorts_and_assigns_ids() {
        let detector = SectionDetector::new(DetectorConfig::default());
        let sections = detector.finalize(
            vec![
                candidate(SectionType::Footer, 2000.0, 300.0),
                candidate(SectionType::Hero, 100.0, 700.0),
                candidate(SectionType::Features, 120.0, 650.0),
            ],
            Some(BoundingBox::new(0.0, 0.0, 1440.0, 64.0)),
        );
        let summary: Vec<_> = sections
            .iter()
            .map(|s| (s.id.as_str(), s.section_type))
            .collect();
        assert_eq!(
            summary,
            vec![
                ("section-01", SectionType::Header),
                ("section-02", SectionType::Hero),
                ("section-03", SectionType::Footer),
            ]
        );
        for pair in sections.windows(2) {
            assert!(pair[0].bounding_box.y <= pair[1].bounding_box.y);
        }
    }

    #[test]
    fn tier_two_with_equal_coverage_keeps_tier_one() {
        let page = PageMetrics {
            page_height: 4000.0,
            page_width: 1440.0,
            viewport_width: 1440.0,
            viewport_height: 900.0,
            scroll_y: 0.0,
        };
        let tier1 = || {
            vec![
                candidate(SectionType::Header, 0.0, 1200.0),
                candidate(SectionType::Footer, 3200.0, 800.0),
            ]
        };
        let named = |name: &str, y: f64, h: f64| regions::NamedRegion {
            element_ref: None,
            name: name.to_string(),
            bounding_box: BoundingBox::new(0.0, y, 1440.0, h),
            background_color: "transparent".into(),
            background_image: "none".into(),
        };
        let probe = || RegionProbe {
            regions: vec![
                named("Hero", 1200.0, 600.0),
                named("Features", 1800.0, 700.0),
                named("Pricing", 2500.0, 700.0),
            ],
            sticky: vec![],
        };

        let without_split = SectionDetector::new(DetectorConfig {
            fallback_enabled: false,
            ..DetectorConfig::default()
        });
        let (chosen, tier) = without_split.fall_back(tier1(), probe(), &page);
        assert_eq!(tier, DetectionTier::Selectors);
        let types: Vec<_> = chosen.iter().map(|c| c.section_type).collect();
        assert_eq!(types, vec![SectionType::Header, SectionType::Footer]);

        // Two sections never clear the bar, so the split replaces tier 1.
        let detector = SectionDetector::new(DetectorConfig::default());
        let (_, tier) = detector.fall_back(tier1(), probe(), &page);
        assert_eq!(tier, DetectionTier::ViewportSplit);
    }

    #[tokio::test]
    async fn tier_one_clearing_the_bar_skips_named_regions() {
        let mut page = ScriptedPage::new()
            .returning("page_metrics", metrics(2000.0))
            .returning(
                "selector_probe",
                json!([
                    hit("header", 0.0, 100.0),
                    hit("hero", 100.0, 800.0),
                    hit("footer", 1700.0, 300.0),
                ]),
            )
            .returning(
                "named_region_probe",
                json!({"regions": [], "sticky": []}),
            );
        let detector = SectionDetector::new(DetectorConfig::default());

        let detection = detector.detect(&mut page).await.unwrap();

        assert_eq!(detection.tier, DetectionTier::Selectors);
        assert_eq!(detection.sections.len(), 3);
        assert_eq!(page.count("selector_probe"), 1);
        assert_eq!(page.count("named_region_probe"), 0);
    }

    #[test]
    fn finalize_does_not_stretch_a_lower_header_over_the_page() {
        let detector = SectionDetector::new(DetectorConfig::default());
        let sections = detector.finalize(
            vec![
                candidate(SectionType::Hero, 0.0, 800.0),
                candidate(SectionType::Features, 800.0, 700.0),
                candidate(SectionType::Header, 1500.0, 120.0),
                candidate(SectionType::Footer, 1620.0, 300.0),
            ],
            Some(BoundingBox::new(0.0, 0.0, 1440.0, 72.0)),
        );

        let summary: Vec<_> = sections
            .iter()
            .map(|s| (s.section_type, s.bounding_box.y, s.bounding_box.height))
            .collect();
        assert_eq!(
            summary,
            vec![
                (SectionType::Hero, 0.0, 800.0),
                (SectionType::Features, 800.0, 700.0),
                (SectionType::Header, 1500.0, 120.0),
                (SectionType::Footer, 1620.0, 300.0),
            ]
        );
        for (i, a) in sections.iter().enumerate() {
            for b in &sections[i + 1..] {
                assert!(!postprocess::overlaps_too_much(
                    &a.bounding_box,
                    &b.bounding_box,
                    0.8
                ));
            }
        }
    }

    #[test]
    fn finalize_orders_header_grown_by_nav() {
        let detector = SectionDetector::new(DetectorConfig::default());
        let sections = detector.finalize(
            vec![
                candidate(SectionType::Hero, 100.0, 700.0),
                candidate(SectionType::Header, 40.0, 50.0),
            ],
            Some(BoundingBox::new(0.0, 0.0, 1440.0, 72.0)),
        );
        assert_eq!(sections[0].id, "section-01");
        assert_eq!(sections[0].section_type, SectionType::Header);
        assert_eq!(sections[0].bounding_box.height, 90.0);
        assert_eq!(sections[1].section_type, SectionType::Hero);
    }
}
