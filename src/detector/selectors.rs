//! Tier 1: selector-table detection.

use std::collections::HashSet;

use serde::Deserialize;
use tracing::trace;

use super::{Candidate, CandidateSource};
use crate::browser::scripts::{ProbeCandidate, ProbeEntry};
use crate::types::{BoundingBox, SectionType};

/// One selector candidate for a section type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectorRule {
    Css(&'static str),
    /// Section around an h1-h3 containing one of these (lowercase) phrases.
    Heading(&'static [&'static str]),
}

/// Ordered candidates per section type; earlier rules win for singletons.
pub const SELECTOR_TABLE: &[(SectionType, &[SelectorRule])] = &[
    (
        SectionType::Header,
        &[
            SelectorRule::Css("header"),
            SelectorRule::Css("[role='banner']"),
            SelectorRule::Css("[class*='header' i]"),
            SelectorRule::Css("[id*='header' i]"),
            SelectorRule::Css("[class*='navbar' i]"),
            SelectorRule::Css("body > nav"),
        ],
    ),
    (
        SectionType::Hero,
        &[
            SelectorRule::Css("[class*='hero' i]"),
            SelectorRule::Css("[id*='hero' i]"),
            SelectorRule::Css("[class*='jumbotron' i]"),
            SelectorRule::Css("[class*='masthead' i]"),
            SelectorRule::Css("main > section:first-of-type"),
        ],
    ),
    (
        SectionType::Features,
        &[
            SelectorRule::Css("[class*='features' i]"),
            SelectorRule::Css("[id*='feature' i]"),
            SelectorRule::Css("[class*='benefits' i]"),
            SelectorRule::Css("[class*='services' i]"),
            SelectorRule::Heading(&["features", "how it works", "why choose", "benefits"]),
        ],
    ),
    (
        SectionType::Testimonials,
        &[
            SelectorRule::Css("[class*='testimonial' i]"),
            SelectorRule::Css("[id*='testimonial' i]"),
            SelectorRule::Css("[class*='reviews' i]"),
            SelectorRule::Heading(&[
                "testimonials",
                "what our customers",
                "what people say",
                "loved by",
                "reviews",
            ]),
        ],
    ),
    (
        SectionType::Pricing,
        &[
            SelectorRule::Css("[class*='pricing' i]"),
            SelectorRule::Css("[id*='pricing' i]"),
            SelectorRule::Css("[class*='plans' i]"),
            SelectorRule::Heading(&["pricing", "choose your plan", "simple, transparent"]),
        ],
    ),
    (
        SectionType::Cta,
        &[
            SelectorRule::Css("[class*='cta' i]"),
            SelectorRule::Css("[id*='cta' i]"),
            SelectorRule::Css("[class*='call-to-action' i]"),
            SelectorRule::Css("[class*='signup' i]"),
            SelectorRule::Heading(&["get started", "ready to", "start your free", "try it free"]),
        ],
    ),
    (
        SectionType::Footer,
        &[
            SelectorRule::Css("footer"),
            SelectorRule::Css("[role='contentinfo']"),
            SelectorRule::Css("[class*='footer' i]"),
            SelectorRule::Css("[id*='footer' i]"),
        ],
    ),
];

/// Matches reported per selector; bounds probe output on very busy pages.
pub const PER_SELECTOR_LIMIT: usize = 50;

/// The selector table as sent to the page.
pub fn probe_entries() -> Vec<ProbeEntry> {
    SELECTOR_TABLE
        .iter()
        .map(|(section_type, rules)| ProbeEntry {
            section_type: section_type.as_str().to_string(),
            candidates: rules
                .iter()
                .map(|rule| match rule {
                    SelectorRule::Css(css) => ProbeCandidate::Css(css.to_string()),
                    SelectorRule::Heading(phrases) => {
                        ProbeCandidate::Heading(phrases.iter().map(|p| p.to_string()).collect())
                    }
                })
                .collect(),
        })
        .collect()
}

/// One element matched by a selector rule.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SelectorHit {
    #[serde(rename = "type")]
    pub section_type: SectionType,
    pub selector: String,
    #[serde(rename = "ref")]
    pub element_ref: Option<String>,
    pub visible: bool,
    #[serde(rename = "box")]
    pub bounding_box: BoundingBox,
}

/// Singletons keep their first qualifying hit; repeatables keep every hit
/// with a distinct `(type, rounded y, rounded height)` key.
pub fn select_hits(hits: Vec<SelectorHit>, min_height: f64) -> Vec<Candidate> {
    let mut taken_singletons: HashSet<SectionType> = HashSet::new();
    let mut seen_positions: HashSet<(SectionType, i64, i64)> = HashSet::new();
    let mut out = Vec::new();

    for hit in hits {
        if !hit.visible || hit.bounding_box.height <= min_height {
            trace!(selector = %hit.selector, "hit skipped: hidden or too short");
            continue;
        }
        if hit.section_type.is_singleton() {
            if !taken_singletons.insert(hit.section_type) {
                continue;
            }
        } else {
            let key = (
                hit.section_type,
                hit.bounding_box.y.round() as i64,
                hit.bounding_box.height.round() as i64,
            );
            if !seen_positions.insert(key) {
                continue;
            }
        }
        out.push(Candidate {
            section_type: hit.section_type,
            bounding_box: hit.bounding_box,
            element_ref: hit.element_ref,
            source: CandidateSource::Selector(hit.selector),
        });
    }
    out
}
