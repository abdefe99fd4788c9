//! Overlap filtering, ordering and fixed-navigation merge.

use serde::Deserialize;
use tracing::debug;

use super::{Candidate, CandidateSource};
use crate::types::{BoundingBox, SectionType};

/// A fixed/sticky nav must start this close to the viewport top.
pub const NAV_MAX_TOP: f64 = 50.0;
pub const NAV_MIN_HEIGHT: f64 = 40.0;
pub const NAV_MAX_HEIGHT: f64 = 200.0;
pub const NAV_MIN_LINKS: usize = 3;

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FixedNavProbe {
    #[serde(default)]
    pub viewport_width: f64,
    #[serde(default)]
    pub candidates: Vec<FixedNavCandidate>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FixedNavCandidate {
    pub viewport_top: f64,
    pub links: usize,
    #[serde(rename = "box")]
    pub bounding_box: BoundingBox,
}

impl FixedNavProbe {
    /// First candidate that looks like a top navigation bar.
    pub fn navigation_bar(&self) -> Option<BoundingBox> {
        self.candidates
            .iter()
            .find(|c| {
                let b = c.bounding_box;
                c.viewport_top.abs() <= NAV_MAX_TOP
                    && (NAV_MIN_HEIGHT..=NAV_MAX_HEIGHT).contains(&b.height)
                    && c.links >= NAV_MIN_LINKS
                    && b.width >= self.viewport_width * 0.5
            })
            .map(|c| c.bounding_box)
    }
}

/// Whether two boxes overlap by more than `threshold` of the smaller area.
pub fn overlaps_too_much(a: &BoundingBox, b: &BoundingBox, threshold: f64) -> bool {
    let smaller = a.area().min(b.area());
    if smaller <= 0.0 {
        return false;
    }
    a.intersection_area(b) / smaller > threshold
}

/// Keeps candidates in discovery order, dropping any that overlap an
/// already-kept one too much.
pub fn filter_overlaps(candidates: Vec<Candidate>, threshold: f64) -> Vec<Candidate> {
    let mut kept: Vec<Candidate> = Vec::with_capacity(candidates.len());
    for candidate in candidates {
        let clash = kept
            .iter()
            .any(|k| overlaps_too_much(&k.bounding_box, &candidate.bounding_box, threshold));
        if clash {
            debug!(
                section_type = %candidate.section_type,
                y = candidate.bounding_box.y,
                "dropping overlapping candidate"
            );
            continue;
        }
        kept.push(candidate);
    }
    kept
}

pub fn sort_by_position(candidates: &mut [Candidate]) {
    candidates.sort_by(|a, b| a.bounding_box.y.total_cmp(&b.bounding_box.y));
}

/// Folds a detected fixed navigation bar into the header.
///
/// An existing header grows to cover the bar unless the grown box would
/// overlap another section too much, in which case the bar is dropped.
/// Without a header, the bar becomes the header under the same overlap rule.
/// The list is left sorted by position either way.
pub fn merge_fixed_nav(candidates: &mut Vec<Candidate>, nav: BoundingBox, threshold: f64) {
    if let Some(idx) = candidates
        .iter()
        .position(|c| c.section_type == SectionType::Header)
    {
        let grown = candidates[idx].bounding_box.union(&nav);
        let collides = candidates
            .iter()
            .enumerate()
            .any(|(i, c)| i != idx && overlaps_too_much(&c.bounding_box, &grown, threshold));
        if collides {
            debug!("growing the header over the fixed navigation would swallow a section; nav dropped");
        } else {
            candidates[idx].bounding_box = grown;
        }
        sort_by_position(candidates);
        return;
    }
    if candidates
        .iter()
        .any(|c| overlaps_too_much(&c.bounding_box, &nav, threshold))
    {
        debug!("fixed navigation overlaps a section; not promoted to header");
        sort_by_position(candidates);
        return;
    }
    candidates.push(Candidate {
        section_type: SectionType::Header,
        bounding_box: nav,
        element_ref: None,
        source: CandidateSource::FixedNav,
    });
    sort_by_position(candidates);
}
