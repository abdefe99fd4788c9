//! Tier 3: equal viewport-height bands with positional types.

use super::{Candidate, CandidateSource};
use crate::types::{BoundingBox, SectionType};

/// Type of band `index` out of `count`.
pub fn band_type(index: usize, count: usize) -> SectionType {
    if index == 0 {
        SectionType::Header
    } else if index + 1 == count {
        SectionType::Footer
    } else if index == 1 {
        SectionType::Hero
    } else if index + 2 == count {
        SectionType::Cta
    } else {
        SectionType::REPEATABLE[(index - 2) % SectionType::REPEATABLE.len()]
    }
}

pub fn split_bands(
    page_width: f64,
    page_height: f64,
    viewport_height: f64,
    max_sections: usize,
    min_height: f64,
) -> Vec<Candidate> {
    if page_height <= 0.0 || viewport_height <= 0.0 {
        return Vec::new();
    }
    let count = ((page_height / viewport_height).ceil() as usize).clamp(1, max_sections.max(1));
    let band_height = page_height / count as f64;
    if band_height < min_height {
        return Vec::new();
    }
    (0..count)
        .map(|index| Candidate {
            section_type: band_type(index, count),
            bounding_box: BoundingBox::new(0.0, index as f64 * band_height, page_width, band_height),
            element_ref: None,
            source: CandidateSource::ViewportSplit,
        })
        .collect()
}
