//! Data model for captured pages.

mod capture;
mod core;
mod responsive;
mod style;

pub use self::capture::{
    CaptureMetadata, CaptureResult, ColorUsage, EffectKind, EffectUsage, RawPageData,
    TypographyUsage, ValueUsage,
};
pub use self::core::{BoundingBox, DetectedSection, SectionType};
pub use self::responsive::{
    ResponsiveCaptureResult, ResponsiveMetadata, ResponsiveSectionInfo, StyleDiff,
    ViewportSummary,
};
pub use self::style::{BackgroundSource, ElementStyles, ExtractedStyles, StyleMap};
pub use crate::viewport::{Viewport, ViewportConfig, ViewportName};
