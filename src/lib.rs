//! Page Capture (pagecap) Library
//!
//! Reverse-engineers a live webpage into typed sections: stabilizes the
//! rendered page, detects its header/hero/features/.../footer regions,
//! screenshots each one and extracts a normalized style contract plus
//! HTML/JSX markup. Responsive mode repeats this at mobile, tablet and
//! desktop widths and derives breakpoint-scoped design tokens.
//!
//! # Module Overview
//!
//! - [`browser`] - Page driver seam (Playwright helper, optional CDP driver) and in-page probes
//! - [`stabilizer`] - Lazy-content, image, font and animation settling
//! - [`detector`] - Three-tier section detection with overlap resolution
//! - [`style`] - Computed-style extraction, background inheritance, markup
//! - [`orchestrator`] - Single-viewport capture with retries and cleanup
//! - [`responsive`] - Multi-viewport capture, alignment and style classification
//! - [`cache`] - Domain-keyed TTL cache of capture results
//! - [`config`] - Configuration file support
//! - [`types`] - Core data types
//! - [`output`] - JSON output schemas
//!
//! # Example
//!
//! ```no_run
//! use pagecap_lib::browser::launcher_for;
//! use pagecap_lib::{CaptureOrchestrator, CaptureRequest, Config, ProgressReporter};
//!
//! # async fn example() -> pagecap_lib::Result<()> {
//! let config = Config::default();
//! let launcher = launcher_for(&config.browser)?;
//! let orchestrator = CaptureOrchestrator::new(config, launcher);
//!
//! let request = CaptureRequest::new("example", "https://example.com");
//! let result = orchestrator.capture(&request, &ProgressReporter::silent()).await;
//! for section in &result.sections {
//!     println!("{} at y={}", section.section_type, section.bounding_box.y);
//! }
//! # Ok(())
//! # }
//! ```

pub mod artifacts;
pub mod browser;
pub mod cache;
pub mod color;
pub mod config;
pub mod detector;
pub mod error;
pub mod orchestrator;
pub mod output;
pub mod progress;
pub mod raw_data;
pub mod responsive;
pub mod retry;
pub mod stabilizer;
pub mod style;
pub mod types;
pub mod viewport;

pub use browser::{BrowserLauncher, LaunchOptions, PageDriver, PageScript, ScreenshotRequest};
pub use cache::{normalize_domain, Cache, CacheEntry};
pub use config::Config;
pub use detector::{Detection, DetectionTier, SectionDetector};
pub use error::{CaptureError, Result};
pub use orchestrator::{CaptureOrchestrator, CaptureRequest};
pub use output::{
    CacheAction, CacheOutput, CaptureOutput, ErrorOutput, PagecapOutput, ResponsiveOutput,
    PAGECAP_OUTPUT_VERSION,
};
pub use progress::{ProgressEvent, ProgressPhase, ProgressReporter};
pub use responsive::{ResponsiveCaptureCoordinator, ResponsiveRequest};
pub use stabilizer::ContentStabilizer;
pub use style::StyleExtractor;
pub use types::{
    BoundingBox, CaptureResult, DetectedSection, ResponsiveCaptureResult, SectionType,
};
pub use viewport::{Viewport, ViewportName};
