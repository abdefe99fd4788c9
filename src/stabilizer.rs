//! Content stabilization.
//!
//! Drives a freshly navigated page through consent dismissal, a
//! scroll-to-bottom-and-back pass, and image/font/animation settling so that a
//! screenshot reflects final content. Every loop is bounded by an iteration
//! cap or a wall-clock limit; only scroll failures are fatal.

use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, info, trace, warn};

use crate::browser::scripts::{self, PageMetrics, ScrollState};
use crate::browser::{evaluate_as, PageDriver, PageScript};
use crate::config::StabilizerConfig;
use crate::progress::{ProgressPhase, ProgressReporter};
use crate::Result;

/// Consent-button selectors, tried in order.
pub const CONSENT_SELECTORS: &[&str] = &[
    "#onetrust-accept-btn-handler",
    "#CybotCookiebotDialogBodyLevelButtonLevelOptinAllowAll",
    "#CybotCookiebotDialogBodyButtonAccept",
    "button[data-cookiefirst-action='accept']",
    ".cc-allow",
    ".cc-btn.cc-dismiss",
    "[aria-label='Accept cookies']",
    "[aria-label='Accept all cookies']",
    "[data-testid='cookie-accept']",
    "button[id*='accept' i][id*='cookie' i]",
    "button[class*='accept' i][class*='cookie' i]",
];

/// Visible button texts (lowercase, exact) tried after the selectors.
pub const CONSENT_TEXTS: &[&str] = &[
    "accept all",
    "accept all cookies",
    "accept cookies",
    "allow all",
    "allow all cookies",
    "accept",
    "i agree",
    "agree",
    "got it",
    "ok",
];

const CONSENT_SETTLE: Duration = Duration::from_millis(500);

/// Why the scroll pass ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrollStop {
    ReachedBottom,
    HeightStable,
    IterationCap,
    TimedOut,
}

/// Tick-by-tick termination logic of the scroll pass.
#[derive(Debug, Clone)]
pub struct ScrollTracker {
    distance: f64,
    max_iterations: u32,
    stable_ticks_needed: u32,
    last_height: f64,
    stable_ticks: u32,
    iterations: u32,
    scrolled: f64,
}

impl ScrollTracker {
    pub fn new(config: &StabilizerConfig, initial_height: f64) -> Self {
        Self {
            distance: config.scroll_distance,
            max_iterations: config.max_scroll_iterations.max(1),
            stable_ticks_needed: config.stable_height_ticks.max(1),
            last_height: initial_height,
            stable_ticks: 0,
            iterations: 0,
            scrolled: 0.0,
        }
    }

    pub fn iterations(&self) -> u32 {
        self.iterations
    }

    /// Records one scroll tick; returns the stop reason once the pass is done.
    pub fn observe(&mut self, state: ScrollState) -> Option<ScrollStop> {
        self.iterations += 1;
        self.scrolled += self.distance;

        if (state.scroll_height - self.last_height).abs() < 0.5 {
            self.stable_ticks += 1;
        } else {
            self.stable_ticks = 0;
            self.last_height = state.scroll_height;
        }

        if self.scrolled >= state.scroll_height {
            Some(ScrollStop::ReachedBottom)
        } else if self.stable_ticks >= self.stable_ticks_needed {
            Some(ScrollStop::HeightStable)
        } else if self.iterations >= self.max_iterations {
            Some(ScrollStop::IterationCap)
        } else {
            None
        }
    }
}

/// Tracks whether a count has held steady for a full window.
#[derive(Debug, Clone)]
pub struct StabilityWindow {
    window: Duration,
    last: Option<u64>,
    since: Instant,
}

impl StabilityWindow {
    pub fn new(window: Duration, now: Instant) -> Self {
        Self {
            window,
            last: None,
            since: now,
        }
    }

    /// True once `count` has been unchanged for at least the window.
    pub fn observe(&mut self, count: u64, now: Instant) -> bool {
        if self.last != Some(count) {
            self.last = Some(count);
            self.since = now;
            return false;
        }
        now.duration_since(self.since) >= self.window
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    Settled,
    TimedOut,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StabilizeReport {
    pub consent: Option<String>,
    pub scroll_stop: ScrollStop,
    pub scroll_ticks: u32,
    pub images: PollOutcome,
    pub animations: PollOutcome,
}

#[derive(Debug, Clone)]
pub struct ContentStabilizer {
    config: StabilizerConfig,
}

impl ContentStabilizer {
    pub fn new(config: StabilizerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &StabilizerConfig {
        &self.config
    }

    /// The full sequence run once after navigation.
    pub async fn stabilize(
        &self,
        page: &mut dyn PageDriver,
        progress: &ProgressReporter,
    ) -> Result<StabilizeReport> {
        let consent = if self.config.dismiss_consent {
            self.dismiss_consent(page).await
        } else {
            None
        };

        progress.emit(ProgressPhase::Scrolling, 20, "Scrolling to load lazy content");
        let (scroll_stop, scroll_ticks) = self.scroll_to_bottom_and_back(page).await?;

        progress.emit(ProgressPhase::WaitingImages, 30, "Waiting for images");
        let images = self.settle_images(page).await;

        progress.emit(ProgressPhase::WaitingFonts, 35, "Waiting for fonts");
        self.settle_fonts(page).await;

        progress.emit(ProgressPhase::WaitingAnimations, 40, "Waiting for animations");
        let animations = self.settle_animations(page).await;

        let report = StabilizeReport {
            consent,
            scroll_stop,
            scroll_ticks,
            images,
            animations,
        };
        info!(
            ?scroll_stop,
            scroll_ticks,
            ?images,
            ?animations,
            "page stabilized"
        );
        Ok(report)
    }

    /// Lighter pass after a viewport resize: scroll and images only.
    pub async fn resettle(&self, page: &mut dyn PageDriver) -> Result<ScrollStop> {
        let (stop, _) = self.scroll_to_bottom_and_back(page).await?;
        self.settle_images(page).await;
        Ok(stop)
    }

    /// Clicks the first visible consent control. Never fails.
    pub async fn dismiss_consent(&self, page: &mut dyn PageDriver) -> Option<String> {
        let script = scripts::dismiss_consent(CONSENT_SELECTORS, CONSENT_TEXTS);
        match evaluate_as::<Option<String>>(page, &script).await {
            Ok(Some(matched)) => {
                debug!(%matched, "dismissed consent banner");
                tokio::time::sleep(CONSENT_SETTLE).await;
                Some(matched)
            }
            Ok(None) => None,
            Err(err) => {
                debug!(error = %err, "consent dismissal skipped");
                None
            }
        }
    }

    /// Scrolls down in fixed steps until the page stops growing, then returns
    /// to the top. The scroll position is reset even after a timeout.
    pub async fn scroll_to_bottom_and_back(
        &self,
        page: &mut dyn PageDriver,
    ) -> Result<(ScrollStop, u32)> {
        let metrics: PageMetrics = evaluate_as(page, &scripts::page_metrics()).await?;
        let mut tracker = ScrollTracker::new(&self.config, metrics.page_height);

        let outcome = tokio::time::timeout(
            self.config.scroll_timeout,
            self.scroll_loop(&mut *page, &mut tracker),
        )
        .await;

        let stop = match outcome {
            Ok(Ok(stop)) => stop,
            Ok(Err(err)) => {
                if let Err(reset) = page.evaluate(&scripts::scroll_to(0.0)).await {
                    debug!(error = %reset, "scroll reset after failed pass failed");
                }
                return Err(err);
            }
            Err(_) => {
                warn!(
                    timeout_ms = self.config.scroll_timeout.as_millis() as u64,
                    ticks = tracker.iterations(),
                    "scroll pass timed out"
                );
                ScrollStop::TimedOut
            }
        };

        page.evaluate(&scripts::scroll_to(0.0)).await?;
        debug!(?stop, ticks = tracker.iterations(), "scroll pass finished");
        Ok((stop, tracker.iterations()))
    }

    async fn scroll_loop(
        &self,
        page: &mut dyn PageDriver,
        tracker: &mut ScrollTracker,
    ) -> Result<ScrollStop> {
        let step = scripts::scroll_step(self.config.scroll_distance);
        loop {
            tokio::time::sleep(self.config.scroll_delay).await;
            let state: ScrollState = evaluate_as(&mut *page, &step).await?;
            trace!(scroll_y = state.scroll_y, height = state.scroll_height, "scroll tick");
            if let Some(stop) = tracker.observe(state) {
                return Ok(stop);
            }
        }
    }

    /// Waits for every non-data-URI image to finish loading.
    pub async fn settle_images(&self, page: &mut dyn PageDriver) -> PollOutcome {
        self.poll_until_zero(page, &scripts::pending_images(), self.config.image_timeout)
            .await
    }

    pub async fn settle_fonts(&self, page: &mut dyn PageDriver) {
        match tokio::time::timeout(
            self.config.font_timeout,
            page.evaluate(&scripts::fonts_ready()),
        )
        .await
        {
            Ok(Ok(_)) => {}
            Ok(Err(err)) => debug!(error = %err, "font readiness probe failed"),
            Err(_) => debug!("font readiness timed out"),
        }
        tokio::time::sleep(self.config.font_buffer).await;
    }

    /// Running animations, then hidden entrance elements, then the hero
    /// heading, then the fixed base settle.
    pub async fn settle_animations(&self, page: &mut dyn PageDriver) -> PollOutcome {
        let outcome = self
            .poll_until_zero(
                page,
                &scripts::running_animations(),
                self.config.animation_timeout,
            )
            .await;
        self.wait_hidden_stable(page).await;
        self.wait_hero_heading(page).await;
        tokio::time::sleep(self.config.base_settle).await;
        outcome
    }

    async fn poll_until_zero(
        &self,
        page: &mut dyn PageDriver,
        script: &PageScript,
        limit: Duration,
    ) -> PollOutcome {
        let deadline = Instant::now() + limit;
        loop {
            match evaluate_as::<u64>(&mut *page, script).await {
                Ok(0) => return PollOutcome::Settled,
                Ok(pending) => trace!(probe = script.name, pending, "still pending"),
                Err(err) => {
                    debug!(probe = script.name, error = %err, "poll abandoned");
                    return PollOutcome::Failed;
                }
            }
            if Instant::now() >= deadline {
                debug!(probe = script.name, "poll timed out");
                return PollOutcome::TimedOut;
            }
            tokio::time::sleep(self.config.poll_interval).await;
        }
    }

    async fn wait_hidden_stable(&self, page: &mut dyn PageDriver) {
        let script = scripts::hidden_entrance_count();
        let started = Instant::now();
        let mut window = StabilityWindow::new(self.config.hidden_stable_window, started);
        loop {
            let count = match evaluate_as::<u64>(&mut *page, &script).await {
                Ok(count) => count,
                Err(err) => {
                    debug!(error = %err, "hidden element probe failed");
                    return;
                }
            };
            let now = Instant::now();
            if count == 0 || window.observe(count, now) {
                return;
            }
            if now.duration_since(started) >= self.config.hidden_timeout {
                debug!(hidden = count, "hidden elements still changing; moving on");
                return;
            }
            tokio::time::sleep(self.config.poll_interval).await;
        }
    }

    async fn wait_hero_heading(&self, page: &mut dyn PageDriver) {
        let script = scripts::hero_heading_visible();
        let deadline = Instant::now() + self.config.hero_timeout;
        loop {
            match evaluate_as::<Option<bool>>(&mut *page, &script).await {
                Ok(None) | Ok(Some(true)) => return,
                Ok(Some(false)) => {}
                Err(err) => {
                    debug!(error = %err, "hero heading probe failed");
                    return;
                }
            }
            if Instant::now() >= deadline {
                debug!("hero heading still hidden");
                return;
            }
            tokio::time::sleep(self.config.poll_interval).await;
        }
    }
}
