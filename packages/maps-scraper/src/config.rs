//! Pipeline tuning: selectors, scroll sizes and settle delays.
//!
//! The delays stand in for "client-side rendering caught up" and are tunable,
//! not contractual.

use std::time::Duration;

/// Selectors that locate the search UI on the maps home page.
#[derive(Debug, Clone)]
pub struct SearchSelectors {
    /// Tried in order; the first that appears is used.
    pub search_inputs: Vec<String>,
    /// Scrollable result list.
    pub feed: String,
    /// Anchor elements whose `href` is a listing identifier.
    pub listing_anchor: String,
    /// Cookie-consent button, clicked if present.
    pub consent_button: String,
}

impl Default for SearchSelectors {
    fn default() -> Self {
        Self {
            search_inputs: vec![
                "input#searchboxinput".to_string(),
                r#"input[name="q"]"#.to_string(),
            ],
            feed: r#"div[role="feed"]"#.to_string(),
            listing_anchor: r#"a[href^="https://www.google.com/maps/place/"]"#.to_string(),
            consent_button: r#"form[action^="https://consent.google.com"] button"#.to_string(),
        }
    }
}

/// Delays and timeouts applied between render-engine interactions.
#[derive(Debug, Clone)]
pub struct Timings {
    /// After opening the maps home page.
    pub initial_load: Duration,
    /// How long to wait for each search input candidate.
    pub search_input_wait: Duration,
    /// Between typing the phrase and pressing Enter.
    pub search_submit: Duration,
    /// How long to wait for the result feed.
    pub feed_wait: Duration,
    /// After each feed scroll.
    pub scroll_settle: Duration,
    /// After the retry scroll when the anchor count stalled.
    pub retry_settle: Duration,
    /// After navigating to a listing page.
    pub detail_settle: Duration,
    /// Extra wait for the URL to pick up `@lat,lng`.
    pub coordinate_settle: Duration,
    /// After every reverse-geocoding call.
    pub geocode_delay: Duration,
}

impl Default for Timings {
    fn default() -> Self {
        Self {
            initial_load: Duration::from_secs(2),
            search_input_wait: Duration::from_secs(10),
            search_submit: Duration::from_secs(1),
            feed_wait: Duration::from_secs(10),
            scroll_settle: Duration::from_secs(2),
            retry_settle: Duration::from_secs(3),
            detail_settle: Duration::from_secs(2),
            coordinate_settle: Duration::from_secs(1),
            geocode_delay: Duration::from_secs(1),
        }
    }
}

impl Timings {
    /// All delays zero. Waits still poll once.
    pub fn instant() -> Self {
        Self {
            initial_load: Duration::ZERO,
            search_input_wait: Duration::ZERO,
            search_submit: Duration::ZERO,
            feed_wait: Duration::ZERO,
            scroll_settle: Duration::ZERO,
            retry_settle: Duration::ZERO,
            detail_settle: Duration::ZERO,
            coordinate_settle: Duration::ZERO,
            geocode_delay: Duration::ZERO,
        }
    }
}

/// Configuration for a pipeline run.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Page the search is submitted from.
    pub maps_url: String,
    pub selectors: SearchSelectors,
    pub timings: Timings,
    /// Vertical pixels per feed scroll.
    pub scroll_delta: i64,
    /// Hard cap on scroll rounds, independent of convergence.
    pub max_scroll_rounds: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            maps_url: "https://www.google.com/maps".to_string(),
            selectors: SearchSelectors::default(),
            timings: Timings::default(),
            scroll_delta: 5000,
            max_scroll_rounds: 50,
        }
    }
}

impl PipelineConfig {
    /// Default selectors with zero delays, for tests and replay.
    pub fn instant() -> Self {
        Self {
            timings: Timings::instant(),
            ..Default::default()
        }
    }

    pub fn with_timings(mut self, timings: Timings) -> Self {
        self.timings = timings;
        self
    }

    pub fn with_geocode_delay(mut self, delay: Duration) -> Self {
        self.timings.geocode_delay = delay;
        self
    }

    pub fn with_max_scroll_rounds(mut self, rounds: usize) -> Self {
        self.max_scroll_rounds = rounds.max(1);
        self
    }

    pub fn with_maps_url(mut self, url: impl Into<String>) -> Self {
        self.maps_url = url.into();
        self
    }
}
