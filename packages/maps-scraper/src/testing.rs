//! Testing utilities including mock implementations.
//!
//! These let applications exercise the pipeline without a browser, a
//! geocoding service or a completion API.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Arc, RwLock};

use crate::config::PipelineConfig;
use crate::error::{
    CompletionError, CompletionResult, GeocodeError, GeocodeResult, RenderError, RenderResult,
};
use crate::traits::{
    completion::CompletionService,
    geocoder::{AdminDivisions, ReverseGeocoder},
    render::RenderSession,
};
use crate::types::progress::{ProgressEvent, ProgressObserver};

// =============================================================================
// Render session
// =============================================================================

/// A scripted render session.
///
/// - Selectors registered with [`with_element`](Self::with_element) exist;
///   everything else does not.
/// - Each scroll advances to the next feed snapshot (the last one repeats),
///   and `attribute_values` returns the hrefs of the current snapshot.
/// - Only URLs registered with [`with_page`](Self::with_page) (plus the
///   default maps home page) can be navigated to.
pub struct MockRenderSession {
    elements: Arc<RwLock<HashSet<String>>>,
    enter_failures: Arc<RwLock<HashSet<String>>>,
    feed_snapshots: Arc<RwLock<Vec<Vec<String>>>>,
    pages: Arc<RwLock<HashMap<String, (String, String)>>>,
    current: Arc<RwLock<Option<String>>>,
    scrolls: Arc<RwLock<usize>>,
    calls: Arc<RwLock<Vec<MockRenderCall>>>,
}

/// Record of an interaction with the mock session.
#[derive(Debug, Clone, PartialEq)]
pub enum MockRenderCall {
    Goto { url: String },
    Fill { selector: String, text: String },
    PressEnter { selector: String },
    Click { selector: String },
    Scroll { selector: String, delta_y: i64 },
}

impl MockRenderSession {
    pub fn new() -> Self {
        let home = PipelineConfig::default().maps_url;
        let mut pages = HashMap::new();
        pages.insert(home.clone(), (home, "<html><body></body></html>".to_string()));

        Self {
            elements: Arc::new(RwLock::new(HashSet::new())),
            enter_failures: Arc::new(RwLock::new(HashSet::new())),
            feed_snapshots: Arc::new(RwLock::new(Vec::new())),
            pages: Arc::new(RwLock::new(pages)),
            current: Arc::new(RwLock::new(None)),
            scrolls: Arc::new(RwLock::new(0)),
            calls: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// Make `selector` match.
    pub fn with_element(self, selector: impl Into<String>) -> Self {
        self.elements.write().unwrap().insert(selector.into());
        self
    }

    /// Make pressing Enter on `selector` fail even though it exists.
    pub fn with_enter_failure(self, selector: impl Into<String>) -> Self {
        self.enter_failures.write().unwrap().insert(selector.into());
        self
    }

    /// Append the anchor hrefs rendered after the next scroll.
    pub fn with_feed_snapshot(self, hrefs: Vec<String>) -> Self {
        self.feed_snapshots.write().unwrap().push(hrefs);
        self
    }

    /// Register a navigable listing page.
    ///
    /// `current_url` is what the browser reports after navigation (where
    /// the `@lat,lng` rewrite shows up).
    pub fn with_page(
        self,
        url: impl Into<String>,
        current_url: impl Into<String>,
        html: impl Into<String>,
    ) -> Self {
        self.pages
            .write()
            .unwrap()
            .insert(url.into(), (current_url.into(), html.into()));
        self
    }

    /// Number of scrolls performed so far.
    pub fn scroll_count(&self) -> usize {
        *self.scrolls.read().unwrap()
    }

    /// Get all calls made to this mock.
    pub fn calls(&self) -> Vec<MockRenderCall> {
        self.calls.read().unwrap().clone()
    }

    fn record(&self, call: MockRenderCall) {
        self.calls.write().unwrap().push(call);
    }

    fn require(&self, selector: &str) -> RenderResult<()> {
        if self.elements.read().unwrap().contains(selector) {
            Ok(())
        } else {
            Err(RenderError::ElementNotFound {
                selector: selector.to_string(),
            })
        }
    }

    fn current_page(&self) -> RenderResult<(String, String)> {
        let current = self.current.read().unwrap().clone();
        current
            .and_then(|url| self.pages.read().unwrap().get(&url).cloned())
            .ok_or_else(|| RenderError::Protocol("no page loaded".to_string()))
    }
}

impl Default for MockRenderSession {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RenderSession for MockRenderSession {
    async fn goto(&self, url: &str) -> RenderResult<()> {
        self.record(MockRenderCall::Goto {
            url: url.to_string(),
        });
        if !self.pages.read().unwrap().contains_key(url) {
            return Err(RenderError::Navigation {
                url: url.to_string(),
                reason: "net::ERR_NAME_NOT_RESOLVED".to_string(),
            });
        }
        *self.current.write().unwrap() = Some(url.to_string());
        Ok(())
    }

    async fn current_url(&self) -> RenderResult<String> {
        Ok(self.current_page()?.0)
    }

    async fn content(&self) -> RenderResult<String> {
        Ok(self.current_page()?.1)
    }

    async fn exists(&self, selector: &str) -> RenderResult<bool> {
        Ok(self.elements.read().unwrap().contains(selector))
    }

    async fn fill(&self, selector: &str, text: &str) -> RenderResult<()> {
        self.require(selector)?;
        self.record(MockRenderCall::Fill {
            selector: selector.to_string(),
            text: text.to_string(),
        });
        Ok(())
    }

    async fn press_enter(&self, selector: &str) -> RenderResult<()> {
        self.require(selector)?;
        if self.enter_failures.read().unwrap().contains(selector) {
            return Err(RenderError::Protocol(
                "Input.dispatchKeyEvent: node is detached".to_string(),
            ));
        }
        self.record(MockRenderCall::PressEnter {
            selector: selector.to_string(),
        });
        Ok(())
    }

    async fn click(&self, selector: &str) -> RenderResult<()> {
        self.require(selector)?;
        self.record(MockRenderCall::Click {
            selector: selector.to_string(),
        });
        Ok(())
    }

    async fn scroll(&self, selector: &str, delta_y: i64) -> RenderResult<()> {
        self.require(selector)?;
        self.record(MockRenderCall::Scroll {
            selector: selector.to_string(),
            delta_y,
        });
        *self.scrolls.write().unwrap() += 1;
        Ok(())
    }

    async fn attribute_values(
        &self,
        _selector: &str,
        _attribute: &str,
    ) -> RenderResult<Vec<Option<String>>> {
        let scrolls = *self.scrolls.read().unwrap();
        let snapshots = self.feed_snapshots.read().unwrap();
        if scrolls == 0 || snapshots.is_empty() {
            return Ok(Vec::new());
        }
        let index = (scrolls - 1).min(snapshots.len() - 1);
        Ok(snapshots[index].iter().cloned().map(Some).collect())
    }
}

// =============================================================================
// Geocoder
// =============================================================================

#[derive(Debug, Clone)]
enum MockGeoReply {
    Divisions(AdminDivisions),
    Status(u16),
    Service(String),
}

impl MockGeoReply {
    fn into_result(self) -> GeocodeResult<AdminDivisions> {
        match self {
            MockGeoReply::Divisions(divisions) => Ok(divisions),
            MockGeoReply::Status(status) => Err(GeocodeError::Status(status)),
            MockGeoReply::Service(message) => Err(GeocodeError::Service(message)),
        }
    }
}

/// A mock reverse geocoder with per-coordinate replies.
#[derive(Default)]
pub struct MockGeocoder {
    replies: Arc<RwLock<HashMap<String, MockGeoReply>>>,
    default_reply: Arc<RwLock<Option<MockGeoReply>>>,
    calls: Arc<RwLock<Vec<(f64, f64)>>>,
}

impl MockGeocoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reply for one exact coordinate pair.
    pub fn with_divisions(self, latitude: f64, longitude: f64, divisions: AdminDivisions) -> Self {
        self.replies
            .write()
            .unwrap()
            .insert(key(latitude, longitude), MockGeoReply::Divisions(divisions));
        self
    }

    /// Fail for one exact coordinate pair.
    pub fn with_error(self, latitude: f64, longitude: f64, error: GeocodeError) -> Self {
        let reply = match error {
            GeocodeError::Status(status) => MockGeoReply::Status(status),
            GeocodeError::Service(message) => MockGeoReply::Service(message),
            other => MockGeoReply::Service(other.to_string()),
        };
        self.replies
            .write()
            .unwrap()
            .insert(key(latitude, longitude), reply);
        self
    }

    /// Reply for any coordinate without a specific reply.
    pub fn with_default(self, divisions: AdminDivisions) -> Self {
        *self.default_reply.write().unwrap() = Some(MockGeoReply::Divisions(divisions));
        self
    }

    /// Coordinates looked up so far, in order.
    pub fn calls(&self) -> Vec<(f64, f64)> {
        self.calls.read().unwrap().clone()
    }
}

fn key(latitude: f64, longitude: f64) -> String {
    format!("{},{}", latitude, longitude)
}

#[async_trait]
impl ReverseGeocoder for MockGeocoder {
    async fn reverse(&self, latitude: f64, longitude: f64) -> GeocodeResult<AdminDivisions> {
        self.calls.write().unwrap().push((latitude, longitude));

        let reply = self
            .replies
            .read()
            .unwrap()
            .get(&key(latitude, longitude))
            .cloned()
            .or_else(|| self.default_reply.read().unwrap().clone());

        match reply {
            Some(reply) => reply.into_result(),
            None => Err(GeocodeError::Service("Unable to geocode".to_string())),
        }
    }
}

// =============================================================================
// Completion service
// =============================================================================

#[derive(Debug, Clone)]
enum MockReply {
    Content(String),
    Failure(String),
}

/// A mock completion service.
///
/// Queued replies are consumed in order; once the queue is empty the
/// default reply (if any) is used for every further request.
#[derive(Default)]
pub struct MockCompletion {
    queue: Arc<RwLock<VecDeque<MockReply>>>,
    default_reply: Arc<RwLock<Option<MockReply>>>,
    calls: Arc<RwLock<Vec<MockCompletionCall>>>,
}

/// Record of a request made to the mock completion service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockCompletionCall {
    pub system_prompt: String,
    pub user_prompt: String,
}

impl MockCompletion {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a raw response body.
    pub fn with_reply(self, content: impl Into<String>) -> Self {
        self.queue
            .write()
            .unwrap()
            .push_back(MockReply::Content(content.into()));
        self
    }

    /// Queue a failed request.
    pub fn with_failure(self, message: impl Into<String>) -> Self {
        self.queue
            .write()
            .unwrap()
            .push_back(MockReply::Failure(message.into()));
        self
    }

    /// Response for every request once the queue is drained.
    pub fn with_default_reply(self, content: impl Into<String>) -> Self {
        *self.default_reply.write().unwrap() = Some(MockReply::Content(content.into()));
        self
    }

    /// Get all calls made to this mock.
    pub fn calls(&self) -> Vec<MockCompletionCall> {
        self.calls.read().unwrap().clone()
    }
}

#[async_trait]
impl CompletionService for MockCompletion {
    async fn complete_json(
        &self,
        system_prompt: &str,
        user_prompt: &str,
    ) -> CompletionResult<String> {
        self.calls.write().unwrap().push(MockCompletionCall {
            system_prompt: system_prompt.to_string(),
            user_prompt: user_prompt.to_string(),
        });

        let reply = self
            .queue
            .write()
            .unwrap()
            .pop_front()
            .or_else(|| self.default_reply.read().unwrap().clone());

        match reply {
            Some(MockReply::Content(content)) => Ok(content),
            Some(MockReply::Failure(message)) => Err(CompletionError::Other(message)),
            None => Err(CompletionError::Other("no reply configured".to_string())),
        }
    }
}

// =============================================================================
// Progress
// =============================================================================

/// Collects every progress event it receives.
#[derive(Default, Clone)]
pub struct ProgressRecorder {
    events: Arc<RwLock<Vec<ProgressEvent>>>,
}

impl ProgressRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<ProgressEvent> {
        self.events.read().unwrap().clone()
    }
}

impl ProgressObserver for ProgressRecorder {
    fn on_progress(&self, event: &ProgressEvent) {
        self.events.write().unwrap().push(event.clone());
    }
}
