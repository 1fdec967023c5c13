//! Render-engine session trait.
//!
//! The pipeline drives one interactive viewport through this trait. The
//! Chromium implementation lives in [`crate::render`]; tests use
//! [`crate::testing::MockRenderSession`].

use std::time::Duration;

use async_trait::async_trait;
use tokio::time::Instant;

use crate::error::RenderResult;

/// Poll interval for [`RenderSession::wait_for`].
const WAIT_POLL_INTERVAL: Duration = Duration::from_millis(250);

/// One live browser page.
///
/// Calls are issued strictly one at a time; implementations do not need to
/// handle concurrent use.
#[async_trait]
pub trait RenderSession: Send + Sync {
    /// Navigate and wait for the load event.
    async fn goto(&self, url: &str) -> RenderResult<()>;

    /// URL currently shown, after any client-side rewrites.
    async fn current_url(&self) -> RenderResult<String>;

    /// Serialized DOM of the current page.
    async fn content(&self) -> RenderResult<String>;

    /// Whether at least one element matches `selector` right now.
    async fn exists(&self, selector: &str) -> RenderResult<bool>;

    /// Replace the value of the first matching input with `text`.
    async fn fill(&self, selector: &str, text: &str) -> RenderResult<()>;

    /// Press Enter with the first matching element focused.
    async fn press_enter(&self, selector: &str) -> RenderResult<()>;

    /// Click the first matching element.
    async fn click(&self, selector: &str) -> RenderResult<()>;

    /// Scroll the first matching element vertically by `delta_y` pixels.
    async fn scroll(&self, selector: &str, delta_y: i64) -> RenderResult<()>;

    /// One entry per matching element, holding its `attribute` if set.
    async fn attribute_values(
        &self,
        selector: &str,
        attribute: &str,
    ) -> RenderResult<Vec<Option<String>>>;

    /// Poll until `selector` matches or `timeout` elapses.
    ///
    /// Always checks at least once, so a zero timeout is a single check.
    async fn wait_for(&self, selector: &str, timeout: Duration) -> RenderResult<bool> {
        let deadline = Instant::now() + timeout;
        loop {
            if self.exists(selector).await? {
                return Ok(true);
            }
            let now = Instant::now();
            if now >= deadline {
                return Ok(false);
            }
            tokio::time::sleep(WAIT_POLL_INTERVAL.min(deadline - now)).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockRenderSession;

    #[tokio::test(start_paused = true)]
    async fn test_wait_for_missing_selector_times_out_on_the_runtime_clock() {
        let session = MockRenderSession::new();
        let start = Instant::now();

        let found = session
            .wait_for("div.never", Duration::from_secs(2))
            .await
            .unwrap();

        assert!(!found);
        assert_eq!(start.elapsed(), Duration::from_secs(2));
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_for_present_selector_returns_immediately() {
        let session = MockRenderSession::new().with_element("div.here");
        let start = Instant::now();

        assert!(session.wait_for("div.here", Duration::from_secs(5)).await.unwrap());
        assert_eq!(start.elapsed(), Duration::ZERO);
    }
}
