//! Collection loop: search, then scroll the result feed until enough unique
//! listing URLs are found or the feed stops growing.

use indexmap::IndexSet;
use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::config::PipelineConfig;
use crate::error::{RenderResult, Result, ScrapeError};
use crate::traits::render::RenderSession;
use crate::types::progress::{ProgressEvent, ProgressObserver, Stage};

/// Discover at most `target` unique listing URLs for `query`.
///
/// Fails only when the search cannot be started (no search input, no result
/// feed). Running out of results early is not an error; the URLs found so
/// far are returned in discovery order.
pub async fn collect_listing_urls<S>(
    session: &S,
    query: &str,
    target: usize,
    config: &PipelineConfig,
    progress: &dyn ProgressObserver,
) -> Result<Vec<String>>
where
    S: RenderSession + ?Sized,
{
    if target == 0 {
        return Err(ScrapeError::InvalidTarget(target));
    }

    info!(query = %query, target, "Starting collection");

    session.goto(&config.maps_url).await?;
    sleep(config.timings.initial_load).await;

    dismiss_consent(session, config).await;
    submit_search(session, query, config).await?;

    debug!("Waiting for result feed");
    if !session
        .wait_for(&config.selectors.feed, config.timings.feed_wait)
        .await?
    {
        return Err(ScrapeError::FeedNotFound {
            waited: config.timings.feed_wait,
        });
    }

    let (found, stop) = scroll_feed(session, target, config, progress).await;

    info!(collected = found.len(), target, stop = ?stop, "Collection finished");
    Ok(found.into_iter().take(target).collect())
}

/// Click through a cookie-consent interstitial if one is shown.
async fn dismiss_consent<S: RenderSession + ?Sized>(session: &S, config: &PipelineConfig) {
    let selector = &config.selectors.consent_button;
    match session.exists(selector).await {
        Ok(true) => {
            if let Err(e) = session.click(selector).await {
                debug!(error = %e, "Consent button present but click failed");
            }
        }
        Ok(false) => {}
        Err(e) => debug!(error = %e, "Consent check failed"),
    }
}

/// Type the phrase into the first search input that appears and submit it.
async fn submit_search<S: RenderSession + ?Sized>(
    session: &S,
    query: &str,
    config: &PipelineConfig,
) -> Result<()> {
    for selector in &config.selectors.search_inputs {
        match session
            .wait_for(selector, config.timings.search_input_wait)
            .await
        {
            Ok(true) => {}
            Ok(false) => {
                warn!(selector = %selector, "Search input selector not found, trying fallback");
                continue;
            }
            Err(e) => {
                warn!(selector = %selector, error = %e, "Search input check failed");
                continue;
            }
        }

        if let Err(e) = session.fill(selector, query).await {
            warn!(selector = %selector, error = %e, "Failed to type into search input");
            continue;
        }
        sleep(config.timings.search_submit).await;
        if let Err(e) = session.press_enter(selector).await {
            warn!(selector = %selector, error = %e, "Failed to submit search input");
            continue;
        }
        debug!(selector = %selector, "Search submitted");
        return Ok(());
    }

    Err(ScrapeError::SearchInputNotFound {
        tried: config.selectors.search_inputs.clone(),
    })
}

/// Why the scroll loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FeedStop {
    TargetReached,
    Converged,
    RoundLimit,
    RenderFailure,
}

/// Scroll until the target is met, the feed converges, or the round cap hits.
///
/// Converged means: the anchor count did not change after a scroll, a
/// retry scroll with a longer settle left it unchanged as well, and neither
/// scroll surfaced a new URL. The last condition keeps a mid-swap
/// virtualized feed (same count, different items) from ending the run early.
async fn scroll_feed<S: RenderSession + ?Sized>(
    session: &S,
    target: usize,
    config: &PipelineConfig,
    progress: &dyn ProgressObserver,
) -> (IndexSet<String>, FeedStop) {
    let mut found = IndexSet::new();
    let mut previous_count = 0usize;
    let mut stop = FeedStop::RoundLimit;

    for round in 1..=config.max_scroll_rounds {
        let size_before = found.len();

        let count = match scroll_and_harvest(session, config, false, &mut found).await {
            Ok(count) => count,
            Err(e) => {
                warn!(round, error = %e, "Feed scroll failed, keeping results so far");
                stop = FeedStop::RenderFailure;
                break;
            }
        };

        info!(round, anchors = count, unique = found.len(), "Found unique URLs so far");
        progress.on_progress(&ProgressEvent::new(
            Stage::Collecting,
            found.len().min(target),
            target,
        ));

        if found.len() >= target {
            stop = FeedStop::TargetReached;
            break;
        }

        if count == previous_count {
            let retry_count = match scroll_and_harvest(session, config, true, &mut found).await {
                Ok(count) => count,
                Err(e) => {
                    warn!(round, error = %e, "Retry scroll failed, keeping results so far");
                    stop = FeedStop::RenderFailure;
                    break;
                }
            };

            if found.len() >= target {
                stop = FeedStop::TargetReached;
                break;
            }
            if retry_count == previous_count && found.len() == size_before {
                info!(unique = found.len(), "No more results loading");
                stop = FeedStop::Converged;
                break;
            }
            previous_count = retry_count;
            continue;
        }

        previous_count = count;
    }

    if stop == FeedStop::RoundLimit {
        warn!(
            rounds = config.max_scroll_rounds,
            unique = found.len(),
            "Scroll round limit reached"
        );
    }

    (found, stop)
}

/// One scroll + settle + harvest pass. Returns the rendered anchor count.
async fn scroll_and_harvest<S: RenderSession + ?Sized>(
    session: &S,
    config: &PipelineConfig,
    retry: bool,
    found: &mut IndexSet<String>,
) -> RenderResult<usize> {
    session
        .scroll(&config.selectors.feed, config.scroll_delta)
        .await?;
    sleep(if retry {
        config.timings.retry_settle
    } else {
        config.timings.scroll_settle
    })
    .await;

    let hrefs = session
        .attribute_values(&config.selectors.listing_anchor, "href")
        .await?;
    let count = hrefs.len();

    for href in hrefs.into_iter().flatten() {
        let href = href.trim();
        if !href.is_empty() {
            found.insert(href.to_string());
        }
    }

    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{MockRenderCall, MockRenderSession, ProgressRecorder};
    use crate::types::progress::NoProgress;

    fn place(n: usize) -> String {
        format!("https://www.google.com/maps/place/listing-{n}")
    }

    fn feed(range: std::ops::Range<usize>) -> Vec<String> {
        range.map(place).collect()
    }

    fn ready_session() -> MockRenderSession {
        let config = PipelineConfig::instant();
        MockRenderSession::new()
            .with_element(&config.selectors.search_inputs[0])
            .with_element(&config.selectors.feed)
    }

    #[tokio::test]
    async fn test_stops_at_target_and_truncates() {
        let session = ready_session()
            .with_feed_snapshot(feed(0..4))
            .with_feed_snapshot(feed(0..9));
        let config = PipelineConfig::instant();

        let urls = collect_listing_urls(&session, "Coffee Jakarta", 5, &config, &NoProgress)
            .await
            .unwrap();

        assert_eq!(urls, feed(0..5));
        assert_eq!(session.scroll_count(), 2);
    }

    #[tokio::test]
    async fn test_converges_when_feed_stops_growing() {
        let session = ready_session()
            .with_feed_snapshot(feed(0..3))
            .with_feed_snapshot(feed(0..6));
        let config = PipelineConfig::instant();

        let urls = collect_listing_urls(&session, "Coffee Jakarta", 50, &config, &NoProgress)
            .await
            .unwrap();

        assert_eq!(urls, feed(0..6));
        // 3 -> 6 -> 6 (stall) -> retry 6 (converged)
        assert_eq!(session.scroll_count(), 4);
    }

    #[tokio::test]
    async fn test_stalled_count_with_new_items_keeps_scrolling() {
        // Virtualized feed swapping items while the rendered count stays at 3.
        let session = ready_session()
            .with_feed_snapshot(feed(0..3))
            .with_feed_snapshot(feed(3..6))
            .with_feed_snapshot(feed(6..9))
            .with_feed_snapshot(feed(9..12))
            .with_feed_snapshot(feed(9..12));
        let config = PipelineConfig::instant();

        let urls = collect_listing_urls(&session, "q", 100, &config, &NoProgress)
            .await
            .unwrap();

        assert_eq!(urls, feed(0..12));
    }

    #[tokio::test]
    async fn test_round_cap_bounds_the_loop() {
        let session = ready_session()
            .with_feed_snapshot(feed(0..1))
            .with_feed_snapshot(feed(0..2))
            .with_feed_snapshot(feed(0..3))
            .with_feed_snapshot(feed(0..4))
            .with_feed_snapshot(feed(0..5));
        let config = PipelineConfig::instant().with_max_scroll_rounds(3);

        let urls = collect_listing_urls(&session, "q", 100, &config, &NoProgress)
            .await
            .unwrap();

        assert_eq!(urls.len(), 3);
    }

    #[tokio::test]
    async fn test_round_limit_hit_inside_retry_branch() {
        // Count stays at 3 but the retry surfaces new items, so the last
        // round ends through the retry path rather than converging.
        let session = ready_session()
            .with_feed_snapshot(feed(0..3))
            .with_feed_snapshot(feed(3..6));
        let config = PipelineConfig::instant().with_max_scroll_rounds(2);

        let (found, stop) = scroll_feed(&session, 100, &config, &NoProgress).await;

        assert_eq!(stop, FeedStop::RoundLimit);
        assert_eq!(found.len(), 6);
    }

    #[tokio::test]
    async fn test_scroll_feed_stop_reasons() {
        let config = PipelineConfig::instant();

        let session = ready_session().with_feed_snapshot(feed(0..4));
        let (_, stop) = scroll_feed(&session, 2, &config, &NoProgress).await;
        assert_eq!(stop, FeedStop::TargetReached);

        let session = ready_session().with_feed_snapshot(feed(0..4));
        let (_, stop) = scroll_feed(&session, 10, &config, &NoProgress).await;
        assert_eq!(stop, FeedStop::Converged);

        let session = MockRenderSession::new().with_feed_snapshot(feed(0..4));
        let (found, stop) = scroll_feed(&session, 10, &config, &NoProgress).await;
        assert_eq!(stop, FeedStop::RenderFailure);
        assert!(found.is_empty());
    }

    #[tokio::test]
    async fn test_urls_are_unique_and_non_empty() {
        let mut snapshot = feed(0..3);
        snapshot.push(place(1));
        snapshot.push("  ".to_string());
        let session = ready_session().with_feed_snapshot(snapshot);
        let config = PipelineConfig::instant();

        let urls = collect_listing_urls(&session, "q", 10, &config, &NoProgress)
            .await
            .unwrap();

        assert_eq!(urls, feed(0..3));
    }

    #[tokio::test]
    async fn test_fallback_search_input_is_used() {
        let config = PipelineConfig::instant();
        let fallback = config.selectors.search_inputs[1].clone();
        let session = MockRenderSession::new()
            .with_element(&fallback)
            .with_element(&config.selectors.feed)
            .with_feed_snapshot(feed(0..2));

        let urls = collect_listing_urls(&session, "Bakso", 2, &config, &NoProgress)
            .await
            .unwrap();

        assert_eq!(urls.len(), 2);
        assert!(session.calls().contains(&MockRenderCall::Fill {
            selector: fallback,
            text: "Bakso".to_string(),
        }));
    }

    #[tokio::test]
    async fn test_submit_failure_falls_back_to_next_input() {
        let config = PipelineConfig::instant();
        let primary = config.selectors.search_inputs[0].clone();
        let fallback = config.selectors.search_inputs[1].clone();
        let session = ready_session()
            .with_element(&fallback)
            .with_enter_failure(&primary)
            .with_feed_snapshot(feed(0..2));

        let urls = collect_listing_urls(&session, "Soto Betawi", 2, &config, &NoProgress)
            .await
            .unwrap();

        assert_eq!(urls.len(), 2);
        assert!(session.calls().contains(&MockRenderCall::PressEnter { selector: fallback }));
        assert!(!session.calls().contains(&MockRenderCall::PressEnter { selector: primary }));
    }

    #[tokio::test]
    async fn test_missing_search_input_is_fatal() {
        let config = PipelineConfig::instant();
        let session = MockRenderSession::new().with_element(&config.selectors.feed);

        let err = collect_listing_urls(&session, "q", 5, &config, &NoProgress)
            .await
            .unwrap_err();

        assert!(matches!(err, ScrapeError::SearchInputNotFound { .. }));
    }

    #[tokio::test]
    async fn test_missing_feed_is_fatal() {
        let config = PipelineConfig::instant();
        let session = MockRenderSession::new().with_element(&config.selectors.search_inputs[0]);

        let err = collect_listing_urls(&session, "q", 5, &config, &NoProgress)
            .await
            .unwrap_err();

        assert!(matches!(err, ScrapeError::FeedNotFound { .. }));
    }

    #[tokio::test]
    async fn test_zero_target_rejected() {
        let session = ready_session();
        let err = collect_listing_urls(&session, "q", 0, &PipelineConfig::instant(), &NoProgress)
            .await
            .unwrap_err();

        assert!(matches!(err, ScrapeError::InvalidTarget(0)));
    }

    #[tokio::test]
    async fn test_consent_is_dismissed_when_present() {
        let config = PipelineConfig::instant();
        let session = ready_session()
            .with_element(&config.selectors.consent_button)
            .with_feed_snapshot(feed(0..1));

        collect_listing_urls(&session, "q", 1, &config, &NoProgress)
            .await
            .unwrap();

        assert!(session.calls().contains(&MockRenderCall::Click {
            selector: config.selectors.consent_button.clone(),
        }));
    }

    #[tokio::test]
    async fn test_progress_reports_each_round() {
        let session = ready_session()
            .with_feed_snapshot(feed(0..2))
            .with_feed_snapshot(feed(0..4));
        let recorder = ProgressRecorder::new();

        collect_listing_urls(&session, "q", 4, &PipelineConfig::instant(), &recorder)
            .await
            .unwrap();

        let events = recorder.events();
        assert_eq!(events.len(), 2);
        assert_eq!((events[0].current, events[0].total), (2, 4));
        assert_eq!((events[1].current, events[1].total), (4, 4));
        assert!(events.iter().all(|e| e.stage == Stage::Collecting));
    }
}
