//! Detail pipeline: visit each listing in turn and extract a record.

use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::config::PipelineConfig;
use crate::error::RenderResult;
use crate::extract::{extract_record, DetailPage};
use crate::traits::render::RenderSession;
use crate::types::progress::{ProgressEvent, ProgressObserver, Stage};
use crate::types::record::Record;

/// Extract one record per listing URL, in order.
///
/// A listing whose page cannot be loaded is logged and skipped; progress
/// still advances for it. An empty result is a valid outcome.
pub async fn scrape_details<S>(
    session: &S,
    urls: &[String],
    config: &PipelineConfig,
    progress: &dyn ProgressObserver,
) -> Vec<Record>
where
    S: RenderSession + ?Sized,
{
    let total = urls.len();
    let mut records = Vec::with_capacity(total);

    for (index, url) in urls.iter().enumerate() {
        match scrape_one(session, url, config).await {
            Ok(record) => {
                debug!(url = %url, name = %record.name, "Extracted listing");
                records.push(record);
            }
            Err(e) => {
                warn!(url = %url, error = %e, "Failed to scrape listing, skipping");
            }
        }

        let event = ProgressEvent::new(Stage::Scraping, index + 1, total);
        info!(current = event.current, total, "{}", event.message);
        progress.on_progress(&event);
    }

    info!(scraped = records.len(), total, "Detail extraction finished");
    records
}

async fn scrape_one<S>(session: &S, url: &str, config: &PipelineConfig) -> RenderResult<Record>
where
    S: RenderSession + ?Sized,
{
    session.goto(url).await?;
    sleep(config.timings.detail_settle).await;
    // Coordinates show up in the URL a moment after the panel renders.
    sleep(config.timings.coordinate_settle).await;

    let current_url = session.current_url().await?;
    let html = session.content().await?;

    Ok(extract_snapshot(url, current_url, html))
}

/// Parse and extract synchronously; the parsed DOM never lives across an await.
fn extract_snapshot(url: &str, current_url: String, html: String) -> Record {
    let page = DetailPage::parse(current_url, html);
    extract_record(url, &page)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{MockRenderSession, ProgressRecorder};
    use crate::types::record::SENTINEL;

    const PAGE: &str = r#"<html><body>
        <h1 class="DUwDvf">Kopi Kenangan</h1>
        <div class="F7nice">4.6(1,204)</div>
    </body></html>"#;

    #[tokio::test]
    async fn test_failed_listing_is_skipped_but_progress_advances() {
        let urls = vec![
            "https://www.google.com/maps/place/a".to_string(),
            "https://www.google.com/maps/place/missing".to_string(),
            "https://www.google.com/maps/place/c".to_string(),
        ];
        let session = MockRenderSession::new()
            .with_page(&urls[0], "https://www.google.com/maps/place/a/@-6.2,106.8,17z", PAGE)
            .with_page(&urls[2], "https://www.google.com/maps/place/c", "<html></html>");
        let recorder = ProgressRecorder::new();

        let records =
            scrape_details(&session, &urls, &PipelineConfig::instant(), &recorder).await;

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].url, urls[0]);
        assert_eq!(records[0].name, "Kopi Kenangan");
        assert_eq!(records[0].reviews, "1204");
        assert_eq!(records[0].latitude, "-6.2");
        assert_eq!(records[1].url, urls[2]);
        assert_eq!(records[1].name, SENTINEL);

        let events = recorder.events();
        assert_eq!(events.len(), 3);
        assert_eq!(events[2].message, "Scraping: 3/3");
    }

    #[tokio::test]
    async fn test_no_urls_yields_empty_list() {
        let session = MockRenderSession::new();
        let records = scrape_details(&session, &[], &PipelineConfig::instant(), &ProgressRecorder::new()).await;
        assert!(records.is_empty());
    }
}
