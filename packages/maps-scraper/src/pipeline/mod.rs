//! The scraping pipeline and its stages.
//!
//! Stages run in order and each mutates the pipeline's record list in place:
//!
//! 1. [`collect`] - search and scroll for listing URLs
//! 2. [`detail`] - visit each listing and extract a [`Record`]
//! 3. [`geo`] - reverse-geocode coordinates into administrative divisions
//! 4. [`classify`] - AI industry classification
//!
//! Only collection can fail the run. Everything later absorbs its errors
//! into the records.

pub mod classify;
pub mod collect;
pub mod detail;
pub mod geo;

use tracing::{info, info_span, Instrument};
use uuid::Uuid;

use crate::config::PipelineConfig;
use crate::error::{Result, ScrapeError};
use crate::traits::completion::CompletionService;
use crate::traits::geocoder::ReverseGeocoder;
use crate::traits::render::RenderSession;
use crate::types::progress::ProgressObserver;
use crate::types::record::Record;

pub use classify::enrich_classification;
pub use collect::collect_listing_urls;
pub use detail::scrape_details;
pub use geo::enrich_locations;

/// Owns the record list for one scraping run.
///
/// ```rust,ignore
/// let mut pipeline = MapsPipeline::new(PipelineConfig::default());
/// pipeline.run(&session, "Coffee Jakarta", 5, &NoProgress).await?;
/// pipeline.enrich_locations(&geocoder, &NoProgress).await;
/// pipeline.enrich_classification(&classifier, &NoProgress).await;
/// let records = pipeline.into_records();
/// ```
pub struct MapsPipeline {
    config: PipelineConfig,
    run_id: Uuid,
    records: Vec<Record>,
}

impl MapsPipeline {
    pub fn new(config: PipelineConfig) -> Self {
        Self {
            config,
            run_id: Uuid::new_v4(),
            records: Vec::new(),
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Identifier attached to every log line of this run.
    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    /// Collect up to `total` listings for `query` and extract a record for each.
    ///
    /// Replaces any records from a previous run. Returns the extracted
    /// records, which may be fewer than `total` (or none).
    pub async fn run<S>(
        &mut self,
        session: &S,
        query: &str,
        total: usize,
        progress: &dyn ProgressObserver,
    ) -> Result<&[Record]>
    where
        S: RenderSession + ?Sized,
    {
        let span = info_span!("scrape", run_id = %self.run_id, query = %query);
        let config = &self.config;

        let records = async {
            let urls = collect_listing_urls(session, query, total, config, progress).await?;
            info!(found = urls.len(), "Found listing URLs");
            Ok::<_, ScrapeError>(scrape_details(session, &urls, config, progress).await)
        }
        .instrument(span)
        .await?;

        self.records = records;
        Ok(&self.records)
    }

    /// Reverse-geocode every record that has coordinates.
    pub async fn enrich_locations(
        &mut self,
        geocoder: &dyn ReverseGeocoder,
        progress: &dyn ProgressObserver,
    ) -> &[Record] {
        let span = info_span!("geo_enrich", run_id = %self.run_id, records = self.records.len());
        enrich_locations(&mut self.records, geocoder, &self.config, progress)
            .instrument(span)
            .await;
        &self.records
    }

    /// Classify every record with the completion service.
    pub async fn enrich_classification(
        &mut self,
        service: &dyn CompletionService,
        progress: &dyn ProgressObserver,
    ) -> &[Record] {
        let span = info_span!("ai_enrich", run_id = %self.run_id, records = self.records.len());
        enrich_classification(&mut self.records, service, progress)
            .instrument(span)
            .await;
        &self.records
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn into_records(self) -> Vec<Record> {
        self.records
    }
}
