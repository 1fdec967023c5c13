//! Map Listing Scraper
//!
//! Discovers business listings from a map search, extracts a flat record per
//! listing, then enriches the records with reverse-geocoded administrative
//! divisions and an AI industry classification.
//!
//! # Design
//!
//! - Every record always carries every field; unknown values are `"N/A"`
//! - Fields resolve through ordered fallback strategies, one field at a time
//! - Only search setup can fail a run; later failures end up in the data
//! - External services sit behind traits so each stage can be tested alone
//!
//! # Usage
//!
//! ```rust,ignore
//! use maps_scraper::{ChromiumSession, MapsPipeline, NominatimGeocoder, PipelineConfig};
//! use maps_scraper::types::progress::NoProgress;
//!
//! let session = ChromiumSession::launch(true).await?;
//! let mut pipeline = MapsPipeline::new(PipelineConfig::default());
//!
//! pipeline.run(&session, "Coffee Jakarta", 5, &NoProgress).await?;
//! pipeline.enrich_locations(&NominatimGeocoder::new(), &NoProgress).await;
//!
//! for record in pipeline.records() {
//!     println!("{} ({}, {})", record.name, record.latitude, record.longitude);
//! }
//! session.close().await?;
//! ```
//!
//! # Modules
//!
//! - [`traits`] - Service seams (RenderSession, ReverseGeocoder, CompletionService)
//! - [`types`] - Record and progress types
//! - [`extract`] - Field and coordinate extraction from a page snapshot
//! - [`pipeline`] - Collection, detail and enrichment stages
//! - [`render`] - Chromium render session
//! - [`geocoders`] - Nominatim reverse geocoder
//! - [`ai`] - OpenAI-backed completion service
//! - [`testing`] - Mock implementations for testing

pub mod ai;
pub mod config;
pub mod error;
pub mod extract;
pub mod geocoders;
pub mod pipeline;
pub mod render;
pub mod testing;
pub mod traits;
pub mod types;

// Re-export core types at crate root
pub use ai::OpenAIClassifier;
pub use config::{PipelineConfig, SearchSelectors, Timings};
pub use error::{CompletionError, GeocodeError, RenderError, Result, ScrapeError};
pub use geocoders::NominatimGeocoder;
pub use pipeline::MapsPipeline;
pub use render::ChromiumSession;
pub use traits::{
    completion::CompletionService,
    geocoder::{AdminDivisions, ReverseGeocoder},
    render::RenderSession,
};
pub use types::{
    progress::{NoProgress, ProgressEvent, ProgressObserver, Stage},
    record::{Record, SENTINEL},
};
