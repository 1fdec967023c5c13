// Command-line runner: scrape, enrich, write JSON

mod config;

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::Parser;
use maps_scraper::{
    ChromiumSession, MapsPipeline, NominatimGeocoder, OpenAIClassifier, PipelineConfig,
    ProgressEvent, Record,
};
use openai_client::OpenAIClient;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Settings;

const OPENAI_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Parser, Debug)]
#[command(name = "gmaps-scraper", about = "Scrape and enrich map listings")]
struct Args {
    /// Search phrase, e.g. "Coffee Jakarta"
    search: String,

    /// Number of listings to collect
    #[arg(long, default_value_t = 10)]
    total: usize,

    /// Run the browser without a window
    #[arg(long)]
    headless: bool,

    /// Latitude to bias the search towards (requires --lng)
    #[arg(long, requires = "lng", allow_hyphen_values = true)]
    lat: Option<f64>,

    /// Longitude to bias the search towards (requires --lat)
    #[arg(long, requires = "lat", allow_hyphen_values = true)]
    lng: Option<f64>,

    /// Skip reverse geocoding
    #[arg(long)]
    skip_geo: bool,

    /// Classify listings with the OpenAI API (needs OPENAI_API_KEY)
    #[arg(long)]
    ai: bool,

    /// Output file (defaults to gmaps_<search>.json)
    #[arg(long, short)]
    output: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,maps_scraper=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();
    if args.total == 0 {
        bail!("--total must be at least 1");
    }

    let settings = Settings::from_env().context("Failed to load configuration")?;
    let started_at = chrono::Local::now();
    tracing::info!(started_at = %started_at.to_rfc3339(), "Starting gmaps-scraper");

    let phrase = search_phrase(&args);
    let output = args
        .output
        .clone()
        .unwrap_or_else(|| default_output_path(&args.search));

    let config = PipelineConfig::default().with_geocode_delay(settings.geocode_delay);
    let mut pipeline = MapsPipeline::new(config);
    let progress = |event: &ProgressEvent| {
        eprintln!("[{:>3.0}%] {}", event.fraction() * 100.0, event.message);
    };

    let session = ChromiumSession::launch(args.headless)
        .await
        .context("Failed to launch browser")?;
    let scraped = pipeline.run(&session, &phrase, args.total, &progress).await;
    if let Err(e) = session.close().await {
        tracing::warn!(error = %e, "Failed to close browser");
    }
    let scraped = scraped.context("Scraping failed")?.len();
    tracing::info!(scraped, "Detail extraction complete");

    if !args.skip_geo {
        let geocoder = NominatimGeocoder::new()
            .with_base_url(&settings.nominatim_url)
            .with_user_agent(&settings.geocoder_user_agent);
        let records = pipeline.enrich_locations(&geocoder, &progress).await;
        let located = records.iter().filter(|r| r.coordinates().is_some()).count();
        tracing::info!(located, total = records.len(), "Geo-enrichment complete");
    }

    if args.ai {
        match &settings.openai_api_key {
            Some(api_key) => {
                let mut client = OpenAIClient::new(api_key.clone())
                    .with_timeout(OPENAI_TIMEOUT)
                    .context("Failed to build OpenAI client")?;
                if let Some(base_url) = &settings.openai_base_url {
                    client = client.with_base_url(base_url);
                }
                let classifier =
                    OpenAIClassifier::new(client).with_model(settings.openai_model.clone());
                let records = pipeline.enrich_classification(&classifier, &progress).await;
                let failed = records.iter().filter(|r| r.has_classification_error()).count();
                tracing::info!(failed, total = records.len(), "AI enrichment complete");
            }
            None => tracing::warn!("OPENAI_API_KEY not set, skipping AI enrichment"),
        }
    }

    let records = pipeline.into_records();
    write_records(&output, &records)?;

    let elapsed = chrono::Local::now() - started_at;
    tracing::info!(
        records = records.len(),
        output = %output.display(),
        elapsed_secs = elapsed.num_seconds(),
        "Done"
    );
    Ok(())
}

/// Search phrase with the optional location bias appended.
fn search_phrase(args: &Args) -> String {
    match (args.lat, args.lng) {
        (Some(lat), Some(lng)) => format!("{} near {},{}", args.search.trim(), lat, lng),
        _ => args.search.trim().to_string(),
    }
}

fn default_output_path(search: &str) -> PathBuf {
    let slug: String = search
        .trim()
        .chars()
        .map(|c| if c.is_alphanumeric() { c.to_ascii_lowercase() } else { '_' })
        .collect();
    PathBuf::from(format!("gmaps_{}.json", slug))
}

fn write_records(path: &PathBuf, records: &[Record]) -> Result<()> {
    let json = serde_json::to_string_pretty(records).context("Failed to serialize records")?;
    std::fs::write(path, json)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_search_phrase_with_bias() {
        let args = Args::parse_from([
            "gmaps-scraper",
            "Coffee Jakarta",
            "--lat",
            "-6.2",
            "--lng",
            "106.8",
        ]);
        assert_eq!(search_phrase(&args), "Coffee Jakarta near -6.2,106.8");
    }

    #[test]
    fn test_search_phrase_without_bias() {
        let args = Args::parse_from(["gmaps-scraper", " Bakso Malang "]);
        assert_eq!(search_phrase(&args), "Bakso Malang");
        assert_eq!(args.total, 10);
    }

    #[test]
    fn test_default_output_path() {
        assert_eq!(
            default_output_path("Coffee Jakarta"),
            PathBuf::from("gmaps_coffee_jakarta.json")
        );
    }
}
