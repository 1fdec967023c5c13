//! End-to-end pipeline runs against mock services.

use std::collections::HashSet;

use maps_scraper::testing::{MockCompletion, MockGeocoder, MockRenderSession, ProgressRecorder};
use maps_scraper::{AdminDivisions, MapsPipeline, PipelineConfig, Stage, SENTINEL};

fn place(n: usize) -> String {
    format!("https://www.google.com/maps/place/Kopi+{n}/data=!4m7")
}

fn listing_html(n: usize) -> String {
    format!(
        r#"<html><body><div role="main" aria-label="Kopi {n}">
        <h1 class="DUwDvf">Kopi {n}</h1>
        <div class="F7nice">4.{n}({n}00)</div>
        <button class="DkEaL">Coffee shop</button>
        <button data-item-id="address" aria-label="Address: Jl. Kopi No.{n}, Jakarta"></button>
        </div></body></html>"#
    )
}

/// Feed with seven listings; the first three pages carry coordinates in
/// their settled URL, the rest do not.
fn coffee_jakarta_session() -> MockRenderSession {
    let config = PipelineConfig::default();
    let mut session = MockRenderSession::new()
        .with_element(&config.selectors.search_inputs[0])
        .with_element(&config.selectors.feed)
        .with_feed_snapshot((0..3).map(place).collect())
        .with_feed_snapshot((0..7).map(place).collect());

    for n in 0..7 {
        let current_url = if n < 3 {
            format!("https://www.google.com/maps/place/Kopi+{n}/@-6.2{n},106.8{n},17z")
        } else {
            place(n)
        };
        session = session.with_page(place(n), current_url, listing_html(n));
    }
    session
}

fn jakarta_selatan() -> AdminDivisions {
    AdminDivisions {
        country: Some("Indonesia".into()),
        province: Some("Daerah Khusus Ibukota Jakarta".into()),
        regency: Some("Jakarta Selatan".into()),
        district: Some("Setiabudi".into()),
        subdistrict: Some("Karet".into()),
        ..Default::default()
    }
}

const CLASSIFICATION: &str = r#"{"kbli": "56303", "nama_kbli": "Rumah Minum/Kafe",
    "keterangan_kbli": "Usaha penyediaan minuman di tempat",
    "provinsi": "DKI Jakarta", "kabupaten": "Jakarta Pusat",
    "kecamatan": "Menteng", "kelurahan": "Gondangdia"}"#;

#[tokio::test]
async fn test_coffee_jakarta_end_to_end() {
    let session = coffee_jakarta_session();
    let geocoder = MockGeocoder::new().with_default(jakarta_selatan());
    let service = MockCompletion::new().with_default_reply(CLASSIFICATION);
    let progress = ProgressRecorder::new();

    let mut pipeline = MapsPipeline::new(PipelineConfig::instant());

    let scraped = pipeline
        .run(&session, "Coffee Jakarta", 5, &progress)
        .await
        .unwrap()
        .len();
    assert!(scraped <= 5);
    assert_eq!(scraped, 5);

    let urls: HashSet<_> = pipeline.records().iter().map(|r| r.url.clone()).collect();
    assert_eq!(urls.len(), scraped);
    assert_eq!(pipeline.records()[0].name, "Kopi 0");
    assert_eq!(pipeline.records()[2].reviews, "200");

    pipeline.enrich_locations(&geocoder, &progress).await;
    assert_eq!(pipeline.records().len(), scraped);
    assert_eq!(geocoder.calls().len(), 3);

    for record in pipeline.records() {
        if record.coordinates().is_some() {
            assert_eq!(record.regency, "Jakarta Selatan");
        } else {
            assert_eq!(record.regency, SENTINEL);
        }
    }

    pipeline.enrich_classification(&service, &progress).await;
    let records = pipeline.into_records();
    assert_eq!(records.len(), scraped);

    for record in &records {
        assert_eq!(record.industry_code, "56303");
        assert_eq!(record.industry_title, "Rumah Minum/Kafe");
        if record.coordinates().is_some() {
            // Geo values win over the model's guess.
            assert_eq!(record.regency, "Jakarta Selatan");
            assert_eq!(record.district, "Setiabudi");
        } else {
            assert_eq!(record.regency, "Jakarta Pusat");
            assert_eq!(record.district, "Menteng");
        }
    }

    let stages: Vec<Stage> = progress.events().iter().map(|e| e.stage).collect();
    assert!(stages.contains(&Stage::Collecting));
    assert_eq!(stages.iter().filter(|s| **s == Stage::Scraping).count(), 5);
    assert_eq!(stages.iter().filter(|s| **s == Stage::Geocoding).count(), 5);
    assert_eq!(stages.iter().filter(|s| **s == Stage::Classifying).count(), 5);
}

#[tokio::test]
async fn test_short_feed_returns_what_was_found() {
    let config = PipelineConfig::default();
    let session = MockRenderSession::new()
        .with_element(&config.selectors.search_inputs[0])
        .with_element(&config.selectors.feed)
        .with_feed_snapshot(vec![place(0), place(1)])
        .with_page(place(0), place(0), listing_html(0))
        .with_page(place(1), place(1), listing_html(1));

    let mut pipeline = MapsPipeline::new(PipelineConfig::instant());
    let records = pipeline
        .run(&session, "Kopi Luwak Sabang", 20, &ProgressRecorder::new())
        .await
        .unwrap();

    assert_eq!(records.len(), 2);
}

#[tokio::test]
async fn test_classification_failure_keeps_geo_fields() {
    let session = coffee_jakarta_session();
    let geocoder = MockGeocoder::new().with_default(jakarta_selatan());
    let service = MockCompletion::new().with_default_reply("I cannot help with that.");

    let mut pipeline = MapsPipeline::new(PipelineConfig::instant());
    pipeline
        .run(&session, "Coffee Jakarta", 3, &ProgressRecorder::new())
        .await
        .unwrap();
    pipeline.enrich_locations(&geocoder, &ProgressRecorder::new()).await;
    let before = pipeline.records().to_vec();

    pipeline
        .enrich_classification(&service, &ProgressRecorder::new())
        .await;

    for (after, before) in pipeline.records().iter().zip(&before) {
        assert!(after.has_classification_error());
        assert!(after.industry_code.starts_with("Error: "));
        assert_eq!(after.regency, before.regency);
        assert_eq!(after.name, before.name);
        assert_eq!(after.latitude, before.latitude);
    }
}
