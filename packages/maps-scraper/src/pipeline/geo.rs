//! Geo-enrichment: reverse-geocode each record's coordinates and merge the
//! administrative divisions into it.

use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::config::PipelineConfig;
use crate::traits::geocoder::{AdminDivisions, ReverseGeocoder};
use crate::types::progress::{ProgressEvent, ProgressObserver, Stage};
use crate::types::record::Record;

/// Enrich `records` in place. Never fails; lookup errors leave a record as it was.
///
/// Records without usable coordinates are skipped without a lookup or a
/// delay. Every lookup is followed by `geocode_delay`, success or not.
pub async fn enrich_locations(
    records: &mut [Record],
    geocoder: &dyn ReverseGeocoder,
    config: &PipelineConfig,
    progress: &dyn ProgressObserver,
) {
    let total = records.len();
    let mut resolved = 0usize;

    for (index, record) in records.iter_mut().enumerate() {
        if let Some((latitude, longitude)) = record.coordinates() {
            let result = geocoder.reverse(latitude, longitude).await;
            sleep(config.timings.geocode_delay).await;

            match result {
                Ok(divisions) => {
                    if divisions.is_empty() {
                        debug!(listing = %record.label(), "Geocoder returned no address details");
                    }
                    merge_divisions(record, divisions);
                    resolved += 1;
                }
                Err(e) => {
                    warn!(listing = %record.label(), error = %e, "Reverse geocoding failed");
                }
            }
        } else {
            debug!(listing = %record.label(), "No coordinates, skipping reverse geocoding");
        }

        let event = ProgressEvent::new(Stage::Geocoding, index + 1, total);
        info!(current = event.current, total, "{}", event.message);
        progress.on_progress(&event);
    }

    info!(resolved, total, "Geo-enrichment finished");
}

/// Overwrite each field the lookup resolved; leave the others alone.
pub fn merge_divisions(record: &mut Record, divisions: AdminDivisions) {
    let AdminDivisions {
        country,
        province,
        regency,
        district,
        subdistrict,
        hamlet,
        postal_code,
        road,
        house_number,
        osm_category,
    } = divisions;

    let pairs = [
        (&mut record.country, country),
        (&mut record.province, province),
        (&mut record.regency, regency),
        (&mut record.district, district),
        (&mut record.subdistrict, subdistrict),
        (&mut record.hamlet, hamlet),
        (&mut record.postal_code, postal_code),
        (&mut record.road, road),
        (&mut record.house_number, house_number),
        (&mut record.osm_category, osm_category),
    ];

    for (field, value) in pairs {
        if let Some(value) = value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty()) {
            *field = value;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::time::Instant;

    use crate::error::GeocodeError;
    use crate::testing::{MockGeocoder, ProgressRecorder};
    use crate::types::progress::NoProgress;
    use crate::types::record::SENTINEL;

    fn located(url: &str, lat: &str, lng: &str) -> Record {
        let mut record = Record::new(url);
        record.latitude = lat.to_string();
        record.longitude = lng.to_string();
        record
    }

    fn jakarta() -> AdminDivisions {
        AdminDivisions {
            country: Some("Indonesia".into()),
            province: Some("Daerah Khusus Ibukota Jakarta".into()),
            regency: Some("Jakarta Pusat".into()),
            district: Some("Menteng".into()),
            subdistrict: Some("Gondangdia".into()),
            postal_code: Some("10350".into()),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_sentinel_coordinates_are_never_looked_up() {
        let mut records = vec![Record::new("https://maps/a")];
        let before = records.clone();
        let geocoder = MockGeocoder::new().with_default(jakarta());

        enrich_locations(&mut records, &geocoder, &PipelineConfig::instant(), &NoProgress).await;

        assert_eq!(records, before);
        assert!(geocoder.calls().is_empty());
    }

    #[tokio::test]
    async fn test_resolved_divisions_are_merged() {
        let mut records = vec![located("https://maps/a", "-6.2", "106.8")];
        let geocoder = MockGeocoder::new().with_default(jakarta());
        let recorder = ProgressRecorder::new();

        enrich_locations(&mut records, &geocoder, &PipelineConfig::instant(), &recorder).await;

        let record = &records[0];
        assert_eq!(record.regency, "Jakarta Pusat");
        assert_eq!(record.district, "Menteng");
        assert_eq!(record.subdistrict, "Gondangdia");
        assert_eq!(record.postal_code, "10350");
        assert_eq!(record.hamlet, SENTINEL);
        assert_eq!(geocoder.calls(), vec![(-6.2, 106.8)]);
        assert_eq!(recorder.events()[0].message, "Enriching location: 1/1");
    }

    #[tokio::test]
    async fn test_failed_lookup_leaves_record_unchanged_and_continues() {
        let mut records = vec![
            located("https://maps/a", "-6.2", "106.8"),
            located("https://maps/b", "-7.25", "112.75"),
        ];
        let geocoder = MockGeocoder::new()
            .with_error(-6.2, 106.8, GeocodeError::Status(503))
            .with_default(jakarta());

        enrich_locations(&mut records, &geocoder, &PipelineConfig::instant(), &NoProgress).await;

        assert_eq!(records[0], located("https://maps/a", "-6.2", "106.8"));
        assert_eq!(records[1].regency, "Jakarta Pusat");
        assert_eq!(geocoder.calls().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_delay_follows_every_lookup_but_not_skipped_records() {
        let mut records = vec![
            located("https://maps/a", "-6.2", "106.8"),
            located("https://maps/b", "-7.25", "112.75"),
            Record::new("https://maps/c"),
        ];
        let geocoder = MockGeocoder::new()
            .with_error(-6.2, 106.8, GeocodeError::Status(500))
            .with_default(jakarta());
        let config = PipelineConfig::instant().with_geocode_delay(Duration::from_secs(1));
        let start = Instant::now();

        enrich_locations(&mut records, &geocoder, &config, &NoProgress).await;

        assert_eq!(start.elapsed(), Duration::from_secs(2));
        assert_eq!(geocoder.calls().len(), 2);
        assert_eq!(records[1].regency, "Jakarta Pusat");
        assert_eq!(records[2].regency, SENTINEL);
    }

    #[test]
    fn test_merge_ignores_blank_values() {
        let mut record = Record::new("u");
        record.regency = "Bandung".into();

        merge_divisions(
            &mut record,
            AdminDivisions {
                regency: Some("  ".into()),
                road: Some("Jalan Braga".into()),
                ..Default::default()
            },
        );

        assert_eq!(record.regency, "Bandung");
        assert_eq!(record.road, "Jalan Braga");
    }
}
