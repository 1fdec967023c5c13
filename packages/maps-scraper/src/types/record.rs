//! The per-listing record carried through every pipeline stage.

use serde::{Deserialize, Serialize};

/// Placeholder for a field that could not be resolved.
pub const SENTINEL: &str = "N/A";

/// Returns true when `value` holds real data rather than the sentinel.
pub fn is_known(value: &str) -> bool {
    let value = value.trim();
    !value.is_empty() && value != SENTINEL
}

/// One discovered listing.
///
/// Every field is always present. Unresolved fields hold [`SENTINEL`];
/// consumers should treat that as "not available". Serialized keys follow
/// the column labels used by the spreadsheet consumers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    // --- Listing (detail extraction) ---
    #[serde(rename = "URL")]
    pub url: String,
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "Rating")]
    pub rating: String,
    #[serde(rename = "Reviews")]
    pub reviews: String,
    #[serde(rename = "Status")]
    pub status: String,
    #[serde(rename = "Establishment")]
    pub establishment: String,
    #[serde(rename = "Operation Hours")]
    pub operating_hours: String,
    #[serde(rename = "Latest Review")]
    pub latest_review: String,
    #[serde(rename = "Address")]
    pub address: String,
    #[serde(rename = "Phone")]
    pub phone: String,
    #[serde(rename = "Website")]
    pub website: String,
    #[serde(rename = "Latitude")]
    pub latitude: String,
    #[serde(rename = "Longitude")]
    pub longitude: String,

    // --- Administrative divisions (geo / AI enrichment) ---
    #[serde(rename = "Negara")]
    pub country: String,
    #[serde(rename = "Provinsi")]
    pub province: String,
    #[serde(rename = "Kabupaten")]
    pub regency: String,
    #[serde(rename = "Kecamatan")]
    pub district: String,
    #[serde(rename = "Kelurahan")]
    pub subdistrict: String,
    #[serde(rename = "Hamlet/Quarter")]
    pub hamlet: String,
    #[serde(rename = "Kode Pos")]
    pub postal_code: String,
    #[serde(rename = "Jalan")]
    pub road: String,
    #[serde(rename = "Nomor")]
    pub house_number: String,
    #[serde(rename = "Kategori OSM")]
    pub osm_category: String,

    // --- Classification (AI enrichment) ---
    #[serde(rename = "KBLI")]
    pub industry_code: String,
    #[serde(rename = "Nama Resmi KBLI")]
    pub industry_title: String,
    #[serde(rename = "Keterangan KBLI")]
    pub industry_description: String,
}

impl Record {
    /// A record for `url` with every other field set to the sentinel.
    pub fn new(url: impl Into<String>) -> Self {
        let na = || SENTINEL.to_string();
        Self {
            url: url.into(),
            name: na(),
            rating: na(),
            reviews: na(),
            status: na(),
            establishment: na(),
            operating_hours: na(),
            latest_review: na(),
            address: na(),
            phone: na(),
            website: na(),
            latitude: na(),
            longitude: na(),
            country: na(),
            province: na(),
            regency: na(),
            district: na(),
            subdistrict: na(),
            hamlet: na(),
            postal_code: na(),
            road: na(),
            house_number: na(),
            osm_category: na(),
            industry_code: na(),
            industry_title: na(),
            industry_description: na(),
        }
    }

    /// Parsed coordinates, or `None` when either side is the sentinel or not a number.
    pub fn coordinates(&self) -> Option<(f64, f64)> {
        if !is_known(&self.latitude) || !is_known(&self.longitude) {
            return None;
        }
        let lat = self.latitude.trim().parse::<f64>().ok()?;
        let lng = self.longitude.trim().parse::<f64>().ok()?;
        if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lng) {
            return None;
        }
        Some((lat, lng))
    }

    /// Display name for logs.
    pub fn label(&self) -> &str {
        if is_known(&self.name) {
            &self.name
        } else {
            &self.url
        }
    }

    /// True when the AI stage wrote an error marker instead of a classification.
    pub fn has_classification_error(&self) -> bool {
        self.industry_code.starts_with(ERROR_MARKER_PREFIX)
    }
}

/// Prefix of the inline marker written when classification fails.
pub const ERROR_MARKER_PREFIX: &str = "Error: ";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_record_is_all_sentinel() {
        let record = Record::new("https://www.google.com/maps/place/a");
        let value = serde_json::to_value(&record).unwrap();
        let object = value.as_object().unwrap();

        assert_eq!(object.len(), 26);
        for (key, v) in object {
            if key == "URL" {
                continue;
            }
            assert_eq!(v, SENTINEL, "{key} should start as sentinel");
        }
    }

    #[test]
    fn test_serialized_keys_match_columns() {
        let value = serde_json::to_value(Record::new("u")).unwrap();
        for key in ["Name", "Operation Hours", "Latest Review", "Kabupaten", "Kode Pos", "KBLI"] {
            assert!(value.get(key).is_some(), "missing {key}");
        }
    }

    #[test]
    fn test_coordinates() {
        let mut record = Record::new("u");
        assert_eq!(record.coordinates(), None);

        record.latitude = "-6.200000".into();
        record.longitude = "106.816666".into();
        assert_eq!(record.coordinates(), Some((-6.2, 106.816666)));

        record.longitude = "abc".into();
        assert_eq!(record.coordinates(), None);

        record.latitude = "123.0".into();
        record.longitude = "10.0".into();
        assert_eq!(record.coordinates(), None);
    }

    #[test]
    fn test_is_known() {
        assert!(is_known("Jakarta"));
        assert!(!is_known("N/A"));
        assert!(!is_known("  "));
    }

    #[test]
    fn test_label_falls_back_to_url() {
        let mut record = Record::new("https://maps/x");
        assert_eq!(record.label(), "https://maps/x");
        record.name = "Kopi Kenangan".into();
        assert_eq!(record.label(), "Kopi Kenangan");
    }
}
