//! Reverse-geocoding trait.

use async_trait::async_trait;

use crate::error::GeocodeResult;

/// Administrative divisions for a coordinate.
///
/// `None` means the service had nothing for that level; merging leaves the
/// record's existing value in place.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AdminDivisions {
    pub country: Option<String>,
    pub province: Option<String>,
    pub regency: Option<String>,
    pub district: Option<String>,
    pub subdistrict: Option<String>,
    pub hamlet: Option<String>,
    pub postal_code: Option<String>,
    pub road: Option<String>,
    pub house_number: Option<String>,
    /// `class/type` of the matched map object, e.g. `amenity/cafe`.
    pub osm_category: Option<String>,
}

impl AdminDivisions {
    /// True when no level was resolved.
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}

/// Resolves coordinates to administrative divisions.
#[async_trait]
pub trait ReverseGeocoder: Send + Sync {
    async fn reverse(&self, latitude: f64, longitude: f64) -> GeocodeResult<AdminDivisions>;
}
