//! Reverse geocoder implementations.

pub mod nominatim;

pub use nominatim::NominatimGeocoder;
