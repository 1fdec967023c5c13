//! Coordinate resolution for a listing page.
//!
//! Strategies in priority order:
//! 1. `@lat,lng` in the navigated URL
//! 2. `[null,null,lat,lng]` in the inline map bootstrap payload
//! 3. `/lat,lng/` in a directions link
//! 4. `center=lat%2Clng` in the preview image URL
//!
//! Precision differs between strategies; the source is reported alongside
//! the values.

use lazy_static::lazy_static;
use regex::Regex;

use super::page::DetailPage;

lazy_static! {
    static ref URL_AT_PATTERN: Regex = Regex::new(r"@(-?\d+\.\d+),(-?\d+\.\d+)").unwrap();
    static ref BOOTSTRAP_PATTERN: Regex =
        Regex::new(r"\[null,null,(-?\d+\.\d+),(-?\d+\.\d+)\]").unwrap();
    static ref DIRECTIONS_PATTERN: Regex = Regex::new(r"/(-?\d+\.\d+),(-?\d+\.\d+)/").unwrap();
    static ref PREVIEW_CENTER_PATTERN: Regex =
        Regex::new(r"center=(-?\d+\.\d+)%2C(-?\d+\.\d+)").unwrap();
}

/// Which strategy produced a coordinate pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoordinateSource {
    Url,
    Bootstrap,
    DirectionsLink,
    PreviewImage,
}

/// Latitude and longitude exactly as written on the page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Coordinates {
    pub latitude: String,
    pub longitude: String,
    pub source: CoordinateSource,
}

type CoordinateStrategy = fn(&DetailPage) -> Option<(String, String)>;

const STRATEGIES: [(CoordinateSource, CoordinateStrategy); 4] = [
    (CoordinateSource::Url, from_url),
    (CoordinateSource::Bootstrap, from_bootstrap),
    (CoordinateSource::DirectionsLink, from_directions_link),
    (CoordinateSource::PreviewImage, from_preview_image),
];

/// First strategy that yields a plausible pair, or `None`.
pub fn resolve(page: &DetailPage) -> Option<Coordinates> {
    STRATEGIES.iter().find_map(|(source, strategy)| {
        strategy(page).map(|(latitude, longitude)| Coordinates {
            latitude,
            longitude,
            source: *source,
        })
    })
}

fn from_url(page: &DetailPage) -> Option<(String, String)> {
    capture_pair(&URL_AT_PATTERN, page.current_url())
}

fn from_bootstrap(page: &DetailPage) -> Option<(String, String)> {
    capture_pair(&BOOTSTRAP_PATTERN, page.html())
}

fn from_directions_link(page: &DetailPage) -> Option<(String, String)> {
    let href = page.attr(r#"a[href*="/dir/"]"#, "href")?;
    capture_pair(&DIRECTIONS_PATTERN, &href)
}

fn from_preview_image(page: &DetailPage) -> Option<(String, String)> {
    let content = page
        .attr(r#"meta[property="og:image"]"#, "content")
        .or_else(|| page.attr(r#"meta[itemprop="image"]"#, "content"))?;
    capture_pair(&PREVIEW_CENTER_PATTERN, &content)
}

fn capture_pair(pattern: &Regex, haystack: &str) -> Option<(String, String)> {
    pattern.captures_iter(haystack).find_map(|caps| {
        let lat = caps.get(1)?.as_str();
        let lng = caps.get(2)?.as_str();
        in_range(lat, lng).then(|| (lat.to_string(), lng.to_string()))
    })
}

fn in_range(lat: &str, lng: &str) -> bool {
    match (lat.parse::<f64>(), lng.parse::<f64>()) {
        (Ok(lat), Ok(lng)) => (-90.0..=90.0).contains(&lat) && (-180.0..=180.0).contains(&lng),
        _ => false,
    }
}
