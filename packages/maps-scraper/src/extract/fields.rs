//! Field extraction for a listing page.
//!
//! Every field has its own ordered list of strategies. The first strategy
//! that returns `Some` wins; when all return `None` the field is the
//! sentinel. Fields never affect each other, so a selector that stops
//! matching degrades one column, not the record.

use crate::types::record::{Record, SENTINEL};

use super::coordinates;
use super::page::{element_text, non_empty, DetailPage};

/// A single way of reading one field from a page.
pub type Strategy = fn(&DetailPage) -> Option<String>;

/// Evaluate `strategies` in order, falling back to the sentinel.
pub fn resolve(page: &DetailPage, strategies: &[Strategy]) -> String {
    strategies
        .iter()
        .find_map(|strategy| strategy(page).and_then(non_empty))
        .unwrap_or_else(|| SENTINEL.to_string())
}

/// Build a record for `identifier` from a rendered page.
///
/// Never fails: unresolvable fields hold the sentinel.
pub fn extract_record(identifier: &str, page: &DetailPage) -> Record {
    let mut record = Record::new(identifier);

    record.name = resolve(page, NAME);
    let (rating, reviews) = match resolve_opt(page, RATING_TOKEN) {
        Some(token) => parse_rating_reviews(&token),
        None => (SENTINEL.to_string(), SENTINEL.to_string()),
    };
    record.rating = rating;
    record.reviews = reviews;
    record.status = resolve(page, STATUS);
    record.establishment = resolve(page, ESTABLISHMENT);
    record.operating_hours = resolve(page, OPERATING_HOURS);
    record.latest_review = resolve(page, LATEST_REVIEW);
    record.address = resolve(page, ADDRESS);
    record.phone = resolve(page, PHONE);
    record.website = resolve(page, WEBSITE);

    if let Some(coords) = coordinates::resolve(page) {
        tracing::debug!(
            url = %identifier,
            source = ?coords.source,
            "Resolved coordinates"
        );
        record.latitude = coords.latitude;
        record.longitude = coords.longitude;
    }

    record
}

fn resolve_opt(page: &DetailPage, strategies: &[Strategy]) -> Option<String> {
    strategies
        .iter()
        .find_map(|strategy| strategy(page).and_then(non_empty))
}

// =============================================================================
// Rating & reviews
// =============================================================================

/// Split a composite rating token such as `"4.5 (1,234)"`.
///
/// The review count is whatever sits inside the first parentheses with
/// thousands separators removed. Without parentheses the whole token is the
/// rating and the count is `"0"`.
pub fn parse_rating_reviews(token: &str) -> (String, String) {
    let token = token.trim();
    match token.split_once('(') {
        Some((rating, rest)) => {
            let rating = rating.trim();
            let count: String = rest
                .split(')')
                .next()
                .unwrap_or_default()
                .chars()
                .filter(|c| !matches!(*c, ',' | '.' | '\'' | '\u{a0}' | '\u{202f}') && !c.is_whitespace())
                .collect();
            (
                non_empty(rating.to_string()).unwrap_or_else(|| SENTINEL.to_string()),
                non_empty(count).unwrap_or_else(|| "0".to_string()),
            )
        }
        None => (token.to_string(), "0".to_string()),
    }
}

const RATING_TOKEN: &[Strategy] = &[
    |p: &DetailPage| p.text("div.F7nice"),
    rating_from_aria_labels,
];

fn rating_from_aria_labels(page: &DetailPage) -> Option<String> {
    let stars = page.attr(r#"span[role="img"][aria-label*="star"]"#, "aria-label")?;
    let rating = stars.split_whitespace().next()?.to_string();
    match page.attr(r#"span[aria-label*="review"]"#, "aria-label") {
        Some(reviews) => {
            let count = reviews.split_whitespace().next().unwrap_or_default();
            Some(format!("{} ({})", rating, count))
        }
        None => Some(rating),
    }
}

// =============================================================================
// Identity
// =============================================================================

const NAME: &[Strategy] = &[
    |p: &DetailPage| p.text("h1.DUwDvf"),
    |p: &DetailPage| p.text("h1"),
    |p: &DetailPage| {
        p.attr(r#"meta[property="og:title"]"#, "content")
            .and_then(|t| t.split(" · ").next().map(str::trim).map(String::from))
    },
    |p: &DetailPage| p.attr(r#"div[role="main"][aria-label]"#, "aria-label"),
];

const ESTABLISHMENT: &[Strategy] = &[
    |p: &DetailPage| p.text("div.PYvS7b"),
    |p: &DetailPage| p.attr(r#"button[aria-label*="About"]"#, "aria-label"),
    |p: &DetailPage| p.text("button.DkEaL"),
];

// =============================================================================
// Hours & activity
// =============================================================================

const STATUS: &[Strategy] = &[
    |p: &DetailPage| {
        p.first(r#"div[aria-label*="hours"], .Z_C1G, .U66pCc"#)
            .map(element_text)
            .and_then(|t| first_segment(&t))
    },
    |p: &DetailPage| p.text("span.ZDu9vd").and_then(|t| first_segment(&t)),
];

const OPERATING_HOURS: &[Strategy] = &[
    |p: &DetailPage| p.attr("div.t39EBf[aria-label]", "aria-label").map(|t| trim_hours_label(&t)),
    |p: &DetailPage| p.attr(r#"div[aria-label*="hours"]"#, "aria-label").map(|t| trim_hours_label(&t)),
    hours_from_table,
];

const LATEST_REVIEW: &[Strategy] = &[
    |p: &DetailPage| p.text("span.rsqaWe"),
    |p: &DetailPage| p.text("span.xRkPPb").and_then(|t| first_segment(&t)),
];

fn hours_from_table(page: &DetailPage) -> Option<String> {
    let rows: Vec<String> = page
        .all("table.eK4R0e tr")
        .into_iter()
        .map(element_text)
        .filter(|row| !row.is_empty())
        .collect();
    if rows.is_empty() {
        None
    } else {
        Some(rows.join("; "))
    }
}

/// Text before the first middle dot (`·` or `⋅`).
fn first_segment(text: &str) -> Option<String> {
    text.split(['·', '⋅'])
        .next()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
}

fn trim_hours_label(label: &str) -> String {
    let mut label = label.trim();
    for suffix in ["Hide open hours for the week", "Copy open hours", "Sembunyikan jam buka"] {
        if let Some(stripped) = label.strip_suffix(suffix) {
            label = stripped.trim();
        }
    }
    label.trim_end_matches(['.', ',', ';']).trim().to_string()
}

// =============================================================================
// Contact
// =============================================================================

const ADDRESS: &[Strategy] = &[
    |p: &DetailPage| {
        p.attr(r#"button[data-item-id="address"]"#, "aria-label")
            .map(|v| strip_label(&v, &["Address:", "Alamat:"]))
    },
    |p: &DetailPage| p.text(r#"[data-item-id="address"] .Io6YTe"#),
    |p: &DetailPage| p.text(r#"button[data-item-id="address"]"#),
];

const PHONE: &[Strategy] = &[
    |p: &DetailPage| {
        p.attr(r#"button[data-item-id^="phone"]"#, "aria-label")
            .map(|v| strip_label(&v, &["Phone:", "Telepon:"]))
    },
    |p: &DetailPage| {
        p.attr(r#"button[data-item-id^="phone"]"#, "data-item-id")
            .map(|v| v.trim_start_matches("phone:").trim_start_matches("tel:").to_string())
    },
    |p: &DetailPage| {
        p.attr(r#"a[href^="tel:"]"#, "href")
            .map(|v| v.trim_start_matches("tel:").to_string())
    },
];

const WEBSITE: &[Strategy] = &[
    |p: &DetailPage| p.attr(r#"a[data-item-id="authority"]"#, "href"),
    |p: &DetailPage| {
        p.attr(r#"a[data-item-id="authority"]"#, "aria-label")
            .map(|v| strip_label(&v, &["Website:", "Situs Web:"]))
    },
];

fn strip_label(value: &str, labels: &[&str]) -> String {
    let value = value.trim();
    labels
        .iter()
        .find_map(|label| value.strip_prefix(label))
        .unwrap_or(value)
        .trim()
        .to_string()
}
