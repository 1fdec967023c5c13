//! Listing page extraction.
//!
//! - [`page`] - parsed snapshot of a rendered page
//! - [`fields`] - per-field strategy chains and the record builder
//! - [`coordinates`] - four-strategy coordinate resolver

pub mod coordinates;
pub mod fields;
pub mod page;

pub use coordinates::{CoordinateSource, Coordinates};
pub use fields::{extract_record, parse_rating_reviews, Strategy};
pub use page::DetailPage;
