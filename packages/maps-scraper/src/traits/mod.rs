//! Core trait abstractions.
//!
//! - [`render::RenderSession`] - one interactive browser page
//! - [`geocoder::ReverseGeocoder`] - coordinate to administrative divisions
//! - [`completion::CompletionService`] - JSON completions for classification

pub mod completion;
pub mod geocoder;
pub mod render;
