//! Render-engine sessions.

pub mod chromium;

pub use chromium::ChromiumSession;
