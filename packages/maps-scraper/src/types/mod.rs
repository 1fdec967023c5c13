pub mod progress;
pub mod record;
