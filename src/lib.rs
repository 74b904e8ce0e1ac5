//! Merge several RSS/Atom feeds into a single date-filtered RSS 2.0 document.

pub mod app;
pub mod config;
pub mod feed;
pub mod threshold;
pub mod util;

pub use app::{run, Clock, RunOptions, RunOutcome};
pub use config::{Config, ConfigError};
pub use threshold::{resolve_threshold, DateThreshold};
