//! tidescale-core — configuration shared by the Tidescale crates.
//!
//! Parses `tidescale.toml` into [`DaemonConfig`] and provides the
//! duration-string parser used for resync and backoff settings.

pub mod config;
pub mod duration;

pub use config::DaemonConfig;
pub use duration::{DurationParseError, parse_duration_secs};
