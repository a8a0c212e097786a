//! # World Encyclopedia Common Library
//!
//! Shared code for the aggregator crates:
//! - Configuration loading (TOML file, environment, compiled defaults)
//! - Common error and result types
//! - Clock abstraction used by the response cache and year analysis

pub mod config;
pub mod error;
pub mod time;

pub use config::WencConfig;
pub use error::{Error, Result};
pub use time::{Clock, ManualClock, SystemClock};
