//! mqbridge Core Library
//!
//! This crate provides the pieces of mqbridge that do not touch the network:
//! - Application configuration loading and validation
//! - The rule model, rule validation and rule directory loading
//! - The metrics [`Recorder`] port used by the runtime
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐
//! │  AppConfig  │────▶│ Rule loader │────▶│  Validated  │
//! │ (JSON/YAML) │     │ (rules/*.json)    │    rules    │
//! └─────────────┘     └─────────────┘     └─────────────┘
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use mqbridge_core::{AppConfig, rule::load_rules};
//!
//! let config = AppConfig::load("config/app.json")?;
//! for rule in load_rules(&config.rules.directory)? {
//!     println!("{} -> {}", rule.id, rule.target.topic);
//! }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod error;
pub mod metrics;
pub mod rule;

pub use config::AppConfig;
pub use error::{Error, Result, RuleField};
pub use metrics::{NoopRecorder, Recorder, TracingRecorder};
pub use rule::Rule;
