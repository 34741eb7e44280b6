//! Shields Core Library
//!
//! Request-blocking decision core for a mobile browser: ad blocking, tracker
//! blocking and HTTPS upgrading, driven by downloaded filter datasets.
//!
//! # Architecture
//!
//! The filter engines themselves are external; this crate owns their
//! lifecycle. Each dataset is loaded lazily, at most once, from a blob on disk
//! the first time a query needs it. Every failure (missing file, empty file,
//! rejected blob, malformed rule) fails open: nothing is blocked and URLs are
//! returned unchanged. Decisions that are expensive to recompute are cached in
//! bounded caches shared by all request threads.
//!
//! # Modules
//!
//! - `config`: Worker configuration (JSON)
//! - `dataset`: Dataset names and pointer-file resolution
//! - `engine`: Engine contracts and the JSON rule database
//! - `store`: Lazy, load-once engine slots
//! - `adblock`: Ad-block decision
//! - `tracker`: Tracker decision and third-party host cache
//! - `https`: HTTPS upgrade rules, result cache and redirect guard
//! - `shields`: Per-host shields settings
//! - `worker`: The `BlockersWorker` facade
//! - `tokens`: Token splitting and domain-suffix lookup keys
//! - `cache`: Bounded LRU cache
//! - `url`: Fast URL parsing without allocations
//! - `types`: Shared type definitions

pub mod adblock;
pub mod cache;
pub mod config;
pub mod dataset;
pub mod engine;
pub mod error;
pub mod https;
pub mod shields;
pub mod store;
pub mod tokens;
pub mod tracker;
pub mod types;
pub mod url;
pub mod worker;

#[cfg(test)]
mod testing;

// Re-export commonly used types
pub use config::BlockersConfig;
pub use dataset::{DataDir, DatasetKind, DatasetResolver};
pub use engine::{AdBlockEngine, FilterEngine, JsonRuleDatabase, RuleDatabase, TrackerEngine};
pub use error::{BlockerError, Result};
pub use https::{HttpsUpgrader, RedirectGuard, RuleSet};
pub use shields::{HostSettings, HostSettingsTable, ShieldsSettings};
pub use tokens::{lookup_keys, split_tokens};
pub use types::{BlockReason, RequestDecision, RequestInfo, RequestType, ResourceOption};
pub use worker::BlockersWorker;
