// src/models/mod.rs

//! Domain models for the lookup engine.
//!
//! This module contains all data structures used throughout the application,
//! organized by their primary purpose.

mod address;
mod collection;
mod config;
pub mod council;
mod plan;
mod query;

// Re-export all public types
pub use address::{AddressCandidate, Resolution};
pub use collection::{BinsResponse, CollectionEntry, DATE_FORMAT, RawCollection};
pub use config::{
    AdapterConfig, CacheConfig, Config, HttpConfig, LoggingConfig, ResolverConfig, ServerConfig,
};
pub use council::{CouncilProfile, Integration};
pub use plan::{DispatchPlan, Flag, Strategy};
pub use query::{ParsedIntent, RawQuery};
