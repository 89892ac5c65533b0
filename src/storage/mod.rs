//! Storage for lookup results.
//!
//! Results live in process memory only, keyed by council and the raw
//! address text:
//!
//! ```text
//! WiltshireCouncil|10 sn8 1ra  ->  { stored_at, [CollectionEntry, ...] }
//! ```
//!
//! Entries older than the TTL are never served and are evicted on read.

pub mod memory;

pub use memory::{CachedResult, ResultCache, cache_key};
