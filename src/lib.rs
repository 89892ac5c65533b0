// src/lib.rs

//! binday: UK bin collection lookup library

pub mod adapters;
pub mod error;
pub mod models;
pub mod pipeline;
#[cfg(feature = "server")]
pub mod server;
pub mod services;
pub mod storage;
pub mod utils;
