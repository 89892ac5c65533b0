//! Utility functions and helpers.

pub mod http;
