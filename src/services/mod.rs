//! Service layer for the lookup engine.
//!
//! This module contains the business logic for:
//! - Address parsing (`parse`)
//! - UPRN resolution (`AddressResolver`)
//! - Adapter dispatch (`DispatchBuilder`)
//! - Result normalization (`normalize`, `finalize`, `classify_failure`)

mod dispatch;
pub mod normalize;
pub mod parser;
mod resolver;

pub use dispatch::DispatchBuilder;
pub use normalize::{classify_failure, finalize, normalize, parse_adapter_output};
pub use parser::parse;
pub use resolver::{
    AddressDirectory, AddressMatcher, AddressResolver, PlacesDirectory, PublicDirectory,
    SubstringMatcher, UprnLookup, usable_key,
};
