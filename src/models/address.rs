// src/models/address.rs

use serde::{Deserialize, Serialize};

/// One address returned by a directory lookup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressCandidate {
    pub uprn: String,

    #[serde(rename = "address")]
    pub display_address: String,
}

impl AddressCandidate {
    pub fn new(uprn: impl Into<String>, display_address: impl Into<String>) -> Self {
        Self {
            uprn: uprn.into(),
            display_address: display_address.into(),
        }
    }

    /// Placeholder entry returned when the directory produced nothing.
    pub fn sentinel() -> Self {
        Self::new("", "No addresses found for this postcode")
    }

    pub fn is_sentinel(&self) -> bool {
        self.uprn.is_empty()
    }
}

/// Outcome of resolving a house identifier to a UPRN.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Found(String),
    NotFound,
    /// The privileged directory rejected the key
    Unauthorized,
}

impl Resolution {
    pub fn uprn(&self) -> Option<&str> {
        match self {
            Resolution::Found(uprn) => Some(uprn),
            _ => None,
        }
    }
}
