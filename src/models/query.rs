// src/models/query.rs

//! Incoming queries and their parsed form.

use serde::{Deserialize, Serialize};

/// A lookup request as received from the presentation layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawQuery {
    /// Free-text address fragment
    #[serde(alias = "address_data", alias = "addressData")]
    pub text: String,

    /// Council selector, compact ("WiltshireCouncil") or display form
    #[serde(alias = "module")]
    pub council: String,

    /// Credential for the privileged address directory
    #[serde(default, alias = "api_key", alias = "apiKey")]
    pub api_key: Option<String>,
}

impl RawQuery {
    pub fn new(text: impl Into<String>, council: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            council: council.into(),
            api_key: None,
        }
    }

    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }
}

/// Identifiers extracted from a free-text address.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedIntent {
    /// Council calendar or API URL
    pub url: Option<String>,

    /// Canonical postcode, or the raw text when `fallback` is set
    pub postcode: Option<String>,

    /// 8-12 digit property reference
    pub uprn: Option<String>,

    /// Whatever text remained, trimmed of punctuation
    pub house_identifier: Option<String>,

    /// Nothing matched; `postcode` holds the original text verbatim
    pub fallback: bool,
}

impl ParsedIntent {
    /// Whether an address directory lookup could supply the missing UPRN.
    pub fn needs_resolution(&self) -> bool {
        self.uprn.is_none()
            && !self.fallback
            && self.postcode.is_some()
            && self.house_identifier.is_some()
    }
}
