// src/models/collection.rs

//! Collection entries and the canonical `{bins: [...]}` response.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Wire format of a collection date.
pub const DATE_FORMAT: &str = "%d/%m/%Y";

/// A single scheduled collection.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CollectionEntry {
    /// Bin or service name (e.g., "Household Waste")
    #[serde(rename = "type")]
    pub bin_type: String,

    /// Collection day
    #[serde(rename = "collectionDate", with = "dmy")]
    pub collection_date: NaiveDate,
}

impl CollectionEntry {
    pub fn new(bin_type: impl Into<String>, collection_date: NaiveDate) -> Self {
        Self {
            bin_type: bin_type.into(),
            collection_date,
        }
    }
}

/// An entry as an adapter reported it, before date normalization.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RawCollection {
    #[serde(rename = "type")]
    pub bin_type: String,

    #[serde(rename = "collectionDate")]
    pub date: String,
}

impl RawCollection {
    pub fn new(bin_type: impl Into<String>, date: impl Into<String>) -> Self {
        Self {
            bin_type: bin_type.into(),
            date: date.into(),
        }
    }
}

/// Canonical success body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BinsResponse {
    pub bins: Vec<CollectionEntry>,
}

impl From<Vec<CollectionEntry>> for BinsResponse {
    fn from(bins: Vec<CollectionEntry>) -> Self {
        Self { bins }
    }
}

mod dmy {
    use chrono::NaiveDate;
    use serde::{Deserialize, Deserializer, Serializer, de::Error};

    use super::DATE_FORMAT;

    pub fn serialize<S: Serializer>(date: &NaiveDate, s: S) -> Result<S::Ok, S::Error> {
        s.collect_str(&date.format(DATE_FORMAT))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<NaiveDate, D::Error> {
        let raw = String::deserialize(d)?;
        NaiveDate::parse_from_str(&raw, DATE_FORMAT).map_err(D::Error::custom)
    }
}
