// src/services/normalize.rs

//! Normalizer.
//!
//! Maps adapter payloads onto [`CollectionEntry`] lists and adapter
//! failures onto the error taxonomy.

use std::collections::HashSet;
use std::sync::LazyLock;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use regex::Regex;
use serde::Deserialize;

use crate::error::{AppError, Result};
use crate::models::{CollectionEntry, DATE_FORMAT, DispatchPlan, RawCollection};

static BINS_OBJECT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"\{\s*"bins"\s*:"#).expect("bins pattern is valid"));

/// Diagnostics meaning a URL was expected where something else was given.
const URL_SIGNATURES: &[&str] = &[
    "missing schema",
    "missingschema",
    "no scheme supplied",
    "invalid url",
];

/// Diagnostics meaning the source did not recognize the address.
const NOT_FOUND_SIGNATURES: &[&str] = &[
    "not found",
    "invalid postcode",
    "invalid uprn",
    "invalid address",
    "no addresses",
];

const URL_HINT: &str = "This council likely needs a URL. Paste the council's bin collection \
     page URL before your postcode, or contact the site administrator.";

/// Longest diagnostic passed through to callers.
const MAX_DIAGNOSTIC_CHARS: usize = 1000;

/// Adapter payload, wrapped or bare.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum BinsPayload {
    Wrapped { bins: Vec<RawCollection> },
    Bare(Vec<RawCollection>),
}

impl BinsPayload {
    fn into_bins(self) -> Vec<RawCollection> {
        match self {
            BinsPayload::Wrapped { bins } | BinsPayload::Bare(bins) => bins,
        }
    }
}

/// Read the bins document from adapter output.
///
/// Output that is not a JSON document by itself is scanned for a
/// `{"bins": ...}` object, with anything after it ignored.
pub fn parse_adapter_output(output: &str) -> Result<Vec<RawCollection>> {
    if let Ok(payload) = serde_json::from_str::<BinsPayload>(output.trim()) {
        return Ok(payload.into_bins());
    }

    for found in BINS_OBJECT.find_iter(output) {
        let mut stream =
            serde_json::Deserializer::from_str(&output[found.start()..]).into_iter::<BinsPayload>();
        if let Some(Ok(payload)) = stream.next() {
            log::debug!("Recovered bins object at offset {}", found.start());
            return Ok(payload.into_bins());
        }
    }

    Err(AppError::parse(format!(
        "no bins object in adapter output: {}",
        tail(output.trim(), 200)
    )))
}

/// Parse a collection date in any of the formats adapters emit.
pub fn parse_collection_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    NaiveDate::parse_from_str(raw, DATE_FORMAT)
        .or_else(|_| NaiveDate::parse_from_str(raw, "%Y-%m-%d"))
        .ok()
        .or_else(|| DateTime::parse_from_rfc3339(raw).ok().map(|dt| dt.date_naive()))
        .or_else(|| {
            NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
                .ok()
                .map(|dt| dt.date())
        })
}

/// Convert raw entries into canonical ones.
///
/// Order is preserved and repeated (type, date) pairs are dropped.
/// Entries whose date cannot be read are skipped; if every entry is
/// unreadable the payload is rejected.
pub fn normalize(raw: Vec<RawCollection>) -> Result<Vec<CollectionEntry>> {
    let total = raw.len();
    let mut seen = HashSet::new();
    let mut entries = Vec::with_capacity(total);
    let mut skipped = 0usize;

    for item in raw {
        let bin_type = item.bin_type.trim();
        let Some(date) = parse_collection_date(&item.date) else {
            log::debug!("Skipping entry with unreadable date: {:?}", item);
            skipped += 1;
            continue;
        };
        if bin_type.is_empty() {
            skipped += 1;
            continue;
        }
        let entry = CollectionEntry::new(bin_type, date);
        if seen.insert(entry.clone()) {
            entries.push(entry);
        }
    }

    if total > 0 && skipped == total {
        return Err(AppError::parse(format!(
            "none of the {total} entries had a readable type and date"
        )));
    }
    if skipped > 0 {
        log::warn!("Dropped {} of {} malformed entries", skipped, total);
    }
    Ok(entries)
}

/// Apply business rules to a normalized result.
///
/// An empty schedule found with a placeholder postcode means the source
/// did not recognize the property, not that nothing is scheduled.
pub fn finalize(entries: Vec<CollectionEntry>, plan: &DispatchPlan) -> Result<Vec<CollectionEntry>> {
    if entries.is_empty() && plan.used_placeholder_postcode {
        return Err(AppError::not_found(
            "no collections found for this UPRN without a postcode",
        ));
    }
    Ok(entries)
}

/// Rewrite adapter failures with known diagnostics into friendlier errors.
pub fn classify_failure(err: AppError) -> AppError {
    let AppError::Adapter { context, message } = err else {
        return err;
    };
    let lower = message.to_lowercase();

    if URL_SIGNATURES.iter().any(|s| lower.contains(s)) {
        return AppError::Adapter {
            context,
            message: URL_HINT.to_string(),
        };
    }
    if NOT_FOUND_SIGNATURES.iter().any(|s| lower.contains(s)) {
        return AppError::not_found(format!(
            "the council did not recognize this address ({})",
            last_line(&message)
        ));
    }
    AppError::Adapter {
        context,
        message: tail(message.trim(), MAX_DIAGNOSTIC_CHARS).to_string(),
    }
}

fn last_line(text: &str) -> &str {
    text.lines()
        .rev()
        .map(str::trim)
        .find(|l| !l.is_empty())
        .unwrap_or("")
}

/// The last `max` characters of `text`.
fn tail(text: &str, max: usize) -> &str {
    match text.char_indices().rev().nth(max.saturating_sub(1)) {
        Some((idx, _)) if max > 0 => &text[idx..],
        _ => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::models::{Flag, Strategy};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_parse_collection_date_formats() {
        let expected = Some(date(2025, 6, 12));
        assert_eq!(parse_collection_date("12/06/2025"), expected);
        assert_eq!(parse_collection_date("2025-06-12"), expected);
        assert_eq!(parse_collection_date("2025-06-12T07:00:00"), expected);
        assert_eq!(parse_collection_date("2025-06-12T07:00:00.000"), expected);
        assert_eq!(parse_collection_date("2025-06-12T07:00:00+01:00"), expected);
        assert_eq!(parse_collection_date("2025-06-12T07:00:00Z"), expected);
        assert_eq!(parse_collection_date("next Thursday"), None);
    }

    #[test]
    fn test_normalize_dedupes_and_keeps_order() {
        let raw = vec![
            RawCollection::new("Household Waste", "12/06/2025"),
            RawCollection::new("Recycling", "2025-06-19"),
            RawCollection::new("Household Waste", "2025-06-12T00:00:00"),
            RawCollection::new("Garden", "soon"),
        ];
        let entries = normalize(raw).unwrap();
        assert_eq!(
            entries,
            vec![
                CollectionEntry::new("Household Waste", date(2025, 6, 12)),
                CollectionEntry::new("Recycling", date(2025, 6, 19)),
            ]
        );
    }

    #[test]
    fn test_normalize_rejects_all_unreadable() {
        let err = normalize(vec![RawCollection::new("Garden", "soon")]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ParseError);
        assert!(normalize(Vec::new()).unwrap().is_empty());
    }

    #[test]
    fn test_parse_adapter_output_direct() {
        let out = r#"{"bins":[{"type":"Recycling","collectionDate":"19/06/2025"}]}"#;
        assert_eq!(
            parse_adapter_output(out).unwrap(),
            vec![RawCollection::new("Recycling", "19/06/2025")]
        );
    }

    #[test]
    fn test_parse_adapter_output_with_noise() {
        let out = "Fetching page...\nDevTools listening on ws://x {\n{\"bins\": [{\"type\": \"Recycling\", \"collectionDate\": \"19/06/2025\"}]}\nDone.\n";
        assert_eq!(parse_adapter_output(out).unwrap().len(), 1);
    }

    #[test]
    fn test_parse_adapter_output_bare_list() {
        let out = r#"[{"type":"Glass","collectionDate":"2025-06-20"}]"#;
        assert_eq!(parse_adapter_output(out).unwrap()[0].bin_type, "Glass");
    }

    #[test]
    fn test_parse_adapter_output_garbage() {
        let err = parse_adapter_output("Traceback (most recent call last)").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ParseError);
    }

    #[test]
    fn test_finalize_empty_with_placeholder_is_not_found() {
        let mut plan = DispatchPlan::new(Strategy::GenericAdapter).arg(Flag::Uprn, "100120992798");
        assert!(finalize(Vec::new(), &plan).unwrap().is_empty());

        plan.used_placeholder_postcode = true;
        let err = finalize(Vec::new(), &plan).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFoundError);
    }

    #[test]
    fn test_classify_missing_schema() {
        let err = classify_failure(AppError::adapter(
            "Script failed",
            "requests.exceptions.MissingSchema: Invalid URL 'SN8 1RA': No scheme supplied.",
        ));
        assert_eq!(err.kind(), ErrorKind::AdapterExecutionError);
        assert!(err.to_string().contains("likely needs a URL"));
    }

    #[test]
    fn test_classify_not_found_marker() {
        let err = classify_failure(AppError::adapter(
            "Script failed",
            "Traceback...\nValueError: Address not found\n",
        ));
        assert_eq!(err.kind(), ErrorKind::NotFoundError);
        assert!(err.to_string().contains("Address not found"));
    }

    #[test]
    fn test_classify_passes_through_unknown() {
        let err = classify_failure(AppError::adapter("Script failed", "  KeyError: 'bins'  "));
        assert_eq!(err.to_string(), "Script failed: KeyError: 'bins'");

        let other = classify_failure(AppError::parse("x"));
        assert_eq!(other.kind(), ErrorKind::ParseError);
    }

    #[test]
    fn test_tail_respects_char_boundaries() {
        assert_eq!(tail("héllo", 3), "llo");
        assert_eq!(tail("ab", 10), "ab");
    }
}
