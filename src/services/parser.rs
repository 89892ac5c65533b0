// src/services/parser.rs

//! Address parser.
//!
//! Classifies a free-text address fragment into the identifiers it carries.
//! Slots are filled in a fixed order (URL, postcode, UPRN, remainder) and
//! each matched token is removed from the working text before the next
//! slot is tried. The function is total: text with neither a postcode nor
//! a UPRN is passed through verbatim as a postcode-equivalent.

use std::sync::LazyLock;

use regex::Regex;

use crate::models::ParsedIntent;

static URL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"https?://\S+").expect("URL pattern is valid"));

static POSTCODE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"\b(?:[Gg][Ii][Rr]\s?0[Aa]{2}|[A-Za-z]{1,2}[0-9]{1,2}[A-Za-z]?\s?[0-9][A-Za-z]{2})\b",
    )
    .expect("postcode pattern is valid")
});

static UPRN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b[0-9]{8,12}\b").expect("UPRN pattern is valid"));

/// Parse an address fragment.
pub fn parse(text: &str) -> ParsedIntent {
    let mut working = text.to_string();

    let url = take_first(&URL_RE, &mut working);
    let postcode = take_first(&POSTCODE_RE, &mut working).map(|raw| canonical_postcode(&raw));
    let uprn = take_first(&UPRN_RE, &mut working);

    if postcode.is_none() && uprn.is_none() {
        return ParsedIntent {
            url,
            postcode: Some(text.to_string()),
            fallback: true,
            ..ParsedIntent::default()
        };
    }

    ParsedIntent {
        url,
        postcode,
        uprn,
        house_identifier: residual(&working),
        fallback: false,
    }
}

/// Uppercase a postcode and space it as "OUTWARD INWARD".
pub fn canonical_postcode(raw: &str) -> String {
    let compact: String = raw
        .chars()
        .filter(|c| !c.is_whitespace())
        .map(|c| c.to_ascii_uppercase())
        .collect();

    let Some((split, _)) = compact.char_indices().rev().nth(2) else {
        return compact;
    };
    if split == 0 {
        return compact;
    }
    let (outward, inward) = compact.split_at(split);
    format!("{outward} {inward}")
}

/// Remove the first match of `re` from `working` and return it.
fn take_first(re: &Regex, working: &mut String) -> Option<String> {
    let found = re.find(working)?;
    let (range, token) = (found.range(), found.as_str().to_string());
    working.replace_range(range, " ");
    Some(token)
}

fn residual(working: &str) -> Option<String> {
    let collapsed = working.split_whitespace().collect::<Vec<_>>().join(" ");
    let trimmed = collapsed.trim_matches(|c: char| c.is_whitespace() || c.is_ascii_punctuation());
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}
