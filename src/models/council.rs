// src/models/council.rs

//! Council identity and per-council overrides.

use serde::{Deserialize, Serialize};

/// How a council's data is fetched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Integration {
    /// External adapter script
    #[default]
    Script,
    /// Standardized waste service API
    StandardApi,
    /// Native Wiltshire calendar client
    Wiltshire,
}

/// Override entry for one council.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CouncilProfile {
    /// Compact identifier (e.g., "WiltshireCouncil")
    pub id: String,

    #[serde(default)]
    pub integration: Integration,

    /// Fixed endpoint that replaces any user-supplied URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_url: Option<String>,

    /// Flags appended to every invocation (e.g., "-s" to skip the page fetch)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub extra_flags: Vec<String>,

    /// Reject UPRN-only input instead of substituting a placeholder postcode
    #[serde(default)]
    pub requires_postcode: bool,
}

impl CouncilProfile {
    /// A profile with no overrides, served by the adapter script.
    pub fn script(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            integration: Integration::Script,
            default_url: None,
            extra_flags: Vec::new(),
            requires_postcode: false,
        }
    }
}

/// Normalize a council selector to its compact identifier.
///
/// "Wiltshire Council" and "WiltshireCouncil" both become "WiltshireCouncil".
pub fn council_id(selector: &str) -> String {
    selector.split_whitespace().collect()
}

/// Render a compact identifier for display.
///
/// A space goes before each capital that starts a new word: after a
/// lowercase letter or digit, or at the end of an acronym.
pub fn display_name(id: &str) -> String {
    let chars: Vec<char> = id.chars().collect();
    let mut out = String::with_capacity(id.len() + 8);

    for (i, &c) in chars.iter().enumerate() {
        if i > 0 && c.is_uppercase() {
            let prev = chars[i - 1];
            let next_is_lower = chars.get(i + 1).is_some_and(|n| n.is_lowercase());
            if prev.is_lowercase()
                || prev.is_ascii_digit()
                || (prev.is_uppercase() && next_is_lower)
            {
                out.push(' ');
            }
        }
        out.push(c);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_name() {
        assert_eq!(display_name("WiltshireCouncil"), "Wiltshire Council");
        assert_eq!(display_name("BCPCouncil"), "BCP Council");
        assert_eq!(
            display_name("NewcastleUnderLymeCouncil"),
            "Newcastle Under Lyme Council"
        );
        assert_eq!(display_name("Leeds"), "Leeds");
    }

    #[test]
    fn test_council_id_round_trip() {
        assert_eq!(council_id("Wiltshire Council"), "WiltshireCouncil");
        assert_eq!(council_id(&display_name("WiltshireCouncil")), "WiltshireCouncil");
        assert_eq!(council_id("  "), "");
    }

    #[test]
    fn test_profile_deserializes_with_defaults() {
        let profile: CouncilProfile = toml::from_str(r#"id = "LeedsCityCouncil""#).unwrap();
        assert_eq!(profile, CouncilProfile::script("LeedsCityCouncil"));
    }
}
