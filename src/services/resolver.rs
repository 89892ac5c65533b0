// src/services/resolver.rs

//! Address resolver.
//!
//! Turns a postcode plus house identifier into a UPRN by listing the
//! addresses at the postcode and picking the first one whose text contains
//! the identifier. Two directory backends are interchangeable: a privileged
//! JSON endpoint used when the caller supplies a usable API key, and a
//! public HTML directory otherwise.

use std::sync::LazyLock;

use async_trait::async_trait;
use regex::Regex;
use reqwest::{Client, StatusCode};
use scraper::{Html, Selector};
use serde::Deserialize;

use crate::error::{AppError, Result};
use crate::models::{AddressCandidate, ResolverConfig, Resolution};

static UPRN_IN_HREF: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:^|[^0-9])([0-9]{8,12})(?:[^0-9]|$)").expect("UPRN pattern is valid")
});

/// A source of addresses for a postcode.
#[async_trait]
pub trait AddressDirectory: Send + Sync {
    fn name(&self) -> &'static str;

    async fn candidates(&self, postcode: &str) -> Result<Vec<AddressCandidate>>;
}

/// Chooses one candidate for a house identifier.
pub trait AddressMatcher: Send + Sync {
    fn pick<'a>(
        &self,
        house_identifier: &str,
        candidates: &'a [AddressCandidate],
    ) -> Option<&'a AddressCandidate>;
}

/// First candidate whose address contains the identifier, ignoring case.
///
/// Short identifiers over-match ("1" also matches "10"); the first hit in
/// listing order wins.
#[derive(Debug, Clone, Copy, Default)]
pub struct SubstringMatcher;

impl AddressMatcher for SubstringMatcher {
    fn pick<'a>(
        &self,
        house_identifier: &str,
        candidates: &'a [AddressCandidate],
    ) -> Option<&'a AddressCandidate> {
        let needle = house_identifier.trim().to_lowercase();
        if needle.is_empty() {
            return None;
        }
        candidates
            .iter()
            .find(|c| c.display_address.to_lowercase().contains(&needle))
    }
}

/// UPRN lookup as the engine sees it.
#[async_trait]
pub trait UprnLookup: Send + Sync {
    /// List every address at a postcode.
    async fn candidates(&self, postcode: &str, api_key: Option<&str>)
    -> Result<Vec<AddressCandidate>>;

    fn matcher(&self) -> &dyn AddressMatcher {
        &SubstringMatcher
    }

    /// Resolve a house identifier. Never fails; only a rejected key is
    /// reported apart from "not found".
    async fn resolve(
        &self,
        postcode: &str,
        house_identifier: &str,
        api_key: Option<&str>,
    ) -> Resolution {
        match self.candidates(postcode, api_key).await {
            Ok(candidates) => match self.matcher().pick(house_identifier, &candidates) {
                Some(found) => {
                    log::debug!(
                        "Resolved '{}' at {} to UPRN {} ({})",
                        house_identifier,
                        postcode,
                        found.uprn,
                        found.display_address
                    );
                    Resolution::Found(found.uprn.clone())
                }
                None => {
                    log::debug!(
                        "No match for '{}' among {} addresses at {}",
                        house_identifier,
                        candidates.len(),
                        postcode
                    );
                    Resolution::NotFound
                }
            },
            Err(AppError::UpstreamAuth(message)) => {
                log::warn!("Address directory rejected the key: {}", message);
                Resolution::Unauthorized
            }
            Err(e) => {
                log::warn!("Address lookup for {} failed: {}", postcode, e);
                Resolution::NotFound
            }
        }
    }
}

/// Resolver backed by the two HTTP directories.
pub struct AddressResolver {
    client: Client,
    config: ResolverConfig,
    matcher: Box<dyn AddressMatcher>,
}

impl AddressResolver {
    pub fn new(client: Client, config: ResolverConfig) -> Self {
        Self {
            client,
            config,
            matcher: Box::new(SubstringMatcher),
        }
    }

    /// Swap in a different matching policy.
    pub fn with_matcher(mut self, matcher: impl AddressMatcher + 'static) -> Self {
        self.matcher = Box::new(matcher);
        self
    }

    /// Select the backend for a request.
    pub fn directory(&self, api_key: Option<&str>) -> Box<dyn AddressDirectory> {
        match usable_key(api_key, self.config.min_key_length) {
            Some(key) => Box::new(PlacesDirectory {
                client: self.client.clone(),
                url: self.config.places_url.clone(),
                key: key.to_string(),
            }),
            None => Box::new(PublicDirectory {
                client: self.client.clone(),
                url_template: self.config.public_url.clone(),
            }),
        }
    }
}

#[async_trait]
impl UprnLookup for AddressResolver {
    async fn candidates(
        &self,
        postcode: &str,
        api_key: Option<&str>,
    ) -> Result<Vec<AddressCandidate>> {
        let directory = self.directory(api_key);
        log::debug!("Listing addresses at {} via {}", postcode, directory.name());
        directory.candidates(postcode).await
    }

    fn matcher(&self) -> &dyn AddressMatcher {
        self.matcher.as_ref()
    }
}

/// A key is usable when it is present and longer than `min_len`.
pub fn usable_key(api_key: Option<&str>, min_len: usize) -> Option<&str> {
    api_key.map(str::trim).filter(|k| k.len() > min_len)
}

fn compact_postcode(postcode: &str) -> String {
    postcode
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect::<String>()
        .to_uppercase()
}

/// Privileged postcode directory returning explicit UPRNs.
pub struct PlacesDirectory {
    client: Client,
    url: String,
    key: String,
}

#[derive(Debug, Deserialize)]
struct PlacesResponse {
    #[serde(default)]
    results: Vec<PlacesResult>,
}

#[derive(Debug, Deserialize)]
struct PlacesResult {
    #[serde(rename = "DPA")]
    dpa: Option<PlacesAddress>,
}

#[derive(Debug, Deserialize)]
struct PlacesAddress {
    #[serde(rename = "UPRN")]
    uprn: String,
    #[serde(rename = "ADDRESS")]
    address: String,
}

/// Parse a privileged directory response body.
pub fn parse_places_json(body: &str) -> Result<Vec<AddressCandidate>> {
    let response: PlacesResponse = serde_json::from_str(body)?;
    Ok(response
        .results
        .into_iter()
        .filter_map(|r| r.dpa)
        .map(|dpa| AddressCandidate::new(dpa.uprn, dpa.address))
        .collect())
}

#[async_trait]
impl AddressDirectory for PlacesDirectory {
    fn name(&self) -> &'static str {
        "places"
    }

    async fn candidates(&self, postcode: &str) -> Result<Vec<AddressCandidate>> {
        let response = self
            .client
            .get(&self.url)
            .query(&[("postcode", postcode), ("key", self.key.as_str())])
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            return Err(AppError::UpstreamAuth(format!("HTTP 401 from {}", self.url)));
        }
        if !status.is_success() {
            return Err(AppError::status("address directory", status));
        }
        parse_places_json(&response.text().await?)
    }
}

/// Public HTML directory; UPRNs are read from link targets.
pub struct PublicDirectory {
    client: Client,
    url_template: String,
}

/// Extract candidates from a public directory page.
pub fn parse_public_html(body: &str) -> Vec<AddressCandidate> {
    let document = Html::parse_document(body);
    let Ok(anchors) = Selector::parse("a[href]") else {
        return Vec::new();
    };

    document
        .select(&anchors)
        .filter_map(|a| {
            let href = a.value().attr("href")?;
            let uprn = UPRN_IN_HREF.captures(href)?.get(1)?.as_str().to_string();
            let text = a.text().collect::<Vec<_>>().join(" ");
            let address = text.split_whitespace().collect::<Vec<_>>().join(" ");
            (!address.is_empty()).then(|| AddressCandidate::new(uprn, address))
        })
        .collect()
}

#[async_trait]
impl AddressDirectory for PublicDirectory {
    fn name(&self) -> &'static str {
        "public"
    }

    async fn candidates(&self, postcode: &str) -> Result<Vec<AddressCandidate>> {
        let url = self
            .url_template
            .replace("{postcode}", &compact_postcode(postcode));
        let response = self.client.get(&url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(AppError::status("address directory", status));
        }
        Ok(parse_public_html(&response.text().await?))
    }
}
