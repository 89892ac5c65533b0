// src/pipeline/lookup.rs

//! The lookup engine.
//!
//! `BinService` owns every component and runs a query through them:
//! cache, parser, resolver, dispatch, adapter, normalizer. It is shared
//! across requests behind an `Arc`.

use std::fs;
use std::sync::Arc;
use std::time::Instant;

use crate::adapters::AdapterRegistry;
use crate::error::{AppError, ErrorEnvelope, Result};
use crate::models::council::{council_id, display_name};
use crate::models::{
    AddressCandidate, BinsResponse, CollectionEntry, Config, CouncilProfile, RawQuery, Resolution,
};
use crate::pipeline::calendar::render_calendar;
use crate::services::{
    AddressResolver, DispatchBuilder, UprnLookup, classify_failure, finalize, normalize, parse,
};
use crate::storage::{ResultCache, cache_key};
use crate::utils::http::create_async_client;

pub struct BinService {
    config: Arc<Config>,
    resolver: Arc<dyn UprnLookup>,
    adapters: AdapterRegistry,
    dispatch: DispatchBuilder,
    cache: ResultCache,
}

impl BinService {
    /// Wire the service to the real HTTP directories and adapters.
    pub fn new(config: Config) -> Result<Self> {
        let client = create_async_client(&config.http)?;
        let resolver = Arc::new(AddressResolver::new(client.clone(), config.resolver.clone()));
        let adapters = AdapterRegistry::from_config(&config, client);
        Ok(Self::with_parts(config, resolver, adapters))
    }

    pub fn with_parts(
        config: Config,
        resolver: Arc<dyn UprnLookup>,
        adapters: AdapterRegistry,
    ) -> Self {
        Self {
            dispatch: DispatchBuilder::new(config.adapter.placeholder_postcode.clone()),
            cache: ResultCache::new(config.cache.ttl_secs),
            config: Arc::new(config),
            resolver,
            adapters,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn cache(&self) -> &ResultCache {
        &self.cache
    }

    /// Look up the collection schedule for a query.
    pub async fn lookup(&self, query: &RawQuery) -> Result<Vec<CollectionEntry>> {
        let council = council_id(&query.council);
        if council.is_empty() {
            return Err(AppError::input(
                "No council was selected",
                Some("Choose your council from the list."),
            ));
        }
        let text = query.text.trim();
        if text.is_empty() {
            return Err(AppError::input(
                "Enter a postcode, UPRN or address",
                Some("For example '10 SN8 1RA' or '100120992798'."),
            ));
        }

        let key = cache_key(&council, &query.text);
        if let Some(hit) = self.cache.get(&key) {
            return Ok(hit);
        }

        let profile = self.profile(&council);
        let intent = parse(text);

        let resolution = match (&intent.postcode, &intent.house_identifier) {
            (Some(postcode), Some(house)) if intent.needs_resolution() => {
                self.resolver
                    .resolve(postcode, house, query.api_key.as_deref())
                    .await
            }
            _ => Resolution::NotFound,
        };
        if resolution == Resolution::Unauthorized {
            return Err(AppError::UpstreamAuth(
                "the address directory refused the supplied key".into(),
            ));
        }

        let plan = self.dispatch.build(&intent, &profile, resolution.uprn())?;
        let adapter = self.adapters.select(&profile, &plan);

        let started = Instant::now();
        let raw = adapter
            .execute(&council, &plan)
            .await
            .map_err(classify_failure)?;
        log::info!(
            "{} adapter for {} returned {} entries in {:.1}s",
            adapter.name(),
            council,
            raw.len(),
            started.elapsed().as_secs_f64()
        );

        let entries = finalize(normalize(raw)?, &plan)?;
        self.cache.put(key, entries.clone());
        Ok(entries)
    }

    /// Boundary form of [`lookup`](Self::lookup): the canonical body or the
    /// error envelope.
    pub async fn get_bins(&self, query: &RawQuery) -> std::result::Result<BinsResponse, ErrorEnvelope> {
        self.lookup(query).await.map(BinsResponse::from).map_err(|e| {
            log::warn!("Lookup for '{}' at {} failed: {}", query.text, query.council, e);
            ErrorEnvelope::from(&e)
        })
    }

    /// Render the schedule for a query as a calendar feed.
    pub async fn calendar(&self, query: &RawQuery) -> Result<String> {
        let entries = self.lookup(query).await?;
        Ok(render_calendar(&entries))
    }

    /// List the addresses at a postcode.
    ///
    /// Only a rejected key is reported as an error; any other failure, or
    /// an empty listing, yields the single sentinel entry.
    pub async fn addresses(
        &self,
        postcode: &str,
        api_key: Option<&str>,
    ) -> Result<Vec<AddressCandidate>> {
        let postcode = postcode.trim();
        if postcode.is_empty() {
            return Err(AppError::input("Enter a postcode", None));
        }

        match self.resolver.candidates(postcode, api_key).await {
            Ok(candidates) if !candidates.is_empty() => Ok(candidates),
            Ok(_) => Ok(vec![AddressCandidate::sentinel()]),
            Err(e @ AppError::UpstreamAuth(_)) => Err(e),
            Err(e) => {
                log::warn!("Address listing for {} failed: {}", postcode, e);
                Ok(vec![AddressCandidate::sentinel()])
            }
        }
    }

    /// Supported councils, sorted and formatted for display.
    ///
    /// Combines the override table with adapter scripts found in the
    /// configured councils directory.
    pub fn councils(&self) -> Result<Vec<String>> {
        let mut ids: Vec<String> = self.config.councils.iter().map(|c| c.id.clone()).collect();

        if let Some(dir) = &self.config.adapter.councils_dir {
            for entry in fs::read_dir(dir)? {
                let path = entry?.path();
                if path.extension().is_none_or(|ext| ext != "py") {
                    continue;
                }
                if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                    if !stem.starts_with("__") {
                        ids.push(stem.to_string());
                    }
                }
            }
        }

        ids.sort();
        ids.dedup();
        Ok(ids.iter().map(|id| display_name(id)).collect())
    }

    /// Drop expired cache entries.
    pub fn purge_cache(&self) -> usize {
        self.cache.purge_expired()
    }

    fn profile(&self, council: &str) -> CouncilProfile {
        self.config
            .council(council)
            .cloned()
            .unwrap_or_else(|| CouncilProfile::script(council))
    }
}
