//! Source adapters.
//!
//! An adapter turns a [`DispatchPlan`] into raw collection entries. The
//! registry picks one per council: native clients where one exists, the
//! standardized API client for that strategy, and the external script
//! otherwise.

mod script;
mod standard_api;
mod wiltshire;

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Client;

use crate::error::Result;
use crate::models::{Config, CouncilProfile, DispatchPlan, Integration, RawCollection, Strategy};

pub use script::ScriptAdapter;
pub use standard_api::{StandardApiAdapter, parse_service_detail, parse_services};
pub use wiltshire::{WiltshireAdapter, parse_calendar_page, rolling_months};

/// A data source for one or more councils.
#[async_trait]
pub trait SourceAdapter: Send + Sync {
    /// Short name used in logs and error context.
    fn name(&self) -> &str;

    /// Fetch raw entries for one plan.
    async fn execute(&self, council: &str, plan: &DispatchPlan) -> Result<Vec<RawCollection>>;
}

/// Maps councils to adapters.
#[derive(Clone)]
pub struct AdapterRegistry {
    generic: Arc<dyn SourceAdapter>,
    standard: Arc<dyn SourceAdapter>,
    native: HashMap<String, Arc<dyn SourceAdapter>>,
}

impl AdapterRegistry {
    pub fn new(generic: Arc<dyn SourceAdapter>, standard: Arc<dyn SourceAdapter>) -> Self {
        Self {
            generic,
            standard,
            native: HashMap::new(),
        }
    }

    /// Registry wired to the real script, API and native adapters.
    pub fn from_config(config: &Config, client: Client) -> Self {
        let mut registry = Self::new(
            Arc::new(ScriptAdapter::new(config.adapter.clone())),
            Arc::new(StandardApiAdapter::new(client.clone())),
        );
        let wiltshire: Arc<dyn SourceAdapter> = Arc::new(WiltshireAdapter::new(client));
        for council in &config.councils {
            if council.integration == Integration::Wiltshire {
                registry = registry.with_native(&council.id, Arc::clone(&wiltshire));
            }
        }
        registry
    }

    /// Route a council to a dedicated adapter.
    pub fn with_native(mut self, council: &str, adapter: Arc<dyn SourceAdapter>) -> Self {
        self.native.insert(council.to_string(), adapter);
        self
    }

    /// Adapter serving `plan` for `council`.
    pub fn select(&self, council: &CouncilProfile, plan: &DispatchPlan) -> Arc<dyn SourceAdapter> {
        match plan.strategy {
            Strategy::StandardizedApi => Arc::clone(&self.standard),
            Strategy::GenericAdapter => self
                .native
                .get(&council.id)
                .cloned()
                .unwrap_or_else(|| Arc::clone(&self.generic)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Named(&'static str);

    #[async_trait]
    impl SourceAdapter for Named {
        fn name(&self) -> &str {
            self.0
        }

        async fn execute(&self, _council: &str, _plan: &DispatchPlan) -> Result<Vec<RawCollection>> {
            Ok(Vec::new())
        }
    }

    #[test]
    fn test_select_by_strategy_and_council() {
        let registry = AdapterRegistry::new(Arc::new(Named("script")), Arc::new(Named("api")))
            .with_native("WiltshireCouncil", Arc::new(Named("wiltshire")));

        let generic = DispatchPlan::new(Strategy::GenericAdapter);
        let standard = DispatchPlan::new(Strategy::StandardizedApi);

        let wilts = CouncilProfile::script("WiltshireCouncil");
        let leeds = CouncilProfile::script("LeedsCityCouncil");

        assert_eq!(registry.select(&wilts, &generic).name(), "wiltshire");
        assert_eq!(registry.select(&leeds, &generic).name(), "script");
        assert_eq!(registry.select(&leeds, &standard).name(), "api");
    }

    #[test]
    fn test_from_config_registers_native_councils() {
        let config = Config::default();
        let registry = AdapterRegistry::from_config(&config, Client::new());
        let plan = DispatchPlan::new(Strategy::GenericAdapter);
        assert_eq!(
            registry
                .select(&CouncilProfile::script("WiltshireCouncil"), &plan)
                .name(),
            "wiltshire"
        );
    }
}
