// src/adapters/standard_api.rs

//! Client for the cross-council waste service API.
//!
//! `GET {base}/services?uprn=..` lists the services at a property. Services
//! listed without any dates are looked up again through
//! `GET {base}/services/{id}?uprn=..`.

use std::fmt;

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use reqwest::Client;
use serde::Deserialize;
use url::Url;

use super::SourceAdapter;
use crate::error::{AppError, Result};
use crate::models::{DATE_FORMAT, DispatchPlan, RawCollection};
use crate::services::normalize::parse_collection_date;

const DETAIL_CONCURRENCY: usize = 4;

/// One service with its known collection dates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceRecord {
    pub id: Option<String>,
    pub name: String,
    pub dates: Vec<String>,
}

impl ServiceRecord {
    fn into_raw(self) -> Vec<RawCollection> {
        let name = self.name;
        self.dates
            .into_iter()
            .map(|date| {
                let date = parse_collection_date(&date)
                    .map(|d| d.format(DATE_FORMAT).to_string())
                    .unwrap_or(date);
                RawCollection::new(name.clone(), date)
            })
            .collect()
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ServiceList {
    Wrapped { services: Vec<Service> },
    Bare(Vec<Service>),
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ServiceDetail {
    Wrapped { service: Service },
    Bare(Service),
}

#[derive(Debug, Deserialize)]
struct Service {
    #[serde(default, alias = "serviceId", alias = "service_id")]
    id: Option<ServiceId>,

    #[serde(default, alias = "serviceName", alias = "service_name")]
    name: Option<String>,

    #[serde(default, rename = "nextCollection", alias = "next_collection")]
    next_collection: Option<DateRef>,

    #[serde(
        default,
        rename = "upcomingCollections",
        alias = "upcoming_collections",
        alias = "collections"
    )]
    upcoming: Vec<DateRef>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ServiceId {
    Text(String),
    Number(u64),
}

impl fmt::Display for ServiceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServiceId::Text(s) => f.write_str(s),
            ServiceId::Number(n) => write!(f, "{n}"),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum DateRef {
    Plain(String),
    Object {
        #[serde(alias = "collectionDate", alias = "datetime")]
        date: String,
    },
}

impl From<Service> for ServiceRecord {
    fn from(service: Service) -> Self {
        let id = service.id.map(|id| id.to_string());
        let name = service
            .name
            .filter(|n| !n.trim().is_empty())
            .or_else(|| id.clone())
            .unwrap_or_else(|| "Unknown service".to_string());
        let dates = service
            .next_collection
            .into_iter()
            .chain(service.upcoming)
            .map(|d| match d {
                DateRef::Plain(date) | DateRef::Object { date } => date,
            })
            .collect();
        Self { id, name, dates }
    }
}

/// Parse a service listing body.
pub fn parse_services(body: &str) -> Result<Vec<ServiceRecord>> {
    let list: ServiceList = serde_json::from_str(body)
        .map_err(|e| AppError::adapter("Listing services", format!("unexpected body: {e}")))?;
    let services = match list {
        ServiceList::Wrapped { services } | ServiceList::Bare(services) => services,
    };
    Ok(services.into_iter().map(ServiceRecord::from).collect())
}

/// Parse a single service detail body.
pub fn parse_service_detail(body: &str) -> Result<ServiceRecord> {
    let detail: ServiceDetail = serde_json::from_str(body).map_err(|e| {
        AppError::adapter("Fetching service detail", format!("unexpected body: {e}"))
    })?;
    let service = match detail {
        ServiceDetail::Wrapped { service } | ServiceDetail::Bare(service) => service,
    };
    Ok(ServiceRecord::from(service))
}

pub struct StandardApiAdapter {
    client: Client,
}

impl StandardApiAdapter {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    async fn get_text(&self, step: &str, url: Url, uprn: &str) -> Result<String> {
        let response = self
            .client
            .get(url)
            .query(&[("uprn", uprn)])
            .send()
            .await
            .map_err(|e| AppError::adapter(step, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::status(step, status));
        }
        response.text().await.map_err(|e| AppError::adapter(step, e))
    }

    async fn complete(&self, base: &Url, uprn: &str, record: ServiceRecord) -> Result<ServiceRecord> {
        if !record.dates.is_empty() {
            return Ok(record);
        }
        let Some(id) = record.id.as_deref() else {
            log::debug!("Service '{}' has no dates and no id", record.name);
            return Ok(record);
        };

        let url = base.join(&format!("services/{id}"))?;
        let body = self.get_text("Fetching service detail", url, uprn).await?;
        let detail = parse_service_detail(&body)?;
        Ok(ServiceRecord {
            dates: detail.dates,
            ..record
        })
    }
}

/// Base URL with a trailing slash so relative joins append.
fn api_base(target: &str) -> Result<Url> {
    let mut base = Url::parse(target.trim())?;
    if !base.path().ends_with('/') {
        let path = format!("{}/", base.path());
        base.set_path(&path);
    }
    Ok(base)
}

#[async_trait]
impl SourceAdapter for StandardApiAdapter {
    fn name(&self) -> &str {
        "standard-api"
    }

    async fn execute(&self, _council: &str, plan: &DispatchPlan) -> Result<Vec<RawCollection>> {
        let (Some(target), Some(uprn)) = (plan.target_url.as_deref(), plan.uprn()) else {
            return Err(AppError::input(
                "The waste service API needs a URL and a UPRN",
                None,
            ));
        };
        let base = api_base(target)?;

        let body = self
            .get_text("Listing services", base.join("services")?, uprn)
            .await?;
        let services = parse_services(&body)?;
        log::debug!("{} services listed at {}", services.len(), base);

        let base = &base;
        let completed: Vec<Result<ServiceRecord>> = stream::iter(services)
            .map(|record| async move { self.complete(base, uprn, record).await })
            .buffered(DETAIL_CONCURRENCY)
            .collect()
            .await;

        let mut raw = Vec::new();
        for record in completed {
            raw.extend(record?.into_raw());
        }
        Ok(raw)
    }
}
