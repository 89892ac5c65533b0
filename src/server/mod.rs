// src/server/mod.rs

//! HTTP front end.
//!
//! Routes:
//! - `POST /get_bins`       lookup, `{bins}` or the error envelope
//! - `GET  /get_councils`   `{councils}`
//! - `POST /get_addresses`  `{addresses}`
//! - `GET  /calendar.ics`   calendar feed attachment
//! - `GET  /health`

use std::sync::Arc;

use actix_web::http::StatusCode;
use actix_web::{App, HttpResponse, HttpServer, middleware, web};
use serde::{Deserialize, Serialize};
use tracing::{error, info, instrument};

use crate::error::{AppError, ErrorEnvelope};
use crate::models::{AddressCandidate, RawQuery};
use crate::pipeline::BinService;

#[derive(Debug, Deserialize)]
pub struct AddressRequest {
    pub postcode: String,

    #[serde(default, alias = "apiKey")]
    pub api_key: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CalendarQuery {
    /// UPRN or free-text address
    #[serde(alias = "uprn", alias = "address_data")]
    pub address: String,

    #[serde(alias = "module")]
    pub council: String,

    #[serde(default, alias = "apiKey")]
    pub api_key: Option<String>,
}

#[derive(Debug, Serialize)]
struct CouncilsResponse {
    councils: Vec<String>,
}

#[derive(Debug, Serialize)]
struct AddressesResponse {
    addresses: Vec<AddressCandidate>,
}

fn envelope_response(envelope: &ErrorEnvelope) -> HttpResponse {
    let status =
        StatusCode::from_u16(envelope.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    HttpResponse::build(status).json(envelope)
}

fn error_response(err: &AppError) -> HttpResponse {
    envelope_response(&ErrorEnvelope::from(err))
}

#[instrument(skip(service, payload), fields(council = %payload.council))]
async fn get_bins(service: web::Data<BinService>, payload: web::Json<RawQuery>) -> HttpResponse {
    match service.get_bins(&payload).await {
        Ok(response) => {
            info!("Returning {} collections", response.bins.len());
            HttpResponse::Ok().json(response)
        }
        Err(envelope) => {
            error!(kind = ?envelope.kind, "Lookup failed: {}", envelope.error);
            envelope_response(&envelope)
        }
    }
}

#[instrument(skip(service))]
async fn get_councils(service: web::Data<BinService>) -> HttpResponse {
    match service.councils() {
        Ok(councils) => HttpResponse::Ok().json(CouncilsResponse { councils }),
        Err(e) => {
            error!("Council listing failed: {}", e);
            error_response(&e)
        }
    }
}

#[instrument(skip(service, payload))]
async fn get_addresses(
    service: web::Data<BinService>,
    payload: web::Json<AddressRequest>,
) -> HttpResponse {
    match service
        .addresses(&payload.postcode, payload.api_key.as_deref())
        .await
    {
        Ok(addresses) => HttpResponse::Ok().json(AddressesResponse { addresses }),
        Err(e) => {
            error!("Address listing failed: {}", e);
            error_response(&e)
        }
    }
}

#[instrument(skip(service, query), fields(council = %query.council))]
async fn calendar(
    service: web::Data<BinService>,
    query: web::Query<CalendarQuery>,
) -> HttpResponse {
    let query = query.into_inner();
    let mut raw = RawQuery::new(query.address, query.council);
    raw.api_key = query.api_key;

    match service.calendar(&raw).await {
        Ok(ics) => HttpResponse::Ok()
            .content_type("text/calendar; charset=utf-8")
            .insert_header(("Content-Disposition", "attachment; filename=\"bins.ics\""))
            .body(ics),
        Err(e) => {
            error!("Calendar feed failed: {}", e);
            error_response(&e)
        }
    }
}

async fn health() -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({ "status": "ok" }))
}

/// Register every route.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/get_bins", web::post().to(get_bins))
        .route("/get_councils", web::get().to(get_councils))
        .route("/get_addresses", web::post().to(get_addresses))
        .route("/calendar.ics", web::get().to(calendar))
        .route("/health", web::get().to(health));
}

/// Serve until shutdown on the configured address.
pub async fn run(service: Arc<BinService>) -> std::io::Result<()> {
    let bind = (
        service.config().server.bind.clone(),
        service.config().server.port,
    );
    info!("Listening on {}:{}", bind.0, bind.1);

    let data = web::Data::from(service);
    HttpServer::new(move || {
        App::new()
            .app_data(data.clone())
            .wrap(middleware::Logger::default())
            .configure(configure)
    })
    .bind(bind)?
    .run()
    .await
}
