// src/adapters/wiltshire.rs

//! Native client for Wiltshire's waste collection calendar.

use std::sync::LazyLock;

use async_trait::async_trait;
use chrono::{Datelike, NaiveDate, NaiveDateTime, Utc};
use reqwest::Client;
use reqwest::header::{ORIGIN, REFERER};
use scraper::{ElementRef, Html, Selector};

use super::SourceAdapter;
use crate::error::{AppError, Result};
use crate::models::{DATE_FORMAT, DispatchPlan, RawCollection};

const CALENDAR_URL: &str =
    "https://ilambassadorformsprod.azurewebsites.net/wastecollectiondays/wastecollectioncalendar";
const CALENDAR_ORIGIN: &str = "https://ilambassadorformsprod.azurewebsites.net";
const CALENDAR_REFERER: &str =
    "https://ilambassadorformsprod.azurewebsites.net/wastecollectiondays/index";

/// Months fetched per lookup, starting with the current one.
const WINDOW_MONTHS: u32 = 12;

static CELL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("div.cal-inner").expect("cell selector is valid"));
static EVENTS: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("div.events-list").expect("events selector is valid"));
static DAY: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("span.day-no").expect("day selector is valid"));
static LABEL: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse(".rc-event-container span").expect("label selector is valid")
});

/// `(month, year)` pairs for `count` consecutive months from `start`.
pub fn rolling_months(start: NaiveDate, count: u32) -> Vec<(u32, i32)> {
    let first = start.month0();
    (0..count)
        .map(|i| {
            let offset = first + i;
            (offset % 12 + 1, start.year() + (offset / 12) as i32)
        })
        .collect()
}

/// Extract collections from one month of the calendar.
///
/// Cells without an event, a readable date or a label are skipped.
/// Labels naming several bins ("Household waste and Recycling") yield one
/// entry per bin.
pub fn parse_calendar_page(body: &str) -> Vec<RawCollection> {
    let document = Html::parse_document(body);
    document
        .select(&CELL)
        .filter(|cell| cell.select(&EVENTS).next().is_some())
        .filter_map(|cell| parse_cell(&cell))
        .flatten()
        .collect()
}

fn parse_cell(cell: &ElementRef<'_>) -> Option<Vec<RawCollection>> {
    let stamp = cell.select(&DAY).next()?.value().attr("data-cal-date")?;
    let date = NaiveDateTime::parse_from_str(stamp.trim(), "%Y-%m-%dT%H:%M:%S")
        .ok()?
        .format(DATE_FORMAT)
        .to_string();
    let label = cell.select(&LABEL).next()?.text().collect::<String>();

    Some(
        label
            .trim()
            .split(" and ")
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(|t| RawCollection::new(t, date.clone()))
            .collect(),
    )
}

pub struct WiltshireAdapter {
    client: Client,
    endpoint: String,
}

impl WiltshireAdapter {
    pub fn new(client: Client) -> Self {
        Self {
            client,
            endpoint: CALENDAR_URL.to_string(),
        }
    }

    /// Post month requests to another calendar endpoint.
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    async fn fetch_month(&self, month: u32, year: i32, postcode: &str, uprn: &str) -> Result<String> {
        let context = format!("Calendar {month}/{year}");
        let form = [
            ("Month", month.to_string()),
            ("Year", year.to_string()),
            ("Postcode", postcode.to_string()),
            ("Uprn", uprn.to_string()),
        ];
        let response = self
            .client
            .post(&self.endpoint)
            .header("X-Requested-With", "XMLHttpRequest")
            .header(ORIGIN, CALENDAR_ORIGIN)
            .header(REFERER, CALENDAR_REFERER)
            .form(&form)
            .send()
            .await
            .map_err(|e| AppError::adapter(context.as_str(), e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::status(context, status));
        }
        response
            .text()
            .await
            .map_err(|e| AppError::adapter(context, e))
    }
}

#[async_trait]
impl SourceAdapter for WiltshireAdapter {
    fn name(&self) -> &str {
        "wiltshire"
    }

    async fn execute(&self, _council: &str, plan: &DispatchPlan) -> Result<Vec<RawCollection>> {
        let (uprn, postcode) = match (plan.uprn(), plan.postcode()) {
            (Some(uprn), Some(postcode)) => (uprn, postcode),
            (None, Some(postcode)) if plan.house().is_some() => {
                return Err(AppError::not_found(format!(
                    "no UPRN matched this house at {postcode}"
                )));
            }
            _ => {
                return Err(AppError::input(
                    "Wiltshire Council needs both a UPRN and a postcode",
                    Some("Enter your house number and postcode, e.g. '10 SN8 1RA'."),
                ));
            }
        };
        let uprn = format!("{:0>12}", uprn.trim());

        let mut bins: Vec<RawCollection> = Vec::new();
        for (month, year) in rolling_months(Utc::now().date_naive(), WINDOW_MONTHS) {
            let body = self.fetch_month(month, year, postcode, &uprn).await?;
            for entry in parse_calendar_page(&body) {
                if !bins.contains(&entry) {
                    bins.push(entry);
                }
            }
        }

        log::debug!("Wiltshire calendar returned {} entries", bins.len());
        Ok(bins)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Mutex;

    use actix_web::{App, HttpRequest, HttpResponse, HttpServer, web};

    use super::*;
    use crate::error::ErrorKind;
    use crate::models::{Flag, Strategy};

    const MONTH_PAGE: &str = r#"
        <div class="calendar">
          <div class="cal-inner">
            <span class="day-no" data-cal-date="2025-06-11T00:00:00">11</span>
          </div>
          <div class="cal-inner">
            <span class="day-no" data-cal-date="2025-06-12T00:00:00">12</span>
            <div class="events-list">
              <div class="rc-event-container"><span> Household waste and Mixed dry recycling </span></div>
            </div>
          </div>
          <div class="cal-inner">
            <span class="day-no" data-cal-date="not-a-date">13</span>
            <div class="events-list">
              <div class="rc-event-container"><span>Garden waste</span></div>
            </div>
          </div>
          <div class="cal-inner">
            <span class="day-no">14</span>
            <div class="events-list">
              <div class="rc-event-container"><span>Glass</span></div>
            </div>
          </div>
          <div class="cal-inner">
            <span class="day-no" data-cal-date="2025-06-19T00:00:00">19</span>
            <div class="events-list">
              <div class="rc-event-container"><span>Garden waste</span></div>
            </div>
          </div>
        </div>
    "#;

    #[test]
    fn test_parse_calendar_page() {
        assert_eq!(
            parse_calendar_page(MONTH_PAGE),
            vec![
                RawCollection::new("Household waste", "12/06/2025"),
                RawCollection::new("Mixed dry recycling", "12/06/2025"),
                RawCollection::new("Garden waste", "19/06/2025"),
            ]
        );
    }

    #[test]
    fn test_parse_calendar_page_empty() {
        assert!(parse_calendar_page("<html><body>No calendar</body></html>").is_empty());
    }

    #[test]
    fn test_rolling_months_wraps_year() {
        let start = NaiveDate::from_ymd_opt(2025, 6, 15).unwrap();
        let months = rolling_months(start, 12);
        assert_eq!(months.len(), 12);
        assert_eq!(months[0], (6, 2025));
        assert_eq!(months[6], (12, 2025));
        assert_eq!(months[7], (1, 2026));
        assert_eq!(months[11], (5, 2026));
    }

    #[test]
    fn test_rolling_months_from_january() {
        let start = NaiveDate::from_ymd_opt(2026, 1, 1).unwrap();
        assert_eq!(rolling_months(start, 12).last(), Some(&(12, 2026)));
    }

    #[tokio::test]
    async fn test_missing_postcode_is_input_error() {
        let adapter = WiltshireAdapter::new(Client::new());
        let plan = DispatchPlan::new(Strategy::GenericAdapter).arg(Flag::Uprn, "100120992798");
        let err = adapter.execute("WiltshireCouncil", &plan).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InputError);
    }

    #[tokio::test]
    async fn test_postcode_and_house_without_uprn_is_not_found() {
        let adapter = WiltshireAdapter::new(Client::new());
        let plan = DispatchPlan::new(Strategy::GenericAdapter)
            .arg(Flag::Postcode, "SN8 1RA")
            .arg(Flag::House, "Rose Cottage");
        let err = adapter.execute("WiltshireCouncil", &plan).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFoundError);
    }

    /// Calendar stand-in that serves the same month for every request.
    struct Calendar {
        fail_on: Option<usize>,
        forms: Mutex<Vec<HashMap<String, String>>>,
    }

    async fn calendar_month(
        req: HttpRequest,
        form: web::Form<HashMap<String, String>>,
        state: web::Data<Calendar>,
    ) -> HttpResponse {
        let mut form = form.into_inner();
        if let Some(value) = req.headers().get("X-Requested-With") {
            form.insert("x-requested-with".into(), value.to_str().unwrap_or("").into());
        }

        let mut forms = state.forms.lock().unwrap();
        forms.push(form);
        if state.fail_on == Some(forms.len()) {
            return HttpResponse::InternalServerError().finish();
        }
        HttpResponse::Ok().content_type("text/html").body(MONTH_PAGE)
    }

    fn serve(fail_on: Option<usize>) -> (String, web::Data<Calendar>) {
        let state = web::Data::new(Calendar {
            fail_on,
            forms: Mutex::new(Vec::new()),
        });
        let data = state.clone();
        let server = HttpServer::new(move || {
            App::new()
                .app_data(data.clone())
                .route("/calendar", web::post().to(calendar_month))
        })
        .workers(1)
        .bind(("127.0.0.1", 0))
        .unwrap();
        let addr = server.addrs()[0];
        actix_web::rt::spawn(server.run());
        (format!("http://{addr}/calendar"), state)
    }

    fn plan() -> DispatchPlan {
        DispatchPlan::new(Strategy::GenericAdapter)
            .arg(Flag::Uprn, "12345678")
            .arg(Flag::Postcode, "SN8 1RA")
    }

    #[actix_web::test]
    async fn test_execute_walks_every_month_and_dedupes() {
        let (endpoint, state) = serve(None);
        let adapter = WiltshireAdapter::new(Client::new()).with_endpoint(endpoint);

        let bins = adapter.execute("WiltshireCouncil", &plan()).await.unwrap();
        assert_eq!(bins, parse_calendar_page(MONTH_PAGE));

        let forms = state.forms.lock().unwrap();
        assert_eq!(forms.len(), WINDOW_MONTHS as usize);

        let today = Utc::now().date_naive();
        assert_eq!(forms[0]["Month"], today.month().to_string());
        assert_eq!(forms[0]["Year"], today.year().to_string());
        assert_eq!(forms[0]["Uprn"], "000012345678");
        assert_eq!(forms[0]["Postcode"], "SN8 1RA");
        assert_eq!(forms[0]["x-requested-with"], "XMLHttpRequest");
    }

    #[actix_web::test]
    async fn test_execute_stops_at_first_failed_month() {
        let (endpoint, state) = serve(Some(3));
        let adapter = WiltshireAdapter::new(Client::new()).with_endpoint(endpoint);

        let err = adapter.execute("WiltshireCouncil", &plan()).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::AdapterExecutionError);
        assert!(err.to_string().starts_with("Calendar "));
        assert!(err.to_string().ends_with("returned HTTP 500"));
        assert_eq!(state.forms.lock().unwrap().len(), 3);
    }
}
