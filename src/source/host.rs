//! Host PMS API client.

use async_trait::async_trait;
use chrono::{Duration, NaiveDate};
use reqwest::Client;
use serde_json::{Map, Value};

use crate::error::{AppError, Result};
use crate::models::{DataKind, HotelRef, RawPayload, SourceConfig, SyncWindow};
use crate::source::SourceAdapter;
use crate::transform::ROOM_SALES_GROUP;
use crate::utils::http::{StatusClass, body_excerpt, classify_status, create_client};
use crate::utils::join_url;

const SUBSCRIPTION_HEADER: &str = "Ocp-Apim-Subscription-Key";

const CONFIG_PATH: &str = "/ExternalRms/Config";
const RESERVATION_PATH: &str = "/ExternalRms/Reservation";
const INVENTORY_PATH: &str = "/Pms/InventoryGrid";
const REVENUE_PATH: &str = "/ExternalRms/Revenue";
const STAT_DAILY_PATH: &str = "/ExternalRms/StatDaily";

/// List field of the paginated reservation endpoint.
const RESERVATION_LIST: &str = "Reservations";

/// Field on the first row carrying the total row count.
const TOTAL_ROWS: &str = "TotalRows";

/// Upper bound on pages per fetch, against a server that never stops paging.
const MAX_PAGES: u32 = 10_000;

/// Client for the Host PMS REST API.
pub struct HostApiClient {
    client: Client,
    base_url: String,
    subscription_key: String,
    page_size: u32,
    inventory_horizon_days: u32,
    stat_daily_days_back_start: u32,
    stat_daily_days_back_end: u32,
}

impl HostApiClient {
    pub fn new(config: &SourceConfig) -> Result<Self> {
        Ok(Self {
            client: create_client(&config.user_agent, config.timeout_secs)?,
            base_url: config.base_url.clone(),
            subscription_key: config.subscription_key.clone(),
            page_size: config.page_size.max(1),
            inventory_horizon_days: config.inventory_horizon_days,
            stat_daily_days_back_start: config.stat_daily_days_back_start,
            stat_daily_days_back_end: config.stat_daily_days_back_end,
        })
    }

    /// GET a JSON document, classifying failures for the retry policy.
    async fn get_json(&self, context: &str, path: &str, query: &[(&str, String)]) -> Result<Value> {
        let url = join_url(&self.base_url, path)?;
        log::debug!("GET {} {:?}", url, query);

        let response = self
            .client
            .get(url)
            .header(SUBSCRIPTION_HEADER, &self.subscription_key)
            .query(query)
            .send()
            .await
            .map_err(|e| AppError::transient_source(context, e))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| AppError::transient_source(context, e))?;

        match classify_status(status) {
            StatusClass::Success => serde_json::from_str(&body).map_err(|e| {
                AppError::permanent_source(context, format!("undecodable body: {e}"))
            }),
            StatusClass::Transient => Err(AppError::transient_source(
                context,
                format!("HTTP {}: {}", status, body_excerpt(&body)),
            )),
            StatusClass::Unauthorized | StatusClass::Rejected => Err(AppError::permanent_source(
                context,
                format!("HTTP {}: {}", status, body_excerpt(&body)),
            )),
        }
    }

    /// Walk `start`/`limit` pages and return the first page with its list
    /// replaced by every row collected.
    ///
    /// Stops at the `TotalRows` reported on the first row, or at the first
    /// short page when the API does not report a total.
    async fn get_paged(
        &self,
        context: &str,
        path: &str,
        list_field: &str,
        query: Vec<(&str, String)>,
    ) -> Result<Value> {
        let limit = self.page_size as usize;
        let mut envelope = Map::new();
        let mut rows: Vec<Value> = Vec::new();
        let mut total: Option<usize> = None;

        for page in 0..MAX_PAGES {
            let mut page_query = query.clone();
            page_query.push(("start", rows.len().to_string()));
            page_query.push(("limit", limit.to_string()));

            let body = self.get_json(context, path, &page_query).await?;
            let (page_envelope, page_rows) = split_page(context, body, list_field)?;

            if page == 0 {
                total = total_rows(&page_rows);
                envelope = page_envelope;
            }

            let received = page_rows.len();
            rows.extend(page_rows);

            if is_last_page(total, rows.len(), received, limit) {
                log::debug!("{}: {} rows in {} pages", context, rows.len(), page + 1);
                envelope.insert(list_field.to_string(), Value::Array(rows));
                return Ok(Value::Object(envelope));
            }
        }

        Err(AppError::permanent_source(
            context,
            format!("pagination did not finish after {MAX_PAGES} pages"),
        ))
    }

    /// One StatDaily request per hotel day, rows concatenated in date order.
    async fn get_stat_daily(
        &self,
        context: &str,
        hotel_code: &str,
        days: impl Iterator<Item = NaiveDate>,
    ) -> Result<Value> {
        let mut rows: Vec<Value> = Vec::new();
        for day in days {
            let query = [
                ("hotelCode", hotel_code.to_string()),
                ("hoteldatefilter", day.to_string()),
            ];
            match self.get_json(context, STAT_DAILY_PATH, &query).await? {
                Value::Array(day_rows) => rows.extend(day_rows),
                Value::Null => {}
                _ => {
                    return Err(AppError::permanent_source(
                        context,
                        format!("StatDaily for {day} is not a list"),
                    ));
                }
            }
        }
        Ok(Value::Array(rows))
    }
}

/// Split one page into its other top-level fields and its list.
/// A missing or null list is an empty page.
fn split_page(
    context: &str,
    body: Value,
    list_field: &str,
) -> Result<(Map<String, Value>, Vec<Value>)> {
    match body {
        Value::Object(mut map) => match map.remove(list_field) {
            Some(Value::Array(items)) => Ok((map, items)),
            Some(Value::Null) | None => Ok((map, Vec::new())),
            Some(_) => Err(AppError::permanent_source(
                context,
                format!("'{list_field}' is not a list"),
            )),
        },
        _ => Err(AppError::permanent_source(context, "page body is not an object")),
    }
}

fn total_rows(first_page: &[Value]) -> Option<usize> {
    first_page
        .first()
        .and_then(|row| row.get(TOTAL_ROWS))
        .and_then(Value::as_u64)
        .map(|n| n as usize)
}

fn is_last_page(total: Option<usize>, collected: usize, received: usize, limit: usize) -> bool {
    match total {
        Some(total) => collected >= total || received == 0,
        None => received < limit,
    }
}

/// Hotel days from `back_start` to `back_end` days before `run_date`, inclusive.
fn stat_daily_days(
    run_date: NaiveDate,
    back_start: u32,
    back_end: u32,
) -> impl Iterator<Item = NaiveDate> {
    let first = run_date - Duration::days(i64::from(back_start));
    let last = run_date - Duration::days(i64::from(back_end));
    first.iter_days().take_while(move |day| *day <= last)
}

#[async_trait]
impl SourceAdapter for HostApiClient {
    async fn fetch(
        &self,
        kind: DataKind,
        hotel: &HotelRef,
        window: &SyncWindow,
    ) -> Result<RawPayload> {
        let context = format!("{}/{}", hotel.key, kind);
        let hotel_code = ("hotelCode", hotel.source_code.clone());

        let body = match kind {
            DataKind::Config => self.get_json(&context, CONFIG_PATH, &[hotel_code]).await?,
            DataKind::Reservations => {
                let query = vec![hotel_code, ("updateFrom", window.update_from())];
                self.get_paged(&context, RESERVATION_PATH, RESERVATION_LIST, query)
                    .await?
            }
            DataKind::Inventory => {
                let start = window.to.date_naive();
                let end = start + Duration::days(i64::from(self.inventory_horizon_days));
                let query = [
                    hotel_code,
                    ("startDate", start.to_string()),
                    ("endDate", end.to_string()),
                ];
                self.get_json(&context, INVENTORY_PATH, &query).await?
            }
            DataKind::Revenue => {
                let query = [
                    hotel_code,
                    ("salesGroup", ROOM_SALES_GROUP.to_string()),
                    ("updateFrom", window.update_from()),
                ];
                self.get_json(&context, REVENUE_PATH, &query).await?
            }
            DataKind::StatDaily => {
                let days = stat_daily_days(
                    window.to.date_naive(),
                    self.stat_daily_days_back_start,
                    self.stat_daily_days_back_end,
                );
                self.get_stat_daily(&context, &hotel.source_code, days)
                    .await?
            }
        };

        log::info!("[{}] Fetched {}", hotel.key, kind);
        Ok(RawPayload::new(kind, &hotel.key, *window, body))
    }
}
