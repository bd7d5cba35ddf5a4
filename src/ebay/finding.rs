use crate::config::{DEFAULT_COMPS_WINDOW_DAYS, FindingConfig};
use crate::http::build_client;
use crate::metrics::UpstreamTimer;
use crate::models::{CompsSummary, amount_from_value, round_cents};
use chrono::{Duration, SecondsFormat, Utc};
use reqwest::Client;
use rust_decimal::Decimal;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};

/// Quick-sale target as a share of the comparable average.
const QUICK_SALE_RATIO: Decimal = Decimal::from_parts(9, 0, 0, false, 1);
/// Lowest quick-sale price ever suggested.
const QUICK_SALE_FLOOR: Decimal = Decimal::from_parts(500, 0, 0, false, 2);

#[derive(Debug, Error)]
pub enum FindingError {
    #[error("Missing EBAY_APP_ID")]
    MissingAppId,
    #[error("request failed: {0}")]
    Request(String),
    #[error("search rejected: {0}")]
    Rejected(String),
    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

/// eBay Finding API client for sold-item comparables.
pub struct FindingClient {
    http: Client,
    config: FindingConfig,
}

impl FindingClient {
    pub fn new(config: FindingConfig) -> Self {
        Self {
            http: build_client(),
            config,
        }
    }

    pub async fn find_comps(&self, title: &str) -> Result<CompsSummary, FindingError> {
        let app_id = self
            .config
            .app_id
            .as_deref()
            .ok_or(FindingError::MissingAppId)?;

        let params = search_params(&self.config, app_id, title);
        let timer = UpstreamTimer::start("ebay_finding");
        let response = self
            .http
            .get(&self.config.endpoint)
            .query(&params)
            .send()
            .await
            .map_err(|err| FindingError::Request(err.to_string()))?;
        let status = response.status();
        timer.finish(status.is_success());
        if !status.is_success() {
            return Err(FindingError::Request(format!("HTTP {status}")));
        }

        let payload: Value = response
            .json()
            .await
            .map_err(|err| FindingError::InvalidResponse(err.to_string()))?;
        if let Some(message) = rejection_message(&payload) {
            return Err(FindingError::Rejected(message));
        }

        let prices = extract_prices(&payload);
        debug!(target = "crosslist.ebay", title, prices = prices.len(), "comps_fetched");
        Ok(summarize(&prices))
    }
}

fn search_params(config: &FindingConfig, app_id: &str, title: &str) -> Vec<(&'static str, String)> {
    let to = Utc::now();
    let window = Duration::try_days(config.window_days)
        .unwrap_or_else(|| Duration::days(DEFAULT_COMPS_WINDOW_DAYS));
    let from = to.checked_sub_signed(window).unwrap_or(to);
    vec![
        ("OPERATION-NAME", "findCompletedItems".into()),
        ("SERVICE-VERSION", "1.13.0".into()),
        ("SECURITY-APPNAME", app_id.to_string()),
        ("RESPONSE-DATA-FORMAT", "JSON".into()),
        ("REST-PAYLOAD", "true".into()),
        ("keywords", title.to_string()),
        ("itemFilter(0).name", "SoldItemsOnly".into()),
        ("itemFilter(0).value", "true".into()),
        ("itemFilter(1).name", "EndTimeFrom".into()),
        (
            "itemFilter(1).value",
            from.to_rfc3339_opts(SecondsFormat::Millis, true),
        ),
        ("itemFilter(2).name", "EndTimeTo".into()),
        (
            "itemFilter(2).value",
            to.to_rfc3339_opts(SecondsFormat::Millis, true),
        ),
        (
            "paginationInput.entriesPerPage",
            config.entries_per_page.to_string(),
        ),
    ]
}

fn rejection_message(payload: &Value) -> Option<String> {
    let response = payload.pointer("/findCompletedItemsResponse/0")?;
    let ack = response.pointer("/ack/0").and_then(Value::as_str)?;
    if !ack.eq_ignore_ascii_case("failure") {
        return None;
    }
    let message = response
        .pointer("/errorMessage/0/error/0/message/0")
        .and_then(Value::as_str)
        .unwrap_or("ack=Failure");
    Some(message.to_string())
}

/// Positive, numeric selling prices from a `findCompletedItems` response.
pub fn extract_prices(payload: &Value) -> Vec<Decimal> {
    payload
        .pointer("/findCompletedItemsResponse/0/searchResult/0/item")
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(|item| item.pointer("/sellingStatus/0/currentPrice/0/__value__"))
                .filter_map(amount_from_value)
                .filter(|price| *price > Decimal::ZERO)
                .collect()
        })
        .unwrap_or_default()
}

/// `quickSale = max(5.00, round(average * 0.9, 2))`; no prices gives
/// [`CompsSummary::Empty`].
pub fn summarize(prices: &[Decimal]) -> CompsSummary {
    if prices.is_empty() {
        return CompsSummary::Empty;
    }
    let Some(total) = prices
        .iter()
        .try_fold(Decimal::ZERO, |acc, price| acc.checked_add(*price))
    else {
        warn!(target = "crosslist.ebay", count = prices.len(), "comps_total_overflow");
        return CompsSummary::Empty;
    };
    let average = total / Decimal::from(prices.len());
    let quick_sale = round_cents(average * QUICK_SALE_RATIO).max(QUICK_SALE_FLOOR);
    CompsSummary::Found {
        average: round_cents(average),
        quick_sale,
        count: prices.len(),
    }
}
