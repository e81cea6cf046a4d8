//! CoinGecko `/coins/markets` client.
//!
//! [`CoinGeckoClient::fetch_page`] fetches a single page and absorbs upstream
//! rate limiting by cooling down and asking for the same page again.
//! [`MarketPages`] turns consecutive pages into one forward-only record
//! sequence that ends at the first empty page.

use std::collections::VecDeque;
use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, warn};

use crate::config::ClientConfig;
use crate::domain::CoinRecord;
use crate::http_client::{HttpClient, HttpError, HttpRequest, HttpResponse, ReqwestHttpClient};
use crate::source::SourceError;
use crate::ValidationError;

const RATE_LIMIT_STATUS: u16 = 429;
const API_KEY_HEADER: &str = "x-cg-demo-api-key";

#[derive(Clone)]
pub struct CoinGeckoClient {
    http: Arc<dyn HttpClient>,
    config: ClientConfig,
}

impl std::fmt::Debug for CoinGeckoClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CoinGeckoClient")
            .field("base_url", &self.config.base_url)
            .field("vs_currency", &self.config.vs_currency)
            .field("per_page", &self.config.per_page)
            .finish_non_exhaustive()
    }
}

enum PageBody {
    RateLimited,
    Records(Vec<CoinRecord>),
}

impl CoinGeckoClient {
    /// Create a client on the reqwest transport.
    ///
    /// # Errors
    /// Returns [`ValidationError::InvalidPageSize`] if `config.per_page` is
    /// outside 1-250.
    pub fn new(config: ClientConfig) -> Result<Self, ValidationError> {
        Self::with_http_client(config, Arc::new(ReqwestHttpClient::new()))
    }

    /// Create a client on a caller-supplied transport.
    ///
    /// # Arguments
    /// * `config` - Endpoint, currency, page size and pacing
    /// * `http` - Transport every page request goes through
    ///
    /// # Errors
    /// Returns [`ValidationError::InvalidPageSize`] if `config.per_page` is
    /// outside 1-250.
    pub fn with_http_client(
        config: ClientConfig,
        http: Arc<dyn HttpClient>,
    ) -> Result<Self, ValidationError> {
        config.validate()?;
        Ok(Self { http, config })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn page_url(&self, page: u32) -> String {
        format!(
            "{}/coins/markets?vs_currency={}&order=market_cap_desc&per_page={}&page={}&sparkline=false",
            self.config.base_url.trim_end_matches('/'),
            urlencoding::encode(&self.config.vs_currency),
            self.config.per_page,
            page,
        )
    }

    fn page_request(&self, page: u32) -> HttpRequest {
        let mut request = HttpRequest::get(self.page_url(page));
        if let Some(api_key) = &self.config.api_key {
            request = request.with_header(API_KEY_HEADER, api_key.as_str());
        }
        if let Some(timeout) = self.config.request_timeout {
            request = request.with_timeout(timeout);
        }
        request
    }

    /// Fetch one page of market records.
    ///
    /// Rate-limit responses never surface as errors: the client sleeps for
    /// the configured cool-down and re-requests the same page until it gets
    /// a real answer. An empty vector means there are no more pages.
    pub async fn fetch_page(&self, page: u32) -> Result<Vec<CoinRecord>, SourceError> {
        let request = self.page_request(page);

        loop {
            let response = self
                .http
                .execute(request.clone())
                .await
                .map_err(|error| transport_error(page, &error))?;

            match decode_page(page, &response)? {
                PageBody::RateLimited => {
                    warn!(
                        page,
                        cooldown_secs = self.config.rate_limit_cooldown.as_secs_f64(),
                        "upstream rate limit hit, cooling down before retrying page"
                    );
                    tokio::time::sleep(self.config.rate_limit_cooldown).await;
                }
                PageBody::Records(records) => {
                    debug!(page, records = records.len(), "fetched market page");
                    if !records.is_empty() {
                        tokio::time::sleep(self.config.politeness_delay).await;
                    }
                    return Ok(records);
                }
            }
        }
    }

    /// The record sequence starting at page 1.
    pub fn pages(&self) -> MarketPages<'_> {
        MarketPages {
            client: self,
            next_page: 1,
            buffer: VecDeque::new(),
            pages_fetched: 0,
            finished: false,
        }
    }
}

fn transport_error(page: u32, error: &HttpError) -> SourceError {
    if error.is_timeout() {
        return SourceError::unavailable(format!("page {page} timed out: {}", error.message()));
    }
    SourceError::unavailable(format!("page {page}: {}", error.message()))
}

fn is_rate_limit_payload(value: &Value) -> bool {
    value
        .get("status")
        .and_then(|status| status.get("error_code"))
        .and_then(Value::as_u64)
        == Some(u64::from(RATE_LIMIT_STATUS))
}

fn decode_page(page: u32, response: &HttpResponse) -> Result<PageBody, SourceError> {
    let payload = serde_json::from_str::<Value>(&response.body);

    if response.status == RATE_LIMIT_STATUS
        || payload.as_ref().is_ok_and(is_rate_limit_payload)
    {
        return Ok(PageBody::RateLimited);
    }

    if !response.is_success() {
        return Err(SourceError::unavailable(format!(
            "page {page}: upstream returned HTTP {}",
            response.status
        )));
    }

    let payload = payload.map_err(|error| {
        SourceError::invalid_response(format!("page {page}: body is not JSON: {error}"))
    })?;
    let records = serde_json::from_value::<Vec<CoinRecord>>(payload).map_err(|error| {
        SourceError::invalid_response(format!("page {page}: unexpected payload: {error}"))
    })?;

    for record in &records {
        record.validate().map_err(|error| {
            SourceError::invalid_response(format!("page {page}: {error}"))
        })?;
    }

    Ok(PageBody::Records(records))
}

/// Forward-only sequence over every record of every page.
///
/// Pages are fetched lazily, one at a time, as the buffer drains. Once an
/// empty page is seen the sequence is finished for good. After an error the
/// sequence should be dropped; a new run starts again from page 1.
#[derive(Debug)]
pub struct MarketPages<'a> {
    client: &'a CoinGeckoClient,
    next_page: u32,
    buffer: VecDeque<CoinRecord>,
    pages_fetched: u32,
    finished: bool,
}

impl MarketPages<'_> {
    pub async fn next_record(&mut self) -> Result<Option<CoinRecord>, SourceError> {
        loop {
            if let Some(record) = self.buffer.pop_front() {
                return Ok(Some(record));
            }
            if self.finished {
                return Ok(None);
            }

            let records = self.client.fetch_page(self.next_page).await?;
            if records.is_empty() {
                debug!(page = self.next_page, "empty page, end of market data");
                self.finished = true;
                continue;
            }

            self.pages_fetched += 1;
            self.next_page += 1;
            self.buffer.extend(records);
        }
    }

    /// Number of non-empty pages fetched so far.
    pub fn pages_fetched(&self) -> u32 {
        self.pages_fetched
    }

    pub fn is_finished(&self) -> bool {
        self.finished && self.buffer.is_empty()
    }
}
