use std::time::Duration;

use crate::ValidationError;

pub const DEFAULT_BASE_URL: &str = "https://api.coingecko.com/api/v3";
pub const DEFAULT_VS_CURRENCY: &str = "usd";
pub const DEFAULT_PER_PAGE: u32 = 50;
/// Upper bound the markets endpoint accepts for `per_page`.
pub const MAX_PER_PAGE: u32 = 250;

pub const BASE_URL_ENV: &str = "COINSYNC_API_BASE_URL";
pub const VS_CURRENCY_ENV: &str = "COINSYNC_VS_CURRENCY";
pub const API_KEY_ENV: &str = "COINSYNC_COINGECKO_API_KEY";

/// Settings for [`crate::CoinGeckoClient`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub base_url: String,
    pub vs_currency: String,
    pub per_page: u32,
    /// Pause before re-requesting a rate-limited page.
    pub rate_limit_cooldown: Duration,
    /// Pause after every successful non-empty page.
    pub politeness_delay: Duration,
    pub request_timeout: Option<Duration>,
    pub api_key: Option<String>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_owned(),
            vs_currency: DEFAULT_VS_CURRENCY.to_owned(),
            per_page: DEFAULT_PER_PAGE,
            rate_limit_cooldown: Duration::from_secs(60),
            politeness_delay: Duration::from_secs(1),
            request_timeout: None,
            api_key: None,
        }
    }
}

impl ClientConfig {
    /// Defaults overridden by any non-empty `COINSYNC_*` variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let read = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_owned())
                .filter(|value| !value.is_empty())
        };

        let mut config = Self::default();
        if let Some(base_url) = read(BASE_URL_ENV) {
            config.base_url = base_url.trim_end_matches('/').to_owned();
        }
        if let Some(vs_currency) = read(VS_CURRENCY_ENV) {
            config.vs_currency = vs_currency.to_ascii_lowercase();
        }
        config.api_key = read(API_KEY_ENV);
        config
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.per_page == 0 || self.per_page > MAX_PER_PAGE {
            return Err(ValidationError::InvalidPageSize {
                value: self.per_page,
                max: MAX_PER_PAGE,
            });
        }
        Ok(())
    }
}
