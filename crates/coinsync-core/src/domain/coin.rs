use coinsync_warehouse::CoinRow;
use serde::{Deserialize, Deserializer, Serialize};

use crate::{UtcDateTime, ValidationError};

/// One element of the upstream `/coins/markets` listing.
///
/// Only `id` is required. Any other key may be missing or `null`, and both
/// decode to `None`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoinRecord {
    pub id: String,
    #[serde(default)]
    pub symbol: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub current_price: Option<f64>,
    #[serde(default, deserialize_with = "whole_number")]
    pub market_cap: Option<i64>,
    #[serde(default, deserialize_with = "whole_number")]
    pub market_cap_rank: Option<i64>,
    #[serde(default, deserialize_with = "whole_number")]
    pub fully_diluted_valuation: Option<i64>,
    #[serde(default, deserialize_with = "whole_number")]
    pub total_volume: Option<i64>,
    #[serde(default)]
    pub high_24h: Option<f64>,
    #[serde(default)]
    pub low_24h: Option<f64>,
    #[serde(default)]
    pub price_change_24h: Option<f64>,
    #[serde(default)]
    pub price_change_percentage_24h: Option<f64>,
    #[serde(default, deserialize_with = "whole_number")]
    pub market_cap_change_24h: Option<i64>,
    #[serde(default)]
    pub market_cap_change_percentage_24h: Option<f64>,
    #[serde(default)]
    pub circulating_supply: Option<f64>,
    #[serde(default)]
    pub total_supply: Option<f64>,
    #[serde(default)]
    pub max_supply: Option<f64>,
    #[serde(default)]
    pub ath: Option<f64>,
    #[serde(default)]
    pub ath_change_percentage: Option<f64>,
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub ath_date: Option<UtcDateTime>,
    #[serde(default)]
    pub atl: Option<f64>,
    #[serde(default)]
    pub atl_change_percentage: Option<f64>,
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub atl_date: Option<UtcDateTime>,
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub last_updated: Option<UtcDateTime>,
}

impl CoinRecord {
    /// A record carrying only its identifier.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            symbol: None,
            name: None,
            image: None,
            current_price: None,
            market_cap: None,
            market_cap_rank: None,
            fully_diluted_valuation: None,
            total_volume: None,
            high_24h: None,
            low_24h: None,
            price_change_24h: None,
            price_change_percentage_24h: None,
            market_cap_change_24h: None,
            market_cap_change_percentage_24h: None,
            circulating_supply: None,
            total_supply: None,
            max_supply: None,
            ath: None,
            ath_change_percentage: None,
            ath_date: None,
            atl: None,
            atl_change_percentage: None,
            atl_date: None,
            last_updated: None,
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.id.trim().is_empty() {
            return Err(ValidationError::EmptyCoinId);
        }
        Ok(())
    }

    /// Overwrite every mutable column of `row` with this record's values.
    /// Absent values become NULL; nothing is merged.
    pub fn apply_to(&self, row: &mut CoinRow) {
        row.symbol = self.symbol.clone();
        row.name = self.name.clone();
        row.image = self.image.clone();
        row.current_price = self.current_price;
        row.market_cap = self.market_cap;
        row.market_cap_rank = self.market_cap_rank;
        row.fully_diluted_valuation = self.fully_diluted_valuation;
        row.total_volume = self.total_volume;
        row.high_24h = self.high_24h;
        row.low_24h = self.low_24h;
        row.price_change_24h = self.price_change_24h;
        row.price_change_percentage_24h = self.price_change_percentage_24h;
        row.market_cap_change_24h = self.market_cap_change_24h;
        row.market_cap_change_percentage_24h = self.market_cap_change_percentage_24h;
        row.circulating_supply = self.circulating_supply;
        row.total_supply = self.total_supply;
        row.max_supply = self.max_supply;
        row.ath = self.ath;
        row.ath_change_percentage = self.ath_change_percentage;
        row.ath_date = self.ath_date.map(UtcDateTime::format_rfc3339);
        row.atl = self.atl;
        row.atl_change_percentage = self.atl_change_percentage;
        row.atl_date = self.atl_date.map(UtcDateTime::format_rfc3339);
        row.last_updated = self.last_updated.map(UtcDateTime::format_rfc3339);
    }

    pub fn to_row(&self) -> CoinRow {
        let mut row = CoinRow::new(self.id.clone());
        self.apply_to(&mut row);
        row
    }
}

/// JSON numbers the upstream sends as either integers or floats.
#[derive(Deserialize)]
#[serde(untagged)]
enum WholeNumber {
    Int(i64),
    Float(f64),
}

fn whole_number<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<WholeNumber>::deserialize(deserializer)?;
    Ok(value.map(|number| match number {
        WholeNumber::Int(value) => value,
        // `as` saturates at the i64 bounds
        WholeNumber::Float(value) => value.round() as i64,
    }))
}

fn lenient_timestamp<'de, D>(deserializer: D) -> Result<Option<UtcDateTime>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value.and_then(|raw| UtcDateTime::parse(&raw).ok()))
}
