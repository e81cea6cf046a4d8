use ::duckdb::types::Value as DuckValue;
use serde::Serialize;

/// One persisted coin, keyed by its upstream identifier.
///
/// Every column except `coin_id` is nullable because the upstream listing
/// may omit any of them. Timestamps are RFC3339 UTC strings.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct CoinRow {
    pub coin_id: String,
    pub symbol: Option<String>,
    pub name: Option<String>,
    pub image: Option<String>,
    pub current_price: Option<f64>,
    pub market_cap: Option<i64>,
    pub market_cap_rank: Option<i64>,
    pub fully_diluted_valuation: Option<i64>,
    pub total_volume: Option<i64>,
    pub high_24h: Option<f64>,
    pub low_24h: Option<f64>,
    pub price_change_24h: Option<f64>,
    pub price_change_percentage_24h: Option<f64>,
    pub market_cap_change_24h: Option<i64>,
    pub market_cap_change_percentage_24h: Option<f64>,
    pub circulating_supply: Option<f64>,
    pub total_supply: Option<f64>,
    pub max_supply: Option<f64>,
    pub ath: Option<f64>,
    pub ath_change_percentage: Option<f64>,
    pub ath_date: Option<String>,
    pub atl: Option<f64>,
    pub atl_change_percentage: Option<f64>,
    pub atl_date: Option<String>,
    pub last_updated: Option<String>,
}

/// Mutable columns of the `coins` table. The identifier is never listed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CoinField {
    Symbol,
    Name,
    Image,
    CurrentPrice,
    MarketCap,
    MarketCapRank,
    FullyDilutedValuation,
    TotalVolume,
    High24h,
    Low24h,
    PriceChange24h,
    PriceChangePercentage24h,
    MarketCapChange24h,
    MarketCapChangePercentage24h,
    CirculatingSupply,
    TotalSupply,
    MaxSupply,
    Ath,
    AthChangePercentage,
    AthDate,
    Atl,
    AtlChangePercentage,
    AtlDate,
    LastUpdated,
}

impl CoinField {
    /// Column order used by every SELECT and INSERT in this crate, after `coin_id`.
    pub const ALL: [CoinField; 24] = [
        Self::Symbol,
        Self::Name,
        Self::Image,
        Self::CurrentPrice,
        Self::MarketCap,
        Self::MarketCapRank,
        Self::FullyDilutedValuation,
        Self::TotalVolume,
        Self::High24h,
        Self::Low24h,
        Self::PriceChange24h,
        Self::PriceChangePercentage24h,
        Self::MarketCapChange24h,
        Self::MarketCapChangePercentage24h,
        Self::CirculatingSupply,
        Self::TotalSupply,
        Self::MaxSupply,
        Self::Ath,
        Self::AthChangePercentage,
        Self::AthDate,
        Self::Atl,
        Self::AtlChangePercentage,
        Self::AtlDate,
        Self::LastUpdated,
    ];

    pub const fn column(self) -> &'static str {
        match self {
            Self::Symbol => "symbol",
            Self::Name => "name",
            Self::Image => "image",
            Self::CurrentPrice => "current_price",
            Self::MarketCap => "market_cap",
            Self::MarketCapRank => "market_cap_rank",
            Self::FullyDilutedValuation => "fully_diluted_valuation",
            Self::TotalVolume => "total_volume",
            Self::High24h => "high_24h",
            Self::Low24h => "low_24h",
            Self::PriceChange24h => "price_change_24h",
            Self::PriceChangePercentage24h => "price_change_percentage_24h",
            Self::MarketCapChange24h => "market_cap_change_24h",
            Self::MarketCapChangePercentage24h => "market_cap_change_percentage_24h",
            Self::CirculatingSupply => "circulating_supply",
            Self::TotalSupply => "total_supply",
            Self::MaxSupply => "max_supply",
            Self::Ath => "ath",
            Self::AthChangePercentage => "ath_change_percentage",
            Self::AthDate => "ath_date",
            Self::Atl => "atl",
            Self::AtlChangePercentage => "atl_change_percentage",
            Self::AtlDate => "atl_date",
            Self::LastUpdated => "last_updated",
        }
    }
}

impl CoinRow {
    /// An empty row holding only the identifier.
    pub fn new(coin_id: impl Into<String>) -> Self {
        Self {
            coin_id: coin_id.into(),
            ..Self::default()
        }
    }

    /// The value bound for `field` in INSERT and UPDATE statements.
    pub fn value(&self, field: CoinField) -> DuckValue {
        match field {
            CoinField::Symbol => text(&self.symbol),
            CoinField::Name => text(&self.name),
            CoinField::Image => text(&self.image),
            CoinField::CurrentPrice => double(self.current_price),
            CoinField::MarketCap => bigint(self.market_cap),
            CoinField::MarketCapRank => bigint(self.market_cap_rank),
            CoinField::FullyDilutedValuation => bigint(self.fully_diluted_valuation),
            CoinField::TotalVolume => bigint(self.total_volume),
            CoinField::High24h => double(self.high_24h),
            CoinField::Low24h => double(self.low_24h),
            CoinField::PriceChange24h => double(self.price_change_24h),
            CoinField::PriceChangePercentage24h => double(self.price_change_percentage_24h),
            CoinField::MarketCapChange24h => bigint(self.market_cap_change_24h),
            CoinField::MarketCapChangePercentage24h => {
                double(self.market_cap_change_percentage_24h)
            }
            CoinField::CirculatingSupply => double(self.circulating_supply),
            CoinField::TotalSupply => double(self.total_supply),
            CoinField::MaxSupply => double(self.max_supply),
            CoinField::Ath => double(self.ath),
            CoinField::AthChangePercentage => double(self.ath_change_percentage),
            CoinField::AthDate => text(&self.ath_date),
            CoinField::Atl => double(self.atl),
            CoinField::AtlChangePercentage => double(self.atl_change_percentage),
            CoinField::AtlDate => text(&self.atl_date),
            CoinField::LastUpdated => text(&self.last_updated),
        }
    }

    /// Decode a row selected as `coin_id` followed by [`CoinField::ALL`].
    pub(crate) fn from_row(row: &::duckdb::Row<'_>) -> Result<Self, ::duckdb::Error> {
        Ok(Self {
            coin_id: row.get(0)?,
            symbol: row.get(1)?,
            name: row.get(2)?,
            image: row.get(3)?,
            current_price: row.get(4)?,
            market_cap: row.get(5)?,
            market_cap_rank: row.get(6)?,
            fully_diluted_valuation: row.get(7)?,
            total_volume: row.get(8)?,
            high_24h: row.get(9)?,
            low_24h: row.get(10)?,
            price_change_24h: row.get(11)?,
            price_change_percentage_24h: row.get(12)?,
            market_cap_change_24h: row.get(13)?,
            market_cap_change_percentage_24h: row.get(14)?,
            circulating_supply: row.get(15)?,
            total_supply: row.get(16)?,
            max_supply: row.get(17)?,
            ath: row.get(18)?,
            ath_change_percentage: row.get(19)?,
            ath_date: row.get(20)?,
            atl: row.get(21)?,
            atl_change_percentage: row.get(22)?,
            atl_date: row.get(23)?,
            last_updated: row.get(24)?,
        })
    }
}

/// `coin_id, symbol, name, ...` in [`CoinField::ALL`] order.
pub(crate) fn select_columns() -> String {
    let mut columns = vec!["coin_id"];
    columns.extend(CoinField::ALL.iter().map(|field| field.column()));
    columns.join(", ")
}

fn text(value: &Option<String>) -> DuckValue {
    value.clone().map_or(DuckValue::Null, DuckValue::Text)
}

fn double(value: Option<f64>) -> DuckValue {
    value.map_or(DuckValue::Null, DuckValue::Double)
}

fn bigint(value: Option<i64>) -> DuckValue {
    value.map_or(DuckValue::Null, DuckValue::BigInt)
}

/// Outcome of one ingestion run as written to `ingest_log`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IngestRunEntry {
    pub run_id: String,
    pub status: RunStatus,
    pub attempts: u32,
    pub pages: u64,
    pub records: u64,
    pub created: u64,
    pub updated: u64,
    pub latency_ms: u64,
    pub error: Option<String>,
    /// Filled in when read back; ignored on insert.
    pub logged_at: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Ok,
    Failed,
}

impl RunStatus {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Ok => "ok",
            Self::Failed => "failed",
        }
    }

    pub(crate) fn parse(value: &str) -> Self {
        if value == "ok" {
            Self::Ok
        } else {
            Self::Failed
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn field_list_has_unique_columns_and_excludes_identifier() {
        let columns: HashSet<&str> = CoinField::ALL.iter().map(|f| f.column()).collect();
        assert_eq!(columns.len(), CoinField::ALL.len());
        assert!(!columns.contains("coin_id"));
    }

    #[test]
    fn absent_values_bind_as_null() {
        let row = CoinRow::new("bitcoin");
        assert_eq!(row.value(CoinField::CurrentPrice), DuckValue::Null);
        assert_eq!(row.value(CoinField::Symbol), DuckValue::Null);
    }
}
