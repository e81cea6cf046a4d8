use coinsync_core::{format_currency, CoinRow, CurrencyFormat, Warehouse};

use crate::cli::CoinsArgs;
use crate::error::CliError;

use super::{CommandResult, Table};

pub const LISTING_COLUMNS: [&str; 7] = [
    "Name",
    "Symbol",
    "Rank",
    "Current price",
    "Price change",
    "Market cap",
    "Total supply",
];

pub fn run(args: &CoinsArgs, warehouse: &Warehouse) -> Result<CommandResult, CliError> {
    let format = args.currency.format();
    let coins = warehouse.list_coins(args.limit)?;

    let table = listing(&coins, &format);
    Ok(CommandResult::ok(serde_json::to_value(&coins)?).with_table(table))
}

/// Display rows for the coin listing, shared by `coins` and `export`.
pub(super) fn listing(coins: &[CoinRow], format: &CurrencyFormat) -> Table {
    let money = |value: Option<f64>| value.map_or_else(String::new, |v| format_currency(v, format));

    Table {
        headers: LISTING_COLUMNS.iter().map(|h| (*h).to_owned()).collect(),
        rows: coins
            .iter()
            .map(|coin| {
                vec![
                    coin.name.clone().unwrap_or_default(),
                    coin.symbol.as_deref().unwrap_or_default().to_uppercase(),
                    coin.market_cap_rank.map(|r| r.to_string()).unwrap_or_default(),
                    money(coin.current_price),
                    money(coin.price_change_24h),
                    money(coin.market_cap.map(|v| v as f64)),
                    coin.total_supply.map(|v| v.to_string()).unwrap_or_default(),
                ]
            })
            .collect(),
    }
}
