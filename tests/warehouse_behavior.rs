//! Behavior-driven tests for the coin warehouse
//!
//! These tests verify how stored coins and ingestion runs persist across
//! handles, focusing on what a reader of the warehouse observes.

use coinsync_warehouse::{
    CoinField, CoinRow, CoinStore, IngestRunEntry, RunStatus, Warehouse, WarehouseConfig,
};
use tempfile::{tempdir, TempDir};

fn open_warehouse(temp: &TempDir) -> Warehouse {
    Warehouse::open(WarehouseConfig {
        home: temp.path().to_path_buf(),
        db_path: temp.path().join("warehouse.duckdb"),
        max_pool_size: 2,
    })
    .expect("warehouse open")
}

fn ranked(id: &str, rank: Option<i64>) -> CoinRow {
    CoinRow {
        name: Some(id.to_uppercase()),
        market_cap_rank: rank,
        current_price: Some(1.0),
        ..CoinRow::new(id)
    }
}

// =============================================================================
// Warehouse: Coin storage
// =============================================================================

#[test]
fn when_coins_are_created_they_survive_reopening_the_warehouse() {
    // Given: A warehouse with two coins
    let temp = tempdir().expect("tempdir");
    {
        let warehouse = open_warehouse(&temp);
        warehouse
            .bulk_create(&[ranked("bitcoin", Some(1)), ranked("ethereum", Some(2))])
            .expect("create");
    }

    // When: The warehouse is opened again
    let warehouse = open_warehouse(&temp);

    // Then: Both coins are still there
    assert_eq!(warehouse.coin_count().expect("count"), 2);
    assert!(warehouse.get_coin("ethereum").expect("get").is_some());
}

#[test]
fn when_coins_are_listed_they_come_in_rank_order_with_unranked_last() {
    // Given: Coins stored out of order, one without a rank
    let temp = tempdir().expect("tempdir");
    let warehouse = open_warehouse(&temp);
    warehouse
        .bulk_create(&[
            ranked("unranked-token", None),
            ranked("tether", Some(3)),
            ranked("bitcoin", Some(1)),
            ranked("ethereum", Some(2)),
        ])
        .expect("create");

    // When: The listing is read
    let ids: Vec<String> = warehouse
        .list_coins(None)
        .expect("list")
        .into_iter()
        .map(|coin| coin.coin_id)
        .collect();

    // Then: Order follows market cap rank
    assert_eq!(ids, ["bitcoin", "ethereum", "tether", "unranked-token"]);
}

#[test]
fn when_listing_is_limited_only_the_top_coins_are_returned() {
    let temp = tempdir().expect("tempdir");
    let warehouse = open_warehouse(&temp);
    warehouse
        .bulk_create(&[ranked("a", Some(1)), ranked("b", Some(2)), ranked("c", Some(3))])
        .expect("create");

    let coins = warehouse.list_coins(Some(2)).expect("list");

    assert_eq!(coins.len(), 2);
    assert_eq!(coins[1].coin_id, "b");
}

#[test]
fn when_every_field_is_updated_the_row_matches_the_new_values_exactly() {
    // Given: A fully populated coin
    let temp = tempdir().expect("tempdir");
    let warehouse = open_warehouse(&temp);
    let original = CoinRow {
        symbol: Some(String::from("btc")),
        name: Some(String::from("Bitcoin")),
        max_supply: Some(21_000_000.0),
        ath_date: Some(String::from("2024-03-14T07:10:36.635Z")),
        ..ranked("bitcoin", Some(1))
    };
    warehouse.bulk_create(&[original]).expect("create");

    // When: An update writes all mutable fields from a sparse row
    let replacement = CoinRow {
        current_price: Some(70_000.0),
        ..CoinRow::new("bitcoin")
    };
    let changed = warehouse
        .bulk_update(&[replacement.clone()], &CoinField::ALL)
        .expect("update");

    // Then: Stored values equal the replacement, nulls included
    assert_eq!(changed, 1);
    let stored = warehouse.get_coin("bitcoin").expect("get").expect("present");
    assert_eq!(stored, replacement);
}

#[test]
fn when_an_update_targets_a_missing_coin_nothing_is_inserted() {
    let temp = tempdir().expect("tempdir");
    let warehouse = open_warehouse(&temp);

    let changed = warehouse
        .bulk_update(&[ranked("ghost", Some(9))], &CoinField::ALL)
        .expect("update");

    assert_eq!(changed, 0);
    assert_eq!(warehouse.coin_count().expect("count"), 0);
}

// =============================================================================
// Warehouse: Ingestion log
// =============================================================================

#[test]
fn when_no_run_has_been_recorded_the_last_run_is_empty() {
    let temp = tempdir().expect("tempdir");
    let warehouse = open_warehouse(&temp);

    assert_eq!(warehouse.last_ingest_run().expect("last run"), None);
}

#[test]
fn when_runs_are_recorded_the_latest_one_is_reported() {
    // Given: A failed run followed by a successful one
    let temp = tempdir().expect("tempdir");
    let warehouse = open_warehouse(&temp);
    let failed = IngestRunEntry {
        run_id: String::from("run-1"),
        status: RunStatus::Failed,
        attempts: 5,
        pages: 0,
        records: 0,
        created: 0,
        updated: 0,
        latency_ms: 0,
        error: Some(String::from("unavailable: page 1: connection refused")),
        logged_at: None,
    };
    warehouse.record_ingest_run(&failed).expect("record failed");
    std::thread::sleep(std::time::Duration::from_millis(5));
    let succeeded = IngestRunEntry {
        run_id: String::from("run-2"),
        status: RunStatus::Ok,
        attempts: 1,
        pages: 2,
        records: 53,
        created: 53,
        updated: 0,
        latency_ms: 2_150,
        error: None,
        logged_at: None,
    };
    warehouse.record_ingest_run(&succeeded).expect("record ok");

    // When: The last run is read back
    let last = warehouse
        .last_ingest_run()
        .expect("last run")
        .expect("a run was recorded");

    // Then: It is the successful run, with its logging time filled in
    assert_eq!(last.run_id, "run-2");
    assert_eq!(last.status, RunStatus::Ok);
    assert_eq!(last.records, 53);
    assert_eq!(last.error, None);
    assert!(last.logged_at.is_some());
}

#[test]
fn when_runs_are_logged_back_to_back_the_later_one_wins() {
    let temp = tempdir().expect("tempdir");
    let warehouse = open_warehouse(&temp);
    for (run_id, status) in [("run-a", RunStatus::Failed), ("run-b", RunStatus::Ok)] {
        let entry = IngestRunEntry {
            run_id: String::from(run_id),
            status,
            attempts: 1,
            pages: 0,
            records: 0,
            created: 0,
            updated: 0,
            latency_ms: 0,
            error: None,
            logged_at: None,
        };
        warehouse.record_ingest_run(&entry).expect("record");
    }

    let last = warehouse
        .last_ingest_run()
        .expect("last run")
        .expect("a run was recorded");

    assert_eq!(last.run_id, "run-b");
}
