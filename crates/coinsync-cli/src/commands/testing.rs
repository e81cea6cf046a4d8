//! Scripted upstream shared by command tests.

use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};

use coinsync_core::{
    ClientConfig, CoinGeckoClient, HttpClient, HttpError, HttpRequest, HttpResponse, Ingestor,
    Warehouse, WarehouseConfig,
};
use tempfile::TempDir;

const FIRST_PAGE: &str = r#"[
    {"id":"bitcoin","symbol":"btc","name":"Bitcoin","market_cap_rank":1,"current_price":64012.5},
    {"id":"ethereum","symbol":"eth","name":"Ethereum","market_cap_rank":2,"current_price":3120.0}
]"#;

/// Refuses the first `failures` requests, then serves two coins on page 1
/// and nothing after.
pub(crate) struct ScriptedMarket {
    failures: Mutex<u32>,
}

impl ScriptedMarket {
    pub(crate) fn failing(failures: u32) -> Arc<Self> {
        Arc::new(Self {
            failures: Mutex::new(failures),
        })
    }
}

impl HttpClient for ScriptedMarket {
    fn execute<'a>(
        &'a self,
        request: HttpRequest,
    ) -> Pin<Box<dyn Future<Output = Result<HttpResponse, HttpError>> + Send + 'a>> {
        let mut failures = self.failures.lock().expect("failures lock");
        let response = if *failures > 0 {
            *failures -= 1;
            Err(HttpError::new("connection refused"))
        } else if request.url.contains("&page=1&") {
            Ok(HttpResponse::ok_json(FIRST_PAGE))
        } else {
            Ok(HttpResponse::ok_json("[]"))
        };
        Box::pin(async move { response })
    }
}

pub(crate) fn ingestor_on(temp: &TempDir, market: Arc<ScriptedMarket>) -> Ingestor<Warehouse> {
    let warehouse = Warehouse::open(WarehouseConfig::with_db_path(
        temp.path().join("warehouse.duckdb"),
    ))
    .expect("warehouse open");
    let client = CoinGeckoClient::with_http_client(ClientConfig::default(), market).expect("client");
    Ingestor::new(client, warehouse)
}
