//! Upstream record types.
//!
//! Payloads are decoded into explicit types at the ingestion boundary so the
//! rest of the pipeline never inspects raw JSON.

mod coin;
mod timestamp;

pub use coin::CoinRecord;
pub use timestamp::UtcDateTime;
