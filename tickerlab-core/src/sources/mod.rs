//! Market data sources.
//!
//! Each source is a two-step pipeline: fetch one remote endpoint, reshape
//! the response into a [`Table`]. The US screener pages through a result
//! view per category; HK and SG are single-request fetchers.

pub mod hkex;
pub mod screener;
pub mod sgx;

use crate::error::CollectError;
use crate::table::Table;
use chrono::Utc;
use chrono_tz::Tz;
use screener::Category;

/// Per-category source the collector drives. Abstracted as a trait so tests
/// can run the collection/merge flow without a network.
pub trait CategorySource {
    fn collect(&self, category: Category) -> Result<Table, CollectError>;
}

/// Current time in `zone`, formatted as the `datetime` stamp shared by every
/// row of one fetch.
pub(crate) fn capture_stamp(zone: Tz) -> String {
    Utc::now()
        .with_timezone(&zone)
        .format("%Y-%m-%d %H:%M:%S")
        .to_string()
}
