//! SG spot fetcher.
//!
//! The exchange's securities API returns JSON with the instrument records
//! under `data.prices`. Records are open-ended objects, so the table columns
//! are the union of flattened keys across all records (nested objects get
//! dotted names), in first-seen order.

use crate::client;
use crate::error::CollectError;
use crate::table::Table;
use chrono::Utc;
use chrono_tz::Tz;
use serde_json::{Map, Value};
use std::collections::HashMap;
use tracing::{error, info};

/// Output file for the SG spot table.
pub const SG_FILE: &str = "sg_tickers_spot.csv";

/// Capture timestamps for the SG market are stamped in Singapore time.
pub const CAPTURE_ZONE: Tz = chrono_tz::Asia::Singapore;

/// Fetches the securities prices API and flattens it to one row per
/// instrument.
pub struct SgSpotFetcher {
    client: reqwest::blocking::Client,
    url: String,
}

impl SgSpotFetcher {
    pub fn new(client: reqwest::blocking::Client, url: impl Into<String>) -> Self {
        Self {
            client,
            url: url.into(),
        }
    }

    /// Fetch and flatten the spot records. Failures (including a non-200
    /// response or an empty body) are logged and propagated.
    pub fn collect(&self) -> Result<Table, CollectError> {
        info!("fetching SG securities prices");
        match self.collect_inner() {
            Ok(table) => {
                info!(rows = table.len(), "retrieved spot records");
                Ok(table)
            }
            Err(e) => {
                error!(error = %e, "SG spot fetch failed");
                Err(e)
            }
        }
    }

    fn collect_inner(&self) -> Result<Table, CollectError> {
        let body = client::get_text(&self.client, &self.url)?;
        if body.trim().is_empty() {
            return Err(CollectError::EmptyResponse(self.url.clone()));
        }

        let mut table = parse_prices(&body, &self.url)?;

        let now = Utc::now().with_timezone(&CAPTURE_ZONE);
        table.add_column("datetime", &now.format("%Y-%m-%d %H:%M:%S").to_string())?;
        table.add_column("datetime_sg", &now.format("%Y-%m-%d %H:%M:%S%z").to_string())?;
        Ok(table)
    }
}

/// Flatten the `data.prices` array into a table.
fn parse_prices(body: &str, url: &str) -> Result<Table, CollectError> {
    let value: Value = serde_json::from_str(body)
        .map_err(|e| CollectError::ResponseFormatChanged(format!("prices json: {e}")))?;

    let prices = value
        .pointer("/data/prices")
        .and_then(Value::as_array)
        .ok_or_else(|| {
            CollectError::ResponseFormatChanged("response has no data.prices array".into())
        })?;
    if prices.is_empty() {
        return Err(CollectError::EmptyResponse(url.to_string()));
    }

    let mut columns: Vec<String> = Vec::new();
    let mut records: Vec<HashMap<String, String>> = Vec::with_capacity(prices.len());

    for price in prices {
        let object = price.as_object().ok_or_else(|| {
            CollectError::ResponseFormatChanged("price record is not an object".into())
        })?;
        let mut cells = HashMap::new();
        flatten_into("", object, &mut cells, &mut columns);
        records.push(cells);
    }

    let mut table = Table::new(columns.clone());
    for cells in records {
        table.push_row(
            columns
                .iter()
                .map(|c| cells.get(c).cloned().unwrap_or_default())
                .collect(),
        );
    }
    Ok(table)
}

/// Walk one record, flattening nested objects with dotted names and noting
/// new columns in first-seen order.
fn flatten_into(
    prefix: &str,
    object: &Map<String, Value>,
    cells: &mut HashMap<String, String>,
    columns: &mut Vec<String>,
) {
    for (key, value) in object {
        let name = if prefix.is_empty() {
            key.clone()
        } else {
            format!("{prefix}.{key}")
        };
        match value {
            Value::Object(nested) => flatten_into(&name, nested, cells, columns),
            other => {
                if !columns.contains(&name) {
                    columns.push(name.clone());
                }
                cells.insert(name, scalar_text(other));
            }
        }
    }
}

fn scalar_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        // Arrays are rare in this feed; keep them as compact JSON.
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BODY: &str = r#"{
        "meta": {"code": "200"},
        "data": {
            "prices": [
                {"nc": "S68", "lt": 9.87, "type": {"code": "stock"}, "v": 1200},
                {"nc": "D05", "lt": 35.2, "h": 35.6}
            ]
        }
    }"#;

    #[test]
    fn flattens_records_with_dotted_nested_keys() {
        let table = parse_prices(BODY, "https://example.com").unwrap();

        assert_eq!(table.len(), 2);
        assert_eq!(table.cell(0, "nc"), Some("S68"));
        assert_eq!(table.cell(0, "type.code"), Some("stock"));
        assert_eq!(table.cell(0, "lt"), Some("9.87"));
    }

    #[test]
    fn column_set_is_the_union_across_records() {
        let table = parse_prices(BODY, "https://example.com").unwrap();

        assert!(table.column_index("h").is_some());
        assert_eq!(table.cell(0, "h"), Some("")); // first record has no "h"
        assert_eq!(table.cell(1, "h"), Some("35.6"));
        assert_eq!(table.cell(1, "type.code"), Some("")); // second has no type
        assert_eq!(table.cell(1, "v"), Some(""));
    }

    #[test]
    fn missing_prices_array_is_a_format_error() {
        let err = parse_prices(r#"{"data": {}}"#, "u").unwrap_err();
        assert!(matches!(err, CollectError::ResponseFormatChanged(_)));
    }

    #[test]
    fn empty_prices_array_reports_no_data() {
        let err = parse_prices(r#"{"data": {"prices": []}}"#, "u").unwrap_err();
        assert!(matches!(err, CollectError::EmptyResponse(_)));
    }

    #[test]
    fn null_values_become_empty_cells() {
        let body = r#"{"data": {"prices": [{"nc": "S68", "lt": null}]}}"#;
        let table = parse_prices(body, "u").unwrap();
        assert_eq!(table.cell(0, "lt"), Some(""));
    }
}
