//! HK listing fetcher.
//!
//! The exchange publishes its full list of securities as a spreadsheet. The
//! sheet's first row is a metadata line whose last token is the list date,
//! the second row is the real header, and data rows follow. Stock codes are
//! numeric in the sheet and become four-digit zero-padded tickers with an
//! `.HK` suffix (`700` → `0700.HK`).

use crate::client;
use crate::error::CollectError;
use crate::table::Table;
use calamine::{Data, Reader, Xlsx};
use chrono::NaiveDate;
use chrono_tz::Tz;
use std::io::Cursor;
use tracing::{error, info};

/// Output file for the HK listing.
pub const HK_FILE: &str = "hk_tickers.csv";

/// Capture timestamps for the HK market are stamped in Hong Kong time.
pub const CAPTURE_ZONE: Tz = chrono_tz::Asia::Hong_Kong;

/// Header cell naming the numeric stock-code column.
const STOCK_CODE: &str = "Stock Code";

/// Downloads and reshapes the exchange's list-of-securities spreadsheet.
pub struct HkListingFetcher {
    client: reqwest::blocking::Client,
    url: String,
}

impl HkListingFetcher {
    pub fn new(client: reqwest::blocking::Client, url: impl Into<String>) -> Self {
        Self {
            client,
            url: url.into(),
        }
    }

    /// Fetch and reshape the listing. Failures are logged and propagated.
    pub fn collect(&self) -> Result<Table, CollectError> {
        info!("downloading HK list of securities");
        match self.collect_inner() {
            Ok(table) => {
                info!(rows = table.len(), "HK listing downloaded");
                Ok(table)
            }
            Err(e) => {
                error!(error = %e, "HK listing download failed");
                Err(e)
            }
        }
    }

    fn collect_inner(&self) -> Result<Table, CollectError> {
        let bytes = client::get_bytes(&self.client, &self.url)?;
        let rows = read_sheet(&bytes)?;
        let mut table = reshape_listing(rows)?;
        table.add_column("datetime", &super::capture_stamp(CAPTURE_ZONE))?;
        Ok(table)
    }
}

/// Read the first worksheet into rows of strings.
fn read_sheet(bytes: &[u8]) -> Result<Vec<Vec<String>>, CollectError> {
    let mut workbook = Xlsx::new(Cursor::new(bytes))
        .map_err(|e| CollectError::ResponseFormatChanged(format!("open workbook: {e}")))?;

    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| CollectError::ResponseFormatChanged("workbook has no sheets".into()))?
        .map_err(|e| CollectError::ResponseFormatChanged(format!("read worksheet: {e}")))?;

    Ok(range
        .rows()
        .map(|row| row.iter().map(cell_text).collect())
        .collect())
}

/// Promote the second row to header, derive `Date` and `Ticker` columns.
///
/// Rows whose stock code is not numeric (footnotes, blank separators) are
/// skipped.
fn reshape_listing(rows: Vec<Vec<String>>) -> Result<Table, CollectError> {
    let mut rows = rows.into_iter();

    let meta_row = rows
        .next()
        .ok_or_else(|| CollectError::ResponseFormatChanged("listing sheet is empty".into()))?;
    let list_date = parse_list_date(&meta_row)?;

    let header_row = rows
        .next()
        .ok_or_else(|| CollectError::ResponseFormatChanged("listing sheet has no header".into()))?;

    // Trailing empty header cells are layout padding, not columns.
    let mut columns: Vec<String> = header_row;
    while columns.last().map(|c| c.is_empty()).unwrap_or(false) {
        columns.pop();
    }
    let code_col = columns
        .iter()
        .position(|c| c == STOCK_CODE)
        .ok_or_else(|| {
            CollectError::ResponseFormatChanged(format!("header has no '{STOCK_CODE}' column"))
        })?;

    let width = columns.len();
    columns.push("Date".into());
    columns.push("Ticker".into());
    let mut table = Table::new(columns);

    for mut row in rows {
        let code = match row.get(code_col).and_then(|c| c.trim().parse::<i64>().ok()) {
            Some(code) => code,
            None => continue,
        };
        row.truncate(width);
        row.resize(width, String::new());
        row.push(list_date.clone());
        row.push(format!("{code:04}.HK"));
        table.push_row(row);
    }

    if table.is_empty() {
        return Err(CollectError::EmptyResponse("listing sheet".into()));
    }
    Ok(table)
}

/// The metadata row reads like "Updated as at 28/02/2025" — the last
/// whitespace-separated token is the list date.
fn parse_list_date(meta_row: &[String]) -> Result<String, CollectError> {
    let line = meta_row
        .iter()
        .find(|cell| !cell.is_empty())
        .ok_or_else(|| CollectError::ResponseFormatChanged("metadata row is blank".into()))?;

    let token = line
        .split_whitespace()
        .last()
        .ok_or_else(|| CollectError::ResponseFormatChanged("metadata row is blank".into()))?;

    let date = NaiveDate::parse_from_str(token, "%d/%m/%Y").map_err(|e| {
        CollectError::ResponseFormatChanged(format!("list date '{token}': {e}"))
    })?;
    Ok(date.format("%Y-%m-%d").to_string())
}

/// Spreadsheet cells arrive typed; everything becomes text. Whole floats
/// print without the fraction so numeric codes round-trip cleanly.
fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.trim().to_string(),
        Data::Float(f) if f.fract() == 0.0 => format!("{}", *f as i64),
        Data::Float(f) => f.to_string(),
        Data::Int(i) => i.to_string(),
        Data::Bool(b) => b.to_string(),
        Data::DateTime(dt) => dt.as_f64().to_string(),
        Data::DateTimeIso(s) | Data::DurationIso(s) => s.clone(),
        Data::Error(e) => format!("{e:?}"),
    }
}
