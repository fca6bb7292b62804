//! US screener source.
//!
//! The screener serves each category as a paginated HTML result view ordered
//! by a query parameter. Pages are 20 rows; the client walks the offsets
//! until a short page, extracting the result table from each response. Every
//! page request goes through the retry policy.

use crate::client;
use crate::error::CollectError;
use crate::retry::RetryPolicy;
use crate::table::Table;
use chrono_tz::Tz;
use scraper::{ElementRef, Html, Selector};
use tracing::{error, info, warn};

/// All capture timestamps for the US market are stamped in Eastern time.
pub const CAPTURE_ZONE: Tz = chrono_tz::America::New_York;

/// Rows per screener result page.
const PAGE_SIZE: usize = 20;

/// Hard ceiling on pages per category, in case the endpoint stops
/// terminating the result set.
const MAX_PAGES: usize = 600;

/// One screener category — a distinct attribute set for the same ticker
/// universe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    Overview,
    Valuation,
    Ownership,
    Financial,
}

impl Category {
    /// Collection order; also the left-to-right merge order.
    pub const ALL: [Category; 4] = [
        Category::Overview,
        Category::Valuation,
        Category::Ownership,
        Category::Financial,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Category::Overview => "overview",
            Category::Valuation => "valuation",
            Category::Ownership => "ownership",
            Category::Financial => "financial",
        }
    }

    /// Screener view id for this category's result table.
    fn view_id(&self) -> &'static str {
        match self {
            Category::Overview => "111",
            Category::Valuation => "121",
            Category::Ownership => "131",
            Category::Financial => "161",
        }
    }

    /// Output file for the category table.
    pub fn file_name(&self) -> String {
        format!("us_tickers_{}.csv", self.name())
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl std::str::FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "overview" => Ok(Category::Overview),
            "valuation" => Ok(Category::Valuation),
            "ownership" => Ok(Category::Ownership),
            "financial" => Ok(Category::Financial),
            other => Err(format!(
                "unknown category '{other}'. Valid: overview, valuation, ownership, financial"
            )),
        }
    }
}

/// Client for the screener's paginated result views.
pub struct ScreenerClient {
    client: reqwest::blocking::Client,
    base_url: String,
    retry: RetryPolicy,
}

impl ScreenerClient {
    pub fn new(
        client: reqwest::blocking::Client,
        base_url: impl Into<String>,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            client,
            base_url: base_url.into(),
            retry,
        }
    }

    /// Result page URL: view for the category, market-cap descending,
    /// 1-based row offset.
    fn page_url(&self, category: Category, offset: usize) -> String {
        format!(
            "{}?v={}&o=-marketcap&r={offset}",
            self.base_url,
            category.view_id()
        )
    }

    /// Fetch the full result table for `category`, stamped with one capture
    /// timestamp on every row. Failures are logged and propagated — there is
    /// no empty-result fallback.
    pub fn collect(&self, category: Category) -> Result<Table, CollectError> {
        info!(category = category.name(), "downloading screener view");
        match self.collect_inner(category) {
            Ok(table) => {
                info!(
                    category = category.name(),
                    rows = table.len(),
                    "screener view downloaded"
                );
                Ok(table)
            }
            Err(e) => {
                error!(category = category.name(), error = %e, "screener download failed");
                Err(e)
            }
        }
    }

    fn collect_inner(&self, category: Category) -> Result<Table, CollectError> {
        let mut table: Option<Table> = None;

        for page in 0..MAX_PAGES {
            let offset = 1 + page * PAGE_SIZE;
            let url = self.page_url(category, offset);
            let body = self.retry.run(|| client::get_text(&self.client, &url))?;
            let rows = parse_result_page(&body)?;

            let page_len = rows.len();
            match table.as_mut() {
                None => table = Some(rows),
                Some(t) => t.extend_rows(rows)?,
            }

            if page_len < PAGE_SIZE {
                break;
            }
            if page + 1 == MAX_PAGES {
                warn!(
                    category = category.name(),
                    pages = MAX_PAGES,
                    "stopping pagination at the page ceiling"
                );
            }
        }

        let mut table = table
            .filter(|t| !t.is_empty())
            .ok_or_else(|| CollectError::EmptyResponse(self.base_url.clone()))?;

        table.add_column("datetime", &super::capture_stamp(CAPTURE_ZONE))?;
        Ok(table)
    }
}

impl super::CategorySource for ScreenerClient {
    fn collect(&self, category: Category) -> Result<Table, CollectError> {
        ScreenerClient::collect(self, category)
    }
}

/// Extract the result table from one screener page.
///
/// The header comes from the table's `<th>` cells; data rows are `<tr>`s
/// whose `<td>` count matches. A leading row-number column is dropped so the
/// ticker is always the first column.
fn parse_result_page(html: &str) -> Result<Table, CollectError> {
    let document = Html::parse_document(html);
    let table_sel = Selector::parse("table").expect("static selector");
    let th_sel = Selector::parse("th").expect("static selector");
    let tr_sel = Selector::parse("tr").expect("static selector");
    let td_sel = Selector::parse("td").expect("static selector");

    // The result table is the first one with a multi-column header; the
    // surrounding layout tables have none.
    let result_table = document
        .select(&table_sel)
        .find(|t| t.select(&th_sel).count() >= 2)
        .ok_or_else(|| {
            CollectError::ResponseFormatChanged("no result table in screener page".into())
        })?;

    let mut columns: Vec<String> = result_table.select(&th_sel).map(cell_text).collect();
    let drop_row_number = columns.first().map(|c| c == "No.").unwrap_or(false);
    if drop_row_number {
        columns.remove(0);
    }
    if columns.is_empty() {
        return Err(CollectError::ResponseFormatChanged(
            "screener header row is empty".into(),
        ));
    }

    let mut table = Table::new(columns);
    for tr in result_table.select(&tr_sel) {
        let mut cells: Vec<String> = tr.select(&td_sel).map(cell_text).collect();
        // Header and pager rows carry no / too few data cells.
        if cells.len() < 2 {
            continue;
        }
        if drop_row_number {
            cells.remove(0);
        }
        table.push_row(cells);
    }

    Ok(table)
}

/// Text content of a cell, whitespace-collapsed.
fn cell_text(el: ElementRef<'_>) -> String {
    el.text()
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"
        <html><body>
        <table><tr><td>nav</td></tr></table>
        <table class="screener_table">
          <thead>
            <tr>
              <th>No.</th><th>Ticker</th><th>Company</th><th>Market Cap</th>
            </tr>
          </thead>
          <tbody>
            <tr><td>1</td><td>AAPL</td><td>Apple Inc.</td><td>2900.00B</td></tr>
            <tr><td>2</td><td>MSFT</td><td>Microsoft
              Corporation</td><td>2800.00B</td></tr>
            <tr><td colspan="4">Page 1/2</td></tr>
          </tbody>
        </table>
        </body></html>
    "#;

    #[test]
    fn parses_rows_and_drops_row_number_column() {
        let table = parse_result_page(PAGE).unwrap();

        assert_eq!(table.columns(), &["Ticker", "Company", "Market Cap"]);
        assert_eq!(table.len(), 2);
        assert_eq!(table.cell(0, "Ticker"), Some("AAPL"));
        assert_eq!(table.cell(1, "Company"), Some("Microsoft Corporation"));
    }

    #[test]
    fn page_without_result_table_is_a_format_error() {
        let err = parse_result_page("<html><body><p>maintenance</p></body></html>").unwrap_err();
        assert!(matches!(err, CollectError::ResponseFormatChanged(_)));
    }

    #[test]
    fn header_without_row_number_is_kept_as_is() {
        let html = r#"
            <table>
              <tr><th>Ticker</th><th>P/E</th></tr>
              <tr><td>AAPL</td><td>30.1</td></tr>
            </table>
        "#;
        let table = parse_result_page(html).unwrap();
        assert_eq!(table.columns(), &["Ticker", "P/E"]);
        assert_eq!(table.cell(0, "P/E"), Some("30.1"));
    }

    #[test]
    fn page_url_orders_by_market_cap_descending() {
        let client = crate::client::build_client(
            std::time::Duration::from_secs(1),
            crate::client::DEFAULT_USER_AGENT,
        )
        .unwrap();
        let screener = ScreenerClient::new(
            client,
            "https://example.com/screener.ashx",
            RetryPolicy::default(),
        );

        assert_eq!(
            screener.page_url(Category::Valuation, 21),
            "https://example.com/screener.ashx?v=121&o=-marketcap&r=21"
        );
    }
}
