//! US collector/merger.
//!
//! Drives the four screener categories in a fixed order, persists each
//! category table as it lands, then outer-joins them on the ticker column
//! into one merged table.
//!
//! Failure policy: a category failure aborts the run, but whatever was
//! already collected is merged and saved first (best effort, no
//! re-collection), and the original error still reaches the caller.

use crate::csv_store::CsvStore;
use crate::error::CollectError;
use crate::sources::screener::Category;
use crate::sources::CategorySource;
use crate::table::Table;
use chrono::NaiveDateTime;
use tracing::{error, info, warn};

/// Output file for the merged US table.
pub const MERGED_FILE: &str = "us_tickers.csv";

/// Format of the `datetime` stamp every source writes.
const STAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// The tables gathered by one run, one optional slot per category.
#[derive(Debug, Default)]
pub struct CollectedTables {
    pub overview: Option<Table>,
    pub valuation: Option<Table>,
    pub ownership: Option<Table>,
    pub financial: Option<Table>,
}

impl CollectedTables {
    fn slot(&mut self, category: Category) -> &mut Option<Table> {
        match category {
            Category::Overview => &mut self.overview,
            Category::Valuation => &mut self.valuation,
            Category::Ownership => &mut self.ownership,
            Category::Financial => &mut self.financial,
        }
    }

    pub fn get(&self, category: Category) -> Option<&Table> {
        match category {
            Category::Overview => self.overview.as_ref(),
            Category::Valuation => self.valuation.as_ref(),
            Category::Ownership => self.ownership.as_ref(),
            Category::Financial => self.financial.as_ref(),
        }
    }

    pub fn set(&mut self, category: Category, table: Table) {
        *self.slot(category) = Some(table);
    }

    /// Collected tables in collection order.
    pub fn collected(&self) -> impl Iterator<Item = (Category, &Table)> {
        Category::ALL
            .iter()
            .filter_map(|&c| self.get(c).map(|t| (c, t)))
    }

    /// Categories not collected yet, in collection order.
    pub fn missing(&self) -> Vec<Category> {
        Category::ALL
            .iter()
            .copied()
            .filter(|&c| self.get(c).is_none())
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.collected().next().is_none()
    }
}

/// Orchestrates the four category sources and the merge step.
pub struct UsCollector<S: CategorySource> {
    source: S,
    store: CsvStore,
}

impl<S: CategorySource> UsCollector<S> {
    pub fn new(source: S, store: CsvStore) -> Self {
        Self { source, store }
    }

    /// Collect one category, persist its table, and record it in `tables`.
    pub fn collect_category(
        &self,
        tables: &mut CollectedTables,
        category: Category,
    ) -> Result<(), CollectError> {
        let table = self.source.collect(category)?;
        self.store.write(&category.file_name(), &table)?;
        tables.set(category, table);
        Ok(())
    }

    /// Collect all four categories in order, then merge and persist.
    ///
    /// On a category failure: log it, best-effort merge and save whatever
    /// was collected so far, then return the original error.
    pub fn collect_all(&self) -> Result<Table, CollectError> {
        let mut tables = CollectedTables::default();

        for category in Category::ALL {
            if let Err(err) = self.collect_category(&mut tables, category) {
                error!(category = category.name(), error = %err, "collection failed");
                if !tables.is_empty() {
                    warn!("saving the tables collected before the failure");
                    if let Err(save_err) = self.merge_collected(&tables) {
                        error!(error = %save_err, "partial save failed");
                    }
                }
                return Err(err);
            }
        }

        self.merge_all(&mut tables)
    }

    /// Merge all four categories, collecting any that are missing first
    /// (one attempt each — a failure here propagates).
    pub fn merge_all(&self, tables: &mut CollectedTables) -> Result<Table, CollectError> {
        for category in tables.missing() {
            info!(category = category.name(), "collecting missing category before merge");
            self.collect_category(tables, category)?;
        }
        self.merge_collected(tables)
    }

    /// Outer-join the collected tables left to right on the first table's
    /// ticker column, derive the `date` column, and persist the result.
    fn merge_collected(&self, tables: &CollectedTables) -> Result<Table, CollectError> {
        let mut collected = tables.collected();
        let (_, first) = collected
            .next()
            .ok_or_else(|| CollectError::Merge("no tables collected".into()))?;

        let key = first
            .columns()
            .first()
            .cloned()
            .ok_or_else(|| CollectError::Merge("first table has no columns".into()))?;

        let mut merged = first.clone();
        for (_, table) in collected {
            merged = merged.outer_join(table, &key)?;
        }

        derive_date(&mut merged)?;
        self.store.write(MERGED_FILE, &merged)?;
        info!(
            rows = merged.len(),
            columns = merged.columns().len(),
            "wrote merged table"
        );
        Ok(merged)
    }
}

/// Add a `date` column: the calendar-date portion of the stamped `datetime`.
/// The stamp is already zone-local, so its date is the capture date in that
/// zone — not the UTC date. Rows without a stamp (tickers absent from the
/// first table) get an empty date.
fn derive_date(table: &mut Table) -> Result<(), CollectError> {
    let idx = table
        .column_index("datetime")
        .ok_or_else(|| CollectError::Merge("merged table has no datetime column".into()))?;

    let dates: Vec<String> = table
        .rows()
        .iter()
        .map(|row| {
            NaiveDateTime::parse_from_str(&row[idx], STAMP_FORMAT)
                .map(|dt| dt.date().format("%Y-%m-%d").to_string())
                .unwrap_or_default()
        })
        .collect();

    table.push_column("date", dates)
}
