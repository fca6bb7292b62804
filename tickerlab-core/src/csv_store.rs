//! CSV persistence for collected tables.
//!
//! Output files are whole-table overwrites, one header row plus one record
//! per row, written into a single data directory.

use crate::error::CollectError;
use crate::table::Table;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

/// Writes and reads tables under one data directory.
#[derive(Debug, Clone)]
pub struct CsvStore {
    data_dir: PathBuf,
}

impl CsvStore {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn path_for(&self, file: &str) -> PathBuf {
        self.data_dir.join(file)
    }

    /// Write `table` to `<data_dir>/<file>`, replacing any previous run's
    /// output.
    pub fn write(&self, file: &str, table: &Table) -> Result<PathBuf, CollectError> {
        fs::create_dir_all(&self.data_dir)?;
        let path = self.path_for(file);

        let mut writer =
            csv::Writer::from_path(&path).map_err(|e| CollectError::Csv(e.to_string()))?;
        writer
            .write_record(table.columns())
            .map_err(|e| CollectError::Csv(e.to_string()))?;
        for row in table.rows() {
            writer
                .write_record(row)
                .map_err(|e| CollectError::Csv(e.to_string()))?;
        }
        writer
            .flush()
            .map_err(|e| CollectError::Csv(e.to_string()))?;

        info!(path = %path.display(), rows = table.len(), "wrote csv");
        Ok(path)
    }

    /// Read a previously written file back into a table.
    pub fn load(&self, file: &str) -> Result<Table, CollectError> {
        let path = self.path_for(file);
        let mut reader =
            csv::Reader::from_path(&path).map_err(|e| CollectError::Csv(e.to_string()))?;

        let columns: Vec<String> = reader
            .headers()
            .map_err(|e| CollectError::Csv(e.to_string()))?
            .iter()
            .map(|h| h.to_string())
            .collect();

        let mut table = Table::new(columns);
        for record in reader.records() {
            let record = record.map_err(|e| CollectError::Csv(e.to_string()))?;
            table.push_row(record.iter().map(|c| c.to_string()).collect());
        }
        Ok(table)
    }
}
