//! JSON output of the accumulated records.
//!
//! Writes a pretty-printed array of objects whose keys are the table's column
//! names, in page order.

use super::{ensure_parent, ExportError, TableExporter};
use crate::models::ResultRecord;
use std::path::PathBuf;
use tracing::{info, instrument};

#[derive(Debug, Clone)]
pub struct JsonExporter {
    path: PathBuf,
}

impl JsonExporter {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl TableExporter for JsonExporter {
    #[instrument(level = "info", skip_all, fields(path = %self.path.display(), rows = records.len()))]
    fn write_table(&self, records: &[ResultRecord]) -> Result<(), ExportError> {
        let json = serde_json::to_string_pretty(records)?;
        ensure_parent(&self.path)?;
        std::fs::write(&self.path, json).map_err(|source| ExportError::Io {
            path: self.path.display().to_string(),
            source,
        })?;
        info!("Wrote JSON records");
        Ok(())
    }

    fn destination(&self) -> String {
        self.path.display().to_string()
    }
}
