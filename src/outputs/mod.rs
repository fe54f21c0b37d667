//! Export collaborators that turn the accumulated records into a file.
//!
//! # Submodules
//!
//! - [`csv`]: Spreadsheet-compatible table with a header row (the default)
//! - [`json`]: Array of objects keyed by column name
//! - [`xlsx`]: Excel workbook with a bold header row
//!
//! All three write the same columns in the same order, one row per record:
//!
//! ```text
//! Search Phrase, Phrase Count, Title, Description, Money Mentioned,
//! Image File, Image URL, Link, News Date, Search Date
//! ```

pub mod csv;
pub mod json;
pub mod xlsx;

use crate::cli::ExportFormat;
use crate::models::ResultRecord;
use std::path::PathBuf;
use thiserror::Error;

/// Failure while writing the exported table.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("I/O error writing {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("CSV error: {0}")]
    Csv(#[from] ::csv::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Excel error: {0}")]
    Xlsx(#[from] rust_xlsxwriter::XlsxError),
}

/// Writes an ordered set of records to some destination.
pub trait TableExporter {
    fn write_table(&self, records: &[ResultRecord]) -> Result<(), ExportError>;

    /// Where the table ends up, for logging.
    fn destination(&self) -> String;
}

impl<T: TableExporter + ?Sized> TableExporter for Box<T> {
    fn write_table(&self, records: &[ResultRecord]) -> Result<(), ExportError> {
        (**self).write_table(records)
    }

    fn destination(&self) -> String {
        (**self).destination()
    }
}

/// Build the exporter for the requested format.
pub fn exporter_for(format: ExportFormat, path: impl Into<PathBuf>) -> Box<dyn TableExporter> {
    let path = path.into();
    match format {
        ExportFormat::Csv => Box::new(csv::CsvExporter::new(path)),
        ExportFormat::Json => Box::new(json::JsonExporter::new(path)),
        ExportFormat::Xlsx => Box::new(xlsx::XlsxExporter::new(path)),
    }
}

/// Create the parent directory of `path` if it has one.
fn ensure_parent(path: &std::path::Path) -> Result<(), ExportError> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => {
            std::fs::create_dir_all(parent).map_err(|source| ExportError::Io {
                path: parent.display().to_string(),
                source,
            })
        }
        _ => Ok(()),
    }
}
