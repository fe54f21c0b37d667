//! CSV table output.
//!
//! The header row is always written, even for a run that produced no
//! records, so the file opens as an empty table rather than an empty file.

use super::{ensure_parent, ExportError, TableExporter};
use crate::models::ResultRecord;
use std::path::PathBuf;
use tracing::{info, instrument};

/// Column headers, matching the serialized names on [`ResultRecord`].
pub const COLUMNS: [&str; 10] = [
    "Search Phrase",
    "Phrase Count",
    "Title",
    "Description",
    "Money Mentioned",
    "Image File",
    "Image URL",
    "Link",
    "News Date",
    "Search Date",
];

#[derive(Debug, Clone)]
pub struct CsvExporter {
    path: PathBuf,
}

impl CsvExporter {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl TableExporter for CsvExporter {
    #[instrument(level = "info", skip_all, fields(path = %self.path.display(), rows = records.len()))]
    fn write_table(&self, records: &[ResultRecord]) -> Result<(), ExportError> {
        ensure_parent(&self.path)?;
        let mut writer = ::csv::WriterBuilder::new()
            .has_headers(false)
            .from_path(&self.path)?;

        writer.write_record(COLUMNS)?;
        for record in records {
            writer.serialize(record)?;
        }
        writer.flush().map_err(|source| ExportError::Io {
            path: self.path.display().to_string(),
            source,
        })?;

        info!("Wrote CSV table");
        Ok(())
    }

    fn destination(&self) -> String {
        self.path.display().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{NO_IMAGE, NOT_AVAILABLE};

    fn record(title: &str) -> ResultRecord {
        ResultRecord {
            search_phrase: "obama".to_string(),
            phrase_count: 1,
            title: title.to_string(),
            description: NOT_AVAILABLE.to_string(),
            money_flag: true,
            image_local_id: NO_IMAGE.to_string(),
            image_url: NO_IMAGE.to_string(),
            link: "https://apnews.com/a".to_string(),
            news_date: "March 09 2024".to_string(),
            search_date: "March 10 2024".to_string(),
        }
    }

    #[test]
    fn test_writes_header_and_rows_in_order() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("out").join("stories.csv");
        let exporter = CsvExporter::new(&path);

        exporter
            .write_table(&[record("Obama, $5"), record("Second")])
            .unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], COLUMNS.join(","));
        assert!(lines[1].starts_with("obama,1,\"Obama, $5\",N/A,true,"));
        assert!(lines[2].contains(",Second,"));
    }

    #[test]
    fn test_empty_run_still_has_header() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("empty.csv");

        CsvExporter::new(&path).write_table(&[]).unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        assert_eq!(contents.trim_end(), COLUMNS.join(","));
    }

    #[test]
    fn test_columns_match_record_field_names() {
        let json = serde_json::to_value(record("x")).unwrap();
        let keys: Vec<&str> = json.as_object().unwrap().keys().map(String::as_str).collect();
        for column in COLUMNS {
            assert!(keys.contains(&column), "missing {column}");
        }
        assert_eq!(keys.len(), COLUMNS.len());
    }
}
