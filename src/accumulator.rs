//! Ordered collection of extracted records with a guaranteed export.
//!
//! Records are appended in page-then-card order and never reordered or
//! deduplicated. The accumulator hands its records to the [`TableExporter`]
//! exactly once:
//! - explicitly, through [`ResultAccumulator::finalize`];
//! - or, if it is dropped without being finalized (an early `?` return or a
//!   panic while crawling), from its `Drop` impl.
//!
//! Records collected before a failure are therefore always written out.

use crate::models::ResultRecord;
use crate::outputs::{ExportError, TableExporter};
use tracing::{error, info, warn};

pub struct ResultAccumulator<E: TableExporter> {
    records: Vec<ResultRecord>,
    exporter: E,
    exported: bool,
}

impl<E: TableExporter> ResultAccumulator<E> {
    pub fn new(exporter: E) -> Self {
        Self {
            records: Vec::new(),
            exporter,
            exported: false,
        }
    }

    pub fn push(&mut self, record: ResultRecord) {
        self.records.push(record);
    }

    /// Export every record collected so far and consume the accumulator.
    ///
    /// Returns the number of rows written.
    pub fn finalize(mut self) -> Result<usize, ExportError> {
        self.export()
    }

    fn export(&mut self) -> Result<usize, ExportError> {
        self.exported = true;
        self.exporter.write_table(&self.records)?;
        info!(
            rows = self.records.len(),
            destination = %self.exporter.destination(),
            "Exported records"
        );
        Ok(self.records.len())
    }
}

impl<E: TableExporter> Drop for ResultAccumulator<E> {
    fn drop(&mut self) {
        if self.exported {
            return;
        }
        warn!(rows = self.records.len(), "Accumulator dropped before finalize; exporting");
        if let Err(e) = self.export() {
            error!(error = %e, "Export on drop failed");
        }
    }
}


#[cfg(test)]
mod tests {
    use super::testing::RecordingExporter;
    use super::*;
    use crate::models::{NO_IMAGE, NO_LINK, NOT_AVAILABLE};

    fn record(title: &str) -> ResultRecord {
        ResultRecord {
            search_phrase: "obama".to_string(),
            phrase_count: 0,
            title: title.to_string(),
            description: NOT_AVAILABLE.to_string(),
            money_flag: false,
            image_local_id: NO_IMAGE.to_string(),
            image_url: NO_IMAGE.to_string(),
            link: NO_LINK.to_string(),
            news_date: "March 10 2024".to_string(),
            search_date: "March 10 2024".to_string(),
        }
    }

    #[test]
    fn test_finalize_exports_once_in_order() {
        let exporter = RecordingExporter::default();
        let mut acc = ResultAccumulator::new(exporter.clone());
        acc.push(record("first"));
        acc.push(record("second"));
        acc.push(record("first"));

        assert_eq!(acc.finalize().unwrap(), 3);

        let calls = exporter.calls();
        assert_eq!(calls.len(), 1);
        let titles: Vec<&str> = calls[0].iter().map(|r| r.title.as_str()).collect();
        assert_eq!(titles, vec!["first", "second", "first"]);
    }

    #[test]
    fn test_drop_without_finalize_still_exports() {
        let exporter = RecordingExporter::default();
        {
            let mut acc = ResultAccumulator::new(exporter.clone());
            acc.push(record("partial"));
        }
        let calls = exporter.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0][0].title, "partial");
    }

    #[test]
    fn test_export_survives_panic() {
        let exporter = RecordingExporter::default();
        let inner = exporter.clone();
        let result = std::panic::catch_unwind(move || {
            let mut acc = ResultAccumulator::new(inner);
            acc.push(record("before panic"));
            panic!("driver exploded");
        });

        assert!(result.is_err());
        assert_eq!(exporter.calls().len(), 1);
    }
}
