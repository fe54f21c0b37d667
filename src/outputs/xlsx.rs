//! Excel workbook output.
//!
//! One worksheet, a header row, then one row per record. Counts are written as
//! numbers and the money flag as a boolean cell so they sort and filter
//! natively in a spreadsheet.

use super::csv::COLUMNS;
use super::{ensure_parent, ExportError, TableExporter};
use crate::models::ResultRecord;
use rust_xlsxwriter::{Format, Workbook, Worksheet, XlsxError};
use std::path::PathBuf;
use tracing::{info, instrument};

#[derive(Debug, Clone)]
pub struct XlsxExporter {
    path: PathBuf,
}

impl XlsxExporter {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl TableExporter for XlsxExporter {
    #[instrument(level = "info", skip_all, fields(path = %self.path.display(), rows = records.len()))]
    fn write_table(&self, records: &[ResultRecord]) -> Result<(), ExportError> {
        let mut workbook = Workbook::new();
        let sheet = workbook.add_worksheet();

        let bold = Format::new().set_bold();
        for (col, name) in (0u16..).zip(COLUMNS) {
            sheet.write_string_with_format(0, col, name, &bold)?;
        }
        for (row, record) in (1u32..).zip(records) {
            write_row(sheet, row, record)?;
        }

        ensure_parent(&self.path)?;
        workbook.save(&self.path)?;
        info!("Wrote Excel workbook");
        Ok(())
    }

    fn destination(&self) -> String {
        self.path.display().to_string()
    }
}

fn write_row(sheet: &mut Worksheet, row: u32, r: &ResultRecord) -> Result<(), XlsxError> {
    sheet.write_string(row, 0, &r.search_phrase)?;
    sheet.write_number(row, 1, r.phrase_count as f64)?;
    sheet.write_string(row, 2, &r.title)?;
    sheet.write_string(row, 3, &r.description)?;
    sheet.write_boolean(row, 4, r.money_flag)?;
    sheet.write_string(row, 5, &r.image_local_id)?;
    sheet.write_string(row, 6, &r.image_url)?;
    sheet.write_string(row, 7, &r.link)?;
    sheet.write_string(row, 8, &r.news_date)?;
    sheet.write_string(row, 9, &r.search_date)?;
    Ok(())
}
