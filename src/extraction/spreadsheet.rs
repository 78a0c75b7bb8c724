use std::io::Cursor;

use calamine::{Reader, open_workbook_auto_from_rs};
use serde::Serialize;

use super::ExtractionError;

/// Decoded spreadsheet contents.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct Workbook {
    /// Sheets in workbook order.
    pub sheets: Vec<Sheet>,
}

/// One worksheet rendered as strings.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct Sheet {
    /// Sheet name.
    pub name: String,
    /// Rows of formatted cell values.
    pub rows: Vec<Vec<String>>,
}

impl Workbook {
    /// Plain text view: every cell followed by a space, one line per row.
    pub fn raw_text(&self) -> String {
        let mut text = String::new();
        for row in self.sheets.iter().flat_map(|sheet| sheet.rows.iter()) {
            for cell in row {
                text.push_str(cell);
                text.push(' ');
            }
            text.push('\n');
        }
        text
    }
}

/// Interface implemented by spreadsheet decoders. Implementations are synchronous and are
/// driven from the blocking pool.
pub trait SpreadsheetReader: Send + Sync {
    /// Decode a workbook from raw bytes.
    fn read(&self, content: &[u8]) -> Result<Workbook, ExtractionError>;
}

/// `calamine`-backed reader for xlsx, xls, xlsb and ods workbooks.
#[derive(Clone, Copy, Debug, Default)]
pub struct CalamineReader;

impl SpreadsheetReader for CalamineReader {
    fn read(&self, content: &[u8]) -> Result<Workbook, ExtractionError> {
        let mut workbook = open_workbook_auto_from_rs(Cursor::new(content.to_vec()))
            .map_err(|error| ExtractionError::Unreadable(error.to_string()))?;

        let mut sheets = Vec::new();
        for name in workbook.sheet_names() {
            let range = workbook
                .worksheet_range(&name)
                .map_err(|error| ExtractionError::Unreadable(format!("sheet {name}: {error}")))?;
            let rows = range
                .rows()
                .map(|row| row.iter().map(|cell| cell.to_string()).collect())
                .collect();
            sheets.push(Sheet { name, rows });
        }

        Ok(Workbook { sheets })
    }
}
