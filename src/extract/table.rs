//! Delimited tables and workbooks rendered as aligned text.

use std::io::Cursor;

use calamine::Reader;

use crate::error::{Result, SiftError};

/// Parse CSV and render it as a column-aligned table.
pub fn csv_text(bytes: &[u8]) -> Result<String> {
    let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(bytes);

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|e| SiftError::decode("csv", e))?;
        rows.push(record.iter().map(str::to_string).collect());
    }
    Ok(render_table(&rows))
}

/// Render the first worksheet of a workbook as a column-aligned table.
pub fn spreadsheet_text(bytes: &[u8]) -> Result<String> {
    let mut workbook = calamine::open_workbook_auto_from_rs(Cursor::new(bytes))
        .map_err(|e| SiftError::decode("spreadsheet", e))?;
    let range = match workbook.worksheet_range_at(0) {
        Some(range) => range.map_err(|e| SiftError::decode("spreadsheet", e))?,
        None => return Ok(String::new()),
    };
    let rows: Vec<Vec<String>> = range
        .rows()
        .map(|row| row.iter().map(|cell| cell.to_string()).collect())
        .collect();
    Ok(render_table(&rows))
}

/// Right-align every column to its widest cell, two spaces between
/// columns. Short rows are padded with empty cells.
pub fn render_table(rows: &[Vec<String>]) -> String {
    let columns = rows.iter().map(Vec::len).max().unwrap_or(0);
    let mut widths = vec![0usize; columns];
    for row in rows {
        for (i, cell) in row.iter().enumerate() {
            widths[i] = widths[i].max(cell.chars().count());
        }
    }

    let mut out = String::new();
    for row in rows {
        let mut line = String::new();
        for (i, width) in widths.iter().enumerate() {
            if i > 0 {
                line.push_str("  ");
            }
            let cell = row.get(i).map(String::as_str).unwrap_or("");
            let pad = width - cell.chars().count();
            line.extend(std::iter::repeat(' ').take(pad));
            line.push_str(cell);
        }
        out.push_str(line.trim_end());
        out.push('\n');
    }
    out
}
