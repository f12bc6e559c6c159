//! Workbook reader: first worksheet of an Excel file into a [`RawGrid`].
//!
//! Row and column indices in the grid are absolute sheet positions: leading
//! empty rows and columns that calamine trims from the used range are padded
//! back, so a header found at grid row 3 is on sheet row 4.
//!
//! Cell conversion:
//! - ints and floats become numbers
//! - dates become ISO text (`2024-01-31`, or `2024-01-31T08:30:00` with a time)
//! - error cells (`#DIV/0!`, ...) and empty strings become empty cells

use calamine::{open_workbook_auto_from_rs, Data, Reader};
use std::io::Cursor;
use std::path::Path;

use crate::error::{SheetError, SheetResult};
use crate::models::{CellValue, RawGrid};

/// Read the first worksheet of a workbook file.
pub fn read_grid_file<P: AsRef<Path>>(path: P) -> SheetResult<RawGrid> {
    let bytes = std::fs::read(path)?;
    read_grid_bytes(&bytes)
}

/// Read the first worksheet of an in-memory workbook (xlsx, xlsm, xlsb, xls, ods).
pub fn read_grid_bytes(bytes: &[u8]) -> SheetResult<RawGrid> {
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes.to_vec()))
        .map_err(|e| SheetError::Workbook(e.to_string()))?;

    let range = workbook
        .worksheet_range_at(0)
        .ok_or(SheetError::NoWorksheet)?
        .map_err(|e| SheetError::Workbook(e.to_string()))?;

    let Some((row0, col0)) = range.start() else {
        return Ok(RawGrid::default());
    };

    let mut rows: Vec<Vec<CellValue>> = vec![Vec::new(); row0 as usize];
    for row in range.rows() {
        let mut cells = vec![CellValue::Empty; col0 as usize];
        cells.extend(row.iter().map(cell_value));
        rows.push(cells);
    }

    Ok(RawGrid::new(rows))
}

/// Convert one calamine cell.
pub fn cell_value(cell: &Data) -> CellValue {
    match cell {
        Data::Empty | Data::Error(_) => CellValue::Empty,
        Data::String(s) if s.is_empty() => CellValue::Empty,
        Data::String(s) => CellValue::Text(s.clone()),
        Data::Int(i) => CellValue::Number(*i as f64),
        Data::Float(f) => CellValue::Number(*f),
        Data::Bool(b) => CellValue::Bool(*b),
        Data::DateTime(dt) => {
            if dt.is_duration() {
                return CellValue::Number(dt.as_f64());
            }
            match dt.as_datetime() {
                Some(datetime) if datetime.time() == chrono::NaiveTime::MIN => {
                    CellValue::Text(datetime.date().format("%Y-%m-%d").to_string())
                }
                Some(datetime) => {
                    CellValue::Text(datetime.format("%Y-%m-%dT%H:%M:%S").to_string())
                }
                None => CellValue::Number(dt.as_f64()),
            }
        }
        Data::DateTimeIso(s) | Data::DurationIso(s) => CellValue::Text(s.clone()),
    }
}
