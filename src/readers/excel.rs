//! Excel reader (.xlsx, .xls) backed by calamine

use calamine::{open_workbook_auto, Data, Reader};

use crate::core::model::{ReaderOptions, Table};
use crate::error::{CacherError, CacherResult};
use crate::readers::columns::{build_table, Cell};
use crate::readers::ReadTarget;

/// Read one worksheet into a table
///
/// Options: `sheet_name` (by name) or `sheet` (zero-based index), defaulting
/// to the first sheet; `header` (default true) takes column names from the
/// first row.
pub fn read_excel(target: &ReadTarget, options: &ReaderOptions) -> CacherResult<Table> {
    let path = match target {
        ReadTarget::Path(path) => path,
        ReadTarget::Query(_) => {
            return Err(CacherError::source_unavailable(
                target.name(),
                "the Excel reader needs a file path",
            ))
        }
    };
    let name = path.display().to_string();

    let sheet_name = options.get_str("sheet_name")?.map(str::to_string);
    let sheet_index = options.get_usize("sheet")?;
    let header = options.get_bool("header")?.unwrap_or(true);

    let mut workbook =
        open_workbook_auto(path).map_err(|e| CacherError::source_unavailable(&name, e))?;

    let sheets = workbook.sheet_names();
    let sheet = match (sheet_name, sheet_index) {
        (Some(sheet), _) => sheet,
        (None, Some(index)) => sheets.get(index).cloned().ok_or_else(|| {
            CacherError::invalid_option(
                "sheet",
                format!("index {} out of range ({} sheets)", index, sheets.len()),
            )
        })?,
        (None, None) => sheets
            .first()
            .cloned()
            .ok_or_else(|| CacherError::source_unavailable(&name, "workbook has no sheets"))?,
    };

    let range = workbook
        .worksheet_range(&sheet)
        .map_err(|e| CacherError::source_unavailable(&name, format!("sheet '{}': {}", sheet, e)))?;

    let mut rows = range.rows();
    let headers: Vec<String> = if header {
        rows.next()
            .map(|row| row.iter().map(header_text).collect())
            .unwrap_or_default()
    } else {
        (1..=range.width()).map(|i| format!("column_{}", i)).collect()
    };

    let cells = rows
        .map(|row| row.iter().map(cell_from_data).collect())
        .collect();

    build_table(headers, cells)
}

fn header_text(data: &Data) -> String {
    match data {
        Data::Empty => String::new(),
        Data::Float(f) if f.fract() == 0.0 => format!("{}", *f as i64),
        other => other.to_string(),
    }
}

/// Convert a calamine cell, treating integral floats as integers
pub fn cell_from_data(data: &Data) -> Cell {
    match data {
        Data::Empty => Cell::Null,
        Data::Int(i) => Cell::Int(*i),
        Data::Float(f) if f.fract() == 0.0 && f.abs() < i64::MAX as f64 => Cell::Int(*f as i64),
        Data::Float(f) => Cell::Float(*f),
        Data::Bool(b) => Cell::Bool(*b),
        Data::String(s) if s.is_empty() => Cell::Null,
        Data::String(s) => Cell::Text(s.clone()),
        Data::Error(_) => Cell::Null,
        other => Cell::Text(other.to_string()),
    }
}
