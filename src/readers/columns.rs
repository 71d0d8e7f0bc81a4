//! Row-oriented cells to Arrow columns
//!
//! Excel sheets and SQL result sets arrive row by row with loosely typed
//! cells. Each column gets the narrowest type that holds every non-null
//! cell: Int64, then Float64, then Boolean, falling back to Utf8.

use arrow::array::{ArrayRef, BooleanArray, Float64Array, Int64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use std::collections::HashSet;
use std::sync::Arc;

use crate::core::model::Table;
use crate::error::CacherResult;

/// A loosely typed cell value
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Null,
    Int(i64),
    Float(f64),
    Bool(bool),
    Text(String),
}

impl Cell {
    fn as_text(&self) -> Option<String> {
        match self {
            Cell::Null => None,
            Cell::Int(i) => Some(i.to_string()),
            Cell::Float(f) => Some(f.to_string()),
            Cell::Bool(b) => Some(b.to_string()),
            Cell::Text(s) => Some(s.clone()),
        }
    }
}

/// Pick the column type for a set of cells
pub fn infer_type<'a>(cells: impl IntoIterator<Item = &'a Cell>) -> DataType {
    let mut saw_int = false;
    let mut saw_float = false;
    let mut saw_bool = false;
    let mut saw_text = false;

    for cell in cells {
        match cell {
            Cell::Null => {}
            Cell::Int(_) => saw_int = true,
            Cell::Float(_) => saw_float = true,
            Cell::Bool(_) => saw_bool = true,
            Cell::Text(_) => saw_text = true,
        }
    }

    let numeric = saw_int || saw_float;
    if saw_text || (numeric && saw_bool) {
        DataType::Utf8
    } else if saw_float {
        DataType::Float64
    } else if saw_int {
        DataType::Int64
    } else if saw_bool {
        DataType::Boolean
    } else {
        DataType::Utf8
    }
}

fn build_array(cells: &[Cell], data_type: &DataType) -> ArrayRef {
    match data_type {
        DataType::Int64 => Arc::new(Int64Array::from(
            cells
                .iter()
                .map(|c| match c {
                    Cell::Int(i) => Some(*i),
                    _ => None,
                })
                .collect::<Vec<_>>(),
        )),
        DataType::Float64 => Arc::new(Float64Array::from(
            cells
                .iter()
                .map(|c| match c {
                    Cell::Int(i) => Some(*i as f64),
                    Cell::Float(f) => Some(*f),
                    _ => None,
                })
                .collect::<Vec<_>>(),
        )),
        DataType::Boolean => Arc::new(BooleanArray::from(
            cells
                .iter()
                .map(|c| match c {
                    Cell::Bool(b) => Some(*b),
                    _ => None,
                })
                .collect::<Vec<_>>(),
        )),
        _ => Arc::new(StringArray::from(
            cells.iter().map(Cell::as_text).collect::<Vec<_>>(),
        )),
    }
}

/// Make header names non-empty and unique
pub fn normalize_headers(headers: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    headers
        .into_iter()
        .enumerate()
        .map(|(i, name)| {
            let base = if name.trim().is_empty() {
                format!("column_{}", i + 1)
            } else {
                name.trim().to_string()
            };
            let mut candidate = base.clone();
            let mut n = 1;
            while !seen.insert(candidate.clone()) {
                candidate = format!("{}_{}", base, n);
                n += 1;
            }
            candidate
        })
        .collect()
}

/// Build a table from column names and rows of cells
///
/// Short rows are padded with nulls; cells beyond the header are dropped.
pub fn build_table(headers: Vec<String>, rows: Vec<Vec<Cell>>) -> CacherResult<Table> {
    let headers = normalize_headers(headers);
    let width = headers.len();

    let mut columns: Vec<Vec<Cell>> = vec![Vec::with_capacity(rows.len()); width];
    for row in rows {
        let mut cells = row.into_iter();
        for column in columns.iter_mut() {
            column.push(cells.next().unwrap_or(Cell::Null));
        }
    }

    let fields: Vec<Field> = headers
        .iter()
        .zip(columns.iter())
        .map(|(name, cells)| Field::new(name, infer_type(cells), true))
        .collect();
    let schema = Arc::new(Schema::new(fields));

    if width == 0 {
        return Ok(Table::empty(schema));
    }

    let arrays: Vec<ArrayRef> = schema
        .fields()
        .iter()
        .zip(columns.iter())
        .map(|(field, cells)| build_array(cells, field.data_type()))
        .collect();

    let batch = RecordBatch::try_new(schema, arrays)?;
    Ok(Table::from_batch(batch))
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow::array::Array;

    #[test]
    fn test_infer_type() {
        assert_eq!(infer_type(&[Cell::Int(1), Cell::Null]), DataType::Int64);
        assert_eq!(infer_type(&[Cell::Int(1), Cell::Float(2.5)]), DataType::Float64);
        assert_eq!(infer_type(&[Cell::Bool(true), Cell::Null]), DataType::Boolean);
        assert_eq!(
            infer_type(&[Cell::Int(1), Cell::Text("x".into())]),
            DataType::Utf8
        );
        assert_eq!(infer_type(&[Cell::Int(1), Cell::Bool(true)]), DataType::Utf8);
        assert_eq!(infer_type(&[Cell::Null]), DataType::Utf8);
    }

    #[test]
    fn test_normalize_headers() {
        let headers = vec!["id".into(), "".into(), "id".into(), " name ".into()];
        assert_eq!(
            normalize_headers(headers),
            vec!["id", "column_2", "id_1", "name"]
        );
    }

    #[test]
    fn test_build_table_pads_short_rows() {
        let table = build_table(
            vec!["id".into(), "score".into(), "label".into()],
            vec![
                vec![Cell::Int(1), Cell::Float(0.5), Cell::Text("a".into())],
                vec![Cell::Int(2)],
            ],
        )
        .unwrap();

        assert_eq!(table.num_rows(), 2);
        let batch = table.to_batch().unwrap();
        assert_eq!(batch.schema().field(0).data_type(), &DataType::Int64);
        assert_eq!(batch.schema().field(1).data_type(), &DataType::Float64);
        assert!(batch.column(2).is_null(1));
    }

    #[test]
    fn test_build_table_mixed_column_as_text() {
        let table = build_table(
            vec!["v".into()],
            vec![vec![Cell::Int(7)], vec![Cell::Text("seven".into())]],
        )
        .unwrap();

        let batch = table.to_batch().unwrap();
        let values = batch
            .column(0)
            .as_any()
            .downcast_ref::<StringArray>()
            .unwrap();
        assert_eq!(values.value(0), "7");
        assert_eq!(values.value(1), "seven");
    }

    #[test]
    fn test_build_table_without_columns() {
        let table = build_table(Vec::new(), vec![vec![Cell::Int(1)]]).unwrap();
        assert_eq!(table.num_columns(), 0);
        assert_eq!(table.num_rows(), 0);
    }
}
