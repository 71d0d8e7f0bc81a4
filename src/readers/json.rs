//! JSON reader
//!
//! Accepts a top-level array of records (`[{"a": 1}, ...]`) or newline-delimited
//! records (`{"a": 1}\n{"a": 2}`). The schema is inferred across all records.

use arrow::error::ArrowError;
use arrow::json::reader::infer_json_schema_from_iterator;
use arrow::json::ReaderBuilder;
use serde_json::Value;
use std::fs;
use std::sync::Arc;

use crate::core::model::{ReaderOptions, Table};
use crate::error::{CacherError, CacherResult};
use crate::readers::ReadTarget;

/// Rows per record batch unless `batch_size` says otherwise
pub const DEFAULT_BATCH_SIZE: usize = 8192;

/// Read a JSON file
///
/// Options: `lines` (force newline-delimited parsing; auto-detected when
/// absent), `batch_size`.
pub fn read_json(target: &ReadTarget, options: &ReaderOptions) -> CacherResult<Table> {
    let path = match target {
        ReadTarget::Path(path) => path,
        ReadTarget::Query(_) => {
            return Err(CacherError::source_unavailable(
                target.name(),
                "the JSON reader needs a file path",
            ))
        }
    };
    let name = path.display().to_string();

    let lines = options.get_bool("lines")?;
    let batch_size = options
        .get_usize("batch_size")?
        .unwrap_or(DEFAULT_BATCH_SIZE)
        .max(1);

    let content = fs::read_to_string(path).map_err(|e| CacherError::source_unavailable(&name, e))?;
    let records = parse_records(&content, lines).map_err(|e| CacherError::source_unavailable(&name, e))?;

    records_to_table(&records, batch_size).map_err(|e| CacherError::source_unavailable(&name, e))
}

/// Split file content into one JSON value per record
fn parse_records(content: &str, lines: Option<bool>) -> Result<Vec<Value>, serde_json::Error> {
    let newline_delimited = lines.unwrap_or_else(|| !content.trim_start().starts_with('['));

    if newline_delimited {
        content
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(serde_json::from_str)
            .collect()
    } else {
        serde_json::from_str(content)
    }
}

fn records_to_table(records: &[Value], batch_size: usize) -> Result<Table, ArrowError> {
    let schema = Arc::new(infer_json_schema_from_iterator(
        records.iter().map(Ok::<_, ArrowError>),
    )?);

    let mut decoder = ReaderBuilder::new(schema.clone())
        .with_batch_size(batch_size)
        .build_decoder()?;

    let mut batches = Vec::new();
    for chunk in records.chunks(batch_size) {
        decoder.serialize(chunk)?;
        if let Some(batch) = decoder.flush()? {
            batches.push(batch);
        }
    }

    Ok(Table::new(schema, batches))
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow::array::{Array, Int64Array, StringArray};
    use arrow::datatypes::DataType;
    use std::path::{Path, PathBuf};
    use tempfile::tempdir;

    fn write(dir: &Path, name: &str, content: &str) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_read_json_array() {
        let temp = tempdir().unwrap();
        let path = write(
            temp.path(),
            "people.json",
            r#"[{"id": 1, "name": "ada"}, {"id": 2, "name": "grace"}]"#,
        );

        let table = read_json(&ReadTarget::Path(path), &ReaderOptions::new()).unwrap();
        assert_eq!(table.num_rows(), 2);

        let batch = table.to_batch().unwrap();
        let schema = batch.schema();
        let id_index = schema.index_of("id").unwrap();
        let name_index = schema.index_of("name").unwrap();
        assert_eq!(schema.field(id_index).data_type(), &DataType::Int64);

        let ids = batch.column(id_index).as_any().downcast_ref::<Int64Array>().unwrap();
        assert_eq!(ids.value(1), 2);
        let names = batch
            .column(name_index)
            .as_any()
            .downcast_ref::<StringArray>()
            .unwrap();
        assert_eq!(names.value(0), "ada");
    }

    #[test]
    fn test_read_json_lines_autodetect() {
        let temp = tempdir().unwrap();
        let path = write(
            temp.path(),
            "events.json",
            "{\"kind\": \"a\"}\n\n{\"kind\": \"b\", \"extra\": true}\n",
        );

        let table = read_json(&ReadTarget::Path(path), &ReaderOptions::new()).unwrap();
        assert_eq!(table.num_rows(), 2);
        assert_eq!(table.num_columns(), 2);

        let batch = table.to_batch().unwrap();
        let extra = batch.schema().index_of("extra").unwrap();
        assert!(batch.column(extra).is_null(0));
    }

    #[test]
    fn test_read_json_batches() {
        let temp = tempdir().unwrap();
        let path = write(temp.path(), "n.json", r#"[{"n":1},{"n":2},{"n":3}]"#);

        let options = ReaderOptions::new().with("batch_size", 2);
        let table = read_json(&ReadTarget::Path(path), &options).unwrap();
        assert_eq!(table.batches().len(), 2);
        assert_eq!(table.num_rows(), 3);
    }

    #[test]
    fn test_read_json_invalid() {
        let temp = tempdir().unwrap();
        let path = write(temp.path(), "bad.json", "[{\"a\": 1},");

        let err = read_json(&ReadTarget::Path(path), &ReaderOptions::new()).unwrap_err();
        assert!(matches!(err, CacherError::SourceUnavailable { .. }));
    }

    #[test]
    fn test_read_json_lines_forced() {
        let temp = tempdir().unwrap();
        let path = write(temp.path(), "one.json", "{\"a\": 1}\n");

        let options = ReaderOptions::new().with("lines", true);
        let table = read_json(&ReadTarget::Path(path), &options).unwrap();
        assert_eq!(table.num_rows(), 1);
    }
}
