//! CSV reader
//!
//! Column types are inferred from the leading rows, then the whole file is
//! decoded with arrow's CSV reader.

use arrow::csv::reader::Format;
use arrow::csv::ReaderBuilder;
use arrow::error::ArrowError;
use std::fs::File;
use std::io::Seek;
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

use crate::core::model::{ReaderOptions, Table};
use crate::error::{CacherError, CacherResult};
use crate::readers::ReadTarget;

/// Rows examined for type inference unless `infer_rows` says otherwise
pub const DEFAULT_INFER_ROWS: usize = 1000;

/// Rows per record batch unless `batch_size` says otherwise
pub const DEFAULT_BATCH_SIZE: usize = 8192;

/// Read a CSV file
///
/// Options: `delimiter`, `quote`, `has_header` (default true),
/// `infer_rows`, `batch_size`.
pub fn read_csv(target: &ReadTarget, options: &ReaderOptions) -> CacherResult<Table> {
    let path = match target {
        ReadTarget::Path(path) => path,
        ReadTarget::Query(_) => {
            return Err(CacherError::source_unavailable(
                target.name(),
                "the CSV reader needs a file path",
            ))
        }
    };

    let mut format = Format::default().with_header(options.get_bool("has_header")?.unwrap_or(true));
    if let Some(delimiter) = options.get_byte("delimiter")? {
        format = format.with_delimiter(delimiter);
    }
    if let Some(quote) = options.get_byte("quote")? {
        format = format.with_quote(quote);
    }
    let infer_rows = options.get_usize("infer_rows")?.unwrap_or(DEFAULT_INFER_ROWS);
    let batch_size = options
        .get_usize("batch_size")?
        .unwrap_or(DEFAULT_BATCH_SIZE)
        .max(1);

    decode(path, format, infer_rows, batch_size).map_err(|e| unavailable(path, e))
}

fn decode(
    path: &Path,
    format: Format,
    infer_rows: usize,
    batch_size: usize,
) -> Result<Table, ArrowError> {
    let mut file = File::open(path)?;
    let (schema, sampled) = format.infer_schema(&mut file, Some(infer_rows))?;
    file.rewind()?;
    debug!(
        "Inferred {} CSV columns from {} rows of {}",
        schema.fields().len(),
        sampled,
        path.display()
    );

    let schema = Arc::new(schema);
    let reader = ReaderBuilder::new(schema.clone())
        .with_format(format)
        .with_batch_size(batch_size)
        .build(file)?;

    let batches = reader.collect::<Result<Vec<_>, _>>()?;
    Ok(Table::new(schema, batches))
}

fn unavailable(path: &Path, err: ArrowError) -> CacherError {
    CacherError::source_unavailable(path.display().to_string(), err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow::array::{Array, Float64Array, Int64Array, StringArray};
    use arrow::datatypes::DataType;
    use std::path::PathBuf;
    use tempfile::tempdir;

    fn write(dir: &Path, name: &str, content: &str) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_read_csv_infers_types() {
        let temp = tempdir().unwrap();
        let path = write(temp.path(), "a.csv", "id,price,name\n1,2.5,apple\n2,3.0,pear\n");

        let table = read_csv(&ReadTarget::Path(path), &ReaderOptions::new()).unwrap();
        assert_eq!(table.num_rows(), 2);
        assert_eq!(table.column_names(), vec!["id", "price", "name"]);

        let batch = table.to_batch().unwrap();
        assert_eq!(batch.schema().field(0).data_type(), &DataType::Int64);
        assert_eq!(batch.schema().field(1).data_type(), &DataType::Float64);

        let ids = batch.column(0).as_any().downcast_ref::<Int64Array>().unwrap();
        assert_eq!(ids.value(1), 2);
        let prices = batch.column(1).as_any().downcast_ref::<Float64Array>().unwrap();
        assert_eq!(prices.value(0), 2.5);
        let names = batch.column(2).as_any().downcast_ref::<StringArray>().unwrap();
        assert_eq!(names.value(1), "pear");
    }

    #[test]
    fn test_read_csv_with_delimiter_option() {
        let temp = tempdir().unwrap();
        let path = write(temp.path(), "semi.csv", "a;b\n1;x\n2;y\n");

        let options = ReaderOptions::new().with("delimiter", ";");
        let table = read_csv(&ReadTarget::Path(path), &options).unwrap();
        assert_eq!(table.column_names(), vec!["a", "b"]);
        assert_eq!(table.num_rows(), 2);
    }

    #[test]
    fn test_read_csv_without_header() {
        let temp = tempdir().unwrap();
        let path = write(temp.path(), "raw.csv", "1,x\n2,y\n3,z\n");

        let options = ReaderOptions::new().with("has_header", false);
        let table = read_csv(&ReadTarget::Path(path), &options).unwrap();
        assert_eq!(table.num_rows(), 3);
        assert_eq!(table.num_columns(), 2);
    }

    #[test]
    fn test_read_csv_small_batches() {
        let temp = tempdir().unwrap();
        let path = write(temp.path(), "b.csv", "n\n1\n2\n3\n4\n5\n");

        let options = ReaderOptions::new().with("batch_size", 2);
        let table = read_csv(&ReadTarget::Path(path), &options).unwrap();
        assert_eq!(table.batches().len(), 3);
        assert_eq!(table.num_rows(), 5);
    }

    #[test]
    fn test_read_csv_missing_values_are_null() {
        let temp = tempdir().unwrap();
        let path = write(temp.path(), "gaps.csv", "id,score\n1,\n2,7\n");

        let table = read_csv(&ReadTarget::Path(path), &ReaderOptions::new()).unwrap();
        let batch = table.to_batch().unwrap();
        assert!(batch.column(1).is_null(0));
        assert!(!batch.column(1).is_null(1));
    }

    #[test]
    fn test_read_csv_missing_file() {
        let temp = tempdir().unwrap();
        let err = read_csv(
            &ReadTarget::Path(temp.path().join("nope.csv")),
            &ReaderOptions::new(),
        )
        .unwrap_err();
        assert!(matches!(err, CacherError::SourceUnavailable { .. }));
    }

    #[test]
    fn test_read_csv_bad_option() {
        let temp = tempdir().unwrap();
        let path = write(temp.path(), "a.csv", "a\n1\n");

        let options = ReaderOptions::new().with("delimiter", ";;");
        let err = read_csv(&ReadTarget::Path(path), &options).unwrap_err();
        assert!(matches!(err, CacherError::InvalidOption { .. }));
    }

    #[test]
    fn test_read_csv_rejects_query_target() {
        let err = read_csv(&ReadTarget::Query("SELECT 1".into()), &ReaderOptions::new()).unwrap_err();
        assert!(matches!(err, CacherError::SourceUnavailable { .. }));
    }
}
