//! SQL reader - runs a query against a SQLite database

use rusqlite::types::Value as SqlValue;
use rusqlite::{Connection, OpenFlags};
use tracing::debug;

use crate::core::model::{ReaderOptions, Table};
use crate::error::{CacherError, CacherResult};
use crate::readers::columns::{build_table, Cell};
use crate::readers::ReadTarget;

/// Run a query and collect its result set
///
/// Options: `con` (required) names the SQLite database, as a path or a
/// `sqlite://path` URI. The database is opened read-only.
pub fn read_sql(target: &ReadTarget, options: &ReaderOptions) -> CacherResult<Table> {
    let query = match target {
        ReadTarget::Query(query) => query.clone(),
        ReadTarget::Path(path) => std::fs::read_to_string(path)
            .map_err(|e| CacherError::source_unavailable(path.display().to_string(), e))?,
    };

    let con = options
        .get_str("con")?
        .ok_or_else(|| CacherError::invalid_option("con", "a database connection is required"))?;

    let conn = open_connection(con)?;
    run_query(&conn, &query).map_err(|e| CacherError::source_unavailable(con, e))
}

fn open_connection(con: &str) -> CacherResult<Connection> {
    let path = con.strip_prefix("sqlite://").unwrap_or(con);
    debug!("Opening SQLite database {}", path);

    Connection::open_with_flags(
        path,
        OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
    )
    .map_err(|e| CacherError::source_unavailable(con, e))
}

fn run_query(conn: &Connection, query: &str) -> Result<Table, QueryError> {
    let mut stmt = conn.prepare(query.trim().trim_end_matches(';'))?;
    let headers: Vec<String> = stmt.column_names().iter().map(|n| n.to_string()).collect();
    let width = headers.len();

    let mut rows = stmt.query([])?;
    let mut cells = Vec::new();
    while let Some(row) = rows.next()? {
        let mut values = Vec::with_capacity(width);
        for i in 0..width {
            let value: SqlValue = row.get(i)?;
            values.push(cell_from_sql(value));
        }
        cells.push(values);
    }

    Ok(build_table(headers, cells)?)
}

/// Failure while preparing, stepping or collecting a query
#[derive(Debug, thiserror::Error)]
enum QueryError {
    #[error(transparent)]
    Sqlite(#[from] rusqlite::Error),

    #[error(transparent)]
    Table(#[from] CacherError),
}

fn cell_from_sql(value: SqlValue) -> Cell {
    match value {
        SqlValue::Null => Cell::Null,
        SqlValue::Integer(i) => Cell::Int(i),
        SqlValue::Real(f) => Cell::Float(f),
        SqlValue::Text(s) => Cell::Text(s),
        SqlValue::Blob(bytes) => Cell::Text(String::from_utf8_lossy(&bytes).to_string()),
    }
}
