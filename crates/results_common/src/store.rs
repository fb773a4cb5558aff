//! Read-only access to the results database.
//!
//! Every lookup opens its own read-only connection, reads at most one row and
//! drops the connection again. Nothing is cached between calls and the file
//! is never created, written or migrated from here.

use crate::record::{Degree, Record};
use rusqlite::types::ValueRef;
use rusqlite::{params, Connection, OpenFlags, OptionalExtension};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Columns the `records` table must carry
pub const REQUIRED_COLUMNS: [&str; 3] = ["seating_no", "arabic_name", "total_degree"];

const LOOKUP_SQL: &str =
    "SELECT seating_no, arabic_name, total_degree FROM records WHERE seating_no = ?1 LIMIT 1";

/// Storage failures during a lookup
#[derive(Debug, thiserror::Error)]
pub enum LookupError {
    /// File missing, unreadable, or not a database
    #[error("Failed to open results database {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    /// Statement or row decoding failed (missing table, corrupt page, ...)
    #[error("Results query failed: {0}")]
    Query(#[from] rusqlite::Error),

    /// The blocking lookup task did not complete
    #[error("Lookup task failed: {0}")]
    Task(String),
}

impl LookupError {
    /// Short kind for operator logs
    pub fn kind(&self) -> &'static str {
        match self {
            LookupError::Open { .. } => "open",
            LookupError::Query(_) => "query",
            LookupError::Task(_) => "task",
        }
    }
}

/// Shape of the `records` table as found on disk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaReport {
    pub table_present: bool,
    pub missing_columns: Vec<&'static str>,
}

impl SchemaReport {
    pub fn is_complete(&self) -> bool {
        self.table_present && self.missing_columns.is_empty()
    }
}

/// Handle on the results database file
#[derive(Debug, Clone)]
pub struct ResultsStore {
    path: PathBuf,
}

impl ResultsStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn open(&self) -> Result<Connection, LookupError> {
        Connection::open_with_flags(
            &self.path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .map_err(|source| LookupError::Open {
            path: self.path.clone(),
            source,
        })
    }

    /// Exact, case-sensitive match on `seating_no`.
    ///
    /// The key is always bound as a parameter. If the data holds duplicate
    /// keys the first row SQLite returns wins.
    pub fn lookup(&self, seating_no: &str) -> Result<Option<Record>, LookupError> {
        let conn = self.open()?;

        let record = conn
            .query_row(LOOKUP_SQL, params![seating_no], |row| {
                Ok(Record {
                    seating_no: text_value(row.get_ref(0)?),
                    arabic_name: text_value(row.get_ref(1)?),
                    total_degree: degree_value(row.get_ref(2)?),
                })
            })
            .optional()?;

        debug!(
            "Lookup for {:?}: {}",
            seating_no,
            if record.is_some() { "hit" } else { "miss" }
        );
        Ok(record)
    }

    /// Check that `records` exists with the expected columns
    pub fn inspect_schema(&self) -> Result<SchemaReport, LookupError> {
        let conn = self.open()?;
        let mut stmt = conn.prepare("PRAGMA table_info(records)")?;
        let columns = stmt
            .query_map([], |row| row.get::<_, String>(1))?
            .collect::<Result<Vec<_>, _>>()?;

        let missing_columns = REQUIRED_COLUMNS
            .iter()
            .copied()
            .filter(|required| !columns.iter().any(|c| c == required))
            .collect();

        Ok(SchemaReport {
            table_present: !columns.is_empty(),
            missing_columns,
        })
    }
}

fn text_value(value: ValueRef<'_>) -> String {
    match value {
        ValueRef::Null => String::new(),
        ValueRef::Integer(n) => n.to_string(),
        ValueRef::Real(x) => x.to_string(),
        ValueRef::Text(bytes) | ValueRef::Blob(bytes) => {
            String::from_utf8_lossy(bytes).into_owned()
        }
    }
}

fn degree_value(value: ValueRef<'_>) -> Degree {
    match value {
        ValueRef::Null => Degree::Missing,
        ValueRef::Integer(n) => Degree::Integer(n),
        ValueRef::Real(x) => Degree::Real(x),
        ValueRef::Text(bytes) | ValueRef::Blob(bytes) => {
            Degree::Text(String::from_utf8_lossy(bytes).into_owned())
        }
    }
}
