//! Result records and the per-request view state.

use std::fmt;

/// Total degree as stored in the `records` table.
///
/// The column has no enforced type in the published databases, so every
/// SQLite storage class is kept as-is and only formatted for display.
#[derive(Debug, Clone, PartialEq)]
pub enum Degree {
    Integer(i64),
    Real(f64),
    Text(String),
    Missing,
}

impl fmt::Display for Degree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Degree::Integer(n) => write!(f, "{}", n),
            // Integral reals keep a trailing ".0"
            Degree::Real(x) if x.is_finite() && x.fract() == 0.0 => write!(f, "{:.1}", x),
            Degree::Real(x) => write!(f, "{}", x),
            Degree::Text(s) => f.write_str(s),
            Degree::Missing => Ok(()),
        }
    }
}

/// One row of the `records` table
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub seating_no: String,
    pub arabic_name: String,
    pub total_degree: Degree,
}

/// Outcome of one request, decides which block the page renders.
///
/// `Found` and `NotFound` are told apart by whether storage returned a row,
/// never by the contents of the record.
#[derive(Debug, Clone, PartialEq)]
pub enum ViewState {
    /// Initial page load, or a submission that was blank after trimming
    NoQuery,
    Found { query: String, record: Record },
    NotFound { query: String },
}

impl ViewState {
    /// The trimmed seating number to echo back into the search field
    pub fn query(&self) -> &str {
        match self {
            ViewState::NoQuery => "",
            ViewState::Found { query, .. } | ViewState::NotFound { query } => query,
        }
    }

    /// Short label for logs
    pub fn label(&self) -> &'static str {
        match self {
            ViewState::NoQuery => "no_query",
            ViewState::Found { .. } => "found",
            ViewState::NotFound { .. } => "not_found",
        }
    }
}
