//! Fatal errors of the rostering engine.
//!
//! Constraint violations and unmet demand are not errors: they are reported
//! through [`Report`](crate::report::Report). Only conditions that make a
//! run meaningless surface here.

use thiserror::Error;

use crate::config::ConfigError;
use crate::validation::ValidationError;

/// Top-level error for engine operations.
#[derive(Debug, Error)]
pub enum RosterError {
    /// One or more input records are malformed or inconsistent.
    #[error("invalid input: {}", summarize(.0))]
    InvalidInput(Vec<ValidationError>),

    /// The roster contains no employees.
    #[error("roster is empty")]
    EmptyRoster,

    /// No shift slots exist for the requested period.
    #[error("no shift slots in period {start}..={end}")]
    EmptySlots {
        start: chrono::NaiveDate,
        end: chrono::NaiveDate,
    },

    /// A slot id passed to an operation does not exist.
    #[error("unknown slot: {0}")]
    UnknownSlot(String),

    /// Configuration could not be loaded or is invalid.
    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl From<Vec<ValidationError>> for RosterError {
    fn from(errors: Vec<ValidationError>) -> Self {
        RosterError::InvalidInput(errors)
    }
}

fn summarize(errors: &[ValidationError]) -> String {
    match errors {
        [] => "no details".to_string(),
        [only] => only.to_string(),
        [first, rest @ ..] => format!("{first} (and {} more)", rest.len()),
    }
}

/// Result type alias for engine operations.
pub type Result<T> = std::result::Result<T, RosterError>;
