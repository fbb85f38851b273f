//! crates/em_io/src/lib.rs
//! I/O crate for the entry matcher.
//!
//! - Header-less CSV input tables (vacancies, preferences, ratings) and
//!   assignment files, in `tables`.
//! - Parameter files and one-shot loading with input digests, in `loader`.
//! - Canonical JSON (sorted keys, compact) with atomic writes, in `canonical_json`.
//! - SHA-256 lowercase hex digests, in `hasher`.
//!
//! Shared error type `IoError`; every variant carries the offending path.

#![forbid(unsafe_code)]

use std::path::Path;

use thiserror::Error;

/// Unified error for em_io.
#[derive(Debug, Error)]
pub enum IoError {
    /// Opening or reading an input file failed.
    #[error("read {path}: {msg}")]
    Read { path: String, msg: String },

    /// The CSV layer could not decode a record.
    #[error("{path}:{line}: csv error: {msg}")]
    Csv { path: String, line: u64, msg: String },

    /// A record decoded fine but violates the table's rules. `line` is 0 for
    /// whole-file problems (e.g. a missing group row).
    #[error("{path}:{line}: {msg}")]
    Validation { path: String, line: u64, msg: String },

    /// Writing an output file failed.
    #[error("write {path}: {msg}")]
    Write { path: String, msg: String },

    /// JSON parse/serialize errors (parameter file, run summary).
    #[error("json error at {pointer}: {msg}")]
    Json { pointer: String, msg: String },
}

pub type IoResult<T> = Result<T, IoError>;

impl IoError {
    pub(crate) fn read(path: &Path, e: impl ToString) -> Self {
        IoError::Read { path: path.display().to_string(), msg: e.to_string() }
    }

    pub(crate) fn write(path: &Path, e: impl ToString) -> Self {
        IoError::Write { path: path.display().to_string(), msg: e.to_string() }
    }

    pub(crate) fn invalid(path: &str, line: u64, msg: impl Into<String>) -> Self {
        IoError::Validation { path: path.to_string(), line, msg: msg.into() }
    }
}

impl From<serde_json::Error> for IoError {
    fn from(e: serde_json::Error) -> Self {
        // serde_json reports line/column rather than a pointer; keep the root.
        IoError::Json { pointer: "/".to_string(), msg: e.to_string() }
    }
}

pub mod canonical_json;
pub mod hasher;
pub mod loader;
pub mod tables;

pub mod prelude {
    pub use crate::{IoError, IoResult};

    pub use crate::canonical_json::{to_canonical_json_bytes, write_canonical_file};
    pub use crate::hasher::{sha256_hex, InputDigests};
    pub use crate::loader::{load_params, load_tables, InputPaths, LoadedTables};
    pub use crate::tables::{
        read_assignment, write_assignment, Capacity, PreferenceRow, RatingRow, RatingDefect,
        VacancyTable,
    };
}
