use std::fmt;

use crate::model::{DatasetKind, RowId};

#[derive(Debug)]
pub enum ReconError {
    /// TOML parse / deserialization error.
    ConfigParse(String),
    /// Config validation error (empty file path, bad tolerance, etc.).
    ConfigValidation(String),
    /// A column the dataset kind needs is absent from the table headers.
    MissingColumn { dataset: DatasetKind, column: String },
    /// Selection could not be interpreted (unknown month, blank market).
    InvalidSelection(String),
    /// IO error (file read, etc.).
    Io(String),
}

impl fmt::Display for ReconError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ConfigParse(msg) => write!(f, "config parse error: {msg}"),
            Self::ConfigValidation(msg) => write!(f, "config validation error: {msg}"),
            Self::MissingColumn { dataset, column } => {
                write!(f, "{dataset}: missing column '{column}'")
            }
            Self::InvalidSelection(msg) => write!(f, "invalid selection: {msg}"),
            Self::Io(msg) => write!(f, "IO error: {msg}"),
        }
    }
}

impl std::error::Error for ReconError {}

/// Rejected manual-match mutation. The override set is left unchanged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OverrideError {
    /// No analysis has been run, so there is no filtered view to match within.
    NoActiveSelection,
    /// The billback row is not part of the current filtered set.
    UnknownBillbackRow(RowId),
    /// The PPM row is not part of the current filtered set.
    UnknownPpmRow(RowId),
    /// Unmatch requested for a pair that was never matched.
    NotMatched { billback: RowId, ppm: RowId },
}

impl fmt::Display for OverrideError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoActiveSelection => {
                write!(f, "run an analysis before creating manual matches")
            }
            Self::UnknownBillbackRow(id) => {
                write!(f, "billback row {id} is not in the current filtered set")
            }
            Self::UnknownPpmRow(id) => write!(f, "PPM row {id} is not in the current filtered set"),
            Self::NotMatched { billback, ppm } => {
                write!(f, "billback row {billback} and PPM row {ppm} are not matched")
            }
        }
    }
}

impl std::error::Error for OverrideError {}
