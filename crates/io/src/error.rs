use std::fmt;
use std::path::{Path, PathBuf};

use rebate_recon::ReconError;

#[derive(Debug)]
pub enum IoError {
    /// File could not be opened or read.
    Read { path: PathBuf, message: String },
    /// File was read but its contents could not be parsed as a table.
    Parse { path: PathBuf, message: String },
    /// Extension is not one of the supported table formats.
    UnsupportedFormat(PathBuf),
    /// A loaded table failed the input-shape check.
    Dataset(ReconError),
    /// Export target could not be written.
    Write { path: PathBuf, message: String },
}

impl IoError {
    pub(crate) fn read(path: &Path, e: impl fmt::Display) -> Self {
        Self::Read {
            path: path.to_path_buf(),
            message: e.to_string(),
        }
    }

    pub(crate) fn parse(path: &Path, e: impl fmt::Display) -> Self {
        Self::Parse {
            path: path.to_path_buf(),
            message: e.to_string(),
        }
    }

    pub(crate) fn write(path: &Path, e: impl fmt::Display) -> Self {
        Self::Write {
            path: path.to_path_buf(),
            message: e.to_string(),
        }
    }
}

impl fmt::Display for IoError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Read { path, message } => write!(f, "cannot read {}: {message}", path.display()),
            Self::Parse { path, message } => write!(f, "cannot parse {}: {message}", path.display()),
            Self::UnsupportedFormat(path) => write!(
                f,
                "unsupported file type: {} (expected .csv, .tsv, .txt, .xlsx, .xls, .xlsb or .ods)",
                path.display()
            ),
            Self::Dataset(e) => write!(f, "{e}"),
            Self::Write { path, message } => write!(f, "cannot write {}: {message}", path.display()),
        }
    }
}

impl std::error::Error for IoError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Dataset(e) => Some(e),
            _ => None,
        }
    }
}
