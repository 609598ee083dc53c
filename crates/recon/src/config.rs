use serde::Deserialize;

use crate::error::ReconError;
use crate::filter::Selection;
use crate::model::{DatasetKind, RowId};
use crate::overrides::{ManualMatch, ManualMatches};

/// Currency-rounding epsilon below which a variance counts as a match.
pub const DEFAULT_VARIANCE_TOLERANCE: f64 = 0.01;

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReconConfig {
    pub name: String,
    pub files: FilesConfig,
    #[serde(default)]
    pub selection: Option<Selection>,
    #[serde(default)]
    pub tolerance: ToleranceConfig,
    #[serde(default)]
    pub manual_match: Vec<ManualMatchConfig>,
    #[serde(default)]
    pub output: OutputConfig,
}

/// Source paths for the four datasets, relative to the config file.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FilesConfig {
    pub billback: String,
    pub item_ref: String,
    pub ppm: String,
    pub states: String,
}

impl FilesConfig {
    pub fn path_for(&self, kind: DatasetKind) -> &str {
        match kind {
            DatasetKind::Billback => &self.billback,
            DatasetKind::ItemRef => &self.item_ref,
            DatasetKind::Ppm => &self.ppm,
            DatasetKind::States => &self.states,
        }
    }
}

// ---------------------------------------------------------------------------
// Tolerance + overrides + output
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ToleranceConfig {
    #[serde(default = "default_variance")]
    pub variance: f64,
}

fn default_variance() -> f64 {
    DEFAULT_VARIANCE_TOLERANCE
}

impl Default for ToleranceConfig {
    fn default() -> Self {
        Self {
            variance: DEFAULT_VARIANCE_TOLERANCE,
        }
    }
}

/// One `[[manual_match]]` entry. Rows are 0-based positions among the
/// non-blank data rows of the billback and PPM source files (header excluded,
/// blank rows not counted).
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ManualMatchConfig {
    pub billback_row: usize,
    pub ppm_row: usize,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OutputConfig {
    #[serde(default)]
    pub json: Option<String>,
    #[serde(default)]
    pub csv: Option<String>,
    #[serde(default)]
    pub xlsx: Option<String>,
}

// ---------------------------------------------------------------------------
// Parse + Validate
// ---------------------------------------------------------------------------

impl ReconConfig {
    pub fn from_toml(input: &str) -> Result<Self, ReconError> {
        let config: ReconConfig =
            toml::from_str(input).map_err(|e| ReconError::ConfigParse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ReconError> {
        for kind in DatasetKind::ALL {
            if self.files.path_for(kind).trim().is_empty() {
                return Err(ReconError::ConfigValidation(format!(
                    "files.{kind} must not be empty"
                )));
            }
        }

        let tol = self.tolerance.variance;
        if !tol.is_finite() || tol < 0.0 {
            return Err(ReconError::ConfigValidation(format!(
                "tolerance.variance must be a non-negative number, got {tol}"
            )));
        }

        if let Some(ref selection) = self.selection {
            selection
                .validate()
                .map_err(|e| ReconError::ConfigValidation(e.to_string()))?;
        }

        if !self.manual_match.is_empty() && self.selection.is_none() {
            return Err(ReconError::ConfigValidation(
                "manual_match entries require a [selection]".into(),
            ));
        }

        Ok(())
    }

    /// Manual matches as an override set (duplicates collapse).
    pub fn manual_matches(&self) -> ManualMatches {
        self.manual_match
            .iter()
            .map(|m| ManualMatch {
                billback: RowId(m.billback_row),
                ppm: RowId(m.ppm_row),
            })
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
