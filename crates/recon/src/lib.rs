//! `rebate-recon`: billback vs. PPM rebate reconciliation engine.
//!
//! Pure engine crate: receives parsed tables, enriches and filters them, and
//! returns per-material results with summary statistics. File formats and
//! the command line live in `rebate-io` and `rebate-cli`.

pub mod aggregate;
pub mod config;
pub mod dates;
pub mod engine;
pub mod enrich;
pub mod error;
pub mod filter;
pub mod insights;
pub mod model;
pub mod options;
pub mod overrides;
pub mod session;
pub mod source;

pub use aggregate::compute_stats;
pub use config::{ReconConfig, ToleranceConfig};
pub use engine::reconcile;
pub use error::{OverrideError, ReconError};
pub use filter::Selection;
pub use model::{Cell, Comment, DatasetKind, Datasets, ResultRow, RowId, StatsSummary, Table};
pub use overrides::{ManualMatch, ManualMatches};
pub use session::{Analysis, AnalysisOutcome, AnalysisSession, SessionStore};
