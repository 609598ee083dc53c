// Table loading and result export

pub mod csv;
pub mod error;
pub mod json;
pub mod load;
pub mod xlsx;

use chrono::{DateTime, Utc};

pub use error::IoError;
pub use load::{load_datasets, load_table};

/// Default export file name: `dispute_analysis_results_<timestamp>.<ext>`,
/// with `:` and `.` in the timestamp replaced so it is filesystem-safe.
pub fn default_export_name(now: DateTime<Utc>, ext: &str) -> String {
    let stamp = now
        .to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
        .replace([':', '.'], "-");
    format!("dispute_analysis_results_{stamp}.{ext}")
}
