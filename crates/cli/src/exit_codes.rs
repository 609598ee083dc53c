//! CLI Exit Code Registry
//!
//! This is the single source of truth for all `rrecon` exit codes.
//! Exit codes are part of the shell contract; scripts rely on them.
//!
//! | Code | Meaning                                                   |
//! |------|-----------------------------------------------------------|
//! | 0    | Success, no variance outside tolerance                    |
//! | 1    | Variance found (price mismatches or missing deals)        |
//! | 2    | CLI usage error (bad args, incomplete selection)          |
//! | 3    | Invalid analysis config (parse or validation failure)     |
//! | 4    | Runtime / IO error (unreadable file, missing column)      |
//! | 5    | No matching records for the selection on one or both sides|
//!
//! # Adding New Exit Codes
//!
//! 1. Add the constant
//! 2. Document what triggers it
//! 3. Update the table above
//! 4. Wire it into the relevant command's error handling

use rebate_io::IoError;

/// Success - command completed, nothing to follow up.
pub const EXIT_SUCCESS: u8 = 0;

/// Reconciliation finished but found price mismatches or missing deals.
/// Like `diff(1)`, exit 1 means "sources differ."
pub const EXIT_VARIANCE: u8 = 1;

/// Usage error - bad arguments, missing required options.
pub const EXIT_USAGE: u8 = 2;

/// Config file could not be parsed or failed validation.
pub const EXIT_INVALID_CONFIG: u8 = 3;

/// Input file unreadable, unparseable or missing a required column;
/// export target not writable.
pub const EXIT_RUNTIME: u8 = 4;

/// The selection matched no billback rows or no PPM rows.
pub const EXIT_NO_MATCHING_RECORDS: u8 = 5;

/// Hint shown under an IO error, if one helps.
pub fn io_hint(err: &IoError) -> Option<String> {
    match err {
        IoError::Dataset(_) => Some("check the header row of the named dataset".to_string()),
        IoError::UnsupportedFormat(_) => {
            Some("convert the file to .csv or .xlsx, or fix its extension".to_string())
        }
        IoError::Read { .. } => Some("paths in [files] are relative to the config file".to_string()),
        _ => None,
    }
}
