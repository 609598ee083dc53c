// JSON export

use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use serde::Serialize;

use crate::error::IoError;

/// Pretty-print any serializable report (usually a full `Analysis`).
pub fn export<T: Serialize>(value: &T, path: &Path) -> Result<(), IoError> {
    let file = File::create(path).map_err(|e| IoError::write(path, e))?;
    let writer = BufWriter::new(file);
    serde_json::to_writer_pretty(writer, value).map_err(|e| IoError::write(path, e))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rebate_recon::StatsSummary;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_json_export() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("stats.json");
        let stats = StatsSummary {
            total_records: 3,
            perfect_matches: 3,
            percent_matched: 100.0,
            ..StatsSummary::default()
        };

        export(&stats, &path).unwrap();

        let parsed: StatsSummary = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(parsed, stats);
    }

    #[test]
    fn test_json_export_bad_path() {
        let err = export(&1, Path::new("/no/such/dir/out.json")).unwrap_err();
        assert!(matches!(err, IoError::Write { .. }));
    }
}
