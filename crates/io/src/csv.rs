// CSV/TSV import and result export

use std::io::Read;
use std::path::Path;

use rebate_recon::source::load_csv_table;
use rebate_recon::{ResultRow, Table};

use crate::error::IoError;

/// Import a delimited file. `expected` names header columns the file should
/// carry; they steer delimiter detection when field counts alone are ambiguous.
pub fn import(path: &Path, expected: &[&str]) -> Result<Table, IoError> {
    let content = read_file_as_utf8(path)?;
    let delimiter = sniff_delimiter(&content, expected);
    log::debug!("{}: delimiter {:?}", path.display(), delimiter as char);
    load_csv_table(&content, delimiter).map_err(|e| IoError::parse(path, e))
}

pub fn import_tsv(path: &Path) -> Result<Table, IoError> {
    let content = read_file_as_utf8(path)?;
    load_csv_table(&content, b'\t').map_err(|e| IoError::parse(path, e))
}

/// Candidate delimiters, most preferred first.
const DELIMITERS: [u8; 4] = [b',', b'\t', b';', b'|'];

/// Pick the field delimiter for `content`.
///
/// Candidates that split the header row into a single field are out. The rest
/// are ranked by how many `expected` column names the header yields, then by
/// how many sample lines share the header's field count, then by field count.
/// Ties go to the more preferred delimiter.
fn sniff_delimiter(content: &str, expected: &[&str]) -> u8 {
    let sample: Vec<&str> = content
        .lines()
        .filter(|l| !l.trim().is_empty())
        .take(10)
        .collect();
    let Some(header) = sample.first() else {
        return b',';
    };

    DELIMITERS
        .iter()
        .rev()
        .filter_map(|&delim| {
            let fields = split_line(header, delim);
            if fields.len() <= 1 {
                return None;
            }
            let hits = expected
                .iter()
                .filter(|col| fields.iter().any(|f| f.trim_start_matches('\u{feff}') == **col))
                .count();
            let consistent = sample
                .iter()
                .filter(|line| split_line(line, delim).len() == fields.len())
                .count();
            Some(((hits, consistent, fields.len()), delim))
        })
        .max_by_key(|(rank, _)| *rank)
        .map_or(b',', |(_, delim)| delim)
}

fn split_line(line: &str, delimiter: u8) -> Vec<String> {
    csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(false)
        .flexible(true)
        .from_reader(line.as_bytes())
        .records()
        .next()
        .and_then(Result::ok)
        .map(|r| r.iter().map(str::to_string).collect())
        .unwrap_or_default()
}

/// Read file and convert to UTF-8 if needed (handles Windows-1252, Latin-1, etc.)
pub fn read_file_as_utf8(path: &Path) -> Result<String, IoError> {
    let mut file = std::fs::File::open(path).map_err(|e| IoError::read(path, e))?;
    let mut bytes = Vec::new();
    file.read_to_end(&mut bytes).map_err(|e| IoError::read(path, e))?;

    match String::from_utf8(bytes) {
        Ok(s) => Ok(s),
        Err(e) => {
            let bytes = e.into_bytes();
            // Excel-exported CSVs are usually Windows-1252
            log::debug!("{} is not UTF-8; decoding as Windows-1252", path.display());
            let (decoded, _, _) = encoding_rs::WINDOWS_1252.decode(&bytes);
            Ok(decoded.into_owned())
        }
    }
}

/// Write result rows with the report column names as the header.
pub fn export_results(results: &[ResultRow], path: &Path) -> Result<(), IoError> {
    let mut writer = csv::Writer::from_path(path).map_err(|e| IoError::write(path, e))?;
    for row in results {
        writer.serialize(row).map_err(|e| IoError::write(path, e))?;
    }
    writer.flush().map_err(|e| IoError::write(path, e))?;
    Ok(())
}
