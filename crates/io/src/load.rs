use std::path::{Path, PathBuf};
use std::thread;

use rebate_recon::config::FilesConfig;
use rebate_recon::{DatasetKind, Datasets, Table};

use crate::error::IoError;

/// Parse one tabular source of the given kind, picking the reader by file
/// extension.
pub fn load_table(path: &Path, kind: DatasetKind) -> Result<Table, IoError> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();

    let table = match ext.as_str() {
        "csv" | "txt" => crate::csv::import(path, kind.required_columns())?,
        "tsv" | "tab" => crate::csv::import_tsv(path)?,
        "xlsx" | "xlsm" | "xls" | "xlsb" | "ods" => crate::xlsx::import(path)?,
        _ => return Err(IoError::UnsupportedFormat(path.to_path_buf())),
    };

    log::debug!("{kind}: loaded {} rows from {}", table.len(), path.display());
    Ok(table)
}

/// Resolve a configured path against the directory holding the config file.
pub fn resolve(base_dir: &Path, file: &str) -> PathBuf {
    let p = Path::new(file);
    if p.is_absolute() {
        p.to_path_buf()
    } else {
        base_dir.join(p)
    }
}

/// Load all four datasets on scoped threads and wait for every one of them.
///
/// When several sources fail, the error for the first in
/// billback / item_ref / ppm / states order is returned.
pub fn load_datasets(files: &FilesConfig, base_dir: &Path) -> Result<Datasets, IoError> {
    let sources = DatasetKind::ALL.map(|kind| (kind, resolve(base_dir, files.path_for(kind))));

    let [billback, item_ref, ppm, states] = thread::scope(|s| {
        let handles = sources
            .each_ref()
            .map(|(kind, path)| (path, s.spawn(move || load_table(path, *kind))));
        handles.map(|(path, handle)| {
            handle
                .join()
                .unwrap_or_else(|_| Err(IoError::read(path, "loader thread panicked")))
        })
    });
    let (billback, item_ref, ppm, states) = (billback?, item_ref?, ppm?, states?);

    let datasets =
        Datasets::from_tables(billback, item_ref, ppm, states).map_err(IoError::Dataset)?;

    log::info!(
        "loaded {} billback, {} item reference, {} ppm, {} state rows",
        datasets.billback.len(),
        datasets.item_ref.len(),
        datasets.ppm.len(),
        datasets.states.len()
    );
    Ok(datasets)
}
