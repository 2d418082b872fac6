use crate::error::ExportError;
use chrono::{DateTime, Utc};
use core_types::AlignedDataset;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Serialize)]
struct ExportDocument<'a, M: Serialize> {
    generated_at: DateTime<Utc>,
    dataset: &'a AlignedDataset,
    metrics: &'a M,
}

#[derive(Deserialize)]
struct ImportDocument {
    dataset: AlignedDataset,
}

/// Writes the aligned dataset and its metrics as pretty JSON into `dir`.
///
/// The file is named after `generated_at` (`cryptopair_YYYYmmdd_HHMMSS.json`);
/// the directory is created if needed. Returns the written path.
pub fn export_dataset<M: Serialize>(
    dir: &Path,
    dataset: &AlignedDataset,
    metrics: &M,
    generated_at: DateTime<Utc>,
) -> Result<PathBuf, ExportError> {
    fs::create_dir_all(dir)?;
    let path = dir.join(format!(
        "cryptopair_{}.json",
        generated_at.format("%Y%m%d_%H%M%S")
    ));

    let document = ExportDocument {
        generated_at,
        dataset,
        metrics,
    };
    fs::write(&path, serde_json::to_vec_pretty(&document)?)?;

    tracing::info!(path = %path.display(), rows = dataset.len(), "Exported aligned dataset");
    Ok(path)
}

/// Reads back the dataset part of a file written by `export_dataset`.
///
/// The rows are re-validated, so a hand-edited file with unordered or
/// duplicate dates is rejected.
pub fn load_dataset(path: &Path) -> Result<AlignedDataset, ExportError> {
    let bytes = fs::read(path)?;
    let document: ImportDocument = serde_json::from_slice(&bytes)?;
    let loaded = document.dataset;

    let dataset = AlignedDataset::new(
        loaded.first(),
        loaded.second(),
        loaded.granularity(),
        loaded.rows().to_vec(),
    )?;
    Ok(dataset)
}
