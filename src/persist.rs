//! Artifact persistence: compressed binary dumps and probability tables.
//!
//! Model and feature artifacts are bincode-encoded and gzip-compressed;
//! probability tables are plain CSV. Paths follow the
//! `{base}/{classifier}/{phase}_{mall_id}` pattern so repeated runs land
//! side by side.
use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use ndarray::Array2;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::features::Phase;

/// Create the parent directory of `path` if it does not exist yet.
pub fn ensure_parent_dir(path: &Path) -> Result<()> {
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create directory {}", dir.display()))?;
    }
    Ok(())
}

/// Serialize `value` with bincode and write it gzip-compressed.
pub fn write_compressed<T: Serialize>(value: &T, path: &Path) -> Result<()> {
    ensure_parent_dir(path)?;
    let bytes = bincode::serde::encode_to_vec(value, bincode::config::standard())
        .with_context(|| format!("Failed to encode artifact for {}", path.display()))?;
    let file = File::create(path)
        .with_context(|| format!("Failed to create artifact {}", path.display()))?;
    let mut encoder = GzEncoder::new(file, Compression::default());
    encoder
        .write_all(&bytes)
        .and_then(|_| encoder.finish().map(|_| ()))
        .with_context(|| format!("Failed to write artifact {}", path.display()))?;
    log::debug!("wrote artifact {}", path.display());
    Ok(())
}

/// Read back an artifact written by [`write_compressed`].
pub fn read_compressed<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let file =
        File::open(path).with_context(|| format!("Failed to open artifact {}", path.display()))?;
    let mut bytes = Vec::new();
    GzDecoder::new(file)
        .read_to_end(&mut bytes)
        .with_context(|| format!("Failed to decompress artifact {}", path.display()))?;
    let (value, _) = bincode::serde::decode_from_slice(&bytes, bincode::config::standard())
        .with_context(|| format!("Failed to decode artifact {}", path.display()))?;
    Ok(value)
}

/// `{base}/{classifier}/{phase}_{mall_id}.bin.gz`
pub fn model_artifact_path(base: &str, classifier: &str, phase: Phase, mall_id: &str) -> PathBuf {
    Path::new(base)
        .join(classifier)
        .join(format!("{}_{}.bin.gz", phase.as_str(), mall_id))
}

/// `{base}/{classifier}/{phase}_{mall_id}.csv`
pub fn proba_artifact_path(base: &str, classifier: &str, phase: Phase, mall_id: &str) -> PathBuf {
    Path::new(base)
        .join(classifier)
        .join(format!("{}_{}.csv", phase.as_str(), mall_id))
}

/// Write a per-class probability table: `row_id` plus one column per class,
/// one row per test visit.
pub fn write_probability_csv(
    path: &Path,
    row_ids: &[String],
    classes: &[String],
    proba: &Array2<f64>,
) -> Result<()> {
    anyhow::ensure!(
        proba.nrows() == row_ids.len(),
        "probability matrix has {} rows for {} row ids",
        proba.nrows(),
        row_ids.len()
    );
    anyhow::ensure!(
        proba.ncols() == classes.len(),
        "probability matrix has {} columns for {} classes",
        proba.ncols(),
        classes.len()
    );

    ensure_parent_dir(path)?;
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("Failed to create probability table {}", path.display()))?;

    let mut header = Vec::with_capacity(classes.len() + 1);
    header.push("row_id".to_string());
    header.extend(classes.iter().cloned());
    writer.write_record(&header)?;

    for (i, row_id) in row_ids.iter().enumerate() {
        let mut record = Vec::with_capacity(classes.len() + 1);
        record.push(row_id.clone());
        for j in 0..classes.len() {
            record.push(proba[(i, j)].to_string());
        }
        writer.write_record(&record)?;
    }
    writer
        .flush()
        .with_context(|| format!("Failed to flush probability table {}", path.display()))?;
    Ok(())
}
