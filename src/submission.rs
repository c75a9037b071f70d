//! The final submission artifact.
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::Local;

use crate::data::VisitTable;
use crate::error::PipelineError;
use crate::predictions::PredictionMap;

/// Writes the `row_id,shop_id` result file, timestamped so repeated runs
/// never overwrite each other.
#[derive(Debug, Clone)]
pub struct ResultWriter {
    out_dir: PathBuf,
    prefix: String,
}

impl ResultWriter {
    pub fn new(out_dir: impl Into<PathBuf>, prefix: impl Into<String>) -> Self {
        Self {
            out_dir: out_dir.into(),
            prefix: prefix.into(),
        }
    }

    /// Write the predictions and return the created path.
    ///
    /// With `test_data`, rows follow the table's native `row_id` order and a
    /// row id that was never predicted is fatal; without it, rows follow the
    /// map's insertion order.
    pub fn write(
        &self,
        predictions: &PredictionMap,
        test_data: Option<&VisitTable>,
    ) -> Result<PathBuf> {
        fs::create_dir_all(&self.out_dir).with_context(|| {
            format!("Failed to create result directory {}", self.out_dir.display())
        })?;

        let timestamp = Local::now().format("%Y-%m-%d-%H-%M-%S");
        let path = self
            .out_dir
            .join(format!("{}_res_{}.csv", self.prefix, timestamp));
        let file = File::create(&path)
            .with_context(|| format!("Failed to create result file {}", path.display()))?;
        let mut writer = BufWriter::new(file);
        write_into(predictions, test_data, &mut writer)?;
        writer
            .flush()
            .with_context(|| format!("Failed to flush result file {}", path.display()))?;

        log::info!("wrote {} predictions to {}", predictions.len(), path.display());
        Ok(path)
    }
}

/// Serialize the two-column result to any writer.
pub fn write_into<W: Write>(
    predictions: &PredictionMap,
    test_data: Option<&VisitTable>,
    writer: &mut W,
) -> Result<()> {
    writeln!(writer, "row_id,shop_id")?;
    match test_data {
        Some(table) => {
            for row_id in &table.row_id {
                let shop_id = predictions
                    .get(row_id)
                    .ok_or_else(|| PipelineError::MissingRowId(row_id.clone()))?;
                writeln!(writer, "{},{}", row_id, shop_id)?;
            }
        }
        None => {
            for (row_id, shop_id) in predictions.iter() {
                writeln!(writer, "{},{}", row_id, shop_id)?;
            }
        }
    }
    Ok(())
}
