//! Per-mall feature assembly.
//!
//! Filters the input table to one mall, runs the ordered vectorizer list,
//! and horizontally stacks their outputs into a single sparse matrix. Row
//! ids ride along explicitly so predictions can be joined back by identifier
//! instead of by position.
use anyhow::{bail, Context, Result};

use crate::data::VisitTable;
use crate::error::PipelineError;
use crate::math::CsrMatrix;

use super::vectorizer::{Phase, Vectorizer};

/// Feature matrix for one mall plus the row-aligned labels and row ids.
///
/// `y` is empty when no ground truth was supplied.
#[derive(Debug, Clone)]
pub struct MallMatrix {
    pub x: CsrMatrix,
    pub y: Vec<String>,
    pub row_ids: Vec<String>,
}

/// Build the feature matrix for `mall_id`.
///
/// # Arguments
///
/// * `mall_id` - The mall to filter to (exact equality on the mall column)
/// * `vectorizers` - Ordered vectorizer list; outputs are stacked in this order
/// * `data` - The full visit table; only matching rows are vectorized
/// * `labels` - Optional target labels, index-aligned with `data`; filtered
///   with the same mall mask
/// * `phase` - `Train` calls `fit_transform`, `Test` calls `transform`
///
/// # Returns
///
/// A [`MallMatrix`] whose row count equals the number of matching rows and
/// whose column count is the sum of the vectorizer widths. Every vectorizer
/// must return one row per filtered input row; a mismatch is a fatal shape
/// error.
pub fn assemble(
    mall_id: &str,
    vectorizers: &mut [Box<dyn Vectorizer>],
    data: &VisitTable,
    labels: Option<&[String]>,
    phase: Phase,
) -> Result<MallMatrix> {
    if vectorizers.is_empty() {
        bail!("no vectorizers configured");
    }

    let mask = data.mall_mask(mall_id);
    let filtered = data.filter(&mask);
    let y = match labels {
        Some(labels) => mask
            .iter()
            .enumerate()
            .filter(|&(_, &keep)| keep)
            .map(|(i, _)| labels[i].clone())
            .collect(),
        None => Vec::new(),
    };

    let mut blocks = Vec::with_capacity(vectorizers.len());
    for vectorizer in vectorizers.iter_mut() {
        let block = match phase {
            Phase::Train => vectorizer.fit_transform(&filtered, mall_id),
            Phase::Test => vectorizer.transform(&filtered, mall_id),
        }
        .with_context(|| {
            format!(
                "vectorizer '{}' failed on mall {} ({})",
                vectorizer.name(),
                mall_id,
                phase.as_str()
            )
        })?;
        if block.nrows() != filtered.len() {
            return Err(PipelineError::ShapeMismatch {
                context: "vectorizer output",
                expected: filtered.len(),
                found: block.nrows(),
            })
            .with_context(|| format!("vectorizer '{}' on mall {}", vectorizer.name(), mall_id));
        }
        blocks.push(block);
    }

    let x = CsrMatrix::hstack(&blocks)
        .with_context(|| format!("stacking feature blocks for mall {}", mall_id))?;
    log::debug!(
        "assembled mall {} ({}): {} rows x {} columns",
        mall_id,
        phase.as_str(),
        x.nrows(),
        x.ncols()
    );

    Ok(MallMatrix {
        x,
        y,
        row_ids: filtered.row_id,
    })
}

/// Build train and test matrices for one mall in one call.
///
/// The same vectorizer list serves both phases, so state fitted on training
/// rows is available when test rows are transformed.
pub fn assemble_train_test(
    mall_id: &str,
    vectorizers: &mut [Box<dyn Vectorizer>],
    train_data: &VisitTable,
    train_labels: &[String],
    test_data: &VisitTable,
    test_labels: Option<&[String]>,
) -> Result<(MallMatrix, MallMatrix)> {
    let train = assemble(
        mall_id,
        vectorizers,
        train_data,
        Some(train_labels),
        Phase::Train,
    )?;
    let test = assemble(mall_id, vectorizers, test_data, test_labels, Phase::Test)?;
    Ok((train, test))
}
