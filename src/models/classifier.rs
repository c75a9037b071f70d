use std::path::Path;

use anyhow::Result;
use ndarray::Array2;

use crate::math::CsrMatrix;

/// Capability contract for the per-mall classifiers.
///
/// One instance is constructed fresh and trained per mall; nothing is shared
/// across malls. Labels are opaque shop ids; implementations map them to
/// whatever internal encoding they need and map back on prediction.
pub trait Classifier {
    /// Human readable name, used for reporting and artifact paths.
    fn name(&self) -> &str {
        "classifier"
    }

    /// Train on row-aligned features and labels.
    fn fit(&mut self, x: &CsrMatrix, y: &[String]) -> Result<()>;

    /// Predicted label per row, in row order.
    fn predict(&self, x: &CsrMatrix) -> Result<Vec<String>>;

    /// Per-class probabilities, one row per input row, columns ordered as
    /// [`classes`](Classifier::classes).
    fn predict_proba(&self, x: &CsrMatrix) -> Result<Array2<f64>>;

    /// Ordered label set seen during fit; empty before fitting.
    fn classes(&self) -> &[String];

    /// Persist the fitted model in its native serialization, compressed.
    fn save(&self, path: &Path) -> Result<()>;
}
