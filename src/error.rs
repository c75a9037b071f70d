use std::error::Error;
use std::fmt;

/// Fatal pipeline failures with a dedicated shape.
///
/// I/O and classifier failures travel as `anyhow` context chains; these two
/// variants cover the decisions this crate makes itself. Nothing here is
/// recoverable: every failure aborts the run.
#[derive(Debug)]
pub enum PipelineError {
    /// Row counts disagree where they must be aligned (vectorizer output vs.
    /// filtered input, predictions vs. carried row ids).
    ShapeMismatch {
        context: &'static str,
        expected: usize,
        found: usize,
    },
    /// A row id expected in the prediction map was never predicted.
    MissingRowId(String),
}

impl fmt::Display for PipelineError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            PipelineError::ShapeMismatch {
                context,
                expected,
                found,
            } => write!(
                f,
                "row count mismatch in {}: expected {} rows, found {}",
                context, expected, found
            ),
            PipelineError::MissingRowId(row_id) => {
                write!(f, "row_id '{}' has no prediction", row_id)
            }
        }
    }
}

impl Error for PipelineError {}
