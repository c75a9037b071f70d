//! Train/test partitioning.
//!
//! Both splitters are pure: they reorder nothing and validate nothing. The
//! caller is responsible for pre-sorting when the ratio split should carry
//! time semantics, and for row-aligning `y` with `x`; a shorter `y` fails
//! loudly on out-of-range access instead of silently truncating.
use crate::data::VisitTable;

/// Positional row access shared by table-like and array-like containers.
///
/// The contract is "give me rows `start..end` in input order"; both splitters
/// are written against this seam so a feature table and a plain label vector
/// partition identically.
pub trait RowPartition: Sized {
    fn n_rows(&self) -> usize;
    fn take_rows(&self, start: usize, end: usize) -> Self;
}

impl<T: Clone> RowPartition for Vec<T> {
    fn n_rows(&self) -> usize {
        self.len()
    }

    fn take_rows(&self, start: usize, end: usize) -> Self {
        self[start..end].to_vec()
    }
}

/// Hold out the trailing `test_size` fraction of rows.
///
/// # Arguments
///
/// * `x` - The feature table; its row count drives the cut point
/// * `y` - The labels, row-aligned with `x`
/// * `test_size` - Fraction in (0, 1) to hold out
///
/// # Returns
///
/// `(x_train, x_test, y_train, y_test)` where the first
/// `floor((1 - test_size) * n)` rows form the training partition and the
/// remainder the test partition, in the input's row order.
pub fn train_test_split<X, Y>(x: &X, y: &Y, test_size: f64) -> (X, X, Y, Y)
where
    X: RowPartition,
    Y: RowPartition,
{
    let n = x.n_rows();
    let train_size = ((1.0 - test_size) * n as f64) as usize;
    (
        x.take_rows(0, train_size),
        x.take_rows(train_size, n),
        y.take_rows(0, train_size),
        y.take_rows(train_size, y.n_rows()),
    )
}

/// Partition by a fixed timestamp cutoff.
///
/// Rows with `time_stamp >= cutoff` land in the first (recent) partition,
/// the rest in the second. Deterministic under stable input ordering; the
/// partition sizes depend entirely on the data.
pub fn split_by_time_threshold(
    x: &VisitTable,
    y: &[String],
    cutoff: &str,
) -> (VisitTable, VisitTable, Vec<String>, Vec<String>) {
    let mask: Vec<bool> = x.time_stamp.iter().map(|t| t.as_str() >= cutoff).collect();
    let inverse: Vec<bool> = mask.iter().map(|&m| !m).collect();

    let pick_labels = |keep: &[bool]| -> Vec<String> {
        keep.iter()
            .enumerate()
            .filter(|&(_, &m)| m)
            .map(|(i, _)| y[i].clone())
            .collect()
    };

    (
        x.filter(&mask),
        x.filter(&inverse),
        pick_labels(&mask),
        pick_labels(&inverse),
    )
}
