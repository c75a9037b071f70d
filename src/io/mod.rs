//! Data input: the loader contract and a CSV-backed implementation.
pub mod csv_source;

pub use csv_source::CsvDataSource;

use anyhow::Result;

use crate::data::VisitTable;

/// The input collaborator of the pipeline.
///
/// Both tables must carry `row_id`, `mall_id` and `time_stamp`; the training
/// table additionally carries the `shop_id` target.
pub trait DataSource {
    /// Training visits joined with their mall metadata.
    fn read_train_join_mall(&self) -> Result<VisitTable>;

    /// The unlabeled test visits.
    fn read_test_data(&self) -> Result<VisitTable>;
}
