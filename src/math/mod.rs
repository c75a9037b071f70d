//! Small matrix types used throughout the crate.
//!
//! Feature matrices are sparse (vectorizer outputs are mostly one-hot style
//! columns), so the crate carries its own compressed-sparse-row container
//! with just the operations the pipeline needs.
pub mod sparse;

pub use sparse::CsrMatrix;
