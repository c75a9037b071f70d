//! mall-locator: per-mall shop prediction for indoor visit data.
//!
//! This crate implements the orchestration layer of a mall-partitioned
//! multi-classifier pipeline: time-based train/test splitting, per-mall
//! feature assembly through pluggable vectorizers, one independently trained
//! classifier per mall, row-id keyed prediction aggregation, and optional
//! model/probability persistence plus a timestamped submission artifact.
//!
//! Vectorizer implementations and data loading live behind small traits
//! (`features::Vectorizer`, `io::DataSource`) so callers can substitute
//! their own; a CSV-backed data source and a compact multiclass random
//! forest are provided as working defaults.
pub mod config;
pub mod data;
pub mod error;
pub mod features;
pub mod io;
pub mod math;
pub mod models;
pub mod persist;
pub mod pipeline;
pub mod predictions;
pub mod split;
pub mod stats;
pub mod submission;
