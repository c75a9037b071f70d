//! The vectorizer capability and its cache-or-compute wrapper.
use std::path::PathBuf;

use anyhow::Result;

use crate::data::VisitTable;
use crate::math::CsrMatrix;
use crate::persist;

/// Which half of a run a matrix belongs to; keys cached artifacts and names
/// persisted model files.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Train,
    Test,
}

impl Phase {
    pub fn as_str(self) -> &'static str {
        match self {
            Phase::Train => "train",
            Phase::Test => "test",
        }
    }
}

/// Turns raw visit records into numeric feature columns for one mall.
///
/// Implementations must return one output row per input row. `fit_transform`
/// may record fitted state (a vocabulary, observed wifi ids, ...) that
/// `transform` then reuses on test data; stateless vectorizers simply ignore
/// the distinction.
pub trait Vectorizer {
    fn name(&self) -> &str;

    /// Fit on training rows of `mall_id` and return their feature matrix.
    fn fit_transform(&mut self, data: &VisitTable, mall_id: &str) -> Result<CsrMatrix>;

    /// Transform test rows using state fitted by `fit_transform`.
    fn transform(&self, data: &VisitTable, mall_id: &str) -> Result<CsrMatrix>;
}

/// On-disk cache of computed feature matrices, keyed by phase and mall.
///
/// The fit-or-load decision is an explicit lookup with a compute fallback,
/// not a flag threaded through every call: if an artifact exists it is
/// loaded, otherwise the closure runs and its result is persisted.
#[derive(Debug, Clone)]
pub struct FeatureStore {
    base_dir: PathBuf,
    tag: String,
}

impl FeatureStore {
    /// `tag` distinguishes vectorizers sharing one base directory.
    pub fn new(base_dir: impl Into<PathBuf>, tag: impl Into<String>) -> Self {
        Self {
            base_dir: base_dir.into(),
            tag: tag.into(),
        }
    }

    fn artifact_path(&self, phase: Phase, mall_id: &str) -> PathBuf {
        self.base_dir
            .join(&self.tag)
            .join(format!("{}_{}.bin.gz", phase.as_str(), mall_id))
    }

    /// Load the cached matrix for `(phase, mall_id)`, or compute, persist and
    /// return it.
    pub fn load_or_compute<F>(&self, phase: Phase, mall_id: &str, compute: F) -> Result<CsrMatrix>
    where
        F: FnOnce() -> Result<CsrMatrix>,
    {
        let path = self.artifact_path(phase, mall_id);
        if path.is_file() {
            log::debug!("feature cache hit: {}", path.display());
            return persist::read_compressed(&path);
        }
        let matrix = compute()?;
        persist::write_compressed(&matrix, &path)?;
        Ok(matrix)
    }
}

/// A vectorizer composed with a [`FeatureStore`].
///
/// Repeated runs over the same data skip the inner computation entirely. The
/// cache key carries no fingerprint of the input rows, so the store directory
/// must be cleared when the underlying data changes.
pub struct CachedVectorizer<V> {
    inner: V,
    store: FeatureStore,
}

impl<V: Vectorizer> CachedVectorizer<V> {
    pub fn new(inner: V, store: FeatureStore) -> Self {
        Self { inner, store }
    }
}

impl<V: Vectorizer> Vectorizer for CachedVectorizer<V> {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn fit_transform(&mut self, data: &VisitTable, mall_id: &str) -> Result<CsrMatrix> {
        let inner = &mut self.inner;
        self.store
            .load_or_compute(Phase::Train, mall_id, || inner.fit_transform(data, mall_id))
    }

    fn transform(&self, data: &VisitTable, mall_id: &str) -> Result<CsrMatrix> {
        let inner = &self.inner;
        self.store
            .load_or_compute(Phase::Test, mall_id, || inner.transform(data, mall_id))
    }
}
