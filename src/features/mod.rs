//! Feature construction: the vectorizer contract and the per-mall assembler.
pub mod assembler;
pub mod vectorizer;

pub use assembler::{assemble, assemble_train_test, MallMatrix};
pub use vectorizer::{CachedVectorizer, FeatureStore, Phase, Vectorizer};
