pub mod classifier;
pub mod random_forest;
pub mod registry;

pub use classifier::Classifier;
pub use random_forest::{RandomForestClassifier, RandomForestParams};
pub use registry::ClassifierRegistry;
