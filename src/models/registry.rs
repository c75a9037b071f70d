use crate::config::PipelineConfig;
use crate::models::classifier::Classifier;
use crate::models::random_forest::{RandomForestClassifier, RandomForestParams};

type Constructor = Box<dyn Fn() -> Box<dyn Classifier>>;

/// Ordered registry of named classifier constructors.
///
/// The training loop asks the registry for fresh, untrained instances once
/// per mall; every entry is trained independently and reported separately.
#[derive(Default)]
pub struct ClassifierRegistry {
    entries: Vec<(String, Constructor)>,
}

impl ClassifierRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The built-in lineup: a single random forest parameterized from the
    /// pipeline config (seed and worker count are explicit, never ambient).
    pub fn with_defaults(config: &PipelineConfig) -> Self {
        let params = RandomForestParams {
            n_jobs: config.worker_count(),
            random_state: config.random_state,
            ..RandomForestParams::default()
        };
        let mut registry = Self::new();
        registry.register("random forest", move || {
            Box::new(RandomForestClassifier::new(params.clone()))
        });
        registry
    }

    pub fn register<F>(&mut self, name: impl Into<String>, constructor: F)
    where
        F: Fn() -> Box<dyn Classifier> + 'static,
    {
        self.entries.push((name.into(), Box::new(constructor)));
    }

    /// Freshly constructed, untrained instances, in registration order.
    pub fn build_all(&self) -> Vec<(String, Box<dyn Classifier>)> {
        self.entries
            .iter()
            .map(|(name, ctor)| (name.clone(), ctor()))
            .collect()
    }

    pub fn names(&self) -> Vec<&str> {
        self.entries.iter().map(|(name, _)| name.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
