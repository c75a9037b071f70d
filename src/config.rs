use serde::{Deserialize, Serialize};

/// Central configuration for the per-mall pipeline.
///
/// `random_state` seeds classifier construction only; the time-based splits
/// are deterministic and take no seed.
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct PipelineConfig {
    /// Fraction of (time-sorted) rows held out for evaluation.
    pub test_ratio: f64,
    /// Determinism seed passed to classifiers.
    pub random_state: u64,
    /// Worker count for classifiers that fit in parallel. `None` derives a
    /// value from the host CPU count once, at config construction.
    pub n_jobs: Option<usize>,
    /// Persist each fitted classifier per mall.
    pub save_model: bool,
    /// Persist per-class probability tables per mall.
    pub save_result_proba: bool,
    pub save_model_base_path: String,
    pub result_save_base_path: String,
    /// Directory for the final submission artifact.
    pub result_dir: String,
    /// Filename prefix for the submission artifact.
    pub result_prefix: String,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            test_ratio: 0.2,
            random_state: 42,
            n_jobs: None,
            save_model: false,
            save_result_proba: false,
            save_model_base_path: "./model_save".to_string(),
            result_save_base_path: "./result_save".to_string(),
            result_dir: "./result".to_string(),
            result_prefix: "mall-locator".to_string(),
        }
    }
}

impl PipelineConfig {
    /// Effective worker count: the explicit override, or the host-derived
    /// recommendation.
    pub fn worker_count(&self) -> usize {
        self.n_jobs.unwrap_or_else(recommended_worker_count)
    }
}

/// Derive a worker count from the host logical CPU count.
///
/// Desktop-class (Windows) hosts get half their CPUs, machines with 32 or
/// more logical CPUs keep headroom for other tenants, everything else keeps
/// a single CPU free.
pub fn recommended_worker_count() -> usize {
    let cpus = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    worker_count_for(cpus, cfg!(windows))
}

fn worker_count_for(cpus: usize, desktop: bool) -> usize {
    let workers = if desktop {
        cpus / 2
    } else if cpus >= 32 {
        cpus / 8 * 5 - 1
    } else {
        cpus.saturating_sub(1)
    };
    workers.max(1)
}
