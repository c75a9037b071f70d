//! Pipeline orchestration: the per-mall training loop and its two drivers.
//!
//! Malls are processed strictly sequentially, classifiers within a mall
//! strictly sequentially; the only parallelism lives inside a classifier's
//! fit. There is no retry and no partial-result recovery: every failure
//! aborts the run.
use std::path::PathBuf;

use anyhow::{Context, Result};

use crate::config::PipelineConfig;
use crate::data::VisitTable;
use crate::error::PipelineError;
use crate::features::{assemble_train_test, Phase, Vectorizer};
use crate::io::DataSource;
use crate::models::ClassifierRegistry;
use crate::persist::{model_artifact_path, proba_artifact_path, write_probability_csv};
use crate::predictions::PredictionMap;
use crate::split::train_test_split;
use crate::stats::{accuracy, AccuracyReport};
use crate::submission::ResultWriter;

/// What a full pass over all malls produces.
///
/// `report` is empty outside evaluation mode; `mall_count` is the divisor
/// for mean accuracies.
#[derive(Debug, Clone)]
pub struct MallRunOutcome {
    pub predictions: PredictionMap,
    pub report: AccuracyReport,
    pub mall_count: usize,
}

/// Orchestrates per-mall training over a classifier registry.
pub struct MallPipeline {
    config: PipelineConfig,
    registry: ClassifierRegistry,
}

impl MallPipeline {
    /// Pipeline with the built-in classifier lineup.
    pub fn new(config: PipelineConfig) -> Self {
        let registry = ClassifierRegistry::with_defaults(&config);
        Self { config, registry }
    }

    pub fn with_registry(config: PipelineConfig, registry: ClassifierRegistry) -> Self {
        Self { config, registry }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Holdout evaluation: train on the earlier slice of the time-sorted
    /// training data, score on the later slice.
    ///
    /// Accuracy is logged per mall and summarized per classifier; the
    /// returned outcome carries the same numbers for inspection.
    pub fn evaluate(
        &self,
        source: &dyn DataSource,
        vectorizers: &mut [Box<dyn Vectorizer>],
    ) -> Result<MallRunOutcome> {
        let data = source
            .read_train_join_mall()
            .context("reading training data")?
            .sort_by_time_stamp();
        let labels = data.labels()?;
        let (train_data, test_data, train_labels, test_labels) =
            train_test_split(&data, &labels, self.config.test_ratio);

        self.train_by_mall(
            vectorizers,
            &train_data,
            &train_labels,
            &test_data,
            Some(test_labels.as_slice()),
        )
    }

    /// Train on all labeled data, predict the unlabeled test set, write the
    /// submission artifact and return its path.
    pub fn run_submission(
        &self,
        source: &dyn DataSource,
        vectorizers: &mut [Box<dyn Vectorizer>],
    ) -> Result<PathBuf> {
        let train_data = source
            .read_train_join_mall()
            .context("reading training data")?;
        let train_labels = train_data.labels()?;
        let test_data = source.read_test_data().context("reading test data")?;

        let outcome = self.train_by_mall(vectorizers, &train_data, &train_labels, &test_data, None)?;

        ResultWriter::new(&self.config.result_dir, self.config.result_prefix.clone())
            .write(&outcome.predictions, Some(&test_data))
    }

    /// The per-mall training loop.
    ///
    /// Iterates malls in first-seen order; for each, assembles aligned
    /// train/test matrices, trains every registry entry, merges predictions
    /// into the row-id keyed map, persists optional artifacts, and (in
    /// evaluation mode, i.e. when `test_labels` is given) accumulates
    /// per-mall accuracy.
    pub fn train_by_mall(
        &self,
        vectorizers: &mut [Box<dyn Vectorizer>],
        train_data: &VisitTable,
        train_labels: &[String],
        test_data: &VisitTable,
        test_labels: Option<&[String]>,
    ) -> Result<MallRunOutcome> {
        let evaluation = test_labels.is_some();
        // artifact naming follows the run mode, as the vectorizer cache
        // follows the data half
        let artifact_phase = if evaluation { Phase::Train } else { Phase::Test };

        let malls = train_data.unique_malls();
        let mut predictions = PredictionMap::new();
        let mut report = AccuracyReport::new();

        for (mall_idx, mall_id) in malls.iter().enumerate() {
            let (train_m, test_m) = assemble_train_test(
                mall_id,
                vectorizers,
                train_data,
                train_labels,
                test_data,
                test_labels,
            )?;
            log::debug!(
                "mall {}: {} train rows, {} test rows, {} feature columns",
                mall_id,
                train_m.x.nrows(),
                test_m.x.nrows(),
                train_m.x.ncols()
            );

            for (name, mut classifier) in self.registry.build_all() {
                classifier
                    .fit(&train_m.x, &train_m.y)
                    .with_context(|| format!("fitting '{}' on mall {}", name, mall_id))?;
                let predicted = classifier
                    .predict(&test_m.x)
                    .with_context(|| format!("predicting with '{}' on mall {}", name, mall_id))?;
                if predicted.len() != test_m.row_ids.len() {
                    return Err(PipelineError::ShapeMismatch {
                        context: "prediction merge",
                        expected: test_m.row_ids.len(),
                        found: predicted.len(),
                    })
                    .with_context(|| format!("classifier '{}' on mall {}", name, mall_id));
                }

                if self.config.save_model {
                    let path = model_artifact_path(
                        &self.config.save_model_base_path,
                        &name,
                        artifact_phase,
                        mall_id,
                    );
                    classifier
                        .save(&path)
                        .with_context(|| format!("saving '{}' model for mall {}", name, mall_id))?;
                }

                for (row_id, label) in test_m.row_ids.iter().zip(&predicted) {
                    predictions.insert(row_id, label);
                }

                if self.config.save_result_proba {
                    let proba = classifier
                        .predict_proba(&test_m.x)
                        .with_context(|| format!("probabilities of '{}' on mall {}", name, mall_id))?;
                    let path = proba_artifact_path(
                        &self.config.result_save_base_path,
                        &name,
                        artifact_phase,
                        mall_id,
                    );
                    write_probability_csv(&path, &test_m.row_ids, classifier.classes(), &proba)?;
                }

                if evaluation {
                    let score = accuracy(&test_m.y, &predicted);
                    report.record(&name, score);
                    log::info!(
                        "mall {} ({}/{}) '{}': accuracy {:.4}",
                        mall_id,
                        mall_idx + 1,
                        malls.len(),
                        name,
                        score
                    );
                } else {
                    log::info!(
                        "mall {} ({}/{}) '{}': {} predictions",
                        mall_id,
                        mall_idx + 1,
                        malls.len(),
                        name,
                        predicted.len()
                    );
                }
            }
        }

        if evaluation {
            report.log_summary(malls.len());
        }

        Ok(MallRunOutcome {
            predictions,
            report,
            mall_count: malls.len(),
        })
    }
}
