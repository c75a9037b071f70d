//! Multiclass random forest over sparse feature rows.
//!
//! Gini-split decision trees with per-node feature subsampling; probability
//! estimates average the per-tree leaf distributions. Tree building runs on
//! a scoped rayon pool sized by the configured worker count, which is the
//! only parallelism in the whole pipeline.
use std::path::Path;

use anyhow::{bail, Context, Result};
use ndarray::Array2;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::math::CsrMatrix;
use crate::models::classifier::Classifier;
use crate::persist;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RandomForestParams {
    pub n_estimators: usize,
    /// `None` grows trees until leaves are pure.
    pub max_depth: Option<usize>,
    pub min_samples_leaf: usize,
    /// Resample rows per tree; off by default, matching a forest whose
    /// diversity comes from feature subsampling alone.
    pub bootstrap: bool,
    pub n_jobs: usize,
    pub random_state: u64,
}

impl Default for RandomForestParams {
    fn default() -> Self {
        Self {
            n_estimators: 400,
            max_depth: None,
            min_samples_leaf: 1,
            bootstrap: false,
            n_jobs: 1,
            random_state: 42,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
enum Node {
    Leaf {
        /// Normalized class distribution of the training rows that reached
        /// this leaf.
        dist: Vec<f64>,
    },
    Split {
        feature: usize,
        threshold: f32,
        left: Box<Node>,
        right: Box<Node>,
    },
}

impl Node {
    fn distribution<'a>(&'a self, row: &[f32]) -> &'a [f64] {
        let mut node = self;
        loop {
            match node {
                Node::Leaf { dist } => return dist,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    node = if row[*feature] <= *threshold {
                        left
                    } else {
                        right
                    };
                }
            }
        }
    }
}

/// Fitted state; what [`RandomForestClassifier::save`] serializes.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct ForestModel {
    n_features: usize,
    classes: Vec<String>,
    trees: Vec<Node>,
}

pub struct RandomForestClassifier {
    params: RandomForestParams,
    model: Option<ForestModel>,
}

impl RandomForestClassifier {
    pub fn new(params: RandomForestParams) -> Self {
        Self {
            params,
            model: None,
        }
    }

    /// Restore a classifier from an artifact written by `save`.
    pub fn load(path: &Path) -> Result<Self> {
        let model: ForestModel = persist::read_compressed(path)?;
        Ok(Self {
            params: RandomForestParams::default(),
            model: Some(model),
        })
    }

    fn fitted(&self) -> Result<&ForestModel> {
        self.model
            .as_ref()
            .context("random forest has not been fitted")
    }

    fn proba_rows(&self, x: &CsrMatrix) -> Result<Array2<f64>> {
        let model = self.fitted()?;
        if x.ncols() != model.n_features {
            bail!(
                "feature matrix has {} columns, model was fitted on {}",
                x.ncols(),
                model.n_features
            );
        }
        let n_classes = model.classes.len();
        let mut proba = Array2::zeros((x.nrows(), n_classes));
        let mut row = vec![0.0f32; x.ncols()];
        for i in 0..x.nrows() {
            x.densify_row_into(i, &mut row);
            for tree in &model.trees {
                let dist = tree.distribution(&row);
                for (j, &p) in dist.iter().enumerate() {
                    proba[(i, j)] += p;
                }
            }
            let scale = 1.0 / model.trees.len() as f64;
            for j in 0..n_classes {
                proba[(i, j)] *= scale;
            }
        }
        Ok(proba)
    }
}

impl Classifier for RandomForestClassifier {
    fn name(&self) -> &str {
        "random forest"
    }

    fn fit(&mut self, x: &CsrMatrix, y: &[String]) -> Result<()> {
        if x.nrows() == 0 {
            bail!("cannot fit random forest on an empty matrix");
        }
        if x.nrows() != y.len() {
            bail!(
                "feature matrix has {} rows but {} labels were given",
                x.nrows(),
                y.len()
            );
        }

        let mut classes: Vec<String> = y.to_vec();
        classes.sort();
        classes.dedup();
        let class_index = |label: &String| classes.binary_search(label).unwrap();
        let targets: Vec<usize> = y.iter().map(class_index).collect();

        let dense = x.to_dense();
        let n_cols = x.ncols();
        let problem = TreeProblem {
            x: &dense,
            n_cols,
            y: &targets,
            n_classes: classes.len(),
            params: &self.params,
            max_features: ((n_cols as f64).sqrt().ceil() as usize).clamp(1, n_cols.max(1)),
        };

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.params.n_jobs)
            .build()
            .context("failed to build worker pool for tree fitting")?;
        let seed = self.params.random_state;
        let trees: Vec<Node> = pool.install(|| {
            (0..self.params.n_estimators)
                .into_par_iter()
                .map(|i| {
                    let mut rng = StdRng::seed_from_u64(seed.wrapping_add(i as u64));
                    problem.grow_tree(&mut rng)
                })
                .collect()
        });

        self.model = Some(ForestModel {
            n_features: n_cols,
            classes,
            trees,
        });
        Ok(())
    }

    fn predict(&self, x: &CsrMatrix) -> Result<Vec<String>> {
        let proba = self.proba_rows(x)?;
        let model = self.fitted()?;
        let mut out = Vec::with_capacity(x.nrows());
        for i in 0..x.nrows() {
            let mut best = 0;
            for j in 1..model.classes.len() {
                if proba[(i, j)] > proba[(i, best)] {
                    best = j;
                }
            }
            out.push(model.classes[best].clone());
        }
        Ok(out)
    }

    fn predict_proba(&self, x: &CsrMatrix) -> Result<Array2<f64>> {
        self.proba_rows(x)
    }

    fn classes(&self) -> &[String] {
        self.model
            .as_ref()
            .map(|m| m.classes.as_slice())
            .unwrap_or(&[])
    }

    fn save(&self, path: &Path) -> Result<()> {
        let model = self.fitted()?;
        persist::write_compressed(model, path)
    }
}

/// Shared, immutable inputs for growing one tree.
struct TreeProblem<'a> {
    x: &'a [f32],
    n_cols: usize,
    y: &'a [usize],
    n_classes: usize,
    params: &'a RandomForestParams,
    max_features: usize,
}

impl<'a> TreeProblem<'a> {
    fn value(&self, row: usize, col: usize) -> f32 {
        self.x[row * self.n_cols + col]
    }

    fn grow_tree(&self, rng: &mut StdRng) -> Node {
        let n_rows = self.y.len();
        let samples: Vec<usize> = if self.params.bootstrap {
            (0..n_rows).map(|_| rng.gen_range(0..n_rows)).collect()
        } else {
            (0..n_rows).collect()
        };
        self.grow_node(samples, 0, rng)
    }

    fn leaf(&self, counts: &[usize], total: usize) -> Node {
        let dist = counts
            .iter()
            .map(|&c| c as f64 / total as f64)
            .collect();
        Node::Leaf { dist }
    }

    fn class_counts(&self, samples: &[usize]) -> Vec<usize> {
        let mut counts = vec![0usize; self.n_classes];
        for &s in samples {
            counts[self.y[s]] += 1;
        }
        counts
    }

    fn grow_node(&self, samples: Vec<usize>, depth: usize, rng: &mut StdRng) -> Node {
        let counts = self.class_counts(&samples);
        let total = samples.len();
        let is_pure = counts.iter().filter(|&&c| c > 0).count() <= 1;
        let depth_reached = self.params.max_depth.map_or(false, |d| depth >= d);
        if is_pure || depth_reached || total < 2 * self.params.min_samples_leaf.max(1) {
            return self.leaf(&counts, total);
        }

        let mut features: Vec<usize> = (0..self.n_cols).collect();
        features.shuffle(rng);
        features.truncate(self.max_features);

        let mut best: Option<(f64, usize, f32)> = None;
        let mut column: Vec<(f32, usize)> = Vec::with_capacity(total);
        for &feature in &features {
            column.clear();
            column.extend(
                samples
                    .iter()
                    .map(|&s| (self.value(s, feature), self.y[s])),
            );
            column.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal));

            let mut left_counts = vec![0usize; self.n_classes];
            for i in 1..total {
                left_counts[column[i - 1].1] += 1;
                if column[i].0 <= column[i - 1].0 {
                    continue;
                }
                let n_left = i;
                let n_right = total - i;
                if n_left < self.params.min_samples_leaf || n_right < self.params.min_samples_leaf {
                    continue;
                }
                let impurity = weighted_gini(&left_counts, &counts, n_left, n_right);
                if best.map_or(true, |(b, _, _)| impurity < b) {
                    let threshold = (column[i - 1].0 + column[i].0) / 2.0;
                    best = Some((impurity, feature, threshold));
                }
            }
        }

        let Some((_, feature, threshold)) = best else {
            return self.leaf(&counts, total);
        };

        let (left, right): (Vec<usize>, Vec<usize>) = samples
            .into_iter()
            .partition(|&s| self.value(s, feature) <= threshold);
        Node::Split {
            feature,
            threshold,
            left: Box::new(self.grow_node(left, depth + 1, rng)),
            right: Box::new(self.grow_node(right, depth + 1, rng)),
        }
    }
}

/// Size-weighted gini impurity of a candidate split. `left` holds the class
/// counts left of the split; the right counts are the remainder of `total`.
fn weighted_gini(left: &[usize], total: &[usize], n_left: usize, n_right: usize) -> f64 {
    let mut left_sq = 0.0;
    let mut right_sq = 0.0;
    for (&l, &t) in left.iter().zip(total) {
        let r = t - l;
        left_sq += (l as f64 / n_left as f64).powi(2);
        right_sq += (r as f64 / n_right as f64).powi(2);
    }
    let n = (n_left + n_right) as f64;
    (n_left as f64 * (1.0 - left_sq) + n_right as f64 * (1.0 - right_sq)) / n
}

#[cfg(test)]
mod tests {
    use super::*;

    fn separable() -> (CsrMatrix, Vec<String>) {
        // feature 0 separates s_a from the rest, feature 1 separates s_b/s_c
        #[rustfmt::skip]
        let dense = vec![
            5.0, 0.0,
            5.5, 0.0,
            0.0, 1.0,
            0.0, 1.5,
            0.0, 9.0,
            0.0, 8.0,
        ];
        let x = CsrMatrix::from_dense(6, 2, &dense).unwrap();
        let y = ["s_a", "s_a", "s_b", "s_b", "s_c", "s_c"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        (x, y)
    }

    fn small_forest() -> RandomForestClassifier {
        RandomForestClassifier::new(RandomForestParams {
            n_estimators: 25,
            n_jobs: 2,
            ..RandomForestParams::default()
        })
    }

    #[test]
    fn learns_a_separable_problem() {
        let (x, y) = separable();
        let mut forest = small_forest();
        forest.fit(&x, &y).unwrap();
        assert_eq!(forest.predict(&x).unwrap(), y);
    }

    #[test]
    fn classes_are_sorted_and_probabilities_normalized() {
        let (x, y) = separable();
        let mut forest = small_forest();
        forest.fit(&x, &y).unwrap();
        assert_eq!(forest.classes(), &["s_a", "s_b", "s_c"]);

        let proba = forest.predict_proba(&x).unwrap();
        assert_eq!(proba.dim(), (6, 3));
        for i in 0..6 {
            let row_sum: f64 = (0..3).map(|j| proba[(i, j)]).sum();
            assert!((row_sum - 1.0).abs() < 1e-9, "row {} sums to {}", i, row_sum);
        }
    }

    #[test]
    fn deterministic_under_fixed_seed() {
        let (x, y) = separable();
        let mut a = small_forest();
        let mut b = small_forest();
        a.fit(&x, &y).unwrap();
        b.fit(&x, &y).unwrap();
        let pa = a.predict_proba(&x).unwrap();
        let pb = b.predict_proba(&x).unwrap();
        assert_eq!(pa, pb);
    }

    #[test]
    fn predict_before_fit_errors() {
        let (x, _) = separable();
        let forest = small_forest();
        assert!(forest.predict(&x).is_err());
        assert!(forest.classes().is_empty());
    }

    #[test]
    fn rejects_label_count_mismatch() {
        let (x, mut y) = separable();
        y.pop();
        let mut forest = small_forest();
        assert!(forest.fit(&x, &y).is_err());
    }

    #[test]
    fn rejects_width_mismatch_at_predict() {
        let (x, y) = separable();
        let mut forest = small_forest();
        forest.fit(&x, &y).unwrap();
        let narrow = CsrMatrix::from_dense(1, 1, &[1.0]).unwrap();
        assert!(forest.predict(&narrow).is_err());
    }

    #[test]
    fn save_and_load_round_trip() {
        let (x, y) = separable();
        let mut forest = small_forest();
        forest.fit(&x, &y).unwrap();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("train_m_1.bin.gz");
        forest.save(&path).unwrap();

        let restored = RandomForestClassifier::load(&path).unwrap();
        assert_eq!(restored.predict(&x).unwrap(), forest.predict(&x).unwrap());
    }
}
