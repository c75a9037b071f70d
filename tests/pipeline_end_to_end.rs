//! End-to-end tests of the per-mall training loop and its drivers.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result};
use ndarray::Array2;

use mall_locator::config::PipelineConfig;
use mall_locator::data::VisitTable;
use mall_locator::features::Vectorizer;
use mall_locator::io::DataSource;
use mall_locator::math::CsrMatrix;
use mall_locator::models::{Classifier, ClassifierRegistry};
use mall_locator::pipeline::MallPipeline;
use mall_locator::split::train_test_split;

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

/// Two malls, ten rows each, interleaved in time order. Per-mall labels in
/// occurrence order:
///   m_1: a a a a a b b b | a b   (majority of the first 8: s_a)
///   m_2: c c c c c c d d | c c   (majority of the first 8: s_c)
/// A 0.2 ratio split therefore holds out exactly 2 rows per mall.
fn two_mall_table() -> VisitTable {
    let m1_shops = ["s_a", "s_a", "s_a", "s_a", "s_a", "s_b", "s_b", "s_b", "s_a", "s_b"];
    let m2_shops = ["s_c", "s_c", "s_c", "s_c", "s_c", "s_c", "s_d", "s_d", "s_c", "s_c"];

    let mut table = VisitTable {
        shop_id: Some(Vec::new()),
        ..VisitTable::default()
    };
    let mut xs = Vec::new();
    for i in 0..20 {
        let occurrence = i / 2;
        let (mall, shop) = if i % 2 == 0 {
            ("m_1", m1_shops[occurrence])
        } else {
            ("m_2", m2_shops[occurrence])
        };
        table.row_id.push(format!("{}", i + 1));
        table.mall_id.push(mall.to_string());
        table
            .time_stamp
            .push(format!("2017-08-{:02} {:02}:00", i / 4 + 1, 10 + i % 4));
        table.shop_id.as_mut().unwrap().push(shop.to_string());
        // feature column correlated with the shop, for the forest test
        xs.push(if shop.ends_with('a') || shop.ends_with('c') {
            "1.0".to_string()
        } else {
            "9.0".to_string()
        });
    }
    table.raw = BTreeMap::from([("x".to_string(), xs)]);
    table
}

struct MemorySource {
    train: VisitTable,
    test: VisitTable,
}

impl DataSource for MemorySource {
    fn read_train_join_mall(&self) -> Result<VisitTable> {
        Ok(self.train.clone())
    }

    fn read_test_data(&self) -> Result<VisitTable> {
        Ok(self.test.clone())
    }
}

/// One column parsed from the raw `x` field.
struct RawColumnVectorizer;

impl Vectorizer for RawColumnVectorizer {
    fn name(&self) -> &str {
        "raw column"
    }

    fn fit_transform(&mut self, data: &VisitTable, mall_id: &str) -> Result<CsrMatrix> {
        self.transform(data, mall_id)
    }

    fn transform(&self, data: &VisitTable, _mall_id: &str) -> Result<CsrMatrix> {
        let column = data.raw_column("x").context("missing raw column 'x'")?;
        let dense: Vec<f32> = column
            .iter()
            .map(|v| v.parse::<f32>().context("non-numeric feature value"))
            .collect::<Result<_>>()?;
        Ok(CsrMatrix::from_dense(data.len(), 1, &dense)?)
    }
}

fn vectorizers() -> Vec<Box<dyn Vectorizer>> {
    vec![Box::new(RawColumnVectorizer)]
}

/// Deterministic stub: always predicts the most frequent training label
/// (ties broken towards the lexicographically smaller one).
#[derive(Default)]
struct MajorityClassifier {
    classes: Vec<String>,
    majority: Option<String>,
}

impl Classifier for MajorityClassifier {
    fn name(&self) -> &str {
        "majority"
    }

    fn fit(&mut self, _x: &CsrMatrix, y: &[String]) -> Result<()> {
        let mut counts: BTreeMap<String, usize> = BTreeMap::new();
        for label in y {
            *counts.entry(label.clone()).or_default() += 1;
        }
        let mut majority: Option<(String, usize)> = None;
        for (label, &count) in &counts {
            // strict comparison keeps the lexicographically smaller label on ties
            if majority.as_ref().map_or(true, |&(_, best)| count > best) {
                majority = Some((label.clone(), count));
            }
        }
        let majority = majority
            .map(|(label, _)| label)
            .context("cannot fit on empty labels")?;

        self.classes = y.to_vec();
        self.classes.sort();
        self.classes.dedup();
        self.majority = Some(majority);
        Ok(())
    }

    fn predict(&self, x: &CsrMatrix) -> Result<Vec<String>> {
        let majority = self.majority.clone().context("not fitted")?;
        Ok(vec![majority; x.nrows()])
    }

    fn predict_proba(&self, x: &CsrMatrix) -> Result<Array2<f64>> {
        let majority = self.majority.as_ref().context("not fitted")?;
        let column = self
            .classes
            .iter()
            .position(|c| c == majority)
            .context("majority label missing from classes")?;
        let mut proba = Array2::zeros((x.nrows(), self.classes.len()));
        for i in 0..x.nrows() {
            proba[(i, column)] = 1.0;
        }
        Ok(proba)
    }

    fn classes(&self) -> &[String] {
        &self.classes
    }

    fn save(&self, path: &Path) -> Result<()> {
        let majority = self.majority.as_ref().context("not fitted")?;
        mall_locator::persist::write_compressed(majority, path)
    }
}

fn init_logs() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn majority_registry() -> ClassifierRegistry {
    let mut registry = ClassifierRegistry::new();
    registry.register("majority", || Box::new(MajorityClassifier::default()));
    registry
}

// ---------------------------------------------------------------------------
// Holdout evaluation
// ---------------------------------------------------------------------------

#[test]
fn evaluation_covers_every_held_out_row_exactly_once() {
    init_logs();
    let config = PipelineConfig::default();
    let pipeline = MallPipeline::with_registry(config, majority_registry());

    // feed the rows in reverse so the driver has to sort by time itself
    let mut reversed = two_mall_table();
    let order: Vec<usize> = (0..reversed.len()).rev().collect();
    reversed = reversed.select(&order);

    let source = MemorySource {
        train: reversed,
        test: VisitTable::default(),
    };
    let outcome = pipeline.evaluate(&source, &mut vectorizers()).unwrap();

    assert_eq!(outcome.mall_count, 2);
    assert_eq!(outcome.predictions.len(), 4);
    for row_id in ["17", "18", "19", "20"] {
        assert!(outcome.predictions.contains(row_id), "missing {}", row_id);
    }
}

#[test]
fn evaluation_reports_hand_computed_mean_accuracy() {
    init_logs();
    let config = PipelineConfig::default();
    let pipeline = MallPipeline::with_registry(config, majority_registry());
    let source = MemorySource {
        train: two_mall_table(),
        test: VisitTable::default(),
    };

    let outcome = pipeline.evaluate(&source, &mut vectorizers()).unwrap();

    // m_1 predicts s_a for truths [s_a, s_b] -> 0.5
    // m_2 predicts s_c for truths [s_c, s_c] -> 1.0
    let mean = outcome.report.mean("majority", outcome.mall_count).unwrap();
    assert!((mean - 0.75).abs() < 1e-12, "mean accuracy was {}", mean);

    assert_eq!(outcome.predictions.get("17"), Some("s_a"));
    assert_eq!(outcome.predictions.get("19"), Some("s_a"));
    assert_eq!(outcome.predictions.get("18"), Some("s_c"));
    assert_eq!(outcome.predictions.get("20"), Some("s_c"));
}

#[test]
fn the_random_forest_learns_the_separable_fixture() {
    use mall_locator::models::{RandomForestClassifier, RandomForestParams};

    let mut registry = ClassifierRegistry::new();
    registry.register("random forest", || {
        Box::new(RandomForestClassifier::new(RandomForestParams {
            n_estimators: 15,
            n_jobs: 2,
            ..RandomForestParams::default()
        }))
    });
    let pipeline = MallPipeline::with_registry(PipelineConfig::default(), registry);
    let source = MemorySource {
        train: two_mall_table(),
        test: VisitTable::default(),
    };

    let outcome = pipeline.evaluate(&source, &mut vectorizers()).unwrap();

    // the held-out labels are perfectly determined by the x column
    let mean = outcome
        .report
        .mean("random forest", outcome.mall_count)
        .unwrap();
    assert!((mean - 1.0).abs() < 1e-12, "mean accuracy was {}", mean);
}

// ---------------------------------------------------------------------------
// Submission mode
// ---------------------------------------------------------------------------

fn submission_test_table() -> VisitTable {
    VisitTable {
        row_id: vec!["t1".into(), "t2".into(), "t3".into(), "t4".into()],
        mall_id: vec!["m_1".into(), "m_2".into(), "m_1".into(), "m_2".into()],
        time_stamp: vec![
            "2017-09-01 10:00".into(),
            "2017-09-01 11:00".into(),
            "2017-09-02 10:00".into(),
            "2017-09-02 11:00".into(),
        ],
        shop_id: None,
        raw: BTreeMap::from([(
            "x".to_string(),
            vec!["1.0".into(), "1.0".into(), "9.0".into(), "9.0".into()],
        )]),
    }
}

#[test]
fn submission_writes_rows_in_test_table_order() {
    let dir = tempfile::tempdir().unwrap();
    let config = PipelineConfig {
        result_dir: dir.path().join("result").to_string_lossy().into_owned(),
        result_prefix: "locator".to_string(),
        ..PipelineConfig::default()
    };
    let pipeline = MallPipeline::with_registry(config, majority_registry());
    let source = MemorySource {
        train: two_mall_table(),
        test: submission_test_table(),
    };

    let path = pipeline.run_submission(&source, &mut vectorizers()).unwrap();
    let text = std::fs::read_to_string(&path).unwrap();

    // trained on all 10 rows per mall: m_1 majority s_a (6 vs 4), m_2 s_c (8 vs 2)
    assert_eq!(text, "row_id,shop_id\nt1,s_a\nt2,s_c\nt3,s_a\nt4,s_c\n");
}

// ---------------------------------------------------------------------------
// Optional persistence
// ---------------------------------------------------------------------------

#[test]
fn evaluation_persists_models_and_probability_tables_when_enabled() {
    let dir = tempfile::tempdir().unwrap();
    let config = PipelineConfig {
        save_model: true,
        save_result_proba: true,
        save_model_base_path: dir.path().join("model_save").to_string_lossy().into_owned(),
        result_save_base_path: dir.path().join("result_save").to_string_lossy().into_owned(),
        ..PipelineConfig::default()
    };
    let pipeline = MallPipeline::with_registry(config, majority_registry());

    let data = two_mall_table().sort_by_time_stamp();
    let labels = data.labels().unwrap();
    let (train_data, test_data, train_labels, test_labels) =
        train_test_split(&data, &labels, 0.2);

    pipeline
        .train_by_mall(
            &mut vectorizers(),
            &train_data,
            &train_labels,
            &test_data,
            Some(test_labels.as_slice()),
        )
        .unwrap();

    for mall in ["m_1", "m_2"] {
        let model = dir
            .path()
            .join("model_save")
            .join("majority")
            .join(format!("train_{}.bin.gz", mall));
        assert!(model.is_file(), "missing model artifact {:?}", model);

        let proba = dir
            .path()
            .join("result_save")
            .join("majority")
            .join(format!("train_{}.csv", mall));
        assert!(proba.is_file(), "missing probability artifact {:?}", proba);
        let text = std::fs::read_to_string(&proba).unwrap();
        assert!(text.starts_with("row_id,"), "bad header in {}", text);
    }
}
