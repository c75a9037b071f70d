//! Accuracy scoring and the per-classifier evaluation report.

/// Fraction of positions where `predicted` matches `truth`.
///
/// Both slices must be row-aligned; a length mismatch is a caller bug and
/// panics.
pub fn accuracy(truth: &[String], predicted: &[String]) -> f64 {
    assert_eq!(
        truth.len(),
        predicted.len(),
        "truth and predictions must have equal lengths"
    );
    if truth.is_empty() {
        return 0.0;
    }
    let hits = truth
        .iter()
        .zip(predicted)
        .filter(|(t, p)| t == p)
        .count();
    hits as f64 / truth.len() as f64
}

/// Running per-classifier accuracy sums, averaged over malls at the end.
///
/// Only meaningful in evaluation mode; submission runs never record into it.
#[derive(Debug, Clone, Default)]
pub struct AccuracyReport {
    sums: Vec<(String, f64)>,
}

impl AccuracyReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, name: &str, score: f64) {
        match self.sums.iter_mut().find(|(n, _)| n == name) {
            Some((_, sum)) => *sum += score,
            None => self.sums.push((name.to_string(), score)),
        }
    }

    /// Mean accuracy for one classifier over `mall_count` malls.
    pub fn mean(&self, name: &str, mall_count: usize) -> Option<f64> {
        if mall_count == 0 {
            return None;
        }
        self.sums
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, sum)| sum / mall_count as f64)
    }

    pub fn is_empty(&self) -> bool {
        self.sums.is_empty()
    }

    /// Log the mean accuracy of every classifier.
    pub fn log_summary(&self, mall_count: usize) {
        for (name, _) in &self.sums {
            if let Some(mean) = self.mean(name, mall_count) {
                log::info!("{} mean accuracy over {} malls: {:.4}", name, mall_count, mean);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn accuracy_counts_matches() {
        let truth = labels(&["a", "b", "c", "d"]);
        let predicted = labels(&["a", "x", "c", "y"]);
        assert!((accuracy(&truth, &predicted) - 0.5).abs() < 1e-12);
    }

    #[test]
    #[should_panic(expected = "equal lengths")]
    fn accuracy_panics_on_length_mismatch() {
        let _ = accuracy(&labels(&["a", "b"]), &labels(&["a"]));
    }

    #[test]
    fn report_means_over_mall_count() {
        let mut report = AccuracyReport::new();
        report.record("random forest", 0.8);
        report.record("random forest", 0.6);
        let mean = report.mean("random forest", 2).unwrap();
        assert!((mean - 0.7).abs() < 1e-12);
    }

    #[test]
    fn report_unknown_name_is_none() {
        let report = AccuracyReport::new();
        assert!(report.mean("svm", 3).is_none());
        assert!(report.mean("svm", 0).is_none());
    }
}
