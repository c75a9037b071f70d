//! Row-id keyed prediction aggregation.
use std::collections::HashMap;

/// Insertion-ordered map from `row_id` to predicted `shop_id`.
///
/// Built incrementally across malls and classifiers. Re-inserting an existing
/// row id overwrites the value in place and keeps the original position, so
/// the last classifier to write a row id wins while iteration order stays
/// stable. With a single registered classifier every row id appears exactly
/// once.
#[derive(Debug, Clone, Default)]
pub struct PredictionMap {
    index: HashMap<String, usize>,
    entries: Vec<(String, String)>,
}

impl PredictionMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, row_id: &str, shop_id: &str) {
        match self.index.get(row_id) {
            Some(&slot) => self.entries[slot].1 = shop_id.to_string(),
            None => {
                self.index.insert(row_id.to_string(), self.entries.len());
                self.entries.push((row_id.to_string(), shop_id.to_string()));
            }
        }
    }

    pub fn get(&self, row_id: &str) -> Option<&str> {
        self.index
            .get(row_id)
            .map(|&slot| self.entries[slot].1.as_str())
    }

    pub fn contains(&self, row_id: &str) -> bool {
        self.index.contains_key(row_id)
    }

    /// Entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(r, s)| (r.as_str(), s.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
