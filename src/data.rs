//! Column-oriented visit-record table.
//!
//! A `VisitTable` holds one column per record field, all row-aligned. The
//! pipeline only interprets `row_id`, `mall_id`, `time_stamp` and the
//! optional `shop_id` target; everything else (location, wifi signals, ...)
//! stays in `raw` as opaque string columns for vectorizers to consume.
use std::collections::BTreeMap;

use anyhow::{bail, Result};

use crate::split::RowPartition;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct VisitTable {
    /// Unique id of each visit; the join key for predictions.
    pub row_id: Vec<String>,
    /// Venue grouping key.
    pub mall_id: Vec<String>,
    /// `YYYY-MM-DD HH:MM` timestamps; lexicographic order is time order.
    pub time_stamp: Vec<String>,
    /// Target labels; present on training data only.
    pub shop_id: Option<Vec<String>>,
    /// Opaque feature columns, keyed by column name.
    pub raw: BTreeMap<String, Vec<String>>,
}

impl VisitTable {
    pub fn len(&self) -> usize {
        self.row_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.row_id.is_empty()
    }

    /// Check that every column is row-aligned.
    pub fn validate(&self) -> Result<()> {
        let n = self.len();
        if self.mall_id.len() != n || self.time_stamp.len() != n {
            bail!(
                "misaligned columns: {} row_ids, {} mall_ids, {} time_stamps",
                n,
                self.mall_id.len(),
                self.time_stamp.len()
            );
        }
        if let Some(shops) = &self.shop_id {
            if shops.len() != n {
                bail!("misaligned shop_id column: {} values for {} rows", shops.len(), n);
            }
        }
        for (name, column) in &self.raw {
            if column.len() != n {
                bail!("misaligned column '{}': {} values for {} rows", name, column.len(), n);
            }
        }
        Ok(())
    }

    /// Boolean mask selecting rows whose mall id matches exactly.
    pub fn mall_mask(&self, mall_id: &str) -> Vec<bool> {
        self.mall_id.iter().map(|m| m == mall_id).collect()
    }

    /// New table with only the rows where `mask[i]` is true.
    ///
    /// The mask must be row-aligned with the table.
    pub fn filter(&self, mask: &[bool]) -> VisitTable {
        assert_eq!(mask.len(), self.len(), "filter mask is not row-aligned");
        let selected: Vec<usize> = mask
            .iter()
            .enumerate()
            .filter_map(|(i, &keep)| if keep { Some(i) } else { None })
            .collect();
        self.select(&selected)
    }

    /// New table with the rows at `indices`, in that order.
    pub fn select(&self, indices: &[usize]) -> VisitTable {
        let pick = |column: &Vec<String>| -> Vec<String> {
            indices.iter().map(|&i| column[i].clone()).collect()
        };
        VisitTable {
            row_id: pick(&self.row_id),
            mall_id: pick(&self.mall_id),
            time_stamp: pick(&self.time_stamp),
            shop_id: self.shop_id.as_ref().map(pick),
            raw: self
                .raw
                .iter()
                .map(|(name, column)| (name.clone(), pick(column)))
                .collect(),
        }
    }

    /// New table stably sorted by timestamp ascending.
    pub fn sort_by_time_stamp(&self) -> VisitTable {
        let mut order: Vec<usize> = (0..self.len()).collect();
        order.sort_by(|&a, &b| self.time_stamp[a].cmp(&self.time_stamp[b]));
        self.select(&order)
    }

    /// Distinct mall ids in first-seen order.
    pub fn unique_malls(&self) -> Vec<String> {
        let mut seen = std::collections::HashSet::new();
        let mut malls = Vec::new();
        for mall in &self.mall_id {
            if seen.insert(mall.as_str()) {
                malls.push(mall.clone());
            }
        }
        malls
    }

    /// Extract the target column.
    pub fn labels(&self) -> Result<Vec<String>> {
        match &self.shop_id {
            Some(shops) => Ok(shops.clone()),
            None => bail!("table has no shop_id column to use as labels"),
        }
    }

    pub fn raw_column(&self, name: &str) -> Option<&[String]> {
        self.raw.get(name).map(|c| c.as_slice())
    }
}

impl RowPartition for VisitTable {
    fn n_rows(&self) -> usize {
        self.len()
    }

    fn take_rows(&self, start: usize, end: usize) -> Self {
        let indices: Vec<usize> = (start..end).collect();
        assert!(end <= self.len(), "row range out of bounds");
        self.select(&indices)
    }
}
