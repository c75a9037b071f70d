//! CSV-backed [`DataSource`].
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use csv::StringRecord;

use crate::data::VisitTable;

use super::DataSource;

/// Reads the joined training table and the test table from two CSV files.
///
/// `row_id`, `mall_id`, `time_stamp` and (when present) `shop_id` are
/// interpreted; every other column is kept verbatim as an opaque raw feature
/// column for vectorizers.
#[derive(Debug, Clone)]
pub struct CsvDataSource {
    train_path: PathBuf,
    test_path: PathBuf,
}

impl CsvDataSource {
    pub fn new(train_path: impl Into<PathBuf>, test_path: impl Into<PathBuf>) -> Self {
        Self {
            train_path: train_path.into(),
            test_path: test_path.into(),
        }
    }
}

impl DataSource for CsvDataSource {
    fn read_train_join_mall(&self) -> Result<VisitTable> {
        let table = read_visit_csv(&self.train_path)?;
        if table.shop_id.is_none() {
            return Err(anyhow!(
                "training table {} has no shop_id column",
                self.train_path.display()
            ));
        }
        Ok(table)
    }

    fn read_test_data(&self) -> Result<VisitTable> {
        read_visit_csv(&self.test_path)
    }
}

/// Read one visit table from a headered CSV file.
pub fn read_visit_csv(path: &Path) -> Result<VisitTable> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_path(path)
        .with_context(|| format!("Failed to open visit table: {}", path.display()))?;

    let headers = reader
        .headers()
        .context("Failed to read visit table header row")?
        .clone();

    let row_id_idx = require_column(&headers, "row_id", path)?;
    let mall_id_idx = require_column(&headers, "mall_id", path)?;
    let time_stamp_idx = require_column(&headers, "time_stamp", path)?;
    let shop_id_idx = find_column(&headers, "shop_id");

    let raw_columns: Vec<(usize, String)> = headers
        .iter()
        .enumerate()
        .filter(|&(idx, _)| {
            idx != row_id_idx
                && idx != mall_id_idx
                && idx != time_stamp_idx
                && Some(idx) != shop_id_idx
        })
        .map(|(idx, name)| (idx, name.to_string()))
        .collect();

    let mut table = VisitTable {
        shop_id: shop_id_idx.map(|_| Vec::new()),
        raw: raw_columns
            .iter()
            .map(|(_, name)| (name.clone(), Vec::new()))
            .collect::<BTreeMap<_, _>>(),
        ..VisitTable::default()
    };

    for (row_idx, result) in reader.records().enumerate() {
        let record = result.with_context(|| format!("Failed to read row {}", row_idx + 1))?;
        let field = |idx: usize| -> Result<&str> {
            record
                .get(idx)
                .ok_or_else(|| anyhow!("Missing value in column {} at row {}", idx, row_idx + 1))
        };

        table.row_id.push(field(row_id_idx)?.to_string());
        table.mall_id.push(field(mall_id_idx)?.to_string());
        table.time_stamp.push(field(time_stamp_idx)?.to_string());
        if let (Some(idx), Some(shops)) = (shop_id_idx, table.shop_id.as_mut()) {
            shops.push(field(idx)?.to_string());
        }
        for (idx, name) in &raw_columns {
            table
                .raw
                .get_mut(name)
                .expect("raw column registered above")
                .push(field(*idx)?.to_string());
        }
    }

    table.validate()?;
    log::debug!("read {} visits from {}", table.len(), path.display());
    Ok(table)
}

fn find_column(headers: &StringRecord, name: &str) -> Option<usize> {
    headers.iter().position(|header| header == name)
}

fn require_column(headers: &StringRecord, name: &str, path: &Path) -> Result<usize> {
    find_column(headers, name)
        .ok_or_else(|| anyhow!("Missing column '{}' in {}", name, path.display()))
}
