//! Merge engine: outer-join tables with declared columns.
//!
//! Two shapes: `WideTable` keyed by date (single-entity financial series)
//! and `LongTable` keyed by `(date, entity)` (per-country macro series).
//! Both are true outer joins — the key space is the union of all inserted
//! series' keys, absent cells stay `None`, and no key is synthesized.
//!
//! Columns are declared up front rather than discovered from whatever
//! series happened to fetch, so a failed optional series leaves an empty
//! column with a stable header instead of silently changing the schema.
//!
//! Conflicts are loud: writing a differing non-null value over an
//! existing cell is a `MergeConflict` error. Writing the same value again
//! is allowed, so a merge is idempotent.

use chrono::NaiveDate;
use std::collections::BTreeMap;

use crate::types::{CleanSeries, PipelineError};

// ---------------------------------------------------------------------------
// Wide-by-date
// ---------------------------------------------------------------------------

/// One row per date, one column per indicator.
#[derive(Debug, Clone)]
pub struct WideTable {
    columns: Vec<String>,
    rows: BTreeMap<NaiveDate, Vec<Option<f64>>>,
}

impl WideTable {
    pub fn new(columns: Vec<String>) -> Self {
        WideTable {
            columns,
            rows: BTreeMap::new(),
        }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    fn column_index(&self, column: &str) -> Result<usize, PipelineError> {
        self.columns
            .iter()
            .position(|c| c == column)
            .ok_or_else(|| {
                PipelineError::Config(format!("column {column:?} is not declared in the table"))
            })
    }

    /// Outer-join a series into its declared column.
    pub fn insert(&mut self, series: &CleanSeries) -> Result<(), PipelineError> {
        let idx = self.column_index(&series.column)?;
        let width = self.columns.len();

        for (date, value) in &series.points {
            let row = self.rows.entry(*date).or_insert_with(|| vec![None; width]);
            match row[idx] {
                Some(existing) if existing != *value => {
                    return Err(PipelineError::MergeConflict {
                        column: series.column.clone(),
                        key: date.to_string(),
                        existing,
                        incoming: *value,
                    });
                }
                _ => row[idx] = Some(*value),
            }
        }
        Ok(())
    }

    pub fn get(&self, date: NaiveDate, column: &str) -> Option<f64> {
        let idx = self.columns.iter().position(|c| c == column)?;
        self.rows.get(&date).and_then(|row| row[idx])
    }

    /// Rows in chronological order.
    pub fn iter(&self) -> impl Iterator<Item = (&NaiveDate, &[Option<f64>])> {
        self.rows.iter().map(|(date, row)| (date, row.as_slice()))
    }
}

// ---------------------------------------------------------------------------
// Long-by-entity-and-date
// ---------------------------------------------------------------------------

/// One row per `(date, entity)` pair, one column per indicator.
#[derive(Debug, Clone)]
pub struct LongTable {
    columns: Vec<String>,
    rows: BTreeMap<(NaiveDate, String), Vec<Option<f64>>>,
}

impl LongTable {
    pub fn new(columns: Vec<String>) -> Self {
        LongTable {
            columns,
            rows: BTreeMap::new(),
        }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    fn column_index(&self, column: &str) -> Result<usize, PipelineError> {
        self.columns
            .iter()
            .position(|c| c == column)
            .ok_or_else(|| {
                PipelineError::Config(format!("column {column:?} is not declared in the table"))
            })
    }

    /// Outer-join an entity-tagged series into its declared column.
    pub fn insert(&mut self, series: &CleanSeries) -> Result<(), PipelineError> {
        let entity = series.entity.as_ref().ok_or_else(|| {
            PipelineError::Config(format!(
                "series for column {:?} has no entity tag",
                series.column
            ))
        })?;
        let idx = self.column_index(&series.column)?;
        let width = self.columns.len();

        for (date, value) in &series.points {
            let key = (*date, entity.clone());
            let row = self.rows.entry(key).or_insert_with(|| vec![None; width]);
            match row[idx] {
                Some(existing) if existing != *value => {
                    return Err(PipelineError::MergeConflict {
                        column: series.column.clone(),
                        key: format!("({date}, {entity})"),
                        existing,
                        incoming: *value,
                    });
                }
                _ => row[idx] = Some(*value),
            }
        }
        Ok(())
    }

    pub fn get(&self, date: NaiveDate, entity: &str, column: &str) -> Option<f64> {
        let idx = self.columns.iter().position(|c| c == column)?;
        self.rows
            .get(&(date, entity.to_string()))
            .and_then(|row| row[idx])
    }

    /// Rows ordered by date, then entity name.
    pub fn iter(&self) -> impl Iterator<Item = (&(NaiveDate, String), &[Option<f64>])> {
        self.rows.iter().map(|(key, row)| (key, row.as_slice()))
    }

    /// Distinct entities present in the table.
    pub fn entities(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.rows.keys().map(|(_, e)| e.as_str()).collect();
        names.sort_unstable();
        names.dedup();
        names
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
