//! Workbook export: one CSV file per named sheet.
//!
//! Sheets are materialized in memory and nothing touches the filesystem
//! until every sheet has been built — a run that dies halfway through
//! fetching never leaves a partial workbook behind.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

use crate::pipeline::{LongTable, WideTable};

/// A fully materialized sheet: header plus string-rendered rows.
#[derive(Debug, Clone)]
pub struct Sheet {
    pub name: String,
    pub header: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Sheet {
    /// File name for this sheet within the workbook directory.
    fn file_name(&self) -> String {
        let stem: String = self
            .name
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() {
                    c.to_ascii_lowercase()
                } else {
                    '_'
                }
            })
            .collect();
        format!("{stem}.csv")
    }
}

fn cell(value: Option<f64>) -> String {
    match value {
        Some(v) => v.to_string(),
        // Absent stays visibly empty, never zero.
        None => String::new(),
    }
}

/// Render a wide-by-date table: `DATE` column plus one column per series.
pub fn wide_sheet(name: &str, table: &WideTable) -> Sheet {
    let mut header = vec!["DATE".to_string()];
    header.extend(table.columns().iter().cloned());

    let rows = table
        .iter()
        .map(|(date, row)| {
            let mut out = Vec::with_capacity(row.len() + 1);
            out.push(date.to_string());
            out.extend(row.iter().map(|v| cell(*v)));
            out
        })
        .collect();

    Sheet {
        name: name.to_string(),
        header,
        rows,
    }
}

/// Render a long table: `DATE` and `Country` columns plus the indicators.
pub fn long_sheet(name: &str, table: &LongTable) -> Sheet {
    let mut header = vec!["DATE".to_string(), "Country".to_string()];
    header.extend(table.columns().iter().cloned());

    let rows = table
        .iter()
        .map(|((date, entity), row)| {
            let mut out = Vec::with_capacity(row.len() + 2);
            out.push(date.to_string());
            out.push(entity.clone());
            out.extend(row.iter().map(|v| cell(*v)));
            out
        })
        .collect();

    Sheet {
        name: name.to_string(),
        header,
        rows,
    }
}

/// An ordered collection of sheets written out together.
#[derive(Debug, Default)]
pub struct Workbook {
    sheets: Vec<Sheet>,
}

impl Workbook {
    pub fn new() -> Self {
        Workbook::default()
    }

    pub fn add_sheet(&mut self, sheet: Sheet) {
        self.sheets.push(sheet);
    }

    pub fn sheets(&self) -> &[Sheet] {
        &self.sheets
    }

    /// Write every sheet as a CSV file under `dir`, creating it if needed.
    /// Returns the written paths in sheet order.
    pub fn write_to(&self, dir: &Path) -> Result<Vec<PathBuf>> {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create output directory: {}", dir.display()))?;

        let mut paths = Vec::with_capacity(self.sheets.len());
        for sheet in &self.sheets {
            let path = dir.join(sheet.file_name());
            let mut writer = csv::Writer::from_path(&path)
                .with_context(|| format!("Failed to open {}", path.display()))?;
            writer
                .write_record(&sheet.header)
                .with_context(|| format!("Failed to write header for sheet {:?}", sheet.name))?;
            for row in &sheet.rows {
                writer
                    .write_record(row)
                    .with_context(|| format!("Failed to write row for sheet {:?}", sheet.name))?;
            }
            writer
                .flush()
                .with_context(|| format!("Failed to flush sheet {:?}", sheet.name))?;
            paths.push(path);
        }
        Ok(paths)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::CleanSeries;
    use chrono::NaiveDate;

    fn d(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    #[test]
    fn test_sheet_file_name_sanitized() {
        let sheet = Sheet {
            name: "Euros and Rates".into(),
            header: vec![],
            rows: vec![],
        };
        assert_eq!(sheet.file_name(), "euros_and_rates.csv");
    }

    #[test]
    fn test_wide_sheet_renders_absent_as_empty() {
        let mut table = WideTable::new(vec!["A".into(), "B".into()]);
        table
            .insert(&CleanSeries::new(None, "A", vec![(d("2024-01-01"), 1.5)]))
            .unwrap();
        let sheet = wide_sheet("Rates", &table);
        assert_eq!(sheet.header, vec!["DATE", "A", "B"]);
        assert_eq!(sheet.rows, vec![vec!["2024-01-01", "1.5", ""]]);
    }

    #[test]
    fn test_long_sheet_has_country_column() {
        let mut table = LongTable::new(vec!["GDP".into()]);
        table
            .insert(&CleanSeries::new(
                Some("Germany"),
                "GDP",
                vec![(d("2024-01-01"), 900.0)],
            ))
            .unwrap();
        let sheet = long_sheet("Macro", &table);
        assert_eq!(sheet.header, vec!["DATE", "Country", "GDP"]);
        assert_eq!(sheet.rows, vec![vec!["2024-01-01", "Germany", "900"]]);
    }

    #[test]
    fn test_workbook_writes_all_sheets() {
        let dir = tempfile::tempdir().unwrap();
        let mut table = WideTable::new(vec!["A".into()]);
        table
            .insert(&CleanSeries::new(None, "A", vec![(d("2024-01-01"), 1.0)]))
            .unwrap();

        let mut workbook = Workbook::new();
        workbook.add_sheet(wide_sheet("First Sheet", &table));
        workbook.add_sheet(wide_sheet("Second Sheet", &table));

        let paths = workbook.write_to(dir.path()).unwrap();
        assert_eq!(paths.len(), 2);
        assert!(paths[0].ends_with("first_sheet.csv"));

        let contents = std::fs::read_to_string(&paths[0]).unwrap();
        assert_eq!(contents, "DATE,A\n2024-01-01,1\n");
    }

    #[test]
    fn test_workbook_creates_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("out").join("deep");
        let workbook = Workbook::new();
        workbook.write_to(&nested).unwrap();
        assert!(nested.is_dir());
    }
}
