//! Dataset intake
//!
//! Parses a CSV upload into ordered rows of column/value pairs. Row order is
//! output order for everything downstream.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::DatasetError;

/// One record of the dataset, keyed by column name
pub type Row = BTreeMap<String, String>;

/// Parsed dataset. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dataset {
    headers: Vec<String>,
    rows: Vec<Row>,
}

impl Dataset {
    /// Parse CSV bytes. The first record is the header row.
    ///
    /// Short records are padded with empty values, extra cells are dropped,
    /// and records with no non-empty cell are skipped. When a header name
    /// repeats, the first column with that name wins.
    pub fn parse_csv(data: &[u8]) -> Result<Self, DatasetError> {
        let mut reader = csv::ReaderBuilder::new()
            .flexible(true)
            .trim(csv::Trim::Headers)
            .from_reader(data);

        let headers: Vec<String> = reader
            .headers()?
            .iter()
            .map(|h| h.trim_start_matches('\u{feff}').trim().to_string())
            .collect();

        if headers.iter().all(|h| h.is_empty()) {
            return Err(DatasetError::MissingHeaders);
        }

        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record?;
            if record.iter().all(|cell| cell.trim().is_empty()) {
                continue;
            }

            let mut row = Row::new();
            for (i, header) in headers.iter().enumerate() {
                row.entry(header.clone())
                    .or_insert_with(|| record.get(i).unwrap_or("").to_string());
            }
            rows.push(row);
        }

        if rows.is_empty() {
            return Err(DatasetError::NoRows);
        }

        debug!(columns = headers.len(), rows = rows.len(), "Parsed CSV dataset");

        Ok(Self { headers, rows })
    }

    /// Build a dataset from rows that were already parsed client-side.
    /// Headers come from the first row's keys.
    pub fn from_rows(rows: Vec<Row>) -> Result<Self, DatasetError> {
        let first = rows.first().ok_or(DatasetError::NoRows)?;
        let headers: Vec<String> = first.keys().cloned().collect();
        if headers.is_empty() {
            return Err(DatasetError::MissingHeaders);
        }
        Ok(Self { headers, rows })
    }

    /// Column names in file order
    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn into_rows(self) -> Vec<Row> {
        self.rows
    }
}
