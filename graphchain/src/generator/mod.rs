// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Conversion between raw records and elements
//!
//! Element generators turn header-keyed records (typically CSV rows) into
//! elements for `GenerateElements`. [`CsvGenerator`] goes the other way,
//! formatting elements as CSV rows for `ToCsv`.

use serde::{Deserialize, Serialize};
use std::io::Read;

use crate::functions::FunctionError;
use crate::storage::Element;

/// A raw input row: ordered header/field pairs
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub struct Record {
    fields: Vec<(String, String)>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            fields: pairs.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        }
    }

    /// Pair a CSV row with its header row
    pub fn from_csv(headers: &csv::StringRecord, row: &csv::StringRecord) -> Self {
        Self::from_pairs(headers.iter().zip(row.iter()))
    }

    pub fn with(mut self, header: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.push((header.into(), value.into()));
        self
    }

    pub fn get(&self, header: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(name, _)| name == header)
            .map(|(_, value)| value.as_str())
    }

    /// Field value, failing when the header is absent
    pub fn require(&self, header: &str) -> Result<&str, FunctionError> {
        self.get(header)
            .ok_or_else(|| FunctionError::Generator(format!("record has no field '{}'", header)))
    }

    pub fn headers(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(name, _)| name.as_str())
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl std::fmt::Display for Record {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let fields: Vec<String> = self.fields.iter().map(|(k, v)| format!("{}={}", k, v)).collect();
        write!(f, "{{{}}}", fields.join(", "))
    }
}

/// Read header-first CSV into records
pub fn records_from_csv<R: Read>(reader: R) -> Result<Vec<Record>, FunctionError> {
    let mut rdr = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
    let headers = rdr
        .headers()
        .map_err(|e| FunctionError::Generator(format!("failed to read CSV header: {}", e)))?
        .clone();
    let mut records = Vec::new();
    for (line, result) in rdr.records().enumerate() {
        let row = result.map_err(|e| FunctionError::Generator(format!("CSV row {}: {}", line + 1, e)))?;
        records.push(Record::from_csv(&headers, &row));
    }
    Ok(records)
}

/// Turns one record into zero or more elements
pub trait ElementGenerator: Send + Sync {
    fn generate(&self, record: &Record) -> Result<Vec<Element>, FunctionError>;
}

impl<F> ElementGenerator for F
where
    F: Fn(&Record) -> Result<Vec<Element>, FunctionError> + Send + Sync,
{
    fn generate(&self, record: &Record) -> Result<Vec<Element>, FunctionError> {
        self(record)
    }
}

/// One output column: an identifier keyword or property name
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CsvField {
    pub selection: String,
    pub column: String,
}

/// A column with the same value on every row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CsvConstant {
    pub column: String,
    pub value: String,
}

/// Formats elements as CSV rows
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct CsvGenerator {
    pub fields: Vec<CsvField>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub constants: Vec<CsvConstant>,
    /// Quote every field instead of only those that need it
    #[serde(default)]
    pub quoted: bool,
}

impl CsvGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn field(mut self, selection: impl Into<String>, column: impl Into<String>) -> Self {
        self.fields.push(CsvField {
            selection: selection.into(),
            column: column.into(),
        });
        self
    }

    pub fn group(self, column: impl Into<String>) -> Self {
        self.field("GROUP", column)
    }

    pub fn vertex(self, column: impl Into<String>) -> Self {
        self.field("VERTEX", column)
    }

    pub fn source(self, column: impl Into<String>) -> Self {
        self.field("SOURCE", column)
    }

    pub fn destination(self, column: impl Into<String>) -> Self {
        self.field("DESTINATION", column)
    }

    pub fn property(self, name: impl Into<String>, column: impl Into<String>) -> Self {
        self.field(name, column)
    }

    pub fn constant(mut self, column: impl Into<String>, value: impl Into<String>) -> Self {
        self.constants.push(CsvConstant {
            column: column.into(),
            value: value.into(),
        });
        self
    }

    pub fn quoted(mut self, quoted: bool) -> Self {
        self.quoted = quoted;
        self
    }

    pub fn header(&self) -> Result<String, FunctionError> {
        let columns = self
            .fields
            .iter()
            .map(|f| f.column.as_str())
            .chain(self.constants.iter().map(|c| c.column.as_str()));
        self.write_row(columns)
    }

    pub fn row(&self, element: &Element) -> Result<String, FunctionError> {
        let values: Vec<String> = self
            .fields
            .iter()
            .map(|f| element.selection(&f.selection).to_field_string())
            .collect();
        let constants = self.constants.iter().map(|c| c.value.as_str());
        self.write_row(values.iter().map(String::as_str).chain(constants))
    }

    fn write_row<'a>(&self, fields: impl Iterator<Item = &'a str>) -> Result<String, FunctionError> {
        let style = if self.quoted {
            csv::QuoteStyle::Always
        } else {
            csv::QuoteStyle::Necessary
        };
        let mut writer = csv::WriterBuilder::new()
            .quote_style(style)
            .terminator(csv::Terminator::Any(b'\n'))
            .from_writer(Vec::new());
        writer
            .write_record(fields)
            .map_err(|e| FunctionError::Generator(format!("failed to write CSV row: {}", e)))?;
        let bytes = writer
            .into_inner()
            .map_err(|e| FunctionError::Generator(format!("failed to flush CSV row: {}", e)))?;
        let line = String::from_utf8(bytes).map_err(|e| FunctionError::Generator(e.to_string()))?;
        Ok(line.trim_end_matches('\n').to_string())
    }
}
