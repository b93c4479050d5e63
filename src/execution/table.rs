//! In-memory string table loaded from CSV.
//!
//! ## Format
//!
//! - First row is the header with column names
//! - Fields are kept as raw strings; comparisons are lexicographic
//! - Fields may be quoted; `""` inside quotes is an escaped quote
//!
//! ```csv
//! c,l,r
//! 1,0,5
//! 0,3,0
//! ```

use std::fs;
use std::path::Path;

use crate::error::{PlanError, PlanResult};

/// Options for CSV parsing
#[derive(Debug, Clone)]
pub struct CsvOptions {
    /// Field delimiter (default: ',')
    pub delimiter: char,
    /// Quote character for strings (default: '"')
    pub quote_char: char,
    /// Whether to trim whitespace from fields (default: true)
    pub trim_whitespace: bool,
}

impl Default for CsvOptions {
    fn default() -> Self {
        CsvOptions {
            delimiter: ',',
            quote_char: '"',
            trim_whitespace: true,
        }
    }
}

/// Named columns over rows of raw string fields
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl Table {
    /// Build a table, checking every row against the header width
    pub fn new(columns: Vec<String>, rows: Vec<Vec<String>>) -> PlanResult<Self> {
        if let Some((i, row)) = rows.iter().enumerate().find(|(_, r)| r.len() != columns.len()) {
            return Err(PlanError::RowArity {
                row: i + 1,
                expected: columns.len(),
                actual: row.len(),
            });
        }
        Ok(Table { columns, rows })
    }

    pub fn from_csv_str(text: &str) -> PlanResult<Self> {
        Table::from_csv_str_with_options(text, &CsvOptions::default())
    }

    pub fn from_csv_str_with_options(text: &str, options: &CsvOptions) -> PlanResult<Self> {
        let mut lines = text.lines().filter(|l| !l.trim().is_empty());
        let header = lines
            .next()
            .ok_or_else(|| PlanError::ParseError("CSV input has no header row".to_string()))?;
        let columns = parse_csv_line(header, options);

        let rows = lines.map(|line| parse_csv_line(line, options)).collect();
        Table::new(columns, rows)
    }

    /// Load a CSV file with a header row
    pub fn load_csv<P: AsRef<Path>>(path: P) -> PlanResult<Self> {
        let text = fs::read_to_string(path)?;
        Table::from_csv_str(&text)
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Position of `name` in the header
    pub fn column_index(&self, name: &str) -> PlanResult<usize> {
        self.columns
            .iter()
            .position(|c| c == name)
            .ok_or_else(|| PlanError::UnknownColumn(name.to_string()))
    }

    /// Raw field of `row` in column `name`
    pub fn value(&self, row: usize, name: &str) -> PlanResult<&str> {
        let col = self.column_index(name)?;
        self.rows
            .get(row)
            .and_then(|r| r.get(col))
            .map(String::as_str)
            .ok_or_else(|| PlanError::ParseError(format!("row {row} out of range")))
    }
}

/// Split one CSV line into unquoted fields
fn parse_csv_line(line: &str, options: &CsvOptions) -> Vec<String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        if c == options.quote_char {
            if in_quotes && chars.peek() == Some(&options.quote_char) {
                // Escaped quote
                current.push(c);
                chars.next();
            } else {
                in_quotes = !in_quotes;
            }
        } else if c == options.delimiter && !in_quotes {
            fields.push(finish_field(&mut current, options));
        } else {
            current.push(c);
        }
    }
    fields.push(finish_field(&mut current, options));

    fields
}

fn finish_field(current: &mut String, options: &CsvOptions) -> String {
    let field = std::mem::take(current);
    if options.trim_whitespace {
        field.trim().to_string()
    } else {
        field
    }
}
