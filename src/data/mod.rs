pub mod arff;
pub mod loader;

use thiserror::Error;

/// Errors raised while reading a data file or building a dataset from it.
#[derive(Debug, Error)]
pub enum DataError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV parsing error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Excel error: {0}")]
    Excel(String),

    #[error("Unsupported file format: .{0}")]
    UnsupportedFormat(String),

    #[error("{}", format_message(.line, .message))]
    Format {
        line: Option<usize>,
        message: String,
    },

    #[error("Dataset contains no numeric data")]
    NoNumericData,
}

fn format_message(line: &Option<usize>, message: &str) -> String {
    match line {
        Some(line) => format!("Format error on line {line}: {message}"),
        None => format!("Format error: {message}"),
    }
}

impl DataError {
    pub fn format(message: impl Into<String>) -> Self {
        DataError::Format {
            line: None,
            message: message.into(),
        }
    }

    pub fn format_at(line: usize, message: impl Into<String>) -> Self {
        DataError::Format {
            line: Some(line),
            message: message.into(),
        }
    }
}

/// Declared kind of a column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColumnKind {
    Numeric,
    /// Free-form label column. `values` holds the declared value set for
    /// enumerated ARFF attributes (`{a,b,c}`); empty means unrestricted.
    Categorical { values: Vec<String> },
}

impl ColumnKind {
    pub fn is_numeric(&self) -> bool {
        matches!(self, ColumnKind::Numeric)
    }
}

/// Raw result of parsing a data file: header plus row-major string cells.
/// The last column is always the class label.
#[derive(Debug, Clone)]
pub struct ParsedTable {
    pub relation: String,
    pub columns: Vec<(String, ColumnKind)>,
    pub rows: Vec<Vec<String>>,
    /// 1-based source line of each row, used to point at bad input.
    pub row_lines: Vec<usize>,
}

impl ParsedTable {
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Source line for row `idx`, if the parser recorded one.
    pub fn line_of(&self, idx: usize) -> Option<usize> {
        self.row_lines.get(idx).copied()
    }
}
