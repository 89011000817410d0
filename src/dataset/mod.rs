pub mod loader;
pub mod value;

use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;

use serde::Serialize;
use thiserror::Error;

pub use loader::load_dataset;
pub use value::CellValue;

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum DatasetRole {
    Internal,
    Custody,
}

impl DatasetRole {
    pub fn as_slug(&self) -> &'static str {
        match self {
            Self::Internal => "internal",
            Self::Custody => "custody",
        }
    }
}

impl Display for DatasetRole {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let display = match self {
            Self::Internal => "NBIM",
            Self::Custody => "Custody",
        };
        write!(f, "{display}")
    }
}

#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("cannot read {role} dataset {path}: {source}")]
    File {
        role: DatasetRole,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed {role} dataset {path}: {message}")]
    Format {
        role: DatasetRole,
        path: PathBuf,
        message: String,
    },
    #[error("{role} dataset has no '{column}' column")]
    MissingColumn { role: DatasetRole, column: String },
}

/// One row, keyed by column name. The trimmed source text of each non-empty
/// cell is kept next to its parsed value so identifiers survive unchanged.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Record {
    fields: BTreeMap<String, CellValue>,
    text: BTreeMap<String, String>,
}

impl Record {
    pub fn parse<'a>(cells: impl IntoIterator<Item = (String, &'a str)>) -> Self {
        let mut record = Self::default();
        for (column, raw) in cells {
            let trimmed = raw.trim();
            if !trimmed.is_empty() {
                record.text.insert(column.clone(), trimmed.to_string());
            }
            record.fields.insert(column, CellValue::parse(trimmed));
        }
        record
    }

    pub fn get(&self, column: &str) -> Option<&CellValue> {
        self.fields.get(column)
    }

    pub fn text(&self, column: &str) -> Option<&str> {
        self.text.get(column).map(String::as_str)
    }
}

#[derive(Debug, Clone)]
pub struct Dataset {
    pub role: DatasetRole,
    headers: Vec<String>,
    rows: Vec<Record>,
}

impl Dataset {
    pub fn new(role: DatasetRole, headers: Vec<String>, rows: Vec<Record>) -> Self {
        Self {
            role,
            headers,
            rows,
        }
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn rows(&self) -> &[Record] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn has_column(&self, column: &str) -> bool {
        self.headers.iter().any(|h| h == column)
    }

    pub fn require_column(&self, column: &str) -> Result<(), DatasetError> {
        if self.has_column(column) {
            Ok(())
        } else {
            Err(DatasetError::MissingColumn {
                role: self.role,
                column: column.to_string(),
            })
        }
    }

    pub fn rows_for_key<'a>(&'a self, key_column: &str, key: &str) -> Vec<&'a Record> {
        self.rows
            .iter()
            .filter(|row| row.text(key_column) == Some(key))
            .collect()
    }
}
