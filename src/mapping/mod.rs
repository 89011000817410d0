pub mod exact;
pub mod llm;

use std::collections::BTreeSet;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

pub use exact::ExactNameMatcher;
pub use llm::LlmSchemaMatcher;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "(String, String)", into = "(String, String)")]
pub struct ColumnPair {
    pub custody: String,
    pub internal: String,
}

impl ColumnPair {
    pub fn new(custody: impl Into<String>, internal: impl Into<String>) -> Self {
        Self {
            custody: custody.into(),
            internal: internal.into(),
        }
    }

    pub fn label(&self) -> String {
        format!("{}/{}", self.custody, self.internal)
    }
}

impl From<(String, String)> for ColumnPair {
    fn from((custody, internal): (String, String)) -> Self {
        Self { custody, internal }
    }
}

impl From<ColumnPair> for (String, String) {
    fn from(pair: ColumnPair) -> Self {
        (pair.custody, pair.internal)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnMapping {
    pub column_map: Vec<ColumnPair>,
    #[serde(default)]
    pub unmatched_nbim: Vec<String>,
    #[serde(default)]
    pub unmatched_custody: Vec<String>,
}

impl ColumnMapping {
    pub fn validated(self, internal_columns: &[String], custody_columns: &[String]) -> Self {
        let mut seen_custody = BTreeSet::new();
        let mut seen_internal = BTreeSet::new();
        let mut column_map = Vec::with_capacity(self.column_map.len());
        for pair in self.column_map {
            if !custody_columns.contains(&pair.custody) {
                warn!("dropping mapping {}: unknown custody column", pair.label());
                continue;
            }
            if !internal_columns.contains(&pair.internal) {
                warn!("dropping mapping {}: unknown internal column", pair.label());
                continue;
            }
            if seen_custody.contains(&pair.custody) || seen_internal.contains(&pair.internal) {
                warn!("dropping mapping {}: column already mapped", pair.label());
                continue;
            }
            seen_custody.insert(pair.custody.clone());
            seen_internal.insert(pair.internal.clone());
            column_map.push(pair);
        }
        Self {
            column_map,
            unmatched_nbim: self.unmatched_nbim,
            unmatched_custody: self.unmatched_custody,
        }
    }

    pub fn len(&self) -> usize {
        self.column_map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.column_map.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MappingFailure {
    pub error: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_response: Option<String>,
}

/// Outcome of a schema-matching call. A failed call is an error-shaped
/// value carrying an `error` field, never a panic or propagated error.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum MappingResult {
    Mapped(ColumnMapping),
    Failed(MappingFailure),
}

impl MappingResult {
    pub fn failed(error: impl Into<String>, raw_response: Option<String>) -> Self {
        Self::Failed(MappingFailure {
            error: error.into(),
            raw_response,
        })
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Self::Failed(_))
    }

    pub fn into_mapping(self) -> Result<ColumnMapping, MappingError> {
        match self {
            Self::Mapped(mapping) if mapping.is_empty() => Err(MappingError::Empty),
            Self::Mapped(mapping) => Ok(mapping),
            Self::Failed(failure) => Err(MappingError::Failed {
                error: failure.error,
                raw_response: failure.raw_response,
            }),
        }
    }
}

#[derive(Debug, Error)]
pub enum MappingError {
    #[error("column mapping failed: {error}")]
    Failed {
        error: String,
        raw_response: Option<String>,
    },
    #[error("column mapping produced no column pairs")]
    Empty,
}

#[async_trait]
pub trait SchemaMatcher: Send + Sync {
    fn name(&self) -> &str;
    async fn match_columns(
        &self,
        internal_columns: &[String],
        custody_columns: &[String],
    ) -> MappingResult;
}
