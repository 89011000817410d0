use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

use crate::dataset::{CellValue, Dataset, DatasetRole};
use crate::mapping::ColumnMapping;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PayloadEntry {
    pub label: String,
    pub internal: CellValue,
    pub custody: CellValue,
}

/// Corresponding field values for one event, in column-map order.
/// Serializes as `{"<custody>/<internal>": [internal, custody], ...}`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ComparisonPayload {
    entries: Vec<PayloadEntry>,
}

impl ComparisonPayload {
    pub fn entries(&self) -> &[PayloadEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, label: &str) -> Option<&PayloadEntry> {
        self.entries.iter().find(|e| e.label == label)
    }

    pub fn to_pretty_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_else(|_| "{}".to_string())
    }
}

impl FromIterator<PayloadEntry> for ComparisonPayload {
    fn from_iter<T: IntoIterator<Item = PayloadEntry>>(iter: T) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

impl Serialize for ComparisonPayload {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for entry in &self.entries {
            map.serialize_entry(&entry.label, &[&entry.internal, &entry.custody])?;
        }
        map.end()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExtractOutcome {
    Payload(ComparisonPayload),
    SkippedAmbiguous {
        internal_rows: usize,
        custody_rows: usize,
    },
    SkippedMissing {
        missing: DatasetRole,
        internal_rows: usize,
        custody_rows: usize,
    },
}

impl ExtractOutcome {
    pub fn payload(&self) -> Option<&ComparisonPayload> {
        match self {
            Self::Payload(payload) => Some(payload),
            _ => None,
        }
    }

    pub fn row_counts(&self) -> (usize, usize) {
        match self {
            Self::Payload(_) => (1, 1),
            Self::SkippedAmbiguous {
                internal_rows,
                custody_rows,
            }
            | Self::SkippedMissing {
                internal_rows,
                custody_rows,
                ..
            } => (*internal_rows, *custody_rows),
        }
    }
}

pub fn extract_break(
    event_key: &str,
    key_column: &str,
    mapping: &ColumnMapping,
    internal: &Dataset,
    custody: &Dataset,
) -> ExtractOutcome {
    let internal_rows = internal.rows_for_key(key_column, event_key);
    let custody_rows = custody.rows_for_key(key_column, event_key);

    if internal_rows.len() > 1 || custody_rows.len() > 1 {
        return ExtractOutcome::SkippedAmbiguous {
            internal_rows: internal_rows.len(),
            custody_rows: custody_rows.len(),
        };
    }
    let (Some(internal_row), Some(custody_row)) = (internal_rows.first(), custody_rows.first())
    else {
        let missing = if internal_rows.is_empty() {
            DatasetRole::Internal
        } else {
            DatasetRole::Custody
        };
        return ExtractOutcome::SkippedMissing {
            missing,
            internal_rows: internal_rows.len(),
            custody_rows: custody_rows.len(),
        };
    };

    let payload = mapping
        .column_map
        .iter()
        .map(|pair| PayloadEntry {
            label: pair.label(),
            internal: internal_row
                .get(&pair.internal)
                .cloned()
                .unwrap_or(CellValue::Null),
            custody: custody_row
                .get(&pair.custody)
                .cloned()
                .unwrap_or(CellValue::Null),
        })
        .collect();
    ExtractOutcome::Payload(payload)
}
