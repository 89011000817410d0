use async_trait::async_trait;

use crate::mapping::{ColumnMapping, ColumnPair, MappingResult, SchemaMatcher};

/// Pairs columns whose names agree once case and separators are ignored.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExactNameMatcher;

impl ExactNameMatcher {
    pub fn map(internal_columns: &[String], custody_columns: &[String]) -> ColumnMapping {
        let mut column_map = Vec::new();
        let mut unmatched_custody = Vec::new();
        let mut used_internal = vec![false; internal_columns.len()];

        for custody in custody_columns {
            let wanted = normalize(custody);
            let found = internal_columns
                .iter()
                .enumerate()
                .find(|(idx, internal)| !used_internal[*idx] && normalize(internal) == wanted);
            match found {
                Some((idx, internal)) => {
                    used_internal[idx] = true;
                    column_map.push(ColumnPair::new(custody.clone(), internal.clone()));
                }
                None => unmatched_custody.push(custody.clone()),
            }
        }

        let unmatched_nbim = internal_columns
            .iter()
            .zip(used_internal)
            .filter(|(_, used)| !used)
            .map(|(name, _)| name.clone())
            .collect();

        ColumnMapping {
            column_map,
            unmatched_nbim,
            unmatched_custody,
        }
    }
}

#[async_trait]
impl SchemaMatcher for ExactNameMatcher {
    fn name(&self) -> &str {
        "exact_names"
    }

    async fn match_columns(
        &self,
        internal_columns: &[String],
        custody_columns: &[String],
    ) -> MappingResult {
        MappingResult::Mapped(Self::map(internal_columns, custody_columns))
    }
}

fn normalize(name: &str) -> String {
    name.chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .map(|c| c.to_ascii_lowercase())
        .collect()
}
