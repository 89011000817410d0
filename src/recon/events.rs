use std::collections::BTreeSet;

use crate::dataset::Dataset;

pub fn event_keys(internal: &Dataset, custody: &Dataset, key_column: &str) -> Vec<String> {
    let mut keys = BTreeSet::new();
    for dataset in [internal, custody] {
        keys.extend(
            dataset
                .rows()
                .iter()
                .filter_map(|row| row.text(key_column).map(str::to_string)),
        );
    }
    keys.into_iter().collect()
}

#[cfg(test)]
mod tests {
    use crate::dataset::{Dataset, DatasetRole, Record};
    use crate::recon::events::event_keys;

    fn dataset(role: DatasetRole, keys: &[Option<&str>]) -> Dataset {
        let rows = keys
            .iter()
            .map(|key| Record::parse([("COAC_EVENT_KEY".to_string(), key.unwrap_or(""))]))
            .collect();
        Dataset::new(role, vec!["COAC_EVENT_KEY".to_string()], rows)
    }

    #[test]
    fn union_is_sorted_and_deduplicated() {
        let internal = dataset(
            DatasetRole::Internal,
            &[Some("E3"), Some("E1"), Some("E1"), None],
        );
        let custody = dataset(DatasetRole::Custody, &[Some("E2"), Some("E3")]);
        assert_eq!(
            event_keys(&internal, &custody, "COAC_EVENT_KEY"),
            vec!["E1", "E2", "E3"]
        );
    }

    #[test]
    fn numeric_keys_are_ordered_textually() {
        let internal = dataset(DatasetRole::Internal, &[Some("950123456"), Some("10")]);
        let custody = dataset(DatasetRole::Custody, &[Some("950123456")]);
        assert_eq!(
            event_keys(&internal, &custody, "COAC_EVENT_KEY"),
            vec!["10", "950123456"]
        );
    }

    #[test]
    fn keys_are_not_rounded_or_normalised() {
        let internal = dataset(
            DatasetRole::Internal,
            &[Some("9007199254740993"), Some("00123")],
        );
        let custody = dataset(DatasetRole::Custody, &[Some("9007199254740992")]);
        assert_eq!(
            event_keys(&internal, &custody, "COAC_EVENT_KEY"),
            vec!["00123", "9007199254740992", "9007199254740993"]
        );
    }
}
