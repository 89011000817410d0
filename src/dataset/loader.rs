use std::fs::File;
use std::path::Path;

use tracing::{debug, info};

use crate::dataset::{Dataset, DatasetError, DatasetRole, Record};

/// Rows with a column count different from the header are rejected.
pub fn load_dataset(
    path: &Path,
    delimiter: u8,
    role: DatasetRole,
) -> Result<Dataset, DatasetError> {
    let file = File::open(path).map_err(|source| DatasetError::File {
        role,
        path: path.to_path_buf(),
        source,
    })?;
    let format_error = |message: String| DatasetError::Format {
        role,
        path: path.to_path_buf(),
        message,
    };

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(true)
        .flexible(false)
        .trim(csv::Trim::All)
        .from_reader(file);

    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| format_error(format!("cannot read header: {e}")))?
        .iter()
        .map(|h| h.trim_start_matches('\u{feff}').to_string())
        .collect();
    if headers.iter().all(|h| h.is_empty()) {
        return Err(format_error("header line is empty".to_string()));
    }

    let mut rows = Vec::new();
    for (idx, result) in reader.records().enumerate() {
        let record = result.map_err(|e| match e.kind() {
            csv::ErrorKind::UnequalLengths {
                expected_len, len, ..
            } => format_error(format!(
                "row {} has {len} fields, header has {expected_len}",
                idx + 2
            )),
            _ => format_error(format!("row {}: {e}", idx + 2)),
        })?;
        rows.push(Record::parse(headers.iter().cloned().zip(record.iter())));
    }

    debug!(role = role.as_slug(), columns = headers.len(), "parsed header");
    info!(
        "loaded {} {} rows from {}",
        rows.len(),
        role,
        path.display()
    );
    Ok(Dataset::new(role, headers, rows))
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use tempfile::NamedTempFile;

    use crate::dataset::{load_dataset, CellValue, DatasetError, DatasetRole};

    fn write_fixture(contents: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().expect("temp file");
        file.write_all(contents.as_bytes()).expect("write fixture");
        file
    }

    #[test]
    fn loads_semicolon_separated_rows() {
        let file = write_fixture(
            "COAC_EVENT_KEY;ISIN;GROSS_AMOUNT_QUOTATION\n\
             950123456;US0378331005;1250.50\n\
             950123457;NO0010096985;300\n",
        );
        let dataset = load_dataset(file.path(), b';', DatasetRole::Internal).expect("load");
        assert_eq!(
            dataset.headers(),
            ["COAC_EVENT_KEY", "ISIN", "GROSS_AMOUNT_QUOTATION"]
        );
        assert_eq!(dataset.len(), 2);
        assert_eq!(
            dataset.rows()[1].get("GROSS_AMOUNT_QUOTATION"),
            Some(&CellValue::Number(300.0))
        );
        assert_eq!(
            dataset.rows_for_key("COAC_EVENT_KEY", "950123456").len(),
            1
        );
    }

    #[test]
    fn event_keys_keep_their_source_text() {
        let file = write_fixture(
            "COAC_EVENT_KEY;GROSS_AMOUNT_QUOTATION\n\
             9007199254740993;100\n\
             9007199254740992;50\n\
             00123;10\n",
        );
        let dataset = load_dataset(file.path(), b';', DatasetRole::Internal).expect("load");
        assert_eq!(dataset.rows()[2].text("COAC_EVENT_KEY"), Some("00123"));
        assert_eq!(
            dataset.rows_for_key("COAC_EVENT_KEY", "9007199254740993").len(),
            1
        );
        assert!(dataset.rows_for_key("COAC_EVENT_KEY", "123").is_empty());
    }

    #[test]
    fn ragged_rows_are_rejected() {
        let file = write_fixture("A;B\n1;2\n3\n");
        let err = load_dataset(file.path(), b';', DatasetRole::Custody).unwrap_err();
        match err {
            DatasetError::Format { message, .. } => assert!(message.contains("row 3")),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn missing_file_is_a_file_error() {
        let err = load_dataset(
            std::path::Path::new("/nonexistent/bookings.csv"),
            b';',
            DatasetRole::Internal,
        )
        .unwrap_err();
        assert!(matches!(err, DatasetError::File { .. }));
    }

    #[test]
    fn require_column_reports_role() {
        let file = write_fixture("ISIN\nUS0378331005\n");
        let dataset = load_dataset(file.path(), b';', DatasetRole::Custody).expect("load");
        let err = dataset.require_column("COAC_EVENT_KEY").unwrap_err();
        assert_eq!(err.to_string(), "Custody dataset has no 'COAC_EVENT_KEY' column");
    }
}
