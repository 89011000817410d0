use anyhow::Result;

use crate::report::EventReport;

const REPORT_COLUMNS: [&str; 11] = [
    "event_key",
    "status",
    "severity",
    "explanation",
    "root_cause",
    "recommended_action",
    "auto_remediable",
    "confidence",
    "max_pct_difference",
    "max_abs_difference",
    "mismatched_fields",
];

pub fn report_csv_header() -> Result<String> {
    let mut writer = csv::Writer::from_writer(vec![]);
    writer.write_record(REPORT_COLUMNS)?;
    let data = writer.into_inner()?;
    Ok(String::from_utf8_lossy(&data).to_string())
}

pub fn report_to_csv_row(report: &EventReport) -> Result<String> {
    let mut writer = csv::Writer::from_writer(vec![]);
    let judgment = report.judgment.as_ref();
    let assessment = report.assessment.as_ref();
    writer.write_record([
        report.event_key.clone(),
        report.status.as_slug().to_string(),
        judgment
            .map(|j| j.severity.as_slug().to_string())
            .unwrap_or_default(),
        judgment.map(|j| j.explanation.clone()).unwrap_or_default(),
        judgment.map(|j| j.root_cause.clone()).unwrap_or_default(),
        judgment
            .map(|j| j.recommended_action.clone())
            .unwrap_or_default(),
        judgment
            .map(|j| j.auto_remediable.to_string())
            .unwrap_or_default(),
        judgment
            .map(|j| format!("{:.2}", j.confidence))
            .unwrap_or_default(),
        assessment
            .map(|a| format!("{:.4}", a.max_pct_difference))
            .unwrap_or_default(),
        assessment
            .map(|a| format!("{:.2}", a.max_abs_difference))
            .unwrap_or_default(),
        assessment
            .map(|a| a.mismatched_fields.join("|"))
            .unwrap_or_default(),
    ])?;
    let data = writer.into_inner()?;
    Ok(String::from_utf8_lossy(&data).to_string())
}
