use comfy_table::presets::UTF8_FULL;
use comfy_table::{Cell, Color, ContentArrangement, Table};

use crate::classify::Severity;
use crate::mapping::ColumnMapping;
use crate::recon::ExtractOutcome;
use crate::report::{EventReport, RunSummary};

fn base_table() -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table
}

fn severity_cell(severity: Severity) -> Cell {
    let cell = Cell::new(severity.as_slug().to_uppercase());
    match severity {
        Severity::Critical | Severity::Error => cell.fg(Color::Red),
        Severity::High => cell.fg(Color::Magenta),
        Severity::Medium => cell.fg(Color::Yellow),
        Severity::Low => cell.fg(Color::Cyan),
        Severity::NoBreak => cell.fg(Color::Green),
    }
}

pub fn render_report_table(report: &EventReport) -> String {
    let mut table = base_table();
    table.set_header(vec!["Event", "Field", "Value"]);

    let Some(judgment) = &report.judgment else {
        let detail = match report.missing_side {
            Some(side) => format!("no {side} row"),
            None => format!(
                "{} internal / {} custody rows",
                report.internal_rows, report.custody_rows
            ),
        };
        table.add_row(vec![
            Cell::new(&report.event_key),
            Cell::new(report.status.as_slug()),
            Cell::new(detail),
        ]);
        return table.to_string();
    };

    table.add_row(vec![
        Cell::new(&report.event_key),
        Cell::new("Severity"),
        severity_cell(judgment.severity),
    ]);
    for (field, value) in [
        ("Explanation", judgment.explanation.clone()),
        ("Root cause", judgment.root_cause.clone()),
        ("Action", judgment.recommended_action.clone()),
        (
            "Auto-remediable",
            if judgment.auto_remediable { "YES" } else { "NO" }.to_string(),
        ),
        ("Confidence", format!("{:.2}", judgment.confidence)),
    ] {
        table.add_row(vec![Cell::new(""), Cell::new(field), Cell::new(value)]);
    }
    if let Some(assessment) = &report.assessment {
        if !assessment.mismatched_fields.is_empty() {
            table.add_row(vec![
                Cell::new(""),
                Cell::new("Mismatched"),
                Cell::new(assessment.mismatched_fields.join(", ")),
            ]);
        }
        if assessment.max_pct_difference > 0.0 {
            table.add_row(vec![
                Cell::new(""),
                Cell::new("Max difference"),
                Cell::new(format!(
                    "{:.4}% ({:.2})",
                    assessment.max_pct_difference, assessment.max_abs_difference
                )),
            ]);
        }
        for note in &assessment.overrides {
            table.add_row(vec![Cell::new(""), Cell::new("Policy"), Cell::new(note)]);
        }
    }
    if let Some(error) = &judgment.error {
        table.add_row(vec![
            Cell::new(""),
            Cell::new("Error"),
            Cell::new(error).fg(Color::Red),
        ]);
    }
    table.to_string()
}

pub fn render_mapping_table(mapping: &ColumnMapping) -> String {
    let mut table = base_table();
    table.set_header(vec!["#", "Custody column", "NBIM column"]);
    for (idx, pair) in mapping.column_map.iter().enumerate() {
        table.add_row(vec![
            (idx + 1).to_string(),
            pair.custody.clone(),
            pair.internal.clone(),
        ]);
    }

    let mut out = table.to_string();
    out.push_str(&format!(
        "\nUnmatched NBIM: {}\nUnmatched custody: {}",
        join_or_dash(&mapping.unmatched_nbim),
        join_or_dash(&mapping.unmatched_custody)
    ));
    out
}

pub fn render_events_table(events: &[(String, ExtractOutcome)]) -> String {
    let mut table = base_table();
    table.set_header(vec!["Event", "Status", "NBIM rows", "Custody rows"]);
    for (event_key, outcome) in events {
        let (internal_rows, custody_rows) = outcome.row_counts();
        let status = match outcome {
            ExtractOutcome::Payload(payload) => format!("comparable ({} fields)", payload.len()),
            ExtractOutcome::SkippedAmbiguous { .. } => "ambiguous".to_string(),
            ExtractOutcome::SkippedMissing { missing, .. } => format!("missing {missing}"),
        };
        table.add_row(vec![
            event_key.clone(),
            status,
            internal_rows.to_string(),
            custody_rows.to_string(),
        ]);
    }
    table.to_string()
}

pub fn render_summary_table(summary: &RunSummary) -> String {
    let mut table = base_table();
    table.set_header(vec!["Metric", "Count"]);
    table.add_row(vec!["Events".to_string(), summary.events.to_string()]);
    table.add_row(vec!["Classified".to_string(), summary.classified.to_string()]);
    table.add_row(vec![
        "Skipped (ambiguous)".to_string(),
        summary.skipped_ambiguous.to_string(),
    ]);
    table.add_row(vec![
        "Skipped (missing)".to_string(),
        summary.skipped_missing.to_string(),
    ]);
    for severity in Severity::ALL {
        let count = summary.severity_count(severity);
        if count > 0 {
            table.add_row(vec![severity_cell(severity), Cell::new(count)]);
        }
    }
    table.add_row(vec![
        "Auto-remediable".to_string(),
        summary.auto_remediable.to_string(),
    ]);
    table.to_string()
}

fn join_or_dash(items: &[String]) -> String {
    if items.is_empty() {
        "-".to_string()
    } else {
        items.join(", ")
    }
}
