pub mod sink;

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::classify::{BreakJudgment, PolicyAssessment, Severity};
use crate::dataset::DatasetRole;
use crate::recon::ExtractOutcome;

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum EventStatus {
    Classified,
    SkippedAmbiguous,
    SkippedMissing,
}

impl EventStatus {
    pub fn as_slug(&self) -> &'static str {
        match self {
            Self::Classified => "classified",
            Self::SkippedAmbiguous => "skipped_ambiguous",
            Self::SkippedMissing => "skipped_missing",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct EventReport {
    pub event_key: String,
    pub status: EventStatus,
    pub internal_rows: usize,
    pub custody_rows: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub missing_side: Option<DatasetRole>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub judgment: Option<BreakJudgment>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assessment: Option<PolicyAssessment>,
}

impl EventReport {
    pub fn classified(
        event_key: impl Into<String>,
        judgment: BreakJudgment,
        assessment: PolicyAssessment,
    ) -> Self {
        Self {
            event_key: event_key.into(),
            status: EventStatus::Classified,
            internal_rows: 1,
            custody_rows: 1,
            missing_side: None,
            judgment: Some(judgment),
            assessment: Some(assessment),
        }
    }

    pub fn skipped(event_key: impl Into<String>, outcome: &ExtractOutcome) -> Self {
        let (internal_rows, custody_rows) = outcome.row_counts();
        let (status, missing_side) = match outcome {
            ExtractOutcome::SkippedMissing { missing, .. } => {
                (EventStatus::SkippedMissing, Some(*missing))
            }
            _ => (EventStatus::SkippedAmbiguous, None),
        };
        Self {
            event_key: event_key.into(),
            status,
            internal_rows,
            custody_rows,
            missing_side,
            judgment: None,
            assessment: None,
        }
    }

    pub fn severity(&self) -> Option<Severity> {
        self.judgment.as_ref().map(|j| j.severity)
    }

    pub fn is_skipped(&self) -> bool {
        self.status != EventStatus::Classified
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub mapper: String,
    pub mapped_columns: usize,
    pub events: usize,
    pub classified: usize,
    pub skipped_ambiguous: usize,
    pub skipped_missing: usize,
    pub errors: usize,
    pub auto_remediable: usize,
    pub by_severity: BTreeMap<String, usize>,
}

impl RunSummary {
    pub fn new(mapper: impl Into<String>, mapped_columns: usize) -> Self {
        let now = Utc::now();
        Self {
            started_at: now,
            finished_at: now,
            mapper: mapper.into(),
            mapped_columns,
            events: 0,
            classified: 0,
            skipped_ambiguous: 0,
            skipped_missing: 0,
            errors: 0,
            auto_remediable: 0,
            by_severity: BTreeMap::new(),
        }
    }

    pub fn record(&mut self, report: &EventReport) {
        self.events += 1;
        match report.status {
            EventStatus::Classified => self.classified += 1,
            EventStatus::SkippedAmbiguous => self.skipped_ambiguous += 1,
            EventStatus::SkippedMissing => self.skipped_missing += 1,
        }
        if let Some(judgment) = &report.judgment {
            if judgment.is_error() {
                self.errors += 1;
            }
            if judgment.auto_remediable {
                self.auto_remediable += 1;
            }
            *self
                .by_severity
                .entry(judgment.severity.as_slug().to_string())
                .or_default() += 1;
        }
    }

    pub fn finish(&mut self) {
        self.finished_at = Utc::now();
    }

    pub fn severity_count(&self, severity: Severity) -> usize {
        self.by_severity
            .get(severity.as_slug())
            .copied()
            .unwrap_or(0)
    }
}
