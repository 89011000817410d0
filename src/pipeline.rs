//! Run orchestration: map columns once, then walk every event key in order.

use std::sync::Arc;

use anyhow::Result;
use tracing::{debug, info, warn};

use crate::classify::{assess, enforce, BreakClassifier, BreakPolicy};
use crate::config::MappingFallback;
use crate::dataset::{Dataset, DatasetError};
use crate::mapping::{ColumnMapping, ExactNameMatcher, MappingError, MappingResult, SchemaMatcher};
use crate::recon::{event_keys, extract_break, ExtractOutcome};
use crate::report::sink::ReportSink;
use crate::report::{EventReport, RunSummary};

#[derive(Debug, Clone)]
pub struct ResolvedMapping {
    pub mapping: ColumnMapping,
    pub source: String,
}

/// Runs the schema matcher once. A failed result aborts unless the exact-name
/// fallback is configured.
pub async fn resolve_mapping(
    matcher: &dyn SchemaMatcher,
    fallback: MappingFallback,
    internal: &Dataset,
    custody: &Dataset,
) -> Result<ResolvedMapping, MappingError> {
    let result = matcher
        .match_columns(internal.headers(), custody.headers())
        .await;
    let (result, source) = match (result, fallback) {
        (MappingResult::Failed(failure), MappingFallback::ExactNames) => {
            warn!(
                "{} column mapping failed ({}); falling back to exact names",
                matcher.name(),
                failure.error
            );
            let fallback = ExactNameMatcher;
            (
                fallback
                    .match_columns(internal.headers(), custody.headers())
                    .await,
                fallback.name().to_string(),
            )
        }
        (result, _) => (result, matcher.name().to_string()),
    };

    let mapping = result
        .into_mapping()?
        .validated(internal.headers(), custody.headers());
    if mapping.is_empty() {
        return Err(MappingError::Empty);
    }
    info!(
        "mapped {} column pairs via {source} ({} NBIM / {} custody unmatched)",
        mapping.len(),
        mapping.unmatched_nbim.len(),
        mapping.unmatched_custody.len()
    );
    Ok(ResolvedMapping { mapping, source })
}

pub fn survey_events(
    internal: &Dataset,
    custody: &Dataset,
    key_column: &str,
    mapping: &ColumnMapping,
) -> Result<Vec<(String, ExtractOutcome)>, DatasetError> {
    internal.require_column(key_column)?;
    custody.require_column(key_column)?;
    Ok(event_keys(internal, custody, key_column)
        .into_iter()
        .map(|key| {
            let outcome = extract_break(&key, key_column, mapping, internal, custody);
            (key, outcome)
        })
        .collect())
}

pub struct Reconciler {
    classifier: Arc<dyn BreakClassifier>,
    policy: BreakPolicy,
    key_column: String,
}

impl Reconciler {
    pub fn new(
        classifier: Arc<dyn BreakClassifier>,
        policy: BreakPolicy,
        key_column: impl Into<String>,
    ) -> Self {
        Self {
            classifier,
            policy,
            key_column: key_column.into(),
        }
    }

    /// Processes one event key fully (extract, classify, report) before the
    /// next. Classification failures are reported, never propagated.
    pub async fn run(
        &self,
        internal: &Dataset,
        custody: &Dataset,
        mapping: &ResolvedMapping,
        sink: &dyn ReportSink,
    ) -> Result<RunSummary> {
        internal.require_column(&self.key_column)?;
        custody.require_column(&self.key_column)?;

        let keys = event_keys(internal, custody, &self.key_column);
        info!(
            "reconciling {} events with {} classifier",
            keys.len(),
            self.classifier.name()
        );
        let mut summary = RunSummary::new(mapping.source.clone(), mapping.mapping.len());

        for key in keys {
            let report = self
                .process_event(&key, internal, custody, &mapping.mapping)
                .await;
            summary.record(&report);
            sink.send(&report).await?;
        }

        summary.finish();
        info!(
            "run complete: {} events, {} classified, {} skipped, {} errors",
            summary.events,
            summary.classified,
            summary.skipped_ambiguous + summary.skipped_missing,
            summary.errors
        );
        Ok(summary)
    }

    pub async fn process_event(
        &self,
        key: &str,
        internal: &Dataset,
        custody: &Dataset,
        mapping: &ColumnMapping,
    ) -> EventReport {
        let outcome = extract_break(key, &self.key_column, mapping, internal, custody);
        let ExtractOutcome::Payload(payload) = &outcome else {
            let report = EventReport::skipped(key, &outcome);
            info!(
                event = key,
                internal_rows = report.internal_rows,
                custody_rows = report.custody_rows,
                "event {}",
                report.status.as_slug()
            );
            return report;
        };

        let mut assessment = assess(payload, &self.policy);
        debug!(
            event = key,
            fields = payload.len(),
            mismatched = assessment.mismatched_fields.len(),
            "classifying event"
        );
        let judgment = self.classifier.classify(payload).await;
        if judgment.is_error() {
            warn!(event = key, "classification failed: {}", judgment.explanation);
        }
        let judgment = enforce(judgment, &mut assessment, &self.policy);
        EventReport::classified(key, judgment, assessment)
    }
}
