use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::classify::{BreakJudgment, Severity};
use crate::dataset::CellValue;
use crate::recon::ComparisonPayload;

/// Severity thresholds (percent) and the monetary cap for auto-remediation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BreakPolicy {
    #[serde(default = "default_critical_pct")]
    pub critical_pct: f64,
    #[serde(default = "default_high_pct")]
    pub high_pct: f64,
    #[serde(default = "default_medium_pct")]
    pub medium_pct: f64,
    #[serde(default = "default_auto_remediation_cap")]
    pub auto_remediation_cap: f64,
}

impl Default for BreakPolicy {
    fn default() -> Self {
        Self {
            critical_pct: default_critical_pct(),
            high_pct: default_high_pct(),
            medium_pct: default_medium_pct(),
            auto_remediation_cap: default_auto_remediation_cap(),
        }
    }
}

impl BreakPolicy {
    pub fn severity_for_pct(&self, pct: f64) -> Severity {
        if pct > self.critical_pct {
            Severity::Critical
        } else if pct >= self.high_pct {
            Severity::High
        } else if pct >= self.medium_pct {
            Severity::Medium
        } else if pct > 0.0 {
            Severity::Low
        } else {
            Severity::NoBreak
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PolicyAssessment {
    /// Severity implied by numeric differences and missing amounts. `None`
    /// when only textual fields disagree.
    pub computed_severity: Option<Severity>,
    pub max_pct_difference: f64,
    pub max_abs_difference: f64,
    pub mismatched_fields: Vec<String>,
    pub missing_fields: Vec<String>,
    pub text_mismatch: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub overrides: Vec<String>,
}

pub fn assess(payload: &ComparisonPayload, policy: &BreakPolicy) -> PolicyAssessment {
    let mut out = PolicyAssessment::default();

    for entry in payload.entries() {
        match (&entry.internal, &entry.custody) {
            (CellValue::Null, CellValue::Null) => {}
            (CellValue::Null, CellValue::Number(_)) | (CellValue::Number(_), CellValue::Null) => {
                out.missing_fields.push(entry.label.clone());
            }
            (CellValue::Number(a), CellValue::Number(b)) => {
                if a == b {
                    continue;
                }
                let abs = (a - b).abs();
                let base = a.abs().max(b.abs());
                let pct = if base > 0.0 { abs / base * 100.0 } else { 0.0 };
                out.max_abs_difference = out.max_abs_difference.max(abs);
                out.max_pct_difference = out.max_pct_difference.max(pct);
                out.mismatched_fields.push(entry.label.clone());
            }
            (internal, custody) => {
                if internal.as_key() != custody.as_key() {
                    out.text_mismatch = true;
                    out.mismatched_fields.push(entry.label.clone());
                }
            }
        }
    }

    out.computed_severity = if !out.missing_fields.is_empty() {
        Some(Severity::Critical)
    } else if out.text_mismatch && out.max_pct_difference == 0.0 {
        None
    } else {
        Some(policy.severity_for_pct(out.max_pct_difference))
    };
    out
}

/// Error judgments pass through; otherwise the computed severity wins.
pub fn enforce(
    mut judgment: BreakJudgment,
    assessment: &mut PolicyAssessment,
    policy: &BreakPolicy,
) -> BreakJudgment {
    if judgment.is_error() {
        judgment.auto_remediable = false;
        return judgment;
    }

    let target = match assessment.computed_severity {
        Some(computed) if assessment.text_mismatch => {
            computed.max(judgment.severity).max(Severity::Low)
        }
        Some(computed) => computed,
        None => judgment.severity.max(Severity::Low),
    };
    if target != judgment.severity {
        let note = format!("severity {} -> {}", judgment.severity, target);
        debug!("policy override: {note}");
        assessment.overrides.push(note);
        judgment.severity = target;
    }

    if judgment.auto_remediable {
        let reason = if judgment.severity == Severity::Critical {
            Some("auto_remediable withdrawn: critical severity".to_string())
        } else if assessment.max_abs_difference > policy.auto_remediation_cap {
            Some(format!(
                "auto_remediable withdrawn: difference {:.2} exceeds cap {:.0}",
                assessment.max_abs_difference, policy.auto_remediation_cap
            ))
        } else {
            None
        };
        if let Some(reason) = reason {
            debug!("policy override: {reason}");
            assessment.overrides.push(reason);
            judgment.auto_remediable = false;
        }
    }

    judgment.confidence = judgment.confidence.clamp(0.0, 1.0);
    judgment
}

fn default_critical_pct() -> f64 {
    5.0
}

fn default_high_pct() -> f64 {
    1.0
}

fn default_medium_pct() -> f64 {
    0.1
}

fn default_auto_remediation_cap() -> f64 {
    100_000.0
}
