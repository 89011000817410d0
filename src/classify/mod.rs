pub mod llm;
pub mod policy;

use std::fmt::{Display, Formatter};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::recon::ComparisonPayload;

pub use llm::LlmBreakClassifier;
pub use policy::{assess, enforce, BreakPolicy, PolicyAssessment};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Critical,
    High,
    Medium,
    Low,
    NoBreak,
    Error,
}

impl Severity {
    pub const ALL: [Severity; 6] = [
        Severity::Critical,
        Severity::High,
        Severity::Medium,
        Severity::Low,
        Severity::NoBreak,
        Severity::Error,
    ];

    pub fn as_slug(&self) -> &'static str {
        match self {
            Self::Critical => "critical",
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
            Self::NoBreak => "no_break",
            Self::Error => "error",
        }
    }

    /// Ordering of real break severities; `Error` is not a severity level
    /// and has no rank.
    pub fn rank(self) -> Option<u8> {
        match self {
            Self::NoBreak => Some(0),
            Self::Low => Some(1),
            Self::Medium => Some(2),
            Self::High => Some(3),
            Self::Critical => Some(4),
            Self::Error => None,
        }
    }

    pub fn max(self, other: Severity) -> Severity {
        match (self.rank(), other.rank()) {
            (Some(a), Some(b)) if b > a => other,
            (Some(_), _) => self,
            (None, _) => other,
        }
    }
}

impl Display for Severity {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_slug())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BreakJudgment {
    pub severity: Severity,
    #[serde(default)]
    pub explanation: String,
    #[serde(default)]
    pub root_cause: String,
    #[serde(default)]
    pub recommended_action: String,
    #[serde(default)]
    pub auto_remediable: bool,
    #[serde(default)]
    pub confidence: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_response: Option<String>,
}

impl BreakJudgment {
    pub fn parse_failure(error: impl Display, raw_response: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            explanation: "Failed to parse LLM response".to_string(),
            root_cause: "API error".to_string(),
            recommended_action: "Retry or investigate manually".to_string(),
            auto_remediable: false,
            confidence: 0.0,
            error: Some(format!("JSON parsing error: {error}")),
            raw_response: Some(raw_response.into()),
        }
    }

    pub fn api_failure(error: impl Display) -> Self {
        Self {
            severity: Severity::Error,
            explanation: "LLM API call failed".to_string(),
            root_cause: "Connection or API error".to_string(),
            recommended_action: "Check API key and retry".to_string(),
            auto_remediable: false,
            confidence: 0.0,
            error: Some(format!("API error: {error}")),
            raw_response: None,
        }
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

#[async_trait]
pub trait BreakClassifier: Send + Sync {
    fn name(&self) -> &str;
    async fn classify(&self, payload: &ComparisonPayload) -> BreakJudgment;
}
