use async_trait::async_trait;
use tracing::warn;

use crate::classify::{BreakClassifier, BreakJudgment, BreakPolicy};
use crate::llm::{strip_code_fence, ChatClient};
use crate::recon::ComparisonPayload;

pub struct LlmBreakClassifier {
    client: ChatClient,
    policy: BreakPolicy,
}

impl LlmBreakClassifier {
    pub fn new(client: ChatClient, policy: BreakPolicy) -> Self {
        Self { client, policy }
    }
}

#[async_trait]
impl BreakClassifier for LlmBreakClassifier {
    fn name(&self) -> &str {
        "llm"
    }

    async fn classify(&self, payload: &ComparisonPayload) -> BreakJudgment {
        let prompt = build_classification_prompt(payload, &self.policy);
        match self.client.complete(&prompt, true).await {
            Ok(reply) => parse_judgment_reply(&reply),
            Err(err) => {
                warn!("break classification request failed: {err}");
                BreakJudgment::api_failure(err)
            }
        }
    }
}

pub fn build_classification_prompt(payload: &ComparisonPayload, policy: &BreakPolicy) -> String {
    let data = payload.to_pretty_json();
    let critical = policy.critical_pct;
    let high = policy.high_pct;
    let medium = policy.medium_pct;
    let cap = policy.auto_remediation_cap;
    format!(
        r#"You are reviewing a dividend reconciliation break for NBIM (Norway's sovereign wealth fund).
Each entry below is "<custody column>/<NBIM column>": [NBIM value, custody value].

DATA:
{data}

1. Explain why the two sources disagree. Plausible causes include:
   - securities lending (shares on loan reduce the custody position)
   - withholding tax differences (treaty rate vs standard rate)
   - payment date timing
   - FX rate timing
   - data entry errors

2. Grade the severity as one of critical, high, medium, low, no_break:
   - critical: more than {critical}% difference, or a missing record
   - high: {high}% to {critical}% difference
   - medium: {medium}% to {high}% difference
   - low: less than {medium}% difference
   - no_break: every field matches

3. Decide whether the break can be fixed automatically. Only a well-known pattern seen with
   high confidence qualifies, and never a critical break or a difference above {cap:.0}.

Reply with one JSON object:
{{
    "severity": "critical|high|medium|low|no_break",
    "explanation": "one sentence on what happened",
    "root_cause": "the underlying reason",
    "recommended_action": "what to do next",
    "auto_remediable": true,
    "confidence": 0.0
}}

Be concise and specific."#
    )
}

pub fn parse_judgment_reply(reply: &str) -> BreakJudgment {
    let text = strip_code_fence(reply);
    match serde_json::from_str::<BreakJudgment>(text) {
        Ok(mut judgment) => {
            judgment.confidence = judgment.confidence.clamp(0.0, 1.0);
            judgment
        }
        Err(err) => {
            warn!("break classification reply is not valid JSON: {err}");
            BreakJudgment::parse_failure(err, text)
        }
    }
}

#[cfg(test)]
mod tests {
    use httpmock::prelude::*;
    use serde_json::json;

    use crate::classify::llm::{
        build_classification_prompt, parse_judgment_reply, LlmBreakClassifier,
    };
    use crate::classify::{BreakClassifier, BreakPolicy, Severity};
    use crate::dataset::CellValue;
    use crate::llm::{ChatClient, LlmConfig};
    use crate::recon::{ComparisonPayload, PayloadEntry};

    fn classifier_for(server: &MockServer) -> LlmBreakClassifier {
        let client = ChatClient::new(LlmConfig {
            api_key: "sk-test".to_string(),
            model: "gpt-4o-mini".to_string(),
            base_url: server.base_url(),
            temperature: 0.2,
            timeout_secs: 5,
            connect_timeout_secs: 5,
        })
        .expect("client");
        LlmBreakClassifier::new(client, BreakPolicy::default())
    }

    fn amount_payload() -> ComparisonPayload {
        [PayloadEntry {
            label: "CUST_AMT/INT_AMT".to_string(),
            internal: CellValue::Number(100.0),
            custody: CellValue::Number(99.9),
        }]
        .into_iter()
        .collect()
    }

    #[tokio::test]
    async fn server_error_yields_api_failure() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/chat/completions");
                then.status(500).body("internal error");
            })
            .await;

        let judgment = classifier_for(&server).classify(&amount_payload()).await;
        assert_eq!(judgment.severity, Severity::Error);
        assert_eq!(judgment.explanation, "LLM API call failed");
        assert!(!judgment.auto_remediable);
        assert_eq!(judgment.confidence, 0.0);
        assert!(judgment
            .error
            .as_deref()
            .is_some_and(|e| e.starts_with("API error: ")));
    }

    #[tokio::test]
    async fn non_json_reply_yields_parse_failure() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/chat/completions");
                then.status(200).json_body(json!({
                    "choices": [{ "message": { "role": "assistant", "content": "Looks like a tax issue." } }]
                }));
            })
            .await;

        let judgment = classifier_for(&server).classify(&amount_payload()).await;
        assert_eq!(judgment.severity, Severity::Error);
        assert_eq!(judgment.explanation, "Failed to parse LLM response");
        assert_eq!(
            judgment.raw_response.as_deref(),
            Some("Looks like a tax issue.")
        );
        assert_eq!(judgment.confidence, 0.0);
    }

    #[test]
    fn parses_reply_and_clamps_confidence() {
        let judgment = parse_judgment_reply(
            r#"{"severity": "medium", "explanation": "Custody applied 25% withholding.",
                "root_cause": "Treaty rate not applied", "recommended_action": "Reclaim tax",
                "auto_remediable": false, "confidence": 1.4}"#,
        );
        assert_eq!(judgment.severity, Severity::Medium);
        assert_eq!(judgment.root_cause, "Treaty rate not applied");
        assert_eq!(judgment.confidence, 1.0);
    }

    #[test]
    fn unknown_severity_is_a_parse_failure() {
        let judgment = parse_judgment_reply(r#"{"severity": "catastrophic"}"#);
        assert_eq!(judgment.severity, Severity::Error);
        assert_eq!(judgment.explanation, "Failed to parse LLM response");
        assert_eq!(
            judgment.raw_response.as_deref(),
            Some(r#"{"severity": "catastrophic"}"#)
        );
        assert!(!judgment.auto_remediable);
    }

    #[test]
    fn prompt_embeds_payload_and_thresholds() {
        let prompt = build_classification_prompt(&amount_payload(), &BreakPolicy::default());
        assert!(prompt.contains("\"CUST_AMT/INT_AMT\": ["));
        assert!(prompt.contains("99.9"));
        assert!(prompt.contains("more than 5% difference"));
        assert!(prompt.contains("above 100000"));
    }
}
