use async_trait::async_trait;
use tracing::{info, warn};

use crate::llm::{strip_code_fence, ChatClient};
use crate::mapping::{ColumnMapping, MappingResult, SchemaMatcher};

pub struct LlmSchemaMatcher {
    client: ChatClient,
}

impl LlmSchemaMatcher {
    pub fn new(client: ChatClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl SchemaMatcher for LlmSchemaMatcher {
    fn name(&self) -> &str {
        "llm"
    }

    async fn match_columns(
        &self,
        internal_columns: &[String],
        custody_columns: &[String],
    ) -> MappingResult {
        let prompt = build_mapping_prompt(internal_columns, custody_columns);
        info!(
            model = self.client.model(),
            "requesting column mapping for {} internal and {} custody columns",
            internal_columns.len(),
            custody_columns.len()
        );
        match self.client.complete(&prompt, false).await {
            Ok(reply) => parse_mapping_reply(&reply),
            Err(err) => {
                warn!("column mapping request failed: {err}");
                MappingResult::failed(format!("Error: {err}"), None)
            }
        }
    }
}

pub fn build_mapping_prompt(internal_columns: &[String], custody_columns: &[String]) -> String {
    let internal = serde_json::to_string(internal_columns).unwrap_or_default();
    let custody = serde_json::to_string(custody_columns).unwrap_or_default();
    format!(
        r#"You map columns between two CSV exports of dividend bookings that use different naming conventions.

NBIM (internal ledger) headers:
{internal}

Custody (custodian ledger) headers:
{custody}

Pair every custody column with the NBIM column that holds the same data. Names may differ by
case or separator style (camelCase, snake_case, spaces), by abbreviation ("Div Amount" vs
"Dividend Amount"), by word order ("Payment Date" vs "Date of Payment") or by synonym
("Security", "Instrument", "Asset"). Use each column at most once.

Reply with a single JSON object and nothing else (no markdown, no code fences):

{{
    "column_map": [
        ["<custody column>", "<NBIM column>"]
    ],
    "unmatched_nbim": ["<NBIM column>"],
    "unmatched_custody": ["<custody column>"]
}}
"#
    )
}

pub fn parse_mapping_reply(reply: &str) -> MappingResult {
    let text = strip_code_fence(reply);
    match serde_json::from_str::<ColumnMapping>(text) {
        Ok(mapping) => MappingResult::Mapped(mapping),
        Err(err) => {
            warn!("column mapping reply is not valid JSON: {err}");
            MappingResult::failed(
                format!("JSON parsing error: {err}"),
                Some(text.to_string()),
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use httpmock::prelude::*;
    use serde_json::json;

    use crate::llm::{ChatClient, LlmConfig};
    use crate::mapping::llm::{build_mapping_prompt, parse_mapping_reply, LlmSchemaMatcher};
    use crate::mapping::{ColumnPair, MappingResult, SchemaMatcher};

    fn matcher_for(server: &MockServer) -> LlmSchemaMatcher {
        let client = ChatClient::new(LlmConfig {
            api_key: "sk-test".to_string(),
            model: "gpt-4o-mini".to_string(),
            base_url: server.base_url(),
            temperature: 0.2,
            timeout_secs: 5,
            connect_timeout_secs: 5,
        })
        .expect("client");
        LlmSchemaMatcher::new(client)
    }

    fn headers(names: &[&str]) -> Vec<String> {
        names.iter().map(|n| n.to_string()).collect()
    }

    #[tokio::test]
    async fn server_error_yields_error_shaped_mapping() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/chat/completions");
                then.status(500).body("upstream overloaded");
            })
            .await;

        let result = matcher_for(&server)
            .match_columns(&headers(&["EXDATE"]), &headers(&["EVENT_EX_DATE"]))
            .await;
        let MappingResult::Failed(failure) = &result else {
            panic!("expected a failure");
        };
        assert!(failure.error.starts_with("Error: "));
        assert!(failure.raw_response.is_none());
        let value = serde_json::to_value(&result).expect("serialize");
        assert!(value.get("error").is_some());
        assert!(value.get("column_map").is_none());
    }

    #[tokio::test]
    async fn unparseable_reply_keeps_raw_text() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/chat/completions");
                then.status(200).json_body(json!({
                    "choices": [{ "message": { "role": "assistant", "content": "I cannot help with that." } }]
                }));
            })
            .await;

        let result = matcher_for(&server)
            .match_columns(&headers(&["EXDATE"]), &headers(&["EVENT_EX_DATE"]))
            .await;
        let MappingResult::Failed(failure) = result else {
            panic!("expected a failure");
        };
        assert!(failure.error.starts_with("JSON parsing error"));
        assert_eq!(
            failure.raw_response.as_deref(),
            Some("I cannot help with that.")
        );
    }

    #[test]
    fn parses_fenced_reply() {
        let reply = r#"```json
{
  "column_map": [["EVENT_EX_DATE", "EXDATE"], ["DIV_RATE", "DIVIDENDS_PER_SHARE"]],
  "unmatched_nbim": ["TICKER"],
  "unmatched_custody": ["LOAN_QUANTITY"]
}
```"#;
        let MappingResult::Mapped(mapping) = parse_mapping_reply(reply) else {
            panic!("expected a mapping");
        };
        assert_eq!(mapping.column_map[0], ColumnPair::new("EVENT_EX_DATE", "EXDATE"));
        assert_eq!(mapping.unmatched_custody, vec!["LOAN_QUANTITY".to_string()]);
    }

    #[test]
    fn prose_reply_becomes_error_shaped_result() {
        let result = parse_mapping_reply("Sure! Here is the mapping you asked for.");
        let MappingResult::Failed(failure) = &result else {
            panic!("expected a failure");
        };
        assert!(failure.error.starts_with("JSON parsing error"));
        assert_eq!(
            failure.raw_response.as_deref(),
            Some("Sure! Here is the mapping you asked for.")
        );
        let value = serde_json::to_value(&result).expect("serialize");
        assert!(value.get("error").is_some());
    }

    #[test]
    fn prompt_embeds_both_header_lists() {
        let prompt = build_mapping_prompt(
            &["COAC_EVENT_KEY".to_string(), "EXDATE".to_string()],
            &["EVENT_EX_DATE".to_string()],
        );
        assert!(prompt.contains(r#"["COAC_EVENT_KEY","EXDATE"]"#));
        assert!(prompt.contains(r#"["EVENT_EX_DATE"]"#));
        assert!(prompt.contains("\"column_map\""));
    }
}
