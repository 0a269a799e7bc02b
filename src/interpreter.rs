//! Utterance Interpreter
//!
//! Sends the schema, the context snapshot and the transcript to the oracle in
//! a single call and parses its strict-JSON answer. There is no retry loop:
//! any failure ends the turn.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::Arc;
use std::time::Duration;

use crate::context::ContextSnapshot;
use crate::error::{VoiceError, VoiceResult};
use crate::llm::LlmClient;
use crate::schema::SchemaDescription;

/// Untrusted oracle output
///
/// Each `updates` entry is either a bare string (replace) or
/// `{"value": ..., "append": true|false}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawInterpretationResult {
    pub updates: Map<String, Value>,
    #[serde(default)]
    pub summary: String,
}

impl RawInterpretationResult {
    /// Parse an oracle response body
    ///
    /// One surrounding Markdown code fence is tolerated; anything else that
    /// is not a JSON object with an `updates` object is rejected.
    pub fn parse(raw: &str) -> VoiceResult<Self> {
        let body = strip_code_fence(raw.trim());
        if body.is_empty() {
            return Err(VoiceError::interpretation("oracle returned an empty response"));
        }
        serde_json::from_str(body).map_err(|e| {
            let preview: String = body.chars().take(200).collect();
            tracing::warn!(error = %e, preview = %preview, "Oracle response is not valid JSON");
            VoiceError::interpretation(format!("malformed oracle response: {}", e))
        })
    }
}

fn strip_code_fence(text: &str) -> &str {
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

/// Single-shot oracle wrapper
pub struct UtteranceInterpreter {
    client: Arc<dyn LlmClient>,
    timeout: Option<Duration>,
}

impl UtteranceInterpreter {
    pub fn new(client: Arc<dyn LlmClient>) -> Self {
        Self {
            client,
            timeout: None,
        }
    }

    /// Bound the oracle call; unset means wait indefinitely
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Interpret `transcript` against the form
    pub async fn interpret(
        &self,
        transcript: &str,
        schema: &SchemaDescription,
        snapshot: &ContextSnapshot,
    ) -> VoiceResult<RawInterpretationResult> {
        let transcript = transcript.trim();
        if transcript.is_empty() {
            return Err(VoiceError::EmptyTranscript);
        }

        let system_prompt = build_system_prompt(schema)?;
        let user_prompt = build_user_prompt(transcript, snapshot)?;

        tracing::info!(
            provider = self.client.provider_name(),
            model = self.client.model_name(),
            transcript_len = transcript.len(),
            "Interpreting utterance"
        );

        let call = self.client.chat_json(&system_prompt, &user_prompt);
        let response = match self.timeout {
            Some(limit) => tokio::time::timeout(limit, call).await.map_err(|_| {
                VoiceError::interpretation(format!("oracle did not answer within {:?}", limit))
            })?,
            None => call.await,
        }
        .map_err(|e| {
            tracing::error!(error = %e, "Oracle call failed");
            VoiceError::interpretation(e)
        })?;

        let result = RawInterpretationResult::parse(&response)?;
        tracing::debug!(
            updates = result.updates.len(),
            summary = %result.summary,
            "Oracle returned candidate updates"
        );
        Ok(result)
    }
}

fn build_system_prompt(schema: &SchemaDescription) -> VoiceResult<String> {
    let schema_json = serde_json::to_string_pretty(schema).map_err(VoiceError::interpretation)?;

    Ok(format!(
        r#"You fill in a business-document form from a spoken instruction.

## Form schema

{schema_json}

## Rules

1. Use ONLY paths from the schema. Scalar paths are used as listed. Rows of a
   repeating section are addressed as `<section>.<index>.<attribute>` with a
   zero-based index.
2. To add a new row, use the index equal to the section's current length
   (see `arrayLengths`). Never renumber existing rows.
3. If the user adds to existing text ("add", "also", "mention", "include"),
   return `{{"value": "<new text only>", "append": true}}` for that path.
   If the user sets or changes a value ("set", "change", "replace", "make it"),
   return the new value as a plain string.
4. Numbers as plain digits ("five thousand" -> "5000"), dates as YYYY-MM-DD.
5. Leave out anything you are not asked to change.

## Response format

{{
  "updates": {{ "<path>": "<value>" | {{"value": "<value>", "append": true}} }},
  "summary": "<one short sentence describing the changes>"
}}"#
    ))
}

fn build_user_prompt(transcript: &str, snapshot: &ContextSnapshot) -> VoiceResult<String> {
    let context_json = serde_json::to_string_pretty(snapshot).map_err(VoiceError::interpretation)?;

    let mut prompt = format!("## Current form context\n\n{}\n\n", context_json);

    if let Some(focused) = &snapshot.focused_field {
        prompt.push_str(&format!(
            "## Focused field\n\nThe user is dictating into \"{}\" ({}). Put the value on that path unless the instruction clearly names another field.\n\n",
            focused.display_label, focused.name
        ));
    }

    prompt.push_str(&format!("## Instruction\n\n{}", transcript));
    Ok(prompt)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::FocusedField;
    use crate::form::FormTree;
    use crate::schema::FieldSchemaRegistry;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CannedClient {
        response: anyhow::Result<String>,
        calls: AtomicUsize,
    }

    impl CannedClient {
        fn ok(body: &str) -> Self {
            Self {
                response: Ok(body.to_string()),
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl LlmClient for CannedClient {
        async fn chat_json(&self, _system: &str, _user: &str) -> anyhow::Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match &self.response {
                Ok(body) => Ok(body.clone()),
                Err(e) => Err(anyhow::anyhow!("{}", e)),
            }
        }

        fn model_name(&self) -> &str {
            "canned"
        }

        fn provider_name(&self) -> &str {
            "Test"
        }
    }

    struct StalledClient {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl LlmClient for StalledClient {
        async fn chat_json(&self, _system: &str, _user: &str) -> anyhow::Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_secs(30)).await;
            Ok(r#"{"updates": {}}"#.to_string())
        }

        fn model_name(&self) -> &str {
            "stalled"
        }

        fn provider_name(&self) -> &str {
            "Test"
        }
    }

    fn snapshot() -> ContextSnapshot {
        ContextSnapshot::capture(
            &FormTree::new(),
            &FieldSchemaRegistry::business_document(),
            None,
        )
        .unwrap()
    }

    #[test]
    fn test_parse_plain_and_fenced_json() {
        let plain = r#"{"updates": {"clientDetails.clientName": "John Doe"}, "summary": "Set name"}"#;
        let parsed = RawInterpretationResult::parse(plain).unwrap();
        assert_eq!(parsed.summary, "Set name");
        assert_eq!(parsed.updates.len(), 1);

        let fenced = format!("```json\n{}\n```", plain);
        assert_eq!(RawInterpretationResult::parse(&fenced).unwrap(), parsed);
    }

    #[test]
    fn test_parse_rejects_unusable_payloads() {
        for body in ["", "   ", "Sure! I set the name.", "{}", r#"{"updates": []}"#] {
            assert!(
                matches!(
                    RawInterpretationResult::parse(body),
                    Err(VoiceError::InterpretationFailure(_))
                ),
                "expected failure for {:?}",
                body
            );
        }
    }

    #[test]
    fn test_summary_is_optional() {
        let parsed = RawInterpretationResult::parse(r#"{"updates": {}}"#).unwrap();
        assert!(parsed.summary.is_empty());
    }

    #[tokio::test]
    async fn test_empty_transcript_makes_no_call() {
        let client = Arc::new(CannedClient::ok(r#"{"updates": {}}"#));
        let interpreter = UtteranceInterpreter::new(client.clone());
        let schema = FieldSchemaRegistry::business_document().describe();

        let err = interpreter.interpret("  ", &schema, &snapshot()).await.unwrap_err();
        assert!(matches!(err, VoiceError::EmptyTranscript));
        assert_eq!(client.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_exactly_one_call_per_interpretation() {
        let client = Arc::new(CannedClient::ok("not json at all"));
        let interpreter = UtteranceInterpreter::new(client.clone());
        let schema = FieldSchemaRegistry::business_document().describe();

        let err = interpreter
            .interpret("set client name to John", &schema, &snapshot())
            .await
            .unwrap_err();
        assert!(matches!(err, VoiceError::InterpretationFailure(_)));
        assert_eq!(client.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_oracle_error_becomes_interpretation_failure() {
        let client = Arc::new(CannedClient {
            response: Err(anyhow::anyhow!("connection refused")),
            calls: AtomicUsize::new(0),
        });
        let interpreter = UtteranceInterpreter::new(client);
        let schema = FieldSchemaRegistry::business_document().describe();

        let err = interpreter
            .interpret("set client name to John", &schema, &snapshot())
            .await
            .unwrap_err();
        match err {
            VoiceError::InterpretationFailure(reason) => {
                assert!(reason.contains("connection refused"))
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_timeout_is_interpretation_failure() {
        let client = Arc::new(StalledClient {
            calls: AtomicUsize::new(0),
        });
        let interpreter =
            UtteranceInterpreter::new(client.clone()).with_timeout(Some(Duration::from_millis(20)));
        let schema = FieldSchemaRegistry::business_document().describe();

        let started = std::time::Instant::now();
        let err = interpreter
            .interpret("set client name to John", &schema, &snapshot())
            .await
            .unwrap_err();

        match err {
            VoiceError::InterpretationFailure(reason) => assert!(reason.contains("did not answer")),
            other => panic!("unexpected error: {:?}", other),
        }
        assert_eq!(client.calls.load(Ordering::SeqCst), 1);
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[test]
    fn test_user_prompt_names_focused_field() {
        let registry = FieldSchemaRegistry::business_document();
        let focused = FocusedField::new("clientDetails.email", "email", "Client email");
        let snapshot = ContextSnapshot::capture(&FormTree::new(), &registry, Some(focused)).unwrap();

        let prompt = build_user_prompt("john at example dot com", &snapshot).unwrap();
        assert!(prompt.contains("\"Client email\" (clientDetails.email)"));
        assert!(prompt.ends_with("john at example dot com"));
    }

    #[test]
    fn test_system_prompt_embeds_schema() {
        let schema = FieldSchemaRegistry::business_document().describe();
        let prompt = build_system_prompt(&schema).unwrap();
        assert!(prompt.contains("scopeOfWork.timeline.<index>.<attribute>"));
        assert!(prompt.contains("\"append\": true"));
    }
}
