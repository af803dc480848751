use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt::Write as _;
use std::time::Duration;

use super::{InterpretError, InterpretationResult, Mode};
use crate::dates::DateContext;
use crate::filter::{wire, Field, Operator};

/// A model-backed interpreter. Implementations only produce a candidate;
/// the strategy validates it before anything downstream sees it.
#[async_trait]
pub trait GenerativeInterpreter: Send + Sync {
    fn name(&self) -> &str;

    async fn interpret(
        &self,
        query: &str,
        dates: &DateContext,
    ) -> Result<InterpretationResult, InterpretError>;
}

/// Talks to any OpenAI-compatible `chat/completions` endpoint.
pub struct ChatCompletionsInterpreter {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
    max_tokens: u32,
}

impl ChatCompletionsInterpreter {
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, InterpretError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            model: model.into(),
            max_tokens: 500,
        })
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

/// The JSON object the model is asked to answer with.
#[derive(Deserialize)]
struct RawInterpretation {
    #[serde(default)]
    intent: String,
    #[serde(default)]
    metadata_filter: Value,
    #[serde(default)]
    explanation: String,
    query_type: String,
}

#[async_trait]
impl GenerativeInterpreter for ChatCompletionsInterpreter {
    fn name(&self) -> &str {
        &self.model
    }

    async fn interpret(
        &self,
        query: &str,
        dates: &DateContext,
    ) -> Result<InterpretationResult, InterpretError> {
        let request = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system".into(),
                    content: system_prompt(dates),
                },
                ChatMessage {
                    role: "user".into(),
                    content: format!(
                        "Interpret this query and generate a metadata filter: '{}'",
                        query
                    ),
                },
            ],
            max_tokens: self.max_tokens,
            temperature: 0.0,
        };

        tracing::debug!(model = %self.model, %query, "requesting interpretation");
        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(InterpretError::Transport(format!("{}: {}", status, body)));
        }

        let chat: ChatResponse = response
            .json()
            .await
            .map_err(|e| InterpretError::Malformed(e.to_string()))?;
        let content = chat
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or_else(|| InterpretError::Malformed("response has no choices".into()))?;

        parse_reply(&content)
    }
}

/// Instructions plus the resolved date table, so the model never does
/// calendar arithmetic itself.
pub(crate) fn system_prompt(dates: &DateContext) -> String {
    let mut prompt = String::new();
    let _ = writeln!(
        prompt,
        "You turn football game search queries into metadata filters.\n\
         Today is {}. Use these ranges for relative dates:",
        dates.today()
    );
    for (key, start, end) in dates.table() {
        let _ = writeln!(prompt, "- {}: {} to {}", key, start, end);
    }

    let fields: Vec<&str> = Field::ALL.iter().map(|f| f.as_str()).collect();
    let operators: Vec<&str> = Operator::ALL.iter().map(|o| o.key()).collect();
    let _ = write!(
        prompt,
        "\nFields: {}.\n\
         Operators: {}, plus $and and $or over lists of filters.\n\
         Each condition is {{\"field\": {{\"$op\": value}}}} with one field and one operator.\n\
         Dates are YYYY-MM-DD strings. Team and venue names use their proper capitalisation.\n\
         For queries without time constraints, return query_type semantic and no metadata_filter.\n\
         Answer with a single JSON object and nothing else:\n\
         {{\"intent\": \"...\", \"metadata_filter\": {{...}} or null, \"explanation\": \"...\", \
         \"query_type\": \"filtered\" or \"semantic\"}}",
        fields.join(", "),
        operators.join(", ")
    );
    prompt
}

/// Parses the model's reply. Text around the outermost JSON object is ignored.
pub(crate) fn parse_reply(content: &str) -> Result<InterpretationResult, InterpretError> {
    let json = extract_json_object(content)
        .ok_or_else(|| InterpretError::Malformed("no JSON object in reply".into()))?;
    let raw: RawInterpretation =
        serde_json::from_str(json).map_err(|e| InterpretError::Malformed(e.to_string()))?;

    let mode = match raw.query_type.as_str() {
        "filtered" => Mode::Filtered,
        "semantic" => Mode::Semantic,
        other => {
            return Err(InterpretError::Malformed(format!(
                "unknown query_type '{}'",
                other
            )))
        }
    };
    let filter = wire::parse(&raw.metadata_filter)?;

    Ok(InterpretationResult {
        intent: raw.intent,
        filter,
        explanation: raw.explanation,
        mode,
        range_corrected: false,
        fallback_reason: None,
    })
}

fn extract_json_object(content: &str) -> Option<&str> {
    let start = content.find('{')?;
    let end = content.rfind('}')?;
    (start < end).then(|| &content[start..=end])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dates::parse_iso;
    use crate::filter::FilterExpr;

    #[test]
    fn test_reply_inside_prose() {
        let reply = r#"Sure! Here it is:
{"intent": "Arsenal games", "metadata_filter": {"$or": [{"home_team": {"$eq": "Arsenal"}}, {"away_team": {"$eq": "Arsenal"}}]}, "explanation": "team", "query_type": "filtered"}
Hope that helps."#;
        let result = parse_reply(reply).unwrap();
        assert_eq!(result.mode, Mode::Filtered);
        assert_eq!(
            result.filter,
            Some(FilterExpr::Or(vec![
                FilterExpr::eq(Field::HomeTeam, "Arsenal"),
                FilterExpr::eq(Field::AwayTeam, "Arsenal"),
            ]))
        );
    }

    #[test]
    fn test_semantic_reply_with_null_filter() {
        let reply = r#"{"intent": "x", "metadata_filter": null, "explanation": "", "query_type": "semantic"}"#;
        let result = parse_reply(reply).unwrap();
        assert_eq!(result.mode, Mode::Semantic);
        assert_eq!(result.filter, None);
    }

    #[test]
    fn test_no_json_is_malformed() {
        assert!(matches!(
            parse_reply("I cannot help with that"),
            Err(InterpretError::Malformed(_))
        ));
    }

    #[test]
    fn test_unknown_query_type_is_malformed() {
        let reply = r#"{"metadata_filter": {}, "query_type": "maybe"}"#;
        assert!(matches!(parse_reply(reply), Err(InterpretError::Malformed(_))));
    }

    #[test]
    fn test_bad_operator_is_invalid_filter() {
        let reply = r#"{"metadata_filter": {"venue": {"$like": "Anfield"}}, "query_type": "filtered"}"#;
        assert!(matches!(
            parse_reply(reply),
            Err(InterpretError::InvalidFilter(_))
        ));
    }

    #[test]
    fn test_prompt_carries_date_table() {
        let ctx = DateContext::resolve(parse_iso("2024-09-12").unwrap());
        let prompt = system_prompt(&ctx);
        assert!(prompt.contains("Today is 2024-09-12"));
        assert!(prompt.contains("- last_weekend: 2024-09-07 to 2024-09-08"));
        assert!(prompt.contains("$nin"));
        assert!(prompt.contains("home_score"));
        assert!(prompt.contains("without time constraints, return query_type semantic"));
    }
}
