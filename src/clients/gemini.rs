/// Gemini `generateContent` REST APIクライアント。
///
/// 認証情報は呼び出しごとに `x-goog-api-key` ヘッダーで渡し、URLには載せません。
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::pipeline::summarize::{GenerationBackend, GenerationError};

/// エラーメッセージの最大長
const MAX_ERROR_MESSAGE_LENGTH: usize = 500;

#[derive(Debug, Clone)]
pub struct GeminiClient {
    client: Client,
    endpoint: Url,
}

impl GeminiClient {
    /// # Errors
    /// URLのパースまたはHTTPクライアントの構築に失敗した場合はエラーを返します。
    pub fn new(base_url: impl Into<String>, model: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build generation client")?;

        let base_url = Url::parse(&base_url.into()).context("invalid generation base URL")?;
        let endpoint = base_url
            .join(&format!("v1beta/models/{model}:generateContent"))
            .context("failed to build generateContent URL")?;

        Ok(Self { client, endpoint })
    }
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    contents: [Content<'a>; 1],
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    role: &'static str,
    parts: [RequestPart<'a>; 1],
}

#[derive(Debug, Serialize)]
struct RequestPart<'a> {
    text: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    #[serde(default)]
    block_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: String,
}

#[async_trait]
impl GenerationBackend for GeminiClient {
    async fn generate(&self, prompt: &str, credential: &str) -> Result<String, GenerationError> {
        let request = GenerateRequest {
            contents: [Content {
                role: "user",
                parts: [RequestPart { text: prompt }],
            }],
        };

        debug!(prompt_chars = prompt.chars().count(), "sending generateContent request");

        let response = self
            .client
            .post(self.endpoint.clone())
            .header("x-goog-api-key", credential)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(GenerationError::Status {
                status,
                message: error_message(&body),
            });
        }

        let parsed: GenerateResponse = serde_json::from_str(&body)
            .map_err(|error| GenerationError::Decode(error.to_string()))?;
        extract_text(parsed)
    }
}

/// 候補の最初のテキストパートを連結して返す。
fn extract_text(response: GenerateResponse) -> Result<String, GenerationError> {
    let text: String = response
        .candidates
        .into_iter()
        .next()
        .and_then(|candidate| candidate.content)
        .map(|content| {
            content
                .parts
                .into_iter()
                .filter_map(|part| part.text)
                .collect()
        })
        .unwrap_or_default();

    if !text.trim().is_empty() {
        return Ok(text);
    }
    match response.prompt_feedback.and_then(|feedback| feedback.block_reason) {
        Some(reason) => Err(GenerationError::Blocked(reason)),
        None => Err(GenerationError::EmptyResponse),
    }
}

/// エラーレスポンスから人が読めるメッセージを取り出し、長すぎれば切り詰める。
fn error_message(body: &str) -> String {
    let message = serde_json::from_str::<ErrorEnvelope>(body)
        .map(|envelope| envelope.error.message)
        .ok()
        .filter(|message| !message.is_empty())
        .unwrap_or_else(|| body.trim().to_string());
    truncate_error_message(&message)
}

fn truncate_error_message(msg: &str) -> String {
    let char_count = msg.chars().count();
    if char_count <= MAX_ERROR_MESSAGE_LENGTH {
        return msg.to_string();
    }
    let truncated: String = msg.chars().take(MAX_ERROR_MESSAGE_LENGTH).collect();
    format!("{truncated}... (truncated, {char_count} chars)")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const GENERATE_PATH: &str = "/v1beta/models/gemini-2.5-flash:generateContent";

    async fn client_for(server: &MockServer) -> GeminiClient {
        GeminiClient::new(
            format!("{}/", server.uri()),
            "gemini-2.5-flash",
            Duration::from_secs(5),
        )
        .expect("client should build")
    }

    #[tokio::test]
    async fn generate_returns_candidate_text() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(GENERATE_PATH))
            .and(header("x-goog-api-key", "key-0001"))
            .and(body_partial_json(json!({
                "contents": [{"role": "user", "parts": [{"text": "Summarize iran"}]}]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "candidates": [{
                    "content": {"parts": [{"text": "Both sides "}, {"text": "disagree."}]},
                    "finishReason": "STOP"
                }]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        let text = client
            .generate("Summarize iran", "key-0001")
            .await
            .expect("generation succeeds");

        assert_eq!(text, "Both sides disagree.");
    }

    #[tokio::test]
    async fn generate_surfaces_api_error_message() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(GENERATE_PATH))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "error": {"code": 400, "message": "API key not valid.", "status": "INVALID_ARGUMENT"}
            })))
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        let error = client
            .generate("prompt", "bad-key")
            .await
            .expect_err("should fail");

        assert!(matches!(
            &error,
            GenerationError::Status { status, message }
                if status.as_u16() == 400 && message == "API key not valid."
        ));
    }

    #[tokio::test]
    async fn generate_reports_blocked_prompt() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(GENERATE_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "candidates": [],
                "promptFeedback": {"blockReason": "SAFETY"}
            })))
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        let error = client.generate("prompt", "key").await.expect_err("blocked");

        assert!(matches!(error, GenerationError::Blocked(reason) if reason == "SAFETY"));
    }

    #[tokio::test]
    async fn generate_rejects_non_json_success_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(GENERATE_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        let error = client.generate("prompt", "key").await.expect_err("decode");

        assert!(matches!(error, GenerationError::Decode(_)));
    }

    #[test]
    fn error_message_is_truncated() {
        let long = "x".repeat(MAX_ERROR_MESSAGE_LENGTH + 20);
        let message = error_message(&long);
        assert!(message.ends_with(&format!("(truncated, {} chars)", long.len())));
    }
}
