use std::fmt;

use reqwest::StatusCode;
use tracing::debug;

use crate::api::{GenerateContentRequest, GenerateContentResponse};
use crate::utils::url::construct_api_url;

const API_KEY_HEADER: &str = "x-goog-api-key";
const INVALID_KEY_REASON: &str = "API_KEY_INVALID";

/// Failure of a single call to the model provider.
#[derive(Debug)]
pub enum ProviderError {
    /// The provider rejected the credential.
    Auth { status: u16, message: String },
    /// Any other non-success HTTP status.
    Api { status: u16, message: String },
    /// The request never produced an HTTP response.
    Transport(String),
    /// The response body was not the expected JSON.
    Decode(String),
}

impl ProviderError {
    pub fn is_auth(&self) -> bool {
        matches!(self, ProviderError::Auth { .. })
    }

    /// Classify a non-success response.
    ///
    /// Gemini answers 400 `API_KEY_INVALID` for malformed keys and 401/403 for
    /// keys that are unknown or not enabled for the API. Any 400 counts as a
    /// key problem.
    pub fn from_status(status: StatusCode, body: &str) -> Self {
        let message = summarize_error_body(body);
        let code = status.as_u16();
        let auth_class = matches!(
            status,
            StatusCode::BAD_REQUEST | StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN
        ) || body.contains(INVALID_KEY_REASON);

        if auth_class {
            ProviderError::Auth {
                status: code,
                message,
            }
        } else {
            ProviderError::Api {
                status: code,
                message,
            }
        }
    }
}

impl fmt::Display for ProviderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProviderError::Auth { status, message } => {
                write!(f, "API key rejected ({status}): {message}")
            }
            ProviderError::Api { status, message } => {
                write!(f, "API request failed with status {status}: {message}")
            }
            ProviderError::Transport(err) => write!(f, "Connection error: {err}"),
            ProviderError::Decode(msg) => write!(f, "Unexpected response from API: {msg}"),
        }
    }
}

impl std::error::Error for ProviderError {}

fn extract_error_summary(value: &serde_json::Value) -> Option<String> {
    let summary = value
        .pointer("/error/message")
        .and_then(|v| v.as_str())
        .map(str::to_owned)
        .or_else(|| {
            value.get("error").and_then(|v| match v {
                serde_json::Value::String(s) => Some(s.to_string()),
                _ => None,
            })
        })
        .or_else(|| {
            value
                .get("message")
                .and_then(|v| v.as_str().map(str::to_owned))
        });

    summary.map(|text| {
        let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
        collapsed.trim().to_string()
    })
}

/// One-line description of an error body, preferring the JSON `error.message`.
pub fn summarize_error_body(body: &str) -> String {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return "<empty>".to_string();
    }

    if let Ok(json_value) = serde_json::from_str::<serde_json::Value>(trimmed) {
        if let Some(summary) = extract_error_summary(&json_value) {
            if !summary.is_empty() {
                return summary;
            }
        }
    }

    trimmed.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// POST one `generateContent` request and decode the reply.
pub async fn generate_content(
    client: &reqwest::Client,
    base_url: &str,
    model: &str,
    api_key: &str,
    request: &GenerateContentRequest,
) -> Result<GenerateContentResponse, ProviderError> {
    let url = construct_api_url(base_url, &format!("models/{model}:generateContent"));
    debug!(%url, turns = request.contents.len(), "sending generateContent");

    let response = client
        .post(url)
        .header("Content-Type", "application/json")
        .header(API_KEY_HEADER, api_key)
        .json(request)
        .send()
        .await
        .map_err(|err| ProviderError::Transport(err.to_string()))?;

    let status = response.status();
    if !status.is_success() {
        let error_text = response
            .text()
            .await
            .unwrap_or_else(|_| "<no body>".to_string());
        debug!(status = status.as_u16(), "generateContent failed");
        return Err(ProviderError::from_status(status, &error_text));
    }

    let body = response.text().await.map_err(|err| ProviderError::Transport(err.to_string()))?;
    serde_json::from_str::<GenerateContentResponse>(&body)
        .map_err(|err| ProviderError::Decode(err.to_string()))
}
