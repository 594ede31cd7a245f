use super::types::{ErrorEnvelope, GenerateContentRequest};
use crate::ai::GenerativeService;
use crate::models::ApiKey;
use crate::{Error, Result};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde_json::Value;

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_MODEL: &str = "gemini-2.0-flash";

/// Fallback message when the upstream error body carries nothing usable.
const GENERIC_UPSTREAM_MESSAGE: &str = "Fout bij de Google API.";

/// Lightweight Gemini REST client. One request in, one awaited call out, no retries.
pub struct GeminiHttpClient {
    client: Client,
    api_key: ApiKey,
    model: String,
    base_url: String,
}

impl GeminiHttpClient {
    /// Construct a Gemini client.
    ///
    /// `model` may be given with or without the `models/` prefix.
    pub fn new(api_key: ApiKey, model: String) -> Self {
        Self::new_with_client(api_key, model, Client::new())
    }

    pub fn new_with_client(api_key: ApiKey, model: String, client: Client) -> Self {
        let model = model.strip_prefix("models/").unwrap_or(&model).to_string();

        Self {
            client,
            api_key,
            model,
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    /// Returns the configured model ID without the `models/` prefix.
    pub fn model(&self) -> &str {
        &self.model
    }

    fn generate_content_url(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url, self.model
        )
    }
}

#[async_trait]
impl GenerativeService for GeminiHttpClient {
    async fn generate_content(&self, request: &GenerateContentRequest) -> Result<Value> {
        let url = self.generate_content_url();
        tracing::debug!(
            "Sending generateContent request ({} turns) to {}",
            request.contents.len(),
            url
        );

        let response = self
            .client
            .post(&url)
            .query(&[("key", self.api_key.expose())])
            .header("Content-Type", "application/json")
            .json(request)
            .send()
            .await
            .map_err(|e| {
                // reqwest errors embed the full URL, key included.
                let e = e.without_url();
                tracing::error!("Failed to send request to Gemini: {}", e);
                e
            })?;

        let status = response.status();
        tracing::info!("Gemini API response status: {}", status);

        let body = response.text().await.map_err(reqwest::Error::without_url)?;

        if !status.is_success() {
            tracing::error!("Gemini API error (status {}): {}", status, body);
            return Err(Error::Upstream {
                status: status.as_u16(),
                message: upstream_error_message(status, &body),
            });
        }

        serde_json::from_str(&body).map_err(|e| {
            tracing::error!("Failed to parse Gemini response: {}\nBody: {}", e, body);
            Error::Serialization(e)
        })
    }
}

/// Pulls a readable message out of an error body: the JSON envelope's
/// `error.message` first, then the raw text, then the status reason.
pub fn upstream_error_message(status: StatusCode, body: &str) -> String {
    if let Ok(envelope) = serde_json::from_str::<ErrorEnvelope>(body) {
        if let Some(message) = envelope.error.message.filter(|m| !m.trim().is_empty()) {
            return message;
        }
    }

    let raw = body.trim();
    if !raw.is_empty() && serde_json::from_str::<Value>(raw).is_err() {
        return raw.to_string();
    }

    match status.canonical_reason() {
        Some(reason) => format!("{} ({})", GENERIC_UPSTREAM_MESSAGE, reason),
        None => GENERIC_UPSTREAM_MESSAGE.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use wiremock::matchers::{body_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const GENERATE_CONTENT_PATH: &str = "/v1beta/models/gemini-2.0-flash:generateContent";

    fn make_client(server: &MockServer, model: &str) -> GeminiHttpClient {
        GeminiHttpClient::new(ApiKey::new("test-key").unwrap(), model.to_string())
            .with_base_url(server.uri())
    }

    fn sample_request() -> GenerateContentRequest {
        GenerateContentRequest {
            contents: vec![serde_json::json!({
                "role": "user",
                "parts": [{ "text": "Wat is fotosynthese?" }]
            })],
            generation_config: None,
        }
    }

    #[tokio::test]
    async fn test_sends_key_as_query_parameter_and_json_body() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path(GENERATE_CONTENT_PATH))
            .and(query_param("key", "test-key"))
            .and(header("content-type", "application/json"))
            .and(body_json(serde_json::json!({
                "contents": [{ "role": "user", "parts": [{ "text": "Wat is fotosynthese?" }] }]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "candidates": [{ "content": { "parts": [{ "text": "Licht wordt suiker." }] } }]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = make_client(&server, DEFAULT_MODEL);
        let body = client.generate_content(&sample_request()).await.unwrap();

        assert_eq!(
            body["candidates"][0]["content"]["parts"][0]["text"],
            "Licht wordt suiker."
        );
    }

    #[tokio::test]
    async fn test_strips_models_prefix_from_model_id() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path(GENERATE_CONTENT_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({})))
            .expect(1)
            .mount(&server)
            .await;

        let client = make_client(&server, "models/gemini-2.0-flash");
        assert_eq!(client.model(), "gemini-2.0-flash");

        client.generate_content(&sample_request()).await.unwrap();
    }

    #[tokio::test]
    async fn test_json_error_body_is_mirrored_without_retry() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path(GENERATE_CONTENT_PATH))
            .respond_with(ResponseTemplate::new(429).set_body_json(serde_json::json!({
                "error": { "code": 429, "message": "Resource has been exhausted", "status": "RESOURCE_EXHAUSTED" }
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = make_client(&server, DEFAULT_MODEL);
        let err = client.generate_content(&sample_request()).await.unwrap_err();

        match err {
            Error::Upstream { status, message } => {
                assert_eq!(status, 429);
                assert_eq!(message, "Resource has been exhausted");
            }
            other => panic!("expected upstream error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_text_error_body_falls_back_to_raw_text() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path(GENERATE_CONTENT_PATH))
            .respond_with(ResponseTemplate::new(403).set_body_string("forbidden"))
            .expect(1)
            .mount(&server)
            .await;

        let client = make_client(&server, DEFAULT_MODEL);
        let err = client.generate_content(&sample_request()).await.unwrap_err();

        assert!(matches!(
            err,
            Error::Upstream { status: 403, ref message } if message == "forbidden"
        ));
    }

    #[tokio::test]
    async fn test_malformed_success_body_is_serialization_error() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path(GENERATE_CONTENT_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>"))
            .mount(&server)
            .await;

        let client = make_client(&server, DEFAULT_MODEL);
        let err = client.generate_content(&sample_request()).await.unwrap_err();
        assert!(matches!(err, Error::Serialization(_)));
    }

    #[test]
    fn test_error_message_uses_status_reason_for_empty_body() {
        let message = upstream_error_message(StatusCode::SERVICE_UNAVAILABLE, "");
        assert_eq!(message, "Fout bij de Google API. (Service Unavailable)");
    }

    #[test]
    fn test_error_message_ignores_envelope_without_message() {
        let message = upstream_error_message(StatusCode::BAD_REQUEST, r#"{"error":{"code":400}}"#);
        assert_eq!(message, "Fout bij de Google API. (Bad Request)");
    }
}
