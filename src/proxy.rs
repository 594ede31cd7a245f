//! The request proxy: build the upstream payload, call Gemini once, shape the reply.

use crate::ai::{GeminiHttpClient, GenerativeService};
use crate::models::{Config, ProxyReply, ProxyRequest};
use crate::payload::build_payload;
use crate::Result;
use serde_json::Value;
use std::sync::Arc;
use tracing::{error, info, Instrument};
use uuid::Uuid;

/// Stateless between requests; the injected upstream client is shared read-only.
pub struct Proxy {
    upstream: Arc<dyn GenerativeService>,
}

impl Proxy {
    /// Build a proxy backed by the real Gemini client.
    pub fn new(config: &Config) -> Self {
        let client = GeminiHttpClient::new(config.api_key.clone(), config.model.clone())
            .with_base_url(config.base_url.clone());
        info!("Upstream model: {}", client.model());

        Self::with_service(Arc::new(client))
    }

    /// Build a proxy from an arbitrary upstream, typically a mock in tests.
    pub fn with_service(upstream: Arc<dyn GenerativeService>) -> Self {
        Self { upstream }
    }

    pub async fn handle(&self, request: ProxyRequest) -> Result<ProxyReply> {
        let span = tracing::info_span!(
            "proxy",
            invocation_id = %Uuid::new_v4(),
            variant = request.variant()
        );

        self.handle_inner(request).instrument(span).await
    }

    async fn handle_inner(&self, request: ProxyRequest) -> Result<ProxyReply> {
        let relay = matches!(request, ProxyRequest::Passthrough(_));

        let payload = build_payload(request)?;
        tracing::debug!(
            "Payload built: {} turns, structured={}",
            payload.contents.len(),
            payload.generation_config.is_some()
        );

        let body = self.upstream.generate_content(&payload).await.map_err(|e| {
            error!("Upstream call failed: {}", e);
            e
        })?;
        info!("Received response from Gemini");

        if relay {
            Ok(ProxyReply::Relay(body))
        } else {
            Ok(ProxyReply::Text(first_candidate_text(&body)))
        }
    }
}

/// `candidates[0].content.parts[0].text`, or `None` when any step is missing.
pub fn first_candidate_text(body: &Value) -> Option<String> {
    body.pointer("/candidates/0/content/parts/0/text")
        .and_then(Value::as_str)
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::MockGenerativeClient;
    use crate::models::ComposedRequest;
    use crate::Error;
    use serde_json::json;

    fn proxy_with(mock: MockGenerativeClient) -> (Proxy, Arc<MockGenerativeClient>) {
        let mock = Arc::new(mock);
        (Proxy::with_service(mock.clone()), mock)
    }

    #[tokio::test]
    async fn test_passthrough_relays_full_body() {
        let upstream_body = json!({
            "candidates": [{ "content": { "parts": [{ "text": "Hoi!" }] } }],
            "usageMetadata": { "totalTokenCount": 12 }
        });
        let (proxy, mock) = proxy_with(MockGenerativeClient::new().with_response(upstream_body.clone()));

        let history = vec![json!({ "role": "user", "parts": [{ "text": "Hallo" }] })];
        let reply = proxy
            .handle(ProxyRequest::Passthrough(history.clone()))
            .await
            .unwrap();

        assert_eq!(reply, ProxyReply::Relay(upstream_body));
        assert_eq!(mock.last_request().unwrap().contents, history);
    }

    #[tokio::test]
    async fn test_composed_extracts_first_text() {
        let (proxy, mock) = proxy_with(MockGenerativeClient::new().with_text_response("Antwoord"));

        let request = ComposedRequest {
            history: vec![json!({ "role": "model", "parts": [{ "text": "Vorige" }] })],
            prompt: Some("Vraag".to_string()),
            ..Default::default()
        };
        let reply = proxy.handle(ProxyRequest::Composed(request)).await.unwrap();

        assert_eq!(reply, ProxyReply::Text(Some("Antwoord".to_string())));
        let sent = mock.last_request().unwrap();
        assert_eq!(sent.contents.len(), 2);
        assert_eq!(sent.contents[1]["role"], "user");
    }

    #[tokio::test]
    async fn test_composed_missing_candidates_yields_no_text() {
        let (proxy, _) = proxy_with(MockGenerativeClient::new().with_response(json!({
            "promptFeedback": { "blockReason": "SAFETY" }
        })));

        let reply = proxy
            .handle(ProxyRequest::Composed(ComposedRequest::default()))
            .await
            .unwrap();

        assert_eq!(reply, ProxyReply::Text(None));
    }

    #[tokio::test]
    async fn test_upstream_error_is_returned_after_one_call() {
        let (proxy, mock) =
            proxy_with(MockGenerativeClient::new().with_upstream_error(503, "overloaded"));

        let err = proxy
            .handle(ProxyRequest::Passthrough(vec![]))
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Upstream { status: 503, .. }));
        assert_eq!(mock.get_call_count(), 1);
    }

    #[tokio::test]
    async fn test_malformed_image_never_reaches_upstream() {
        let (proxy, mock) = proxy_with(MockGenerativeClient::new());

        let request = ComposedRequest {
            image: Some("geen-data-url".to_string()),
            ..Default::default()
        };
        let err = proxy.handle(ProxyRequest::Composed(request)).await.unwrap_err();

        assert!(matches!(err, Error::MalformedInput(_)));
        assert_eq!(mock.get_call_count(), 0);
    }

    #[test]
    fn test_first_candidate_text_tolerates_missing_path() {
        assert_eq!(first_candidate_text(&json!({})), None);
        assert_eq!(first_candidate_text(&json!({ "candidates": [] })), None);
        assert_eq!(
            first_candidate_text(&json!({
                "candidates": [{ "content": { "parts": [{ "inlineData": { "mimeType": "image/png", "data": "" } }] } }]
            })),
            None
        );
    }
}
