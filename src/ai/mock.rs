use super::GenerativeService;
use crate::ai::gemini::types::GenerateContentRequest;
use crate::{Error, Result};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone)]
enum MockReply {
    Success(Value),
    Failure { status: u16, message: String },
}

/// In-memory stand-in for Gemini that records every request it receives.
pub struct MockGenerativeClient {
    replies: Arc<Mutex<Vec<MockReply>>>,
    requests: Arc<Mutex<Vec<GenerateContentRequest>>>,
    call_count: Arc<Mutex<usize>>,
}

impl MockGenerativeClient {
    pub fn new() -> Self {
        Self {
            replies: Arc::new(Mutex::new(Vec::new())),
            requests: Arc::new(Mutex::new(Vec::new())),
            call_count: Arc::new(Mutex::new(0)),
        }
    }

    pub fn with_response(self, body: Value) -> Self {
        self.replies.lock().unwrap().push(MockReply::Success(body));
        self
    }

    pub fn with_text_response(self, text: &str) -> Self {
        self.with_response(serde_json::json!({
            "candidates": [{ "content": { "role": "model", "parts": [{ "text": text }] } }]
        }))
    }

    pub fn with_upstream_error(self, status: u16, message: &str) -> Self {
        self.replies.lock().unwrap().push(MockReply::Failure {
            status,
            message: message.to_string(),
        });
        self
    }

    pub fn get_call_count(&self) -> usize {
        *self.call_count.lock().unwrap()
    }

    pub fn last_request(&self) -> Option<GenerateContentRequest> {
        self.requests.lock().unwrap().last().cloned()
    }
}

impl Default for MockGenerativeClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl GenerativeService for MockGenerativeClient {
    async fn generate_content(&self, request: &GenerateContentRequest) -> Result<Value> {
        let count = {
            let mut count = self.call_count.lock().unwrap();
            *count += 1;
            *count
        };
        self.requests.lock().unwrap().push(request.clone());

        let replies = self.replies.lock().unwrap();
        if replies.is_empty() {
            return Ok(serde_json::json!({
                "candidates": [{ "content": { "role": "model", "parts": [{ "text": "mock" }] } }]
            }));
        }

        match replies[(count - 1) % replies.len()].clone() {
            MockReply::Success(body) => Ok(body),
            MockReply::Failure { status, message } => Err(Error::Upstream { status, message }),
        }
    }
}
