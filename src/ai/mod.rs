//! Upstream generative-language API integration
//!
//! The proxy talks to Gemini through [`GenerativeService`] so the HTTP client
//! can be swapped for [`MockGenerativeClient`] in tests.

pub mod gemini;
pub mod mock;

pub use gemini::GeminiHttpClient;
pub use mock::MockGenerativeClient;

use crate::ai::gemini::types::GenerateContentRequest;
use crate::Result;
use async_trait::async_trait;

#[async_trait]
pub trait GenerativeService: Send + Sync {
    /// Issues one `generateContent` call and returns the decoded success body.
    ///
    /// Non-2xx responses surface as [`crate::Error::Upstream`] carrying the
    /// upstream status code.
    async fn generate_content(&self, request: &GenerateContentRequest)
        -> Result<serde_json::Value>;
}
