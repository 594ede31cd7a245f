//! Builds the upstream `generateContent` payload from a [`ProxyRequest`].

use crate::ai::gemini::types::{
    ChatTurn, GenerateContentRequest, GenerationConfig, Part, Schema, SchemaType,
};
use crate::models::{ComposedRequest, ProxyRequest};
use crate::{Error, Result};

/// Placed between the prompt and an attached file's text.
pub const FILE_CONTENT_SEPARATOR: &str = "\n\n--- INHOUD VAN BESTAND ---\n";

/// Uploaded images are always declared as JPEG; the frontend re-encodes them.
pub const INLINE_IMAGE_MIME: &str = "image/jpeg";

pub fn build_payload(request: ProxyRequest) -> Result<GenerateContentRequest> {
    match request {
        ProxyRequest::Passthrough(chat_history) => Ok(GenerateContentRequest {
            contents: chat_history,
            generation_config: None,
        }),
        ProxyRequest::Composed(request) => {
            let turn = serde_json::to_value(compose_user_turn(&request)?)?;
            let structured = request.is_structured();
            let mut contents = request.history;
            contents.push(turn);

            Ok(GenerateContentRequest {
                contents,
                generation_config: structured.then(study_schema_config),
            })
        }
    }
}

/// Builds the trailing user turn: one text part (prompt plus file text),
/// then an optional inline image. Empty strings count as absent.
pub fn compose_user_turn(request: &ComposedRequest) -> Result<ChatTurn> {
    let prompt = non_empty(&request.prompt);
    let file_content = non_empty(&request.file_content);

    let mut parts = Vec::new();

    if prompt.is_some() || file_content.is_some() {
        let mut text = prompt.unwrap_or_default().to_string();
        if let Some(file_content) = file_content {
            text.push_str(FILE_CONTENT_SEPARATOR);
            text.push_str(file_content);
        }
        parts.push(Part::text(text));
    }

    if let Some(image) = non_empty(&request.image) {
        parts.push(Part::inline(INLINE_IMAGE_MIME, data_url_payload(image)?));
    }

    Ok(ChatTurn::user(parts))
}

/// Returns the base64 payload of a `data:...;base64,<payload>` URL.
pub fn data_url_payload(data_url: &str) -> Result<&str> {
    data_url
        .split_once(',')
        .map(|(_, payload)| payload)
        .ok_or_else(|| {
            Error::MalformedInput("image must be a data URL of the form data:<mime>;base64,<data>".to_string())
        })
}

/// Fixed schema for the test trainer: one `vragen` and one `antwoorden` string.
pub fn study_schema_config() -> GenerationConfig {
    let mut schema = Schema::of(SchemaType::Object);
    for field in ["vragen", "antwoorden"] {
        schema
            .properties
            .insert(field.to_string(), Schema::of(SchemaType::String));
        schema.required.push(field.to_string());
    }

    GenerationConfig {
        response_mime_type: Some("application/json".to_string()),
        response_schema: Some(schema),
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}
