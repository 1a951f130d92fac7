//! Tolerant extraction of plain text from reasoning-service responses.
//!
//! The service's response shape varies by model and endpoint version, so
//! the fields are read through a small ordered list of extractors tried in
//! sequence. The serialized-JSON fallback guarantees the user always sees
//! *something* rather than nothing.

use serde::{Deserialize, Serialize};

/// Loosely-typed reasoning service response. Unknown fields are preserved
/// in `extra` so the fallback extractor can surface them.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StructuredResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Vec<ContentItem>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ContentItem {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl StructuredResponse {
    /// Shorthand used by tests and mocks.
    pub fn from_text(text: &str) -> Self {
        Self {
            output_text: Some(text.to_string()),
            ..Default::default()
        }
    }
}

type Extractor = fn(&StructuredResponse) -> Option<String>;

/// Extractors in priority order; the first non-empty match wins.
const EXTRACTORS: &[Extractor] = &[direct_output, first_data_content, plain_text];

fn non_empty(s: &str) -> Option<String> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

fn direct_output(resp: &StructuredResponse) -> Option<String> {
    resp.output_text.as_deref().and_then(non_empty)
}

fn first_data_content(resp: &StructuredResponse) -> Option<String> {
    resp.data
        .as_deref()?
        .iter()
        .find_map(|item| item.content.as_deref().and_then(non_empty))
}

fn plain_text(resp: &StructuredResponse) -> Option<String> {
    resp.text.as_deref().and_then(non_empty)
}

/// Pull displayable content out of a response, falling back to the whole
/// response serialized as JSON when no known field matches.
pub fn extract_content(resp: &StructuredResponse) -> String {
    EXTRACTORS
        .iter()
        .find_map(|extract| extract(resp))
        .unwrap_or_else(|| serde_json::to_string(resp).unwrap_or_else(|_| "{}".to_string()))
}
