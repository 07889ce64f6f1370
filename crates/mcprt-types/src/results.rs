//! Result types returned by the three primitive invocations:
//! `tools/call`, `resources/read`, `prompts/get`.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::content::{Content, ResourceContents, Role};

/// Result of a `tools/call` invocation.
///
/// `is_error` distinguishes an in-band business failure (the tool ran and
/// reports a failure) from a protocol-level error (unknown tool, bad
/// arguments), which is instead a JSON-RPC error response and never reaches
/// this type.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ToolResult {
    /// Content blocks in the result
    pub content: Vec<Content>,
    /// Whether this result represents an in-band error
    #[serde(rename = "isError", skip_serializing_if = "Option::is_none")]
    pub is_error: Option<bool>,
    /// Structured content conforming to the tool's output schema, if any
    #[serde(rename = "structuredContent", skip_serializing_if = "Option::is_none")]
    pub structured_content: Option<Value>,
}

impl ToolResult {
    /// Create a text result.
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            content: vec![Content::text(text)],
            is_error: None,
            structured_content: None,
        }
    }

    /// Create an in-band error result.
    #[must_use]
    pub fn error(text: impl Into<String>) -> Self {
        Self {
            content: vec![Content::text(text)],
            is_error: Some(true),
            structured_content: None,
        }
    }

    /// Create a structured result: human-readable text plus machine-readable JSON.
    pub fn json<T: Serialize>(value: &T) -> Result<Self, serde_json::Error> {
        let structured = serde_json::to_value(value)?;
        let text = serde_json::to_string_pretty(value)?;
        Ok(Self {
            content: vec![Content::text(text)],
            is_error: None,
            structured_content: Some(structured),
        })
    }

    /// Check if this result represents an in-band error.
    #[must_use]
    pub fn is_error(&self) -> bool {
        self.is_error.unwrap_or(false)
    }
}

/// Result of a `resources/read` invocation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ResourceResult {
    /// One entry per concrete resource served by this read (usually one)
    pub contents: Vec<ResourceContents>,
}

impl ResourceResult {
    /// Create a single-entry text resource result.
    #[must_use]
    pub fn text(uri: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            contents: vec![ResourceContents::Text(crate::content::TextResourceContents {
                uri: uri.into(),
                mime_type: Some("text/plain".into()),
                text: text.into(),
            })],
        }
    }

    /// Create a single-entry binary resource result.
    #[must_use]
    pub fn blob(uri: impl Into<String>, mime_type: impl Into<String>, blob_base64: impl Into<String>) -> Self {
        Self {
            contents: vec![ResourceContents::Blob(crate::content::BlobResourceContents {
                uri: uri.into(),
                mime_type: Some(mime_type.into()),
                blob: blob_base64.into(),
            })],
        }
    }
}

/// A single message in a prompt's rendered conversation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PromptMessage {
    /// Who is speaking this message
    pub role: Role,
    /// Message content
    pub content: Content,
}

/// Result of a `prompts/get` invocation.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct PromptResult {
    /// Prompt description, possibly filled in with argument values
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Rendered conversation messages
    pub messages: Vec<PromptMessage>,
}

impl PromptResult {
    /// Start a prompt result with a single user message.
    #[must_use]
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            description: None,
            messages: vec![PromptMessage {
                role: Role::User,
                content: Content::text(text),
            }],
        }
    }

    /// Append an assistant message.
    #[must_use]
    pub fn add_assistant(mut self, text: impl Into<String>) -> Self {
        self.messages.push(PromptMessage {
            role: Role::Assistant,
            content: Content::text(text),
        });
        self
    }

    /// Set the description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tool_result_json_sets_structured_and_text() {
        let result = ToolResult::json(&serde_json::json!({"count": 1})).unwrap();
        assert!(!result.is_error());
        assert_eq!(result.structured_content.unwrap()["count"], 1);
    }

    #[test]
    fn prompt_result_builder_orders_messages() {
        let prompt = PromptResult::user("hi").add_assistant("hello back");
        assert_eq!(prompt.messages.len(), 2);
        assert_eq!(prompt.messages[0].role, Role::User);
        assert_eq!(prompt.messages[1].role, Role::Assistant);
    }
}
