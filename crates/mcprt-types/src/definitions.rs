//! Definition types for MCP primitives.
//!
//! - [`Tool`] — tool definitions with opaque input/output JSON Schema.
//! - [`Resource`] / [`ResourceTemplate`] — readable resources and RFC 6570
//!   Level 1 URI templates.
//! - [`Prompt`] — retrievable prompt templates with typed arguments.
//! - [`ServerInfo`] / [`ClientInfo`] — identification exchanged at `initialize`.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// Server information advertised in the `initialize` response.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ServerInfo {
    /// Server name (machine-readable identifier)
    pub name: String,
    /// Server version
    pub version: String,
    /// Human-readable title
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

impl ServerInfo {
    /// Create server info with name and version.
    #[must_use]
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            title: None,
        }
    }

    /// Set the title.
    #[must_use]
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }
}

/// Client information sent in the `initialize` request.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ClientInfo {
    /// Client name (machine-readable identifier)
    pub name: String,
    /// Client version
    pub version: String,
}

impl ClientInfo {
    /// Create client info with name and version.
    #[must_use]
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
        }
    }
}

/// Icon for tools, resources, prompts, or servers.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum Icon {
    /// Data URI (embedded icon)
    DataUri(String),
    /// HTTP URL to icon
    Url(String),
}

/// Tool definition: a callable capability with an opaque input schema.
///
/// `input_schema`/`output_schema` are accepted as-is; this crate does not
/// interpret JSON Schema semantics beyond what [`crate::results`] needs.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Tool {
    /// Tool name (unique within its registry)
    pub name: String,
    /// Tool description
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Opaque JSON Schema 2020-12 document for input parameters
    #[serde(rename = "inputSchema")]
    pub input_schema: Value,
    /// Human-readable title
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Tool icon
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icons: Option<Vec<Icon>>,
    /// Annotations (behavior hints)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub annotations: Option<ToolAnnotations>,
    /// Opaque JSON Schema document for structured output, if any
    #[serde(rename = "outputSchema", skip_serializing_if = "Option::is_none")]
    pub output_schema: Option<Value>,
    /// Extension metadata
    #[serde(rename = "_meta", skip_serializing_if = "Option::is_none")]
    pub meta: Option<HashMap<String, Value>>,
}

impl Tool {
    /// Create a new tool with a name and an empty object input schema.
    #[must_use]
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: Some(description.into()),
            input_schema: empty_object_schema(),
            ..Default::default()
        }
    }

    /// Set the input schema.
    #[must_use]
    pub fn with_schema(mut self, schema: Value) -> Self {
        self.input_schema = schema;
        self
    }

    /// Set the output schema, also marking the tool as producing structured content.
    #[must_use]
    pub fn with_output_schema(mut self, schema: Value) -> Self {
        self.output_schema = Some(schema);
        self
    }

    /// Set the annotations.
    #[must_use]
    pub fn with_annotations(mut self, annotations: ToolAnnotations) -> Self {
        self.annotations = Some(annotations);
        self
    }

    /// Mark as read-only (hint for clients).
    #[must_use]
    pub fn read_only(mut self) -> Self {
        self.annotations = Some(self.annotations.unwrap_or_default().with_read_only(true));
        self
    }

    /// Mark as destructive (hint for clients).
    #[must_use]
    pub fn destructive(mut self) -> Self {
        self.annotations = Some(self.annotations.unwrap_or_default().with_destructive(true));
        self
    }
}

fn empty_object_schema() -> Value {
    serde_json::json!({ "type": "object", "properties": {}, "additionalProperties": false })
}

/// Annotations for tools describing behavior hints to the caller.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ToolAnnotations {
    /// Hint that this tool is read-only
    #[serde(rename = "readOnlyHint", skip_serializing_if = "Option::is_none")]
    pub read_only_hint: Option<bool>,
    /// Hint that this tool has destructive effects
    #[serde(rename = "destructiveHint", skip_serializing_if = "Option::is_none")]
    pub destructive_hint: Option<bool>,
    /// Hint that this tool is idempotent
    #[serde(rename = "idempotentHint", skip_serializing_if = "Option::is_none")]
    pub idempotent_hint: Option<bool>,
    /// Hint that this tool operates against an open world (unbounded side effects)
    #[serde(rename = "openWorldHint", skip_serializing_if = "Option::is_none")]
    pub open_world_hint: Option<bool>,
}

impl ToolAnnotations {
    /// Set the read-only hint.
    #[must_use]
    pub fn with_read_only(mut self, value: bool) -> Self {
        self.read_only_hint = Some(value);
        self
    }

    /// Set the destructive hint.
    #[must_use]
    pub fn with_destructive(mut self, value: bool) -> Self {
        self.destructive_hint = Some(value);
        self
    }

    /// Set the idempotent hint.
    #[must_use]
    pub fn with_idempotent(mut self, value: bool) -> Self {
        self.idempotent_hint = Some(value);
        self
    }
}

/// Resource definition: a readable, concrete-URI resource.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Resource {
    /// Concrete resource URI
    pub uri: String,
    /// Resource name (unique within its registry)
    pub name: String,
    /// Resource description
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Human-readable title
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// MIME type of the resource content
    #[serde(rename = "mimeType", skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    /// Resource annotations
    #[serde(skip_serializing_if = "Option::is_none")]
    pub annotations: Option<ResourceAnnotations>,
    /// Size in bytes (if known)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
}

impl Resource {
    /// Create a new resource with a URI and name.
    #[must_use]
    pub fn new(uri: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            name: name.into(),
            ..Default::default()
        }
    }

    /// Set the description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Set the MIME type.
    #[must_use]
    pub fn with_mime_type(mut self, mime_type: impl Into<String>) -> Self {
        self.mime_type = Some(mime_type.into());
        self
    }

    /// Set the size.
    #[must_use]
    pub fn with_size(mut self, size: u64) -> Self {
        self.size = Some(size);
        self
    }
}

/// Annotations for resources.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ResourceAnnotations {
    /// Target audience
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audience: Option<Vec<crate::Role>>,
    /// Priority level
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<f64>,
}

/// Resource template: an RFC 6570 Level 1 URI template for dynamic resources.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ResourceTemplate {
    /// URI template, e.g. `file:///{path}`
    #[serde(rename = "uriTemplate")]
    pub uri_template: String,
    /// Template name (unique within its registry)
    pub name: String,
    /// Template description
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// MIME type of resources produced by this template
    #[serde(rename = "mimeType", skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
}

impl ResourceTemplate {
    /// Create a new resource template.
    #[must_use]
    pub fn new(uri_template: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            uri_template: uri_template.into(),
            name: name.into(),
            ..Default::default()
        }
    }

    /// Set the description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// Prompt definition: a retrievable prompt template with typed arguments.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Prompt {
    /// Prompt name (unique within its registry)
    pub name: String,
    /// Prompt description
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Human-readable title
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Prompt arguments
    #[serde(skip_serializing_if = "Option::is_none")]
    pub arguments: Option<Vec<PromptArgument>>,
}

impl Prompt {
    /// Create a new prompt with a name and description.
    #[must_use]
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: Some(description.into()),
            ..Default::default()
        }
    }

    /// Add an argument to the prompt.
    #[must_use]
    pub fn with_argument(mut self, arg: PromptArgument) -> Self {
        self.arguments.get_or_insert_with(Vec::new).push(arg);
        self
    }

    /// Add a required argument.
    #[must_use]
    pub fn with_required_arg(self, name: impl Into<String>, description: impl Into<String>) -> Self {
        self.with_argument(PromptArgument::required(name, description))
    }

    /// Add an optional argument.
    #[must_use]
    pub fn with_optional_arg(self, name: impl Into<String>, description: impl Into<String>) -> Self {
        self.with_argument(PromptArgument::optional(name, description))
    }
}

/// Argument definition for a prompt.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PromptArgument {
    /// Argument name
    pub name: String,
    /// Argument description
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Whether this argument is required
    #[serde(skip_serializing_if = "Option::is_none")]
    pub required: Option<bool>,
    /// Enumerated candidate values, consulted by the default completion provider
    #[serde(rename = "enum", skip_serializing_if = "Option::is_none")]
    pub enum_values: Option<Vec<String>>,
}

impl PromptArgument {
    /// Create a required argument.
    #[must_use]
    pub fn required(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: Some(description.into()),
            required: Some(true),
            enum_values: None,
        }
    }

    /// Create an optional argument.
    #[must_use]
    pub fn optional(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: Some(description.into()),
            required: Some(false),
            enum_values: None,
        }
    }

    /// Attach enumerated candidate values for argument completion.
    #[must_use]
    pub fn with_enum(mut self, values: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.enum_values = Some(values.into_iter().map(Into::into).collect());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn server_info_builder() {
        let info = ServerInfo::new("my-server", "1.0.0").with_title("My Server");
        assert_eq!(info.name, "my-server");
        assert_eq!(info.title, Some("My Server".into()));
    }

    #[test]
    fn tool_builder_sets_annotations() {
        let tool = Tool::new("add", "Add two numbers").read_only().destructive();
        let ann = tool.annotations.unwrap();
        assert_eq!(ann.read_only_hint, Some(true));
        assert_eq!(ann.destructive_hint, Some(true));
    }

    #[test]
    fn tool_default_schema_is_empty_object() {
        let tool = Tool::new("noop", "does nothing");
        assert_eq!(tool.input_schema["type"], "object");
    }

    #[test]
    fn prompt_builder_orders_arguments() {
        let prompt = Prompt::new("greeting", "A greeting")
            .with_required_arg("name", "Name to greet")
            .with_optional_arg("style", "Greeting style");
        let args = prompt.arguments.unwrap();
        assert_eq!(args[0].required, Some(true));
        assert_eq!(args[1].required, Some(false));
    }

    #[test]
    fn resource_template_round_trips() {
        let tpl = ResourceTemplate::new("file:///{path}", "fs").with_description("filesystem");
        let json = serde_json::to_value(&tpl).unwrap();
        assert_eq!(json["uriTemplate"], "file:///{path}");
        let back: ResourceTemplate = serde_json::from_value(json).unwrap();
        assert_eq!(back, tpl);
    }
}
