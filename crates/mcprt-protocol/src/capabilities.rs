//! Capability negotiation records (spec §6): sparse structs whose absent
//! fields mean "not supported", not "false".

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Capabilities the client advertises during `initialize`.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct ClientCapabilities {
    /// Non-standard capabilities the client supports
    #[serde(skip_serializing_if = "Option::is_none")]
    pub experimental: Option<HashMap<String, Value>>,
    /// Present if the client can list filesystem roots
    #[serde(skip_serializing_if = "Option::is_none")]
    pub roots: Option<RootsCapabilities>,
    /// Present if the client can service `sampling/createMessage`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sampling: Option<SamplingCapabilities>,
    /// Present if the client can service `elicitation/create`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub elicitation: Option<ElicitationCapabilities>,
}

/// Capabilities the server advertises during `initialize`.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct ServerCapabilities {
    /// Non-standard capabilities the server supports
    #[serde(skip_serializing_if = "Option::is_none")]
    pub experimental: Option<HashMap<String, Value>>,
    /// Present if the server can emit `notifications/message` log events
    #[serde(skip_serializing_if = "Option::is_none")]
    pub logging: Option<LoggingCapabilities>,
    /// Present if the server implements `completion/complete`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completions: Option<CompletionCapabilities>,
    /// Present if the server offers any prompts
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prompts: Option<PromptsCapabilities>,
    /// Present if the server offers any resources
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resources: Option<ResourcesCapabilities>,
    /// Present if the server offers any tools
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools: Option<ToolsCapabilities>,
}

/// Client support for `roots/list` and its list-changed notification.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct RootsCapabilities {
    /// Whether the client will emit `notifications/roots/list_changed`
    #[serde(rename = "listChanged", skip_serializing_if = "Option::is_none")]
    pub list_changed: Option<bool>,
}

/// Client support for `sampling/createMessage`. Carries no sub-flags today.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct SamplingCapabilities;

/// Client support for `elicitation/create`. Carries no sub-flags today.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct ElicitationCapabilities;

/// Server support for `logging/setLevel` and log message notifications.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct LoggingCapabilities;

/// Server support for `completion/complete`.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct CompletionCapabilities;

/// Server support for the prompts registry.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct PromptsCapabilities {
    /// Whether the server will emit `notifications/prompts/list_changed`
    #[serde(rename = "listChanged", skip_serializing_if = "Option::is_none")]
    pub list_changed: Option<bool>,
}

/// Server support for the resources registry.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct ResourcesCapabilities {
    /// Whether `resources/subscribe` is supported
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subscribe: Option<bool>,
    /// Whether the server will emit `notifications/resources/list_changed`
    #[serde(rename = "listChanged", skip_serializing_if = "Option::is_none")]
    pub list_changed: Option<bool>,
}

/// Server support for the tools registry.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct ToolsCapabilities {
    /// Whether the server will emit `notifications/tools/list_changed`
    #[serde(rename = "listChanged", skip_serializing_if = "Option::is_none")]
    pub list_changed: Option<bool>,
}

impl ServerCapabilities {
    /// Whether the negotiated capabilities permit sending a given
    /// server-to-client notification method, used to guard emission so a
    /// server never announces a list-changed event it didn't advertise.
    #[must_use]
    pub fn supports_list_changed(&self, method: &str) -> bool {
        match method {
            "notifications/tools/list_changed" => {
                self.tools.as_ref().and_then(|t| t.list_changed).unwrap_or(false)
            }
            "notifications/prompts/list_changed" => self
                .prompts
                .as_ref()
                .and_then(|p| p.list_changed)
                .unwrap_or(false),
            "notifications/resources/list_changed" => self
                .resources
                .as_ref()
                .and_then(|r| r.list_changed)
                .unwrap_or(false),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absent_capability_serializes_as_absent_not_false() {
        let caps = ServerCapabilities::default();
        let value = serde_json::to_value(&caps).unwrap();
        assert!(value.get("tools").is_none());
    }

    #[test]
    fn supports_list_changed_reads_nested_flag() {
        let mut caps = ServerCapabilities::default();
        assert!(!caps.supports_list_changed("notifications/tools/list_changed"));
        caps.tools = Some(ToolsCapabilities { list_changed: Some(true) });
        assert!(caps.supports_list_changed("notifications/tools/list_changed"));
    }
}
