//! Handler traits for the three invocable primitive kinds, and the entry
//! types that pair a definition with its handler inside a
//! [`mcprt_registry::PrimitiveRegistry`].

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use mcprt_protocol::ProtocolError;
use mcprt_registry::{CompletionProvider, Named};
use mcprt_session::RequestContext;
use mcprt_types::{Prompt, PromptResult, Resource, ResourceResult, ResourceTemplate, Tool, ToolResult};
use serde_json::Value;

/// Handles one tool's `tools/call` invocation.
#[async_trait]
pub trait ToolHandler: Send + Sync {
    /// Run the tool against its raw `arguments` object.
    async fn call(&self, arguments: Option<Value>, ctx: RequestContext) -> Result<ToolResult, ProtocolError>;
}

#[async_trait]
impl<F, Fut> ToolHandler for F
where
    F: Fn(Option<Value>, RequestContext) -> Fut + Send + Sync,
    Fut: std::future::Future<Output = Result<ToolResult, ProtocolError>> + Send,
{
    async fn call(&self, arguments: Option<Value>, ctx: RequestContext) -> Result<ToolResult, ProtocolError> {
        self(arguments, ctx).await
    }
}

/// Handles one prompt's `prompts/get` invocation.
#[async_trait]
pub trait PromptHandler: Send + Sync {
    /// Render the prompt against its string-valued arguments.
    async fn get(&self, arguments: Option<HashMap<String, String>>, ctx: RequestContext) -> Result<PromptResult, ProtocolError>;
}

#[async_trait]
impl<F, Fut> PromptHandler for F
where
    F: Fn(Option<HashMap<String, String>>, RequestContext) -> Fut + Send + Sync,
    Fut: std::future::Future<Output = Result<PromptResult, ProtocolError>> + Send,
{
    async fn get(&self, arguments: Option<HashMap<String, String>>, ctx: RequestContext) -> Result<PromptResult, ProtocolError> {
        self(arguments, ctx).await
    }
}

/// Handles one exact-URI resource's `resources/read` invocation.
#[async_trait]
pub trait ResourceHandler: Send + Sync {
    /// Read the resource's current content.
    async fn read(&self, ctx: RequestContext) -> Result<ResourceResult, ProtocolError>;
}

#[async_trait]
impl<F, Fut> ResourceHandler for F
where
    F: Fn(RequestContext) -> Fut + Send + Sync,
    Fut: std::future::Future<Output = Result<ResourceResult, ProtocolError>> + Send,
{
    async fn read(&self, ctx: RequestContext) -> Result<ResourceResult, ProtocolError> {
        self(ctx).await
    }
}

/// Handles one resource template's `resources/read` invocation once its URI
/// template has matched and its variables have been unescaped.
#[async_trait]
pub trait ResourceTemplateHandler: Send + Sync {
    /// Read the resource identified by `uri`, whose template variables have
    /// already been captured into `params`.
    async fn read(&self, uri: &str, params: HashMap<String, String>, ctx: RequestContext) -> Result<ResourceResult, ProtocolError>;
}

#[async_trait]
impl<F, Fut> ResourceTemplateHandler for F
where
    F: Fn(&str, HashMap<String, String>, RequestContext) -> Fut + Send + Sync,
    Fut: std::future::Future<Output = Result<ResourceResult, ProtocolError>> + Send,
{
    async fn read(&self, uri: &str, params: HashMap<String, String>, ctx: RequestContext) -> Result<ResourceResult, ProtocolError> {
        self(uri, params, ctx).await
    }
}

/// A tool definition paired with the handler that runs it, held inside a
/// [`mcprt_registry::PrimitiveRegistry<ToolEntry>`].
#[derive(Clone)]
pub struct ToolEntry {
    /// The tool's advertised definition.
    pub definition: Tool,
    /// The handler invoked by `tools/call`.
    pub handler: Arc<dyn ToolHandler>,
}

impl Named for ToolEntry {
    fn name(&self) -> &str {
        &self.definition.name
    }
}

/// A prompt definition paired with its handler and, per argument, an
/// optional completion provider consulted by `completion/complete`.
#[derive(Clone)]
pub struct PromptEntry {
    /// The prompt's advertised definition.
    pub definition: Prompt,
    /// The handler invoked by `prompts/get`.
    pub handler: Arc<dyn PromptHandler>,
    /// Completion providers keyed by argument name, overriding the default
    /// enum-derived provider built from [`mcprt_types::PromptArgument::enum_values`].
    pub completions: HashMap<String, Arc<dyn CompletionProvider>>,
}

impl Named for PromptEntry {
    fn name(&self) -> &str {
        &self.definition.name
    }
}

/// A concrete-URI resource definition paired with its handler.
#[derive(Clone)]
pub struct ResourceEntry {
    /// The resource's advertised definition.
    pub definition: Resource,
    /// The handler invoked by `resources/read`.
    pub handler: Arc<dyn ResourceHandler>,
}

impl Named for ResourceEntry {
    fn name(&self) -> &str {
        &self.definition.name
    }
}

/// A resource template definition paired with its handler and, per
/// template variable, an optional completion provider.
#[derive(Clone)]
pub struct ResourceTemplateEntry {
    /// The template's advertised definition.
    pub definition: ResourceTemplate,
    /// The handler invoked once a concrete URI matches this template.
    pub handler: Arc<dyn ResourceTemplateHandler>,
    /// Completion providers keyed by template variable name.
    pub completions: HashMap<String, Arc<dyn CompletionProvider>>,
}

impl Named for ResourceTemplateEntry {
    fn name(&self) -> &str {
        &self.definition.name
    }
}
