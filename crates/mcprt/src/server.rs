//! [`McpServer`]: ties the primitive registries to a running [`Session`],
//! answering `tools/*`, `prompts/*`, `resources/*`, `completion/*`, and
//! `logging/*` out of the box so an application only supplies definitions
//! and handlers.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Weak};

use dashmap::DashMap;
use serde_json::Value;

use mcprt_protocol::capabilities::{
    CompletionCapabilities, LoggingCapabilities, PromptsCapabilities, ResourcesCapabilities,
    ToolsCapabilities,
};
use mcprt_protocol::{ErrorCode, ProtocolError, ServerCapabilities};
use mcprt_registry::{CompletionProvider, CompletionResult, EnumCompletionProvider, PrimitiveRegistry, ResourceSubscriptions, UriTemplateMatcher};
use mcprt_session::{RequestContext, Role, ServerInitConfig, Session, SessionState};
use mcprt_streamable_http::server::SessionHook;
use mcprt_types::{Prompt, Resource, ResourceTemplate, ServerInfo, Tool};

use crate::error::{McpError, McpResult};
use crate::handler::{PromptEntry, PromptHandler, ResourceEntry, ResourceHandler, ResourceTemplateEntry, ResourceTemplateHandler, ToolEntry, ToolHandler};
use crate::logging::{LogLevel, LogLevelState};

/// Page size used for `tools/list`, `prompts/list`, `resources/list`, and
/// `resources/templates/list` when the caller supplies no explicit limit.
const DEFAULT_PAGE_SIZE: usize = 50;

/// Builds an [`McpServer`]: accumulates primitive definitions and handlers,
/// then hands them to the server at construction (teacher idiom: a fluent
/// builder that fails fast on duplicate registrations rather than at
/// dispatch time).
pub struct ServerBuilder {
    server_info: ServerInfo,
    instructions: Option<String>,
    supported_versions: Vec<String>,
    logging: bool,
    tools: Vec<ToolEntry>,
    prompts: Vec<PromptEntry>,
    resources: Vec<ResourceEntry>,
    resource_templates: Vec<ResourceTemplateEntry>,
}

impl ServerBuilder {
    /// Start a builder for a server identifying itself as `name`/`version`,
    /// understanding [`mcprt_types::SUPPORTED_PROTOCOL_VERSIONS`] by default.
    #[must_use]
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            server_info: ServerInfo::new(name, version),
            instructions: None,
            supported_versions: mcprt_types::SUPPORTED_PROTOCOL_VERSIONS.iter().map(|s| s.to_string()).collect(),
            logging: false,
            tools: Vec::new(),
            prompts: Vec::new(),
            resources: Vec::new(),
            resource_templates: Vec::new(),
        }
    }

    /// Set the protocol versions this server negotiates, most preferred first.
    #[must_use]
    pub fn supported_versions(mut self, versions: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.supported_versions = versions.into_iter().map(Into::into).collect();
        self
    }

    /// Attach freeform instructions returned to the client on a successful handshake.
    #[must_use]
    pub fn instructions(mut self, instructions: impl Into<String>) -> Self {
        self.instructions = Some(instructions.into());
        self
    }

    /// Advertise `logging{}` and wire a `logging/setLevel` handler.
    #[must_use]
    pub fn with_logging(mut self) -> Self {
        self.logging = true;
        self
    }

    /// Register a tool.
    ///
    /// # Errors
    ///
    /// Returns [`McpError::DuplicateName`] if a tool with this name is
    /// already registered.
    pub fn tool<H: ToolHandler + 'static>(mut self, definition: Tool, handler: H) -> McpResult<Self> {
        if self.tools.iter().any(|t| t.definition.name == definition.name) {
            return Err(McpError::DuplicateName { kind: "tool", name: definition.name });
        }
        self.tools.push(ToolEntry { definition, handler: Arc::new(handler) });
        Ok(self)
    }

    /// Register a prompt, with no per-argument completion overrides.
    ///
    /// # Errors
    ///
    /// Returns [`McpError::DuplicateName`] if a prompt with this name is
    /// already registered.
    pub fn prompt<H: PromptHandler + 'static>(self, definition: Prompt, handler: H) -> McpResult<Self> {
        self.prompt_with_completions(definition, handler, HashMap::new())
    }

    /// Register a prompt, overriding the default enum-derived completion
    /// provider for the named arguments.
    ///
    /// # Errors
    ///
    /// Returns [`McpError::DuplicateName`] if a prompt with this name is
    /// already registered.
    pub fn prompt_with_completions<H: PromptHandler + 'static>(
        mut self,
        definition: Prompt,
        handler: H,
        completions: HashMap<String, Arc<dyn CompletionProvider>>,
    ) -> McpResult<Self> {
        if self.prompts.iter().any(|p| p.definition.name == definition.name) {
            return Err(McpError::DuplicateName { kind: "prompt", name: definition.name });
        }
        self.prompts.push(PromptEntry { definition, handler: Arc::new(handler), completions });
        Ok(self)
    }

    /// Register a concrete-URI resource.
    ///
    /// # Errors
    ///
    /// Returns [`McpError::DuplicateName`] if a resource with this name is
    /// already registered.
    pub fn resource<H: ResourceHandler + 'static>(mut self, definition: Resource, handler: H) -> McpResult<Self> {
        if self.resources.iter().any(|r| r.definition.name == definition.name) {
            return Err(McpError::DuplicateName { kind: "resource", name: definition.name });
        }
        self.resources.push(ResourceEntry { definition, handler: Arc::new(handler) });
        Ok(self)
    }

    /// Register a resource template, with no per-variable completion overrides.
    ///
    /// # Errors
    ///
    /// Returns [`McpError::DuplicateName`] if a template with this name is
    /// already registered.
    pub fn resource_template<H: ResourceTemplateHandler + 'static>(self, definition: ResourceTemplate, handler: H) -> McpResult<Self> {
        self.resource_template_with_completions(definition, handler, HashMap::new())
    }

    /// Register a resource template, attaching completion providers for its
    /// variables.
    ///
    /// # Errors
    ///
    /// Returns [`McpError::DuplicateName`] if a template with this name is
    /// already registered.
    pub fn resource_template_with_completions<H: ResourceTemplateHandler + 'static>(
        mut self,
        definition: ResourceTemplate,
        handler: H,
        completions: HashMap<String, Arc<dyn CompletionProvider>>,
    ) -> McpResult<Self> {
        if self.resource_templates.iter().any(|t| t.definition.name == definition.name) {
            return Err(McpError::DuplicateName { kind: "resource template", name: definition.name });
        }
        self.resource_templates.push(ResourceTemplateEntry { definition, handler: Arc::new(handler), completions });
        Ok(self)
    }

    /// Build the server.
    #[must_use]
    pub fn build(self) -> Arc<McpServer> {
        McpServer::new(self)
    }
}

struct ConnectedSession {
    session: Arc<Session>,
    subscriptions: Arc<ResourceSubscriptions>,
}

/// A running MCP server: the primitive registries plus every live session
/// attached to it. Built with [`ServerBuilder`].
///
/// Registries stay mutable after construction (`server.tools().add(...)`)
/// so an application can publish or retract primitives at runtime; doing so
/// fires the matching `notifications/*/list_changed` to every attached
/// session that negotiated support for it.
pub struct McpServer {
    server_info: ServerInfo,
    instructions: Option<String>,
    supported_versions: Vec<String>,
    logging: Option<LogLevelState>,
    tools: PrimitiveRegistry<ToolEntry>,
    prompts: PrimitiveRegistry<PromptEntry>,
    resources: PrimitiveRegistry<ResourceEntry>,
    resource_templates: PrimitiveRegistry<ResourceTemplateEntry>,
    sessions: DashMap<usize, ConnectedSession>,
    next_session_id: AtomicUsize,
}

impl McpServer {
    fn new(builder: ServerBuilder) -> Arc<Self> {
        Arc::new_cyclic(|weak: &Weak<Self>| {
            let tools = PrimitiveRegistry::new(notifier_for(weak, "notifications/tools/list_changed"));
            let prompts = PrimitiveRegistry::new(notifier_for(weak, "notifications/prompts/list_changed"));
            let resources = PrimitiveRegistry::new(notifier_for(weak, "notifications/resources/list_changed"));
            let resource_templates = PrimitiveRegistry::new(notifier_for(weak, "notifications/resources/list_changed"));

            for tool in builder.tools {
                tools.add(tool);
            }
            for prompt in builder.prompts {
                prompts.add(prompt);
            }
            for resource in builder.resources {
                resources.add(resource);
            }
            for template in builder.resource_templates {
                resource_templates.add(template);
            }

            Self {
                server_info: builder.server_info,
                instructions: builder.instructions,
                supported_versions: builder.supported_versions,
                logging: builder.logging.then(LogLevelState::new),
                tools,
                prompts,
                resources,
                resource_templates,
                sessions: DashMap::new(),
                next_session_id: AtomicUsize::new(0),
            }
        })
    }

    /// The tool registry, mutable for runtime publish/retract.
    #[must_use]
    pub fn tools(&self) -> &PrimitiveRegistry<ToolEntry> {
        &self.tools
    }

    /// The prompt registry, mutable for runtime publish/retract.
    #[must_use]
    pub fn prompts(&self) -> &PrimitiveRegistry<PromptEntry> {
        &self.prompts
    }

    /// The resource registry, mutable for runtime publish/retract.
    #[must_use]
    pub fn resources(&self) -> &PrimitiveRegistry<ResourceEntry> {
        &self.resources
    }

    /// The resource template registry, mutable for runtime publish/retract.
    #[must_use]
    pub fn resource_templates(&self) -> &PrimitiveRegistry<ResourceTemplateEntry> {
        &self.resource_templates
    }

    /// The currently effective log level, if this server advertises `logging{}`.
    #[must_use]
    pub fn log_level(&self) -> Option<LogLevel> {
        self.logging.as_ref().map(LogLevelState::get)
    }

    fn capabilities(&self) -> ServerCapabilities {
        ServerCapabilities {
            experimental: None,
            logging: self.logging.is_some().then_some(LoggingCapabilities),
            completions: Some(CompletionCapabilities),
            prompts: (!self.prompts.is_empty()).then_some(PromptsCapabilities { list_changed: Some(true) }),
            resources: (!self.resources.is_empty() || !self.resource_templates.is_empty())
                .then_some(ResourcesCapabilities { subscribe: Some(true), list_changed: Some(true) }),
            tools: (!self.tools.is_empty()).then_some(ToolsCapabilities { list_changed: Some(true) }),
        }
    }

    fn init_config(&self) -> ServerInitConfig {
        ServerInitConfig {
            supported_versions: self.supported_versions.clone(),
            capabilities: self.capabilities(),
            server_info: self.server_info.clone(),
            instructions: self.instructions.clone(),
        }
    }

    /// Spawn a fresh server-role [`Session`] over `transport` and attach it.
    #[must_use]
    pub fn spawn_session(self: &Arc<Self>, transport: Arc<dyn mcprt_transport::Transport>) -> Arc<Session> {
        let session = Session::spawn(transport, Role::Server, Some(self.init_config()));
        self.attach(&session);
        session
    }

    /// A [`SessionHook`] that attaches every session a
    /// [`mcprt_streamable_http::server::StreamableHttpServer`] spawns.
    #[must_use]
    pub fn session_hook(self: &Arc<Self>) -> SessionHook {
        let server = self.clone();
        Arc::new(move |session: &Arc<Session>| server.attach(session))
    }

    /// Register this server's request handlers on an already-spawned
    /// session and start tracking it for broadcast/notification routing.
    pub fn attach(self: &Arc<Self>, session: &Arc<Session>) {
        let subscriptions = Arc::new(ResourceSubscriptions::new());
        let id = self.next_session_id.fetch_add(1, Ordering::SeqCst);
        self.sessions.insert(id, ConnectedSession { session: session.clone(), subscriptions: subscriptions.clone() });

        let server = self.clone();
        session.register_request_handler("tools/list", Arc::new(move |params, _ctx| {
            let server = server.clone();
            async move { server.handle_tools_list(params) }
        }));

        let server = self.clone();
        session.register_request_handler("tools/call", Arc::new(move |params, ctx| {
            let server = server.clone();
            async move { server.handle_tools_call(params, ctx).await }
        }));

        let server = self.clone();
        session.register_request_handler("prompts/list", Arc::new(move |params, _ctx| {
            let server = server.clone();
            async move { server.handle_prompts_list(params) }
        }));

        let server = self.clone();
        session.register_request_handler("prompts/get", Arc::new(move |params, ctx| {
            let server = server.clone();
            async move { server.handle_prompts_get(params, ctx).await }
        }));

        let server = self.clone();
        session.register_request_handler("resources/list", Arc::new(move |params, _ctx| {
            let server = server.clone();
            async move { server.handle_resources_list(params) }
        }));

        let server = self.clone();
        session.register_request_handler("resources/templates/list", Arc::new(move |params, _ctx| {
            let server = server.clone();
            async move { server.handle_resource_templates_list(params) }
        }));

        let server = self.clone();
        session.register_request_handler("resources/read", Arc::new(move |params, ctx| {
            let server = server.clone();
            async move { server.handle_resources_read(params, ctx).await }
        }));

        let subs = subscriptions.clone();
        session.register_request_handler("resources/subscribe", Arc::new(move |params, _ctx| {
            let subs = subs.clone();
            async move { handle_subscribe(&subs, params, true) }
        }));

        let subs = subscriptions.clone();
        session.register_request_handler("resources/unsubscribe", Arc::new(move |params, _ctx| {
            let subs = subs.clone();
            async move { handle_subscribe(&subs, params, false) }
        }));

        let server = self.clone();
        session.register_request_handler("completion/complete", Arc::new(move |params, _ctx| {
            let server = server.clone();
            async move { server.handle_completion_complete(params).await }
        }));

        if let Some(logging) = &self.logging {
            let _ = logging;
            let server = self.clone();
            session.register_request_handler("logging/setLevel", Arc::new(move |params, _ctx| {
                let server = server.clone();
                async move { server.handle_logging_set_level(params) }
            }));
        }
    }

    /// Send `notifications/resources/updated{uri}` to every session
    /// subscribed to `uri`, lazily evicting sessions whose transport has
    /// since closed.
    pub async fn notify_resource_updated(&self, uri: &str) {
        let recipients: Vec<(usize, Arc<Session>)> = self
            .sessions
            .iter()
            .filter(|entry| entry.value().subscriptions.is_subscribed(uri))
            .map(|entry| (*entry.key(), entry.value().session.clone()))
            .collect();

        let mut stale = Vec::new();
        for (id, session) in recipients {
            if session.state() == SessionState::Closed {
                stale.push(id);
                continue;
            }
            let _ = session
                .send_notification("notifications/resources/updated", Some(serde_json::json!({ "uri": uri })))
                .await;
        }
        for id in stale {
            self.sessions.remove(&id);
        }
    }

    fn handle_tools_list(&self, params: Option<Value>) -> Result<Value, ProtocolError> {
        let cursor = cursor_param(&params);
        let (page, next_cursor) = self.tools.list(cursor.as_deref(), DEFAULT_PAGE_SIZE);
        Ok(list_response("tools", page.into_iter().map(|e| e.definition).collect::<Vec<Tool>>(), next_cursor))
    }

    async fn handle_tools_call(&self, params: Option<Value>, ctx: RequestContext) -> Result<Value, ProtocolError> {
        let params = params.ok_or_else(|| invalid_params("missing params"))?;
        let name = params.get("name").and_then(Value::as_str).ok_or_else(|| invalid_params("missing name"))?;
        let entry = self.tools.get(name).ok_or_else(|| invalid_params(format!("unknown tool {name}")))?;
        let arguments = params.get("arguments").cloned();
        let result = entry.handler.call(arguments, ctx).await?;
        to_value(&result)
    }

    fn handle_prompts_list(&self, params: Option<Value>) -> Result<Value, ProtocolError> {
        let cursor = cursor_param(&params);
        let (page, next_cursor) = self.prompts.list(cursor.as_deref(), DEFAULT_PAGE_SIZE);
        Ok(list_response("prompts", page.into_iter().map(|e| e.definition).collect::<Vec<Prompt>>(), next_cursor))
    }

    async fn handle_prompts_get(&self, params: Option<Value>, ctx: RequestContext) -> Result<Value, ProtocolError> {
        let params = params.ok_or_else(|| invalid_params("missing params"))?;
        let name = params.get("name").and_then(Value::as_str).ok_or_else(|| invalid_params("missing name"))?;
        let entry = self.prompts.get(name).ok_or_else(|| invalid_params(format!("unknown prompt {name}")))?;
        let arguments: Option<HashMap<String, String>> = match params.get("arguments") {
            Some(v) => Some(serde_json::from_value(v.clone()).map_err(|e| invalid_params(format!("bad arguments: {e}")))?),
            None => None,
        };
        let result = entry.handler.get(arguments, ctx).await?;
        to_value(&result)
    }

    fn handle_resources_list(&self, params: Option<Value>) -> Result<Value, ProtocolError> {
        let cursor = cursor_param(&params);
        let (page, next_cursor) = self.resources.list(cursor.as_deref(), DEFAULT_PAGE_SIZE);
        Ok(list_response("resources", page.into_iter().map(|e| e.definition).collect::<Vec<Resource>>(), next_cursor))
    }

    fn handle_resource_templates_list(&self, params: Option<Value>) -> Result<Value, ProtocolError> {
        let cursor = cursor_param(&params);
        let (page, next_cursor) = self.resource_templates.list(cursor.as_deref(), DEFAULT_PAGE_SIZE);
        Ok(list_response(
            "resourceTemplates",
            page.into_iter().map(|e| e.definition).collect::<Vec<ResourceTemplate>>(),
            next_cursor,
        ))
    }

    fn find_resource_by_uri(&self, uri: &str) -> Option<ResourceEntry> {
        let (all, _) = self.resources.list(None, self.resources.len());
        all.into_iter().find(|e| e.definition.uri == uri)
    }

    fn match_resource_template(&self, uri: &str) -> Option<(ResourceTemplateEntry, HashMap<String, String>)> {
        let (all, _) = self.resource_templates.list(None, self.resource_templates.len());
        all.into_iter().find_map(|entry| {
            let captures = UriTemplateMatcher::parse(entry.definition.uri_template.clone()).match_uri(uri)?;
            Some((entry, captures))
        })
    }

    async fn handle_resources_read(&self, params: Option<Value>, ctx: RequestContext) -> Result<Value, ProtocolError> {
        let params = params.ok_or_else(|| invalid_params("missing params"))?;
        let uri = params.get("uri").and_then(Value::as_str).ok_or_else(|| invalid_params("missing uri"))?;

        if let Some(entry) = self.find_resource_by_uri(uri) {
            let result = entry.handler.read(ctx).await?;
            return to_value(&result);
        }
        if let Some((entry, captures)) = self.match_resource_template(uri) {
            let result = entry.handler.read(uri, captures, ctx).await?;
            return to_value(&result);
        }
        Err(invalid_params(format!("no resource matches uri {uri}")))
    }

    async fn handle_completion_complete(&self, params: Option<Value>) -> Result<Value, ProtocolError> {
        let params = params.ok_or_else(|| invalid_params("missing params"))?;
        let reference = params.get("ref").ok_or_else(|| invalid_params("missing ref"))?;
        let argument = params.get("argument").ok_or_else(|| invalid_params("missing argument"))?;
        let arg_name = argument.get("name").and_then(Value::as_str).ok_or_else(|| invalid_params("missing argument.name"))?;
        let prefix = argument.get("value").and_then(Value::as_str).unwrap_or("");

        let result = match reference.get("type").and_then(Value::as_str) {
            Some("ref/prompt") => {
                let name = reference.get("name").and_then(Value::as_str).ok_or_else(|| invalid_params("missing ref.name"))?;
                let entry = self.prompts.get(name).ok_or_else(|| invalid_params(format!("unknown prompt {name}")))?;
                complete_prompt_argument(&entry, arg_name, prefix).await
            }
            Some("ref/resource") => {
                let uri = reference.get("uri").and_then(Value::as_str).ok_or_else(|| invalid_params("missing ref.uri"))?;
                let (all, _) = self.resource_templates.list(None, self.resource_templates.len());
                let entry = all
                    .into_iter()
                    .find(|e| e.definition.uri_template == uri)
                    .ok_or_else(|| invalid_params(format!("unknown resource template {uri}")))?;
                complete_template_param(&entry, arg_name, prefix).await
            }
            other => return Err(invalid_params(format!("unsupported completion ref type {other:?}"))),
        };

        Ok(serde_json::json!({
            "completion": { "values": result.values, "hasMore": result.has_more, "total": result.total },
        }))
    }

    fn handle_logging_set_level(&self, params: Option<Value>) -> Result<Value, ProtocolError> {
        let Some(logging) = &self.logging else {
            return Err(ProtocolError::from_code(ErrorCode::MethodNotFound));
        };
        let level: LogLevel = params
            .and_then(|p| p.get("level").cloned())
            .and_then(|v| serde_json::from_value(v).ok())
            .ok_or_else(|| invalid_params("missing or invalid level"))?;
        logging.set(level);
        Ok(serde_json::json!({}))
    }
}

fn notifier_for(weak: &Weak<McpServer>, method: &'static str) -> impl Fn() + Send + Sync + 'static {
    let weak = weak.clone();
    move || {
        let Some(server) = weak.upgrade() else { return };
        tokio::spawn(async move { server.broadcast_list_changed(method).await });
    }
}

impl McpServer {
    async fn broadcast_list_changed(&self, method: &str) {
        if !self.capabilities().supports_list_changed(method) {
            return;
        }
        let recipients: Vec<(usize, Arc<Session>)> = self.sessions.iter().map(|e| (*e.key(), e.value().session.clone())).collect();
        let mut stale = Vec::new();
        for (id, session) in recipients {
            if session.state() == SessionState::Closed {
                stale.push(id);
                continue;
            }
            let _ = session.send_notification(method, None).await;
        }
        for id in stale {
            self.sessions.remove(&id);
        }
    }
}

async fn complete_prompt_argument(entry: &PromptEntry, arg_name: &str, prefix: &str) -> CompletionResult {
    if let Some(provider) = entry.completions.get(arg_name) {
        return provider.complete(prefix).await;
    }
    let Some(args) = &entry.definition.arguments else { return CompletionResult::default() };
    let Some(arg) = args.iter().find(|a| a.name == arg_name) else { return CompletionResult::default() };
    let Some(values) = &arg.enum_values else { return CompletionResult::default() };
    EnumCompletionProvider::new(values.clone()).complete(prefix).await
}

async fn complete_template_param(entry: &ResourceTemplateEntry, param_name: &str, prefix: &str) -> CompletionResult {
    match entry.completions.get(param_name) {
        Some(provider) => provider.complete(prefix).await,
        None => CompletionResult::default(),
    }
}

fn handle_subscribe(subs: &ResourceSubscriptions, params: Option<Value>, subscribe: bool) -> Result<Value, ProtocolError> {
    let uri = params
        .as_ref()
        .and_then(|p| p.get("uri"))
        .and_then(Value::as_str)
        .ok_or_else(|| invalid_params("missing uri"))?;
    if subscribe {
        subs.subscribe(uri);
    } else {
        subs.unsubscribe(uri);
    }
    Ok(serde_json::json!({}))
}

fn cursor_param(params: &Option<Value>) -> Option<String> {
    params.as_ref().and_then(|p| p.get("cursor")).and_then(Value::as_str).map(str::to_string)
}

fn list_response<T: serde::Serialize>(key: &str, items: Vec<T>, next_cursor: Option<String>) -> Value {
    let mut value = serde_json::json!({ key: items });
    if let Some(cursor) = next_cursor {
        value["nextCursor"] = Value::String(cursor);
    }
    value
}

fn to_value<T: serde::Serialize>(value: &T) -> Result<Value, ProtocolError> {
    serde_json::to_value(value).map_err(|e| ProtocolError::with_message(ErrorCode::InternalError, e.to_string()))
}

fn invalid_params(message: impl Into<String>) -> ProtocolError {
    ProtocolError::with_message(ErrorCode::InvalidParams, message.into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use mcprt_protocol::{ClientCapabilities, ServerCapabilities as ProtoServerCapabilities};
    use mcprt_types::{ClientInfo, ResourceResult, ToolResult};
    use std::sync::atomic::AtomicBool;
    use tokio::sync::{mpsc, Mutex as AsyncMutex};
    use tokio_util::sync::CancellationToken;

    struct ChannelTransport {
        outbox: mpsc::Sender<mcprt_protocol::JsonRpcMessage>,
        inbox: AsyncMutex<mpsc::Receiver<mcprt_protocol::JsonRpcMessage>>,
        closed: AtomicBool,
    }

    #[async_trait::async_trait]
    impl mcprt_transport::Transport for ChannelTransport {
        fn state(&self) -> mcprt_transport::TransportState {
            if self.closed.load(Ordering::SeqCst) { mcprt_transport::TransportState::Closed } else { mcprt_transport::TransportState::Open }
        }
        fn capabilities(&self) -> mcprt_transport::TransportCapabilities {
            mcprt_transport::TransportCapabilities { resumable: false, server_initiated: true }
        }
        async fn send(&self, message: mcprt_protocol::JsonRpcMessage) -> mcprt_transport::TransportResult<()> {
            self.outbox.send(message).await.map_err(|_| mcprt_transport::TransportError::Closed(mcprt_transport::CloseDetails::default()))
        }
        async fn receive(&self) -> mcprt_transport::TransportResult<Option<mcprt_protocol::JsonRpcMessage>> {
            Ok(self.inbox.lock().await.recv().await)
        }
        async fn close(&self) -> mcprt_transport::TransportResult<()> {
            self.closed.store(true, Ordering::SeqCst);
            Ok(())
        }
    }

    fn wire_pair() -> (Arc<ChannelTransport>, Arc<ChannelTransport>) {
        let (a_tx, a_rx) = mpsc::channel(64);
        let (b_tx, b_rx) = mpsc::channel(64);
        let a = Arc::new(ChannelTransport { outbox: a_tx, inbox: AsyncMutex::new(b_rx), closed: AtomicBool::new(false) });
        let b = Arc::new(ChannelTransport { outbox: b_tx, inbox: AsyncMutex::new(a_rx), closed: AtomicBool::new(false) });
        (a, b)
    }

    fn echo_server() -> Arc<McpServer> {
        ServerBuilder::new("test-server", "0.1.0")
            .tool(Tool::new("echo", "echoes its input"), |params: Option<Value>, _ctx: RequestContext| async move {
                Ok(ToolResult::text(params.map(|p| p.to_string()).unwrap_or_default()))
            })
            .unwrap()
            .resource(Resource::new("mem://greeting", "greeting"), |_ctx: RequestContext| async move {
                Ok(ResourceResult::text("mem://greeting", "hello"))
            })
            .unwrap()
            .build()
    }

    async fn connected_client(server: &Arc<McpServer>) -> Arc<Session> {
        let (client_t, server_t) = wire_pair();
        let _server_session = server.spawn_session(server_t);
        let client = Session::spawn(client_t, Role::Client, None);
        client
            .initialize_as_client(
                mcprt_types::SUPPORTED_PROTOCOL_VERSIONS,
                ClientCapabilities::default(),
                ClientInfo::new("test-client", "0.1.0"),
            )
            .await
            .unwrap();
        client
    }

    #[tokio::test]
    async fn tools_list_then_call_round_trips() {
        let server = echo_server();
        let client = connected_client(&server).await;

        let list = client.send_request("tools/list", None, CancellationToken::new()).await.unwrap();
        assert_eq!(list["tools"][0]["name"], "echo");

        let result = client
            .send_request("tools/call", Some(serde_json::json!({"name": "echo", "arguments": {"x": 1}})), CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(result["content"][0]["type"], "text");
    }

    #[tokio::test]
    async fn unknown_tool_is_invalid_params() {
        let server = echo_server();
        let client = connected_client(&server).await;

        let result = client
            .send_request("tools/call", Some(serde_json::json!({"name": "nope"})), CancellationToken::new())
            .await;
        match result {
            Err(ProtocolError::Rpc { code, .. }) => assert_eq!(code, mcprt_protocol::ErrorCode::InvalidParams),
            other => panic!("expected InvalidParams, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn resources_read_resolves_exact_uri() {
        let server = echo_server();
        let client = connected_client(&server).await;

        let result = client
            .send_request("resources/read", Some(serde_json::json!({"uri": "mem://greeting"})), CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(result["contents"][0]["text"], "hello");
    }

    #[tokio::test]
    async fn resources_read_resolves_template_and_unescapes_params() {
        let server = ServerBuilder::new("test-server", "0.1.0")
            .resource_template(
                ResourceTemplate::new("mem://{key}", "mem"),
                |_uri: &str, params: HashMap<String, String>, _ctx: RequestContext| {
                    let value = params.get("key").cloned().unwrap_or_default();
                    async move { Ok(ResourceResult::text("mem://x", value)) }
                },
            )
            .unwrap()
            .build();
        let client = connected_client(&server).await;

        let result = client
            .send_request("resources/read", Some(serde_json::json!({"uri": "mem://hello%20world"})), CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(result["contents"][0]["text"], "hello world");
    }

    #[tokio::test]
    async fn resource_subscription_receives_update_notification() {
        let server = echo_server();
        let (client_t, server_t) = wire_pair();
        let _server_session = server.spawn_session(server_t);
        let client = Session::spawn(client_t, Role::Client, None);
        client
            .initialize_as_client(mcprt_types::SUPPORTED_PROTOCOL_VERSIONS, ClientCapabilities::default(), ClientInfo::new("c", "1"))
            .await
            .unwrap();

        client
            .send_request("resources/subscribe", Some(serde_json::json!({"uri": "mem://greeting"})), CancellationToken::new())
            .await
            .unwrap();

        client.register_notification_handler(
            "notifications/resources/updated",
            Arc::new(|_params: Option<Value>| async { Ok(()) }),
        );
        server.notify_resource_updated("mem://greeting").await;
    }

    #[tokio::test]
    async fn completion_uses_prompt_argument_enum() {
        let server = ServerBuilder::new("test-server", "0.1.0")
            .prompt(
                Prompt::new("greet", "greets someone").with_argument(mcprt_types::PromptArgument::optional("style", "tone").with_enum(["formal", "friendly"])),
                |_args: Option<HashMap<String, String>>, _ctx: RequestContext| async move { Ok(mcprt_types::PromptResult::user("hi")) },
            )
            .unwrap()
            .build();
        let client = connected_client(&server).await;

        let result = client
            .send_request(
                "completion/complete",
                Some(serde_json::json!({
                    "ref": {"type": "ref/prompt", "name": "greet"},
                    "argument": {"name": "style", "value": "f"},
                })),
                CancellationToken::new(),
            )
            .await
            .unwrap();
        assert_eq!(result["completion"]["values"], serde_json::json!(["formal", "friendly"]));
    }

    #[tokio::test]
    async fn capabilities_reflect_populated_registries() {
        let server = echo_server();
        assert!(server.capabilities().tools.is_some());
        assert!(server.capabilities().resources.is_some());
        assert!(server.capabilities().prompts.is_none());
    }

    #[tokio::test]
    async fn logging_set_level_updates_state_when_enabled() {
        let server = ServerBuilder::new("test-server", "0.1.0").with_logging().build();
        let client = connected_client(&server).await;

        client
            .send_request("logging/setLevel", Some(serde_json::json!({"level": "debug"})), CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(server.log_level(), Some(LogLevel::Debug));
    }

    #[tokio::test]
    async fn logging_disabled_by_default() {
        let server = echo_server();
        assert_eq!(server.log_level(), None);
        let _ = ProtoServerCapabilities::default();
    }
}
