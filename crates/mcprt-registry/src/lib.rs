//! # mcprt-registry
//!
//! Keyed collections of tools, prompts, resources, and resource templates
//! (spec §4.7): add/remove/get/list, debounced list-changed notification,
//! opaque-cursor pagination, exact-URI subscriptions, RFC 6570 Level 1 URI
//! template matching, and argument completion.

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod completion;
pub mod notifier;
pub mod primitive;
pub mod subscription;
pub mod template;

pub use completion::{CompletionProvider, CompletionResult, EnumCompletionProvider};
pub use notifier::ChangeNotifier;
pub use primitive::{Named, PrimitiveRegistry};
pub use subscription::ResourceSubscriptions;
pub use template::UriTemplateMatcher;

use mcprt_types::{Prompt, Resource, ResourceTemplate, Tool};

impl Named for Tool {
    fn name(&self) -> &str {
        &self.name
    }
}

impl Named for Prompt {
    fn name(&self) -> &str {
        &self.name
    }
}

impl Named for Resource {
    fn name(&self) -> &str {
        &self.name
    }
}

impl Named for ResourceTemplate {
    fn name(&self) -> &str {
        &self.name
    }
}

/// A registry of tools.
pub type ToolRegistry = PrimitiveRegistry<Tool>;
/// A registry of prompts.
pub type PromptRegistry = PrimitiveRegistry<Prompt>;
/// A registry of resources.
pub type ResourceRegistry = PrimitiveRegistry<Resource>;
/// A registry of resource templates.
pub type ResourceTemplateRegistry = PrimitiveRegistry<ResourceTemplate>;
