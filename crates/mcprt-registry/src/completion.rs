//! Argument completion (spec §4.7): `completion/complete` against a
//! prompt-argument or resource-template-parameter reference.

use async_trait::async_trait;

/// Maximum number of candidates a default completion provider will return
/// in one response, per the MCP convention of capping completion lists.
const MAX_COMPLETIONS: usize = 100;

/// The result of a completion request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompletionResult {
    /// Candidate values, already truncated to the provider's page size
    pub values: Vec<String>,
    /// Whether more candidates exist beyond `values`
    pub has_more: bool,
    /// Total candidate count, if known
    pub total: Option<usize>,
}

/// Supplies completion candidates for one argument or template parameter.
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    /// Return candidates whose value starts with `prefix`.
    async fn complete(&self, prefix: &str) -> CompletionResult;
}

/// Default completion provider: derives candidates from an argument's
/// `enum` constraint.
#[derive(Debug, Clone)]
pub struct EnumCompletionProvider {
    values: Vec<String>,
}

impl EnumCompletionProvider {
    /// Build a provider over a fixed set of enumerated values.
    #[must_use]
    pub fn new(values: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            values: values.into_iter().map(Into::into).collect(),
        }
    }
}

#[async_trait]
impl CompletionProvider for EnumCompletionProvider {
    async fn complete(&self, prefix: &str) -> CompletionResult {
        let matches: Vec<&String> = self
            .values
            .iter()
            .filter(|v| v.starts_with(prefix))
            .collect();
        let total = matches.len();
        let values = matches
            .into_iter()
            .take(MAX_COMPLETIONS)
            .cloned()
            .collect::<Vec<_>>();
        let has_more = total > values.len();
        CompletionResult {
            values,
            has_more,
            total: Some(total),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn filters_by_prefix() {
        let provider = EnumCompletionProvider::new(["red", "green", "blue", "grey"]);
        let result = provider.complete("gr").await;
        assert_eq!(result.values, vec!["green", "grey"]);
        assert!(!result.has_more);
        assert_eq!(result.total, Some(2));
    }

    #[tokio::test]
    async fn caps_and_flags_has_more() {
        let values: Vec<String> = (0..150).map(|n| format!("item{n:03}")).collect();
        let provider = EnumCompletionProvider::new(values);
        let result = provider.complete("item").await;
        assert_eq!(result.values.len(), MAX_COMPLETIONS);
        assert!(result.has_more);
        assert_eq!(result.total, Some(150));
    }
}
