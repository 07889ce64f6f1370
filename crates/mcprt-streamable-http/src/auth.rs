//! Client-side authentication for the Streamable HTTP transport (spec
//! §4.4): a `401` response carries a `WWW-Authenticate` challenge,
//! optionally pointing at a `resource_metadata` URI; the client asks its
//! credential provider for a token and retries the request exactly once.

use async_trait::async_trait;

/// A `WWW-Authenticate` challenge parsed from a `401` response.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthChallenge {
    /// The authentication scheme, e.g. `"Bearer"`.
    pub scheme: Option<String>,
    /// The `resource_metadata` URI, if the challenge carried one, pointing
    /// at where the client can discover how to obtain a token.
    pub resource_metadata: Option<String>,
}

impl AuthChallenge {
    /// Parse a `WWW-Authenticate` header value.
    #[must_use]
    pub fn parse(header_value: &str) -> Self {
        let mut parts = header_value.splitn(2, ' ');
        let scheme = parts.next().map(str::to_string).filter(|s| !s.is_empty());
        let rest = parts.next().unwrap_or("");
        let resource_metadata = rest.split(',').find_map(|kv| {
            let kv = kv.trim();
            let (key, value) = kv.split_once('=')?;
            if key.trim() == "resource_metadata" {
                Some(value.trim().trim_matches('"').to_string())
            } else {
                None
            }
        });
        Self { scheme, resource_metadata }
    }
}

/// Supplies bearer credentials for an authenticated session. Implementors
/// typically cache a token and refresh it against the `resource_metadata`
/// endpoint named in the challenge.
#[async_trait]
pub trait CredentialProvider: Send + Sync {
    /// Produce an `Authorization` header value to retry the failed request
    /// with, given the challenge from the `401`. Returning `None` means
    /// the client gives up and surfaces the original `401`.
    async fn authorization_for(&self, challenge: &AuthChallenge) -> Option<String>;
}

/// A credential provider that always declines, for transports with no
/// authentication configured.
pub struct NoCredentials;

#[async_trait]
impl CredentialProvider for NoCredentials {
    async fn authorization_for(&self, _challenge: &AuthChallenge) -> Option<String> {
        None
    }
}

/// A credential provider backed by one fixed bearer token, for tests and
/// simple deployments.
pub struct StaticBearerToken(pub String);

#[async_trait]
impl CredentialProvider for StaticBearerToken {
    async fn authorization_for(&self, _challenge: &AuthChallenge) -> Option<String> {
        Some(format!("Bearer {}", self.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_scheme_only() {
        let challenge = AuthChallenge::parse("Bearer");
        assert_eq!(challenge.scheme, Some("Bearer".to_string()));
        assert_eq!(challenge.resource_metadata, None);
    }

    #[test]
    fn parses_resource_metadata() {
        let challenge = AuthChallenge::parse(
            r#"Bearer resource_metadata="https://example.com/.well-known/oauth""#,
        );
        assert_eq!(challenge.scheme, Some("Bearer".to_string()));
        assert_eq!(challenge.resource_metadata, Some("https://example.com/.well-known/oauth".to_string()));
    }

    #[tokio::test]
    async fn static_token_always_authorizes() {
        let provider = StaticBearerToken("abc123".to_string());
        let auth = provider.authorization_for(&AuthChallenge::default()).await;
        assert_eq!(auth, Some("Bearer abc123".to_string()));
    }

    #[tokio::test]
    async fn no_credentials_declines() {
        let provider = NoCredentials;
        assert_eq!(provider.authorization_for(&AuthChallenge::default()).await, None);
    }
}
