//! RFC 6570 Level 1 URI template matching (spec §4.7): `{var}` placeholders
//! expanded server-side to resolve a `resources/read` request to a concrete
//! handler. Parameters are percent-decoded before being handed to callers.

use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq)]
enum Segment {
    Literal(String),
    Var(String),
}

/// A parsed RFC 6570 Level 1 URI template, e.g. `file:///{path}` or
/// `users://{id}/profile`.
#[derive(Debug, Clone)]
pub struct UriTemplateMatcher {
    raw: String,
    segments: Vec<Segment>,
}

impl UriTemplateMatcher {
    /// Parse a template string. Level 1 only supports simple `{name}`
    /// expressions; no operators (`+`, `#`, `.`, `/`, `;`, `?`, `&`) or
    /// modifiers are recognized.
    #[must_use]
    pub fn parse(template: impl Into<String>) -> Self {
        let raw = template.into();
        let mut segments = Vec::new();
        let mut literal = String::new();
        let mut chars = raw.chars().peekable();

        while let Some(c) = chars.next() {
            if c == '{' {
                if !literal.is_empty() {
                    segments.push(Segment::Literal(std::mem::take(&mut literal)));
                }
                let mut var = String::new();
                for v in chars.by_ref() {
                    if v == '}' {
                        break;
                    }
                    var.push(v);
                }
                segments.push(Segment::Var(var));
            } else {
                literal.push(c);
            }
        }
        if !literal.is_empty() {
            segments.push(Segment::Literal(literal));
        }

        Self { raw, segments }
    }

    /// The original template text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Attempt to match a concrete URI against this template, returning the
    /// percent-decoded variable bindings on success.
    #[must_use]
    pub fn match_uri(&self, uri: &str) -> Option<HashMap<String, String>> {
        let mut pos = 0usize;
        let mut captures = HashMap::new();
        let mut segments = self.segments.iter().peekable();

        while let Some(segment) = segments.next() {
            match segment {
                Segment::Literal(lit) => {
                    if !uri[pos..].starts_with(lit.as_str()) {
                        return None;
                    }
                    pos += lit.len();
                }
                Segment::Var(name) => {
                    let end = match segments.peek() {
                        Some(Segment::Literal(next_lit)) => {
                            pos + uri[pos..].find(next_lit.as_str())?
                        }
                        Some(Segment::Var(_)) | None => {
                            match uri[pos..].find('/') {
                                Some(slash) if segments.peek().is_some() => pos + slash,
                                _ => uri.len(),
                            }
                        }
                    };
                    if end <= pos {
                        return None;
                    }
                    captures.insert(name.clone(), percent_decode(&uri[pos..end]));
                    pos = end;
                }
            }
        }

        if pos == uri.len() {
            Some(captures)
        } else {
            None
        }
    }
}

fn percent_decode(input: &str) -> String {
    let bytes = input.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' && i + 2 < bytes.len() {
            if let Ok(hex) = std::str::from_utf8(&bytes[i + 1..i + 3]) {
                if let Ok(value) = u8::from_str_radix(hex, 16) {
                    out.push(value);
                    i += 3;
                    continue;
                }
            }
        }
        out.push(bytes[i]);
        i += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matches_single_variable_template() {
        let tpl = UriTemplateMatcher::parse("file:///{path}");
        let caps = tpl.match_uri("file:///etc/hosts").unwrap();
        assert_eq!(caps.get("path").unwrap(), "etc/hosts");
    }

    #[test]
    fn matches_variable_followed_by_literal() {
        let tpl = UriTemplateMatcher::parse("users://{id}/profile");
        let caps = tpl.match_uri("users://42/profile").unwrap();
        assert_eq!(caps.get("id").unwrap(), "42");
    }

    #[test]
    fn rejects_non_matching_uri() {
        let tpl = UriTemplateMatcher::parse("users://{id}/profile");
        assert!(tpl.match_uri("users://42/settings").is_none());
    }

    #[test]
    fn unescapes_percent_encoded_params() {
        let tpl = UriTemplateMatcher::parse("search://{query}");
        let caps = tpl.match_uri("search://hello%20world").unwrap();
        assert_eq!(caps.get("query").unwrap(), "hello world");
    }

    #[test]
    fn matches_two_variables_separated_by_slash() {
        let tpl = UriTemplateMatcher::parse("repo://{owner}/{name}");
        let caps = tpl.match_uri("repo://acme/widgets").unwrap();
        assert_eq!(caps.get("owner").unwrap(), "acme");
        assert_eq!(caps.get("name").unwrap(), "widgets");
    }
}
