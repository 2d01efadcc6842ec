//! Single-pass URL template resolver with caching
//!
//! Templates carry two placeholder grammars:
//!
//! - required `{name}` (legacy alias `{$name}` accepted identically) —
//!   unresolvable values fail the whole resolution closed, no partially
//!   substituted URL ever escapes;
//! - optional `{/name}` — unresolvable values are elided together with one
//!   immediately preceding path separator when present.
//!
//! Templates are tokenized once and cached; resolution walks tokens
//! against the injected [`DataSource`] layer chain.

use crate::error::VolleyError;
use crate::source::{lookup, DataSource};
use dashmap::DashMap;
use once_cell::sync::Lazy;
use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use std::borrow::Cow;
use std::ops::Range;
use std::sync::Arc;

/// RFC 3986 unreserved characters stay bare, everything else is escaped
const COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// Token representing a parsed template fragment
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    /// Literal text (stores range in original string)
    Literal(Range<usize>),
    /// Required placeholder: {name} or legacy {$name}
    Required(String),
    /// Optional placeholder: {/name}
    Optional(String),
}

/// Template resolver with tokenization caching
pub struct TemplateResolver {
    /// Cache of parsed templates
    cache: DashMap<String, Arc<Vec<Token>>>,
}

impl Default for TemplateResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl TemplateResolver {
    /// Create a new template resolver
    pub fn new() -> Self {
        Self {
            cache: DashMap::new(),
        }
    }

    /// Parse a template into tokens (with caching)
    pub fn tokenize(&self, template: &str) -> Arc<Vec<Token>> {
        if let Some(cached) = self.cache.get(template) {
            return Arc::clone(&cached);
        }

        let mut tokens = Vec::new();
        let mut current_literal_start = 0;
        let mut i = 0;
        let bytes = template.as_bytes();

        while i < bytes.len() {
            if bytes[i] == b'{' {
                if let Some((token, end)) = parse_placeholder(template, i) {
                    if i > current_literal_start {
                        tokens.push(Token::Literal(current_literal_start..i));
                    }
                    tokens.push(token);
                    current_literal_start = end;
                    i = end;
                    continue;
                }
            }
            i += 1;
        }

        if current_literal_start < template.len() {
            tokens.push(Token::Literal(current_literal_start..template.len()));
        }

        let tokens = Arc::new(tokens);
        self.cache.insert(template.to_string(), tokens.clone());
        tokens
    }

    /// Resolve a template against the ordered data source layers
    ///
    /// An empty template is a caller error, signaled distinctly from a
    /// missing-parameter failure.
    pub fn resolve(
        &self,
        template: &str,
        layers: &[&dyn DataSource],
    ) -> Result<String, VolleyError> {
        if template.is_empty() {
            return Err(VolleyError::NoUrl);
        }

        let tokens = self.tokenize(template);
        let mut result = String::with_capacity(template.len() * 2);

        for token in tokens.iter() {
            match token {
                Token::Literal(range) => {
                    result.push_str(&template[range.clone()]);
                }
                Token::Required(name) => match lookup(layers, name) {
                    Some(value) => result.push_str(&encode_component(&value)),
                    None => {
                        return Err(VolleyError::MissingParameter { name: name.clone() });
                    }
                },
                Token::Optional(name) => match lookup(layers, name) {
                    Some(value) => result.push_str(&encode_component(&value)),
                    None => {
                        // Elide the adjacent separator along with the slot
                        if result.ends_with('/') {
                            result.pop();
                        }
                    }
                },
            }
        }

        Ok(result)
    }
}

/// Try to parse a placeholder starting at the `{` at byte offset `start`.
/// Returns the token and the offset just past the closing brace, or None
/// when the braces do not form a recognized placeholder (left as literal).
fn parse_placeholder(template: &str, start: usize) -> Option<(Token, usize)> {
    let rest = &template[start + 1..];
    let close = rest.find('}')?;
    let content = &rest[..close];
    let end = start + 1 + close + 1;

    let (kind, name): (fn(String) -> Token, &str) = if let Some(name) = content.strip_prefix('/') {
        (Token::Optional, name)
    } else if let Some(name) = content.strip_prefix('$') {
        // Legacy alias, treated identically to {name}
        (Token::Required, name)
    } else {
        (Token::Required, content)
    };

    if name.is_empty() || !name.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'_') {
        return None;
    }

    Some((kind(name.to_string()), end))
}

/// Percent-encode a placeholder value unless it already carries escapes.
///
/// If decoding changes the value it was already encoded by the caller and
/// passes through untouched, so values are never double-encoded.
fn encode_component(value: &str) -> Cow<'_, str> {
    match percent_decode_str(value).decode_utf8() {
        Ok(decoded) if decoded != value => Cow::Borrowed(value),
        _ => Cow::Owned(utf8_percent_encode(value, COMPONENT).to_string()),
    }
}

/// Shared resolver instance (token cache survives across engines)
pub static TEMPLATE_RESOLVER: Lazy<TemplateResolver> = Lazy::new(TemplateResolver::new);

/// Convenience function for resolving a template
pub fn resolve_template(template: &str, layers: &[&dyn DataSource]) -> Result<String, VolleyError> {
    TEMPLATE_RESOLVER.resolve(template, layers)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::MapSource;

    fn resolve(template: &str, source: &MapSource) -> Result<String, VolleyError> {
        let resolver = TemplateResolver::new();
        resolver.resolve(template, &[source])
    }

    #[test]
    fn tokenize_plain_literal() {
        let resolver = TemplateResolver::new();
        let tokens = resolver.tokenize("/users/all");
        assert_eq!(tokens.as_ref(), &[Token::Literal(0..10)]);
    }

    #[test]
    fn tokenize_required_and_optional() {
        let resolver = TemplateResolver::new();
        let tokens = resolver.tokenize("/users/{id}/posts/{/page}");
        assert_eq!(
            tokens.as_ref(),
            &[
                Token::Literal(0..7),
                Token::Required("id".into()),
                Token::Literal(11..18),
                Token::Optional("page".into()),
            ]
        );
    }

    #[test]
    fn legacy_dollar_alias_is_required() {
        let resolver = TemplateResolver::new();
        let tokens = resolver.tokenize("/users/{$id}");
        assert_eq!(tokens[1], Token::Required("id".into()));
    }

    #[test]
    fn malformed_braces_stay_literal() {
        let resolver = TemplateResolver::new();
        let tokens = resolver.tokenize("/odd/{not closed/{}/{a b}");
        assert!(tokens
            .iter()
            .all(|t| matches!(t, Token::Literal(_))));
    }

    #[test]
    fn cache_reuse() {
        let resolver = TemplateResolver::new();
        let a = resolver.tokenize("/users/{id}");
        let b = resolver.tokenize("/users/{id}");
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn resolves_against_layers_in_order() {
        let call = MapSource::new().with("id", "7");
        let ambient = MapSource::new().with("id", "9").with("page", "3");
        let resolver = TemplateResolver::new();
        let url = resolver
            .resolve("/users/{id}/p/{page}", &[&call, &ambient])
            .unwrap();
        assert_eq!(url, "/users/7/p/3");
    }

    #[test]
    fn missing_required_fails_closed() {
        let source = MapSource::new();
        let err = resolve("/users/{id}", &source).unwrap_err();
        assert!(matches!(err, VolleyError::MissingParameter { name } if name == "id"));
    }

    #[test]
    fn optional_absent_elides_preceding_separator() {
        let source = MapSource::new();
        assert_eq!(resolve("/search/{/query}", &source).unwrap(), "/search");
    }

    #[test]
    fn optional_absent_without_separator_just_disappears() {
        let source = MapSource::new();
        assert_eq!(resolve("search{/query}", &source).unwrap(), "search");
    }

    #[test]
    fn optional_present_substitutes() {
        let source = MapSource::new().with("query", "rust");
        assert_eq!(
            resolve("/search/{/query}", &source).unwrap(),
            "/search/rust"
        );
    }

    #[test]
    fn no_placeholders_returns_unchanged() {
        let source = MapSource::new();
        assert_eq!(resolve("/static/path", &source).unwrap(), "/static/path");
    }

    #[test]
    fn empty_template_is_a_distinct_error() {
        let source = MapSource::new();
        assert!(matches!(resolve("", &source), Err(VolleyError::NoUrl)));
    }

    #[test]
    fn values_are_percent_encoded() {
        let source = MapSource::new().with("q", "two words");
        assert_eq!(
            resolve("/search/{q}", &source).unwrap(),
            "/search/two%20words"
        );
    }

    #[test]
    fn pre_encoded_values_are_not_double_encoded() {
        let source = MapSource::new().with("q", "two%20words");
        assert_eq!(
            resolve("/search/{q}", &source).unwrap(),
            "/search/two%20words"
        );
    }
}
