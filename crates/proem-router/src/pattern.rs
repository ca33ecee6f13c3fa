//! Route pattern compilation.
//!
//! A rule such as `/{module}/{controller?}/{params?}` is turned into an
//! anchored regular expression with one capture group per token. Each token
//! is constrained by a filter: either one of the [`DEFAULT_FILTERS`], a filter
//! picked by the token's name, or a custom fragment supplied with the route.

use indexmap::IndexMap;
use regex::Regex;

use crate::error::{Result, RouterError};
use crate::payload::PARAMS_KEY;
use crate::request::{url_decode, Params};

/// Named filters a custom filter can refer to as `{name}`.
pub const DEFAULT_FILTERS: [(&str, &str); 5] = [
    ("default", r"[a-zA-Z0-9_+\-%]+"),
    ("gobble", r"[a-zA-Z0-9_+\-%/]+"),
    ("int", "[0-9]+"),
    ("alpha", "[a-zA-Z]+"),
    ("slug", "[a-zA-Z0-9_-]+"),
];

/// Looks up one of the [`DEFAULT_FILTERS`] by name.
pub fn default_filter(name: &str) -> Option<&'static str> {
    DEFAULT_FILTERS
        .iter()
        .find(|(n, _)| *n == name)
        .map(|(_, pattern)| *pattern)
}

/// Filter applied to a token that has no custom filter.
fn token_filter(token: &str) -> &'static str {
    let name = match token {
        "params" => "gobble",
        _ => "default",
    };
    default_filter(name).unwrap_or(DEFAULT_FILTERS[0].1)
}

/// A segment of a parsed rule.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Token { name: String, optional: bool },
}

/// A token of a compiled pattern and the capture group holding its value.
#[derive(Debug, Clone)]
struct Token {
    name: String,
    group: String,
    optional: bool,
}

/// A rule compiled into an anchored regular expression.
#[derive(Debug, Clone)]
pub struct CompiledPattern {
    rule: String,
    segments: Vec<Segment>,
    regex: Regex,
    tokens: Vec<Token>,
}

impl CompiledPattern {
    /// Compiles `rule`, resolving token filters against `filters`.
    ///
    /// A custom filter written as `{name}` refers to a default filter and
    /// fails with [`RouterError::UndefinedFilter`] if there is no such
    /// filter; anything else is used as a raw regex fragment.
    ///
    /// # Example
    ///
    /// ```
    /// use indexmap::IndexMap;
    /// use proem_router::CompiledPattern;
    ///
    /// let mut filters = IndexMap::new();
    /// filters.insert("id".to_string(), "{int}".to_string());
    /// let pattern = CompiledPattern::new("/posts/{id}", &filters).unwrap();
    /// assert_eq!(pattern.captures("/posts/42").unwrap().get("id"), Some("42"));
    /// assert!(pattern.captures("/posts/abc").is_none());
    /// ```
    pub fn new(rule: &str, filters: &IndexMap<String, String>) -> Result<Self> {
        let segments = parse(rule);
        let mut tokens = Vec::new();
        let mut source = String::from("^");
        let mut after_optional = false;
        let mut slash_pending = false;

        for (i, segment) in segments.iter().enumerate() {
            match segment {
                Segment::Literal(text) => {
                    let before_optional = matches!(
                        segments.get(i + 1),
                        Some(Segment::Token { optional: true, .. })
                    );
                    slash_pending =
                        push_literal(&mut source, text, after_optional, before_optional, i == 0);
                    after_optional = false;
                }
                Segment::Token { name, optional } => {
                    let filter = resolve_filter(name, filters)?;
                    let group = format!("_t{}", tokens.len());
                    let capture = format!("(?P<{group}>{filter})");
                    if slash_pending {
                        source.push_str(&format!("(?:/{capture}?)?"));
                    } else {
                        source.push_str(&capture);
                        if *optional {
                            source.push('?');
                        }
                    }
                    tokens.push(Token {
                        name: name.clone(),
                        group,
                        optional: *optional,
                    });
                    after_optional = *optional;
                    slash_pending = false;
                }
            }
        }
        source.push('$');

        let regex = Regex::new(&source).map_err(|e| RouterError::InvalidPattern {
            rule: rule.to_string(),
            reason: e.to_string(),
        })?;

        Ok(Self {
            rule: rule.to_string(),
            segments,
            regex,
            tokens,
        })
    }

    /// Matches the whole of `subject` and returns the URL-decoded token
    /// values. Optional tokens that did not participate are left out.
    ///
    /// A `params` value is returned undecoded so that an encoded `%2F` is not
    /// taken for a pair separator; [`Payload::prepare`] decodes it.
    ///
    /// [`Payload::prepare`]: crate::Payload::prepare
    pub fn captures(&self, subject: &str) -> Option<Params> {
        let caps = self.regex.captures(subject)?;
        let mut params = Params::new();

        for token in &self.tokens {
            match caps.name(&token.group) {
                Some(m) if !(token.optional && m.as_str().is_empty()) => {
                    let value = if token.name == PARAMS_KEY {
                        m.as_str().to_string()
                    } else {
                        url_decode(m.as_str())
                    };
                    params.insert(token.name.clone(), value);
                }
                _ => {}
            }
        }

        Some(params)
    }

    /// Returns whether `subject` matches without extracting values.
    pub fn is_match(&self, subject: &str) -> bool {
        self.regex.is_match(subject)
    }

    /// Returns the original rule.
    pub fn rule(&self) -> &str {
        &self.rule
    }

    /// Returns the compiled regular expression source.
    pub fn as_regex_str(&self) -> &str {
        self.regex.as_str()
    }

    /// Returns the token names in the order they appear in the rule.
    pub fn token_names(&self) -> impl Iterator<Item = &str> {
        self.tokens.iter().map(|t| t.name.as_str())
    }

    /// Builds a string the pattern would match from `params`.
    ///
    /// Optional tokens missing from `params` are skipped; a missing required
    /// token is an error.
    pub fn assemble(&self, params: &Params) -> Result<String> {
        let mut out = String::new();
        let mut skipped = false;

        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => {
                    let text = if skipped && out.ends_with('/') {
                        text.strip_prefix('/').unwrap_or(text)
                    } else {
                        text
                    };
                    out.push_str(text);
                    skipped = false;
                }
                Segment::Token { name, optional } => match params.get(name) {
                    Some(value) => {
                        out.push_str(value);
                        skipped = false;
                    }
                    None if *optional => skipped = true,
                    None => {
                        return Err(RouterError::MissingParameter {
                            rule: self.rule.clone(),
                            param: name.clone(),
                        });
                    }
                },
            }
        }

        if skipped && out.len() > 1 && out.ends_with('/') {
            out.pop();
        }
        Ok(out)
    }
}

/// Appends an escaped literal.
///
/// A slash right after an optional token becomes optional so `/{a?}/` still
/// matches `/`. A slash right before an optional token is left out and
/// returns `true`: the caller emits it inside the token's optional group, so
/// the separator is only ever dropped together with the token. A rule's
/// leading `/` stays required.
fn push_literal(
    source: &mut String,
    text: &str,
    after_optional: bool,
    before_optional: bool,
    leading: bool,
) -> bool {
    let (text, absorbed) = match text.strip_suffix('/') {
        Some(body) if before_optional && !(leading && body.is_empty()) => (body, true),
        _ => (text, false),
    };
    let text = match text.strip_prefix('/') {
        Some(rest) if after_optional => {
            source.push_str("/?");
            rest
        }
        _ => text,
    };
    source.push_str(&regex::escape(text));
    absorbed
}

fn resolve_filter<'a>(token: &str, filters: &'a IndexMap<String, String>) -> Result<&'a str> {
    let Some(custom) = filters.get(token) else {
        return Ok(token_filter(token));
    };

    match custom.strip_prefix('{').and_then(|s| s.strip_suffix('}')) {
        Some(name) => default_filter(name).ok_or_else(|| RouterError::UndefinedFilter {
            token: token.to_string(),
            filter: name.to_string(),
        }),
        None => Ok(custom.as_str()),
    }
}

fn is_word(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

/// Splits a rule into literals and tokens.
///
/// Recognizes `{name}`, `{name?}` and the legacy `:name` form. Braces that do
/// not enclose a valid name are kept as literal text.
fn parse(rule: &str) -> Vec<Segment> {
    let mut segments = Vec::new();
    let mut literal = String::new();
    let mut rest = rule;

    let flush = |literal: &mut String, segments: &mut Vec<Segment>| {
        if !literal.is_empty() {
            segments.push(Segment::Literal(std::mem::take(literal)));
        }
    };

    while let Some(c) = rest.chars().next() {
        if c == '{' {
            if let Some(end) = rest.find('}') {
                let inner = &rest[1..end];
                let (name, optional) = match inner.strip_suffix('?') {
                    Some(name) => (name, true),
                    None => (inner, false),
                };
                if !name.is_empty() && name.chars().all(is_word) {
                    flush(&mut literal, &mut segments);
                    segments.push(Segment::Token {
                        name: name.to_string(),
                        optional,
                    });
                    rest = &rest[end + 1..];
                    continue;
                }
            }
        } else if c == ':' {
            let name_len = rest[1..]
                .char_indices()
                .find(|(_, ch)| !is_word(*ch))
                .map_or(rest.len() - 1, |(i, _)| i);
            let name = &rest[1..=name_len];
            if name.starts_with(|ch: char| ch.is_ascii_alphabetic() || ch == '_') {
                flush(&mut literal, &mut segments);
                segments.push(Segment::Token {
                    name: name.to_string(),
                    optional: false,
                });
                rest = &rest[1 + name_len..];
                continue;
            }
        }

        literal.push(c);
        rest = &rest[c.len_utf8()..];
    }
    flush(&mut literal, &mut segments);

    segments
}
