// SPDX-License-Identifier: MIT OR Apache-2.0

//! Canonical principal identities.
//!
//! Raw identities arrive as distinguished-name style strings, for example
//! `"CN=Alice, O=Grid, C=US"` or the slash separated `"/C=US/O=Grid/CN=Alice"`. Two raw strings
//! which only differ in attribute order, letter case or surrounding whitespace denote the same
//! principal, so every [`Identity`] is stored in a canonical form and compared on that form only.
use std::fmt::Display;
use std::str::FromStr;

use thiserror::Error;

/// Separator used between attribute components in the canonical form.
const CANONICAL_SEPARATOR: &str = ",";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum IdentityError {
    #[error("identity \"{0}\" contains no attribute components")]
    Empty(String),
}

/// Normalized principal identifier.
///
/// The inner string is always canonical: lower-cased, trimmed, with attribute components sorted
/// and joined by `,`. An `Identity` can only be constructed through [`normalize`], so two values
/// compare equal exactly when their raw forms denote the same principal.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(try_from = "String", into = "String")
)]
pub struct Identity(String);

impl Identity {
    /// Normalize a raw identity string.
    pub fn new(raw: &str) -> Result<Self, IdentityError> {
        normalize(raw)
    }

    /// Identity used for callers which presented no credentials.
    pub fn anonymous() -> Self {
        Self(canonical_pair("cn", "anonymous"))
    }

    /// Canonical string form.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for Identity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for Identity {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl FromStr for Identity {
    type Err = IdentityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        normalize(s)
    }
}

impl TryFrom<&str> for Identity {
    type Error = IdentityError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        normalize(value)
    }
}

impl TryFrom<String> for Identity {
    type Error = IdentityError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        normalize(&value)
    }
}

impl From<Identity> for String {
    fn from(value: Identity) -> Self {
        value.0
    }
}

/// Canonicalize a raw distinguished-name style string.
///
/// Components are separated by `,` (or by `/` when the raw string starts with one). A backslash
/// escapes the character following it, so `\,` in the comma form and a bare `,` inside a value of
/// the slash form denote the same character. Each `key=value` component is split at its first
/// unescaped `=`, lower-cased, trimmed and has inner whitespace runs collapsed. Empty components
/// are dropped and the rest are sorted, so attribute order never matters.
///
/// The canonical form is comma separated and escapes `\` and `,` (plus `=` in keys and a leading
/// `/`), so normalizing a canonical string returns it unchanged.
pub fn normalize(raw: &str) -> Result<Identity, IdentityError> {
    let trimmed = raw.trim();
    let (body, separator) = match trimmed.strip_prefix('/') {
        Some(rest) => (rest, '/'),
        None => (trimmed, ','),
    };

    let mut components: Vec<String> = split_unescaped(body, separator)
        .iter()
        .filter_map(|component| canonical_component(component))
        .collect();

    if components.is_empty() {
        return Err(IdentityError::Empty(raw.to_string()));
    }

    components.sort();
    components.dedup();

    Ok(Identity(components.join(CANONICAL_SEPARATOR)))
}

/// Return `true` if both identities denote the same principal.
///
/// All comparisons between a caller and stored owners, grant actors or group members go through
/// this function.
pub fn same_identity(a: &Identity, b: &Identity) -> bool {
    a.0 == b.0
}

/// Character of a raw component and whether it was escaped.
type RawChar = (char, bool);

fn split_unescaped(input: &str, separator: char) -> Vec<Vec<RawChar>> {
    let mut parts = Vec::new();
    let mut current = Vec::new();
    let mut chars = input.chars();

    while let Some(c) = chars.next() {
        match c {
            '\\' => current.push((chars.next().unwrap_or('\\'), true)),
            c if c == separator => parts.push(std::mem::take(&mut current)),
            c => current.push((c, false)),
        }
    }
    parts.push(current);

    parts
}

fn canonical_component(component: &[RawChar]) -> Option<String> {
    let equals = component
        .iter()
        .position(|&(c, escaped)| c == '=' && !escaped);

    match equals {
        Some(at) => {
            let key = clean(&component[..at]);
            let value = clean(&component[at + 1..]);
            if key.is_empty() && value.is_empty() {
                None
            } else {
                Some(canonical_pair(&key, &value))
            }
        }
        None => {
            let name = clean(component);
            (!name.is_empty()).then(|| escape(&name, true))
        }
    }
}

fn canonical_pair(key: &str, value: &str) -> String {
    format!("{}={}", escape(key, true), escape(value, false))
}

fn clean(chars: &[RawChar]) -> String {
    let text: String = chars.iter().map(|&(c, _)| c).collect();
    collapse_whitespace(&text.to_lowercase())
}

fn collapse_whitespace(input: &str) -> String {
    input.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Escape characters which would otherwise be read as structure when the canonical form is
/// normalized again. Keys start a component, so a leading `/` and any `=` are escaped there.
fn escape(text: &str, is_key: bool) -> String {
    let mut escaped = String::with_capacity(text.len());
    for (i, c) in text.chars().enumerate() {
        let structural = match c {
            '\\' | ',' => true,
            '=' => is_key,
            '/' => is_key && i == 0,
            _ => false,
        };
        if structural {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}
