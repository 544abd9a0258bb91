//! Dynamic finder names.
//!
//! A finder token names the kind of lookup and the attributes it filters on:
//!
//! | Token | Kind | Attributes |
//! |---|---|---|
//! | `find` | [`FinderKind::Id`] | none |
//! | `find_by_name` | [`FinderKind::First`] | `name` |
//! | `find_last_by_name_and_value` | [`FinderKind::Last`] | `name`, `value` |
//! | `find_all_by_value` | [`FinderKind::All`] | `value` |
//! | `find_all` | [`FinderKind::All`] | none (matches everything) |

use std::fmt;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use modelbase_core::ModelDefinition;

/// Which records a finder returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FinderKind {
    /// Identity lookup through `find`.
    Id,
    /// First match scanning forward.
    First,
    /// First match scanning backward.
    Last,
    /// Every match in candidate order.
    All,
}

impl FinderKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            FinderKind::Id => "id",
            FinderKind::First => "first",
            FinderKind::Last => "last",
            FinderKind::All => "all",
        }
    }
}

impl fmt::Display for FinderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A parsed finder: its kind plus the attribute names in argument order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinderRequest {
    pub kind: FinderKind,
    pub attributes: Vec<String>,
}

impl FinderRequest {
    pub fn new(kind: FinderKind, attributes: Vec<String>) -> Self {
        Self { kind, attributes }
    }

    pub fn first<S: Into<String>>(attributes: impl IntoIterator<Item = S>) -> Self {
        Self::new(FinderKind::First, attributes.into_iter().map(Into::into).collect())
    }

    pub fn last<S: Into<String>>(attributes: impl IntoIterator<Item = S>) -> Self {
        Self::new(FinderKind::Last, attributes.into_iter().map(Into::into).collect())
    }

    pub fn all<S: Into<String>>(attributes: impl IntoIterator<Item = S>) -> Self {
        Self::new(FinderKind::All, attributes.into_iter().map(Into::into).collect())
    }

    /// The finder token this request would parse from.
    pub fn token(&self) -> String {
        let mut token = String::from("find");
        match self.kind {
            FinderKind::Id | FinderKind::First => {}
            FinderKind::Last => token.push_str("_last"),
            FinderKind::All => token.push_str("_all"),
        }
        if !self.attributes.is_empty() {
            token.push_str("_by_");
            token.push_str(&self.attributes.join("_and_"));
        }
        token
    }
}

fn finder_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| {
            match Regex::new(r"^find(?:_(all|last))?(?:_by_([a-z_][a-z0-9_]*))?$") {
                Ok(re) => Some(re),
                Err(e) => {
                    tracing::error!(error = %e, "Invalid finder pattern");
                    None
                }
            }
        })
        .as_ref()
}

/// Split a finder token without checking attributes against a model.
pub fn parse_token(token: &str) -> Option<FinderRequest> {
    let captures = finder_pattern()?.captures(token)?;
    let attributes: Vec<String> = captures
        .get(2)
        .map(|m| m.as_str().split("_and_").map(str::to_string).collect())
        .unwrap_or_default();

    let kind = match captures.get(1).map(|m| m.as_str()) {
        Some("all") => FinderKind::All,
        Some(_) => FinderKind::Last,
        None if attributes.is_empty() => FinderKind::Id,
        None => FinderKind::First,
    };

    if attributes.iter().any(String::is_empty) {
        return None;
    }
    Some(FinderRequest::new(kind, attributes))
}

/// Parse a finder token for `definition`.
///
/// Returns `None` when the token does not follow the finder grammar or names
/// an attribute the model does not declare.
pub fn parse(token: &str, definition: &ModelDefinition) -> Option<FinderRequest> {
    let request = parse_token(token)?;
    if request.attributes.iter().all(|a| definition.has_attribute(a)) {
        Some(request)
    } else {
        tracing::trace!(
            model = definition.name(),
            token,
            "Finder names an undeclared attribute"
        );
        None
    }
}
