//! # Visibility Evaluator
//!
//! Every vertex, edge, property, metadata entry and hidden marker carries a
//! [`Visibility`]: a boolean expression over label tokens such as `a`,
//! `a&b`, or `(a|b)&c`. A reader presents [`Authorizations`], the set of
//! tokens they hold; the expression is evaluated with each token true iff
//! present in that set.
//!
//! Expressions are parsed once when the `Visibility` is built. Evaluation is
//! a tree walk with no allocation.

mod parser;

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use hashbrown::HashSet;
use serde::{Deserialize, Serialize};

use crate::Result;
use parser::VisibilityNode;

// ============================================================================
// Visibility
// ============================================================================

/// An immutable, pre-parsed visibility expression.
///
/// Equality, ordering and hashing use the expression text, so `a&b` and
/// `b&a` are distinct visibilities even though they accept the same readers.
#[derive(Clone, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Visibility {
    expression: Arc<str>,
    root: Option<Arc<VisibilityNode>>,
}

impl Visibility {
    /// Parse an expression. Malformed input fails with [`crate::Error::ParseError`].
    pub fn new(expression: impl AsRef<str>) -> Result<Self> {
        let expression = expression.as_ref();
        let root = parser::parse(expression)?;
        Ok(Self {
            expression: Arc::from(expression.trim()),
            root: root.map(Arc::new),
        })
    }

    /// The empty expression, readable by everyone.
    pub fn empty() -> Self {
        Self { expression: Arc::from(""), root: None }
    }

    pub fn is_empty(&self) -> bool {
        self.root.is_none()
    }

    pub fn expression(&self) -> &str {
        &self.expression
    }

    /// True iff `authorizations` satisfies this expression.
    pub fn can_read(&self, authorizations: &Authorizations) -> bool {
        match &self.root {
            None => true,
            Some(root) => root.evaluate(&|token| authorizations.contains(token)),
        }
    }
}

impl Default for Visibility {
    fn default() -> Self {
        Self::empty()
    }
}

impl PartialEq for Visibility {
    fn eq(&self, other: &Self) -> bool {
        self.expression == other.expression
    }
}

impl Eq for Visibility {}

impl Hash for Visibility {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.expression.hash(state);
    }
}

impl PartialOrd for Visibility {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Visibility {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.expression.cmp(&other.expression)
    }
}

impl TryFrom<String> for Visibility {
    type Error = crate::Error;
    fn try_from(s: String) -> Result<Self> {
        Visibility::new(s)
    }
}

impl TryFrom<&str> for Visibility {
    type Error = crate::Error;
    fn try_from(s: &str) -> Result<Self> {
        Visibility::new(s)
    }
}

impl From<Visibility> for String {
    fn from(v: Visibility) -> Self {
        v.expression.to_string()
    }
}

impl fmt::Display for Visibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.expression)
    }
}

impl fmt::Debug for Visibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Visibility({:?})", &*self.expression)
    }
}

// ============================================================================
// Authorizations
// ============================================================================

/// The set of label tokens a caller holds. Always passed explicitly.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Authorizations {
    tokens: HashSet<String>,
}

impl Authorizations {
    pub fn new<I, S>(tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self { tokens: tokens.into_iter().map(Into::into).collect() }
    }

    /// No tokens: can read only empty visibilities.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn contains(&self, token: &str) -> bool {
        self.tokens.contains(token)
    }

    pub fn can_read(&self, visibility: &Visibility) -> bool {
        visibility.can_read(self)
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.tokens.iter().map(String::as_str)
    }
}

impl fmt::Display for Authorizations {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut tokens: Vec<&str> = self.iter().collect();
        tokens.sort_unstable();
        write!(f, "[{}]", tokens.join(","))
    }
}

/// Pure, total check of `visibility` against `authorizations`.
pub fn can_read(visibility: &Visibility, authorizations: &Authorizations) -> bool {
    visibility.can_read(authorizations)
}
