//! Declarative locator specifications.

use cdp_driver::Query;
use serde::{Deserialize, Serialize};

use crate::roles::UiRole;

/// One way of finding a control.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Strategy {
    /// CSS selector, the most specific option.
    Css(String),
    /// Exact trimmed text content. Least specific, most drift-resistant.
    Text(String),
    /// Attribute value containing a fragment.
    AttrContains { name: String, value: String },
}

impl Strategy {
    pub fn name(&self) -> &'static str {
        match self {
            Strategy::Css(_) => "css",
            Strategy::Text(_) => "text",
            Strategy::AttrContains { .. } => "attr",
        }
    }

    pub fn describe(&self) -> String {
        self.to_query().describe()
    }

    pub fn to_query(&self) -> Query {
        match self {
            Strategy::Css(selector) => Query::Css(selector.clone()),
            Strategy::Text(text) => Query::Text(text.clone()),
            Strategy::AttrContains { name, value } => Query::AttrContains {
                name: name.clone(),
                value: value.clone(),
            },
        }
    }
}

/// A strategy with its per-attempt timeout.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocatorCandidate {
    pub strategy: Strategy,
    pub timeout_ms: u64,
}

/// Ordered candidate strategies for one semantic control.
///
/// Immutable once built; when platform markup changes the table is extended
/// with new candidates, existing entries are not rewritten at runtime.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocatorSpec {
    pub role: UiRole,
    pub candidates: Vec<LocatorCandidate>,
}

impl LocatorSpec {
    pub fn new(role: UiRole) -> Self {
        Self {
            role,
            candidates: Vec::new(),
        }
    }

    pub fn css(mut self, selector: impl Into<String>, timeout_ms: u64) -> Self {
        self.candidates.push(LocatorCandidate {
            strategy: Strategy::Css(selector.into()),
            timeout_ms,
        });
        self
    }

    pub fn text(mut self, text: impl Into<String>, timeout_ms: u64) -> Self {
        self.candidates.push(LocatorCandidate {
            strategy: Strategy::Text(text.into()),
            timeout_ms,
        });
        self
    }

    pub fn attr(
        mut self,
        name: impl Into<String>,
        value: impl Into<String>,
        timeout_ms: u64,
    ) -> Self {
        self.candidates.push(LocatorCandidate {
            strategy: Strategy::AttrContains {
                name: name.into(),
                value: value.into(),
            },
            timeout_ms,
        });
        self
    }

    /// Upper bound on the time `locate` can spend on this spec.
    pub fn total_budget_ms(&self) -> u64 {
        self.candidates.iter().map(|c| c.timeout_ms).sum()
    }
}
