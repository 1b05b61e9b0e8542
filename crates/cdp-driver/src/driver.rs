//! The page driver port.
//!
//! Higher layers never talk to chromiumoxide directly; they drive the page
//! through this trait. The production implementation is [`crate::CdpPage`],
//! tests use the scripted page in [`crate::fixture`].

use async_trait::async_trait;
use inkpost_core_types::{CookieRecord, StorageEntry};
use serde::{Deserialize, Serialize};

use crate::errors::DriverError;

/// Opaque handle to an element previously returned by [`PageDriver::query`].
///
/// Handles are only valid for the page state they were resolved against; a
/// navigation invalidates them.
#[derive(Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct ElementId(pub String);

impl ElementId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// One way of matching elements on the page.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Query {
    /// CSS selector.
    Css(String),
    /// Exact trimmed text content (or form control value).
    Text(String),
    /// Attribute whose value contains the given fragment.
    AttrContains { name: String, value: String },
}

impl Query {
    pub fn describe(&self) -> String {
        match self {
            Query::Css(selector) => format!("css({selector})"),
            Query::Text(text) => format!("text({text})"),
            Query::AttrContains { name, value } => format!("attr({name}*={value})"),
        }
    }
}

/// Semantic page operations.
///
/// Queries return only visible and enabled elements; hidden or disabled
/// matches are filtered out before the caller sees them. All write
/// operations dispatch the DOM events an editor framework would listen for.
#[async_trait]
pub trait PageDriver: Send + Sync {
    async fn navigate(&self, url: &str) -> Result<(), DriverError>;

    async fn current_url(&self) -> Result<String, DriverError>;

    /// Visible, enabled matches for the query, in document order.
    async fn query(&self, query: &Query) -> Result<Vec<ElementId>, DriverError>;

    async fn click(&self, element: &ElementId) -> Result<(), DriverError>;

    /// Append text to a form control, with input and change events.
    async fn type_text(&self, element: &ElementId, text: &str) -> Result<(), DriverError>;

    /// Current value of a form control.
    async fn read_value(&self, element: &ElementId) -> Result<String, DriverError>;

    /// Replace a form control's value, with input and change events.
    async fn set_value_with_events(
        &self,
        element: &ElementId,
        value: &str,
    ) -> Result<(), DriverError>;

    async fn inner_html(&self, element: &ElementId) -> Result<String, DriverError>;

    /// Replace an element's markup, with an input event for listeners on
    /// content-editable surfaces.
    async fn set_inner_html_with_events(
        &self,
        element: &ElementId,
        html: &str,
    ) -> Result<(), DriverError>;

    /// Visible text content of an element.
    async fn text(&self, element: &ElementId) -> Result<String, DriverError>;

    /// Evaluate a script expression in the current frame context.
    async fn eval(&self, js: &str) -> Result<serde_json::Value, DriverError>;

    async fn cookies(&self) -> Result<Vec<CookieRecord>, DriverError>;

    async fn set_cookies(&self, cookies: &[CookieRecord]) -> Result<(), DriverError>;

    async fn local_storage(&self) -> Result<Vec<StorageEntry>, DriverError>;

    async fn set_local_storage(&self, entries: &[StorageEntry]) -> Result<(), DriverError>;

    /// Scope subsequent queries and scripts to the iframe matching `css`.
    async fn enter_frame(&self, css: &str) -> Result<(), DriverError>;

    /// Restore the top document as the operation scope.
    async fn exit_frame(&self) -> Result<(), DriverError>;
}
