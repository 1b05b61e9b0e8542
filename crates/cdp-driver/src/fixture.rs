//! Scripted in-memory page for browser-free tests.
//!
//! A fixture page is a flat set of nodes, each declaring the selectors,
//! text and attributes it answers to, plus scripted behavior: click effects,
//! navigation effects, nodes that vanish after a number of sightings (used
//! to model an out-of-band approval landing), and eval rules that emulate
//! editor APIs. Script payloads are captured from the first double-quoted
//! JSON literal in the evaluated expression, so emulated write calls must
//! keep their own selectors single-quoted.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;
use inkpost_core_types::{CookieRecord, StorageEntry};
use serde_json::{json, Value};

use crate::driver::{ElementId, PageDriver, Query};
use crate::errors::DriverError;

/// One scripted DOM node.
#[derive(Clone, Debug)]
pub struct FixtureNode {
    pub id: String,
    selectors: Vec<String>,
    text: Option<String>,
    attrs: Vec<(String, String)>,
    visible: bool,
    enabled: bool,
    value: String,
    html: String,
    frame: Option<String>,
}

impl FixtureNode {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            selectors: Vec::new(),
            text: None,
            attrs: Vec::new(),
            visible: true,
            enabled: true,
            value: String::new(),
            html: String::new(),
            frame: None,
        }
    }

    /// CSS selector this node answers to. May be called repeatedly.
    pub fn selector(mut self, selector: impl Into<String>) -> Self {
        self.selectors.push(selector.into());
        self
    }

    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attrs.push((name.into(), value.into()));
        self
    }

    pub fn hidden(mut self) -> Self {
        self.visible = false;
        self
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    pub fn value(mut self, value: impl Into<String>) -> Self {
        self.value = value.into();
        self
    }

    pub fn html(mut self, html: impl Into<String>) -> Self {
        self.html = html.into();
        self
    }

    /// Place the node inside the iframe answering to `selector`.
    pub fn in_frame(mut self, selector: impl Into<String>) -> Self {
        self.frame = Some(selector.into());
        self
    }

    fn matches(&self, query: &Query) -> bool {
        match query {
            Query::Css(selector) => self.selectors.iter().any(|s| s == selector),
            Query::Text(text) => {
                self.text.as_deref().map(str::trim) == Some(text.trim())
                    || (!self.value.is_empty() && self.value == *text)
            }
            Query::AttrContains { name, value } => self
                .attrs
                .iter()
                .any(|(n, v)| n == name && v.contains(value.as_str())),
        }
    }
}

/// A scripted page mutation.
#[derive(Clone, Debug)]
pub enum PageEffect {
    SetUrl(String),
    AddNode(FixtureNode),
    RemoveNode(String),
    SetNodeValue { id: String, value: String },
}

/// What an eval rule yields.
#[derive(Clone, Debug)]
pub enum EvalOutcome {
    Bool(bool),
    Value(Value),
    /// Current value of the named node, as a JSON string.
    NodeValue(String),
}

#[derive(Clone, Debug)]
struct EvalRule {
    contains: String,
    write_to: Option<String>,
    outcome: EvalOutcome,
}

#[derive(Default)]
struct FixtureState {
    url: String,
    nodes: Vec<FixtureNode>,
    frames: HashSet<String>,
    current_frame: Option<String>,
    cookies: Vec<CookieRecord>,
    storage: Vec<StorageEntry>,
    vanish: HashMap<String, u32>,
    click_effects: Vec<(String, Vec<PageEffect>)>,
    nav_effects: Vec<(String, Vec<PageEffect>)>,
    eval_rules: Vec<EvalRule>,
    clicks: Vec<String>,
    visited: Vec<String>,
}

/// In-memory [`PageDriver`] implementation.
pub struct FixturePage {
    state: Mutex<FixtureState>,
}

impl Default for FixturePage {
    fn default() -> Self {
        Self::new()
    }
}

impl FixturePage {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(FixtureState {
                url: "about:blank".into(),
                ..FixtureState::default()
            }),
        }
    }

    pub fn with_url(self, url: impl Into<String>) -> Self {
        self.lock().url = url.into();
        self
    }

    pub fn with_node(self, node: FixtureNode) -> Self {
        self.lock().nodes.push(node);
        self
    }

    /// Register an iframe. Adds a node answering to `selector` so frame
    /// probes can find it.
    pub fn with_frame(self, selector: impl Into<String>) -> Self {
        let selector = selector.into();
        {
            let mut state = self.lock();
            state.frames.insert(selector.clone());
            state
                .nodes
                .push(FixtureNode::new(format!("frame:{selector}")).selector(&selector));
        }
        self
    }

    /// The node stays observable for `sightings` matching queries, then it
    /// is gone.
    pub fn vanish_after(self, node_id: impl Into<String>, sightings: u32) -> Self {
        self.lock().vanish.insert(node_id.into(), sightings);
        self
    }

    pub fn on_click(self, node_id: impl Into<String>, effects: Vec<PageEffect>) -> Self {
        self.lock().click_effects.push((node_id.into(), effects));
        self
    }

    /// Effects applied whenever a navigated URL contains `fragment`.
    pub fn on_navigate(self, fragment: impl Into<String>, effects: Vec<PageEffect>) -> Self {
        self.lock().nav_effects.push((fragment.into(), effects));
        self
    }

    pub fn on_eval(
        self,
        contains: impl Into<String>,
        write_to: Option<&str>,
        outcome: EvalOutcome,
    ) -> Self {
        self.lock().eval_rules.push(EvalRule {
            contains: contains.into(),
            write_to: write_to.map(str::to_string),
            outcome,
        });
        self
    }

    pub fn with_cookies(self, cookies: Vec<CookieRecord>) -> Self {
        self.lock().cookies = cookies;
        self
    }

    // Observation helpers for assertions.

    pub fn clicked(&self) -> Vec<String> {
        self.lock().clicks.clone()
    }

    pub fn visited(&self) -> Vec<String> {
        self.lock().visited.clone()
    }

    pub fn node_value(&self, id: &str) -> Option<String> {
        self.lock()
            .nodes
            .iter()
            .find(|n| n.id == id)
            .map(|n| n.value.clone())
    }

    pub fn node_html(&self, id: &str) -> Option<String> {
        self.lock()
            .nodes
            .iter()
            .find(|n| n.id == id)
            .map(|n| n.html.clone())
    }

    pub fn has_node(&self, id: &str) -> bool {
        self.lock().nodes.iter().any(|n| n.id == id)
    }

    pub fn stored_cookies(&self) -> Vec<CookieRecord> {
        self.lock().cookies.clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, FixtureState> {
        self.state.lock().expect("fixture state poisoned")
    }

    fn resolve(state: &FixtureState, element: &ElementId) -> Result<usize, DriverError> {
        state
            .nodes
            .iter()
            .position(|n| n.id == element.0)
            .ok_or_else(|| DriverError::UnknownElement(element.0.clone()))
    }
}

fn apply_effects(state: &mut FixtureState, effects: &[PageEffect]) {
    for effect in effects {
        match effect {
            PageEffect::SetUrl(url) => state.url = url.clone(),
            PageEffect::AddNode(node) => state.nodes.push(node.clone()),
            PageEffect::RemoveNode(id) => state.nodes.retain(|n| n.id != *id),
            PageEffect::SetNodeValue { id, value } => {
                if let Some(node) = state.nodes.iter_mut().find(|n| n.id == *id) {
                    node.value = value.clone();
                }
            }
        }
    }
}

/// Pull the payload out of an emulated editor call: the first double-quoted
/// literal in the expression, decoded as JSON.
fn extract_payload(js: &str) -> Option<String> {
    let start = js.find('"')?;
    serde_json::Deserializer::from_str(&js[start..])
        .into_iter::<String>()
        .next()?
        .ok()
}

#[async_trait]
impl PageDriver for FixturePage {
    async fn navigate(&self, url: &str) -> Result<(), DriverError> {
        let mut state = self.lock();
        state.visited.push(url.to_string());
        state.url = url.to_string();
        state.current_frame = None;
        let effects: Vec<Vec<PageEffect>> = state
            .nav_effects
            .iter()
            .filter(|(fragment, _)| url.contains(fragment.as_str()))
            .map(|(_, effects)| effects.clone())
            .collect();
        for batch in effects {
            apply_effects(&mut state, &batch);
        }
        Ok(())
    }

    async fn current_url(&self) -> Result<String, DriverError> {
        Ok(self.lock().url.clone())
    }

    async fn query(&self, query: &Query) -> Result<Vec<ElementId>, DriverError> {
        let mut state = self.lock();
        let frame = state.current_frame.clone();
        let mut spent: Vec<String> = Vec::new();
        let mut out = Vec::new();
        for node in &state.nodes {
            if node.frame != frame || !node.matches(query) {
                continue;
            }
            if let Some(remaining) = state.vanish.get(&node.id) {
                if *remaining == 0 {
                    continue;
                }
                spent.push(node.id.clone());
            }
            if node.visible && node.enabled {
                out.push(ElementId(node.id.clone()));
            }
        }
        for id in spent {
            if let Some(remaining) = state.vanish.get_mut(&id) {
                *remaining -= 1;
            }
        }
        Ok(out)
    }

    async fn click(&self, element: &ElementId) -> Result<(), DriverError> {
        let mut state = self.lock();
        Self::resolve(&state, element)?;
        state.clicks.push(element.0.clone());
        let effects: Vec<Vec<PageEffect>> = state
            .click_effects
            .iter()
            .filter(|(id, _)| *id == element.0)
            .map(|(_, effects)| effects.clone())
            .collect();
        for batch in effects {
            apply_effects(&mut state, &batch);
        }
        Ok(())
    }

    async fn type_text(&self, element: &ElementId, text: &str) -> Result<(), DriverError> {
        let mut state = self.lock();
        let idx = Self::resolve(&state, element)?;
        state.nodes[idx].value.push_str(text);
        Ok(())
    }

    async fn read_value(&self, element: &ElementId) -> Result<String, DriverError> {
        let state = self.lock();
        let idx = Self::resolve(&state, element)?;
        Ok(state.nodes[idx].value.clone())
    }

    async fn set_value_with_events(
        &self,
        element: &ElementId,
        value: &str,
    ) -> Result<(), DriverError> {
        let mut state = self.lock();
        let idx = Self::resolve(&state, element)?;
        state.nodes[idx].value = value.to_string();
        Ok(())
    }

    async fn inner_html(&self, element: &ElementId) -> Result<String, DriverError> {
        let state = self.lock();
        let idx = Self::resolve(&state, element)?;
        Ok(state.nodes[idx].html.clone())
    }

    async fn set_inner_html_with_events(
        &self,
        element: &ElementId,
        html: &str,
    ) -> Result<(), DriverError> {
        let mut state = self.lock();
        let idx = Self::resolve(&state, element)?;
        state.nodes[idx].html = html.to_string();
        Ok(())
    }

    async fn text(&self, element: &ElementId) -> Result<String, DriverError> {
        let state = self.lock();
        let idx = Self::resolve(&state, element)?;
        let node = &state.nodes[idx];
        Ok(node.text.clone().unwrap_or_else(|| node.value.clone()))
    }

    async fn eval(&self, js: &str) -> Result<Value, DriverError> {
        let mut state = self.lock();
        let rule = state
            .eval_rules
            .iter()
            .find(|rule| js.contains(rule.contains.as_str()))
            .cloned();
        let Some(rule) = rule else {
            return Ok(Value::Null);
        };
        if let Some(target) = &rule.write_to {
            if let Some(payload) = extract_payload(js) {
                if let Some(node) = state.nodes.iter_mut().find(|n| n.id == *target) {
                    node.value = payload.clone();
                    node.html = payload;
                }
            }
        }
        let value = match rule.outcome {
            EvalOutcome::Bool(flag) => json!(flag),
            EvalOutcome::Value(value) => value,
            EvalOutcome::NodeValue(id) => {
                let current = state
                    .nodes
                    .iter()
                    .find(|n| n.id == id)
                    .map(|n| n.value.clone());
                match current {
                    Some(value) => json!(value),
                    None => Value::Null,
                }
            }
        };
        Ok(value)
    }

    async fn cookies(&self) -> Result<Vec<CookieRecord>, DriverError> {
        Ok(self.lock().cookies.clone())
    }

    async fn set_cookies(&self, cookies: &[CookieRecord]) -> Result<(), DriverError> {
        self.lock().cookies = cookies.to_vec();
        Ok(())
    }

    async fn local_storage(&self) -> Result<Vec<StorageEntry>, DriverError> {
        Ok(self.lock().storage.clone())
    }

    async fn set_local_storage(&self, entries: &[StorageEntry]) -> Result<(), DriverError> {
        self.lock().storage = entries.to_vec();
        Ok(())
    }

    async fn enter_frame(&self, css: &str) -> Result<(), DriverError> {
        let mut state = self.lock();
        if !state.frames.contains(css) {
            return Err(DriverError::FrameNotFound(css.to_string()));
        }
        state.current_frame = Some(css.to_string());
        Ok(())
    }

    async fn exit_frame(&self) -> Result<(), DriverError> {
        self.lock().current_frame = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn queries_filter_hidden_and_frame_scoped_nodes() {
        let page = FixturePage::new()
            .with_node(FixtureNode::new("visible").selector("#a"))
            .with_node(FixtureNode::new("hidden").selector("#a").hidden())
            .with_frame("iframe.editor")
            .with_node(FixtureNode::new("framed").selector("#a").in_frame("iframe.editor"));

        let matches = page.query(&Query::Css("#a".into())).await.unwrap();
        assert_eq!(matches, vec![ElementId("visible".into())]);

        page.enter_frame("iframe.editor").await.unwrap();
        let framed = page.query(&Query::Css("#a".into())).await.unwrap();
        assert_eq!(framed, vec![ElementId("framed".into())]);
        page.exit_frame().await.unwrap();
    }

    #[tokio::test]
    async fn vanish_rule_expires_after_the_configured_sightings() {
        let page = FixturePage::new()
            .with_node(FixtureNode::new("banner").selector(".prompt"))
            .vanish_after("banner", 2);

        let q = Query::Css(".prompt".into());
        assert_eq!(page.query(&q).await.unwrap().len(), 1);
        assert_eq!(page.query(&q).await.unwrap().len(), 1);
        assert_eq!(page.query(&q).await.unwrap().len(), 0);
    }

    #[tokio::test]
    async fn eval_rule_captures_the_written_payload() {
        let page = FixturePage::new()
            .with_node(FixtureNode::new("editor").selector(".CodeMirror"))
            .on_eval("setValue", Some("editor"), EvalOutcome::Bool(true))
            .on_eval("getValue", None, EvalOutcome::NodeValue("editor".into()));

        let write = format!(
            "(() => {{ host.CodeMirror.setValue({}); }})()",
            serde_json::to_string("<p>hello</p>").unwrap()
        );
        assert_eq!(page.eval(&write).await.unwrap(), json!(true));
        assert_eq!(
            page.eval("host.CodeMirror.getValue()").await.unwrap(),
            json!("<p>hello</p>")
        );
    }
}
