//! The four injection strategies.
//!
//! The scripts here are the one place in the engine that reaches into
//! editor internals. Payloads are passed as double-quoted JSON literals;
//! the scripts keep their own selectors single-quoted so the payload stays
//! the only double-quoted literal in the expression.

use std::sync::Arc;

use async_trait::async_trait;
use cdp_driver::{DriverError, PageDriver};
use locator_cascade::{probe_unique, spec_for, UiRole};
use serde_json::json;

use crate::model::StrategyKind;

/// One technique for writing the body into a composer surface.
///
/// `attempt` returns the observed surface content after the write, or
/// `None` when the surface this strategy targets is absent from the page.
#[async_trait]
pub trait InjectStrategy: Send + Sync {
    fn kind(&self) -> StrategyKind;

    async fn attempt(
        &self,
        page: &Arc<dyn PageDriver>,
        body: &str,
    ) -> Result<Option<String>, DriverError>;
}

/// The cascade, in fixed priority order.
pub fn default_strategies() -> Vec<Box<dyn InjectStrategy>> {
    vec![
        Box::new(PlainSurface),
        Box::new(CodeEditorApi),
        Box::new(ContentEditable),
        Box::new(HostEditorApi),
    ]
}

/// Strategy 1: write a plain editable text surface and dispatch the
/// input/change events any listening editor framework observes.
pub struct PlainSurface;

#[async_trait]
impl InjectStrategy for PlainSurface {
    fn kind(&self) -> StrategyKind {
        StrategyKind::PlainSurface
    }

    async fn attempt(
        &self,
        page: &Arc<dyn PageDriver>,
        body: &str,
    ) -> Result<Option<String>, DriverError> {
        let Some(surface) = probe_unique(&spec_for(UiRole::PlainComposer), page).await? else {
            return Ok(None);
        };
        page.set_value_with_events(&surface, body).await?;
        Ok(Some(page.read_value(&surface).await?))
    }
}

/// Strategy 2: call the value-setting entry point of a structured
/// code-editor widget directly.
pub struct CodeEditorApi;

const CODE_EDITOR_PROBE: &str = "(() => { const host = document.querySelector('.CodeMirror'); \
     return !!(host && host.CodeMirror); })()";

const CODE_EDITOR_READ: &str = "(() => { const host = document.querySelector('.CodeMirror'); \
     return host && host.CodeMirror ? host.CodeMirror.getValue() : null; })()";

fn code_editor_write(body: &str) -> String {
    format!(
        "(() => {{ const host = document.querySelector('.CodeMirror'); \
           if (!host || !host.CodeMirror) return false; \
           host.CodeMirror.setValue({payload}); return true; }})()",
        payload = payload_literal(body)
    )
}

#[async_trait]
impl InjectStrategy for CodeEditorApi {
    fn kind(&self) -> StrategyKind {
        StrategyKind::CodeEditorApi
    }

    async fn attempt(
        &self,
        page: &Arc<dyn PageDriver>,
        body: &str,
    ) -> Result<Option<String>, DriverError> {
        if probe_unique(&spec_for(UiRole::CodeEditorHost), page)
            .await?
            .is_none()
        {
            return Ok(None);
        }
        if page.eval(CODE_EDITOR_PROBE).await? != json!(true) {
            return Ok(None);
        }
        if page.eval(&code_editor_write(body)).await? != json!(true) {
            return Ok(Some(String::new()));
        }
        let read = page.eval(CODE_EDITOR_READ).await?;
        Ok(Some(read.as_str().unwrap_or_default().to_string()))
    }
}

/// Strategy 3: set the markup of a content-editable region and dispatch an
/// input event.
pub struct ContentEditable;

#[async_trait]
impl InjectStrategy for ContentEditable {
    fn kind(&self) -> StrategyKind {
        StrategyKind::ContentEditable
    }

    async fn attempt(
        &self,
        page: &Arc<dyn PageDriver>,
        body: &str,
    ) -> Result<Option<String>, DriverError> {
        let Some(surface) = probe_unique(&spec_for(UiRole::RichComposer), page).await? else {
            return Ok(None);
        };
        page.set_inner_html_with_events(&surface, body).await?;
        Ok(Some(page.inner_html(&surface).await?))
    }
}

/// Strategy 4, last resort: an editor API object the host page exposes.
pub struct HostEditorApi;

const HOST_API_PROBE: &str = "(() => { const api = window.postEditor || window.__editorHost; \
     return !!(api && typeof api.setContent === 'function'); })()";

const HOST_API_READ: &str = "(() => { const api = window.postEditor || window.__editorHost; \
     return api && api.getContent ? api.getContent() : null; })()";

fn host_api_write(body: &str) -> String {
    format!(
        "(() => {{ const api = window.postEditor || window.__editorHost; \
           if (!api) return false; api.setContent({payload}); return true; }})()",
        payload = payload_literal(body)
    )
}

#[async_trait]
impl InjectStrategy for HostEditorApi {
    fn kind(&self) -> StrategyKind {
        StrategyKind::HostEditorApi
    }

    async fn attempt(
        &self,
        page: &Arc<dyn PageDriver>,
        body: &str,
    ) -> Result<Option<String>, DriverError> {
        if page.eval(HOST_API_PROBE).await? != json!(true) {
            return Ok(None);
        }
        if page.eval(&host_api_write(body)).await? != json!(true) {
            return Ok(Some(String::new()));
        }
        let read = page.eval(HOST_API_READ).await?;
        Ok(Some(read.as_str().unwrap_or_default().to_string()))
    }
}

fn payload_literal(body: &str) -> String {
    serde_json::to_string(body).unwrap_or_else(|_| "\"\"".into())
}
