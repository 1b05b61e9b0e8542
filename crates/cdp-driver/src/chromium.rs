//! Chromium-backed implementation of the page driver.
//!
//! All element interaction is routed through evaluated scripts. Matched
//! elements are tagged with a `data-inkpost-id` attribute and later resolved
//! by that tag, which keeps handles stable across strategy-level retries.
//! Frame scoping rewrites the document expression the scripts close over
//! instead of re-attaching CDP sessions; the composer frames this engine
//! deals with are same-origin.

use std::sync::Arc;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::network::CookieParam;
use chromiumoxide::Page;
use futures::StreamExt;
use inkpost_core_types::{CookieRecord, StorageEntry};
use serde_json::{json, Value};
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::config::DriverConfig;
use crate::driver::{ElementId, PageDriver, Query};
use crate::errors::DriverError;

/// Owner of one browser process and its single automation page.
///
/// The CDP event loop runs on a background task for the lifetime of the
/// session. `close` shuts the browser down explicitly; dropping the session
/// aborts the event loop and lets chromiumoxide kill the child process, so
/// no exit path leaks a browser.
pub struct BrowserSession {
    browser: Browser,
    handler_task: JoinHandle<()>,
    page: Arc<CdpPage>,
}

impl BrowserSession {
    pub async fn launch(config: &DriverConfig) -> Result<Self, DriverError> {
        let mut builder = BrowserConfig::builder()
            .window_size(config.window_width, config.window_height);
        if !config.headless {
            builder = builder.with_head();
        }
        if let Some(executable) = &config.executable {
            builder = builder.chrome_executable(executable);
        }
        if let Some(dir) = &config.user_data_dir {
            builder = builder.user_data_dir(dir);
        }
        let browser_config = builder.build().map_err(DriverError::Launch)?;

        let launch = timeout(
            Duration::from_millis(config.launch_timeout_ms),
            Browser::launch(browser_config),
        )
        .await
        .map_err(|_| DriverError::Launch("browser did not start within launch timeout".into()))?;
        let (browser, mut handler) = launch.map_err(|error| DriverError::Launch(error.to_string()))?;

        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(error) = event {
                    debug!(%error, "cdp event loop ended");
                    break;
                }
            }
        });

        let page = browser
            .new_page("about:blank")
            .await
            .map_err(|error| DriverError::Launch(error.to_string()))?;

        Ok(Self {
            browser,
            handler_task,
            page: Arc::new(CdpPage::new(page)),
        })
    }

    pub fn page(&self) -> Arc<dyn PageDriver> {
        self.page.clone()
    }

    pub async fn close(mut self) -> Result<(), DriverError> {
        if let Err(error) = self.browser.close().await {
            warn!(%error, "browser close reported an error");
        }
        self.handler_task.abort();
        Ok(())
    }
}

impl Drop for BrowserSession {
    fn drop(&mut self) {
        // chromiumoxide kills the child process when Browser drops.
        self.handler_task.abort();
    }
}

/// Page driver over a live CDP page.
pub struct CdpPage {
    page: Page,
    frame: Mutex<Option<String>>,
}

impl CdpPage {
    pub fn new(page: Page) -> Self {
        Self {
            page,
            frame: Mutex::new(None),
        }
    }

    fn current_frame(&self) -> Option<String> {
        self.frame.lock().ok().and_then(|guard| guard.clone())
    }

    /// Wrap a script expression so `document` and `window` resolve to the
    /// scoped frame when one is active.
    fn scoped(&self, js: &str) -> String {
        match self.current_frame() {
            None => js.to_string(),
            Some(selector) => format!(
                "(() => {{ const __f = document.querySelector({sel}); \
                 if (!__f || !__f.contentDocument) return null; \
                 return (function(document, window) {{ return ({js}); }})(__f.contentDocument, __f.contentWindow); }})()",
                sel = js_str(&selector),
            ),
        }
    }

    async fn eval_raw(&self, js: &str) -> Result<Value, DriverError> {
        let result = self
            .page
            .evaluate(js)
            .await
            .map_err(|error| DriverError::Eval(error.to_string()))?;
        Ok(result.value().cloned().unwrap_or(Value::Null))
    }

    async fn eval_scoped(&self, js: &str) -> Result<Value, DriverError> {
        self.eval_raw(&self.scoped(js)).await
    }

    /// Run an element-targeted script. The script body sees `el` bound to
    /// the resolved element and must yield an expression value.
    async fn eval_on_element(
        &self,
        element: &ElementId,
        body: &str,
    ) -> Result<Value, DriverError> {
        let js = format!(
            "(() => {{ const el = document.querySelector('[data-inkpost-id=\\'' + {id} + '\\']'); \
             if (!el) return {missing}; return ({body}); }})()",
            id = js_str(element.as_str()),
            missing = MISSING_MARKER,
        );
        let value = self.eval_scoped(&js).await?;
        if value == json!(MISSING_MARKER_VALUE) {
            return Err(DriverError::UnknownElement(element.as_str().to_string()));
        }
        Ok(value)
    }
}

const MISSING_MARKER: &str = "'__inkpost_missing__'";
const MISSING_MARKER_VALUE: &str = "__inkpost_missing__";

fn js_str(s: &str) -> String {
    // serde_json string literals are valid JS string literals.
    serde_json::to_string(s).unwrap_or_else(|_| "\"\"".into())
}

fn collector_js(query: &Query) -> String {
    match query {
        Query::Css(selector) => {
            format!("Array.from(document.querySelectorAll({}))", js_str(selector))
        }
        Query::AttrContains { name, value } => {
            let selector = format!("[{}*={}]", name, js_str(value));
            format!(
                "Array.from(document.querySelectorAll({}))",
                js_str(&selector)
            )
        }
        Query::Text(text) => format!(
            "Array.from(document.querySelectorAll('a,button,input,label,span,div,p,strong,em'))\
             .filter((el) => (el.textContent || '').trim() === {t} || el.value === {t})",
            t = js_str(text)
        ),
    }
}

#[async_trait]
impl PageDriver for CdpPage {
    async fn navigate(&self, url: &str) -> Result<(), DriverError> {
        debug!(url, "navigating");
        if let Ok(mut guard) = self.frame.lock() {
            *guard = None;
        }
        self.page
            .goto(url)
            .await
            .map_err(|error| DriverError::Navigation(error.to_string()))?;
        if let Err(error) = self.page.wait_for_navigation().await {
            debug!(%error, "navigation wait ended early");
        }
        Ok(())
    }

    async fn current_url(&self) -> Result<String, DriverError> {
        let url = self
            .page
            .url()
            .await
            .map_err(|error| DriverError::Transport(error.to_string()))?;
        Ok(url.unwrap_or_else(|| "about:blank".into()))
    }

    async fn query(&self, query: &Query) -> Result<Vec<ElementId>, DriverError> {
        let batch = Uuid::new_v4().simple().to_string();
        let js = format!(
            "(() => {{ \
               const found = {collector}; \
               const out = []; \
               for (const el of found) {{ \
                 const win = (el.ownerDocument && el.ownerDocument.defaultView) || window; \
                 const style = win.getComputedStyle(el); \
                 const visible = style.display !== 'none' && style.visibility !== 'hidden' \
                   && el.getClientRects().length > 0; \
                 const enabled = !el.disabled && !el.hasAttribute('disabled'); \
                 if (!visible || !enabled) continue; \
                 let id = el.getAttribute('data-inkpost-id'); \
                 if (!id) {{ id = {batch} + '-' + out.length; el.setAttribute('data-inkpost-id', id); }} \
                 out.push(id); \
               }} \
               return out; \
             }})()",
            collector = collector_js(query),
            batch = js_str(&batch),
        );
        let value = self.eval_scoped(&js).await?;
        let ids: Vec<String> = serde_json::from_value(value).unwrap_or_default();
        Ok(ids.into_iter().map(ElementId).collect())
    }

    async fn click(&self, element: &ElementId) -> Result<(), DriverError> {
        self.eval_on_element(element, "(el.click(), true)").await?;
        Ok(())
    }

    async fn type_text(&self, element: &ElementId, text: &str) -> Result<(), DriverError> {
        let body = format!(
            "(() => {{ el.focus(); \
               if ('value' in el) {{ el.value = (el.value || '') + {text}; }} \
               else {{ el.textContent = (el.textContent || '') + {text}; }} \
               el.dispatchEvent(new Event('input', {{ bubbles: true }})); \
               el.dispatchEvent(new Event('change', {{ bubbles: true }})); \
               return true; }})()",
            text = js_str(text)
        );
        self.eval_on_element(element, &body).await?;
        Ok(())
    }

    async fn read_value(&self, element: &ElementId) -> Result<String, DriverError> {
        let value = self
            .eval_on_element(element, "('value' in el ? (el.value || '') : (el.textContent || ''))")
            .await?;
        Ok(value.as_str().unwrap_or_default().to_string())
    }

    async fn set_value_with_events(
        &self,
        element: &ElementId,
        value: &str,
    ) -> Result<(), DriverError> {
        let body = format!(
            "(() => {{ el.focus(); el.value = {value}; \
               el.dispatchEvent(new Event('input', {{ bubbles: true }})); \
               el.dispatchEvent(new Event('change', {{ bubbles: true }})); \
               return true; }})()",
            value = js_str(value)
        );
        self.eval_on_element(element, &body).await?;
        Ok(())
    }

    async fn inner_html(&self, element: &ElementId) -> Result<String, DriverError> {
        let value = self.eval_on_element(element, "el.innerHTML || ''").await?;
        Ok(value.as_str().unwrap_or_default().to_string())
    }

    async fn set_inner_html_with_events(
        &self,
        element: &ElementId,
        html: &str,
    ) -> Result<(), DriverError> {
        let body = format!(
            "(() => {{ el.innerHTML = {html}; \
               el.dispatchEvent(new Event('input', {{ bubbles: true }})); \
               return true; }})()",
            html = js_str(html)
        );
        self.eval_on_element(element, &body).await?;
        Ok(())
    }

    async fn text(&self, element: &ElementId) -> Result<String, DriverError> {
        let value = self
            .eval_on_element(element, "(el.textContent || '').trim()")
            .await?;
        Ok(value.as_str().unwrap_or_default().to_string())
    }

    async fn eval(&self, js: &str) -> Result<Value, DriverError> {
        self.eval_scoped(js).await
    }

    async fn cookies(&self) -> Result<Vec<CookieRecord>, DriverError> {
        let cookies = self
            .page
            .get_cookies()
            .await
            .map_err(|error| DriverError::Transport(error.to_string()))?;
        let mut records = Vec::with_capacity(cookies.len());
        for cookie in cookies {
            // Round-trip through the wire form rather than the generated
            // protocol newtypes.
            let raw = serde_json::to_value(&cookie)
                .map_err(|error| DriverError::Transport(error.to_string()))?;
            let session = raw["session"].as_bool().unwrap_or(false);
            records.push(CookieRecord {
                name: raw["name"].as_str().unwrap_or_default().to_string(),
                value: raw["value"].as_str().unwrap_or_default().to_string(),
                domain: raw["domain"].as_str().unwrap_or_default().to_string(),
                path: raw["path"].as_str().unwrap_or("/").to_string(),
                secure: raw["secure"].as_bool().unwrap_or(false),
                http_only: raw["httpOnly"].as_bool().unwrap_or(false),
                expiry: if session { None } else { raw["expires"].as_f64() },
            });
        }
        Ok(records)
    }

    async fn set_cookies(&self, cookies: &[CookieRecord]) -> Result<(), DriverError> {
        let mut params = Vec::with_capacity(cookies.len());
        for record in cookies {
            let mut raw = json!({
                "name": record.name,
                "value": record.value,
                "domain": record.domain,
                "path": record.path,
                "secure": record.secure,
                "httpOnly": record.http_only,
            });
            if let Some(expiry) = record.expiry {
                raw["expires"] = json!(expiry);
            }
            let param: CookieParam = serde_json::from_value(raw)
                .map_err(|error| DriverError::Transport(error.to_string()))?;
            params.push(param);
        }
        self.page
            .set_cookies(params)
            .await
            .map_err(|error| DriverError::Transport(error.to_string()))?;
        Ok(())
    }

    async fn local_storage(&self) -> Result<Vec<StorageEntry>, DriverError> {
        // Local storage belongs to the top-level origin regardless of frame
        // scope.
        let value = self
            .eval_raw(
                "(() => { const out = []; \
                  for (let i = 0; i < window.localStorage.length; i++) { \
                    const key = window.localStorage.key(i); \
                    out.push({ key, value: window.localStorage.getItem(key) }); \
                  } return out; })()",
            )
            .await?;
        let entries: Vec<StorageEntry> = serde_json::from_value(value).unwrap_or_default();
        Ok(entries)
    }

    async fn set_local_storage(&self, entries: &[StorageEntry]) -> Result<(), DriverError> {
        for entry in entries {
            let js = format!(
                "window.localStorage.setItem({key}, {value})",
                key = js_str(&entry.key),
                value = js_str(&entry.value)
            );
            self.eval_raw(&js).await?;
        }
        Ok(())
    }

    async fn enter_frame(&self, css: &str) -> Result<(), DriverError> {
        let probe = format!(
            "(() => {{ const f = document.querySelector({sel}); return !!(f && f.contentDocument); }})()",
            sel = js_str(css)
        );
        let present = self.eval_raw(&probe).await?;
        if present != json!(true) {
            return Err(DriverError::FrameNotFound(css.to_string()));
        }
        if let Ok(mut guard) = self.frame.lock() {
            *guard = Some(css.to_string());
        }
        Ok(())
    }

    async fn exit_frame(&self) -> Result<(), DriverError> {
        if let Ok(mut guard) = self.frame.lock() {
            *guard = None;
        }
        Ok(())
    }
}
