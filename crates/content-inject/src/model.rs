//! Injection attempt records.

use serde::{Deserialize, Serialize};

/// The injection strategies, in cascade order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum StrategyKind {
    /// Plain editable text surface plus input/change events.
    PlainSurface,
    /// Value-setting entry point of a structured code-editor widget.
    CodeEditorApi,
    /// Content-editable region, markup set directly.
    ContentEditable,
    /// Editor API object the host page exposes.
    HostEditorApi,
}

impl StrategyKind {
    pub fn name(&self) -> &'static str {
        match self {
            StrategyKind::PlainSurface => "plain-surface",
            StrategyKind::CodeEditorApi => "code-editor-api",
            StrategyKind::ContentEditable => "content-editable",
            StrategyKind::HostEditorApi => "host-editor-api",
        }
    }
}

/// What one strategy attempt observed.
///
/// `verified_len` is the character length actually present in the target
/// surface after the write; it is what separates "silently did nothing"
/// from real success.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct InjectionAttempt {
    pub strategy: StrategyKind,
    pub ok: bool,
    pub verified_len: usize,
}

impl InjectionAttempt {
    pub fn miss(strategy: StrategyKind) -> Self {
        Self {
            strategy,
            ok: false,
            verified_len: 0,
        }
    }
}
