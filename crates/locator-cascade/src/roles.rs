//! The platform locator table.
//!
//! One entry per semantic control the engine touches, ordered from stable
//! ids down to free-text matches. This table is the only place that changes
//! when the platform ships new markup.

use serde::{Deserialize, Serialize};

use crate::spec::LocatorSpec;

/// Semantic roles of the controls the engine interacts with.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UiRole {
    UsernameField,
    PasswordField,
    FederatedLogin,
    LoginSubmit,
    LoginErrorMarker,
    SecondFactorSignature,
    LoggedInMarker,
    TitleField,
    TagsField,
    PlainComposer,
    CodeEditorHost,
    RichComposer,
    ComposerFrame,
    PublishButton,
    PublishConfirm,
    PostPublishSignature,
    DraftSavedMarker,
}

impl UiRole {
    pub fn name(&self) -> &'static str {
        match self {
            UiRole::UsernameField => "username-field",
            UiRole::PasswordField => "password-field",
            UiRole::FederatedLogin => "federated-login",
            UiRole::LoginSubmit => "login-submit",
            UiRole::LoginErrorMarker => "login-error-marker",
            UiRole::SecondFactorSignature => "second-factor-signature",
            UiRole::LoggedInMarker => "logged-in-marker",
            UiRole::TitleField => "title-field",
            UiRole::TagsField => "tags-field",
            UiRole::PlainComposer => "plain-composer",
            UiRole::CodeEditorHost => "code-editor-host",
            UiRole::RichComposer => "rich-composer",
            UiRole::ComposerFrame => "composer-frame",
            UiRole::PublishButton => "publish-button",
            UiRole::PublishConfirm => "publish-confirm",
            UiRole::PostPublishSignature => "post-publish-signature",
            UiRole::DraftSavedMarker => "draft-saved-marker",
        }
    }
}

/// Candidate strategies for a role against the current platform markup.
pub fn spec_for(role: UiRole) -> LocatorSpec {
    match role {
        UiRole::UsernameField => LocatorSpec::new(role)
            .css("#username", 4000)
            .css("input[name='username']", 2000)
            .attr("autocomplete", "username", 2000),
        UiRole::PasswordField => LocatorSpec::new(role)
            .css("#password", 4000)
            .css("input[type='password']", 2000),
        UiRole::FederatedLogin => LocatorSpec::new(role)
            .css("a.sso-login", 1500)
            .attr("data-provider", "sso", 1000)
            .text("Continue with SSO", 1000),
        UiRole::LoginSubmit => LocatorSpec::new(role)
            .css("button[type='submit']", 3000)
            .text("Log in", 1500)
            .text("Sign in", 1500),
        UiRole::LoginErrorMarker => LocatorSpec::new(role)
            .css(".login-error", 500)
            .attr("role", "alert", 500),
        UiRole::SecondFactorSignature => LocatorSpec::new(role)
            .css(".two-factor-prompt", 800)
            .attr("data-testid", "verification", 800),
        UiRole::LoggedInMarker => LocatorSpec::new(role)
            .css("[data-testid='user-menu']", 2500)
            .css(".profile-avatar", 1500)
            .attr("aria-label", "account", 1500),
        UiRole::TitleField => LocatorSpec::new(role)
            .css("#post-title", 4000)
            .css("input.post-title", 2000)
            .attr("placeholder", "Title", 2000),
        UiRole::TagsField => LocatorSpec::new(role)
            .css("input.tag-input", 800)
            .attr("placeholder", "tag", 800),
        UiRole::PlainComposer => LocatorSpec::new(role)
            .css("textarea.post-body", 1500)
            .css("textarea[name='content']", 1000),
        UiRole::CodeEditorHost => LocatorSpec::new(role).css(".CodeMirror", 1000),
        UiRole::RichComposer => LocatorSpec::new(role)
            .css(".editor-content[contenteditable='true']", 1500)
            .css("[contenteditable='true']", 1000)
            .attr("role", "textbox", 1000),
        UiRole::ComposerFrame => LocatorSpec::new(role)
            .css("iframe.editor-frame", 1000)
            .css("iframe#editor", 800),
        UiRole::PublishButton => LocatorSpec::new(role)
            .css("button.publish", 4000)
            .attr("data-testid", "publish", 2000)
            .text("Publish", 2000),
        UiRole::PublishConfirm => LocatorSpec::new(role)
            .css(".publish-dialog button.confirm", 1200)
            .text("Publish now", 800),
        UiRole::PostPublishSignature => LocatorSpec::new(role)
            .css(".post-permalink", 800)
            .attr("data-testid", "post-published", 800),
        UiRole::DraftSavedMarker => LocatorSpec::new(role)
            .css(".autosave-status", 500)
            .text("Draft saved", 500),
    }
}
