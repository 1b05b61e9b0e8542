//! Page-state signatures observed during authentication.

use std::sync::Arc;

use cdp_driver::{DriverError, PageDriver};
use inkpost_core_types::PlatformUrls;
use locator_cascade::{probe_present, probe_unique, spec_for, UiRole};

/// Whether the "verification required" signature is currently on the page:
/// either the URL matches the second-factor pattern or the prompt role
/// resolves.
pub async fn second_factor_present(
    page: &Arc<dyn PageDriver>,
    urls: &PlatformUrls,
) -> Result<bool, DriverError> {
    let url = page.current_url().await?;
    if url.contains(&urls.second_factor_marker) {
        return Ok(true);
    }
    probe_present(&spec_for(UiRole::SecondFactorSignature), page).await
}

/// An explicit error signature rendered by the login page, with its message
/// when one can be read.
pub async fn login_error(
    page: &Arc<dyn PageDriver>,
) -> Result<Option<String>, DriverError> {
    match probe_unique(&spec_for(UiRole::LoginErrorMarker), page).await? {
        None => Ok(None),
        Some(element) => {
            let message = page.text(&element).await.unwrap_or_default();
            if message.is_empty() {
                Ok(Some("login error shown on page".to_string()))
            } else {
                Ok(Some(message))
            }
        }
    }
}
