//! Cascade evaluation: candidates in declaration order, typed outcomes.

use std::sync::Arc;
use std::time::Duration;

use cdp_driver::{poll_until, DriverError, ElementId, PageDriver};
use tracing::{debug, info, warn};

use crate::errors::LocatorError;
use crate::spec::{LocatorCandidate, LocatorSpec};

/// Evaluates locator specs against a live page.
///
/// This component only queries page state, it never mutates it.
#[derive(Clone, Debug)]
pub struct LocatorCascade {
    poll_interval: Duration,
}

impl Default for LocatorCascade {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(200),
        }
    }
}

impl LocatorCascade {
    pub fn new(poll_interval: Duration) -> Self {
        Self { poll_interval }
    }

    /// Resolve a spec to exactly one visible, enabled element.
    ///
    /// Candidates are tried in declaration order, each bounded by its own
    /// timeout. A candidate resolving to zero elements or to an ambiguous
    /// set is skipped, not treated as an error; the call fails only after
    /// every candidate is exhausted.
    pub async fn locate(
        &self,
        spec: &LocatorSpec,
        page: &Arc<dyn PageDriver>,
    ) -> Result<ElementId, LocatorError> {
        for candidate in &spec.candidates {
            debug!(
                role = spec.role.name(),
                strategy = %candidate.strategy.describe(),
                "trying locator candidate"
            );
            match self.try_candidate(candidate, page).await {
                Ok(Some(element)) => {
                    info!(
                        role = spec.role.name(),
                        strategy = candidate.strategy.name(),
                        "control located"
                    );
                    return Ok(element);
                }
                Ok(None) => {
                    debug!(
                        role = spec.role.name(),
                        strategy = %candidate.strategy.describe(),
                        "no unique match within candidate timeout"
                    );
                }
                Err(error) => {
                    // Transport errors mean the page itself is gone; weaker
                    // candidates cannot recover that.
                    warn!(
                        role = spec.role.name(),
                        strategy = %candidate.strategy.describe(),
                        %error,
                        "candidate query failed"
                    );
                    return Err(error.into());
                }
            }
        }
        Err(LocatorError::NotFound {
            role: spec.role.name().to_string(),
            tried: spec.candidates.len(),
        })
    }

    async fn try_candidate(
        &self,
        candidate: &LocatorCandidate,
        page: &Arc<dyn PageDriver>,
    ) -> Result<Option<ElementId>, DriverError> {
        let query = candidate.strategy.to_query();
        let timeout = Duration::from_millis(candidate.timeout_ms);
        let outcome = poll_until(self.poll_interval, timeout, || {
            let page = Arc::clone(page);
            let query = query.clone();
            async move {
                match page.query(&query).await {
                    Ok(mut matches) if matches.len() == 1 => Some(Ok(matches.remove(0))),
                    // Zero or ambiguous: keep sampling, late-rendering
                    // markup may settle into a unique match.
                    Ok(_) => None,
                    Err(error) => Some(Err(error)),
                }
            }
        })
        .await;
        match outcome {
            Ok(Ok(element)) => Ok(Some(element)),
            Ok(Err(error)) => Err(error),
            Err(_timeout) => Ok(None),
        }
    }
}

/// Single-pass presence probe: does any candidate match at all right now?
///
/// Used for page signatures where ambiguity is fine and waiting is the
/// caller's concern.
pub async fn probe_present(
    spec: &LocatorSpec,
    page: &Arc<dyn PageDriver>,
) -> Result<bool, DriverError> {
    for candidate in &spec.candidates {
        if !page.query(&candidate.strategy.to_query()).await?.is_empty() {
            return Ok(true);
        }
    }
    Ok(false)
}

/// Single-pass unique probe: first candidate resolving to exactly one
/// element, without polling.
pub async fn probe_unique(
    spec: &LocatorSpec,
    page: &Arc<dyn PageDriver>,
) -> Result<Option<ElementId>, DriverError> {
    for candidate in &spec.candidates {
        let mut matches = page.query(&candidate.strategy.to_query()).await?;
        if matches.len() == 1 {
            return Ok(Some(matches.remove(0)));
        }
    }
    Ok(None)
}
