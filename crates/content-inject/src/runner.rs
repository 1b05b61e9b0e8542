//! Cascade execution with read-back verification and frame scoping.

use std::sync::Arc;

use cdp_driver::{PageDriver, Query};
use locator_cascade::{spec_for, Strategy, UiRole};
use tracing::{debug, info, warn};

use crate::errors::InjectError;
use crate::model::{InjectionAttempt, StrategyKind};
use crate::strategies::{default_strategies, InjectStrategy};

/// Runs the strategy cascade against the composer.
pub struct ContentInjector {
    strategies: Vec<Box<dyn InjectStrategy>>,
    /// Fraction of the body length that must be observed in the surface
    /// for an attempt to count. Editors normalize markup, so exact
    /// equality is the wrong bar; a silent no-op stays far under this one.
    min_match_ratio: f64,
}

impl Default for ContentInjector {
    fn default() -> Self {
        Self {
            strategies: default_strategies(),
            min_match_ratio: 0.9,
        }
    }
}

impl ContentInjector {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    fn with_strategies(strategies: Vec<Box<dyn InjectStrategy>>) -> Self {
        Self {
            strategies,
            min_match_ratio: 0.9,
        }
    }

    /// Write the body into the composer, trying each strategy in order and
    /// verifying after every attempt.
    ///
    /// When the composer lives in an embedded frame the cascade runs inside
    /// it; the original frame context is restored on every exit path.
    pub async fn inject(
        &self,
        page: &Arc<dyn PageDriver>,
        body: &str,
    ) -> Result<InjectionAttempt, InjectError> {
        if body.is_empty() {
            return Err(InjectError::EmptyBody);
        }
        let entered = self.enter_composer_frame(page).await?;
        let outcome = self.run_cascade(page, body).await;
        if entered {
            if let Err(error) = page.exit_frame().await {
                warn!(%error, "could not restore frame context");
            }
        }
        outcome
    }

    async fn run_cascade(
        &self,
        page: &Arc<dyn PageDriver>,
        body: &str,
    ) -> Result<InjectionAttempt, InjectError> {
        let required = min_len(body, self.min_match_ratio);
        let mut attempts = Vec::with_capacity(self.strategies.len());
        for strategy in &self.strategies {
            let kind = strategy.kind();
            match strategy.attempt(page, body).await? {
                None => {
                    debug!(strategy = kind.name(), "surface absent, skipping");
                    attempts.push(InjectionAttempt::miss(kind));
                }
                Some(observed) => {
                    let verified_len = observed.chars().count();
                    if verified_len >= required {
                        info!(strategy = kind.name(), verified_len, "content injected");
                        return Ok(InjectionAttempt {
                            strategy: kind,
                            ok: true,
                            verified_len,
                        });
                    }
                    debug!(
                        strategy = kind.name(),
                        verified_len,
                        required,
                        "write not reflected in the surface"
                    );
                    attempts.push(InjectionAttempt {
                        strategy: kind,
                        ok: false,
                        verified_len,
                    });
                }
            }
        }
        warn!(attempted = attempts.len(), "all injection strategies exhausted");
        Err(InjectError::Exhausted { attempts })
    }

    /// Enter the composer frame when the platform embeds one. Returns
    /// whether a frame switch happened.
    async fn enter_composer_frame(
        &self,
        page: &Arc<dyn PageDriver>,
    ) -> Result<bool, InjectError> {
        for candidate in &spec_for(UiRole::ComposerFrame).candidates {
            let Strategy::Css(selector) = &candidate.strategy else {
                continue;
            };
            if page.query(&Query::Css(selector.clone())).await?.is_empty() {
                continue;
            }
            page.enter_frame(selector).await?;
            debug!(selector, "scoped to composer frame");
            return Ok(true);
        }
        Ok(false)
    }
}

fn min_len(body: &str, ratio: f64) -> usize {
    let chars = body.chars().count();
    // Never below one character, or a short body would let an empty
    // read-back pass as verified.
    (((chars as f64) * ratio).floor() as usize).max(1)
}
