//! Pacing, retries and local fallback around an extraction service.
//!
//! One block moves through [`ExtractionPhase`]s:
//!
//! ```text
//! Attempting(1) --capacity--> Retrying(1) --sleep--> Attempting(2) ...
//!      |                                                   |
//!      |--malformed reply / capacity after last attempt--> Fallback --> Done
//!      |--ok / other error-------------------------------------------> Done
//! ```
//!
//! Each transition is a plain function of the current phase and the attempt
//! outcome ([`ExtractionPhase::after_attempt`]), so the decision points are
//! testable without a service.

use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use super::fallback::FALLBACK_WARNING;
use super::{ExtractError, Extraction, RecipeExtractor, RegexFallback, approx_request_tokens};
use crate::config::ExtractionConfig;

/// Time source, injectable so pacing can be tested without sleeping.
pub trait Clock {
    /// Current instant.
    fn now(&self) -> Instant;
    /// Blocks for `duration`.
    fn sleep(&self, duration: Duration);
}

/// The real clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn sleep(&self, duration: Duration) {
        thread::sleep(duration);
    }
}

/// Enforces a minimum interval between consecutive calls.
#[derive(Debug, Clone)]
pub struct RateLimiter {
    min_interval: Duration,
    last_call: Option<Instant>,
}

impl RateLimiter {
    /// Creates a limiter; a zero interval disables waiting.
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last_call: None,
        }
    }

    /// Sleeps for whatever is left of the interval since the last call.
    ///
    /// Returns the time slept.
    pub fn wait(&self, clock: &dyn Clock) -> Duration {
        let Some(last) = self.last_call else {
            return Duration::ZERO;
        };
        let elapsed = clock.now().saturating_duration_since(last);
        let remaining = self.min_interval.saturating_sub(elapsed);
        if !remaining.is_zero() {
            debug!(wait_ms = remaining.as_millis() as u64, "pacing extraction call");
            clock.sleep(remaining);
        }
        remaining
    }

    /// Records that a call just finished.
    pub fn mark(&mut self, clock: &dyn Clock) {
        self.last_call = Some(clock.now());
    }
}

/// Where one block is in the retry/fallback sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtractionPhase {
    /// About to call the service; attempt numbers start at 1.
    Attempting(u32),
    /// Waiting before the next attempt.
    Retrying {
        /// The attempt that just failed.
        attempt: u32,
        /// How long to wait.
        delay: Duration,
    },
    /// Giving up on the service and extracting locally.
    Fallback {
        /// Why the service result was abandoned.
        reason: String,
    },
    /// Finished.
    Done(Result<Extraction, ExtractError>),
}

impl ExtractionPhase {
    /// Decides the phase that follows attempt `attempt`.
    pub fn after_attempt(
        attempt: u32,
        outcome: Result<Extraction, ExtractError>,
        config: &ExtractionConfig,
    ) -> Self {
        match outcome {
            Ok(extraction) => ExtractionPhase::Done(Ok(extraction)),
            Err(err) if err.is_transient() && attempt < config.max_attempts => {
                ExtractionPhase::Retrying {
                    attempt,
                    delay: config.retry_delay(attempt),
                }
            }
            Err(err @ (ExtractError::Capacity(_) | ExtractError::MalformedReply(_))) => {
                ExtractionPhase::Fallback {
                    reason: err.to_string(),
                }
            }
            Err(err) => ExtractionPhase::Done(Err(err)),
        }
    }
}

/// Wraps an extractor with pacing, capacity retries and a local fallback.
pub struct ResilientExtractor<E, C = SystemClock> {
    inner: E,
    config: ExtractionConfig,
    clock: C,
    limiter: RateLimiter,
    fallback: RegexFallback,
}

impl<E: RecipeExtractor> ResilientExtractor<E> {
    /// Wraps `inner` using the system clock.
    pub fn new(inner: E, config: ExtractionConfig) -> Self {
        Self::with_clock(inner, config, SystemClock)
    }
}

impl<E: RecipeExtractor, C: Clock> ResilientExtractor<E, C> {
    /// Wraps `inner` using `clock` for pacing and retry delays.
    pub fn with_clock(inner: E, config: ExtractionConfig, clock: C) -> Self {
        Self {
            inner,
            limiter: RateLimiter::new(config.min_interval()),
            config,
            clock,
            fallback: RegexFallback::new(),
        }
    }

    /// Returns the wrapped extractor.
    pub fn inner(&self) -> &E {
        &self.inner
    }

    /// Runs one phase and returns the next.
    fn step(&mut self, phase: ExtractionPhase, block: &str) -> ExtractionPhase {
        match phase {
            ExtractionPhase::Attempting(attempt) => {
                self.limiter.wait(&self.clock);
                let outcome = self.inner.extract(block);
                self.limiter.mark(&self.clock);
                if let Err(err) = &outcome {
                    debug!(attempt, error = %err, "extraction attempt failed");
                }
                ExtractionPhase::after_attempt(attempt, outcome, &self.config)
            }
            ExtractionPhase::Retrying { attempt, delay } => {
                info!(
                    attempt,
                    max_attempts = self.config.max_attempts,
                    delay_ms = delay.as_millis() as u64,
                    "service over capacity, retrying"
                );
                self.clock.sleep(delay);
                ExtractionPhase::Attempting(attempt + 1)
            }
            ExtractionPhase::Fallback { reason } => {
                warn!(%reason, "falling back to local extraction");
                let recipes: Vec<_> = self.fallback.extract_block(block).into_iter().collect();
                let note = if recipes.is_empty() {
                    format!("{FALLBACK_WARNING}: no recipes ({reason})")
                } else {
                    FALLBACK_WARNING.to_string()
                };
                ExtractionPhase::Done(Ok(Extraction::new(recipes).with_warning(note)))
            }
            done @ ExtractionPhase::Done(_) => done,
        }
    }
}

impl<E: RecipeExtractor, C: Clock> RecipeExtractor for ResilientExtractor<E, C> {
    fn extract(&mut self, block: &str) -> Result<Extraction, ExtractError> {
        let tokens = approx_request_tokens(block);
        let limit = self.config.input_token_limit();
        if tokens > limit {
            return Err(ExtractError::TooLarge { tokens, limit });
        }

        let mut phase = ExtractionPhase::Attempting(1);
        loop {
            phase = match self.step(phase, block) {
                ExtractionPhase::Done(result) => return result,
                next => next,
            };
        }
    }
}
