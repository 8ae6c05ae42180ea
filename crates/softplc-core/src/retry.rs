// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Reconnect backoff policies.
//!
//! A source in backoff waits a delay computed from its configured retry
//! interval and the number of consecutive failures. The default policy is
//! flat: every wait equals the retry interval.
//!
//! | Policy        | Delay for failure `n`                               |
//! |---------------|-----------------------------------------------------|
//! | `Flat`        | `retry_interval`                                    |
//! | `Exponential` | `min(retry_interval * multiplier^(n-1), max_delay)` |
//!
//! The exponential policy optionally applies a random jitter of
//! `± jitter * delay`. Jitter never shortens a wait below
//! `MIN_JITTER_FACTOR * delay`.

use std::time::Duration;

use rand::Rng;

/// Smallest fraction of the computed delay a jittered wait may shrink to.
const MIN_JITTER_FACTOR: f64 = 0.1;

/// Backoff policy applied by the supervisor between connection attempts.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum BackoffPolicy {
    /// Wait the configured retry interval every time.
    #[default]
    Flat,

    /// Grow the wait geometrically with consecutive failures.
    Exponential {
        /// Growth factor per consecutive failure (>= 1.0).
        multiplier: f64,
        /// Upper bound on the wait.
        max_delay: Duration,
        /// Random spread as a fraction of the delay, in `[0.0, 1.0]`.
        jitter: f64,
    },
}

impl BackoffPolicy {
    /// Creates an exponential policy without jitter.
    pub fn exponential(multiplier: f64, max_delay: Duration) -> Self {
        BackoffPolicy::Exponential {
            multiplier,
            max_delay,
            jitter: 0.0,
        }
    }

    /// Returns the policy name.
    pub fn name(&self) -> &'static str {
        match self {
            BackoffPolicy::Flat => "flat",
            BackoffPolicy::Exponential { .. } => "exponential",
        }
    }

    /// Computes the wait before the next attempt.
    ///
    /// `failures` is the number of consecutive failures including the one
    /// that triggered this backoff, so it is at least 1.
    pub fn delay(&self, retry_interval: Duration, failures: u32) -> Duration {
        match *self {
            BackoffPolicy::Flat => retry_interval,
            BackoffPolicy::Exponential {
                multiplier,
                max_delay,
                jitter,
            } => {
                let base = exponential_delay(retry_interval, multiplier, max_delay, failures);
                apply_jitter(base, jitter)
            }
        }
    }
}

fn exponential_delay(
    retry_interval: Duration,
    multiplier: f64,
    max_delay: Duration,
    failures: u32,
) -> Duration {
    let exponent = failures.saturating_sub(1).min(i32::MAX as u32) as i32;
    let scaled = retry_interval.as_secs_f64() * multiplier.max(1.0).powi(exponent);
    let capped = scaled.min(max_delay.as_secs_f64());

    Duration::try_from_secs_f64(capped).unwrap_or(max_delay)
}

fn apply_jitter(delay: Duration, jitter: f64) -> Duration {
    let jitter = jitter.clamp(0.0, 1.0);
    if jitter == 0.0 || delay.is_zero() {
        return delay;
    }

    let low = (1.0 - jitter).max(MIN_JITTER_FACTOR);
    let factor = rand::thread_rng().gen_range(low..=(1.0 + jitter));
    delay.mul_f64(factor)
}

// =============================================================================
// Tests
// =============================================================================
