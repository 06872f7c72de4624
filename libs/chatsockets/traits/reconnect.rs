use rand::Rng;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Jitter of the default policy
pub const DEFAULT_JITTER_MS: u64 = 250;

/// Reconnection behaviour after the transport drops without `stop()`
///
/// Loaded from configuration, so it is a plain enum rather than a trait
/// object:
///
/// ```yaml
/// reconnect:
///   kind: exponential
///   initial_delay_ms: 1000
///   max_delay_ms: 60000
///   max_attempts: 5
///   jitter_ms: 250
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ReconnectPolicy {
    /// Give up as soon as the connection drops
    Never,

    /// Wait the same delay before every attempt
    Fixed {
        delay_ms: u64,
        max_attempts: Option<usize>,
    },

    /// `initial_delay * 2^attempt`, capped at `max_delay`, plus a random
    /// `0..=jitter` so that clients dropped together do not retry together
    Exponential {
        initial_delay_ms: u64,
        max_delay_ms: u64,
        max_attempts: Option<usize>,
        #[serde(default)]
        jitter_ms: u64,
    },
}

impl ReconnectPolicy {
    pub fn fixed(delay: Duration, max_attempts: Option<usize>) -> Self {
        Self::Fixed {
            delay_ms: delay.as_millis() as u64,
            max_attempts,
        }
    }

    pub fn exponential(
        initial_delay: Duration,
        max_delay: Duration,
        max_attempts: Option<usize>,
    ) -> Self {
        Self::Exponential {
            initial_delay_ms: initial_delay.as_millis() as u64,
            max_delay_ms: max_delay.as_millis() as u64,
            max_attempts,
            jitter_ms: 0,
        }
    }

    /// Add up to `jitter` of random delay to every exponential attempt
    pub fn with_jitter(self, jitter: Duration) -> Self {
        match self {
            Self::Exponential {
                initial_delay_ms,
                max_delay_ms,
                max_attempts,
                ..
            } => Self::Exponential {
                initial_delay_ms,
                max_delay_ms,
                max_attempts,
                jitter_ms: jitter.as_millis() as u64,
            },
            other => other,
        }
    }

    /// Delay before reconnection attempt `attempt` (0-indexed), `None` to stop
    pub fn next_delay(&self, attempt: usize) -> Option<Duration> {
        if !self.should_reconnect(attempt) {
            return None;
        }

        match self {
            Self::Never => None,
            Self::Fixed { delay_ms, .. } => Some(Duration::from_millis(*delay_ms)),
            Self::Exponential {
                initial_delay_ms,
                max_delay_ms,
                jitter_ms,
                ..
            } => {
                let factor = 2u64.checked_pow(attempt as u32).unwrap_or(u64::MAX);
                let delay = initial_delay_ms.saturating_mul(factor).min(*max_delay_ms);
                let jitter = match *jitter_ms {
                    0 => 0,
                    max => rand::thread_rng().gen_range(0..=max),
                };
                Some(Duration::from_millis(delay.saturating_add(jitter)))
            }
        }
    }

    pub fn should_reconnect(&self, attempt: usize) -> bool {
        match self {
            Self::Never => false,
            Self::Fixed { max_attempts, .. } | Self::Exponential { max_attempts, .. } => {
                max_attempts.map_or(true, |max| attempt < max)
            }
        }
    }
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self::exponential(Duration::from_secs(1), Duration::from_secs(60), Some(5))
            .with_jitter(Duration::from_millis(DEFAULT_JITTER_MS))
    }
}
