//! Bounded retry with exponential backoff for background work, publishing
//! an observable health state through a `watch` channel.
//!
//! Failures are logged and reported as health; they never propagate into the
//! process lifecycle.

use std::fmt;
use std::future::Future;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::watch;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl RetryPolicy {
    /// Delay after the `attempt`-th failure (1-based): base * 2^(attempt-1), capped.
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.base_delay.saturating_mul(factor).min(self.max_delay)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum TaskHealth {
    Pending,
    Retrying { attempt: u32, last_error: String },
    Healthy { last_success: DateTime<Utc>, attempts: u32 },
    Failed { attempts: u32, last_error: String },
}

impl TaskHealth {
    pub fn is_healthy(&self) -> bool {
        matches!(self, Self::Healthy { .. })
    }
}

pub fn health_channel() -> (watch::Sender<TaskHealth>, watch::Receiver<TaskHealth>) {
    watch::channel(TaskHealth::Pending)
}

/// Runs `op` until it succeeds or `policy.max_attempts` is reached.
pub async fn retry<T, E, F, Fut>(
    task: &'static str,
    policy: &RetryPolicy,
    health: &watch::Sender<TaskHealth>,
    mut op: F,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: fmt::Display,
{
    let mut attempt = 0;
    loop {
        attempt += 1;
        match op().await {
            Ok(value) => {
                health.send_replace(TaskHealth::Healthy {
                    last_success: Utc::now(),
                    attempts: attempt,
                });
                return Ok(value);
            }
            Err(err) if attempt >= policy.max_attempts => {
                tracing::warn!(task, attempt, error = %err, "background task gave up");
                health.send_replace(TaskHealth::Failed {
                    attempts: attempt,
                    last_error: err.to_string(),
                });
                return Err(err);
            }
            Err(err) => {
                let delay = policy.delay_after(attempt);
                tracing::warn!(task, attempt, ?delay, error = %err, "background task failed, retrying");
                health.send_replace(TaskHealth::Retrying {
                    attempt,
                    last_error: err.to_string(),
                });
                tokio::time::sleep(delay).await;
            }
        }
    }
}
