use super::CommandExecutor;
use crate::markers;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Bounded retry applied to every transport call of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    #[serde(with = "crate::config::secs")]
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff: Duration::from_secs(30),
        }
    }
}

impl RetryPolicy {
    /// Runs `command` until it succeeds, fails with a non-retryable error, or
    /// the attempts are used up. The last error is returned. Commands that
    /// change cluster state are run once.
    pub async fn run<E: CommandExecutor>(&self, executor: &E, command: &str) -> Result<String> {
        let attempts = if is_idempotent(command) {
            self.max_attempts.max(1)
        } else {
            1
        };
        let mut attempt = 1;
        loop {
            match executor.execute(command).await {
                Ok(out) => return Ok(out),
                Err(e) if attempt < attempts && is_retryable(&e) => {
                    tracing::warn!(
                        command,
                        attempt,
                        max_attempts = attempts,
                        backoff_secs = self.backoff.as_secs(),
                        error = %e,
                        "transient failure, retrying"
                    );
                    tokio::time::sleep(self.backoff).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

/// False for commands whose effect must not happen twice, such as a job
/// submission that may have been accepted before the transport failed.
pub fn is_idempotent(command: &str) -> bool {
    !markers::NON_IDEMPOTENT_COMMANDS
        .iter()
        .any(|c| command.contains(c))
}

/// True for transport failures that look like flaky networking rather than a
/// command that really failed.
pub fn is_retryable(err: &Error) -> bool {
    match err.root() {
        Error::Transport { reason, .. } => is_retryable_text(reason),
        _ => false,
    }
}

fn is_retryable_text(message: &str) -> bool {
    let message = message.to_lowercase();

    if message.contains("permission denied")
        || message.contains("host key verification failed")
        || message.contains("could not resolve hostname")
        || message.contains("identity file")
        || message.contains("exited without exit status")
        || message.contains("closed by remote host")
    {
        return false;
    }

    message.contains("connection timed out")
        || message.contains("timed out")
        || message.contains("connection reset")
        || message.contains("broken pipe")
        || message.contains("connection refused")
        || message.contains("network is unreachable")
        || message.contains("no route to host")
        || message.contains("kex_exchange_identification")
        || message.contains("temporary failure in name resolution")
        || message.contains("control socket")
}

/// A session whose every command goes through a [`RetryPolicy`].
#[derive(Debug)]
pub struct Retrying<E> {
    inner: E,
    policy: RetryPolicy,
}

impl<E> Retrying<E> {
    pub fn new(inner: E, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }

    pub fn into_inner(self) -> E {
        self.inner
    }
}

impl<E: CommandExecutor + Sync> CommandExecutor for Retrying<E> {
    async fn execute(&self, command: &str) -> Result<String> {
        self.policy.run(&self.inner, command).await
    }
}
