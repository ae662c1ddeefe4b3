use crate::config::Timing;
use crate::executor::CommandExecutor;
use crate::markers::cmd;
use crate::parser::{self, NodeStatus};
use crate::{Error, Result};
use std::time::Duration;
use tokio::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitState {
    Waiting { polls: u32 },
    Satisfied { polls: u32 },
    TimedOut { polls: u32 },
}

impl WaitState {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, WaitState::Waiting { .. })
    }

    fn polls(&self) -> u32 {
        match self {
            WaitState::Waiting { polls }
            | WaitState::Satisfied { polls }
            | WaitState::TimedOut { polls } => *polls,
        }
    }
}

/// A condition on remote output that must hold before `timeout` runs out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitFor {
    pub timeout: Duration,
}

impl WaitFor {
    /// `satisfied` is `None` when no query was made because time was up.
    pub fn transition(&self, state: WaitState, elapsed: Duration, satisfied: Option<bool>) -> WaitState {
        if state.is_terminal() {
            return state;
        }
        let polls = state.polls() + u32::from(satisfied.is_some());
        match satisfied {
            Some(true) => WaitState::Satisfied { polls },
            _ if elapsed >= self.timeout => WaitState::TimedOut { polls },
            _ => WaitState::Waiting { polls },
        }
    }
}

/// Runs `command` every `interval` until `satisfied` accepts its output.
///
/// Returns the number of queries made. A failed query is fatal; running past
/// `timeout` is [`Error::Timeout`] naming `what` and the timeout.
pub async fn wait_until<E, F>(
    session: &E,
    command: &str,
    what: &str,
    satisfied: F,
    interval: Duration,
    timeout: Duration,
) -> Result<u32>
where
    E: CommandExecutor,
    F: Fn(&str) -> bool,
{
    let wait = WaitFor { timeout };
    let start = Instant::now();
    let mut state = WaitState::Waiting { polls: 0 };

    loop {
        let elapsed = start.elapsed();
        let observed = if elapsed < timeout {
            let output = session
                .execute(command)
                .await
                .map_err(|e| e.context(format!("failed to run '{command}' command")))?;
            Some(satisfied(&output))
        } else {
            None
        };

        state = wait.transition(state, elapsed, observed);
        match state {
            WaitState::Satisfied { polls } => {
                tracing::debug!(what, polls, ?elapsed, "condition met");
                return Ok(polls);
            }
            WaitState::TimedOut { .. } => {
                return Err(Error::Timeout {
                    what: what.to_string(),
                    after: timeout,
                });
            }
            WaitState::Waiting { .. } => {
                tracing::info!(what, ?elapsed, "still waiting");
                let remaining = timeout.saturating_sub(start.elapsed());
                tokio::time::sleep(interval.min(remaining)).await;
            }
        }
    }
}

/// True when no `bhosts -w` row reports `ok`.
pub fn no_dynamic_nodes(bhosts: &str) -> bool {
    !parser::node_records(bhosts)
        .iter()
        .any(|n| n.status == NodeStatus::Ok)
}

/// Waits for every dynamic compute node to leave the `ok` state once the
/// workload is gone. Nothing is cancelled on timeout.
pub async fn wait_for_drain<E: CommandExecutor>(session: &E, timing: &Timing) -> Result<()> {
    let polls = wait_until(
        session,
        cmd::BHOSTS,
        "dynamic compute nodes to disappear",
        no_dynamic_nodes,
        timing.drain_poll_interval,
        timing.drain_timeout,
    )
    .await?;
    tracing::info!(polls, "all dynamic compute nodes have disappeared");
    Ok(())
}
