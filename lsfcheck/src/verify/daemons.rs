use super::{Node, run};
use crate::config::Timing;
use crate::executor::CommandExecutor;
use crate::markers::{self, cmd};
use crate::{Error, Result, parser, poller};

/// lim, res and sbatchd must all be running, in that order.
pub async fn check_daemons_status<E: CommandExecutor>(session: &E) -> Result<()> {
    let output = run(session, Node::Session, cmd::DAEMONS_STATUS).await?;
    parser::daemons_running(&output)?;
    tracing::info!("all LSF daemons are running");
    Ok(())
}

/// Restarts the LSF daemons and waits until `bhosts` stops saying LSF is down.
pub async fn restart_daemons<E: CommandExecutor>(session: &E, timing: &Timing) -> Result<()> {
    let output = run(session, Node::Session, cmd::DAEMONS_RESTART).await?;
    tracing::info!(output = %output.trim(), "lsf_daemons restart");

    for marker in [markers::DAEMON_RESTART_STOPPING, markers::DAEMON_RESTART_STARTING] {
        if !output.contains(marker) {
            return Err(Error::not_found(
                format!("'{marker}' in lsf_daemons restart output"),
                output,
            ));
        }
    }

    tokio::time::sleep(timing.daemon_settle).await;

    poller::wait_until(
        session,
        cmd::BHOSTS,
        "LSF to come back up",
        |out| !out.contains(markers::LSF_IS_DOWN),
        timing.daemon_restart_poll,
        timing.drain_timeout,
    )
    .await?;
    tracing::info!("lsf_daemons restarted successfully");
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BctrldAction {
    Start,
    Stop,
}

impl std::str::FromStr for BctrldAction {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "start" => Ok(BctrldAction::Start),
            "stop" => Ok(BctrldAction::Stop),
            _ => Err(Error::InvalidArgument(format!(
                "invalid operation type '{s}', please specify 'start' or 'stop'"
            ))),
        }
    }
}

impl std::fmt::Display for BctrldAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            BctrldAction::Start => "start",
            BctrldAction::Stop => "stop",
        })
    }
}

impl BctrldAction {
    fn command(self) -> &'static str {
        match self {
            BctrldAction::Stop => cmd::BCTRLD_STOP,
            BctrldAction::Start => cmd::LSFD_RESTART,
        }
    }

    fn settle(self, timing: &Timing) -> std::time::Duration {
        match self {
            BctrldAction::Stop => timing.bctrld_stop_settle,
            BctrldAction::Start => timing.bctrld_start_settle,
        }
    }

    /// Hosts `bhosts` should report as `unreach` once the action settled.
    fn expected_unreach(self) -> usize {
        match self {
            BctrldAction::Stop => 1,
            BctrldAction::Start => 0,
        }
    }
}

/// Stops sbd on the session host, or brings it back, and checks the
/// scheduler noticed.
pub async fn control_bctrld<E: CommandExecutor>(
    session: &E,
    action: BctrldAction,
    timing: &Timing,
) -> Result<()> {
    run(session, Node::Session, action.command()).await?;
    tokio::time::sleep(action.settle(timing)).await;

    let output = run(session, Node::Session, cmd::BHOSTS).await?;
    let unreach = parser::count_occurrences(&output, markers::STATUS_UNREACH);
    if unreach != action.expected_unreach() {
        return Err(Error::mismatch(
            format!("unreachable host count after sbd {action}"),
            action.expected_unreach(),
            unreach,
        ));
    }
    tracing::info!(%action, "sbd daemon {action} succeeded");
    Ok(())
}

/// Reboots the session host. Success means the connection dropped while the
/// command ran.
pub async fn reboot<E: CommandExecutor>(session: &E, timing: &Timing) -> Result<()> {
    match session.execute(cmd::REBOOT).await {
        Ok(output) => Err(Error::mismatch(
            "instance reboot",
            "connection dropped by the rebooting host",
            format!("command completed: {}", output.trim()),
        )),
        Err(e) => {
            let message = e.to_string();
            if !markers::REBOOT_DISCONNECT_MARKERS
                .iter()
                .any(|m| message.contains(m))
            {
                return Err(e.context("instance reboot failed"));
            }
            tracing::info!(reason = %message, "host went down for reboot");
            tokio::time::sleep(timing.reboot_settle).await;
            tracing::info!("LSF instance successfully rebooted");
            Ok(())
        }
    }
}
