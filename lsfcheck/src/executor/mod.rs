//! The one primitive every check is built on: run a command string on a
//! remote host and get its captured output back.

mod retry;
mod scripted;
mod ssh;

pub use retry::{RetryPolicy, Retrying, is_retryable};
pub use scripted::{Reply, Rule, ScriptedConnector, ScriptedExecutor, Transcript};
pub use ssh::{SshConnector, SshSession};

use crate::Result;
use std::future::Future;

/// Runs shell command strings against one host.
///
/// Implementations return stdout on success. A command that cannot be run or
/// exits non-zero is an [`crate::Error::Transport`] carrying whatever the
/// remote side printed on stderr.
pub trait CommandExecutor {
    fn execute(&self, command: &str) -> impl Future<Output = Result<String>> + Send;
}

impl<E: CommandExecutor + Sync> CommandExecutor for &E {
    fn execute(&self, command: &str) -> impl Future<Output = Result<String>> + Send {
        (**self).execute(command)
    }
}

impl<E: CommandExecutor + Send + Sync> CommandExecutor for std::sync::Arc<E> {
    fn execute(&self, command: &str) -> impl Future<Output = Result<String>> + Send {
        (**self).execute(command)
    }
}

/// Opens sessions to cluster nodes. Dropping a session releases it.
pub trait Connector {
    type Session: CommandExecutor + Send + Sync;

    fn connect(
        &self,
        host: &str,
        user: Option<&str>,
    ) -> impl Future<Output = Result<Self::Session>> + Send;
}

/// Wraps `command` so it runs on `ip` by hopping through the current session,
/// used for worker nodes that are only reachable from inside the cluster.
pub fn on_host(ip: &str, command: &str) -> String {
    format!("ssh {ip} \"{command}\"")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_on_host_quotes_command() {
        assert_eq!(
            on_host("10.0.0.5", "cat /etc/os-release"),
            "ssh 10.0.0.5 \"cat /etc/os-release\""
        );
        assert_eq!(
            on_host("10.0.0.5", "sudo su -l root -c 'cat /root/.ssh/authorized_keys'"),
            "ssh 10.0.0.5 \"sudo su -l root -c 'cat /root/.ssh/authorized_keys'\""
        );
    }
}
