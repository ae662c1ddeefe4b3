//! Sessions backed by the `openssh` crate.
//!
//! Each session is an OpenSSH control master living in its own temporary
//! directory, reached through the bastion as a jump host. Commands are
//! multiplexed over it. [`SshSession::close`] shuts the master down and
//! reports errors; a session that is only dropped is torn down by `openssh`
//! itself, so it is released on every exit path of the function that opened it.

use super::{CommandExecutor, Connector};
use crate::config::SshConfig;
use crate::{Error, Result};
use openssh::{KnownHosts, Session, SessionBuilder, Stdio};
use std::time::Instant;

#[derive(Debug, Clone)]
pub struct SshConnector {
    config: SshConfig,
}

impl SshConnector {
    pub fn new(config: SshConfig) -> Self {
        Self { config }
    }
}

impl Connector for SshConnector {
    type Session = SshSession;

    async fn connect(&self, host: &str, user: Option<&str>) -> Result<SshSession> {
        SshSession::open(&self.config, host, user.unwrap_or(&self.config.user)).await
    }
}

pub struct SshSession {
    destination: String,
    session: Session,
    // holds the control socket and the generated ssh config; dropped after
    // the session
    _control_dir: tempfile::TempDir,
}

impl std::fmt::Debug for SshSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SshSession")
            .field("destination", &self.destination)
            .finish_non_exhaustive()
    }
}

impl SshSession {
    pub async fn open(config: &SshConfig, host: &str, user: &str) -> Result<Self> {
        let destination = format!("{user}@{host}");
        let connect_command = format!("connect {destination}");

        let control_dir = tempfile::Builder::new()
            .prefix("lsfcheck-ssh-")
            .tempdir()
            .map_err(|e| Error::transport(&connect_command, e.to_string()))?;

        let mut builder = SessionBuilder::default();
        builder
            .known_hosts_check(KnownHosts::Add)
            .connect_timeout(config.connect_timeout)
            .user(user.to_string())
            .port(config.port)
            .control_directory(control_dir.path());

        if let Some(key) = &config.identity_file {
            builder.keyfile(key);
        }

        if let Some(jump) = jump_host(config) {
            // ssh hands -F on to the jump connection but not -i, so the
            // bastion's key is given through a config file
            if let Some(ssh_config) = bastion_ssh_config(config) {
                let path = control_dir.path().join("ssh_config");
                std::fs::write(&path, ssh_config)
                    .map_err(|e| Error::transport(&connect_command, e.to_string()))?;
                builder.config_file(&path);
            }
            builder.jump_hosts([jump]);
        }

        tracing::debug!(
            destination,
            bastion = ?config.bastion_host,
            timeout_ms = %config.connect_timeout.as_millis(),
            "opening SSH session"
        );

        let start = Instant::now();
        let session = match builder.connect(host).await {
            Ok(session) => session,
            Err(e) => {
                let reason = describe(&e);
                tracing::warn!(destination, reason, "SSH connection failed");
                return Err(Error::transport(connect_command, reason));
            }
        };

        tracing::info!(
            destination,
            duration_ms = %start.elapsed().as_millis(),
            "SSH session established"
        );

        Ok(Self {
            destination,
            session,
            _control_dir: control_dir,
        })
    }

    /// Stops the control master, surfacing any error `openssh` reports.
    pub async fn close(self) -> Result<()> {
        let destination = self.destination;
        self.session
            .close()
            .await
            .map_err(|e| Error::transport(format!("close {destination}"), describe(&e)))?;
        tracing::debug!(destination, "SSH session closed");
        Ok(())
    }
}

impl CommandExecutor for SshSession {
    async fn execute(&self, command: &str) -> Result<String> {
        tracing::debug!(destination = %self.destination, command, "executing remote command");

        let start = Instant::now();
        let output = self
            .session
            .command("sh")
            .arg("-c")
            .arg(command)
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| Error::transport(command, describe(&e)))?;

        let stdout = String::from_utf8_lossy(&output.stdout).to_string();
        let stderr = String::from_utf8_lossy(&output.stderr);

        if !output.status.success() {
            let reason = failure_reason(output.status.code(), &stderr, &stdout);
            tracing::warn!(
                destination = %self.destination,
                command,
                exit_code = output.status.code().unwrap_or(-1),
                stderr = %stderr.trim(),
                "remote command failed"
            );
            return Err(Error::transport(command, reason));
        }

        tracing::debug!(
            destination = %self.destination,
            command,
            duration_ms = %start.elapsed().as_millis(),
            stdout_len = stdout.len(),
            "remote command completed"
        );
        Ok(stdout)
    }
}

/// `[user@]host[:port]` of the bastion, as `ssh -J` takes it.
fn jump_host(config: &SshConfig) -> Option<String> {
    let bastion = config.bastion_host.as_deref()?;
    Some(format!("{}@{bastion}:{}", config.bastion_user, config.port))
}

fn bastion_ssh_config(config: &SshConfig) -> Option<String> {
    let bastion = config.bastion_host.as_deref()?;
    let key = config.identity_file.as_ref()?;
    Some(format!(
        "Host {bastion}\n    IdentityFile {}\n    IdentitiesOnly yes\n    BatchMode yes\n    StrictHostKeyChecking accept-new\n",
        key.display()
    ))
}

/// The error with its sources, since `openssh` keeps the ssh message in the
/// source chain.
fn describe(err: &openssh::Error) -> String {
    let mut reason = err.to_string();
    let mut source = std::error::Error::source(err);
    while let Some(e) = source {
        reason.push_str(": ");
        reason.push_str(&e.to_string());
        source = e.source();
    }
    reason
}

/// stderr first, then stdout, since tools like nslookup report lookup
/// failures on stdout.
fn failure_reason(code: Option<i32>, stderr: &str, stdout: &str) -> String {
    let parts: Vec<&str> = [stderr.trim(), stdout.trim()]
        .into_iter()
        .filter(|s| !s.is_empty())
        .collect();
    if parts.is_empty() {
        return exit_reason(code);
    }
    parts.join("\n")
}

fn exit_reason(code: Option<i32>) -> String {
    match code {
        Some(code) => format!("exit status {code}"),
        None => "remote command exited without exit status or exit signal".to_string(),
    }
}
