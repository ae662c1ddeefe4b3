use crate::executor::RetryPolicy;
use crate::topology::ExpectedTopology;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Everything a verification run needs, injected instead of read from globals.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub ssh: SshConfig,
    pub timing: Timing,
    pub retry: RetryPolicy,
    pub expected: ExpectedTopology,
}

/// How to reach cluster nodes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SshConfig {
    /// Public bastion all private nodes are reached through.
    pub bastion_host: Option<String>,
    pub bastion_user: String,
    /// User on management, login and compute nodes.
    pub user: String,
    pub identity_file: Option<PathBuf>,
    pub port: u16,
    #[serde(with = "secs")]
    pub connect_timeout: Duration,
    /// Private IPs of the management nodes, first one is the master.
    pub management_ips: Vec<String>,
    pub login_ip: Option<String>,
    pub ldap_server_ip: Option<String>,
    /// User on the LDAP server, which is not an LSF node.
    pub ldap_server_user: String,
}

impl Default for SshConfig {
    fn default() -> Self {
        Self {
            bastion_host: None,
            bastion_user: "ubuntu".to_string(),
            user: "lsfadmin".to_string(),
            identity_file: None,
            port: 22,
            connect_timeout: Duration::from_secs(10),
            management_ips: Vec::new(),
            login_ip: None,
            ldap_server_ip: None,
            ldap_server_user: "ubuntu".to_string(),
        }
    }
}

/// Poll intervals, bounded waits and settle times.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Timing {
    #[serde(with = "secs")]
    pub job_poll_interval: Duration,
    /// Added to the sleep embedded in the job command to get the job deadline.
    #[serde(with = "secs")]
    pub job_timeout_base: Duration,
    #[serde(with = "secs")]
    pub drain_poll_interval: Duration,
    #[serde(with = "secs")]
    pub drain_timeout: Duration,
    #[serde(with = "secs")]
    pub daemon_settle: Duration,
    #[serde(with = "secs")]
    pub daemon_restart_poll: Duration,
    #[serde(with = "secs")]
    pub bctrld_stop_settle: Duration,
    #[serde(with = "secs")]
    pub bctrld_start_settle: Duration,
    #[serde(with = "secs")]
    pub reboot_settle: Duration,
}

impl Default for Timing {
    fn default() -> Self {
        Self {
            job_poll_interval: Duration::from_secs(50),
            job_timeout_base: Duration::from_secs(300),
            drain_poll_interval: Duration::from_secs(90),
            drain_timeout: Duration::from_secs(15 * 60),
            daemon_settle: Duration::from_secs(30),
            daemon_restart_poll: Duration::from_secs(5),
            bctrld_stop_settle: Duration::from_secs(30),
            bctrld_start_settle: Duration::from_secs(120),
            reboot_settle: Duration::from_secs(120),
        }
    }
}

impl Config {
    /// Load configuration from TOML file
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("failed to read {}: {e}", path.display())))?;
        toml::from_str(&content)
            .map_err(|e| Error::Config(format!("failed to parse {}: {e}", path.display())))
    }

    /// Save configuration to TOML file
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("failed to serialize config: {e}")))?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| Error::Config(format!("failed to create {}: {e}", parent.display())))?;
        }
        std::fs::write(path, content)
            .map_err(|e| Error::Config(format!("failed to write {}: {e}", path.display())))
    }

    /// `<config dir>/lsfcheck/config.toml` for the current user.
    pub fn default_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("", "", "lsfcheck")
            .map(|dirs| dirs.config_dir().join("config.toml"))
    }

    /// The node sessions are opened to for scheduler-level checks.
    pub fn master_ip(&self) -> Result<&str> {
        self.ssh
            .management_ips
            .first()
            .map(String::as_str)
            .ok_or(Error::EmptyInput {
                what: "management node IPs",
            })
    }
}

pub const REQUIRED_ENV: [&str; 5] = ["SSH_FILE_PATH", "SSH_KEY", "CLUSTER_ID", "ZONE", "RESERVATION_ID"];

/// All required inputs are present and non-empty, and the private key exists.
pub fn validate_required_env(vars: &HashMap<String, String>) -> Result<()> {
    for name in REQUIRED_ENV {
        match vars.get(name) {
            Some(v) if !v.is_empty() => {}
            _ => {
                return Err(Error::Config(format!(
                    "missing required environment variable: {name}"
                )));
            }
        }
    }

    let key = vars.get("SSH_FILE_PATH").map(String::as_str).unwrap_or_default();
    match std::fs::metadata(key) {
        Ok(_) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(Error::Config(format!(
            "SSH private key file '{key}' does not exist"
        ))),
        Err(e) => Err(Error::Config(format!(
            "error checking SSH private key file: {e}"
        ))),
    }
}

/// Serde helper for Duration as whole seconds.
pub(crate) mod secs {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        duration.as_secs().serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_scheduler_timings() {
        let t = Timing::default();
        assert_eq!(t.job_poll_interval, Duration::from_secs(50));
        assert_eq!(t.drain_timeout, Duration::from_secs(900));
        assert_eq!(RetryPolicy::default().max_attempts, 3);
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: Config = toml::from_str(
            r#"
[ssh]
bastion_host = "169.0.0.10"
management_ips = ["10.0.0.4", "10.0.0.5"]

[timing]
job_poll_interval = 1

[expected]
cluster_id = "hpc-cluster"
"#,
        )
        .unwrap();
        assert_eq!(config.ssh.user, "lsfadmin");
        assert_eq!(config.timing.job_poll_interval, Duration::from_secs(1));
        assert_eq!(config.timing.drain_poll_interval, Duration::from_secs(90));
        assert_eq!(config.expected.cluster_id, "hpc-cluster");
        assert_eq!(config.master_ip().unwrap(), "10.0.0.4");
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        let mut config = Config::default();
        config.ssh.login_ip = Some("10.0.0.9".to_string());
        config.save_to_file(&path).unwrap();
        assert_eq!(Config::load_from_file(&path).unwrap(), config);
    }

    #[test]
    fn test_master_ip_requires_management_nodes() {
        assert!(matches!(
            Config::default().master_ip(),
            Err(Error::EmptyInput { .. })
        ));
    }

    #[test]
    fn test_validate_required_env() {
        let key = tempfile::NamedTempFile::new().unwrap();
        let mut vars: HashMap<String, String> = REQUIRED_ENV
            .iter()
            .map(|k| (k.to_string(), "x".to_string()))
            .collect();
        vars.insert(
            "SSH_FILE_PATH".to_string(),
            key.path().display().to_string(),
        );
        assert!(validate_required_env(&vars).is_ok());

        vars.insert("ZONE".to_string(), String::new());
        let err = validate_required_env(&vars).unwrap_err();
        assert!(err.to_string().contains("ZONE"));

        vars.insert("ZONE".to_string(), "us-south-1".to_string());
        vars.insert("SSH_FILE_PATH".to_string(), "/no/such/key".to_string());
        let err = validate_required_env(&vars).unwrap_err();
        assert!(err.to_string().contains("does not exist"));
    }
}
