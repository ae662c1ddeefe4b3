//! Running the `lsfcheck` binary from integration tests.

use std::path::Path;
use std::process::Command;

/// Output from an lsfcheck CLI invocation
#[derive(Debug)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
    pub success: bool,
    pub exit_code: Option<i32>,
}

impl CommandOutput {
    /// Runs `binary` with `args`, colours off and no user config directory
    /// in the way.
    pub fn run(binary: &Path, args: &[&str]) -> Self {
        let home = tempfile::tempdir().expect("failed to create home directory");
        let output = Command::new(binary)
            .args(args)
            .env("NO_COLOR", "1")
            .env("HOME", home.path())
            .env("XDG_CONFIG_HOME", home.path().join(".config"))
            .env_remove("RUST_LOG")
            .env_remove("SSH_FILE_PATH")
            .env_remove("CLUSTER_ID")
            .env_remove("ZONE")
            .env_remove("RESERVATION_ID")
            .output()
            .expect("failed to spawn lsfcheck");
        Self::from_output(output)
    }

    pub fn from_output(output: std::process::Output) -> Self {
        Self {
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            success: output.status.success(),
            exit_code: output.status.code(),
        }
    }

    /// Assert command succeeded
    pub fn expect_success(self) -> Result<Self, Box<dyn std::error::Error>> {
        if self.success {
            Ok(self)
        } else {
            Err(format!(
                "Command failed with exit code {:?}\nstdout: {}\nstderr: {}",
                self.exit_code, self.stdout, self.stderr
            )
            .into())
        }
    }

    /// Assert command failed
    pub fn expect_failure(self) -> Result<Self, Box<dyn std::error::Error>> {
        if !self.success {
            Ok(self)
        } else {
            Err(format!(
                "Command unexpectedly succeeded\nstdout: {}\nstderr: {}",
                self.stdout, self.stderr
            )
            .into())
        }
    }

    pub fn contains(&self, text: &str) -> bool {
        self.stdout.contains(text) || self.stderr.contains(text)
    }

    /// Assert output contains expected text
    pub fn assert_contains(&self, text: &str) -> Result<(), Box<dyn std::error::Error>> {
        if self.contains(text) {
            Ok(())
        } else {
            Err(format!(
                "Output does not contain '{text}'\nstdout: {}\nstderr: {}",
                self.stdout, self.stderr
            )
            .into())
        }
    }
}
