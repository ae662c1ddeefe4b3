//! Pass/fail bookkeeping for a verification run.

use crate::{Error, Result};
use serde::Serialize;

/// One expected-vs-actual comparison.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClusterFact {
    pub name: String,
    pub expected: String,
    pub actual: String,
    pub matched: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct CheckRecord {
    pub check: String,
    pub passed: bool,
    pub message: Option<String>,
    pub fact: Option<ClusterFact>,
}

/// Collects every check outcome of a scenario and logs each one as it lands.
#[derive(Debug, Default, Serialize)]
pub struct Report {
    records: Vec<CheckRecord>,
}

impl Report {
    pub fn new() -> Self {
        Self::default()
    }

    /// Logs and stores the outcome of `check`, passing the result through.
    pub fn record<T>(&mut self, check: &str, result: Result<T>) -> Result<T> {
        match &result {
            Ok(_) => {
                tracing::info!(check, "{check} verification successful");
                self.records.push(CheckRecord {
                    check: check.to_string(),
                    passed: true,
                    message: None,
                    fact: None,
                });
            }
            Err(e) => {
                tracing::error!(check, error = %e, "{check} verification failed: {e}");
                self.records.push(CheckRecord {
                    check: check.to_string(),
                    passed: false,
                    message: Some(e.to_string()),
                    fact: fact_of(e),
                });
            }
        }
        result
    }

    pub fn records(&self) -> &[CheckRecord] {
        &self.records
    }

    pub fn passed(&self) -> usize {
        self.records.iter().filter(|r| r.passed).count()
    }

    pub fn failed(&self) -> usize {
        self.records.len() - self.passed()
    }

    pub fn all_passed(&self) -> bool {
        self.failed() == 0
    }

    pub fn get(&self, check: &str) -> Option<&CheckRecord> {
        self.records.iter().find(|r| r.check == check)
    }

    /// Human readable PASS/FAIL table.
    pub fn summary(&self) -> String {
        use colored::Colorize;

        let mut out = String::new();
        for r in &self.records {
            let status = if r.passed {
                "PASS".green().bold()
            } else {
                "FAIL".red().bold()
            };
            out.push_str(&format!("[{status}] {}\n", r.check));
            if let Some(m) = &r.message {
                for line in m.lines() {
                    out.push_str(&format!("       {}\n", line.dimmed()));
                }
            }
        }
        out.push_str(&format!(
            "{} passed, {} failed\n",
            self.passed().to_string().green(),
            self.failed().to_string().red()
        ));
        out
    }
}

fn fact_of(e: &Error) -> Option<ClusterFact> {
    match e.root() {
        Error::Mismatch {
            fact,
            expected,
            actual,
        } => Some(ClusterFact {
            name: fact.clone(),
            expected: expected.clone(),
            actual: actual.clone(),
            matched: false,
        }),
        _ => None,
    }
}
