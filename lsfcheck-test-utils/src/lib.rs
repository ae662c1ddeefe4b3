//! Testing utilities for lsfcheck
//!
//! Everything a test needs to run checks and whole scenarios without a
//! cluster:
//! - canned command output of a healthy cluster in [`fixtures`]
//! - [`ClusterScript`], a scripted cluster that tests break one rule at a time
//! - [`test_config`], the configuration matching that cluster
//! - [`CommandOutput`] for driving the `lsfcheck` binary

pub mod cli;
pub mod cluster;
pub mod fixtures;

pub use cli::CommandOutput;
pub use cluster::{ClusterScript, healthy_cluster, test_config, write_transcript};
