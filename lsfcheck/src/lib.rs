#![deny(unused_extern_crates)]
#![deny(unused_crate_dependencies)]
#![deny(unsafe_code)]

use clap as _;
use clap_verbosity_flag as _;
use eyre as _;
use tracing_subscriber as _;

#[cfg(test)]
use lsfcheck_test_utils as _;

pub mod config;
pub mod discovery;
mod error;
pub mod executor;
pub mod markers;
pub mod orchestrate;
pub mod parser;
pub mod poller;
pub mod recorder;
pub mod topology;
pub mod verify;

pub use config::{Config, SshConfig, Timing, validate_required_env};
pub use error::{Error, Result};
pub use executor::{CommandExecutor, Connector, RetryPolicy, Retrying};
pub use orchestrate::{Scenario, run_scenario};
pub use recorder::{CheckRecord, ClusterFact, Report};
pub use topology::{ExpectedTopology, LdapSettings, verify_provisioning_outputs};
