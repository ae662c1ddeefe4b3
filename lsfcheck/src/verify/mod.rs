//! Node verification suite: one procedure per fact class.
//!
//! Every procedure has the same shape. Inputs are checked first and an empty
//! host list fails before any remote call. Then each host gets one or more
//! commands resolved for its OS, the output is compared with what we expect,
//! and the first mismatch is returned with both sides in the error.
//!
//! Worker nodes are usually only reachable from inside the cluster, so most
//! procedures take a session to a management or login node and reach the
//! target through a [`Node::Hop`].

mod console;
mod daemons;
mod dns;
mod identity;
mod keys;
mod ldap;
mod network;
mod storage;
mod tools;

pub use console::{check_app_center, check_novnc};
pub use daemons::{BctrldAction, check_daemons_status, control_bctrld, reboot, restart_daemons};
pub use dns::{check_dns, check_ptr_records, ptr_host_names};
pub use identity::{
    check_bhosts_response, check_cluster_id, check_hyperthreading, check_lsf_version,
    check_management_node_count, check_master_name, check_reservation_id,
};
pub use keys::{authorized_key_paths, check_compute_keys, check_management_keys};
pub use ldap::{add_ldap_user, check_ldap_client, check_ldap_server, ldap_base_dn};
pub use network::{check_ip_route, check_mtu};
pub use storage::{check_file_mounts, check_file_mounts_here};
pub use tools::{
    check_login_connectivity, check_lsf_commands, check_lsf_commands_as_user, check_oneapi,
};

use crate::executor::{CommandExecutor, on_host};
use crate::markers::{self, cmd};
use crate::parser::{self, OsFamily};
use crate::{Error, Result};

/// Cluster node roles. Each has its own profile and expected layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Management,
    Login,
    Compute,
}

impl Role {
    /// Prefix that puts the scheduler binaries on `PATH` for this role.
    pub fn profile(self) -> &'static str {
        match self {
            Role::Management => "",
            Role::Login => markers::LOGIN_NODE_PROFILE,
            Role::Compute => markers::COMPUTE_NODE_PROFILE,
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Role::Management => "management",
            Role::Login => "login",
            Role::Compute => "compute",
        })
    }
}

/// Where a command runs relative to the session executing it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Node<'a> {
    /// The host the session itself is connected to.
    Session,
    /// Another host, reached with `ssh <ip>` from the session host.
    Hop(&'a str),
}

impl Node<'_> {
    pub fn command(self, command: &str) -> String {
        match self {
            Node::Session => command.to_string(),
            Node::Hop(ip) => on_host(ip, command),
        }
    }
}

impl std::fmt::Display for Node<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Node::Session => f.write_str("session host"),
            Node::Hop(ip) => write!(f, "node {ip}"),
        }
    }
}

pub(crate) async fn run<E: CommandExecutor>(
    session: &E,
    node: Node<'_>,
    command: &str,
) -> Result<String> {
    session
        .execute(&node.command(command))
        .await
        .map_err(|e| e.context(format!("failed to run '{command}' on {node}")))
}

pub(crate) fn require_nodes(ips: &[String], what: &'static str) -> Result<()> {
    if ips.is_empty() {
        return Err(Error::EmptyInput { what });
    }
    Ok(())
}

/// Fails with both sides of the comparison when `expected` is not in `output`.
pub(crate) fn ensure_contains(fact: impl Into<String>, output: &str, expected: &str) -> Result<()> {
    if output.contains(expected) {
        return Ok(());
    }
    Err(Error::mismatch(
        fact,
        format!("output containing '{expected}'"),
        output.trim(),
    ))
}

/// Reads `/etc/os-release` on `node` and classifies its `NAME`.
pub async fn os_family<E: CommandExecutor>(session: &E, node: Node<'_>) -> Result<OsFamily> {
    let release = run(session, node, cmd::OS_RELEASE).await?;
    let name = parser::property_value(release.trim(), markers::OS_RELEASE_NAME_KEY)
        .map_err(|e| e.context(format!("unable to determine OS of {node}")))?;
    let family = OsFamily::from_os_name(&name);
    tracing::info!(%node, os = %name, ?family, "operating system");
    Ok(family)
}
