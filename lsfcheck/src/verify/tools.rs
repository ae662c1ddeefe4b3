use super::{Node, Role, ensure_contains, require_nodes, run};
use crate::executor::CommandExecutor;
use crate::markers::{self, cmd};
use crate::{Error, Result};

/// Intel oneAPI is installed on every compute node and initialises cleanly.
pub async fn check_oneapi<E: CommandExecutor>(session: &E, ips: &[String]) -> Result<()> {
    require_nodes(ips, "compute node IPs")?;
    for ip in ips {
        let node = Node::Hop(ip);
        let listing = run(session, node, cmd::ONEAPI_LIST).await?;
        let entries: Vec<&str> = listing.split_whitespace().collect();
        if !markers::ONEAPI_FILES.iter().any(|f| entries.contains(f)) {
            return Err(Error::not_found(
                format!("setvars.sh or mpi in /opt/intel/oneapi on {node}"),
                listing,
            ));
        }

        // the init command already carries double quotes, so no on_host here
        let init = format!("ssh -t {ip} '{}'", cmd::ONEAPI_INIT);
        let output = run(session, Node::Session, &init).await?;
        ensure_contains(
            format!("oneAPI initialisation on {node}"),
            &output,
            markers::ONEAPI_INITIALIZED,
        )?;
        tracing::info!(ip, "Intel oneAPI verified");
    }
    Ok(())
}

async fn non_empty<E: CommandExecutor>(session: &E, role: Role, command: &str) -> Result<String> {
    let output = run(session, Node::Session, &format!("{}{command}", role.profile())).await?;
    if output.trim().is_empty() {
        return Err(Error::mismatch(
            format!("'{command}' output on {role} node"),
            "non-empty output",
            "nothing",
        ));
    }
    Ok(output)
}

/// The basic scheduler commands answer on a node of `role`.
pub async fn check_lsf_commands<E: CommandExecutor>(session: &E, role: Role) -> Result<()> {
    for command in markers::LSF_SMOKE_COMMANDS {
        non_empty(session, role, command).await?;
    }
    tracing::info!(%role, "LSF commands verified");
    Ok(())
}

/// Same smoke test for a session opened as directory user `user`.
pub async fn check_lsf_commands_as_user<E: CommandExecutor>(
    session: &E,
    user: &str,
    role: Role,
) -> Result<()> {
    for command in markers::LSF_USER_COMMANDS {
        let output = non_empty(session, role, command).await?;
        if command == cmd::WHOAMI {
            ensure_contains("current user", &output, user)?;
        }
    }
    tracing::info!(user, %role, "LSF commands verified as user");
    Ok(())
}

/// From the login node: management hosts answer `hostname` as management
/// nodes and every compute node accepts an SSH connection.
pub async fn check_login_connectivity<E: CommandExecutor>(
    login: &E,
    management_ips: &[String],
    compute_ips: &[String],
) -> Result<()> {
    require_nodes(management_ips, "management node IPs")?;
    require_nodes(compute_ips, "compute node IPs")?;

    for ip in management_ips {
        let hostname = run(login, Node::Session, &format!("ssh {ip} 'hostname'")).await?;
        ensure_contains(
            format!("hostname of {ip}"),
            &hostname,
            markers::MGMT_HOST_FRAGMENT,
        )?;
        tracing::info!(ip, hostname = %hostname.trim(), "management node reachable from login");
    }

    for ip in compute_ips {
        let command = format!(
            "ssh -o ConnectTimeout={} -q {ip} exit",
            markers::LOGIN_SSH_CONNECT_TIMEOUT_SECS
        );
        run(login, Node::Session, &command)
            .await
            .map_err(|e| e.context(format!("compute node {ip} unreachable from login node")))?;
        tracing::info!(ip, "compute node reachable from login");
    }

    tracing::debug!(management = ?management_ips, compute = ?compute_ips, "login connectivity verified");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::{Reply, ScriptedExecutor};

    #[tokio::test]
    async fn test_oneapi() {
        let exec = ScriptedExecutor::new()
            .on("ls /opt/intel/oneapi", Reply::ok("compiler  mpi  setvars.sh\n"))
            .on("setvars.sh\"'", Reply::ok(":: initializing oneAPI environment ...\n:: oneAPI environment initialized ::\n"));
        let ips = vec!["10.0.0.9".to_string()];
        check_oneapi(&exec, &ips).await.unwrap();
        assert!(exec.calls().contains(
            &"ssh -t 10.0.0.9 'sudo su -l root -c \". /opt/intel/oneapi/setvars.sh\"'".to_string()
        ));

        let exec = exec.on("ls /opt/intel/oneapi", Reply::ok("compiler\n"));
        let err = check_oneapi(&exec, &ips).await.unwrap_err();
        assert!(matches!(err, Error::NotFound { .. }));

        let exec = exec.on("ls /opt/intel/oneapi", Reply::ok("compiler  mpi\n"));
        check_oneapi(&exec, &ips).await.unwrap();
    }

    #[tokio::test]
    async fn test_lsf_commands_use_role_profile() {
        let exec = ScriptedExecutor::new()
            .on("lsid", Reply::ok("My cluster name is hpc-cluster"))
            .on("bjobs -a", Reply::ok("No job found"))
            .on("bhosts -w", Reply::ok("HOST_NAME STATUS"))
            .on("bqueues", Reply::ok("QUEUE_NAME PRIO"));
        check_lsf_commands(&exec, Role::Compute).await.unwrap();
        assert!(exec.calls().iter().all(|c| c.starts_with(markers::COMPUTE_NODE_PROFILE)));

        let exec = exec.on("bqueues", Reply::ok("  \n"));
        let err = check_lsf_commands(&exec, Role::Management).await.unwrap_err();
        assert_eq!(
            err.to_string(),
            "'bqueues' output on management node mismatch: expected non-empty output, but found nothing"
        );
    }

    #[tokio::test]
    async fn test_lsf_commands_as_user() {
        let exec = ScriptedExecutor::new()
            .on("whoami", Reply::ok("alice\n"))
            .on("lsid", Reply::ok("My cluster name is hpc-cluster"))
            .on("bhosts -w", Reply::ok("HOST_NAME STATUS"))
            .on("lshosts", Reply::ok("HOST_NAME type"));
        check_lsf_commands_as_user(&exec, "alice", Role::Login).await.unwrap();
        assert!(check_lsf_commands_as_user(&exec, "bob", Role::Login).await.is_err());
    }

    #[tokio::test]
    async fn test_login_connectivity() {
        let exec = ScriptedExecutor::new()
            .on("ssh 10.0.0.4 'hostname'", Reply::ok("demo-mgmt-1\n"))
            .on("-q 10.0.0.9 exit", Reply::ok(""))
            .on("-q 10.0.0.10 exit", Reply::fail("exit status 255"));
        let mgmt = vec!["10.0.0.4".to_string()];
        check_login_connectivity(&exec, &mgmt, &["10.0.0.9".to_string()])
            .await
            .unwrap();
        assert!(exec.calls().contains(&"ssh -o ConnectTimeout=12 -q 10.0.0.9 exit".to_string()));

        let err = check_login_connectivity(&exec, &mgmt, &["10.0.0.10".to_string()])
            .await
            .unwrap_err();
        assert!(err.to_string().starts_with("compute node 10.0.0.10 unreachable from login node"));

        let err = check_login_connectivity(&exec, &mgmt, &[]).await.unwrap_err();
        assert!(matches!(err, Error::EmptyInput { .. }));
    }
}
