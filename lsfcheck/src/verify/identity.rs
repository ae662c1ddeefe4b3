use super::{Node, require_nodes, run};
use crate::executor::CommandExecutor;
use crate::markers::{self, cmd};
use crate::{Error, Result, parser};

async fn lsid<E: CommandExecutor>(session: &E) -> Result<String> {
    let command = format!("{}{}", markers::LOGIN_NODE_PROFILE, cmd::LSID);
    run(session, Node::Session, &command).await
}

/// `lsid` must report `expected` as the cluster name.
pub async fn check_cluster_id<E: CommandExecutor>(session: &E, expected: &str) -> Result<()> {
    let output = lsid(session).await?;
    if !output.contains(&format!("{} {expected}", markers::CLUSTER_NAME_PREFIX)) {
        let actual = parser::cluster_name(&output)?;
        return Err(Error::mismatch("cluster ID", expected, actual));
    }
    tracing::info!(cluster_id = expected, "cluster ID is set as expected");
    Ok(())
}

/// The master must be `<prefix>-mgmt-1`.
pub async fn check_master_name<E: CommandExecutor>(session: &E, cluster_prefix: &str) -> Result<()> {
    let expected = format!("{cluster_prefix}{}", markers::MASTER_NAME_SUFFIX);
    let output = lsid(session).await?;
    if !output.contains(&format!("{} {expected}", markers::MASTER_NAME_PREFIX)) {
        let actual = parser::master_name(&output)?;
        return Err(Error::mismatch("master name", expected, actual));
    }
    tracing::info!(master = %expected, "master name is set as expected");
    Ok(())
}

pub async fn check_lsf_version<E: CommandExecutor>(session: &E, expected: &str) -> Result<()> {
    let output = lsid(session).await?;
    if !output.contains(&format!("{} {expected}", markers::LSF_VERSION_PREFIX)) {
        let actual = parser::lsf_version(&output)?;
        return Err(Error::mismatch("LSF version", expected, actual));
    }
    tracing::info!(version = expected, "LSF version is set as expected");
    Ok(())
}

/// The resource connector config has to mention the reservation.
pub async fn check_reservation_id<E: CommandExecutor>(session: &E, expected: &str) -> Result<()> {
    let command = format!("cat {}", markers::RESERVATION_CONFIG);
    let output = run(session, Node::Session, &command).await?;
    if !output.contains(expected) {
        return Err(Error::not_found(format!("reservation ID {expected}"), output));
    }
    tracing::info!(reservation_id = expected, "reservation ID verified");
    Ok(())
}

pub async fn check_management_node_count<E: CommandExecutor>(
    session: &E,
    expected: usize,
) -> Result<()> {
    let output = run(session, Node::Session, cmd::MGMT_COUNT).await?;
    let actual = output.trim();
    if actual != expected.to_string() {
        return Err(Error::mismatch("management node count", expected, actual));
    }
    tracing::info!(count = expected, "management node count is as expected");
    Ok(())
}

/// `bhosts -w` must answer with at least its header row.
pub async fn check_bhosts_response<E: CommandExecutor>(session: &E) -> Result<()> {
    let output = run(session, Node::Session, cmd::BHOSTS).await?;
    let trimmed = output.trim();
    if trimmed.is_empty() || !trimmed.contains(markers::BHOSTS_HEADER) {
        return Err(Error::not_found("bhosts header", output));
    }
    tracing::info!(bhosts = %trimmed, "bhosts responded");
    Ok(())
}

/// Hyperthreading is on unless `lscpu` lists off-line CPUs.
pub async fn check_hyperthreading<E: CommandExecutor>(
    session: &E,
    ips: &[String],
    expected: bool,
) -> Result<()> {
    require_nodes(ips, "node IPs")?;
    for ip in ips {
        let node = Node::Hop(ip);
        let cpu_info = run(session, node, cmd::LSCPU).await?;
        let actual = parser::hyperthreading_enabled(&cpu_info);
        tracing::info!(ip, enabled = actual, "hyperthreading");
        if actual != expected {
            return Err(Error::mismatch(
                format!("hyperthreading status on {node}"),
                expected,
                actual,
            ));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::{Reply, ScriptedExecutor};

    const LSID: &str = "IBM Spectrum LSF Standard 10.1.0.14, Jan 12 2023\n\
        Copyright International Business Machines Corp. 1992, 2016.\n\n\
        My cluster name is hpc-cluster\n\
        My master name is demo-mgmt-1\n";

    fn lsid_exec() -> ScriptedExecutor {
        ScriptedExecutor::new().on("lsid", Reply::ok(LSID))
    }

    #[tokio::test]
    async fn test_identity_matches() {
        let exec = lsid_exec();
        check_cluster_id(&exec, "hpc-cluster").await.unwrap();
        check_master_name(&exec, "demo").await.unwrap();
        check_lsf_version(&exec, "10.1.0.14").await.unwrap();
        assert!(exec.calls()[0].starts_with(markers::LOGIN_NODE_PROFILE));
    }

    #[tokio::test]
    async fn test_identity_mismatch_reports_actual() {
        let exec = lsid_exec();
        let err = check_cluster_id(&exec, "other").await.unwrap_err();
        assert_eq!(
            err.to_string(),
            "cluster ID mismatch: expected other, but found hpc-cluster"
        );
        let err = check_master_name(&exec, "prod").await.unwrap_err();
        assert!(err.to_string().contains("expected prod-mgmt-1, but found demo-mgmt-1"));
        let err = check_lsf_version(&exec, "10.1.0.15").await.unwrap_err();
        assert!(err.to_string().contains("but found 10.1.0.14"));
    }

    #[tokio::test]
    async fn test_missing_delimiter_is_a_parse_error() {
        let exec = ScriptedExecutor::new().on("lsid", Reply::ok("lsid: command not found"));
        let err = check_cluster_id(&exec, "hpc-cluster").await.unwrap_err();
        assert!(matches!(err, Error::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_management_count_and_bhosts() {
        let exec = ScriptedExecutor::new()
            .on("grep 'mgmt' | wc -l", Reply::ok("3\n"))
            .on("bhosts -w", Reply::ok("HOST_NAME STATUS\ndemo-mgmt-1-10-0-0-4 ok\n"));
        check_management_node_count(&exec, 3).await.unwrap();
        assert!(check_management_node_count(&exec, 2).await.is_err());
        check_bhosts_response(&exec).await.unwrap();
    }

    #[tokio::test]
    async fn test_offline_cpus_mean_hyperthreading_is_off() {
        let exec = ScriptedExecutor::new().on(
            "lscpu",
            Reply::ok("CPU(s): 8\nOn-line CPU(s) list: 0,1,3,5,7\nOff-line CPU(s) list: 2,4,6\n"),
        );
        let ips = vec!["10.0.0.5".to_string()];
        let err = check_hyperthreading(&exec, &ips, true).await.unwrap_err();
        assert_eq!(
            err.to_string(),
            "hyperthreading status on node 10.0.0.5 mismatch: expected true, but found false"
        );
        check_hyperthreading(&exec, &ips, false).await.unwrap();
    }

    #[tokio::test]
    async fn test_reservation_id() {
        let exec = ScriptedExecutor::new().on(
            "ibmcloudhpc_config.json",
            Reply::ok(r#"{"IBMCLOUDHPC_RESERVATION_ID": "res-123"}"#),
        );
        check_reservation_id(&exec, "res-123").await.unwrap();
        assert!(check_reservation_id(&exec, "res-999").await.is_err());
    }
}
