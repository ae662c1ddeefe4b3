use super::{Node, Role, require_nodes, run};
use crate::executor::CommandExecutor;
use crate::markers::{self, cmd};
use crate::{Error, Result, parser};

/// Mount layout of every node in `ips`, checked through the session host.
///
/// Non-login nodes need all shared mounts, the LSF share directories and a
/// writable round trip in each non-root mount. Login nodes only need the
/// LSF share.
pub async fn check_file_mounts<E: CommandExecutor>(
    session: &E,
    ips: &[String],
    role: Role,
) -> Result<()> {
    require_nodes(ips, "node IPs")?;
    for ip in ips {
        check_mounts_on(session, Node::Hop(ip), role).await?;
    }
    tracing::info!(%role, "file mount check completed");
    Ok(())
}

/// Same as [`check_file_mounts`] for the host the session is logged into,
/// used for sessions opened as a directory user.
pub async fn check_file_mounts_here<E: CommandExecutor>(session: &E, role: Role) -> Result<()> {
    let hostname = run(session, Node::Session, cmd::HOSTNAME).await?;
    tracing::info!(hostname = %hostname.trim(), %role, "checking mounts");
    check_mounts_on(session, Node::Session, role).await
}

async fn check_mounts_on<E: CommandExecutor>(session: &E, node: Node<'_>, role: Role) -> Result<()> {
    let df = run(session, node, cmd::DF).await?;
    let df = df.trim();

    let expected: &[&str] = match role {
        Role::Login => &[markers::LSF_SHARE],
        _ => &markers::COMPUTE_MOUNTS,
    };
    if let Some(missing) = parser::first_missing(df, expected) {
        return Err(Error::not_found(format!("mount {missing} on {node}"), df));
    }
    tracing::info!(%node, mounts = ?expected, "file systems exist");

    check_share_directories(session, node).await?;

    if role != Role::Login {
        for mount in &markers::COMPUTE_MOUNTS[1..] {
            sentinel_round_trip(session, node, mount).await?;
        }
    }
    Ok(())
}

async fn check_share_directories<E: CommandExecutor>(session: &E, node: Node<'_>) -> Result<()> {
    let listing = run(session, node, cmd::LIST_LSF_SHARE).await?;
    if let Some(missing) = parser::first_missing_field(&listing, &markers::LSF_SHARE_DIRS) {
        return Err(Error::mismatch(
            format!("directories in {} on {node}", markers::LSF_SHARE),
            markers::LSF_SHARE_DIRS.join(", "),
            format!("{} (missing {missing})", parser::lines(&listing).join(" ")),
        ));
    }
    tracing::info!(%node, "LSF share directories exist");
    Ok(())
}

/// Writes, reads back and deletes the sentinel file in `dir`.
///
/// Once the file is written it is always deleted, whatever the read found.
/// A failed delete is reported even when the read already failed.
async fn sentinel_round_trip<E: CommandExecutor>(
    session: &E,
    node: Node<'_>,
    dir: &str,
) -> Result<()> {
    let exists = run(
        session,
        node,
        &format!("test -d {dir} && echo 'Directory Exist' || echo 'Directory Not Exist'"),
    )
    .await?;
    if !exists.contains("Directory Exist") || exists.contains("Not Exist") {
        return Err(Error::not_found(format!("directory {dir} on {node}"), exists));
    }

    let file = markers::SENTINEL_FILE;
    run(
        session,
        node,
        &format!("cd {dir} && echo '{}' > {file}", markers::SENTINEL_TEXT),
    )
    .await
    .map_err(|e| e.context(format!("failed to create {file} in {dir}")))?;

    let read = run(session, node, &format!("cd {dir} && cat {file}")).await;
    let delete = run(session, node, &format!("cd {dir} && rm -rf {file}")).await;

    let checked = read.and_then(|content| {
        if content.contains(markers::SENTINEL_TEXT) {
            Ok(())
        } else {
            Err(Error::mismatch(
                format!("{file} content in {dir} on {node}"),
                markers::SENTINEL_TEXT,
                content.trim(),
            ))
        }
    });

    match (checked, delete) {
        (Ok(()), Ok(_)) => {
            tracing::info!(%node, dir, "sentinel file round trip succeeded");
            Ok(())
        }
        (Ok(()), Err(e)) => Err(e.context(format!("failed to delete {file} in {dir}"))),
        (Err(e), Ok(_)) => Err(e),
        (Err(e), Err(cleanup)) => Err(cleanup.context(format!(
            "failed to delete {file} in {dir} after: {e}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::{Reply, ScriptedExecutor};

    const DF: &str = "Filesystem      Size  Used Avail Use% Mounted on\n\
        /dev/vda1        99G  4.1G   95G   5% /\n\
        10.241.0.4:/lsf 100G  1.0G   99G   1% /mnt/lsf\n\
        10.241.0.5:/tools 100G  1.0G  99G  1% /mnt/vpcstorage/tools\n\
        10.241.0.6:/data 100G  1.0G   99G  1% /mnt/vpcstorage/data\n";
    const SHARE: &str = "10.1  conf  config_done  das_staging_area  data  gui-conf  gui-logs  log  repository-path  work";

    fn healthy() -> ScriptedExecutor {
        ScriptedExecutor::new()
            .on("df -h", Reply::ok(DF))
            .on("cd /mnt/lsf && ls", Reply::ok(SHARE))
            .on("test -d", Reply::ok("Directory Exist"))
            .on("echo 'Welcome", Reply::ok(""))
            .on("cat testOne.txt", Reply::ok("Welcome to the ibm cloud HPC\n"))
            .on("rm -rf testOne.txt", Reply::ok(""))
    }

    fn ips() -> Vec<String> {
        vec!["10.0.0.5".to_string()]
    }

    #[tokio::test]
    async fn test_compute_mounts_and_round_trip() {
        let exec = healthy();
        check_file_mounts(&exec, &ips(), Role::Compute).await.unwrap();
        assert_eq!(exec.count_calls("rm -rf testOne.txt"), 2);
        assert!(exec.calls().iter().all(|c| c.starts_with("ssh 10.0.0.5 ")));
    }

    #[tokio::test]
    async fn test_login_only_needs_lsf_share() {
        let exec = ScriptedExecutor::new()
            .on("df -h", Reply::ok("10.241.0.4:/lsf 100G 1.0G 99G 1% /mnt/lsf"))
            .on("cd /mnt/lsf && ls", Reply::ok(SHARE));
        check_file_mounts(&exec, &ips(), Role::Login).await.unwrap();
        assert_eq!(exec.count_calls("testOne.txt"), 0);
    }

    #[tokio::test]
    async fn test_missing_mount_is_named() {
        let df = DF.replace("/mnt/vpcstorage/data", "/mnt/other");
        let exec = healthy().on("df -h", Reply::ok(df));
        let err = check_file_mounts(&exec, &ips(), Role::Compute)
            .await
            .unwrap_err();
        assert!(err.to_string().starts_with("mount /mnt/vpcstorage/data on node 10.0.0.5 not found"));
    }

    #[tokio::test]
    async fn test_missing_share_directory() {
        let exec = healthy().on("cd /mnt/lsf && ls", Reply::ok("10.1 conf data log work"));
        let err = check_file_mounts(&exec, &ips(), Role::Management)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("missing config_done"));
    }

    #[tokio::test]
    async fn test_delete_runs_even_when_read_fails() {
        let exec = healthy().on("cat testOne.txt", Reply::fail("Permission denied"));
        let err = check_file_mounts(&exec, &ips(), Role::Compute)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("cat testOne.txt"));
        assert_eq!(exec.count_calls("rm -rf testOne.txt"), 1);
    }

    #[tokio::test]
    async fn test_delete_runs_after_content_mismatch_and_cleanup_failure_is_reported() {
        let exec = healthy()
            .on("cat testOne.txt", Reply::ok("garbage"))
            .on("rm -rf testOne.txt", Reply::fail("Read-only file system"));
        let err = check_file_mounts(&exec, &ips(), Role::Compute)
            .await
            .unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("failed to delete testOne.txt"));
        assert!(msg.contains("garbage"));
        assert!(msg.contains("Read-only file system"));
    }

    #[tokio::test]
    async fn test_mounts_here_run_without_hop() {
        let exec = healthy().on("hostname", Reply::ok("demo-mgmt-1"));
        check_file_mounts_here(&exec, Role::Management).await.unwrap();
        assert!(exec.calls().iter().all(|c| !c.starts_with("ssh ")));
    }
}
