use super::{Node, os_family, require_nodes, run};
use crate::executor::CommandExecutor;
use crate::markers::{self, cmd};
use crate::{Error, Result, parser};

/// Every `authorized_keys` file on `node`, one path per entry.
pub async fn authorized_key_paths<E: CommandExecutor>(
    session: &E,
    node: Node<'_>,
) -> Result<Vec<String>> {
    let output = run(session, node, cmd::FIND_AUTHORIZED_KEYS).await?;
    let paths = parser::lines(&output);
    tracing::debug!(%node, ?paths, "authorized_keys files");
    Ok(paths)
}

fn expected_key_count(table: &[(&str, usize)], path: &str) -> usize {
    table
        .iter()
        .find(|(p, _)| *p == path)
        .map(|(_, n)| *n)
        .unwrap_or(0)
}

async fn check_key_count<E: CommandExecutor>(
    session: &E,
    node: Node<'_>,
    path: &str,
    expected: usize,
) -> Result<()> {
    let content = run(session, node, &format!("sudo su -l root -c 'cat {path}'")).await?;
    let actual = parser::count_occurrences(&content, markers::SSH_RSA_MARKER);
    if actual != expected {
        return Err(Error::mismatch(
            format!("ssh-rsa key count in {path} on {node}"),
            expected,
            actual,
        ));
    }
    tracing::info!(%node, path, count = actual, "authorized keys match");
    Ok(())
}

/// Key inventory of the management node the session is connected to, which
/// was provisioned with `ssh_keys` user keys. Any `authorized_keys` file
/// outside the expected set must hold no keys.
pub async fn check_management_keys<E: CommandExecutor>(session: &E, ssh_keys: usize) -> Result<()> {
    let table = markers::management_key_counts(ssh_keys);
    let node = Node::Session;
    for path in authorized_key_paths(session, node).await? {
        check_key_count(session, node, &path, expected_key_count(&table, &path)).await?;
    }
    Ok(())
}

/// Key inventory of each compute node. Ubuntu images carry one more
/// `authorized_keys` file than the others; only the expected files are read.
pub async fn check_compute_keys<E: CommandExecutor>(session: &E, ips: &[String]) -> Result<()> {
    require_nodes(ips, "compute node IPs")?;
    for ip in ips {
        let node = Node::Hop(ip);
        let family = os_family(session, node).await?;
        let paths = authorized_key_paths(session, node).await?;
        if paths.len() != family.expected_compute_key_paths() {
            return Err(Error::mismatch(
                format!("authorized_keys file count on {node}"),
                family.expected_compute_key_paths(),
                format!("{} ({})", paths.len(), paths.join(", ")),
            ));
        }
        for (path, expected) in markers::COMPUTE_KEY_COUNTS {
            if !paths.iter().any(|p| p == path) {
                return Err(Error::not_found(format!("{path} on {node}"), paths.join("\n")));
            }
            check_key_count(session, node, path, expected).await?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::{Reply, ScriptedExecutor};

    const MGMT_PATHS: &str = "/home/vpcuser/.ssh/authorized_keys\n\
        /home/lsfadmin/.ssh/authorized_keys\n\
        /root/.ssh/authorized_keys\n";

    fn management() -> ScriptedExecutor {
        ScriptedExecutor::new()
            .on("find / -name authorized_keys", Reply::ok(MGMT_PATHS))
            .on("cat /home/vpcuser/.ssh/authorized_keys", Reply::ok("ssh-rsa AAAA user@a\n"))
            .on(
                "cat /home/lsfadmin/.ssh/authorized_keys",
                Reply::ok("ssh-rsa AAAA a\nssh-rsa BBBB b\n"),
            )
            .on(
                "cat /root/.ssh/authorized_keys",
                Reply::ok("no-port-forwarding ssh-rsa AAAA a\nssh-rsa CCCC c\n"),
            )
    }

    fn compute(paths: &str) -> ScriptedExecutor {
        ScriptedExecutor::new()
            .on("cat /etc/os-release", Reply::ok("NAME=\"Red Hat Enterprise Linux\""))
            .on("find / -name authorized_keys", Reply::ok(paths))
            .on("cat /home/lsfadmin/.ssh/authorized_keys", Reply::ok("ssh-rsa AAAA a\n"))
            .on("cat /root/.ssh/authorized_keys", Reply::ok(""))
            .on("cat /home/vpcuser/.ssh/authorized_keys", Reply::ok(""))
    }

    #[tokio::test]
    async fn test_management_keys() {
        let exec = management();
        check_management_keys(&exec, 1).await.unwrap();
        assert_eq!(exec.count_calls("sudo su -l root -c 'cat "), 3);
    }

    #[tokio::test]
    async fn test_management_key_count_mismatch() {
        let exec = management().on("cat /root/.ssh/authorized_keys", Reply::ok("ssh-rsa AAAA a\n"));
        let err = check_management_keys(&exec, 1).await.unwrap_err();
        assert_eq!(
            err.to_string(),
            "ssh-rsa key count in /root/.ssh/authorized_keys on session host mismatch: expected 2, but found 1"
        );
    }

    #[tokio::test]
    async fn test_management_counts_follow_provisioned_keys() {
        let exec = management()
            .on(
                "cat /home/vpcuser/.ssh/authorized_keys",
                Reply::ok("ssh-rsa AAAA a\nssh-rsa BBBB b\n"),
            )
            .on(
                "cat /home/lsfadmin/.ssh/authorized_keys",
                Reply::ok("ssh-rsa AAAA a\nssh-rsa BBBB b\nssh-rsa CCCC c\n"),
            )
            .on(
                "cat /root/.ssh/authorized_keys",
                Reply::ok("ssh-rsa AAAA a\nssh-rsa BBBB b\nssh-rsa CCCC c\n"),
            );
        check_management_keys(&exec, 2).await.unwrap();

        let err = check_management_keys(&exec, 1).await.unwrap_err();
        assert!(err.to_string().contains("expected 1, but found 2"), "{err}");
    }

    #[tokio::test]
    async fn test_unexpected_key_file_must_be_empty() {
        let exec = management()
            .on(
                "find / -name authorized_keys",
                Reply::ok(format!("{MGMT_PATHS}/home/intruder/.ssh/authorized_keys\n")),
            )
            .on("cat /home/intruder/.ssh/authorized_keys", Reply::ok("ssh-rsa XXXX x\n"));
        let err = check_management_keys(&exec, 1).await.unwrap_err();
        assert!(err.to_string().contains("/home/intruder"));
    }

    #[tokio::test]
    async fn test_compute_key_path_count_depends_on_os() {
        let paths = "/home/lsfadmin/.ssh/authorized_keys\n/root/.ssh/authorized_keys\n/home/vpcuser/.ssh/authorized_keys\n";
        let exec = compute(paths);
        let ips = vec!["10.0.0.9".to_string()];
        check_compute_keys(&exec, &ips).await.unwrap();

        let exec = exec.on("cat /etc/os-release", Reply::ok("NAME=\"Ubuntu\""));
        let err = check_compute_keys(&exec, &ips).await.unwrap_err();
        assert!(err.to_string().starts_with(
            "authorized_keys file count on node 10.0.0.9 mismatch: expected 4, but found 3"
        ));
    }

    #[tokio::test]
    async fn test_compute_keys_outside_lsfadmin_are_not_counted() {
        let paths = "/home/lsfadmin/.ssh/authorized_keys\n/root/.ssh/authorized_keys\n/home/vpcuser/.ssh/authorized_keys\n";
        let exec = compute(paths).on("cat /root/.ssh/authorized_keys", Reply::ok("ssh-rsa AAAA root\n"));
        check_compute_keys(&exec, &["10.0.0.9".to_string()]).await.unwrap();
        assert_eq!(exec.count_calls("sudo su -l root -c 'cat "), 1);
        assert_eq!(exec.count_calls("cat /root/.ssh/authorized_keys"), 0);
    }

    #[tokio::test]
    async fn test_compute_missing_lsfadmin_keys_fails() {
        let paths = "/root/.ssh/authorized_keys\n/home/vpcuser/.ssh/authorized_keys\n/home/ubuntu/.ssh/authorized_keys\n";
        let exec = compute(paths);
        let err = check_compute_keys(&exec, &["10.0.0.9".to_string()]).await.unwrap_err();
        assert!(matches!(err, Error::NotFound { .. }));
        assert!(
            err.to_string().contains("/home/lsfadmin/.ssh/authorized_keys on node 10.0.0.9"),
            "{err}"
        );
        assert_eq!(exec.count_calls("sudo su -l root -c 'cat "), 0);
    }
}
