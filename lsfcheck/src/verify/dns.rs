use super::{Node, os_family, require_nodes, run};
use crate::executor::CommandExecutor;
use crate::markers::{self, cmd};
use crate::parser::{self, OsFamily};
use crate::{Error, Result};

/// The configured DNS domain must show up in each node's resolver setup.
///
/// On RHEL `/etc/resolv.conf` is only authoritative when NetworkManager did
/// not write it, so a missing domain there fails only in a generated file.
pub async fn check_dns<E: CommandExecutor>(session: &E, ips: &[String], domain: &str) -> Result<()> {
    require_nodes(ips, "node IPs")?;
    if domain.is_empty() {
        return Err(Error::EmptyInput { what: "DNS domain" });
    }
    for ip in ips {
        let node = Node::Hop(ip);
        let family = os_family(session, node).await?;
        let output = run(session, node, family.dns_command()).await?;
        let has_domain = output.contains(domain);
        let failed = match family {
            OsFamily::RedHat => {
                !has_domain && output.contains(markers::NETWORK_MANAGER_GENERATED)
            }
            _ => !has_domain,
        };
        if failed {
            return Err(Error::mismatch(
                format!("DNS domain on {node}"),
                format!("output containing '{domain}'"),
                output.trim(),
            ));
        }
        tracing::info!(ip, domain, "DNS configuration verified");
    }
    Ok(())
}

/// Fully qualified names of the management and login hosts known to LSF.
pub async fn ptr_host_names<E: CommandExecutor>(session: &E, domain: &str) -> Result<Vec<String>> {
    let output = run(session, Node::Session, cmd::PTR_HOSTS).await?;
    let hosts: Vec<String> = parser::lines(&output)
        .iter()
        .map(|h| parser::with_domain(h, domain))
        .collect();
    if hosts.is_empty() {
        return Err(Error::not_found("management or login hosts in lshosts", output));
    }
    Ok(hosts)
}

/// `nslookup` from the session host must resolve every name in `hosts`.
pub async fn check_ptr_records<E: CommandExecutor>(session: &E, hosts: &[String]) -> Result<()> {
    require_nodes(hosts, "host names")?;
    for host in hosts {
        // nslookup exits non-zero on NXDOMAIN, with the answer in the error
        let output = match run(session, Node::Session, &format!("nslookup {host}")).await {
            Ok(output) => output,
            Err(e) if e.to_string().contains(markers::PTR_NOT_FOUND) => e.to_string(),
            Err(e) => return Err(e),
        };
        if output.contains(markers::PTR_NOT_FOUND) {
            return Err(Error::not_found(format!("PTR record for {host}"), output));
        }
        tracing::info!(host, "PTR record verified");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::{Reply, ScriptedExecutor};

    const DOMAIN: &str = "hpc.local";

    fn ips() -> Vec<String> {
        vec!["10.0.0.4".to_string()]
    }

    #[tokio::test]
    async fn test_ubuntu_uses_resolvectl() {
        let exec = ScriptedExecutor::new()
            .on("cat /etc/os-release", Reply::ok("NAME=\"Ubuntu\""))
            .on("resolvectl status", Reply::ok("DNS Domain: hpc.local"));
        check_dns(&exec, &ips(), DOMAIN).await.unwrap();

        let exec = exec.on("resolvectl status", Reply::ok("DNS Domain: other"));
        assert!(check_dns(&exec, &ips(), DOMAIN).await.is_err());
    }

    #[tokio::test]
    async fn test_rhel_only_fails_on_network_manager_file() {
        let exec = ScriptedExecutor::new()
            .on("cat /etc/os-release", Reply::ok("NAME=\"Red Hat Enterprise Linux\""))
            .on("cat /etc/resolv.conf", Reply::ok("nameserver 161.26.0.10\n"));
        check_dns(&exec, &ips(), DOMAIN).await.unwrap();

        let exec = exec.on(
            "cat /etc/resolv.conf",
            Reply::ok("# Generated by NetworkManager\nnameserver 161.26.0.10\n"),
        );
        let err = check_dns(&exec, &ips(), DOMAIN).await.unwrap_err();
        assert!(err.to_string().starts_with("DNS domain on node 10.0.0.4 mismatch"));
    }

    #[tokio::test]
    async fn test_ptr_records() {
        let exec = ScriptedExecutor::new()
            .on("lshosts -w", Reply::ok("demo-mgmt-1\ndemo-login-1.hpc.local\n"))
            .on("nslookup demo-mgmt-1.hpc.local", Reply::ok("name = demo-mgmt-1.hpc.local"))
            .on(
                "nslookup demo-login-1.hpc.local",
                Reply::ok("** server can't find demo-login-1.hpc.local: NXDOMAIN"),
            );
        let hosts = ptr_host_names(&exec, DOMAIN).await.unwrap();
        assert_eq!(hosts, vec!["demo-mgmt-1.hpc.local", "demo-login-1.hpc.local"]);
        let err = check_ptr_records(&exec, &hosts).await.unwrap_err();
        assert!(err.to_string().starts_with("PTR record for demo-login-1.hpc.local not found"));
    }

    #[tokio::test]
    async fn test_failed_nslookup_reports_missing_record() {
        let exec = ScriptedExecutor::new().on(
            "nslookup demo-login-1.hpc.local",
            Reply::fail("Server:\t\t10.241.0.4\n** server can't find demo-login-1.hpc.local: NXDOMAIN"),
        );
        let hosts = vec!["demo-login-1.hpc.local".to_string()];
        let err = check_ptr_records(&exec, &hosts).await.unwrap_err();
        assert!(matches!(err, Error::NotFound { .. }), "{err}");
        assert!(err.to_string().contains("NXDOMAIN"));

        let exec = ScriptedExecutor::new().on("nslookup", Reply::fail("exit status 127"));
        assert!(check_ptr_records(&exec, &hosts).await.unwrap_err().is_transport());
    }
}
