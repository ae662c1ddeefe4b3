use super::{Node, ensure_contains, os_family, require_nodes, run};
use crate::Result;
use crate::executor::CommandExecutor;
use crate::markers::{self, cmd};

/// Interface MTU must be 9000 on every node. Ubuntu is asked with
/// `ip addr show`, everything else with `ifconfig`.
pub async fn check_mtu<E: CommandExecutor>(session: &E, ips: &[String]) -> Result<()> {
    require_nodes(ips, "node IPs")?;
    for ip in ips {
        let node = Node::Hop(ip);
        let family = os_family(session, node).await?;
        let output = run(session, node, family.mtu_command()).await?;
        ensure_contains(format!("MTU on {node}"), &output, markers::MTU_9000)?;
        tracing::info!(ip, "MTU is set to 9000");
    }
    Ok(())
}

/// Routes must carry `mtu 9000` as well.
pub async fn check_ip_route<E: CommandExecutor>(session: &E, ips: &[String]) -> Result<()> {
    require_nodes(ips, "node IPs")?;
    for ip in ips {
        let node = Node::Hop(ip);
        let output = run(session, node, cmd::IP_ROUTE).await?;
        ensure_contains(format!("IP route MTU on {node}"), &output, markers::MTU_9000)?;
        tracing::info!(ip, "IP route MTU is set to 9000");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;
    use crate::executor::{Reply, ScriptedExecutor};

    fn ips(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn test_mtu_uses_os_specific_command() {
        let exec = ScriptedExecutor::new()
            .on("10.0.0.5 \"cat /etc/os-release\"", Reply::ok("NAME=\"Ubuntu\""))
            .on("10.0.0.6 \"cat /etc/os-release\"", Reply::ok("NAME=\"Red Hat Enterprise Linux\""))
            .on("10.0.0.5 \"ip addr show\"", Reply::ok("2: eth0: <UP> mtu 9000 qdisc mq"))
            .on("10.0.0.6 \"ifconfig\"", Reply::ok("eth0: flags=4163<UP>  mtu 9000"));
        check_mtu(&exec, &ips(&["10.0.0.5", "10.0.0.6"])).await.unwrap();
        assert_eq!(exec.count_calls("ifconfig"), 1);
        assert_eq!(exec.count_calls("ip addr show"), 1);
    }

    #[tokio::test]
    async fn test_mtu_mismatch_names_node() {
        let exec = ScriptedExecutor::new()
            .on("cat /etc/os-release", Reply::ok("NAME=\"Ubuntu\""))
            .on("ip addr show", Reply::ok("2: eth0: <UP> mtu 1500 qdisc mq"));
        let err = check_mtu(&exec, &ips(&["10.0.0.5"])).await.unwrap_err();
        assert!(err.to_string().contains("node 10.0.0.5"));
        assert!(err.to_string().contains("mtu 1500"));
    }

    #[tokio::test]
    async fn test_empty_ip_list_makes_no_calls() {
        let exec = ScriptedExecutor::new();
        let err = check_ip_route(&exec, &[]).await.unwrap_err();
        assert!(matches!(err, Error::EmptyInput { .. }));
        assert!(exec.calls().is_empty());
    }

    #[tokio::test]
    async fn test_ip_route() {
        let exec = ScriptedExecutor::new().on(
            "ip route",
            Reply::ok("default via 10.0.0.1 dev eth0 proto dhcp src 10.0.0.5 metric 100 mtu 9000"),
        );
        check_ip_route(&exec, &ips(&["10.0.0.5"])).await.unwrap();
    }
}
