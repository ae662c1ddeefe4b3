use crate::executor::CommandExecutor;
use crate::markers::cmd;
use crate::parser::{self, NodeStatus};
use crate::Result;

/// IPs of every node `bhosts -w` reports as `ok`, sorted by address.
///
/// An empty list is not an error here; callers decide whether zero dynamic
/// nodes is acceptable.
pub async fn discover_dynamic_nodes<E: CommandExecutor>(session: &E) -> Result<Vec<String>> {
    let output = session
        .execute(cmd::BHOSTS)
        .await
        .map_err(|e| e.context("failed to execute 'bhosts' command"))?;

    let mut ips: Vec<String> = parser::node_records(&output)
        .into_iter()
        .filter(|n| n.status == NodeStatus::Ok)
        .map(|n| n.ip)
        .collect();
    ips.sort_by(|a, b| ip_sort_key(a).cmp(&ip_sort_key(b)));

    tracing::info!(?ips, "dynamic compute node IPs");
    Ok(ips)
}

// numeric octets first so 10.0.0.10 sorts after 10.0.0.9
fn ip_sort_key(ip: &str) -> (Vec<u32>, String) {
    let octets = ip.split('.').map(|o| o.parse().unwrap_or(u32::MAX)).collect();
    (octets, ip.to_string())
}
