//! What the cluster is supposed to look like, taken from provisioning.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExpectedTopology {
    pub cluster_id: String,
    pub reservation_id: String,
    /// Prefix of every generated host name; the master is `<prefix>-mgmt-1`.
    pub cluster_prefix: String,
    pub zone: String,
    pub dns_domain: String,
    pub hyperthreading: bool,
    pub lsf_version: String,
    pub management_node_count: Option<usize>,
    /// User SSH keys given at provisioning; each management node holds them
    /// alongside the cluster's own key.
    pub ssh_key_count: usize,
    /// User jobs are submitted as, matched in the `bjobs` USER column.
    pub job_owner: String,
    pub app_center: bool,
    pub ldap: Option<LdapSettings>,
}

impl Default for ExpectedTopology {
    fn default() -> Self {
        Self {
            cluster_id: String::new(),
            reservation_id: String::new(),
            cluster_prefix: String::new(),
            zone: String::new(),
            dns_domain: String::new(),
            hyperthreading: true,
            lsf_version: "10.1.0.14".to_string(),
            management_node_count: None,
            ssh_key_count: 1,
            job_owner: "lsfadmin".to_string(),
            app_center: false,
            ldap: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LdapSettings {
    /// Two-label domain, e.g. `hpc.local`.
    pub domain: String,
    pub user: String,
    pub admin_password: String,
    /// When set, the add-user flow creates this user from `user`'s entry.
    pub new_user: Option<String>,
}

impl ExpectedTopology {
    pub fn master_name(&self) -> String {
        format!("{}{}", self.cluster_prefix, crate::markers::MASTER_NAME_SUFFIX)
    }

    /// Builds expectations from the provisioning variables map
    /// (`cluster_id`, `reservation_id`, `cluster_prefix`, `zones`, ...).
    pub fn from_provisioning_vars(vars: &Value) -> Result<Self> {
        let text = |key: &str| -> Result<String> {
            vars.get(key)
                .and_then(Value::as_str)
                .map(str::to_string)
                .ok_or_else(|| Error::Config(format!("provisioning variable '{key}' is missing")))
        };

        let zone = vars
            .get("zones")
            .and_then(Value::as_array)
            .and_then(|z| z.first())
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();

        let hyperthreading = match vars.get("hyperthreading_enabled") {
            Some(Value::Bool(b)) => *b,
            Some(Value::String(s)) => s.parse().unwrap_or(true),
            _ => true,
        };

        let ssh_key_count = vars
            .get("ssh_keys")
            .and_then(Value::as_array)
            .map(Vec::len)
            .unwrap_or(1);

        Ok(Self {
            cluster_id: text("cluster_id")?,
            reservation_id: text("reservation_id")?,
            cluster_prefix: text("cluster_prefix")?,
            zone,
            dns_domain: vars
                .pointer("/dns_domain_name/compute")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
            hyperthreading,
            ssh_key_count,
            ..Self::default()
        })
    }
}

const REQUIRED_OUTPUTS: [&str; 4] = [
    "ssh_to_management_node",
    "ssh_to_login_node",
    "vpc_name",
    "region_name",
];
const APP_CENTER_OUTPUTS: [&str; 2] = ["application_center", "application_center_url"];
const LDAP_OUTPUTS: [&str; 1] = ["ssh_to_ldap_node"];

/// Checks the `cluster_info` map of the provisioning outputs carries every
/// field the enabled features need.
pub fn verify_provisioning_outputs(outputs: &Value, app_center: bool, ldap: bool) -> Result<()> {
    let info = outputs
        .get("cluster_info")
        .filter(|v| v.is_object())
        .ok_or_else(|| Error::not_found("cluster_info", outputs.to_string()))?;

    let mut required: Vec<&str> = REQUIRED_OUTPUTS.to_vec();
    if app_center {
        required.extend(APP_CENTER_OUTPUTS);
    }
    if ldap {
        required.extend(LDAP_OUTPUTS);
    }

    for field in required {
        let value = info.get(field).and_then(Value::as_str).unwrap_or_default();
        tracing::info!(field, value, "provisioning output");
        if value.trim().is_empty() {
            return Err(Error::Config(format!(
                "{field} is missing from terraform output"
            )));
        }
    }
    Ok(())
}
