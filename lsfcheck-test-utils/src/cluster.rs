//! A scripted cluster that passes every scenario, and knobs to break it.

use crate::fixtures::*;
use lsfcheck::executor::{Reply, Rule, ScriptedConnector, Transcript};
use lsfcheck::{Config, ExpectedTopology, LdapSettings, RetryPolicy, Scenario, Timing};
use std::collections::BTreeMap;
use std::time::Duration;

/// Per-host rules of a healthy cluster. Rules added later win over earlier
/// rules with the same match text, so tests break one thing with
/// [`ClusterScript::with`] and leave the rest healthy.
#[derive(Debug, Clone)]
pub struct ClusterScript {
    hosts: BTreeMap<String, Vec<Rule>>,
}

fn rule(matches: impl Into<String>, output: &str) -> Rule {
    Rule {
        matches: matches.into(),
        replies: vec![Reply::ok(output)],
    }
}

fn user_host(user: &str, ip: &str) -> String {
    format!("{user}@{ip}")
}

impl ClusterScript {
    /// Every node answers the way a freshly provisioned cluster does. The
    /// master's `bhosts -w` answers follow the order in which `scenario`
    /// queries it, ending with the dynamic nodes gone.
    pub fn healthy(scenario: Scenario) -> Self {
        let mut hosts = BTreeMap::new();

        let mut master = management_node("demo-mgmt-1");
        master.extend(compute_hops());
        master.push(Rule {
            matches: "bhosts -w".to_string(),
            replies: bhosts_sequence(scenario)
                .iter()
                .map(|o| Reply::ok(*o))
                .collect(),
        });
        master.push(Rule {
            matches: "-c 'reboot'".to_string(),
            replies: vec![Reply::fail(REBOOT_DISCONNECT)],
        });
        hosts.insert(MASTER_IP.to_string(), master);
        hosts.insert(SECOND_MGMT_IP.to_string(), management_node("demo-mgmt-2"));
        hosts.insert(LOGIN_IP.to_string(), login_node());
        hosts.insert(user_host("ubuntu", LDAP_SERVER_IP), ldap_server());

        for ip in [MASTER_IP, SECOND_MGMT_IP, LOGIN_IP]
            .into_iter()
            .chain(COMPUTE_IPS)
        {
            hosts.insert(user_host(LDAP_USER, ip), ldap_user_node());
        }

        Self { hosts }
    }

    /// Adds a rule for `host` that wins over the healthy one with the same
    /// match text.
    pub fn with(self, host: &str, matches: &str, reply: Reply) -> Self {
        self.with_sequence(host, matches, vec![reply])
    }

    pub fn with_sequence(mut self, host: &str, matches: &str, replies: Vec<Reply>) -> Self {
        self.hosts.entry(host.to_string()).or_default().push(Rule {
            matches: matches.to_string(),
            replies,
        });
        self
    }

    /// Makes `host` unreachable.
    pub fn without(mut self, host: &str) -> Self {
        self.hosts.remove(host);
        self
    }

    pub fn transcript(self) -> Transcript {
        Transcript { hosts: self.hosts }
    }

    pub fn connector(self) -> ScriptedConnector {
        ScriptedConnector::from_transcript(self.transcript())
    }
}

/// Shorthand for `ClusterScript::healthy(scenario).connector()`.
pub fn healthy_cluster(scenario: Scenario) -> ScriptedConnector {
    ClusterScript::healthy(scenario).connector()
}

fn bhosts_sequence(scenario: Scenario) -> Vec<&'static str> {
    match scenario {
        // smoke test, discovery, drain
        Scenario::Basic => vec![BHOSTS_WITH_COMPUTE, BHOSTS_WITH_COMPUTE, BHOSTS_DRAINED],
        // smoke test, sbd stop, sbd start, restart (down, then up),
        // post-reboot response, discovery, drain
        Scenario::Full | Scenario::AppCenter | Scenario::Ldap => vec![
            BHOSTS_WITH_COMPUTE,
            BHOSTS_MASTER_UNREACH,
            BHOSTS_WITH_COMPUTE,
            LSF_IS_DOWN,
            BHOSTS_WITH_COMPUTE,
            BHOSTS_WITH_COMPUTE,
            BHOSTS_WITH_COMPUTE,
            BHOSTS_DRAINED,
        ],
    }
}

/// What any LSF node answers, whether reached directly or through a hop.
fn lsf_node(hostname: &str) -> Vec<Rule> {
    vec![
        rule("lsid", LSID),
        rule("ibmcloudhpc_config.json", RESERVATION_CONFIG),
        rule("cat /etc/os-release", OS_RELEASE_RHEL),
        rule("ifconfig", IFCONFIG),
        rule("ip route", IP_ROUTE),
        rule("lscpu", LSCPU),
        rule("df -h", DF),
        rule("cd /mnt/lsf && ls", LSF_SHARE_LISTING),
        rule("test -d", "Directory Exist\n"),
        rule("> testOne.txt", ""),
        rule("cat testOne.txt", SENTINEL_READ),
        rule("rm -rf testOne.txt", ""),
        rule("cat /etc/resolv.conf", RESOLV_CONF),
        rule("bsub", JOB_SUBMITTED),
        rule("bjobs -a", BJOBS_DONE),
        rule("bkill", BKILL),
        rule("bqueues", BQUEUES),
        rule("bhosts -w", BHOSTS_WITH_COMPUTE),
        rule("lshosts", LSHOSTS),
        rule("nslookup", NSLOOKUP),
        rule("hostname", &format!("{hostname}\n")),
        rule(
            format!("ldapsearch -x -H ldap://{LDAP_SERVER_IP}"),
            LDAP_PEOPLE,
        ),
    ]
}

fn management_node(hostname: &str) -> Vec<Rule> {
    let mut rules = lsf_node(hostname);
    rules.extend([
        rule("lsf_daemons status", DAEMONS_STATUS),
        rule("lsf_daemons restart", DAEMONS_RESTART),
        rule("bctrld stop sbd", ""),
        rule("systemctl restart lsfd", ""),
        rule("bhosts -w | grep 'mgmt' | wc -l", "2\n"),
        rule("lshosts -w | awk", PTR_HOSTS),
        rule("cd / && find / -name authorized_keys", MANAGEMENT_KEY_FILES),
        rule("cat /home/vpcuser/.ssh/authorized_keys", ONE_KEY),
        rule("cat /home/lsfadmin/.ssh/authorized_keys", TWO_KEYS),
        rule("cat /root/.ssh/authorized_keys", TWO_KEYS),
        rule("pmcadmin list", PMC_LIST),
        rule("netstat -tuln | grep 8443", NETSTAT_8443),
        rule("grep lsf-appcenter", APPCENTER_RPM),
        rule("grep MariaDB", MARIADB_RPM),
    ]);
    rules.extend(NOVNC_REPLIES.iter().map(|(m, o)| rule(*m, o)));
    rules
}

/// Compute nodes are only reached through `ssh <ip> "..."` from the master,
/// so their answers that differ from a management node are keyed on the hop.
fn compute_hops() -> Vec<Rule> {
    let mut rules = vec![
        rule("ls /opt/intel/oneapi", ONEAPI_LISTING),
        rule("setvars.sh", ONEAPI_INIT),
    ];
    for ip in COMPUTE_IPS {
        let root = |c: &str| format!("ssh {ip} \"sudo su -l root -c '{c}");
        rules.push(rule(root("cd / && find"), COMPUTE_KEY_FILES));
        rules.push(rule(root("cat /home/vpcuser/.ssh/authorized_keys"), NO_KEYS));
        rules.push(rule(root("cat /home/lsfadmin/.ssh/authorized_keys"), ONE_KEY));
        rules.push(rule(root("cat /root/.ssh/authorized_keys"), NO_KEYS));
    }
    rules
}

fn login_node() -> Vec<Rule> {
    let mut rules = lsf_node("demo-login-1");
    rules.push(rule("df -h", DF_LOGIN));
    rules.push(rule(format!("ssh {MASTER_IP} 'hostname'"), "demo-mgmt-1\n"));
    rules.push(rule(format!("ssh {SECOND_MGMT_IP} 'hostname'"), "demo-mgmt-2\n"));
    rules.push(rule("-o ConnectTimeout=12 -q", ""));
    rules
}

fn ldap_server() -> Vec<Rule> {
    vec![
        rule("cat /etc/ldap/ldap.conf", LDAP_CONF),
        rule("ldapsearch -x -D", LDAP_PEOPLE_WITH_NEW_USER),
        rule("cat /opt/users.ldif", USERS_LDIF),
        rule("cat > user2.ldif", ""),
        rule("ldapadd", LDAPADD),
    ]
}

fn ldap_user_node() -> Vec<Rule> {
    let mut rules = lsf_node("demo-node");
    rules.push(rule("whoami", &format!("{LDAP_USER}\n")));
    rules.push(rule("bjobs -a", BJOBS_DONE_AS_USER));
    rules
}

/// Configuration matching [`ClusterScript::healthy`], with waits short
/// enough for paused-clock tests.
pub fn test_config() -> Config {
    let mut config = Config::default();
    config.ssh.management_ips = vec![MASTER_IP.to_string(), SECOND_MGMT_IP.to_string()];
    config.ssh.login_ip = Some(LOGIN_IP.to_string());
    config.ssh.ldap_server_ip = Some(LDAP_SERVER_IP.to_string());
    config.timing = Timing {
        job_poll_interval: Duration::from_secs(5),
        job_timeout_base: Duration::from_secs(30),
        drain_poll_interval: Duration::from_secs(10),
        drain_timeout: Duration::from_secs(120),
        daemon_settle: Duration::from_secs(1),
        daemon_restart_poll: Duration::from_secs(1),
        bctrld_stop_settle: Duration::from_secs(1),
        bctrld_start_settle: Duration::from_secs(1),
        reboot_settle: Duration::from_secs(1),
    };
    config.retry = RetryPolicy {
        max_attempts: 2,
        backoff: Duration::from_secs(1),
    };
    config.expected = ExpectedTopology {
        cluster_id: CLUSTER_ID.to_string(),
        reservation_id: RESERVATION_ID.to_string(),
        cluster_prefix: CLUSTER_PREFIX.to_string(),
        zone: ZONE.to_string(),
        dns_domain: DOMAIN.to_string(),
        hyperthreading: true,
        lsf_version: LSF_VERSION.to_string(),
        management_node_count: Some(2),
        ldap: Some(LdapSettings {
            domain: DOMAIN.to_string(),
            user: LDAP_USER.to_string(),
            admin_password: LDAP_ADMIN_PASSWORD.to_string(),
            new_user: Some(LDAP_NEW_USER.to_string()),
        }),
        ..ExpectedTopology::default()
    };
    config
}

/// Writes `transcript` as TOML to a temporary file, kept until the handle drops.
pub fn write_transcript(transcript: &Transcript) -> tempfile::NamedTempFile {
    let file = tempfile::Builder::new()
        .prefix("lsfcheck-transcript-")
        .suffix(".toml")
        .tempfile()
        .expect("failed to create transcript file");
    let content = toml::to_string(transcript).expect("failed to serialize transcript");
    std::fs::write(file.path(), content).expect("failed to write transcript");
    file
}
