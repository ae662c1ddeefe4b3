//! End-to-end verification scenarios.
//!
//! A scenario opens sessions through a [`Connector`], runs the checks of each
//! node role in a fixed order and records every outcome in a [`Report`]. A
//! failed check does not stop the scenario; a failed connection skips the
//! checks that needed it. Sessions are plain values, so each one is released
//! as soon as its scope ends, whatever happened inside it.

use crate::config::Config;
use crate::executor::{CommandExecutor, Connector, Retrying};
use crate::poller::{self, JobSize};
use crate::recorder::Report;
use crate::topology::LdapSettings;
use crate::verify::{self, BctrldAction, Role};
use crate::{Error, Result, discovery};
use std::future::Future;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scenario {
    /// Management, compute and login node configuration.
    Basic,
    /// Basic plus SSH keys, failover, daemon restart, reboot, connectivity
    /// and PTR records.
    Full,
    /// Full plus Application Center and noVNC.
    AppCenter,
    /// Full plus the LDAP server, LDAP clients and jobs as an LDAP user.
    Ldap,
}

impl std::str::FromStr for Scenario {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "basic" => Ok(Scenario::Basic),
            "full" => Ok(Scenario::Full),
            "app-center" => Ok(Scenario::AppCenter),
            "ldap" => Ok(Scenario::Ldap),
            other => Err(Error::InvalidArgument(format!(
                "unknown scenario '{other}', expected one of basic, full, app-center, ldap"
            ))),
        }
    }
}

impl std::fmt::Display for Scenario {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Scenario::Basic => "basic",
            Scenario::Full => "full",
            Scenario::AppCenter => "app-center",
            Scenario::Ldap => "ldap",
        })
    }
}

impl Scenario {
    fn is_full(self) -> bool {
        !matches!(self, Scenario::Basic)
    }
}

/// Runs `scenario` against the cluster described by `config`.
pub async fn run_scenario<C: Connector>(connector: &C, config: &Config, scenario: Scenario) -> Report {
    tracing::info!(%scenario, "validation started");
    let mut run = Run {
        connector,
        config,
        report: Report::new(),
    };
    run.scenario(scenario).await;
    tracing::info!(
        %scenario,
        passed = run.report.passed(),
        failed = run.report.failed(),
        "validation ended"
    );
    run.report
}

type Session<C> = Retrying<<C as Connector>::Session>;

struct Run<'a, C> {
    connector: &'a C,
    config: &'a Config,
    report: Report,
}

impl<C: Connector> Run<'_, C> {
    async fn check<T>(&mut self, name: &str, fut: impl Future<Output = Result<T>>) -> Option<T> {
        let result = fut.await;
        self.report.record(name, result).ok()
    }

    /// Records `name` as failed for a step that could not even start.
    fn skip(&mut self, name: &str, error: Error) {
        let _ = self.report.record::<()>(name, Err(error));
    }

    async fn connect(&mut self, name: &str, host: &str, user: Option<&str>) -> Option<Session<C>> {
        let policy = self.config.retry;
        let result = self
            .connector
            .connect(host, user)
            .await
            .map(|s| Retrying::new(s, policy));
        self.report.record(name, result).ok()
    }

    async fn run_job<E: CommandExecutor>(&mut self, session: &E, size: JobSize, owner: &str) {
        let config = self.config;
        let command = poller::job_command(&config.expected.zone, size);
        self.check(
            "check Run job",
            poller::run_job(session, &command, owner, &config.timing),
        )
        .await;
    }

    async fn scenario(&mut self, scenario: Scenario) {
        let config = self.config;
        let master_ip = match self.report.record("management node IPs", config.master_ip()) {
            Ok(ip) => ip,
            Err(_) => return,
        };
        let Some(mut master) = self.connect("SSH connection to the master", master_ip, None).await
        else {
            return;
        };

        self.management_config(&master).await;
        if scenario == Scenario::AppCenter {
            self.check("check Application center", verify::check_app_center(&master))
                .await;
            self.check("check noVnc", verify::check_novnc(&master)).await;
        }

        if scenario.is_full() {
            self.management_keys().await;
            self.failover_and_failback(&master).await;
            self.restart_daemons(&master).await;
            self.check("instance reboot", verify::reboot(&master, &config.timing))
                .await;
            drop(master);
            master = match self.connect("SSH connection to the master", master_ip, None).await {
                Some(session) => session,
                None => return,
            };
            self.check("bhosts response non-empty", verify::check_bhosts_response(&master))
                .await;
            self.run_job(&master, JobSize::Med, &config.expected.job_owner)
                .await;
        }

        self.cluster(&master, scenario).await;

        self.check(
            "wait for dynamic node disappearance",
            poller::wait_for_drain(&master, &config.timing),
        )
        .await;
    }

    /// Everything after the management node itself: compute nodes, the login
    /// node and, for the bigger scenarios, LDAP and DNS records.
    async fn cluster(&mut self, master: &Session<C>, scenario: Scenario) {
        let config = self.config;
        let compute_ips = self
            .check(
                "discover dynamic compute nodes",
                discovery::discover_dynamic_nodes(master),
            )
            .await
            .unwrap_or_default();

        self.compute_config(master, &compute_ips).await;
        if scenario.is_full() {
            self.check(
                "compute node SSH check",
                verify::check_compute_keys(master, &compute_ips),
            )
            .await;
        }

        let login = match &config.ssh.login_ip {
            Some(ip) => self.connect("SSH connection to the login node", ip, None).await,
            None => {
                self.skip(
                    "SSH connection to the login node",
                    Error::EmptyInput { what: "login node IP" },
                );
                None
            }
        };

        if let (Some(login), Some(login_ip)) = (&login, &config.ssh.login_ip) {
            self.login_config(login, login_ip).await;
            if scenario.is_full() {
                self.check(
                    "check SSH connectivity from the login node to other nodes",
                    verify::check_login_connectivity(
                        login,
                        &config.ssh.management_ips,
                        &compute_ips,
                    ),
                )
                .await;
            }
        }

        if scenario.is_full() {
            self.ptr_records(master, login.as_ref()).await;
        }

        if scenario == Scenario::Ldap {
            self.ldap(master, login.as_ref(), &compute_ips).await;
        }
    }

    async fn management_config(&mut self, master: &Session<C>) {
        let config = self.config;
        let expected = &config.expected;
        let ips = &config.ssh.management_ips;

        self.check("check Cluster ID", verify::check_cluster_id(master, &expected.cluster_id))
            .await;
        self.check(
            "check Master name",
            verify::check_master_name(master, &expected.cluster_prefix),
        )
        .await;
        self.check(
            "check Reservation ID",
            verify::check_reservation_id(master, &expected.reservation_id),
        )
        .await;
        self.check("MTU check on management node", verify::check_mtu(master, ips))
            .await;
        self.check(
            "IP route check on management node",
            verify::check_ip_route(master, ips),
        )
        .await;
        self.check(
            "Hyperthreading check on management node",
            verify::check_hyperthreading(master, ips, expected.hyperthreading),
        )
        .await;
        self.check(
            "check LSF version",
            verify::check_lsf_version(master, &expected.lsf_version),
        )
        .await;
        self.check(
            "check LSF daemons status",
            verify::check_daemons_status(master),
        )
        .await;
        if let Some(count) = expected.management_node_count {
            self.check(
                "check management node count",
                verify::check_management_node_count(master, count),
            )
            .await;
        }
        if !expected.dns_domain.is_empty() {
            self.check(
                "DNS check on management node",
                verify::check_dns(master, ips, &expected.dns_domain),
            )
            .await;
        }
        self.check(
            "File mount check on management node",
            verify::check_file_mounts(master, ips, Role::Management),
        )
        .await;
        self.check(
            "check 'lsf' commands on management node",
            verify::check_lsf_commands(master, Role::Management),
        )
        .await;
        self.run_job(master, JobSize::Low, &expected.job_owner).await;
    }

    /// Every management node is checked over its own session.
    async fn management_keys(&mut self) {
        let config = self.config;
        for ip in &config.ssh.management_ips {
            let name = format!("SSH connection to management node {ip}");
            let Some(session) = self.connect(&name, ip, None).await else {
                continue;
            };
            self.check(
                "management node SSH check",
                verify::check_management_keys(&session, config.expected.ssh_key_count),
            )
            .await;
        }
    }

    async fn failover_and_failback(&mut self, master: &Session<C>) {
        let config = self.config;
        self.check(
            "check bctrl stop",
            verify::control_bctrld(master, BctrldAction::Stop, &config.timing),
        )
        .await;
        self.run_job(master, JobSize::Med, &config.expected.job_owner)
            .await;
        self.check(
            "check bctrl start",
            verify::control_bctrld(master, BctrldAction::Start, &config.timing),
        )
        .await;
    }

    async fn restart_daemons(&mut self, master: &Session<C>) {
        let config = self.config;
        self.check(
            "check lsf_daemons restart",
            verify::restart_daemons(master, &config.timing),
        )
        .await;
        self.run_job(master, JobSize::Low, &config.expected.job_owner)
            .await;
    }

    async fn compute_config(&mut self, master: &Session<C>, ips: &[String]) {
        let config = self.config;
        let expected = &config.expected;
        self.check("MTU check on compute node", verify::check_mtu(master, ips))
            .await;
        self.check("IP route check on compute node", verify::check_ip_route(master, ips))
            .await;
        self.check(
            "Hyperthreading check on compute node",
            verify::check_hyperthreading(master, ips, expected.hyperthreading),
        )
        .await;
        self.check(
            "File mount check on compute node",
            verify::check_file_mounts(master, ips, Role::Compute),
        )
        .await;
        self.check(
            "Intel One Mpi check on compute node",
            verify::check_oneapi(master, ips),
        )
        .await;
    }

    async fn login_config(&mut self, login: &Session<C>, login_ip: &str) {
        let config = self.config;
        let expected = &config.expected;
        let ips = [login_ip.to_string()];

        self.check("check Cluster ID", verify::check_cluster_id(login, &expected.cluster_id))
            .await;
        self.check(
            "check Master name",
            verify::check_master_name(login, &expected.cluster_prefix),
        )
        .await;
        self.check(
            "check Reservation ID",
            verify::check_reservation_id(login, &expected.reservation_id),
        )
        .await;
        self.check("MTU check on login node", verify::check_mtu(login, &ips))
            .await;
        self.check("IP route check on login node", verify::check_ip_route(login, &ips))
            .await;
        self.check(
            "Hyperthreading check on login node",
            verify::check_hyperthreading(login, &ips, expected.hyperthreading),
        )
        .await;
        self.check(
            "check LSF version",
            verify::check_lsf_version(login, &expected.lsf_version),
        )
        .await;
        self.check(
            "File mount check on login node",
            verify::check_file_mounts(login, &ips, Role::Login),
        )
        .await;
        self.check(
            "check 'lsf' commands on login node",
            verify::check_lsf_commands(login, Role::Login),
        )
        .await;
        self.run_job(login, JobSize::Low, &expected.job_owner).await;
    }

    /// `nslookup` of every management and login host name, from each
    /// management node and from the login node.
    async fn ptr_records(&mut self, master: &Session<C>, login: Option<&Session<C>>) {
        let config = self.config;
        let domain = &config.expected.dns_domain;
        let Some(hosts) = self
            .check("PTR host names", verify::ptr_host_names(master, domain))
            .await
        else {
            return;
        };

        for ip in &config.ssh.management_ips {
            let name = format!("SSH connection to management node {ip}");
            let Some(session) = self.connect(&name, ip, None).await else {
                continue;
            };
            self.check(
                "PTR records on management node",
                verify::check_ptr_records(&session, &hosts),
            )
            .await;
        }
        if let Some(login) = login {
            self.check(
                "PTR records on login node",
                verify::check_ptr_records(login, &hosts),
            )
            .await;
        }
    }

    async fn ldap(&mut self, master: &Session<C>, login: Option<&Session<C>>, compute_ips: &[String]) {
        let config = self.config;
        let (ldap, server_ip) = match (&config.expected.ldap, &config.ssh.ldap_server_ip) {
            (Some(ldap), Some(server_ip)) => (ldap, server_ip.as_str()),
            _ => {
                self.skip(
                    "ldap configuration",
                    Error::Config(
                        "LDAP settings and LDAP server IP are required for the ldap scenario"
                            .to_string(),
                    ),
                );
                return;
            }
        };

        if let Some(server) = self
            .connect(
                "SSH connection to the LDAP server",
                server_ip,
                Some(&config.ssh.ldap_server_user),
            )
            .await
        {
            self.check(
                "ldap Server Status",
                verify::check_ldap_server(&server, &ldap.admin_password, &ldap.domain, &ldap.user),
            )
            .await;
            if let Some(new_user) = &ldap.new_user {
                self.check(
                    "add LDAP user",
                    verify::add_ldap_user(
                        &server,
                        &ldap.admin_password,
                        &ldap.domain,
                        &ldap.user,
                        new_user,
                    ),
                )
                .await;
            }
        }

        let management_ips = &config.ssh.management_ips;
        if let Some(master_ip) = management_ips.first() {
            self.node_ldap(Some(master), master_ip, Role::Management, ldap, server_ip)
                .await;
            self.connect_all_as_user(management_ips, ldap, Role::Management)
                .await;
        }
        if let (Some(login), Some(login_ip)) = (login, &config.ssh.login_ip) {
            self.node_ldap(Some(login), login_ip, Role::Login, ldap, server_ip)
                .await;
        }
        match compute_ips.first() {
            Some(first) => {
                self.node_ldap(None, first, Role::Compute, ldap, server_ip).await;
                self.connect_all_as_user(compute_ips, ldap, Role::Compute).await;
            }
            None => self.skip(
                "compute ldap configuration check",
                Error::EmptyInput {
                    what: "compute node IPs",
                },
            ),
        }
    }

    /// LDAP client configuration of one node, then mounts, a job and the LSF
    /// commands over a session opened as the LDAP user. Compute nodes have
    /// no admin session here, so their client check runs as the user.
    async fn node_ldap(
        &mut self,
        admin: Option<&Session<C>>,
        ip: &str,
        role: Role,
        ldap: &LdapSettings,
        server_ip: &str,
    ) {
        let config = self.config;
        if let Some(admin) = admin {
            let verified = self
                .check(
                    &format!("ldap configuration on {role} node"),
                    verify::check_ldap_client(admin, server_ip, &ldap.domain, &ldap.user),
                )
                .await;
            if verified.is_none() {
                return;
            }
        }

        let name = format!("SSH connection to the {role} node as LDAP user");
        let Some(user_session) = self.connect(&name, ip, Some(&ldap.user)).await else {
            return;
        };

        if admin.is_none() {
            self.check(
                &format!("ldap configuration on {role} node"),
                verify::check_ldap_client(&user_session, server_ip, &ldap.domain, &ldap.user),
            )
            .await;
        }
        self.check(
            &format!("check file mount on the {role} node"),
            verify::check_file_mounts_here(&user_session, role),
        )
        .await;
        if role != Role::Compute {
            let command = poller::job_command(&config.expected.zone, JobSize::Low);
            self.check(
                "check Run job",
                poller::run_job(&user_session, &command, &ldap.user, &config.timing),
            )
            .await;
        }
        self.check(
            &format!("Check the 'lsf' command as an LDAP user on the {role} node"),
            verify::check_lsf_commands_as_user(&user_session, &ldap.user, role),
        )
        .await;
    }

    async fn connect_all_as_user(&mut self, ips: &[String], ldap: &LdapSettings, role: Role) {
        for ip in ips {
            let name = format!("connect to the {role} node via SSH as LDAP User");
            if self.connect(&name, ip, Some(&ldap.user)).await.is_some() {
                tracing::info!(ip, user = %ldap.user, %role, "connected as LDAP user");
            }
        }
    }
}
