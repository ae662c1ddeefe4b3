//! Literal scheduler and OS text the checks depend on.
//!
//! Everything that has to match real command output bit-for-bit lives here,
//! so a scheduler or OS upgrade that changes wording is a one-line edit.

/// Profile sourced before scheduler commands on management and login nodes.
pub const LOGIN_NODE_PROFILE: &str = "source /opt/ibm/lsf/conf/profile.lsf;";
/// Profile sourced before scheduler commands on compute nodes.
pub const COMPUTE_NODE_PROFILE: &str = "source /opt/ibm/lsf_worker/conf/profile.lsf;";

pub const CLUSTER_NAME_PREFIX: &str = "My cluster name is";
pub const MASTER_NAME_PREFIX: &str = "My master name is";
pub const MASTER_NAME_SUFFIX: &str = "-mgmt-1";
pub const LSF_VERSION_PREFIX: &str = "IBM Spectrum LSF Standard";

pub const MTU_9000: &str = "mtu 9000";
pub const OFFLINE_CPU_MARKER: &str = "Off-line CPU(s) list:";
pub const SSH_RSA_MARKER: &str = "ssh-rsa ";

pub const STATUS_OK: &str = "ok";
pub const STATUS_UNREACH: &str = "unreach";
pub const BHOSTS_HEADER: &str = "HOST_NAME";
pub const LSF_IS_DOWN: &str = "LSF is down";
pub const JOB_DONE: &str = "DONE";

/// `bjobs` truncates the USER column to this many characters.
pub const BJOBS_USER_WIDTH: usize = 7;

pub const OS_RELEASE_NAME_KEY: &str = "NAME";
pub const OS_UBUNTU: &str = "Ubuntu";
pub const OS_RHEL_FRAGMENT: &str = "rhel";
pub const NETWORK_MANAGER_GENERATED: &str = "Generated by NetworkManager";

pub const PTR_NOT_FOUND: &str = "server can't find";

/// Messages `ssh` prints when the remote end goes away mid-command.
pub const REBOOT_DISCONNECT_MARKERS: &[&str] = &[
    "remote command exited without exit status or exit signal",
    "closed by remote host",
    "Connection closed by",
    "terminated",
];

pub mod cmd {
    pub const BHOSTS: &str = "bhosts -w";
    pub const BJOBS_ALL: &str = "bjobs -a";
    pub const LSID: &str = "lsid";
    pub const LSCPU: &str = "lscpu";
    pub const OS_RELEASE: &str = "cat /etc/os-release";
    pub const IP_ADDR: &str = "ip addr show";
    pub const IFCONFIG: &str = "ifconfig";
    pub const IP_ROUTE: &str = "ip route";
    pub const DF: &str = "df -h";
    pub const LIST_LSF_SHARE: &str = "cd /mnt/lsf && ls";
    pub const MGMT_COUNT: &str = "bhosts -w | grep 'mgmt' | wc -l";
    pub const DAEMONS_STATUS: &str = "lsf_daemons status";
    pub const DAEMONS_RESTART: &str = "sudo su -l root -c 'lsf_daemons restart'";
    pub const BCTRLD_STOP: &str = "bctrld stop sbd";
    pub const LSFD_RESTART: &str = "sudo su -l root -c 'systemctl restart lsfd'";
    pub const REBOOT: &str = "sudo su -l root -c 'reboot'";
    pub const FIND_AUTHORIZED_KEYS: &str = "sudo su -l root -c 'cd / && find / -name authorized_keys'";
    pub const ONEAPI_LIST: &str = "ls /opt/intel/oneapi";
    pub const ONEAPI_INIT: &str = "sudo su -l root -c \". /opt/intel/oneapi/setvars.sh\"";
    pub const PMC_LIST: &str = "sudo su -l root -c 'pmcadmin list'";
    pub const APPCENTER_RPM: &str = "rpm -qa | grep lsf-appcenter";
    pub const MARIADB_RPM: &str = "rpm -qa | grep MariaDB";
    pub const RESOLV_CONF: &str = "cat /etc/resolv.conf";
    pub const RESOLVECTL: &str = "resolvectl status";
    pub const PTR_HOSTS: &str = "lshosts -w | awk 'NR>1' | awk '{print $1}' | grep -E 'mgmt|login'";
    pub const LDAP_CONF: &str = "cat /etc/ldap/ldap.conf";
    pub const LDAP_USERS_LDIF: &str = "cat /opt/users.ldif";
    pub const HOSTNAME: &str = "hostname";
    pub const WHOAMI: &str = "whoami";
}

/// Fragments of commands that change cluster state; these are never retried.
pub const NON_IDEMPOTENT_COMMANDS: [&str; 6] = [
    "bsub",
    "ldapadd",
    "lsf_daemons restart",
    "bctrld",
    "systemctl restart",
    "reboot",
];

pub const RESERVATION_CONFIG: &str =
    "/opt/ibm/lsf/conf/resource_connector/ibmcloudhpc/conf/ibmcloudhpc_config.json";

pub const DAEMONS_IN_ORDER: [&str; 3] = ["lim", "res", "sbatchd"];
pub const DAEMON_RUNNING: &str = "running";
pub const DAEMON_RESTART_STOPPING: &str = "Stopping";
pub const DAEMON_RESTART_STARTING: &str = "Starting";

pub const LSF_SHARE: &str = "/mnt/lsf";
pub const COMPUTE_MOUNTS: [&str; 3] = ["/mnt/lsf", "/mnt/vpcstorage/tools", "/mnt/vpcstorage/data"];
pub const LSF_SHARE_DIRS: [&str; 10] = [
    "10.1",
    "conf",
    "config_done",
    "das_staging_area",
    "data",
    "gui-conf",
    "gui-logs",
    "log",
    "repository-path",
    "work",
];
pub const SENTINEL_FILE: &str = "testOne.txt";
pub const SENTINEL_TEXT: &str = "Welcome to the ibm cloud HPC";

pub const VPCUSER_AUTHORIZED_KEYS: &str = "/home/vpcuser/.ssh/authorized_keys";
pub const LSFADMIN_AUTHORIZED_KEYS: &str = "/home/lsfadmin/.ssh/authorized_keys";
pub const ROOT_AUTHORIZED_KEYS: &str = "/root/.ssh/authorized_keys";

/// Expected `ssh-rsa ` counts per authorized_keys file on a management node
/// provisioned with `ssh_keys` user keys. lsfadmin and root also hold the
/// cluster's own key.
pub fn management_key_counts(ssh_keys: usize) -> [(&'static str, usize); 3] {
    [
        (VPCUSER_AUTHORIZED_KEYS, ssh_keys),
        (LSFADMIN_AUTHORIZED_KEYS, ssh_keys + 1),
        (ROOT_AUTHORIZED_KEYS, ssh_keys + 1),
    ]
}
pub const COMPUTE_KEY_COUNTS: [(&str, usize); 1] = [(LSFADMIN_AUTHORIZED_KEYS, 1)];
pub const COMPUTE_KEY_PATHS_UBUNTU: usize = 4;
pub const COMPUTE_KEY_PATHS_OTHER: usize = 3;

pub const ONEAPI_FILES: [&str; 2] = ["setvars.sh", "mpi"];
pub const ONEAPI_INITIALIZED: &str = ":: oneAPI environment initialized ::";

pub const APPCENTER_PORT: u16 = 8443;
pub const APPCENTER_PACKAGE: &str = "lsf-appcenter-10.";
pub const APPCENTER_SERVICES: [&str; 2] = ["WEBGUI         STARTED", "PNC            STARTED"];
pub const LISTEN: &str = "LISTEN";
pub const MARIADB_PACKAGES: [&str; 4] = [
    "MariaDB-client",
    "MariaDB-common",
    "MariaDB-shared",
    "MariaDB-server",
];

pub const NOVNC_CHECKS: [(&str, &str); 4] = [
    ("rpm -qa  | grep xterm", "xterm"),
    ("rpm -qa | grep tigervnc", "tigervnc"),
    ("ps aux | grep -i novnc", "-Ddefault.novnc.port=6080"),
    ("netstat -tuln | grep 6080", "0.0.0.0:6080"),
];

pub const LDAP_NEW_USER_FILE: &str = "user2.ldif";

/// Scheduler commands that must answer with non-empty output on every role.
pub const LSF_SMOKE_COMMANDS: [&str; 4] = ["lsid", "bjobs -a", "bhosts -w", "bqueues"];
/// Same smoke test for a directory user; `whoami` must print that user.
pub const LSF_USER_COMMANDS: [&str; 4] = ["whoami", "lsid", "bhosts -w", "lshosts"];
pub const MGMT_HOST_FRAGMENT: &str = "mgmt";
pub const LOGIN_SSH_CONNECT_TIMEOUT_SECS: u64 = 12;
