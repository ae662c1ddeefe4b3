//! Canned command output of a healthy cluster.
//!
//! Values line up with [`crate::test_config`]: cluster `hpc-cluster`, prefix
//! `demo`, DNS and LDAP domain `hpc.local`.

pub const MASTER_IP: &str = "10.241.0.4";
pub const SECOND_MGMT_IP: &str = "10.241.0.5";
pub const LOGIN_IP: &str = "10.241.16.4";
pub const LDAP_SERVER_IP: &str = "10.241.32.4";
/// Dynamic nodes `bhosts` reports as ok, in the order discovery returns them.
pub const COMPUTE_IPS: [&str; 2] = ["10.241.0.9", "10.241.0.10"];

pub const CLUSTER_ID: &str = "hpc-cluster";
pub const CLUSTER_PREFIX: &str = "demo";
pub const RESERVATION_ID: &str = "res-123";
pub const ZONE: &str = "us-east-1";
pub const DOMAIN: &str = "hpc.local";
pub const LSF_VERSION: &str = "10.1.0.14";
pub const LDAP_USER: &str = "alice";
pub const LDAP_NEW_USER: &str = "bob";
pub const LDAP_ADMIN_PASSWORD: &str = "secret";
pub const JOB_ID: &str = "1234";

pub const LSID: &str = "IBM Spectrum LSF Standard 10.1.0.14, Jan 12 2023\n\
Copyright International Business Machines Corp. 1992, 2016.\n\
US Government Users Restricted Rights - Use, duplication or disclosure restricted by GSA ADP Schedule Contract with IBM Corp.\n\
\n\
My cluster name is hpc-cluster\n\
My master name is demo-mgmt-1\n";

pub const RESERVATION_CONFIG: &str = r#"{
  "IBMCLOUDHPC_RESERVATION_ID": "res-123",
  "IBMCLOUDHPC_ZONE": "us-east-1"
}"#;

pub const OS_RELEASE_RHEL: &str = "NAME=\"Red Hat Enterprise Linux\"\n\
VERSION=\"8.8 (Ootpa)\"\n\
ID=\"rhel\"\n";

pub const OS_RELEASE_UBUNTU: &str = "NAME=\"Ubuntu\"\nVERSION_ID=\"22.04\"\nID=ubuntu\n";

pub const IFCONFIG: &str = "eth0: flags=4163<UP,BROADCAST,RUNNING,MULTICAST>  mtu 9000\n\
        inet 10.241.0.4  netmask 255.255.240.0  broadcast 10.241.15.255\n";

pub const IP_ROUTE: &str =
    "default via 10.241.0.1 dev eth0 proto dhcp src 10.241.0.4 metric 100 mtu 9000\n";

pub const LSCPU: &str = "Architecture:        x86_64\n\
CPU(s):              8\n\
On-line CPU(s) list: 0-7\n\
Thread(s) per core:  2\n";

pub const LSCPU_OFFLINE: &str = "Architecture:        x86_64\n\
CPU(s):              8\n\
On-line CPU(s) list: 0,2,4,6\n\
Off-line CPU(s) list: 1,3,5,7\n";

pub const DAEMONS_STATUS: &str = "lim status: pid 1201 running\n\
res status: pid 1225 running\n\
sbatchd status: pid 1301 running\n";

pub const DAEMONS_RESTART: &str = "Stopping the LSF subsystem\n\
Starting the LSF subsystem\n";

pub const RESOLV_CONF: &str = "# Generated by NetworkManager\n\
search hpc.local\n\
nameserver 161.26.0.10\n";

pub const DF: &str = "Filesystem                          Size  Used Avail Use% Mounted on\n\
/dev/vda1                            99G  8.1G   91G   9% /\n\
10.241.0.20:/lsf                    100G  1.2G   99G   2% /mnt/lsf\n\
10.241.0.21:/tools                  100G  3.0G   97G   3% /mnt/vpcstorage/tools\n\
10.241.0.22:/data                   100G  2.0G   98G   2% /mnt/vpcstorage/data\n";

pub const DF_LOGIN: &str = "Filesystem                          Size  Used Avail Use% Mounted on\n\
/dev/vda1                            99G  8.1G   91G   9% /\n\
10.241.0.20:/lsf                    100G  1.2G   99G   2% /mnt/lsf\n";

pub const LSF_SHARE_LISTING: &str = "10.1  conf  config_done  das_staging_area  data  gui-conf  gui-logs  log  repository-path  work\n";

pub const SENTINEL_READ: &str = "Welcome to the ibm cloud HPC\n";

pub const MANAGEMENT_KEY_FILES: &str = "/home/vpcuser/.ssh/authorized_keys\n\
/home/lsfadmin/.ssh/authorized_keys\n\
/root/.ssh/authorized_keys\n";

pub const COMPUTE_KEY_FILES: &str = "/home/vpcuser/.ssh/authorized_keys\n\
/home/lsfadmin/.ssh/authorized_keys\n\
/root/.ssh/authorized_keys\n";

pub const ONE_KEY: &str = "ssh-rsa AAAAB3NzaC1yc2EAAAADAQABAAABAQC1 lsfadmin@demo\n";
pub const TWO_KEYS: &str = "ssh-rsa AAAAB3NzaC1yc2EAAAADAQABAAABAQC1 lsfadmin@demo\n\
ssh-rsa AAAAB3NzaC1yc2EAAAADAQABAAABAQC2 operator@laptop\n";
pub const NO_KEYS: &str = "no-port-forwarding,no-agent-forwarding ssh-ed25519 AAAAC3Nz restricted\n";

pub const ONEAPI_LISTING: &str = "compiler  licensing  mpi  setvars.sh  tbb\n";
pub const ONEAPI_INIT: &str = "\n:: initializing oneAPI environment ...\n\
   bash: BASH_VERSION = 4.4.20(1)-release\n\
:: mpi -- latest\n\
:: oneAPI environment initialized ::\n";

pub const BQUEUES: &str = "QUEUE_NAME      PRIO STATUS          MAX JL/U JL/P JL/H NJOBS  PEND   RUN  SUSP\n\
normal           30  Open:Active       -    -    -    -     0     0     0     0\n";

pub const LSHOSTS: &str = "HOST_NAME      type    model  cpuf ncpus maxmem maxswp server RESOURCES\n\
demo-mgmt-1   X86_64 Intel_E5  12.5     4  15.4G      -    Yes (mg)\n";

pub const PTR_HOSTS: &str = "demo-mgmt-1\ndemo-mgmt-2\ndemo-login-1\n";

pub const NSLOOKUP: &str = "Server:\t\t161.26.0.10\n\
Address:\t161.26.0.10#53\n\n\
Name:\tdemo-mgmt-1.hpc.local\n\
Address: 10.241.0.4\n";

pub const NSLOOKUP_MISSING: &str = "Server:\t\t161.26.0.10\n\
Address:\t161.26.0.10#53\n\n\
** server can't find demo-login-1.hpc.local: NXDOMAIN\n";

pub const JOB_SUBMITTED: &str = "Job <1234> is submitted to default queue <normal>.\n";

pub const BJOBS_RUNNING: &str = "JOBID   USER    STAT  QUEUE      FROM_HOST   EXEC_HOST   JOB_NAME   SUBMIT_TIME\n\
1234    lsfadmi PEND  normal     demo-mgmt-1             myjob[1]   Oct 17 10:01\n";

pub const BJOBS_DONE: &str = "JOBID   USER    STAT  QUEUE      FROM_HOST   EXEC_HOST   JOB_NAME   SUBMIT_TIME\n\
1234    lsfadmi DONE  normal     demo-mgmt-1 compute-rg1 myjob[1]   Oct 17 10:01\n\
1234    lsfadmi DONE  normal     demo-mgmt-1 compute-rg1 myjob[2]   Oct 17 10:01\n";

pub const BJOBS_DONE_AS_USER: &str = "JOBID   USER    STAT  QUEUE      FROM_HOST   EXEC_HOST   JOB_NAME   SUBMIT_TIME\n\
1234    alice   DONE  normal     demo-mgmt-1 compute-rg1 myjob[1]   Oct 17 10:01\n";

pub const BKILL: &str = "Job <1234> is being terminated\n";

/// Management nodes busy, two dynamic compute nodes up.
pub const BHOSTS_WITH_COMPUTE: &str = "HOST_NAME                   STATUS       JL/U    MAX  NJOBS    RUN  SSUSP  USUSP    RSV\n\
demo-mgmt-1-10-241-0-4      closed_Full     -      0      0      0      0      0      0\n\
demo-mgmt-2-10-241-0-5      closed_Full     -      0      0      0      0      0      0\n\
compute-rg1-4-10-241-0-10   ok              -      8      0      0      0      0      0\n\
compute-rg1-4-10-241-0-9    ok              -      8      0      0      0      0      0\n";

/// The master lost its sbd after `bctrld stop sbd`.
pub const BHOSTS_MASTER_UNREACH: &str = "HOST_NAME                   STATUS       JL/U    MAX  NJOBS    RUN  SSUSP  USUSP    RSV\n\
demo-mgmt-1-10-241-0-4      unreach         -      0      0      0      0      0      0\n\
demo-mgmt-2-10-241-0-5      closed_Full     -      0      0      0      0      0      0\n\
compute-rg1-4-10-241-0-10   ok              -      8      0      0      0      0      0\n\
compute-rg1-4-10-241-0-9    ok              -      8      0      0      0      0      0\n";

/// Dynamic nodes gone, only the management nodes remain.
pub const BHOSTS_DRAINED: &str = "HOST_NAME                   STATUS       JL/U    MAX  NJOBS    RUN  SSUSP  USUSP    RSV\n\
demo-mgmt-1-10-241-0-4      closed_Full     -      0      0      0      0      0      0\n\
demo-mgmt-2-10-241-0-5      closed_Full     -      0      0      0      0      0      0\n";

pub const LSF_IS_DOWN: &str = "LSF is down. Please wait...\n";

pub const REBOOT_DISCONNECT: &str = "Connection closed by 10.241.0.4 port 22";

pub const PMC_LIST: &str = "SERVICE         STATUS  WSM_PID PORT  HOST_NAME\n\
WEBGUI         STARTED 4012    8443  demo-mgmt-1\n\
JOBDT          STARTED 4013    -     demo-mgmt-1\n\
PNC            STARTED 4014    -     demo-mgmt-1\n";

pub const NETSTAT_8443: &str = "tcp6       0      0 :::8443                 :::*                    LISTEN\n";

pub const APPCENTER_RPM: &str = "lsf-appcenter-10.2.0.14-632019.x86_64\n";

pub const MARIADB_RPM: &str = "MariaDB-client-10.6.12-1.el8.x86_64\n\
MariaDB-common-10.6.12-1.el8.x86_64\n\
MariaDB-shared-10.6.12-1.el8.x86_64\n\
MariaDB-server-10.6.12-1.el8.x86_64\n";

pub const NOVNC_REPLIES: [(&str, &str); 4] = [
    ("rpm -qa  | grep xterm", "xterm-351-1.el8.x86_64\n"),
    ("rpm -qa | grep tigervnc", "tigervnc-server-1.12.0-9.el8.x86_64\n"),
    (
        "ps aux | grep -i novnc",
        "lsfadmin 5012 java -Ddefault.novnc.port=6080 -jar novnc.jar\n",
    ),
    (
        "netstat -tuln | grep 6080",
        "tcp        0      0 0.0.0.0:6080            0.0.0.0:*               LISTEN\n",
    ),
];

pub const LDAP_CONF: &str = "#\n# LDAP Defaults\n#\n\n\
BASE   dc=hpc,dc=local\n\
URI    ldap://localhost\n";

pub const LDAP_PEOPLE: &str = "# extended LDIF\n\
# base <ou=people,dc=hpc,dc=local> with scope subtree\n\n\
dn: dc=hpc,dc=local\n\n\
dn: uid=alice,ou=people,dc=hpc,dc=local\n\
objectClass: inetOrgPerson\n\
uid: alice\n\
cn: alice\n";

pub const LDAP_PEOPLE_WITH_NEW_USER: &str = "# extended LDIF\n\
dn: dc=hpc,dc=local\n\n\
dn: uid=alice,ou=people,dc=hpc,dc=local\n\
uid: alice\n\n\
dn: uid=bob,ou=people,dc=hpc,dc=local\n\
uid: bob\n";

pub const USERS_LDIF: &str = "dn: uid=alice,ou=people,dc=hpc,dc=local\n\
objectClass: inetOrgPerson\n\
objectClass: posixAccount\n\
uid: alice\n\
cn: alice\n\
homeDirectory: /home/alice\n";

pub const LDAPADD: &str = "adding new entry \"uid=bob,ou=people,dc=hpc,dc=local\"\n";

pub const PROVISIONING_OUTPUTS: &str = r#"{
  "cluster_info": {
    "ssh_to_management_node": "ssh -J ubuntu@169.48.1.10 lsfadmin@10.241.0.4",
    "ssh_to_login_node": "ssh -J ubuntu@169.48.1.10 lsfadmin@10.241.16.4",
    "ssh_to_ldap_node": "ssh -J ubuntu@169.48.1.10 ubuntu@10.241.32.4",
    "vpc_name": "demo-vpc",
    "region_name": "us-east",
    "application_center": "ssh -L 8443:localhost:8443 -J ubuntu@169.48.1.10 lsfadmin@10.241.0.4",
    "application_center_url": "https://localhost:8443"
  }
}"#;
