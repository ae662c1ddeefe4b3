//! Pure functions that pull facts out of scheduler and OS command output.
//!
//! None of these touch a session. Each returns either the extracted value or a
//! [`Error::NotFound`] carrying the full output, never an empty success.

use crate::markers;
use crate::{Error, Result};

/// Text between "My cluster name is" and "My master name is" in `lsid` output.
pub fn cluster_name(lsid: &str) -> Result<String> {
    let after = split_after(lsid, markers::CLUSTER_NAME_PREFIX)
        .ok_or_else(|| Error::not_found("cluster name", lsid))?;
    let (name, _) = after
        .split_once(markers::MASTER_NAME_PREFIX)
        .ok_or_else(|| Error::not_found("master name delimiter", lsid))?;
    Ok(name.trim().to_string())
}

/// Master host name reported by `lsid`.
pub fn master_name(lsid: &str) -> Result<String> {
    let after = split_after(lsid, markers::MASTER_NAME_PREFIX)
        .ok_or_else(|| Error::not_found("master name", lsid))?;
    Ok(after.trim().lines().next().unwrap_or_default().trim().to_string())
}

/// Version string following "IBM Spectrum LSF Standard", up to the next ", ".
pub fn lsf_version(lsid: &str) -> Result<String> {
    let after = split_after(lsid, markers::LSF_VERSION_PREFIX)
        .ok_or_else(|| Error::not_found("LSF version", lsid))?;
    let version = after.split(", ").next().unwrap_or_default();
    Ok(version.trim().to_string())
}

/// First maximal run of decimal digits, e.g. `1234` from `Job <1234> is submitted`.
pub fn job_id(submission: &str) -> Result<String> {
    let start = submission
        .find(|c: char| c.is_ascii_digit())
        .ok_or_else(|| Error::not_found("job ID", submission))?;
    let digits: String = submission[start..]
        .chars()
        .take_while(char::is_ascii_digit)
        .collect();
    Ok(digits)
}

/// Seconds the job sleeps for, read from the token after `sleep` in the
/// submitted command (`bsub -n 4 sleep 60` -> 60).
pub fn job_sleep_seconds(job_command: &str) -> Result<u64> {
    let after = split_after(job_command, "sleep")
        .ok_or_else(|| Error::not_found("sleep duration", job_command))?;
    let token = after.split_whitespace().next().unwrap_or_default();
    token.parse().map_err(|_| {
        Error::InvalidArgument(format!(
            "sleep duration '{token}' in job command '{job_command}' is not a number"
        ))
    })
}

/// True when `bjobs -a` output has a `<job_id> <user> DONE` row.
///
/// `bjobs` cuts the USER column at seven characters, so the owner matches
/// either in full or as exactly that cut.
pub fn job_done(bjobs: &str, job_id: &str, owner: &str) -> bool {
    let truncated: String = owner.chars().take(markers::BJOBS_USER_WIDTH).collect();
    let pattern = format!(
        r"\b{}\s+(?:{}|{})\s+{}\b",
        regex::escape(job_id),
        regex::escape(owner),
        regex::escape(&truncated),
        markers::JOB_DONE
    );
    match regex::Regex::new(&pattern) {
        Ok(re) => re.is_match(bjobs),
        Err(e) => {
            tracing::error!(pattern, error = %e, "invalid job completion pattern");
            false
        }
    }
}

/// Derives a dotted IP from a provider hostname such as `compute-rg1-4-10-0-0-5`.
///
/// The last four dash-separated tokens are joined with `.`. Hostnames with
/// fewer than four tokens produce a shorter, best-effort string rather than an
/// error.
pub fn host_to_ip(hostname: &str) -> String {
    let parts: Vec<&str> = hostname.split('-').collect();
    if parts.len() < 4 {
        tracing::warn!(hostname, "hostname has fewer than four segments");
    }
    parts[parts.len().saturating_sub(4)..].join(".")
}

/// Status column of a `bhosts -w` row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeStatus {
    Ok,
    Unreach,
    Closed,
    Other(String),
}

impl From<&str> for NodeStatus {
    fn from(s: &str) -> Self {
        match s {
            markers::STATUS_OK => NodeStatus::Ok,
            markers::STATUS_UNREACH => NodeStatus::Unreach,
            "closed" => NodeStatus::Closed,
            other => NodeStatus::Other(other.to_string()),
        }
    }
}

/// One cluster member as seen in a `bhosts -w` row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeRecord {
    pub hostname: String,
    pub ip: String,
    pub status: NodeStatus,
}

/// Every row of `bhosts -w` that has at least a host and a status column.
/// The header row is skipped.
pub fn node_records(bhosts: &str) -> Vec<NodeRecord> {
    bhosts
        .lines()
        .filter_map(|line| {
            let mut fields = line.split_whitespace();
            let hostname = fields.next()?;
            let status = fields.next()?;
            if hostname == markers::BHOSTS_HEADER {
                return None;
            }
            Some(NodeRecord {
                hostname: hostname.to_string(),
                ip: host_to_ip(hostname),
                status: NodeStatus::from(status),
            })
        })
        .collect()
}

/// Value of `key` in an os-release style dump, surrounding quotes removed.
pub fn property_value(content: &str, key: &str) -> Result<String> {
    let prefix = format!("{key}=");
    content
        .lines()
        .map(str::trim)
        .find_map(|line| line.strip_prefix(prefix.as_str()))
        .map(|v| v.trim_matches('"').to_string())
        .ok_or_else(|| Error::not_found(format!("property '{key}'"), content))
}

/// The two OS dialects the checks distinguish, plus everything else.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OsFamily {
    Ubuntu,
    RedHat,
    Other,
}

impl OsFamily {
    pub fn from_os_name(name: &str) -> Self {
        let lower = name.to_lowercase();
        if name == markers::OS_UBUNTU || lower == "ubuntu" {
            OsFamily::Ubuntu
        } else if lower.contains(markers::OS_RHEL_FRAGMENT) || lower.contains("red hat") {
            OsFamily::RedHat
        } else {
            OsFamily::Other
        }
    }

    pub fn mtu_command(self) -> &'static str {
        match self {
            OsFamily::Ubuntu => markers::cmd::IP_ADDR,
            _ => markers::cmd::IFCONFIG,
        }
    }

    pub fn dns_command(self) -> &'static str {
        match self {
            OsFamily::Ubuntu => markers::cmd::RESOLVECTL,
            _ => markers::cmd::RESOLV_CONF,
        }
    }

    pub fn expected_compute_key_paths(self) -> usize {
        match self {
            OsFamily::Ubuntu => markers::COMPUTE_KEY_PATHS_UBUNTU,
            _ => markers::COMPUTE_KEY_PATHS_OTHER,
        }
    }
}

/// `lscpu` lists off-line CPUs only when SMT siblings were disabled.
pub fn hyperthreading_enabled(lscpu: &str) -> bool {
    !lscpu.contains(markers::OFFLINE_CPU_MARKER)
}

pub fn count_occurrences(haystack: &str, needle: &str) -> usize {
    if needle.is_empty() {
        return 0;
    }
    haystack.matches(needle).count()
}

/// First expected substring that does not occur in `output`.
pub fn first_missing<'a>(output: &str, expected: &[&'a str]) -> Option<&'a str> {
    expected.iter().copied().find(|e| !output.contains(e))
}

/// First expected name that is not one of the whitespace separated fields of
/// `listing`.
pub fn first_missing_field<'a>(listing: &str, expected: &[&'a str]) -> Option<&'a str> {
    let fields: Vec<&str> = listing.split_whitespace().collect();
    expected.iter().copied().find(|e| !fields.contains(e))
}

/// Checks `lsf_daemons status`: each line mentioning `pid` must, in order,
/// name lim, res and sbatchd and report them running.
pub fn daemons_running(status: &str) -> Result<()> {
    let pid_lines: Vec<&str> = status.lines().filter(|l| l.contains("pid")).collect();
    for (i, daemon) in markers::DAEMONS_IN_ORDER.iter().enumerate() {
        let line = pid_lines
            .get(i)
            .ok_or_else(|| Error::not_found(format!("{daemon} daemon status"), status))?;
        if !reports_running(line, daemon) {
            return Err(Error::mismatch(
                format!("{daemon} daemon status"),
                markers::DAEMON_RUNNING,
                line.trim(),
            ));
        }
    }
    Ok(())
}

/// `line` names `daemon` as a word and its status word is `running`, not
/// `not running`.
fn reports_running(line: &str, daemon: &str) -> bool {
    let words: Vec<&str> = line
        .split(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
        .filter(|w| !w.is_empty())
        .collect();
    if !words.contains(&daemon) {
        return false;
    }
    match words.iter().position(|w| *w == markers::DAEMON_RUNNING) {
        Some(0) => true,
        Some(i) => words[i - 1] != "not",
        None => false,
    }
}

/// Non-empty trimmed lines.
pub fn lines(output: &str) -> Vec<String> {
    output
        .trim()
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(str::to_string)
        .collect()
}

/// Appends `.domain` unless the host already mentions it.
pub fn with_domain(host: &str, domain: &str) -> String {
    if host.contains(domain) {
        host.to_string()
    } else {
        format!("{host}.{domain}")
    }
}

/// Splits a two-label LDAP domain (`example.com`) into its `dc` components.
pub fn ldap_domain_components(domain: &str) -> Result<(&str, &str)> {
    let parts: Vec<&str> = domain.split('.').collect();
    match parts.as_slice() {
        [a, b] if !a.is_empty() && !b.is_empty() => Ok((a, b)),
        _ => Err(Error::InvalidArgument(format!(
            "invalid LDAP domain format: {domain}"
        ))),
    }
}

fn split_after<'a>(haystack: &'a str, marker: &str) -> Option<&'a str> {
    haystack.split_once(marker).map(|(_, rest)| rest)
}
