//! Submit a workload and watch it until it is DONE or its deadline passes.

use crate::config::Timing;
use crate::executor::CommandExecutor;
use crate::markers::{self, cmd};
use crate::{Error, Result, parser};
use std::time::Duration;
use tokio::time::Instant;

/// Where a submitted job is, as far as `bjobs` lets us tell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobState {
    Submitted,
    Polling { polls: u32 },
    Done { polls: u32 },
    TimedOut { polls: u32 },
}

impl JobState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobState::Done { .. } | JobState::TimedOut { .. })
    }

    fn polls(&self) -> u32 {
        match self {
            JobState::Submitted => 0,
            JobState::Polling { polls }
            | JobState::Done { polls }
            | JobState::TimedOut { polls } => *polls,
        }
    }
}

/// What the driver saw on one iteration. `bjobs` is `None` when the deadline
/// had already passed and no status query was made.
#[derive(Debug, Clone, Copy)]
pub struct Observation<'a> {
    pub elapsed: Duration,
    pub bjobs: Option<&'a str>,
}

/// The fixed facts of one submitted job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobWatch {
    pub job_id: String,
    pub owner: String,
    pub deadline: Duration,
}

impl JobWatch {
    /// Next state given the latest observation. Terminal states never change.
    pub fn transition(&self, state: JobState, observation: Observation<'_>) -> JobState {
        if state.is_terminal() {
            return state;
        }
        let polls = state.polls() + u32::from(observation.bjobs.is_some());
        match observation.bjobs {
            Some(out) if parser::job_done(out, &self.job_id, &self.owner) => JobState::Done { polls },
            _ if observation.elapsed >= self.deadline => JobState::TimedOut { polls },
            _ => JobState::Polling { polls },
        }
    }
}

/// How a job run ended when it did not fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobOutcome {
    pub job_id: String,
    pub polls: u32,
    pub elapsed: Duration,
}

/// Deadline for a job command: the configured base plus the sleep the
/// command itself asks for.
pub fn job_deadline(job_command: &str, timing: &Timing) -> Result<Duration> {
    let sleep = parser::job_sleep_seconds(job_command)?;
    Ok(timing.job_timeout_base + Duration::from_secs(sleep))
}

/// Submits `job_command`, then polls `bjobs -a` until the job shows DONE for
/// `owner`.
///
/// Any failed remote command is fatal straight away. Past the deadline the
/// job is killed and [`Error::JobTimedOut`] is returned; a failed kill is
/// attached to that error rather than replacing it.
pub async fn run_job<E: CommandExecutor>(
    session: &E,
    job_command: &str,
    owner: &str,
    timing: &Timing,
) -> Result<JobOutcome> {
    let deadline = job_deadline(job_command, timing)?;
    let start = Instant::now();

    let submission = session
        .execute(job_command)
        .await
        .map_err(|e| e.context(format!("failed to run '{job_command}' command")))?;
    tracing::info!(job_command, output = %submission.trim(), "submitted job");

    let watch = JobWatch {
        job_id: parser::job_id(&submission)?,
        owner: owner.to_string(),
        deadline,
    };
    let status_command = format!("{}{}", markers::LOGIN_NODE_PROFILE, cmd::BJOBS_ALL);

    let mut state = JobState::Submitted;
    loop {
        let elapsed = start.elapsed();
        let bjobs = if elapsed < deadline {
            Some(
                session
                    .execute(&status_command)
                    .await
                    .map_err(|e| e.context("failed to run 'bjobs' command"))?,
            )
        } else {
            None
        };

        state = watch.transition(
            state,
            Observation {
                elapsed,
                bjobs: bjobs.as_deref(),
            },
        );

        match state {
            JobState::Done { polls } => {
                tracing::info!(job_id = %watch.job_id, polls, ?elapsed, "job has executed successfully");
                return Ok(JobOutcome {
                    job_id: watch.job_id,
                    polls,
                    elapsed: start.elapsed(),
                });
            }
            JobState::TimedOut { .. } => {
                return Err(cancel_after_timeout(session, &watch).await);
            }
            JobState::Submitted | JobState::Polling { .. } => {
                tracing::info!(
                    job_id = %watch.job_id,
                    ?elapsed,
                    "waiting for dynamic node creation and job completion"
                );
                let remaining = deadline.saturating_sub(start.elapsed());
                tokio::time::sleep(timing.job_poll_interval.min(remaining)).await;
            }
        }
    }
}

async fn cancel_after_timeout<E: CommandExecutor>(session: &E, watch: &JobWatch) -> Error {
    let kill = format!("{}bkill {}", markers::LOGIN_NODE_PROFILE, watch.job_id);
    let cancel = match session.execute(&kill).await {
        Ok(_) => {
            tracing::warn!(job_id = %watch.job_id, "job exceeded its deadline and was killed");
            None
        }
        Err(e) => {
            tracing::error!(job_id = %watch.job_id, error = %e, "failed to kill timed out job");
            Some(Box::new(e))
        }
    };
    Error::JobTimedOut {
        job_id: watch.job_id.clone(),
        after: watch.deadline,
        cancel,
    }
}

/// Memory class of the canned sleep jobs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum JobSize {
    #[default]
    Low,
    Med,
    High,
}

impl std::str::FromStr for JobSize {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "low" => Ok(JobSize::Low),
            "med" | "medium" => Ok(JobSize::Med),
            "high" => Ok(JobSize::High),
            other => Err(Error::InvalidArgument(format!("unknown job size: {other}"))),
        }
    }
}

impl JobSize {
    /// Like `from_str` but anything unrecognised is a low-memory job.
    pub fn parse_lenient(s: &str) -> Self {
        s.parse().unwrap_or_default()
    }

    fn memory(self) -> &'static str {
        match self {
            JobSize::Low => "10G",
            JobSize::Med => "30G",
            JobSize::High => "90G",
        }
    }
}

/// Canned `bsub` command for a zone. `us-south` zones run on the mx3d
/// profile family, everything else on mx2.
pub fn job_command(zone: &str, size: JobSize) -> String {
    let family = if zone.contains("us-south") { "mx3d" } else { "mx2" };
    format!(
        r#"bsub -J myjob[1-2] -R "select[family={family}] rusage[mem={}]" sleep 60"#,
        size.memory()
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::{Reply, ScriptedExecutor};

    fn watch() -> JobWatch {
        JobWatch {
            job_id: "1234".to_string(),
            owner: "lsfadmin".to_string(),
            deadline: Duration::from_secs(360),
        }
    }

    fn seen(secs: u64, bjobs: &str) -> Observation<'_> {
        Observation {
            elapsed: Duration::from_secs(secs),
            bjobs: Some(bjobs),
        }
    }

    #[test]
    fn test_transition_to_done() {
        let w = watch();
        let s = w.transition(JobState::Submitted, seen(0, "1234 lsfadmi PEND normal"));
        assert_eq!(s, JobState::Polling { polls: 1 });
        let s = w.transition(s, seen(50, "1234 lsfadmi RUN normal"));
        assert_eq!(s, JobState::Polling { polls: 2 });
        let s = w.transition(s, seen(100, "1234     lsfadmin DONE normal"));
        assert_eq!(s, JobState::Done { polls: 3 });
    }

    #[test]
    fn test_transition_to_timeout() {
        let w = watch();
        let s = w.transition(
            JobState::Polling { polls: 7 },
            Observation {
                elapsed: Duration::from_secs(360),
                bjobs: None,
            },
        );
        assert_eq!(s, JobState::TimedOut { polls: 7 });
    }

    #[test]
    fn test_done_wins_over_deadline_and_terminal_states_stick() {
        let w = watch();
        let s = w.transition(JobState::Polling { polls: 1 }, seen(400, "1234 lsfadmin DONE"));
        assert_eq!(s, JobState::Done { polls: 2 });
        let s = w.transition(s, seen(500, "nothing"));
        assert_eq!(s, JobState::Done { polls: 2 });
    }

    #[test]
    fn test_deadline_from_command() {
        let timing = Timing::default();
        assert_eq!(
            job_deadline("bsub -n 4 sleep 60", &timing).unwrap(),
            Duration::from_secs(360)
        );
        assert!(job_deadline("bsub -n 4 hostname", &timing).is_err());
    }

    #[test]
    fn test_job_command_selection() {
        assert_eq!(
            job_command("us-south-1", JobSize::Med),
            r#"bsub -J myjob[1-2] -R "select[family=mx3d] rusage[mem=30G]" sleep 60"#
        );
        assert!(job_command("eu-de-2", JobSize::High).contains("family=mx2] rusage[mem=90G]"));
        assert_eq!(JobSize::parse_lenient("HIGH"), JobSize::High);
        assert_eq!(JobSize::parse_lenient("whatever"), JobSize::Low);
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_job_until_done() {
        let exec = ScriptedExecutor::new()
            .on("bsub", Reply::ok("Job <1234> is submitted to default queue <normal>."))
            .on_sequence(
                "bjobs -a",
                vec![
                    Reply::ok("JOBID USER STAT\n1234 lsfadmi PEND"),
                    Reply::ok("JOBID USER STAT\n1234 lsfadmi RUN"),
                    Reply::ok("JOBID USER STAT\n1234     lsfadmin DONE"),
                ],
            );
        let outcome = run_job(&exec, "bsub -n 4 sleep 60", "lsfadmin", &Timing::default())
            .await
            .unwrap();
        assert_eq!(outcome.job_id, "1234");
        assert_eq!(outcome.polls, 3);
        assert_eq!(outcome.elapsed, Duration::from_secs(100));
        assert_eq!(exec.count_calls("bkill"), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_job_times_out_and_kills() {
        let exec = ScriptedExecutor::new()
            .on("bsub", Reply::ok("Job <77> is submitted"))
            .on("bjobs -a", Reply::ok("77 lsfadmi RUN"))
            .on("bkill 77", Reply::ok("Job <77> is being terminated"));
        let start = Instant::now();
        let err = run_job(&exec, "bsub -n 4 sleep 60", "lsfadmin", &Timing::default())
            .await
            .unwrap_err();
        assert!(start.elapsed() <= Duration::from_secs(360));
        match err {
            Error::JobTimedOut { job_id, after, cancel } => {
                assert_eq!(job_id, "77");
                assert_eq!(after, Duration::from_secs(360));
                assert!(cancel.is_none());
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(exec.count_calls("bkill"), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_kill_is_nested_under_timeout() {
        let exec = ScriptedExecutor::new()
            .on("bsub", Reply::ok("Job <77> is submitted"))
            .on("bjobs -a", Reply::ok("77 lsfadmi RUN"))
            .on("bkill", Reply::fail("exit status 255"));
        let err = run_job(&exec, "bsub -n 4 sleep 60", "lsfadmin", &Timing::default())
            .await
            .unwrap_err();
        assert!(matches!(&err, Error::JobTimedOut { cancel: Some(_), .. }));
        assert!(err.to_string().contains("exceeded the specified time"));
    }

    #[tokio::test]
    async fn test_polling_failure_is_fatal() {
        let exec = ScriptedExecutor::new()
            .on("bsub", Reply::ok("Job <5> is submitted"))
            .on("bjobs -a", Reply::fail("exit status 1"));
        let err = run_job(&exec, "bsub -n 4 sleep 60", "lsfadmin", &Timing::default())
            .await
            .unwrap_err();
        assert!(err.is_transport());
        assert_eq!(exec.count_calls("bjobs"), 1);
    }

    #[tokio::test]
    async fn test_submission_without_job_id() {
        let exec = ScriptedExecutor::new().on("bsub", Reply::ok("Request aborted by esub."));
        let err = run_job(&exec, "bsub -n 4 sleep 60", "lsfadmin", &Timing::default())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NotFound { .. }));
    }
}
