//! Bounded polling of scheduler state.
//!
//! Both pollers split into a state enum, a pure transition function over the
//! latest observation, and a thin async driver that owns the clock and the
//! session. The transitions are tested without any session at all.

mod drain;
mod job;

pub use drain::{WaitFor, WaitState, no_dynamic_nodes, wait_for_drain, wait_until};
pub use job::{
    JobOutcome, JobSize, JobState, JobWatch, Observation, job_command, job_deadline, run_job,
};
