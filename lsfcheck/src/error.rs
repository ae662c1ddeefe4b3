use std::time::Duration;

pub type Result<T> = std::result::Result<T, Error>;

/// Everything a check, a poller or a session can fail with.
///
/// The variants follow how a failure should be read by whoever looks at the
/// report: a precondition was not met, the remote command itself failed, the
/// output did not contain what we parse for, the parsed value was wrong, or a
/// bounded wait ran out.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("ERROR: {what} cannot be empty")]
    EmptyInput { what: &'static str },

    #[error("failed to execute command '{command}': {reason}")]
    Transport { command: String, reason: String },

    #[error("{what} not found in output:\n{output}")]
    NotFound { what: String, output: String },

    #[error("{fact} mismatch: expected {expected}, but found {actual}")]
    Mismatch {
        fact: String,
        expected: String,
        actual: String,
    },

    #[error("timeout of {after:?} occurred while waiting for {what}")]
    Timeout { what: String, after: Duration },

    #[error("{}", job_timed_out_message(.job_id, .after, .cancel.as_deref()))]
    JobTimedOut {
        job_id: String,
        after: Duration,
        cancel: Option<Box<Error>>,
    },

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("{context}: {source}")]
    Context {
        context: String,
        #[source]
        source: Box<Error>,
    },
}

fn job_timed_out_message(job_id: &str, after: &Duration, cancel: Option<&Error>) -> String {
    match cancel {
        None => format!("job execution for ID {job_id} exceeded the specified time ({after:?})"),
        Some(e) => format!(
            "job execution for ID {job_id} exceeded the specified time ({after:?}); \
             failed to run 'bkill' command: {e}"
        ),
    }
}

impl Error {
    pub fn transport(command: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::Transport {
            command: command.into(),
            reason: reason.into(),
        }
    }

    pub fn not_found(what: impl Into<String>, output: impl Into<String>) -> Self {
        Error::NotFound {
            what: what.into(),
            output: output.into(),
        }
    }

    pub fn mismatch(
        fact: impl Into<String>,
        expected: impl ToString,
        actual: impl ToString,
    ) -> Self {
        Error::Mismatch {
            fact: fact.into(),
            expected: expected.to_string(),
            actual: actual.to_string(),
        }
    }

    /// Wraps the error with a short description of the step that failed,
    /// e.g. the node it was running against.
    pub fn context(self, context: impl Into<String>) -> Self {
        Error::Context {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// The innermost error, skipping any [`Error::Context`] layers.
    pub fn root(&self) -> &Error {
        match self {
            Error::Context { source, .. } => source.root(),
            e => e,
        }
    }

    pub fn is_transport(&self) -> bool {
        matches!(self.root(), Error::Transport { .. })
    }
}
