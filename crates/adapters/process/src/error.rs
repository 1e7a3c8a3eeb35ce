//! Process adapter error types.

use std::time::Duration;

use sigflow_domain::error::SigflowError;

/// Errors specific to the process adapter.
#[derive(Debug, thiserror::Error)]
pub enum ProcessError {
    /// The program could not be started.
    #[error("failed to spawn {program:?}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// Waiting on the child process failed.
    #[error("failed to wait on {program:?}")]
    Wait {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// The program ran past its time limit and was killed.
    #[error("{program:?} timed out after {after:?}")]
    TimedOut { program: String, after: Duration },

    /// The program exited unsuccessfully. `code` is `None` when it was
    /// terminated by a signal.
    #[error("{program:?} exited with status {}", describe_exit(.code.as_ref()))]
    ExitStatus { program: String, code: Option<i32> },

    /// The task hosting a job panicked or was cancelled.
    #[error("isolated task aborted")]
    Aborted(#[source] tokio::task::JoinError),
}

fn describe_exit(code: Option<&i32>) -> String {
    code.map_or_else(|| "signal".to_string(), ToString::to_string)
}

impl ProcessError {
    /// Convert into a [`SigflowError`] for propagation across port boundaries.
    ///
    /// Failures of the program itself are invocation failures; everything
    /// else happened at the execution boundary.
    #[must_use]
    pub fn into_domain(self) -> SigflowError {
        match self {
            Self::TimedOut { .. } | Self::ExitStatus { .. } => {
                SigflowError::Invocation(Box::new(self))
            }
            other => SigflowError::Transport(Box::new(other)),
        }
    }
}

impl From<ProcessError> for SigflowError {
    fn from(err: ProcessError) -> Self {
        err.into_domain()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_display_exit_status_with_code() {
        let err = ProcessError::ExitStatus {
            program: "deploy.sh".to_string(),
            code: Some(2),
        };
        assert_eq!(err.to_string(), "\"deploy.sh\" exited with status 2");
    }

    #[test]
    fn should_display_exit_status_for_signal() {
        let err = ProcessError::ExitStatus {
            program: "deploy.sh".to_string(),
            code: None,
        };
        assert_eq!(err.to_string(), "\"deploy.sh\" exited with status signal");
    }

    #[test]
    fn should_map_exit_status_to_invocation_error() {
        let err = ProcessError::ExitStatus {
            program: "deploy.sh".to_string(),
            code: Some(1),
        };
        assert!(matches!(err.into_domain(), SigflowError::Invocation(_)));
    }

    #[test]
    fn should_map_spawn_failure_to_transport_error() {
        let err = ProcessError::Spawn {
            program: "missing".to_string(),
            source: std::io::Error::from(std::io::ErrorKind::NotFound),
        };
        assert!(matches!(SigflowError::from(err), SigflowError::Transport(_)));
    }
}
