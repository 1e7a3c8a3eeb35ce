//! External command actions.

use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tracing::Instrument;

use sigflow_domain::action::Invocable;
use sigflow_domain::error::BoxError;
use sigflow_domain::value::ParameterValue;

use crate::error::ProcessError;

/// How long output relays may keep running once a timed out program is killed.
const RELAY_GRACE: Duration = Duration::from_secs(1);

/// Runs a program once per invocation.
///
/// The invocation's arguments are appended, stringified, after the fixed
/// `args`. Every line the program writes is relayed to `tracing`: stdout at
/// `info`, stderr at `warn`. A non-zero exit status fails the invocation.
#[derive(Debug, Clone)]
pub struct CommandAction {
    program: String,
    args: Vec<String>,
    timeout: Option<Duration>,
}

impl CommandAction {
    #[must_use]
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            timeout: None,
        }
    }

    /// Fixed arguments placed before the invocation's arguments.
    #[must_use]
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Kill the program if it runs longer than `limit`.
    #[must_use]
    pub fn timeout(mut self, limit: Duration) -> Self {
        self.timeout = Some(limit);
        self
    }

    #[must_use]
    pub fn program(&self) -> &str {
        &self.program
    }

    async fn run(&self, arguments: Vec<ParameterValue>) -> Result<(), ProcessError> {
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .args(arguments.iter().map(ToString::to_string))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| ProcessError::Spawn {
                program: self.program.clone(),
                source,
            })?;
        tracing::debug!(pid = child.id(), "process spawned");

        let relays = [
            child.stdout.take().map(|out| spawn_relay(out, Stream::Stdout)),
            child.stderr.take().map(|err| spawn_relay(err, Stream::Stderr)),
        ];

        let waited = match self.timeout {
            Some(limit) => {
                if let Ok(waited) = tokio::time::timeout(limit, child.wait()).await {
                    waited
                } else {
                    if let Err(err) = child.kill().await {
                        tracing::warn!(error = %err, "failed to kill timed out process");
                    }
                    // Descendants of the killed program may still hold the pipes.
                    for mut relay in relays.into_iter().flatten() {
                        if tokio::time::timeout(RELAY_GRACE, &mut relay).await.is_err() {
                            relay.abort();
                        }
                    }
                    return Err(ProcessError::TimedOut {
                        program: self.program.clone(),
                        after: limit,
                    });
                }
            }
            None => child.wait().await,
        };
        let status = waited.map_err(|source| ProcessError::Wait {
            program: self.program.clone(),
            source,
        })?;

        for relay in relays.into_iter().flatten() {
            let _ = relay.await;
        }

        if status.success() {
            Ok(())
        } else {
            Err(ProcessError::ExitStatus {
                program: self.program.clone(),
                code: status.code(),
            })
        }
    }
}

#[async_trait]
impl Invocable for CommandAction {
    async fn invoke(&self, arguments: Vec<ParameterValue>) -> Result<(), BoxError> {
        let span = tracing::info_span!("command", program = %self.program);
        self.run(arguments).instrument(span).await?;
        Ok(())
    }
}

#[derive(Clone, Copy)]
enum Stream {
    Stdout,
    Stderr,
}

fn spawn_relay<R>(reader: R, stream: Stream) -> tokio::task::JoinHandle<()>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(
        async move {
            let mut lines = BufReader::new(reader).lines();
            loop {
                match lines.next_line().await {
                    Ok(Some(line)) => match stream {
                        Stream::Stdout => tracing::info!(target: "sigflow::action", "{line}"),
                        Stream::Stderr => tracing::warn!(target: "sigflow::action", "{line}"),
                    },
                    Ok(None) => break,
                    Err(err) => {
                        tracing::debug!(error = %err, "stopped relaying process output");
                        break;
                    }
                }
            }
        }
        .in_current_span(),
    )
}
