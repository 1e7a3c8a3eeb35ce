//! Newline-delimited JSON signal ingestion.
//!
//! One signal per line: `{"type": "webhook.push", "parameters": {"repo": "foo"}}`.
//! Blank lines are ignored; malformed lines are logged and skipped.

use tokio::io::{AsyncBufRead, AsyncBufReadExt};

use sigflow_app::ports::SignalPublisher;
use sigflow_domain::signal::{InboundSignal, Signal};

#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error("malformed signal")]
    Malformed(#[from] serde_json::Error),
    #[error("signal type is missing")]
    MissingType,
}

/// Parse one line into a signal.
///
/// # Errors
///
/// Returns [`IngestError::Malformed`] for invalid JSON and
/// [`IngestError::MissingType`] when the type is empty.
pub fn parse_signal(line: &str) -> Result<Signal, IngestError> {
    let inbound: InboundSignal = serde_json::from_str(line)?;
    let signal = Signal::from(inbound);
    if signal.sensor_type().is_empty() {
        return Err(IngestError::MissingType);
    }
    Ok(signal)
}

/// Publish every signal read from `reader` until end of input or until the
/// bus closes. Returns the number of signals published.
pub async fn forward_signals<R, P>(reader: R, publisher: &P) -> usize
where
    R: AsyncBufRead + Unpin,
    P: SignalPublisher,
{
    let mut lines = reader.lines();
    let mut published = 0;
    let mut line_number = 0_usize;
    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => {
                tracing::info!(published, "end of signal input");
                break;
            }
            Err(err) => {
                tracing::error!(error = %err, "failed to read signal input");
                break;
            }
        };
        line_number += 1;
        if line.trim().is_empty() {
            continue;
        }
        let signal = match parse_signal(&line) {
            Ok(signal) => signal,
            Err(err) => {
                tracing::warn!(line = line_number, error = %err, "skipping signal");
                continue;
            }
        };
        if let Err(err) = publisher.publish(signal).await {
            tracing::error!(error = ?err, "signal bus closed, stopping ingestion");
            break;
        }
        published += 1;
    }
    published
}
