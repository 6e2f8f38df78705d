//! Operator prompt on the terminal.
//!
//! Prints one line per request and waits for the operator to type `y` or
//! `n`.  End of input (stdin closed, e.g. when running under a service
//! manager) rejects every request; run with `--auto-approve` in that case.

use async_trait::async_trait;
use chrono::Local;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tracing::{info, warn};

use crate::application::approval::{ApprovalPrompt, ApprovalRequest, Decision};

/// Reads answers from a line-oriented reader and writes questions to a
/// writer.  Production code uses stdin/stdout via [`StdinPrompt::stdio`].
pub struct StdinPrompt<R, W> {
    reader: R,
    writer: W,
}

impl StdinPrompt<BufReader<tokio::io::Stdin>, tokio::io::Stdout> {
    pub fn stdio() -> Self {
        Self::new(BufReader::new(tokio::io::stdin()), tokio::io::stdout())
    }
}

impl<R, W> StdinPrompt<R, W>
where
    R: AsyncBufRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    pub fn new(reader: R, writer: W) -> Self {
        Self { reader, writer }
    }

    async fn read_answer(&mut self, request: &ApprovalRequest) -> std::io::Result<Option<String>> {
        let question = format!(
            "[{}] Allow {} ({}x{}) to control the pointer? [y/N] ",
            timestamp(),
            request.peer,
            request.viewport.width,
            request.viewport.height
        );
        self.writer.write_all(question.as_bytes()).await?;
        self.writer.flush().await?;

        let mut line = String::new();
        if self.reader.read_line(&mut line).await? == 0 {
            return Ok(None);
        }
        Ok(Some(line))
    }
}

/// Local wall-clock time as `HH:MM:SS`.
fn timestamp() -> String {
    Local::now().format("%H:%M:%S").to_string()
}

#[async_trait]
impl<R, W> ApprovalPrompt for StdinPrompt<R, W>
where
    R: AsyncBufRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    async fn ask(&mut self, request: &ApprovalRequest) -> Decision {
        let decision = match self.read_answer(request).await {
            Ok(Some(answer)) => Decision::from_answer(&answer),
            Ok(None) => {
                warn!(peer = %request.peer, "operator input closed; rejecting");
                Decision::Reject
            }
            Err(e) => {
                warn!(peer = %request.peer, "operator prompt failed: {e}; rejecting");
                Decision::Reject
            }
        };
        info!(peer = %request.peer, ?decision, "operator decided");
        decision
    }
}
