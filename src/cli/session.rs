//! One-shot and interactive chat drivers.
//!
//! Fragments are written to `out` as they arrive. Failures are reported on
//! `err` as a one-line `AI Error: ...` notice and never abort the
//! interactive loop.

use std::io::Write;

use color_eyre::eyre::{eyre, Result};
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::task::JoinHandle;

use crate::chat::{CancelToken, ChatClient, ReplyOutcome, ReplyStatus};
use crate::error::ChatError;
use crate::models::Conversation;

/// Typing this on its own line ends an interactive session.
pub const QUIT_COMMAND: &str = "/quit";

/// Prefix of the error notice printed when a reply fails.
pub const ERROR_NOTICE: &str = "AI Error";

/// Cancel `cancel` when the process receives Ctrl+C.
fn watch_interrupt(cancel: CancelToken) -> JoinHandle<()> {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            cancel.cancel();
        }
    })
}

fn report_error<E: Write>(err: &mut E, error: &ChatError) -> std::io::Result<()> {
    tracing::debug!(code = error.error_code(), error = %error, "reporting chat error");
    writeln!(err, "{}: {}", ERROR_NOTICE, error.user_message())
}

/// Send one message and stream the reply. Returns the outcome, or `None`
/// when the request never started streaming.
async fn exchange<W: Write, E: Write>(
    client: &ChatClient,
    conversation: &mut Conversation,
    input: &str,
    out: &mut W,
    err: &mut E,
) -> Result<Option<ReplyOutcome>> {
    let cancel = CancelToken::new();
    let watcher = watch_interrupt(cancel.clone());

    let mut write_result = Ok(());
    let result = client
        .send(conversation, input, cancel, |fragment| {
            if write_result.is_ok() {
                write_result = out.write_all(fragment.as_bytes()).and_then(|_| out.flush());
            }
        })
        .await;
    watcher.abort();
    write_result?;

    match result {
        Ok(outcome) => {
            if !outcome.reply.is_empty() {
                writeln!(out)?;
            }
            match &outcome.status {
                ReplyStatus::Failed(error) => report_error(err, error)?,
                ReplyStatus::Cancelled => writeln!(err, "(reply cancelled)")?,
                ReplyStatus::Completed(_) => {}
            }
            Ok(Some(outcome))
        }
        Err(error) => {
            report_error(err, &error)?;
            Ok(None)
        }
    }
}

/// Send `prompt` as a fresh conversation. Fails if the reply did not complete.
pub async fn run_prompt<W: Write, E: Write>(
    client: &ChatClient,
    prompt: &str,
    out: &mut W,
    err: &mut E,
) -> Result<ReplyOutcome> {
    let mut conversation = Conversation::new();
    match exchange(client, &mut conversation, prompt, out, err).await? {
        Some(outcome) if outcome.is_completed() => Ok(outcome),
        Some(outcome) if outcome.is_cancelled() => Err(eyre!("reply cancelled")),
        _ => Err(eyre!("reply failed")),
    }
}

/// Read messages line by line until `/quit`, end of input or Ctrl+C.
/// Returns the conversation so far.
pub async fn run_interactive<R, W, E>(
    client: &ChatClient,
    input: R,
    out: &mut W,
    err: &mut E,
) -> Result<Conversation>
where
    R: AsyncBufRead + Unpin,
    W: Write,
    E: Write,
{
    let mut conversation = Conversation::new();
    let mut lines = input.lines();

    loop {
        write!(out, "> ")?;
        out.flush()?;

        // Ctrl+C at the prompt ends the session; during a reply it cancels
        let next = tokio::select! {
            line = lines.next_line() => line?,
            _ = tokio::signal::ctrl_c() => None,
        };
        let Some(line) = next else {
            break;
        };
        let line = line.trim();
        if line == QUIT_COMMAND {
            break;
        }
        if line.is_empty() {
            continue;
        }

        exchange(client, &mut conversation, line, out, err).await?;
    }

    Ok(conversation)
}
