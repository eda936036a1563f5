//! Interactive terminal session

use agent_core::{AgentError, AgentEvent, Observer, Session};
use futures::StreamExt;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio_util::sync::CancellationToken;

const EXIT_COMMANDS: [&str; 3] = ["quit", "exit", "bye"];

pub fn is_exit_command(line: &str) -> bool {
    EXIT_COMMANDS.iter().any(|cmd| line.trim().eq_ignore_ascii_case(cmd))
}

/// Prints tool traffic to stderr when `--show-thinking` is on
pub struct ThinkingPrinter;

impl Observer for ThinkingPrinter {
    fn on_event(&self, event: &AgentEvent) {
        match event {
            AgentEvent::ToolInvoked { name, arguments } => eprintln!("\n  → {name}({arguments})"),
            AgentEvent::ToolCompleted { output, failed: false, .. } => eprintln!("  ← {output}"),
            AgentEvent::ToolCompleted { output, failed: true, .. } => eprintln!("  ✗ {output}"),
            _ => {}
        }
    }
}

/// Ask one question and write the answer as it arrives
pub async fn ask<W>(
    session: &mut Session,
    question: &str,
    cancel: CancellationToken,
    out: &mut W,
) -> anyhow::Result<()>
where
    W: AsyncWrite + Unpin,
{
    let mut fragments = std::pin::pin!(session.submit_with_cancel(question, cancel)?);
    while let Some(fragment) = fragments.next().await {
        out.write_all(fragment.as_bytes()).await?;
        out.flush().await?;
    }
    out.write_all(b"\n").await?;
    out.flush().await?;
    Ok(())
}

/// Prompt loop. Ends on an exit command, end of input, or Ctrl-C while
/// waiting for a question. Ctrl-C during a turn interrupts only that turn.
pub async fn run<R, W>(session: &mut Session, input: R, out: &mut W) -> anyhow::Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = input.lines();

    out.write_all(format!("{}\n", session.profile().greeting).as_bytes()).await?;

    loop {
        out.write_all(b"\nYour question: ").await?;
        out.flush().await?;

        let line = tokio::select! {
            line = lines.next_line() => line?,
            _ = tokio::signal::ctrl_c() => {
                out.write_all(b"\n\nSession ended by user. Goodbye!\n").await?;
                break;
            }
        };

        let Some(line) = line else {
            break;
        };
        let question = line.trim();

        if is_exit_command(question) {
            out.write_all(b"\nGoodbye!\n").await?;
            break;
        }
        if question.is_empty() {
            continue;
        }

        let cancel = CancellationToken::new();
        let interrupt = tokio::spawn({
            let cancel = cancel.clone();
            async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    cancel.cancel();
                }
            }
        });

        out.write_all(b"\nAssistant: ").await?;
        let answered = ask(session, question, cancel, out).await;
        interrupt.abort();

        if let Err(e) = answered {
            tracing::error!(error = %e, "Error processing user input");
            let text = e
                .downcast_ref::<AgentError>()
                .map_or_else(|| e.to_string(), AgentError::user_message);
            out.write_all(format!("Error: {text}\n").as_bytes()).await?;
        }
    }

    out.flush().await?;
    Ok(())
}
