use std::sync::Arc;
use thiserror::Error;
use tokio::io::{self, AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::task::JoinSet;
use toolrelay_core::service::{ConversationService, InboundOutcome};
use tracing::{debug, info, warn};

#[derive(Debug, Error)]
pub enum StdioError {
    #[error("stdin/stdout I/O error: {0}")]
    Io(#[from] std::io::Error),
}

enum LoopControl {
    Continue,
    Exit,
}

/// Read lines from stdin and hand each to the service as one inbound message.
///
/// Every message runs in its own task so an `APPROVE` typed while a turn waits for
/// approval is handled right away.
pub async fn run(service: Arc<ConversationService>, principal: String) -> Result<(), StdioError> {
    let mut stdout = io::stdout();
    let mut lines = BufReader::new(io::stdin()).lines();
    let mut turns = JoinSet::new();

    print_help(&mut stdout).await?;

    loop {
        let line = tokio::select! {
            line = lines.next_line() => line?,
            _ = tokio::signal::ctrl_c() => {
                info!("interrupted, abandoning in-flight turns");
                turns.abort_all();
                return Ok(());
            }
        };
        let Some(line) = line else {
            debug!("stdin closed");
            break;
        };
        let input = line.trim();
        if input.is_empty() {
            continue;
        }

        match local_command(input, &mut stdout).await? {
            Some(LoopControl::Exit) => break,
            Some(LoopControl::Continue) => continue,
            None => {}
        }

        let service = service.clone();
        let principal = principal.clone();
        let text = input.to_string();
        turns.spawn(async move {
            match service.handle_inbound(&principal, &text).await {
                InboundOutcome::Failed(reason) => warn!(reason = %reason, "turn failed"),
                outcome => debug!(outcome = ?outcome, "inbound handled"),
            }
        });
        while turns.try_join_next().is_some() {}
    }

    while turns.join_next().await.is_some() {}
    stdout.flush().await?;
    Ok(())
}

/// Commands handled by the terminal itself rather than the service.
async fn local_command(
    input: &str,
    stdout: &mut io::Stdout,
) -> Result<Option<LoopControl>, StdioError> {
    match input.to_ascii_lowercase().as_str() {
        "/help" | "/?" => {
            print_help(stdout).await?;
            Ok(Some(LoopControl::Continue))
        }
        "/exit" | "/quit" | "/q" => {
            write_line(stdout, "Bye.").await?;
            Ok(Some(LoopControl::Exit))
        }
        _ => Ok(None),
    }
}

async fn print_help(stdout: &mut io::Stdout) -> Result<(), StdioError> {
    write_line(
        stdout,
        "Type a message to talk to the agent.\n\
         Commands:\n  \
         APPROVE <id> / DENY <id>  answer an approval request\n  \
         /reset                    start a fresh conversation\n  \
         /help                     show this help\n  \
         /exit                     quit",
    )
    .await
}

async fn write_line(stdout: &mut io::Stdout, text: &str) -> Result<(), StdioError> {
    stdout.write_all(text.as_bytes()).await?;
    stdout.write_all(b"\n").await?;
    stdout.flush().await?;
    Ok(())
}
