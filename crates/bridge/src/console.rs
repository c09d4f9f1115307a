//! Console chat source — terminal lines as chat events.
//!
//! Used by `minebrain offline`: every line typed on stdin becomes a chat
//! message from a fixed sender, so the operator can talk to a simulated
//! world without a game client.

use minebrain_core::ChatEvent;
use tokio::io::{self, AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::warn;

/// Reads lines from stdin and sends them as `sender`.
pub fn spawn_stdin(sender: impl Into<String>) -> mpsc::Receiver<ChatEvent> {
    spawn_reader(BufReader::new(io::stdin()), sender)
}

/// Reads lines from any buffered source until EOF or an exit word.
pub fn spawn_reader<R>(reader: R, sender: impl Into<String>) -> mpsc::Receiver<ChatEvent>
where
    R: AsyncBufRead + Unpin + Send + 'static,
{
    let (tx, rx) = mpsc::channel(32);
    let sender = sender.into();

    tokio::spawn(async move {
        let mut lines = reader.lines();
        loop {
            match lines.next_line().await {
                Ok(Some(line)) => {
                    let line = line.trim().to_string();
                    if line.is_empty() {
                        continue;
                    }

                    if matches!(line.as_str(), "exit" | "quit" | "/exit" | "/quit" | ":q") {
                        break;
                    }

                    if tx.send(ChatEvent::new(&sender, line)).await.is_err() {
                        break;
                    }
                }
                Ok(None) => break, // EOF (Ctrl+D)
                Err(e) => {
                    warn!(error = %e, "Console read failed");
                    break;
                }
            }
        }
    });

    rx
}
