//! Interactive loop: read a line, run one turn, print the outcome.

use async_trait::async_trait;
use rustyline::{DefaultEditor, error::ReadlineError};
use tokio::sync::mpsc;

use crate::{
    client::ChatClient,
    config::ClientConfig,
    domain::{UserInput, is_connection_failure, parse_input},
    error::ClientError,
    formatter::MessageFormatter,
};

/// One result of asking the user for a line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputEvent {
    Line(String),
    /// Ctrl+C at the prompt
    Interrupted,
    /// Ctrl+D or closed stdin
    Eof,
    Failed(String),
}

/// Source of user input lines
#[async_trait]
pub trait LineSource: Send {
    async fn next_line(&mut self, prompt: &str) -> InputEvent;
}

/// Line editor running on its own thread.
///
/// The thread only reads after it receives a prompt, so nothing is read
/// (and no prompt is drawn) while a turn is still printing its output.
pub struct RustylineSource {
    prompts: std::sync::mpsc::Sender<String>,
    events: mpsc::UnboundedReceiver<InputEvent>,
}

impl RustylineSource {
    pub fn spawn() -> Self {
        let (prompt_tx, prompt_rx) = std::sync::mpsc::channel::<String>();
        let (event_tx, event_rx) = mpsc::unbounded_channel::<InputEvent>();

        std::thread::spawn(move || {
            let mut rl = match DefaultEditor::new() {
                Ok(rl) => rl,
                Err(e) => {
                    let _ = event_tx.send(InputEvent::Failed(e.to_string()));
                    return;
                }
            };

            while let Ok(prompt) = prompt_rx.recv() {
                let event = match rl.readline(&prompt) {
                    Ok(line) => {
                        if !line.trim().is_empty() {
                            rl.add_history_entry(line.as_str()).ok();
                        }
                        InputEvent::Line(line)
                    }
                    Err(ReadlineError::Interrupted) => InputEvent::Interrupted,
                    Err(ReadlineError::Eof) => InputEvent::Eof,
                    Err(err) => InputEvent::Failed(err.to_string()),
                };

                let last = !matches!(event, InputEvent::Line(_));
                if event_tx.send(event).is_err() || last {
                    break;
                }
            }
        });

        Self {
            prompts: prompt_tx,
            events: event_rx,
        }
    }
}

#[async_trait]
impl LineSource for RustylineSource {
    async fn next_line(&mut self, prompt: &str) -> InputEvent {
        if self.prompts.send(prompt.to_string()).is_err() {
            return InputEvent::Eof;
        }
        self.events.recv().await.unwrap_or(InputEvent::Eof)
    }
}

/// Counts of what happened during one interactive run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionReport {
    pub turns: usize,
    pub failures: usize,
}

/// Run turns until the user exits, then close the client.
///
/// A failed turn is reported and the loop continues.
pub async fn drive<L>(client: &mut ChatClient, lines: &mut L) -> SessionReport
where
    L: LineSource + ?Sized,
{
    let mut report = SessionReport::default();
    let prompt = MessageFormatter::format_prompt(&client.config().actor);
    let listen_timeout = client.config().listen_timeout;

    loop {
        let line = match lines.next_line(&prompt).await {
            InputEvent::Line(line) => line,
            InputEvent::Interrupted => {
                tracing::info!("Interrupted");
                break;
            }
            InputEvent::Eof => {
                tracing::info!("EOF");
                break;
            }
            InputEvent::Failed(reason) => {
                tracing::error!("Readline error: {}", reason);
                break;
            }
        };

        let message = match parse_input(&line) {
            UserInput::Exit => break,
            UserInput::Blank => {
                println!("{}", MessageFormatter::format_blank_input());
                continue;
            }
            UserInput::Message(message) => message,
        };

        println!("{}", MessageFormatter::format_waiting());
        let result = tokio::select! {
            result = client.turn(&message) => result,
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Interrupted during turn");
                break;
            }
        };

        match result {
            Ok(outcome) => {
                report.turns += 1;
                print!("{}", MessageFormatter::format_outcome(&outcome, listen_timeout));
            }
            Err(e) => {
                report.failures += 1;
                if is_connection_failure(&e) {
                    tracing::error!("Could not reach the server: {}", e);
                } else {
                    tracing::warn!("Turn failed: {}", e);
                }
                print!("{}", MessageFormatter::format_turn_failed(&e));
            }
        }
    }

    client.close().await;
    println!("{}", MessageFormatter::format_goodbye());
    report
}

/// Connect, print the banner, and run the interactive loop on stdin.
///
/// Failing to establish the first session is fatal.
pub async fn run_client(config: ClientConfig) -> Result<SessionReport, ClientError> {
    let mut client = ChatClient::from_config(config)?;

    let session_id = match client.connect().await {
        Ok(session_id) => session_id,
        Err(e) => {
            client.close().await;
            return Err(e);
        }
    };
    tracing::info!("Connected to chat server!");
    print!(
        "{}",
        MessageFormatter::format_banner(&client.config().actor, &session_id)
    );

    let mut lines = RustylineSource::spawn();
    Ok(drive(&mut client, &mut lines).await)
}
