//! Interactive terminal chat.
//!
//! A thin REPL over the orchestrator: reads a line, runs one turn,
//! prints the tool trace and the reply, and persists the conversation
//! after every exchange.

use std::io::Write;
use std::sync::Arc;

use anyhow::Result;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::debug;

use crate::orchestrator::{history_from_conversation, Orchestrator};
use crate::session::{SessionData, SessionStore};
use crate::types::{CallStatus, ConversationMessage, ToolCallRecord};

pub struct ChatCli {
    orchestrator: Arc<Orchestrator>,
    store: SessionStore,
    session: SessionData,
}

impl ChatCli {
    /// Resume the named session, or start a fresh one.
    pub fn new(
        orchestrator: Arc<Orchestrator>,
        store: SessionStore,
        session_id: Option<&str>,
    ) -> Result<Self> {
        let session = match session_id {
            Some(id) => store.load(id)?,
            None => SessionData::new("New Chat"),
        };
        Ok(Self {
            orchestrator,
            store,
            session,
        })
    }

    pub async fn run(&mut self) -> Result<()> {
        println!(
            "whisperfunc chat — session {} ({} tools). Type 'exit' to quit, '/clear' to reset.",
            self.session.id,
            self.orchestrator.registry().len()
        );

        let stdin = BufReader::new(tokio::io::stdin());
        let mut lines = stdin.lines();

        loop {
            print!("you> ");
            std::io::stdout().flush()?;

            let Some(line) = lines.next_line().await? else {
                break;
            };
            let input = line.trim();
            if input.is_empty() {
                continue;
            }
            match input {
                "exit" | "quit" => break,
                "/clear" => {
                    self.session.messages.clear();
                    self.store.save(&self.session)?;
                    println!("(conversation cleared)");
                    continue;
                }
                _ => {}
            }

            if let Err(e) = self.exchange(input).await {
                eprintln!("error: {e}");
            }
        }

        self.store.save(&self.session)?;
        println!("session saved: {}", self.session.id);
        Ok(())
    }

    /// One user message, one orchestrated turn, one persisted exchange.
    async fn exchange(&mut self, input: &str) -> Result<()> {
        self.session.messages.push(ConversationMessage::user(input));

        let history = history_from_conversation(&self.session.messages);
        let outcome = self.orchestrator.run_turn(history).await?;

        for call in &outcome.function_calls {
            print_call_trace(call);
        }
        println!("assistant> {}", outcome.content);
        debug!(finish_reason = %outcome.finish_reason, "turn finished");

        self.session.messages.push(ConversationMessage::assistant(
            &outcome.content,
            outcome.function_calls,
        ));
        self.store.save(&self.session)?;
        Ok(())
    }
}

fn print_call_trace(call: &ToolCallRecord) {
    let elapsed = call
        .execution_time_ms
        .map(|ms| format!(" ({ms}ms)"))
        .unwrap_or_default();
    match call.status {
        CallStatus::Completed => println!("  [tool] {} ok{elapsed}", call.name),
        CallStatus::Failed => println!(
            "  [tool] {} failed{elapsed}: {}",
            call.name,
            call.error.as_deref().unwrap_or("unknown error")
        ),
        // Records leaving the registry are always terminal.
        _ => println!("  [tool] {} {:?}", call.name, call.status),
    }
}

/// Print the saved sessions, newest first.
pub fn list_sessions(store: &SessionStore) -> Result<()> {
    let sessions = store.list()?;
    if sessions.is_empty() {
        println!("no saved sessions");
        return Ok(());
    }
    for session in sessions {
        println!(
            "{}  {}  {} message(s)  {}",
            session.id,
            session.created_at,
            session.messages.len(),
            session.name
        );
    }
    Ok(())
}
