//! Interactive REPL for the service desk
//!
//! Each line is one submission to the agent. Slash commands attach an image
//! to the next submission or manage the local chat log.

use anyhow::Result;
use rustyline::error::ReadlineError;
use rustyline::history::DefaultHistory;
use rustyline::{DefaultEditor, Editor};
use std::path::PathBuf;

use crate::agent::AgentState;
use crate::commands::{load_config, Desk, RunOptions, BOLD, CYAN, DIM, GREEN, RESET, YELLOW};
use crate::transcript::Transcript;

/// Longest message accepted from the prompt
pub const MAX_MESSAGE_CHARS: usize = 500;

const OVERVIEW: &str = "\
This assistant provides automated support for technical issues by:
  - Raising ServiceNow tickets.
  - Creating knowledge articles based on resolved queries.
  - Using a language model for intelligent responses.
  - Fetching the latest information on technical topics.";

/// A parsed line of input
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplCommand {
    /// Text for the agent
    Message(String),
    /// Attach an image to the next submission
    Image(PathBuf),
    /// Drop the pending attachment
    Detach,
    History,
    Clear,
    Help,
    Quit,
    /// Malformed or unknown slash command
    Invalid(String),
}

/// Parse one input line
pub fn parse_command(line: &str) -> ReplCommand {
    let line = line.trim();
    if !line.starts_with('/') {
        return ReplCommand::Message(line.to_string());
    }

    let mut parts = line.splitn(2, ' ');
    let cmd = parts.next().unwrap_or_default().to_lowercase();
    let args = parts.next().unwrap_or_default().trim();

    match cmd.as_str() {
        "/image" | "/img" if args.is_empty() => ReplCommand::Invalid("Usage: /image <path>".to_string()),
        "/image" | "/img" => ReplCommand::Image(PathBuf::from(args)),
        "/send" => ReplCommand::Message(String::new()),
        "/detach" => ReplCommand::Detach,
        "/history" => ReplCommand::History,
        "/clear" => ReplCommand::Clear,
        "/help" | "/h" | "/?" => ReplCommand::Help,
        "/exit" | "/quit" | "/q" => ReplCommand::Quit,
        _ => ReplCommand::Invalid(format!("Unknown command: {} (type /help)", cmd)),
    }
}

/// REPL state
struct ReplState {
    desk: Desk,
    transcript: Transcript,
    /// Image attached to the next submission
    pending_image: Option<PathBuf>,
}

/// Run the interactive REPL
pub async fn run(opts: RunOptions) -> Result<()> {
    let config = load_config(&opts)?;
    let desk = Desk::from_config(&config, opts.checkpoint_dir.as_deref())?;

    let mut state = ReplState::new(desk);

    let mut rl: Editor<(), DefaultHistory> = DefaultEditor::new()?;

    print_welcome(&state, &config.openai.model);

    loop {
        let prompt = match state.pending_image {
            Some(_) => format!("{}desk [image]>{} ", CYAN, RESET),
            None => format!("{}desk>{} ", CYAN, RESET),
        };

        match rl.readline(&prompt) {
            Ok(line) => {
                let line = line.trim();

                if line.is_empty() {
                    continue;
                }

                let _ = rl.add_history_entry(line);

                match parse_command(line) {
                    ReplCommand::Quit => {
                        println!("{}Goodbye!{}", DIM, RESET);
                        break;
                    }
                    ReplCommand::Message(text) => {
                        if let Err(e) = send_message(&mut state, &text).await {
                            eprintln!("{}Error:{} {:#}", YELLOW, RESET, e);
                        }
                    }
                    command => handle_command(&mut state, command),
                }
            }
            Err(ReadlineError::Interrupted) => {
                println!("{}^C{}", DIM, RESET);
                continue;
            }
            Err(ReadlineError::Eof) => {
                println!("{}Goodbye!{}", DIM, RESET);
                break;
            }
            Err(e) => {
                eprintln!("{}Error:{} {}", YELLOW, RESET, e);
                break;
            }
        }
    }

    Ok(())
}

fn print_welcome(state: &ReplState, model: &str) {
    println!();
    println!("{}Service Desk Chat{}", BOLD, RESET);
    println!();
    println!("{}", OVERVIEW);
    println!();
    println!("  Model:  {}", model);
    println!("  Thread: {}", state.desk.thread());
    println!("  Type {}/help{} for commands", CYAN, RESET);
    println!();
}

fn print_help() {
    println!();
    println!("{}Commands:{}", BOLD, RESET);
    println!("  {}/image{} <path>      Attach an image to the next message", CYAN, RESET);
    println!("  {}/send{}              Send the attached image without text", CYAN, RESET);
    println!("  {}/detach{}            Drop the attached image", CYAN, RESET);
    println!("  {}/history{}           Show the chat log (newest first)", CYAN, RESET);
    println!("  {}/clear{}             Clear the chat log", CYAN, RESET);
    println!("  {}/help{}, /h, /?      Show this help", CYAN, RESET);
    println!("  {}/exit{}, /quit, /q   Exit the REPL", CYAN, RESET);
    println!();
    println!("{}Tips:{}", DIM, RESET);
    println!("  - An attached image is sent with your next message");
    println!("  - Press Ctrl+D to exit");
    println!();
}

fn handle_command(state: &mut ReplState, command: ReplCommand) {
    match command {
        ReplCommand::Image(path) => {
            if let Err(e) = crate::image::mime_type(&path) {
                eprintln!("{}Error:{} {}", YELLOW, RESET, e);
            } else if !path.is_file() {
                eprintln!("{}Error:{} No such file: {}", YELLOW, RESET, path.display());
            } else {
                println!("{}Attached:{} {}", DIM, RESET, path.display());
                state.pending_image = Some(path);
            }
        }
        ReplCommand::Detach => {
            state.pending_image = None;
            println!("{}Attachment dropped{}", DIM, RESET);
        }
        ReplCommand::History => print_history(&state.transcript),
        ReplCommand::Clear => {
            state.transcript.clear();
            println!("{}Chat log cleared{}", DIM, RESET);
        }
        ReplCommand::Help => print_help(),
        ReplCommand::Invalid(msg) => eprintln!("{}{}{}", YELLOW, msg, RESET),
        ReplCommand::Message(_) | ReplCommand::Quit => {}
    }
}

fn print_history(transcript: &Transcript) {
    println!();
    println!("{}Chat History{}", BOLD, RESET);
    if transcript.is_empty() {
        println!("{}(empty){}", DIM, RESET);
    }
    for line in transcript.render() {
        println!("{}", line);
    }
    println!();
}

impl ReplState {
    fn new(desk: Desk) -> Self {
        Self {
            desk,
            transcript: Transcript::new(),
            pending_image: None,
        }
    }

    /// Submit a line with any pending image and record it in the chat log
    ///
    /// A failed submission keeps the image attached and leaves the log as is.
    async fn submit(&mut self, input: &str) -> Result<Option<AgentState>> {
        if input.chars().count() > MAX_MESSAGE_CHARS {
            anyhow::bail!("Message is longer than {} characters", MAX_MESSAGE_CHARS);
        }

        let image = self.pending_image.take();
        let agent_state = match self.desk.submit(input, image.as_deref()).await {
            Ok(Some(s)) => s,
            Ok(None) => return Ok(None),
            Err(e) => {
                self.pending_image = image;
                return Err(e);
            }
        };

        if !input.is_empty() {
            self.transcript.push("user", input);
        }
        self.transcript.push("agent", agent_state.reply());

        Ok(Some(agent_state))
    }
}

/// Send one submission and print the agent's reply
async fn send_message(state: &mut ReplState, input: &str) -> Result<()> {
    let Some(agent_state) = state.submit(input).await? else {
        return Ok(());
    };

    let reply = agent_state.reply();
    println!();
    match agent_state.final_response {
        Some(_) => println!("{}{}{}", GREEN, reply, RESET),
        None => println!("{}Error:{} {}", YELLOW, RESET, reply),
    }
    println!();
    println!(
        "{}[{} turns, {} tool calls]{}",
        DIM, agent_state.iteration, agent_state.tool_calls, RESET
    );

    Ok(())
}
