//! Interactive chat REPL for the Kimi agent.
//!
//! Each line goes through the tool-call dispatcher, so the model can run
//! Python or JavaScript snippets locally. `--plain` switches to streaming
//! chat without tools. Uses rustyline for editing and history.

use clap::Parser;
use kimi_agent::agent::{AgentConfig, Dispatcher};
use kimi_agent::executor::ExecutorConfig;
use kimi_agent::moonshot::{MoonshotClient, MoonshotConfig, RequestBuilder};
use kimi_agent::session::Session;
use rustyline::Editor;
use rustyline::error::ReadlineError;
use rustyline::history::FileHistory;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// CLI arguments
#[derive(Debug, Parser)]
#[command(name = "kimi-chat")]
#[command(about = "Interactive Kimi chat with local code execution")]
struct Args {
    /// Plain streaming chat, no tool calling
    #[arg(long)]
    plain: bool,

    /// System prompt for the session
    #[arg(long)]
    system: Option<String>,

    /// History file path
    #[arg(long)]
    history_file: Option<PathBuf>,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    // Build runtime for async network operations
    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(run(args))
}

async fn run(args: Args) -> Result<(), Box<dyn std::error::Error>> {
    let model_config = MoonshotConfig::from_env()?;
    let client = MoonshotClient::new(model_config.clone())?;

    let agent_config = AgentConfig::from_env();
    let dispatcher = Dispatcher::new(
        Arc::new(client.clone()),
        model_config.clone(),
        &agent_config,
        ExecutorConfig::default(),
    );

    let mut session = match &args.system {
        Some(prompt) => Session::with_system(prompt.clone()),
        None => Session::new(),
    };

    let history_file = args.history_file.unwrap_or_else(|| {
        dirs::home_dir()
            .map(|p| p.join(".kimi_chat_history"))
            .unwrap_or_else(|| PathBuf::from(".kimi_chat_history"))
    });

    let mut rl: Editor<(), FileHistory> = Editor::new()?;
    if history_file.exists()
        && let Err(e) = rl.load_history(&history_file)
    {
        eprintln!("[warning] Failed to load history: {}", e);
    }

    println!("kimi-chat v{}", env!("CARGO_PKG_VERSION"));
    println!(
        "Model: {} (tools: {})",
        model_config.model,
        if args.plain { "off" } else { "on" }
    );
    println!("Commands: /clear resets the session, /save <path> writes the transcript.");
    println!("Type your message and press Enter. Ctrl+D to quit.");
    println!();

    loop {
        match rl.readline("> ") {
            Ok(line) => {
                let input = line.trim();
                if input.is_empty() {
                    continue;
                }
                let _ = rl.add_history_entry(input);

                if input == "/clear" {
                    session.clear();
                    println!("[cleared]");
                    continue;
                }
                if let Some(rest) = input.strip_prefix("/save") {
                    let path = rest.trim();
                    if path.is_empty() {
                        println!("[error] usage: /save <path>");
                    } else {
                        match session.save(Path::new(path)) {
                            Ok(()) => println!("[saved] {}", path),
                            Err(e) => println!("[error] {}", e),
                        }
                    }
                    continue;
                }

                if args.plain {
                    stream_chat(&client, &model_config, &mut session, input).await;
                } else {
                    let outcome = dispatcher.dispatch(&mut session, input).await;
                    if outcome.is_error {
                        println!("[error] {}", outcome.content);
                    } else {
                        if let Some(exec) = &outcome.execution {
                            println!(
                                "[ran code: exit_code={}{}]",
                                exec.exit_code,
                                if exec.timed_out { ", timed out" } else { "" }
                            );
                        }
                        println!("{}", outcome.content);
                    }
                }
            }
            Err(ReadlineError::Interrupted) => {
                // Ctrl+C - cancel current input, continue
                println!("^C");
                continue;
            }
            Err(ReadlineError::Eof) => {
                // Ctrl+D - exit
                break;
            }
            Err(e) => {
                eprintln!("[error] Readline error: {}", e);
                break;
            }
        }
    }

    if let Err(e) = rl.save_history(&history_file) {
        eprintln!("[warning] Failed to save history: {}", e);
    }

    println!("\nGoodbye!");
    Ok(())
}

/// Streaming round-trip without tools; deltas are printed as they arrive.
async fn stream_chat(
    client: &MoonshotClient,
    model_config: &MoonshotConfig,
    session: &mut Session,
    input: &str,
) {
    session.push_user(input);

    let request = match RequestBuilder::new(&model_config.model)
        .messages(session.messages())
        .temperature(model_config.temperature)
        .max_tokens(model_config.max_tokens)
        .build()
    {
        Ok(request) => request,
        Err(e) => {
            println!("[error] {}", e);
            return;
        }
    };

    let mut print_delta = |delta: &str| {
        print!("{}", delta);
        let _ = io::stdout().flush();
    };

    match client.chat_completion_stream(request, &mut print_delta).await {
        Ok(full_text) => {
            println!();
            session.push_assistant(full_text);
        }
        Err(e) => println!("[error] {}", e),
    }
}
