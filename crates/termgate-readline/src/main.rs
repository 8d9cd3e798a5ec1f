use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use colored::Colorize;
use crossterm::cursor::MoveTo;
use crossterm::terminal::{Clear, ClearType};
use rustyline::Editor;
use rustyline::error::ReadlineError;
use rustyline::history::DefaultHistory;
use tracing_subscriber::EnvFilter;

use termgate_core::confirm::is_affirmative;
use termgate_core::{AppConfig, Capabilities, Confirm, ExecOptions, ExecOutcome, Executor, Session};
use termgate_interaction::bridge_from_config;

mod helper;

use helper::ShellHelper;

const BANNER: &str = "termgate ready. Type 'help' for commands.";

#[derive(Parser)]
#[command(name = "termgate")]
#[command(about = "Interactive shell emulator with built-in file, process and AI commands", long_about = None)]
struct Cli {
    /// Configuration file (defaults to <config dir>/termgate/config.toml)
    #[arg(long)]
    config: Option<PathBuf>,
}

/// Asks on the controlling terminal. Anything but `y`/`Y` declines.
struct StdinConfirm;

impl Confirm for StdinConfirm {
    fn confirm(&self, prompt: &str) -> bool {
        print!("{}", prompt.yellow());
        if io::stdout().flush().is_err() {
            return false;
        }
        let mut reply = String::new();
        match io::stdin().lock().read_line(&mut reply) {
            Ok(0) | Err(_) => false,
            Ok(_) => is_affirmative(&reply),
        }
    }
}

/// Whether the loop keeps reading after a line.
enum Flow {
    Continue,
    Stop,
}

fn user_name() -> String {
    std::env::var("USER")
        .or_else(|_| std::env::var("USERNAME"))
        .unwrap_or_else(|_| "user".to_string())
}

fn prompt(session: &Session) -> String {
    format!("{}:{}$ ", user_name(), session.cwd().display())
}

fn clear_screen() {
    let result = crossterm::execute!(io::stdout(), Clear(ClearType::All), MoveTo(0, 0));
    if let Err(e) = result {
        tracing::debug!("[Repl] clear failed: {}", e);
    }
}

fn render(outcome: ExecOutcome) -> Flow {
    match outcome {
        ExecOutcome::Terminate => {
            println!("{}", "bye".bright_green());
            Flow::Stop
        }
        ExecOutcome::ClearScreen => {
            clear_screen();
            Flow::Continue
        }
        ExecOutcome::Output(output) => {
            let text = output.text.trim_end_matches('\n');
            if !text.is_empty() {
                if output.is_error {
                    println!("{}", text.red());
                } else {
                    println!("{}", text);
                }
            }
            Flow::Continue
        }
    }
}

async fn run_editor(executor: &Executor, session: &mut Session) -> Result<()> {
    let mut rl: Editor<ShellHelper, DefaultHistory> = Editor::new()?;
    rl.set_helper(Some(ShellHelper::new(session.cwd())));
    let confirm = StdinConfirm;

    loop {
        match rl.readline(&prompt(session)) {
            Ok(line) => {
                if !line.trim().is_empty() {
                    let _ = rl.add_history_entry(line.as_str());
                }
                let outcome = executor
                    .execute(session, &line, ExecOptions::interactive(&confirm))
                    .await;
                if let Some(helper) = rl.helper_mut() {
                    helper.set_cwd(session.cwd());
                }
                if let Flow::Stop = render(outcome) {
                    break;
                }
            }
            Err(ReadlineError::Interrupted) => {
                println!("{}", "Interrupted.".yellow());
                break;
            }
            Err(ReadlineError::Eof) => {
                println!();
                break;
            }
            Err(err) => {
                eprintln!("{}", format!("Error: {:?}", err).red());
                break;
            }
        }
    }
    Ok(())
}

/// Fallback when stdin is not a terminal: plain prompt, one line at a time.
async fn run_plain(executor: &Executor, session: &mut Session) -> Result<()> {
    let confirm = StdinConfirm;
    let stdin = io::stdin();

    loop {
        print!("{}", prompt(session));
        io::stdout().flush()?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            println!();
            break;
        }

        let outcome = executor
            .execute(session, &line, ExecOptions::interactive(&confirm))
            .await;
        if let Flow::Stop = render(outcome) {
            break;
        }
    }
    Ok(())
}

/// Entry point for the interactive shell.
///
/// Loads the configuration, probes optional capabilities once, then reads
/// lines until `exit`/`quit`, Ctrl-C or end of input. Nothing is persisted.
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();

    let config = AppConfig::load(cli.config.as_deref())?;
    tracing::debug!("[Repl] configuration: {:?}", config);

    let capabilities = Capabilities::probe();
    let bridge = bridge_from_config(&config.bridge);
    let executor = Executor::from_config(&config, capabilities, bridge);
    let mut session = Session::at_process_cwd().with_history_limit(config.shell.history_limit);

    println!("{}", BANNER.bright_magenta().bold());
    for notice in capabilities.notices() {
        println!("{}", notice.bright_black());
    }

    if capabilities.line_editing {
        run_editor(&executor, &mut session).await
    } else {
        run_plain(&executor, &mut session).await
    }
}
