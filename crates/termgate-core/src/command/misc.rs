//! Extras and the natural-language entry point.

use super::{help_text, Builtin, CommandOutput, TERMINATE_VERBS};
use crate::bridge::LanguageBridge;
use crate::error::{CommandError, Result};

pub(super) const NOTHING_TO_ASK: &str = "nl: nothing to ask";

pub(super) fn whoami() -> String {
    std::env::var("USER")
        .or_else(|_| std::env::var("USERNAME"))
        .ok()
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| "user".to_string())
}

pub(super) fn date() -> String {
    chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string()
}

/// Without arguments, the grouped overview. With a verb, its usage line.
pub(super) fn help(args: &[String]) -> Result<CommandOutput> {
    let Some(verb) = args.first() else {
        return Ok(CommandOutput::ok(help_text()));
    };

    if TERMINATE_VERBS.contains(&verb.as_str()) {
        return Ok(CommandOutput::ok(format!("{} - End the session", verb)));
    }

    let builtin = Builtin::from_verb(verb)
        .ok_or_else(|| CommandError::io("help", format!("no help for '{}'", verb)))?;
    let info = builtin.info();
    Ok(CommandOutput::ok(format!("{} - {}", info.usage, info.description)))
}

pub(super) async fn nl(args: &[String], bridge: &dyn LanguageBridge) -> CommandOutput {
    let text = args.join(" ");
    let text = text.trim();
    if text.is_empty() {
        return CommandOutput::failed(NOTHING_TO_ASK);
    }
    tracing::debug!("[Command] nl request ({} chars)", text.len());
    match bridge.ask(text).await {
        Ok(answer) => CommandOutput::ok(answer),
        Err(line) => CommandOutput::failed(line),
    }
}
