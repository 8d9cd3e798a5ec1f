//! Built-in commands and the verb → handler mapping.
//!
//! The verb surface is fixed: every name here is part of the public contract,
//! and anything not listed falls through to the external fallback.

mod fs;
mod misc;
mod monitor;

use std::time::Duration;

use strum::{EnumIter, EnumString, IntoEnumIterator, IntoStaticStr};

use crate::bridge::LanguageBridge;
use crate::capability::Capabilities;
use crate::confirm::Confirm;
use crate::error::{CommandError, Result};
use crate::session::Session;

/// Verbs that end an interactive session.
pub const TERMINATE_VERBS: [&str; 2] = ["exit", "quit"];

/// Line prefix that routes the rest of the line to the natural-language bridge.
pub const NL_PREFIX: &str = "nl:";

/// A built-in verb.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumString, EnumIter, IntoStaticStr)]
#[strum(serialize_all = "lowercase")]
pub enum Builtin {
    Ls,
    Pwd,
    Cd,
    Mkdir,
    Rm,
    Touch,
    Cat,
    Mv,
    Cp,
    Ps,
    Top,
    Cpu,
    Mem,
    Clear,
    Whoami,
    Date,
    Uptime,
    Help,
    History,
    Nl,
}

/// Grouping used by `help`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter)]
pub enum Category {
    Files,
    Monitoring,
    Extras,
    Ai,
    Other,
}

impl Category {
    fn label(self) -> &'static str {
        match self {
            Category::Files => "Commands",
            Category::Monitoring => "Monitoring",
            Category::Extras => "Extras",
            Category::Ai => "AI",
            Category::Other => "Other",
        }
    }
}

/// Static description of a built-in verb.
#[derive(Debug, Clone, Copy)]
pub struct BuiltinInfo {
    pub usage: &'static str,
    pub description: &'static str,
    pub category: Category,
}

impl BuiltinInfo {
    const fn new(usage: &'static str, description: &'static str, category: Category) -> Self {
        Self {
            usage,
            description,
            category,
        }
    }
}

impl Builtin {
    /// Looks up the handler for a verb. Matching is exact and case-sensitive.
    pub fn from_verb(verb: &str) -> Option<Self> {
        verb.parse().ok()
    }

    pub fn name(self) -> &'static str {
        self.into()
    }

    pub fn all() -> impl Iterator<Item = Builtin> {
        Builtin::iter()
    }

    pub fn info(self) -> BuiltinInfo {
        use Category::*;
        match self {
            Builtin::Ls => BuiltinInfo::new("ls [-a] [-l] [path...]", "List directory contents", Files),
            Builtin::Pwd => BuiltinInfo::new("pwd", "Print the working directory", Files),
            Builtin::Cd => BuiltinInfo::new("cd [dir]", "Change the working directory (default: home)", Files),
            Builtin::Mkdir => BuiltinInfo::new("mkdir dir...", "Create directories, including parents", Files),
            Builtin::Rm => BuiltinInfo::new("rm [-r] [-f] [-i] path...", "Remove files or directories", Files),
            Builtin::Touch => BuiltinInfo::new("touch file...", "Create files or update their modification time", Files),
            Builtin::Cat => BuiltinInfo::new("cat [-n] file...", "Print file contents", Files),
            Builtin::Mv => BuiltinInfo::new("mv src... dest", "Move or rename files", Files),
            Builtin::Cp => BuiltinInfo::new("cp src... dest", "Copy files and directories", Files),
            Builtin::Ps => BuiltinInfo::new("ps", "List running processes", Monitoring),
            Builtin::Top => BuiltinInfo::new("top", "Show CPU/memory load and the largest processes", Monitoring),
            Builtin::Cpu => BuiltinInfo::new("cpu", "Show CPU usage", Monitoring),
            Builtin::Mem => BuiltinInfo::new("mem", "Show memory usage", Monitoring),
            Builtin::Clear => BuiltinInfo::new("clear", "Clear the screen", Extras),
            Builtin::Whoami => BuiltinInfo::new("whoami", "Print the current user", Extras),
            Builtin::Date => BuiltinInfo::new("date", "Print the local date and time", Extras),
            Builtin::Uptime => BuiltinInfo::new("uptime", "Show time since boot", Extras),
            Builtin::Help => BuiltinInfo::new("help [command]", "Show available commands", Other),
            Builtin::History => BuiltinInfo::new("history", "Show lines executed in this session", Other),
            Builtin::Nl => BuiltinInfo::new("nl: <text>", "Ask the natural-language assistant", Ai),
        }
    }

    /// Runs the handler. Errors come back already prefixed with the verb.
    pub async fn run(self, args: &[String], ctx: &mut CommandContext<'_>) -> Result<CommandOutput> {
        match self {
            Builtin::Ls => Ok(fs::ls(args, ctx.session)),
            Builtin::Pwd => Ok(CommandOutput::ok(ctx.session.cwd().display().to_string())),
            Builtin::Cd => fs::cd(args, ctx.session),
            Builtin::Mkdir => fs::mkdir(args, ctx.session),
            Builtin::Rm => fs::rm(args, ctx.session, ctx.confirm),
            Builtin::Touch => fs::touch(args, ctx.session),
            Builtin::Cat => fs::cat(args, ctx.session),
            Builtin::Mv => fs::mv(args, ctx.session),
            Builtin::Cp => fs::cp(args, ctx.session),
            Builtin::Ps => monitor::ps(ctx).await,
            Builtin::Top => monitor::top(ctx).await,
            Builtin::Cpu => monitor::cpu(ctx).await,
            Builtin::Mem => monitor::mem(ctx),
            Builtin::Uptime => monitor::uptime(ctx),
            Builtin::Clear => Ok(CommandOutput::empty()),
            Builtin::Whoami => Ok(CommandOutput::ok(misc::whoami())),
            Builtin::Date => Ok(CommandOutput::ok(misc::date())),
            Builtin::Help => misc::help(args),
            Builtin::History => Ok(CommandOutput::ok(ctx.session.history.render())),
            Builtin::Nl => Ok(misc::nl(args, ctx.bridge).await),
        }
    }
}

/// Everything a handler may touch while it runs.
pub struct CommandContext<'a> {
    pub session: &'a mut Session,
    pub capabilities: &'a Capabilities,
    pub confirm: &'a dyn Confirm,
    pub bridge: &'a dyn LanguageBridge,
    pub external_timeout: Duration,
}

/// Text produced by one command, plus whether any part of it is an error.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub text: String,
    pub is_error: bool,
}

impl CommandOutput {
    pub fn ok(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            is_error: false,
        }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn failed(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            is_error: true,
        }
    }
}

impl From<CommandError> for CommandOutput {
    fn from(err: CommandError) -> Self {
        Self::failed(err.to_string())
    }
}

/// Collects one line per target for verbs that accept several operands, so a
/// failing target is reported without aborting the rest.
#[derive(Debug, Default)]
pub struct Report {
    lines: Vec<String>,
    failed: bool,
}

impl Report {
    pub fn ok(&mut self, line: impl Into<String>) {
        self.lines.push(line.into());
    }

    pub fn fail(&mut self, err: CommandError) {
        tracing::debug!("[Command] {}", err);
        self.lines.push(err.to_string());
        self.failed = true;
    }

    pub fn finish(self) -> CommandOutput {
        CommandOutput {
            text: self.lines.join("\n"),
            is_error: self.failed,
        }
    }
}

/// Flag letters collected from `-xyz` style arguments.
#[derive(Debug, Default)]
pub(crate) struct Flags(String);

impl Flags {
    pub(crate) fn has(&self, letter: char) -> bool {
        self.0.contains(letter)
    }
}

/// Splits arguments into flag letters and operands. A lone `-` is an operand
/// and `--` ends flag parsing.
pub(crate) fn split_flags(args: &[String]) -> (Flags, Vec<&str>) {
    let mut flags = String::new();
    let mut operands = Vec::new();
    let mut flags_done = false;

    for arg in args {
        if flags_done || arg == "-" || !arg.starts_with('-') {
            operands.push(arg.as_str());
        } else if arg == "--" {
            flags_done = true;
        } else {
            flags.push_str(&arg[1..]);
        }
    }

    (Flags(flags), operands)
}

/// The `help` text, grouped by category.
pub fn help_text() -> String {
    let mut lines = Vec::new();
    for category in Category::iter() {
        let mut names: Vec<&str> = Builtin::all()
            .filter(|b| b.info().category == category)
            .map(|b| match b {
                Builtin::Nl => b.info().usage,
                _ => b.name(),
            })
            .collect();
        if category == Category::Other {
            names.extend(TERMINATE_VERBS);
        }
        lines.push(format!("{}: {}", category.label(), names.join(", ")));
    }
    lines.join("\n")
}
