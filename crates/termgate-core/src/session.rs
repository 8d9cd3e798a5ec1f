//! Per-session state: the working directory and the executed-line history.

use std::path::{Path, PathBuf};

/// Default cap on retained history entries.
pub const DEFAULT_HISTORY_LIMIT: usize = 1000;

/// State owned by one logical shell session.
///
/// The working directory here is the only one handlers consult; the process
/// working directory is never changed. Callers serving several clients either
/// give each client its own `Session` or serialise access to a shared one.
#[derive(Debug, Clone)]
pub struct Session {
    cwd: PathBuf,
    pub history: History,
}

impl Session {
    pub fn new(cwd: impl Into<PathBuf>) -> Self {
        Self {
            cwd: crate::path::normalize(&cwd.into()),
            history: History::default(),
        }
    }

    /// Starts in the directory the process was launched from, or the home
    /// directory if that cannot be determined.
    pub fn at_process_cwd() -> Self {
        let cwd = std::env::current_dir()
            .ok()
            .or_else(dirs::home_dir)
            .unwrap_or_else(|| PathBuf::from("/"));
        Self::new(cwd)
    }

    pub fn with_history_limit(mut self, limit: usize) -> Self {
        self.history = History::with_limit(limit);
        self
    }

    pub fn cwd(&self) -> &Path {
        &self.cwd
    }

    /// Only `cd` calls this, after validating the target.
    pub(crate) fn set_cwd(&mut self, cwd: PathBuf) {
        self.cwd = cwd;
    }
}

/// Ordered, in-memory log of executed lines. Never persisted.
#[derive(Debug, Clone)]
pub struct History {
    entries: Vec<String>,
    limit: usize,
}

impl Default for History {
    fn default() -> Self {
        Self::with_limit(DEFAULT_HISTORY_LIMIT)
    }
}

impl History {
    pub fn with_limit(limit: usize) -> Self {
        Self {
            entries: Vec::new(),
            limit: limit.max(1),
        }
    }

    pub fn push(&mut self, line: impl Into<String>) {
        self.entries.push(line.into());
        if self.entries.len() > self.limit {
            let overflow = self.entries.len() - self.limit;
            self.entries.drain(..overflow);
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(String::as_str)
    }

    /// `"<n> <line>"` per entry, numbered from 1.
    pub fn render(&self) -> String {
        self.entries
            .iter()
            .enumerate()
            .map(|(i, line)| format!("{} {}", i + 1, line))
            .collect::<Vec<_>>()
            .join("\n")
    }
}
