//! rustyline helper: verb and path completion, verb hints, highlighting.

use std::borrow::Cow::{self, Borrowed, Owned};
use std::fs;
use std::path::{Path, PathBuf};

use colored::Colorize;
use rustyline::completion::{Completer, Pair};
use rustyline::highlight::Highlighter;
use rustyline::hint::Hinter;
use rustyline::validate::Validator;
use rustyline::{Context, Helper};

use termgate_core::TERMINATE_VERBS;
use termgate_core::command::Builtin;
use termgate_core::path::expand_path;

/// Line-editing helper for the shell prompt.
///
/// Paths complete relative to the session working directory, which the REPL
/// pushes in with [`ShellHelper::set_cwd`] after every line.
#[derive(Clone)]
pub struct ShellHelper {
    verbs: Vec<String>,
    cwd: PathBuf,
}

impl ShellHelper {
    pub fn new(cwd: &Path) -> Self {
        let mut verbs: Vec<String> = Builtin::all().map(|b| b.name().to_string()).collect();
        verbs.extend(TERMINATE_VERBS.iter().map(|v| v.to_string()));
        verbs.sort();
        Self {
            verbs,
            cwd: cwd.to_path_buf(),
        }
    }

    pub fn set_cwd(&mut self, cwd: &Path) {
        self.cwd = cwd.to_path_buf();
    }

    fn is_verb(&self, word: &str) -> bool {
        self.verbs.iter().any(|v| v == word)
    }

    fn complete_verb(&self, prefix: &str) -> Vec<Pair> {
        self.verbs
            .iter()
            .filter(|verb| verb.starts_with(prefix))
            .map(|verb| Pair {
                display: verb.clone(),
                replacement: format!("{} ", verb),
            })
            .collect()
    }

    fn complete_path(&self, word: &str) -> Vec<Pair> {
        let (dir_part, name_prefix) = match word.rfind('/') {
            Some(idx) => (&word[..=idx], &word[idx + 1..]),
            None => ("", word),
        };
        let base = if dir_part.is_empty() {
            self.cwd.clone()
        } else {
            expand_path(dir_part, &self.cwd)
        };

        let Ok(entries) = fs::read_dir(&base) else {
            return Vec::new();
        };

        let mut candidates: Vec<Pair> = entries
            .filter_map(|entry| entry.ok())
            .filter_map(|entry| {
                let name = entry.file_name().to_string_lossy().into_owned();
                if !name.starts_with(name_prefix) {
                    return None;
                }
                if name.starts_with('.') && !name_prefix.starts_with('.') {
                    return None;
                }
                let is_dir = entry.path().is_dir();
                let suffix = if is_dir { "/" } else { "" };
                Some(Pair {
                    display: format!("{}{}", name, suffix),
                    replacement: format!("{}{}{}", dir_part, name, suffix),
                })
            })
            .collect();
        candidates.sort_by(|a, b| a.display.cmp(&b.display));
        candidates
    }
}

impl Helper for ShellHelper {}

impl Completer for ShellHelper {
    type Candidate = Pair;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        _ctx: &Context<'_>,
    ) -> rustyline::Result<(usize, Vec<Pair>)> {
        let line = &line[..pos];
        let start = line
            .rfind(char::is_whitespace)
            .map(|idx| idx + 1)
            .unwrap_or(0);
        let word = &line[start..];

        if line[..start].trim().is_empty() {
            Ok((start, self.complete_verb(word)))
        } else {
            Ok((start, self.complete_path(word)))
        }
    }
}

impl Highlighter for ShellHelper {
    fn highlight<'l>(&self, line: &'l str, _pos: usize) -> Cow<'l, str> {
        let trimmed = line.trim_start();
        let indent = &line[..line.len() - trimmed.len()];
        let verb_end = trimmed.find(char::is_whitespace).unwrap_or(trimmed.len());
        let (verb, rest) = trimmed.split_at(verb_end);

        if trimmed.starts_with("nl:") {
            Owned(format!("{}{}", indent, trimmed.bright_magenta()))
        } else if self.is_verb(verb) {
            Owned(format!("{}{}{}", indent, verb.bright_cyan(), rest))
        } else {
            Borrowed(line)
        }
    }

    fn highlight_prompt<'b, 's: 'b, 'p: 'b>(
        &'s self,
        prompt: &'p str,
        _default: bool,
    ) -> Cow<'b, str> {
        match prompt.strip_suffix("$ ").and_then(|p| p.split_once(':')) {
            Some((user, cwd)) => Owned(format!(
                "{}:{}$ ",
                user.green().bold(),
                cwd.blue().bold()
            )),
            None => Borrowed(prompt),
        }
    }

    fn highlight_hint<'h>(&self, hint: &'h str) -> Cow<'h, str> {
        Owned(hint.bright_black().to_string())
    }

    fn highlight_char(&self, _line: &str, _pos: usize, _forced: bool) -> bool {
        true
    }
}

impl Hinter for ShellHelper {
    type Hint = String;

    fn hint(&self, line: &str, pos: usize, _ctx: &Context<'_>) -> Option<String> {
        let line = &line[..pos];

        if !line.is_empty() && !line.contains(char::is_whitespace) {
            self.verbs
                .iter()
                .find(|verb| verb.starts_with(line) && verb.len() > line.len())
                .map(|verb| verb[line.len()..].to_string())
        } else {
            None
        }
    }
}

impl Validator for ShellHelper {}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn replacements(pairs: &[Pair]) -> Vec<&str> {
        pairs.iter().map(|p| p.replacement.as_str()).collect()
    }

    #[test]
    fn test_verb_completion() {
        let helper = ShellHelper::new(Path::new("/"));
        assert_eq!(replacements(&helper.complete_verb("mk")), vec!["mkdir "]);
        let c_verbs = helper.complete_verb("c");
        assert_eq!(replacements(&c_verbs), vec!["cat ", "cd ", "clear ", "cp ", "cpu "]);
    }

    #[test]
    fn test_path_completion_is_relative_to_cwd() {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join("docs")).unwrap();
        fs::write(dir.path().join("docs/readme.md"), "").unwrap();
        fs::write(dir.path().join("data.csv"), "").unwrap();
        fs::write(dir.path().join(".dotfile"), "").unwrap();
        let helper = ShellHelper::new(dir.path());

        assert_eq!(
            replacements(&helper.complete_path("d")),
            vec!["data.csv", "docs/"]
        );
        assert_eq!(replacements(&helper.complete_path("docs/r")), vec!["docs/readme.md"]);
        assert_eq!(replacements(&helper.complete_path(".d")), vec![".dotfile"]);
        assert!(helper.complete_path("missing/").is_empty());
    }
}
