//! Path normalisation and size formatting shared by the handlers.

use std::path::{Component, Path, PathBuf};

/// Resolves a user-typed path against the session working directory.
///
/// Expands a leading `~`, then `$VAR`/`${VAR}` (unknown variables are left as
/// typed), joins relative results onto `cwd` and normalises lexically.
pub fn expand_path(raw: &str, cwd: &Path) -> PathBuf {
    let expanded = expand_vars(&expand_home(raw));
    let path = Path::new(&expanded);
    if path.is_absolute() {
        normalize(path)
    } else {
        normalize(&cwd.join(path))
    }
}

/// Collapses `.` and `..` without touching the filesystem, so symlinks are
/// kept as typed. `..` at the root stays at the root.
pub fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::Prefix(_) | Component::RootDir => out.push(component.as_os_str()),
            Component::CurDir => {}
            Component::ParentDir => {
                if matches!(out.components().next_back(), Some(Component::Normal(_))) {
                    out.pop();
                } else if !out.has_root() {
                    out.push("..");
                }
            }
            Component::Normal(part) => out.push(part),
        }
    }
    if out.as_os_str().is_empty() {
        out.push(".");
    }
    out
}

fn expand_home(raw: &str) -> String {
    if raw == "~" || raw.starts_with("~/") || raw.starts_with("~\\") {
        if let Some(home) = dirs::home_dir() {
            return format!("{}{}", home.display(), &raw[1..]);
        }
    }
    raw.to_string()
}

fn expand_vars(raw: &str) -> String {
    if !raw.contains('$') {
        return raw.to_string();
    }

    let mut out = String::with_capacity(raw.len());
    let mut rest = raw;
    while let Some(pos) = rest.find('$') {
        out.push_str(&rest[..pos]);
        let after = &rest[pos + 1..];

        let (name, consumed) = if let Some(braced) = after.strip_prefix('{') {
            match braced.find('}') {
                Some(end) => (&braced[..end], end + 2),
                None => ("", 0),
            }
        } else {
            let end = after
                .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
                .unwrap_or(after.len());
            (&after[..end], end)
        };

        let value = if name.is_empty() || name.contains(['=', '\0']) {
            None
        } else {
            std::env::var(name).ok()
        };
        match value {
            Some(value) => out.push_str(&value),
            None => out.push_str(&rest[pos..pos + 1 + consumed]),
        }
        rest = &after[consumed..];
    }
    out.push_str(rest);
    out
}

const UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];

/// Formats a byte count with one decimal, stepping by 1024 (`1.5KB`).
pub fn human_size(bytes: u64) -> String {
    let mut n = bytes as f64;
    for unit in UNITS {
        if n.abs() < 1024.0 {
            return format!("{:3.1}{}", n, unit);
        }
        n /= 1024.0;
    }
    format!("{:.1}PB", n)
}

/// Last path component as typed, for messages and copy destinations.
pub fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_collapses_dots() {
        assert_eq!(normalize(Path::new("/a/./b/../c")), PathBuf::from("/a/c"));
        assert_eq!(normalize(Path::new("/../..")), PathBuf::from("/"));
        assert_eq!(normalize(Path::new("a/..")), PathBuf::from("."));
    }

    #[test]
    fn test_expand_relative_against_cwd() {
        let cwd = Path::new("/srv/data");
        assert_eq!(expand_path("logs", cwd), PathBuf::from("/srv/data/logs"));
        assert_eq!(expand_path("../etc", cwd), PathBuf::from("/srv/etc"));
        assert_eq!(expand_path("/tmp/x/", cwd), PathBuf::from("/tmp/x"));
    }

    #[test]
    fn test_expand_home() {
        let home = dirs::home_dir().unwrap();
        assert_eq!(expand_path("~", Path::new("/")), normalize(&home));
        assert_eq!(
            expand_path("~/notes", Path::new("/")),
            normalize(&home.join("notes"))
        );
    }

    #[test]
    fn test_expand_vars() {
        // PATH is set in every test environment; pick a name nobody defines.
        assert_eq!(
            expand_vars("$TERMGATE_SURELY_UNSET_VAR/x"),
            "$TERMGATE_SURELY_UNSET_VAR/x"
        );
        assert_eq!(expand_vars("${TERMGATE_SURELY_UNSET_VAR}"), "${TERMGATE_SURELY_UNSET_VAR}");
        assert_eq!(expand_vars("cost $"), "cost $");
        assert_eq!(expand_vars("${unterminated"), "${unterminated");

        let path = std::env::var("PATH").unwrap();
        assert_eq!(expand_vars("$PATH"), path);
        assert_eq!(expand_vars("[${PATH}]"), format!("[{}]", path));
    }

    #[test]
    fn test_human_size() {
        assert_eq!(human_size(0), "0.0B");
        assert_eq!(human_size(1536), "1.5KB");
        assert_eq!(human_size(1024 * 1024), "1.0MB");
        assert_eq!(human_size(5 * 1024u64.pow(5)), "5.0PB");
    }
}
