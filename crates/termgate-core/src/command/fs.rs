//! Filesystem verbs: ls, cd, mkdir, rm, touch, cat, mv, cp.
//!
//! Paths are always resolved against the session working directory, never the
//! process one. Listings are read from disk on every call.

use std::fs::{self, File, FileTimes, Metadata, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use chrono::{DateTime, Local};

use super::{CommandOutput, Report, split_flags};
use crate::confirm::Confirm;
use crate::error::{CommandError, Result};
use crate::path::{display_name, expand_path, human_size};
use crate::session::Session;

/// Shown when a listed directory has no visible entries.
pub const EMPTY_DIRECTORY: &str = "[Empty Directory]";

// ============================================================================
// ls
// ============================================================================

pub(crate) fn ls(args: &[String], session: &Session) -> CommandOutput {
    let (flags, mut paths) = split_flags(args);
    let all = flags.has('a');
    let long = flags.has('l');
    if paths.is_empty() {
        paths.push(".");
    }

    let mut report = Report::default();
    for raw in &paths {
        match list_path(raw, session.cwd(), all, long) {
            Ok(body) if paths.len() > 1 => report.ok(format!("{raw}:\n{body}")),
            Ok(body) => report.ok(body),
            Err(err) => report.fail(err),
        }
    }
    report.finish()
}

fn list_path(raw: &str, cwd: &Path, all: bool, long: bool) -> Result<String> {
    let path = expand_path(raw, cwd);
    let meta = fs::metadata(&path).map_err(|e| CommandError::from_io("ls", raw, &e))?;
    if !meta.is_dir() {
        return Ok(display_name(&path));
    }

    let mut names: Vec<String> = fs::read_dir(&path)
        .map_err(|e| CommandError::from_io("ls", raw, &e))?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.file_name().to_string_lossy().into_owned())
        .filter(|name| all || !name.starts_with('.'))
        .collect();
    names.sort();

    if names.is_empty() {
        return Ok(EMPTY_DIRECTORY.to_string());
    }
    if !long {
        return Ok(names.join("  "));
    }

    Ok(names
        .iter()
        .map(|name| long_entry(&path.join(name), name))
        .collect::<Vec<_>>()
        .join("\n"))
}

fn long_entry(path: &Path, name: &str) -> String {
    match fs::metadata(path) {
        Ok(meta) => {
            let mtime = meta
                .modified()
                .map(|t| DateTime::<Local>::from(t).format("%Y-%m-%d %H:%M").to_string())
                .unwrap_or_else(|_| "????-??-?? ??:??".to_string());
            format!(
                "{}\t{:>8}\t{}\t{}",
                mode_bits(&meta),
                human_size(meta.len()),
                mtime,
                name
            )
        }
        // Dangling symlinks and races with concurrent deletes.
        Err(_) => format!("??\t??\t{name}"),
    }
}

#[cfg(unix)]
fn mode_bits(meta: &Metadata) -> String {
    use std::os::unix::fs::PermissionsExt;
    format!("{:03o}", meta.permissions().mode() & 0o777)
}

#[cfg(not(unix))]
fn mode_bits(meta: &Metadata) -> String {
    if meta.permissions().readonly() {
        "444".to_string()
    } else {
        "666".to_string()
    }
}

// ============================================================================
// cd
// ============================================================================

pub(crate) fn cd(args: &[String], session: &mut Session) -> Result<CommandOutput> {
    let raw = args.first().map(String::as_str).unwrap_or("~");
    if raw == "~" && dirs::home_dir().is_none() {
        return Err(CommandError::io("cd", "cannot determine home directory"));
    }

    let target = expand_path(raw, session.cwd());
    let meta = fs::metadata(&target).map_err(|e| CommandError::from_io("cd", raw, &e))?;
    if !meta.is_dir() {
        return Err(CommandError::NotADirectory {
            verb: "cd",
            target: raw.to_string(),
        });
    }
    if !searchable(&meta) {
        return Err(CommandError::PermissionDenied {
            verb: "cd",
            target: raw.to_string(),
        });
    }

    tracing::debug!("[Session] cwd -> {}", target.display());
    session.set_cwd(target);
    Ok(CommandOutput::empty())
}

/// Entering a directory needs search (execute) permission, not read.
#[cfg(unix)]
fn searchable(meta: &Metadata) -> bool {
    use std::os::unix::fs::PermissionsExt;
    meta.permissions().mode() & 0o111 != 0
}

#[cfg(not(unix))]
fn searchable(_meta: &Metadata) -> bool {
    true
}

// ============================================================================
// mkdir / touch
// ============================================================================

pub(crate) fn mkdir(args: &[String], session: &Session) -> Result<CommandOutput> {
    // Parents are always created, so -p is accepted and ignored.
    let (_flags, targets) = split_flags(args);
    if targets.is_empty() {
        return Err(CommandError::missing_operand("mkdir"));
    }

    let mut report = Report::default();
    for raw in targets {
        let path = expand_path(raw, session.cwd());
        if path.exists() {
            report.fail(CommandError::AlreadyExists {
                verb: "mkdir",
                target: raw.to_string(),
            });
            continue;
        }
        match fs::create_dir_all(&path) {
            Ok(()) => report.ok(format!("Created directory '{raw}'")),
            Err(e) => report.fail(CommandError::from_io("mkdir", raw, &e)),
        }
    }
    Ok(report.finish())
}

pub(crate) fn touch(args: &[String], session: &Session) -> Result<CommandOutput> {
    if args.is_empty() {
        return Err(CommandError::missing_operand("touch"));
    }

    let mut report = Report::default();
    for raw in args {
        let path = expand_path(raw, session.cwd());
        let touched = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .and_then(|file| file.set_modified(SystemTime::now()));
        match touched {
            Ok(()) => report.ok(format!("Touched '{raw}'")),
            Err(e) => report.fail(CommandError::from_io("touch", raw.as_str(), &e)),
        }
    }
    Ok(report.finish())
}

// ============================================================================
// rm
// ============================================================================

pub(crate) fn rm(args: &[String], session: &Session, confirm: &dyn Confirm) -> Result<CommandOutput> {
    let (flags, targets) = split_flags(args);
    let recursive = flags.has('r') || flags.has('R');
    let force = flags.has('f');
    let interactive = flags.has('i');
    if targets.is_empty() {
        return Err(CommandError::missing_operand("rm"));
    }

    let mut report = Report::default();
    for raw in targets {
        let path = expand_path(raw, session.cwd());
        // symlink_metadata so a link is removed as a link and dangling links count.
        let meta = match fs::symlink_metadata(&path) {
            Ok(meta) => meta,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                if !force {
                    report.fail(CommandError::not_found("rm", raw));
                }
                continue;
            }
            Err(e) => {
                report.fail(CommandError::from_io("rm", raw, &e));
                continue;
            }
        };

        if interactive && !confirm.confirm(&format!("rm: remove '{raw}'? [y/N] ")) {
            continue;
        }

        if meta.is_dir() {
            if !recursive {
                report.fail(CommandError::IsADirectory {
                    verb: "rm",
                    target: raw.to_string(),
                });
                continue;
            }
            match fs::remove_dir_all(&path) {
                Ok(()) => report.ok(format!("Removed dir '{raw}'")),
                Err(e) => report.fail(CommandError::from_io("rm", raw, &e)),
            }
        } else {
            match fs::remove_file(&path) {
                Ok(()) => report.ok(format!("Removed '{raw}'")),
                Err(e) => report.fail(CommandError::from_io("rm", raw, &e)),
            }
        }
    }
    Ok(report.finish())
}

// ============================================================================
// cat
// ============================================================================

pub(crate) fn cat(args: &[String], session: &Session) -> Result<CommandOutput> {
    let number = args.iter().any(|a| a == "-n");
    let files: Vec<&String> = args.iter().filter(|a| *a != "-n").collect();
    if files.is_empty() {
        return Err(CommandError::missing_operand("cat"));
    }

    let mut report = Report::default();
    for raw in files {
        let path = expand_path(raw, session.cwd());
        match fs::read(&path) {
            Ok(bytes) => {
                let content = String::from_utf8_lossy(&bytes);
                if number {
                    let numbered = content
                        .lines()
                        .enumerate()
                        .map(|(i, line)| format!("{:>4} {}", i + 1, line.trim_end()))
                        .collect::<Vec<_>>()
                        .join("\n");
                    report.ok(numbered);
                } else {
                    report.ok(content);
                }
            }
            Err(e) => report.fail(CommandError::from_io("cat", raw.as_str(), &e)),
        }
    }
    Ok(report.finish())
}

// ============================================================================
// mv / cp
// ============================================================================

pub(crate) fn mv(args: &[String], session: &Session) -> Result<CommandOutput> {
    let report = transfer("mv", "Moved", args, session.cwd(), |src, dst| {
        match fs::rename(src, dst) {
            // rename cannot cross filesystems; fall back to copy + delete.
            Err(e) if e.kind() == io::ErrorKind::CrossesDevices => {
                copy_any(src, dst)?;
                if fs::symlink_metadata(src)?.is_dir() {
                    fs::remove_dir_all(src)
                } else {
                    fs::remove_file(src)
                }
            }
            other => other,
        }
    })?;
    Ok(report.finish())
}

pub(crate) fn cp(args: &[String], session: &Session) -> Result<CommandOutput> {
    let report = transfer("cp", "Copied", args, session.cwd(), copy_any)?;
    Ok(report.finish())
}

/// Shared argument handling for mv and cp: `src... dest`, where several
/// sources require `dest` to be an existing directory.
fn transfer<F>(
    verb: &'static str,
    done: &str,
    args: &[String],
    cwd: &Path,
    op: F,
) -> Result<Report>
where
    F: Fn(&Path, &Path) -> io::Result<()>,
{
    let Some((dest_raw, sources)) = args.split_last() else {
        return Err(CommandError::missing_operand(verb));
    };
    if sources.is_empty() {
        return Err(CommandError::missing_operand(verb));
    }

    let dest = expand_path(dest_raw, cwd);
    let dest_is_dir = dest.is_dir();
    if sources.len() > 1 && !dest_is_dir {
        return Err(CommandError::TargetNotDirectory {
            verb,
            target: dest_raw.clone(),
        });
    }

    let mut report = Report::default();
    for raw in sources {
        let src = expand_path(raw, cwd);
        if fs::symlink_metadata(&src).is_err() {
            report.fail(CommandError::not_found(verb, raw.as_str()));
            continue;
        }
        let target = match destination_for(&src, &dest, dest_is_dir) {
            Some(target) => target,
            None => {
                report.fail(CommandError::io(verb, format!("{raw}: invalid source")));
                continue;
            }
        };
        if same_file(&src, &target) {
            report.fail(CommandError::SameFile {
                verb,
                source_path: raw.clone(),
                target: dest_raw.clone(),
            });
            continue;
        }
        if src.is_dir() && !src.is_symlink() && lies_within(&target, &src) {
            report.fail(CommandError::IntoItself {
                verb,
                action: if verb == "mv" { "move" } else { "copy" },
                target: raw.clone(),
            });
            continue;
        }
        match op(&src, &target) {
            Ok(()) => report.ok(format!("{done} '{raw}' -> '{dest_raw}'")),
            Err(e) => report.fail(CommandError::from_io(verb, raw.as_str(), &e)),
        }
    }
    Ok(report)
}

fn destination_for(src: &Path, dest: &Path, dest_is_dir: bool) -> Option<PathBuf> {
    if dest_is_dir {
        src.file_name().map(|name| dest.join(name))
    } else {
        Some(dest.to_path_buf())
    }
}

/// Both paths name one existing file, through hard links or symlinks too.
#[cfg(unix)]
fn same_file(a: &Path, b: &Path) -> bool {
    use std::os::unix::fs::MetadataExt;
    match (fs::metadata(a), fs::metadata(b)) {
        (Ok(a), Ok(b)) => a.dev() == b.dev() && a.ino() == b.ino(),
        _ => false,
    }
}

#[cfg(not(unix))]
fn same_file(a: &Path, b: &Path) -> bool {
    match (fs::canonicalize(a), fs::canonicalize(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

/// `path` is `dir` or somewhere below it. `path` need not exist yet, so its
/// nearest existing ancestor is canonicalized and the rest appended.
fn lies_within(path: &Path, dir: &Path) -> bool {
    let Ok(dir) = fs::canonicalize(dir) else {
        return false;
    };
    let mut existing = path;
    let mut rest = Vec::new();
    loop {
        if let Ok(base) = fs::canonicalize(existing) {
            let resolved = rest.iter().rev().fold(base, |acc: PathBuf, part| acc.join(part));
            return resolved.starts_with(&dir);
        }
        match (existing.parent(), existing.file_name()) {
            (Some(parent), Some(name)) => {
                rest.push(name.to_os_string());
                existing = parent;
            }
            _ => return false,
        }
    }
}

fn copy_any(src: &Path, dst: &Path) -> io::Result<()> {
    let meta = fs::symlink_metadata(src)?;
    if meta.is_dir() {
        copy_dir(src, dst)
    } else {
        copy_file(src, dst, &meta)
    }
}

fn copy_file(src: &Path, dst: &Path, meta: &Metadata) -> io::Result<()> {
    #[cfg(unix)]
    {
        if meta.file_type().is_symlink() {
            return std::os::unix::fs::symlink(fs::read_link(src)?, dst);
        }
    }

    // fs::copy carries the permission bits across.
    fs::copy(src, dst)?;
    preserve_times(meta, dst);
    Ok(())
}

fn copy_dir(src: &Path, dst: &Path) -> io::Result<()> {
    fs::create_dir(dst)?;
    for entry in fs::read_dir(src)? {
        let entry = entry?;
        copy_any(&entry.path(), &dst.join(entry.file_name()))?;
    }

    // Applied last so a read-only source dir does not block filling the copy.
    let meta = fs::metadata(src)?;
    fs::set_permissions(dst, meta.permissions())?;
    preserve_times(&meta, dst);
    Ok(())
}

/// Copies access and modification times where the platform allows it.
fn preserve_times(meta: &Metadata, dst: &Path) {
    let mut times = FileTimes::new();
    if let Ok(modified) = meta.modified() {
        times = times.set_modified(modified);
    }
    if let Ok(accessed) = meta.accessed() {
        times = times.set_accessed(accessed);
    }
    if let Err(e) = File::open(dst).and_then(|file| file.set_times(times)) {
        tracing::debug!("[Command] could not preserve times on {}: {}", dst.display(), e);
    }
}
