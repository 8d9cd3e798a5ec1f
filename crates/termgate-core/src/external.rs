//! Fallback for verbs that are not built in: run them as a child process.

use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use tokio::process::Command;

use crate::command::CommandOutput;
use crate::error::{CommandError, Result};

/// Runs `argv` as a child process in `cwd` and captures stdout followed by
/// stderr as text.
///
/// The child gets no stdin, so nothing can wait on a prompt, and it is killed
/// if it outlives `timeout`. A non-zero exit marks the output as an error but
/// keeps whatever the program printed.
pub async fn run_external(argv: &[String], cwd: &Path, timeout: Duration) -> Result<CommandOutput> {
    let Some((program, args)) = argv.split_first() else {
        return Ok(CommandOutput::empty());
    };

    // Otherwise a deleted cwd would surface as "command not found".
    if !cwd.is_dir() {
        return Err(CommandError::io(
            program.as_str(),
            format!("working directory {} no longer exists", cwd.display()),
        ));
    }

    tracing::debug!("[External] spawning {:?} in {}", argv, cwd.display());

    let child = Command::new(program)
        .args(args)
        .current_dir(cwd)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => CommandError::CommandNotFound {
                program: program.clone(),
            },
            _ => CommandError::io(program.as_str(), e.to_string()),
        })?;

    // Dropping the wait future on timeout drops the child, which kills it.
    let output = match tokio::time::timeout(timeout, child.wait_with_output()).await {
        Ok(result) => result.map_err(|e| CommandError::io(program.as_str(), e.to_string()))?,
        Err(_) => {
            tracing::warn!("[External] {} exceeded {:?}, killed", program, timeout);
            return Err(CommandError::TimedOut {
                verb: program.clone(),
                seconds: timeout.as_secs(),
            });
        }
    };

    let mut text = String::from_utf8_lossy(&output.stdout).into_owned();
    text.push_str(&String::from_utf8_lossy(&output.stderr));

    tracing::debug!("[External] {} exited with {}", program, output.status);

    Ok(CommandOutput {
        text,
        is_error: !output.status.success(),
    })
}
