//! Monitoring verbs: ps, top, cpu, mem, uptime.
//!
//! Figures come from `sysinfo` when the `metrics` feature is built in and the
//! capability probe reported it. Without it `ps` shells out to the platform
//! tool and the others report that the figure is unavailable.

use std::time::Duration;

use super::{CommandContext, CommandOutput};
use crate::error::{CommandError, Result};
use crate::external::run_external;
use crate::path::human_size;

const TOP_SAMPLE: Duration = Duration::from_millis(500);
const CPU_SAMPLE: Duration = Duration::from_millis(200);
const TOP_PROCESSES: usize = 8;

pub(super) async fn ps(ctx: &CommandContext<'_>) -> Result<CommandOutput> {
    if ctx.capabilities.metrics {
        if let Some(rows) = probe::processes() {
            let mut lines = vec![format!("{:>6} {:<16} {}", "PID", "USER", "NAME")];
            lines.extend(
                rows.iter()
                    .map(|p| format!("{:>6} {:<16.16} {}", p.pid, p.user, p.name)),
            );
            return Ok(CommandOutput::ok(lines.join("\n")));
        }
    }

    let argv: Vec<String> = if cfg!(windows) {
        vec!["tasklist".into()]
    } else {
        vec!["ps".into(), "-ef".into()]
    };
    run_external(&argv, ctx.session.cwd(), ctx.external_timeout).await
}

pub(super) async fn top(ctx: &CommandContext<'_>) -> Result<CommandOutput> {
    if !ctx.capabilities.metrics {
        return Err(CommandError::unavailable("top", "process table"));
    }
    let cpu = probe::cpu_usage(TOP_SAMPLE)
        .await
        .ok_or(CommandError::unavailable("top", "process table"))?;
    let memory = probe::memory().ok_or(CommandError::unavailable("top", "process table"))?;
    let mut rows = probe::processes().ok_or(CommandError::unavailable("top", "process table"))?;

    rows.sort_by(|a, b| b.memory.cmp(&a.memory).then(a.pid.cmp(&b.pid)));

    let mut lines = vec![
        format!("CPU {:.1}%  Mem {}", cpu, memory.summary()),
        "Top by memory:".to_string(),
        format!("{:>6} {:>8} {}", "PID", "RSS", "NAME"),
    ];
    lines.extend(
        rows.iter()
            .take(TOP_PROCESSES)
            .map(|p| format!("{:>6} {:>8} {}", p.pid, human_size(p.memory), p.name)),
    );
    Ok(CommandOutput::ok(lines.join("\n")))
}

pub(super) async fn cpu(ctx: &CommandContext<'_>) -> Result<CommandOutput> {
    if !ctx.capabilities.metrics {
        return Err(CommandError::unavailable("cpu", "CPU usage"));
    }
    let usage = probe::cpu_usage(CPU_SAMPLE)
        .await
        .ok_or(CommandError::unavailable("cpu", "CPU usage"))?;
    Ok(CommandOutput::ok(format!("CPU: {:.1}%", usage)))
}

pub(super) fn mem(ctx: &CommandContext<'_>) -> Result<CommandOutput> {
    if !ctx.capabilities.metrics {
        return Err(CommandError::unavailable("mem", "memory usage"));
    }
    let memory = probe::memory().ok_or(CommandError::unavailable("mem", "memory usage"))?;
    Ok(CommandOutput::ok(format!("Mem: {}", memory.summary())))
}

pub(super) fn uptime(ctx: &CommandContext<'_>) -> Result<CommandOutput> {
    if !ctx.capabilities.metrics {
        return Err(CommandError::unavailable("uptime", "uptime"));
    }
    let seconds = probe::uptime_secs().ok_or(CommandError::unavailable("uptime", "uptime"))?;
    Ok(CommandOutput::ok(format!("Uptime: {}", format_uptime(seconds))))
}

/// `[N day(s), ]H:MM:SS`
pub(crate) fn format_uptime(seconds: u64) -> String {
    let days = seconds / 86_400;
    let hours = (seconds % 86_400) / 3600;
    let minutes = (seconds % 3600) / 60;
    let secs = seconds % 60;
    let clock = format!("{}:{:02}:{:02}", hours, minutes, secs);
    match days {
        0 => clock,
        1 => format!("1 day, {}", clock),
        n => format!("{} days, {}", n, clock),
    }
}

#[derive(Debug, Clone)]
struct ProcessRow {
    pid: u32,
    user: String,
    name: String,
    memory: u64,
}

#[derive(Debug, Clone, Copy)]
struct MemorySnapshot {
    used: u64,
    total: u64,
}

impl MemorySnapshot {
    fn percent(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.used as f64 / self.total as f64 * 100.0
        }
    }

    fn summary(&self) -> String {
        format!(
            "{:.1}% ({}/{})",
            self.percent(),
            human_size(self.used),
            human_size(self.total)
        )
    }
}

#[cfg(feature = "metrics")]
mod probe {
    use std::time::Duration;

    use sysinfo::{System, Users};

    use super::{MemorySnapshot, ProcessRow};

    /// Global CPU usage over `window`; usage needs two samples to be meaningful.
    pub(super) async fn cpu_usage(window: Duration) -> Option<f32> {
        let mut sys = System::new();
        sys.refresh_cpu();
        tokio::time::sleep(window).await;
        sys.refresh_cpu();
        if sys.cpus().is_empty() {
            return None;
        }
        Some(sys.global_cpu_info().cpu_usage())
    }

    pub(super) fn memory() -> Option<MemorySnapshot> {
        let mut sys = System::new();
        sys.refresh_memory();
        let total = sys.total_memory();
        if total == 0 {
            return None;
        }
        Some(MemorySnapshot {
            used: sys.used_memory(),
            total,
        })
    }

    /// Every visible process, ordered by pid.
    pub(super) fn processes() -> Option<Vec<ProcessRow>> {
        let mut sys = System::new();
        sys.refresh_processes();
        let users = Users::new_with_refreshed_list();

        let mut rows: Vec<ProcessRow> = sys
            .processes()
            .iter()
            .map(|(pid, process)| ProcessRow {
                pid: pid.as_u32(),
                user: process
                    .user_id()
                    .and_then(|uid| users.get_user_by_id(uid))
                    .map(|user| user.name().to_string())
                    .unwrap_or_else(|| "?".to_string()),
                name: process.name().to_string(),
                memory: process.memory(),
            })
            .collect();

        if rows.is_empty() {
            return None;
        }
        rows.sort_by_key(|row| row.pid);
        Some(rows)
    }

    pub(super) fn uptime_secs() -> Option<u64> {
        Some(System::uptime())
    }
}

#[cfg(not(feature = "metrics"))]
mod probe {
    use std::time::Duration;

    use super::{MemorySnapshot, ProcessRow};

    pub(super) async fn cpu_usage(_window: Duration) -> Option<f32> {
        None
    }

    pub(super) fn memory() -> Option<MemorySnapshot> {
        None
    }

    pub(super) fn processes() -> Option<Vec<ProcessRow>> {
        None
    }

    pub(super) fn uptime_secs() -> Option<u64> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bridge::DisabledBridge;
    use crate::capability::Capabilities;
    use crate::confirm::FixedAnswer;
    use crate::session::Session;

    fn context<'a>(
        session: &'a mut Session,
        capabilities: &'a Capabilities,
    ) -> CommandContext<'a> {
        CommandContext {
            session,
            capabilities,
            confirm: &FixedAnswer(false),
            bridge: &DisabledBridge,
            external_timeout: Duration::from_secs(5),
        }
    }

    #[test]
    fn test_format_uptime() {
        assert_eq!(format_uptime(59), "0:00:59");
        assert_eq!(format_uptime(3 * 3600 + 4 * 60 + 5), "3:04:05");
        assert_eq!(format_uptime(86_400 + 61), "1 day, 0:01:01");
        assert_eq!(format_uptime(2 * 86_400), "2 days, 0:00:00");
    }

    #[test]
    fn test_memory_summary() {
        let snapshot = MemorySnapshot {
            used: 512,
            total: 1024,
        };
        assert_eq!(snapshot.summary(), "50.0% (512.0B/1.0KB)");
    }

    #[tokio::test]
    async fn test_without_metrics_reports_unavailable() {
        let mut session = Session::new(std::env::temp_dir());
        let capabilities = Capabilities::none();
        let ctx = context(&mut session, &capabilities);

        let err = cpu(&ctx).await.unwrap_err();
        assert_eq!(
            err.to_string(),
            "cpu: CPU usage unavailable (system metrics are not available on this host)"
        );
        assert!(matches!(mem(&ctx), Err(CommandError::Unavailable { .. })));
        assert!(matches!(uptime(&ctx), Err(CommandError::Unavailable { .. })));
        assert!(matches!(top(&ctx).await, Err(CommandError::Unavailable { .. })));
    }

    #[cfg(feature = "metrics")]
    #[tokio::test]
    async fn test_with_metrics_reports_figures() {
        let mut session = Session::new(std::env::temp_dir());
        let capabilities = Capabilities {
            metrics: true,
            line_editing: false,
        };
        let ctx = context(&mut session, &capabilities);

        assert!(mem(&ctx).unwrap().text.starts_with("Mem: "));
        assert!(uptime(&ctx).unwrap().text.starts_with("Uptime: "));
        assert!(cpu(&ctx).await.unwrap().text.starts_with("CPU: "));
        let ps_output = ps(&ctx).await.unwrap();
        assert!(ps_output.text.starts_with("   PID USER"));
    }
}
