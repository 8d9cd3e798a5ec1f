//! Optional capabilities, probed once at startup.
//!
//! Handlers never check for optional support on their own; the caller probes
//! once and threads the result through [`crate::command::CommandContext`].

use std::io::IsTerminal;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capabilities {
    /// Live process/CPU/memory figures are available.
    pub metrics: bool,
    /// Standard input is a terminal, so the REPL can use line editing.
    pub line_editing: bool,
}

impl Capabilities {
    pub fn probe() -> Self {
        Self {
            metrics: cfg!(feature = "metrics"),
            line_editing: std::io::stdin().is_terminal(),
        }
    }

    /// Nothing optional available. Monitoring verbs degrade to their fallbacks.
    pub fn none() -> Self {
        Self {
            metrics: false,
            line_editing: false,
        }
    }

    /// One `[notice]` line per missing capability, for startup banners.
    pub fn notices(&self) -> Vec<&'static str> {
        let mut notices = Vec::new();
        if !self.metrics {
            notices.push("[notice] system metrics unavailable: ps uses the platform tool, top/cpu/mem/uptime report unavailable");
        }
        if !self.line_editing {
            notices.push("[notice] line editing unavailable: stdin is not a terminal");
        }
        notices
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_none_reports_every_notice() {
        assert_eq!(Capabilities::none().notices().len(), 2);
    }

    #[test]
    fn test_probe_matches_build_features() {
        assert_eq!(Capabilities::probe().metrics, cfg!(feature = "metrics"));
    }
}
