//! The line executor: the single entry point shared by every caller.
//!
//! A line moves through `received → tokenized → dispatched → completed`.
//! Every outcome, including a panicking handler, ends as text.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;

use crate::bridge::LanguageBridge;
use crate::capability::Capabilities;
use crate::command::{Builtin, CommandContext, CommandOutput, NL_PREFIX, TERMINATE_VERBS};
use crate::config::AppConfig;
use crate::confirm::Confirm;
use crate::external::run_external;
use crate::session::Session;
use crate::tokenizer::tokenize;

/// Per-caller policy for one invocation.
#[derive(Clone, Copy)]
pub struct ExecOptions<'a> {
    /// Append the raw line to the session history before tokenizing.
    pub record_history: bool,
    /// Treat `exit`/`quit` as the end of the session. When false they run as
    /// ordinary external programs.
    pub allow_terminate: bool,
    pub confirm: &'a dyn Confirm,
}

impl<'a> ExecOptions<'a> {
    /// The interactive loop: records history and may end the session.
    pub fn interactive(confirm: &'a dyn Confirm) -> Self {
        Self {
            record_history: true,
            allow_terminate: true,
            confirm,
        }
    }

    /// A caller sharing the process with others (HTTP). Nothing is recorded and
    /// nothing a client sends may end the process.
    pub fn remote(confirm: &'a dyn Confirm) -> Self {
        Self {
            record_history: false,
            allow_terminate: false,
            confirm,
        }
    }
}

/// How an invocation ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecOutcome {
    Output(CommandOutput),
    /// `clear`: the caller decides what clearing means for its surface.
    ClearScreen,
    /// `exit`/`quit` under [`ExecOptions::interactive`].
    Terminate,
}

impl ExecOutcome {
    pub fn text(&self) -> &str {
        match self {
            ExecOutcome::Output(output) => &output.text,
            ExecOutcome::ClearScreen | ExecOutcome::Terminate => "",
        }
    }

    pub fn into_text(self) -> String {
        match self {
            ExecOutcome::Output(output) => output.text,
            ExecOutcome::ClearScreen | ExecOutcome::Terminate => String::new(),
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, ExecOutcome::Output(output) if output.is_error)
    }
}

impl From<CommandOutput> for ExecOutcome {
    fn from(output: CommandOutput) -> Self {
        ExecOutcome::Output(output)
    }
}

/// Runs lines against a [`Session`]. Holds only process-wide collaborators,
/// so one executor serves any number of sessions.
#[derive(Clone)]
pub struct Executor {
    capabilities: Capabilities,
    bridge: Arc<dyn LanguageBridge>,
    external_timeout: Duration,
}

impl Executor {
    pub fn new(
        capabilities: Capabilities,
        bridge: Arc<dyn LanguageBridge>,
        external_timeout: Duration,
    ) -> Self {
        Self {
            capabilities,
            bridge,
            external_timeout,
        }
    }

    pub fn from_config(
        config: &AppConfig,
        capabilities: Capabilities,
        bridge: Arc<dyn LanguageBridge>,
    ) -> Self {
        Self::new(capabilities, bridge, config.shell.external_timeout())
    }

    pub fn capabilities(&self) -> &Capabilities {
        &self.capabilities
    }

    /// Runs one raw line to completion.
    pub async fn execute(
        &self,
        session: &mut Session,
        line: &str,
        options: ExecOptions<'_>,
    ) -> ExecOutcome {
        let line = line.trim();
        if line.is_empty() {
            return CommandOutput::empty().into();
        }

        if options.record_history {
            session.history.push(line);
        }

        if let Some(query) = line.strip_prefix(NL_PREFIX) {
            tracing::debug!("[Executor] routing to language bridge");
            let args = vec![query.trim().to_string()];
            return self
                .run_builtin(Builtin::Nl, "nl", &args, session, options)
                .await;
        }

        let tokens = match tokenize(line) {
            Ok(tokens) => tokens,
            Err(e) => {
                tracing::debug!("[Executor] parse error: {}", e);
                return CommandOutput::failed(format!("Parse error: {}", e)).into();
            }
        };

        let Some((verb, args)) = tokens.split_first() else {
            return CommandOutput::empty().into();
        };

        if options.allow_terminate && TERMINATE_VERBS.contains(&verb.as_str()) {
            tracing::debug!("[Executor] {} ends the session", verb);
            return ExecOutcome::Terminate;
        }

        match Builtin::from_verb(verb) {
            Some(Builtin::Clear) => ExecOutcome::ClearScreen,
            Some(builtin) => self.run_builtin(builtin, verb, args, session, options).await,
            None => {
                tracing::debug!("[Executor] {} is not built in, running externally", verb);
                match run_external(&tokens, session.cwd(), self.external_timeout).await {
                    Ok(output) => output.into(),
                    Err(e) => {
                        if e.is_not_found() {
                            tracing::debug!("[Executor] {}", e);
                        } else {
                            tracing::warn!("[Executor] {}", e);
                        }
                        CommandOutput::from(e).into()
                    }
                }
            }
        }
    }

    /// [`Executor::execute`] flattened to its text.
    pub async fn execute_line(
        &self,
        session: &mut Session,
        line: &str,
        options: ExecOptions<'_>,
    ) -> String {
        self.execute(session, line, options).await.into_text()
    }

    async fn run_builtin(
        &self,
        builtin: Builtin,
        verb: &str,
        args: &[String],
        session: &mut Session,
        options: ExecOptions<'_>,
    ) -> ExecOutcome {
        tracing::debug!("[Executor] dispatching {} with {} argument(s)", verb, args.len());

        let mut ctx = CommandContext {
            session,
            capabilities: &self.capabilities,
            confirm: options.confirm,
            bridge: self.bridge.as_ref(),
            external_timeout: self.external_timeout,
        };

        match AssertUnwindSafe(builtin.run(args, &mut ctx))
            .catch_unwind()
            .await
        {
            Ok(Ok(output)) => output.into(),
            Ok(Err(e)) => {
                tracing::debug!("[Executor] {}", e);
                CommandOutput::from(e).into()
            }
            Err(panic) => {
                let message = panic_message(panic.as_ref());
                tracing::warn!("[Executor] {} panicked: {}", verb, message);
                CommandOutput::failed(format!("{}: {}", verb, message)).into()
            }
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unexpected failure".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bridge::DisabledBridge;
    use crate::confirm::FixedAnswer;

    #[test]
    fn test_panic_message_variants() {
        let payload: Box<dyn Any + Send> = Box::new("boom");
        assert_eq!(panic_message(payload.as_ref()), "boom");
        let payload: Box<dyn Any + Send> = Box::new(String::from("bang"));
        assert_eq!(panic_message(payload.as_ref()), "bang");
        let payload: Box<dyn Any + Send> = Box::new(7u8);
        assert_eq!(panic_message(payload.as_ref()), "unexpected failure");
    }

    #[tokio::test]
    async fn test_clear_and_terminate_outcomes() {
        let executor = Executor::new(
            Capabilities::none(),
            Arc::new(DisabledBridge),
            Duration::from_secs(5),
        );
        let mut session = Session::new(std::env::temp_dir());
        let confirm = FixedAnswer(false);

        let outcome = executor
            .execute(&mut session, "clear", ExecOptions::interactive(&confirm))
            .await;
        assert_eq!(outcome, ExecOutcome::ClearScreen);
        assert_eq!(outcome.text(), "");

        let outcome = executor
            .execute(&mut session, "  quit  ", ExecOptions::interactive(&confirm))
            .await;
        assert_eq!(outcome, ExecOutcome::Terminate);
        assert_eq!(session.history.render(), "1 clear\n2 quit");
    }

    #[tokio::test]
    async fn test_nl_prefix_reaches_bridge() {
        let executor = Executor::new(
            Capabilities::none(),
            Arc::new(DisabledBridge),
            Duration::from_secs(5),
        );
        let mut session = Session::new(std::env::temp_dir());
        let confirm = FixedAnswer(false);

        // Quoting is not interpreted after the prefix.
        let text = executor
            .execute_line(&mut session, "nl: what's \"up", ExecOptions::remote(&confirm))
            .await;
        assert_eq!(text, crate::bridge::DISABLED_MESSAGE);
        assert!(session.history.is_empty());
    }
}
