//! HTTP front end for the shell core.
//!
//! [`WebApp::handle`] maps one request to one response without touching a
//! socket; `main.rs` owns the `tiny_http` accept loop.

use std::collections::VecDeque;
use std::future::Future;
use std::io::Read;
use std::sync::Arc;

use minijinja::{Environment, context};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::sync::Mutex;

use termgate_core::config::WebConfig;
use termgate_core::{AppConfig, ExecOptions, Executor, FixedAnswer, Session};

const INDEX_TEMPLATE: &str = include_str!("../templates/index.html");
const FORM_TEMPLATE: &str = include_str!("../templates/form.html");

const HTML: &str = "text/html; charset=utf-8";
const JSON: &str = "application/json";
const TEXT: &str = "text/plain; charset=utf-8";

/// Largest request body the server will buffer.
pub const MAX_BODY_BYTES: usize = 64 * 1024;

/// A response ready to be written to the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebResponse {
    pub status: u16,
    pub content_type: &'static str,
    pub body: String,
}

impl WebResponse {
    fn html(body: String) -> Self {
        Self {
            status: 200,
            content_type: HTML,
            body,
        }
    }

    fn json(status: u16, value: serde_json::Value) -> Self {
        Self {
            status,
            content_type: JSON,
            body: value.to_string(),
        }
    }

    fn text(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            content_type: TEXT,
            body: body.into(),
        }
    }

    fn execute_error(status: u16, message: impl Into<String>) -> Self {
        Self::json(status, json!({ "output": "", "error": message.into() }))
    }
}

#[derive(Deserialize)]
struct ExecuteRequest {
    #[serde(default)]
    command: Option<String>,
}

/// One command and its output on the form page.
#[derive(Debug, Clone, Serialize)]
pub struct TranscriptEntry {
    pub command: String,
    pub output: String,
}

/// Shared state behind every request.
///
/// There is one session for the whole server. Its mutex is held for the full
/// invocation, so a `cd` and anything that depends on it never interleave with
/// another request.
pub struct WebApp {
    executor: Executor,
    session: Mutex<Session>,
    transcript: Mutex<VecDeque<TranscriptEntry>>,
    transcript_limit: usize,
    confirm: FixedAnswer,
    templates: Environment<'static>,
}

impl WebApp {
    pub fn new(executor: Executor, session: Session, web: &WebConfig) -> Result<Self, minijinja::Error> {
        let mut templates = Environment::new();
        templates.add_template("index.html", INDEX_TEMPLATE)?;
        templates.add_template("form.html", FORM_TEMPLATE)?;

        Ok(Self {
            executor,
            session: Mutex::new(session),
            transcript: Mutex::new(VecDeque::new()),
            transcript_limit: web.transcript_limit.max(1),
            confirm: FixedAnswer::from(web.confirm),
            templates,
        })
    }

    pub fn from_config(config: &AppConfig, executor: Executor) -> Result<Self, minijinja::Error> {
        let session = Session::at_process_cwd().with_history_limit(config.shell.history_limit);
        Self::new(executor, session, &config.web)
    }

    /// Routes one request. `url` may carry a query string, which is ignored.
    pub async fn handle(self: &Arc<Self>, method: &str, url: &str, body: &str) -> WebResponse {
        let path = url.split('?').next().unwrap_or(url);
        match (method, path) {
            ("GET", "/") => self.index().await,
            ("POST", "/execute") => self.execute(body).await,
            ("GET", "/form") => self.form_page().await,
            ("POST", "/form") => self.form_submit(body).await,
            _ => WebResponse::text(404, "404 Not Found"),
        }
    }

    async fn index(&self) -> WebResponse {
        let cwd = self.session.lock().await.cwd().display().to_string();
        self.render("index.html", context! { user => user_name(), cwd => cwd })
    }

    async fn execute(self: &Arc<Self>, body: &str) -> WebResponse {
        let request: ExecuteRequest = match serde_json::from_str(body) {
            Ok(request) => request,
            Err(e) => return WebResponse::execute_error(400, format!("Invalid request body: {}", e)),
        };
        let command = request.command.unwrap_or_default();
        let command = command.trim();
        if command.is_empty() {
            return WebResponse::execute_error(400, "No command provided");
        }

        execute_response(self.run_isolated(command.to_string()).await)
    }

    async fn form_page(&self) -> WebResponse {
        let cwd = self.session.lock().await.cwd().display().to_string();
        let transcript: Vec<TranscriptEntry> = self.transcript.lock().await.iter().cloned().collect();
        self.render(
            "form.html",
            context! { user => user_name(), cwd => cwd, transcript => transcript },
        )
    }

    async fn form_submit(self: &Arc<Self>, body: &str) -> WebResponse {
        if let Some(command) = form_field(body, "command") {
            let command = command.trim().to_string();
            if !command.is_empty() {
                let output = self
                    .run_isolated(command.clone())
                    .await
                    .unwrap_or_else(|message| format!("Internal server error: {}", message));
                let mut transcript = self.transcript.lock().await;
                transcript.push_back(TranscriptEntry { command, output });
                while transcript.len() > self.transcript_limit {
                    transcript.pop_front();
                }
            }
        }
        self.form_page().await
    }

    async fn run_isolated(self: &Arc<Self>, command: String) -> Result<String, String> {
        let app = Arc::clone(self);
        isolate(async move {
            let mut session = app.session.lock().await;
            app.executor
                .execute_line(&mut session, &command, ExecOptions::remote(&app.confirm))
                .await
        })
        .await
    }

    fn render(&self, name: &str, ctx: minijinja::Value) -> WebResponse {
        match self
            .templates
            .get_template(name)
            .and_then(|template| template.render(ctx))
        {
            Ok(body) => WebResponse::html(body),
            Err(e) => {
                tracing::warn!("[Web] template {} failed: {}", name, e);
                WebResponse::text(500, format!("Internal server error: {}", e))
            }
        }
    }
}

/// Runs `work` on its own task so a fault in it surfaces as an error
/// instead of taking down the connection.
async fn isolate<F>(work: F) -> Result<String, String>
where
    F: Future<Output = String> + Send + 'static,
{
    tokio::spawn(work).await.map_err(|e| {
        if e.is_panic() {
            panic_message(e.into_panic())
        } else {
            e.to_string()
        }
    })
}

fn execute_response(result: Result<String, String>) -> WebResponse {
    match result {
        Ok(output) => WebResponse::json(200, json!({ "output": output, "error": null })),
        Err(message) => {
            tracing::warn!("[Web] /execute failed: {}", message);
            WebResponse::execute_error(500, format!("Internal server error: {}", message))
        }
    }
}

/// Reads a request body of at most `limit` bytes.
///
/// `declared` is the Content-Length, when the client sent one, so an
/// oversized upload is refused before any of it is read.
pub fn read_body(reader: impl Read, declared: Option<usize>, limit: usize) -> Result<String, WebResponse> {
    let too_large = || WebResponse::text(413, format!("Request body exceeds {} bytes", limit));
    if declared.is_some_and(|len| len > limit) {
        return Err(too_large());
    }

    let mut bytes = Vec::new();
    reader
        .take(limit as u64 + 1)
        .read_to_end(&mut bytes)
        .map_err(|e| WebResponse::text(400, format!("Invalid request body: {}", e)))?;
    if bytes.len() > limit {
        return Err(too_large());
    }
    String::from_utf8(bytes).map_err(|e| WebResponse::text(400, format!("Invalid request body: {}", e)))
}

fn user_name() -> String {
    std::env::var("USER")
        .or_else(|_| std::env::var("USERNAME"))
        .unwrap_or_else(|_| "user".to_string())
}

fn panic_message(payload: Box<dyn std::any::Any + Send>) -> String {
    match payload.downcast::<String>() {
        Ok(message) => *message,
        Err(payload) => match payload.downcast::<&str>() {
            Ok(message) => message.to_string(),
            Err(_) => "task panicked".to_string(),
        },
    }
}

/// Extracts one field from an `application/x-www-form-urlencoded` body.
fn form_field(body: &str, name: &str) -> Option<String> {
    body.split('&').find_map(|pair| {
        let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
        if key != name {
            return None;
        }
        let value = value.replace('+', " ");
        urlencoding::decode(&value).ok().map(|decoded| decoded.into_owned())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_form_field_decoding() {
        assert_eq!(
            form_field("command=ls+-la+%7E%2Fdocs&x=1", "command").as_deref(),
            Some("ls -la ~/docs")
        );
        assert_eq!(form_field("other=1", "command"), None);
        assert_eq!(form_field("command=", "command").as_deref(), Some(""));
    }

    #[tokio::test]
    async fn test_panicking_command_becomes_internal_server_error() {
        let result = isolate(async {
            let nothing: Option<String> = None;
            nothing.expect("handler blew up")
        })
        .await;
        assert_eq!(result, Err("handler blew up".to_string()));

        let response = execute_response(result);
        assert_eq!(response.status, 500);
        let body: serde_json::Value = serde_json::from_str(&response.body).unwrap();
        assert_eq!(body["output"], "");
        assert_eq!(body["error"], "Internal server error: handler blew up");
    }

    #[tokio::test]
    async fn test_isolated_success_is_plain_output() {
        let result = isolate(async { "fine".to_string() }).await;
        let response = execute_response(result);
        assert_eq!(response.status, 200);
        let body: serde_json::Value = serde_json::from_str(&response.body).unwrap();
        assert_eq!(body, json!({ "output": "fine", "error": null }));
    }

    #[test]
    fn test_panic_message() {
        assert_eq!(panic_message(Box::new("boom")), "boom");
        assert_eq!(panic_message(Box::new(String::from("bang"))), "bang");
        assert_eq!(panic_message(Box::new(3u8)), "task panicked");
    }
}
