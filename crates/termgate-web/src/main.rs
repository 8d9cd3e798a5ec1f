use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Result, anyhow};
use clap::Parser;
use tiny_http::{Header, Request, Response, Server};
use tracing_subscriber::EnvFilter;

use termgate_core::{AppConfig, Capabilities, Executor};
use termgate_interaction::bridge_from_config;
use termgate_web::{MAX_BODY_BYTES, WebApp, WebResponse, read_body};

#[derive(Parser)]
#[command(name = "termgate-web")]
#[command(about = "Serve the termgate shell over HTTP", long_about = None)]
struct Cli {
    /// Configuration file (defaults to <config dir>/termgate/config.toml)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Address to listen on, overriding web.bind
    #[arg(long)]
    bind: Option<String>,
}

fn to_http(response: WebResponse) -> Response<std::io::Cursor<Vec<u8>>> {
    let mut http = Response::from_string(response.body).with_status_code(response.status);
    if let Ok(header) = Header::from_bytes("Content-Type", response.content_type) {
        http = http.with_header(header);
    }
    http
}

/// Reads the body off the accept thread, then routes and responds.
async fn serve(app: Arc<WebApp>, mut request: Request) {
    let read = tokio::task::spawn_blocking(move || {
        let declared = request.body_length();
        let body = read_body(request.as_reader(), declared, MAX_BODY_BYTES);
        (request, body)
    })
    .await;
    let (request, body) = match read {
        Ok(pair) => pair,
        Err(e) => {
            tracing::warn!("[Web] body reader failed: {}", e);
            return;
        }
    };

    let method = request.method().as_str().to_string();
    let url = request.url().to_string();
    let response = match body {
        Ok(body) => app.handle(&method, &url, &body).await,
        Err(rejected) => rejected,
    };
    tracing::info!("[Web] {} {} -> {}", method, url, response.status);
    if let Err(e) = request.respond(to_http(response)) {
        tracing::debug!("[Web] client went away: {}", e);
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = AppConfig::load(cli.config.as_deref())?;
    let bind = cli.bind.unwrap_or_else(|| config.web.bind.clone());

    let capabilities = Capabilities::probe();
    if !capabilities.metrics {
        tracing::warn!("[Web] system metrics unavailable: top/cpu/mem/uptime will report unavailable");
    }
    let executor = Executor::from_config(&config, capabilities, bridge_from_config(&config.bridge));
    let app = Arc::new(WebApp::from_config(&config, executor)?);

    let server = Server::http(&bind).map_err(|e| anyhow!("failed to bind {}: {}", bind, e))?;
    tracing::info!("[Web] listening on http://{}", bind);

    let runtime = tokio::runtime::Handle::current();
    tokio::task::spawn_blocking(move || {
        for request in server.incoming_requests() {
            runtime.spawn(serve(Arc::clone(&app), request));
        }
    })
    .await?;

    Ok(())
}
