use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context as _;
use axum::response::Html;
use clap::Parser;
use tower_http::services::{ServeDir, ServeFile};

use cinebook::app::{AppState, router};
use cinebook::cli::ProviderArgs;
use cinebook::credentials::CredentialStore;
use cinebook::pipeline::Session;
use cinebook::provider::Providers;

#[derive(Debug, Parser)]
#[command(author, version, about)]
struct AppArgs {
    #[arg(long, default_value = "127.0.0.1:8080")]
    addr: SocketAddr,

    /// Static web assets directory (serve if exists).
    #[arg(long, default_value = "web/dist")]
    web_dir: PathBuf,

    #[command(flatten)]
    provider: ProviderArgs,
}

#[tokio::main]
async fn main() -> std::process::ExitCode {
    if let Err(err) = try_main().await {
        eprintln!("{err:#}");
        return std::process::ExitCode::FAILURE;
    }
    std::process::ExitCode::SUCCESS
}

async fn try_main() -> anyhow::Result<()> {
    cinebook::logging::init()?;

    let args = AppArgs::parse();
    tracing::info!(?args, "starting cinebook-app");

    let config = args.provider.gemini_config().context("load gemini config")?;
    let credentials = Arc::new(CredentialStore::from_env());
    let providers = Providers::build(args.provider.engine, &config, Arc::clone(&credentials))
        .context("build providers")?;
    let state = AppState {
        session: Arc::new(Session::new(providers, credentials.clone())),
        credentials,
    };

    let mut app = router(state);

    let web_index = args.web_dir.join("index.html");
    if web_index.exists() {
        let static_files = ServeDir::new(args.web_dir).not_found_service(ServeFile::new(web_index));
        app = app.fallback_service(static_files);
    } else {
        app = app.fallback(|| async {
            Html(
                r#"<!doctype html>
<html>
  <head><meta charset="utf-8"><title>cinebook-app</title></head>
  <body>
    <h1>cinebook-app</h1>
    <p>web assets not found. Build the web app into <code>web/dist</code>, or use the JSON API under <code>/api</code>.</p>
  </body>
</html>
"#,
            )
        });
    }

    let listener = tokio::net::TcpListener::bind(args.addr)
        .await
        .map_err(|err| anyhow::anyhow!("bind {}: {err}", args.addr))?;
    tracing::info!(addr = %args.addr, engine = ?args.provider.engine, "listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("shutting down");
        })
        .await?;
    Ok(())
}
