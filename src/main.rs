use std::process::ExitCode;

use anyhow::Context as _;
use clap::Parser as _;

#[tokio::main]
async fn main() -> ExitCode {
    if let Err(err) = try_main().await {
        eprintln!("{err:#}");
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}

async fn try_main() -> anyhow::Result<()> {
    cinebook::logging::init().context("init logging")?;

    let cli = cinebook::cli::Cli::parse();
    tracing::debug!(?cli, "parsed cli");

    match cli.command {
        cinebook::cli::Command::Analyze(args) => {
            cinebook::commands::analyze(args).await.context("analyze")?;
        }
        cinebook::cli::Command::Render(args) => {
            cinebook::commands::render(args).await.context("render")?;
        }
        cinebook::cli::Command::Run(args) => {
            cinebook::commands::run(args).await.context("run")?;
        }
    }

    Ok(())
}
