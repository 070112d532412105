use std::fs::OpenOptions;
use std::io::Write as _;
use std::path::Path;
use std::sync::Arc;

use anyhow::Context as _;

use crate::cli::{AnalyzeArgs, ProviderArgs, RenderArgs, RunArgs};
use crate::credentials::{API_KEY_ENV, CredentialStore};
use crate::formats::BookAnalysis;
use crate::pipeline::{RunReport, RunStatus, Session};
use crate::provider::Providers;
use crate::samples;

pub async fn analyze(args: AnalyzeArgs) -> anyhow::Result<()> {
    let text = read_text(&args.input).await?;
    let (providers, _) = build_providers(&args.provider)?;

    let analysis = providers
        .analyzer
        .analyze(&text)
        .await
        .context("analyze book")?;
    tracing::info!(
        title = %analysis.title,
        scenes = analysis.scenes.len(),
        out = %args.out,
        "analysis written"
    );

    let json = serde_json::to_string_pretty(&analysis).context("serialize analysis")?;
    write_output(&args.out, &json, args.force)
}

pub async fn render(args: RenderArgs) -> anyhow::Result<()> {
    ensure_writable(&args.out, args.force)?;
    let raw = tokio::fs::read_to_string(&args.analysis)
        .await
        .with_context(|| format!("read analysis: {}", args.analysis))?;
    let analysis: BookAnalysis = serde_json::from_str(&raw)
        .with_context(|| format!("parse analysis: {}", args.analysis))?;

    let session = build_session(&args.provider)?;
    let report = session.run_analysis(analysis).await;
    finish(report, &args.out, args.force)
}

pub async fn run(args: RunArgs) -> anyhow::Result<()> {
    ensure_writable(&args.out, args.force)?;
    let text = match &args.input {
        Some(input) => read_text(input).await?,
        None => samples::example_text(),
    };

    let session = build_session(&args.provider)?;
    let report = session.run_text(text).await;
    finish(report, &args.out, args.force)
}

fn build_providers(args: &ProviderArgs) -> anyhow::Result<(Providers, Arc<CredentialStore>)> {
    let config = args.gemini_config().context("load gemini config")?;
    let credentials = Arc::new(CredentialStore::from_env());
    tracing::debug!(engine = ?args.engine, base_url = %config.base_url, "building providers");
    let providers = Providers::build(args.engine, &config, Arc::clone(&credentials))
        .context("build providers")?;
    Ok((providers, credentials))
}

fn build_session(args: &ProviderArgs) -> anyhow::Result<Session> {
    let (providers, credentials) = build_providers(args)?;
    Ok(Session::new(providers, credentials))
}

/// Writes the report, surfaces the credential banner, and turns `Error` into
/// a non-zero exit.
fn finish(report: RunReport, out: &str, force: bool) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(&report).context("serialize run report")?;
    write_output(out, &json, force)?;

    let state = &report.state;
    if state.credential_needed {
        let message = state.message.as_deref().unwrap_or_default();
        eprintln!("credential needed: {message}");
        eprintln!("set {API_KEY_ENV} to a key from a paid Google Cloud project and run again");
    }
    for failure in &state.failures {
        eprintln!(
            "scene {} {:?} failed: {}",
            failure.scene_index, failure.phase, failure.message
        );
    }

    match state.status {
        RunStatus::Completed => {
            tracing::info!(run_id = %state.run_id, out, "run completed");
            Ok(())
        }
        status => anyhow::bail!(
            "run ended in {status:?}: {}",
            state.message.as_deref().unwrap_or("no details")
        ),
    }
}

async fn read_text(path: &str) -> anyhow::Result<String> {
    tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("read input: {path}"))
}

fn ensure_writable(path: &str, force: bool) -> anyhow::Result<()> {
    if Path::new(path).exists() && !force {
        anyhow::bail!("output already exists: {path}");
    }
    Ok(())
}

fn write_output(path: &str, contents: &str, force: bool) -> anyhow::Result<()> {
    ensure_writable(path, force)?;
    if let Some(parent) = Path::new(path).parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create output dir: {}", parent.display()))?;
    }

    let mut options = OpenOptions::new();
    options.write(true);
    if force {
        options.create(true).truncate(true);
    } else {
        options.create_new(true);
    }

    let mut file = options
        .open(path)
        .with_context(|| format!("open output: {path}"))?;
    file.write_all(contents.as_bytes())
        .with_context(|| format!("write output: {path}"))?;
    file.write_all(b"\n")
        .with_context(|| format!("write output: {path}"))?;
    file.flush()
        .with_context(|| format!("flush output: {path}"))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_output_refuses_to_clobber_without_force() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("out.json");
        let path = path.to_str().unwrap();

        write_output(path, "{}", false).unwrap();
        let err = write_output(path, "{}", false).unwrap_err().to_string();
        assert!(err.contains("output already exists"));

        write_output(path, "[]", true).unwrap();
        assert_eq!(std::fs::read_to_string(path).unwrap(), "[]\n");
    }
}
