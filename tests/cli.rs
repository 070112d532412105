mod gemini_stub;

use std::fs;

use predicates::prelude::*;
use serde_json::Value;

use gemini_stub::{API_KEY, GeminiStub, GeminiStubConfig};

fn cinebook() -> assert_cmd::Command {
    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("cinebook");
    cmd.env_remove("GEMINI_API_KEY")
        .env_remove("API_KEY")
        .env_remove("CINEBOOK_ENGINE")
        .env_remove("CINEBOOK_GEMINI_BASE_URL");
    cmd
}

fn read_json(path: &std::path::Path) -> anyhow::Result<Value> {
    Ok(serde_json::from_str(&fs::read_to_string(path)?)?)
}

#[test]
fn run_example_with_noop_engine_completes() -> anyhow::Result<()> {
    let temp = tempfile::TempDir::new()?;
    let out = temp.path().join("report.json");

    cinebook()
        .args(["run", "--example", "--engine", "noop", "--out"])
        .arg(&out)
        .assert()
        .success();

    let report = read_json(&out)?;
    assert_eq!(report["state"]["status"], "completed");
    assert_eq!(report["state"]["credential_needed"], false);
    assert_eq!(
        report["analysis"]["title"],
        "Alice's Adventures in Wonderland"
    );
    let scenes = report["analysis"]["scenes"].as_array().unwrap();
    assert_eq!(scenes.len(), 6);
    for scene in scenes {
        assert!(scene["image"].as_str().unwrap().starts_with("data:image/png;base64,"));
        assert!(scene["videoUrl"].as_str().unwrap().starts_with("noop://video/"));
    }
    Ok(())
}

#[test]
fn analyze_then_render_with_noop_engine() -> anyhow::Result<()> {
    let temp = tempfile::TempDir::new()?;
    let input = temp.path().join("book.txt");
    fs::write(
        &input,
        "# The Lighthouse\n\nThe keeper climbs the stairs.\n\nA ship appears in the fog.\n",
    )?;
    let analysis_path = temp.path().join("analysis.json");
    let report_path = temp.path().join("report.json");

    cinebook()
        .args(["analyze", "--engine", "noop", "--input"])
        .arg(&input)
        .arg("--out")
        .arg(&analysis_path)
        .assert()
        .success();

    let analysis = read_json(&analysis_path)?;
    assert_eq!(analysis["title"], "The Lighthouse");
    assert_eq!(analysis["scenes"].as_array().unwrap().len(), 2);
    assert!(analysis["scenes"][0].get("image").is_none());

    cinebook()
        .args(["render", "--engine", "noop", "--analysis"])
        .arg(&analysis_path)
        .arg("--out")
        .arg(&report_path)
        .assert()
        .success();

    let report = read_json(&report_path)?;
    assert_eq!(report["state"]["status"], "completed");
    assert_eq!(report["analysis"]["scenes"][1]["videoUrl"], "noop://video/1");
    Ok(())
}

#[test]
fn existing_output_requires_force() -> anyhow::Result<()> {
    let temp = tempfile::TempDir::new()?;
    let out = temp.path().join("report.json");
    fs::write(&out, "{}")?;

    cinebook()
        .args(["run", "--example", "--engine", "noop", "--out"])
        .arg(&out)
        .assert()
        .failure()
        .stderr(predicate::str::contains("output already exists"));

    cinebook()
        .args(["run", "--example", "--engine", "noop", "--force", "--out"])
        .arg(&out)
        .assert()
        .success();
    Ok(())
}

#[test]
fn gemini_without_api_key_fails_and_asks_for_one() -> anyhow::Result<()> {
    let temp = tempfile::TempDir::new()?;
    let out = temp.path().join("report.json");

    cinebook()
        .args(["run", "--example", "--engine", "gemini", "--out"])
        .arg(&out)
        .assert()
        .failure()
        .stderr(predicate::str::contains("credential needed"))
        .stderr(predicate::str::contains("GEMINI_API_KEY"));

    let report = read_json(&out)?;
    assert_eq!(report["state"]["status"], "error");
    assert_eq!(report["state"]["credential_needed"], true);
    assert!(report["analysis"].is_null());
    Ok(())
}

#[test]
fn gemini_run_suspends_when_video_model_is_missing() -> anyhow::Result<()> {
    let stub = GeminiStub::spawn(GeminiStubConfig {
        scenes: 3,
        video_not_found_at: Some(1),
        ..GeminiStubConfig::default()
    });
    let temp = tempfile::TempDir::new()?;
    let input = temp.path().join("book.txt");
    fs::write(&input, "# A Book\n\nOnce upon a time.\n")?;
    let out = temp.path().join("report.json");

    cinebook()
        .env("GEMINI_API_KEY", API_KEY)
        .args(["run", "--engine", "gemini", "--poll-interval-ms", "1"])
        .args(["--gemini-base-url", &stub.base_url])
        .arg("--input")
        .arg(&input)
        .arg("--out")
        .arg(&out)
        .assert()
        .success()
        .stderr(predicate::str::contains("credential needed"))
        .stderr(predicate::str::contains("paid Google Cloud project"));

    let report = read_json(&out)?;
    assert_eq!(report["state"]["status"], "completed");
    assert_eq!(report["state"]["credential_needed"], true);
    let scenes = report["analysis"]["scenes"].as_array().unwrap();
    assert_eq!(scenes.len(), 3);
    assert!(scenes.iter().all(|s| s["image"].is_string()));
    assert_eq!(scenes[0]["videoUrl"], "https://files.example/op-0.mp4");
    assert!(scenes[1].get("videoUrl").is_none());
    assert!(scenes[2].get("videoUrl").is_none());
    Ok(())
}

#[test]
fn rust_log_debug_emits_debug_line_to_stderr() -> anyhow::Result<()> {
    let temp = tempfile::TempDir::new()?;
    let out = temp.path().join("report.json");

    cinebook()
        .env("RUST_LOG", "debug")
        .args(["run", "--example", "--engine", "noop", "--out"])
        .arg(&out)
        .assert()
        .success()
        .stderr(predicate::str::contains("parsed cli"));
    Ok(())
}
