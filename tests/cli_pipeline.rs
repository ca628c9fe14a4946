//! Black-box CLI smoke tests for the `codex-forge` binary: the `--mock`
//! happy path through to a certified artifact, snapshot reproducibility
//! across two independent runs, the standalone `validate` subcommand, and
//! a couple of usage-error boundaries.

use std::fs;
use std::path::Path;

use assert_cmd::Command;
use predicates::prelude::*;

fn fixtures_dir() -> &'static Path {
    Path::new(concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures"))
}

fn recipe_path() -> std::path::PathBuf {
    fixtures_dir().join("recipe.yaml")
}

fn modules_dir() -> std::path::PathBuf {
    fixtures_dir().join("modules")
}

fn codex_forge() -> Command {
    Command::cargo_bin("codex-forge").expect("codex-forge binary should build")
}

#[test]
fn mock_run_produces_a_certified_gamebook() {
    let output_dir = tempfile::tempdir().unwrap();

    codex_forge()
        .args([
            "run",
            "--recipe",
            recipe_path().to_str().unwrap(),
            "--modules",
            modules_dir().to_str().unwrap(),
            "--output-dir",
            output_dir.path().to_str().unwrap(),
            "--run-id",
            "smoke-run",
            "--mock",
        ])
        .assert()
        .success();

    let run_root = output_dir.path().join("smoke-run");
    let artifact = run_root.join("gamebook.v1.json");
    assert!(artifact.exists(), "terminal artifact should be written to the run root");

    let report_path = run_root.join("gamebook.v1.validation.json");
    let report: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&report_path).unwrap()).unwrap();
    assert_eq!(report["valid"], serde_json::Value::Bool(true), "report: {report}");
    assert_eq!(report["errors"].as_array().unwrap().len(), 0);
}

#[test]
fn two_runs_of_the_same_recipe_snapshot_identical_plan_and_registry_bytes() {
    let output_dir = tempfile::tempdir().unwrap();

    for run_id in ["run-a", "run-b"] {
        codex_forge()
            .args([
                "run",
                "--recipe",
                recipe_path().to_str().unwrap(),
                "--modules",
                modules_dir().to_str().unwrap(),
                "--output-dir",
                output_dir.path().to_str().unwrap(),
                "--run-id",
                run_id,
                "--mock",
            ])
            .assert()
            .success();
    }

    let plan_a = fs::read(output_dir.path().join("run-a/snapshots/plan.json")).unwrap();
    let plan_b = fs::read(output_dir.path().join("run-b/snapshots/plan.json")).unwrap();
    assert_eq!(plan_a, plan_b, "plan snapshots must be byte-identical across runs of the same recipe");

    let registry_a = fs::read(output_dir.path().join("run-a/snapshots/registry.json")).unwrap();
    let registry_b = fs::read(output_dir.path().join("run-b/snapshots/registry.json")).unwrap();
    assert_eq!(registry_a, registry_b, "registry snapshots must be byte-identical across runs");
}

#[test]
fn plan_subcommand_prints_stage_order_without_creating_a_run_directory() {
    let output_dir = tempfile::tempdir().unwrap();

    codex_forge()
        .args([
            "plan",
            "--recipe",
            recipe_path().to_str().unwrap(),
            "--modules",
            modules_dir().to_str().unwrap(),
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("ocr_pages"))
        .stdout(predicate::str::contains("assemble"));

    assert_eq!(fs::read_dir(output_dir.path()).unwrap().count(), 0);
}

#[test]
fn validate_subcommand_certifies_a_standalone_artifact() {
    let dir = tempfile::tempdir().unwrap();
    let artifact_path = dir.path().join("gamebook.json");
    fs::write(
        &artifact_path,
        serde_json::json!({
            "start_section": "1",
            "sections": {
                "1": {"id": "1", "sequence": [{"type": "end"}]},
            },
            "metadata": {"section_range": [1, 1]},
        })
        .to_string(),
    )
    .unwrap();

    codex_forge()
        .args(["validate", "--artifact", artifact_path.to_str().unwrap()])
        .assert()
        .success();

    let report_path = dir.path().join("gamebook.validation.json");
    let report: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&report_path).unwrap()).unwrap();
    assert_eq!(report["valid"], serde_json::Value::Bool(true));
}

#[test]
fn validate_subcommand_exits_one_on_a_broken_artifact() {
    let dir = tempfile::tempdir().unwrap();
    let artifact_path = dir.path().join("broken.json");
    fs::write(
        &artifact_path,
        serde_json::json!({
            "start_section": "missing",
            "sections": {},
        })
        .to_string(),
    )
    .unwrap();

    codex_forge()
        .args(["validate", "--artifact", artifact_path.to_str().unwrap()])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("error"));
}

#[test]
fn force_without_an_explicit_run_id_is_a_usage_error() {
    let output_dir = tempfile::tempdir().unwrap();

    codex_forge()
        .args([
            "run",
            "--recipe",
            recipe_path().to_str().unwrap(),
            "--modules",
            modules_dir().to_str().unwrap(),
            "--output-dir",
            output_dir.path().to_str().unwrap(),
            "--force",
            "--mock",
        ])
        .assert()
        .code(2);
}

#[test]
fn force_on_canonical_output_parent_is_a_usage_error() {
    let output_dir = tempfile::tempdir().unwrap();

    codex_forge()
        .args([
            "run",
            "--recipe",
            recipe_path().to_str().unwrap(),
            "--modules",
            modules_dir().to_str().unwrap(),
            "--output-dir",
            output_dir.path().to_str().unwrap(),
            "--canonical-output-dir",
            output_dir.path().to_str().unwrap(),
            "--run-id",
            "smoke-run",
            "--force",
            "--mock",
        ])
        .assert()
        .code(2);
}

#[test]
fn run_under_the_canonical_parent_is_registered_in_the_manifest() {
    let output_dir = tempfile::tempdir().unwrap();

    codex_forge()
        .args([
            "run",
            "--recipe",
            recipe_path().to_str().unwrap(),
            "--modules",
            modules_dir().to_str().unwrap(),
            "--output-dir",
            output_dir.path().to_str().unwrap(),
            "--canonical-output-dir",
            output_dir.path().to_str().unwrap(),
            "--run-id",
            "canonical-run",
            "--mock",
        ])
        .assert()
        .success();

    let manifest_path = output_dir.path().join("run_manifest.jsonl");
    let content = fs::read_to_string(&manifest_path).unwrap();
    assert!(content.contains("canonical-run"));
}

#[test]
fn run_outside_the_canonical_parent_is_not_registered_in_the_manifest() {
    let output_dir = tempfile::tempdir().unwrap();
    let canonical_dir = tempfile::tempdir().unwrap();

    codex_forge()
        .args([
            "run",
            "--recipe",
            recipe_path().to_str().unwrap(),
            "--modules",
            modules_dir().to_str().unwrap(),
            "--output-dir",
            output_dir.path().to_str().unwrap(),
            "--canonical-output-dir",
            canonical_dir.path().to_str().unwrap(),
            "--run-id",
            "scratch-run",
            "--mock",
        ])
        .assert()
        .success();

    assert!(
        !output_dir.path().join("run_manifest.jsonl").exists(),
        "a temporary run outside the canonical parent must not create a run manifest"
    );
}

#[test]
fn unknown_recipe_path_is_a_usage_error() {
    let output_dir = tempfile::tempdir().unwrap();

    codex_forge()
        .args([
            "run",
            "--recipe",
            fixtures_dir().join("no_such_recipe.yaml").to_str().unwrap(),
            "--modules",
            modules_dir().to_str().unwrap(),
            "--output-dir",
            output_dir.path().to_str().unwrap(),
            "--mock",
        ])
        .assert()
        .code(2);
}
