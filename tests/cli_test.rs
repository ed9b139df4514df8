// tests/cli_test.rs
//
// Runs the crycheckr binary over generated fixtures.

mod test_utils;

use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use crycheckr::core::TARGET_SAMPLE_RATE;
use crycheckr::testgen;
use test_utils::*;

fn binary_path() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_crycheckr"))
}

/// Temp dir with `models/` and a `clips/` fixture set
fn setup(prefix: &str) -> (PathBuf, PathBuf, PathBuf) {
    let root = temp_dir(prefix);
    let models = root.join("models");
    std::fs::create_dir_all(&models).unwrap();
    write_models(&models, &tiny_classifier(128), &constant_screen(1.0));

    let clips = root.join("clips");
    testgen::write_fixture_set(&clips, 2.0, TARGET_SAMPLE_RATE).unwrap();
    (root, models, clips)
}

fn run(models: &Path, args: &[&str], inputs: &[&Path]) -> Output {
    Command::new(binary_path())
        .arg("--models")
        .arg(models)
        .args(args)
        .args(inputs)
        .env_remove("RUST_LOG")
        .output()
        .expect("Failed to execute crycheckr")
}

#[test]
fn test_json_run_over_directory() {
    let (root, models, clips) = setup("cli-json");

    let output = run(&models, &["--format", "json"], &[clips.as_path()]);
    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    let doc: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let reports = doc["reports"].as_array().unwrap();
    assert_eq!(reports.len(), 4);
    assert_eq!(doc["summary"]["total"], 4);
    assert_eq!(doc["summary"]["failed"], 0);
    assert_eq!(doc["summary"]["classified"], 2);
    assert_eq!(doc["summary"]["rejected"], 2);

    let verdict_of = |name: &str| {
        reports
            .iter()
            .find(|r| r["source"].as_str().unwrap().ends_with(name))
            .map(|r| r["verdict"].clone())
            .unwrap()
    };
    assert_eq!(verdict_of("silence.wav")["outcome"], "rejected");
    assert_eq!(verdict_of("silence.wav")["reason"], "silence");
    assert_eq!(verdict_of("noise.wav")["reason"], "non-cry-pattern");
    assert_eq!(verdict_of("cry.wav")["outcome"], "classified");
    assert_eq!(verdict_of("cry.wav")["label"], "tired");
    assert_eq!(verdict_of("cry.wav")["is_atypical"], false);

    // Features are opt-in on the command line
    assert!(reports.iter().all(|r| r.get("features").is_none()));

    std::fs::remove_dir_all(&root).unwrap();
}

#[test]
fn test_features_flag() {
    let (root, models, clips) = setup("cli-features");
    let cry = clips.join("cry.wav");

    let output = run(&models, &["--format", "json", "--features"], &[cry.as_path()]);
    assert!(output.status.success());

    let doc: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let features = doc["reports"][0]["features"].as_object().unwrap();
    assert_eq!(features.len(), 20);
    assert!(features.contains_key("f0_mean"));

    std::fs::remove_dir_all(&root).unwrap();
}

#[test]
fn test_text_output() {
    let (root, models, clips) = setup("cli-text");

    let (cry, silence) = (clips.join("cry.wav"), clips.join("silence.wav"));
    let output = run(&models, &[], &[cry.as_path(), silence.as_path()]);
    assert!(output.status.success());

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("tired"), "stdout: {}", stdout);
    assert!(stdout.contains("silence"), "stdout: {}", stdout);

    std::fs::remove_dir_all(&root).unwrap();
}

#[test]
fn test_corrupt_file_fails_run() {
    let (root, models, clips) = setup("cli-corrupt");
    let corrupt = clips.join("corrupt.wav");
    std::fs::write(&corrupt, b"RIFF but not really a wave file").unwrap();

    let output = run(&models, &["--format", "json"], &[clips.as_path()]);
    assert!(!output.status.success());

    let doc: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(doc["reports"].as_array().unwrap().len(), 4);
    assert_eq!(doc["summary"]["failed"], 1);
    let failure = &doc["failures"][0];
    assert!(failure["source"].as_str().unwrap().ends_with("corrupt.wav"));

    std::fs::remove_dir_all(&root).unwrap();
}

#[test]
fn test_missing_models_fails() {
    let root = temp_dir("cli-nomodels");
    let clip = root.join("cry.wav");
    testgen::write_wav(&clip, &testgen::sine(440.0, 0.5, 1.0, 16000), 16000).unwrap();

    let output = run(&root.join("absent"), &[], &[clip.as_path()]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Failed to load models"), "stderr: {}", stderr);

    std::fs::remove_dir_all(&root).unwrap();
}

#[test]
fn test_no_audio_files() {
    let root = temp_dir("cli-empty");
    write_models(&root, &tiny_classifier(128), &constant_screen(1.0));

    let output = run(&root, &[], &[root.as_path()]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("No audio files found"));
    std::fs::remove_dir_all(&root).unwrap();
}
