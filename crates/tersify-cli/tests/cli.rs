//! End-to-end tests for the tersify binary.

use assert_cmd::cargo::cargo_bin_cmd;
use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

fn tersify() -> Command {
    cargo_bin_cmd!("tersify")
}

/// Write a config that uses the word counter and only the listed resources.
fn write_config(dir: &Path, extra: &str) -> PathBuf {
    let path = dir.join("pipeline.toml");
    fs::write(
        &path,
        format!(
            r#"
[tokenizer]
model = "words"

[pipeline.spell_check]
enabled = false

[pipeline.abbreviations]
enabled = false

{extra}
"#
        ),
    )
    .unwrap();
    path
}

mod basics {
    use super::*;

    #[test]
    fn test_help() {
        tersify()
            .arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains("--count-only"));
    }

    #[test]
    fn test_version() {
        tersify().arg("--version").assert().success();
    }

    #[test]
    fn test_unknown_stage_is_rejected() {
        tersify()
            .args(["--stages", "grammar"])
            .write_stdin("text")
            .assert()
            .failure();
    }
}

mod modes {
    use super::*;

    #[test]
    fn test_count_only() {
        let dir = TempDir::new().unwrap();
        let config = write_config(dir.path(), "");
        tersify()
            .arg("--count-only")
            .arg("-c")
            .arg(&config)
            .write_stdin("hello world test")
            .assert()
            .success()
            .stdout("3 tokens\n");
    }

    #[test]
    fn test_count_only_json() {
        let dir = TempDir::new().unwrap();
        let config = write_config(dir.path(), "");
        let output = tersify()
            .args(["--count-only", "--json", "-c"])
            .arg(&config)
            .write_stdin("one two")
            .output()
            .unwrap();
        assert!(output.status.success());
        let value: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
        assert_eq!(value["tokens"], 2);
        assert_eq!(value["model"], "words");
    }

    #[test]
    fn test_analyze_reports_on_stderr() {
        let dir = TempDir::new().unwrap();
        let config = write_config(dir.path(), "");
        tersify()
            .arg("--analyze")
            .arg("-c")
            .arg(&config)
            .write_stdin("It was basically fine, basically.")
            .assert()
            .success()
            .stdout("")
            .stderr(predicate::str::contains("Potential token-aware optimizations:"))
            .stderr(predicate::str::contains("'basically' → '': 2x, save 2 tokens"));
    }

    #[test]
    fn test_analyze_nothing_found() {
        let dir = TempDir::new().unwrap();
        let config = write_config(dir.path(), "");
        tersify()
            .arg("--analyze")
            .arg("-c")
            .arg(&config)
            .write_stdin("Short and plain.")
            .assert()
            .success()
            .stderr(predicate::str::contains("No significant token optimizations found."));
    }
}

mod pipeline {
    use super::*;

    #[test]
    fn test_token_aware_with_default_tokenizer() {
        let dir = TempDir::new().unwrap();
        tersify()
            .current_dir(dir.path())
            .args(["--stages", "token_aware"])
            .write_stdin("This is basically a test.")
            .assert()
            .success()
            .stdout("This is a test.\n")
            .stderr(predicate::str::contains("✓ token_aware:"))
            .stderr(predicate::str::contains("Skipping spell_check"));
    }

    #[test]
    fn test_reads_file_and_writes_output() {
        let dir = TempDir::new().unwrap();
        let config = write_config(dir.path(), "");
        let input = dir.path().join("input.txt");
        let output = dir.path().join("output.txt");
        fs::write(&input, "We will do it in order to learn.").unwrap();

        tersify()
            .arg(&input)
            .arg("-o")
            .arg(&output)
            .arg("-c")
            .arg(&config)
            .assert()
            .success()
            .stdout("");

        assert_eq!(fs::read_to_string(&output).unwrap(), "We will do it in order to learn.");
    }

    #[test]
    fn test_custom_candidate_from_config() {
        let dir = TempDir::new().unwrap();
        let config = write_config(
            dir.path(),
            r#"
[pipeline.token_aware]
custom_candidates = [{ phrase = "in order to", replacement = "to" }]
"#,
        );
        tersify()
            .arg("-c")
            .arg(&config)
            .write_stdin("We do it in order to learn.")
            .assert()
            .success()
            .stdout("We do it to learn.\n");
    }

    #[test]
    fn test_abbreviations_from_config_dir() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("abbrev.json"),
            r#"{"technical": {"repository": "repo", "configuration": "config"}}"#,
        )
        .unwrap();
        let config = dir.path().join("pipeline.yaml");
        fs::write(
            &config,
            "tokenizer:\n  model: words\npipeline:\n  spell_check:\n    enabled: false\n  abbreviations:\n    enabled: true\n    custom_dict_path: abbrev.json\n",
        )
        .unwrap();

        tersify()
            .arg("-c")
            .arg(&config)
            .write_stdin("Update the Repository configuration")
            .assert()
            .success()
            .stdout("Update the Repo config\n")
            .stderr(predicate::str::contains("✓ abbreviations:"));
    }

    #[test]
    fn test_failing_stage_passes_text_through() {
        let dir = TempDir::new().unwrap();
        let config = write_config(
            dir.path(),
            r#"
[pipeline.ml_paraphrase]
enabled = true
command = ["/nonexistent/paraphraser"]
"#,
        );
        tersify()
            .arg("-c")
            .arg(&config)
            .args(["--stages", "ml_paraphrase"])
            .write_stdin("Leave this text alone.")
            .assert()
            .success()
            .stdout("Leave this text alone.\n")
            .stderr(predicate::str::contains("✗ ml_paraphrase failed"));
    }

    #[test]
    fn test_verbose_prints_table_and_diff() {
        let dir = TempDir::new().unwrap();
        let config = write_config(dir.path(), "");
        tersify()
            .args(["-v", "-c"])
            .arg(&config)
            .write_stdin("We basically run it.")
            .assert()
            .success()
            .stdout("We run it.\n")
            .stderr(predicate::str::contains("Status"))
            .stderr(predicate::str::contains("Overall changes:"))
            .stderr(predicate::str::contains("[-"));
    }

    #[test]
    fn test_debug_log_lists_enabled_stages() {
        let dir = TempDir::new().unwrap();
        let config = write_config(dir.path(), "");
        tersify()
            .env("RUST_LOG", "tersify=debug")
            .args(["--count-only", "-c"])
            .arg(&config)
            .write_stdin("one two")
            .assert()
            .success()
            .stdout("2 tokens\n")
            .stderr(predicate::str::contains("Pipeline configured"))
            .stderr(predicate::str::contains(r#"["token_aware"]"#));
    }

    #[test]
    fn test_debug_log_shows_optimizer_statistics() {
        let dir = TempDir::new().unwrap();
        let config = write_config(dir.path(), "");
        tersify()
            .env("RUST_LOG", "tersify_core=debug")
            .arg("-c")
            .arg(&config)
            .write_stdin("We basically run it.")
            .assert()
            .success()
            .stdout("We run it.\n")
            .stderr(predicate::str::contains("--- Token Optimization Statistics ---"))
            .stderr(predicate::str::contains("'basically' → '': 1 times, saved 1 tokens"));
    }

    #[test]
    fn test_json_report() {
        let dir = TempDir::new().unwrap();
        let config = write_config(dir.path(), "");
        let output = tersify()
            .args(["--json", "-c"])
            .arg(&config)
            .write_stdin("It is really done.")
            .output()
            .unwrap();
        assert!(output.status.success());

        let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
        assert_eq!(report["final_text"], "It is done.");
        assert_eq!(report["original_tokens"], 5);
        assert_eq!(report["final_tokens"], 4);
        assert_eq!(report["history"]["results"][0]["stage"], "Original");
    }
}

mod errors {
    use super::*;

    #[test]
    fn test_missing_input_file() {
        tersify()
            .arg("/nonexistent/input.txt")
            .assert()
            .failure()
            .stderr(predicate::str::contains("Failed to read input file"));
    }

    #[test]
    fn test_missing_config_file() {
        tersify()
            .args(["-c", "/nonexistent/pipeline.toml"])
            .write_stdin("text")
            .assert()
            .failure()
            .stderr(predicate::str::contains("Failed to load configuration"));
    }

    #[test]
    fn test_malformed_config_file() {
        let dir = TempDir::new().unwrap();
        let config = dir.path().join("pipeline.toml");
        fs::write(&config, "[tokenizer\nmodel =").unwrap();
        tersify()
            .arg("-c")
            .arg(&config)
            .write_stdin("text")
            .assert()
            .failure();
    }

    #[test]
    fn test_unknown_tokenizer_model() {
        let dir = TempDir::new().unwrap();
        let config = dir.path().join("pipeline.toml");
        fs::write(&config, "[tokenizer]\nmodel = \"no-such-model\"\n").unwrap();
        tersify()
            .arg("-c")
            .arg(&config)
            .write_stdin("text")
            .assert()
            .failure()
            .stderr(predicate::str::contains("Failed to initialize pipeline"));
    }
}
