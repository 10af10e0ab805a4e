//! CLI integration tests — runs the built `deploy-dir` binary.
//!
//! Covers exit codes, stdout vs. file output, and the overwrite rules. The
//! generated source itself is checked in the library's unit tests.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tempfile::TempDir;

fn bin() -> Command {
    Command::new(env!("CARGO_BIN_EXE_deploy-dir"))
}

fn testdata() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("fixtures/testdata")
}

fn run(args: &[&str], cwd: &Path) -> Output {
    bin().args(args).current_dir(cwd).output().unwrap()
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).to_string()
}

#[test]
fn help_exits_zero() {
    let tmp = TempDir::new().unwrap();
    let out = run(&["-h"], tmp.path());
    assert_eq!(out.status.code(), Some(0));
    assert!(stdout(&out).contains("--basic-auth"));
}

#[test]
fn version_exits_zero() {
    let tmp = TempDir::new().unwrap();
    let out = run(&["-v"], tmp.path());
    assert_eq!(out.status.code(), Some(0));
    assert!(stdout(&out).starts_with("deploy-dir "));
}

#[test]
fn missing_directory_argument_exits_one() {
    let tmp = TempDir::new().unwrap();
    let out = run(&[], tmp.path());
    assert_eq!(out.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&out.stderr).contains("target directory is not given"));
}

#[test]
fn prints_source_to_stdout_without_output_flag() {
    let tmp = TempDir::new().unwrap();
    let out = run(&[testdata().to_str().unwrap()], tmp.path());
    assert_eq!(out.status.code(), Some(0));

    let source = stdout(&out);
    assert!(source.starts_with("// Generated by deploy-dir "));
    assert!(source.contains(r#"dirData["/bar.ts"] = [decode("Y29uc29sZS5sb2coImJhciIpOwo="), "text/typescript"];"#));
    assert!(source.contains(r#"dirData["/foo.txt"] = [decode("Zm9vCg=="), "text/plain"];"#));
    assert!(source.contains(r#"addEventListener("fetch""#));
}

#[test]
fn writes_output_file() {
    let tmp = TempDir::new().unwrap();
    let out = run(
        &[testdata().to_str().unwrap(), "-o", "deploy.ts", "-r", "static"],
        tmp.path(),
    );
    assert_eq!(out.status.code(), Some(0));
    assert!(stdout(&out).contains("Writing the source code to 'deploy.ts'"));
    assert!(stdout(&out).contains("2 files, 24 B embedded"));

    let source = fs::read_to_string(tmp.path().join("deploy.ts")).unwrap();
    assert!(source.contains(r#"dirData["/static/foo.txt"]"#));
    assert!(source.contains(r#"dirData["/static/bar.ts"]"#));
}

#[test]
fn js_flag_drops_type_annotation() {
    let tmp = TempDir::new().unwrap();
    let out = run(&[testdata().to_str().unwrap(), "--js"], tmp.path());
    assert_eq!(out.status.code(), Some(0));
    let source = stdout(&out);
    assert!(source.contains("\nconst dirData = {};\n"));
    assert!(!source.contains("Record<"));
}

#[test]
fn output_path_that_is_a_directory_exits_one() {
    let tmp = TempDir::new().unwrap();
    fs::create_dir(tmp.path().join("out")).unwrap();
    let out = run(&[testdata().to_str().unwrap(), "-o", "out"], tmp.path());
    assert_eq!(out.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&out.stderr).contains("is a directory"));
}

#[test]
fn existing_output_is_overwritten_with_yes() {
    let tmp = TempDir::new().unwrap();
    fs::write(tmp.path().join("deploy.ts"), "old").unwrap();
    let out = run(&[testdata().to_str().unwrap(), "-o", "deploy.ts", "-y"], tmp.path());
    assert_eq!(out.status.code(), Some(0));
    let source = fs::read_to_string(tmp.path().join("deploy.ts")).unwrap();
    assert!(source.contains("addEventListener"));
}

#[test]
fn existing_output_without_confirmation_is_untouched() {
    let tmp = TempDir::new().unwrap();
    fs::write(tmp.path().join("deploy.ts"), "old").unwrap();
    // No terminal to confirm on: the run must fail without writing.
    let out = run(&[testdata().to_str().unwrap(), "-o", "deploy.ts"], tmp.path());
    assert_eq!(out.status.code(), Some(1));
    assert_eq!(fs::read_to_string(tmp.path().join("deploy.ts")).unwrap(), "old");
}

#[test]
fn malformed_basic_auth_exits_one_without_writing() {
    let tmp = TempDir::new().unwrap();
    let out = run(
        &[testdata().to_str().unwrap(), "--basic-auth", "alice", "-o", "deploy.ts"],
        tmp.path(),
    );
    assert_eq!(out.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&out.stderr).contains("--basic-auth"));
    assert!(!tmp.path().join("deploy.ts").exists());
}

#[test]
fn malformed_cache_option_exits_one() {
    let tmp = TempDir::new().unwrap();
    let out = run(&[testdata().to_str().unwrap(), "--cache", "/css"], tmp.path());
    assert_eq!(out.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&out.stderr).contains("--cache"));
}

#[test]
fn missing_source_directory_exits_one() {
    let tmp = TempDir::new().unwrap();
    let out = run(&["does-not-exist"], tmp.path());
    assert_eq!(out.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&out.stderr).contains("Directory not found"));
}

#[test]
fn config_file_options_apply() {
    let tmp = TempDir::new().unwrap();
    fs::write(
        tmp.path().join("deploy-dir.toml"),
        "root = \"/site\"\ncompress = true\n\n[cache]\n\"/site\" = \"max-age=60\"\n",
    )
    .unwrap();
    let out = run(
        &[testdata().to_str().unwrap(), "--config", "deploy-dir.toml"],
        tmp.path(),
    );
    assert_eq!(out.status.code(), Some(0));
    let source = stdout(&out);
    assert!(source.contains(r#"dirData["/site/foo.txt"]"#));
    assert!(source.contains("gunzip"));
    assert!(source.contains(r#"const cacheControl = [["/site", "max-age=60"]];"#));
}

#[test]
fn gen_config_prints_stock_config() {
    let tmp = TempDir::new().unwrap();
    let out = run(&["--gen-config"], tmp.path());
    assert_eq!(out.status.code(), Some(0));
    assert!(stdout(&out).contains("dialect = \"typescript\""));
}

#[test]
fn repeated_gzip_runs_are_identical() {
    let tmp = TempDir::new().unwrap();
    let args = [testdata().to_str().unwrap().to_string(), "--gzip".to_string()];
    let args: Vec<&str> = args.iter().map(String::as_str).collect();
    let first = run(&args, tmp.path());
    let second = run(&args, tmp.path());
    assert_eq!(first.status.code(), Some(0));
    assert_eq!(first.stdout, second.stdout);
}
