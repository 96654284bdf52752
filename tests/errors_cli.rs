use std::{fs, path::Path, process::Command};

use tempfile::TempDir;

struct Outcome {
    status: i32,
    stdout: String,
    stderr: String,
}

fn run_minnow(dir: &Path, args: &[&str]) -> Outcome {
    let out = Command::new(assert_cmd::cargo::cargo_bin!("minnow"))
        .current_dir(dir)
        .args(args)
        .output()
        .expect("failed to execute binary");
    Outcome {
        status: out.status.code().unwrap_or(-1),
        stdout: String::from_utf8_lossy(&out.stdout).to_string(),
        stderr: String::from_utf8_lossy(&out.stderr).to_string(),
    }
}

fn workspace_with(source: &str) -> TempDir {
    let dir = tempfile::tempdir().expect("tempdir");
    fs::write(dir.path().join("prog.mn"), source).expect("write source");
    dir
}

fn entries(dir: &TempDir) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(dir.path())
        .expect("read_dir")
        .map(|e| e.expect("entry").file_name().to_string_lossy().to_string())
        .collect();
    names.sort();
    names
}

#[test]
fn writes_default_output_file() {
    let dir = workspace_with("int x; x = 1 + 2; printf(x);");
    let out = run_minnow(dir.path(), &["prog.mn"]);
    assert_eq!(out.status, 0, "stderr: {}", out.stderr);
    assert!(out.stdout.is_empty());

    let asm = fs::read_to_string(dir.path().join("out.s")).expect("out.s");
    assert!(asm.contains("    .globl main\n"));
    assert!(asm.contains("    call printf@PLT\n"));
}

#[test]
fn honours_output_flag() {
    let dir = workspace_with("printf(1);");
    let out = run_minnow(dir.path(), &["-o", "custom.s", "prog.mn"]);
    assert_eq!(out.status, 0, "stderr: {}", out.stderr);
    assert_eq!(entries(&dir), vec!["custom.s", "prog.mn"]);
}

#[test]
fn logs_progress_to_stderr() {
    let dir = workspace_with("");
    let out = run_minnow(dir.path(), &["-v", "prog.mn"]);
    assert_eq!(out.status, 0);
    assert!(out.stderr.contains("compiling"));
    assert!(out.stderr.contains("empty program"));
    assert!(out.stderr.contains("code generation complete"));
}

#[test]
fn undefined_variable_fails_without_output() {
    let dir = workspace_with("int x;\nprintf(y);\n");
    let out = run_minnow(dir.path(), &["prog.mn"]);
    assert_eq!(out.status, 1);
    assert!(out.stderr.contains("undefined variable 'y'"), "stderr: {}", out.stderr);
    assert!(out.stderr.contains("2 | printf(y);"));
    assert_eq!(entries(&dir), vec!["prog.mn"]);
}

#[test]
fn never_declared_variable_fails() {
    let dir = workspace_with("printf(x);");
    let out = run_minnow(dir.path(), &["prog.mn"]);
    assert_eq!(out.status, 1);
    assert!(out.stderr.contains("undefined variable 'x'"), "stderr: {}", out.stderr);
    assert!(!dir.path().join("out.s").exists());
}

#[test]
fn too_many_variables_fails() {
    let source: String = (0..101).map(|idx| format!("int v{idx};\n")).collect();
    let dir = workspace_with(&source);
    let out = run_minnow(dir.path(), &["prog.mn"]);
    assert_eq!(out.status, 1);
    assert!(out.stderr.contains("too many variables"), "stderr: {}", out.stderr);
    assert_eq!(entries(&dir), vec!["prog.mn"]);
}

#[test]
fn syntax_error_is_reported() {
    let dir = workspace_with("while (1 { printf(1); }");
    let out = run_minnow(dir.path(), &["prog.mn"]);
    assert_eq!(out.status, 1);
    assert!(out.stderr.contains("expected ')'"), "stderr: {}", out.stderr);
    assert_eq!(entries(&dir), vec!["prog.mn"]);
}

#[test]
fn deep_nesting_is_a_diagnostic() {
    let source = format!("printf({}1{});", "(".repeat(5_000), ")".repeat(5_000));
    let dir = workspace_with(&source);
    let out = run_minnow(dir.path(), &["prog.mn"]);
    assert_eq!(out.status, 1, "stderr: {}", out.stderr);
    assert!(out.stderr.contains("nesting deeper than 128 levels"), "stderr: {}", out.stderr);
    assert_eq!(entries(&dir), vec!["prog.mn"]);
}

#[test]
fn long_expression_compiles() {
    let source = format!("printf({});", vec!["1"; 80_000].join("+"));
    let dir = workspace_with(&source);
    let out = run_minnow(dir.path(), &["prog.mn"]);
    assert_eq!(out.status, 0, "stderr: {}", out.stderr);
    let asm = fs::read_to_string(dir.path().join("out.s")).expect("out.s");
    assert_eq!(asm.matches("addq %rdi, %rax").count(), 79_999);
}

#[test]
fn missing_source_fails() {
    let dir = tempfile::tempdir().expect("tempdir");
    let out = run_minnow(dir.path(), &["nope.mn"]);
    assert_eq!(out.status, 1);
    assert!(out.stderr.contains("failed to read nope.mn"), "stderr: {}", out.stderr);
    assert!(entries(&dir).is_empty());
}

#[test]
fn usage_error_without_arguments() {
    let dir = tempfile::tempdir().expect("tempdir");
    let out = run_minnow(dir.path(), &[]);
    assert_eq!(out.status, 1);
    assert!(out.stderr.contains("missing source file"));
    assert!(out.stderr.contains("Usage:"));
}
