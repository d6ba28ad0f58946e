#![allow(deprecated)]

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

const TOOL_SCRIPT: &str = "#!/bin/sh\necho \"checked $1\"\nexit 0\n";

fn ruby_assess_cmd() -> Command {
    let mut cmd = Command::cargo_bin("ruby-assess-cli").expect("binary should be built");
    cmd.env_remove("RUST_LOG");
    cmd
}

/// Input, build and output directories for one run of a tool that always
/// succeeds.
fn workspace() -> TempDir {
    let root = tempfile::tempdir().expect("tempdir");
    let input = root.path().join("in");
    let build = root.path().join("build");
    fs::create_dir_all(&input).unwrap();
    fs::create_dir_all(&build).unwrap();
    fs::write(build.join("app.rb"), "puts 1\n").unwrap();

    let archive = fs::File::create(input.join("tool.tar")).unwrap();
    let mut builder = tar::Builder::new(archive);
    let mut header = tar::Header::new_gnu();
    header.set_size(TOOL_SCRIPT.len() as u64);
    header.set_mode(0o755);
    builder
        .append_data(&mut header, "checker/check.sh", TOOL_SCRIPT.as_bytes())
        .unwrap();
    builder.finish().unwrap();

    fs::write(input.join("invoke.txt"), "/bin/sh\n<executable>\n<srcfile% >\n").unwrap();
    fs::write(
        input.join("tool.conf"),
        "tool-type=checker\n\
         tool-archive=tool.tar\n\
         tool-dir=checker\n\
         executable=check.sh\n\
         tool-invoke=invoke.txt\n",
    )
    .unwrap();
    fs::write(
        input.join("build_summary.xml"),
        format!(
            "<build-summary>\n\
               <exit-code>0</exit-code>\n\
               <build-root-dir>{}</build-root-dir>\n\
               <build-artifacts>\n\
                 <ruby-src><include><file>app.rb</file></include></ruby-src>\n\
               </build-artifacts>\n\
             </build-summary>\n",
            build.display()
        ),
    )
    .unwrap();
    root
}

fn run_args(cmd: &mut Command, root: &Path) {
    cmd.arg("--input-dir")
        .arg(root.join("in"))
        .arg("--output-dir")
        .arg(root.join("out"))
        .arg("--tool-dir")
        .arg(root.join("tool"));
}

#[test]
fn help_lists_directories() {
    ruby_assess_cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--input-dir"))
        .stdout(predicate::str::contains("--build-summary"));
}

#[test]
fn missing_directories_are_a_usage_error() {
    ruby_assess_cmd().assert().failure().code(2);
}

#[test]
fn passing_run_prints_json_outcome() {
    let root = workspace();
    let mut cmd = ruby_assess_cmd();
    run_args(&mut cmd, root.path());

    let output = cmd.assert().code(0).get_output().stdout.clone();
    let outcome: serde_json::Value = serde_json::from_slice(&output).expect("stdout is JSON");

    assert_eq!(outcome["exit_code"], 0);
    assert_eq!(outcome["passed"], 1);
    assert_eq!(outcome["failed"], 0);
    assert!(
        outcome["assessment_summary_file"]
            .as_str()
            .unwrap()
            .ends_with("assessment_summary.xml")
    );
    assert!(root.path().join("out/results/assessment_summary.xml").is_file());
    assert!(root.path().join("out/results.tar.gz").is_file());
}

#[test]
fn text_format() {
    let root = workspace();
    let mut cmd = ruby_assess_cmd();
    run_args(&mut cmd, root.path());

    cmd.args(["--format", "text"])
        .assert()
        .code(0)
        .stdout(predicate::str::contains("Assessments: 1 passed, 0 failed"))
        .stdout(predicate::str::contains("Exit code: 0"));
}

#[test]
fn missing_tool_conf_exits_1() {
    let root = workspace();
    fs::remove_file(root.path().join("in/tool.conf")).unwrap();
    let mut cmd = ruby_assess_cmd();
    run_args(&mut cmd, root.path());

    cmd.assert()
        .code(1)
        .stderr(predicate::str::contains("error:"));
    assert_eq!(
        fs::read_to_string(root.path().join("out/results.conf")).unwrap(),
        "exit-code=1\n"
    );
}

#[test]
fn missing_tool_archive_exits_5() {
    let root = workspace();
    fs::remove_file(root.path().join("in/tool.tar")).unwrap();
    let mut cmd = ruby_assess_cmd();
    run_args(&mut cmd, root.path());

    cmd.assert().code(5);
}

#[test]
fn failed_build_exits_1_without_summary() {
    let root = workspace();
    let manifest = root.path().join("in/build_summary.xml");
    let text = fs::read_to_string(&manifest)
        .unwrap()
        .replace("<exit-code>0</exit-code>", "<exit-code>1</exit-code>");
    fs::write(&manifest, text).unwrap();
    let mut cmd = ruby_assess_cmd();
    run_args(&mut cmd, root.path());

    let output = cmd.assert().code(1).get_output().stdout.clone();
    let outcome: serde_json::Value = serde_json::from_slice(&output).unwrap();
    assert!(outcome["assessment_summary_file"].is_null());
    assert!(outcome["manifest_error"].is_string());
}
