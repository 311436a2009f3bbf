use std::{env, path::PathBuf, process::Command};

fn bin_path() -> String {
    env::var("CARGO_BIN_EXE_jiffle").expect("binary path not set by cargo test")
}

fn script(name: &str) -> String {
    let mut path = PathBuf::from(env::var("CARGO_MANIFEST_DIR").expect("manifest dir not set"));
    path.push("tests");
    path.push("scripts");
    path.push(name);
    path.to_string_lossy().into_owned()
}

fn jiffle(args: &[&str]) -> std::process::Output {
    Command::new(bin_path())
        .args(args)
        .env("RUST_LOG", "off")
        .output()
        .expect("failed to run jiffle")
}

#[test]
fn check_accepts_a_valid_script() {
    let path = script("threshold.jfl");
    let output = jiffle(&["check", &path, "--src", "img", "--dest", "out"]);
    assert!(output.status.success(), "{output:?}");
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.trim_end().ends_with(": ok"), "{stdout}");
}

#[test]
fn source_prints_the_indirect_listing_with_docs() {
    let path = script("threshold.jfl");
    let output = jiffle(&[
        "source", &path, "--src", "img", "--dest", "out", "--model", "indirect", "--docs",
    ]);
    assert!(output.status.success(), "{output:?}");
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.starts_with("/**\n * // Flag pixels brighter than the local mean.\n"));
    assert!(stdout.contains("(indirect) {"));
    assert!(stdout.contains("write(out, 0.0, ternary$0);"));
}

#[test]
fn check_reports_every_undefined_function() {
    let path = script("broken.jfl");
    let output = jiffle(&["check", &path, "--src", "img", "--dest", "out"]);
    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("FUNC_UNDEFINED"), "{stderr}");
    assert!(stderr.contains("`foo`") && stderr.contains("`bar`"), "{stderr}");
}

#[test]
fn unknown_option_prints_usage() {
    let path = script("threshold.jfl");
    let output = jiffle(&["check", &path, "--colour", "red"]);
    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("Usage: jiffle"));
}
