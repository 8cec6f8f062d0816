use assert_cmd::Command;
use predicates::prelude::*;
use std::path::Path;
use tempfile::TempDir;

const ARITH: &str = r#"{
    "name": "arith",
    "instructions": [
        { "op": "ldc_i4", "value": 1 },
        { "op": "ldc_i4", "value": 2 },
        { "op": "binary", "operator": "add" },
        { "op": "ldc_i4", "value": 3 },
        { "op": "binary", "operator": "mul" },
        { "op": "ret", "value": true }
    ]
}"#;

const CALLS: &str = r#"{
    "name": "calls",
    "instructions": [
        { "op": "call", "method": "f", "returns_value": true },
        { "op": "ldc_i4", "value": 5 },
        { "op": "binary", "operator": "add" },
        { "op": "st_loc", "local": 0 },
        { "op": "ret" }
    ]
}"#;

fn write_listing(dir: &TempDir, name: &str, text: &str) -> std::path::PathBuf {
    let path = dir.path().join(name);
    std::fs::write(&path, text).unwrap();
    path
}

fn stackir() -> Command {
    Command::cargo_bin("stackir").unwrap()
}

#[test]
fn test_inline_prints_nested_tree() {
    let dir = TempDir::new().unwrap();
    let input = write_listing(&dir, "arith.json", ARITH);

    stackir()
        .arg("inline")
        .arg(&input)
        .assert()
        .success()
        .stdout(predicate::str::contains("function arith {"))
        .stdout(predicate::str::contains(
            "    ret(mul(add(ldc.i4 1, ldc.i4 2), ldc.i4 3))",
        ));
}

#[test]
fn test_inline_with_folding_and_stats() {
    let dir = TempDir::new().unwrap();
    let arith = write_listing(&dir, "arith.json", ARITH);
    let calls = write_listing(&dir, "calls.json", CALLS);

    stackir()
        .args(["inline", "--fold", "--stats"])
        .arg(&arith)
        .arg(&calls)
        .assert()
        .success()
        .stdout(predicate::str::contains("ret(ldc.i4 9)"))
        .stdout(predicate::str::contains("stloc V_0(add(call f(), ldc.i4 5))"))
        .stdout(predicate::str::contains("\"entries_before\": 5"));
}

#[test]
fn test_inline_writes_output_file() {
    let dir = TempDir::new().unwrap();
    let input = write_listing(&dir, "arith.json", ARITH);
    let output = dir.path().join("out.txt");

    stackir()
        .arg("inline")
        .arg(&input)
        .arg("-o")
        .arg(&output)
        .assert()
        .success()
        .stdout(predicate::str::is_empty());

    let text = std::fs::read_to_string(&output).unwrap();
    assert!(text.starts_with("function arith {"));
}

#[test]
fn test_config_file_disables_inlining() {
    let dir = TempDir::new().unwrap();
    let input = write_listing(&dir, "arith.json", ARITH);
    let config = write_listing(&dir, "config.json", r#"{ "inline": false }"#);

    stackir()
        .arg("inline")
        .arg(&input)
        .arg("--config")
        .arg(&config)
        .assert()
        .success()
        .stdout(predicate::str::contains("    add(pop, pop)"));
}

#[test]
fn test_show_prints_flat_listing() {
    let dir = TempDir::new().unwrap();
    let input = write_listing(&dir, "calls.json", CALLS);

    stackir()
        .arg("show")
        .arg(&input)
        .assert()
        .success()
        .stdout(predicate::str::contains("    call f()\n    ldc.i4 5\n    add(pop, pop)"));
}

#[test]
fn test_underflowing_listing_fails() {
    let dir = TempDir::new().unwrap();
    let input = write_listing(
        &dir,
        "bad.json",
        r#"{ "name": "bad", "instructions": [{ "op": "st_loc", "local": 1 }] }"#,
    );

    stackir()
        .arg("inline")
        .arg(&input)
        .assert()
        .failure()
        .stderr(predicate::str::contains("stack underflow"));
}

#[test]
fn test_missing_input_fails() {
    stackir()
        .args(["inline", "does-not-exist.json"])
        .assert()
        .failure();
}

#[test]
fn test_inline_handler_called_directly() {
    let dir = TempDir::new().unwrap();
    let input = write_listing(&dir, "calls.json", CALLS);
    let output = dir.path().join("calls.txt");

    let args = stackir::cli::inline::InlineArgs {
        inputs: vec![input],
        config_path: None,
        fold: false,
        no_verify: false,
        stats: false,
        output_path: Some(output.clone()),
    };
    stackir::cli::inline::inline(&args).unwrap();

    let text = std::fs::read_to_string(Path::new(&output)).unwrap();
    assert_eq!(
        text,
        "function calls {\n    stloc V_0(add(call f(), ldc.i4 5))\n    ret\n}\n"
    );
}
