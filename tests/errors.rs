mod common;

use std::fs;
use std::process;

use assert_cmd::Command;

fn script(name: &str, source: &str) -> std::path::PathBuf {
    let mut path = std::env::temp_dir();
    path.push(format!("basalt_test_{name}_{}.bas", process::id()));
    fs::write(&path, source).expect("write temp script");
    path
}

#[test]
fn syntax_error_exits_65() {
    let path = script("syntax_error", "let a = ;");
    Command::cargo_bin("basalt").unwrap().arg(&path).assert().code(65);
    let _ = fs::remove_file(&path);
}

#[test]
fn runtime_error_exits_70() {
    let path = script("runtime_error", "echo 1 / 0;");
    Command::cargo_bin("basalt").unwrap().arg(&path).assert().code(70);
    let _ = fs::remove_file(&path);
}

#[test]
fn division_with_zero_dividend_exits_70() {
    let path = script("division_with_zero_dividend", "echo 0 / 5;");
    Command::cargo_bin("basalt").unwrap().arg(&path).assert().code(70);
    let _ = fs::remove_file(&path);
}

#[test]
fn super_outside_subclass_exits_70() {
    let path = script("super_outside_subclass", "super::foo();");
    Command::cargo_bin("basalt").unwrap().arg(&path).assert().code(70);
    let _ = fs::remove_file(&path);
}

#[test]
fn undefined_variable_exits_70() {
    let path = script("undefined_variable", "echo nope;");
    Command::cargo_bin("basalt").unwrap().arg(&path).assert().code(70);
    let _ = fs::remove_file(&path);
}

#[test]
fn valid_script_exits_0() {
    let path = script("valid_script", "echo 1 + 1;");
    Command::cargo_bin("basalt").unwrap().arg(&path).assert().success();
    let _ = fs::remove_file(&path);
}

#[test]
fn too_many_args_exits_64() {
    Command::cargo_bin("basalt").unwrap().arg("one").arg("two").assert().code(64);
}
