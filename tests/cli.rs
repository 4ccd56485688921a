use std::fs;
use std::process::{Command, Output};

fn minicc(args: &[&str]) -> Output {
  Command::new(env!("CARGO_BIN_EXE_minicc"))
    .args(args)
    .output()
    .unwrap()
}

fn stdout(out: &Output) -> String {
  String::from_utf8_lossy(&out.stdout).into_owned()
}

fn stderr(out: &Output) -> String {
  String::from_utf8_lossy(&out.stderr).into_owned()
}

#[test]
fn assembly_goes_to_stdout() {
  let out = minicc(&["int main() { return 0; }"]);
  assert!(out.status.success(), "{}", stderr(&out));
  assert!(stdout(&out).starts_with(".intel_syntax noprefix\n"));
  assert!(stderr(&out).is_empty());
}

#[test]
fn compile_errors_exit_non_zero_without_assembly() {
  for src in ["int main() { return y; }", "int main() { int a; int a; return 0; }"] {
    let out = minicc(&[src]);
    assert_eq!(out.status.code(), Some(1), "{src}");
    assert!(out.stdout.is_empty(), "{src}");
    assert!(stderr(&out).contains("semantic error"), "{}", stderr(&out));
  }
}

#[test]
fn missing_input_is_a_usage_error() {
  let out = minicc(&[]);
  assert!(!out.status.success());
  assert!(out.stdout.is_empty());
  assert!(stderr(&out).to_lowercase().contains("usage"));
}

#[test]
fn reads_and_writes_files() {
  let dir = tempfile::tempdir().unwrap();
  let src = dir.path().join("prog.c");
  let asm = dir.path().join("prog.s");
  fs::write(&src, "int main() {\n  return 3;\n}\n").unwrap();

  let out = minicc(&[
    "--file",
    src.to_str().unwrap(),
    "-o",
    asm.to_str().unwrap(),
  ]);
  assert!(out.status.success(), "{}", stderr(&out));
  assert!(out.stdout.is_empty());
  assert!(fs::read_to_string(&asm).unwrap().contains("main:\n"));
}

#[test]
fn unreadable_file_is_reported() {
  let out = minicc(&["--file", "/definitely/not/here.c"]);
  assert_eq!(out.status.code(), Some(1));
  assert!(stderr(&out).starts_with("cannot read /definitely/not/here.c"));
}

#[test]
fn dumps_go_to_stderr() {
  let out = minicc(&["--dump-tokens", "--dump-ast", "int main() { return 1; }"]);
  assert!(out.status.success());
  let err = stderr(&out);
  assert!(err.contains("Return"));
  assert!(err.contains("Number (1) : int"));
  assert!(err.contains("Ident"));
  assert!(!stdout(&out).contains("Return"));
}

#[test]
fn legacy_flags_are_accepted() {
  let out = minicc(&["--stride", "4", "--frame-size", "208", "int main() { int *p; return *(p + 1); }"]);
  assert!(out.status.success(), "{}", stderr(&out));
  let asm = stdout(&out);
  assert!(asm.contains("sub rsp, 208\n"));
  assert!(asm.contains("mov rax, 4\n"));
}
