//! End-to-end checks: compile, assemble and link with the system `cc`, run the
//! program and look at its exit status. Skipped when no suitable toolchain is
//! available.
#![cfg(all(target_arch = "x86_64", target_os = "linux"))]

use std::fs;
use std::path::Path;
use std::process::Command;

use minicc::{CompileOptions, compile};

const HELPERS: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/tests/support/helpers.c");

fn have_cc() -> bool {
  Command::new("cc")
    .arg("--version")
    .output()
    .is_ok_and(|out| out.status.success())
}

/// Exit status of the compiled program, or `None` when there is no `cc`.
fn run_with(src: &str, options: &CompileOptions) -> Option<i32> {
  if !have_cc() {
    eprintln!("skipping: no `cc` on PATH");
    return None;
  }
  let asm = compile(src, options).unwrap_or_else(|err| panic!("compile failed:\n{err}\n--- source\n{src}"));

  let dir = tempfile::tempdir().unwrap();
  let asm_path = dir.path().join("prog.s");
  let exe_path = dir.path().join("prog");
  fs::write(&asm_path, &asm).unwrap();

  let status = Command::new("cc")
    .arg("-o")
    .arg(&exe_path)
    .arg(&asm_path)
    .arg(Path::new(HELPERS))
    .status()
    .unwrap();
  assert!(status.success(), "cc rejected the assembly:\n{asm}");

  let out = Command::new(&exe_path).output().unwrap();
  Some(out.status.code().expect("program killed by a signal"))
}

fn assert_exit(src: &str, expected: i32) {
  if let Some(code) = run_with(src, &CompileOptions::default()) {
    assert_eq!(code, expected, "{src}");
  }
}

fn assert_main(body: &str, expected: i32) {
  assert_exit(&format!("int main() {{ {body} }}"), expected);
}

#[test]
fn arithmetic() {
  assert_main("return 0;", 0);
  assert_main("return 42;", 42);
  assert_main("return 5+20-4;", 21);
  assert_main("return 5 + 6 * 7;", 47);
  assert_main("return 5 * (9 - 6);", 15);
  assert_main("return (3 + 5) / 2;", 4);
  assert_main("return -10 + 20;", 10);
  assert_main("return +3;", 3);
  assert_main("return 300;", 44);
}

#[test]
fn comparisons() {
  for (expr, expected) in [
    ("0 == 1", 0),
    ("42 == 42", 1),
    ("0 != 1", 1),
    ("42 != 42", 0),
    ("0 < 1", 1),
    ("1 < 1", 0),
    ("2 < 1", 0),
    ("0 <= 1", 1),
    ("1 <= 1", 1),
    ("2 <= 1", 0),
    ("1 > 0", 1),
    ("1 > 1", 0),
    ("1 > 2", 0),
    ("1 >= 0", 1),
    ("1 >= 1", 1),
    ("1 >= 2", 0),
  ] {
    assert_main(&format!("return {expr};"), expected);
  }
}

#[test]
fn variables() {
  assert_main("int a; a = 3; return a;", 3);
  assert_main("int a; a = 3; a = 5; return a;", 5);
  assert_main("int a; int b; a = b = 7; return a + b;", 14);
  assert_main("int foo; int bar; foo = 1; bar = 2 + 3; return foo + bar;", 6);
  assert_main("int rdi; int rax; rdi = 3; rax = 4; return rdi + rax;", 7);
}

#[test]
fn control_flow() {
  assert_main("if (0) return 1; return 2;", 2);
  assert_main("if (1) return 1; return 2;", 1);
  assert_main("if (0) return 1; else return 3; return 2;", 3);
  assert_main("int i; i = 5; while (i > 0) i = i - 1; return i;", 0);
  assert_main("int i; int s; s = 0; for (i = 0; i < 4; i = i + 1) s = s + i; return s;", 6);
  assert_main("int i; i = 0; for (;;) { i = i + 1; if (i == 9) return i; } return 0;", 9);
  assert_main("{ 1; { 2; } } return 3;", 3);
}

#[test]
fn pointers_and_arrays() {
  assert_main("int a[3]; a[0] = 1; a[1] = 2; return a[0] + a[1];", 3);
  assert_main("int x; int *p; p = &x; *p = 42; return x;", 42);
  assert_main("int x; int *p; int **pp; p = &x; pp = &p; **pp = 9; return x;", 9);
  assert_main("int a[4]; int i; for (i = 0; i < 4; i = i + 1) a[i] = i * i; return a[3] + a[2];", 13);
  assert_main("int a[2]; *a = 6; *(a + 1) = 7; return a[0] * a[1];", 42);
  assert_main("int *p; alloc4(&p, 1, 2, 4, 8); int *q; q = p + 2; return *q;", 4);
  assert_main("int *p; alloc4(&p, 1, 2, 4, 8); return *(p + 3);", 8);
  assert_main("int x; return sizeof(x);", 4);
  assert_main("int *p; return sizeof(p);", 8);
}

#[test]
fn legacy_stride_reads_four_byte_elements() {
  let src = "int main() { int *p; alloc4_int(&p, 1, 2, 4, 8); int *q; q = p + 2; return *q; }";
  if let Some(code) = run_with(src, &CompileOptions::legacy()) {
    assert_eq!(code, 4);
  }
}

#[test]
fn globals() {
  assert_exit("int g; int main() { g = 7; return g; }", 7);
  assert_exit(
    "int arr[3]; int set(int i, int v) { arr[i] = v; return v; } int main() { set(0, 2); set(2, 5); return arr[0] + arr[1] + arr[2]; }",
    7,
  );
  assert_exit("int x; int main() { int x; x = 3; return x; }", 3);
}

#[test]
fn strings_and_chars() {
  assert_main("return strlen(\"hello\");", 5);
  assert_main("return strlen(\"a\\n\");", 3);
  assert_main("char *s; s = \"abc\"; return s[1];", 98);
  assert_main("char c[3]; c[0] = 1; c[1] = 2; c[2] = 3; return c[0] + c[2];", 4);
}

#[test]
fn function_calls() {
  assert_exit("int add(int a, int b) { return a + b; } int main() { return add(3, 4); }", 7);
  assert_exit(
    "int sub6(int a, int b, int c, int d, int e, int f) { return a - b - c - d - e - f; } int main() { return sub6(100, 1, 2, 3, 4, 5); }",
    85,
  );
  assert_exit("int main() { return add6(1, 2, 3, 4, 5, 6); }", 21);
  assert_exit(
    "int fact(int n) { if (n <= 1) return 1; return n * fact(n - 1); } int main() { return fact(5); }",
    120,
  );
  assert_exit(
    "int fib(int n) { if (n < 2) return n; return fib(n - 1) + fib(n - 2); } int main() { return fib(10); }",
    55,
  );
}

#[test]
fn calls_with_pending_operands_keep_alignment() {
  assert_main("return 1 + printf(\"ok\");", 3);
  assert_main("return 1 + (2 + add6(1, 1, 1, 1, 1, 1));", 9);
}
