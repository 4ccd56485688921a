use minicc::{CompileError, CompileOptions, ErrorKind, compile, generate_assembly};

const FIB: &str = r#"
int fib(int n) {
  if (n < 2)
    return n;
  return fib(n - 1) + fib(n - 2);
}

int main() {
  int i;
  int total;
  total = 0;
  for (i = 0; i < 10; i = i + 1) {
    total = total + fib(i);
  }
  while (total > 100) total = total - 100;
  return total;
}
"#;

fn error_kind(src: &str) -> ErrorKind {
  match generate_assembly(src) {
    Ok(asm) => panic!("expected an error, got assembly:\n{asm}"),
    Err(err) => err.kind().unwrap_or_else(|| panic!("error without a location: {err}")),
  }
}

#[test]
fn compiling_twice_is_byte_identical() {
  let first = generate_assembly(FIB).unwrap();
  let second = generate_assembly(FIB).unwrap();
  assert_eq!(first, second);
}

#[test]
fn independent_compilations_do_not_share_label_numbers() {
  let src = "int main() { if (1) return 1; return 0; }";
  let a = generate_assembly(src).unwrap();
  generate_assembly(FIB).unwrap();
  let b = generate_assembly(src).unwrap();
  assert_eq!(a, b);
  assert!(a.contains(".Lelse1:"));
}

#[test]
fn entry_point_is_exported() {
  let asm = generate_assembly(FIB).unwrap();
  assert!(asm.starts_with(".intel_syntax noprefix\n.data\n.text\n"));
  assert!(asm.contains(".globl main\nmain:\n"));
  assert!(asm.contains("\nfib:\n"));
  assert!(asm.contains("call fib\n"));
}

#[test]
fn legacy_options_change_stride_and_frame() {
  let src = "int main() { int *p; int x; p = &x; return *(p + 1); }";
  let asm = compile(src, &CompileOptions::legacy()).unwrap();
  assert!(asm.contains("sub rsp, 208\n"));
  assert!(asm.contains("mov rax, 4\n"));

  let asm = generate_assembly(src).unwrap();
  assert!(asm.contains("sub rsp, 16\n"));
  assert!(asm.contains("mov rax, 8\n"));
}

#[test]
fn comments_and_whitespace_do_not_matter() {
  let plain = generate_assembly("int main() { return 1+2; }").unwrap();
  let noisy = generate_assembly("// entry\nint main ( ) {\n  /* sum */ return 1 + 2 ; // done\n}\n").unwrap();
  assert_eq!(plain, noisy);
}

#[test]
fn errors_are_classified() {
  assert_eq!(error_kind("int main() { return 1 @ 2; }"), ErrorKind::Lexical);
  assert_eq!(error_kind("int main() { return 0; } /* open"), ErrorKind::Lexical);
  assert_eq!(error_kind("int main() { return (1; }"), ErrorKind::Syntax);
  assert_eq!(error_kind("int main() { return; }"), ErrorKind::Syntax);
  assert_eq!(error_kind("main() { return 0; }"), ErrorKind::Syntax);
  assert_eq!(error_kind("int main() { return nope; }"), ErrorKind::Semantic);
  assert_eq!(error_kind("int main() { int a; int a; return 0; }"), ErrorKind::Semantic);
}

#[test]
fn undefined_variable_points_at_the_name() {
  let err = generate_assembly("int main() {\n  return missing + 1;\n}").unwrap_err();
  let message = err.to_string();
  assert!(message.starts_with("2:10: semantic error: undefined variable `missing`"), "{message}");
  assert!(message.ends_with("  return missing + 1;\n         ^"), "{message}");
}

#[test]
fn frame_overflow_is_reported_without_a_location() {
  let options = CompileOptions {
    frame: minicc::FrameSize::Fixed(8),
    ..CompileOptions::default()
  };
  let err = compile("int main() { int a; int b; int c; return 0; }", &options).unwrap_err();
  assert!(matches!(err, CompileError::FrameOverflow { ref function, .. } if function == "main"));
  assert_eq!(err.kind(), None);
}

#[test]
fn register_named_symbols_are_rejected_before_assembly() {
  for src in [
    "int rdi; int main() { rdi = 3; return rdi; }",
    "int rax() { return 4; } int main() { return rax(); }",
  ] {
    assert_eq!(error_kind(src), ErrorKind::Semantic, "{src}");
  }
  let asm = generate_assembly("int main() { int rdi; rdi = 3; return rdi; }").unwrap();
  assert!(!asm.contains("[rip + rdi]"));
}

#[test]
fn oversized_arrays_are_errors_not_panics() {
  let err = generate_assembly("int main() { int a[2305843009213693952]; return 0; }").unwrap_err();
  assert_eq!(err.kind(), Some(ErrorKind::Semantic));
  assert!(err.to_string().contains("array too large"), "{err}");
}
