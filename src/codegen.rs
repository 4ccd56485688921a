//! Code generation: lower the parsed program into Intel-syntax x86-64 assembly.
//!
//! The emitter uses a simple stack machine: every expression leaves a single
//! 8-byte value on the stack and every statement leaves the stack as it found
//! it. Locals live in the frame and are addressed relative to `rbp`; globals
//! and string literals are addressed relative to `rip`.

use log::{debug, trace};

use crate::ast::{BinaryOp, Expr, ExprKind, Function, GlobalVar, Place, Program, Stmt, StringLiteral};
use crate::error::{CompileError, CompileResult};
use crate::options::{CompileOptions, FrameSize};
use crate::ty::Type;

/// Integer argument registers in System V order.
const ARG_REGS: [&str; 6] = ["rdi", "rsi", "rdx", "rcx", "r8", "r9"];

/// Names GAS reads as registers, size keywords or operators in an Intel-syntax
/// operand. Compared case-insensitively.
const RESERVED_SYMBOLS: &[&str] = &[
  "rax", "rbx", "rcx", "rdx", "rsi", "rdi", "rbp", "rsp", "rip", "eax", "ebx", "ecx", "edx", "esi",
  "edi", "ebp", "esp", "eip", "ax", "bx", "cx", "dx", "si", "di", "bp", "sp", "ip", "al", "bl", "cl",
  "dl", "ah", "bh", "ch", "dh", "sil", "dil", "bpl", "spl", "cs", "ds", "es", "fs", "gs", "ss", "st",
  "byte", "word", "dword", "fword", "qword", "tbyte", "oword", "xmmword", "ymmword", "zmmword", "ptr",
  "offset", "flat", "short", "near", "far", "and", "or", "xor", "not", "shl", "shr", "mod", "eq",
  "ne", "lt", "le", "gt", "ge",
];

/// Register families followed by a number, e.g. `r8d`, `xmm0`, `cr3`.
const NUMBERED_REGISTERS: &[&str] = &["r", "xmm", "ymm", "zmm", "mm", "st", "cr", "dr", "k"];

/// Whether `name` cannot be used as a bare symbol in an Intel-syntax operand.
pub fn is_reserved_symbol(name: &str) -> bool {
  let name = name.to_ascii_lowercase();
  if RESERVED_SYMBOLS.contains(&name.as_str()) {
    return true;
  }
  NUMBERED_REGISTERS.iter().any(|family| {
    name.strip_prefix(family).is_some_and(|rest| {
      let digits = rest.strip_suffix(['b', 'w', 'd', 'l']).unwrap_or(rest);
      !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit())
    })
  })
}

/// Emit the assembly for a whole program.
pub fn generate(program: &Program, options: &CompileOptions) -> CompileResult<String> {
  let mut codegen = Codegen::new(*options);
  codegen.emit_program(program)?;
  debug!(
    "generated {} bytes of assembly, {} labels",
    codegen.asm.len(),
    codegen.label_seq - 1
  );
  Ok(codegen.asm)
}

fn align_to(n: usize, align: usize) -> usize {
  n.div_ceil(align) * align
}

struct Codegen {
  asm: String,
  options: CompileOptions,
  /// Next numeric suffix for control-flow labels.
  label_seq: usize,
  /// Values currently pushed on the operand stack, used to keep `rsp`
  /// 16-byte aligned at call sites.
  depth: usize,
  /// Name of the function being emitted, for the shared return label.
  current_fn: String,
}

impl Codegen {
  fn new(options: CompileOptions) -> Self {
    Self {
      asm: String::new(),
      options,
      label_seq: 1,
      depth: 0,
      current_fn: String::new(),
    }
  }

  fn emit(&mut self, line: &str) {
    self.asm.push_str("    ");
    self.asm.push_str(line);
    self.asm.push('\n');
  }

  fn label(&mut self, name: &str) {
    self.asm.push_str(name);
    self.asm.push_str(":\n");
  }

  fn push(&mut self, reg: &str) {
    self.emit(&format!("push {reg}"));
    self.depth += 1;
  }

  fn pop(&mut self, reg: &str) {
    self.emit(&format!("pop {reg}"));
    self.depth -= 1;
  }

  fn next_label(&mut self) -> usize {
    let id = self.label_seq;
    self.label_seq += 1;
    id
  }

  fn emit_program(&mut self, program: &Program) -> CompileResult<()> {
    self.asm.push_str(".intel_syntax noprefix\n");

    self.asm.push_str(".data\n");
    for var in program.globals() {
      self.emit_global(var);
    }
    for literal in &program.strings {
      self.emit_string(literal);
    }

    self.asm.push_str(".text\n");
    for func in program.functions() {
      self.emit_function(func)?;
    }
    Ok(())
  }

  fn emit_global(&mut self, var: &GlobalVar) {
    self.label(&var.name);
    self.emit(&format!(".zero {}", var.ty.storage_size()));
  }

  /// String bytes are written out one by one, exactly as they appeared
  /// between the quotes, followed by a terminating NUL.
  fn emit_string(&mut self, literal: &StringLiteral) {
    trace!("string literal {} ({} bytes)", literal.label, literal.contents.len());
    let bytes = literal
      .contents
      .bytes()
      .chain(std::iter::once(0))
      .map(|b| b.to_string())
      .collect::<Vec<_>>()
      .join(",");
    self.label(&literal.label);
    self.emit(&format!(".byte {bytes}"));
  }

  fn frame_size(&self, func: &Function) -> CompileResult<usize> {
    match self.options.frame {
      FrameSize::Exact => Ok(align_to(func.stack_size, 16)),
      FrameSize::Fixed(limit) => {
        let limit = align_to(limit, 16);
        if func.stack_size > limit {
          return Err(CompileError::FrameOverflow {
            function: func.name.clone(),
            needed: func.stack_size,
            limit,
          });
        }
        Ok(limit)
      }
    }
  }

  fn emit_function(&mut self, func: &Function) -> CompileResult<()> {
    let frame = self.frame_size(func)?;
    trace!("function `{}`: frame of {frame} bytes", func.name);
    self.current_fn.clone_from(&func.name);
    self.depth = 0;

    if func.name == "main" {
      self.emit(".globl main");
    }
    self.label(&func.name);
    self.emit("push rbp");
    self.emit("mov rbp, rsp");
    if frame > 0 {
      self.emit(&format!("sub rsp, {frame}"));
    }

    for (param, reg) in func.params.iter().zip(ARG_REGS) {
      self.emit(&format!("mov [rbp - {}], {reg}", param.offset));
    }

    for stmt in &func.body {
      self.emit_stmt(stmt);
    }

    self.label(&format!(".L.return.{}", func.name));
    self.emit("mov rsp, rbp");
    self.emit("pop rbp");
    self.emit("ret");
    Ok(())
  }

  /// Emit code that leaves the operand stack balanced.
  fn emit_stmt(&mut self, stmt: &Stmt) {
    match stmt {
      Stmt::Expr(expr) => {
        self.emit_value(expr);
        self.pop("rax");
      }
      Stmt::LocalDecl(_) => {}
      Stmt::Return(expr) => {
        self.emit_value(expr);
        self.pop("rax");
        self.emit(&format!("jmp .L.return.{}", self.current_fn));
      }
      Stmt::If { cond, then, els } => {
        let c = self.next_label();
        self.emit_cond(cond, &format!(".Lelse{c}"));
        self.emit_stmt(then);
        self.emit(&format!("jmp .Lend{c}"));
        self.label(&format!(".Lelse{c}"));
        if let Some(els) = els {
          self.emit_stmt(els);
        }
        self.label(&format!(".Lend{c}"));
      }
      Stmt::While { cond, body } => {
        let c = self.next_label();
        self.label(&format!(".Lbegin{c}"));
        self.emit_cond(cond, &format!(".Lend{c}"));
        self.emit_stmt(body);
        self.emit(&format!("jmp .Lbegin{c}"));
        self.label(&format!(".Lend{c}"));
      }
      Stmt::For {
        init,
        cond,
        inc,
        body,
      } => {
        let c = self.next_label();
        if let Some(init) = init {
          self.emit_value(init);
          self.pop("rax");
        }
        self.label(&format!(".Lbegin{c}"));
        match cond {
          Some(cond) => self.emit_cond(cond, &format!(".Lend{c}")),
          None => {
            self.emit("mov rax, 1");
            self.push("rax");
            self.branch_if_zero(&format!(".Lend{c}"));
          }
        }
        self.emit_stmt(body);
        if let Some(inc) = inc {
          self.emit_value(inc);
          self.pop("rax");
        }
        self.emit(&format!("jmp .Lbegin{c}"));
        self.label(&format!(".Lend{c}"));
      }
      Stmt::Block(stmts) => {
        for stmt in stmts {
          self.emit_stmt(stmt);
        }
      }
    }
  }

  fn emit_cond(&mut self, cond: &Expr, target: &str) {
    self.emit_value(cond);
    self.branch_if_zero(target);
  }

  fn branch_if_zero(&mut self, target: &str) {
    self.pop("rax");
    self.emit("cmp rax, 0");
    self.emit(&format!("je {target}"));
  }

  /// Push the value of an expression.
  fn emit_value(&mut self, expr: &Expr) {
    match &expr.kind {
      ExprKind::Num(value) => {
        self.emit(&format!("mov rax, {value}"));
        self.push("rax");
      }
      ExprKind::Str { label } => {
        self.emit(&format!("lea rax, [rip + {label}]"));
        self.push("rax");
      }
      ExprKind::Load(place) => {
        self.emit_address(place);
        // Arrays decay to the address of their first element.
        if let Some(ty) = &expr.ty
          && ty.is_array()
        {
          return;
        }
        self.load(expr.ty.as_ref());
      }
      ExprKind::Addr(place) => self.emit_address(place),
      ExprKind::Assign { place, value } => {
        self.emit_address(place);
        self.emit_value(value);
        self.store(expr.ty.as_ref());
      }
      ExprKind::Binary { op, lhs, rhs } => self.emit_binary(*op, lhs, rhs),
      ExprKind::Call { name, args } => self.emit_call(name, args),
    }
  }

  /// Push the address of a place.
  fn emit_address(&mut self, place: &Place) {
    match place {
      Place::Local { offset, .. } => {
        self.emit(&format!("lea rax, [rbp - {offset}]"));
        self.push("rax");
      }
      Place::Global { name } => {
        self.emit(&format!("lea rax, [rip + {name}]"));
        self.push("rax");
      }
      Place::Deref(pointer) => self.emit_value(pointer),
    }
  }

  /// Replace the address on top of the stack with the value it points at.
  fn load(&mut self, ty: Option<&Type>) {
    self.pop("rax");
    if ty == Some(&Type::Char) {
      self.emit("movsx rax, byte ptr [rax]");
    } else {
      self.emit("mov rax, [rax]");
    }
    self.push("rax");
  }

  /// Pop a value and an address, store the value, and push it back.
  fn store(&mut self, ty: Option<&Type>) {
    self.pop("rdi");
    self.pop("rax");
    if ty == Some(&Type::Char) {
      self.emit("mov [rax], dil");
    } else {
      self.emit("mov [rax], rdi");
    }
    self.push("rdi");
  }

  fn emit_binary(&mut self, op: BinaryOp, lhs: &Expr, rhs: &Expr) {
    self.emit_value(lhs);
    self.emit_value(rhs);
    self.pop("rdi");
    self.pop("rax");

    match op {
      BinaryOp::Add => self.emit("add rax, rdi"),
      BinaryOp::Sub => self.emit("sub rax, rdi"),
      BinaryOp::Mul => self.emit("imul rax, rdi"),
      BinaryOp::Div => {
        self.emit("cqo");
        self.emit("idiv rdi");
      }
      BinaryOp::Eq | BinaryOp::Ne | BinaryOp::Lt | BinaryOp::Le => {
        let set = match op {
          BinaryOp::Eq => "sete",
          BinaryOp::Ne => "setne",
          BinaryOp::Lt => "setl",
          _ => "setle",
        };
        self.emit("cmp rax, rdi");
        self.emit(&format!("{set} al"));
        self.emit("movzx rax, al");
      }
    }

    self.push("rax");
  }

  fn emit_call(&mut self, name: &str, args: &[Expr]) {
    for arg in args.iter().take(ARG_REGS.len()) {
      self.emit_value(arg);
    }
    let count = args.len().min(ARG_REGS.len());
    for reg in ARG_REGS[..count].iter().rev() {
      self.pop(reg);
    }

    // The frame is 16-byte aligned; each pending operand shifts it by 8.
    let misaligned = self.depth % 2 == 1;
    if misaligned {
      self.emit("sub rsp, 8");
    }
    self.emit("mov rax, 0");
    self.emit(&format!("call {name}"));
    if misaligned {
      self.emit("add rsp, 8");
    }
    self.push("rax");
  }
}
