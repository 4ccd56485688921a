//! Developer-facing listings of the token stream and the syntax tree.

use crate::ast::{BinaryOp, Decl, Expr, ExprKind, Place, Program, Stmt};
use crate::tokenizer::{Token, TokenKind, describe_token};

/// One line per token: its kind, byte offset and text.
pub fn dump_tokens(tokens: &[Token], source: &str) -> String {
  let mut out = String::new();
  for token in tokens {
    out.push_str(&format!(
      "{:<10} @{:<4} {}",
      format!("{:?}", token.kind),
      token.loc,
      describe_token(Some(token), source)
    ));
    if token.kind == TokenKind::Num
      && let Some(value) = token.value
    {
      out.push_str(&format!(" = {value}"));
    }
    out.push('\n');
  }
  out
}

/// Indented tree, two spaces per level, with each expression's type.
pub fn dump_ast(program: &Program) -> String {
  let mut dumper = Dumper::default();
  for literal in &program.strings {
    dumper.line(0, format!("String {} {:?}", literal.label, literal.contents));
  }
  for decl in &program.decls {
    match decl {
      Decl::Global(var) => dumper.line(0, format!("Global {}: {}", var.name, var.ty)),
      Decl::Function(func) => {
        dumper.line(
          0,
          format!("Function {} -> {} (frame {})", func.name, func.return_ty, func.stack_size),
        );
        for param in &func.params {
          dumper.line(1, format!("Param {}: {} @{}", param.name, param.ty, param.offset));
        }
        for stmt in &func.body {
          dumper.stmt(1, stmt);
        }
      }
    }
  }
  dumper.out
}

fn op_name(op: BinaryOp) -> &'static str {
  match op {
    BinaryOp::Add => "Add",
    BinaryOp::Sub => "Sub",
    BinaryOp::Mul => "Mul",
    BinaryOp::Div => "Div",
    BinaryOp::Eq => "Equal",
    BinaryOp::Ne => "NotEqual",
    BinaryOp::Lt => "LessThan",
    BinaryOp::Le => "LessOrEqual",
  }
}

#[derive(Default)]
struct Dumper {
  out: String,
}

impl Dumper {
  fn line(&mut self, depth: usize, text: String) {
    self.out.push_str(&"  ".repeat(depth));
    self.out.push_str(&text);
    self.out.push('\n');
  }

  fn stmt(&mut self, depth: usize, stmt: &Stmt) {
    match stmt {
      Stmt::Expr(expr) => {
        self.line(depth, "ExprStmt".into());
        self.expr(depth + 1, expr);
      }
      Stmt::LocalDecl(var) => {
        self.line(depth, format!("Local {}: {} @{}", var.name, var.ty, var.offset));
      }
      Stmt::Return(expr) => {
        self.line(depth, "Return".into());
        self.expr(depth + 1, expr);
      }
      Stmt::If { cond, then, els } => {
        self.line(depth, "If".into());
        self.expr(depth + 1, cond);
        self.stmt(depth + 1, then);
        if let Some(els) = els {
          self.line(depth, "Else".into());
          self.stmt(depth + 1, els);
        }
      }
      Stmt::While { cond, body } => {
        self.line(depth, "While".into());
        self.expr(depth + 1, cond);
        self.stmt(depth + 1, body);
      }
      Stmt::For {
        init,
        cond,
        inc,
        body,
      } => {
        self.line(depth, "For".into());
        for (label, clause) in [("init", init), ("cond", cond), ("inc", inc)] {
          match clause {
            Some(expr) => {
              self.line(depth + 1, label.into());
              self.expr(depth + 2, expr);
            }
            None => self.line(depth + 1, format!("{label} (none)")),
          }
        }
        self.stmt(depth + 1, body);
      }
      Stmt::Block(stmts) => {
        self.line(depth, "Block".into());
        for stmt in stmts {
          self.stmt(depth + 1, stmt);
        }
      }
    }
  }

  fn place(&mut self, depth: usize, place: &Place) {
    match place {
      Place::Local { name, offset } => self.line(depth, format!("Local {name} @{offset}")),
      Place::Global { name } => self.line(depth, format!("Global {name}")),
      Place::Deref(pointer) => {
        self.line(depth, "Deref".into());
        self.expr(depth + 1, pointer);
      }
    }
  }

  fn expr(&mut self, depth: usize, expr: &Expr) {
    let ty = expr
      .ty
      .as_ref()
      .map_or_else(|| "?".to_string(), ToString::to_string);
    match &expr.kind {
      ExprKind::Num(value) => self.line(depth, format!("Number ({value}) : {ty}")),
      ExprKind::Str { label } => self.line(depth, format!("String {label} : {ty}")),
      ExprKind::Load(place) => {
        self.line(depth, format!("Load : {ty}"));
        self.place(depth + 1, place);
      }
      ExprKind::Addr(place) => {
        self.line(depth, format!("Addr : {ty}"));
        self.place(depth + 1, place);
      }
      ExprKind::Assign { place, value } => {
        self.line(depth, format!("Assign : {ty}"));
        self.place(depth + 1, place);
        self.expr(depth + 1, value);
      }
      ExprKind::Binary { op, lhs, rhs } => {
        self.line(depth, format!("{} : {ty}", op_name(*op)));
        self.expr(depth + 1, lhs);
        self.expr(depth + 1, rhs);
      }
      ExprKind::Call { name, args } => {
        self.line(depth, format!("Call {name} : {ty}"));
        for arg in args {
          self.expr(depth + 1, arg);
        }
      }
    }
  }
}
