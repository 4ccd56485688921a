//! Recursive-descent parser producing declarations, statements and typed
//! expressions.
//!
//! The parser mirrors the classic chibicc structure: one helper per
//! precedence level, with types resolved as each node is built. Symbol
//! resolution happens here too, so the code generator only ever sees frame
//! offsets and global labels. Parsing stops at the first error.

use std::collections::HashMap;

use log::{debug, trace};

use crate::ast::{BinaryOp, Decl, Expr, ExprKind, Function, GlobalVar, LocalVar, Place, Program, Stmt, StringLiteral};
use crate::codegen::is_reserved_symbol;
use crate::error::{CompileError, CompileResult};
use crate::options::CompileOptions;
use crate::scope::{Binding, Scope};
use crate::tokenizer::{Token, TokenKind, describe_token, token_text};
use crate::ty::{MAX_OBJECT_SIZE, SLOT_SIZE, Type};

/// Integer argument registers available for parameters and call arguments.
pub const MAX_REG_ARGS: usize = 6;

/// Punctuators that would continue an expression past a unary operand.
const BINARY_OPERATORS: [&str; 11] = ["+", "-", "*", "/", "==", "!=", "<", "<=", ">", ">=", "="];

/// Parse a whole translation unit from the token stream.
pub fn parse(tokens: Vec<Token>, source: &str, options: &CompileOptions) -> CompileResult<Program> {
  let mut parser = Parser::new(TokenStream::new(tokens, source), *options);
  let program = parser.program()?;
  debug!(
    "parsed {} declarations and {} string literals",
    program.decls.len(),
    program.strings.len()
  );
  Ok(program)
}

struct Parser<'a> {
  stream: TokenStream<'a>,
  options: CompileOptions,
  scope: Scope,
  /// Return types of functions defined so far, keyed by name.
  functions: HashMap<String, Type>,
  strings: Vec<StringLiteral>,
}

impl<'a> Parser<'a> {
  fn new(stream: TokenStream<'a>, options: CompileOptions) -> Self {
    Self {
      stream,
      options,
      scope: Scope::new(),
      functions: HashMap::new(),
      strings: Vec::new(),
    }
  }

  fn source(&self) -> &'a str {
    self.stream.source
  }

  fn semantic(&self, loc: usize, message: impl Into<String>) -> CompileError {
    CompileError::semantic(self.source(), loc, message)
  }

  /// Functions and globals become assembler symbols, so they may not collide
  /// with register names or operand keywords.
  fn check_symbol(&self, name: &str, loc: usize) -> CompileResult<()> {
    if is_reserved_symbol(name) {
      return Err(self.semantic(loc, format!("`{name}` is reserved by the assembler")));
    }
    Ok(())
  }

  fn program(&mut self) -> CompileResult<Program> {
    let mut decls = Vec::new();
    while !self.stream.is_eof() {
      let decl = if self.is_function() {
        Decl::Function(self.function()?)
      } else {
        Decl::Global(self.global_var()?)
      };
      decls.push(decl);
    }

    Ok(Program {
      decls,
      strings: std::mem::take(&mut self.strings),
    })
  }

  /// Look ahead for `type_spec ident '('` without consuming anything.
  fn is_function(&mut self) -> bool {
    let start = self.stream.pos;
    let matched = self.stream.consume(TokenKind::Type).is_some() && {
      while self.stream.equal("*") {}
      self.stream.consume(TokenKind::Ident).is_some() && self.stream.equal("(")
    };
    self.stream.pos = start;
    matched
  }

  /// type_spec := ('int' | 'char') '*'*
  fn type_spec(&mut self) -> CompileResult<Type> {
    let token = self.stream.expect_kind(TokenKind::Type, "a type")?;
    let mut ty = match token_text(&token, self.source()) {
      "char" => Type::Char,
      _ => Type::Int,
    };
    while self.stream.equal("*") {
      ty = Type::pointer_to(ty);
    }
    Ok(ty)
  }

  /// Optional `'[' integer ']'` after a declared name.
  fn array_suffix(&mut self, ty: Type) -> CompileResult<Type> {
    if !self.stream.equal("[") {
      return Ok(ty);
    }
    let (len, loc) = self.stream.get_number()?;
    if len <= 0 {
      return Err(self.semantic(loc, "array length must be positive"));
    }
    let len = usize::try_from(len)
      .ok()
      .filter(|len| len.checked_mul(SLOT_SIZE).is_some_and(|size| size <= MAX_OBJECT_SIZE))
      .ok_or_else(|| self.semantic(loc, "array too large"))?;
    self.stream.skip("]")?;
    Ok(Type::array_of(ty, len))
  }

  fn function(&mut self) -> CompileResult<Function> {
    let return_ty = self.type_spec()?;
    let (name, name_loc) = self.stream.get_ident()?;
    if self.functions.contains_key(&name) || self.scope.find_global(&name).is_some() {
      return Err(self.semantic(name_loc, format!("redefinition of `{name}`")));
    }
    self.check_symbol(&name, name_loc)?;
    self.stream.skip("(")?;

    self.scope.enter_function();
    let mut params = Vec::new();
    if !self.stream.equal(")") {
      loop {
        let ty = self.type_spec()?;
        let (param, loc) = self.stream.get_ident()?;
        if params.len() == MAX_REG_ARGS {
          return Err(self.semantic(
            loc,
            format!("functions may take at most {MAX_REG_ARGS} parameters"),
          ));
        }
        params.push(self.declare_local(&param, ty, loc)?);
        if self.stream.equal(")") {
          break;
        }
        self.stream.skip(",")?;
      }
    }

    // Registered before the body so recursive calls see the return type.
    self.functions.insert(name.clone(), return_ty.clone());

    self.stream.skip("{")?;
    let body = self.block_body()?;
    let stack_size = self.scope.leave_function();
    trace!("function `{name}`: {} params, {stack_size} bytes of locals", params.len());

    Ok(Function {
      name,
      return_ty,
      params,
      body,
      stack_size,
    })
  }

  fn global_var(&mut self) -> CompileResult<GlobalVar> {
    let ty = self.type_spec()?;
    let (name, loc) = self.stream.get_ident()?;
    let ty = self.array_suffix(ty)?;
    self.stream.skip(";")?;
    if self.scope.find_global(&name).is_some() || self.functions.contains_key(&name) {
      return Err(self.semantic(loc, format!("redefinition of `{name}`")));
    }
    self.check_symbol(&name, loc)?;
    Ok(self.scope.declare_global(&name, ty))
  }

  fn declare_local(&mut self, name: &str, ty: Type, loc: usize) -> CompileResult<LocalVar> {
    if self.scope.find_local(name).is_some() {
      return Err(self.semantic(loc, format!("`{name}` is already declared")));
    }
    let var = self
      .scope
      .declare_local(name, ty)
      .ok_or_else(|| self.semantic(loc, "local declaration outside of a function"))?;
    if var.offset > MAX_OBJECT_SIZE {
      return Err(self.semantic(loc, "local variables do not fit in a stack frame"));
    }
    Ok(var)
  }

  /// Statements up to and including the closing `}`.
  fn block_body(&mut self) -> CompileResult<Vec<Stmt>> {
    let mut stmts = Vec::new();
    while !self.stream.equal("}") {
      if self.stream.is_eof() {
        return Err(self.stream.error_here("expected \"}\""));
      }
      stmts.push(self.stmt()?);
    }
    Ok(stmts)
  }

  fn stmt(&mut self) -> CompileResult<Stmt> {
    if self.stream.consume(TokenKind::If).is_some() {
      self.stream.skip("(")?;
      let cond = self.expr()?;
      self.stream.skip(")")?;
      let then = Box::new(self.stmt()?);
      let els = match self.stream.consume(TokenKind::Else) {
        Some(_) => Some(Box::new(self.stmt()?)),
        None => None,
      };
      return Ok(Stmt::If { cond, then, els });
    }

    if self.stream.consume(TokenKind::While).is_some() {
      self.stream.skip("(")?;
      let cond = self.expr()?;
      self.stream.skip(")")?;
      let body = Box::new(self.stmt()?);
      return Ok(Stmt::While { cond, body });
    }

    if self.stream.consume(TokenKind::For).is_some() {
      self.stream.skip("(")?;
      let init = self.optional_expr(";")?;
      let cond = self.optional_expr(";")?;
      let inc = self.optional_expr(")")?;
      let body = Box::new(self.stmt()?);
      return Ok(Stmt::For {
        init,
        cond,
        inc,
        body,
      });
    }

    if self.stream.consume(TokenKind::Return).is_some() {
      let value = self.expr()?;
      self.stream.skip(";")?;
      return Ok(Stmt::Return(value));
    }

    if self.stream.equal("{") {
      return Ok(Stmt::Block(self.block_body()?));
    }

    if self.stream.peek_kind() == Some(TokenKind::Type) {
      let ty = self.type_spec()?;
      let (name, loc) = self.stream.get_ident()?;
      let ty = self.array_suffix(ty)?;
      self.stream.skip(";")?;
      return Ok(Stmt::LocalDecl(self.declare_local(&name, ty, loc)?));
    }

    let expr = self.expr()?;
    self.stream.skip(";")?;
    Ok(Stmt::Expr(expr))
  }

  /// An expression that may be omitted, followed by `terminator`.
  fn optional_expr(&mut self, terminator: &str) -> CompileResult<Option<Expr>> {
    if self.stream.equal(terminator) {
      return Ok(None);
    }
    let expr = self.expr()?;
    self.stream.skip(terminator)?;
    Ok(Some(expr))
  }

  fn expr(&mut self) -> CompileResult<Expr> {
    self.assign()
  }

  fn assign(&mut self) -> CompileResult<Expr> {
    let node = self.equality()?;

    if self.stream.equal("=") {
      let value = self.assign()?;
      let (ty, loc) = (node.ty.clone(), node.loc);
      let place = node
        .into_place()
        .map_err(|target| self.semantic(target.loc, "left side of assignment is not an lvalue"))?;
      return Ok(Expr {
        kind: ExprKind::Assign {
          place,
          value: Box::new(value),
        },
        ty,
        loc,
      });
    }

    Ok(node)
  }

  fn equality(&mut self) -> CompileResult<Expr> {
    let mut node = self.relational()?;

    loop {
      let op = match self.stream.peek_punct() {
        Some("==") => BinaryOp::Eq,
        Some("!=") => BinaryOp::Ne,
        _ => break,
      };
      self.stream.pos += 1;
      let rhs = self.relational()?;
      node = Expr::binary(op, node, rhs, Type::Int);
    }

    Ok(node)
  }

  /// `a > b` and `a >= b` are built as `b < a` and `b <= a`.
  fn relational(&mut self) -> CompileResult<Expr> {
    let mut node = self.add()?;

    loop {
      let (op, swap) = match self.stream.peek_punct() {
        Some("<") => (BinaryOp::Lt, false),
        Some("<=") => (BinaryOp::Le, false),
        Some(">") => (BinaryOp::Lt, true),
        Some(">=") => (BinaryOp::Le, true),
        _ => break,
      };
      self.stream.pos += 1;
      let rhs = self.add()?;
      node = if swap {
        Expr::binary(op, rhs, node, Type::Int)
      } else {
        Expr::binary(op, node, rhs, Type::Int)
      };
    }

    Ok(node)
  }

  fn add(&mut self) -> CompileResult<Expr> {
    let mut node = self.mul()?;

    loop {
      match self.stream.peek_punct() {
        Some("+") => {
          let loc = self.stream.loc();
          self.stream.pos += 1;
          let rhs = self.mul()?;
          node = self.new_add(node, rhs, loc)?;
        }
        Some("-") => {
          self.stream.pos += 1;
          let rhs = self.mul()?;
          node = new_sub(node, rhs);
        }
        _ => break,
      }
    }

    Ok(node)
  }

  /// `lhs + rhs` with the integer side scaled when the other is a pointer.
  fn new_add(&self, lhs: Expr, rhs: Expr, loc: usize) -> CompileResult<Expr> {
    let ty = Type::arith_result(lhs.ty.as_ref(), rhs.ty.as_ref());
    let stride = |e: &Expr| e.ty.as_ref().and_then(|ty| ty.stride(self.options.pointer_stride));

    match (stride(&lhs), stride(&rhs)) {
      (Some(_), Some(_)) => Err(self.semantic(loc, "invalid operands: pointer + pointer")),
      (Some(n), None) => {
        let rhs = scale(rhs, n);
        Ok(Expr::binary(BinaryOp::Add, lhs, rhs, ty))
      }
      (None, Some(n)) => {
        let lhs = scale(lhs, n);
        Ok(Expr::binary(BinaryOp::Add, lhs, rhs, ty))
      }
      (None, None) => Ok(Expr::binary(BinaryOp::Add, lhs, rhs, ty)),
    }
  }

  fn mul(&mut self) -> CompileResult<Expr> {
    let mut node = self.unary()?;

    loop {
      let op = match self.stream.peek_punct() {
        Some("*") => BinaryOp::Mul,
        Some("/") => BinaryOp::Div,
        _ => break,
      };
      self.stream.pos += 1;
      let rhs = self.unary()?;
      node = Expr::binary(op, node, rhs, Type::Int);
    }

    Ok(node)
  }

  fn unary(&mut self) -> CompileResult<Expr> {
    if self.stream.equal("+") {
      return self.primary();
    }

    if self.stream.peek_punct() == Some("-") {
      let loc = self.stream.loc();
      self.stream.pos += 1;
      let operand = self.primary()?;
      return Ok(new_sub(Expr::number(0, loc), operand));
    }

    if let Some(token) = self.stream.consume(TokenKind::Sizeof) {
      // Only `sizeof(unary)` is accepted; the operand is never evaluated.
      self.stream.skip("(")?;
      let operand = self.unary()?;
      if let Some(op) = self.stream.peek_punct()
        && BINARY_OPERATORS.contains(&op)
      {
        let loc = self.stream.loc();
        return Err(self.semantic(loc, format!("operand of sizeof must be a unary expression, found `{op}`")));
      }
      self.stream.skip(")")?;
      return Ok(Expr::number(Type::sizeof(operand.ty.as_ref()), token.loc));
    }

    self.primary()
  }

  fn primary(&mut self) -> CompileResult<Expr> {
    if self.stream.equal("(") {
      let node = self.expr()?;
      self.stream.skip(")")?;
      return Ok(node);
    }

    if self.stream.peek_punct() == Some("&") {
      let loc = self.stream.loc();
      self.stream.pos += 1;
      let operand = self.unary()?;
      let ty = Type::pointer_to(operand.ty.clone().unwrap_or(Type::Int));
      let place = operand
        .into_place()
        .map_err(|target| self.semantic(target.loc, "cannot take the address of an rvalue"))?;
      return Ok(Expr {
        kind: ExprKind::Addr(place),
        ty: Some(ty),
        loc,
      });
    }

    if self.stream.equal("*") {
      let operand = self.unary()?;
      return Ok(Expr::deref(operand));
    }

    if let Some(token) = self.stream.consume(TokenKind::Ident) {
      let name = token_text(&token, self.source()).to_string();
      if self.stream.equal("(") {
        return self.call(name, token.loc);
      }
      let var = self.variable(&name, token.loc)?;
      if self.stream.equal("[") {
        return self.subscript(var, token.loc);
      }
      return Ok(var);
    }

    if let Some(token) = self.stream.consume(TokenKind::Str) {
      let label = self.intern_string(token.str_contents(self.source()));
      return Ok(Expr {
        kind: ExprKind::Str { label },
        ty: Some(Type::pointer_to(Type::Char)),
        loc: token.loc,
      });
    }

    if self.stream.peek_kind() == Some(TokenKind::Num) {
      let (value, loc) = self.stream.get_number()?;
      return Ok(Expr::number(value, loc));
    }

    Err(self.stream.error_here("expected an expression"))
  }

  fn variable(&self, name: &str, loc: usize) -> CompileResult<Expr> {
    match self.scope.lookup(name) {
      Some(Binding::Local(var)) => {
        let place = Place::Local {
          name: var.name.clone(),
          offset: var.offset,
        };
        Ok(Expr::load(place, Some(var.ty.clone()), loc))
      }
      Some(Binding::Global(var)) => {
        let place = Place::Global {
          name: var.name.clone(),
        };
        Ok(Expr::load(place, Some(var.ty.clone()), loc))
      }
      None => Err(self.semantic(loc, format!("undefined variable `{name}`"))),
    }
  }

  /// `base[index]` is `*(base + index)`; the opening `[` is already consumed.
  fn subscript(&mut self, base: Expr, loc: usize) -> CompileResult<Expr> {
    if !base.ty.as_ref().is_some_and(Type::is_pointer_like) {
      return Err(self.semantic(loc, "subscripted value is not an array or pointer"));
    }
    let index = self.expr()?;
    self.stream.skip("]")?;
    let sum = self.new_add(base, index, loc)?;
    Ok(Expr::deref(sum))
  }

  /// Arguments of a call; the opening `(` is already consumed.
  fn call(&mut self, name: String, loc: usize) -> CompileResult<Expr> {
    self.check_symbol(&name, loc)?;
    let mut args = Vec::new();
    if !self.stream.equal(")") {
      loop {
        args.push(self.assign()?);
        if self.stream.equal(")") {
          break;
        }
        self.stream.skip(",")?;
      }
    }
    if args.len() > MAX_REG_ARGS {
      return Err(self.semantic(
        loc,
        format!("calls may pass at most {MAX_REG_ARGS} arguments, `{name}` got {}", args.len()),
      ));
    }

    // Unknown callees are assumed to be external functions returning int.
    let ty = self.functions.get(&name).cloned().unwrap_or(Type::Int);
    Ok(Expr {
      kind: ExprKind::Call { name, args },
      ty: Some(ty),
      loc,
    })
  }

  fn intern_string(&mut self, contents: &str) -> String {
    if let Some(existing) = self.strings.iter().find(|s| s.contents == contents) {
      return existing.label.clone();
    }
    let label = format!(".L.str.{}", self.strings.len());
    self.strings.push(StringLiteral {
      label: label.clone(),
      contents: contents.to_string(),
    });
    label
  }
}

/// Subtraction is never scaled, even with a pointer operand.
fn new_sub(lhs: Expr, rhs: Expr) -> Expr {
  let ty = Type::arith_result(lhs.ty.as_ref(), rhs.ty.as_ref());
  Expr::binary(BinaryOp::Sub, lhs, rhs, ty)
}

fn scale(expr: Expr, stride: usize) -> Expr {
  let factor = Expr::number(stride as i64, expr.loc);
  Expr::binary(BinaryOp::Mul, expr, factor, Type::Int)
}

/// Lightweight cursor over the token vector.
struct TokenStream<'a> {
  tokens: Vec<Token>,
  source: &'a str,
  pos: usize,
}

impl<'a> TokenStream<'a> {
  /// Take ownership of the token stream; the parser will advance `pos` as it consumes input.
  fn new(tokens: Vec<Token>, source: &'a str) -> Self {
    Self {
      tokens,
      source,
      pos: 0,
    }
  }

  fn peek(&self) -> Option<&Token> {
    self.tokens.get(self.pos)
  }

  fn peek_kind(&self) -> Option<TokenKind> {
    self.peek().map(|token| token.kind)
  }

  /// Text of the current token when it is a punctuator.
  fn peek_punct(&self) -> Option<&'a str> {
    let source = self.source;
    self
      .peek()
      .filter(|token| token.kind == TokenKind::Punctuator)
      .map(|token| token_text(token, source))
  }

  /// Byte offset of the current token.
  fn loc(&self) -> usize {
    self.peek().map_or(self.source.len(), |token| token.loc)
  }

  /// Consume the current token if it matches the provided punctuator.
  fn equal(&mut self, op: &str) -> bool {
    if self.peek_punct() == Some(op) {
      self.pos += 1;
      return true;
    }
    false
  }

  /// Consume the current token if it has the given kind.
  fn consume(&mut self, kind: TokenKind) -> Option<Token> {
    let token = self.peek().filter(|token| token.kind == kind)?.clone();
    self.pos += 1;
    Some(token)
  }

  fn error_here(&self, expected: &str) -> CompileError {
    let got = describe_token(self.peek(), self.source);
    CompileError::syntax(self.source, self.loc(), format!("{expected}, but got \"{got}\""))
  }

  fn skip(&mut self, s: &str) -> CompileResult<()> {
    if self.equal(s) {
      Ok(())
    } else {
      Err(self.error_here(&format!("expected \"{s}\"")))
    }
  }

  fn expect_kind(&mut self, kind: TokenKind, what: &str) -> CompileResult<Token> {
    self
      .consume(kind)
      .ok_or_else(|| self.error_here(&format!("expected {what}")))
  }

  /// Parse the current token as an integer literal returning its value and location.
  fn get_number(&mut self) -> CompileResult<(i64, usize)> {
    let token = self.expect_kind(TokenKind::Num, "a number")?;
    let value = token.value.ok_or_else(|| {
      CompileError::syntax(
        self.source,
        token.loc,
        "internal error: numeric token missing value",
      )
    })?;
    Ok((value, token.loc))
  }

  /// Parse the current token as an identifier.
  fn get_ident(&mut self) -> CompileResult<(String, usize)> {
    let token = self.expect_kind(TokenKind::Ident, "an identifier")?;
    Ok((token_text(&token, self.source).to_string(), token.loc))
  }

  fn is_eof(&self) -> bool {
    matches!(self.peek_kind(), Some(TokenKind::Eof) | None)
  }
}
