//! Syntax tree produced by the parser and consumed by the code generator.
//!
//! Each node owns its children. Expressions carry the type resolved while
//! parsing; addressable locations are split out as [`Place`] so only they can
//! be assigned to or have their address taken.

pub use crate::scope::{GlobalVar, LocalVar};
use crate::ty::Type;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
  Add,
  Sub,
  Mul,
  Div,
  Eq,
  Ne,
  Lt,
  Le,
}

/// A storage location.
#[derive(Debug, Clone)]
pub enum Place {
  Local { name: String, offset: usize },
  Global { name: String },
  /// The location a pointer-valued expression points at.
  Deref(Box<Expr>),
}

#[derive(Debug, Clone)]
pub enum ExprKind {
  Num(i64),
  /// Reference to an interned string literal by label.
  Str { label: String },
  /// The value stored at a place (or its address, for arrays).
  Load(Place),
  Addr(Place),
  Assign {
    place: Place,
    value: Box<Expr>,
  },
  Binary {
    op: BinaryOp,
    lhs: Box<Expr>,
    rhs: Box<Expr>,
  },
  Call {
    name: String,
    args: Vec<Expr>,
  },
}

#[derive(Debug, Clone)]
pub struct Expr {
  pub kind: ExprKind,
  pub ty: Option<Type>,
  /// Byte offset of the first token, for diagnostics.
  pub loc: usize,
}

impl Expr {
  pub fn number(value: i64, loc: usize) -> Self {
    Self {
      kind: ExprKind::Num(value),
      ty: Some(Type::Int),
      loc,
    }
  }

  pub fn load(place: Place, ty: Option<Type>, loc: usize) -> Self {
    Self {
      kind: ExprKind::Load(place),
      ty,
      loc,
    }
  }

  pub fn binary(op: BinaryOp, lhs: Expr, rhs: Expr, ty: Type) -> Self {
    let loc = lhs.loc;
    Self {
      kind: ExprKind::Binary {
        op,
        lhs: Box::new(lhs),
        rhs: Box::new(rhs),
      },
      ty: Some(ty),
      loc,
    }
  }

  /// `*pointer`, typed as the pointee when known.
  pub fn deref(pointer: Expr) -> Self {
    let ty = pointer.ty.as_ref().and_then(Type::base).cloned();
    let loc = pointer.loc;
    Self::load(Place::Deref(Box::new(pointer)), ty, loc)
  }

  /// Turn an lvalue expression back into the place it reads from.
  pub fn into_place(self) -> Result<Place, Expr> {
    match self.kind {
      ExprKind::Load(place) => Ok(place),
      _ => Err(self),
    }
  }
}

#[derive(Debug, Clone)]
pub enum Stmt {
  Expr(Expr),
  /// Declares a local; generates no code.
  LocalDecl(LocalVar),
  Return(Expr),
  If {
    cond: Expr,
    then: Box<Stmt>,
    els: Option<Box<Stmt>>,
  },
  While {
    cond: Expr,
    body: Box<Stmt>,
  },
  For {
    init: Option<Expr>,
    cond: Option<Expr>,
    inc: Option<Expr>,
    body: Box<Stmt>,
  },
  Block(Vec<Stmt>),
}

#[derive(Debug, Clone)]
pub struct Function {
  pub name: String,
  pub return_ty: Type,
  pub params: Vec<LocalVar>,
  pub body: Vec<Stmt>,
  /// Bytes occupied by parameters and locals.
  pub stack_size: usize,
}

#[derive(Debug, Clone)]
pub enum Decl {
  Function(Function),
  Global(GlobalVar),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StringLiteral {
  pub label: String,
  pub contents: String,
}

/// A whole translation unit.
#[derive(Debug, Clone, Default)]
pub struct Program {
  pub decls: Vec<Decl>,
  /// Distinct string literals in first-use order.
  pub strings: Vec<StringLiteral>,
}

impl Program {
  pub fn functions(&self) -> impl Iterator<Item = &Function> {
    self.decls.iter().filter_map(|decl| match decl {
      Decl::Function(func) => Some(func),
      Decl::Global(_) => None,
    })
  }

  pub fn globals(&self) -> impl Iterator<Item = &GlobalVar> {
    self.decls.iter().filter_map(|decl| match decl {
      Decl::Global(var) => Some(var),
      Decl::Function(_) => None,
    })
  }
}
