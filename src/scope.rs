//! Symbol tables: per-function locals on a scope stack, plus the globals of
//! the compilation unit.
//!
//! Only the innermost frame is visible, and within a frame the most recently
//! declared binding of a name wins.

use crate::ty::Type;

/// A local variable or parameter living in the current stack frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalVar {
  pub name: String,
  pub ty: Type,
  /// Distance below `rbp` of the lowest byte of the variable.
  pub offset: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GlobalVar {
  pub name: String,
  pub ty: Type,
}

/// Result of resolving an identifier.
#[derive(Debug, Clone, Copy)]
pub enum Binding<'a> {
  Local(&'a LocalVar),
  Global(&'a GlobalVar),
}

#[derive(Debug, Default)]
struct Frame {
  locals: Vec<LocalVar>,
  stack_size: usize,
}

#[derive(Debug, Default)]
pub struct Scope {
  frames: Vec<Frame>,
  globals: Vec<GlobalVar>,
}

impl Scope {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn enter_function(&mut self) {
    self.frames.push(Frame::default());
  }

  /// Pop the current frame, returning the bytes its locals occupy.
  pub fn leave_function(&mut self) -> usize {
    self.frames.pop().map_or(0, |frame| frame.stack_size)
  }

  pub fn in_function(&self) -> bool {
    !self.frames.is_empty()
  }

  /// Find a local in the current frame only.
  pub fn find_local(&self, name: &str) -> Option<&LocalVar> {
    self
      .frames
      .last()?
      .locals
      .iter()
      .rev()
      .find(|var| var.name == name)
  }

  pub fn find_global(&self, name: &str) -> Option<&GlobalVar> {
    self.globals.iter().rev().find(|var| var.name == name)
  }

  /// Locals shadow globals.
  pub fn lookup(&self, name: &str) -> Option<Binding<'_>> {
    if let Some(local) = self.find_local(name) {
      return Some(Binding::Local(local));
    }
    self.find_global(name).map(Binding::Global)
  }

  /// Allocate a slot in the current frame. Returns `None` when no function
  /// frame is active. Duplicate names are the caller's concern.
  pub fn declare_local(&mut self, name: &str, ty: Type) -> Option<LocalVar> {
    let frame = self.frames.last_mut()?;
    frame.stack_size += ty.storage_size();
    let var = LocalVar {
      name: name.to_string(),
      ty,
      offset: frame.stack_size,
    };
    frame.locals.push(var.clone());
    Some(var)
  }

  pub fn declare_global(&mut self, name: &str, ty: Type) -> GlobalVar {
    let var = GlobalVar {
      name: name.to_string(),
      ty,
    };
    self.globals.push(var.clone());
    var
  }
}
