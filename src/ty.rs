//! The four type shapes and the structural rules built on them.
//!
//! Storage follows a flat slot model: every scalar (including `char`) occupies
//! one 8-byte slot in a frame or in the data section, and an array occupies
//! one slot per element.

use std::fmt;

use crate::options::PointerStride;

/// Width of one storage slot in bytes.
pub const SLOT_SIZE: usize = 8;

/// Largest object or stack frame, in bytes. Keeps every frame offset and
/// `sub rsp` operand inside a signed 32-bit displacement.
pub const MAX_OBJECT_SIZE: usize = 1 << 30;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Type {
  Int,
  Char,
  Pointer(Box<Type>),
  Array { element: Box<Type>, len: usize },
}

impl Type {
  pub fn pointer_to(base: Type) -> Self {
    Self::Pointer(Box::new(base))
  }

  pub fn array_of(element: Type, len: usize) -> Self {
    Self::Array {
      element: Box::new(element),
      len,
    }
  }

  /// Pointers and arrays both take part in pointer arithmetic.
  pub fn is_pointer_like(&self) -> bool {
    matches!(self, Type::Pointer(_) | Type::Array { .. })
  }

  pub fn is_array(&self) -> bool {
    matches!(self, Type::Array { .. })
  }

  /// The pointee of a pointer, or the element of an array.
  pub fn base(&self) -> Option<&Type> {
    match self {
      Type::Pointer(base) => Some(base),
      Type::Array { element, .. } => Some(element),
      Type::Int | Type::Char => None,
    }
  }

  /// Bytes reserved for a value of this type in a frame or in `.data`.
  pub fn storage_size(&self) -> usize {
    match self {
      Type::Array { len, .. } => len * SLOT_SIZE,
      Type::Int | Type::Char | Type::Pointer(_) => SLOT_SIZE,
    }
  }

  /// Bytes read or written by a load/store of this type.
  pub fn access_width(&self) -> usize {
    match self {
      Type::Char => 1,
      Type::Array { .. } => self.storage_size(),
      Type::Int | Type::Pointer(_) => SLOT_SIZE,
    }
  }

  /// Bytes between consecutive elements when stepping a pointer of this type.
  /// `None` for non-pointers.
  pub fn stride(&self, policy: PointerStride) -> Option<usize> {
    let base = self.base()?;
    Some(match policy {
      PointerStride::Element => base.access_width(),
      PointerStride::Fixed(n) => n,
    })
  }

  /// The value `sizeof` yields: 4 for `int` or an untyped operand, 8 for
  /// everything else.
  pub fn sizeof(ty: Option<&Type>) -> i64 {
    match ty {
      None | Some(Type::Int) => 4,
      Some(_) => 8,
    }
  }

  /// Result type of `lhs + rhs` or `lhs - rhs`: the pointer side wins (arrays
  /// decay to a pointer to their element), otherwise `int`.
  pub fn arith_result(lhs: Option<&Type>, rhs: Option<&Type>) -> Type {
    let pointer = [lhs, rhs]
      .into_iter()
      .flatten()
      .find(|ty| ty.is_pointer_like());
    match pointer.and_then(Type::base) {
      Some(base) => Type::pointer_to(base.clone()),
      None => Type::Int,
    }
  }
}

impl fmt::Display for Type {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Type::Int => f.write_str("int"),
      Type::Char => f.write_str("char"),
      Type::Pointer(base) => write!(f, "{base}*"),
      Type::Array { element, len } => write!(f, "{element}[{len}]"),
    }
  }
}
