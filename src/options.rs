//! Code-generation policies that callers may tune.

/// How the non-pointer operand of `ptr + n` is scaled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PointerStride {
  /// Scale by the width of the pointee: 1 for `char`, 8 for any other slot.
  #[default]
  Element,
  /// Scale by a constant regardless of the pointee. `Fixed(4)` matches the
  /// classic 9cc output.
  Fixed(usize),
}

/// How much stack each function reserves for its locals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FrameSize {
  /// Reserve exactly what the declared locals need, rounded up to 16.
  #[default]
  Exact,
  /// Reserve the same bound in every function. A function whose locals do
  /// not fit is rejected.
  Fixed(usize),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CompileOptions {
  pub pointer_stride: PointerStride,
  pub frame: FrameSize,
}

impl CompileOptions {
  /// Options reproducing the fixed 4-byte stride and 208-byte frame.
  pub fn legacy() -> Self {
    Self {
      pointer_stride: PointerStride::Fixed(4),
      frame: FrameSize::Fixed(208),
    }
  }
}
