//! Shared error utilities used across the compilation pipeline.
//!
//! Every failure is fatal: the first error aborts the compilation and no
//! assembly is produced. Diagnostics point at the offending byte with a caret
//! under the source line it belongs to.

use std::fmt;

use snafu::Snafu;

pub type CompileResult<T> = Result<T, CompileError>;

/// Which stage of the front-end rejected the input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
  Lexical,
  Syntax,
  Semantic,
}

impl fmt::Display for ErrorKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      ErrorKind::Lexical => f.write_str("lexical"),
      ErrorKind::Syntax => f.write_str("syntax"),
      ErrorKind::Semantic => f.write_str("semantic"),
    }
  }
}

#[derive(Debug, Snafu)]
pub enum CompileError {
  #[snafu(display("{line}:{column}: {kind} error: {message}\n{source_line}\n{marker}"))]
  WithLocation {
    kind: ErrorKind,
    line: usize,
    column: usize,
    source_line: String,
    marker: String,
    message: String,
  },

  #[snafu(display(
    "function `{function}` needs {needed} bytes of locals but the frame is limited to {limit}"
  ))]
  FrameOverflow {
    function: String,
    needed: usize,
    limit: usize,
  },
}

impl CompileError {
  /// Construct an error anchored at a specific byte offset in the source.
  pub fn at(kind: ErrorKind, source: &str, loc: usize, message: impl Into<String>) -> Self {
    let loc = loc.min(source.len());
    let line_start = source[..loc].rfind('\n').map_or(0, |i| i + 1);
    let line_end = source[loc..]
      .find(['\n', '\r'])
      .map_or(source.len(), |i| i + loc);
    let line = source[..line_start].matches('\n').count() + 1;
    let column = source[line_start..loc].chars().count() + 1;
    let marker = format!("{}^", " ".repeat(column - 1));
    Self::WithLocation {
      kind,
      line,
      column,
      source_line: source[line_start..line_end].to_string(),
      marker,
      message: message.into(),
    }
  }

  pub fn lexical(source: &str, loc: usize, message: impl Into<String>) -> Self {
    Self::at(ErrorKind::Lexical, source, loc, message)
  }

  pub fn syntax(source: &str, loc: usize, message: impl Into<String>) -> Self {
    Self::at(ErrorKind::Syntax, source, loc, message)
  }

  pub fn semantic(source: &str, loc: usize, message: impl Into<String>) -> Self {
    Self::at(ErrorKind::Semantic, source, loc, message)
  }

  /// The stage that produced this error, if it is tied to a source location.
  pub fn kind(&self) -> Option<ErrorKind> {
    match self {
      Self::WithLocation { kind, .. } => Some(*kind),
      Self::FrameOverflow { .. } => None,
    }
  }
}
