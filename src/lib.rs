//! Crate root: wires together the compilation pipeline.
//!
//! The stages are small and run strictly in sequence:
//! - `tokenizer` performs lexical analysis and produces a flat token stream.
//! - `parser` builds the typed AST, resolving every name against `scope`.
//! - `codegen` lowers the program into x86-64 Intel-syntax assembly.
//! - `error` centralises reporting utilities shared by the other modules.
//!
//! All state lives in per-compilation context values, so independent
//! compilations never observe each other.

pub mod ast;
pub mod codegen;
pub mod dump;
pub mod error;
pub mod options;
pub mod parser;
pub mod scope;
pub mod tokenizer;
pub mod ty;

use log::debug;

pub use error::{CompileError, CompileResult, ErrorKind};
pub use options::{CompileOptions, FrameSize, PointerStride};

/// Compile a source string into assembly with the given options.
pub fn compile(source: &str, options: &CompileOptions) -> CompileResult<String> {
  let tokens = tokenizer::tokenize(source)?;
  debug!("lexed {} tokens", tokens.len());
  let program = parser::parse(tokens, source, options)?;
  codegen::generate(&program, options)
}

/// Compile a source string into assembly with the default options.
pub fn generate_assembly(source: &str) -> CompileResult<String> {
  compile(source, &CompileOptions::default())
}
