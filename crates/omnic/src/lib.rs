//! Omni compiler core
//!
//! Turns a parsed [`omni_ast::Program`] into a WebAssembly text module
//! for one of two targets: `browser` (host-interop trampolines, sweeping
//! collector) or `wasi` (syscall stdlib, shared-memory threads).
//!
//! The crate is organized as:
//! - `types` : the runtime data-type enumeration and the type resolver
//! - `symbols` : program-wide symbol tables and per-function state
//! - `codegen` : the multi-pass walker, emitters, and module assembler
//! - `runtime` : the WAT runtime library bundled into every module
//! - `diagnostics` : rustc-style stderr reporting

pub mod codegen;
pub mod diagnostics;
pub mod runtime;
pub mod symbols;
pub mod types;

pub use codegen::{Compiler, Target};
pub use types::DataType;

use anyhow::Result;
use omni_ast::Program;

/// Compiles a program to WAT for the given target.
pub fn compile(program: &Program, target: Target) -> Result<String> {
    let mut compiler = Compiler::new(target);
    compiler.compile_program(program)?;
    Ok(compiler.generate_wat())
}
