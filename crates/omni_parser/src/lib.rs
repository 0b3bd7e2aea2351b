//! Omni Parser
//!
//! This crate implements the lexer and a recursive-descent Pratt parser
//! for the Omni language. It takes a source string and produces an
//! [`omni_ast::Program`]. Parse errors are collected rather than aborting
//! on the first failure so a single run reports everything it can.

pub mod lexer;
pub mod parser;

pub use lexer::Lexer;
pub use parser::Parser;

use omni_ast::Program;

/// Parse a whole source string. Returns the program and any parse errors;
/// callers should treat a non-empty error list as fatal.
pub fn parse_program(input: &str) -> (Program, Vec<String>) {
    let mut parser = Parser::new(Lexer::new(input));
    let program = parser.parse_program();
    (program, parser.into_errors())
}
