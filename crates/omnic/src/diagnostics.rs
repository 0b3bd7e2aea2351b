//! Diagnostic reporting utilities for the Omni compiler.
//!
//! Lightweight, rustc-style error reporting to stderr. Colors are plain
//! ANSI escapes so the compiler core stays dependency-free here; the CLI
//! decides what to print for which exit path.

use omni_ast::Token;

/// Prints a compact diagnostic message to stderr.
///
/// # Example output
/// ```text
/// error: unknown method: frobnicate
///   --> main.omni:5:12
/// ```
pub fn report_error(file: Option<&str>, token: Option<&Token>, message: &str) {
    let red = "\x1b[31m";
    let reset = "\x1b[0m";

    eprintln!("{}error{}: {}", red, reset, message);
    if let Some(tok) = token {
        match file {
            Some(path) => eprintln!("  --> {}:{}:{}", path, tok.line, tok.column),
            None => eprintln!("  --> line {}, column {}", tok.line, tok.column),
        }
    } else if let Some(path) = file {
        eprintln!("  --> {}", path);
    }
}

/// Prints the collected parser errors in the canonical format: a
/// `Parser errors:` header followed by one tab-indented message per line.
pub fn report_parse_errors(errors: &[String]) {
    println!("Parser errors:");
    for msg in errors {
        println!("\t{}", msg);
    }
}

/// Reports a diagnostic and returns an error for propagation with `?`.
pub fn report_error_and_bail<T>(
    file: Option<&str>,
    token: Option<&Token>,
    message: &str,
) -> anyhow::Result<T> {
    report_error(file, token, message);
    Err(anyhow::anyhow!("{}", message))
}
