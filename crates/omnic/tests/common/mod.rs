//! Shared helpers for the compiler test suite.

use anyhow::Result;
use omnic::{Target, compile};

/// Parses and compiles a source string for the given target.
pub fn compile_to_wat(src: &str, target: Target) -> Result<String> {
    let (program, errors) = omni_parser::parse_program(src);
    if !errors.is_empty() {
        anyhow::bail!("parse errors: {}", errors.join("; "));
    }
    compile(&program, target)
}

#[allow(dead_code)]
pub fn compile_browser(src: &str) -> Result<String> {
    compile_to_wat(src, Target::Browser)
}

#[allow(dead_code)]
pub fn compile_wasi(src: &str) -> Result<String> {
    compile_to_wat(src, Target::Wasi)
}

/// Asserts that `needles` occur in `haystack` in the given order.
#[allow(dead_code)]
pub fn assert_ordered(haystack: &str, needles: &[&str]) {
    let mut pos = 0;
    for needle in needles {
        match haystack[pos..].find(needle) {
            Some(i) => pos += i + needle.len(),
            None => panic!("expected `{needle}` after byte {pos} of:\n{haystack}"),
        }
    }
}

/// Asserts that compilation fails with a message containing `fragment`.
#[allow(dead_code)]
pub fn assert_compile_error(src: &str, target: Target, fragment: &str) {
    match compile_to_wat(src, target) {
        Ok(_) => panic!("expected compilation to fail with `{fragment}`"),
        Err(err) => {
            let msg = err.to_string();
            assert!(
                msg.contains(fragment),
                "expected error containing `{fragment}`, got `{msg}`"
            );
        }
    }
}
