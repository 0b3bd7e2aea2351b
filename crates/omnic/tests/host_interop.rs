//! Browser host-interop lowering: declares, the host_* trampolines,
//! implicit globals, and primitive-to-handle conversion.

mod common;

use common::{assert_ordered, compile_browser};

#[test]
fn declares_become_env_imports() {
    let src = "
        declare function alert(msg: string): void;
        declare function prompt(msg: string): int;
        function main(): int { alert(\"hi\"); return prompt(\"name?\"); }
    ";
    let wat = compile_browser(src).unwrap();
    assert!(wat.contains("(import \"env\" \"alert\" (func $alert (param i32)))"));
    assert!(wat.contains("(import \"env\" \"prompt\" (func $prompt (param i32) (result i32)))"));
    assert_ordered(&wat, &["(func $main", "call $alert", "call $prompt"]);
}

#[test]
fn host_trampolines_are_imported() {
    let wat = compile_browser("function main(): int { return 0; }").unwrap();
    for name in [
        "host_get_global",
        "host_get",
        "host_set",
        "host_call",
        "host_from_int",
        "host_from_string",
        "host_to_int",
    ] {
        assert!(
            wat.contains(&format!("(import \"env\" \"{name}\"")),
            "missing host import {name}"
        );
    }
}

#[test]
fn unknown_identifier_reads_a_host_global() {
    let wat = compile_browser("function main(): int { let d = document; return 0; }").unwrap();
    assert_ordered(
        &wat,
        &["(func $main", "i32.const 9216 ;; \"document\"", "call $host_get_global"],
    );
}

#[test]
fn host_property_get_and_set() {
    let src = "
        function main(): int {
            let d = document;
            d.title = \"omni\";
            let t = d.title;
            return 0;
        }
    ";
    let wat = compile_browser(src).unwrap();
    // Write: value converted to a handle, then host_set
    assert_ordered(
        &wat,
        &["call $host_get_global", "call $host_from_string", "call $host_set"],
    );
    // Read: host_get with the interned property name
    assert!(wat.contains("call $host_get"));
}

#[test]
fn host_method_call_packs_an_argument_buffer() {
    let src = "
        function main(): int {
            let d = document;
            d.getElementById(\"app\");
            return 0;
        }
    ";
    let wat = compile_browser(src).unwrap();
    assert_ordered(
        &wat,
        &[
            "(func $main",
            // One argument: a 4-byte buffer tagged as ArrayData
            "i32.const 4",
            "i32.const 20 ;; arg buffer (ArrayData)",
            "call $malloc",
            // The string argument becomes a handle before the store
            "call $host_from_string",
            "i32.store",
            ";; \"getElementById\"",
            "i32.const 1",
            "call $host_call",
        ],
    );
}

#[test]
fn implicit_global_call_uses_a_null_method_name() {
    let wat = compile_browser("function main(): int { requestRepaint(7); return 0; }").unwrap();
    assert_ordered(
        &wat,
        &[
            "i32.const 9216 ;; \"requestRepaint\"",
            "call $host_get_global",
            "call $host_from_int",
            "i32.const 0 ;; call handle as function",
            "call $host_call",
        ],
    );
}

#[test]
fn host_handle_in_local_is_callable() {
    let src = "
        function main(): int {
            let f = requestRepaint;
            f(1);
            return 0;
        }
    ";
    let wat = compile_browser(src).unwrap();
    // The local's host handle is re-read and called as a function
    assert_ordered(
        &wat,
        &["local.get 1 ;; f (host)", "i32.const 0 ;; call handle as function", "call $host_call"],
    );
}

#[test]
fn host_and_int_compare_as_pointer_widths() {
    let src = "
        function main(): int {
            let d = document;
            if (d == 0) { return 1; }
            return 0;
        }
    ";
    let wat = compile_browser(src).unwrap();
    assert_ordered(&wat, &["local.get 1 ;; d (host)", "i32.const 0", "i32.eq"]);
}
