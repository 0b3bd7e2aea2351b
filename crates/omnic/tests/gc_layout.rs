//! Shadow-stack discipline, the generated trace dispatcher, and the
//! memory layout of the assembled module.

mod common;

use common::{assert_ordered, compile_browser, compile_wasi};

#[test]
fn function_prologue_roots_parameters() {
    let wat = compile_browser("function f(p: int): int { return p; } function main(): int { return f(1); }")
        .unwrap();
    assert_ordered(
        &wat,
        &[
            "(func $f (export \"f\") (param i32) (result i32)",
            // Snapshot of the shadow pointer into the first non-param local
            "global.get $shadow_stack_ptr",
            "local.set 1 ;; save shadow stack frame",
            // The parameter is pushed as a root
            "global.get $shadow_stack_ptr",
            "local.get 0",
            "i32.store",
            "global.get $shadow_stack_ptr",
            "i32.const 4",
            "i32.add",
            "global.set $shadow_stack_ptr",
        ],
    );
}

#[test]
fn return_restores_the_shadow_frame() {
    let wat = compile_browser("function main(): int { return 5; }").unwrap();
    assert_ordered(
        &wat,
        &[
            "(func $main",
            "i32.const 5",
            "local.get 0",
            "global.set $shadow_stack_ptr",
            "return",
        ],
    );
}

#[test]
fn let_spills_to_the_shadow_stack() {
    let wat = compile_browser("function main(): int { let x = 1; return x; }").unwrap();
    assert_ordered(
        &wat,
        &[
            "(func $main",
            "i32.const 1",
            "local.set 1 ;; x (int)",
            "global.get $shadow_stack_ptr",
            "local.get 1",
            "i32.store",
        ],
    );
}

#[test]
fn assignment_writes_through_the_shadow_slot() {
    let wat = compile_browser("function main(): int { let x = 1; x = 2; return x; }").unwrap();
    assert_ordered(
        &wat,
        &[
            "i32.const 2",
            "local.set 1",
            "local.get 1",
            "local.get 0 ;; shadow frame base",
            "i32.const 0",
            "i32.add",
            "local.get 1",
            "i32.store",
        ],
    );
}

#[test]
fn array_literal_roots_container_before_elements() {
    let wat = compile_browser("function main(): int { let a = [1]; return 0; }").unwrap();
    assert_ordered(
        &wat,
        &[
            "call $array_new",
            // Rooted immediately...
            "local.set 1",
            "global.get $shadow_stack_ptr",
            "local.get 1",
            "i32.store",
            // ...before any element is compiled
            "i32.const 1",
            "call $array_push",
        ],
    );
}

#[test]
fn trace_covers_pointer_fields_only() {
    let src = "
        class Node { items: array; label: string; count: int; next: Node; }
        function main(): int { return 0; }
    ";
    let wat = compile_browser(src).unwrap();
    assert!(wat.contains(";; Class Node (TypeID 10)"));
    // The array field is traced
    assert!(wat.contains(";; Field items (offset 0)"));
    // string and int fields are leaves; a Node-typed field resolves to a
    // plain pointer-width int and is a leaf too
    assert!(!wat.contains(";; Field label"));
    assert!(!wat.contains(";; Field count"));
    assert!(!wat.contains(";; Field next"));
}

#[test]
fn trace_has_builtin_container_cases() {
    let wat = compile_browser("function main(): int { return 0; }").unwrap();
    assert!(wat.contains("(func $gc_trace (param $ptr i32) (param $type_id i32)"));
    for id in ["i32.const 1", "i32.const 20", "i32.const 2", "i32.const 21", "i32.const 22"] {
        let trace = &wat[wat.find("(func $gc_trace").unwrap()..];
        assert!(trace.contains(id), "gc_trace missing case {id}");
    }
}

#[test]
fn browser_module_shape() {
    let wat = compile_browser("function main(): int { return 0; }").unwrap();
    assert!(wat.contains("(import \"env\" \"memory\" (memory 1 1000 shared))"));
    assert!(wat.contains("(export \"memory\" (memory 0))"));
    assert!(wat.contains("(export \"gc\" (func $gc_collect))"));
    // The bump-pointer cell is seeded with the heap base (10240 LE)
    assert!(wat.contains("(data (i32.const 1020) \"\\00\\28\\00\\00\")"));
    // Browser builds carry the sweeping collector
    assert!(wat.contains("global.get $allocated_list"));
    assert!(wat.contains("global.set $free_list"));
}

#[test]
fn wasi_module_shape() {
    let wat = compile_wasi("function main(): int { return 0; }").unwrap();
    assert!(wat.contains("(export \"_initialize\" (func $_initialize))"));
    assert!(wat.contains("(export \"_set_stack_pointer\" (func $_set_stack_pointer))"));
    assert!(!wat.contains("(export \"gc\""));
    // The shared-memory build defers collection
    let collect = &wat[wat.find("(func $gc_collect").unwrap()..];
    let body_end = collect.find("\n)").unwrap();
    assert!(!collect[..body_end].contains("global.get $allocated_list"));
}

#[test]
fn allocator_is_an_atomic_bump() {
    let wat = compile_browser("function main(): int { return 0; }").unwrap();
    assert_ordered(
        &wat,
        &[
            "(func $malloc (param $size i32) (param $type_id i32) (result i32)",
            "i32.const 1020",
            "i32.atomic.rmw.add",
        ],
    );
}
