//! Class layout, inheritance, interface conformance, and enums.

mod common;

use common::{assert_compile_error, assert_ordered, compile_browser};
use omnic::Target;

#[test]
fn field_layout_is_declaration_order() {
    let src = "
        class V { a: int = 0; b: int = 0; c: int = 0; }
        function main(): int { let v = new V(); return v.c; }
    ";
    let wat = compile_browser(src).unwrap();
    // Three 4-byte fields; `c` sits at offset 8
    assert!(wat.contains("i32.const 12 ;; sizeof V"));
    assert_ordered(
        &wat,
        &["i32.const 12 ;; sizeof V", "call $malloc", "i32.const 8", "i32.add", "i32.load"],
    );
}

#[test]
fn inherited_fields_come_first() {
    let src = "
        class A { x: int = 0; }
        class B extends A { y: int = 0; }
        function main(): int { let b = new B(); return b.y; }
    ";
    let wat = compile_browser(src).unwrap();
    // B is parent size + own field, and y lands after x
    assert_ordered(
        &wat,
        &["i32.const 8 ;; sizeof B", "i32.const 11", "call $malloc", "i32.const 4", "i32.add", "i32.load"],
    );
}

#[test]
fn type_ids_assigned_in_declaration_order() {
    let src = "
        class First { }
        class Second { }
        function main(): int { let a = new First(); let b = new Second(); return 0; }
    ";
    let wat = compile_browser(src).unwrap();
    assert_ordered(&wat, &["i32.const 0 ;; sizeof First", "i32.const 10", "call $malloc"]);
    assert_ordered(&wat, &["i32.const 0 ;; sizeof Second", "i32.const 11", "call $malloc"]);
}

#[test]
fn method_override_replaces_inherited_entry() {
    let src = "
        class A { m(): int { return 1; } }
        class B extends A { m(): int { return 2; } }
        function main(): int { return (new B()).m(); }
    ";
    let wat = compile_browser(src).unwrap();
    assert!(wat.contains("call $B_m"));
    assert!(wat.contains("(func $A_m"));
    assert!(wat.contains("(func $B_m"));
}

#[test]
fn inherited_method_keeps_parent_mangling() {
    let src = "
        class A { m(): int { return 1; } }
        class B extends A { }
        function main(): int { return (new B()).m(); }
    ";
    let wat = compile_browser(src).unwrap();
    // B inherits m; dispatch reaches the parent's function
    assert!(wat.contains("call $A_m"));
}

#[test]
fn this_dispatch_is_exact_within_methods() {
    let src = "
        class A { helper(): int { return 1; } run(): int { return this.helper(); } }
        class B { helper(): int { return 2; } }
        function main(): int { return (new A()).run(); }
    ";
    let wat = compile_browser(src).unwrap();
    assert_ordered(&wat, &["(func $A_run", "call $A_helper"]);
}

#[test]
fn interface_conformance_direct() {
    let src = "
        interface Shape { area(): int; }
        class Square implements Shape { s: int = 0; area(): int { return this.s * this.s; } }
        function main(): int { return 0; }
    ";
    assert!(compile_browser(src).is_ok());
}

#[test]
fn interface_conformance_via_inheritance() {
    let src = "
        interface Shape { area(): int; }
        class Base { area(): int { return 1; } }
        class Derived extends Base implements Shape { }
        function main(): int { return 0; }
    ";
    assert!(compile_browser(src).is_ok());
}

#[test]
fn missing_interface_method_is_rejected() {
    let src = "
        interface Shape { area(): int; }
        class Point implements Shape { x: int = 0; }
        function main(): int { return 0; }
    ";
    assert_compile_error(
        src,
        Target::Browser,
        "class Point does not implement method area from interface Shape",
    );
}

#[test]
fn undefined_parent_class_is_rejected() {
    assert_compile_error(
        "class B extends Missing { } function main(): int { return 0; }",
        Target::Browser,
        "undefined parent class: Missing",
    );
}

#[test]
fn duplicate_enum_is_rejected() {
    assert_compile_error(
        "enum E { A } enum E { B } function main(): int { return 0; }",
        Target::Browser,
        "duplicate enum: E",
    );
}

#[test]
fn non_literal_enum_initialiser_is_rejected() {
    assert_compile_error(
        "enum E { A = 1 + 2 } function main(): int { return 0; }",
        Target::Browser,
        "non-literal enum initialiser",
    );
}

#[test]
fn constructor_arguments_require_init() {
    assert_compile_error(
        "class A { } function main(): int { let a = new A(1); return 0; }",
        Target::Browser,
        "arguments provided for class A but no 'init' method found",
    );
}

#[test]
fn type_alias_resolves_for_parameters() {
    let src = "
        type Name = string;
        function greet(n: Name): int { return n.length; }
        function main(): int { return greet(\"omni\"); }
    ";
    let wat = compile_browser(src).unwrap();
    // The alias resolves to string, so .length lowers to strlen
    assert!(wat.contains("call $strlen"));
}
