//! Semantic error taxonomy and the smaller expression forms.

mod common;

use common::{assert_compile_error, assert_ordered, compile_browser, compile_wasi};
use omnic::Target;

#[test]
fn class_as_value_is_rejected() {
    assert_compile_error(
        "class A { } function main(): int { return A; }",
        Target::Browser,
        "class usage as value not supported: A",
    );
}

#[test]
fn calling_a_non_host_local_is_rejected() {
    assert_compile_error(
        "function main(): int { let x = 1; return x(); }",
        Target::Browser,
        "calling local variable x of type int not supported",
    );
}

#[test]
fn declared_function_arity_is_enforced() {
    assert_compile_error(
        "function add(a: int, b: int): int { return a + b; } function main(): int { return add(1); }",
        Target::Browser,
        "function add expects 2 arguments, got 1",
    );
}

#[test]
fn complex_callees_are_rejected() {
    assert_compile_error(
        "function main(): int { return (1 + 2)(); }",
        Target::Browser,
        "complex function calls not supported yet",
    );
}

#[test]
fn invalid_assignment_targets_are_rejected() {
    assert_compile_error(
        "function main(): int { 1 = 2; return 0; }",
        Target::Browser,
        "invalid assignment target",
    );
}

#[test]
fn map_keys_must_be_strings() {
    assert_compile_error(
        "function main(): int { let m = {1: 2}; return 0; }",
        Target::Browser,
        "map keys must be strings",
    );
}

#[test]
fn super_outside_a_class_is_rejected() {
    assert_compile_error(
        "function main(): int { return super.m(); }",
        Target::Browser,
        "super used outside class",
    );
}

#[test]
fn super_without_a_parent_is_rejected() {
    assert_compile_error(
        "class A { m(): int { return super.m(); } } function main(): int { return 0; }",
        Target::Browser,
        "super in class with no parent",
    );
}

#[test]
fn unknown_class_in_new_is_rejected() {
    assert_compile_error(
        "function main(): int { return new Nope(); }",
        Target::Browser,
        "undefined class: Nope",
    );
}

#[test]
fn unknown_method_is_rejected() {
    assert_compile_error(
        "function main(): int { let a = [1]; return a.frobnicate(); }",
        Target::Browser,
        "unknown method: frobnicate",
    );
}

#[test]
fn unknown_property_is_rejected() {
    assert_compile_error(
        "class A { x: int; } function main(): int { let a = new A(); return a.missing; }",
        Target::Browser,
        "unknown property: missing",
    );
}

#[test]
fn mismatched_operand_types_are_rejected() {
    assert_compile_error(
        "function main(): int { return \"a\" - 1; }",
        Target::Browser,
        "operator - not defined for types string and int",
    );
}

#[test]
fn bang_lowers_to_eqz() {
    let wat = compile_browser("function main(): int { if (!false) { return 1; } return 0; }")
        .unwrap();
    assert_ordered(&wat, &["(func $main", "i32.const 0", "i32.eqz", "if (result i32)"]);
}

#[test]
fn unary_minus_multiplies_by_minus_one() {
    let wat = compile_browser("function main(): int { let x = 3; return -x; }").unwrap();
    assert_ordered(
        &wat,
        &["local.get 1 ;; x (int)", "i32.const -1", "i32.mul"],
    );
}

#[test]
fn string_plus_int_stringifies_the_int() {
    let wat = compile_browser("function main(): int { let s = \"n=\" + 5; return 0; }").unwrap();
    assert_ordered(
        &wat,
        &["i32.const 9216 ;; \"n=\"", "i32.const 5", "call $itos", "call $str_concat"],
    );
}

#[test]
fn int_plus_string_spills_the_string() {
    let wat = compile_browser("function main(): int { let s = 5 + \"x\"; return 0; }").unwrap();
    // The string is parked in a rooted scratch local while the int goes
    // through itos, keeping concat's operands in source order
    assert_ordered(
        &wat,
        &[
            "(func $main",
            "i32.const 5",
            "i32.const 9216 ;; \"x\"",
            "local.set 1",
            "call $itos",
            "local.get 1",
            "call $str_concat",
        ],
    );
}

#[test]
fn while_loop_shape() {
    let wat = compile_browser(
        "function main(): int { let i = 0; while (i < 3) { i = i + 1; } return i; }",
    )
    .unwrap();
    assert_ordered(
        &wat,
        &[
            "block $break",
            "loop $continue",
            "i32.lt_s",
            "i32.eqz",
            "br_if $break",
            "br $continue",
            "end",
            "end",
        ],
    );
}

#[test]
fn for_loop_shape() {
    let wat = compile_browser(
        "function main(): int { let s = 0; for (let i = 0; i < 4; i = i + 1) { s = s + i; } return s; }",
    )
    .unwrap();
    assert_ordered(
        &wat,
        &[
            "block $break",
            "loop $top",
            "i32.lt_s",
            "i32.eqz",
            "br_if $break",
            "br $top",
            "end",
            "end",
        ],
    );
}

#[test]
fn if_expression_always_leaves_an_i32() {
    let wat = compile_browser("function main(): int { if (true) { } else { } return 0; }").unwrap();
    assert_ordered(
        &wat,
        &["if (result i32)", "i32.const 0", "else", "i32.const 0", "end"],
    );
}

#[test]
fn expression_statements_drop_their_value() {
    let wat = compile_browser("function main(): int { 1 + 2; return 0; }").unwrap();
    assert_ordered(&wat, &["(func $main", "i32.add", "drop"]);
}

#[test]
fn string_escapes_reach_the_data_segment() {
    let wat = compile_wasi("function main(): int { print(\"a\\nb\"); return 0; }").unwrap();
    assert!(wat.contains("(data (i32.const 9216) \"a\\0ab\\00\")"));
}

#[test]
fn interned_strings_are_shared() {
    let wat = compile_browser(
        "function main(): int { let a = \"dup\"; let b = \"dup\"; return 0; }",
    )
    .unwrap();
    // One data segment, one offset, two uses
    assert_eq!(wat.matches("(data (i32.const 9216) \"dup\\00\")").count(), 1);
    assert_eq!(wat.matches("i32.const 9216 ;; \"dup\"").count(), 2);
}

#[test]
fn bare_return_yields_zero() {
    let wat = compile_browser("function main(): int { return; }").unwrap();
    assert_ordered(
        &wat,
        &["(func $main", "i32.const 0", "global.set $shadow_stack_ptr", "return"],
    );
}
