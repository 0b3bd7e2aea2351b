//! Parser integration tests: statement shapes, precedence, and error
//! collection.

use omni_ast::*;
use omni_parser::parse_program;

fn parse_ok(input: &str) -> Program {
    let (program, errors) = parse_program(input);
    assert!(errors.is_empty(), "unexpected parse errors: {errors:?}");
    program
}

fn only_stmt(program: &Program) -> &Stmt {
    assert_eq!(program.statements.len(), 1, "expected a single statement");
    &program.statements[0]
}

#[test]
fn let_with_annotation() {
    let program = parse_ok("let xs: Array<int> = [1, 2];");
    let Stmt::Let(l) = only_stmt(&program) else {
        panic!("expected let");
    };
    assert_eq!(l.name.name, "xs");
    assert_eq!(l.ty.as_deref(), Some("Array<int>"));
    assert!(matches!(l.value, Expr::Array(_)));
}

#[test]
fn const_parses_like_let() {
    let program = parse_ok("const x = 1;");
    assert!(matches!(only_stmt(&program), Stmt::Let(_)));
}

#[test]
fn map_type_spelling_is_captured_whole() {
    let program = parse_ok("let m: Map<string,int> = {};");
    let Stmt::Let(l) = only_stmt(&program) else {
        panic!("expected let");
    };
    assert_eq!(l.ty.as_deref(), Some("Map<string,int>"));
}

#[test]
fn multiplication_binds_tighter_than_addition() {
    let program = parse_ok("2 + 3 * 4;");
    let Stmt::Expr(es) = only_stmt(&program) else {
        panic!("expected expression statement");
    };
    let Expr::Infix(add) = &es.expr else {
        panic!("expected infix");
    };
    assert_eq!(add.op, BinaryOp::Add);
    let Expr::Infix(mul) = &*add.right else {
        panic!("expected nested infix");
    };
    assert_eq!(mul.op, BinaryOp::Mul);
}

#[test]
fn assignment_is_right_associative() {
    let program = parse_ok("a = b = 1;");
    let Stmt::Expr(es) = only_stmt(&program) else {
        panic!("expected expression statement");
    };
    let Expr::Assign(outer) = &es.expr else {
        panic!("expected assignment");
    };
    assert!(matches!(&*outer.value, Expr::Assign(_)));
}

#[test]
fn member_call_index_chain() {
    let program = parse_ok("a.b.c(1)[2];");
    let Stmt::Expr(es) = only_stmt(&program) else {
        panic!("expected expression statement");
    };
    let Expr::Index(index) = &es.expr else {
        panic!("expected index at the top");
    };
    let Expr::Call(call) = &*index.left else {
        panic!("expected call under index");
    };
    assert!(matches!(&*call.callee, Expr::Member(_)));
}

#[test]
fn function_declaration_shape() {
    let program = parse_ok("function add(a: int, b: int): int { return a + b; }");
    let Stmt::Expr(es) = only_stmt(&program) else {
        panic!("expected expression statement");
    };
    let Expr::Function(f) = &es.expr else {
        panic!("expected function literal");
    };
    assert_eq!(f.name, "add");
    assert_eq!(f.params.len(), 2);
    assert_eq!(f.params[0].ty, "int");
    assert_eq!(f.return_type, "int");
    assert_eq!(f.body.statements.len(), 1);
}

#[test]
fn class_with_everything() {
    let src = "
        class Dog extends Animal implements Pet, Noisy {
            name: string = \"rex\";
            age: int;
            init(n: string) { this.name = n; }
            speak(): string { return this.name; }
        }
    ";
    let program = parse_ok(src);
    let Stmt::Class(c) = only_stmt(&program) else {
        panic!("expected class");
    };
    assert_eq!(c.name.name, "Dog");
    assert_eq!(c.parent.as_ref().unwrap().name, "Animal");
    assert_eq!(
        c.implements.iter().map(|i| i.name.as_str()).collect::<Vec<_>>(),
        vec!["Pet", "Noisy"]
    );
    assert_eq!(c.fields.len(), 2);
    assert!(c.fields[0].value.is_some());
    assert!(c.fields[1].value.is_none());
    assert_eq!(c.methods.len(), 2);
    assert_eq!(c.methods[0].name, "init");
}

#[test]
fn interface_signatures() {
    let program = parse_ok("interface Shape { area(): int; scale(f: int): void; }");
    let Stmt::Interface(i) = only_stmt(&program) else {
        panic!("expected interface");
    };
    assert_eq!(i.methods.len(), 2);
    assert_eq!(i.methods[0].name, "area");
    assert_eq!(i.methods[1].params.len(), 1);
}

#[test]
fn enum_members_with_initialisers() {
    let program = parse_ok("enum C { R, G = 10, B }");
    let Stmt::Enum(e) = only_stmt(&program) else {
        panic!("expected enum");
    };
    assert_eq!(e.members.len(), 3);
    assert!(e.members[0].value.is_none());
    assert!(e.members[1].value.is_some());
    assert!(e.members[2].value.is_none());
}

#[test]
fn declare_defaults_to_void() {
    let program = parse_ok("declare function log(msg: string);");
    let Stmt::Declare(d) = only_stmt(&program) else {
        panic!("expected declare");
    };
    assert_eq!(d.name.name, "log");
    assert_eq!(d.return_type, "void");
}

#[test]
fn import_and_export_are_parsed() {
    let program = parse_ok("import { a, b } from \"mod\"; export let x = 1;");
    assert_eq!(program.statements.len(), 2);
    let Stmt::Import(i) = &program.statements[0] else {
        panic!("expected import");
    };
    assert_eq!(i.source, "mod");
    assert_eq!(i.names.len(), 2);
    let Stmt::Export(e) = &program.statements[1] else {
        panic!("expected export");
    };
    assert!(matches!(&*e.inner, Stmt::Let(_)));
}

#[test]
fn for_loop_components() {
    let program = parse_ok("for (let i = 0; i < 10; i = i + 1) { }");
    let Stmt::For(f) = only_stmt(&program) else {
        panic!("expected for");
    };
    assert!(matches!(f.init.as_ref().unwrap(), Stmt::Let(_)));
    assert!(f.condition.is_some());
    assert!(matches!(f.update.as_ref().unwrap(), Stmt::Expr(_)));
}

#[test]
fn for_loop_with_empty_clauses() {
    let program = parse_ok("for (;;) { }");
    let Stmt::For(f) = only_stmt(&program) else {
        panic!("expected for");
    };
    assert!(f.init.is_none());
    assert!(f.condition.is_none());
    assert!(f.update.is_none());
}

#[test]
fn spawn_requires_a_direct_call() {
    let (_, errors) = parse_program("spawn 1 + 2;");
    assert!(!errors.is_empty());
    assert!(errors[0].contains("spawn expects a direct function call"));
}

#[test]
fn spawn_call_shape() {
    let program = parse_ok("spawn worker(1, 2);");
    let Stmt::Spawn(s) = only_stmt(&program) else {
        panic!("expected spawn");
    };
    assert_eq!(s.call.arguments.len(), 2);
}

#[test]
fn if_else_is_an_expression() {
    let program = parse_ok("if (x < 1) { return 1; } else { return 2; }");
    let Stmt::Expr(es) = only_stmt(&program) else {
        panic!("expected expression statement");
    };
    let Expr::If(ie) = &es.expr else {
        panic!("expected if expression");
    };
    assert!(ie.alternative.is_some());
}

#[test]
fn new_with_arguments() {
    let program = parse_ok("let p = new Point(1, 2);");
    let Stmt::Let(l) = only_stmt(&program) else {
        panic!("expected let");
    };
    let Expr::New(n) = &l.value else {
        panic!("expected new");
    };
    assert_eq!(n.class.name, "Point");
    assert_eq!(n.arguments.len(), 2);
}

#[test]
fn map_literal_pairs_keep_source_order() {
    let program = parse_ok("let m = {\"a\": 1, \"b\": 2};");
    let Stmt::Let(l) = only_stmt(&program) else {
        panic!("expected let");
    };
    let Expr::Map(m) = &l.value else {
        panic!("expected map literal");
    };
    let keys: Vec<_> = m
        .pairs
        .iter()
        .map(|(k, _)| match k {
            Expr::Str(s) => s.value.clone(),
            _ => panic!("expected string key"),
        })
        .collect();
    assert_eq!(keys, vec!["a", "b"]);
}

#[test]
fn errors_are_collected_not_fatal() {
    let (_, errors) = parse_program("let = 5; let x = 1;");
    assert!(!errors.is_empty());
    assert!(errors[0].contains("expected"));
}

#[test]
fn tokens_carry_positions() {
    let program = parse_ok("let x = 1;\nlet y = 2;");
    let Stmt::Let(second) = &program.statements[1] else {
        panic!("expected let");
    };
    assert_eq!(second.token.line, 2);
}
