use lox_syntax::ast::{Expr, ExprKind, Program, Stmt};
use lox_typing::{CheckError, MismatchKind, Type, Typing, check};

fn parse(source: &str) -> Program {
    let (program, diagnostics) = lox_syntax::parse(source);
    assert!(diagnostics.is_empty(), "unexpected parse errors: {diagnostics:?}");
    program
}

fn check_source(source: &str) -> (Program, Typing) {
    let program = parse(source);
    let typing = check(&program).unwrap_or_else(|error| panic!("checker stopped: {error}"));
    (program, typing)
}

fn check_ok(source: &str) -> (Program, Typing) {
    let (program, typing) = check_source(source);
    assert!(typing.is_ok(), "unexpected errors:\n{}", typing.error_report());
    (program, typing)
}

fn check_err(source: &str) -> Typing {
    let (_, typing) = check_source(source);
    assert!(!typing.is_ok(), "expected type errors for:\n{source}");
    typing
}

/// The expression printed by the `index`-th top-level statement.
fn printed(program: &Program, index: usize) -> &Expr {
    match &program.statements[index] {
        Stmt::Print(expr) => expr,
        other => panic!("statement {index} is not a print: {other:?}"),
    }
}

#[test]
fn variable_use_site_has_the_initializer_type() {
    let (program, typing) = check_ok("var a = 1; print a;");
    let use_site = printed(&program, 1);
    assert!(matches!(use_site.kind, ExprKind::Variable(_)));
    assert_eq!(typing.resolved(use_site.id), Some(Type::Number));
}

#[test]
fn add3_works_for_numbers_and_strings_at_separate_call_sites() {
    let (program, typing) = check_ok(
        r#"
        fun add3(a, b, c) { return a + b + c; }
        print add3(1, 2, 3);
        print add3("x", "y", "z");
        "#,
    );
    assert_eq!(typing.render(printed(&program, 1).id).as_deref(), Some("Number"));
    assert_eq!(typing.render(printed(&program, 2).id).as_deref(), Some("String"));
}

#[test]
fn add3_rejects_mixed_operands() {
    let typing = check_err(
        r#"
        fun add3(a, b, c) { return a + b + c; }
        print add3(1, "y", 3);
        "#,
    );
    assert_eq!(typing.errors.len(), 1);
    assert_eq!(typing.errors[0].mismatch.kind, MismatchKind::Mismatch);
    assert_eq!(typing.errors[0].span.start.line, 3);
}

#[test]
fn redeclaring_in_the_same_scope_must_keep_the_type() {
    let typing = check_err("var a = 1; var a = \"x\";");
    assert_eq!(typing.errors.len(), 1);
    let mismatch = &typing.errors[0].mismatch;
    assert_eq!((&mismatch.left, &mismatch.right), (&Type::Number, &Type::String));
    assert_eq!(typing.error_report(), "Number != String");
}

#[test]
fn shadowing_in_an_inner_scope_is_free() {
    check_ok("var a = 1; { var a = \"x\"; print a; }");
}

#[test]
fn function_without_return_returns_nil() {
    let (program, typing) = check_ok("fun noop() { print 1; } print noop();");
    assert_eq!(typing.resolved(printed(&program, 1).id), Some(Type::Nil));
}

#[test]
fn implicit_nil_return_is_absorbed_by_an_explicit_one() {
    let (program, typing) = check_ok("fun f(x) { if (x) return 1; } print f(true);");
    assert_eq!(typing.resolved(printed(&program, 1).id), Some(Type::Number));
}

#[test]
fn both_branches_returning_counts_as_always_returning() {
    check_ok(r#"fun f(x) { if (x) { return 1; } else return 2; } print f(true) + 1;"#);
}

#[test]
fn generic_function_is_instantiated_per_use() {
    let (program, typing) = check_ok(
        r#"
        fun id(x) { return x; }
        print id(1);
        print id("s");
        print id;
        "#,
    );
    assert_eq!(typing.render(printed(&program, 1).id).as_deref(), Some("Number"));
    assert_eq!(typing.render(printed(&program, 2).id).as_deref(), Some("String"));

    let scheme_use = typing.render(printed(&program, 3).id).unwrap_or_default();
    let (param, ret) = scheme_use
        .split_once(" -> ")
        .unwrap_or_else(|| panic!("not a function: {scheme_use}"));
    assert_eq!(param.trim_matches(|ch| ch == '(' || ch == ')'), ret);
}

#[test]
fn recursive_functions_see_their_own_signature() {
    check_ok(
        r#"
        fun fib(n) {
          if (n < 2) return n;
          return fib(n - 1) + fib(n - 2);
        }
        print fib(10);
        "#,
    );
}

#[test]
fn self_returning_function_is_an_infinite_type() {
    let typing = check_err("fun f(x) { return f; }");
    assert_eq!(typing.errors[0].mismatch.kind, MismatchKind::Infinite);
}

#[test]
fn calling_with_the_wrong_argument_count_is_an_arity_error() {
    let typing = check_err("fun pair(a, b) { return a; } pair(1);");
    assert_eq!(typing.errors[0].mismatch.kind, MismatchKind::Arity);
}

#[test]
fn errors_are_collected_across_statements() {
    let typing = check_err(
        r#"
        print 1 - "a";
        print "b" * 2;
        print true < 3;
        print 1 + 2;
        "#,
    );
    let lines: Vec<usize> = typing.errors.iter().map(|error| error.span.start.line).collect();
    assert_eq!(lines, vec![2, 3, 4]);
    assert_eq!(typing.error_report().lines().count(), 3);
}

#[test]
fn unary_minus_picks_the_one_operand_overload() {
    let (program, typing) = check_ok("var x = 2; print -x;");
    assert_eq!(typing.resolved(printed(&program, 1).id), Some(Type::Number));
}

#[test]
fn logical_operators_on_different_types_are_ambiguous_not_wrong() {
    let (_, typing) = check_ok("print true or 1;");
    assert_eq!(typing.ambiguities.len(), 1);
    assert_eq!(typing.ambiguities[0].solutions.len(), 2);
}

#[test]
fn logical_operators_on_one_type_are_resolved() {
    let (program, typing) = check_ok("print true and false;");
    assert!(typing.ambiguities.is_empty());
    assert_eq!(typing.resolved(printed(&program, 0).id), Some(Type::Bool));
}

#[test]
fn nil_is_compatible_with_everything() {
    check_ok("var a = nil; a = 1; a = \"s\"; print nil + 1;");
}

#[test]
fn assignment_unifies_with_the_declaration() {
    let typing = check_err("var a; a = 1; a = \"s\";");
    assert_eq!(typing.error_report(), "Number != String");
}

#[test]
fn anonymous_functions_bound_to_variables_are_generic() {
    check_ok(
        r#"
        var twice = fun (f, x) { return f(f(x)); };
        fun inc(n) { return n + 1; }
        fun shout(s) { return s + "!"; }
        print twice(inc, 1);
        print twice(shout, "hey");
        "#,
    );
}

#[test]
fn loops_and_jumps_check_their_parts() {
    check_ok(
        r#"
        for (var i = 0; i < 10; i = i + 1) {
          if (i == 5) break;
          if (i == 3) continue;
          print i;
        }
        while (false) print "never";
        "#,
    );
}

#[test]
fn natives_have_known_signatures() {
    let (program, typing) = check_ok("print clock(); randomSeed(4); print random() * 2;");
    assert_eq!(typing.resolved(printed(&program, 0).id), Some(Type::Number));
    check_err("randomSeed(\"x\");");
}

#[test]
fn every_expression_gets_a_type() {
    let (program, typing) = check_ok("fun f(a) { return -a * (a + 1); } print f(2) == 3 or !nil;");
    assert_eq!(typing.types.len() as u32, program.expr_count);
}

#[test]
fn undeclared_names_stop_the_checker() {
    let program = parse("print missing;");
    let error = check(&program).unwrap_err();
    assert!(matches!(error, CheckError::UnboundVariable { ref name, .. } if name == "missing"));
    assert_eq!(error.to_string(), "no binding for `missing` at 1:7");
}

#[test]
fn diagnostics_carry_codes_and_positions() {
    let typing = check_err("print 1;\nprint 1 + \"s\";\nprint true or 2;");
    let diagnostics = typing.diagnostics();
    let summary: Vec<(String, usize)> = diagnostics
        .iter()
        .map(|diag| (diag.code.clone(), diag.span.start.line))
        .collect();
    assert_eq!(
        summary,
        vec![("E3001".to_string(), 2), ("W3100".to_string(), 3)]
    );
    insta::assert_snapshot!(diagnostics[0].message, @"String != Number");
}
