use cosmic_core::{Location, Severity};
use cosmic_registry::Registry;
use cosmic_token::tokenize;

use crate::*;

fn analyze_with(content: &str, registry: &Registry, cursor: Option<usize>) -> SemanticInfo {
    let tokens = tokenize(content).expect("source should lex");
    let parse = cosmic_syntax::parse(tokens, content, true);

    let mut analyzer = SemanticAnalyzer::new(content, registry);
    if let Some(cursor) = cursor {
        analyzer = analyzer.with_cursor(cursor);
    }
    analyzer.analyze(&parse.ast, Location::new(0, content.len()))
}

fn analyze(content: &str) -> SemanticInfo {
    let registry = Registry::bundled().unwrap();
    analyze_with(content, &registry, None)
}

fn messages(info: &SemanticInfo) -> Vec<&str> {
    info.diagnostics
        .iter()
        .map(|diagnostic| diagnostic.message.as_str())
        .collect()
}

fn names(variables: &[&Variable]) -> Vec<String> {
    variables.iter().map(|var| var.name.clone()).collect()
}

#[test]
fn test_single_declaration() {
    let info = analyze("let x = 1");
    assert!(info.diagnostics.is_empty());

    let root = info.scopes.root();
    assert_eq!(root.location, Location::new(0, 9));
    assert_eq!(root.variables.len(), 1);
    assert_eq!(root.variables[0].name, "x");
    assert_eq!(root.variables[0].ty, Type::Int);
    assert_eq!(root.variables[0].location, Location::new(4, 5));
}

#[test]
fn test_completion_includes_nested_blocks() {
    let info = analyze("let x = 1; { let y = 2; }");
    let completions = info.completions_at(0);
    assert_eq!(names(&completions), ["x", "y"]);

    // from inside the block only the block's own names are offered
    let completions = info.completions_at(14);
    assert_eq!(names(&completions), ["y"]);
}

#[test]
fn test_member_access_on_registered_struct() {
    let registry = Registry::from_json(
        r#"{ "structs": [{ "name": "Foo", "members": [{ "name": "bar", "kind": "method" }] }] }"#,
    )
    .unwrap();
    let content = "let foo = Foo();\nfoo.";

    for cursor in [None, Some(content.len())] {
        let info = analyze_with(content, &registry, cursor);
        assert!(info.use_member);
        assert_eq!(info.members.len(), 1);
        assert_eq!(info.members[0].name, "bar");
        assert_eq!(info.members[0].kind, MemberKind::Method);
    }
}

#[test]
fn test_members_mirror_the_registry() {
    let info = analyze("let v = Vec2.zero();\nv.");
    let members = info
        .members
        .iter()
        .map(|member| format!("{:?} {}", member.kind, member.name))
        .collect::<Vec<_>>();

    insta::assert_yaml_snapshot!(members, @r###"
    - Property x
    - Property y
    - Method length
    - Method normalized
    - Method dot
    - StaticMethod zero
    "###);
}

#[test]
fn test_member_resolution_follows_the_cursor() {
    let registry = Registry::bundled().unwrap();
    let content = "let a = Vec2.zero(); let b = Color.rgb(1, 2, 3);";

    let info = analyze_with(content, &registry, Some(13));
    assert!(info.use_member);
    assert_eq!(info.members[0].name, "x");

    let info = analyze_with(content, &registry, None);
    assert_eq!(info.members[0].name, "r");

    let info = analyze_with(content, &registry, Some(0));
    assert!(!info.use_member);
    assert!(info.members.is_empty());
}

#[test]
fn test_plain_expressions_do_not_resolve_members() {
    let info = analyze("let a = 1 + 2;");
    assert!(!info.use_member);
    assert!(info.members.is_empty());
}

#[test]
fn test_document_struct_members() {
    let content = "struct Point { x: int, y: int }\nlet p = Point(1, 2);\np.x = 3;\np.";
    let info = analyze(content);

    assert!(messages(&info).is_empty(), "{:?}", messages(&info));
    assert!(info.use_member);
    assert_eq!(
        info.members,
        [Member::property("x", "int"), Member::property("y", "int")]
    );

    let info = analyze("struct Point { x: int, y: int }\nlet p = Point(1);");
    assert_eq!(messages(&info), ["expected 2 arguments, found 1"]);
}

#[test]
fn test_undeclared_identifier() {
    let info = analyze("let a = b;");
    assert_eq!(messages(&info), ["cannot find `b` in this scope"]);
    assert_eq!(info.diagnostics[0].location, Location::new(8, 9));
    assert_eq!(info.diagnostics[0].severity, Severity::Error);
}

#[test]
fn test_variables_are_not_visible_before_their_declaration() {
    let info = analyze("let a = a;");
    assert_eq!(messages(&info), ["cannot find `a` in this scope"]);
}

#[test]
fn test_redeclaration_in_the_same_scope() {
    let info = analyze("let a = 1; let a = 2;");
    assert_eq!(messages(&info), ["`a` is already declared in this scope"]);
    assert_eq!(info.diagnostics[0].location, Location::new(15, 16));
    assert_eq!(info.scopes.root().variables.len(), 2);

    // shadowing in a nested scope is fine
    let info = analyze("let a = 1; { let a = 'x'; }");
    assert!(info.diagnostics.is_empty());
}

#[test]
fn test_declared_type_mismatch() {
    let info = analyze(r#"let a: int = "s";"#);
    assert_eq!(messages(&info), ["mismatched types: expected `int`, found `string`"]);
    assert_eq!(info.diagnostics[0].location, Location::new(13, 16));

    assert!(analyze("let f: float = 1;").diagnostics.is_empty());
    assert!(analyze("let v: Vec2 = null;").diagnostics.is_empty());
    assert!(analyze("let xs: int[] = [];").diagnostics.is_empty());
}

#[test]
fn test_unknown_type_annotation() {
    let info = analyze("let a: Foo;");
    assert_eq!(messages(&info), ["unknown type `Foo`"]);
}

#[test]
fn test_operand_types() {
    let info = analyze("let a = 1 + true;");
    assert_eq!(messages(&info), ["cannot apply `+` to `int` and `bool`"]);

    let info = analyze("let b = !1;");
    assert_eq!(messages(&info), ["cannot apply unary `!` to `int`"]);

    assert!(analyze("let s = 'a' + 'b'; let f = 1 * 2.5; let c = f > 1 && s == 'ab';")
        .diagnostics
        .is_empty());
}

#[test]
fn test_inferred_types() {
    let info = analyze("let f = 1 * 2.5; let xs = [1, 2.5]; let s = str(f); let n = len(xs);");
    let types = info
        .scopes
        .root()
        .variables
        .iter()
        .map(|var| var.ty.to_string())
        .collect::<Vec<_>>();
    assert_eq!(types, ["float", "float[]", "string", "int"]);
}

#[test]
fn test_conditions_must_be_bool() {
    let info = analyze("if 1 { }");
    assert_eq!(messages(&info), ["mismatched types: expected `bool`, found `int`"]);

    let info = analyze("while 'yes' { }");
    assert_eq!(messages(&info), ["mismatched types: expected `bool`, found `string`"]);
}

#[test]
fn test_calls() {
    let prelude = "fn add(a: int, b: int) -> int { return a + b; }\n";

    let info = analyze(&format!("{prelude}add(1);"));
    assert_eq!(messages(&info), ["expected 2 arguments, found 1"]);

    let info = analyze(&format!("{prelude}add(1, 'x');"));
    assert_eq!(messages(&info), ["mismatched types: expected `int`, found `string`"]);

    let info = analyze("let n = 1; n();");
    assert_eq!(messages(&info), ["`int` is not callable"]);

    // variadic builtins take any number of arguments
    assert!(analyze("print(); print(1, 'a', [2]);").diagnostics.is_empty());
}

#[test]
fn test_functions_are_hoisted() {
    let info = analyze("let r = twice(2);\nfn twice(x: int) -> int { return x * 2; }");
    assert!(info.diagnostics.is_empty());
    assert_eq!(info.scopes.root().variables[0].name, "twice");
    assert_eq!(info.scopes.root().variables[1].ty, Type::Int);
}

#[test]
fn test_return_checks() {
    let info = analyze("return 1;");
    assert_eq!(messages(&info), ["`return` outside of a function"]);
    assert_eq!(info.diagnostics[0].location, Location::new(0, 6));

    let info = analyze("fn f() -> int { return 'no'; }");
    assert_eq!(messages(&info), ["mismatched types: expected `int`, found `string`"]);

    let info = analyze("fn f() -> int { return; }");
    assert_eq!(messages(&info), ["expected a value of type `int`"]);

    let info = analyze("fn f() -> void { return 1; }");
    assert_eq!(messages(&info), ["mismatched types: expected `void`, found `int`"]);
}

#[test]
fn test_jumps_outside_loops() {
    let info = analyze("break; continue;");
    assert_eq!(
        messages(&info),
        [
            "unreachable statement",
            "`break` outside of a loop",
            "`continue` outside of a loop"
        ]
    );

    let info = analyze("let i = 0; while i < 3 { i += 1; if i == 2 { break; } }");
    assert!(info.diagnostics.is_empty());

    // a function body is not part of the loop around it
    let info = analyze("while true { fn f() { break; } }");
    assert_eq!(messages(&info), ["`break` outside of a loop"]);
}

#[test]
fn test_unreachable_statements() {
    let content = "fn f() { return; let x = 1; print(x); }";
    let info = analyze(content);

    assert_eq!(messages(&info), ["unreachable statement"]);
    let diagnostic = &info.diagnostics[0];
    assert_eq!(diagnostic.severity, Severity::Warning);
    assert_eq!(diagnostic.location, Location::new(17, 37));
}

#[test]
fn test_unused_function_locals() {
    let info = analyze("fn f() { let unused = 1; let used = 2; let _skip = 3; print(used); }");
    assert_eq!(messages(&info), ["`unused` is never used"]);
    assert_eq!(info.diagnostics[0].severity, Severity::Hint);
}

#[test]
fn test_assignment_targets() {
    let info = analyze("fn f() {} f() = 1;");
    assert_eq!(messages(&info), ["invalid left-hand side of assignment"]);

    let info = analyze("print = 1;");
    assert_eq!(messages(&info), ["cannot assign to `print`"]);

    let info = analyze("let a = 1; a = 'x';");
    assert_eq!(messages(&info), ["mismatched types: expected `int`, found `string`"]);

    let info = analyze("let s = 'a'; s += 1;");
    assert_eq!(messages(&info), ["cannot apply `+` to `string` and `int`"]);
}

#[test]
fn test_unknown_members() {
    let info = analyze("let v = Vec2.zero(); v.w = 1;");
    assert_eq!(messages(&info), ["no member `w` on `Vec2`"]);

    let info = analyze("let n = 1; let m = n.x;");
    assert_eq!(messages(&info), ["`int` has no member `x`"]);
}

#[test]
fn test_for_loops() {
    let info = analyze("for item in [1, 2] { print(item); }");
    assert!(info.diagnostics.is_empty());

    let for_scope = info.scopes.get(info.scopes.root().children[0]);
    assert_eq!(for_scope.variables[0].name, "item");
    assert_eq!(for_scope.variables[0].ty, Type::Int);

    let info = analyze("for c in 5 { }");
    assert_eq!(messages(&info), ["`int` is not iterable"]);
}

#[test]
fn test_parse_errors_are_not_reported_again() {
    let info = analyze("let a = ; let b = a;");
    assert!(info.diagnostics.is_empty());
    assert_eq!(info.scopes.root().variables.len(), 2);
}

#[test]
fn test_hover() {
    let info = analyze("let x = 1; let y = x + 1;");
    assert_eq!(info.hover_at(19).unwrap().message, "```cosmic\nlet x: int\n```");
    assert_eq!(info.hover_at(15).unwrap().message, "```cosmic\nlet y: int\n```");
    assert!(info.hover_at(8).is_none());

    let info = analyze("print(1);");
    let message = &info.hover_at(0).unwrap().message;
    assert!(message.starts_with("```cosmic\nfn print(any...) -> void\n```"));
    assert!(message.ends_with("Writes its arguments to the console."));

    let info = analyze("let v = Vec2.zero();");
    let message = &info.hover_at(13).unwrap().message;
    assert!(message.contains("(static method) Vec2.zero() -> Vec2"));
}

#[test]
fn test_function_scopes() {
    let content = "let a = 1;\nfn f(p: int) {\n  if p > 1 { let b = p; print(b); } else { let c = 2; print(c); }\n}";
    let info = analyze(content);
    assert!(info.diagnostics.is_empty(), "{:?}", messages(&info));

    let function_scope = info.scopes.get(info.scopes.root().children[0]);
    assert_eq!(function_scope.location.start_byte, content.find("fn").unwrap());
    assert_eq!(function_scope.variables[0].name, "p");
    assert_eq!(function_scope.variables[0].kind, VariableKind::Parameter);
    assert_eq!(function_scope.children.len(), 2);

    let offset = content.find("let b").unwrap();
    assert_eq!(names(&info.completions_at(offset)), ["b"]);
    assert_eq!(info.scope_at(offset).variables[0].name, "b");
}

#[test]
fn test_scope_containment() {
    let content = "let a = 1;\nfn f(p: int) -> int {\n  for i in [1] { while i < p { { let deep = i; } break; } }\n  return p;\n}\nstruct S { v: float }\n{ let z = 0; }\nif true { } else if false { } else { }";
    let info = analyze(content);

    for (_, scope) in info.scopes.iter() {
        for child in scope.children.iter() {
            let child = info.scopes.get(*child);
            assert!(child.location.is_within(&scope.location));
        }

        for (index, first) in scope.children.iter().enumerate() {
            for second in scope.children.iter().skip(index + 1) {
                let first = info.scopes.get(*first).location;
                let second = info.scopes.get(*second).location;
                assert!(!first.overlaps(&second), "{first:?} overlaps {second:?}");
            }
        }
    }

    for offset in 0..content.len() {
        let scope = info.scope_at(offset);
        assert!(scope.location.covers(offset) || scope.location == info.scopes.root().location);
    }
}

#[test]
fn test_analysis_is_deterministic() {
    let content = "struct P { x: int }\nfn f(p: P) -> int { return p.x; }\nlet q = P(1);\nlet r = f(q) + undefined;\nq.";
    assert_eq!(analyze(content), analyze(content));
}

#[test]
fn test_analyzer_can_be_reused() {
    let registry = Registry::bundled().unwrap();
    let first = "let a = b;";
    let second = "let a = 1;";

    let mut analyzer = SemanticAnalyzer::new(first, &registry);
    let ast = cosmic_syntax::parse(tokenize(first).unwrap(), first, true).ast;
    let scopes = analyzer.traverse(&ast, Scope::new(Location::new(0, first.len())));
    assert_eq!(analyzer.diagnostics().len(), 1);
    assert_eq!(scopes.root().variables.len(), 1);

    let mut analyzer = SemanticAnalyzer::new(second, &registry);
    let ast = cosmic_syntax::parse(tokenize(second).unwrap(), second, true).ast;
    analyzer.traverse(&ast, Scope::new(Location::new(0, second.len())));
    assert!(analyzer.diagnostics().is_empty());
    assert!(analyzer.hoverables().len() == 1);
    assert!(!analyzer.use_member());
    assert!(analyzer.members().is_empty());
}

#[test]
fn test_long_chains_are_analyzed_without_overflow() {
    let info = analyze(&format!("let x = 1{};", "+1".repeat(100_000)));
    assert_eq!(info.scopes.root().variables[0].name, "x");

    let info = analyze(&format!("let a = Vec2.zero();\na{} = 1;", ".x".repeat(100_000)));
    assert_eq!(info.scopes.root().variables[0].name, "a");

    let info = analyze(&format!("if true {{ }}{}", " else if true { }".repeat(50_000)));
    assert!(!info.scopes.root().children.is_empty());
    assert!(info.diagnostics.iter().all(|diagnostic| !diagnostic.is_error()));
}

#[test]
fn test_chains_below_the_limit_are_checked() {
    let info = analyze(&format!("let x = 1{};\nlet y: bool = x;", "+1".repeat(100)));
    assert_eq!(messages(&info), ["mismatched types: expected `bool`, found `int`"]);
}

#[test]
fn test_structs_are_scoped_to_their_block() {
    let content = "{ struct P { x: int } let p = P(1); p.x = 2; }\n{ struct P { y: string } let q = P('a'); q.y = 'b'; }\nlet r: P = null;";
    let info = analyze(content);
    assert_eq!(messages(&info), ["unknown type `P`"]);

    let info = analyze("{ struct P { x: int } }\nlet p = P(1);");
    assert_eq!(messages(&info), ["cannot find `P` in this scope"]);
}
