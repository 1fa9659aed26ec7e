use crate::parse;
use indoc::indoc;
use vibe_ast::{BinaryOp, Expression, Statement};

#[test]
fn statements_split_at_line_boundaries() {
    let program = parse(indoc! {"
        a = foo
        -bar
    "})
    .expect("parse failed");
    assert_eq!(program.statements().len(), 2);
    assert!(matches!(program.statements()[0], Statement::Assign { .. }));
    assert!(matches!(
        program.statements()[1],
        Statement::Expression(Expression::Unary { .. })
    ));
}

#[test]
fn operators_continue_across_lines_when_trailing() {
    let program = parse("x = 1 +\n  2").expect("parse failed");
    assert_eq!(program.statements().len(), 1);
    let Statement::Assign { value, .. } = &program.statements()[0] else {
        panic!("expected assignment");
    };
    assert!(matches!(
        value,
        Expression::Binary {
            op: BinaryOp::Add,
            ..
        }
    ));
}

#[test]
fn semicolons_separate_statements() {
    let program = parse("def loop_forever; while true; 1; end; end").expect("parse failed");
    assert_eq!(program.statements().len(), 1);
    let Statement::FunctionDecl(def) = &program.statements()[0] else {
        panic!("expected function definition");
    };
    assert_eq!(def.name, "loop_forever");
    assert!(matches!(def.body[0], Statement::While { .. }));
}

#[test]
fn function_with_typed_params_and_return() {
    let program = parse(indoc! {"
        def add(a : Integer, b : Integer = 2) : Integer
          a + b
        end
    "})
    .expect("parse failed");
    let Statement::FunctionDecl(def) = &program.statements()[0] else {
        panic!("expected function definition");
    };
    assert_eq!(def.params.len(), 2);
    assert!(def.params[0].type_annotation.is_some());
    assert!(def.params[1].default.is_some());
    assert!(def.return_type.is_some());
}

#[test]
fn setter_method_names_keep_the_equals() {
    let program = parse(indoc! {"
        class Account
          def balance=(value)
            @balance = value
          end
        end
    "})
    .expect("parse failed");
    let Statement::ClassDecl(class) = &program.statements()[0] else {
        panic!("expected class");
    };
    assert_eq!(class.methods[0].name, "balance=");
}

#[test]
fn class_bodies_split_members() {
    let program = parse(indoc! {"
        class Counter
          @@count = 0

          def initialize(start)
            @value = start
          end

          def self.reset
            @@count = 0
          end

          private def bump
            @value = @value + 1
          end
        end
    "})
    .expect("parse failed");
    let Statement::ClassDecl(class) = &program.statements()[0] else {
        panic!("expected class");
    };
    assert_eq!(class.class_vars.len(), 1);
    assert_eq!(class.methods.len(), 2);
    assert_eq!(class.class_methods.len(), 1);
    assert!(class.methods[1].private);
}

#[test]
fn member_call_with_block_and_no_parens() {
    let program = parse(indoc! {"
        rows.each do |row|
          total = total + row
        end
    "})
    .expect("parse failed");
    let Statement::Expression(Expression::Call(call)) = &program.statements()[0] else {
        panic!("expected call");
    };
    assert!(call.block.is_some());
    assert!(call.args.is_empty());
}

#[test]
fn keyword_arguments_parse_in_order() {
    let program = parse(r#"db.update("players", "p-1", name: "x", level: 3)"#).expect("parse failed");
    let Statement::Expression(Expression::Call(call)) = &program.statements()[0] else {
        panic!("expected call");
    };
    assert_eq!(call.args.len(), 2);
    assert_eq!(call.kwargs.len(), 2);
    assert_eq!(call.kwargs[0].0, "name");
}

#[test]
fn positional_after_keyword_rejected() {
    let err = parse("f(a: 1, 2)").unwrap_err();
    assert!(err.to_string().contains("positional argument"));
}

#[test]
fn fat_arrow_hash_keys_are_a_compile_error() {
    let err = parse(r#"{ "a" => 1 }"#).unwrap_err();
    assert!(err.to_string().contains("`name:` style"));
}

#[test]
fn rescue_union_types_and_binding() {
    let program = parse(indoc! {"
        try
          risky()
        rescue RuntimeError | AssertionError => e
          e
        ensure
          cleanup()
        end
    "})
    .expect("parse failed");
    let Statement::Try(stmt) = &program.statements()[0] else {
        panic!("expected try");
    };
    assert_eq!(stmt.rescues[0].types.len(), 2);
    assert_eq!(stmt.rescues[0].binding.as_deref(), Some("e"));
    assert!(stmt.ensure.is_some());
}

#[test]
fn unknown_rescue_type_rejected() {
    let err = parse("try\n  1\nrescue KeyError\n  2\nend").unwrap_err();
    assert!(err.to_string().contains("unknown rescue type"));
}

#[test]
fn case_when_with_multiple_values() {
    let program = parse(indoc! {r#"
        case status
        when :active, :trial then "ok"
        when :banned then "no"
        else "unknown"
        end
    "#})
    .expect("parse failed");
    let Statement::Expression(Expression::Case(case)) = &program.statements()[0] else {
        panic!("expected case");
    };
    assert_eq!(case.whens.len(), 2);
    assert_eq!(case.whens[0].values.len(), 2);
    assert!(case.else_body.is_some());
}

#[test]
fn require_with_alias() {
    let program = parse(r#"require "./util", as: :helpers"#).expect("parse failed");
    let Statement::Expression(Expression::Require { alias, .. }) = &program.statements()[0] else {
        panic!("expected require");
    };
    assert!(alias.is_some());
}

#[test]
fn ranges_parse_between_additive_and_comparison() {
    let program = parse("1 + 2..10").expect("parse failed");
    let Statement::Expression(Expression::Range { start, .. }) = &program.statements()[0] else {
        panic!("expected range, got {:?}", program.statements()[0]);
    };
    assert!(matches!(**start, Expression::Binary { .. }));
}
