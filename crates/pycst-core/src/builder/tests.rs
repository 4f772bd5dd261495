use crate::error::SyntaxErrorKind;
use crate::nodes::*;
use crate::{parse_expression, parse_module, parse_statement};

fn expression(source: &str) -> Expression {
    parse_expression(source, None).unwrap()
}

fn statement(source: &str) -> Statement {
    parse_statement(source, None).unwrap()
}

fn small(source: &str) -> SmallStatement {
    match statement(source) {
        Statement::SimpleStatementLine(line) => line.body[0].clone(),
        other => panic!("expected a simple statement, got {other:?}"),
    }
}

/// Message and location of a conversion error.
fn conversion_error(source: &str) -> (String, usize, usize) {
    let err = parse_module(source, None).unwrap_err();
    let err = err.as_syntax().unwrap();
    assert_eq!(err.kind, SyntaxErrorKind::Conversion, "{}", err.message);
    (err.message.clone(), err.line, err.raw_column)
}

#[test]
fn number_literals() {
    assert!(matches!(expression("0x_1f"), Expression::Integer(_)));
    assert!(matches!(expression("1_000"), Expression::Integer(_)));
    assert!(matches!(expression("1.5"), Expression::Float(_)));
    assert!(matches!(expression("1e9"), Expression::Float(_)));
    assert!(matches!(expression("2J"), Expression::Imaginary(_)));
}

#[test]
fn adjacent_strings_concatenate() {
    let Expression::ConcatenatedString(strings) = expression("'a'  \"b\" f'c'") else {
        panic!("expected a concatenated string");
    };
    assert_eq!(strings.left, "'a'");
    let parts: Vec<_> = strings
        .parts
        .iter()
        .map(|p| (p.whitespace_before.0.as_str(), p.value.as_str()))
        .collect();
    assert_eq!(parts, [("  ", "\"b\""), (" ", "f'c'")]);
}

#[test]
fn parentheses_attach_to_the_inner_expression() {
    let Expression::Name(name) = expression("(( x ))") else {
        panic!("expected a name");
    };
    assert_eq!(name.lpar.len(), 2);
    assert_eq!(name.lpar[1].whitespace_after.0, " ");
    assert_eq!(name.rpar[0].whitespace_before.0, " ");
    assert!(matches!(expression("()"), Expression::Tuple(t) if t.elements.is_empty()));
    assert!(matches!(expression("(1,)"), Expression::Tuple(t) if t.elements.len() == 1));
}

#[test]
fn brackets_and_braces() {
    assert!(matches!(expression("[]"), Expression::List(_)));
    assert!(matches!(expression("[x for x in y]"), Expression::ListComp(_)));
    assert!(matches!(expression("{}"), Expression::Dict(_)));
    assert!(matches!(expression("{1}"), Expression::Set(_)));
    assert!(matches!(expression("{*a, b}"), Expression::Set(_)));
    assert!(matches!(expression("{x for x in y}"), Expression::SetComp(_)));
    assert!(matches!(expression("{k: v for k, v in y}"), Expression::DictComp(_)));

    let Expression::Dict(dict) = expression("{**a, 'b': 1,}") else {
        panic!("expected a dict");
    };
    assert!(dict.elements[0].key.is_none());
    assert!(dict.elements[1].key.is_some());
    assert!(dict.elements[1].comma.is_some());
}

#[test]
fn comparison_chains_keep_two_word_operators() {
    let Expression::Comparison(comparison) = expression("a < b not  in c is not d") else {
        panic!("expected a comparison");
    };
    let ops: Vec<_> = comparison
        .comparisons
        .iter()
        .map(|t| (t.operator.kind, t.operator.whitespace_between.0.as_str()))
        .collect();
    assert_eq!(
        ops,
        [(CompOp::LessThan, ""), (CompOp::NotIn, "  "), (CompOp::IsNot, " ")]
    );
}

#[test]
fn operators_nest_by_precedence() {
    let Expression::BooleanOperation(or) = expression("a or not b and c") else {
        panic!("expected a boolean operation");
    };
    assert_eq!(or.operator.kind, BooleanOp::Or);
    let Expression::BooleanOperation(and) = &or.right else {
        panic!("expected 'and' on the right");
    };
    assert!(matches!(&and.left, Expression::UnaryOperation(u) if u.operator.kind == UnaryOp::Not));

    let Expression::UnaryOperation(minus) = expression("-2 ** -x") else {
        panic!("'**' binds tighter than a leading minus");
    };
    let Expression::BinaryOperation(power) = &minus.expression else {
        panic!("expected a power");
    };
    assert_eq!(power.operator.kind, BinaryOp::Power);
    assert!(matches!(&power.right, Expression::UnaryOperation(_)));
}

#[test]
fn trailers_apply_left_to_right() {
    let Expression::Call(call) = expression("a.b[1:2, ::3](x, *y, k=1, **z)") else {
        panic!("expected a call");
    };
    let stars: Vec<_> = call.args.iter().map(|a| a.star).collect();
    assert_eq!(stars, [None, Some(ArgStar::Star), None, Some(ArgStar::DoubleStar)]);
    assert_eq!(call.args[2].keyword.as_ref().unwrap().value, "k");

    let Expression::Subscript(subscript) = &call.func else {
        panic!("expected a subscript");
    };
    assert!(matches!(&subscript.value, Expression::Attribute(_)));
    let BaseSlice::Slice(step) = &subscript.slice[1].slice else {
        panic!("expected a slice");
    };
    assert!(step.lower.is_none() && step.upper.is_none());
    assert!(step.whitespace_before_step_colon.is_some());
    assert!(step.step.is_some());
}

#[test]
fn bare_generator_argument() {
    let Expression::Call(call) = expression("f(x for x in y)") else {
        panic!("expected a call");
    };
    let Expression::GeneratorExp(generator) = &call.args[0].value else {
        panic!("expected a generator");
    };
    assert!(generator.lpar.is_empty());
    let nested = expression("(x for x in y if x if y)");
    assert!(matches!(nested, Expression::GeneratorExp(g) if g.for_in.ifs.len() == 2));
}

#[test]
fn lambda_and_conditional() {
    let Expression::Lambda(lambda) = expression("lambda x, *, y=1: x") else {
        panic!("expected a lambda");
    };
    let kinds: Vec<_> = lambda.params.params.iter().map(|p| p.kind).collect();
    assert_eq!(kinds, [ParamKind::Regular, ParamKind::Star, ParamKind::Regular]);
    assert!(lambda.params.params[2].default.is_some());

    let Expression::Lambda(empty) = expression("lambda: 0") else {
        panic!("expected a lambda");
    };
    assert!(empty.params.params.is_empty());
    assert!(matches!(expression("a if b else c"), Expression::IfExp(_)));
}

#[test]
fn yields_and_awaits() {
    let Statement::FunctionDef(def) = statement("async def f():\n    await x\n    yield from y\n")
    else {
        panic!("expected a function");
    };
    assert!(def.asynchronous.is_some());
    let Suite::IndentedBlock(block) = &def.body else {
        panic!("expected a block");
    };
    let lines: Vec<_> = block
        .body
        .iter()
        .map(|s| match s {
            Statement::SimpleStatementLine(line) => match &line.body[0] {
                SmallStatement::Expr(expr) => expr.value.clone(),
                other => panic!("unexpected {other:?}"),
            },
            other => panic!("unexpected {other:?}"),
        })
        .collect();
    assert!(matches!(&lines[0], Expression::Await(_)));
    let Expression::Yield(yielded) = &lines[1] else {
        panic!("expected a yield");
    };
    assert!(matches!(yielded.value, Some(YieldValue::From(_))));
}

#[test]
fn assignment_forms() {
    let SmallStatement::Assign(assign) = small("a = b = 1\n") else {
        panic!("expected an assignment");
    };
    assert_eq!(assign.targets.len(), 2);
    assert!(matches!(small("x += 1\n"), SmallStatement::AugAssign(_)));
    assert!(matches!(small("x: int = 1\n"), SmallStatement::AnnAssign(a) if a.value.is_some()));
    assert!(matches!(small("x: int\n"), SmallStatement::AnnAssign(a) if a.value.is_none()));
    assert!(matches!(small("x\n"), SmallStatement::Expr(_)));
}

#[test]
fn import_forms() {
    let SmallStatement::ImportFrom(import) = small("from ..pkg import (a as b, c,)\n") else {
        panic!("expected a from-import");
    };
    assert_eq!(import.relative.len(), 2);
    assert!(import.lpar.is_some());
    let ImportNames::Aliases(aliases) = &import.names else {
        panic!("expected aliases");
    };
    assert_eq!(aliases.len(), 2);
    assert!(aliases[0].asname.is_some());

    let star = small("from . import *\n");
    assert!(matches!(star, SmallStatement::ImportFrom(i) if i.module.is_none()));
    let SmallStatement::Import(import) = small("import a.b as c, d\n") else {
        panic!("expected an import");
    };
    assert!(matches!(import.names[0].name, Expression::Attribute(_)));
}

#[test]
fn if_chains_nest_elif_clauses() {
    let Statement::If(first) = statement("if a:\n    pass\nelif b:\n    pass\nelse:\n    pass\n")
    else {
        panic!("expected an if");
    };
    let Some(OrElse::Elif(second)) = &first.orelse else {
        panic!("expected an elif");
    };
    assert!(matches!(second.orelse, Some(OrElse::Else(_))));
}

#[test]
fn block_footer_and_module_header() {
    let source = "# header\n\nif x:\n    pass\n    # inside\n# outside\n";
    let module = parse_module(source, None).unwrap();
    assert_eq!(module.header.len(), 2);
    let Statement::If(if_stmt) = &module.body[0] else {
        panic!("expected an if");
    };
    let Suite::IndentedBlock(block) = &if_stmt.body else {
        panic!("expected a block");
    };
    assert_eq!(block.footer.len(), 1);
    assert!(block.footer[0].indent);
    assert_eq!(module.footer.len(), 1);
    assert_eq!(module.code().unwrap(), source);
}

#[test]
fn odd_indentation_is_kept_per_block() {
    let source = "if x:\n  if y:\n        pass\n";
    let module = parse_module(source, None).unwrap();
    assert_eq!(module.default_indent, "  ");
    let Statement::If(outer) = &module.body[0] else {
        panic!("expected an if");
    };
    let Suite::IndentedBlock(block) = &outer.body else {
        panic!("expected a block");
    };
    assert_eq!(block.indent, None);
    let Statement::If(inner) = &block.body[0] else {
        panic!("expected an if");
    };
    let Suite::IndentedBlock(inner_block) = &inner.body else {
        panic!("expected a block");
    };
    assert_eq!(inner_block.indent.as_deref(), Some("      "));
    assert_eq!(module.code().unwrap(), source);
}

#[test]
fn decorated_definitions() {
    let Statement::ClassDef(class) = statement("@a\n@b.c(1)\nclass C(B, metaclass=M):\n    pass\n")
    else {
        panic!("expected a class");
    };
    assert_eq!(class.decorators.len(), 2);
    assert_eq!(class.args.len(), 2);
}

#[test]
fn argument_order_errors() {
    assert_eq!(
        conversion_error("f(**k, a)\n").0,
        "Positional argument follows keyword argument unpacking."
    );
    assert_eq!(
        conversion_error("f(**k, *a)\n").0,
        "Iterable argument unpacking follows keyword argument unpacking."
    );
    assert_eq!(
        conversion_error("f(x for x in y, 1)\n").0,
        "Generator expression must be parenthesized"
    );
    assert_eq!(
        conversion_error("f(a.b=1)\n").0,
        "Keyword argument must be a plain name."
    );
}

#[test]
fn parameter_order_errors() {
    assert_eq!(
        conversion_error("def fn(first=None, second): ...\n"),
        (
            "Cannot have a non-default argument following a default argument.".to_string(),
            1,
            19
        )
    );
    assert_eq!(
        conversion_error("def f(a, *): pass\n").0,
        "Named (keyword) arguments must follow bare *."
    );
    assert_eq!(
        conversion_error("lambda **k, a: 0\n").0,
        "Arguments cannot follow var-keyword argument."
    );
}

#[test]
fn display_errors() {
    assert_eq!(
        conversion_error("{**a for a in b}\n").0,
        "dict unpacking cannot be used in dict comprehension"
    );
    assert_eq!(
        conversion_error("from a import b,\n").0,
        "trailing comma not allowed without surrounding parentheses"
    );
}
