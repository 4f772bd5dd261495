use super::*;
use crate::codegen::{Codegen, CodegenState};
use crate::CstError;
use crate::visit::CstNode;

fn render(node: &impl Codegen) -> String {
    let mut state = CodegenState::new("    ", "\n");
    node.codegen(&mut state);
    state.finish()
}

fn name(value: &str) -> Expression {
    Name::new(value).into()
}

#[test]
fn parens_must_balance() {
    let unbalanced = Name {
        lpar: vec![LeftParen::default()],
        value: "a".into(),
        rpar: Vec::new(),
    };
    let err = unbalanced.validate().unwrap_err();
    assert!(matches!(err, CstError::Structural { .. }));
    assert_eq!(
        err.to_string(),
        "Cannot have left paren without right paren."
    );
}

#[test]
fn parenthesized_binary_operation() {
    let sum: Expression = BinaryOperation::new(
        name("a"),
        BinaryOperator::spaced(BinaryOp::Add),
        name("b"),
    )
    .into();
    let sum = sum
        .parenthesize(LeftParen::default(), RightParen::default())
        .unwrap();
    assert!(sum.validate().is_ok());
    assert_eq!(render(&sum), "(a + b)");
}

#[test]
fn with_changes_validates() {
    let attribute = Attribute::new(name("os"), "path");
    assert_eq!(render(&attribute), "os.path");

    let renamed = attribute
        .with_changes(|a| a.attr = Name::new("sep"))
        .unwrap();
    assert_eq!(render(&renamed), "os.sep");
    assert_eq!(render(&attribute), "os.path");

    let broken = attribute.with_changes(|a| a.attr = Name::new("not a name"));
    assert!(broken.is_err());
}

#[test]
fn keyword_needs_space_before_bare_name() {
    let statement = Return {
        whitespace_after_return: Whitespace::empty(),
        value: Some(name("x")),
        semicolon: None,
    };
    assert!(statement.validate().is_err());

    let parenthesized = Return {
        whitespace_after_return: Whitespace::empty(),
        value: Some(
            name("x")
                .parenthesize(LeftParen::default(), RightParen::default())
                .unwrap(),
        ),
        semicolon: None,
    };
    assert!(parenthesized.validate().is_ok());
    assert_eq!(render(&parenthesized), "return(x)");
}

#[test]
fn bare_star_needs_a_following_parameter() {
    let params = Parameters {
        params: vec![Param {
            kind: ParamKind::Star,
            name: None,
            ..Param::new("unused")
        }],
    };
    assert!(params.validate().is_err());
}

#[test]
fn empty_tuple_renders_parens() {
    let empty = Tuple {
        lpar: vec![LeftParen::default()],
        elements: Vec::new(),
        rpar: vec![RightParen::default()],
    };
    assert_eq!(render(&empty), "()");

    let bare = Tuple {
        lpar: Vec::new(),
        elements: Vec::new(),
        rpar: Vec::new(),
    };
    assert!(bare.validate().is_err());
}

#[test]
fn statements_render_with_block_indent() {
    let line = SimpleStatementLine::new(vec![Pass::default().into()]);
    let body = IndentedBlock::new(vec![line.into()]);
    let mut state = CodegenState::new("  ", "\r\n");
    body.codegen(&mut state);
    assert_eq!(state.finish(), "\r\n  pass\r\n");
}

#[test]
fn semicolons_join_small_statements() {
    let line = SimpleStatementLine::new(vec![
        Expr {
            value: name("a"),
            semicolon: Some(Semicolon::spaced_after()),
        }
        .into(),
        Expr::new(name("b")).into(),
    ]);
    assert!(line.validate().is_ok());
    assert_eq!(render(&line), "a; b\n");

    let missing = SimpleStatementLine::new(vec![
        Expr::new(name("a")).into(),
        Expr::new(name("b")).into(),
    ]);
    assert!(missing.validate().is_err());
}

#[test]
fn module_code_uses_its_defaults() {
    let module = Module {
        default_newline: "\r\n".into(),
        ..Module::new(vec![
            SimpleStatementLine::new(vec![Expr::new(name("x")).into()]).into(),
        ])
    };
    assert_eq!(module.code().unwrap(), "x\r\n");

    let unterminated = Module {
        has_trailing_newline: false,
        ..module.clone()
    };
    assert_eq!(unterminated.code().unwrap(), "x");
}

fn sum_with_parens(lpar: Vec<LeftParen>, rpar: Vec<RightParen>) -> BinaryOperation {
    BinaryOperation {
        lpar,
        rpar,
        ..BinaryOperation::new(name("a"), BinaryOperator::spaced(BinaryOp::Add), name("b"))
    }
}

#[test]
fn unbalanced_nodes_are_never_rendered() {
    let open_only = sum_with_parens(vec![LeftParen::default()], Vec::new());
    let module = Module::new(vec![
        SimpleStatementLine::new(vec![Expr::new(open_only.clone()).into()]).into(),
    ]);
    let err = module.code().unwrap_err();
    assert_eq!(
        err,
        CstError::Structural {
            message: "Cannot have left paren without right paren.".to_string()
        }
    );
    assert!(module.bytes().is_err());
    assert!(module.code_for_node(open_only.node_ref()).is_err());

    let balanced = sum_with_parens(vec![LeftParen::default()], vec![RightParen::default()]);
    let module = Module::new(vec![
        SimpleStatementLine::new(vec![Expr::new(balanced.clone()).into()]).into(),
    ]);
    assert_eq!(module.code().unwrap(), "(a + b)\n");
    assert_eq!(module.code_for_node(balanced.node_ref()).unwrap(), "(a + b)");
}

#[test]
fn parenthesize_checks_the_wrapped_node() {
    let broken: Expression = sum_with_parens(Vec::new(), vec![RightParen::default()]).into();
    let err = broken
        .parenthesize(LeftParen::default(), RightParen::default())
        .unwrap_err();
    assert_eq!(err.to_string(), "Cannot have unbalanced parens.");
}
