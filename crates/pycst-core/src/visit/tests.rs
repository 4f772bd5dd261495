use super::*;
use crate::CstError;
use std::sync::Arc;

fn name(value: &str) -> Expression {
    Name::new(value).into()
}

fn line(statement: impl Into<SmallStatement>) -> Statement {
    SimpleStatementLine::new(vec![statement.into()]).into()
}

/// `a = b + c` followed by `print(a)`
fn sample() -> Module {
    let assign = Assign {
        targets: vec![AssignTarget {
            target: name("a"),
            whitespace_before_equal: Whitespace::space(),
            whitespace_after_equal: Whitespace::space(),
        }],
        value: BinaryOperation::new(name("b"), BinaryOperator::spaced(BinaryOp::Add), name("c"))
            .into(),
        semicolon: None,
    };
    let call = Call::new(name("print"), vec![Arg::new(name("a"))]);
    Module::new(vec![line(assign), line(Expr::new(call))])
}

#[derive(Default)]
struct Recorder {
    events: Vec<String>,
    skip_calls: bool,
}

impl Visitor for Recorder {
    fn on_visit(&mut self, node: NodeRef<'_>) -> bool {
        self.events.push(format!("visit {:?}", node.kind()));
        match node {
            NodeRef::Call(call) => self.visit_call(call),
            _ => true,
        }
    }

    fn on_leave(&mut self, node: NodeRef<'_>) {
        self.events.push(format!("leave {:?}", node.kind()));
    }

    fn visit_call(&mut self, _node: &Call) -> bool {
        !self.skip_calls
    }
}

#[test]
fn visits_in_source_order() {
    let mut recorder = Recorder::default();
    sample().visit(&mut recorder);
    let names: Vec<_> = recorder
        .events
        .iter()
        .filter(|e| e.starts_with("visit"))
        .map(String::as_str)
        .collect();
    assert_eq!(
        names,
        [
            "visit Module",
            "visit SimpleStatementLine",
            "visit Assign",
            "visit AssignTarget",
            "visit Name",
            "visit BinaryOperation",
            "visit Name",
            "visit Name",
            "visit SimpleStatementLine",
            "visit Expr",
            "visit Call",
            "visit Name",
            "visit Arg",
            "visit Name",
        ]
    );
    assert_eq!(recorder.events.last().map(String::as_str), Some("leave Module"));
}

#[test]
fn skipped_children_still_leave() {
    let mut recorder = Recorder {
        skip_calls: true,
        ..Recorder::default()
    };
    sample().visit(&mut recorder);
    let call = recorder
        .events
        .iter()
        .position(|e| e == "visit Call")
        .unwrap();
    assert_eq!(recorder.events[call + 1], "leave Call");
    assert!(!recorder.events.iter().any(|e| e == "visit Arg"));
}

#[derive(Default)]
struct Attributes(Vec<&'static str>);

impl Visitor for Attributes {
    fn on_visit_attribute(&mut self, node: NodeRef<'_>, attribute: &'static str) {
        if node.kind() == NodeKind::Assign {
            self.0.push(attribute);
        }
    }
}

#[test]
fn attribute_hooks_follow_field_order() {
    let mut attributes = Attributes::default();
    sample().visit(&mut attributes);
    assert_eq!(attributes.0, ["targets", "value", "semicolon"]);
}

struct Rename;

impl Transformer for Rename {
    fn leave_expression(
        &mut self,
        _original: &Expression,
        updated: Expression,
    ) -> Transformed<Expression> {
        match &updated {
            Expression::Name(node) if node.value == "a" => Transformed::Keep(name("renamed")),
            _ => Transformed::Keep(updated),
        }
    }
}

#[test]
fn transformer_replaces_expressions() {
    let original = sample();
    let updated = original.transform(&mut Rename).unwrap();
    assert_eq!(updated.code().unwrap(), "renamed = b + c\nprint(renamed)\n");
    assert_eq!(original.code().unwrap(), "a = b + c\nprint(a)\n");
}

struct DropCalls;

impl Transformer for DropCalls {
    fn leave_small_statement(
        &mut self,
        _original: &SmallStatement,
        updated: SmallStatement,
    ) -> Transformed<SmallStatement> {
        match &updated {
            SmallStatement::Expr(expr) if matches!(expr.value, Expression::Call(_)) => {
                Transformed::Remove
            }
            _ => Transformed::Keep(updated),
        }
    }
}

#[test]
fn emptied_line_disappears() {
    let updated = sample().transform(&mut DropCalls).unwrap();
    assert_eq!(updated.body.len(), 1);
    assert_eq!(updated.code().unwrap(), "a = b + c\n");
}

#[test]
fn emptied_block_is_rejected() {
    let function = FunctionDef {
        leading_lines: Vec::new(),
        decorators: Vec::new(),
        lines_after_decorators: Vec::new(),
        asynchronous: None,
        whitespace_after_def: Whitespace::space(),
        name: Name::new("f"),
        whitespace_after_name: Whitespace::empty(),
        whitespace_before_params: Whitespace::empty(),
        params: Parameters { params: Vec::new() },
        whitespace_before_close: Whitespace::empty(),
        returns: None,
        whitespace_before_colon: Whitespace::empty(),
        body: IndentedBlock::new(vec![line(Expr::new(Call::new(name("g"), Vec::new())))]).into(),
    };
    let module = Module::new(vec![function.into()]);
    assert_eq!(module.code().unwrap(), "def f():\n    g()\n");
    let err = module.transform(&mut DropCalls).unwrap_err();
    assert!(matches!(err, CstError::Structural { .. }));
}

struct DropValues;

impl Transformer for DropValues {
    fn leave_expression(
        &mut self,
        _original: &Expression,
        updated: Expression,
    ) -> Transformed<Expression> {
        match updated {
            Expression::BinaryOperation(_) => Transformed::Remove,
            other => Transformed::Keep(other),
        }
    }
}

#[test]
fn removing_a_required_field_fails() {
    let err = sample().transform(&mut DropValues).unwrap_err();
    assert!(matches!(err, CstError::Structural { .. }));
}

struct SkipAssignments;

impl Transformer for SkipAssignments {
    fn visit_assign(&mut self, _node: &Assign) -> bool {
        false
    }

    fn leave_expression(
        &mut self,
        _original: &Expression,
        _updated: Expression,
    ) -> Transformed<Expression> {
        Transformed::Keep(name("x"))
    }
}

#[test]
fn skipped_subtrees_are_shared() {
    let original = sample();
    let updated = original.transform(&mut SkipAssignments).unwrap();
    let (Statement::SimpleStatementLine(before), Statement::SimpleStatementLine(after)) =
        (&original.body[0], &updated.body[0])
    else {
        panic!("expected simple statement lines");
    };
    let (SmallStatement::Assign(before), SmallStatement::Assign(after)) =
        (&before.body[0], &after.body[0])
    else {
        panic!("expected assignments");
    };
    assert!(Arc::ptr_eq(before, after));
    assert_eq!(updated.code().unwrap(), "a = b + c\nx\n");
}

struct Duplicate;

impl Transformer for Duplicate {
    fn leave_statement(
        &mut self,
        _original: &Statement,
        updated: Statement,
    ) -> Transformed<Statement> {
        Transformed::Flatten(vec![updated.clone(), updated])
    }
}

#[test]
fn flatten_splices_siblings() {
    let module = Module::new(vec![line(Pass::default())]);
    let updated = module.transform(&mut Duplicate).unwrap();
    assert_eq!(updated.code().unwrap(), "pass\npass\n");
}

#[test]
fn visiting_leaves_the_tree_untouched() {
    let source = "def f(a, *b):\n    return [a for a in b]  # c\n";
    let module = crate::parse_module(source, None).unwrap();
    let before = module.clone();
    let mut recorder = Recorder::default();
    module.visit(&mut recorder);
    assert_eq!(module, before);
    assert!(recorder.events.len() > 2);
}

/// Renames through the generic hook alone.
struct RenameAny;

impl Transformer for RenameAny {
    fn on_leave(&mut self, _original: NodeRef<'_>, updated: AnyNode) -> Transformed<AnyNode> {
        match updated {
            AnyNode::Name(name) if name.value == "a" => Transformed::Keep(
                Name {
                    value: "renamed".into(),
                    ..name
                }
                .into(),
            ),
            other => Transformed::Keep(other),
        }
    }
}

#[test]
fn generic_leave_sees_every_node() {
    let updated = sample().transform(&mut RenameAny).unwrap();
    assert_eq!(updated.code().unwrap(), "renamed = b + c\nprint(renamed)\n");
}

/// Answers every node with a `pass`.
struct WrongKind;

impl Transformer for WrongKind {
    fn on_leave(&mut self, _original: NodeRef<'_>, _updated: AnyNode) -> Transformed<AnyNode> {
        Transformed::Keep(Pass::default().into())
    }
}

#[test]
fn replacement_must_keep_the_kind() {
    let err = sample().transform(&mut WrongKind).unwrap_err();
    assert_eq!(
        err,
        CstError::Structural {
            message: "Cannot replace a Name with a Pass.".to_string()
        }
    );
}

/// Drops the annotation of every parameter.
struct DropAnnotations;

impl Transformer for DropAnnotations {
    fn leave_annotation(
        &mut self,
        _original: &Annotation,
        _updated: Annotation,
    ) -> Transformed<Annotation> {
        Transformed::Remove
    }
}

#[test]
fn per_kind_hooks_reach_optional_fields() {
    let source = "def f(a: int, b: str = '') -> None:\n    pass\n";
    let module = crate::parse_module(source, None).unwrap();
    let updated = module.transform(&mut DropAnnotations).unwrap();
    assert_eq!(updated.code().unwrap(), "def f(a, b = ''):\n    pass\n");
}
