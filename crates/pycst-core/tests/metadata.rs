//! A lint-style visitor reading positions and parents through a wrapper.

use pycst_core::nodes::*;
use pycst_core::{
    CodePosition, CstError, CstNode, Dependencies, MetadataDependent, MetadataErrorKind,
    MetadataScope, MetadataWrapper, NodeKind, ParentNodeProvider, PositionProvider, Visitor,
    parse_module,
};

/// Reports every call to `print` with its position and enclosing node kind.
struct PrintCalls {
    metadata: MetadataScope,
    found: Vec<(CodePosition, NodeKind)>,
}

impl PrintCalls {
    fn new() -> Self {
        Self {
            metadata: MetadataScope::unresolved(Self::dependencies()),
            found: Vec::new(),
        }
    }
}

impl MetadataDependent for PrintCalls {
    fn dependencies() -> Dependencies {
        Dependencies::new()
            .with::<PositionProvider>()
            .with::<ParentNodeProvider>()
    }

    fn metadata_mut(&mut self) -> &mut MetadataScope {
        &mut self.metadata
    }

    fn metadata(&self) -> &MetadataScope {
        &self.metadata
    }
}

impl Visitor for PrintCalls {
    fn visit_call(&mut self, node: &Call) -> bool {
        if matches!(&node.func, Expression::Name(name) if name.value == "print") {
            let range = self.metadata.get::<PositionProvider>(node.node_id());
            let parent = self.metadata.get::<ParentNodeProvider>(node.node_id());
            if let (Ok(range), Ok(parent)) = (range, parent) {
                self.found.push((range.start, parent.kind));
            }
        }
        true
    }
}

const SOURCE: &str = "\
def report(items):
    for item in items:
        print(item)
    return [print(i) for i in items]


print('done')
";

#[test]
fn lint_finds_calls_with_positions() {
    let wrapper = MetadataWrapper::new(&parse_module(SOURCE, None).unwrap()).unwrap();
    let mut lint = PrintCalls::new();
    wrapper.visit(&mut lint).unwrap();
    assert_eq!(
        lint.found,
        [
            (CodePosition::new(3, 8), NodeKind::Expr),
            (CodePosition::new(4, 12), NodeKind::ListComp),
            (CodePosition::new(7, 0), NodeKind::Expr),
        ]
    );
}

#[test]
fn positions_cover_whole_statements() {
    let wrapper = MetadataWrapper::new(&parse_module(SOURCE, None).unwrap()).unwrap();
    let positions = wrapper.resolve::<PositionProvider>().unwrap();
    let Statement::FunctionDef(def) = &wrapper.module().body[0] else {
        panic!("expected a function");
    };
    let range = positions.cell(def.node_id()).unwrap().get().unwrap();
    assert_eq!(range.start, CodePosition::new(1, 0));
    assert_eq!(range.end.line, 5);
}

#[test]
fn wrapper_results_are_shared_between_walks() {
    let wrapper = MetadataWrapper::new(&parse_module(SOURCE, None).unwrap()).unwrap();
    let first = wrapper.resolve::<ParentNodeProvider>().unwrap();
    let mut lint = PrintCalls::new();
    wrapper.visit(&mut lint).unwrap();
    let second = wrapper.resolve::<ParentNodeProvider>().unwrap();
    assert!(std::rc::Rc::ptr_eq(&first, &second));
}

#[test]
fn reading_undeclared_metadata_fails() {
    let module = parse_module("x\n", None).unwrap();
    let scope = MetadataScope::unresolved(Dependencies::new().with::<ParentNodeProvider>());
    let err = scope.get::<PositionProvider>(module.node_id()).unwrap_err();
    assert!(matches!(
        err,
        CstError::Metadata {
            kind: MetadataErrorKind::UndeclaredDependency,
            ..
        }
    ));
}
