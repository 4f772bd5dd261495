use super::*;
use crate::codegen::{CodePosition, CodeRange};
use crate::nodes::*;
use crate::parse_module;
use crate::visit::{CstNode, Visitor};
use std::cell::Cell;

thread_local! {
    static COMPUTED: Cell<usize> = const { Cell::new(0) };
    static EVALUATED: Cell<usize> = const { Cell::new(0) };
}

/// Counts its own runs and defers a per-node value that counts its
/// evaluations.
struct CountingProvider;

impl MetadataProvider for CountingProvider {
    type Value = usize;

    const NAME: &'static str = "CountingProvider";

    fn dependencies() -> Dependencies {
        Dependencies::new().with::<PositionProvider>()
    }

    fn compute(module: &Module, metadata: &MetadataScope) -> Result<ProviderData<usize>> {
        COMPUTED.with(|c| c.set(c.get() + 1));
        let range = metadata.get::<PositionProvider>(module.node_id())?;
        let mut data = ProviderData::new();
        data.insert_deferred(module.node_id(), move || {
            EVALUATED.with(|c| c.set(c.get() + 1));
            range.end.line
        });
        Ok(data)
    }
}

struct Ouroboros;

impl MetadataProvider for Ouroboros {
    type Value = ();

    const NAME: &'static str = "Ouroboros";

    fn dependencies() -> Dependencies {
        Dependencies::new().with::<Tail>()
    }

    fn compute(_module: &Module, _metadata: &MetadataScope) -> Result<ProviderData<()>> {
        Ok(ProviderData::new())
    }
}

struct Tail;

impl MetadataProvider for Tail {
    type Value = ();

    const NAME: &'static str = "Tail";

    fn dependencies() -> Dependencies {
        Dependencies::new().with::<Ouroboros>()
    }

    fn compute(_module: &Module, _metadata: &MetadataScope) -> Result<ProviderData<()>> {
        Ok(ProviderData::new())
    }
}

/// Records the context and position of every name.
struct NameReport {
    metadata: MetadataScope,
    names: Vec<(String, ExpressionContext, CodeRange)>,
    errors: Vec<CstError>,
}

impl NameReport {
    fn new() -> Self {
        Self {
            metadata: MetadataScope::unresolved(Self::dependencies()),
            names: Vec::new(),
            errors: Vec::new(),
        }
    }
}

impl MetadataDependent for NameReport {
    fn dependencies() -> Dependencies {
        Dependencies::new()
            .with::<ExpressionContextProvider>()
            .with::<PositionProvider>()
    }

    fn metadata_mut(&mut self) -> &mut MetadataScope {
        &mut self.metadata
    }

    fn metadata(&self) -> &MetadataScope {
        &self.metadata
    }
}

impl Visitor for NameReport {
    fn visit_name(&mut self, node: &Name) -> bool {
        let context = self.metadata.get::<ExpressionContextProvider>(node.node_id());
        let range = self.metadata.get::<PositionProvider>(node.node_id());
        match (context, range) {
            (Ok(context), Ok(range)) => self.names.push((node.value.clone(), context, range)),
            (Err(err), _) | (_, Err(err)) => self.errors.push(err),
        }
        true
    }
}

fn contexts(source: &str) -> Vec<(String, ExpressionContext)> {
    let wrapper = MetadataWrapper::new(&parse_module(source, None).unwrap()).unwrap();
    let mut report = NameReport::new();
    wrapper.visit(&mut report).unwrap();
    assert!(report.errors.is_empty(), "{:?}", report.errors);
    report
        .names
        .into_iter()
        .map(|(name, context, _)| (name, context))
        .collect()
}

fn pairs(items: &[(&str, ExpressionContext)]) -> Vec<(String, ExpressionContext)> {
    items.iter().map(|(n, c)| (n.to_string(), *c)).collect()
}

#[test]
fn providers_run_once_per_wrapper() {
    COMPUTED.with(|c| c.set(0));
    EVALUATED.with(|c| c.set(0));
    let wrapper = MetadataWrapper::new(&parse_module("x = 1\ny = 2\n", None).unwrap()).unwrap();
    let root = wrapper.module().node_id();

    let first = wrapper.resolve::<CountingProvider>().unwrap();
    let second = wrapper.resolve::<CountingProvider>().unwrap();
    assert_eq!(COMPUTED.with(Cell::get), 1);

    assert_eq!(EVALUATED.with(Cell::get), 0);
    assert_eq!(first.cell(root).unwrap().get().unwrap(), 3);
    assert_eq!(second.cell(root).unwrap().get().unwrap(), 3);
    assert_eq!(EVALUATED.with(Cell::get), 1);
}

#[test]
fn cyclic_providers_are_rejected() {
    let wrapper = MetadataWrapper::new(&Module::default()).unwrap();
    let err = wrapper.resolve::<Ouroboros>().unwrap_err();
    assert!(matches!(
        err,
        CstError::Metadata {
            kind: MetadataErrorKind::CyclicDependency,
            ..
        }
    ));
}

#[test]
fn undeclared_and_unresolved_access_fail_differently() {
    let module = parse_module("x\n", None).unwrap();
    let scope = MetadataScope::unresolved(Dependencies::new().with::<PositionProvider>());

    let err = scope.get::<ParentNodeProvider>(module.node_id()).unwrap_err();
    assert!(matches!(
        err,
        CstError::Metadata {
            kind: MetadataErrorKind::UndeclaredDependency,
            ..
        }
    ));
    let err = scope.get::<PositionProvider>(module.node_id()).unwrap_err();
    assert!(matches!(
        err,
        CstError::Metadata {
            kind: MetadataErrorKind::Unresolved,
            ..
        }
    ));
}

#[test]
fn plain_visit_leaves_metadata_unresolved() {
    let module = parse_module("x\n", None).unwrap();
    let mut report = NameReport::new();
    module.visit(&mut report);
    assert!(report.names.is_empty());
    assert!(matches!(
        report.errors.as_slice(),
        [CstError::Metadata {
            kind: MetadataErrorKind::Unresolved,
            ..
        }]
    ));
}

#[test]
fn scope_is_cleared_after_a_walk() {
    let wrapper = MetadataWrapper::new(&parse_module("x\n", None).unwrap()).unwrap();
    let mut report = NameReport::new();
    wrapper.visit(&mut report).unwrap();
    assert_eq!(report.names.len(), 1);
    assert!(!report.metadata().is_resolved());
}

#[test]
fn deferred_cell_evaluates_once() {
    let runs = std::rc::Rc::new(Cell::new(0));
    let counter = std::rc::Rc::clone(&runs);
    let cell = MetadataCell::deferred(move || {
        counter.set(counter.get() + 1);
        "value"
    });
    assert!(!cell.is_cached());
    assert_eq!(cell.get().unwrap(), "value");
    assert_eq!(cell.get().unwrap(), "value");
    assert!(cell.is_cached());
    assert_eq!(runs.get(), 1);
}

#[test]
fn dependency_sets_union_without_duplicates() {
    let left = Dependencies::new().with::<PositionProvider>();
    let right = Dependencies::new()
        .with::<PositionProvider>()
        .with::<ParentNodeProvider>();
    let union = left.union(&right);
    let names: Vec<_> = union.iter().map(ProviderKey::name).collect();
    assert_eq!(names, ["PositionProvider", "ParentNodeProvider"]);
    assert_eq!(declared_dependencies::<NameReport>(), NameReport::dependencies());
}

#[test]
fn name_positions() {
    let wrapper = MetadataWrapper::new(&parse_module("x = 1\nif x:\n    yy = x\n", None).unwrap())
        .unwrap();
    let mut report = NameReport::new();
    wrapper.visit(&mut report).unwrap();
    let ranges: Vec<_> = report
        .names
        .iter()
        .map(|(name, _, range)| (name.as_str(), range.start, range.end))
        .collect();
    assert_eq!(
        ranges,
        [
            ("x", CodePosition::new(1, 0), CodePosition::new(1, 1)),
            ("x", CodePosition::new(2, 3), CodePosition::new(2, 4)),
            ("yy", CodePosition::new(3, 4), CodePosition::new(3, 6)),
            ("x", CodePosition::new(3, 9), CodePosition::new(3, 10)),
        ]
    );
}

#[test]
fn parents_point_at_enclosing_nodes() {
    let wrapper = MetadataWrapper::new(&parse_module("f(a)\n", None).unwrap()).unwrap();
    let parents = wrapper.resolve::<ParentNodeProvider>().unwrap();
    let module = wrapper.module();
    let Statement::SimpleStatementLine(line) = &module.body[0] else {
        panic!("expected a simple statement line");
    };
    let SmallStatement::Expr(expr) = &line.body[0] else {
        panic!("expected an expression statement");
    };
    let Expression::Call(call) = &expr.value else {
        panic!("expected a call");
    };
    let parent = |id| parents.cell(id).unwrap().get().unwrap();
    assert_eq!(parent(call.args[0].node_id()), call.node_id());
    assert_eq!(parent(call.node_id()), expr.node_id());
    assert_eq!(parent(line.node_id()), module.node_id());
    assert!(parents.cell(module.node_id()).is_none());
}

#[test]
fn deep_copy_separates_shared_nodes() {
    let shared: Expression = Name::new("x").into();
    let line = |value: &Expression| -> Statement {
        SimpleStatementLine::new(vec![Expr::new(value.clone()).into()]).into()
    };
    let module = Module::new(vec![line(&shared), line(&shared)]);

    let wrapper = MetadataWrapper::new(&module).unwrap();
    let positions = wrapper.resolve::<PositionProvider>().unwrap();
    let ids: Vec<_> = wrapper
        .module()
        .body
        .iter()
        .filter_map(|statement| match statement {
            Statement::SimpleStatementLine(line) => match &line.body[0] {
                SmallStatement::Expr(expr) => Some(expr.value.node_ref().id()),
                _ => None,
            },
            _ => None,
        })
        .collect();
    assert_ne!(ids[0], ids[1]);
    let lines: Vec<_> = ids
        .iter()
        .map(|id| positions.cell(*id).unwrap().get().unwrap().start.line)
        .collect();
    assert_eq!(lines, [1, 2]);
    assert_eq!(wrapper.module(), &module);
}

#[test]
fn assignment_targets_are_stores() {
    use ExpressionContext::*;
    assert_eq!(
        contexts("a, *b = c\n"),
        pairs(&[("a", Store), ("b", Store), ("c", Load)])
    );
    assert_eq!(
        contexts("x.y = z[0]\n"),
        pairs(&[("x", Load), ("y", Store), ("z", Load)])
    );
    assert_eq!(contexts("n += 1\n"), pairs(&[("n", Store)]));
}

#[test]
fn loop_comprehension_and_del_contexts() {
    use ExpressionContext::*;
    assert_eq!(
        contexts("for i in items:\n    del i\n"),
        pairs(&[("i", Store), ("items", Load), ("i", Del)])
    );
    assert_eq!(
        contexts("[v for v in vs]\n"),
        pairs(&[("v", Load), ("v", Store), ("vs", Load)])
    );
}

#[test]
fn definitions_and_aliases_bind_names() {
    use ExpressionContext::*;
    assert_eq!(
        contexts("def f(a, b=c):\n    pass\n"),
        pairs(&[("f", Store), ("a", Store), ("b", Store), ("c", Load)])
    );
    assert_eq!(
        contexts("with open(p) as fh:\n    pass\n"),
        pairs(&[("open", Load), ("p", Load), ("fh", Store)])
    );
}
