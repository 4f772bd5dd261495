//! Codemods over parsed source: edits keep every untouched byte.

use pycst_core::nodes::*;
use pycst_core::{
    CstError, CstNode, Dependencies, ExpressionContext, ExpressionContextProvider,
    MetadataDependent, MetadataScope, MetadataWrapper, NodeId, NodeKind, NodeRef, Transformed,
    Transformer, WithChanges, parse_module,
};

const SOURCE: &str = "\
import os, sys  # platform helpers
from util import old_name

def old_name(value):  # keep me
    return value


result = old_name(1)
total = result + old_name(
    2,
)
";

/// Renames one identifier wherever it appears.
struct RenameAll {
    from: &'static str,
    to: &'static str,
}

impl Transformer for RenameAll {
    fn leave_name(&mut self, _original: &Name, updated: Name) -> Transformed<Name> {
        if updated.value != self.from {
            return Transformed::Keep(updated);
        }
        Transformed::Keep(Name {
            value: self.to.to_string(),
            ..updated
        })
    }
}

#[test]
fn rename_keeps_formatting_and_comments() {
    let module = parse_module(SOURCE, None).unwrap();
    let updated = module
        .transform(&mut RenameAll {
            from: "old_name",
            to: "new_name",
        })
        .unwrap();
    assert_eq!(updated.code().unwrap(), SOURCE.replace("old_name", "new_name"));
    assert_eq!(module.code().unwrap(), SOURCE);
}

/// Drops named imports, removing statements left empty.
struct DropImports {
    unused: &'static [&'static str],
}

impl Transformer for DropImports {
    fn leave_small_statement(
        &mut self,
        _original: &SmallStatement,
        updated: SmallStatement,
    ) -> Transformed<SmallStatement> {
        let SmallStatement::Import(import) = &updated else {
            return Transformed::Keep(updated);
        };
        let mut import = (**import).clone();
        import
            .names
            .retain(|alias| !self.unused.contains(&alias.dotted_name().as_str()));
        if import.names.is_empty() {
            return Transformed::Remove;
        }
        if let Some(last) = import.names.last_mut() {
            last.comma = None;
        }
        Transformed::Keep(import.into())
    }
}

#[test]
fn removing_imports_repairs_commas() {
    let module = parse_module(SOURCE, None).unwrap();
    let updated = module.transform(&mut DropImports { unused: &["sys"] }).unwrap();
    assert!(updated.code().unwrap().starts_with("import os  # platform helpers\n"));

    let updated = module
        .transform(&mut DropImports {
            unused: &["os", "sys"],
        })
        .unwrap();
    assert!(updated.code().unwrap().starts_with("from util import old_name\n"));
}

/// Prefixes every name bound at module level with an underscore.
struct HideBindings {
    metadata: MetadataScope,
}

impl MetadataDependent for HideBindings {
    fn dependencies() -> Dependencies {
        Dependencies::new().with::<ExpressionContextProvider>()
    }

    fn metadata_mut(&mut self) -> &mut MetadataScope {
        &mut self.metadata
    }

    fn metadata(&self) -> &MetadataScope {
        &self.metadata
    }
}

impl HideBindings {
    fn is_store(&self, node: NodeId) -> bool {
        matches!(
            self.metadata.get_optional::<ExpressionContextProvider>(node),
            Ok(Some(ExpressionContext::Store))
        )
    }
}

impl Transformer for HideBindings {
    fn visit_function_def(&mut self, _node: &FunctionDef) -> bool {
        false
    }

    fn leave_expression(
        &mut self,
        original: &Expression,
        updated: Expression,
    ) -> Transformed<Expression> {
        match &updated {
            Expression::Name(name) if self.is_store(original.node_ref().id()) => {
                Transformed::Keep(
                    Name {
                        value: format!("_{}", name.value),
                        ..(**name).clone()
                    }
                    .into(),
                )
            }
            _ => Transformed::Keep(updated),
        }
    }
}

#[test]
fn metadata_guides_a_transform() {
    let source = "x = 1\ny = x + 1\nfor i in range(y):\n    print(i)\n";
    let wrapper = MetadataWrapper::new(&parse_module(source, None).unwrap()).unwrap();
    let mut transformer = HideBindings {
        metadata: MetadataScope::unresolved(HideBindings::dependencies()),
    };
    let updated = wrapper.transform(&mut transformer).unwrap();
    assert_eq!(
        updated.code().unwrap(),
        "_x = 1\n_y = x + 1\nfor _i in range(y):\n    print(i)\n"
    );
    assert!(!transformer.metadata().is_resolved());
}

#[test]
fn amendments_are_validated() {
    let module = parse_module("import os\n", None).unwrap();
    let Statement::SimpleStatementLine(line) = &module.body[0] else {
        panic!("expected a simple statement line");
    };
    let SmallStatement::Import(import) = &line.body[0] else {
        panic!("expected an import");
    };

    let spaced = import
        .with_changes(|import| import.whitespace_after_import = Whitespace::new("   "))
        .unwrap();
    assert_eq!(module.code_for_node(spaced.node_ref()).unwrap(), "import   os");

    let err = import
        .with_changes(|import| import.whitespace_after_import = Whitespace::empty())
        .unwrap_err();
    assert_eq!(
        err,
        CstError::Structural {
            message: "Must have at least one space after import.".to_string()
        }
    );
}

#[test]
fn validated_output_reparses_identically() {
    let module = parse_module(SOURCE, None).unwrap();
    let updated = module
        .transform(&mut RenameAll {
            from: "result",
            to: "answer",
        })
        .unwrap();
    let reparsed = parse_module(&updated.code().unwrap(), None).unwrap();
    assert_eq!(reparsed, updated);
}

/// Drops every top-level statement without looking inside them.
struct ClearBody;

impl Transformer for ClearBody {
    fn on_visit(&mut self, node: NodeRef<'_>) -> bool {
        node.kind() == NodeKind::Module
    }

    fn leave_statement(
        &mut self,
        _original: &Statement,
        _updated: Statement,
    ) -> Transformed<Statement> {
        Transformed::Remove
    }
}

#[test]
fn clearing_the_body_keeps_header_and_footer() {
    let source = "# head\n\nimport os\nif os:\n    pass\nx = 1\n# foot\n";
    let module = parse_module(source, None).unwrap();
    let cleared = module.transform(&mut ClearBody).unwrap();
    assert!(cleared.body.is_empty());
    assert_eq!(cleared.header, module.header);
    assert_eq!(cleared.footer, module.footer);
    assert_eq!(cleared.code().unwrap(), "# head\n\n# foot\n");
}

/// Drops the `else` clause of every `if`, `for` and `while`.
struct DropElse;

impl Transformer for DropElse {
    fn leave_else(&mut self, _original: &Else, _updated: Else) -> Transformed<Else> {
        Transformed::Remove
    }
}

#[test]
fn optional_clauses_can_be_removed() {
    let source = "\
if a:
    x = 1
else:
    x = 2
for i in y:
    pass
else:  # exhausted
    done()
";
    let module = parse_module(source, None).unwrap();
    let updated = module.transform(&mut DropElse).unwrap();
    assert_eq!(updated.code().unwrap(), "if a:\n    x = 1\nfor i in y:\n    pass\n");
}
