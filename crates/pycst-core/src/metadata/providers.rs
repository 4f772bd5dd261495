//! Built-in metadata providers

use super::{MetadataProvider, MetadataScope, ProviderData};
use crate::Result;
use crate::codegen::{CodeRange, Codegen, CodegenState};
use crate::nodes::*;
use crate::visit::{CstNode, NodeId, NodeRef, Visitor};
use serde::Serialize;
use std::collections::HashMap;

/// Start and end of every node in the rendered module.
///
/// Lines are 1-indexed and columns 0-indexed. A node's range covers the
/// text it renders itself, including whitespace it owns.
pub struct PositionProvider;

impl MetadataProvider for PositionProvider {
    type Value = CodeRange;

    const NAME: &'static str = "PositionProvider";

    fn compute(module: &Module, _metadata: &MetadataScope) -> Result<ProviderData<CodeRange>> {
        let mut state =
            CodegenState::with_positions(&module.default_indent, &module.default_newline);
        module.codegen(&mut state);
        let (_, positions) = state.finish_with_positions();
        Ok(positions.into_iter().collect())
    }
}

/// The enclosing node of every node except the module.
pub struct ParentNodeProvider;

impl MetadataProvider for ParentNodeProvider {
    type Value = NodeId;

    const NAME: &'static str = "ParentNodeProvider";

    fn compute(module: &Module, _metadata: &MetadataScope) -> Result<ProviderData<NodeId>> {
        let mut collector = ParentCollector {
            stack: Vec::new(),
            parents: ProviderData::new(),
        };
        module.visit(&mut collector);
        Ok(collector.parents)
    }
}

struct ParentCollector {
    stack: Vec<NodeId>,
    parents: ProviderData<NodeId>,
}

impl Visitor for ParentCollector {
    fn on_visit(&mut self, node: NodeRef<'_>) -> bool {
        let id = node.id();
        if let Some(parent) = self.stack.last() {
            self.parents.insert(id, *parent);
        }
        self.stack.push(id);
        true
    }

    fn on_leave(&mut self, _node: NodeRef<'_>) {
        self.stack.pop();
    }
}

/// How an expression is used.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ExpressionContext {
    /// Read
    Load,
    /// Bound by an assignment, loop, import alias, parameter or definition
    Store,
    /// Target of `del`
    Del,
}

/// [`ExpressionContext`] of every name, attribute, subscript, tuple, list
/// and starred element.
pub struct ExpressionContextProvider;

impl MetadataProvider for ExpressionContextProvider {
    type Value = ExpressionContext;

    const NAME: &'static str = "ExpressionContextProvider";

    fn compute(
        module: &Module,
        _metadata: &MetadataScope,
    ) -> Result<ProviderData<ExpressionContext>> {
        let mut collector = ContextCollector::default();
        module.visit(&mut collector);
        Ok(collector.contexts.into_iter().collect())
    }
}

/// Targets are marked when their statement is entered; whatever is still
/// unmarked when reached is a load.
#[derive(Default)]
struct ContextCollector {
    contexts: HashMap<NodeId, ExpressionContext>,
}

impl ContextCollector {
    fn mark(&mut self, expression: &Expression, context: ExpressionContext) {
        self.contexts.insert(expression.node_ref().id(), context);
        match expression {
            Expression::Attribute(attribute) => {
                self.contexts.insert(attribute.attr.node_id(), context);
            }
            Expression::Tuple(tuple) => {
                for element in &tuple.elements {
                    self.mark(&element.value, context);
                }
            }
            Expression::List(list) => {
                for element in &list.elements {
                    self.mark(&element.value, context);
                }
            }
            Expression::StarredElement(starred) => self.mark(&starred.value, context),
            _ => {}
        }
    }

    fn mark_name(&mut self, name: &Name) {
        self.contexts.insert(name.node_id(), ExpressionContext::Store);
    }

    fn load(&mut self, node: NodeId) -> bool {
        self.contexts.entry(node).or_insert(ExpressionContext::Load);
        true
    }
}

impl Visitor for ContextCollector {
    fn visit_assign(&mut self, node: &Assign) -> bool {
        for target in &node.targets {
            self.mark(&target.target, ExpressionContext::Store);
        }
        true
    }

    fn visit_aug_assign(&mut self, node: &AugAssign) -> bool {
        self.mark(&node.target, ExpressionContext::Store);
        true
    }

    fn visit_ann_assign(&mut self, node: &AnnAssign) -> bool {
        self.mark(&node.target, ExpressionContext::Store);
        true
    }

    fn visit_for(&mut self, node: &For) -> bool {
        self.mark(&node.target, ExpressionContext::Store);
        true
    }

    fn visit_comp_for(&mut self, node: &CompFor) -> bool {
        self.mark(&node.target, ExpressionContext::Store);
        true
    }

    fn visit_named_expr(&mut self, node: &NamedExpr) -> bool {
        self.mark(&node.target, ExpressionContext::Store);
        true
    }

    fn visit_as_name(&mut self, node: &AsName) -> bool {
        self.mark(&node.name, ExpressionContext::Store);
        true
    }

    fn visit_del(&mut self, node: &Del) -> bool {
        self.mark(&node.target, ExpressionContext::Del);
        true
    }

    fn visit_function_def(&mut self, node: &FunctionDef) -> bool {
        self.mark_name(&node.name);
        true
    }

    fn visit_class_def(&mut self, node: &ClassDef) -> bool {
        self.mark_name(&node.name);
        true
    }

    fn visit_param(&mut self, node: &Param) -> bool {
        if let Some(name) = &node.name {
            self.mark_name(name);
        }
        true
    }

    fn visit_name(&mut self, node: &Name) -> bool {
        self.load(node.node_id())
    }

    fn visit_attribute(&mut self, node: &Attribute) -> bool {
        self.load(node.node_id())
    }

    fn visit_subscript(&mut self, node: &Subscript) -> bool {
        self.load(node.node_id())
    }

    fn visit_tuple(&mut self, node: &Tuple) -> bool {
        self.load(node.node_id())
    }

    fn visit_list(&mut self, node: &List) -> bool {
        self.load(node.node_id())
    }

    fn visit_starred_element(&mut self, node: &StarredElement) -> bool {
        self.load(node.node_id())
    }
}
