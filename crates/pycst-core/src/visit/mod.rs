//! Visitors and transformers
//!
//! Every node kind gets a `visit_*` hook that runs before its children and
//! decides whether they are visited, and a `leave_*` hook that runs after
//! them. Hooks default to no-ops, so an implementation only overrides the
//! kinds it cares about. `on_visit` and `on_leave` see every node and
//! dispatch to the per-kind hooks.
//!
//! A [`Transformer`] rebuilds the tree on the way back up. Its leave hooks
//! return a [`Transformed`] value: keep a replacement, remove the node, or
//! flatten it into several siblings. After a node's own hook, the category
//! hooks ([`Transformer::leave_expression`], [`Transformer::leave_statement`],
//! ...) see it once more as a member of its category. Subtrees skipped by
//! `on_visit` and kept by their hooks are shared with the original tree.

mod fold;

pub use fold::{Fold, Item};
pub(crate) use fold::{finish_leave, narrow, rebuild, rebuild_arc, visit_node};

use crate::codegen::{Codegen, CodegenState};
use crate::nodes::*;
use crate::{CstError, Result};

/// Result of a transformer leave hook.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transformed<T> {
    /// Use this node in place of the original
    Keep(T),
    /// Drop the node from its parent
    Remove,
    /// Splice these nodes into the parent sequence
    Flatten(Vec<T>),
}

impl<T> Transformed<T> {
    pub fn map<U>(self, mut f: impl FnMut(T) -> U) -> Transformed<U> {
        match self {
            Transformed::Keep(node) => Transformed::Keep(f(node)),
            Transformed::Remove => Transformed::Remove,
            Transformed::Flatten(nodes) => Transformed::Flatten(nodes.into_iter().map(f).collect()),
        }
    }
}

impl<T> From<T> for Transformed<T> {
    fn from(node: T) -> Self {
        Transformed::Keep(node)
    }
}

/// Implemented by every node kind.
pub trait CstNode: Clone + Validate {
    fn node_ref(&self) -> NodeRef<'_>;

    fn node_id(&self) -> NodeId {
        self.node_ref().id()
    }

    /// Visit the node's children in source order.
    fn walk_children<V: Visitor + ?Sized>(&self, visitor: &mut V);

    /// Rebuild the node from transformed children. The result is not
    /// validated.
    fn transform_children<T: Transformer + ?Sized>(&self, transformer: &mut T) -> Result<Self>;

    /// Hand `updated`, rebuilt from this node, to the transformer's leave
    /// hooks.
    fn leave<T: Transformer + ?Sized>(
        &self,
        updated: Self,
        transformer: &mut T,
    ) -> Result<Transformed<Self>>;

    /// Whether the node has lost every statement it must hold and should
    /// disappear from its parent.
    fn is_vacant(&self) -> bool {
        false
    }

    /// Visit this node and its subtree.
    fn visit<V: Visitor + ?Sized>(&self, visitor: &mut V)
    where
        Self: Sized,
    {
        visit_node(self, visitor);
    }

    /// Transform this node and its subtree, validating every rebuilt node.
    /// The root itself cannot be removed or flattened.
    fn transform<T: Transformer + ?Sized>(&self, transformer: &mut T) -> Result<Self>
    where
        Self: Sized,
    {
        match rebuild(self, transformer)? {
            Transformed::Keep(node) => Ok(node),
            _ => Err(CstError::structural(format!(
                "Cannot remove or flatten the {:?} a transform starts from.",
                self.node_ref().kind()
            ))),
        }
    }
}

/// Identity of a node within one tree: its kind and address. Stable for as
/// long as the tree it belongs to is alive and not moved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId {
    pub kind: NodeKind,
    addr: usize,
}

/// Declares the closed set of node kinds and the per-kind hooks.
macro_rules! node_kinds {
    ($($kind:ident => $visit:ident, $leave:ident;)*) => {
        /// The kind of a node.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub enum NodeKind {
            $($kind,)*
        }

        /// A borrowed node of any kind.
        #[derive(Debug, Clone, Copy)]
        pub enum NodeRef<'a> {
            $($kind(&'a $kind),)*
        }

        impl<'a> NodeRef<'a> {
            pub fn kind(self) -> NodeKind {
                match self {
                    $(NodeRef::$kind(_) => NodeKind::$kind,)*
                }
            }

            pub fn id(self) -> NodeId {
                let addr = match self {
                    $(NodeRef::$kind(node) => node as *const $kind as usize,)*
                };
                NodeId { kind: self.kind(), addr }
            }

            /// Visit the subtree rooted at this node.
            pub fn visit<V: Visitor + ?Sized>(self, visitor: &mut V) {
                match self {
                    $(NodeRef::$kind(node) => visit_node(node, visitor),)*
                }
            }

            /// Visit only this node's children.
            pub fn walk_children<V: Visitor + ?Sized>(self, visitor: &mut V) {
                match self {
                    $(NodeRef::$kind(node) => node.walk_children(visitor),)*
                }
            }
        }

        /// An owned node of any kind, as handed to [`Transformer::on_leave`].
        #[allow(clippy::large_enum_variant)]
        #[derive(Debug, Clone, PartialEq, Eq)]
        pub enum AnyNode {
            $($kind($kind),)*
        }

        impl AnyNode {
            pub fn kind(&self) -> NodeKind {
                match self {
                    $(AnyNode::$kind(_) => NodeKind::$kind,)*
                }
            }
        }

        $(
            impl From<$kind> for AnyNode {
                fn from(node: $kind) -> Self {
                    AnyNode::$kind(node)
                }
            }
        )*

        impl Validate for NodeRef<'_> {
            fn validate(&self) -> Result<()> {
                match self {
                    $(NodeRef::$kind(node) => node.validate(),)*
                }
            }
        }

        impl Codegen for NodeRef<'_> {
            fn codegen(&self, state: &mut CodegenState) {
                match self {
                    $(NodeRef::$kind(node) => node.codegen(state),)*
                }
            }
        }

        /// Read-only traversal.
        #[allow(unused_variables)]
        pub trait Visitor {
            /// Called before a node's children. Returning `false` skips them;
            /// the leave hook still runs.
            fn on_visit(&mut self, node: NodeRef<'_>) -> bool {
                match node {
                    $(NodeRef::$kind(node) => self.$visit(node),)*
                }
            }

            /// Called after a node's children.
            fn on_leave(&mut self, node: NodeRef<'_>) {
                match node {
                    $(NodeRef::$kind(node) => self.$leave(node),)*
                }
            }

            /// Called before the named field of `node` is visited.
            fn on_visit_attribute(&mut self, node: NodeRef<'_>, attribute: &'static str) {}

            fn on_leave_attribute(&mut self, node: NodeRef<'_>, attribute: &'static str) {}

            $(
                fn $visit(&mut self, node: &$kind) -> bool {
                    true
                }

                fn $leave(&mut self, node: &$kind) {}
            )*
        }

        /// Rebuilding traversal.
        #[allow(unused_variables)]
        pub trait Transformer {
            /// Called before a node's children. Returning `false` keeps the
            /// subtree as is; the leave hooks still run.
            fn on_visit(&mut self, node: NodeRef<'_>) -> bool {
                match node {
                    $(NodeRef::$kind(node) => self.$visit(node),)*
                }
            }

            /// Called with the rebuilt node after its children. A
            /// replacement must be of the same kind as `original`.
            fn on_leave(
                &mut self,
                original: NodeRef<'_>,
                updated: AnyNode,
            ) -> Transformed<AnyNode> {
                match (original, updated) {
                    $(
                        (NodeRef::$kind(original), AnyNode::$kind(updated)) => {
                            self.$leave(original, updated).map(AnyNode::$kind)
                        }
                    )*
                    (_, updated) => Transformed::Keep(updated),
                }
            }

            fn on_visit_attribute(&mut self, node: NodeRef<'_>, attribute: &'static str) {}

            fn on_leave_attribute(&mut self, node: NodeRef<'_>, attribute: &'static str) {}

            $(
                fn $visit(&mut self, node: &$kind) -> bool {
                    true
                }

                fn $leave(&mut self, original: &$kind, updated: $kind) -> Transformed<$kind> {
                    Transformed::Keep(updated)
                }
            )*

            /// Any statement, after its own leave hook kept it.
            fn leave_statement(
                &mut self,
                original: &Statement,
                updated: Statement,
            ) -> Transformed<Statement> {
                Transformed::Keep(updated)
            }

            fn leave_small_statement(
                &mut self,
                original: &SmallStatement,
                updated: SmallStatement,
            ) -> Transformed<SmallStatement> {
                Transformed::Keep(updated)
            }

            fn leave_suite(&mut self, original: &Suite, updated: Suite) -> Transformed<Suite> {
                Transformed::Keep(updated)
            }

            /// Any expression, after its own leave hook kept it.
            fn leave_expression(
                &mut self,
                original: &Expression,
                updated: Expression,
            ) -> Transformed<Expression> {
                Transformed::Keep(updated)
            }
        }
    };
}

node_kinds! {
    Module => visit_module, leave_module;
    SimpleStatementLine => visit_simple_statement_line, leave_simple_statement_line;
    SimpleStatementSuite => visit_simple_statement_suite, leave_simple_statement_suite;
    IndentedBlock => visit_indented_block, leave_indented_block;
    If => visit_if, leave_if;
    Else => visit_else, leave_else;
    While => visit_while, leave_while;
    For => visit_for, leave_for;
    Try => visit_try, leave_try;
    ExceptHandler => visit_except_handler, leave_except_handler;
    Finally => visit_finally, leave_finally;
    With => visit_with, leave_with;
    WithItem => visit_with_item, leave_with_item;
    FunctionDef => visit_function_def, leave_function_def;
    ClassDef => visit_class_def, leave_class_def;
    Decorator => visit_decorator, leave_decorator;
    Expr => visit_expr, leave_expr;
    Assign => visit_assign, leave_assign;
    AssignTarget => visit_assign_target, leave_assign_target;
    AnnAssign => visit_ann_assign, leave_ann_assign;
    AugAssign => visit_aug_assign, leave_aug_assign;
    Pass => visit_pass, leave_pass;
    Break => visit_break, leave_break;
    Continue => visit_continue, leave_continue;
    Return => visit_return, leave_return;
    Raise => visit_raise, leave_raise;
    RaiseFrom => visit_raise_from, leave_raise_from;
    Del => visit_del, leave_del;
    Import => visit_import, leave_import;
    ImportFrom => visit_import_from, leave_import_from;
    ImportAlias => visit_import_alias, leave_import_alias;
    AsName => visit_as_name, leave_as_name;
    Global => visit_global, leave_global;
    Nonlocal => visit_nonlocal, leave_nonlocal;
    NameItem => visit_name_item, leave_name_item;
    Assert => visit_assert, leave_assert;
    Name => visit_name, leave_name;
    Integer => visit_integer, leave_integer;
    Float => visit_float, leave_float;
    Imaginary => visit_imaginary, leave_imaginary;
    SimpleString => visit_simple_string, leave_simple_string;
    ConcatenatedString => visit_concatenated_string, leave_concatenated_string;
    Ellipsis => visit_ellipsis, leave_ellipsis;
    Attribute => visit_attribute, leave_attribute;
    Call => visit_call, leave_call;
    Arg => visit_arg, leave_arg;
    Subscript => visit_subscript, leave_subscript;
    SubscriptElement => visit_subscript_element, leave_subscript_element;
    Slice => visit_slice, leave_slice;
    BinaryOperation => visit_binary_operation, leave_binary_operation;
    UnaryOperation => visit_unary_operation, leave_unary_operation;
    BooleanOperation => visit_boolean_operation, leave_boolean_operation;
    Comparison => visit_comparison, leave_comparison;
    ComparisonTarget => visit_comparison_target, leave_comparison_target;
    IfExp => visit_if_exp, leave_if_exp;
    Lambda => visit_lambda, leave_lambda;
    Parameters => visit_parameters, leave_parameters;
    Param => visit_param, leave_param;
    Annotation => visit_annotation, leave_annotation;
    Tuple => visit_tuple, leave_tuple;
    List => visit_list, leave_list;
    Set => visit_set, leave_set;
    Dict => visit_dict, leave_dict;
    Element => visit_element, leave_element;
    DictElement => visit_dict_element, leave_dict_element;
    ListComp => visit_list_comp, leave_list_comp;
    SetComp => visit_set_comp, leave_set_comp;
    DictComp => visit_dict_comp, leave_dict_comp;
    GeneratorExp => visit_generator_exp, leave_generator_exp;
    CompFor => visit_comp_for, leave_comp_for;
    CompIf => visit_comp_if, leave_comp_if;
    StarredElement => visit_starred_element, leave_starred_element;
    Await => visit_await, leave_await;
    Yield => visit_yield, leave_yield;
    YieldFrom => visit_yield_from, leave_yield_from;
    NamedExpr => visit_named_expr, leave_named_expr;
}

#[cfg(test)]
mod tests;
