//! Concrete syntax tree node model
//!
//! Every node kind is a plain struct with public, typed fields. Nodes are
//! never mutated once they are part of a tree: edits produce new nodes with
//! [`WithChanges::with_changes`], and unchanged subtrees are shared through
//! `Arc`. Equality is structural, so `a == b` is the deep comparison.
//!
//! Whitespace is owned by the node that contains the token it precedes. The
//! whitespace before a node's first token belongs to whatever encloses it.

pub mod expression;
pub mod module;
pub mod op;
pub mod statement;
pub mod whitespace;

pub use expression::*;
pub use module::Module;
pub use op::*;
pub use statement::*;
pub use whitespace::*;

use crate::visit::{NodeRef, Visitor};
use crate::{CstError, Result};

/// Invariant checks run when a node is built through the public API or
/// returned from a transform.
pub trait Validate {
    fn validate(&self) -> Result<()> {
        Ok(())
    }
}

/// Copy-on-write amendment of a node.
pub trait WithChanges: Clone + Validate {
    /// Clone the node, apply `change` and validate the result.
    fn with_changes(&self, change: impl FnOnce(&mut Self)) -> Result<Self> {
        let mut updated = self.clone();
        change(&mut updated);
        updated.validate()?;
        Ok(updated)
    }
}

impl<T: Clone + Validate> WithChanges for T {}

/// Declares a node struct and derives its traversal in field order.
macro_rules! cst_node {
    (
        $(#[$meta:meta])*
        pub struct $name:ident {
            $(
                $(#[$field_meta:meta])*
                pub $field:ident : $ty:ty
            ),* $(,)?
        }
        $(vacant_when_empty($vacant:ident))?
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq)]
        pub struct $name {
            $(
                $(#[$field_meta])*
                pub $field: $ty,
            )*
        }

        impl $crate::visit::CstNode for $name {
            fn node_ref(&self) -> $crate::visit::NodeRef<'_> {
                $crate::visit::NodeRef::$name(self)
            }

            fn is_vacant(&self) -> bool {
                false $(|| self.$vacant.is_empty())?
            }

            fn leave<T: $crate::visit::Transformer + ?Sized>(
                &self,
                updated: Self,
                transformer: &mut T,
            ) -> $crate::Result<$crate::visit::Transformed<Self>> {
                let result = transformer.on_leave(
                    $crate::visit::NodeRef::$name(self),
                    $crate::visit::AnyNode::$name(updated),
                );
                $crate::visit::narrow($crate::visit::NodeKind::$name, result, |node| match node {
                    $crate::visit::AnyNode::$name(node) => Ok(node),
                    other => Err(other),
                })
            }

            #[allow(unused_variables)]
            fn walk_children<V: $crate::visit::Visitor + ?Sized>(&self, visitor: &mut V) {
                let node = $crate::visit::NodeRef::$name(self);
                $(
                    visitor.on_visit_attribute(node, stringify!($field));
                    $crate::visit::Fold::walk(&self.$field, visitor);
                    visitor.on_leave_attribute(node, stringify!($field));
                )*
            }

            #[allow(unused_variables)]
            fn transform_children<T: $crate::visit::Transformer + ?Sized>(
                &self,
                transformer: &mut T,
            ) -> $crate::Result<Self> {
                let node = $crate::visit::NodeRef::$name(self);
                Ok(Self {
                    $(
                        $field: {
                            transformer.on_visit_attribute(node, stringify!($field));
                            let value = $crate::visit::Fold::transform(&self.$field, transformer)?;
                            transformer.on_leave_attribute(node, stringify!($field));
                            value
                        },
                    )*
                })
            }
        }
    };
}

pub(crate) use cst_node;

/// Check the invariants of every node under `root`, stopping at the first
/// violation.
pub fn validate_tree(root: NodeRef<'_>) -> Result<()> {
    let mut invariants = Invariants { error: None };
    root.visit(&mut invariants);
    invariants.error.map_or(Ok(()), Err)
}

struct Invariants {
    error: Option<CstError>,
}

impl Visitor for Invariants {
    fn on_visit(&mut self, node: NodeRef<'_>) -> bool {
        if self.error.is_some() {
            return false;
        }
        match node.validate() {
            Ok(()) => true,
            Err(err) => {
                self.error = Some(err);
                false
            }
        }
    }

    fn on_leave(&mut self, _node: NodeRef<'_>) {}
}

/// Paren balance shared by every parenthesizable node.
pub(crate) fn validate_parens(lpar: &[LeftParen], rpar: &[RightParen]) -> Result<()> {
    if !lpar.is_empty() && rpar.is_empty() {
        return Err(CstError::structural(
            "Cannot have left paren without right paren.",
        ));
    }
    if lpar.is_empty() && !rpar.is_empty() {
        return Err(CstError::structural(
            "Cannot have right paren without left paren.",
        ));
    }
    if lpar.len() != rpar.len() {
        return Err(CstError::structural("Cannot have unbalanced parens."));
    }
    Ok(())
}

#[cfg(test)]
mod tests;
