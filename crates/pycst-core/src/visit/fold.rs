//! Field-level traversal plumbing
//!
//! [`Item`] is implemented by anything that can sit in a node field; it says
//! how one value is visited and what its transform yields. [`Fold`] lifts
//! that to the field's shape: a required value, an `Option` or a `Vec`. A
//! removal or flatten only has a meaning in the latter two.

use super::{AnyNode, CstNode, NodeKind, Transformed, Transformer, Visitor};
use crate::nodes::*;
use crate::{CstError, Result};
use std::sync::Arc;

/// A value that can be held by a node field.
pub trait Item: Sized + Clone {
    fn walk_item<V: Visitor + ?Sized>(&self, visitor: &mut V);

    fn transform_item<T: Transformer + ?Sized>(
        &self,
        transformer: &mut T,
    ) -> Result<Transformed<Self>>;
}

/// A node field: how it is visited and rebuilt.
pub trait Fold: Sized {
    fn walk<V: Visitor + ?Sized>(&self, visitor: &mut V);

    fn transform<T: Transformer + ?Sized>(&self, transformer: &mut T) -> Result<Self>;
}

pub(crate) fn visit_node<N: CstNode + ?Sized, V: Visitor + ?Sized>(node: &N, visitor: &mut V) {
    if visitor.on_visit(node.node_ref()) {
        node.walk_children(visitor);
    }
    visitor.on_leave(node.node_ref());
}

/// Rebuild `node` from transformed children, validate it and pass it to its
/// leave hook. A skipped subtree reaches the hook unchanged. A node left
/// vacant is removed without reaching the hook.
pub(crate) fn rebuild<N: CstNode, T: Transformer + ?Sized>(
    node: &N,
    transformer: &mut T,
) -> Result<Transformed<N>> {
    let updated = if transformer.on_visit(node.node_ref()) {
        let updated = node.transform_children(transformer)?;
        if updated.is_vacant() {
            return Ok(Transformed::Remove);
        }
        updated.validate()?;
        updated
    } else {
        node.clone()
    };
    finish_leave(node.leave(updated, transformer)?)
}

/// Like [`rebuild`] for shared nodes. A skipped subtree that its hook keeps
/// as it was keeps its `Arc`.
pub(crate) fn rebuild_arc<N: CstNode + Eq, T: Transformer + ?Sized>(
    node: &Arc<N>,
    transformer: &mut T,
) -> Result<Transformed<Arc<N>>> {
    let visited = transformer.on_visit(node.node_ref());
    let updated = if visited {
        let updated = node.transform_children(transformer)?;
        if updated.is_vacant() {
            return Ok(Transformed::Remove);
        }
        updated.validate()?;
        updated
    } else {
        (**node).clone()
    };
    let result = finish_leave(node.leave(updated, transformer)?)?;
    Ok(result.map(|kept| {
        if !visited && kept == **node {
            Arc::clone(node)
        } else {
            Arc::new(kept)
        }
    }))
}

/// Validate what a leave hook handed back.
pub(crate) fn finish_leave<T: Validate>(result: Transformed<T>) -> Result<Transformed<T>> {
    match &result {
        Transformed::Keep(node) => node.validate()?,
        Transformed::Flatten(nodes) => {
            for node in nodes {
                node.validate()?;
            }
        }
        Transformed::Remove => {}
    }
    Ok(result)
}

/// Bring the result of [`Transformer::on_leave`] back to the kind it was
/// called for.
pub(crate) fn narrow<N>(
    kind: NodeKind,
    result: Transformed<AnyNode>,
    extract: impl Fn(AnyNode) -> std::result::Result<N, AnyNode>,
) -> Result<Transformed<N>> {
    let mismatch = |node: AnyNode| {
        CstError::structural(format!(
            "Cannot replace a {kind:?} with a {:?}.",
            node.kind()
        ))
    };
    Ok(match result {
        Transformed::Keep(node) => Transformed::Keep(extract(node).map_err(mismatch)?),
        Transformed::Remove => Transformed::Remove,
        Transformed::Flatten(nodes) => Transformed::Flatten(
            nodes
                .into_iter()
                .map(|node| extract(node).map_err(mismatch))
                .collect::<Result<_>>()?,
        ),
    })
}

impl<T: Item> Fold for Vec<T> {
    fn walk<V: Visitor + ?Sized>(&self, visitor: &mut V) {
        for item in self {
            item.walk_item(visitor);
        }
    }

    fn transform<R: Transformer + ?Sized>(&self, transformer: &mut R) -> Result<Self> {
        let mut out = Vec::with_capacity(self.len());
        for item in self {
            match item.transform_item(transformer)? {
                Transformed::Keep(node) => out.push(node),
                Transformed::Remove => {}
                Transformed::Flatten(nodes) => out.extend(nodes),
            }
        }
        Ok(out)
    }
}

impl<T: Item> Fold for Option<T> {
    fn walk<V: Visitor + ?Sized>(&self, visitor: &mut V) {
        if let Some(item) = self {
            item.walk_item(visitor);
        }
    }

    fn transform<R: Transformer + ?Sized>(&self, transformer: &mut R) -> Result<Self> {
        let Some(item) = self else {
            return Ok(None);
        };
        match item.transform_item(transformer)? {
            Transformed::Keep(node) => Ok(Some(node)),
            Transformed::Remove => Ok(None),
            Transformed::Flatten(_) => Err(CstError::structural(
                "Cannot flatten a node into an optional field.",
            )),
        }
    }
}

/// Values without children. Transforms keep a copy.
macro_rules! leaf_items {
    ($($ty:ty),* $(,)?) => {
        $(
            impl Item for $ty {
                fn walk_item<V: Visitor + ?Sized>(&self, _visitor: &mut V) {}

                fn transform_item<T: Transformer + ?Sized>(
                    &self,
                    _transformer: &mut T,
                ) -> Result<Transformed<Self>> {
                    Ok(Transformed::Keep(self.clone()))
                }
            }

            impl Fold for $ty {
                fn walk<V: Visitor + ?Sized>(&self, _visitor: &mut V) {}

                fn transform<T: Transformer + ?Sized>(&self, _transformer: &mut T) -> Result<Self> {
                    Ok(self.clone())
                }
            }
        )*
    };
}

leaf_items!(
    String,
    bool,
    Whitespace,
    Comment,
    Newline,
    TrailingWhitespace,
    EmptyLine,
    LeftParen,
    RightParen,
    LeftSquareBracket,
    RightSquareBracket,
    LeftCurlyBrace,
    RightCurlyBrace,
    Comma,
    Semicolon,
    AssignEqual,
    Dot,
    Asynchronous,
    BinaryOperator,
    UnaryOperator,
    BooleanOperator,
    ComparisonOperator,
    AugmentedOperator,
    StringPart,
    ArgStar,
    ParamKind,
    AnnotationIndicator,
    RelativeDot,
);

/// Nodes held by value in a field.
macro_rules! node_items {
    ($($ty:ident),* $(,)?) => {
        $(
            impl Item for $ty {
                fn walk_item<V: Visitor + ?Sized>(&self, visitor: &mut V) {
                    visit_node(self, visitor);
                }

                fn transform_item<T: Transformer + ?Sized>(
                    &self,
                    transformer: &mut T,
                ) -> Result<Transformed<Self>> {
                    rebuild(self, transformer)
                }
            }
        )*
    };
}

node_items!(
    Name,
    Arg,
    Param,
    Parameters,
    Annotation,
    Element,
    DictElement,
    Decorator,
    ImportAlias,
    AsName,
    RaiseFrom,
    Else,
    Finally,
    ExceptHandler,
    WithItem,
    SubscriptElement,
    CompFor,
    CompIf,
    ComparisonTarget,
    AssignTarget,
    NameItem,
);

impl<N: CstNode + Eq> Item for Arc<N> {
    fn walk_item<V: Visitor + ?Sized>(&self, visitor: &mut V) {
        visit_node(&**self, visitor);
    }

    fn transform_item<T: Transformer + ?Sized>(
        &self,
        transformer: &mut T,
    ) -> Result<Transformed<Self>> {
        rebuild_arc(self, transformer)
    }
}

/// Fields that must hold a value: removing or flattening one is an error.
macro_rules! required_fields {
    ($($ty:ident),* $(,)?) => {
        $(
            impl Fold for $ty {
                fn walk<V: Visitor + ?Sized>(&self, visitor: &mut V) {
                    self.walk_item(visitor);
                }

                fn transform<T: Transformer + ?Sized>(&self, transformer: &mut T) -> Result<Self> {
                    match self.transform_item(transformer)? {
                        Transformed::Keep(node) => Ok(node),
                        Transformed::Remove => Err(CstError::structural(concat!(
                            "Cannot remove a required ",
                            stringify!($ty),
                            "."
                        ))),
                        Transformed::Flatten(_) => Err(CstError::structural(concat!(
                            "Cannot flatten a required ",
                            stringify!($ty),
                            " into several nodes."
                        ))),
                    }
                }
            }
        )*
    };
}

required_fields!(
    Expression,
    Suite,
    Name,
    Parameters,
    Annotation,
    CompFor,
    BaseSlice,
    ImportNames,
);
