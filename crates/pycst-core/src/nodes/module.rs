//! The root node

use super::statement::Statement;
use super::whitespace::EmptyLine;
use super::{Validate, validate_tree};
use crate::codegen::{Codegen, CodegenState};
use crate::config::PartialParserConfig;
use crate::visit::{
    AnyNode, CstNode, Fold, NodeKind, NodeRef, Transformed, Transformer, Visitor, narrow,
};
use crate::{CstError, Result};

/// A parsed file, together with the formatting defaults that every node in it
/// renders with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Module {
    /// Blank and comment lines before the first statement
    pub header: Vec<EmptyLine>,
    pub body: Vec<Statement>,
    /// Blank and comment lines after the last statement
    pub footer: Vec<EmptyLine>,
    pub encoding: String,
    pub default_indent: String,
    pub default_newline: String,
    /// Whether the source ended with a line break
    pub has_trailing_newline: bool,
}

impl Default for Module {
    fn default() -> Self {
        Self {
            header: Vec::new(),
            body: Vec::new(),
            footer: Vec::new(),
            encoding: crate::config::DEFAULT_ENCODING.to_string(),
            default_indent: crate::config::DEFAULT_INDENT.to_string(),
            default_newline: crate::config::DEFAULT_NEWLINE.to_string(),
            has_trailing_newline: true,
        }
    }
}

impl Module {
    pub fn new(body: Vec<Statement>) -> Self {
        Self {
            body,
            ..Self::default()
        }
    }

    /// Render the module back to source text. Fails with a structural error
    /// if any node in the tree breaks its invariants.
    pub fn code(&self) -> Result<String> {
        validate_tree(self.node_ref())?;
        let mut state = self.codegen_state();
        self.codegen(&mut state);
        Ok(state.finish())
    }

    /// Render the module and encode it with its source encoding.
    pub fn bytes(&self) -> Result<Vec<u8>> {
        crate::encoding::encode(&self.code()?, &self.encoding)
    }

    /// Render any node with this module's indentation and line endings,
    /// after checking the node's subtree.
    pub fn code_for_node(&self, node: NodeRef<'_>) -> Result<String> {
        validate_tree(node)?;
        let mut state = self.codegen_state();
        node.codegen(&mut state);
        Ok(state.finish())
    }

    /// Options that parse a related snippet with the same formatting
    /// defaults as this module.
    pub fn config_for_parsing(&self) -> PartialParserConfig {
        PartialParserConfig {
            python_version: None,
            encoding: Some(self.encoding.clone()),
            default_indent: Some(self.default_indent.clone()),
            default_newline: Some(self.default_newline.clone()),
        }
    }

    pub(crate) fn codegen_state(&self) -> CodegenState {
        CodegenState::new(&self.default_indent, &self.default_newline)
    }
}

impl Validate for Module {
    fn validate(&self) -> Result<()> {
        if !matches!(self.default_newline.as_str(), "\n" | "\r\n" | "\r") {
            return Err(CstError::structural(format!(
                "Invalid default newline {:?}.",
                self.default_newline
            )));
        }
        if self.default_indent.is_empty()
            || !self.default_indent.chars().all(|c| c == ' ' || c == '\t')
        {
            return Err(CstError::structural(format!(
                "Invalid default indent {:?}.",
                self.default_indent
            )));
        }
        Ok(())
    }
}

impl Codegen for Module {
    fn codegen(&self, state: &mut CodegenState) {
        state.record(self, |state| {
            for line in &self.header {
                line.codegen(state);
            }
            for statement in &self.body {
                statement.codegen(state);
            }
            for line in &self.footer {
                line.codegen(state);
            }
            if self.has_trailing_newline {
                if state.is_empty() {
                    state.add_default_newline();
                }
            } else {
                state.pop_trailing_newline();
            }
        });
    }
}

// Only the tree-shaped fields take part in traversal; the formatting
// defaults are carried over unchanged.
impl CstNode for Module {
    fn node_ref(&self) -> NodeRef<'_> {
        NodeRef::Module(self)
    }

    fn walk_children<V: Visitor + ?Sized>(&self, visitor: &mut V) {
        let node = NodeRef::Module(self);
        visitor.on_visit_attribute(node, "header");
        self.header.walk(visitor);
        visitor.on_leave_attribute(node, "header");
        visitor.on_visit_attribute(node, "body");
        self.body.walk(visitor);
        visitor.on_leave_attribute(node, "body");
        visitor.on_visit_attribute(node, "footer");
        self.footer.walk(visitor);
        visitor.on_leave_attribute(node, "footer");
    }

    fn transform_children<T: Transformer + ?Sized>(&self, transformer: &mut T) -> Result<Self> {
        let node = NodeRef::Module(self);
        transformer.on_visit_attribute(node, "header");
        let header = self.header.transform(transformer)?;
        transformer.on_leave_attribute(node, "header");
        transformer.on_visit_attribute(node, "body");
        let body = self.body.transform(transformer)?;
        transformer.on_leave_attribute(node, "body");
        transformer.on_visit_attribute(node, "footer");
        let footer = self.footer.transform(transformer)?;
        transformer.on_leave_attribute(node, "footer");
        Ok(Self {
            header,
            body,
            footer,
            ..self.clone_defaults()
        })
    }

    fn leave<T: Transformer + ?Sized>(
        &self,
        updated: Self,
        transformer: &mut T,
    ) -> Result<Transformed<Self>> {
        let result = transformer.on_leave(NodeRef::Module(self), AnyNode::Module(updated));
        narrow(NodeKind::Module, result, |node| match node {
            AnyNode::Module(node) => Ok(node),
            other => Err(other),
        })
    }
}

impl Module {
    fn clone_defaults(&self) -> Self {
        Self {
            header: Vec::new(),
            body: Vec::new(),
            footer: Vec::new(),
            encoding: self.encoding.clone(),
            default_indent: self.default_indent.clone(),
            default_newline: self.default_newline.clone(),
            has_trailing_newline: self.has_trailing_newline,
        }
    }
}
