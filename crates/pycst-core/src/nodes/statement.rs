//! Statement nodes
//!
//! Compound statements and simple statement lines own the empty lines in
//! front of them and emit their block's indentation before their first
//! token.

use super::expression::*;
use super::op::*;
use super::whitespace::*;
use super::{Validate, cst_node};
use crate::codegen::{Codegen, CodegenState};
use crate::visit::{
    CstNode, Fold, Item, NodeRef, Transformed, Transformer, Visitor, finish_leave, rebuild_arc,
    visit_node,
};
use crate::{CstError, Result};
use std::sync::Arc;

/// Declares a union of node kinds stored behind `Arc`, leaving through the
/// given transformer hook.
macro_rules! category_enum {
    ($(#[$meta:meta])* $name:ident, $leave:ident { $($variant:ident),* $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq)]
        pub enum $name {
            $($variant(Arc<$variant>),)*
        }

        $(
            impl From<$variant> for $name {
                fn from(node: $variant) -> Self {
                    $name::$variant(Arc::new(node))
                }
            }
        )*

        impl $name {
            pub fn node_ref(&self) -> NodeRef<'_> {
                match self {
                    $($name::$variant(node) => node.node_ref(),)*
                }
            }
        }

        impl Validate for $name {
            fn validate(&self) -> Result<()> {
                match self {
                    $($name::$variant(node) => node.validate(),)*
                }
            }
        }

        impl Codegen for $name {
            fn codegen(&self, state: &mut CodegenState) {
                match self {
                    $($name::$variant(node) => node.codegen(state),)*
                }
            }
        }

        impl Item for $name {
            fn walk_item<V: Visitor + ?Sized>(&self, visitor: &mut V) {
                match self {
                    $($name::$variant(node) => visit_node(&**node, visitor),)*
                }
            }

            fn transform_item<T: Transformer + ?Sized>(
                &self,
                transformer: &mut T,
            ) -> Result<Transformed<Self>> {
                let updated = match self {
                    $(
                        $name::$variant(node) => match rebuild_arc(node, transformer)? {
                            Transformed::Keep(node) => $name::$variant(node),
                            other => return Ok(other.map($name::$variant)),
                        },
                    )*
                };
                finish_leave(transformer.$leave(self, updated))
            }
        }
    };
}

category_enum!(
    /// A statement that occupies its own line or block.
    Statement, leave_statement {
        SimpleStatementLine,
        If,
        While,
        For,
        Try,
        With,
        FunctionDef,
        ClassDef,
    }
);

category_enum!(
    /// A statement that can share a line with others, separated by `;`.
    SmallStatement, leave_small_statement {
        Expr,
        Assign,
        AnnAssign,
        AugAssign,
        Pass,
        Break,
        Continue,
        Return,
        Raise,
        Del,
        Import,
        ImportFrom,
        Global,
        Nonlocal,
        Assert,
    }
);

category_enum!(
    /// The body of a compound statement.
    Suite, leave_suite {
        IndentedBlock,
        SimpleStatementSuite,
    }
);

impl SmallStatement {
    pub fn semicolon(&self) -> Option<&Semicolon> {
        match self {
            SmallStatement::Expr(n) => n.semicolon.as_ref(),
            SmallStatement::Assign(n) => n.semicolon.as_ref(),
            SmallStatement::AnnAssign(n) => n.semicolon.as_ref(),
            SmallStatement::AugAssign(n) => n.semicolon.as_ref(),
            SmallStatement::Pass(n) => n.semicolon.as_ref(),
            SmallStatement::Break(n) => n.semicolon.as_ref(),
            SmallStatement::Continue(n) => n.semicolon.as_ref(),
            SmallStatement::Return(n) => n.semicolon.as_ref(),
            SmallStatement::Raise(n) => n.semicolon.as_ref(),
            SmallStatement::Del(n) => n.semicolon.as_ref(),
            SmallStatement::Import(n) => n.semicolon.as_ref(),
            SmallStatement::ImportFrom(n) => n.semicolon.as_ref(),
            SmallStatement::Global(n) => n.semicolon.as_ref(),
            SmallStatement::Nonlocal(n) => n.semicolon.as_ref(),
            SmallStatement::Assert(n) => n.semicolon.as_ref(),
        }
    }
}

fn require_space(whitespace: &Whitespace, safe: bool, message: &str) -> Result<()> {
    if whitespace.is_empty() && !safe {
        return Err(CstError::structural(message));
    }
    Ok(())
}

fn validate_commas<'a>(commas: impl ExactSizeIterator<Item = Option<&'a Comma>>) -> Result<()> {
    let len = commas.len();
    for (i, comma) in commas.enumerate() {
        if comma.is_none() && i + 1 < len {
            return Err(CstError::structural(
                "Every element but the last must be followed by a comma.",
            ));
        }
    }
    Ok(())
}

fn leading(state: &mut CodegenState, lines: &[EmptyLine]) {
    for line in lines {
        line.codegen(state);
    }
    state.add_indent_tokens();
}

fn semicolon(state: &mut CodegenState, semicolon: &Option<Semicolon>) {
    if let Some(semicolon) = semicolon {
        semicolon.codegen(state);
    }
}

// Small statements

cst_node! {
    /// An expression evaluated for its side effects.
    pub struct Expr {
        pub value: Expression,
        pub semicolon: Option<Semicolon>,
    }
}

impl Expr {
    pub fn new(value: impl Into<Expression>) -> Self {
        Self {
            value: value.into(),
            semicolon: None,
        }
    }
}

impl Validate for Expr {}

impl Codegen for Expr {
    fn codegen(&self, state: &mut CodegenState) {
        state.record(self, |state| self.value.codegen(state));
        semicolon(state, &self.semicolon);
    }
}

cst_node! {
    /// `target =`, one of possibly several in a chained assignment.
    pub struct AssignTarget {
        pub target: Expression,
        pub whitespace_before_equal: Whitespace,
        pub whitespace_after_equal: Whitespace,
    }
}

impl Validate for AssignTarget {}

impl Codegen for AssignTarget {
    fn codegen(&self, state: &mut CodegenState) {
        state.record(self, |state| {
            self.target.codegen(state);
            self.whitespace_before_equal.codegen(state);
            state.add_token("=");
            self.whitespace_after_equal.codegen(state);
        });
    }
}

cst_node! {
    pub struct Assign {
        pub targets: Vec<AssignTarget>,
        pub value: Expression,
        pub semicolon: Option<Semicolon>,
    }
}

impl Validate for Assign {
    fn validate(&self) -> Result<()> {
        if self.targets.is_empty() {
            return Err(CstError::structural(
                "An Assign statement must have at least one AssignTarget.",
            ));
        }
        Ok(())
    }
}

impl Codegen for Assign {
    fn codegen(&self, state: &mut CodegenState) {
        state.record(self, |state| {
            for target in &self.targets {
                target.codegen(state);
            }
            self.value.codegen(state);
        });
        semicolon(state, &self.semicolon);
    }
}

cst_node! {
    /// `target: annotation [= value]`
    pub struct AnnAssign {
        pub target: Expression,
        pub annotation: Annotation,
        pub equal: Option<AssignEqual>,
        pub value: Option<Expression>,
        pub semicolon: Option<Semicolon>,
    }
}

impl Validate for AnnAssign {
    fn validate(&self) -> Result<()> {
        if self.equal.is_some() != self.value.is_some() {
            return Err(CstError::structural(
                "Must have a value when specifying an AssignEqual.",
            ));
        }
        if self.annotation.indicator != AnnotationIndicator::Colon {
            return Err(CstError::structural(
                "An annotated assignment uses ':' before its annotation.",
            ));
        }
        Ok(())
    }
}

impl Codegen for AnnAssign {
    fn codegen(&self, state: &mut CodegenState) {
        state.record(self, |state| {
            self.target.codegen(state);
            self.annotation.codegen(state);
            if let (Some(equal), Some(value)) = (&self.equal, &self.value) {
                equal.codegen(state);
                value.codegen(state);
            }
        });
        semicolon(state, &self.semicolon);
    }
}

cst_node! {
    /// `target op= value`
    pub struct AugAssign {
        pub target: Expression,
        pub operator: AugmentedOperator,
        pub value: Expression,
        pub semicolon: Option<Semicolon>,
    }
}

impl Validate for AugAssign {}

impl Codegen for AugAssign {
    fn codegen(&self, state: &mut CodegenState) {
        state.record(self, |state| {
            self.target.codegen(state);
            self.operator.codegen(state);
            self.value.codegen(state);
        });
        semicolon(state, &self.semicolon);
    }
}

/// Declares a statement made of a single keyword.
macro_rules! keyword_statement {
    ($(#[$meta:meta])* $name:ident, $keyword:literal) => {
        cst_node! {
            $(#[$meta])*
            pub struct $name {
                pub semicolon: Option<Semicolon>,
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self { semicolon: None }
            }
        }

        impl Validate for $name {}

        impl Codegen for $name {
            fn codegen(&self, state: &mut CodegenState) {
                state.record(self, |state| state.add_token($keyword));
                semicolon(state, &self.semicolon);
            }
        }
    };
}

keyword_statement!(Pass, "pass");
keyword_statement!(Break, "break");
keyword_statement!(Continue, "continue");

cst_node! {
    pub struct Return {
        pub whitespace_after_return: Whitespace,
        pub value: Option<Expression>,
        pub semicolon: Option<Semicolon>,
    }
}

impl Validate for Return {
    fn validate(&self) -> Result<()> {
        if let Some(value) = &self.value {
            require_space(
                &self.whitespace_after_return,
                value.starts_with_delimiter(),
                "Must have at least one space after 'return'.",
            )?;
        }
        Ok(())
    }
}

impl Codegen for Return {
    fn codegen(&self, state: &mut CodegenState) {
        state.record(self, |state| {
            state.add_token("return");
            self.whitespace_after_return.codegen(state);
            if let Some(value) = &self.value {
                value.codegen(state);
            }
        });
        semicolon(state, &self.semicolon);
    }
}

cst_node! {
    /// The `from cause` of a `raise`.
    pub struct RaiseFrom {
        pub whitespace_before_from: Whitespace,
        pub whitespace_after_from: Whitespace,
        pub item: Expression,
    }
}

impl Validate for RaiseFrom {
    fn validate(&self) -> Result<()> {
        require_space(
            &self.whitespace_after_from,
            self.item.starts_with_delimiter(),
            "Must have at least one space after 'from'.",
        )
    }
}

impl Codegen for RaiseFrom {
    fn codegen(&self, state: &mut CodegenState) {
        state.record(self, |state| {
            self.whitespace_before_from.codegen(state);
            state.add_token("from");
            self.whitespace_after_from.codegen(state);
            self.item.codegen(state);
        });
    }
}

cst_node! {
    pub struct Raise {
        pub whitespace_after_raise: Whitespace,
        pub exc: Option<Expression>,
        pub cause: Option<RaiseFrom>,
        pub semicolon: Option<Semicolon>,
    }
}

impl Validate for Raise {
    fn validate(&self) -> Result<()> {
        match (&self.exc, &self.cause) {
            (None, Some(_)) => Err(CstError::structural(
                "Must have an 'exc' when specifying 'cause' on a Raise.",
            )),
            (Some(exc), cause) => {
                require_space(
                    &self.whitespace_after_raise,
                    exc.starts_with_delimiter(),
                    "Must have at least one space after 'raise'.",
                )?;
                if let Some(cause) = cause {
                    require_space(
                        &cause.whitespace_before_from,
                        exc.ends_with_delimiter(),
                        "Must have at least one space before 'from'.",
                    )?;
                }
                Ok(())
            }
            (None, None) => Ok(()),
        }
    }
}

impl Codegen for Raise {
    fn codegen(&self, state: &mut CodegenState) {
        state.record(self, |state| {
            state.add_token("raise");
            self.whitespace_after_raise.codegen(state);
            if let Some(exc) = &self.exc {
                exc.codegen(state);
            }
            if let Some(cause) = &self.cause {
                cause.codegen(state);
            }
        });
        semicolon(state, &self.semicolon);
    }
}

cst_node! {
    pub struct Del {
        pub whitespace_after_del: Whitespace,
        pub target: Expression,
        pub semicolon: Option<Semicolon>,
    }
}

impl Validate for Del {
    fn validate(&self) -> Result<()> {
        require_space(
            &self.whitespace_after_del,
            self.target.starts_with_delimiter(),
            "Must have at least one space after 'del'.",
        )
    }
}

impl Codegen for Del {
    fn codegen(&self, state: &mut CodegenState) {
        state.record(self, |state| {
            state.add_token("del");
            self.whitespace_after_del.codegen(state);
            self.target.codegen(state);
        });
        semicolon(state, &self.semicolon);
    }
}

cst_node! {
    /// `as name` after an import, `with` item or `except` clause.
    pub struct AsName {
        pub whitespace_before_as: Whitespace,
        pub whitespace_after_as: Whitespace,
        pub name: Expression,
    }
}

impl Validate for AsName {
    fn validate(&self) -> Result<()> {
        require_space(
            &self.whitespace_after_as,
            self.name.starts_with_delimiter(),
            "There must be at least one space between 'as' and name.",
        )
    }
}

impl Codegen for AsName {
    fn codegen(&self, state: &mut CodegenState) {
        state.record(self, |state| {
            self.whitespace_before_as.codegen(state);
            state.add_token("as");
            self.whitespace_after_as.codegen(state);
            self.name.codegen(state);
        });
    }
}

cst_node! {
    /// A dotted module or imported name with an optional alias.
    pub struct ImportAlias {
        pub name: Expression,
        pub asname: Option<AsName>,
        pub comma: Option<Comma>,
    }
}

impl ImportAlias {
    /// The dotted name as written, without whitespace.
    pub fn dotted_name(&self) -> String {
        fn flatten(expression: &Expression, out: &mut String) {
            match expression {
                Expression::Name(name) => out.push_str(&name.value),
                Expression::Attribute(attribute) => {
                    flatten(&attribute.value, out);
                    out.push('.');
                    out.push_str(&attribute.attr.value);
                }
                _ => {}
            }
        }
        let mut out = String::new();
        flatten(&self.name, &mut out);
        out
    }
}

impl Validate for ImportAlias {
    fn validate(&self) -> Result<()> {
        fn dotted(expression: &Expression) -> bool {
            match expression {
                Expression::Name(_) => true,
                Expression::Attribute(attribute) => dotted(&attribute.value),
                _ => false,
            }
        }
        if !dotted(&self.name) {
            return Err(CstError::structural(
                "An imported name must be a dotted name.",
            ));
        }
        if let Some(asname) = &self.asname {
            if !matches!(asname.name, Expression::Name(_)) {
                return Err(CstError::structural("An import alias must be a name."));
            }
        }
        Ok(())
    }
}

impl Codegen for ImportAlias {
    fn codegen(&self, state: &mut CodegenState) {
        state.record(self, |state| {
            self.name.codegen(state);
            if let Some(asname) = &self.asname {
                asname.codegen(state);
            }
            if let Some(comma) = &self.comma {
                comma.codegen(state);
            }
        });
    }
}

cst_node! {
    pub struct Import {
        pub whitespace_after_import: Whitespace,
        pub names: Vec<ImportAlias>,
        pub semicolon: Option<Semicolon>,
    }
}

impl Validate for Import {
    fn validate(&self) -> Result<()> {
        if self.names.is_empty() {
            return Err(CstError::structural(
                "An Import must have at least one ImportAlias.",
            ));
        }
        if self.names.last().is_some_and(|n| n.comma.is_some()) {
            return Err(CstError::structural(
                "An Import does not allow a trailing comma.",
            ));
        }
        if self.whitespace_after_import.is_empty() {
            return Err(CstError::structural(
                "Must have at least one space after import.",
            ));
        }
        validate_commas(self.names.iter().map(|n| n.comma.as_ref()))
    }
}

impl Codegen for Import {
    fn codegen(&self, state: &mut CodegenState) {
        state.record(self, |state| {
            state.add_token("import");
            self.whitespace_after_import.codegen(state);
            for name in &self.names {
                name.codegen(state);
            }
        });
        semicolon(state, &self.semicolon);
    }
}

/// One `.` or `...` token of a relative import.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RelativeDot {
    pub whitespace_before: Whitespace,
    pub dots: String,
}

impl RelativeDot {
    /// Number of levels this token climbs.
    pub fn level(&self) -> usize {
        self.dots.len()
    }
}

/// The names brought in by `from ... import`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImportNames {
    Star,
    Aliases(Vec<ImportAlias>),
}

impl Validate for ImportNames {}

impl Item for ImportNames {
    fn walk_item<V: Visitor + ?Sized>(&self, visitor: &mut V) {
        if let ImportNames::Aliases(aliases) = self {
            aliases.walk(visitor);
        }
    }

    fn transform_item<T: Transformer + ?Sized>(
        &self,
        transformer: &mut T,
    ) -> Result<Transformed<Self>> {
        Ok(Transformed::Keep(match self {
            ImportNames::Star => ImportNames::Star,
            ImportNames::Aliases(aliases) => ImportNames::Aliases(aliases.transform(transformer)?),
        }))
    }
}

cst_node! {
    /// `from [dots][module] import names`
    pub struct ImportFrom {
        pub whitespace_after_from: Whitespace,
        pub relative: Vec<RelativeDot>,
        pub whitespace_before_module: Whitespace,
        pub module: Option<Expression>,
        pub whitespace_before_import: Whitespace,
        pub whitespace_after_import: Whitespace,
        pub lpar: Option<LeftParen>,
        pub names: ImportNames,
        pub rpar: Option<RightParen>,
        pub semicolon: Option<Semicolon>,
    }
}

impl ImportFrom {
    /// Number of leading dots.
    pub fn level(&self) -> usize {
        self.relative.iter().map(RelativeDot::level).sum()
    }
}

impl Validate for ImportFrom {
    fn validate(&self) -> Result<()> {
        if self.relative.is_empty() && self.module.is_none() {
            return Err(CstError::structural(
                "Must have a module specified if there is no relative import.",
            ));
        }
        if self.lpar.is_some() != self.rpar.is_some() {
            return Err(CstError::structural(
                "Cannot have a left paren without a right paren or vice versa.",
            ));
        }
        match &self.names {
            ImportNames::Star if self.lpar.is_some() => Err(CstError::structural(
                "An ImportFrom using '*' cannot have parentheses.",
            )),
            ImportNames::Star => Ok(()),
            ImportNames::Aliases(aliases) => {
                if aliases.is_empty() {
                    return Err(CstError::structural(
                        "An ImportFrom must have at least one ImportAlias.",
                    ));
                }
                if self.lpar.is_none() && aliases.last().is_some_and(|a| a.comma.is_some()) {
                    return Err(CstError::structural(
                        "An ImportFrom needs parentheses to have a trailing comma.",
                    ));
                }
                validate_commas(aliases.iter().map(|a| a.comma.as_ref()))
            }
        }
    }
}

impl Codegen for ImportFrom {
    fn codegen(&self, state: &mut CodegenState) {
        state.record(self, |state| {
            state.add_token("from");
            self.whitespace_after_from.codegen(state);
            for dot in &self.relative {
                dot.whitespace_before.codegen(state);
                state.add_token(&dot.dots);
            }
            self.whitespace_before_module.codegen(state);
            if let Some(module) = &self.module {
                module.codegen(state);
            }
            self.whitespace_before_import.codegen(state);
            state.add_token("import");
            self.whitespace_after_import.codegen(state);
            if let Some(lpar) = &self.lpar {
                lpar.codegen(state);
            }
            match &self.names {
                ImportNames::Star => state.add_token("*"),
                ImportNames::Aliases(aliases) => {
                    for alias in aliases {
                        alias.codegen(state);
                    }
                }
            }
            if let Some(rpar) = &self.rpar {
                rpar.codegen(state);
            }
        });
        semicolon(state, &self.semicolon);
    }
}

cst_node! {
    /// A name in a `global` or `nonlocal` list.
    pub struct NameItem {
        pub name: Name,
        pub comma: Option<Comma>,
    }
}

impl Validate for NameItem {}

impl Codegen for NameItem {
    fn codegen(&self, state: &mut CodegenState) {
        state.record(self, |state| {
            self.name.codegen(state);
            if let Some(comma) = &self.comma {
                comma.codegen(state);
            }
        });
    }
}

/// Declares `global` or `nonlocal`.
macro_rules! scope_statement {
    ($name:ident, $whitespace:ident, $keyword:literal) => {
        cst_node! {
            pub struct $name {
                pub $whitespace: Whitespace,
                pub names: Vec<NameItem>,
                pub semicolon: Option<Semicolon>,
            }
        }

        impl Validate for $name {
            fn validate(&self) -> Result<()> {
                if self.names.is_empty() {
                    return Err(CstError::structural(concat!(
                        "A ", stringify!($name), " statement must have at least one NameItem."
                    )));
                }
                if self.names.last().is_some_and(|n| n.comma.is_some()) {
                    return Err(CstError::structural(concat!(
                        "A ", stringify!($name), " statement does not allow a trailing comma."
                    )));
                }
                if self.$whitespace.is_empty() {
                    return Err(CstError::structural(concat!(
                        "Must have at least one space after '", $keyword, "'."
                    )));
                }
                validate_commas(self.names.iter().map(|n| n.comma.as_ref()))
            }
        }

        impl Codegen for $name {
            fn codegen(&self, state: &mut CodegenState) {
                state.record(self, |state| {
                    state.add_token($keyword);
                    self.$whitespace.codegen(state);
                    for name in &self.names {
                        name.codegen(state);
                    }
                });
                semicolon(state, &self.semicolon);
            }
        }
    };
}

scope_statement!(Global, whitespace_after_global, "global");
scope_statement!(Nonlocal, whitespace_after_nonlocal, "nonlocal");

cst_node! {
    /// `assert test[, msg]`
    pub struct Assert {
        pub whitespace_after_assert: Whitespace,
        pub test: Expression,
        pub comma: Option<Comma>,
        pub msg: Option<Expression>,
        pub semicolon: Option<Semicolon>,
    }
}

impl Validate for Assert {
    fn validate(&self) -> Result<()> {
        require_space(
            &self.whitespace_after_assert,
            self.test.starts_with_delimiter(),
            "Must have at least one space after 'assert'.",
        )?;
        if self.comma.is_some() != self.msg.is_some() {
            return Err(CstError::structural(
                "An assert message needs a comma and the comma needs a message.",
            ));
        }
        Ok(())
    }
}

impl Codegen for Assert {
    fn codegen(&self, state: &mut CodegenState) {
        state.record(self, |state| {
            state.add_token("assert");
            self.whitespace_after_assert.codegen(state);
            self.test.codegen(state);
            if let (Some(comma), Some(msg)) = (&self.comma, &self.msg) {
                comma.codegen(state);
                msg.codegen(state);
            }
        });
        semicolon(state, &self.semicolon);
    }
}

// Lines and blocks

cst_node! {
    /// One or more small statements on a single logical line.
    pub struct SimpleStatementLine {
        pub leading_lines: Vec<EmptyLine>,
        pub body: Vec<SmallStatement>,
        pub trailing_whitespace: TrailingWhitespace,
    }
    vacant_when_empty(body)
}

impl SimpleStatementLine {
    pub fn new(body: Vec<SmallStatement>) -> Self {
        Self {
            leading_lines: Vec::new(),
            body,
            trailing_whitespace: TrailingWhitespace::default(),
        }
    }
}

fn validate_small_body(body: &[SmallStatement]) -> Result<()> {
    if body.is_empty() {
        return Err(CstError::structural(
            "A line of simple statements must have at least one statement.",
        ));
    }
    if body[..body.len() - 1].iter().any(|s| s.semicolon().is_none()) {
        return Err(CstError::structural(
            "Every statement but the last on a line must end with a semicolon.",
        ));
    }
    Ok(())
}

impl Validate for SimpleStatementLine {
    fn validate(&self) -> Result<()> {
        validate_small_body(&self.body)
    }
}

impl Codegen for SimpleStatementLine {
    fn codegen(&self, state: &mut CodegenState) {
        leading(state, &self.leading_lines);
        state.record(self, |state| {
            for statement in &self.body {
                statement.codegen(state);
            }
        });
        self.trailing_whitespace.codegen(state);
    }
}

cst_node! {
    /// Small statements written on the header line, after the colon.
    pub struct SimpleStatementSuite {
        pub leading_whitespace: Whitespace,
        pub body: Vec<SmallStatement>,
        pub trailing_whitespace: TrailingWhitespace,
    }
}

impl Validate for SimpleStatementSuite {
    fn validate(&self) -> Result<()> {
        validate_small_body(&self.body)
    }
}

impl Codegen for SimpleStatementSuite {
    fn codegen(&self, state: &mut CodegenState) {
        self.leading_whitespace.codegen(state);
        state.record(self, |state| {
            for statement in &self.body {
                statement.codegen(state);
            }
        });
        self.trailing_whitespace.codegen(state);
    }
}

cst_node! {
    /// An indented block of statements.
    pub struct IndentedBlock {
        /// The rest of the header line, after the colon
        pub header: TrailingWhitespace,
        /// The block's own indentation, when it differs from the module default
        pub indent: Option<String>,
        pub body: Vec<Statement>,
        /// Comment lines at the end of the block, indented with it
        pub footer: Vec<EmptyLine>,
    }
}

impl IndentedBlock {
    pub fn new(body: Vec<Statement>) -> Self {
        Self {
            header: TrailingWhitespace::default(),
            indent: None,
            body,
            footer: Vec::new(),
        }
    }
}

impl Validate for IndentedBlock {
    fn validate(&self) -> Result<()> {
        if self.body.is_empty() {
            return Err(CstError::structural(
                "An indented block must have at least one statement.",
            ));
        }
        if let Some(indent) = &self.indent {
            if indent.is_empty() || !indent.chars().all(|c| matches!(c, ' ' | '\t' | '\x0c')) {
                return Err(CstError::structural(
                    "An indented block's indent must be non-empty blanks.",
                ));
            }
        }
        Ok(())
    }
}

impl Codegen for IndentedBlock {
    fn codegen(&self, state: &mut CodegenState) {
        self.header.codegen(state);
        match &self.indent {
            Some(indent) => state.push_indent(indent.as_str()),
            None => state.push_default_indent(),
        }
        state.record(self, |state| {
            for statement in &self.body {
                statement.codegen(state);
            }
        });
        for line in &self.footer {
            line.codegen(state);
        }
        state.pop_indent();
    }
}

// Compound statements

cst_node! {
    pub struct Else {
        pub leading_lines: Vec<EmptyLine>,
        pub whitespace_before_colon: Whitespace,
        pub body: Suite,
    }
}

impl Validate for Else {}

impl Codegen for Else {
    fn codegen(&self, state: &mut CodegenState) {
        leading(state, &self.leading_lines);
        state.record(self, |state| {
            state.add_token("else");
            self.whitespace_before_colon.codegen(state);
            state.add_token(":");
            self.body.codegen(state);
        });
    }
}

/// What follows an `if` body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrElse {
    Elif(Arc<If>),
    Else(Arc<Else>),
}

impl Validate for OrElse {
    fn validate(&self) -> Result<()> {
        match self {
            OrElse::Elif(node) => node.validate(),
            OrElse::Else(node) => node.validate(),
        }
    }
}

impl Codegen for OrElse {
    fn codegen(&self, state: &mut CodegenState) {
        match self {
            OrElse::Elif(node) => node.codegen_with_keyword(state, "elif"),
            OrElse::Else(node) => node.codegen(state),
        }
    }
}

impl Item for OrElse {
    fn walk_item<V: Visitor + ?Sized>(&self, visitor: &mut V) {
        match self {
            OrElse::Elif(node) => visit_node(&**node, visitor),
            OrElse::Else(node) => visit_node(&**node, visitor),
        }
    }

    fn transform_item<T: Transformer + ?Sized>(
        &self,
        transformer: &mut T,
    ) -> Result<Transformed<Self>> {
        Ok(match self {
            OrElse::Elif(node) => rebuild_arc(node, transformer)?.map(OrElse::Elif),
            OrElse::Else(node) => rebuild_arc(node, transformer)?.map(OrElse::Else),
        })
    }
}

cst_node! {
    /// An `if` statement. An `elif` is an [`If`] held in the `orelse` of the
    /// one before it.
    pub struct If {
        pub leading_lines: Vec<EmptyLine>,
        pub whitespace_before_test: Whitespace,
        pub test: Expression,
        pub whitespace_after_test: Whitespace,
        pub body: Suite,
        pub orelse: Option<OrElse>,
    }
}

impl If {
    fn codegen_with_keyword(&self, state: &mut CodegenState, keyword: &str) {
        leading(state, &self.leading_lines);
        state.record(self, |state| {
            state.add_token(keyword);
            self.whitespace_before_test.codegen(state);
            self.test.codegen(state);
            self.whitespace_after_test.codegen(state);
            state.add_token(":");
            self.body.codegen(state);
        });
        if let Some(orelse) = &self.orelse {
            orelse.codegen(state);
        }
    }
}

impl Validate for If {
    fn validate(&self) -> Result<()> {
        require_space(
            &self.whitespace_before_test,
            self.test.starts_with_delimiter(),
            "Must have at least one space after 'if' keyword.",
        )
    }
}

impl Codegen for If {
    fn codegen(&self, state: &mut CodegenState) {
        self.codegen_with_keyword(state, "if");
    }
}

cst_node! {
    pub struct While {
        pub leading_lines: Vec<EmptyLine>,
        pub whitespace_after_while: Whitespace,
        pub test: Expression,
        pub whitespace_before_colon: Whitespace,
        pub body: Suite,
        pub orelse: Option<Else>,
    }
}

impl Validate for While {
    fn validate(&self) -> Result<()> {
        require_space(
            &self.whitespace_after_while,
            self.test.starts_with_delimiter(),
            "Must have at least one space after 'while' keyword.",
        )
    }
}

impl Codegen for While {
    fn codegen(&self, state: &mut CodegenState) {
        leading(state, &self.leading_lines);
        state.record(self, |state| {
            state.add_token("while");
            self.whitespace_after_while.codegen(state);
            self.test.codegen(state);
            self.whitespace_before_colon.codegen(state);
            state.add_token(":");
            self.body.codegen(state);
        });
        if let Some(orelse) = &self.orelse {
            orelse.codegen(state);
        }
    }
}

cst_node! {
    pub struct For {
        pub leading_lines: Vec<EmptyLine>,
        pub asynchronous: Option<Asynchronous>,
        pub whitespace_after_for: Whitespace,
        pub target: Expression,
        pub whitespace_before_in: Whitespace,
        pub whitespace_after_in: Whitespace,
        pub iter: Expression,
        pub whitespace_before_colon: Whitespace,
        pub body: Suite,
        pub orelse: Option<Else>,
    }
}

impl Validate for For {
    fn validate(&self) -> Result<()> {
        require_space(
            &self.whitespace_after_for,
            self.target.starts_with_delimiter(),
            "Must have at least one space after 'for' keyword.",
        )?;
        require_space(
            &self.whitespace_before_in,
            self.target.ends_with_delimiter(),
            "Must have at least one space before 'in' keyword.",
        )?;
        require_space(
            &self.whitespace_after_in,
            self.iter.starts_with_delimiter(),
            "Must have at least one space after 'in' keyword.",
        )
    }
}

impl Codegen for For {
    fn codegen(&self, state: &mut CodegenState) {
        leading(state, &self.leading_lines);
        state.record(self, |state| {
            if let Some(asynchronous) = &self.asynchronous {
                asynchronous.codegen(state);
            }
            state.add_token("for");
            self.whitespace_after_for.codegen(state);
            self.target.codegen(state);
            self.whitespace_before_in.codegen(state);
            state.add_token("in");
            self.whitespace_after_in.codegen(state);
            self.iter.codegen(state);
            self.whitespace_before_colon.codegen(state);
            state.add_token(":");
            self.body.codegen(state);
        });
        if let Some(orelse) = &self.orelse {
            orelse.codegen(state);
        }
    }
}

cst_node! {
    /// `except [type [as name]]:` and its body.
    pub struct ExceptHandler {
        pub leading_lines: Vec<EmptyLine>,
        pub whitespace_after_except: Whitespace,
        pub exception: Option<Expression>,
        pub name: Option<AsName>,
        pub whitespace_before_colon: Whitespace,
        pub body: Suite,
    }
}

impl Validate for ExceptHandler {
    fn validate(&self) -> Result<()> {
        match &self.exception {
            None if self.name.is_some() => Err(CstError::structural(
                "Cannot have a name for an empty type.",
            )),
            Some(exception) => require_space(
                &self.whitespace_after_except,
                exception.starts_with_delimiter(),
                "Must have at least one space after except when ExceptHandler has a type.",
            ),
            None => Ok(()),
        }
    }
}

impl Codegen for ExceptHandler {
    fn codegen(&self, state: &mut CodegenState) {
        leading(state, &self.leading_lines);
        state.record(self, |state| {
            state.add_token("except");
            self.whitespace_after_except.codegen(state);
            if let Some(exception) = &self.exception {
                exception.codegen(state);
            }
            if let Some(name) = &self.name {
                name.codegen(state);
            }
            self.whitespace_before_colon.codegen(state);
            state.add_token(":");
            self.body.codegen(state);
        });
    }
}

cst_node! {
    pub struct Finally {
        pub leading_lines: Vec<EmptyLine>,
        pub whitespace_before_colon: Whitespace,
        pub body: Suite,
    }
}

impl Validate for Finally {}

impl Codegen for Finally {
    fn codegen(&self, state: &mut CodegenState) {
        leading(state, &self.leading_lines);
        state.record(self, |state| {
            state.add_token("finally");
            self.whitespace_before_colon.codegen(state);
            state.add_token(":");
            self.body.codegen(state);
        });
    }
}

cst_node! {
    pub struct Try {
        pub leading_lines: Vec<EmptyLine>,
        pub whitespace_before_colon: Whitespace,
        pub body: Suite,
        pub handlers: Vec<ExceptHandler>,
        pub orelse: Option<Else>,
        pub finalbody: Option<Finally>,
    }
}

impl Validate for Try {
    fn validate(&self) -> Result<()> {
        if self.handlers.is_empty() && self.finalbody.is_none() {
            return Err(CstError::structural(
                "A Try statement must have at least one ExceptHandler or Finally.",
            ));
        }
        if self.handlers.is_empty() && self.orelse.is_some() {
            return Err(CstError::structural(
                "A Try statement must have an ExceptHandler in order to have an Else.",
            ));
        }
        let last = self.handlers.len().saturating_sub(1);
        if self.handlers[..last].iter().any(|h| h.exception.is_none()) {
            return Err(CstError::structural(
                "The bare except: handler must be the last one.",
            ));
        }
        Ok(())
    }
}

impl Codegen for Try {
    fn codegen(&self, state: &mut CodegenState) {
        leading(state, &self.leading_lines);
        state.record(self, |state| {
            state.add_token("try");
            self.whitespace_before_colon.codegen(state);
            state.add_token(":");
            self.body.codegen(state);
        });
        for handler in &self.handlers {
            handler.codegen(state);
        }
        if let Some(orelse) = &self.orelse {
            orelse.codegen(state);
        }
        if let Some(finalbody) = &self.finalbody {
            finalbody.codegen(state);
        }
    }
}

cst_node! {
    /// `item [as name]` in a `with` statement.
    pub struct WithItem {
        pub item: Expression,
        pub asname: Option<AsName>,
        pub comma: Option<Comma>,
    }
}

impl Validate for WithItem {}

impl Codegen for WithItem {
    fn codegen(&self, state: &mut CodegenState) {
        state.record(self, |state| {
            self.item.codegen(state);
            if let Some(asname) = &self.asname {
                asname.codegen(state);
            }
            if let Some(comma) = &self.comma {
                comma.codegen(state);
            }
        });
    }
}

cst_node! {
    pub struct With {
        pub leading_lines: Vec<EmptyLine>,
        pub asynchronous: Option<Asynchronous>,
        pub whitespace_after_with: Whitespace,
        pub items: Vec<WithItem>,
        pub whitespace_before_colon: Whitespace,
        pub body: Suite,
    }
}

impl Validate for With {
    fn validate(&self) -> Result<()> {
        let Some(first) = self.items.first() else {
            return Err(CstError::structural(
                "A With statement must have at least one WithItem.",
            ));
        };
        if self.items.last().is_some_and(|i| i.comma.is_some()) {
            return Err(CstError::structural(
                "The last WithItem in a With cannot have a trailing comma.",
            ));
        }
        require_space(
            &self.whitespace_after_with,
            first.item.starts_with_delimiter(),
            "Must have at least one space after with keyword.",
        )?;
        validate_commas(self.items.iter().map(|i| i.comma.as_ref()))
    }
}

impl Codegen for With {
    fn codegen(&self, state: &mut CodegenState) {
        leading(state, &self.leading_lines);
        state.record(self, |state| {
            if let Some(asynchronous) = &self.asynchronous {
                asynchronous.codegen(state);
            }
            state.add_token("with");
            self.whitespace_after_with.codegen(state);
            for item in &self.items {
                item.codegen(state);
            }
            self.whitespace_before_colon.codegen(state);
            state.add_token(":");
            self.body.codegen(state);
        });
    }
}

cst_node! {
    /// `@decorator` on its own line.
    pub struct Decorator {
        pub leading_lines: Vec<EmptyLine>,
        pub whitespace_after_at: Whitespace,
        pub decorator: Expression,
        pub trailing_whitespace: TrailingWhitespace,
    }
}

impl Validate for Decorator {}

impl Codegen for Decorator {
    fn codegen(&self, state: &mut CodegenState) {
        leading(state, &self.leading_lines);
        state.record(self, |state| {
            state.add_token("@");
            self.whitespace_after_at.codegen(state);
            self.decorator.codegen(state);
        });
        self.trailing_whitespace.codegen(state);
    }
}

cst_node! {
    /// `def name(params) [-> returns]:`
    pub struct FunctionDef {
        /// Lines before the first decorator, or before `def` when undecorated
        pub leading_lines: Vec<EmptyLine>,
        pub decorators: Vec<Decorator>,
        pub lines_after_decorators: Vec<EmptyLine>,
        pub asynchronous: Option<Asynchronous>,
        pub whitespace_after_def: Whitespace,
        pub name: Name,
        pub whitespace_after_name: Whitespace,
        pub whitespace_before_params: Whitespace,
        pub params: Parameters,
        pub whitespace_before_close: Whitespace,
        pub returns: Option<Annotation>,
        pub whitespace_before_colon: Whitespace,
        pub body: Suite,
    }
}

impl Validate for FunctionDef {
    fn validate(&self) -> Result<()> {
        if self.whitespace_after_def.is_empty() {
            return Err(CstError::structural(
                "There must be at least one space between 'def' and name.",
            ));
        }
        if self
            .returns
            .as_ref()
            .is_some_and(|r| r.indicator != AnnotationIndicator::Arrow)
        {
            return Err(CstError::structural(
                "A return annotation uses '->' as its indicator.",
            ));
        }
        Ok(())
    }
}

impl Codegen for FunctionDef {
    fn codegen(&self, state: &mut CodegenState) {
        for line in &self.leading_lines {
            line.codegen(state);
        }
        for decorator in &self.decorators {
            decorator.codegen(state);
        }
        leading(state, &self.lines_after_decorators);
        state.record(self, |state| {
            if let Some(asynchronous) = &self.asynchronous {
                asynchronous.codegen(state);
            }
            state.add_token("def");
            self.whitespace_after_def.codegen(state);
            self.name.codegen(state);
            self.whitespace_after_name.codegen(state);
            state.add_token("(");
            self.whitespace_before_params.codegen(state);
            self.params.codegen(state);
            self.whitespace_before_close.codegen(state);
            state.add_token(")");
            if let Some(returns) = &self.returns {
                returns.codegen(state);
            }
            self.whitespace_before_colon.codegen(state);
            state.add_token(":");
            self.body.codegen(state);
        });
    }
}

cst_node! {
    /// `class name[(args)]:`
    pub struct ClassDef {
        pub leading_lines: Vec<EmptyLine>,
        pub decorators: Vec<Decorator>,
        pub lines_after_decorators: Vec<EmptyLine>,
        pub whitespace_after_class: Whitespace,
        pub name: Name,
        pub whitespace_before_args: Whitespace,
        pub lpar: Option<LeftParen>,
        pub args: Vec<Arg>,
        pub rpar: Option<RightParen>,
        pub whitespace_before_colon: Whitespace,
        pub body: Suite,
    }
}

impl Validate for ClassDef {
    fn validate(&self) -> Result<()> {
        if self.whitespace_after_class.is_empty() {
            return Err(CstError::structural(
                "There must be at least one space between 'class' and name.",
            ));
        }
        if self.lpar.is_some() != self.rpar.is_some() {
            return Err(CstError::structural(
                "Cannot have a left paren without a right paren or vice versa.",
            ));
        }
        if self.lpar.is_none() && !self.args.is_empty() {
            return Err(CstError::structural(
                "Class arguments need surrounding parentheses.",
            ));
        }
        validate_commas(self.args.iter().map(|a| a.comma.as_ref()))
    }
}

impl Codegen for ClassDef {
    fn codegen(&self, state: &mut CodegenState) {
        for line in &self.leading_lines {
            line.codegen(state);
        }
        for decorator in &self.decorators {
            decorator.codegen(state);
        }
        leading(state, &self.lines_after_decorators);
        state.record(self, |state| {
            state.add_token("class");
            self.whitespace_after_class.codegen(state);
            self.name.codegen(state);
            self.whitespace_before_args.codegen(state);
            if let Some(lpar) = &self.lpar {
                lpar.codegen(state);
            }
            for arg in &self.args {
                arg.codegen(state);
            }
            if let Some(rpar) = &self.rpar {
                rpar.codegen(state);
            }
            self.whitespace_before_colon.codegen(state);
            state.add_token(":");
            self.body.codegen(state);
        });
    }
}
