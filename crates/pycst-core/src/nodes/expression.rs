//! Expression nodes

use super::op::*;
use super::whitespace::*;
use super::{Validate, cst_node, validate_parens};
use crate::codegen::{Codegen, CodegenState};
use crate::visit::{
    CstNode, Fold, Item, NodeRef, Transformed, Transformer, Visitor, finish_leave, rebuild_arc,
    visit_node,
};
use crate::{CstError, Result};
use std::sync::Arc;
use unicode_xid::UnicodeXID;

/// Declares the [`Expression`] union over node kinds stored behind `Arc`.
macro_rules! expression_enum {
    ($($variant:ident),* $(,)?) => {
        /// Any expression.
        #[derive(Debug, Clone, PartialEq, Eq)]
        pub enum Expression {
            $($variant(Arc<$variant>),)*
        }

        $(
            impl From<$variant> for Expression {
                fn from(node: $variant) -> Self {
                    Expression::$variant(Arc::new(node))
                }
            }
        )*

        impl Expression {
            pub fn node_ref(&self) -> NodeRef<'_> {
                match self {
                    $(Expression::$variant(node) => node.node_ref(),)*
                }
            }

            pub fn lpar(&self) -> &[LeftParen] {
                match self {
                    $(Expression::$variant(node) => &node.lpar,)*
                }
            }

            pub fn rpar(&self) -> &[RightParen] {
                match self {
                    $(Expression::$variant(node) => &node.rpar,)*
                }
            }

            /// Wrap the expression in one more pair of parentheses, outermost.
            /// The wrapped node is validated.
            pub fn parenthesize(self, lpar: LeftParen, rpar: RightParen) -> Result<Self> {
                let wrapped = match self {
                    $(
                        Expression::$variant(mut node) => {
                            let inner = Arc::make_mut(&mut node);
                            inner.lpar.insert(0, lpar);
                            inner.rpar.push(rpar);
                            Expression::$variant(node)
                        }
                    )*
                };
                wrapped.validate()?;
                Ok(wrapped)
            }
        }

        impl Validate for Expression {
            fn validate(&self) -> Result<()> {
                match self {
                    $(Expression::$variant(node) => node.validate(),)*
                }
            }
        }

        impl Codegen for Expression {
            fn codegen(&self, state: &mut CodegenState) {
                match self {
                    $(Expression::$variant(node) => node.codegen(state),)*
                }
            }
        }

        impl Item for Expression {
            fn walk_item<V: Visitor + ?Sized>(&self, visitor: &mut V) {
                match self {
                    $(Expression::$variant(node) => visit_node(&**node, visitor),)*
                }
            }

            fn transform_item<T: Transformer + ?Sized>(
                &self,
                transformer: &mut T,
            ) -> Result<Transformed<Self>> {
                let updated = match self {
                    $(
                        Expression::$variant(node) => match rebuild_arc(node, transformer)? {
                            Transformed::Keep(node) => Expression::$variant(node),
                            other => return Ok(other.map(Expression::$variant)),
                        },
                    )*
                };
                finish_leave(transformer.leave_expression(self, updated))
            }
        }
    };
}

expression_enum!(
    Name,
    Integer,
    Float,
    Imaginary,
    SimpleString,
    ConcatenatedString,
    Ellipsis,
    Attribute,
    Call,
    Subscript,
    BinaryOperation,
    UnaryOperation,
    BooleanOperation,
    Comparison,
    IfExp,
    Lambda,
    Tuple,
    List,
    Set,
    Dict,
    ListComp,
    SetComp,
    DictComp,
    GeneratorExp,
    StarredElement,
    Await,
    Yield,
    NamedExpr,
);

impl Expression {
    /// Whether the rendered text begins with a bracket, quote or operator,
    /// so that a keyword can sit directly in front of it.
    pub fn starts_with_delimiter(&self) -> bool {
        if !self.lpar().is_empty() {
            return true;
        }
        match self {
            Expression::SimpleString(node) => node.value.starts_with(['\'', '"']),
            Expression::ConcatenatedString(node) => node.left.starts_with(['\'', '"']),
            Expression::List(_)
            | Expression::Set(_)
            | Expression::Dict(_)
            | Expression::ListComp(_)
            | Expression::SetComp(_)
            | Expression::DictComp(_)
            | Expression::StarredElement(_) => true,
            Expression::Attribute(node) => node.value.starts_with_delimiter(),
            Expression::Call(node) => node.func.starts_with_delimiter(),
            Expression::Subscript(node) => node.value.starts_with_delimiter(),
            Expression::BinaryOperation(node) => node.left.starts_with_delimiter(),
            Expression::BooleanOperation(node) => node.left.starts_with_delimiter(),
            Expression::Comparison(node) => node.left.starts_with_delimiter(),
            Expression::IfExp(node) => node.body.starts_with_delimiter(),
            Expression::UnaryOperation(node) => !node.operator.kind.is_word(),
            Expression::Tuple(node) => node
                .elements
                .first()
                .is_some_and(|e| e.value.starts_with_delimiter()),
            Expression::NamedExpr(node) => node.target.starts_with_delimiter(),
            _ => false,
        }
    }

    /// Whether the rendered text ends with a bracket or quote, so that a
    /// keyword can follow directly.
    pub fn ends_with_delimiter(&self) -> bool {
        if !self.rpar().is_empty() {
            return true;
        }
        match self {
            Expression::SimpleString(_)
            | Expression::ConcatenatedString(_)
            | Expression::List(_)
            | Expression::Set(_)
            | Expression::Dict(_)
            | Expression::ListComp(_)
            | Expression::SetComp(_)
            | Expression::DictComp(_)
            | Expression::Call(_)
            | Expression::Subscript(_) => true,
            Expression::BinaryOperation(node) => node.right.ends_with_delimiter(),
            Expression::BooleanOperation(node) => node.right.ends_with_delimiter(),
            Expression::Comparison(node) => node
                .comparisons
                .last()
                .is_some_and(|c| c.comparator.ends_with_delimiter()),
            Expression::UnaryOperation(node) => node.expression.ends_with_delimiter(),
            Expression::IfExp(node) => node.orelse.ends_with_delimiter(),
            Expression::Lambda(node) => node.body.ends_with_delimiter(),
            Expression::Await(node) => node.expression.ends_with_delimiter(),
            Expression::StarredElement(node) => node.value.ends_with_delimiter(),
            Expression::NamedExpr(node) => node.value.ends_with_delimiter(),
            Expression::Tuple(node) => node
                .elements
                .last()
                .is_some_and(|e| e.comma.is_some() || e.value.ends_with_delimiter()),
            _ => false,
        }
    }
}

fn require_space(whitespace: &Whitespace, safe: bool, message: &str) -> Result<()> {
    if whitespace.is_empty() && !safe {
        return Err(CstError::structural(message));
    }
    Ok(())
}

/// Every element but the last must be followed by a comma.
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

fn parenthesized(
    state: &mut CodegenState,
    lpar: &[LeftParen],
    rpar: &[RightParen],
    emit: impl FnOnce(&mut CodegenState),
) {
    for paren in lpar {
        paren.codegen(state);
    }
    emit(state);
    for paren in rpar {
        paren.codegen(state);
    }
}

// Atoms

cst_node! {
    /// An identifier, or one of `None`, `True` and `False`.
    pub struct Name {
        pub lpar: Vec<LeftParen>,
        pub value: String,
        pub rpar: Vec<RightParen>,
    }
}

impl Name {
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            lpar: Vec::new(),
            value: value.into(),
            rpar: Vec::new(),
        }
    }
}

impl Validate for Name {
    fn validate(&self) -> Result<()> {
        validate_parens(&self.lpar, &self.rpar)?;
        let mut chars = self.value.chars();
        match chars.next() {
            None => return Err(CstError::structural("Cannot have empty name identifier.")),
            Some(c) if !(c.is_xid_start() || c == '_') => {
                return Err(CstError::structural(format!(
                    "{:?} is not a valid identifier.",
                    self.value
                )));
            }
            _ => {}
        }
        if !chars.all(|c| c.is_xid_continue()) {
            return Err(CstError::structural(format!(
                "{:?} is not a valid identifier.",
                self.value
            )));
        }
        Ok(())
    }
}

impl Codegen for Name {
    fn codegen(&self, state: &mut CodegenState) {
        state.record(self, |state| {
            parenthesized(state, &self.lpar, &self.rpar, |state| {
                state.add_token(&self.value)
            })
        });
    }
}

/// Declares a literal node holding its source text verbatim.
macro_rules! literal {
    ($(#[$meta:meta])* $name:ident) => {
        cst_node! {
            $(#[$meta])*
            pub struct $name {
                pub lpar: Vec<LeftParen>,
                pub value: String,
                pub rpar: Vec<RightParen>,
            }
        }

        impl $name {
            pub fn new(value: impl Into<String>) -> Self {
                Self {
                    lpar: Vec::new(),
                    value: value.into(),
                    rpar: Vec::new(),
                }
            }
        }

        impl Codegen for $name {
            fn codegen(&self, state: &mut CodegenState) {
                state.record(self, |state| {
                    parenthesized(state, &self.lpar, &self.rpar, |state| {
                        state.add_token(&self.value)
                    })
                });
            }
        }
    };
}

literal!(
    /// An integer in any radix, e.g. `0x_ff`
    Integer
);
literal!(Float);
literal!(
    /// A number with a `j` suffix
    Imaginary
);
literal!(
    /// A single string literal, prefix and quotes included
    SimpleString
);

fn validate_number(value: &str) -> Result<()> {
    let ok = value
        .chars()
        .next()
        .is_some_and(|c| c.is_ascii_digit() || c == '.');
    if !ok {
        return Err(CstError::structural(format!(
            "{value:?} is not a valid number literal."
        )));
    }
    Ok(())
}

impl Validate for Integer {
    fn validate(&self) -> Result<()> {
        validate_parens(&self.lpar, &self.rpar)?;
        validate_number(&self.value)
    }
}

impl Validate for Float {
    fn validate(&self) -> Result<()> {
        validate_parens(&self.lpar, &self.rpar)?;
        validate_number(&self.value)
    }
}

impl Validate for Imaginary {
    fn validate(&self) -> Result<()> {
        validate_parens(&self.lpar, &self.rpar)?;
        validate_number(&self.value)?;
        if !self.value.ends_with(['j', 'J']) {
            return Err(CstError::structural("Imaginary literal must end with 'j'."));
        }
        Ok(())
    }
}

/// The prefix letters of a string literal, lowercased.
fn string_prefix(value: &str) -> String {
    value
        .chars()
        .take_while(|c| !matches!(c, '\'' | '"'))
        .collect::<String>()
        .to_ascii_lowercase()
}

fn validate_string(value: &str) -> Result<()> {
    let prefix = string_prefix(value);
    let body = &value[prefix.len()..];
    let quote = body.chars().next();
    let valid = prefix.len() <= 2
        && prefix.chars().all(|c| matches!(c, 'r' | 'u' | 'b' | 'f'))
        && body.len() >= 2
        && quote.is_some_and(|q| body.ends_with(q));
    if !valid {
        return Err(CstError::structural(format!(
            "Invalid string prefix or quotes in {value:?}."
        )));
    }
    Ok(())
}

impl Validate for SimpleString {
    fn validate(&self) -> Result<()> {
        validate_parens(&self.lpar, &self.rpar)?;
        validate_string(&self.value)
    }
}

impl SimpleString {
    /// The literal's prefix letters, lowercased.
    pub fn prefix(&self) -> String {
        string_prefix(&self.value)
    }
}

/// A string written after another one in an implicit concatenation.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StringPart {
    pub whitespace_before: Whitespace,
    pub value: String,
}

cst_node! {
    /// Adjacent string literals, e.g. `"a" 'b'`.
    pub struct ConcatenatedString {
        pub lpar: Vec<LeftParen>,
        pub left: String,
        pub parts: Vec<StringPart>,
        pub rpar: Vec<RightParen>,
    }
}

impl Validate for ConcatenatedString {
    fn validate(&self) -> Result<()> {
        validate_parens(&self.lpar, &self.rpar)?;
        if self.parts.is_empty() {
            return Err(CstError::structural(
                "A concatenated string needs at least two strings.",
            ));
        }
        validate_string(&self.left)?;
        let is_bytes = string_prefix(&self.left).contains('b');
        for part in &self.parts {
            validate_string(&part.value)?;
            if string_prefix(&part.value).contains('b') != is_bytes {
                return Err(CstError::structural("Cannot concatenate string and bytes."));
            }
        }
        Ok(())
    }
}

impl Codegen for ConcatenatedString {
    fn codegen(&self, state: &mut CodegenState) {
        state.record(self, |state| {
            parenthesized(state, &self.lpar, &self.rpar, |state| {
                state.add_token(&self.left);
                for part in &self.parts {
                    part.whitespace_before.codegen(state);
                    state.add_token(&part.value);
                }
            })
        });
    }
}

cst_node! {
    /// `...`
    pub struct Ellipsis {
        pub lpar: Vec<LeftParen>,
        pub rpar: Vec<RightParen>,
    }
}

impl Validate for Ellipsis {
    fn validate(&self) -> Result<()> {
        validate_parens(&self.lpar, &self.rpar)
    }
}

impl Codegen for Ellipsis {
    fn codegen(&self, state: &mut CodegenState) {
        state.record(self, |state| {
            parenthesized(state, &self.lpar, &self.rpar, |state| state.add_token("..."))
        });
    }
}

// Trailers

cst_node! {
    /// `value.attr`
    pub struct Attribute {
        pub lpar: Vec<LeftParen>,
        pub value: Expression,
        pub dot: Dot,
        pub attr: Name,
        pub rpar: Vec<RightParen>,
    }
}

impl Attribute {
    pub fn new(value: impl Into<Expression>, attr: impl Into<String>) -> Self {
        Self {
            lpar: Vec::new(),
            value: value.into(),
            dot: Dot::default(),
            attr: Name::new(attr),
            rpar: Vec::new(),
        }
    }
}

impl Validate for Attribute {
    fn validate(&self) -> Result<()> {
        validate_parens(&self.lpar, &self.rpar)?;
        self.attr.validate()
    }
}

impl Codegen for Attribute {
    fn codegen(&self, state: &mut CodegenState) {
        state.record(self, |state| {
            parenthesized(state, &self.lpar, &self.rpar, |state| {
                self.value.codegen(state);
                self.dot.codegen(state);
                self.attr.codegen(state);
            })
        });
    }
}

/// `*` or `**` in front of an argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArgStar {
    Star,
    DoubleStar,
}

impl ArgStar {
    pub fn token(self) -> &'static str {
        match self {
            ArgStar::Star => "*",
            ArgStar::DoubleStar => "**",
        }
    }
}

cst_node! {
    /// A call or class-definition argument.
    pub struct Arg {
        pub star: Option<ArgStar>,
        pub whitespace_after_star: Whitespace,
        pub keyword: Option<Name>,
        pub equal: Option<AssignEqual>,
        pub value: Expression,
        pub comma: Option<Comma>,
    }
}

impl Arg {
    pub fn new(value: impl Into<Expression>) -> Self {
        Self {
            star: None,
            whitespace_after_star: Whitespace::empty(),
            keyword: None,
            equal: None,
            value: value.into(),
            comma: None,
        }
    }

    pub fn keyword(name: impl Into<String>, value: impl Into<Expression>) -> Self {
        Self {
            keyword: Some(Name::new(name)),
            equal: Some(AssignEqual::default()),
            ..Self::new(value)
        }
    }
}

impl Validate for Arg {
    fn validate(&self) -> Result<()> {
        if self.keyword.is_some() != self.equal.is_some() {
            return Err(CstError::structural(
                "A keyword argument must have both a name and an '='.",
            ));
        }
        if self.keyword.is_some() && self.star.is_some() {
            return Err(CstError::structural(
                "A keyword argument cannot be starred.",
            ));
        }
        if self.star.is_none() && !self.whitespace_after_star.is_empty() {
            return Err(CstError::structural(
                "Cannot have whitespace after a star that is not there.",
            ));
        }
        Ok(())
    }
}

impl Codegen for Arg {
    fn codegen(&self, state: &mut CodegenState) {
        state.record(self, |state| {
            if let Some(star) = self.star {
                state.add_token(star.token());
                self.whitespace_after_star.codegen(state);
            }
            if let (Some(keyword), Some(equal)) = (&self.keyword, &self.equal) {
                keyword.codegen(state);
                equal.codegen(state);
            }
            self.value.codegen(state);
            if let Some(comma) = &self.comma {
                comma.codegen(state);
            }
        });
    }
}

cst_node! {
    /// `func(args)`
    pub struct Call {
        pub lpar: Vec<LeftParen>,
        pub func: Expression,
        pub whitespace_after_func: Whitespace,
        pub whitespace_before_args: Whitespace,
        pub args: Vec<Arg>,
        pub whitespace_before_close: Whitespace,
        pub rpar: Vec<RightParen>,
    }
}

impl Call {
    pub fn new(func: impl Into<Expression>, args: Vec<Arg>) -> Self {
        Self {
            lpar: Vec::new(),
            func: func.into(),
            whitespace_after_func: Whitespace::empty(),
            whitespace_before_args: Whitespace::empty(),
            args,
            whitespace_before_close: Whitespace::empty(),
            rpar: Vec::new(),
        }
    }
}

impl Validate for Call {
    fn validate(&self) -> Result<()> {
        validate_parens(&self.lpar, &self.rpar)?;
        validate_commas(self.args.iter().map(|a| a.comma.as_ref()))
    }
}

impl Codegen for Call {
    fn codegen(&self, state: &mut CodegenState) {
        state.record(self, |state| {
            parenthesized(state, &self.lpar, &self.rpar, |state| {
                self.func.codegen(state);
                self.whitespace_after_func.codegen(state);
                state.add_token("(");
                self.whitespace_before_args.codegen(state);
                for arg in &self.args {
                    arg.codegen(state);
                }
                self.whitespace_before_close.codegen(state);
                state.add_token(")");
            })
        });
    }
}

cst_node! {
    /// `lower:upper:step`, every part optional.
    pub struct Slice {
        pub lower: Option<Expression>,
        pub whitespace_before_colon: Whitespace,
        pub whitespace_before_upper: Whitespace,
        pub upper: Option<Expression>,
        /// Present when the second colon is written
        pub whitespace_before_step_colon: Option<Whitespace>,
        pub whitespace_before_step: Whitespace,
        pub step: Option<Expression>,
    }
}

impl Validate for Slice {
    fn validate(&self) -> Result<()> {
        if self.step.is_some() && self.whitespace_before_step_colon.is_none() {
            return Err(CstError::structural(
                "A slice step needs its preceding colon.",
            ));
        }
        Ok(())
    }
}

impl Codegen for Slice {
    fn codegen(&self, state: &mut CodegenState) {
        state.record(self, |state| {
            if let Some(lower) = &self.lower {
                lower.codegen(state);
            }
            self.whitespace_before_colon.codegen(state);
            state.add_token(":");
            self.whitespace_before_upper.codegen(state);
            if let Some(upper) = &self.upper {
                upper.codegen(state);
            }
            if let Some(whitespace) = &self.whitespace_before_step_colon {
                whitespace.codegen(state);
                state.add_token(":");
                self.whitespace_before_step.codegen(state);
                if let Some(step) = &self.step {
                    step.codegen(state);
                }
            }
        });
    }
}

/// What sits between a subscript's brackets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BaseSlice {
    Index(Expression),
    Slice(Arc<Slice>),
}

impl Codegen for BaseSlice {
    fn codegen(&self, state: &mut CodegenState) {
        match self {
            BaseSlice::Index(index) => index.codegen(state),
            BaseSlice::Slice(slice) => slice.codegen(state),
        }
    }
}

impl Validate for BaseSlice {
    fn validate(&self) -> Result<()> {
        match self {
            BaseSlice::Index(index) => index.validate(),
            BaseSlice::Slice(slice) => slice.validate(),
        }
    }
}

impl Item for BaseSlice {
    fn walk_item<V: Visitor + ?Sized>(&self, visitor: &mut V) {
        match self {
            BaseSlice::Index(index) => index.walk(visitor),
            BaseSlice::Slice(slice) => visit_node(&**slice, visitor),
        }
    }

    fn transform_item<T: Transformer + ?Sized>(
        &self,
        transformer: &mut T,
    ) -> Result<Transformed<Self>> {
        Ok(match self {
            BaseSlice::Index(index) => {
                Transformed::Keep(BaseSlice::Index(Fold::transform(index, transformer)?))
            }
            BaseSlice::Slice(slice) => rebuild_arc(slice, transformer)?.map(BaseSlice::Slice),
        })
    }
}

cst_node! {
    pub struct SubscriptElement {
        pub slice: BaseSlice,
        pub comma: Option<Comma>,
    }
}

impl Validate for SubscriptElement {}

impl Codegen for SubscriptElement {
    fn codegen(&self, state: &mut CodegenState) {
        state.record(self, |state| {
            self.slice.codegen(state);
            if let Some(comma) = &self.comma {
                comma.codegen(state);
            }
        });
    }
}

cst_node! {
    /// `value[slice]`
    pub struct Subscript {
        pub lpar: Vec<LeftParen>,
        pub value: Expression,
        pub whitespace_after_value: Whitespace,
        pub lbracket: LeftSquareBracket,
        pub slice: Vec<SubscriptElement>,
        pub rbracket: RightSquareBracket,
        pub rpar: Vec<RightParen>,
    }
}

impl Validate for Subscript {
    fn validate(&self) -> Result<()> {
        validate_parens(&self.lpar, &self.rpar)?;
        if self.slice.is_empty() {
            return Err(CstError::structural(
                "Cannot have empty SubscriptElement.",
            ));
        }
        validate_commas(self.slice.iter().map(|s| s.comma.as_ref()))
    }
}

impl Codegen for Subscript {
    fn codegen(&self, state: &mut CodegenState) {
        state.record(self, |state| {
            parenthesized(state, &self.lpar, &self.rpar, |state| {
                self.value.codegen(state);
                self.whitespace_after_value.codegen(state);
                self.lbracket.codegen(state);
                for element in &self.slice {
                    element.codegen(state);
                }
                self.rbracket.codegen(state);
            })
        });
    }
}

// Operators

cst_node! {
    pub struct BinaryOperation {
        pub lpar: Vec<LeftParen>,
        pub left: Expression,
        pub operator: BinaryOperator,
        pub right: Expression,
        pub rpar: Vec<RightParen>,
    }
}

impl BinaryOperation {
    pub fn new(
        left: impl Into<Expression>,
        operator: BinaryOperator,
        right: impl Into<Expression>,
    ) -> Self {
        Self {
            lpar: Vec::new(),
            left: left.into(),
            operator,
            right: right.into(),
            rpar: Vec::new(),
        }
    }
}

impl Validate for BinaryOperation {
    fn validate(&self) -> Result<()> {
        validate_parens(&self.lpar, &self.rpar)
    }
}

impl Codegen for BinaryOperation {
    fn codegen(&self, state: &mut CodegenState) {
        state.record(self, |state| {
            parenthesized(state, &self.lpar, &self.rpar, |state| {
                self.left.codegen(state);
                self.operator.codegen(state);
                self.right.codegen(state);
            })
        });
    }
}

cst_node! {
    pub struct UnaryOperation {
        pub lpar: Vec<LeftParen>,
        pub operator: UnaryOperator,
        pub expression: Expression,
        pub rpar: Vec<RightParen>,
    }
}

impl Validate for UnaryOperation {
    fn validate(&self) -> Result<()> {
        validate_parens(&self.lpar, &self.rpar)?;
        if self.operator.kind.is_word() {
            require_space(
                &self.operator.whitespace_after,
                self.expression.starts_with_delimiter(),
                "Must have at least one space after not operator.",
            )?;
        }
        Ok(())
    }
}

impl Codegen for UnaryOperation {
    fn codegen(&self, state: &mut CodegenState) {
        state.record(self, |state| {
            parenthesized(state, &self.lpar, &self.rpar, |state| {
                self.operator.codegen(state);
                self.expression.codegen(state);
            })
        });
    }
}

cst_node! {
    /// `left and right`, `left or right`
    pub struct BooleanOperation {
        pub lpar: Vec<LeftParen>,
        pub left: Expression,
        pub operator: BooleanOperator,
        pub right: Expression,
        pub rpar: Vec<RightParen>,
    }
}

impl Validate for BooleanOperation {
    fn validate(&self) -> Result<()> {
        validate_parens(&self.lpar, &self.rpar)?;
        let message = "Must have at least one space around boolean operator.";
        require_space(
            &self.operator.whitespace_before,
            self.left.ends_with_delimiter(),
            message,
        )?;
        require_space(
            &self.operator.whitespace_after,
            self.right.starts_with_delimiter(),
            message,
        )
    }
}

impl Codegen for BooleanOperation {
    fn codegen(&self, state: &mut CodegenState) {
        state.record(self, |state| {
            parenthesized(state, &self.lpar, &self.rpar, |state| {
                self.left.codegen(state);
                self.operator.codegen(state);
                self.right.codegen(state);
            })
        });
    }
}

cst_node! {
    /// One `op comparator` link of a comparison chain.
    pub struct ComparisonTarget {
        pub operator: ComparisonOperator,
        pub comparator: Expression,
    }
}

impl Validate for ComparisonTarget {
    fn validate(&self) -> Result<()> {
        self.operator.validate()?;
        if self.operator.kind.is_word() {
            require_space(
                &self.operator.whitespace_after,
                self.comparator.starts_with_delimiter(),
                "Must have at least one space around comparison operator.",
            )?;
        }
        Ok(())
    }
}

impl Codegen for ComparisonTarget {
    fn codegen(&self, state: &mut CodegenState) {
        state.record(self, |state| {
            self.operator.codegen(state);
            self.comparator.codegen(state);
        });
    }
}

cst_node! {
    /// `a < b <= c`
    pub struct Comparison {
        pub lpar: Vec<LeftParen>,
        pub left: Expression,
        pub comparisons: Vec<ComparisonTarget>,
        pub rpar: Vec<RightParen>,
    }
}

impl Validate for Comparison {
    fn validate(&self) -> Result<()> {
        validate_parens(&self.lpar, &self.rpar)?;
        if self.comparisons.is_empty() {
            return Err(CstError::structural(
                "Must have at least one ComparisonTarget in Comparison.",
            ));
        }
        let mut previous = &self.left;
        for target in &self.comparisons {
            if target.operator.kind.is_word() {
                require_space(
                    &target.operator.whitespace_before,
                    previous.ends_with_delimiter(),
                    "Must have at least one space around comparison operator.",
                )?;
            }
            previous = &target.comparator;
        }
        Ok(())
    }
}

impl Codegen for Comparison {
    fn codegen(&self, state: &mut CodegenState) {
        state.record(self, |state| {
            parenthesized(state, &self.lpar, &self.rpar, |state| {
                self.left.codegen(state);
                for target in &self.comparisons {
                    target.codegen(state);
                }
            })
        });
    }
}

cst_node! {
    /// `body if test else orelse`
    pub struct IfExp {
        pub lpar: Vec<LeftParen>,
        pub body: Expression,
        pub whitespace_before_if: Whitespace,
        pub whitespace_after_if: Whitespace,
        pub test: Expression,
        pub whitespace_before_else: Whitespace,
        pub whitespace_after_else: Whitespace,
        pub orelse: Expression,
        pub rpar: Vec<RightParen>,
    }
}

impl Validate for IfExp {
    fn validate(&self) -> Result<()> {
        validate_parens(&self.lpar, &self.rpar)?;
        require_space(
            &self.whitespace_before_if,
            self.body.ends_with_delimiter(),
            "Must have at least one space before 'if' keyword.",
        )?;
        require_space(
            &self.whitespace_after_if,
            self.test.starts_with_delimiter(),
            "Must have at least one space after 'if' keyword.",
        )?;
        require_space(
            &self.whitespace_before_else,
            self.test.ends_with_delimiter(),
            "Must have at least one space before 'else' keyword.",
        )?;
        require_space(
            &self.whitespace_after_else,
            self.orelse.starts_with_delimiter(),
            "Must have at least one space after 'else' keyword.",
        )
    }
}

impl Codegen for IfExp {
    fn codegen(&self, state: &mut CodegenState) {
        state.record(self, |state| {
            parenthesized(state, &self.lpar, &self.rpar, |state| {
                self.body.codegen(state);
                self.whitespace_before_if.codegen(state);
                state.add_token("if");
                self.whitespace_after_if.codegen(state);
                self.test.codegen(state);
                self.whitespace_before_else.codegen(state);
                state.add_token("else");
                self.whitespace_after_else.codegen(state);
                self.orelse.codegen(state);
            })
        });
    }
}

// Parameters

/// Which slot of a parameter list a [`Param`] fills.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParamKind {
    /// Positional or keyword, with an optional default
    Regular,
    /// `*args`, or a bare `*` when the name is absent
    Star,
    /// `**kwargs`
    DoubleStar,
    /// The positional-only marker `/`
    Slash,
}

/// Whether an [`Annotation`] follows a parameter (`:`) or a signature (`->`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AnnotationIndicator {
    Colon,
    Arrow,
}

impl AnnotationIndicator {
    pub fn token(self) -> &'static str {
        match self {
            AnnotationIndicator::Colon => ":",
            AnnotationIndicator::Arrow => "->",
        }
    }
}

cst_node! {
    pub struct Annotation {
        pub whitespace_before_indicator: Whitespace,
        pub indicator: AnnotationIndicator,
        pub whitespace_after_indicator: Whitespace,
        pub annotation: Expression,
    }
}

impl Validate for Annotation {}

impl Codegen for Annotation {
    fn codegen(&self, state: &mut CodegenState) {
        state.record(self, |state| {
            self.whitespace_before_indicator.codegen(state);
            state.add_token(self.indicator.token());
            self.whitespace_after_indicator.codegen(state);
            self.annotation.codegen(state);
        });
    }
}

cst_node! {
    pub struct Param {
        pub kind: ParamKind,
        pub whitespace_after_star: Whitespace,
        pub name: Option<Name>,
        pub annotation: Option<Annotation>,
        pub equal: Option<AssignEqual>,
        pub default: Option<Expression>,
        pub comma: Option<Comma>,
    }
}

impl Param {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            kind: ParamKind::Regular,
            whitespace_after_star: Whitespace::empty(),
            name: Some(Name::new(name)),
            annotation: None,
            equal: None,
            default: None,
            comma: None,
        }
    }
}

impl Validate for Param {
    fn validate(&self) -> Result<()> {
        if self.equal.is_some() != self.default.is_some() {
            return Err(CstError::structural(
                "Must have a default when specifying an AssignEqual.",
            ));
        }
        match self.kind {
            ParamKind::Regular if self.name.is_none() => {
                Err(CstError::structural("A regular parameter must have a name."))
            }
            ParamKind::DoubleStar if self.name.is_none() => {
                Err(CstError::structural("A '**' parameter must have a name."))
            }
            ParamKind::Star | ParamKind::DoubleStar if self.default.is_some() => Err(
                CstError::structural("A starred parameter cannot have a default."),
            ),
            ParamKind::Slash
                if self.name.is_some() || self.annotation.is_some() || self.default.is_some() =>
            {
                Err(CstError::structural(
                    "The '/' marker cannot have a name, annotation or default.",
                ))
            }
            _ => Ok(()),
        }
    }
}

impl Codegen for Param {
    fn codegen(&self, state: &mut CodegenState) {
        state.record(self, |state| {
            match self.kind {
                ParamKind::Regular => {}
                ParamKind::Star => state.add_token("*"),
                ParamKind::DoubleStar => state.add_token("**"),
                ParamKind::Slash => state.add_token("/"),
            }
            self.whitespace_after_star.codegen(state);
            if let Some(name) = &self.name {
                name.codegen(state);
            }
            if let Some(annotation) = &self.annotation {
                annotation.codegen(state);
            }
            if let Some(equal) = &self.equal {
                equal.codegen(state);
            }
            if let Some(default) = &self.default {
                default.codegen(state);
            }
            if let Some(comma) = &self.comma {
                comma.codegen(state);
            }
        });
    }
}

cst_node! {
    /// A parameter list in source order.
    pub struct Parameters {
        pub params: Vec<Param>,
    }
}

impl Parameters {
    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    /// Ordering rules shared by the tree builder and validation. Returns the
    /// offending parameter's index with the message.
    pub(crate) fn check_order(&self) -> std::result::Result<(), (usize, &'static str)> {
        let mut seen_default = false;
        let mut seen_star = false;
        let mut seen_slash = false;
        let mut bare_star: Option<usize> = None;
        let last = self.params.len().saturating_sub(1);
        for (i, param) in self.params.iter().enumerate() {
            match param.kind {
                ParamKind::Slash => {
                    if i == 0 {
                        return Err((i, "At least one argument must precede /."));
                    }
                    if seen_slash {
                        return Err((i, "/ may appear only once."));
                    }
                    if seen_star {
                        return Err((i, "/ must be ahead of *."));
                    }
                    seen_slash = true;
                }
                ParamKind::Star => {
                    if seen_star {
                        return Err((i, "* argument may appear only once."));
                    }
                    seen_star = true;
                    if param.name.is_none() {
                        bare_star = Some(i);
                    }
                }
                ParamKind::DoubleStar => {
                    if i != last {
                        return Err((i + 1, "Arguments cannot follow var-keyword argument."));
                    }
                }
                ParamKind::Regular => {
                    if seen_star {
                        bare_star = None;
                    } else if param.default.is_some() {
                        seen_default = true;
                    } else if seen_default {
                        return Err((
                            i,
                            "Cannot have a non-default argument following a default argument.",
                        ));
                    }
                }
            }
        }
        if let Some(i) = bare_star {
            return Err((i, "Named (keyword) arguments must follow bare *."));
        }
        Ok(())
    }
}

impl Validate for Parameters {
    fn validate(&self) -> Result<()> {
        if let Err((_, message)) = self.check_order() {
            return Err(CstError::structural(message));
        }
        validate_commas(self.params.iter().map(|p| p.comma.as_ref()))
    }
}

impl Codegen for Parameters {
    fn codegen(&self, state: &mut CodegenState) {
        state.record(self, |state| {
            for param in &self.params {
                param.codegen(state);
            }
        });
    }
}

cst_node! {
    /// `lambda params: body`
    pub struct Lambda {
        pub lpar: Vec<LeftParen>,
        pub whitespace_after_lambda: Whitespace,
        pub params: Parameters,
        pub whitespace_before_colon: Whitespace,
        pub whitespace_after_colon: Whitespace,
        pub body: Expression,
        pub rpar: Vec<RightParen>,
    }
}

impl Validate for Lambda {
    fn validate(&self) -> Result<()> {
        validate_parens(&self.lpar, &self.rpar)?;
        if self.params.params.iter().any(|p| p.annotation.is_some()) {
            return Err(CstError::structural(
                "Lambda params cannot have type annotations.",
            ));
        }
        let starts_with_star = self
            .params
            .params
            .first()
            .is_some_and(|p| p.kind != ParamKind::Regular);
        if !self.params.is_empty() && !starts_with_star && self.whitespace_after_lambda.is_empty() {
            return Err(CstError::structural(
                "Must have at least one space after lambda when specifying params.",
            ));
        }
        Ok(())
    }
}

impl Codegen for Lambda {
    fn codegen(&self, state: &mut CodegenState) {
        state.record(self, |state| {
            parenthesized(state, &self.lpar, &self.rpar, |state| {
                state.add_token("lambda");
                self.whitespace_after_lambda.codegen(state);
                self.params.codegen(state);
                self.whitespace_before_colon.codegen(state);
                state.add_token(":");
                self.whitespace_after_colon.codegen(state);
                self.body.codegen(state);
            })
        });
    }
}

// Displays

cst_node! {
    /// An element of a tuple, list or set display.
    pub struct Element {
        pub value: Expression,
        pub comma: Option<Comma>,
    }
}

impl Element {
    pub fn new(value: impl Into<Expression>) -> Self {
        Self {
            value: value.into(),
            comma: None,
        }
    }
}

impl Validate for Element {}

impl Codegen for Element {
    fn codegen(&self, state: &mut CodegenState) {
        state.record(self, |state| {
            self.value.codegen(state);
            if let Some(comma) = &self.comma {
                comma.codegen(state);
            }
        });
    }
}

cst_node! {
    /// A tuple. Its own parentheses, if any, are its `lpar` and `rpar`.
    pub struct Tuple {
        pub lpar: Vec<LeftParen>,
        pub elements: Vec<Element>,
        pub rpar: Vec<RightParen>,
    }
}

impl Validate for Tuple {
    fn validate(&self) -> Result<()> {
        validate_parens(&self.lpar, &self.rpar)?;
        if self.elements.is_empty() && self.lpar.is_empty() {
            return Err(CstError::structural(
                "A zero-length tuple must be wrapped in parentheses.",
            ));
        }
        validate_commas(self.elements.iter().map(|e| e.comma.as_ref()))
    }
}

impl Codegen for Tuple {
    fn codegen(&self, state: &mut CodegenState) {
        state.record(self, |state| {
            parenthesized(state, &self.lpar, &self.rpar, |state| {
                for element in &self.elements {
                    element.codegen(state);
                }
            })
        });
    }
}

cst_node! {
    pub struct List {
        pub lpar: Vec<LeftParen>,
        pub lbracket: LeftSquareBracket,
        pub elements: Vec<Element>,
        pub rbracket: RightSquareBracket,
        pub rpar: Vec<RightParen>,
    }
}

impl Validate for List {
    fn validate(&self) -> Result<()> {
        validate_parens(&self.lpar, &self.rpar)?;
        validate_commas(self.elements.iter().map(|e| e.comma.as_ref()))
    }
}

impl Codegen for List {
    fn codegen(&self, state: &mut CodegenState) {
        state.record(self, |state| {
            parenthesized(state, &self.lpar, &self.rpar, |state| {
                self.lbracket.codegen(state);
                for element in &self.elements {
                    element.codegen(state);
                }
                self.rbracket.codegen(state);
            })
        });
    }
}

cst_node! {
    pub struct Set {
        pub lpar: Vec<LeftParen>,
        pub lbrace: LeftCurlyBrace,
        pub elements: Vec<Element>,
        pub rbrace: RightCurlyBrace,
        pub rpar: Vec<RightParen>,
    }
}

impl Validate for Set {
    fn validate(&self) -> Result<()> {
        validate_parens(&self.lpar, &self.rpar)?;
        if self.elements.is_empty() {
            return Err(CstError::structural(
                "A literal set must have at least one element.",
            ));
        }
        validate_commas(self.elements.iter().map(|e| e.comma.as_ref()))
    }
}

impl Codegen for Set {
    fn codegen(&self, state: &mut CodegenState) {
        state.record(self, |state| {
            parenthesized(state, &self.lpar, &self.rpar, |state| {
                self.lbrace.codegen(state);
                for element in &self.elements {
                    element.codegen(state);
                }
                self.rbrace.codegen(state);
            })
        });
    }
}

cst_node! {
    /// `key: value`, or `**value` when there is no key.
    pub struct DictElement {
        pub key: Option<Expression>,
        pub whitespace_before_colon: Whitespace,
        pub whitespace_before_value: Whitespace,
        pub value: Expression,
        pub comma: Option<Comma>,
    }
}

impl Validate for DictElement {
    fn validate(&self) -> Result<()> {
        if self.key.is_none() && !self.whitespace_before_colon.is_empty() {
            return Err(CstError::structural(
                "A '**' dict element has no colon to put whitespace before.",
            ));
        }
        Ok(())
    }
}

impl Codegen for DictElement {
    fn codegen(&self, state: &mut CodegenState) {
        state.record(self, |state| {
            match &self.key {
                Some(key) => {
                    key.codegen(state);
                    self.whitespace_before_colon.codegen(state);
                    state.add_token(":");
                }
                None => state.add_token("**"),
            }
            self.whitespace_before_value.codegen(state);
            self.value.codegen(state);
            if let Some(comma) = &self.comma {
                comma.codegen(state);
            }
        });
    }
}

cst_node! {
    pub struct Dict {
        pub lpar: Vec<LeftParen>,
        pub lbrace: LeftCurlyBrace,
        pub elements: Vec<DictElement>,
        pub rbrace: RightCurlyBrace,
        pub rpar: Vec<RightParen>,
    }
}

impl Validate for Dict {
    fn validate(&self) -> Result<()> {
        validate_parens(&self.lpar, &self.rpar)?;
        validate_commas(self.elements.iter().map(|e| e.comma.as_ref()))
    }
}

impl Codegen for Dict {
    fn codegen(&self, state: &mut CodegenState) {
        state.record(self, |state| {
            parenthesized(state, &self.lpar, &self.rpar, |state| {
                self.lbrace.codegen(state);
                for element in &self.elements {
                    element.codegen(state);
                }
                self.rbrace.codegen(state);
            })
        });
    }
}

// Comprehensions

cst_node! {
    /// `if test` inside a comprehension.
    pub struct CompIf {
        pub whitespace_before: Whitespace,
        pub whitespace_before_test: Whitespace,
        pub test: Expression,
    }
}

impl Validate for CompIf {
    fn validate(&self) -> Result<()> {
        require_space(
            &self.whitespace_before_test,
            self.test.starts_with_delimiter(),
            "Must have at least one space after 'if' keyword.",
        )
    }
}

impl Codegen for CompIf {
    fn codegen(&self, state: &mut CodegenState) {
        state.record(self, |state| {
            self.whitespace_before.codegen(state);
            state.add_token("if");
            self.whitespace_before_test.codegen(state);
            self.test.codegen(state);
        });
    }
}

cst_node! {
    /// `[async] for target in iter [if ...]*`, possibly followed by another
    /// `for` clause.
    pub struct CompFor {
        pub whitespace_before: Whitespace,
        pub asynchronous: Option<Asynchronous>,
        pub whitespace_after_for: Whitespace,
        pub target: Expression,
        pub whitespace_before_in: Whitespace,
        pub whitespace_after_in: Whitespace,
        pub iter: Expression,
        pub ifs: Vec<CompIf>,
        pub inner_for_in: Option<Arc<CompFor>>,
    }
}

impl Validate for CompFor {
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

impl Codegen for CompFor {
    fn codegen(&self, state: &mut CodegenState) {
        state.record(self, |state| {
            self.whitespace_before.codegen(state);
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
            for comp_if in &self.ifs {
                comp_if.codegen(state);
            }
            if let Some(inner) = &self.inner_for_in {
                inner.codegen(state);
            }
        });
    }
}

cst_node! {
    pub struct ListComp {
        pub lpar: Vec<LeftParen>,
        pub lbracket: LeftSquareBracket,
        pub elt: Expression,
        pub for_in: CompFor,
        pub rbracket: RightSquareBracket,
        pub rpar: Vec<RightParen>,
    }
}

impl Validate for ListComp {
    fn validate(&self) -> Result<()> {
        validate_parens(&self.lpar, &self.rpar)
    }
}

impl Codegen for ListComp {
    fn codegen(&self, state: &mut CodegenState) {
        state.record(self, |state| {
            parenthesized(state, &self.lpar, &self.rpar, |state| {
                self.lbracket.codegen(state);
                self.elt.codegen(state);
                self.for_in.codegen(state);
                self.rbracket.codegen(state);
            })
        });
    }
}

cst_node! {
    pub struct SetComp {
        pub lpar: Vec<LeftParen>,
        pub lbrace: LeftCurlyBrace,
        pub elt: Expression,
        pub for_in: CompFor,
        pub rbrace: RightCurlyBrace,
        pub rpar: Vec<RightParen>,
    }
}

impl Validate for SetComp {
    fn validate(&self) -> Result<()> {
        validate_parens(&self.lpar, &self.rpar)
    }
}

impl Codegen for SetComp {
    fn codegen(&self, state: &mut CodegenState) {
        state.record(self, |state| {
            parenthesized(state, &self.lpar, &self.rpar, |state| {
                self.lbrace.codegen(state);
                self.elt.codegen(state);
                self.for_in.codegen(state);
                self.rbrace.codegen(state);
            })
        });
    }
}

cst_node! {
    pub struct DictComp {
        pub lpar: Vec<LeftParen>,
        pub lbrace: LeftCurlyBrace,
        pub key: Expression,
        pub whitespace_before_colon: Whitespace,
        pub whitespace_after_colon: Whitespace,
        pub value: Expression,
        pub for_in: CompFor,
        pub rbrace: RightCurlyBrace,
        pub rpar: Vec<RightParen>,
    }
}

impl Validate for DictComp {
    fn validate(&self) -> Result<()> {
        validate_parens(&self.lpar, &self.rpar)
    }
}

impl Codegen for DictComp {
    fn codegen(&self, state: &mut CodegenState) {
        state.record(self, |state| {
            parenthesized(state, &self.lpar, &self.rpar, |state| {
                self.lbrace.codegen(state);
                self.key.codegen(state);
                self.whitespace_before_colon.codegen(state);
                state.add_token(":");
                self.whitespace_after_colon.codegen(state);
                self.value.codegen(state);
                self.for_in.codegen(state);
                self.rbrace.codegen(state);
            })
        });
    }
}

cst_node! {
    /// A generator expression. Its parentheses are its `lpar`/`rpar`; they
    /// are absent only when it is the sole argument of a call.
    pub struct GeneratorExp {
        pub lpar: Vec<LeftParen>,
        pub elt: Expression,
        pub for_in: CompFor,
        pub rpar: Vec<RightParen>,
    }
}

impl Validate for GeneratorExp {
    fn validate(&self) -> Result<()> {
        validate_parens(&self.lpar, &self.rpar)
    }
}

impl Codegen for GeneratorExp {
    fn codegen(&self, state: &mut CodegenState) {
        state.record(self, |state| {
            parenthesized(state, &self.lpar, &self.rpar, |state| {
                self.elt.codegen(state);
                self.for_in.codegen(state);
            })
        });
    }
}

// Others

cst_node! {
    /// `*value` in a display, call or assignment target.
    pub struct StarredElement {
        pub lpar: Vec<LeftParen>,
        pub whitespace_before_value: Whitespace,
        pub value: Expression,
        pub rpar: Vec<RightParen>,
    }
}

impl Validate for StarredElement {
    fn validate(&self) -> Result<()> {
        validate_parens(&self.lpar, &self.rpar)
    }
}

impl Codegen for StarredElement {
    fn codegen(&self, state: &mut CodegenState) {
        state.record(self, |state| {
            parenthesized(state, &self.lpar, &self.rpar, |state| {
                state.add_token("*");
                self.whitespace_before_value.codegen(state);
                self.value.codegen(state);
            })
        });
    }
}

cst_node! {
    pub struct Await {
        pub lpar: Vec<LeftParen>,
        pub whitespace_after_await: Whitespace,
        pub expression: Expression,
        pub rpar: Vec<RightParen>,
    }
}

impl Validate for Await {
    fn validate(&self) -> Result<()> {
        validate_parens(&self.lpar, &self.rpar)?;
        require_space(
            &self.whitespace_after_await,
            self.expression.starts_with_delimiter(),
            "Must have at least one space after await",
        )
    }
}

impl Codegen for Await {
    fn codegen(&self, state: &mut CodegenState) {
        state.record(self, |state| {
            parenthesized(state, &self.lpar, &self.rpar, |state| {
                state.add_token("await");
                self.whitespace_after_await.codegen(state);
                self.expression.codegen(state);
            })
        });
    }
}

cst_node! {
    /// The `from item` half of `yield from item`.
    pub struct YieldFrom {
        pub whitespace_after_from: Whitespace,
        pub item: Expression,
    }
}

impl Validate for YieldFrom {
    fn validate(&self) -> Result<()> {
        require_space(
            &self.whitespace_after_from,
            self.item.starts_with_delimiter(),
            "Must have at least one space after 'from'.",
        )
    }
}

impl Codegen for YieldFrom {
    fn codegen(&self, state: &mut CodegenState) {
        state.record(self, |state| {
            state.add_token("from");
            self.whitespace_after_from.codegen(state);
            self.item.codegen(state);
        });
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum YieldValue {
    Expression(Expression),
    From(Arc<YieldFrom>),
}

impl Codegen for YieldValue {
    fn codegen(&self, state: &mut CodegenState) {
        match self {
            YieldValue::Expression(value) => value.codegen(state),
            YieldValue::From(from) => from.codegen(state),
        }
    }
}

impl Validate for YieldValue {
    fn validate(&self) -> Result<()> {
        match self {
            YieldValue::Expression(value) => value.validate(),
            YieldValue::From(from) => from.validate(),
        }
    }
}

impl Item for YieldValue {
    fn walk_item<V: Visitor + ?Sized>(&self, visitor: &mut V) {
        match self {
            YieldValue::Expression(value) => value.walk(visitor),
            YieldValue::From(from) => visit_node(&**from, visitor),
        }
    }

    fn transform_item<T: Transformer + ?Sized>(
        &self,
        transformer: &mut T,
    ) -> Result<Transformed<Self>> {
        Ok(match self {
            YieldValue::Expression(value) => {
                Transformed::Keep(YieldValue::Expression(Fold::transform(value, transformer)?))
            }
            YieldValue::From(from) => rebuild_arc(from, transformer)?.map(YieldValue::From),
        })
    }
}

cst_node! {
    pub struct Yield {
        pub lpar: Vec<LeftParen>,
        pub whitespace_after_yield: Whitespace,
        pub value: Option<YieldValue>,
        pub rpar: Vec<RightParen>,
    }
}

impl Validate for Yield {
    fn validate(&self) -> Result<()> {
        validate_parens(&self.lpar, &self.rpar)?;
        let safe = match &self.value {
            None => true,
            Some(YieldValue::From(_)) => false,
            Some(YieldValue::Expression(value)) => value.starts_with_delimiter(),
        };
        require_space(
            &self.whitespace_after_yield,
            safe,
            "Must have at least one space after 'yield'.",
        )
    }
}

impl Codegen for Yield {
    fn codegen(&self, state: &mut CodegenState) {
        state.record(self, |state| {
            parenthesized(state, &self.lpar, &self.rpar, |state| {
                state.add_token("yield");
                self.whitespace_after_yield.codegen(state);
                if let Some(value) = &self.value {
                    value.codegen(state);
                }
            })
        });
    }
}

cst_node! {
    /// `target := value`
    pub struct NamedExpr {
        pub lpar: Vec<LeftParen>,
        pub target: Expression,
        pub whitespace_before_walrus: Whitespace,
        pub whitespace_after_walrus: Whitespace,
        pub value: Expression,
        pub rpar: Vec<RightParen>,
    }
}

impl Validate for NamedExpr {
    fn validate(&self) -> Result<()> {
        validate_parens(&self.lpar, &self.rpar)?;
        if !matches!(self.target, Expression::Name(_)) {
            return Err(CstError::structural(
                "The target of a named expression must be a name.",
            ));
        }
        Ok(())
    }
}

impl Codegen for NamedExpr {
    fn codegen(&self, state: &mut CodegenState) {
        state.record(self, |state| {
            parenthesized(state, &self.lpar, &self.rpar, |state| {
                self.target.codegen(state);
                self.whitespace_before_walrus.codegen(state);
                state.add_token(":=");
                self.whitespace_after_walrus.codegen(state);
                self.value.codegen(state);
            })
        });
    }
}
