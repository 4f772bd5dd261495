//! Operators and the whitespace around them

use super::whitespace::Whitespace;
use super::Validate;
use crate::codegen::{Codegen, CodegenState};

/// Declares an operator kind enum with its token text.
macro_rules! operator_kinds {
    ($(#[$meta:meta])* $name:ident { $($variant:ident => $token:literal),* $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum $name {
            $($variant),*
        }

        impl $name {
            pub fn token(self) -> &'static str {
                match self {
                    $($name::$variant => $token),*
                }
            }

            pub fn from_token(token: &str) -> Option<Self> {
                match token {
                    $($token => Some($name::$variant),)*
                    _ => None,
                }
            }
        }
    };
}

operator_kinds!(BinaryOp {
    Add => "+",
    Subtract => "-",
    Multiply => "*",
    Divide => "/",
    FloorDivide => "//",
    Modulo => "%",
    Power => "**",
    LeftShift => "<<",
    RightShift => ">>",
    BitOr => "|",
    BitAnd => "&",
    BitXor => "^",
    MatrixMultiply => "@",
});

operator_kinds!(UnaryOp {
    Plus => "+",
    Minus => "-",
    BitInvert => "~",
    Not => "not",
});

operator_kinds!(BooleanOp {
    And => "and",
    Or => "or",
});

operator_kinds!(
    /// Comparison operators. The two-word forms are rendered with
    /// [`ComparisonOperator::whitespace_between`] between their words.
    CompOp {
        LessThan => "<",
        GreaterThan => ">",
        Equal => "==",
        GreaterThanEqual => ">=",
        LessThanEqual => "<=",
        NotEqual => "!=",
        In => "in",
        NotIn => "not in",
        Is => "is",
        IsNot => "is not",
    }
);

operator_kinds!(AugOp {
    AddAssign => "+=",
    SubtractAssign => "-=",
    MultiplyAssign => "*=",
    MatrixMultiplyAssign => "@=",
    DivideAssign => "/=",
    ModuloAssign => "%=",
    BitAndAssign => "&=",
    BitOrAssign => "|=",
    BitXorAssign => "^=",
    LeftShiftAssign => "<<=",
    RightShiftAssign => ">>=",
    PowerAssign => "**=",
    FloorDivideAssign => "//=",
});

impl UnaryOp {
    pub fn is_word(self) -> bool {
        self == UnaryOp::Not
    }
}

impl CompOp {
    pub fn is_word(self) -> bool {
        matches!(
            self,
            CompOp::In | CompOp::NotIn | CompOp::Is | CompOp::IsNot
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BinaryOperator {
    pub kind: BinaryOp,
    pub whitespace_before: Whitespace,
    pub whitespace_after: Whitespace,
}

impl BinaryOperator {
    /// The operator with one space on each side.
    pub fn spaced(kind: BinaryOp) -> Self {
        Self {
            kind,
            whitespace_before: Whitespace::space(),
            whitespace_after: Whitespace::space(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct UnaryOperator {
    pub kind: UnaryOp,
    pub whitespace_after: Whitespace,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BooleanOperator {
    pub kind: BooleanOp,
    pub whitespace_before: Whitespace,
    pub whitespace_after: Whitespace,
}

impl BooleanOperator {
    pub fn spaced(kind: BooleanOp) -> Self {
        Self {
            kind,
            whitespace_before: Whitespace::space(),
            whitespace_after: Whitespace::space(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ComparisonOperator {
    pub kind: CompOp,
    pub whitespace_before: Whitespace,
    /// Between `not` and `in`, or `is` and `not`; empty otherwise
    pub whitespace_between: Whitespace,
    pub whitespace_after: Whitespace,
}

impl ComparisonOperator {
    pub fn spaced(kind: CompOp) -> Self {
        let between = if matches!(kind, CompOp::NotIn | CompOp::IsNot) {
            Whitespace::space()
        } else {
            Whitespace::empty()
        };
        Self {
            kind,
            whitespace_before: Whitespace::space(),
            whitespace_between: between,
            whitespace_after: Whitespace::space(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AugmentedOperator {
    pub kind: AugOp,
    pub whitespace_before: Whitespace,
    pub whitespace_after: Whitespace,
}

impl Validate for BinaryOperator {}
impl Validate for BooleanOperator {}
impl Validate for AugmentedOperator {}

impl Validate for UnaryOperator {}

impl Validate for ComparisonOperator {
    fn validate(&self) -> crate::Result<()> {
        let two_words = matches!(self.kind, CompOp::NotIn | CompOp::IsNot);
        if two_words && self.whitespace_between.is_empty() {
            return Err(crate::CstError::structural(format!(
                "Must have at least one space between the words of '{}'.",
                self.kind.token()
            )));
        }
        if !two_words && !self.whitespace_between.is_empty() {
            return Err(crate::CstError::structural(
                "Only 'not in' and 'is not' have whitespace between words.",
            ));
        }
        Ok(())
    }
}

impl Codegen for BinaryOperator {
    fn codegen(&self, state: &mut CodegenState) {
        self.whitespace_before.codegen(state);
        state.add_token(self.kind.token());
        self.whitespace_after.codegen(state);
    }
}

impl Codegen for UnaryOperator {
    fn codegen(&self, state: &mut CodegenState) {
        state.add_token(self.kind.token());
        self.whitespace_after.codegen(state);
    }
}

impl Codegen for BooleanOperator {
    fn codegen(&self, state: &mut CodegenState) {
        self.whitespace_before.codegen(state);
        state.add_token(self.kind.token());
        self.whitespace_after.codegen(state);
    }
}

impl Codegen for ComparisonOperator {
    fn codegen(&self, state: &mut CodegenState) {
        self.whitespace_before.codegen(state);
        match self.kind {
            CompOp::NotIn => {
                state.add_token("not");
                self.whitespace_between.codegen(state);
                state.add_token("in");
            }
            CompOp::IsNot => {
                state.add_token("is");
                self.whitespace_between.codegen(state);
                state.add_token("not");
            }
            kind => state.add_token(kind.token()),
        }
        self.whitespace_after.codegen(state);
    }
}

impl Codegen for AugmentedOperator {
    fn codegen(&self, state: &mut CodegenState) {
        self.whitespace_before.codegen(state);
        state.add_token(self.kind.token());
        self.whitespace_after.codegen(state);
    }
}
