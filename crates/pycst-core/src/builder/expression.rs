//! Expression conversion

use super::{Builder, as_node, child, find, malformed, token, ws_before};
use crate::Result;
use crate::nodes::*;
use crate::parser::node::{RawChild, RawNode};
use crate::tokenizer::TokenKind;
use std::sync::Arc;

/// Literal kind of a NUMBER token.
fn number(text: &str) -> Expression {
    let lower = text.to_ascii_lowercase();
    if lower.ends_with('j') {
        Imaginary::new(text).into()
    } else if lower.starts_with("0x") || lower.starts_with("0b") || lower.starts_with("0o") {
        Integer::new(text).into()
    } else if lower.contains(['.', 'e']) {
        Float::new(text).into()
    } else {
        Integer::new(text).into()
    }
}

fn plain_arg(value: Expression, comma: Option<Comma>) -> Arg {
    Arg {
        star: None,
        whitespace_after_star: Whitespace::empty(),
        keyword: None,
        equal: None,
        value,
        comma,
    }
}

impl Builder<'_> {
    pub(super) fn expression(&mut self, child: &RawChild) -> Result<Expression> {
        match child {
            RawChild::Node(node) => self.expression_node(node),
            RawChild::Token(token) => self.fail(
                token.start,
                format!("Unexpected {} in expression position.", token.describe()),
            ),
        }
    }

    pub(super) fn expression_node(&mut self, node: &RawNode) -> Result<Expression> {
        let children = &node.children;
        match self.rule_name(node) {
            "atom" => self.atom(children),
            "atom_expr" => self.atom_expr(children),
            "power" | "term" | "arith_expr" | "shift_expr" | "and_expr" | "xor_expr" | "expr" => {
                self.binary_chain(children)
            }
            "factor" | "not_test" => {
                let op = token(children, 0)?;
                let operand = child(children, 1)?;
                let Some(kind) = UnaryOp::from_token(&op.string) else {
                    return self.fail(op.start, format!("Unknown unary operator '{}'.", op.string));
                };
                Ok(UnaryOperation {
                    lpar: Vec::new(),
                    operator: UnaryOperator {
                        kind,
                        whitespace_after: ws_before(operand),
                    },
                    expression: self.expression(operand)?,
                    rpar: Vec::new(),
                }
                .into())
            }
            "or_test" | "and_test" => self.boolean_chain(children),
            "comparison" => self.comparison(children),
            "test" => {
                // or_test 'if' or_test 'else' test
                let test = child(children, 2)?;
                let orelse = child(children, 4)?;
                Ok(IfExp {
                    lpar: Vec::new(),
                    body: self.expression(child(children, 0)?)?,
                    whitespace_before_if: ws_before(child(children, 1)?),
                    whitespace_after_if: ws_before(test),
                    test: self.expression(test)?,
                    whitespace_before_else: ws_before(child(children, 3)?),
                    whitespace_after_else: ws_before(orelse),
                    orelse: self.expression(orelse)?,
                    rpar: Vec::new(),
                }
                .into())
            }
            "lambdef" | "lambdef_nocond" => self.lambda(children),
            "namedexpr_test" => {
                let walrus = child(children, 1)?;
                let value = child(children, 2)?;
                Ok(NamedExpr {
                    lpar: Vec::new(),
                    target: self.expression(child(children, 0)?)?,
                    whitespace_before_walrus: ws_before(walrus),
                    whitespace_after_walrus: ws_before(value),
                    value: self.expression(value)?,
                    rpar: Vec::new(),
                }
                .into())
            }
            "star_expr" => {
                let value = child(children, 1)?;
                Ok(StarredElement {
                    lpar: Vec::new(),
                    whitespace_before_value: ws_before(value),
                    value: self.expression(value)?,
                    rpar: Vec::new(),
                }
                .into())
            }
            "testlist_star_expr" | "testlist" | "exprlist" | "testlist_comp" => Ok(Tuple {
                lpar: Vec::new(),
                elements: self.elements(children)?,
                rpar: Vec::new(),
            }
            .into()),
            "yield_expr" => self.yield_expression(children),
            other => self.fail(
                node.first_token().start,
                format!("Unexpected {other} in expression position."),
            ),
        }
    }

    /// Left-associative `operand (op operand)*`.
    fn binary_chain(&mut self, children: &[RawChild]) -> Result<Expression> {
        let mut left = self.expression(child(children, 0)?)?;
        for pair in children[1..].chunks(2) {
            let [op, right] = pair else {
                return Err(malformed());
            };
            let op = op.first_token();
            let Some(kind) = BinaryOp::from_token(&op.string) else {
                return self.fail(op.start, format!("Unknown binary operator '{}'.", op.string));
            };
            left = BinaryOperation {
                lpar: Vec::new(),
                left,
                operator: BinaryOperator {
                    kind,
                    whitespace_before: Whitespace::new(op.prefix.as_str()),
                    whitespace_after: ws_before(right),
                },
                right: self.expression(right)?,
                rpar: Vec::new(),
            }
            .into();
        }
        Ok(left)
    }

    fn boolean_chain(&mut self, children: &[RawChild]) -> Result<Expression> {
        let mut left = self.expression(child(children, 0)?)?;
        for pair in children[1..].chunks(2) {
            let [op, right] = pair else {
                return Err(malformed());
            };
            let op = op.first_token();
            let Some(kind) = BooleanOp::from_token(&op.string) else {
                return self.fail(op.start, format!("Unknown boolean operator '{}'.", op.string));
            };
            left = BooleanOperation {
                lpar: Vec::new(),
                left,
                operator: BooleanOperator {
                    kind,
                    whitespace_before: Whitespace::new(op.prefix.as_str()),
                    whitespace_after: ws_before(right),
                },
                right: self.expression(right)?,
                rpar: Vec::new(),
            }
            .into();
        }
        Ok(left)
    }

    fn comparison(&mut self, children: &[RawChild]) -> Result<Expression> {
        let left = self.expression(child(children, 0)?)?;
        let mut comparisons = Vec::new();
        for pair in children[1..].chunks(2) {
            let [op, comparator] = pair else {
                return Err(malformed());
            };
            let words = &as_node(op)?.children;
            let first = token(words, 0)?;
            let second = words.get(1);
            let kind = match (first.string.as_str(), second.is_some()) {
                ("not", true) => CompOp::NotIn,
                ("is", true) => CompOp::IsNot,
                (text, _) => match CompOp::from_token(text) {
                    Some(kind) => kind,
                    None => {
                        return self.fail(first.start, format!("Unknown comparison '{text}'."));
                    }
                },
            };
            comparisons.push(ComparisonTarget {
                operator: ComparisonOperator {
                    kind,
                    whitespace_before: Whitespace::new(first.prefix.as_str()),
                    whitespace_between: second.map(ws_before).unwrap_or_default(),
                    whitespace_after: ws_before(comparator),
                },
                comparator: self.expression(comparator)?,
            });
        }
        Ok(Comparison {
            lpar: Vec::new(),
            left,
            comparisons,
            rpar: Vec::new(),
        }
        .into())
    }

    /// `'lambda' [varargslist] ':' test`
    fn lambda(&mut self, children: &[RawChild]) -> Result<Expression> {
        let colon = find(children, ":")?;
        let params = (colon == 2).then(|| &children[1]);
        let body = child(children, colon + 1)?;
        Ok(Lambda {
            lpar: Vec::new(),
            whitespace_after_lambda: params.map(ws_before).unwrap_or_default(),
            params: self.parameters(params)?,
            whitespace_before_colon: ws_before(&children[colon]),
            whitespace_after_colon: ws_before(body),
            body: self.expression(body)?,
            rpar: Vec::new(),
        }
        .into())
    }

    /// `'yield' ['from' test | testlist]`
    fn yield_expression(&mut self, children: &[RawChild]) -> Result<Expression> {
        let argument = children.get(1);
        let value = match argument {
            Some(arg) if self.is_rule(arg, "yield_arg") => {
                let parts = &as_node(arg)?.children;
                let item = child(parts, 1)?;
                Some(YieldValue::From(Arc::new(YieldFrom {
                    whitespace_after_from: ws_before(item),
                    item: self.expression(item)?,
                })))
            }
            Some(arg) => Some(YieldValue::Expression(self.expression(arg)?)),
            None => None,
        };
        Ok(Yield {
            lpar: Vec::new(),
            whitespace_after_yield: argument.map(ws_before).unwrap_or_default(),
            value,
            rpar: Vec::new(),
        }
        .into())
    }

    /// Comma-separated display or tuple elements.
    fn elements(&mut self, children: &[RawChild]) -> Result<Vec<Element>> {
        let mut elements = Vec::new();
        for (item, comma) in self.comma_separated(children) {
            elements.push(Element {
                value: self.expression(item)?,
                comma,
            });
        }
        Ok(elements)
    }

    fn atom(&mut self, children: &[RawChild]) -> Result<Expression> {
        let first = token(children, 0)?;
        match first.kind {
            TokenKind::Name => Ok(Name::new(first.string.as_str()).into()),
            TokenKind::Number => Ok(number(&first.string)),
            TokenKind::String => {
                if children.len() == 1 {
                    return Ok(SimpleString::new(first.string.as_str()).into());
                }
                let parts = children[1..]
                    .iter()
                    .map(|part| StringPart {
                        whitespace_before: ws_before(part),
                        value: part.first_token().string.clone(),
                    })
                    .collect();
                Ok(ConcatenatedString {
                    lpar: Vec::new(),
                    left: first.string.clone(),
                    parts,
                    rpar: Vec::new(),
                }
                .into())
            }
            _ => match first.string.as_str() {
                "(" => self.parenthesized(children),
                "[" => self.list(children),
                "{" => self.braces(children),
                "..." => Ok(Ellipsis {
                    lpar: Vec::new(),
                    rpar: Vec::new(),
                }
                .into()),
                other => self.fail(
                    first.start,
                    format!("Unexpected '{other}' in expression position."),
                ),
            },
        }
    }

    fn is_comprehension(&self, child: Option<&RawChild>) -> bool {
        child.is_some_and(|c| self.is_rule(c, "comp_for") || self.is_rule(c, "sync_comp_for"))
    }

    /// `'(' [yield_expr | testlist_comp] ')'`
    fn parenthesized(&mut self, children: &[RawChild]) -> Result<Expression> {
        let close = children.last().ok_or_else(malformed)?;
        let rpar = RightParen {
            whitespace_before: ws_before(close),
        };
        let Some(inner) = children.get(1).filter(|c| !c.is(")")) else {
            return Ok(Tuple {
                lpar: vec![LeftParen::default()],
                elements: Vec::new(),
                rpar: vec![rpar],
            }
            .into());
        };
        let lpar = LeftParen {
            whitespace_after: ws_before(inner),
        };
        if self.is_rule(inner, "testlist_comp") {
            let parts = &as_node(inner)?.children;
            if self.is_comprehension(parts.get(1)) {
                return Ok(GeneratorExp {
                    lpar: vec![lpar],
                    elt: self.expression(child(parts, 0)?)?,
                    for_in: self.comp_for(as_node(child(parts, 1)?)?)?,
                    rpar: vec![rpar],
                }
                .into());
            }
            return Ok(Tuple {
                lpar: vec![lpar],
                elements: self.elements(parts)?,
                rpar: vec![rpar],
            }
            .into());
        }
        self.expression(inner)?.parenthesize(lpar, rpar)
    }

    /// `'[' [testlist_comp] ']'`
    fn list(&mut self, children: &[RawChild]) -> Result<Expression> {
        let close = children.last().ok_or_else(malformed)?;
        let inner = children.get(1).filter(|c| !c.is("]"));
        let lbracket = LeftSquareBracket {
            whitespace_after: inner.map(ws_before).unwrap_or_default(),
        };
        let rbracket = RightSquareBracket {
            whitespace_before: ws_before(close),
        };
        let elements = match inner {
            None => Vec::new(),
            Some(inner) if self.is_rule(inner, "testlist_comp") => {
                let parts = &as_node(inner)?.children;
                if self.is_comprehension(parts.get(1)) {
                    return Ok(ListComp {
                        lpar: Vec::new(),
                        lbracket,
                        elt: self.expression(child(parts, 0)?)?,
                        for_in: self.comp_for(as_node(child(parts, 1)?)?)?,
                        rbracket,
                        rpar: Vec::new(),
                    }
                    .into());
                }
                self.elements(parts)?
            }
            Some(inner) => vec![Element {
                value: self.expression(inner)?,
                comma: None,
            }],
        };
        Ok(List {
            lpar: Vec::new(),
            lbracket,
            elements,
            rbracket,
            rpar: Vec::new(),
        }
        .into())
    }

    /// `'{' [dictorsetmaker] '}'`
    fn braces(&mut self, children: &[RawChild]) -> Result<Expression> {
        let close = children.last().ok_or_else(malformed)?;
        let inner = children.get(1).filter(|c| !c.is("}"));
        let lbrace = LeftCurlyBrace {
            whitespace_after: inner.map(ws_before).unwrap_or_default(),
        };
        let rbrace = RightCurlyBrace {
            whitespace_before: ws_before(close),
        };
        let Some(inner) = inner else {
            return Ok(Dict {
                lpar: Vec::new(),
                lbrace,
                elements: Vec::new(),
                rbrace,
                rpar: Vec::new(),
            }
            .into());
        };
        if !self.is_rule(inner, "dictorsetmaker") {
            return Ok(Set {
                lpar: Vec::new(),
                lbrace,
                elements: vec![Element {
                    value: self.expression(inner)?,
                    comma: None,
                }],
                rbrace,
                rpar: Vec::new(),
            }
            .into());
        }
        let parts = &as_node(inner)?.children;
        let first = child(parts, 0)?;
        let is_dict = first.is("**") || parts.get(1).is_some_and(|c| c.is(":"));
        if is_dict {
            return self.dict(parts, lbrace, rbrace);
        }
        if self.is_comprehension(parts.get(1)) {
            return Ok(SetComp {
                lpar: Vec::new(),
                lbrace,
                elt: self.expression(first)?,
                for_in: self.comp_for(as_node(child(parts, 1)?)?)?,
                rbrace,
                rpar: Vec::new(),
            }
            .into());
        }
        Ok(Set {
            lpar: Vec::new(),
            lbrace,
            elements: self.elements(parts)?,
            rbrace,
            rpar: Vec::new(),
        }
        .into())
    }

    fn dict(
        &mut self,
        parts: &[RawChild],
        lbrace: LeftCurlyBrace,
        rbrace: RightCurlyBrace,
    ) -> Result<Expression> {
        let first = child(parts, 0)?;
        if first.is("**") && self.is_comprehension(parts.get(2)) {
            return self.fail(
                first.start(),
                "dict unpacking cannot be used in dict comprehension",
            );
        }
        if self.is_comprehension(parts.get(3)) {
            let colon = child(parts, 1)?;
            let value = child(parts, 2)?;
            return Ok(DictComp {
                lpar: Vec::new(),
                lbrace,
                key: self.expression(first)?,
                whitespace_before_colon: ws_before(colon),
                whitespace_after_colon: ws_before(value),
                value: self.expression(value)?,
                for_in: self.comp_for(as_node(child(parts, 3)?)?)?,
                rbrace,
                rpar: Vec::new(),
            }
            .into());
        }
        let mut elements = Vec::new();
        let mut i = 0;
        while i < parts.len() {
            let (key, whitespace_before_colon, value) = if parts[i].is("**") {
                let value = child(parts, i + 1)?;
                i += 2;
                (None, Whitespace::empty(), value)
            } else {
                let colon = child(parts, i + 1)?;
                let value = child(parts, i + 2)?;
                let key = self.expression(&parts[i])?;
                i += 3;
                (Some(key), ws_before(colon), value)
            };
            let comma = parts.get(i).filter(|c| c.is(",")).map(|comma| Comma {
                whitespace_before: ws_before(comma),
                whitespace_after: parts.get(i + 1).map(ws_before).unwrap_or_default(),
            });
            if comma.is_some() {
                i += 1;
            }
            elements.push(DictElement {
                key,
                whitespace_before_colon,
                whitespace_before_value: ws_before(value),
                value: self.expression(value)?,
                comma,
            });
        }
        Ok(Dict {
            lpar: Vec::new(),
            lbrace,
            elements,
            rbrace,
            rpar: Vec::new(),
        }
        .into())
    }

    /// `['async'] 'for' exprlist 'in' or_test comp_if* [comp_for]`
    fn comp_for(&mut self, node: &RawNode) -> Result<CompFor> {
        let (asynchronous, clause) = if self.rule_name(node) == "comp_for" {
            let inner = as_node(child(&node.children, 1)?)?;
            let asynchronous = Asynchronous {
                whitespace_after: Whitespace::new(inner.first_token().prefix.as_str()),
            };
            (Some(asynchronous), inner)
        } else {
            (None, node)
        };
        let parts = &clause.children;
        let target = child(parts, 1)?;
        let iter = child(parts, 3)?;
        let mut ifs = Vec::new();
        let mut inner_for_in = None;
        for part in &parts[4..] {
            if self.is_rule(part, "comp_if") {
                let test = child(&as_node(part)?.children, 1)?;
                ifs.push(CompIf {
                    whitespace_before: ws_before(part),
                    whitespace_before_test: ws_before(test),
                    test: self.expression(test)?,
                });
            } else {
                inner_for_in = Some(Arc::new(self.comp_for(as_node(part)?)?));
            }
        }
        Ok(CompFor {
            whitespace_before: Whitespace::new(node.first_token().prefix.as_str()),
            asynchronous,
            whitespace_after_for: ws_before(target),
            target: self.expression(target)?,
            whitespace_before_in: ws_before(child(parts, 2)?),
            whitespace_after_in: ws_before(iter),
            iter: self.expression(iter)?,
            ifs,
            inner_for_in,
        })
    }

    /// `['await'] atom trailer*`
    fn atom_expr(&mut self, children: &[RawChild]) -> Result<Expression> {
        let awaited = children.first().is_some_and(|c| c.is("await"));
        let rest = if awaited { &children[1..] } else { children };
        let atom = child(rest, 0)?;
        let mut value = self.expression(atom)?;
        for trailer in &rest[1..] {
            value = self.trailer(value, as_node(trailer)?)?;
        }
        if awaited {
            value = Await {
                lpar: Vec::new(),
                whitespace_after_await: ws_before(atom),
                expression: value,
                rpar: Vec::new(),
            }
            .into();
        }
        Ok(value)
    }

    /// Apply a call, subscript or attribute access to `value`.
    fn trailer(&mut self, value: Expression, node: &RawNode) -> Result<Expression> {
        let parts = &node.children;
        let open = token(parts, 0)?;
        let close = parts.last().ok_or_else(malformed)?;
        Ok(match open.string.as_str() {
            "." => {
                let name = token(parts, 1)?;
                Attribute {
                    lpar: Vec::new(),
                    value,
                    dot: Dot {
                        whitespace_before: Whitespace::new(open.prefix.as_str()),
                        whitespace_after: Whitespace::new(name.prefix.as_str()),
                    },
                    attr: Name::new(name.string.as_str()),
                    rpar: Vec::new(),
                }
                .into()
            }
            "(" => {
                let args = parts.get(1).filter(|c| !c.is(")"));
                Call {
                    lpar: Vec::new(),
                    func: value,
                    whitespace_after_func: Whitespace::new(open.prefix.as_str()),
                    whitespace_before_args: args.map(ws_before).unwrap_or_default(),
                    args: self.arguments(args)?,
                    whitespace_before_close: ws_before(close),
                    rpar: Vec::new(),
                }
                .into()
            }
            _ => {
                let subscripts = child(parts, 1)?;
                Subscript {
                    lpar: Vec::new(),
                    value,
                    whitespace_after_value: Whitespace::new(open.prefix.as_str()),
                    lbracket: LeftSquareBracket {
                        whitespace_after: ws_before(subscripts),
                    },
                    slice: self.subscripts(subscripts)?,
                    rbracket: RightSquareBracket {
                        whitespace_before: ws_before(close),
                    },
                    rpar: Vec::new(),
                }
                .into()
            }
        })
    }

    fn subscripts(&mut self, list: &RawChild) -> Result<Vec<SubscriptElement>> {
        let items = if self.is_rule(list, "subscriptlist") {
            self.comma_separated(&as_node(list)?.children)
        } else {
            vec![(list, None)]
        };
        let mut elements = Vec::with_capacity(items.len());
        for (item, comma) in items {
            let slice = if self.is_rule(item, "subscript") {
                BaseSlice::Slice(Arc::new(self.slice(&as_node(item)?.children)?))
            } else {
                BaseSlice::Index(self.expression(item)?)
            };
            elements.push(SubscriptElement { slice, comma });
        }
        Ok(elements)
    }

    /// `[test] ':' [test] [sliceop]`
    fn slice(&mut self, parts: &[RawChild]) -> Result<Slice> {
        let mut i = 0;
        let lower = match parts.first() {
            Some(lower) if !lower.is(":") => {
                i = 1;
                Some(self.expression(lower)?)
            }
            _ => None,
        };
        let colon = child(parts, i)?;
        i += 1;
        let upper = parts.get(i).filter(|c| !self.is_rule(c, "sliceop"));
        if upper.is_some() {
            i += 1;
        }
        let (whitespace_before_step_colon, whitespace_before_step, step) = match parts.get(i) {
            Some(sliceop) => {
                let op = &as_node(sliceop)?.children;
                let step = op.get(1);
                (
                    Some(ws_before(child(op, 0)?)),
                    step.map(ws_before).unwrap_or_default(),
                    step.map(|s| self.expression(s)).transpose()?,
                )
            }
            None => (None, Whitespace::empty(), None),
        };
        Ok(Slice {
            lower,
            whitespace_before_colon: ws_before(colon),
            whitespace_before_upper: upper.map(ws_before).unwrap_or_default(),
            upper: upper.map(|u| self.expression(u)).transpose()?,
            whitespace_before_step_colon,
            whitespace_before_step,
            step,
        })
    }

    /// Call or class arguments, in order, with their ordering checked.
    pub(super) fn arguments(&mut self, list: Option<&RawChild>) -> Result<Vec<Arg>> {
        let Some(list) = list else {
            return Ok(Vec::new());
        };
        let items = if self.is_rule(list, "arglist") {
            self.comma_separated(&as_node(list)?.children)
        } else {
            vec![(list, None)]
        };
        let count = items.len();
        let mut args = Vec::with_capacity(count);
        let mut seen_keyword = false;
        let mut seen_double_star = false;
        for (item, comma) in items {
            let arg = self.argument(item, comma, count)?;
            match (&arg.star, &arg.keyword) {
                (Some(ArgStar::DoubleStar), _) => seen_double_star = true,
                (Some(ArgStar::Star), _) if seen_double_star => {
                    return self.fail(
                        item.start(),
                        "Iterable argument unpacking follows keyword argument unpacking.",
                    );
                }
                (None, Some(_)) => seen_keyword = true,
                (None, None) if seen_double_star => {
                    return self.fail(
                        item.start(),
                        "Positional argument follows keyword argument unpacking.",
                    );
                }
                (None, None) if seen_keyword => {
                    return self.fail(item.start(), "Positional argument follows keyword argument.");
                }
                _ => {}
            }
            args.push(arg);
        }
        Ok(args)
    }

    fn argument(&mut self, item: &RawChild, comma: Option<Comma>, count: usize) -> Result<Arg> {
        if !self.is_rule(item, "argument") {
            return Ok(plain_arg(self.expression(item)?, comma));
        }
        let parts = &as_node(item)?.children;
        let first = child(parts, 0)?;
        let second = child(parts, 1)?;
        if first.is("*") || first.is("**") {
            let star = if first.is("*") {
                ArgStar::Star
            } else {
                ArgStar::DoubleStar
            };
            return Ok(Arg {
                star: Some(star),
                whitespace_after_star: ws_before(second),
                ..plain_arg(self.expression(second)?, comma)
            });
        }
        if second.is("=") {
            let keyword = match first.as_node().map(|n| n.children.as_slice()) {
                Some([RawChild::Token(name)])
                    if name.kind == TokenKind::Name && !self.grammar.is_keyword(&name.string) =>
                {
                    Name::new(name.string.as_str())
                }
                _ => return self.fail(first.start(), "Keyword argument must be a plain name."),
            };
            let value = child(parts, 2)?;
            return Ok(Arg {
                keyword: Some(keyword),
                equal: Some(AssignEqual {
                    whitespace_before: ws_before(second),
                    whitespace_after: ws_before(value),
                }),
                ..plain_arg(self.expression(value)?, comma)
            });
        }
        if second.is(":=") {
            let value = child(parts, 2)?;
            let named = NamedExpr {
                lpar: Vec::new(),
                target: self.expression(first)?,
                whitespace_before_walrus: ws_before(second),
                whitespace_after_walrus: ws_before(value),
                value: self.expression(value)?,
                rpar: Vec::new(),
            };
            return Ok(plain_arg(named.into(), comma));
        }
        // test comp_for
        if count > 1 {
            return self.fail(item.start(), "Generator expression must be parenthesized");
        }
        let generator = GeneratorExp {
            lpar: Vec::new(),
            elt: self.expression(first)?,
            for_in: self.comp_for(as_node(second)?)?,
            rpar: Vec::new(),
        };
        Ok(plain_arg(generator.into(), comma))
    }

    /// Function or lambda parameters, with their ordering checked.
    pub(super) fn parameters(&mut self, list: Option<&RawChild>) -> Result<Parameters> {
        let Some(list) = list else {
            return Ok(Parameters { params: Vec::new() });
        };
        let items = if self.is_rule(list, "typedargslist") || self.is_rule(list, "varargslist") {
            self.comma_separated(&as_node(list)?.children)
        } else {
            vec![(list, None)]
        };
        let mut params = Vec::with_capacity(items.len());
        let mut starts = Vec::with_capacity(items.len());
        for (item, comma) in items {
            starts.push(item.start());
            params.push(self.param(item, comma)?);
        }
        let parameters = Parameters { params };
        if let Err((index, message)) = parameters.check_order() {
            let at = starts.get(index).or(starts.last()).copied().unwrap_or_default();
            return self.fail(at, message);
        }
        Ok(parameters)
    }

    /// A `typedarg`, `vararg` or bare `tfpdef`.
    fn param(&mut self, item: &RawChild, comma: Option<Comma>) -> Result<Param> {
        let mut param = Param {
            kind: ParamKind::Regular,
            whitespace_after_star: Whitespace::empty(),
            name: None,
            annotation: None,
            equal: None,
            default: None,
            comma,
        };
        let node = as_node(item)?;
        if self.rule_name(node) == "tfpdef" {
            self.param_name(item, &mut param)?;
            return Ok(param);
        }
        let parts = &node.children;
        let first = child(parts, 0)?;
        let mut next = 1;
        if first.is("*") || first.is("**") {
            param.kind = if first.is("*") {
                ParamKind::Star
            } else {
                ParamKind::DoubleStar
            };
            if let Some(target) = parts.get(1) {
                param.whitespace_after_star = ws_before(target);
                self.param_name(target, &mut param)?;
                next = 2;
            }
        } else if first.is("/") {
            param.kind = ParamKind::Slash;
        } else {
            self.param_name(first, &mut param)?;
        }
        if let Some(equal) = parts.get(next).filter(|c| c.is("=")) {
            let default = child(parts, next + 1)?;
            param.equal = Some(AssignEqual {
                whitespace_before: ws_before(equal),
                whitespace_after: ws_before(default),
            });
            param.default = Some(self.expression(default)?);
        }
        Ok(param)
    }

    /// `NAME` or `tfpdef: NAME [':' test]`
    fn param_name(&mut self, target: &RawChild, param: &mut Param) -> Result<()> {
        let parts = match target {
            RawChild::Token(name) => {
                param.name = Some(Name::new(name.string.as_str()));
                return Ok(());
            }
            RawChild::Node(node) => &node.children,
        };
        param.name = Some(Name::new(token(parts, 0)?.string.as_str()));
        if let (Some(colon), Some(annotation)) = (parts.get(1), parts.get(2)) {
            param.annotation = Some(Annotation {
                whitespace_before_indicator: ws_before(colon),
                indicator: AnnotationIndicator::Colon,
                whitespace_after_indicator: ws_before(annotation),
                annotation: self.expression(annotation)?,
            });
        }
        Ok(())
    }
}
