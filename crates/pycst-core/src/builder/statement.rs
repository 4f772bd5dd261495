//! Statement conversion

use super::{Builder, as_node, child, find, token, ws_before};
use crate::Result;
use crate::nodes::*;
use crate::parser::node::{RawChild, RawNode};
use crate::tokenizer::Token;
use std::sync::Arc;

/// Everything that can come before a `def` or `class` keyword.
#[derive(Default)]
struct Head {
    leading_lines: Vec<EmptyLine>,
    decorators: Vec<Decorator>,
    lines_after_decorators: Vec<EmptyLine>,
    asynchronous: Option<Asynchronous>,
}

/// Detach the blank and comment lines in front of a statement.
pub(super) fn take_leading_lines(statement: &mut Statement) -> Vec<EmptyLine> {
    match statement {
        Statement::SimpleStatementLine(n) => std::mem::take(&mut Arc::make_mut(n).leading_lines),
        Statement::If(n) => std::mem::take(&mut Arc::make_mut(n).leading_lines),
        Statement::While(n) => std::mem::take(&mut Arc::make_mut(n).leading_lines),
        Statement::For(n) => std::mem::take(&mut Arc::make_mut(n).leading_lines),
        Statement::Try(n) => std::mem::take(&mut Arc::make_mut(n).leading_lines),
        Statement::With(n) => std::mem::take(&mut Arc::make_mut(n).leading_lines),
        Statement::FunctionDef(n) => std::mem::take(&mut Arc::make_mut(n).leading_lines),
        Statement::ClassDef(n) => std::mem::take(&mut Arc::make_mut(n).leading_lines),
    }
}

impl Builder<'_> {
    /// Lines in front of a token at the current block depth.
    fn leading_lines(&self, token: &Token) -> Vec<EmptyLine> {
        self.empty_lines(&token.prefix, false)
    }

    pub(super) fn statement(&mut self, node: &RawNode) -> Result<Statement> {
        let leading_lines = self.leading_lines(node.first_token());
        Ok(match self.rule_name(node) {
            "simple_stmt" => {
                let (body, trailing_whitespace) = self.simple_statement(node)?;
                SimpleStatementLine {
                    leading_lines,
                    body,
                    trailing_whitespace,
                }
                .into()
            }
            "if_stmt" => self.if_statement(node, leading_lines)?.into(),
            "while_stmt" => self.while_statement(node, leading_lines)?.into(),
            "for_stmt" => self.for_statement(node, leading_lines, None)?.into(),
            "try_stmt" => self.try_statement(node, leading_lines)?.into(),
            "with_stmt" => self.with_statement(node, leading_lines, None)?.into(),
            "funcdef" => self
                .function_def(
                    node,
                    Head {
                        leading_lines,
                        ..Head::default()
                    },
                )?
                .into(),
            "classdef" => self
                .class_def(
                    node,
                    Head {
                        leading_lines,
                        ..Head::default()
                    },
                )?
                .into(),
            "decorated" => self.decorated(node, leading_lines)?,
            "async_stmt" => {
                let inner = as_node(child(&node.children, 1)?)?;
                let asynchronous = Some(Asynchronous {
                    whitespace_after: Whitespace::new(inner.first_token().prefix.as_str()),
                });
                match self.rule_name(inner) {
                    "funcdef" => self
                        .function_def(
                            inner,
                            Head {
                                leading_lines,
                                asynchronous,
                                ..Head::default()
                            },
                        )?
                        .into(),
                    "with_stmt" => self.with_statement(inner, leading_lines, asynchronous)?.into(),
                    _ => self.for_statement(inner, leading_lines, asynchronous)?.into(),
                }
            }
            other => {
                return self.fail(
                    node.first_token().start,
                    format!("Unexpected {other} in statement position."),
                );
            }
        })
    }

    /// The small statements of a `simple_stmt` and the end of its line.
    fn simple_statement(
        &mut self,
        node: &RawNode,
    ) -> Result<(Vec<SmallStatement>, TrailingWhitespace)> {
        let (newline, children) = node.children.split_last().ok_or_else(super::malformed)?;
        let newline = newline.as_token().ok_or_else(super::malformed)?;
        let mut body = Vec::new();
        let mut i = 0;
        while i < children.len() {
            let statement = as_node(&children[i])?;
            let semicolon = children.get(i + 1).filter(|c| c.is(";")).map(|semi| Semicolon {
                whitespace_before: ws_before(semi),
                whitespace_after: children.get(i + 2).map(ws_before).unwrap_or_default(),
            });
            i += if semicolon.is_some() { 2 } else { 1 };
            body.push(self.small_statement(statement, semicolon)?);
        }
        Ok((body, self.trailing(newline)))
    }

    fn small_statement(
        &mut self,
        node: &RawNode,
        semicolon: Option<Semicolon>,
    ) -> Result<SmallStatement> {
        let children = &node.children;
        Ok(match self.rule_name(node) {
            "expr_stmt" => self.expression_statement(node, semicolon)?,
            "pass_stmt" => Pass { semicolon }.into(),
            "break_stmt" => Break { semicolon }.into(),
            "continue_stmt" => Continue { semicolon }.into(),
            "del_stmt" => {
                let target = child(children, 1)?;
                Del {
                    whitespace_after_del: ws_before(target),
                    target: self.expression(target)?,
                    semicolon,
                }
                .into()
            }
            "return_stmt" => {
                let value = children.get(1);
                Return {
                    whitespace_after_return: value.map(ws_before).unwrap_or_default(),
                    value: value.map(|v| self.expression(v)).transpose()?,
                    semicolon,
                }
                .into()
            }
            "raise_stmt" => {
                let exc = children.get(1);
                let cause = match children.get(2) {
                    Some(from) => {
                        let item = child(children, 3)?;
                        Some(RaiseFrom {
                            whitespace_before_from: ws_before(from),
                            whitespace_after_from: ws_before(item),
                            item: self.expression(item)?,
                        })
                    }
                    None => None,
                };
                Raise {
                    whitespace_after_raise: exc.map(ws_before).unwrap_or_default(),
                    exc: exc.map(|e| self.expression(e)).transpose()?,
                    cause,
                    semicolon,
                }
                .into()
            }
            "import_name" => self.import(node, semicolon)?.into(),
            "import_from" => self.import_from(node, semicolon)?.into(),
            "global_stmt" => {
                let (whitespace_after_global, names) = self.name_items(children)?;
                Global {
                    whitespace_after_global,
                    names,
                    semicolon,
                }
                .into()
            }
            "nonlocal_stmt" => {
                let (whitespace_after_nonlocal, names) = self.name_items(children)?;
                Nonlocal {
                    whitespace_after_nonlocal,
                    names,
                    semicolon,
                }
                .into()
            }
            "assert_stmt" => {
                let test = child(children, 1)?;
                let (comma, msg) = match (children.get(2), children.get(3)) {
                    (Some(comma), Some(msg)) => (
                        Some(Comma {
                            whitespace_before: ws_before(comma),
                            whitespace_after: ws_before(msg),
                        }),
                        Some(self.expression(msg)?),
                    ),
                    _ => (None, None),
                };
                Assert {
                    whitespace_after_assert: ws_before(test),
                    test: self.expression(test)?,
                    comma,
                    msg,
                    semicolon,
                }
                .into()
            }
            // Anything else is an expression standing on its own.
            _ => Expr {
                value: self.expression_node(node)?,
                semicolon,
            }
            .into(),
        })
    }

    /// Plain, annotated and augmented assignment.
    fn expression_statement(
        &mut self,
        node: &RawNode,
        semicolon: Option<Semicolon>,
    ) -> Result<SmallStatement> {
        let children = &node.children;
        let target = self.expression(child(children, 0)?)?;
        let second = child(children, 1)?;
        if self.is_rule(second, "annassign") {
            let parts = &as_node(second)?.children;
            let colon = child(parts, 0)?;
            let annotation = child(parts, 1)?;
            let (equal, value) = match (parts.get(2), parts.get(3)) {
                (Some(equal), Some(value)) => (
                    Some(AssignEqual {
                        whitespace_before: ws_before(equal),
                        whitespace_after: ws_before(value),
                    }),
                    Some(self.expression(value)?),
                ),
                _ => (None, None),
            };
            return Ok(AnnAssign {
                target,
                annotation: Annotation {
                    whitespace_before_indicator: ws_before(colon),
                    indicator: AnnotationIndicator::Colon,
                    whitespace_after_indicator: ws_before(annotation),
                    annotation: self.expression(annotation)?,
                },
                equal,
                value,
                semicolon,
            }
            .into());
        }
        if self.is_rule(second, "augassign") {
            let op = as_node(second)?.first_token();
            let value = child(children, 2)?;
            let Some(kind) = AugOp::from_token(&op.string) else {
                return self.fail(
                    op.start,
                    format!("Unknown augmented assignment '{}'.", op.string),
                );
            };
            return Ok(AugAssign {
                target,
                operator: AugmentedOperator {
                    kind,
                    whitespace_before: Whitespace::new(op.prefix.as_str()),
                    whitespace_after: ws_before(value),
                },
                value: self.expression(value)?,
                semicolon,
            }
            .into());
        }
        // target ('=' target)* '=' value
        let mut targets = Vec::new();
        let mut current = target;
        let mut i = 1;
        while i + 1 < children.len() {
            let equal = &children[i];
            let next = &children[i + 1];
            targets.push(AssignTarget {
                target: current,
                whitespace_before_equal: ws_before(equal),
                whitespace_after_equal: ws_before(next),
            });
            current = self.expression(next)?;
            i += 2;
        }
        Ok(Assign {
            targets,
            value: current,
            semicolon,
        }
        .into())
    }

    /// `global a, b` and `nonlocal a, b`
    fn name_items(&mut self, children: &[RawChild]) -> Result<(Whitespace, Vec<NameItem>)> {
        let first = child(children, 1)?;
        let mut names = Vec::new();
        for (item, comma) in self.comma_separated(&children[1..]) {
            names.push(NameItem {
                name: Name::new(item.first_token().string.as_str()),
                comma,
            });
        }
        Ok((ws_before(first), names))
    }

    /// `a.b.c` as nested attributes.
    fn dotted_name(&mut self, child: &RawChild) -> Result<Expression> {
        let parts = match child {
            RawChild::Token(name) => return Ok(Name::new(name.string.as_str()).into()),
            RawChild::Node(node) => &node.children,
        };
        let mut expression: Expression = Name::new(token(parts, 0)?.string.as_str()).into();
        for pair in parts[1..].chunks(2) {
            let [dot, name] = pair else {
                return Err(super::malformed());
            };
            expression = Attribute {
                lpar: Vec::new(),
                value: expression,
                dot: Dot {
                    whitespace_before: ws_before(dot),
                    whitespace_after: ws_before(name),
                },
                attr: Name::new(name.first_token().string.as_str()),
                rpar: Vec::new(),
            }
            .into();
        }
        Ok(expression)
    }

    /// `dotted_as_name`, `import_as_name` or a bare `dotted_name`.
    fn import_alias(&mut self, item: &RawChild, comma: Option<Comma>) -> Result<ImportAlias> {
        let node = as_node(item)?;
        let rule = self.rule_name(node);
        let aliased = node.children.len() == 3 && node.children[1].is("as");
        if rule == "dotted_name" || !aliased {
            let name = match rule {
                "dotted_name" => self.dotted_name(item)?,
                _ => self.dotted_name(child(&node.children, 0)?)?,
            };
            return Ok(ImportAlias {
                name,
                asname: None,
                comma,
            });
        }
        let alias = token(&node.children, 2)?;
        Ok(ImportAlias {
            name: self.dotted_name(&node.children[0])?,
            asname: Some(AsName {
                whitespace_before_as: ws_before(&node.children[1]),
                whitespace_after_as: Whitespace::new(alias.prefix.as_str()),
                name: Name::new(alias.string.as_str()).into(),
            }),
            comma,
        })
    }

    fn import_aliases(&mut self, names: &RawChild, list_rule: &str) -> Result<Vec<ImportAlias>> {
        let node = as_node(names)?;
        let items = if self.rule_name(node) == list_rule {
            self.comma_separated(&node.children)
        } else {
            vec![(names, None)]
        };
        let mut aliases = Vec::with_capacity(items.len());
        for (item, comma) in items {
            aliases.push(self.import_alias(item, comma)?);
        }
        Ok(aliases)
    }

    fn import(&mut self, node: &RawNode, semicolon: Option<Semicolon>) -> Result<Import> {
        let names = child(&node.children, 1)?;
        Ok(Import {
            whitespace_after_import: ws_before(names),
            names: self.import_aliases(names, "dotted_as_names")?,
            semicolon,
        })
    }

    fn import_from(&mut self, node: &RawNode, semicolon: Option<Semicolon>) -> Result<ImportFrom> {
        let children = &node.children;
        let source = child(children, 1)?;
        let (dots, module) = if self.is_rule(source, "import_relative") {
            let parts = &as_node(source)?.children;
            match parts.last() {
                Some(last) if last.as_node().is_some() => (&parts[..parts.len() - 1], Some(last)),
                _ => (&parts[..], None),
            }
        } else {
            (&[][..], Some(source))
        };
        let relative = dots
            .iter()
            .enumerate()
            .map(|(i, dot)| RelativeDot {
                whitespace_before: if i == 0 { Whitespace::empty() } else { ws_before(dot) },
                dots: dot.first_token().string.clone(),
            })
            .collect::<Vec<_>>();
        let whitespace_before_module = match module {
            Some(module) if !relative.is_empty() => ws_before(module),
            _ => Whitespace::empty(),
        };
        let module = module.map(|m| self.dotted_name(m)).transpose()?;

        let import = find(children, "import")?;
        let rest = &children[import + 1..];
        let first = child(rest, 0)?;
        let (lpar, names, rpar) = if first.is("*") {
            (None, ImportNames::Star, None)
        } else if first.is("(") {
            let names = child(rest, 1)?;
            let close = child(rest, 2)?;
            (
                Some(LeftParen {
                    whitespace_after: ws_before(names),
                }),
                ImportNames::Aliases(self.import_aliases(names, "import_as_names")?),
                Some(RightParen {
                    whitespace_before: ws_before(close),
                }),
            )
        } else {
            let aliases = self.import_aliases(first, "import_as_names")?;
            if aliases.last().is_some_and(|a| a.comma.is_some()) {
                let comma = as_node(first)?.children.last().ok_or_else(super::malformed)?;
                return self.fail(
                    comma.start(),
                    "trailing comma not allowed without surrounding parentheses",
                );
            }
            (None, ImportNames::Aliases(aliases), None)
        };
        Ok(ImportFrom {
            whitespace_after_from: ws_before(source),
            relative,
            whitespace_before_module,
            module,
            whitespace_before_import: ws_before(&children[import]),
            whitespace_after_import: ws_before(first),
            lpar,
            names,
            rpar,
            semicolon,
        })
    }

    /// A `suite`: either the rest of the header line or an indented block.
    fn suite(&mut self, child: &RawChild) -> Result<Suite> {
        let node = as_node(child)?;
        if self.rule_name(node) == "simple_stmt" {
            let (body, trailing_whitespace) = self.simple_statement(node)?;
            return Ok(SimpleStatementSuite {
                leading_whitespace: ws_before(child),
                body,
                trailing_whitespace,
            }
            .into());
        }
        // NEWLINE INDENT stmt+ DEDENT
        let (dedent, rest) = node.children.split_last().ok_or_else(super::malformed)?;
        let header = self.trailing(token(rest, 0)?);
        let relative = token(rest, 1)?.relative_indent.clone().unwrap_or_default();
        let enclosing = self.indents.last().map(String::as_str).unwrap_or_default();
        let absolute = format!("{enclosing}{relative}");
        self.indents.push(absolute);
        let mut body = Vec::new();
        for statement in &rest[2..] {
            body.push(self.statement(as_node(statement)?)?);
        }
        let footer = self.leading_lines(dedent.first_token());
        self.indents.pop();
        Ok(IndentedBlock {
            header,
            indent: (relative != self.default_indent).then_some(relative),
            body,
            footer,
        }
        .into())
    }

    fn if_statement(&mut self, node: &RawNode, leading_lines: Vec<EmptyLine>) -> Result<If> {
        let children = &node.children;
        // 'if' / 'elif' clauses as (keyword, test, colon, suite)
        let mut clauses = Vec::new();
        let mut orelse = None;
        let mut i = 0;
        while i < children.len() {
            let keyword = child(children, i)?;
            if keyword.is("else") {
                orelse = Some(self.else_clause(children, i)?);
                break;
            }
            let test = child(children, i + 1)?;
            let colon = child(children, i + 2)?;
            let body = self.suite(child(children, i + 3)?)?;
            clauses.push(If {
                leading_lines: self.leading_lines(keyword.first_token()),
                whitespace_before_test: ws_before(test),
                test: self.expression(test)?,
                whitespace_after_test: ws_before(colon),
                body,
                orelse: None,
            });
            i += 4;
        }
        let mut orelse = orelse.map(|e| OrElse::Else(Arc::new(e)));
        while let Some(mut clause) = clauses.pop() {
            clause.orelse = orelse;
            if clauses.is_empty() {
                clause.leading_lines = leading_lines;
                return Ok(clause);
            }
            orelse = Some(OrElse::Elif(Arc::new(clause)));
        }
        Err(super::malformed())
    }

    /// `else ':' suite` starting at `index`.
    fn else_clause(&mut self, children: &[RawChild], index: usize) -> Result<Else> {
        let keyword = child(children, index)?;
        Ok(Else {
            leading_lines: self.leading_lines(keyword.first_token()),
            whitespace_before_colon: ws_before(child(children, index + 1)?),
            body: self.suite(child(children, index + 2)?)?,
        })
    }

    fn optional_else(&mut self, children: &[RawChild], index: usize) -> Result<Option<Else>> {
        match children.get(index) {
            Some(keyword) if keyword.is("else") => Ok(Some(self.else_clause(children, index)?)),
            _ => Ok(None),
        }
    }

    fn while_statement(&mut self, node: &RawNode, leading_lines: Vec<EmptyLine>) -> Result<While> {
        let children = &node.children;
        let test = child(children, 1)?;
        Ok(While {
            leading_lines,
            whitespace_after_while: ws_before(test),
            test: self.expression(test)?,
            whitespace_before_colon: ws_before(child(children, 2)?),
            body: self.suite(child(children, 3)?)?,
            orelse: self.optional_else(children, 4)?,
        })
    }

    fn for_statement(
        &mut self,
        node: &RawNode,
        leading_lines: Vec<EmptyLine>,
        asynchronous: Option<Asynchronous>,
    ) -> Result<For> {
        let children = &node.children;
        let target = child(children, 1)?;
        let iter = child(children, 3)?;
        Ok(For {
            leading_lines,
            asynchronous,
            whitespace_after_for: ws_before(target),
            target: self.expression(target)?,
            whitespace_before_in: ws_before(child(children, 2)?),
            whitespace_after_in: ws_before(iter),
            iter: self.expression(iter)?,
            whitespace_before_colon: ws_before(child(children, 4)?),
            body: self.suite(child(children, 5)?)?,
            orelse: self.optional_else(children, 6)?,
        })
    }

    fn try_statement(&mut self, node: &RawNode, leading_lines: Vec<EmptyLine>) -> Result<Try> {
        let children = &node.children;
        let whitespace_before_colon = ws_before(child(children, 1)?);
        let body = self.suite(child(children, 2)?)?;
        let mut handlers = Vec::new();
        let mut orelse = None;
        let mut finalbody = None;
        let mut i = 3;
        while i < children.len() {
            let clause = &children[i];
            if clause.is("else") {
                orelse = Some(self.else_clause(children, i)?);
            } else if clause.is("finally") {
                finalbody = Some(Finally {
                    leading_lines: self.leading_lines(clause.first_token()),
                    whitespace_before_colon: ws_before(child(children, i + 1)?),
                    body: self.suite(child(children, i + 2)?)?,
                });
            } else {
                handlers.push(self.except_handler(children, i)?);
            }
            i += 3;
        }
        Ok(Try {
            leading_lines,
            whitespace_before_colon,
            body,
            handlers,
            orelse,
            finalbody,
        })
    }

    /// `except_clause ':' suite` starting at `index`.
    fn except_handler(&mut self, children: &[RawChild], index: usize) -> Result<ExceptHandler> {
        let clause = &as_node(child(children, index)?)?.children;
        let exception = clause.get(1);
        let name = match (clause.get(2), clause.get(3)) {
            (Some(as_keyword), Some(name)) => Some(AsName {
                whitespace_before_as: ws_before(as_keyword),
                whitespace_after_as: ws_before(name),
                name: Name::new(name.first_token().string.as_str()).into(),
            }),
            _ => None,
        };
        Ok(ExceptHandler {
            leading_lines: self.leading_lines(child(clause, 0)?.first_token()),
            whitespace_after_except: exception.map(ws_before).unwrap_or_default(),
            exception: exception.map(|e| self.expression(e)).transpose()?,
            name,
            whitespace_before_colon: ws_before(child(children, index + 1)?),
            body: self.suite(child(children, index + 2)?)?,
        })
    }

    fn with_statement(
        &mut self,
        node: &RawNode,
        leading_lines: Vec<EmptyLine>,
        asynchronous: Option<Asynchronous>,
    ) -> Result<With> {
        let children = &node.children;
        let colon = find(children, ":")?;
        let mut items = Vec::new();
        for (item, comma) in self.comma_separated(&children[1..colon]) {
            let with_item = if self.is_rule(item, "with_item") {
                let parts = &as_node(item)?.children;
                let target = child(parts, 2)?;
                WithItem {
                    item: self.expression(child(parts, 0)?)?,
                    asname: Some(AsName {
                        whitespace_before_as: ws_before(child(parts, 1)?),
                        whitespace_after_as: ws_before(target),
                        name: self.expression(target)?,
                    }),
                    comma,
                }
            } else {
                WithItem {
                    item: self.expression(item)?,
                    asname: None,
                    comma,
                }
            };
            items.push(with_item);
        }
        Ok(With {
            leading_lines,
            asynchronous,
            whitespace_after_with: ws_before(child(children, 1)?),
            items,
            whitespace_before_colon: ws_before(&children[colon]),
            body: self.suite(child(children, colon + 1)?)?,
        })
    }

    fn decorated(&mut self, node: &RawNode, leading_lines: Vec<EmptyLine>) -> Result<Statement> {
        let list = as_node(child(&node.children, 0)?)?;
        let decorator_nodes: Vec<&RawNode> = if self.rule_name(list) == "decorators" {
            list.children.iter().map(as_node).collect::<Result<_>>()?
        } else {
            vec![list]
        };
        let mut decorators = Vec::with_capacity(decorator_nodes.len());
        for (i, decorator) in decorator_nodes.into_iter().enumerate() {
            let lines = if i == 0 {
                Vec::new()
            } else {
                self.leading_lines(decorator.first_token())
            };
            decorators.push(self.decorator(decorator, lines)?);
        }

        let definition = as_node(child(&node.children, 1)?)?;
        let lines_after_decorators = self.leading_lines(definition.first_token());
        let (definition, asynchronous) = if self.rule_name(definition) == "async_funcdef" {
            let inner = as_node(child(&definition.children, 1)?)?;
            let asynchronous = Asynchronous {
                whitespace_after: Whitespace::new(inner.first_token().prefix.as_str()),
            };
            (inner, Some(asynchronous))
        } else {
            (definition, None)
        };
        let head = Head {
            leading_lines,
            decorators,
            lines_after_decorators,
            asynchronous,
        };
        Ok(match self.rule_name(definition) {
            "classdef" => self.class_def(definition, head)?.into(),
            _ => self.function_def(definition, head)?.into(),
        })
    }

    /// `'@' dotted_name ['(' [arglist] ')'] NEWLINE`
    fn decorator(&mut self, node: &RawNode, leading_lines: Vec<EmptyLine>) -> Result<Decorator> {
        let children = &node.children;
        let (newline, children) = children.split_last().ok_or_else(super::malformed)?;
        let name = child(children, 1)?;
        let mut decorator = self.dotted_name(name)?;
        if let Some(open) = children.get(2) {
            let close = children.last().ok_or_else(super::malformed)?;
            let args = children.get(3).filter(|c| !c.is(")"));
            decorator = Call {
                lpar: Vec::new(),
                func: decorator,
                whitespace_after_func: ws_before(open),
                whitespace_before_args: args.map(ws_before).unwrap_or_default(),
                args: self.arguments(args)?,
                whitespace_before_close: ws_before(close),
                rpar: Vec::new(),
            }
            .into();
        }
        Ok(Decorator {
            leading_lines,
            whitespace_after_at: ws_before(name),
            decorator,
            trailing_whitespace: self.trailing(newline.as_token().ok_or_else(super::malformed)?),
        })
    }

    /// `'def' NAME parameters ['->' test] ':' suite`
    fn function_def(&mut self, node: &RawNode, head: Head) -> Result<FunctionDef> {
        let children = &node.children;
        let name = token(children, 1)?;
        let parameters = &as_node(child(children, 2)?)?.children;
        let open = child(parameters, 0)?;
        let close = parameters.last().ok_or_else(super::malformed)?;
        let params = parameters.get(1).filter(|c| !c.is(")"));
        let colon = find(children, ":")?;
        let returns = match children.get(3) {
            Some(arrow) if arrow.is("->") => {
                let annotation = child(children, 4)?;
                Some(Annotation {
                    whitespace_before_indicator: ws_before(arrow),
                    indicator: AnnotationIndicator::Arrow,
                    whitespace_after_indicator: ws_before(annotation),
                    annotation: self.expression(annotation)?,
                })
            }
            _ => None,
        };
        Ok(FunctionDef {
            leading_lines: head.leading_lines,
            decorators: head.decorators,
            lines_after_decorators: head.lines_after_decorators,
            asynchronous: head.asynchronous,
            whitespace_after_def: Whitespace::new(name.prefix.as_str()),
            name: Name::new(name.string.as_str()),
            whitespace_after_name: ws_before(open),
            whitespace_before_params: params.map(ws_before).unwrap_or_default(),
            params: self.parameters(params)?,
            whitespace_before_close: ws_before(close),
            returns,
            whitespace_before_colon: ws_before(&children[colon]),
            body: self.suite(child(children, colon + 1)?)?,
        })
    }

    /// `'class' NAME ['(' [arglist] ')'] ':' suite`
    fn class_def(&mut self, node: &RawNode, head: Head) -> Result<ClassDef> {
        let children = &node.children;
        let name = token(children, 1)?;
        let colon = find(children, ":")?;
        let (whitespace_before_args, lpar, args, rpar) = match children.get(2) {
            Some(open) if open.is("(") => {
                let close = child(children, colon - 1)?;
                let args = children.get(3).filter(|c| !c.is(")"));
                (
                    ws_before(open),
                    Some(LeftParen {
                        whitespace_after: args.map(ws_before).unwrap_or_default(),
                    }),
                    self.arguments(args)?,
                    Some(RightParen {
                        whitespace_before: ws_before(close),
                    }),
                )
            }
            _ => (Whitespace::empty(), None, Vec::new(), None),
        };
        Ok(ClassDef {
            leading_lines: head.leading_lines,
            decorators: head.decorators,
            lines_after_decorators: head.lines_after_decorators,
            whitespace_after_class: Whitespace::new(name.prefix.as_str()),
            name: Name::new(name.string.as_str()),
            whitespace_before_args,
            lpar,
            args,
            rpar,
            whitespace_before_colon: ws_before(&children[colon]),
            body: self.suite(child(children, colon + 1)?)?,
        })
    }
}
