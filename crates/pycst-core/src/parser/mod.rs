//! Parse entry points
//!
//! Every entry point runs the same pipeline: resolve the configuration,
//! tokenize, drive the engine from the entry's start rule and convert the raw
//! tree into CST nodes. Conversion errors come out of the builder without a
//! location and are wrapped here with the position the builder recorded.
//!
//! When a parse fails, the newer supported grammars are tried as well. If one
//! of them accepts the source, the failure is reported as a version error so
//! the caller learns which setting to change.

mod engine;
pub(crate) mod node;

use crate::builder::Builder;
use crate::config::{
    DEFAULT_INDENT, ParserConfig, PartialParserConfig, PythonVersion, SUPPORTED_VERSIONS,
};
use crate::encoding::{decode, source_encoding};
use crate::error::{ParserSyntaxError, SyntaxErrorKind};
use crate::grammar::{EXPRESSION_INPUT, FILE_INPUT, Grammar, STMT_INPUT};
use crate::nodes::{Expression, Module, Statement};
use crate::tokenizer::{Position, TokenKind, TokenizeMode, tokenize};
use crate::{CstError, Result};
use engine::Engine;
use node::RawNode;
use tracing::debug;

/// Parse a whole file.
pub fn parse_module(source: &str, config: Option<&PartialParserConfig>) -> Result<Module> {
    let config = config.cloned().unwrap_or_default().resolve(source, None)?;
    module_with(source, &config)
}

/// Parse a whole file given as raw bytes.
///
/// Without an explicit encoding, a byte order mark or a coding cookie on the
/// first two lines decides how the bytes are decoded.
pub fn parse_module_bytes(bytes: &[u8], config: Option<&PartialParserConfig>) -> Result<Module> {
    let mut partial = config.cloned().unwrap_or_default();
    let encoding = source_encoding(bytes, partial.encoding.as_deref())?;
    let source = decode(bytes, &encoding)?;
    partial.encoding = Some(encoding);
    let config = partial.resolve(&source, None)?;
    module_with(&source, &config)
}

/// Parse a single simple or compound statement.
pub fn parse_statement(source: &str, config: Option<&PartialParserConfig>) -> Result<Statement> {
    let config = config.cloned().unwrap_or_default().resolve(source, None)?;
    run(source, &config, Entry::Statement, |builder, root| {
        builder.statement_input(root)
    })
}

/// Parse a single expression. Line breaks anywhere in it are whitespace.
pub fn parse_expression(source: &str, config: Option<&PartialParserConfig>) -> Result<Expression> {
    let config = config.cloned().unwrap_or_default().resolve(source, None)?;
    run(source, &config, Entry::Expression, |builder, root| {
        builder.expression_input(root)
    })
}

fn module_with(source: &str, config: &ParserConfig) -> Result<Module> {
    let has_trailing_newline = source.ends_with(['\n', '\r']);
    run(source, config, Entry::Module, |builder, root| {
        builder.module(root, config.encoding.clone(), has_trailing_newline)
    })
}

#[derive(Debug, Clone, Copy)]
enum Entry {
    Module,
    Statement,
    Expression,
}

impl Entry {
    fn start_rule(self) -> &'static str {
        match self {
            Entry::Module => FILE_INPUT,
            Entry::Statement => STMT_INPUT,
            Entry::Expression => EXPRESSION_INPUT,
        }
    }

    fn mode(self) -> TokenizeMode {
        match self {
            Entry::Expression => TokenizeMode::Expression,
            Entry::Module | Entry::Statement => TokenizeMode::File,
        }
    }
}

fn run<T>(
    source: &str,
    config: &ParserConfig,
    entry: Entry,
    build: impl Fn(&mut Builder<'_>, &RawNode) -> Result<T>,
) -> Result<T> {
    let err = match parse_as(source, config, config.version, entry, &build) {
        Err(CstError::Syntax(err)) => err,
        other => return other,
    };
    let newer = SUPPORTED_VERSIONS
        .into_iter()
        .filter(|version| *version > config.version)
        .find(|version| parse_as(source, config, *version, entry, &build).is_ok());
    match newer {
        Some(newer) => Err(version_error(err, config.version, newer).into()),
        None => Err(err.into()),
    }
}

fn parse_as<T>(
    source: &str,
    config: &ParserConfig,
    version: PythonVersion,
    entry: Entry,
    build: &impl Fn(&mut Builder<'_>, &RawNode) -> Result<T>,
) -> Result<T> {
    let grammar = Grammar::for_version(version)?;
    let tokens = tokenize(source, version, entry.mode())?;
    let start = grammar.rule_id(entry.start_rule()).ok_or_else(|| {
        CstError::grammar(format!("missing start rule '{}'", entry.start_rule()), 0, 0)
    })?;
    debug!(
        entry = entry.start_rule(),
        %version,
        tokens = tokens.len(),
        "parsing"
    );
    let default_indent = config
        .default_indent
        .clone()
        .or_else(|| {
            tokens
                .iter()
                .find(|token| token.kind == TokenKind::Indent)
                .and_then(|token| token.relative_indent.clone())
        })
        .unwrap_or_else(|| DEFAULT_INDENT.to_string());
    let root = Engine::new(&grammar, source, start).parse(tokens)?;
    let mut builder = Builder::new(&grammar, &config.default_newline, &default_indent);
    build(&mut builder, &root).map_err(|err| match err {
        CstError::PartialSyntax { message } => {
            let at = builder.error_at.unwrap_or(Position::new(1, 0));
            ParserSyntaxError::at(SyntaxErrorKind::Conversion, message, source, at.line, at.column)
                .into()
        }
        other => other,
    })
}

fn version_error(
    err: ParserSyntaxError,
    requested: PythonVersion,
    accepted_by: PythonVersion,
) -> ParserSyntaxError {
    let message = format!(
        "{} This syntax requires Python {accepted_by} or later, but the parser targets Python {requested}.",
        err.message
    );
    ParserSyntaxError {
        kind: SyntaxErrorKind::Version,
        message,
        expected: Vec::new(),
        ..err
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;

    fn with_version(version: &str) -> PartialParserConfig {
        PartialParserConfig::new().with_python_version(version)
    }

    #[test]
    fn module_without_trailing_newline_round_trips() {
        let module = parse_module("x = 1", None).unwrap();
        assert!(!module.has_trailing_newline);
        assert_eq!(module.code().unwrap(), "x = 1");
    }

    #[test]
    fn default_indent_comes_from_first_block() {
        let module = parse_module("if x:\n\tpass\n", None).unwrap();
        assert_eq!(module.default_indent, "\t");
        let module = parse_module("x = 1\n", None).unwrap();
        assert_eq!(module.default_indent, DEFAULT_INDENT);
    }

    #[test]
    fn configured_indent_wins() {
        let config = PartialParserConfig::new().with_default_indent("  ");
        let module = parse_module("if x:\n    pass\n", Some(&config)).unwrap();
        assert_eq!(module.default_indent, "  ");
        assert_eq!(module.code().unwrap(), "if x:\n    pass\n");
    }

    #[test]
    fn newline_is_detected() {
        let module = parse_module("x\r\ny\r\n", None).unwrap();
        assert_eq!(module.default_newline, "\r\n");
        assert_eq!(module.code().unwrap(), "x\r\ny\r\n");
    }

    #[test]
    fn bytes_honor_coding_cookie() {
        let source = b"# -*- coding: latin-1 -*-\nx = '\xe9'\n";
        let module = parse_module_bytes(source, None).unwrap();
        assert_eq!(module.encoding, "latin-1");
        assert_eq!(module.bytes().unwrap(), source.to_vec());
    }

    #[test]
    fn statement_and_expression_entries() {
        let statement = parse_statement("x = 1\n", None).unwrap();
        assert!(matches!(statement, Statement::SimpleStatementLine(_)));
        let expression = parse_expression("a +\n b", None).unwrap();
        assert!(matches!(expression, Expression::BinaryOperation(_)));
    }

    #[test]
    fn statement_entry_rejects_a_second_statement() {
        let err = parse_statement("x\ny\n", None).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Parse);
    }

    #[test]
    fn newer_syntax_is_a_version_error() {
        let err = parse_module("(y := 1)\n", Some(&with_version("3.7"))).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Version);
        assert!(err.to_string().contains("requires Python 3.8 or later"));

        let err = parse_module("async def f(): pass\n", Some(&with_version("3.6"))).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Version);
    }

    #[test]
    fn invalid_everywhere_stays_a_parse_error() {
        let err = parse_module("x = = 1\n", Some(&with_version("3.6"))).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Parse);
    }

    #[test]
    fn conversion_errors_are_located() {
        let err = parse_module("f(a=1, b)\n", None).unwrap_err();
        let err = err.as_syntax().unwrap();
        assert_eq!(err.kind, SyntaxErrorKind::Conversion);
        assert_eq!(err.message, "Positional argument follows keyword argument.");
        assert_eq!((err.line, err.raw_column), (1, 7));
    }
}
