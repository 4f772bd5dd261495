//! Located syntax errors and their rendering.

use insta::assert_snapshot;
use pycst_core::{
    CstError, ErrorKind, ParserSyntaxError, PartialParserConfig, SyntaxErrorKind, parse_module,
};

fn syntax_error(source: &str) -> ParserSyntaxError {
    match parse_module(source, None) {
        Ok(module) => panic!("expected an error, parsed {:?}", module.code().unwrap_or_default()),
        Err(CstError::Syntax(err)) => err,
        Err(other) => panic!("expected a syntax error, got {other}"),
    }
}

#[test]
fn inconsistent_dedent() {
    let err = syntax_error("if x:\n        a = 1\n    b = 2\n");
    assert_eq!(err.kind, SyntaxErrorKind::Dedent);
    assert_eq!((err.line, err.raw_column), (3, 0));
    assert_snapshot!(err.to_string(), @r"
    Syntax Error @ 3:1.
    Inconsistent indentation. Expected a dedent.

        b = 2
    ^
    ");
}

#[test]
fn missing_handler_at_end_of_input() {
    let err = syntax_error("try: pass");
    assert_eq!(err.kind, SyntaxErrorKind::IncompleteInput);
    assert_snapshot!(err.to_string(), @r"
    Syntax Error @ 1:10.
    Incomplete input. Encountered end of file (EOF), but expected 'except' or 'finally'.

    try: pass
             ^
    ");
}

#[test]
fn default_before_plain_parameter() {
    let err = syntax_error("def fn(first=None, second): ...\n");
    assert_eq!(err.kind, SyntaxErrorKind::Conversion);
    assert_snapshot!(err.to_string(), @r"
    Syntax Error @ 1:20.
    Cannot have a non-default argument following a default argument.

    def fn(first=None, second): ...
                       ^
    ");
}

#[test]
fn unexpected_token_lists_what_would_fit() {
    let err = syntax_error("x = = 1\n");
    assert_eq!(err.kind, SyntaxErrorKind::Parse);
    assert!(err.message.starts_with("Syntax error. Encountered '=', but expected "));
    assert!(err.expected.iter().any(|e| e == "NAME"));
    assert!(err.message.ends_with('.'));
}

#[test]
fn lexical_errors() {
    let cases = [
        ("x = 'abc\n", "Unterminated string literal."),
        ("x = (1,\n", "'(' was never closed."),
        ("x = 1)\n", "Unmatched ')'."),
        ("x = [1)\n", "Closing bracket ')' does not match opening bracket '['."),
        ("x = $\n", "Invalid character '$' in source."),
        ("x = 1 \\\n", "Unexpected end of file after a line continuation."),
    ];
    for (source, message) in cases {
        let err = syntax_error(source);
        assert_eq!(err.kind, SyntaxErrorKind::Lex, "{source:?}");
        assert_eq!(err.message, message, "{source:?}");
    }
}

#[test]
fn tab_columns_follow_editor_convention() {
    let err = syntax_error("if x:\n\ty = = 1\n");
    assert_eq!(err.raw_column, 5);
    assert_eq!(err.editor_column(), 13);
}

#[test]
fn newer_syntax_names_the_required_version() {
    let config = PartialParserConfig::new().with_python_version("3.7");
    let err = parse_module("print(f'{(y := 1)}')\nif (x := 1): pass\n", Some(&config)).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Version);
    let err = err.as_syntax().unwrap();
    assert!(err.message.ends_with(
        "This syntax requires Python 3.8 or later, but the parser targets Python 3.7."
    ));
    assert_eq!(err.line, 2);
}

#[test]
fn unsupported_version_is_a_config_error() {
    let config = PartialParserConfig::new().with_python_version("3.9");
    let err = parse_module("x\n", Some(&config)).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Config);
}

#[test]
fn errors_survive_serialization() {
    let err = syntax_error("class C(:\n    pass\n");
    let json = serde_json::to_string(&err).unwrap();
    let back: ParserSyntaxError = serde_json::from_str(&json).unwrap();
    assert_eq!(back.to_string(), err.to_string());
}
