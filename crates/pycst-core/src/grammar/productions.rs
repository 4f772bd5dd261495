//! Version-gated production table
//!
//! The grammar for a language version is assembled from the productions whose
//! gate admits that version. Several productions with the same rule name are
//! joined as alternatives, in table order.

use crate::config::PythonVersion;

/// Which language versions a production applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VersionGate {
    Any,
    AtLeast(PythonVersion),
    Below(PythonVersion),
}

impl VersionGate {
    pub fn admits(self, version: PythonVersion) -> bool {
        match self {
            VersionGate::Any => true,
            VersionGate::AtLeast(min) => version >= min,
            VersionGate::Below(max) => version < max,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Production {
    pub rule: &'static str,
    pub rhs: &'static str,
    pub gate: VersionGate,
}

const PY37: PythonVersion = PythonVersion::new(3, 7);
const PY38: PythonVersion = PythonVersion::new(3, 8);

const fn any(rule: &'static str, rhs: &'static str) -> Production {
    Production {
        rule,
        rhs,
        gate: VersionGate::Any,
    }
}

const fn since(version: PythonVersion, rule: &'static str, rhs: &'static str) -> Production {
    Production {
        rule,
        rhs,
        gate: VersionGate::AtLeast(version),
    }
}

const fn before(version: PythonVersion, rule: &'static str, rhs: &'static str) -> Production {
    Production {
        rule,
        rhs,
        gate: VersionGate::Below(version),
    }
}

/// Rule names the parser can start from.
pub const FILE_INPUT: &str = "file_input";
pub const STMT_INPUT: &str = "stmt_input";
pub const EXPRESSION_INPUT: &str = "expression_input";

pub const PRODUCTIONS: &[Production] = &[
    // Entry points
    any(FILE_INPUT, "stmt* ENDMARKER"),
    any(STMT_INPUT, "stmt ENDMARKER"),
    any(EXPRESSION_INPUT, "testlist_star_expr ENDMARKER"),
    // Statements
    any("stmt", "simple_stmt | compound_stmt"),
    any("simple_stmt", "small_stmt (';' small_stmt)* [';'] NEWLINE"),
    any(
        "small_stmt",
        "expr_stmt | del_stmt | pass_stmt | flow_stmt | import_stmt | global_stmt \
         | nonlocal_stmt | assert_stmt",
    ),
    any(
        "expr_stmt",
        "testlist_star_expr (annassign | augassign (yield_expr | testlist) \
         | ('=' (yield_expr | testlist_star_expr))*)",
    ),
    before(PY38, "annassign", "':' test ['=' test]"),
    since(PY38, "annassign", "':' test ['=' (yield_expr | testlist_star_expr)]"),
    any(
        "augassign",
        "'+=' | '-=' | '*=' | '@=' | '/=' | '%=' | '&=' | '|=' | '^=' | '<<=' | '>>=' \
         | '**=' | '//='",
    ),
    any("del_stmt", "'del' exprlist"),
    any("pass_stmt", "'pass'"),
    any(
        "flow_stmt",
        "break_stmt | continue_stmt | return_stmt | raise_stmt | yield_stmt",
    ),
    any("break_stmt", "'break'"),
    any("continue_stmt", "'continue'"),
    before(PY38, "return_stmt", "'return' [testlist]"),
    since(PY38, "return_stmt", "'return' [testlist_star_expr]"),
    any("yield_stmt", "yield_expr"),
    any("raise_stmt", "'raise' [test ['from' test]]"),
    any("import_stmt", "import_name | import_from"),
    any("import_name", "'import' dotted_as_names"),
    any(
        "import_from",
        "'from' import_relative 'import' ('*' | '(' import_as_names ')' | import_as_names)",
    ),
    any(
        "import_relative",
        "('.' | '...')* dotted_name | ('.' | '...')+",
    ),
    any("import_as_name", "NAME ['as' NAME]"),
    any("dotted_as_name", "dotted_name ['as' NAME]"),
    any("import_as_names", "import_as_name (',' import_as_name)* [',']"),
    any("dotted_as_names", "dotted_as_name (',' dotted_as_name)*"),
    any("dotted_name", "NAME ('.' NAME)*"),
    any("global_stmt", "'global' NAME (',' NAME)*"),
    any("nonlocal_stmt", "'nonlocal' NAME (',' NAME)*"),
    any("assert_stmt", "'assert' test [',' test]"),
    before(
        PY37,
        "compound_stmt",
        "if_stmt | while_stmt | for_stmt | try_stmt | with_stmt | funcdef | classdef | decorated",
    ),
    since(
        PY37,
        "compound_stmt",
        "if_stmt | while_stmt | for_stmt | try_stmt | with_stmt | funcdef | classdef | decorated \
         | async_stmt",
    ),
    since(PY37, "async_stmt", "'async' (funcdef | with_stmt | for_stmt)"),
    any(
        "if_stmt",
        "'if' namedexpr_test ':' suite ('elif' namedexpr_test ':' suite)* ['else' ':' suite]",
    ),
    any(
        "while_stmt",
        "'while' namedexpr_test ':' suite ['else' ':' suite]",
    ),
    any(
        "for_stmt",
        "'for' exprlist 'in' testlist ':' suite ['else' ':' suite]",
    ),
    any(
        "try_stmt",
        "'try' ':' suite ((except_clause ':' suite)+ ['else' ':' suite] ['finally' ':' suite] \
         | 'finally' ':' suite)",
    ),
    any("except_clause", "'except' [test ['as' NAME]]"),
    any("with_stmt", "'with' with_item (',' with_item)* ':' suite"),
    any("with_item", "test ['as' expr]"),
    any("suite", "simple_stmt | NEWLINE INDENT stmt+ DEDENT"),
    any("decorator", "'@' dotted_name ['(' [arglist] ')'] NEWLINE"),
    any("decorators", "decorator+"),
    before(PY37, "decorated", "decorators (classdef | funcdef)"),
    since(PY37, "decorated", "decorators (classdef | funcdef | async_funcdef)"),
    since(PY37, "async_funcdef", "'async' funcdef"),
    any("funcdef", "'def' NAME parameters ['->' test] ':' suite"),
    any("parameters", "'(' [typedargslist] ')'"),
    any("typedargslist", "typedarg (',' typedarg)* [',']"),
    before(PY38, "typedarg", "tfpdef ['=' test] | '*' [tfpdef] | '**' tfpdef"),
    since(
        PY38,
        "typedarg",
        "tfpdef ['=' test] | '*' [tfpdef] | '**' tfpdef | '/'",
    ),
    any("tfpdef", "NAME [':' test]"),
    any("varargslist", "vararg (',' vararg)* [',']"),
    before(PY38, "vararg", "NAME ['=' test] | '*' [NAME] | '**' NAME"),
    since(PY38, "vararg", "NAME ['=' test] | '*' [NAME] | '**' NAME | '/'"),
    any("classdef", "'class' NAME ['(' [arglist] ')'] ':' suite"),
    // Expressions
    before(PY38, "namedexpr_test", "test"),
    since(PY38, "namedexpr_test", "test [':=' test]"),
    any("test", "or_test ['if' or_test 'else' test] | lambdef"),
    any("test_nocond", "or_test | lambdef_nocond"),
    any("lambdef", "'lambda' [varargslist] ':' test"),
    any("lambdef_nocond", "'lambda' [varargslist] ':' test_nocond"),
    any("or_test", "and_test ('or' and_test)*"),
    any("and_test", "not_test ('and' not_test)*"),
    any("not_test", "'not' not_test | comparison"),
    any("comparison", "expr (comp_op expr)*"),
    any(
        "comp_op",
        "'<' | '>' | '==' | '>=' | '<=' | '!=' | 'in' | 'not' 'in' | 'is' ['not']",
    ),
    any("star_expr", "'*' expr"),
    any("expr", "xor_expr ('|' xor_expr)*"),
    any("xor_expr", "and_expr ('^' and_expr)*"),
    any("and_expr", "shift_expr ('&' shift_expr)*"),
    any("shift_expr", "arith_expr (('<<' | '>>') arith_expr)*"),
    any("arith_expr", "term (('+' | '-') term)*"),
    any("term", "factor (('*' | '@' | '/' | '%' | '//') factor)*"),
    any("factor", "('+' | '-' | '~') factor | power"),
    any("power", "atom_expr ['**' factor]"),
    before(PY37, "atom_expr", "atom trailer*"),
    since(PY37, "atom_expr", "['await'] atom trailer*"),
    any(
        "atom",
        "'(' [yield_expr | testlist_comp] ')' | '[' [testlist_comp] ']' | '{' [dictorsetmaker] '}' \
         | NAME | NUMBER | STRING+ | '...' | 'None' | 'True' | 'False'",
    ),
    any(
        "testlist_comp",
        "(namedexpr_test | star_expr) (comp_for | (',' (namedexpr_test | star_expr))* [','])",
    ),
    any("trailer", "'(' [arglist] ')' | '[' subscriptlist ']' | '.' NAME"),
    any("subscriptlist", "subscript (',' subscript)* [',']"),
    any("subscript", "test | [test] ':' [test] [sliceop]"),
    any("sliceop", "':' [test]"),
    any("exprlist", "(expr | star_expr) (',' (expr | star_expr))* [',']"),
    any("testlist", "test (',' test)* [',']"),
    any(
        "testlist_star_expr",
        "(test | star_expr) (',' (test | star_expr))* [',']",
    ),
    any(
        "dictorsetmaker",
        "((test ':' test | '**' expr) (comp_for | (',' (test ':' test | '**' expr))* [','])) \
         | ((test | star_expr) (comp_for | (',' (test | star_expr))* [',']))",
    ),
    any("arglist", "argument (',' argument)* [',']"),
    before(
        PY38,
        "argument",
        "test [comp_for] | test '=' test | '**' test | '*' test",
    ),
    since(
        PY38,
        "argument",
        "test [comp_for] | test ':=' test | test '=' test | '**' test | '*' test",
    ),
    before(PY37, "comp_for", "sync_comp_for"),
    since(PY37, "comp_for", "['async'] sync_comp_for"),
    any(
        "sync_comp_for",
        "'for' exprlist 'in' or_test comp_if* [comp_for]",
    ),
    any("comp_if", "'if' test_nocond"),
    any("yield_expr", "'yield' [yield_arg]"),
    before(PY38, "yield_arg", "'from' test | testlist"),
    since(PY38, "yield_arg", "'from' test | testlist_star_expr"),
];

/// Grammar text for `version`, one rule per line.
pub fn grammar_text(version: PythonVersion) -> String {
    let mut rules: Vec<(&'static str, Vec<&'static str>)> = Vec::new();
    for production in PRODUCTIONS.iter().filter(|p| p.gate.admits(version)) {
        match rules.iter_mut().find(|(name, _)| *name == production.rule) {
            Some((_, alternatives)) => alternatives.push(production.rhs),
            None => rules.push((production.rule, vec![production.rhs])),
        }
    }
    let mut text = String::new();
    for (name, alternatives) in rules {
        text.push_str(name);
        text.push_str(": ");
        if alternatives.len() == 1 {
            text.push_str(alternatives[0]);
        } else {
            let joined: Vec<String> = alternatives.iter().map(|a| format!("({a})")).collect();
            text.push_str(&joined.join(" | "));
        }
        text.push('\n');
    }
    text
}
