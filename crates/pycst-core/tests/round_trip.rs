//! Parsing then rendering reproduces the input byte for byte.

use pycst_core::{
    PartialParserConfig, parse_expression, parse_module, parse_module_bytes, parse_statement,
};

fn assert_round_trip(source: &str) {
    let module = parse_module(source, None)
        .unwrap_or_else(|err| panic!("failed to parse {source:?}:\n{err}"));
    assert_eq!(module.code().unwrap(), source);
}

const CORPUS: &[&str] = &[
    "",
    "\n",
    "# only a comment",
    "x",
    "x = 1\n",
    "x=1;y =2 ;\n",
    "a, *b = c, = d\n",
    "x: 'int' = 1\n",
    "n //= 2  # halve\n",
    "del a, b[0], c.d\n",
    "assert x, 'message'\n",
    "global a, b\nnonlocal c\n",
    "raise\nraise E\nraise E from cause\n",
    "return\n",
    "import os.path as p, sys\n",
    "from . import (a,\n    b as c,\n)\n",
    "from ...pkg.mod import *\n",
    "if a:\n    pass\nelif b:\n    pass\nelse:\n    pass\n",
    "while True: break\nelse: continue\n",
    "for i, (j, k) in enumerate(x):\n\tprint(i)\n",
    "try:\n    f()\nexcept (A, B) as e:\n    raise\nexcept:\n    pass\nelse:\n    g()\nfinally:\n    h()\n",
    "with a as b, c:\n    pass\n",
    "@decorator\n@other.one(1, key=2)\ndef f(a, b: int = 1, *args, c, d=2, **kw) -> None:\n    '''doc'''\n",
    "class C(Base, metaclass=Meta):\n\n    x = 1\n\n    def m(self): return self.x\n",
    "async def f():\n    async with a as b:\n        async for x in y:\n            await z\n",
    "def g():\n    yield\n    yield x\n    yield from y\n    x = yield\n",
    "lambda: 0\nlambda x, *y, z=1, **w: x\nlambda *, k: k\n",
    "f(a)(b)[c].d\n",
    "x[1:2, ::3, :, a:b:]\n",
    "x[...]\n",
    "f(*args, **kwargs)\n",
    "f(x for x in y)\n",
    "[x for x in y if x for z in x]\n",
    "{k: v for k, v in items}\n",
    "{a for a in b}\n",
    "{**a, 'b': 1, **c}\n",
    "{1, 2, *rest}\n",
    "(x for x in y)\n",
    "()\n(1,)\n((a), (b,))\n",
    "a if b else c\n",
    "not a and b or c\n",
    "a < b <= c != d == e > f >= g in h not   in i is j is  not k\n",
    "-a + +b - ~c ** -d\n",
    "a | b ^ c & d << e >> f\n",
    "a @ b\n",
    "'a' \"b\"\n'''c'''\n",
    "b'x' rb'y' Rb'z'\n",
    "f'{x!r:>{width}}' F\"{y}\"\n",
    "0xFF + 0o17 + 0b101 + 1_000 + 1.5e-3 + 3j + .5 + 5.\n",
    "x = (  # comment\n    1 +\n    2\n)\n",
    "x = 1 + \\\n    2\n",
    "if x:\n    pass\n    # trailing in block\n# trailing at module level\n",
    "if x:\n  if y:\n        pass\n  z\n",
    "def f():\n    pass\n\n\n\ndef g():\n    pass\n",
    "x = 1\r\ny = 2\r\n",
    "x = 1\ry = 2\r",
    "if x:\r\n    y\r\n",
    "  \n\t\n\nx\n",
    "x = 1  ",
    "if x:\n    y",
    "名前 = 'unicode'\n",
    "print(1, end='')\n",
    "if x:\n    pass\n\n    # comment after blank\n",
    "class A: pass\nclass B(): pass\nclass C(A,): pass\n",
    "def f(a, /, b, *, c): pass\n",
    "if (n := len(a)) > 10: pass\n",
    "f(y := 1)\n",
    "\x0cx = 1\n",
    "if x:\n\x0c    y = 1\n  \x0cz\n",
];

#[test]
fn corpus_round_trips() {
    for source in CORPUS {
        assert_round_trip(source);
    }
}

#[test]
fn rendering_is_idempotent() {
    for source in CORPUS {
        let once = parse_module(source, None).unwrap().code().unwrap();
        let twice = parse_module(&once, None).unwrap().code().unwrap();
        assert_eq!(twice, once, "{source:?}");
    }
}

#[test]
fn every_supported_version_round_trips_common_code() -> anyhow::Result<()> {
    let source = "def f(a, b=1):\n    return [x * 2 for x in a if x]\n";
    for version in ["3.6", "3.7", "3.8"] {
        let config = PartialParserConfig::new().with_python_version(version);
        let module = parse_module(source, Some(&config))?;
        assert_eq!(module.code()?, source, "python {version}");
    }
    Ok(())
}

#[test]
fn statements_and_expressions_round_trip() {
    let statement = parse_statement("if x:\n    y = 1\n", None).unwrap();
    let module = parse_module("", None).unwrap();
    assert_eq!(
        module.code_for_node(statement.node_ref()).unwrap(),
        "if x:\n    y = 1\n"
    );

    let expression = parse_expression("a  +  (b)", None).unwrap();
    assert_eq!(
        module.code_for_node(expression.node_ref()).unwrap(),
        "a  +  (b)"
    );
}

#[test]
fn bytes_round_trip_in_their_declared_encoding() -> anyhow::Result<()> {
    let source = b"# -*- coding: latin-1 -*-\ns = '\xe9t\xe9'\n";
    let module = parse_module_bytes(source, None)?;
    assert_eq!(module.encoding, "latin-1");
    assert_eq!(module.bytes()?, source);
    Ok(())
}

#[test]
fn byte_order_mark_survives_an_explicit_utf8_request() -> anyhow::Result<()> {
    let source = b"\xef\xbb\xbfx = 1\n";
    let config = PartialParserConfig::new().with_encoding("utf-8");
    let module = parse_module_bytes(source, Some(&config))?;
    assert_eq!(module.encoding, "utf-8-sig");
    assert_eq!(module.bytes()?, source);

    let latin = PartialParserConfig::new().with_encoding("latin-1");
    assert!(parse_module_bytes(source, Some(&latin)).is_err());
    Ok(())
}
