use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use pycst_core::{MetadataWrapper, PositionProvider, parse_module};
use std::hint::black_box;

const SMALL_MODULE: &str = r#"import os


def main(argv=None):
    """Entry point."""
    path = os.path.join(*argv)  # joined
    return [line.strip() for line in open(path) if line]
"#;

const CLASS_MODULE: &str = r#"from dataclasses import dataclass


@dataclass
class Point:
    x: float = 0.0
    y: float = 0.0

    def scaled(self, factor):
        return Point(self.x * factor, self.y * factor)

    async def fetch(self, client):
        async with client.session() as session:
            try:
                return await session.get(f"/points/{self.x}")
            except (IOError, ValueError) as err:
                raise RuntimeError("fetch failed") from err
"#;

fn generated_module(functions: usize) -> String {
    let mut source = String::from("import sys\n\n");
    for i in 0..functions {
        source.push_str(&format!(
            "\n\ndef handler_{i}(event, *args, retries={i}, **kwargs):\n    if event.kind == {i}:\n        return {{'id': {i}, 'args': args}}\n    elif retries:\n        return handler_{i}(event, retries=retries - 1)\n    print(event, file=sys.stderr)\n"
        ));
    }
    source
}

/// Parsing and rendering of hand-written modules
fn bench_parser(c: &mut Criterion) {
    let mut group = c.benchmark_group("parser");

    group.bench_function("small_module", |b| {
        b.iter(|| black_box(parse_module(black_box(SMALL_MODULE), None)))
    });

    group.bench_function("class_module", |b| {
        b.iter(|| black_box(parse_module(black_box(CLASS_MODULE), None)))
    });

    let module = parse_module(CLASS_MODULE, None).unwrap();
    group.bench_function("codegen", |b| b.iter(|| black_box(module.code().unwrap())));

    group.finish();
}

/// Parsing large generated files
fn bench_large_files(c: &mut Criterion) {
    let mut group = c.benchmark_group("large_files");

    for &size in &[10, 100, 500] {
        let source = generated_module(size);
        let bytes = source.len();

        group.bench_with_input(
            BenchmarkId::from_parameter(format!("{size}_functions_{}KB", bytes / 1024)),
            &source,
            |b, source| b.iter(|| black_box(parse_module(source, None))),
        );
    }

    group.finish();
}

/// Position metadata over a generated file
fn bench_metadata(c: &mut Criterion) {
    let module = parse_module(&generated_module(100), None).unwrap();

    c.bench_function("positions_100_functions", |b| {
        b.iter(|| {
            let wrapper = MetadataWrapper::new(&module).unwrap();
            black_box(wrapper.resolve::<PositionProvider>().unwrap().len())
        })
    });
}

criterion_group!(benches, bench_parser, bench_large_files, bench_metadata);
criterion_main!(benches);
