//! Pipeline benchmarks using criterion.
//!
//! Run with: cargo bench --bench pipeline_bench

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use idlc::{symtab, Generator, Lexer, MappingTable, Parser, TypeUniverse};

/// One module of a mid-sized service description.
const MODULE_TEMPLATE: &str = r#"
module Svc{n} {
    typedef sequence<string> Names;

    enum State { IDLE, RUNNING, STOPPED, FAILED };

    struct Entry {
        long id;
        string name;
        State state;
        Names tags;
        unsigned long long stamp;
    };

    exception NotFound { long id; string reason; };

    interface Registry;

    valuetype Note {
        public string text;
        private long priority;
    };

    interface Registry {
        readonly attribute long count;
        attribute string label;
        Entry lookup(in long id);
        void store(in Entry entry, out long id);
        void rename(inout string name);
        Names list();
        Note annotate(in Entry entry, in Note note);
    };

    abstract valuetype Tagged { Names tags(); };

    valuetype Record : Tagged supports Registry {
        public Entry entry;
        private Note note;
        factory create(in long id);
    };
};
"#;

/// `modules` copies of [`MODULE_TEMPLATE`].
fn source(modules: usize) -> String {
    (0..modules)
        .map(|n| MODULE_TEMPLATE.replace("{n}", &n.to_string()))
        .collect()
}

fn generate(source: &str) -> usize {
    let mut parser = Parser::new(source);
    let Ok(spec) = parser.parse_specification() else {
        return 0;
    };
    let Ok(table) = symtab::collect(&spec) else {
        return 0;
    };
    let mut generator = Generator::new(TypeUniverse::new("Bench"), MappingTable::new());
    match generator.generate(&spec, table) {
        Ok(()) => generator.universe().output().types.len(),
        Err(_) => 0,
    }
}

fn bench_pipeline(c: &mut Criterion) {
    let mut group = c.benchmark_group("pipeline");

    for modules in [1, 10, 50] {
        let text = source(modules);
        group.throughput(Throughput::Bytes(text.len() as u64));

        group.bench_with_input(BenchmarkId::new("lex", modules), &text, |b, text| {
            b.iter(|| Lexer::new(black_box(text)).count());
        });

        group.bench_with_input(BenchmarkId::new("parse", modules), &text, |b, text| {
            b.iter(|| Parser::new(black_box(text)).parse_specification().is_ok());
        });

        group.bench_with_input(BenchmarkId::new("generate", modules), &text, |b, text| {
            b.iter(|| generate(black_box(text)));
        });
    }

    group.finish();
}

criterion_group!(benches, bench_pipeline);
criterion_main!(benches);
