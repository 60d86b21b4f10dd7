use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use lector::{is_probably_readerable, Readability};
use std::fs;
use std::path::Path;

fn load_test_case(name: &str) -> Option<String> {
    let path = Path::new("tests/test-pages").join(name).join("source.html");
    fs::read_to_string(&path).ok()
}

fn synthetic_article(paragraphs: usize) -> String {
    let body: String = (0..paragraphs)
        .map(|i| {
            format!(
                "<p>Paragraph number {} keeps the scoring loop busy, with commas, \
                 clauses, and enough text to register as content.</p>",
                i
            )
        })
        .collect();
    format!(
        "<html><head><title>Benchmark Article - Example Site</title></head>\
         <body><article>{}</article></body></html>",
        body
    )
}

fn bench_parse_fixtures(c: &mut Criterion) {
    let mut group = c.benchmark_group("parse");

    let test_cases = ["001", "ars-1", "medium-1", "nytimes-1", "guardian-1"];

    for name in test_cases {
        let html = match load_test_case(name) {
            Some(h) => h,
            None => continue,
        };

        group.throughput(Throughput::Bytes(html.len() as u64));
        group.bench_with_input(BenchmarkId::new("doc", name), &html, |b, html| {
            b.iter(|| {
                let readability = Readability::new(std::hint::black_box(html), None, None).unwrap();
                std::hint::black_box(readability.parse())
            });
        });
    }

    group.finish();
}

fn bench_parse_synthetic(c: &mut Criterion) {
    let mut group = c.benchmark_group("parse_synthetic");

    for paragraphs in [10usize, 100, 500] {
        let html = synthetic_article(paragraphs);
        group.throughput(Throughput::Bytes(html.len() as u64));
        group.bench_with_input(
            BenchmarkId::new("paragraphs", paragraphs),
            &html,
            |b, html| {
                b.iter(|| {
                    let readability =
                        Readability::new(std::hint::black_box(html), None, None).unwrap();
                    std::hint::black_box(readability.parse())
                });
            },
        );
    }

    group.finish();
}

fn bench_readerable_check(c: &mut Criterion) {
    let mut group = c.benchmark_group("readerable");

    for paragraphs in [10usize, 100] {
        let html = synthetic_article(paragraphs);
        group.throughput(Throughput::Bytes(html.len() as u64));
        group.bench_with_input(
            BenchmarkId::new("check", paragraphs),
            &html,
            |b, html| {
                b.iter(|| {
                    std::hint::black_box(is_probably_readerable(std::hint::black_box(html), None))
                });
            },
        );
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_parse_fixtures,
    bench_parse_synthetic,
    bench_readerable_check
);
criterion_main!(benches);
