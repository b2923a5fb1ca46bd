use criterion::{Criterion, criterion_group, criterion_main};
use pdfchat::chunking::{ChunkingConfig, split_text};
use std::hint::black_box;

fn synthetic_document(paragraphs: usize) -> String {
    let paragraph = "The savanna supports a wide range of grazing species. \
Seasonal rains drive long migrations, and predator populations follow the herds. \
Field observations from the dry season show markedly different grouping behavior.\n\n";
    paragraph.repeat(paragraphs)
}

pub fn criterion_benchmark(c: &mut Criterion) {
    let document = synthetic_document(500);
    let config = ChunkingConfig::default();

    c.bench_function("chunking", |b| {
        b.iter(|| split_text(black_box(&document), black_box(&config)))
    });
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
