use bisearch_core::tokenizer::tokenize;
use criterion::{criterion_group, criterion_main, Criterion};

fn bench_tokenize(c: &mut Criterion) {
    let en = "The quick brown fox jumps over the lazy dog, again and again. ".repeat(200);
    let ru = "Быстрая коричневая лиса перепрыгивает через ленивую собаку. ".repeat(200);
    let mixed = format!("{en}\n{ru}");

    c.bench_function("tokenize_english", |b| b.iter(|| tokenize(&en)));
    c.bench_function("tokenize_russian", |b| b.iter(|| tokenize(&ru)));
    c.bench_function("tokenize_mixed", |b| b.iter(|| tokenize(&mixed)));
}

criterion_group!(benches, bench_tokenize);
criterion_main!(benches);
