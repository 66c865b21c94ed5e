use criterion::{criterion_group, criterion_main, Criterion};
use std::path::Path;

use inboxpeek::model::message::MessageEnvelope;

fn load_fixture() -> MessageEnvelope {
    let path = Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join("latest_message.json");
    let json = std::fs::read_to_string(path).unwrap();
    MessageEnvelope::from_json(&json).unwrap()
}

fn bench_extract_content(c: &mut Criterion) {
    let envelope = load_fixture();

    c.bench_function("extract_content_latest", |b| {
        b.iter(|| inboxpeek::parser::content::extract_content(envelope.payload.as_ref()))
    });
}

fn bench_extract_verify_url(c: &mut Criterion) {
    let envelope = load_fixture();

    c.bench_function("extract_verify_url_latest", |b| {
        b.iter(|| inboxpeek::verify::extract_verify_url(envelope.payload.as_ref()))
    });
}

criterion_group!(benches, bench_extract_content, bench_extract_verify_url);
criterion_main!(benches);
