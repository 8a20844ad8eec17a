use std::fs::File;
use std::io::Write;

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use tempfile::TempDir;

use tessera::sign;

const SMALL_BODY: usize = 1024;
const LARGE_BODY: usize = 1024 * 1024;

/// Deterministic payload bytes of the given size.
fn payload(size: usize) -> Vec<u8> {
    (0..size).map(|i| (i % 251) as u8).collect()
}

/// Write a synthetic archive to disk and return an open handle.
fn create_archive(dir: &std::path::Path, size: usize) -> File {
    let path = dir.join("archive.bin");
    let mut file = File::create(&path).unwrap();
    file.write_all(&payload(size)).unwrap();
    File::open(path).unwrap()
}

fn bench_sign_get_request(c: &mut Criterion) {
    let date = "Sat, 08 Jun 2013 22:12:05 GMT";
    let uri = "/geo/1/layers?name__exact=waterways&slice_start=0&slice_end=1000";

    c.bench_function("sign_get_request", |b| {
        b.iter(|| {
            let canonical =
                sign::canonical_string(black_box("GET"), "", "", black_box(date), black_box(uri));
            black_box(sign::signature(&canonical, black_box("test_private_key")));
        });
    });
}

fn bench_checksum_small_body(c: &mut Criterion) {
    let body = payload(SMALL_BODY);

    c.bench_function("checksum_1k_body", |b| {
        b.iter(|| {
            black_box(sign::body_checksum(black_box(&body)));
        });
    });
}

fn bench_checksum_large_body(c: &mut Criterion) {
    let body = payload(LARGE_BODY);

    c.bench_function("checksum_1m_body", |b| {
        b.iter(|| {
            black_box(sign::body_checksum(black_box(&body)));
        });
    });
}

fn bench_checksum_stream(c: &mut Criterion) {
    let tmp = TempDir::new().unwrap();
    let mut file = create_archive(tmp.path(), LARGE_BODY);

    // stream_checksum rewinds the handle, so every iteration hashes the
    // whole file again.
    c.bench_function("checksum_1m_stream", |b| {
        b.iter(|| {
            black_box(sign::stream_checksum(black_box(&mut file)).unwrap());
        });
    });
}

criterion_group!(
    benches,
    bench_sign_get_request,
    bench_checksum_small_body,
    bench_checksum_large_body,
    bench_checksum_stream,
);
criterion_main!(benches);
