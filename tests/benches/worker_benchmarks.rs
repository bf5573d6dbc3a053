//! # DOP Worker Benchmarks
//!
//! | Area | Measured |
//! |------|----------|
//! | Integrity | CRC-16 and SHA-256 over event-sized text |
//! | Envelope | `seal_event` per cipher |
//! | Dispatcher | `dop_client_ready` end to end, fan-out width |

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use dop_tests::integration::fixtures::{message, TestWorker, TOKEN};
use rand::RngCore;
use serde_json::{json, Map};
use shared_crypto::{crc16, encode_base64, seal_event, sha256, KeyState, MleProviders};
use shared_types::{Event, EventHeader};
use std::time::Duration;

// ============================================================================
// Integrity
// ============================================================================

fn bench_integrity(c: &mut Criterion) {
    let mut group = c.benchmark_group("integrity");
    for size in [64usize, 1024, 16 * 1024] {
        let mut data = vec![0u8; size];
        rand::thread_rng().fill_bytes(&mut data);
        group.throughput(Throughput::Bytes(size as u64));
        group.bench_with_input(BenchmarkId::new("crc16", size), &data, |b, d| {
            b.iter(|| black_box(crc16(d)))
        });
        group.bench_with_input(BenchmarkId::new("sha256", size), &data, |b, d| {
            b.iter(|| black_box(sha256(d)))
        });
    }
    group.finish();
}

// ============================================================================
// Envelope
// ============================================================================

fn notification() -> Event {
    let mut params = Map::new();
    params.insert("err".into(), json!(0));
    params.insert("msg".into(), json!("x".repeat(512)));
    Event::new(EventHeader::new("aa01", "1", "notify"), params)
}

fn bench_seal(c: &mut Criterion) {
    let mut group = c.benchmark_group("seal_event");
    let providers = MleProviders::with_ciphers(
        ["none", "aes", "xchacha20"]
            .iter()
            .filter_map(|n| shared_crypto::builtin_provider(n))
            .collect(),
    );
    let event = notification();
    for (cipher, mode, keylength) in [("none", "none", -1i64), ("aes", "gcm", 256), ("xchacha20", "poly1305", 256)] {
        let key = KeyState {
            cipher_name: cipher.into(),
            cipher_mode: mode.into(),
            cipher_keylength: keylength,
            key: if keylength > 0 { encode_base64(&[5u8; 32]) } else { "none".into() },
            integrity_fun: "crc16".into(),
            encoding: "base64".into(),
        };
        group.bench_function(cipher, |b| {
            b.iter(|| black_box(seal_event(&event, &key, &providers).ok()))
        });
    }
    group.finish();
}

// ============================================================================
// Dispatcher
// ============================================================================

fn bench_dispatch(c: &mut Criterion) {
    let mut group = c.benchmark_group("dispatcher");
    group.measurement_time(Duration::from_secs(5));

    for sessions in [1usize, 8, 32] {
        let mut worker = TestWorker::standard();
        for i in 0..sessions {
            worker.open_session(&format!("{i:04x}"));
        }
        let raw = message("0000", "dop_client_ready", json!({"auth_token": TOKEN}));
        group.throughput(Throughput::Elements(sessions as u64));
        group.bench_with_input(BenchmarkId::new("client_ready_fanout", sessions), &raw, |b, raw| {
            b.iter(|| {
                let report = worker.send(raw);
                worker.output.take();
                black_box(report)
            })
        });
    }

    let mut worker = TestWorker::standard();
    let rejected = message("aa01", "dop_client_ready", json!({}));
    group.bench_function("validation_reject", |b| {
        b.iter(|| {
            let report = worker.send(&rejected);
            worker.output.take();
            black_box(report)
        })
    });
    group.finish();
}

criterion_group!(benches, bench_integrity, bench_seal, bench_dispatch);
criterion_main!(benches);
