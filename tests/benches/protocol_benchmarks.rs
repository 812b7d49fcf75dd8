//! # State-Channel Protocol Benchmarks
//!
//! | Area | Operation | Target |
//! |------|-----------|--------|
//! | Codec | parse_response | < 10µs |
//! | Signing | keccak + secp256k1 sign of a payload tuple | < 1ms |
//! | Verification | recover signer of a payload tuple | < 1ms |
//! | EIP-712 | auth policy signing hash | < 50µs |

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use sc_01_rpc_protocol::domain::hashing::payload_digest;
use sc_01_rpc_protocol::{
    auth_typed_data, parse_response, EcdsaKeySigner, EcdsaVerifier, QuorumPolicy,
};
use serde_json::{json, Value};
use shared_types::{Address, Allowance, AuthRequestParams};
use std::time::Duration;

fn sample_payload() -> Value {
    json!([
        1_700_000_000_123u64,
        "create_app_session",
        [{
            "definition": {
                "protocol": "nitroliterpc",
                "participants": [
                    "0x1111111111111111111111111111111111111111",
                    "0x2222222222222222222222222222222222222222"
                ],
                "weights": [100, 0],
                "quorum": 100,
                "challenge": 86400,
                "nonce": 1
            },
            "allocations": [{
                "participant": "0x1111111111111111111111111111111111111111",
                "asset": "usdc",
                "amount": "10"
            }]
        }],
        1_700_000_000_000u64
    ])
}

fn bench_codec(c: &mut Criterion) {
    let mut group = c.benchmark_group("codec");

    let ok = json!({
        "response": [42, "get_config", [{"networks": [1, 137]}], 1_700_000_000_000u64]
    })
    .to_string();
    let error =
        json!({"response": [42, "error", [{"error": "Something went wrong"}], 1]}).to_string();
    let garbage = "{not json".to_string();

    group.bench_function("parse_response_ok", |b| {
        b.iter(|| black_box(parse_response(black_box(ok.as_str()))))
    });
    group.bench_function("parse_response_error", |b| {
        b.iter(|| black_box(parse_response(black_box(error.as_str()))))
    });
    group.bench_function("parse_response_garbage", |b| {
        b.iter(|| black_box(parse_response(black_box(garbage.as_str()))))
    });
    group.finish();
}

fn bench_signing(c: &mut Criterion) {
    let mut group = c.benchmark_group("signing");
    group.measurement_time(Duration::from_secs(10));

    let signer = EcdsaKeySigner::random();
    let payload = sample_payload();
    let digest = payload_digest(&payload);
    let signature = signer.sign_digest(&digest).unwrap();
    let verifier = EcdsaVerifier::new();

    group.bench_function("payload_digest", |b| {
        b.iter(|| black_box(payload_digest(black_box(&payload))))
    });
    group.bench_function("sign_digest", |b| {
        b.iter(|| black_box(signer.sign_digest(black_box(&digest)).unwrap()))
    });
    group.bench_function("recover_payload", |b| {
        b.iter(|| black_box(verifier.recover_payload(&payload, &signature).unwrap()))
    });

    let params = AuthRequestParams {
        wallet: signer.address(),
        participant: Address([0x22; 20]),
        app_name: "bench".to_string(),
        allowances: vec![Allowance::new("usdc", "1000000")],
        expire: Some("3600".to_string()),
        scope: Some("console".to_string()),
        application: None,
    };
    group.bench_function("auth_signing_hash", |b| {
        b.iter(|| {
            black_box(
                auth_typed_data(&params, black_box("challenge"))
                    .signing_hash()
                    .unwrap(),
            )
        })
    });
    group.finish();
}

fn bench_quorum(c: &mut Criterion) {
    let mut group = c.benchmark_group("quorum");

    for size in [2usize, 8, 32] {
        let participants: Vec<Address> = (0..size).map(|i| Address([i as u8 + 1; 20])).collect();
        let weights = vec![1u64; size];
        let policy = QuorumPolicy::new(participants.clone(), weights, size as u64, true).unwrap();

        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(BenchmarkId::new("is_satisfied", size), &participants, |b, p| {
            b.iter(|| black_box(policy.is_satisfied(black_box(p), &[])))
        });
    }
    group.finish();
}

criterion_group!(benches, bench_codec, bench_signing, bench_quorum);
criterion_main!(benches);
