// Secret handshake benchmarks using criterion.
//
// Measures:
//   - Ed25519 sign / verify
//   - Edwards to Montgomery key conversion
//   - Secretbox seal / open at handshake and segment sizes
//   - Full four-message handshake (in memory, no I/O)

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use std::time::Duration;

use secrethandshake::crypto::convert::{
    identity_public_to_exchange_public, identity_secret_to_exchange_secret,
};
use secrethandshake::crypto::keys::IdentityKeyPair;
use secrethandshake::crypto::secretbox::SecretBox;
use secrethandshake::{AppKey, Handshake};

// ---------------------------------------------------------------------------
// Ed25519 sign / verify
// ---------------------------------------------------------------------------

fn bench_sign_verify(c: &mut Criterion) {
    let kp = IdentityKeyPair::generate();
    let message = [0x5Au8; 96];

    c.bench_function("ed25519_sign", |b| {
        b.iter(|| {
            black_box(kp.sign(black_box(&message)));
        });
    });

    let sig = kp.sign(&message);
    c.bench_function("ed25519_verify", |b| {
        b.iter(|| {
            black_box(kp.verify(black_box(&message), black_box(&sig)).unwrap());
        });
    });
}

// ---------------------------------------------------------------------------
// Key conversion
// ---------------------------------------------------------------------------

fn bench_convert(c: &mut Criterion) {
    let kp = IdentityKeyPair::generate();
    let public = kp.public_key_bytes();

    c.bench_function("convert_public", |b| {
        b.iter(|| black_box(identity_public_to_exchange_public(black_box(&public))));
    });
    c.bench_function("convert_secret", |b| {
        b.iter(|| black_box(identity_secret_to_exchange_secret(kp.signing_key())));
    });
}

// ---------------------------------------------------------------------------
// Secretbox
// ---------------------------------------------------------------------------

fn bench_secretbox(c: &mut Criterion) {
    let sb = SecretBox::new(&[0x42u8; 32]);
    let nonce = [0u8; 24];
    let sizes: &[usize] = &[64, 96, 4096];

    let mut group = c.benchmark_group("secretbox_seal");
    for &size in sizes {
        let plaintext = vec![0xABu8; size];
        group.throughput(Throughput::Bytes(size as u64));
        group.bench_with_input(
            BenchmarkId::from_parameter(format!("{size}B")),
            &plaintext,
            |b, pt| {
                b.iter(|| black_box(sb.seal(&nonce, black_box(pt)).unwrap()));
            },
        );
    }
    group.finish();

    let mut group = c.benchmark_group("secretbox_open");
    for &size in sizes {
        let boxed = sb.seal(&nonce, &vec![0xABu8; size]).unwrap();
        group.throughput(Throughput::Bytes(size as u64));
        group.bench_with_input(
            BenchmarkId::from_parameter(format!("{size}B")),
            &boxed,
            |b, bx| {
                b.iter(|| black_box(sb.open(&nonce, black_box(bx)).unwrap()));
            },
        );
    }
    group.finish();
}

// ---------------------------------------------------------------------------
// Full handshake
// ---------------------------------------------------------------------------

fn bench_full_handshake(c: &mut Criterion) {
    let app_key = AppKey::from_bytes([0x22; 32]);
    let alice = IdentityKeyPair::generate();
    let bob = IdentityKeyPair::generate();

    c.bench_function("full_handshake", |b| {
        b.iter(|| {
            let client = Handshake::client(app_key, &alice, bob.public_key_bytes()).unwrap();
            let server = Handshake::server(app_key, &bob);

            let server = server.verify_challenge(&client.challenge()).unwrap();
            let client = client.verify_challenge(&server.challenge()).unwrap();
            let (client, auth) = client.client_auth().unwrap();
            let server = server.verify_client_auth(&auth).unwrap();
            let (accept, server_done) = server.server_accept().unwrap();
            let client_done = client.verify_server_accept(&accept).unwrap();

            black_box((client_done, server_done));
        });
    });
}

// ---------------------------------------------------------------------------
// Criterion harness
// ---------------------------------------------------------------------------

criterion_group! {
    name = handshake_benches;
    config = Criterion::default()
        .sample_size(100)
        .measurement_time(Duration::from_secs(5));
    targets =
        bench_sign_verify,
        bench_convert,
        bench_secretbox,
        bench_full_handshake
}

criterion_main!(handshake_benches);
