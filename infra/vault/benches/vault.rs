use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use getrandom::fill;
use sbox_vault::prelude::*;

fn bench_encrypt_decrypt(c: &mut Criterion) {
    let mut group = c.benchmark_group("encrypt_decrypt");
    let runtime = tokio::runtime::Builder::new_current_thread().build().unwrap();

    let crypto = AeadCrypto::<Aes>::new().compression(true);
    let keys = KeyMaterial::builder().derived("bench-ikm", "bench-salt").unwrap().build().unwrap();
    let key = keys.domain_key("ciphers").unwrap();

    let sizes = [("256B", 256usize), ("4KB", 4 * 1024), ("64KB", 64 * 1024)];

    for (label, size) in sizes {
        let mut data = vec![0u8; size];
        fill(&mut data).expect("System RNG unavailable for benchmark data");

        group.throughput(Throughput::Bytes(size as u64));

        group.bench_with_input(BenchmarkId::new("encrypt", label), &data, |b, d| {
            b.to_async(&runtime).iter(|| async { crypto.encrypt(d, &key, b"ciphers").await.unwrap() });
        });

        let sealed = runtime.block_on(crypto.encrypt(&data, &key, b"ciphers")).unwrap();

        group.bench_with_input(BenchmarkId::new("decrypt", label), &sealed, |b, s| {
            b.to_async(&runtime).iter(|| async { crypto.decrypt(s, &key, b"ciphers").await.unwrap() });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_encrypt_decrypt);
criterion_main!(benches);
