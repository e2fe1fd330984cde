use async_trait::async_trait;
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use pqledger::*;

const KEY: FalconPublicKey = FalconPublicKey::new([0xA5; FALCON_PUBLIC_KEY_LEN]);

struct ConstSigner;

#[async_trait]
impl FalconSigner for ConstSigner {
    fn public_key(&self) -> &FalconPublicKey {
        &KEY
    }

    async fn sign(&self, _message: &[u8]) -> anyhow::Result<Vec<u8>> {
        Ok(vec![0x5A; 1230])
    }
}

fn bench_synthesize(c: &mut Criterion) {
    c.bench_function("synthesize", |b| {
        b.iter(|| ControlProgram::synthesize(black_box(&KEY), black_box(7)).address())
    });
}

fn bench_search(c: &mut Criterion) {
    c.bench_function("search", |b| b.iter(|| search(black_box(&KEY))));
}

fn bench_build_and_sign(c: &mut Criterion) {
    let params = SuggestedParams::from_last_round(1000, 0, 1000, "testnet-v1.0", [7u8; 32]);
    let derivation = match search(&KEY) {
        Ok(d) => d,
        Err(err) => panic!("bench key unsuitable: {err}"),
    };
    let to = Address::new([0x42; 32]);

    c.bench_function("build_and_sign_group", |b| {
        b.iter(|| {
            let group = GroupBuilder::new(&params)
                .build(derivation.address, to, black_box(1_000_000), b"bench".to_vec())
                .unwrap();
            futures::executor::block_on(sign_group(&group, &derivation, &ConstSigner)).unwrap()
        })
    });
}

criterion_group!(benches, bench_synthesize, bench_search, bench_build_and_sign);
criterion_main!(benches);
