//! Local program patching must agree byte-for-byte with compiling the
//! rendered source.
//!
//! Every test here except the ignored one compiles with this workspace's own
//! assembler through `InMemoryLedger`, so passing them does not show that a
//! real node compiles the source the same way. Only
//! `node_compiler_agrees_with_template` checks that, and it runs only with
//! `--ignored` and `ALGOD_URL` pointing at a node.

use pqledger::{
    assemble, render_source, search, search_compiled, synthesize_compiled, AlgodClient,
    AlgodConfig, ControlProgram, FalconPublicKey, InMemoryLedger, Network, CONTROL_PROGRAM_LEN,
    FALCON_PUBLIC_KEY_LEN,
};
use proptest::prelude::*;

fn lcg_key(mut state: u64) -> FalconPublicKey {
    let mut bytes = [0u8; FALCON_PUBLIC_KEY_LEN];
    for b in bytes.iter_mut() {
        state = state
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        *b = (state >> 56) as u8;
    }
    FalconPublicKey::new(bytes)
}

fn battery() -> Vec<FalconPublicKey> {
    let mut ramp = [0u8; FALCON_PUBLIC_KEY_LEN];
    for (i, b) in ramp.iter_mut().enumerate() {
        *b = i as u8;
    }
    let mut keys = vec![
        FalconPublicKey::new([0u8; FALCON_PUBLIC_KEY_LEN]),
        FalconPublicKey::new([0xff; FALCON_PUBLIC_KEY_LEN]),
        FalconPublicKey::new(ramp),
    ];
    keys.extend((1..=8).map(lcg_key));
    keys
}

#[tokio::test]
async fn patched_and_compiled_searches_agree() {
    let ledger = InMemoryLedger::new();
    for key in battery() {
        let fast = search(&key).unwrap();
        let compiled = search_compiled(&ledger, &key).await.unwrap();
        assert_eq!(fast, compiled);
        assert_eq!(fast.program.as_bytes().len(), CONTROL_PROGRAM_LEN);
    }
}

#[tokio::test]
async fn every_counter_compiles_to_the_patched_program() {
    let ledger = InMemoryLedger::new();
    let key = lcg_key(42);
    for counter in 0..=u8::MAX {
        let compiled = synthesize_compiled(&ledger, &key, counter).await.unwrap();
        assert_eq!(
            compiled,
            ControlProgram::synthesize(&key, counter),
            "counter {counter}"
        );
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn assembled_source_matches_template(seed in any::<u64>(), counter in any::<u8>()) {
        let key = lcg_key(seed);
        let bytecode = assemble(&render_source(&key, counter)).unwrap();
        prop_assert_eq!(bytecode, ControlProgram::synthesize(&key, counter).as_bytes().to_vec());
    }
}

/// Needs a reachable node: `ALGOD_URL=... cargo test -- --ignored`.
#[tokio::test]
#[ignore]
async fn node_compiler_agrees_with_template() {
    let config = AlgodConfig::resolve(
        Network::DevNet,
        std::env::var("ALGOD_URL").ok(),
        std::env::var("ALGOD_TOKEN").ok(),
    )
    .expect("ALGOD_URL must point at a node");
    let client = AlgodClient::new(config);
    for key in battery().into_iter().take(4) {
        let fast = search(&key).unwrap();
        let compiled = search_compiled(&client, &key).await.unwrap();
        assert_eq!(fast, compiled);
    }
}
