use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use futures::future::AbortHandle;
use pqledger::{
    build_group, search, send, send_abortable, sha512_256, Address, ClientResult, Confirmation,
    FalconPublicKey, FalconSigner, InMemoryLedger, LedgerClient, Network, ProtocolError,
    SendOptions, SuggestedParams, FALCON_PUBLIC_KEY_LEN, FILLER_PROGRAM,
};

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    haystack.windows(needle.len()).any(|w| w == needle)
}

/// Deterministic stand-in for a Falcon key pair.
struct TestSigner {
    key: FalconPublicKey,
}

impl TestSigner {
    fn new(seed: u8) -> Self {
        let mut bytes = [0u8; FALCON_PUBLIC_KEY_LEN];
        for (i, b) in bytes.iter_mut().enumerate() {
            *b = (i as u8).wrapping_mul(31).wrapping_add(seed);
        }
        Self {
            key: FalconPublicKey::new(bytes),
        }
    }

    fn signature_for(message: &[u8]) -> Vec<u8> {
        let digest = sha512_256(b"test-falcon", message);
        digest.iter().cycle().take(666).copied().collect()
    }
}

#[async_trait]
impl FalconSigner for TestSigner {
    fn public_key(&self) -> &FalconPublicKey {
        &self.key
    }

    async fn sign(&self, message: &[u8]) -> anyhow::Result<Vec<u8>> {
        Ok(Self::signature_for(message))
    }
}

fn receiver() -> Address {
    Address::new([0x42; 32])
}

#[tokio::test]
async fn payment_confirms_on_in_memory_ledger() {
    let ledger = InMemoryLedger::new();
    let mut feed = ledger.subscribe();
    let signer = TestSigner::new(1);
    let options = SendOptions::default()
        .network(Network::TestNet)
        .note(b"rent".to_vec());

    let tx_id = send(&ledger, &signer, receiver(), 250_000, &options)
        .await
        .unwrap();

    let submissions = ledger.submissions();
    assert_eq!(submissions.len(), 1);
    let group = &submissions[0];
    assert_eq!(group.tx_ids.len(), 4);
    assert_eq!(group.tx_ids[0], tx_id.to_string());
    assert_eq!(feed.recv().await.unwrap().tx_ids, group.tx_ids);

    let derivation = search(signer.public_key()).unwrap();
    assert!(contains(&group.bytes, derivation.program.as_bytes()));
    assert!(contains(&group.bytes, &TestSigner::signature_for(tx_id.as_bytes())));
    assert!(contains(&group.bytes, &FILLER_PROGRAM));
    assert!(contains(&group.bytes, b"rent"));
}

#[tokio::test]
async fn intended_payment_covers_filler_fees() {
    let ledger = InMemoryLedger::new().with_fees(0, 2000);
    let signer = TestSigner::new(2);
    let from = search(signer.public_key()).unwrap().address;

    let options = SendOptions::default()
        .network(Network::TestNet)
        .filler_count(4);
    let group = build_group(&ledger, from, receiver(), 1, &options)
        .await
        .unwrap();
    assert_eq!(group.len(), 5);
    assert_eq!(group.intended().fee, 2000 + 4 * 2000);
    assert!(group.fillers().iter().all(|f| f.fee == 0 && f.amount == 0));

    let options = SendOptions::default()
        .network(Network::TestNet)
        .flat_fee(5000);
    let flat = build_group(&ledger, from, receiver(), 1, &options)
        .await
        .unwrap();
    assert_eq!(flat.intended().fee, 5000 + 3 * 2000);
}

#[tokio::test]
async fn params_failure_never_submits() {
    let ledger = InMemoryLedger::new().failing_params("connection refused");
    let signer = TestSigner::new(3);
    let options = SendOptions::default().network(Network::TestNet);
    let err = send(&ledger, &signer, receiver(), 1, &options)
        .await
        .unwrap_err();
    assert!(matches!(err, ProtocolError::NetworkParamsUnavailable(_)));
    assert_eq!(ledger.submit_calls(), 0);
}

#[tokio::test]
async fn outcomes_map_to_distinct_errors() {
    let signer = TestSigner::new(4);
    let options = SendOptions::default().network(Network::TestNet);

    let ledger = InMemoryLedger::new().never_confirms();
    let err = send(&ledger, &signer, receiver(), 1, &options)
        .await
        .unwrap_err();
    assert!(matches!(err, ProtocolError::ConfirmationTimeout { rounds: 9, .. }));
    assert_eq!(ledger.submissions().len(), 1);

    let ledger = InMemoryLedger::new().pool_error("overspend");
    let err = send(&ledger, &signer, receiver(), 1, &options)
        .await
        .unwrap_err();
    assert!(matches!(err, ProtocolError::SubmissionRejected(_)));

    let ledger = InMemoryLedger::new().rejecting_submissions("txn dead");
    let err = send(&ledger, &signer, receiver(), 1, &options)
        .await
        .unwrap_err();
    assert!(matches!(err, ProtocolError::SubmissionRejected(_)));
    assert_eq!(ledger.submit_calls(), 1);

    let ledger = InMemoryLedger::new().confirming_after(20);
    let short = options.clone().max_rounds(5);
    let err = send(&ledger, &signer, receiver(), 1, &short)
        .await
        .unwrap_err();
    assert!(matches!(err, ProtocolError::ConfirmationTimeout { rounds: 5, .. }));
}

#[tokio::test]
async fn wrong_network_is_caught_before_signing() {
    let ledger = InMemoryLedger::new().with_genesis_id("testnet-v1.0");
    let options = SendOptions::default().network(Network::MainNet);
    let err = send(&ledger, &TestSigner::new(5), receiver(), 1, &options)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        ProtocolError::NetworkMismatch {
            expected: "mainnet-v1.0",
            ..
        }
    ));
    assert_eq!(ledger.submit_calls(), 0);

    let devnet = SendOptions::default().network(Network::DevNet);
    send(&ledger, &TestSigner::new(5), receiver(), 1, &devnet)
        .await
        .unwrap();
}

/// Ledger whose confirmation wait takes far longer than any test.
struct SlowLedger(InMemoryLedger);

#[async_trait]
impl LedgerClient for SlowLedger {
    async fn suggested_params(&self) -> ClientResult<SuggestedParams> {
        self.0.suggested_params().await
    }
    async fn compile_program(&self, source: &str) -> ClientResult<Vec<u8>> {
        self.0.compile_program(source).await
    }
    async fn submit_raw_group(&self, group: Bytes) -> ClientResult<String> {
        self.0.submit_raw_group(group).await
    }
    async fn wait_for_confirmation(
        &self,
        _tx_id: &str,
        _max_rounds: u64,
    ) -> ClientResult<Confirmation> {
        tokio::time::sleep(Duration::from_secs(60)).await;
        Ok(Confirmation::Pending)
    }
}

#[tokio::test]
async fn abort_and_deadline_cancel_in_flight_send() {
    let ledger = Arc::new(SlowLedger(InMemoryLedger::new()));
    let signer = Arc::new(TestSigner::new(6));
    let options = SendOptions::default().network(Network::TestNet);

    let (handle, registration) = AbortHandle::new_pair();
    let task = {
        let ledger = ledger.clone();
        let signer = signer.clone();
        let options = options.clone();
        tokio::spawn(async move {
            send_abortable(&*ledger, &*signer, receiver(), 1, &options, registration)
                .await
        })
    };
    tokio::time::sleep(Duration::from_millis(200)).await;
    handle.abort();
    let err = task.await.unwrap().unwrap_err();
    assert!(matches!(err, ProtocolError::Cancelled("aborted")));
    assert_eq!(ledger.0.submissions().len(), 1);

    let options = options.deadline(Duration::from_millis(200));
    let err = send(&*ledger, &*signer, receiver(), 1, &options)
        .await
        .unwrap_err();
    assert!(matches!(err, ProtocolError::Cancelled("deadline exceeded")));
}
