//! Seams to the outside world: the ledger node and the Falcon signer.

use async_trait::async_trait;
use bytes::Bytes;
use pqledger_spec::SuggestedParams;

use crate::keys::FalconPublicKey;

/// Result of a ledger client call; transport errors stay opaque.
pub type ClientResult<T> = Result<T, anyhow::Error>;

/// What the node reported while waiting for a transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Confirmation {
    /// Committed in `round`.
    Confirmed {
        /// Round the group was committed in.
        round: u64,
    },
    /// Removed from the pool without committing.
    Rejected {
        /// Pool error reported by the node.
        reason: String,
    },
    /// Still not committed when the round bound ran out.
    Pending,
}

/// Ledger node operations used by the protocol.
#[async_trait]
pub trait LedgerClient: Send + Sync {
    /// Current network parameters.
    async fn suggested_params(&self) -> ClientResult<SuggestedParams>;
    /// Assemble program source into bytecode.
    async fn compile_program(&self, source: &str) -> ClientResult<Vec<u8>>;
    /// Broadcast an encoded group as one atomic unit. Returns the id the
    /// node reports for the group's first transaction.
    async fn submit_raw_group(&self, group: Bytes) -> ClientResult<String>;
    /// Poll for `tx_id` for at most `max_rounds` rounds.
    async fn wait_for_confirmation(
        &self,
        tx_id: &str,
        max_rounds: u64,
    ) -> ClientResult<Confirmation>;
}

/// Holder of a Falcon-1024 private key.
///
/// Signing must be deterministic for a given key and message, since the
/// ledger verifies the deterministic Falcon encoding.
#[async_trait]
pub trait FalconSigner: Send + Sync {
    /// Public half of the key pair.
    fn public_key(&self) -> &FalconPublicKey;
    /// Sign `message` with the private key.
    async fn sign(&self, message: &[u8]) -> anyhow::Result<Vec<u8>>;
}
