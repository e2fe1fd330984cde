//! Address derivation with curve avoidance.
//!
//! An address that decodes as an Ed25519 point could in principle have a
//! classical private key, which would bypass the Falcon check entirely. The
//! counter byte is bumped until the program address falls off the curve.

use curve25519_dalek::edwards::CompressedEdwardsY;
use pqledger_spec::Address;
use tracing::{debug, info};

use crate::client::LedgerClient;
use crate::error::ProtocolError;
use crate::keys::FalconPublicKey;
use crate::program::{synthesize_compiled, ControlProgram};

/// Counters tried before a key is declared unsuitable.
pub const MAX_COUNTER_TRIES: usize = 256;

/// True when `bytes` decompress to an Edwards25519 point. Non-canonical `y`
/// encodings are accepted, as the ledger's own decoder accepts them.
pub fn is_on_curve(bytes: &[u8; 32]) -> bool {
    CompressedEdwardsY(*bytes).decompress().is_some()
}

/// One step of the search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    /// Counter patched into the program.
    pub counter: u8,
    /// Resulting program.
    pub program: ControlProgram,
    /// Program address.
    pub address: Address,
}

impl Candidate {
    /// Off-curve addresses have no Ed25519 key.
    pub fn is_quantum_safe(&self) -> bool {
        !is_on_curve(self.address.as_bytes())
    }
}

/// Candidate for a single counter.
pub fn candidate(public_key: &FalconPublicKey, counter: u8) -> Candidate {
    let program = ControlProgram::synthesize(public_key, counter);
    let address = program.address();
    Candidate {
        counter,
        program,
        address,
    }
}

/// Outcome of a successful search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Derivation {
    /// First counter giving an off-curve address.
    pub counter: u8,
    /// Account address.
    pub address: Address,
    /// Program controlling the account.
    pub program: ControlProgram,
}

impl From<Candidate> for Derivation {
    fn from(c: Candidate) -> Self {
        Self {
            counter: c.counter,
            address: c.address,
            program: c.program,
        }
    }
}

/// Lowest counter whose program address is off the curve.
pub fn search(public_key: &FalconPublicKey) -> Result<Derivation, ProtocolError> {
    search_with(public_key, is_on_curve)
}

fn search_with(
    public_key: &FalconPublicKey,
    on_curve: impl Fn(&[u8; 32]) -> bool,
) -> Result<Derivation, ProtocolError> {
    for counter in counters() {
        let c = candidate(public_key, counter);
        if on_curve(c.address.as_bytes()) {
            debug!(counter, address = %c.address, "address on curve, retrying");
            continue;
        }
        info!(counter, address = %c.address, "derived Falcon account");
        return Ok(c.into());
    }
    Err(ProtocolError::DerivationExhausted)
}

/// Same search, with every candidate compiled by the node instead of
/// patched locally. Used to check the template against a real compiler.
pub async fn search_compiled<C: LedgerClient + ?Sized>(
    client: &C,
    public_key: &FalconPublicKey,
) -> Result<Derivation, ProtocolError> {
    for counter in counters() {
        let program = synthesize_compiled(client, public_key, counter).await?;
        let address = program.address();
        if is_on_curve(address.as_bytes()) {
            debug!(counter, %address, "compiled address on curve, retrying");
            continue;
        }
        return Ok(Derivation {
            counter,
            address,
            program,
        });
    }
    Err(ProtocolError::DerivationExhausted)
}

/// Text address of the Falcon account for raw public-key bytes.
pub fn derive_address(public_key: &[u8]) -> Result<String, ProtocolError> {
    let key = FalconPublicKey::from_slice(public_key)?;
    Ok(search(&key)?.address.to_string())
}

fn counters() -> impl Iterator<Item = u8> {
    (0..MAX_COUNTER_TRIES).map(|c| c as u8)
}
