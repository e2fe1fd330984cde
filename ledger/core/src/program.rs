//! Control-program synthesis.
//!
//! The program is pinned to TEAL v12 bytecode; addresses already derived
//! depend on every byte below, so none of it may change.
//!
//! ```text
//! offset | bytes         | source
//!      0 | 0c            | #pragma version 12
//!      1 | 26 01 01 CC   | bytecblock 0xCC // counter
//!      5 | 31 17         | txn TxID
//!      7 | 2d            | arg 0
//!      8 | 80 81 0e ..   | pushbytes 0x<1793-byte public key>
//!   1804 | 85            | falcon_verify
//! ```

use std::fmt;

use pqledger_spec::{Address, LogicSig};
use tracing::debug;

use crate::client::LedgerClient;
use crate::error::ProtocolError;
use crate::keys::{FalconPublicKey, FALCON_PUBLIC_KEY_LEN};

/// Program version the layout is pinned to.
pub const PROGRAM_VERSION: u8 = 12;
/// Offset of the counter byte.
pub const COUNTER_OFFSET: usize = 4;
/// Offset of the first public-key byte.
pub const PUBLIC_KEY_OFFSET: usize = PROLOGUE.len();
/// Total control-program length.
pub const CONTROL_PROGRAM_LEN: usize = PROLOGUE.len() + FALCON_PUBLIC_KEY_LEN + 1;

#[rustfmt::skip]
const PROLOGUE: [u8; 11] = [
    PROGRAM_VERSION,
    0x26, 0x01, 0x01, 0x00, // bytecblock 0x00
    0x31, 0x17, // txn TxID
    0x2d, // arg 0
    0x80, 0x81, 0x0e, // pushbytes, varuint 1793
];
const FALCON_VERIFY: u8 = 0x85;

const SOURCE_TEMPLATE: &str = "#pragma version 12
bytecblock TMPL_COUNTER // counter
txn TxID
arg 0
pushbytes TMPL_FALCON_PUBLIC_KEY
falcon_verify
";

/// Public program authorizing the zero-value filler transactions. It only
/// approves a payment with zero amount and fee, no close-out and no rekey,
/// so it needs no secret. Counter 2 keeps its address off the curve.
#[rustfmt::skip]
pub const FILLER_PROGRAM: [u8; 30] = [
    PROGRAM_VERSION,
    0x26, 0x01, 0x01, 0x02, // bytecblock 0x02
    0x31, 0x20, 0x32, 0x03, 0x12, // txn RekeyTo == global ZeroAddress
    0x31, 0x09, 0x32, 0x03, 0x12, 0x10, // && txn CloseRemainderTo == global ZeroAddress
    0x31, 0x08, 0x14, 0x10, // && !txn Amount
    0x31, 0x01, 0x14, 0x10, // && !txn Fee
    0x31, 0x10, 0x81, 0x01, 0x12, 0x10, // && txn TypeEnum == pay
];

/// Source [`FILLER_PROGRAM`] is assembled from.
pub const FILLER_SOURCE: &str = "#pragma version 12
bytecblock 0x02 // counter
txn RekeyTo
global ZeroAddress
==
txn CloseRemainderTo
global ZeroAddress
==
&&
txn Amount
!
&&
txn Fee
!
&&
txn TypeEnum
pushint 1 // pay
==
&&
";

/// Program bytes that authorize spending from a Falcon-controlled account.
#[derive(Clone, PartialEq, Eq)]
pub struct ControlProgram(Vec<u8>);

impl ControlProgram {
    /// Patch the precompiled template with `counter` and the key.
    pub fn synthesize(public_key: &FalconPublicKey, counter: u8) -> Self {
        let mut bytes = Vec::with_capacity(CONTROL_PROGRAM_LEN);
        bytes.extend_from_slice(&PROLOGUE);
        bytes[COUNTER_OFFSET] = counter;
        bytes.extend_from_slice(public_key.as_bytes());
        bytes.push(FALCON_VERIFY);
        Self(bytes)
    }

    /// Bytecode as returned by a compiler.
    pub fn from_bytecode(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    /// Raw bytecode.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Account address controlled by the program.
    pub fn address(&self) -> Address {
        Address::from_program(&self.0)
    }

    /// Logic signature carrying `signature` as its only argument.
    pub fn logic_sig(&self, signature: Vec<u8>) -> LogicSig {
        LogicSig::new(self.0.clone()).with_args(vec![signature])
    }
}

impl fmt::Debug for ControlProgram {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ControlProgram")
            .field("len", &self.0.len())
            .field("counter", &self.0.get(COUNTER_OFFSET))
            .field("address", &self.address())
            .finish()
    }
}

/// Byte-level entry point: validates the key length, then patches.
pub fn synthesize(public_key: &[u8], counter: u8) -> Result<ControlProgram, ProtocolError> {
    let key = FalconPublicKey::from_slice(public_key)?;
    Ok(ControlProgram::synthesize(&key, counter))
}

/// Symbolic source with counter and key substituted.
pub fn render_source(public_key: &FalconPublicKey, counter: u8) -> String {
    SOURCE_TEMPLATE
        .replace("TMPL_COUNTER", &format!("0x{counter:02x}"))
        .replace(
            "TMPL_FALCON_PUBLIC_KEY",
            &format!("0x{}", hex::encode(public_key.as_bytes())),
        )
}

/// Reference path: render the source and compile it on the node.
pub async fn synthesize_compiled<C: LedgerClient + ?Sized>(
    client: &C,
    public_key: &FalconPublicKey,
    counter: u8,
) -> Result<ControlProgram, ProtocolError> {
    let source = render_source(public_key, counter);
    let bytecode = client
        .compile_program(&source)
        .await
        .map_err(|source| ProtocolError::CompileFailed { counter, source })?;
    debug!(counter, len = bytecode.len(), "compiled control program");
    Ok(ControlProgram::from_bytecode(bytecode))
}

/// Address of the filler account.
pub fn filler_address() -> Address {
    Address::from_program(&FILLER_PROGRAM)
}

/// Logic signature for filler transactions.
pub fn filler_logic_sig() -> LogicSig {
    LogicSig::new(FILLER_PROGRAM.to_vec())
}
