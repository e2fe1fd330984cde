//! Quantum-safe Falcon accounts on Algorand.
//!
//! A Falcon-1024 public key is baked into a small logic program whose only
//! job is `falcon_verify(txn.TxID, arg 0, pubkey)`. The program's address
//! is the account. A one-byte counter in the program is bumped until that
//! address is not a valid Edwards25519 point, so no Ed25519 private key can
//! exist for it, not even for an adversary with a quantum computer.
//!
//! Spending builds an atomic group: the payment first, then a few zero-value
//! filler transactions signed by a public filler program. The fillers exist
//! only so the group's pooled fee covers the oversized control program.
//!
//! - [`program`]: control-program synthesis (template patch and compiled).
//! - [`derive`]: address derivation and the curve-avoidance search.
//! - [`group`]: transaction-group building.
//! - [`submit`]: group signing, submission and confirmation.
//! - [`client`]: the ledger and signer seams every external call goes through.
#![deny(missing_docs)]

pub mod client;
pub mod derive;
pub mod error;
pub mod group;
pub mod keys;
pub mod network;
pub mod program;
pub mod submit;

pub use client::{ClientResult, Confirmation, FalconSigner, LedgerClient};
pub use derive::{
    candidate, derive_address, is_on_curve, search, search_compiled, Candidate, Derivation,
    MAX_COUNTER_TRIES,
};
pub use error::{Phase, ProtocolError};
pub use group::{
    build_group, check_network, FeeMode, GroupBuilder, GroupPolicy, SendOptions, TransactionGroup,
    DEFAULT_FILLER_COUNT, DEFAULT_MAX_ROUNDS,
};
pub use keys::{FalconPrivateKey, FalconPublicKey, FALCON_PRIVATE_KEY_LEN, FALCON_PUBLIC_KEY_LEN};
pub use network::Network;
pub use program::{
    filler_address, filler_logic_sig, render_source, synthesize, synthesize_compiled,
    ControlProgram, CONTROL_PROGRAM_LEN, FILLER_PROGRAM, FILLER_SOURCE, PROGRAM_VERSION,
};
pub use submit::{send, send_abortable, sign_and_submit, sign_group, SignedGroup};
