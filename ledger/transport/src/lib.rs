//! Ledger clients: algod over REST and an in-memory simulator backed by a
//! local TEAL assembler.
#![deny(missing_docs)]

pub mod algod;
pub mod assembler;
pub mod memory;

pub use algod::{AlgodClient, AlgodConfig, TOKEN_HEADER};
pub use assembler::assemble;
pub use memory::{group_tx_ids, InMemoryLedger, Script, Submission};
