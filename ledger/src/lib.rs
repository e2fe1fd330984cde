//! # pqledger
//!
//! Quantum-safe accounts on Algorand controlled by Falcon-1024 keys.
//!
//! An account is the address of a small logic program that checks a Falcon
//! signature over the transaction id. The address is chosen so it is not a
//! valid Ed25519 point, leaving no classical key that could spend from it.
//!
//! ```no_run
//! # async fn demo(signer: &dyn pqledger::FalconSigner) -> Result<(), pqledger::ProtocolError> {
//! use pqledger::{derive_address, send, AlgodClient, AlgodConfig, Network, SendOptions};
//!
//! let address = derive_address(signer.public_key().as_bytes())?;
//! println!("fund {address}");
//!
//! let config = AlgodConfig::resolve(Network::TestNet, None, None).expect("testnet preset");
//! let client = AlgodClient::new(config);
//! let to = "AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAY5HFKQ".parse().expect("address");
//! let options = SendOptions::default().network(Network::TestNet);
//! let tx_id = send(&client, signer, to, 100_000, &options).await?;
//! println!("confirmed {tx_id}");
//! # Ok(())
//! # }
//! ```
//!
//! The pieces live in separate crates and are re-exported here:
//! - `pqledger-spec`: addresses, canonical msgpack transactions, group ids.
//! - `pqledger-core`: program synthesis, derivation, group building, sending.
//! - `pqledger-transport`: algod REST client and an in-memory ledger.

pub use pqledger_core::*;
pub use pqledger_spec::{
    compute_group_id, encode_group, sha512_256, Address, AddressError, EncodeError, GroupId,
    LogicSig, SignedTransaction, SuggestedParams, Transaction, TxId,
};
pub use pqledger_transport::{
    assemble, group_tx_ids, AlgodClient, AlgodConfig, InMemoryLedger, Script, Submission,
};
