//! Ledger wire format shared by the Falcon account crates.
//!
//! Everything here is byte-exact with what an Algorand node hashes and
//! accepts: 32-byte addresses with their base32 checksum form, payment
//! transactions in canonical msgpack, transaction and group identifiers, and
//! logic-sig signed transactions.
#![deny(missing_docs)]

mod address;
mod codec;
mod logicsig;
mod transaction;

pub use address::{Address, AddressError, ADDRESS_LEN, ADDRESS_STRING_LEN};
pub use codec::{sha512_256, EncodeError};
pub use logicsig::{encode_group, LogicSig, SignedTransaction};
pub use transaction::{
    compute_group_id, GroupId, SuggestedParams, Transaction, TxId, MAX_GROUP_SIZE, PAYMENT_TYPE,
    VALIDITY_WINDOW,
};
