use std::fmt;

use data_encoding::BASE32_NOPAD;
use serde::{Deserialize, Serialize};

use crate::address::Address;
use crate::codec::{sha512_256, CanonicalMap, EncodeError};

/// Transaction type tag for payments.
pub const PAYMENT_TYPE: &str = "pay";
/// Largest atomic group the ledger accepts.
pub const MAX_GROUP_SIZE: usize = 16;
/// Rounds a transaction stays valid after the node's last round.
pub const VALIDITY_WINDOW: u64 = 1000;

const TX_DOMAIN: &[u8] = b"TX";
const GROUP_DOMAIN: &[u8] = b"TG";

/// Size of the signed-transaction wrapper around a transaction body:
/// map header, `sig` and `txn` keys, and a 64-byte signature.
const SIGNED_OVERHEAD: usize = 1 + 4 + 2 + 64 + 4;

/// Network parameters needed to build a well-formed transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuggestedParams {
    /// Fee per encoded byte, in microAlgos.
    pub fee_per_byte: u64,
    /// Minimum fee per transaction, in microAlgos.
    pub min_fee: u64,
    /// First round the transaction is valid.
    pub first_valid: u64,
    /// Last round the transaction is valid.
    pub last_valid: u64,
    /// Network genesis identifier, e.g. `mainnet-v1.0`.
    pub genesis_id: String,
    /// Network genesis hash.
    pub genesis_hash: [u8; 32],
}

impl SuggestedParams {
    /// Parameters valid from `last_round` for [`VALIDITY_WINDOW`] rounds.
    pub fn from_last_round(
        last_round: u64,
        fee_per_byte: u64,
        min_fee: u64,
        genesis_id: impl Into<String>,
        genesis_hash: [u8; 32],
    ) -> Self {
        Self {
            fee_per_byte,
            min_fee,
            first_valid: last_round,
            last_valid: last_round.saturating_add(VALIDITY_WINDOW),
            genesis_id: genesis_id.into(),
            genesis_hash,
        }
    }
}

/// Transaction identifier: `SHA-512/256("TX" || canonical msgpack)`.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct TxId([u8; 32]);

impl TxId {
    /// Raw digest. This is the message a logic program sees as `txn TxID`.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl From<[u8; 32]> for TxId {
    fn from(digest: [u8; 32]) -> Self {
        Self(digest)
    }
}

impl fmt::Display for TxId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&BASE32_NOPAD.encode(&self.0))
    }
}

impl fmt::Debug for TxId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TxId({self})")
    }
}

/// Group identifier binding transactions into one atomic commit.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct GroupId([u8; 32]);

impl GroupId {
    /// Raw digest.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// A group id produced by [`compute_group_id`] is never zero.
    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 32]
    }
}

/// Payment transaction. Immutable: every change returns a new value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transaction {
    /// Paying account.
    pub sender: Address,
    /// Receiving account.
    pub receiver: Address,
    /// Amount in microAlgos.
    pub amount: u64,
    /// Fee in microAlgos.
    pub fee: u64,
    /// First valid round.
    pub first_valid: u64,
    /// Last valid round.
    pub last_valid: u64,
    /// Genesis identifier.
    pub genesis_id: String,
    /// Genesis hash.
    pub genesis_hash: [u8; 32],
    /// Arbitrary note bytes.
    pub note: Vec<u8>,
    /// Group the transaction belongs to.
    pub group: Option<GroupId>,
}

impl Transaction {
    /// Zero-fee payment using the validity window and genesis of `params`.
    pub fn payment(
        sender: Address,
        receiver: Address,
        amount: u64,
        note: Vec<u8>,
        params: &SuggestedParams,
    ) -> Self {
        Self {
            sender,
            receiver,
            amount,
            fee: 0,
            first_valid: params.first_valid,
            last_valid: params.last_valid,
            genesis_id: params.genesis_id.clone(),
            genesis_hash: params.genesis_hash,
            note,
            group: None,
        }
    }

    /// Same transaction with a different fee.
    pub fn with_fee(self, fee: u64) -> Self {
        Self { fee, ..self }
    }

    /// Same transaction stamped with a group id.
    pub fn with_group(self, group: GroupId) -> Self {
        Self {
            group: Some(group),
            ..self
        }
    }

    pub(crate) fn to_map(&self) -> Result<CanonicalMap, EncodeError> {
        let mut map = CanonicalMap::new();
        map.uint("amt", self.amount)?
            .uint("fee", self.fee)?
            .uint("fv", self.first_valid)?
            .str("gen", &self.genesis_id)?
            .digest("gh", &self.genesis_hash)?
            .uint("lv", self.last_valid)?
            .bin("note", &self.note)?
            .digest("rcv", self.receiver.as_bytes())?
            .digest("snd", self.sender.as_bytes())?
            .str("type", PAYMENT_TYPE)?;
        if let Some(group) = &self.group {
            map.digest("grp", group.as_bytes())?;
        }
        Ok(map)
    }

    /// Canonical msgpack body, as hashed by the ledger.
    pub fn encode(&self) -> Result<Vec<u8>, EncodeError> {
        self.to_map()?.encode()
    }

    /// Transaction identifier.
    pub fn id(&self) -> Result<TxId, EncodeError> {
        Ok(TxId(sha512_256(TX_DOMAIN, &self.encode()?)))
    }

    /// Encoded size once wrapped with a 64-byte signature; the node charges
    /// per-byte fees on this size.
    pub fn estimate_signed_size(&self) -> Result<usize, EncodeError> {
        Ok(self.encode()?.len() + SIGNED_OVERHEAD)
    }
}

/// Group id over the ordered sequence: `SHA-512/256("TG" || {txlist: [ids]})`.
///
/// Any group stamp already present on the inputs is ignored.
pub fn compute_group_id(transactions: &[Transaction]) -> Result<GroupId, EncodeError> {
    if transactions.is_empty() || transactions.len() > MAX_GROUP_SIZE {
        return Err(EncodeError::GroupSize(transactions.len()));
    }
    let ids = transactions
        .iter()
        .map(|txn| {
            let unstamped = Transaction {
                group: None,
                ..txn.clone()
            };
            unstamped.id().map(|id| id.0)
        })
        .collect::<Result<Vec<_>, _>>()?;
    let mut map = CanonicalMap::new();
    map.bin_array("txlist", &ids)?;
    Ok(GroupId(sha512_256(GROUP_DOMAIN, &map.encode()?)))
}
