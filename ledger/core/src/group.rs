//! Atomic group construction.
//!
//! A control program is about 1.8 KB and a logic signature may only use the
//! program-size allowance of the transactions in its group, so the payment
//! travels with zero-value filler transactions that lend their allowance.
//! The payment pays every filler's fee.

use std::time::Duration;

use pqledger_spec::{
    compute_group_id, Address, EncodeError, GroupId, SuggestedParams, Transaction, MAX_GROUP_SIZE,
};
use tracing::{debug, info};

use crate::client::LedgerClient;
use crate::error::ProtocolError;
use crate::network::Network;
use crate::program::filler_address;

/// Fillers added to every group by default.
pub const DEFAULT_FILLER_COUNT: usize = 3;
/// Default confirmation bound, in rounds.
pub const DEFAULT_MAX_ROUNDS: u64 = 9;

/// Shape of the group around the intended payment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GroupPolicy {
    /// Number of filler transactions.
    pub filler_count: usize,
}

impl Default for GroupPolicy {
    fn default() -> Self {
        Self {
            filler_count: DEFAULT_FILLER_COUNT,
        }
    }
}

/// How the intended payment's own fee is chosen.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FeeMode {
    /// Per-byte fee from the node, floored at the minimum fee.
    #[default]
    Suggested,
    /// Fixed fee in microAlgos.
    Flat(u64),
}

/// Per-call options for [`crate::send`].
#[derive(Debug, Clone)]
pub struct SendOptions {
    /// Network the node must serve.
    pub network: Network,
    /// Fee for the intended payment.
    pub fee: FeeMode,
    /// Note attached to the intended payment.
    pub note: Vec<u8>,
    /// Rounds to wait for confirmation.
    pub max_rounds: u64,
    /// Bound on the whole operation; `None` waits as long as the rounds allow.
    pub deadline: Option<Duration>,
    /// Filler shape.
    pub policy: GroupPolicy,
}

impl Default for SendOptions {
    fn default() -> Self {
        Self {
            network: Network::default(),
            fee: FeeMode::default(),
            note: Vec::new(),
            max_rounds: DEFAULT_MAX_ROUNDS,
            deadline: None,
            policy: GroupPolicy::default(),
        }
    }
}

impl SendOptions {
    /// Require the node to serve `network`.
    pub fn network(mut self, network: Network) -> Self {
        self.network = network;
        self
    }

    /// Use a fixed fee for the intended payment.
    pub fn flat_fee(mut self, fee: u64) -> Self {
        self.fee = FeeMode::Flat(fee);
        self
    }

    /// Attach a note to the intended payment.
    pub fn note(mut self, note: impl Into<Vec<u8>>) -> Self {
        self.note = note.into();
        self
    }

    /// Rounds to wait for confirmation.
    pub fn max_rounds(mut self, rounds: u64) -> Self {
        self.max_rounds = rounds;
        self
    }

    /// Bound the whole operation.
    pub fn deadline(mut self, deadline: Duration) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Number of filler transactions.
    pub fn filler_count(mut self, count: usize) -> Self {
        self.policy.filler_count = count;
        self
    }
}

/// Intended payment followed by its fillers, all stamped with one group id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionGroup {
    transactions: Vec<Transaction>,
    group_id: GroupId,
}

impl TransactionGroup {
    /// The payment the caller asked for.
    pub fn intended(&self) -> &Transaction {
        &self.transactions[0]
    }

    /// Zero-value fillers, in group order.
    pub fn fillers(&self) -> &[Transaction] {
        &self.transactions[1..]
    }

    /// Id stamped on every member.
    pub fn group_id(&self) -> GroupId {
        self.group_id
    }

    /// Every transaction in commit order.
    pub fn transactions(&self) -> &[Transaction] {
        &self.transactions
    }

    /// Number of transactions.
    pub fn len(&self) -> usize {
        self.transactions.len()
    }

    /// Never true; a group always holds the intended payment.
    pub fn is_empty(&self) -> bool {
        self.transactions.is_empty()
    }
}

/// Builds a group from already-fetched parameters. No I/O.
#[derive(Debug, Clone)]
pub struct GroupBuilder<'a> {
    params: &'a SuggestedParams,
    fee: FeeMode,
    policy: GroupPolicy,
}

impl<'a> GroupBuilder<'a> {
    /// Builder over `params` with the suggested fee and default policy.
    pub fn new(params: &'a SuggestedParams) -> Self {
        Self {
            params,
            fee: FeeMode::Suggested,
            policy: GroupPolicy::default(),
        }
    }

    /// Fee mode for the intended payment.
    pub fn fee(mut self, fee: FeeMode) -> Self {
        self.fee = fee;
        self
    }

    /// Filler shape.
    pub fn policy(mut self, policy: GroupPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Assemble and stamp the group.
    pub fn build(
        &self,
        from: Address,
        to: Address,
        amount: u64,
        note: Vec<u8>,
    ) -> Result<TransactionGroup, ProtocolError> {
        if amount == 0 {
            return Err(ProtocolError::InvalidAmount);
        }
        let filler_count = self.policy.filler_count;
        if filler_count + 1 > MAX_GROUP_SIZE {
            return Err(EncodeError::GroupSize(filler_count + 1).into());
        }

        let payment = Transaction::payment(from, to, amount, note, self.params);
        let own_fee = self.own_fee(&payment)?;
        let filler_fees = (filler_count as u64).saturating_mul(self.params.min_fee);
        let payment = payment.with_fee(own_fee.saturating_add(filler_fees));

        let filler = filler_address();
        let mut transactions = Vec::with_capacity(filler_count + 1);
        transactions.push(payment);
        for i in 0..filler_count {
            let note = vec![i as u8];
            transactions.push(Transaction::payment(filler, filler, 0, note, self.params));
        }

        let group_id = compute_group_id(&transactions)?;
        let transactions = transactions
            .into_iter()
            .map(|txn| txn.with_group(group_id))
            .collect();
        debug!(own_fee, filler_fees, filler_count, "built group");
        Ok(TransactionGroup {
            transactions,
            group_id,
        })
    }

    /// Suggested fees are sized on the payment carrying the per-byte rate in
    /// its fee field, so the field counts toward the estimate.
    fn own_fee(&self, payment: &Transaction) -> Result<u64, ProtocolError> {
        Ok(match self.fee {
            FeeMode::Flat(fee) => fee,
            FeeMode::Suggested => {
                let size = payment
                    .clone()
                    .with_fee(self.params.fee_per_byte)
                    .estimate_signed_size()? as u64;
                self.params
                    .fee_per_byte
                    .saturating_mul(size)
                    .max(self.params.min_fee)
            }
        })
    }
}

/// Fails unless the node serves `network`. DevNet accepts any genesis.
pub fn check_network(network: Network, params: &SuggestedParams) -> Result<(), ProtocolError> {
    match network.genesis_id() {
        Some(expected) if expected != params.genesis_id => Err(ProtocolError::NetworkMismatch {
            expected,
            actual: params.genesis_id.clone(),
        }),
        _ => Ok(()),
    }
}

/// Fetch parameters from the node and build the group for a payment of
/// `amount` from `from` to `to`, shaped by `options.policy`.
pub async fn build_group<C: LedgerClient + ?Sized>(
    client: &C,
    from: Address,
    to: Address,
    amount: u64,
    options: &SendOptions,
) -> Result<TransactionGroup, ProtocolError> {
    if amount == 0 {
        return Err(ProtocolError::InvalidAmount);
    }
    let params = client
        .suggested_params()
        .await
        .map_err(ProtocolError::NetworkParamsUnavailable)?;
    check_network(options.network, &params)?;
    info!(
        network = %options.network,
        first_valid = params.first_valid,
        min_fee = params.min_fee,
        "fetched suggested params"
    );
    GroupBuilder::new(&params)
        .fee(options.fee)
        .policy(options.policy)
        .build(from, to, amount, options.note.clone())
}
