//! In-memory ledger simulator: suggested params, a local assembler, a
//! submission log with a broadcast feed, and scripted confirmation outcomes.

use std::collections::HashMap;

use anyhow::{anyhow, bail};
use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::Mutex;
use pqledger_core::{ClientResult, Confirmation, LedgerClient};
use pqledger_spec::{sha512_256, SuggestedParams, TxId, MAX_GROUP_SIZE};
use rmp::Marker;
use tokio::sync::broadcast::{self, Receiver, Sender};
use tracing::{debug, info};

use crate::assembler::assemble;

const DEFAULT_GENESIS_ID: &str = "testnet-v1.0";
const DEFAULT_MIN_FEE: u64 = 1000;
const FIRST_ROUND: u64 = 1000;

/// How the simulator answers confirmation requests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Script {
    /// Commit every known group after `rounds` rounds.
    ConfirmAfter(u64),
    /// Keep every group pending.
    NeverConfirm,
    /// Drop every group with a pool error.
    PoolError(String),
}

/// A group accepted by the simulator.
#[derive(Debug, Clone)]
pub struct Submission {
    /// Raw bytes as submitted.
    pub bytes: Bytes,
    /// Ids of the group members, in order.
    pub tx_ids: Vec<String>,
    /// Round the group arrived in.
    pub round: u64,
}

#[derive(Debug)]
struct State {
    round: u64,
    submissions: Vec<Submission>,
    submit_calls: usize,
    pending: HashMap<String, u64>,
}

/// Ledger that lives entirely in process.
#[derive(Debug)]
pub struct InMemoryLedger {
    genesis_id: String,
    genesis_hash: [u8; 32],
    fee_per_byte: u64,
    min_fee: u64,
    params_error: Option<String>,
    submit_error: Option<String>,
    script: Script,
    state: Mutex<State>,
    feed: Sender<Submission>,
}

impl Default for InMemoryLedger {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryLedger {
    /// Healthy test-network ledger that commits on the next round.
    pub fn new() -> Self {
        let (feed, _) = broadcast::channel(64);
        Self {
            genesis_id: DEFAULT_GENESIS_ID.to_string(),
            genesis_hash: sha512_256(b"genesis", DEFAULT_GENESIS_ID.as_bytes()),
            fee_per_byte: 0,
            min_fee: DEFAULT_MIN_FEE,
            params_error: None,
            submit_error: None,
            script: Script::ConfirmAfter(1),
            state: Mutex::new(State {
                round: FIRST_ROUND,
                submissions: Vec::new(),
                submit_calls: 0,
                pending: HashMap::new(),
            }),
            feed,
        }
    }

    /// Report a different genesis id.
    pub fn with_genesis_id(mut self, genesis_id: impl Into<String>) -> Self {
        self.genesis_id = genesis_id.into();
        self
    }

    /// Charge `fee_per_byte` with a floor of `min_fee`.
    pub fn with_fees(mut self, fee_per_byte: u64, min_fee: u64) -> Self {
        self.fee_per_byte = fee_per_byte;
        self.min_fee = min_fee;
        self
    }

    /// Make every params request fail.
    pub fn failing_params(mut self, reason: impl Into<String>) -> Self {
        self.params_error = Some(reason.into());
        self
    }

    /// Refuse every submission outright.
    pub fn rejecting_submissions(mut self, reason: impl Into<String>) -> Self {
        self.submit_error = Some(reason.into());
        self
    }

    /// Keep every group pending forever.
    pub fn never_confirms(mut self) -> Self {
        self.script = Script::NeverConfirm;
        self
    }

    /// Drop every group from the pool with `reason`.
    pub fn pool_error(mut self, reason: impl Into<String>) -> Self {
        self.script = Script::PoolError(reason.into());
        self
    }

    /// Commit groups `rounds` rounds after they arrive.
    pub fn confirming_after(mut self, rounds: u64) -> Self {
        self.script = Script::ConfirmAfter(rounds);
        self
    }

    /// Current round.
    pub fn round(&self) -> u64 {
        self.state.lock().round
    }

    /// Accepted groups, oldest first.
    pub fn submissions(&self) -> Vec<Submission> {
        self.state.lock().submissions.clone()
    }

    /// Submission attempts, accepted or not.
    pub fn submit_calls(&self) -> usize {
        self.state.lock().submit_calls
    }

    /// Feed of accepted groups.
    pub fn subscribe(&self) -> Receiver<Submission> {
        self.feed.subscribe()
    }
}

#[async_trait]
impl LedgerClient for InMemoryLedger {
    async fn suggested_params(&self) -> ClientResult<SuggestedParams> {
        if let Some(reason) = &self.params_error {
            bail!("{reason}");
        }
        Ok(SuggestedParams::from_last_round(
            self.round(),
            self.fee_per_byte,
            self.min_fee,
            self.genesis_id.clone(),
            self.genesis_hash,
        ))
    }

    async fn compile_program(&self, source: &str) -> ClientResult<Vec<u8>> {
        assemble(source)
    }

    async fn submit_raw_group(&self, group: Bytes) -> ClientResult<String> {
        let mut state = self.state.lock();
        state.submit_calls += 1;
        if let Some(reason) = &self.submit_error {
            bail!("{reason}");
        }
        let tx_ids = group_tx_ids(&group)?;
        let first = tx_ids
            .first()
            .cloned()
            .ok_or_else(|| anyhow!("empty transaction group"))?;
        let round = state.round;
        for id in &tx_ids {
            state.pending.insert(id.clone(), round);
        }
        let submission = Submission {
            bytes: group,
            tx_ids,
            round,
        };
        state.submissions.push(submission.clone());
        drop(state);

        info!(tx_id = %first, round, "accepted group");
        let _ = self.feed.send(submission);
        Ok(first)
    }

    async fn wait_for_confirmation(
        &self,
        tx_id: &str,
        max_rounds: u64,
    ) -> ClientResult<Confirmation> {
        let mut state = self.state.lock();
        let last = state.round.saturating_add(max_rounds);
        let Some(&arrived) = state.pending.get(tx_id) else {
            debug!(%tx_id, "unknown transaction, reporting pending");
            state.round = last;
            return Ok(Confirmation::Pending);
        };
        match &self.script {
            Script::ConfirmAfter(rounds) => {
                let commit = arrived.saturating_add(*rounds);
                if commit <= last {
                    state.round = state.round.max(commit);
                    Ok(Confirmation::Confirmed { round: commit })
                } else {
                    state.round = last;
                    Ok(Confirmation::Pending)
                }
            }
            Script::NeverConfirm => {
                state.round = last;
                Ok(Confirmation::Pending)
            }
            Script::PoolError(reason) => Ok(Confirmation::Rejected {
                reason: reason.clone(),
            }),
        }
    }
}

/// Ids of every signed transaction in a concatenated group.
pub fn group_tx_ids(group: &[u8]) -> anyhow::Result<Vec<String>> {
    let mut rest = group;
    let mut ids = Vec::new();
    while !rest.is_empty() {
        if ids.len() == MAX_GROUP_SIZE {
            bail!("group holds more than {MAX_GROUP_SIZE} transactions");
        }
        let start = group.len() - rest.len();
        let entries = map_len(&mut rest)?;
        let mut body = None;
        for _ in 0..entries {
            let key = read_str(&mut rest)?;
            let value_start = group.len() - rest.len();
            skip_value(&mut rest)?;
            if key == b"txn" {
                body = Some(&group[value_start..group.len() - rest.len()]);
            }
        }
        let body = body.ok_or_else(|| anyhow!("signed transaction at byte {start} has no txn"))?;
        ids.push(TxId::from(sha512_256(b"TX", body)).to_string());
    }
    Ok(ids)
}

fn take<'a>(rd: &mut &'a [u8], n: usize) -> anyhow::Result<&'a [u8]> {
    if rd.len() < n {
        bail!("truncated msgpack");
    }
    let (head, tail) = rd.split_at(n);
    *rd = tail;
    Ok(head)
}

fn read_be(rd: &mut &[u8], width: usize) -> anyhow::Result<usize> {
    Ok(take(rd, width)?
        .iter()
        .fold(0usize, |acc, b| (acc << 8) | *b as usize))
}

fn read_marker(rd: &mut &[u8]) -> anyhow::Result<Marker> {
    Ok(Marker::from_u8(take(rd, 1)?[0]))
}

fn map_len(rd: &mut &[u8]) -> anyhow::Result<usize> {
    match read_marker(rd)? {
        Marker::FixMap(n) => Ok(n as usize),
        Marker::Map16 => read_be(rd, 2),
        Marker::Map32 => read_be(rd, 4),
        other => bail!("expected map, found {other:?}"),
    }
}

fn read_str<'a>(rd: &mut &'a [u8]) -> anyhow::Result<&'a [u8]> {
    let len = match read_marker(rd)? {
        Marker::FixStr(n) => n as usize,
        Marker::Str8 => read_be(rd, 1)?,
        Marker::Str16 => read_be(rd, 2)?,
        Marker::Str32 => read_be(rd, 4)?,
        other => bail!("expected string key, found {other:?}"),
    };
    take(rd, len)
}

fn skip_value(rd: &mut &[u8]) -> anyhow::Result<()> {
    let skip = match read_marker(rd)? {
        Marker::FixPos(_) | Marker::FixNeg(_) | Marker::Null | Marker::True | Marker::False => 0,
        Marker::U8 | Marker::I8 => 1,
        Marker::U16 | Marker::I16 => 2,
        Marker::U32 | Marker::I32 | Marker::F32 => 4,
        Marker::U64 | Marker::I64 | Marker::F64 => 8,
        Marker::FixStr(n) => n as usize,
        Marker::Str8 | Marker::Bin8 => read_be(rd, 1)?,
        Marker::Str16 | Marker::Bin16 => read_be(rd, 2)?,
        Marker::Str32 | Marker::Bin32 => read_be(rd, 4)?,
        Marker::FixArray(n) => return skip_values(rd, n as usize),
        Marker::Array16 => {
            let n = read_be(rd, 2)?;
            return skip_values(rd, n);
        }
        Marker::Array32 => {
            let n = read_be(rd, 4)?;
            return skip_values(rd, n);
        }
        Marker::FixMap(n) => return skip_values(rd, 2 * n as usize),
        Marker::Map16 => {
            let n = read_be(rd, 2)?;
            return skip_values(rd, 2 * n);
        }
        Marker::Map32 => {
            let n = read_be(rd, 4)?;
            return skip_values(rd, 2 * n);
        }
        other => bail!("unsupported msgpack marker {other:?}"),
    };
    take(rd, skip)?;
    Ok(())
}

fn skip_values(rd: &mut &[u8], n: usize) -> anyhow::Result<()> {
    for _ in 0..n {
        skip_value(rd)?;
    }
    Ok(())
}
