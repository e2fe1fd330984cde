//! Signing, submission and confirmation of a group.

use bytes::Bytes;
use futures::future::{AbortRegistration, Abortable};
use pqledger_spec::{encode_group, Address, SignedTransaction, TxId};
use tracing::{info, warn};

use crate::client::{Confirmation, FalconSigner, LedgerClient};
use crate::derive::{search, Derivation};
use crate::error::ProtocolError;
use crate::group::{build_group, SendOptions, TransactionGroup};
use crate::program::filler_logic_sig;

/// Encoded group ready for broadcast.
#[derive(Debug, Clone)]
pub struct SignedGroup {
    /// Signed transactions concatenated in group order.
    pub bytes: Bytes,
    /// Id of the intended payment.
    pub tx_id: TxId,
}

/// Sign the intended payment with Falcon and the fillers with the filler
/// program, then encode the whole group.
pub async fn sign_group<S: FalconSigner + ?Sized>(
    group: &TransactionGroup,
    derivation: &Derivation,
    signer: &S,
) -> Result<SignedGroup, ProtocolError> {
    let intended = group.intended();
    if intended.sender != derivation.address {
        return Err(ProtocolError::SignatureFailure(anyhow::anyhow!(
            "payment sender {} is not the derived account {}",
            intended.sender,
            derivation.address
        )));
    }
    let tx_id = intended.id()?;
    let signature = signer
        .sign(tx_id.as_bytes())
        .await
        .map_err(ProtocolError::SignatureFailure)?;
    if signature.is_empty() {
        return Err(ProtocolError::SignatureFailure(anyhow::anyhow!(
            "signer returned an empty signature"
        )));
    }

    let mut signed = Vec::with_capacity(group.len());
    let lsig = derivation.program.logic_sig(signature);
    signed.push(SignedTransaction::new(intended.clone(), lsig));
    for filler in group.fillers() {
        signed.push(SignedTransaction::new(filler.clone(), filler_logic_sig()));
    }
    let bytes = encode_group(&signed)?;
    Ok(SignedGroup {
        bytes: Bytes::from(bytes),
        tx_id,
    })
}

/// Sign, submit as one unit, and wait up to `max_rounds` for the commit.
pub async fn sign_and_submit<C, S>(
    client: &C,
    group: &TransactionGroup,
    derivation: &Derivation,
    signer: &S,
    max_rounds: u64,
) -> Result<TxId, ProtocolError>
where
    C: LedgerClient + ?Sized,
    S: FalconSigner + ?Sized,
{
    let SignedGroup { bytes, tx_id } = sign_group(group, derivation, signer).await?;
    let size = bytes.len();
    let reported = client
        .submit_raw_group(bytes)
        .await
        .map_err(ProtocolError::SubmissionRejected)?;
    let id = tx_id.to_string();
    if !reported.is_empty() && reported != id {
        warn!(%reported, expected = %id, "node reported a different transaction id");
    }
    info!(tx_id = %id, size, "submitted group");

    match client
        .wait_for_confirmation(&id, max_rounds)
        .await
        .map_err(ProtocolError::ConfirmationUnavailable)?
    {
        Confirmation::Confirmed { round } => {
            info!(tx_id = %id, round, "confirmed");
            Ok(tx_id)
        }
        Confirmation::Rejected { reason } => {
            Err(ProtocolError::SubmissionRejected(anyhow::anyhow!(reason)))
        }
        Confirmation::Pending => Err(ProtocolError::ConfirmationTimeout {
            tx_id: id,
            rounds: max_rounds,
        }),
    }
}

async fn run<C, S>(
    client: &C,
    signer: &S,
    to: Address,
    amount: u64,
    options: &SendOptions,
) -> Result<TxId, ProtocolError>
where
    C: LedgerClient + ?Sized,
    S: FalconSigner + ?Sized,
{
    let derivation = search(signer.public_key())?;
    let group = build_group(client, derivation.address, to, amount, options).await?;
    sign_and_submit(client, &group, &derivation, signer, options.max_rounds).await
}

/// Pay `amount` microAlgos to `to` from the signer's Falcon account.
///
/// When `options.deadline` is set and elapses first, the in-flight call is
/// dropped and the result is [`ProtocolError::Cancelled`].
pub async fn send<C, S>(
    client: &C,
    signer: &S,
    to: Address,
    amount: u64,
    options: &SendOptions,
) -> Result<TxId, ProtocolError>
where
    C: LedgerClient + ?Sized,
    S: FalconSigner + ?Sized,
{
    match options.deadline {
        Some(deadline) => tokio::time::timeout(deadline, run(client, signer, to, amount, options))
            .await
            .map_err(|_| ProtocolError::Cancelled("deadline exceeded"))?,
        None => run(client, signer, to, amount, options).await,
    }
}

/// [`send`] that also stops when the paired `AbortHandle` fires.
pub async fn send_abortable<C, S>(
    client: &C,
    signer: &S,
    to: Address,
    amount: u64,
    options: &SendOptions,
    registration: AbortRegistration,
) -> Result<TxId, ProtocolError>
where
    C: LedgerClient + ?Sized,
    S: FalconSigner + ?Sized,
{
    Abortable::new(send(client, signer, to, amount, options), registration)
        .await
        .map_err(|_| ProtocolError::Cancelled("aborted"))?
}
