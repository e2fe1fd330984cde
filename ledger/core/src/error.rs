//! Error taxonomy. Every variant names the phase that failed; nothing in the
//! crate retries or recovers locally.

use std::fmt;

use pqledger_spec::EncodeError;
use thiserror::Error;

use crate::derive::MAX_COUNTER_TRIES;

/// Pipeline phase an error came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Program synthesis and address derivation.
    Derive,
    /// Parameter fetch and group construction.
    Build,
    /// Falcon signing and group encoding.
    Sign,
    /// Raw group submission.
    Submit,
    /// Waiting for the group to commit.
    Confirm,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Phase::Derive => "derive",
            Phase::Build => "build",
            Phase::Sign => "sign",
            Phase::Submit => "submit",
            Phase::Confirm => "confirm",
        })
    }
}

/// Failure of a derivation or send operation.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// Key material of the wrong length.
    #[error("invalid {what} size: expected {expected} bytes, got {actual}")]
    InvalidKeySize {
        /// Which key was malformed.
        what: &'static str,
        /// Required length.
        expected: usize,
        /// Supplied length.
        actual: usize,
    },
    /// Every counter produced an address on the curve; the key is unsuitable.
    #[error(
        "unsuitable Falcon public key: all {tries} counters give an on-curve address",
        tries = MAX_COUNTER_TRIES
    )]
    DerivationExhausted,
    /// The node compiler rejected the rendered program source.
    #[error("compiling control program with counter {counter} failed")]
    CompileFailed {
        /// Counter substituted into the source.
        counter: u8,
        /// Compiler or transport error.
        #[source]
        source: anyhow::Error,
    },
    /// Payment amount must be positive.
    #[error("amount must be greater than zero")]
    InvalidAmount,
    /// Suggested parameters could not be fetched.
    #[error("network parameters unavailable")]
    NetworkParamsUnavailable(#[source] anyhow::Error),
    /// The node serves a different network than the one requested.
    #[error("node reports genesis {actual}, expected {expected}")]
    NetworkMismatch {
        /// Genesis id of the requested network.
        expected: &'static str,
        /// Genesis id the node reported.
        actual: String,
    },
    /// Wire encoding failed.
    #[error(transparent)]
    Encoding(#[from] EncodeError),
    /// The Falcon signer failed or returned nothing usable.
    #[error("Falcon signing failed")]
    SignatureFailure(#[source] anyhow::Error),
    /// The node refused the group or dropped it from its pool.
    #[error("submission rejected")]
    SubmissionRejected(#[source] anyhow::Error),
    /// The group was not confirmed within the round bound.
    #[error("transaction {tx_id} not confirmed after {rounds} rounds")]
    ConfirmationTimeout {
        /// Id of the intended transaction.
        tx_id: String,
        /// Rounds waited.
        rounds: u64,
    },
    /// Confirmation status could not be read.
    #[error("confirmation status unavailable")]
    ConfirmationUnavailable(#[source] anyhow::Error),
    /// Aborted by the caller or by the deadline.
    #[error("operation cancelled: {0}")]
    Cancelled(&'static str),
}

impl ProtocolError {
    /// Phase that produced the error. `Cancelled` is reported as `Submit`
    /// because the abort can land anywhere in flight.
    pub fn phase(&self) -> Phase {
        match self {
            ProtocolError::InvalidKeySize { .. }
            | ProtocolError::DerivationExhausted
            | ProtocolError::CompileFailed { .. } => Phase::Derive,
            ProtocolError::InvalidAmount
            | ProtocolError::NetworkParamsUnavailable(_)
            | ProtocolError::NetworkMismatch { .. } => Phase::Build,
            ProtocolError::Encoding(_) | ProtocolError::SignatureFailure(_) => Phase::Sign,
            ProtocolError::SubmissionRejected(_) | ProtocolError::Cancelled(_) => Phase::Submit,
            ProtocolError::ConfirmationTimeout { .. }
            | ProtocolError::ConfirmationUnavailable(_) => Phase::Confirm,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_failure() {
        let err = ProtocolError::NetworkParamsUnavailable(anyhow::anyhow!("connection refused"));
        assert_eq!(err.to_string(), "network parameters unavailable");
        assert_eq!(err.phase(), Phase::Build);

        let err = ProtocolError::ConfirmationTimeout {
            tx_id: "ABC".into(),
            rounds: 9,
        };
        assert_eq!(err.to_string(), "transaction ABC not confirmed after 9 rounds");
        assert_eq!(err.phase().to_string(), "confirm");
    }

    #[test]
    fn cause_chain_prints_once() {
        let cause = anyhow::anyhow!("connection refused").context("algod unreachable");
        let err = anyhow::Error::new(ProtocolError::NetworkParamsUnavailable(cause));
        let rendered = format!("{err:#}");
        assert_eq!(
            rendered,
            "network parameters unavailable: algod unreachable: connection refused"
        );
        assert_eq!(rendered.matches("connection refused").count(), 1);

        let err = ProtocolError::CompileFailed {
            counter: 3,
            source: anyhow::anyhow!("bad opcode"),
        };
        assert_eq!(
            format!("{:#}", anyhow::Error::new(err)),
            "compiling control program with counter 3 failed: bad opcode"
        );
    }

    #[test]
    fn exhaustion_mentions_bound() {
        assert!(ProtocolError::DerivationExhausted.to_string().contains("256"));
    }
}
