use crate::address::Address;
use crate::codec::{CanonicalMap, EncodeError};
use crate::transaction::{Transaction, TxId};

/// Logic signature: a program plus the arguments it is evaluated with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogicSig {
    /// Program bytecode.
    pub program: Vec<u8>,
    /// Arguments available to the program as `arg N`.
    pub args: Vec<Vec<u8>>,
}

impl LogicSig {
    /// Logic signature without arguments.
    pub fn new(program: Vec<u8>) -> Self {
        Self {
            program,
            args: Vec::new(),
        }
    }

    /// Same program with `args` attached.
    pub fn with_args(self, args: Vec<Vec<u8>>) -> Self {
        Self { args, ..self }
    }

    /// Account controlled by this program.
    pub fn address(&self) -> Address {
        Address::from_program(&self.program)
    }

    fn to_map(&self) -> Result<CanonicalMap, EncodeError> {
        let mut map = CanonicalMap::new();
        map.bin_array("arg", &self.args)?.bin("l", &self.program)?;
        Ok(map)
    }
}

/// Transaction authorized by a logic signature.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedTransaction {
    /// Authorized transaction.
    pub txn: Transaction,
    /// Authorizing program and arguments.
    pub lsig: LogicSig,
}

impl SignedTransaction {
    /// Pair a transaction with its logic signature.
    pub fn new(txn: Transaction, lsig: LogicSig) -> Self {
        Self { txn, lsig }
    }

    /// Id of the wrapped transaction.
    pub fn id(&self) -> Result<TxId, EncodeError> {
        self.txn.id()
    }

    /// Wire encoding accepted by the node's raw-transaction endpoint.
    ///
    /// The program address is the sender here, so no `sgnr` field is written.
    pub fn encode(&self) -> Result<Vec<u8>, EncodeError> {
        let mut map = CanonicalMap::new();
        map.map("lsig", &self.lsig.to_map()?)?
            .map("txn", &self.txn.to_map()?)?;
        map.encode()
    }
}

/// Concatenate signed transactions in group order.
pub fn encode_group(signed: &[SignedTransaction]) -> Result<Vec<u8>, EncodeError> {
    let mut out = Vec::new();
    for stxn in signed {
        out.extend_from_slice(&stxn.encode()?);
    }
    Ok(out)
}
