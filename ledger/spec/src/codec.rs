//! Canonical msgpack: sorted keys, zero values omitted, smallest int/str/bin
//! encodings. Same rules the node uses before hashing.

use std::collections::BTreeMap;

use rmp::encode::{self, ValueWriteError};
use sha2::{Digest, Sha512_256};
use thiserror::Error;

/// Failure while producing the wire encoding.
#[derive(Debug, Error)]
pub enum EncodeError {
    /// The msgpack writer rejected a value.
    #[error("msgpack encoding failed: {0}")]
    Msgpack(#[from] ValueWriteError),
    /// A transaction group must hold between 1 and 16 transactions.
    #[error("transaction group size {0} is outside 1..=16")]
    GroupSize(usize),
}

/// SHA-512/256 over `domain || data`.
pub fn sha512_256(domain: &[u8], data: &[u8]) -> [u8; 32] {
    let mut hasher = Sha512_256::new();
    hasher.update(domain);
    hasher.update(data);
    hasher.finalize().into()
}

/// Map builder that keeps fields sorted and drops empty ones.
#[derive(Debug, Default)]
pub(crate) struct CanonicalMap {
    fields: BTreeMap<&'static str, Vec<u8>>,
}

impl CanonicalMap {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn uint(&mut self, key: &'static str, value: u64) -> Result<&mut Self, EncodeError> {
        if value != 0 {
            let mut buf = Vec::with_capacity(9);
            encode::write_uint(&mut buf, value)?;
            self.fields.insert(key, buf);
        }
        Ok(self)
    }

    pub(crate) fn str(&mut self, key: &'static str, value: &str) -> Result<&mut Self, EncodeError> {
        if !value.is_empty() {
            let mut buf = Vec::with_capacity(value.len() + 2);
            encode::write_str(&mut buf, value)?;
            self.fields.insert(key, buf);
        }
        Ok(self)
    }

    pub(crate) fn bin(
        &mut self,
        key: &'static str,
        value: &[u8],
    ) -> Result<&mut Self, EncodeError> {
        if !value.is_empty() {
            let mut buf = Vec::with_capacity(value.len() + 5);
            encode::write_bin(&mut buf, value)?;
            self.fields.insert(key, buf);
        }
        Ok(self)
    }

    /// Fixed 32-byte digests are omitted when all zero.
    pub(crate) fn digest(
        &mut self,
        key: &'static str,
        value: &[u8; 32],
    ) -> Result<&mut Self, EncodeError> {
        if value.iter().any(|b| *b != 0) {
            self.bin(key, value)?;
        }
        Ok(self)
    }

    pub(crate) fn bin_array<T: AsRef<[u8]>>(
        &mut self,
        key: &'static str,
        values: &[T],
    ) -> Result<&mut Self, EncodeError> {
        if !values.is_empty() {
            let mut buf = Vec::new();
            encode::write_array_len(&mut buf, values.len() as u32)?;
            for value in values {
                encode::write_bin(&mut buf, value.as_ref())?;
            }
            self.fields.insert(key, buf);
        }
        Ok(self)
    }

    pub(crate) fn map(
        &mut self,
        key: &'static str,
        value: &CanonicalMap,
    ) -> Result<&mut Self, EncodeError> {
        if !value.fields.is_empty() {
            self.fields.insert(key, value.encode()?);
        }
        Ok(self)
    }

    pub(crate) fn encode(&self) -> Result<Vec<u8>, EncodeError> {
        let body: usize = self
            .fields
            .iter()
            .map(|(k, v)| k.len() + 1 + v.len())
            .sum();
        let mut out = Vec::with_capacity(body + 3);
        encode::write_map_len(&mut out, self.fields.len() as u32)?;
        for (key, value) in &self.fields {
            encode::write_str(&mut out, key)?;
            out.extend_from_slice(value);
        }
        Ok(out)
    }
}
