use std::fmt;
use std::str::FromStr;

use data_encoding::BASE32_NOPAD;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

use crate::codec::sha512_256;

/// Raw address width.
pub const ADDRESS_LEN: usize = 32;
/// Width of the textual form: base32 of the address plus a 4-byte checksum.
pub const ADDRESS_STRING_LEN: usize = 58;

const CHECKSUM_LEN: usize = 4;
const PROGRAM_DOMAIN: &[u8] = b"Program";

/// Textual address could not be decoded.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AddressError {
    /// Wrong number of characters.
    #[error(
        "address must be {expected} characters, got {0}",
        expected = ADDRESS_STRING_LEN
    )]
    Length(usize),
    /// Not upper-case RFC 4648 base32.
    #[error("address is not valid base32")]
    Base32,
    /// Checksum does not match the decoded bytes.
    #[error("address checksum mismatch")]
    Checksum,
}

/// 32-byte ledger account address.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Address([u8; ADDRESS_LEN]);

impl Address {
    /// The all-zero address, treated as "unset" by the wire format.
    pub const ZERO: Address = Address([0u8; ADDRESS_LEN]);

    /// Wrap raw bytes.
    pub const fn new(bytes: [u8; ADDRESS_LEN]) -> Self {
        Self(bytes)
    }

    /// Address of the account controlled by a logic program:
    /// `SHA-512/256("Program" || program)`.
    pub fn from_program(program: &[u8]) -> Self {
        Self(sha512_256(PROGRAM_DOMAIN, program))
    }

    /// Raw bytes.
    pub fn as_bytes(&self) -> &[u8; ADDRESS_LEN] {
        &self.0
    }

    /// True for [`Address::ZERO`].
    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; ADDRESS_LEN]
    }

    fn checksum(&self) -> [u8; CHECKSUM_LEN] {
        let digest = sha512_256(&[], &self.0);
        let mut out = [0u8; CHECKSUM_LEN];
        out.copy_from_slice(&digest[ADDRESS_LEN - CHECKSUM_LEN..]);
        out
    }
}

impl From<[u8; ADDRESS_LEN]> for Address {
    fn from(bytes: [u8; ADDRESS_LEN]) -> Self {
        Self(bytes)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut raw = [0u8; ADDRESS_LEN + CHECKSUM_LEN];
        raw[..ADDRESS_LEN].copy_from_slice(&self.0);
        raw[ADDRESS_LEN..].copy_from_slice(&self.checksum());
        f.write_str(&BASE32_NOPAD.encode(&raw))
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({self})")
    }
}

impl FromStr for Address {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.len() != ADDRESS_STRING_LEN {
            return Err(AddressError::Length(s.len()));
        }
        let raw = BASE32_NOPAD
            .decode(s.as_bytes())
            .map_err(|_| AddressError::Base32)?;
        if raw.len() != ADDRESS_LEN + CHECKSUM_LEN {
            return Err(AddressError::Base32);
        }
        let mut bytes = [0u8; ADDRESS_LEN];
        bytes.copy_from_slice(&raw[..ADDRESS_LEN]);
        let address = Self(bytes);
        if address.checksum()[..] != raw[ADDRESS_LEN..] {
            return Err(AddressError::Checksum);
        }
        Ok(address)
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const ZERO_TEXT: &str = "AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAY5HFKQ";

    #[test]
    fn zero_address_has_known_text_form() {
        assert_eq!(Address::ZERO.to_string(), ZERO_TEXT);
        assert_eq!(ZERO_TEXT.parse::<Address>().unwrap(), Address::ZERO);
    }

    #[test]
    fn program_address_matches_node_rule() {
        let program =
            hex::decode("0c2601010231203203123109320312103108141031011410311081011210").unwrap();
        assert_eq!(
            Address::from_program(&program).to_string(),
            "4XXSOZNJE2CGUV4VIVVKP5X46XHSUBZJ6WS3KPAFEP5RJICTALPKJSEKB4"
        );
    }

    #[test]
    fn corrupted_checksum_is_rejected() {
        let mut text = ZERO_TEXT.to_string();
        text.replace_range(57..58, "A");
        assert_eq!(text.parse::<Address>(), Err(AddressError::Checksum));
    }

    #[test]
    fn wrong_length_and_alphabet_are_rejected() {
        assert_eq!("ABC".parse::<Address>(), Err(AddressError::Length(3)));
        let lower = ZERO_TEXT.to_lowercase();
        assert_eq!(lower.parse::<Address>(), Err(AddressError::Base32));
    }

    #[test]
    fn serde_uses_text_form() {
        let json = serde_json::to_string(&Address::ZERO).unwrap();
        assert_eq!(json, format!("\"{ZERO_TEXT}\""));
        let back: Address = serde_json::from_str(&json).unwrap();
        assert!(back.is_zero());
    }

    proptest! {
        #[test]
        fn text_form_parses_back(bytes in any::<[u8; 32]>()) {
            let address = Address::new(bytes);
            let text = address.to_string();
            prop_assert_eq!(text.len(), ADDRESS_STRING_LEN);
            prop_assert_eq!(text.parse::<Address>().unwrap(), address);
        }
    }
}
