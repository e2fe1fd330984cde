//! Falcon-1024 key material. Opaque fixed-size blobs; the lattice primitive
//! itself lives outside this crate.

use std::fmt;

use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::ProtocolError;

/// Falcon-1024 public key size.
pub const FALCON_PUBLIC_KEY_LEN: usize = 1793;
/// Falcon-1024 private key size.
pub const FALCON_PRIVATE_KEY_LEN: usize = 2305;

/// Falcon-1024 public key.
#[derive(Clone, PartialEq, Eq)]
pub struct FalconPublicKey([u8; FALCON_PUBLIC_KEY_LEN]);

impl FalconPublicKey {
    /// Wrap an exactly-sized key.
    pub const fn new(bytes: [u8; FALCON_PUBLIC_KEY_LEN]) -> Self {
        Self(bytes)
    }

    /// Copy a key out of a slice. Any other length is rejected, never
    /// truncated or padded.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, ProtocolError> {
        let array: [u8; FALCON_PUBLIC_KEY_LEN] =
            bytes.try_into().map_err(|_| ProtocolError::InvalidKeySize {
                what: "public key",
                expected: FALCON_PUBLIC_KEY_LEN,
                actual: bytes.len(),
            })?;
        Ok(Self(array))
    }

    /// Raw key bytes.
    pub fn as_bytes(&self) -> &[u8; FALCON_PUBLIC_KEY_LEN] {
        &self.0
    }
}

impl TryFrom<&[u8]> for FalconPublicKey {
    type Error = ProtocolError;

    fn try_from(bytes: &[u8]) -> Result<Self, Self::Error> {
        Self::from_slice(bytes)
    }
}

impl fmt::Debug for FalconPublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FalconPublicKey({}..)", hex::encode(&self.0[..8]))
    }
}

/// Falcon-1024 private key. Wiped on drop and never printed.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct FalconPrivateKey([u8; FALCON_PRIVATE_KEY_LEN]);

impl FalconPrivateKey {
    /// Copy a key out of a slice; any other length is rejected.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, ProtocolError> {
        let array: [u8; FALCON_PRIVATE_KEY_LEN] =
            bytes.try_into().map_err(|_| ProtocolError::InvalidKeySize {
                what: "private key",
                expected: FALCON_PRIVATE_KEY_LEN,
                actual: bytes.len(),
            })?;
        Ok(Self(array))
    }

    /// Raw key bytes.
    pub fn as_bytes(&self) -> &[u8; FALCON_PRIVATE_KEY_LEN] {
        &self.0
    }
}

impl fmt::Debug for FalconPrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("FalconPrivateKey(..)")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn public_key_rejects_wrong_sizes() {
        for len in [
            0,
            FALCON_PUBLIC_KEY_LEN - 1,
            FALCON_PUBLIC_KEY_LEN + 1,
            FALCON_PRIVATE_KEY_LEN,
        ] {
            let err = FalconPublicKey::from_slice(&vec![0u8; len]).unwrap_err();
            assert!(err.to_string().contains("expected 1793 bytes"), "{err}");
            match err {
                ProtocolError::InvalidKeySize { actual, .. } => assert_eq!(actual, len),
                other => panic!("unexpected error {other:?}"),
            }
        }
    }

    #[test]
    fn public_key_keeps_bytes_verbatim() {
        let bytes: Vec<u8> = (0..FALCON_PUBLIC_KEY_LEN).map(|i| i as u8).collect();
        let pk = FalconPublicKey::try_from(bytes.as_slice()).unwrap();
        assert_eq!(&pk.as_bytes()[..], &bytes[..]);
    }

    #[test]
    fn private_key_debug_hides_material() {
        let sk = FalconPrivateKey::from_slice(&[0x5a; FALCON_PRIVATE_KEY_LEN]).unwrap();
        assert_eq!(format!("{sk:?}"), "FalconPrivateKey(..)");
        assert!(FalconPrivateKey::from_slice(&[0u8; 10]).is_err());
    }
}
