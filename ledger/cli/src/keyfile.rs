//! Falcon key files: JSON with hex `public_key` and `private_key`.

use std::io::Write;
use std::path::Path;

use anyhow::{anyhow, Context};
use pqledger_core::{FalconPrivateKey, FalconPublicKey};
use serde::Deserialize;

#[derive(Debug, Default, Deserialize)]
struct KeyFileJson {
    #[serde(default)]
    public_key: String,
    #[serde(default)]
    private_key: String,
}

/// Keys found in a key file. Either half may be absent.
#[derive(Debug)]
pub struct KeyFile {
    pub public_key: Option<FalconPublicKey>,
    pub private_key: Option<FalconPrivateKey>,
}

impl KeyFile {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        Self::parse(&raw)
    }

    pub fn parse(raw: &str) -> anyhow::Result<Self> {
        let json: KeyFileJson = serde_json::from_str(raw).context("invalid JSON")?;
        let public_key = match json.public_key.trim() {
            "" => None,
            digits => Some(FalconPublicKey::from_slice(
                &parse_hex(digits).context("invalid public_key hex")?,
            )?),
        };
        let private_key = match json.private_key.trim() {
            "" => None,
            digits => Some(FalconPrivateKey::from_slice(
                &parse_hex(digits).context("invalid private_key hex")?,
            )?),
        };
        Ok(Self {
            public_key,
            private_key,
        })
    }

    pub fn require_public(&self, path: &Path) -> anyhow::Result<&FalconPublicKey> {
        self.public_key
            .as_ref()
            .ok_or_else(|| anyhow!("public key not found in {}", path.display()))
    }
}

/// Hex with an optional `0x` prefix; an odd digit count gets a leading zero.
pub fn parse_hex(s: &str) -> anyhow::Result<Vec<u8>> {
    let s = s.trim();
    let s = s
        .strip_prefix("0x")
        .or_else(|| s.strip_prefix("0X"))
        .unwrap_or(s);
    if s.len() % 2 == 1 {
        return Ok(hex::decode(format!("0{s}"))?);
    }
    Ok(hex::decode(s)?)
}

/// Replace `path` in one step, owner-readable only.
pub fn write_atomic(path: &Path, data: &[u8]) -> anyhow::Result<()> {
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    tmp.write_all(data)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pqledger_core::{FALCON_PRIVATE_KEY_LEN, FALCON_PUBLIC_KEY_LEN};

    #[test]
    fn hex_forms() {
        assert_eq!(parse_hex("0xABcd").unwrap(), vec![0xab, 0xcd]);
        assert_eq!(parse_hex(" fff ").unwrap(), vec![0x0f, 0xff]);
        assert!(parse_hex("").unwrap().is_empty());
        assert!(parse_hex("zz").is_err());
    }

    #[test]
    fn parses_both_halves() {
        let raw = format!(
            r#"{{"public_key":"0x{}","private_key":"{}"}}"#,
            "00".repeat(FALCON_PUBLIC_KEY_LEN),
            "11".repeat(FALCON_PRIVATE_KEY_LEN)
        );
        let keys = KeyFile::parse(&raw).unwrap();
        assert_eq!(keys.public_key.unwrap().as_bytes()[0], 0);
        assert_eq!(keys.private_key.unwrap().as_bytes()[0], 0x11);
    }

    #[test]
    fn missing_and_malformed_keys() {
        let keys = KeyFile::parse("{}").unwrap();
        assert!(keys.public_key.is_none());
        assert!(keys.require_public(Path::new("k.json")).is_err());

        let err = KeyFile::parse(r#"{"public_key":"abcd"}"#).unwrap_err();
        assert!(err.to_string().contains("1793"));
        assert!(KeyFile::parse("not json").is_err());
    }

    #[test]
    fn atomic_write_replaces_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("addr.txt");
        std::fs::write(&path, "old").unwrap();
        write_atomic(&path, b"new\n").unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "new\n");
    }
}
