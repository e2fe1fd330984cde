//! Falcon signing through an external `falcon` binary.

use std::path::PathBuf;
use std::process::Stdio;

use anyhow::{bail, Context};
use async_trait::async_trait;
use pqledger_core::{FalconPublicKey, FalconSigner};
use tokio::process::Command;
use tracing::debug;

use crate::keyfile::parse_hex;

/// Runs `<program> sign --key <file> --msg <hex> --hex` and reads the
/// hex signature from stdout.
#[derive(Debug, Clone)]
pub struct CommandSigner {
    program: PathBuf,
    key_file: PathBuf,
    public_key: FalconPublicKey,
}

impl CommandSigner {
    pub fn new(
        program: impl Into<PathBuf>,
        key_file: impl Into<PathBuf>,
        public_key: FalconPublicKey,
    ) -> Self {
        Self {
            program: program.into(),
            key_file: key_file.into(),
            public_key,
        }
    }
}

#[async_trait]
impl FalconSigner for CommandSigner {
    fn public_key(&self) -> &FalconPublicKey {
        &self.public_key
    }

    async fn sign(&self, message: &[u8]) -> anyhow::Result<Vec<u8>> {
        debug!(program = %self.program.display(), "invoking external signer");
        let output = Command::new(&self.program)
            .arg("sign")
            .arg("--key")
            .arg(&self.key_file)
            .arg("--msg")
            .arg(hex::encode(message))
            .arg("--hex")
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .with_context(|| format!("running {}", self.program.display()))?;
        if !output.status.success() {
            bail!(
                "{} exited with {}: {}",
                self.program.display(),
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }
        let stdout = String::from_utf8(output.stdout).context("signer output is not UTF-8")?;
        parse_hex(&stdout).context("signer output is not hex")
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use pqledger_core::FALCON_PUBLIC_KEY_LEN;
    use std::os::unix::fs::PermissionsExt;

    fn script(dir: &std::path::Path, body: &str) -> PathBuf {
        let path = dir.join("falcon");
        std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    fn key() -> FalconPublicKey {
        FalconPublicKey::new([0u8; FALCON_PUBLIC_KEY_LEN])
    }

    #[tokio::test]
    async fn passes_message_as_hex() {
        let dir = tempfile::tempdir().unwrap();
        // Echo the --msg argument back as the signature.
        let program = script(
            dir.path(),
            r#"[ "$1" = sign ] && [ "$6" = --hex ] && echo "$5""#,
        );
        let signer = CommandSigner::new(program, dir.path().join("k.json"), key());
        assert_eq!(signer.sign(&[0xde, 0xad]).await.unwrap(), vec![0xde, 0xad]);
    }

    #[tokio::test]
    async fn failing_signer_reports_stderr() {
        let dir = tempfile::tempdir().unwrap();
        let program = script(dir.path(), "echo 'bad key' >&2; exit 3");
        let signer = CommandSigner::new(program, dir.path().join("k.json"), key());
        let err = signer.sign(b"m").await.unwrap_err();
        assert!(err.to_string().contains("bad key"));
    }

    #[tokio::test]
    async fn missing_program() {
        let signer = CommandSigner::new("/nonexistent/falcon", "k.json", key());
        assert!(signer.sign(b"m").await.is_err());
    }
}
