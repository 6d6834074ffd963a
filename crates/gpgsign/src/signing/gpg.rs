use std::ffi::OsString;
use std::io::Write;
use std::path::PathBuf;
use std::process::{Command, Stdio};

use anyhow::{Context, Result, anyhow, bail};

use super::signer::ClearsignBackend;

/// Digest algorithm passed to the signing tool.
pub const DIGEST_ALGORITHM: &str = "SHA512";

/// Clearsigns by running a GnuPG executable once per document.
///
/// Concurrent invocations are independent processes; serializing access
/// to a key ring that cannot handle them is up to the caller.
#[derive(Debug, Clone)]
pub struct GpgBackend {
    binary: PathBuf,
    home: PathBuf,
}

impl GpgBackend {
    pub fn new(binary: impl Into<PathBuf>, home: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
            home: home.into(),
        }
    }

    /// Full argument list for one invocation, identity arguments last.
    pub fn arguments(&self, identity_args: Vec<OsString>) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec!["--homedir".into(), self.home.clone().into()];
        args.extend(
            [
                "--batch",
                "--no-tty",
                "--yes",
                "--armor",
                "--clearsign",
                "--digest-algo",
                DIGEST_ALGORITHM,
            ]
            .map(OsString::from),
        );
        args.extend(identity_args);
        args
    }

    fn run(&self, payload: &[u8], identity_args: Vec<OsString>) -> Result<Vec<u8>> {
        let args = self.arguments(identity_args);
        tracing::debug!(binary = %self.binary.display(), ?args, "invoking gpg");

        let mut child = Command::new(&self.binary)
            .args(&args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .with_context(|| format!("spawning {}", self.binary.display()))?;

        let mut stdin = child.stdin.take().context("gpg stdin was not captured")?;
        let payload = payload.to_vec();
        // Feed stdin from its own thread so a large payload cannot deadlock
        // against gpg filling its stdout pipe.
        let writer = std::thread::spawn(move || stdin.write_all(&payload));

        let output = child.wait_with_output().context("waiting for gpg")?;
        let written = writer
            .join()
            .map_err(|_| anyhow!("gpg stdin writer panicked"))?;

        if !output.status.success() {
            bail!(
                "gpg exited with {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }
        written.context("writing payload to gpg")?;

        Ok(output.stdout)
    }
}

impl ClearsignBackend for GpgBackend {
    fn clearsign_default_key(&self, payload: &[u8], key: &str) -> Result<Vec<u8>> {
        self.run(payload, vec!["--default-key".into(), key.into()])
    }

    fn clearsign_local_users(&self, payload: &[u8], keys: &[String]) -> Result<Vec<u8>> {
        let identity_args = keys
            .iter()
            .flat_map(|key| [OsString::from("--local-user"), OsString::from(key)])
            .collect();
        self.run(payload, identity_args)
    }
}
