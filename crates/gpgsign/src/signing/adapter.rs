use std::sync::Arc;

use crate::charset;
use crate::error::{Error, Result};

use super::identity::SigningIdentity;
use super::signer::ClearsignBackend;

/// Chooses the backend invocation shape for an identity and converts
/// between document text and the bytes the backend signs.
#[derive(Clone)]
pub struct SigningAdapter {
    backend: Arc<dyn ClearsignBackend>,
}

impl SigningAdapter {
    pub fn new(backend: Arc<dyn ClearsignBackend>) -> Self {
        Self { backend }
    }

    /// Clearsigns `payload` as encoded in `charset`. Charsets that cannot
    /// hold ASCII armor are refused before the backend runs. Backend
    /// failures are surfaced unchanged as [`Error::Signing`]; nothing is
    /// retried.
    pub fn sign(
        &self,
        payload: &str,
        identity: &SigningIdentity,
        charset: &str,
    ) -> Result<String> {
        charset::ensure_signable(charset)?;
        let bytes = charset::encode(payload, charset);

        let signed = match identity {
            SigningIdentity::SingleKey(key) => {
                tracing::debug!(key = %key, "clearsigning with default key");
                self.backend.clearsign_default_key(&bytes, key)
            }
            SigningIdentity::MultiKey(keys) => {
                tracing::debug!(?keys, "clearsigning with multiple keys");
                self.backend.clearsign_local_users(&bytes, keys)
            }
        }
        .map_err(Error::Signing)?;

        let text = charset::decode(&signed, charset).map_err(|_| {
            Error::Signing(anyhow::anyhow!(
                "signed output is not valid {}",
                charset::encoding_for(charset).name()
            ))
        })?;
        Ok(text.into_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Debug, PartialEq)]
    enum Call {
        DefaultKey(String),
        LocalUsers(Vec<String>),
    }

    #[derive(Default)]
    struct RecordingBackend {
        calls: Mutex<Vec<Call>>,
    }

    impl ClearsignBackend for RecordingBackend {
        fn clearsign_default_key(&self, payload: &[u8], key: &str) -> anyhow::Result<Vec<u8>> {
            self.calls.lock().unwrap().push(Call::DefaultKey(key.to_string()));
            Ok(payload.to_vec())
        }

        fn clearsign_local_users(
            &self,
            payload: &[u8],
            keys: &[String],
        ) -> anyhow::Result<Vec<u8>> {
            self.calls.lock().unwrap().push(Call::LocalUsers(keys.to_vec()));
            Ok(payload.to_vec())
        }
    }

    struct FailingBackend;

    impl ClearsignBackend for FailingBackend {
        fn clearsign_default_key(&self, _: &[u8], _: &str) -> anyhow::Result<Vec<u8>> {
            anyhow::bail!("gpg: signing failed: Bad passphrase")
        }

        fn clearsign_local_users(&self, _: &[u8], _: &[String]) -> anyhow::Result<Vec<u8>> {
            anyhow::bail!("gpg: signing failed: No secret key")
        }
    }

    struct GarbageBackend;

    impl ClearsignBackend for GarbageBackend {
        fn clearsign_default_key(&self, _: &[u8], _: &str) -> anyhow::Result<Vec<u8>> {
            Ok(vec![0xff, 0xfe, 0xfd])
        }

        fn clearsign_local_users(&self, _: &[u8], _: &[String]) -> anyhow::Result<Vec<u8>> {
            Ok(vec![0xff, 0xfe, 0xfd])
        }
    }

    #[test]
    fn single_key_uses_default_key_path() {
        let backend = Arc::new(RecordingBackend::default());
        let adapter = SigningAdapter::new(backend.clone());
        adapter
            .sign("text", &SigningIdentity::single("KEY1"), "utf-8")
            .unwrap();
        assert_eq!(
            *backend.calls.lock().unwrap(),
            vec![Call::DefaultKey("KEY1".into())]
        );
    }

    #[test]
    fn multi_key_uses_local_users_path() {
        let backend = Arc::new(RecordingBackend::default());
        let adapter = SigningAdapter::new(backend.clone());
        let identity = SigningIdentity::multi(["KEY1", "KEY2"]).unwrap();
        adapter.sign("text", &identity, "utf-8").unwrap();
        assert_eq!(
            *backend.calls.lock().unwrap(),
            vec![Call::LocalUsers(vec!["KEY1".into(), "KEY2".into()])]
        );
    }

    #[test]
    fn payload_is_signed_in_document_charset() {
        struct BytesBackend;
        impl ClearsignBackend for BytesBackend {
            fn clearsign_default_key(&self, payload: &[u8], _: &str) -> anyhow::Result<Vec<u8>> {
                assert_eq!(payload, [0x63, 0x61, 0x66, 0xe9]);
                Ok(payload.to_vec())
            }
            fn clearsign_local_users(&self, _: &[u8], _: &[String]) -> anyhow::Result<Vec<u8>> {
                unreachable!()
            }
        }

        let adapter = SigningAdapter::new(Arc::new(BytesBackend));
        let signed = adapter
            .sign("café", &SigningIdentity::single("K"), "iso-8859-1")
            .unwrap();
        assert_eq!(signed, "café");
    }

    #[test]
    fn utf16_is_refused_before_the_backend_runs() {
        let backend = Arc::new(RecordingBackend::default());
        let adapter = SigningAdapter::new(backend.clone());
        let err = adapter
            .sign("text", &SigningIdentity::single("KEY1"), "utf-16")
            .unwrap_err();
        assert!(matches!(err, Error::MalformedDocument(_)));
        assert!(backend.calls.lock().unwrap().is_empty());
    }

    #[test]
    fn backend_failure_is_a_signing_error() {
        let adapter = SigningAdapter::new(Arc::new(FailingBackend));
        let err = adapter
            .sign("text", &SigningIdentity::single("KEY1"), "utf-8")
            .unwrap_err();
        match err {
            Error::Signing(source) => assert!(source.to_string().contains("Bad passphrase")),
            other => panic!("expected Signing, got {other:?}"),
        }
    }

    #[test]
    fn undecodable_output_is_a_signing_error() {
        let adapter = SigningAdapter::new(Arc::new(GarbageBackend));
        let err = adapter
            .sign("text", &SigningIdentity::single("KEY1"), "utf-8")
            .unwrap_err();
        assert!(matches!(err, Error::Signing(_)));
    }
}
