use std::sync::Arc;

use crate::charset;
use crate::config::ResolvedGpg;
use crate::document::{escape_leading_dashes, frame_payload, locate};
use crate::error::Result;
use crate::message::HeaderTemplate;
use crate::signing::{ClearsignBackend, GpgBackend, SigningAdapter, SigningIdentity};

/// Embeds a clearsign signature inside an HTML document.
///
/// Holds no mutable state; one signer may be shared across threads.
#[derive(Clone)]
pub struct HtmlSigner {
    adapter: SigningAdapter,
    identity: SigningIdentity,
    header: HeaderTemplate,
}

impl HtmlSigner {
    pub fn new(
        backend: Arc<dyn ClearsignBackend>,
        identity: SigningIdentity,
        header: HeaderTemplate,
    ) -> Self {
        Self {
            adapter: SigningAdapter::new(backend),
            identity,
            header,
        }
    }

    /// Signs through the gpg executable named by `config`.
    pub fn from_config(config: ResolvedGpg) -> Self {
        let backend = GpgBackend::new(config.binary, config.home);
        Self::new(Arc::new(backend), config.identity, config.header)
    }

    pub fn identity(&self) -> &SigningIdentity {
        &self.identity
    }

    /// Signs raw document bytes declared with `content_type`, returning
    /// bytes in the same charset.
    pub fn sign_html(&self, document: &[u8], content_type: Option<&str>) -> Result<Vec<u8>> {
        let charset = charset::resolve(content_type);
        let text = charset::decode(document, &charset)?;
        let signed = self.sign_text(&text, &charset)?;
        Ok(charset::encode(&signed, &charset))
    }

    /// Signs an already decoded document. `charset` is the encoding the
    /// document will be served in; the signature covers those bytes.
    pub fn sign_text(&self, document: &str, charset: &str) -> Result<String> {
        let split = locate(document)?;
        let body = escape_leading_dashes(split.body);
        let header = self.header.render(&self.identity);
        let payload = frame_payload(&header, &body);

        let signed_block = self.adapter.sign(&payload, &self.identity, charset)?;
        let signed = split.assemble(&signed_block);

        tracing::info!(
            keys = ?self.identity.keys(),
            body_len = split.body.len(),
            signed_len = signed.len(),
            "signed html document"
        );
        Ok(signed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    struct PrefixBackend;

    impl ClearsignBackend for PrefixBackend {
        fn clearsign_default_key(&self, payload: &[u8], _: &str) -> anyhow::Result<Vec<u8>> {
            Ok([b"SIGNED:".as_slice(), payload].concat())
        }

        fn clearsign_local_users(&self, payload: &[u8], _: &[String]) -> anyhow::Result<Vec<u8>> {
            Ok([b"MULTI:".as_slice(), payload].concat())
        }
    }

    fn signer(template: &str) -> HtmlSigner {
        HtmlSigner::new(
            Arc::new(PrefixBackend),
            SigningIdentity::single("0xTESTKEY"),
            HeaderTemplate::custom(template).unwrap(),
        )
    }

    #[test]
    fn splices_signed_block_inside_root() {
        let signed = signer("key {identity}")
            .sign_text("<html><body>Hello</body></html>", "utf-8")
            .unwrap();
        assert_eq!(
            signed,
            "<html><!--\nSIGNED:key 0xTESTKEY\n-->\n<body>Hello</body>\n<!----></html>"
        );
    }

    #[test]
    fn escapes_body_before_signing() {
        let signed = signer("{identity}")
            .sign_text("<html>\n-a\nb\n</html>", "utf-8")
            .unwrap();
        assert_eq!(
            signed,
            "<html><!--\nSIGNED:0xTESTKEY\n-->\n&#x2D;a\nb\n<!----></html>"
        );
    }

    #[test]
    fn malformed_document_never_reaches_backend() {
        struct PanickingBackend;
        impl ClearsignBackend for PanickingBackend {
            fn clearsign_default_key(&self, _: &[u8], _: &str) -> anyhow::Result<Vec<u8>> {
                panic!("backend must not be called")
            }
            fn clearsign_local_users(&self, _: &[u8], _: &[String]) -> anyhow::Result<Vec<u8>> {
                panic!("backend must not be called")
            }
        }

        let signer = HtmlSigner::new(
            Arc::new(PanickingBackend),
            SigningIdentity::single("K"),
            HeaderTemplate::default(),
        );
        let err = signer.sign_html(b"<p>no root</p>", None).unwrap_err();
        assert!(matches!(err, Error::MalformedDocument(_)));
    }

    #[test]
    fn output_keeps_declared_charset() {
        let document = b"<html>caf\xe9</html>";
        let signed = signer("{identity}")
            .sign_html(document, Some("text/html; charset=ISO-8859-1"))
            .unwrap();
        assert_eq!(
            signed,
            b"<html><!--\nSIGNED:0xTESTKEY\n-->\ncaf\xe9\n<!----></html>".to_vec()
        );
    }
}
