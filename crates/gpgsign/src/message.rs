use crate::error::{Error, Result};
use crate::signing::SigningIdentity;

/// Placeholder replaced with the signing identity.
pub const IDENTITY_PLACEHOLDER: &str = "{identity}";

const DEFAULT_TEMPLATE: &str = "\
This page content is PGP-signed until the final \"END PGP SIGNATURE\" line.

You can verify this page by running `curl $THIS_URL | gpg`
or by copying-and-pasting this entire source into PGP or something similar.
The signed text is the page source exactly as served: lines of the page
that begin with a hyphen are encoded as &#x2D; before signing.
This page is signed with the following PGP key:
{identity}";

/// Disclosure message placed ahead of the signed body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderTemplate {
    template: String,
}

impl Default for HeaderTemplate {
    fn default() -> Self {
        Self {
            template: DEFAULT_TEMPLATE.to_string(),
        }
    }
}

impl HeaderTemplate {
    /// Accepts a custom template. It must contain [`IDENTITY_PLACEHOLDER`]
    /// exactly once.
    pub fn custom(template: impl Into<String>) -> Result<Self> {
        let template = template.into();
        match template.matches(IDENTITY_PLACEHOLDER).count() {
            1 => Ok(Self { template }),
            n => Err(Error::Configuration(format!(
                "header message must contain exactly one {IDENTITY_PLACEHOLDER} placeholder, found {n}"
            ))),
        }
    }

    /// Renders the message for `identity`. Substitution is a single pass;
    /// placeholders inside the identity are left as they are.
    pub fn render(&self, identity: &SigningIdentity) -> String {
        let keys = match identity {
            SigningIdentity::SingleKey(key) => key.clone(),
            SigningIdentity::MultiKey(keys) => keys.join("\n"),
        };
        self.template.replacen(IDENTITY_PLACEHOLDER, &keys, 1)
    }
}
