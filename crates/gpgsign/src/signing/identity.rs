use crate::error::{Error, Result};

/// The key or keys a document is signed with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SigningIdentity {
    /// One default signing key.
    SingleKey(String),
    /// An ordered set of keys, each contributing its own signature.
    MultiKey(Vec<String>),
}

impl SigningIdentity {
    pub fn single(key: impl Into<String>) -> Self {
        Self::SingleKey(key.into())
    }

    /// Builds a multi-key identity. Duplicates are dropped, keeping the
    /// first occurrence's position.
    pub fn multi<I, S>(keys: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut ordered: Vec<String> = Vec::new();
        for key in keys {
            let key = key.into();
            if !ordered.contains(&key) {
                ordered.push(key);
            }
        }
        if ordered.is_empty() {
            return Err(Error::Configuration(
                "multi-key identity needs at least one key".to_string(),
            ));
        }
        Ok(Self::MultiKey(ordered))
    }

    /// Picks the identity shape from configured key ids: one id is a
    /// single key, several are a multi-key set. Blank ids are ignored.
    pub fn from_keys<I, S>(keys: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let keys: Vec<String> = keys
            .into_iter()
            .map(|key| key.as_ref().trim().to_string())
            .filter(|key| !key.is_empty())
            .collect();
        match keys.len() {
            0 => Err(Error::Configuration(
                "no signing identity configured; set GNUPG_IDENTITY or pass --identity".to_string(),
            )),
            1 => Ok(Self::SingleKey(keys.into_iter().next().unwrap_or_default())),
            _ => Self::multi(keys),
        }
    }

    pub fn keys(&self) -> &[String] {
        match self {
            Self::SingleKey(key) => std::slice::from_ref(key),
            Self::MultiKey(keys) => keys,
        }
    }
}
