mod adapter;
mod gpg;
mod identity;
mod signer;

pub use adapter::SigningAdapter;
pub use gpg::{DIGEST_ALGORITHM, GpgBackend};
pub use identity::SigningIdentity;
pub use signer::ClearsignBackend;
