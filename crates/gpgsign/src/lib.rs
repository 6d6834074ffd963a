//! Embeds a PGP clearsign signature inside HTML documents.
//!
//! The signature header and footer are hidden in HTML comments placed just
//! inside `<html>` and `</html>`, so the rendered page is unchanged while
//! its source verifies with any OpenPGP tool.

pub mod charset;
pub mod config;
pub mod document;
pub mod error;
pub mod logging;
pub mod message;
pub mod server;
pub mod signing;
pub mod transform;

pub use config::{ExecutableLocator, GpgSettings, PathLocator, ResolvedGpg};
pub use error::{Error, Result};
pub use message::HeaderTemplate;
pub use server::{AppState, OnFailure, PathFilter, router, run};
pub use signing::{ClearsignBackend, GpgBackend, SigningAdapter, SigningIdentity};
pub use transform::HtmlSigner;
