use axum::http::StatusCode;
use axum_core::response::{IntoResponse as AxumCoreIntoResponse, Response};

/// Failure surface of the HTML signing transform.
///
/// Every variant aborts the transform; no partially signed document is
/// ever produced alongside one of these.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The document lacks a usable `<html>`...`</html>` boundary, or its
    /// bytes are not valid in the declared charset.
    #[error("Malformed document: {0}")]
    MalformedDocument(String),
    /// The signing tool, key ring or identity could not be resolved.
    #[error("Signing configuration error: {0}")]
    Configuration(String),
    /// The signing backend reported a failure.
    #[error("Signing failed: {0:#}")]
    Signing(#[source] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Trait implementation to convert this error into an axum http response
impl AxumCoreIntoResponse for Error {
    fn into_response(self) -> Response {
        match self {
            malformed @ Error::MalformedDocument(_) => {
                (StatusCode::UNPROCESSABLE_ENTITY, malformed.to_string()).into_response()
            }
            _ => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Something wrong happened.",
            )
                .into_response(),
        }
    }
}
