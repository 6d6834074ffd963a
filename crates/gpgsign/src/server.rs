//! Serving context: static pages with signing applied to HTML responses.

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{
    Router,
    body::{Body, HttpBody},
    extract::{Request, State},
    http::{Method, StatusCode, header},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::get,
};
use tower_http::services::ServeDir;

use crate::error::Error;
use crate::transform::HtmlSigner;

/// Decides from a request path whether its response is signed.
pub type PathPredicate = Arc<dyn Fn(&str) -> bool + Send + Sync>;

/// What to serve when an HTML response cannot be signed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OnFailure {
    /// Fail the response.
    #[default]
    Reject,
    /// Serve the original, unsigned page.
    ServeUnsigned,
}

/// Prefix based path policy. An empty include list admits every path.
#[derive(Debug, Clone, Default)]
pub struct PathFilter {
    include: Vec<String>,
    exclude: Vec<String>,
}

impl PathFilter {
    pub fn new(include: Vec<String>, exclude: Vec<String>) -> Self {
        Self { include, exclude }
    }

    pub fn allows(&self, path: &str) -> bool {
        let included = self.include.is_empty()
            || self.include.iter().any(|prefix| path.starts_with(prefix.as_str()));
        included && !self.exclude.iter().any(|prefix| path.starts_with(prefix.as_str()))
    }

    pub fn into_predicate(self) -> PathPredicate {
        Arc::new(move |path: &str| self.allows(path))
    }
}

#[derive(Clone)]
pub struct AppState {
    pub signer: Arc<HtmlSigner>,
    pub include: PathPredicate,
    pub on_failure: OnFailure,
    pub max_body_bytes: usize,
}

impl AppState {
    pub fn new(signer: HtmlSigner) -> Self {
        Self {
            signer: Arc::new(signer),
            include: Arc::new(|_: &str| true),
            on_failure: OnFailure::default(),
            max_body_bytes: 16 * 1024 * 1024,
        }
    }
}

/// Serves files under `root`, signing HTML responses.
pub fn router(state: AppState, root: impl AsRef<Path>) -> Router {
    let pages = Router::new().fallback_service(ServeDir::new(root.as_ref()));
    sign_responses(pages, state)
        .route("/healthcheck", get(|| async move { (StatusCode::OK, "Ok").into_response() }))
}

/// Wraps every route of `router` with the HTML signing middleware.
pub fn sign_responses(router: Router, state: AppState) -> Router {
    router.layer(middleware::from_fn_with_state(state, sign_html_responses))
}

pub async fn run(host: String, port: u16, state: AppState, root: impl AsRef<Path>) -> Result<()> {
    let router = router(state, root);

    let listener = tokio::net::TcpListener::bind((host.as_str(), port))
        .await
        .with_context(|| format!("binding {host}:{port}"))?;
    tracing::info!(address = %listener.local_addr()?, "serving signed pages");

    axum::serve(listener, router).await.context("serving")?;

    Ok(())
}

async fn sign_html_responses(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let path = request.uri().path().to_owned();
    let method = request.method().clone();
    let response = next.run(request).await;

    let content_type = response
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .map(|value| value.trim().to_ascii_lowercase());
    let Some(content_type) = content_type.filter(|value| value.starts_with("text/html")) else {
        return response;
    };
    if !has_signable_body(&method, response.status()) || !(state.include)(path.as_str()) {
        return response;
    }

    let (mut parts, body) = response.into_parts();
    if declared_length(&parts.headers, &body) > state.max_body_bytes as u64 {
        tracing::error!(path = %path, limit = state.max_body_bytes, "html response too large to sign");
        return match state.on_failure {
            OnFailure::Reject => {
                (StatusCode::INTERNAL_SERVER_ERROR, "Something wrong happened.").into_response()
            }
            OnFailure::ServeUnsigned => Response::from_parts(parts, body),
        };
    }
    // A body without a known length that outgrows the limit has been
    // partly consumed and cannot be served unsigned.
    let original = match axum::body::to_bytes(body, state.max_body_bytes).await {
        Ok(bytes) => bytes,
        Err(err) => {
            tracing::error!(path = %path, error = %err, "failed to buffer html response");
            return (StatusCode::INTERNAL_SERVER_ERROR, "Something wrong happened.").into_response();
        }
    };

    let signer = state.signer.clone();
    let unsigned = original.clone();
    let signed =
        tokio::task::spawn_blocking(move || signer.sign_html(&unsigned, Some(content_type.as_str())))
            .await
            .unwrap_or_else(|err| {
                Err(Error::Signing(anyhow::anyhow!("signing task failed: {err}")))
            });

    match signed {
        Ok(signed) => {
            parts.headers.remove(header::CONTENT_LENGTH);
            parts.headers.remove(header::ACCEPT_RANGES);
            Response::from_parts(parts, Body::from(signed))
        }
        Err(err) => {
            tracing::error!(path = %path, error = %err, "failed to sign html response");
            match state.on_failure {
                OnFailure::Reject => err.into_response(),
                OnFailure::ServeUnsigned => Response::from_parts(parts, Body::from(original)),
            }
        }
    }
}

/// Smallest length the body is known to have, from `Content-Length` or
/// the body's own size hint.
fn declared_length(headers: &header::HeaderMap, body: &Body) -> u64 {
    let from_header = headers
        .get(header::CONTENT_LENGTH)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.trim().parse::<u64>().ok())
        .unwrap_or(0);
    from_header.max(body.size_hint().lower())
}

fn has_signable_body(method: &Method, status: StatusCode) -> bool {
    const UNSIGNABLE: [StatusCode; 3] = [
        StatusCode::NO_CONTENT,
        StatusCode::PARTIAL_CONTENT,
        StatusCode::NOT_MODIFIED,
    ];

    *method != Method::HEAD && !status.is_informational() && !UNSIGNABLE.contains(&status)
}
