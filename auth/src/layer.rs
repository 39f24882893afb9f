use std::convert::Infallible;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use axum::Json;
use axum::body::{Body, to_bytes};
use axum::extract::Request;
use axum::http::StatusCode;
use axum::http::request::Parts;
use axum::response::{IntoResponse, Response};
use sha2::{Digest, Sha256};
use taskpilot_core::error::{ApiError, codes};
use tower::{Layer, Service, ServiceExt};

use crate::authenticator::{AuthDecision, RequestAuthenticator};

/// Largest body the layer will buffer for verification.
pub const MAX_SIGNED_BODY_BYTES: usize = 1024 * 1024;

/// Inserted into request extensions once the signature checked out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedRequest {
    pub key_identifier: String,
}

/// Rejects any request whose body was not signed by a published key.
///
/// The body is read in full, verified byte-for-byte, then handed on to the
/// inner service unchanged.
#[derive(Clone)]
pub struct SignatureAuthLayer {
    authenticator: Arc<RequestAuthenticator>,
}

impl SignatureAuthLayer {
    pub fn new(authenticator: Arc<RequestAuthenticator>) -> Self {
        Self { authenticator }
    }
}

impl<S> Layer<S> for SignatureAuthLayer {
    type Service = SignatureAuthService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        SignatureAuthService {
            inner,
            authenticator: self.authenticator.clone(),
        }
    }
}

#[derive(Clone)]
pub struct SignatureAuthService<S> {
    inner: S,
    authenticator: Arc<RequestAuthenticator>,
}

impl<S> Service<Request> for SignatureAuthService<S>
where
    S: Service<Request, Response = Response, Error = Infallible> + Clone + Send + 'static,
    S::Future: Send + 'static,
{
    type Response = Response;
    type Error = Infallible;
    type Future = Pin<Box<dyn Future<Output = Result<Response, Infallible>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request) -> Self::Future {
        let not_ready = self.inner.clone();
        let ready = std::mem::replace(&mut self.inner, not_ready);
        let authenticator = self.authenticator.clone();

        Box::pin(async move {
            let (mut parts, body) = req.into_parts();
            let request_id = request_id(&parts);

            let bytes = match to_bytes(body, MAX_SIGNED_BODY_BYTES).await {
                Ok(bytes) => bytes,
                Err(err) => {
                    tracing::warn!(error = %err, "signed request body could not be buffered");
                    return Ok(error_response(
                        StatusCode::PAYLOAD_TOO_LARGE,
                        ApiError::new(
                            codes::PAYLOAD_TOO_LARGE,
                            format!("Request body exceeds {MAX_SIGNED_BODY_BYTES} bytes"),
                            request_id,
                        ),
                    ));
                }
            };

            match authenticator.authenticate(&parts.headers, &bytes).await {
                Ok(AuthDecision::Accepted { key_identifier }) => {
                    tracing::debug!(key_identifier = %key_identifier, "request signature verified");
                    parts.extensions.insert(VerifiedRequest { key_identifier });
                    let req = Request::from_parts(parts, Body::from(bytes));
                    Ok(ready.oneshot(req).await.into_response())
                }
                Ok(AuthDecision::Rejected(reason)) => {
                    tracing::warn!(
                        reason = reason.as_str(),
                        path = %parts.uri.path(),
                        body_sha256 = %body_digest_prefix(&bytes),
                        "request signature rejected"
                    );
                    Ok(error_response(
                        StatusCode::UNAUTHORIZED,
                        ApiError::new(
                            codes::UNAUTHORIZED,
                            "Request signature could not be verified",
                            request_id,
                        )
                        .with_docs_hint(format!(
                            "Sign the raw body and send it in '{}' with the key id in '{}'.",
                            authenticator.headers().signature,
                            authenticator.headers().key_identifier,
                        )),
                    ))
                }
                Err(err) => {
                    tracing::error!(error = %err, "public keys unavailable for signature check");
                    Ok(error_response(
                        StatusCode::SERVICE_UNAVAILABLE,
                        ApiError::new(
                            codes::UPSTREAM_UNAVAILABLE,
                            "Signing keys are temporarily unavailable",
                            request_id,
                        ),
                    ))
                }
            }
        })
    }
}

fn request_id(parts: &Parts) -> String {
    parts
        .headers
        .get("x-request-id")
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned)
        .unwrap_or_else(|| uuid::Uuid::now_v7().to_string())
}

fn body_digest_prefix(bytes: &[u8]) -> String {
    let digest = Sha256::digest(bytes);
    hex::encode(&digest[..8])
}

fn error_response(status: StatusCode, error: ApiError) -> Response {
    (status, Json(error)).into_response()
}
