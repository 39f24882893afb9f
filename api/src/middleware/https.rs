use axum::extract::Request;
use axum::http::{HeaderValue, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

const HSTS: &str = "max-age=63072000; includeSubDomains";

/// Behind a TLS-terminating proxy: requests that arrived over plain HTTP
/// (`X-Forwarded-Proto: http`) are redirected, everything else gets HSTS.
pub async fn require_https(req: Request, next: Next) -> Response {
    if let Some(location) = https_location(&req) {
        let mut response = (StatusCode::PERMANENT_REDIRECT, [("location", location)]).into_response();
        response
            .headers_mut()
            .insert("strict-transport-security", HeaderValue::from_static(HSTS));
        return response;
    }

    let mut response = next.run(req).await;
    response
        .headers_mut()
        .insert("strict-transport-security", HeaderValue::from_static(HSTS));
    response
}

fn https_location(req: &Request) -> Option<String> {
    let proto = req.headers().get("x-forwarded-proto")?.to_str().ok()?;
    if !proto.eq_ignore_ascii_case("http") {
        return None;
    }
    let host = req
        .headers()
        .get("host")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("localhost");
    let path_and_query = req
        .uri()
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or("/");
    Some(format!("https://{host}{path_and_query}"))
}
