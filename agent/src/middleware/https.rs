use axum::extract::Request;
use axum::http::{HeaderValue, StatusCode, Uri};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

/// Redirects plain-HTTP requests (as reported by the TLS-terminating proxy
/// in `X-Forwarded-Proto`) to HTTPS and adds HSTS to every response.
pub async fn require_https(req: Request, next: Next) -> Response {
    let forwarded_http = req
        .headers()
        .get("x-forwarded-proto")
        .and_then(|v| v.to_str().ok())
        .is_some_and(|proto| proto.eq_ignore_ascii_case("http"));

    if forwarded_http {
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

        if let Ok(uri) = format!("https://{host}{path_and_query}").parse::<Uri>() {
            // 308 keeps the method and body, so a signed POST survives the hop.
            let mut response =
                (StatusCode::PERMANENT_REDIRECT, [("location", uri.to_string())]).into_response();
            add_hsts_header(&mut response);
            return response;
        }
    }

    let mut response = next.run(req).await;
    add_hsts_header(&mut response);
    response
}

fn add_hsts_header(response: &mut Response) {
    response.headers_mut().insert(
        "strict-transport-security",
        HeaderValue::from_static("max-age=63072000; includeSubDomains"),
    );
}
