use axum::extract::{Query, State};
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;
use taskpilot_core::weather::WeatherReport;

use crate::error::AppError;
use crate::extract::AppJson;
use crate::identity::CurrentUser;
use crate::state::AppState;

#[derive(Debug, Deserialize, utoipa::ToSchema, utoipa::IntoParams)]
pub struct WeatherQuery {
    /// City name, e.g. "Lisbon"
    pub city: String,
    /// Optional ISO 3166 country code, e.g. "PT"
    #[serde(default)]
    pub country: Option<String>,
}

pub fn router() -> Router<AppState> {
    Router::new().route("/api/weather", get(weather_by_query).post(weather_by_body))
}

async fn lookup(
    state: &AppState,
    user: &CurrentUser,
    query: WeatherQuery,
) -> Result<Json<WeatherReport>, AppError> {
    let city = query.city.trim();
    if city.is_empty() {
        return Err(AppError::Validation {
            message: "city must not be empty".to_string(),
            field: Some("city".to_string()),
            received: None,
            docs_hint: None,
        });
    }
    let country = query.country.as_deref().map(str::trim).filter(|c| !c.is_empty());

    tracing::info!(user_id = %user.login, city, country = ?country, "weather lookup");
    let report = state.weather.current(city, country).await?;
    Ok(Json(report))
}

/// GET /api/weather?city=&country= (current conditions, metric units)
#[utoipa::path(
    get,
    path = "/api/weather",
    params(WeatherQuery),
    responses(
        (status = 200, description = "Current conditions", body = WeatherReport),
        (status = 401, description = "Missing or invalid X-GitHub-Token"),
        (status = 404, description = "Unknown location"),
        (status = 502, description = "Weather provider unavailable"),
    ),
    security(("github_token" = [])),
    tag = "weather"
)]
pub async fn weather_by_query(
    user: CurrentUser,
    State(state): State<AppState>,
    Query(query): Query<WeatherQuery>,
) -> Result<Json<WeatherReport>, AppError> {
    lookup(&state, &user, query).await
}

/// POST /api/weather: same lookup with a JSON body
#[utoipa::path(
    post,
    path = "/api/weather",
    request_body = WeatherQuery,
    responses(
        (status = 200, description = "Current conditions", body = WeatherReport),
        (status = 401, description = "Missing or invalid X-GitHub-Token"),
        (status = 404, description = "Unknown location"),
        (status = 502, description = "Weather provider unavailable"),
    ),
    security(("github_token" = [])),
    tag = "weather"
)]
pub async fn weather_by_body(
    user: CurrentUser,
    State(state): State<AppState>,
    AppJson(query): AppJson<WeatherQuery>,
) -> Result<Json<WeatherReport>, AppError> {
    lookup(&state, &user, query).await
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use serde_json::json;
    use tower::ServiceExt;

    use super::*;
    use crate::routes::testing::{json_body, request};
    use crate::testutil::{FakeWeather, OCTOCAT, state};

    #[tokio::test]
    async fn get_and_post_return_the_same_report() {
        let (state, _) = state();
        let app = router().with_state(state);

        let (status, by_query) = json_body(
            app.clone()
                .oneshot(request("GET", "/api/weather?city=Lisbon&country=PT", Some(OCTOCAT), None))
                .await
                .expect("service is infallible"),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(by_query["location"], "Lisbon");
        assert_eq!(by_query["country"], "PT");
        assert!(by_query.get("temperatureC").is_some());

        let (status, by_body) = json_body(
            app.oneshot(request(
                "POST",
                "/api/weather",
                Some(OCTOCAT),
                Some(json!({"city": "Lisbon", "country": "PT"})),
            ))
            .await
            .expect("service is infallible"),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(by_query, by_body);
    }

    #[tokio::test]
    async fn provider_outage_is_bad_gateway() {
        let (mut state, _) = state();
        state.weather = std::sync::Arc::new(FakeWeather::failing());
        let app = router().with_state(state);

        let (status, body) = json_body(
            app.oneshot(request("GET", "/api/weather?city=Lisbon", Some(OCTOCAT), None))
                .await
                .expect("service is infallible"),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(body["error"], "upstream_unavailable");
    }

    #[tokio::test]
    async fn blank_city_is_rejected() {
        let (state, _) = state();
        let app = router().with_state(state);
        let response = app
            .oneshot(request("GET", "/api/weather?city=%20", Some(OCTOCAT), None))
            .await
            .expect("service is infallible");
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn anonymous_lookups_are_unauthorized() {
        let (state, _) = state();
        let app = router().with_state(state);
        let response = app
            .oneshot(request("GET", "/api/weather?city=Lisbon", None, None))
            .await
            .expect("service is infallible");
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}
