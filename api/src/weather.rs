//! OpenWeatherMap current-conditions client (metric units).

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::StatusCode;
use serde::Deserialize;
use taskpilot_core::weather::WeatherReport;
use url::Url;

#[derive(Debug, thiserror::Error)]
pub enum WeatherError {
    #[error("no weather API key is configured")]
    NotConfigured,
    #[error("unknown location: {0}")]
    UnknownLocation(String),
    #[error("could not reach the weather provider: {0}")]
    Transport(String),
    #[error("weather provider answered HTTP {status}: {message}")]
    Status { status: u16, message: String },
    #[error("unexpected weather provider response: {0}")]
    Malformed(String),
}

#[async_trait]
pub trait WeatherProvider: Send + Sync {
    async fn current(&self, city: &str, country: Option<&str>)
    -> Result<WeatherReport, WeatherError>;
}

pub struct OpenWeatherMap {
    http: reqwest::Client,
    base_url: Url,
    api_key: Option<String>,
}

impl OpenWeatherMap {
    pub fn new(http: reqwest::Client, base_url: Url, api_key: Option<String>) -> Self {
        Self {
            http,
            base_url,
            api_key,
        }
    }
}

#[derive(Deserialize)]
struct OwmResponse {
    name: String,
    #[serde(default)]
    weather: Vec<OwmCondition>,
    main: OwmMain,
    wind: OwmWind,
    sys: OwmSys,
}

#[derive(Deserialize)]
struct OwmCondition {
    main: String,
    description: String,
    icon: String,
}

#[derive(Deserialize)]
struct OwmMain {
    temp: f64,
    humidity: u8,
}

#[derive(Deserialize)]
struct OwmWind {
    speed: f64,
}

#[derive(Deserialize)]
struct OwmSys {
    #[serde(default)]
    country: String,
    sunrise: i64,
    sunset: i64,
}

impl TryFrom<OwmResponse> for WeatherReport {
    type Error = WeatherError;

    fn try_from(raw: OwmResponse) -> Result<Self, Self::Error> {
        let timestamp = |secs: i64| {
            DateTime::<Utc>::from_timestamp(secs, 0)
                .ok_or_else(|| WeatherError::Malformed(format!("bad timestamp {secs}")))
        };
        let condition = raw.weather.into_iter().next();
        Ok(WeatherReport {
            location: raw.name,
            country: raw.sys.country,
            condition: condition.as_ref().map(|c| c.main.clone()).unwrap_or_default(),
            description: condition
                .as_ref()
                .map(|c| c.description.clone())
                .unwrap_or_default(),
            icon: condition.map(|c| c.icon).unwrap_or_default(),
            temperature_c: raw.main.temp,
            humidity_percent: raw.main.humidity,
            wind_speed_ms: raw.wind.speed,
            sunrise: timestamp(raw.sys.sunrise)?,
            sunset: timestamp(raw.sys.sunset)?,
        })
    }
}

#[async_trait]
impl WeatherProvider for OpenWeatherMap {
    async fn current(
        &self,
        city: &str,
        country: Option<&str>,
    ) -> Result<WeatherReport, WeatherError> {
        let api_key = self.api_key.as_deref().ok_or(WeatherError::NotConfigured)?;
        let query = match country {
            Some(country) => format!("{city},{country}"),
            None => city.to_string(),
        };

        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().push("weather");
        }

        let response = self
            .http
            .get(url)
            .query(&[("q", query.as_str()), ("appid", api_key), ("units", "metric")])
            .send()
            .await
            .map_err(|e| WeatherError::Transport(e.to_string()))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(WeatherError::UnknownLocation(query));
        }
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(WeatherError::Status {
                status: status.as_u16(),
                message,
            });
        }

        let raw = response
            .json::<OwmResponse>()
            .await
            .map_err(|e| WeatherError::Malformed(e.to_string()))?;
        WeatherReport::try_from(raw)
    }
}
