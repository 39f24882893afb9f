use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Current conditions for one location, normalised from the upstream
/// weather provider (metric units).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct WeatherReport {
    pub location: String,
    pub country: String,
    /// Short condition group, e.g. "Clouds"
    pub condition: String,
    /// Longer condition text, e.g. "broken clouds"
    pub description: String,
    pub icon: String,
    pub temperature_c: f64,
    pub humidity_percent: u8,
    pub wind_speed_ms: f64,
    pub sunrise: DateTime<Utc>,
    pub sunset: DateTime<Utc>,
}

impl WeatherReport {
    pub fn icon_url(&self) -> String {
        format!("https://openweathermap.org/img/wn/{}@2x.png", self.icon)
    }
}
