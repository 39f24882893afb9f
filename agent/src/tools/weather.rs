use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Value, json};

use super::{ToolContext, ToolDefinition, ToolError, ToolExecutor, typed_args};
use crate::chat::ChatMessage;

pub fn get_weather() -> ToolDefinition {
    ToolDefinition {
        name: "get_weather",
        description: "This function fetches the weather forecast for a given location.",
        input_schema: json!({
            "type": "object",
            "properties": {
                "location": { "type": "string", "description": "The location to get the weather forecast for." },
                "country": { "type": "string", "description": "The country code for the location." }
            },
            "required": ["location"]
        }),
        executor: Arc::new(GetWeather),
    }
}

#[derive(Deserialize)]
struct WeatherArgs {
    location: String,
    country: Option<String>,
}

struct GetWeather;

#[async_trait]
impl ToolExecutor for GetWeather {
    async fn execute(
        &self,
        ctx: &ToolContext,
        args: Value,
        _conversation: &[ChatMessage],
    ) -> Result<String, ToolError> {
        let WeatherArgs { location, country } = typed_args(args)?;
        let report = ctx.weather.current(&location, country.as_deref()).await?;

        Ok([
            format!(
                "Weather forecast for {} ({}):",
                report.location, report.country
            ),
            format!("Condition: {} ({})", report.description, report.condition),
            format!("Temperature: {:.1}°C", report.temperature_c),
            format!("Humidity: {}%", report.humidity_percent),
            format!("Wind: {:.1} m/s", report.wind_speed_ms),
            format!("Sunrise: {} UTC", report.sunrise.format("%H:%M")),
            format!("Sunset: {} UTC", report.sunset.format("%H:%M")),
            format!(
                "Icon: ![{} ({})]({})",
                report.location,
                report.country,
                report.icon_url()
            ),
            "Use markdown to show the current weather condition, temperature, humidity, wind speed, sunrise, and sunset time.".to_string(),
            "Display the weather icon for the current condition.".to_string(),
        ]
        .join("\n"))
    }
}
