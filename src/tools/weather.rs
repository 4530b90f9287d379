//! Current weather through OpenWeatherMap.

use super::{required_str, Tool, ToolOutput};
use crate::config::Prompts;
use crate::error::{PalaverError, Result};
use crate::model::LanguageModel;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

const OPENWEATHER_BASE_URL: &str = "https://api.openweathermap.org/data/2.5";

fn city_schema() -> serde_json::Value {
    serde_json::json!({
        "type": "object",
        "properties": {
            "city": {
                "type": "string",
                "description": "City name, e.g. \"London\""
            }
        },
        "required": ["city"]
    })
}

/// Shared access to the current-weather endpoint.
#[derive(Clone)]
struct WeatherApi {
    http: reqwest::Client,
    api_key: Option<String>,
    base_url: String,
}

/// Outcome of one weather request.
enum WeatherResponse {
    Ok(serde_json::Value),
    /// Upstream answered with a non-200 status; holds the body.
    Failed(String),
}

impl WeatherApi {
    fn new(http: reqwest::Client, api_key: Option<String>) -> Self {
        Self {
            http,
            api_key,
            base_url: OPENWEATHER_BASE_URL.to_string(),
        }
    }

    async fn current(&self, api_key: &str, city: &str) -> Result<WeatherResponse> {
        debug!("Fetching weather for {}", city);

        let response = self
            .http
            .get(format!("{}/weather", self.base_url))
            .query(&[("q", city), ("appid", api_key), ("units", "metric")])
            .send()
            .await?;

        if !response.status().is_success() {
            let body = response.text().await.unwrap_or_default();
            return Ok(WeatherResponse::Failed(body));
        }

        Ok(WeatherResponse::Ok(response.json().await?))
    }
}

/// One-sentence current weather for a city.
pub struct GetWeatherTool {
    api: WeatherApi,
}

impl GetWeatherTool {
    pub fn new(http: reqwest::Client, api_key: Option<String>) -> Self {
        Self {
            api: WeatherApi::new(http, api_key),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.api.base_url = base_url.into();
        self
    }
}

#[async_trait]
impl Tool for GetWeatherTool {
    fn name(&self) -> &str {
        "get_weather"
    }

    fn description(&self) -> &str {
        "Fetch current weather for a given city."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        city_schema()
    }

    async fn invoke(&self, arguments: serde_json::Value) -> Result<ToolOutput> {
        let city = required_str(&arguments, "city")?;

        let Some(api_key) = self.api.api_key.as_deref() else {
            return Ok(ToolOutput::error("OPENWEATHER_API_KEY not set."));
        };

        match self.api.current(api_key, city).await? {
            WeatherResponse::Failed(body) => Ok(ToolOutput::text(format!(
                "Failed to fetch weather: {}",
                body
            ))),
            WeatherResponse::Ok(data) => Ok(ToolOutput::text(describe_weather(city, &data)?)),
        }
    }
}

/// Build the one-line summary from an OpenWeatherMap payload.
fn describe_weather(city: &str, data: &serde_json::Value) -> Result<String> {
    let description = data["weather"][0]["description"].as_str().ok_or_else(|| {
        PalaverError::Tool("Weather response missing description".to_string())
    })?;
    // Printed as the payload spells it: 18 stays 18, 18.0 stays 18.0.
    let temp = match &data["main"]["temp"] {
        serde_json::Value::Number(n) => n,
        _ => {
            return Err(PalaverError::Tool(
                "Weather response missing temperature".to_string(),
            ))
        }
    };

    Ok(format!(
        "The weather in {} is {} with a temperature of {}°C.",
        city, description, temp
    ))
}

/// Detailed weather sentence written by the model from the raw payload.
pub struct SummarizeWeatherTool {
    api: WeatherApi,
    model: Arc<dyn LanguageModel>,
    prompts: Prompts,
}

impl SummarizeWeatherTool {
    pub fn new(
        http: reqwest::Client,
        api_key: Option<String>,
        model: Arc<dyn LanguageModel>,
        prompts: Prompts,
    ) -> Self {
        Self {
            api: WeatherApi::new(http, api_key),
            model,
            prompts,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.api.base_url = base_url.into();
        self
    }
}

#[async_trait]
impl Tool for SummarizeWeatherTool {
    fn name(&self) -> &str {
        "summarize_weather"
    }

    fn description(&self) -> &str {
        "Summarize raw weather data for a city into one human-readable sentence \
        with description, temperature, humidity and wind speed."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        city_schema()
    }

    async fn invoke(&self, arguments: serde_json::Value) -> Result<ToolOutput> {
        let city = required_str(&arguments, "city")?;

        let raw = match self.api.api_key.as_deref() {
            Some(api_key) => match self.api.current(api_key, city).await? {
                WeatherResponse::Ok(data) => data,
                WeatherResponse::Failed(body) => serde_json::json!({ "error": body }),
            },
            None => serde_json::json!({ "error": "OPENWEATHER_API_KEY not set." }),
        };

        let mut vars = HashMap::new();
        vars.insert("weather_json".to_string(), serde_json::to_string_pretty(&raw)?);
        let prompt = self
            .prompts
            .render_with_custom(&self.prompts.weather_summary, &vars);

        Ok(ToolOutput::text(self.model.prompt(&prompt).await?))
    }
}
