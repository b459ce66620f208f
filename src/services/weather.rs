//! Weather lookup proxied to an upstream JSON API (`{base}/weather/{city}`)

use serde_json::Value;

#[derive(Debug, thiserror::Error)]
pub enum WeatherError {
    #[error("City must be provided")]
    EmptyCity,

    #[error("Failed to fetch weather data: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Weather API returned HTTP {0}")]
    Status(reqwest::StatusCode),

    #[error("Weather API returned invalid JSON")]
    InvalidBody,
}

pub struct WeatherService {
    base_url: String,
    client: reqwest::Client,
}

impl WeatherService {
    pub fn new(base_url: String, client: reqwest::Client) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        }
    }

    /// Upstream URL for a city (lower-cased, percent-encoded)
    pub fn weather_url(&self, city: &str) -> Result<String, WeatherError> {
        let city = city.trim();
        if city.is_empty() {
            return Err(WeatherError::EmptyCity);
        }
        Ok(format!(
            "{}/weather/{}",
            self.base_url,
            urlencoding::encode(&city.to_lowercase())
        ))
    }

    pub async fn get_weather(&self, city: &str) -> Result<Value, WeatherError> {
        let url = self.weather_url(city)?;
        tracing::debug!(url = %url, "Fetching weather");

        let response = self.client.get(&url).send().await?;
        let status = response.status();
        if !status.is_success() {
            tracing::warn!(url = %url, status = %status, "Weather API returned error status");
            return Err(WeatherError::Status(status));
        }

        let body: Value = response.json().await.map_err(|e| {
            tracing::warn!(url = %url, error = %e, "Weather API returned unparseable body");
            WeatherError::InvalidBody
        })?;

        if !body.is_object() {
            return Err(WeatherError::InvalidBody);
        }

        Ok(body)
    }
}

/// Title-case a city for display ("new york" -> "New York")
pub fn display_location(city: &str) -> String {
    city.split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first
                    .to_uppercase()
                    .chain(chars.flat_map(char::to_lowercase))
                    .collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}
