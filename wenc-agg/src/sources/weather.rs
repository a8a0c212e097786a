//! Weather adapter (Open-Meteo forecast API, `current_weather=true`)
//!
//! Coordinates are rounded to four decimals (about 11 m) before the request
//! is built, so nearby lookups share a cache entry.
//!
//! API Documentation: https://open-meteo.com/en/docs

use serde::Deserialize;

use super::{SourceClient, SourceError, SourceKind, UpstreamRequest};
use crate::types::{Coordinates, WeatherSnapshot};

#[derive(Debug, Deserialize)]
struct ForecastResponse {
    current_weather: Option<RawCurrentWeather>,
}

#[derive(Debug, Deserialize)]
struct RawCurrentWeather {
    temperature: f64,
    windspeed: f64,
    winddirection: f64,
    weathercode: Option<u32>,
    time: Option<String>,
    is_day: Option<u8>,
}

/// Open-Meteo client
#[derive(Clone)]
pub struct WeatherSource {
    client: SourceClient,
    endpoint: String,
}

impl WeatherSource {
    pub fn new(client: SourceClient, endpoint: impl Into<String>) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
        }
    }

    /// Current conditions at `at`; `None` when the service has no current block
    pub async fn current(&self, at: Coordinates) -> Result<Option<WeatherSnapshot>, SourceError> {
        let request = UpstreamRequest::get(SourceKind::Weather, self.endpoint.as_str())
            .param("latitude", format!("{:.4}", at.lat))
            .param("longitude", format!("{:.4}", at.lon))
            .param("current_weather", "true")
            .param("timezone", "UTC");

        let response: ForecastResponse = self.client.get_decoded(request).await?;
        Ok(response.current_weather.map(|cw| WeatherSnapshot {
            temperature_c: cw.temperature,
            windspeed_kmh: cw.windspeed,
            wind_direction_deg: cw.winddirection,
            weather_code: cw.weathercode,
            observed_at: cw.time,
            is_day: cw.is_day.map(|d| d != 0),
        }))
    }
}
