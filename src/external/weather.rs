//! Weather provider
//!
//! Contract: given coordinates, return a disruption risk on a 0-100 scale.
//! The OpenWeather-backed client carries a 5 s timeout and a ~30 minute
//! cache keyed on rounded coordinates; any failure falls back to a neutral
//! assessment with `api_available: false`. No retries — this is a
//! read-only lookup.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use crate::observability::Logger;

use super::{ProviderError, ProviderResult};

const WEATHER_TIMEOUT_SECS: u64 = 5;
const WEATHER_CACHE_TTL: Duration = Duration::from_secs(30 * 60);

/// Weather risk for one location
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherAssessment {
    /// Disruption risk, 0-100
    pub risk_score: f64,
    /// Short condition description
    pub condition: String,
    /// False when this is a fallback value
    pub api_available: bool,
}

impl WeatherAssessment {
    /// The fallback used whenever the provider is unreachable
    pub fn neutral() -> Self {
        Self {
            risk_score: 30.0,
            condition: "unknown".to_string(),
            api_available: false,
        }
    }
}

/// Resolves weather risk for coordinates
pub trait WeatherProvider: Send + Sync {
    /// Assess disruption risk at a location. Implementations degrade to
    /// `WeatherAssessment::neutral()` rather than erroring outward.
    fn assess(&self, lat: f64, lon: f64) -> WeatherAssessment;
}

/// Always-neutral provider, used when no API key is configured
#[derive(Debug, Default)]
pub struct NeutralWeatherProvider;

impl WeatherProvider for NeutralWeatherProvider {
    fn assess(&self, _lat: f64, _lon: f64) -> WeatherAssessment {
        WeatherAssessment::neutral()
    }
}

/// OpenWeather-backed provider with caching and timeout fallback
pub struct OpenWeatherProvider {
    api_key: String,
    client: reqwest::blocking::Client,
    cache: Mutex<HashMap<String, (Instant, WeatherAssessment)>>,
}

impl OpenWeatherProvider {
    /// Build a provider with the configured API key.
    ///
    /// # Errors
    ///
    /// Returns `ProviderError::Api` if the HTTP client cannot be built.
    pub fn new(api_key: String) -> ProviderResult<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(WEATHER_TIMEOUT_SECS))
            .build()
            .map_err(|e| ProviderError::Api {
                provider: "weather",
                detail: e.to_string(),
            })?;
        Ok(Self {
            api_key,
            client,
            cache: Mutex::new(HashMap::new()),
        })
    }

    fn cache_key(lat: f64, lon: f64) -> String {
        // Two decimals ~ 1km; close enough for corridor weather
        format!("{:.2},{:.2}", lat, lon)
    }

    fn cached(&self, key: &str) -> Option<WeatherAssessment> {
        let cache = self.cache.lock().ok()?;
        let (stored_at, assessment) = cache.get(key)?;
        if stored_at.elapsed() < WEATHER_CACHE_TTL {
            Some(assessment.clone())
        } else {
            None
        }
    }

    fn store(&self, key: String, assessment: WeatherAssessment) {
        if let Ok(mut cache) = self.cache.lock() {
            cache.insert(key, (Instant::now(), assessment));
        }
    }

    fn fetch(&self, lat: f64, lon: f64) -> ProviderResult<WeatherAssessment> {
        let url = format!(
            "https://api.openweathermap.org/data/2.5/weather?lat={}&lon={}&appid={}",
            lat, lon, self.api_key
        );
        let response = self.client.get(&url).send().map_err(|e| {
            if e.is_timeout() {
                ProviderError::Timeout {
                    provider: "weather",
                    seconds: WEATHER_TIMEOUT_SECS,
                }
            } else {
                ProviderError::Api {
                    provider: "weather",
                    detail: e.to_string(),
                }
            }
        })?;

        if response.status().as_u16() == 429 {
            return Err(ProviderError::RateLimited {
                provider: "weather",
            });
        }
        if !response.status().is_success() {
            return Err(ProviderError::Api {
                provider: "weather",
                detail: format!("HTTP {}", response.status()),
            });
        }

        let body: serde_json::Value = response.json().map_err(|e| ProviderError::Api {
            provider: "weather",
            detail: e.to_string(),
        })?;

        let condition = body["weather"][0]["main"]
            .as_str()
            .unwrap_or("unknown")
            .to_string();
        let wind = body["wind"]["speed"].as_f64().unwrap_or(0.0);

        // Simple banding: storms dominate, wind scales
        let risk_score = match condition.as_str() {
            "Thunderstorm" => 90.0,
            "Snow" => 75.0,
            "Rain" | "Drizzle" => 55.0,
            "Fog" | "Mist" | "Haze" => 45.0,
            _ => (20.0 + wind * 2.0).min(40.0),
        };

        Ok(WeatherAssessment {
            risk_score,
            condition,
            api_available: true,
        })
    }
}

impl WeatherProvider for OpenWeatherProvider {
    fn assess(&self, lat: f64, lon: f64) -> WeatherAssessment {
        let key = Self::cache_key(lat, lon);
        if let Some(cached) = self.cached(&key) {
            return cached;
        }

        match self.fetch(lat, lon) {
            Ok(assessment) => {
                self.store(key, assessment.clone());
                assessment
            }
            Err(e) => {
                Logger::warn(
                    "WEATHER_PROVIDER_DEGRADED",
                    &[("error", &e.to_string()), ("lat_lon", &key)],
                );
                WeatherAssessment::neutral()
            }
        }
    }
}
