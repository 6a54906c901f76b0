use std::env;
use std::time::Duration;

use reqwest::Client;
use serde::Serialize;

pub const DEFAULT_OPENWEATHER_BASE_URL: &str = "https://api.openweathermap.org";
pub const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-1.5-flash";
pub const DEFAULT_API_KEY_HEADER: &str = "x-rapidapi-key";

#[derive(Debug, Clone)]
pub struct WeatherConfig {
    pub base_url: String,
    pub api_key: String,
}

#[derive(Debug, Clone)]
pub struct SearchApiConfig {
    pub url: String,
    pub api_key: Option<String>,
    pub api_key_header: String,
}

#[derive(Debug, Clone)]
pub struct GeminiConfig {
    pub base_url: String,
    pub api_key: String,
    pub model: String,
}

#[derive(Debug, Clone, Default)]
pub struct ProvidersConfig {
    pub weather: Option<WeatherConfig>,
    pub hotels: Option<SearchApiConfig>,
    pub cars: Option<SearchApiConfig>,
    pub llm: Option<GeminiConfig>,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct ProviderCapabilities {
    pub weather: bool,
    pub hotels: bool,
    pub cars: bool,
    pub llm: bool,
}

impl ProvidersConfig {
    /// Sections whose keys are missing stay `None` and answer `NotConfigured`.
    pub fn from_env() -> Self {
        Self {
            weather: build_weather_config(),
            hotels: build_search_config("WAYFARER_HOTEL_API_URL", "WAYFARER_HOTEL_API_KEY"),
            cars: build_search_config("WAYFARER_CAR_API_URL", "WAYFARER_CAR_API_KEY"),
            llm: build_gemini_config(),
        }
    }

    pub fn capabilities(&self) -> ProviderCapabilities {
        ProviderCapabilities {
            weather: self.weather.is_some(),
            hotels: self.hotels.is_some(),
            cars: self.cars.is_some(),
            llm: self.llm.is_some(),
        }
    }
}

pub fn build_http_client() -> reqwest::Result<Client> {
    Client::builder()
        .connect_timeout(Duration::from_secs(6))
        .timeout(Duration::from_secs(20))
        .build()
}

fn build_weather_config() -> Option<WeatherConfig> {
    let api_key = non_empty_env("WAYFARER_OPENWEATHER_API_KEY")?;
    let base_url = non_empty_env("WAYFARER_OPENWEATHER_BASE_URL")
        .unwrap_or_else(|| DEFAULT_OPENWEATHER_BASE_URL.to_string());

    Some(WeatherConfig { base_url, api_key })
}

fn build_search_config(url_var: &str, key_var: &str) -> Option<SearchApiConfig> {
    let url = non_empty_env(url_var)?;
    let api_key_header = non_empty_env("WAYFARER_SEARCH_API_KEY_HEADER")
        .unwrap_or_else(|| DEFAULT_API_KEY_HEADER.to_string());

    Some(SearchApiConfig {
        url,
        api_key: non_empty_env(key_var),
        api_key_header,
    })
}

fn build_gemini_config() -> Option<GeminiConfig> {
    let api_key = non_empty_env("WAYFARER_GEMINI_API_KEY")?;
    let model =
        non_empty_env("WAYFARER_GEMINI_MODEL").unwrap_or_else(|| DEFAULT_GEMINI_MODEL.to_string());
    let base_url = non_empty_env("WAYFARER_GEMINI_BASE_URL")
        .unwrap_or_else(|| DEFAULT_GEMINI_BASE_URL.to_string());

    Some(GeminiConfig {
        base_url,
        api_key,
        model,
    })
}

fn non_empty_env(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}
