mod config;
mod error;
mod llm;
mod search;
mod weather;

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Client;
use wayfarer_core::{CarListing, ForecastEntry, HotelListing};

pub use config::{
    build_http_client, GeminiConfig, ProviderCapabilities, ProvidersConfig, SearchApiConfig,
    WeatherConfig, DEFAULT_GEMINI_MODEL,
};
pub use error::ProviderError;
pub use llm::GeminiProvider;
pub use search::{city_coordinates, CarSearch, GeoPoint, HttpCarProvider, HttpHotelProvider};
pub use weather::OpenWeatherMapProvider;

#[async_trait]
pub trait WeatherProvider: Send + Sync {
    async fn forecast(&self, city: &str) -> Result<Vec<ForecastEntry>, ProviderError>;
}

#[async_trait]
pub trait HotelProvider: Send + Sync {
    async fn search(&self, city: &str) -> Result<Vec<HotelListing>, ProviderError>;
}

#[async_trait]
pub trait CarProvider: Send + Sync {
    async fn search(&self, search: &CarSearch) -> Result<Vec<CarListing>, ProviderError>;
}

#[async_trait]
pub trait LlmProvider: Send + Sync {
    fn model(&self) -> &str;
    async fn complete(&self, prompt: &str) -> Result<String, ProviderError>;
}

/// Stand-in for any provider whose credentials are missing.
#[derive(Debug, Clone, Copy, Default)]
pub struct Unconfigured;

#[async_trait]
impl WeatherProvider for Unconfigured {
    async fn forecast(&self, _city: &str) -> Result<Vec<ForecastEntry>, ProviderError> {
        Err(ProviderError::NotConfigured("weather"))
    }
}

#[async_trait]
impl HotelProvider for Unconfigured {
    async fn search(&self, _city: &str) -> Result<Vec<HotelListing>, ProviderError> {
        Err(ProviderError::NotConfigured("hotel"))
    }
}

#[async_trait]
impl CarProvider for Unconfigured {
    async fn search(&self, _search: &CarSearch) -> Result<Vec<CarListing>, ProviderError> {
        Err(ProviderError::NotConfigured("car"))
    }
}

#[async_trait]
impl LlmProvider for Unconfigured {
    fn model(&self) -> &str {
        "unconfigured"
    }

    async fn complete(&self, _prompt: &str) -> Result<String, ProviderError> {
        Err(ProviderError::NotConfigured("llm"))
    }
}

#[derive(Clone)]
pub struct Providers {
    pub weather: Arc<dyn WeatherProvider>,
    pub hotels: Arc<dyn HotelProvider>,
    pub cars: Arc<dyn CarProvider>,
    pub llm: Arc<dyn LlmProvider>,
}

impl Providers {
    pub fn unconfigured() -> Self {
        Self {
            weather: Arc::new(Unconfigured),
            hotels: Arc::new(Unconfigured),
            cars: Arc::new(Unconfigured),
            llm: Arc::new(Unconfigured),
        }
    }

    pub fn from_config(client: Client, config: &ProvidersConfig) -> Self {
        let weather: Arc<dyn WeatherProvider> = match config.weather.clone() {
            Some(weather) => Arc::new(OpenWeatherMapProvider::new(client.clone(), weather)),
            None => Arc::new(Unconfigured),
        };
        let hotels: Arc<dyn HotelProvider> = match config.hotels.clone() {
            Some(hotels) => Arc::new(HttpHotelProvider::new(client.clone(), hotels)),
            None => Arc::new(Unconfigured),
        };
        let cars: Arc<dyn CarProvider> = match config.cars.clone() {
            Some(cars) => Arc::new(HttpCarProvider::new(client.clone(), cars)),
            None => Arc::new(Unconfigured),
        };
        let llm: Arc<dyn LlmProvider> = match config.llm.clone() {
            Some(llm) => Arc::new(GeminiProvider::new(client, llm)),
            None => Arc::new(Unconfigured),
        };

        Self {
            weather,
            hotels,
            cars,
            llm,
        }
    }
}
