//! Scripted providers for driving the assembled HTTP app without network access.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use wayfarer_core::{CarListing, ForecastEntry, HotelListing};
use wayfarer_providers::{
    CarProvider, CarSearch, HotelProvider, LlmProvider, ProviderError, Providers, WeatherProvider,
};

pub const ITINERARY: &str = "## Day 1: Pink City\n- Visit **Amber Fort**\n- Dinner at Chokhi Dhani\n### Tips\nCarry water.";

#[derive(Debug, Default)]
pub struct ScriptedProviders {
    calls: AtomicUsize,
}

impl ScriptedProviders {
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn bundle(self: &Arc<Self>) -> Providers {
        Providers {
            weather: self.clone(),
            hotels: self.clone(),
            cars: self.clone(),
            llm: self.clone(),
        }
    }

    fn record(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl WeatherProvider for ScriptedProviders {
    async fn forecast(&self, city: &str) -> Result<Vec<ForecastEntry>, ProviderError> {
        self.record();
        if city.eq_ignore_ascii_case("atlantis") {
            return Err(ProviderError::CityNotFound(city.to_string()));
        }
        Ok((10..13)
            .filter_map(|day| {
                Some(ForecastEntry {
                    date: NaiveDate::from_ymd_opt(2025, 4, day)?,
                    min_temp: 22.0,
                    max_temp: 35.5,
                    description: "haze".to_string(),
                })
            })
            .collect())
    }
}

#[async_trait]
impl HotelProvider for ScriptedProviders {
    async fn search(&self, city: &str) -> Result<Vec<HotelListing>, ProviderError> {
        self.record();
        if city.eq_ignore_ascii_case("nowhere") {
            return Err(ProviderError::Unavailable("quota exhausted".to_string()));
        }
        Ok((1..=7)
            .map(|idx| HotelListing {
                name: format!("{city} Haveli {idx}"),
                address: "MI Road".to_string(),
            })
            .collect())
    }
}

#[async_trait]
impl CarProvider for ScriptedProviders {
    async fn search(&self, _search: &CarSearch) -> Result<Vec<CarListing>, ProviderError> {
        self.record();
        Ok(vec![CarListing {
            model: "Swift Dzire".to_string(),
            company: "Zoomcar".to_string(),
        }])
    }
}

#[async_trait]
impl LlmProvider for ScriptedProviders {
    fn model(&self) -> &str {
        "scripted"
    }

    async fn complete(&self, _prompt: &str) -> Result<String, ProviderError> {
        self.record();
        Ok(ITINERARY.to_string())
    }
}
