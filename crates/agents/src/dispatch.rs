use std::sync::Arc;

use tracing::warn;
use wayfarer_core::replies;
use wayfarer_core::{Intent, ProviderKind, ReplyOutcome};
use wayfarer_observability::AppMetrics;
use wayfarer_providers::{CarSearch, ProviderError, Providers};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dispatched {
    pub text: String,
    pub outcome: ReplyOutcome,
    pub provider: Option<ProviderKind>,
}

impl Dispatched {
    fn answered(text: impl Into<String>, provider: Option<ProviderKind>) -> Self {
        Self {
            text: text.into(),
            outcome: ReplyOutcome::Answered,
            provider,
        }
    }

    fn fallback(text: &str, provider: ProviderKind) -> Self {
        Self {
            text: text.to_string(),
            outcome: ReplyOutcome::ProviderFallback,
            provider: Some(provider),
        }
    }
}

/// Turns a classified intent into reply text, calling at most one provider.
#[derive(Clone)]
pub struct ProviderDispatcher {
    providers: Providers,
    metrics: Arc<AppMetrics>,
}

impl ProviderDispatcher {
    pub fn new(providers: Providers, metrics: Arc<AppMetrics>) -> Self {
        Self { providers, metrics }
    }

    pub fn providers(&self) -> &Providers {
        &self.providers
    }

    pub async fn dispatch(&self, intent: &Intent, question: &str) -> Dispatched {
        match intent {
            Intent::Greeting => Dispatched::answered(replies::GREETING, None),
            Intent::ThanksAcknowledgement => Dispatched::answered(replies::THANKS, None),
            Intent::Apology => Dispatched::answered(replies::APOLOGY_ACCEPTED, None),
            Intent::Abuse => Dispatched::answered(replies::MODERATION_NOTICE, None),
            Intent::WeatherQuery { city } => self.weather(city).await,
            Intent::HotelQuery { city } => self.hotels(city).await,
            Intent::CarQuery { city } => self.cars(city).await,
            Intent::GeneralTravelQuery => self.general(question).await,
        }
    }

    async fn weather(&self, city: &str) -> Dispatched {
        self.metrics.inc_provider_call(ProviderKind::Weather.as_str());
        match self.providers.weather.forecast(city).await {
            Ok(forecast) if !forecast.is_empty() => Dispatched::answered(
                replies::weather_reply(city, &forecast),
                Some(ProviderKind::Weather),
            ),
            Ok(_) => Dispatched::fallback(replies::WEATHER_UNAVAILABLE, ProviderKind::Weather),
            Err(ProviderError::CityNotFound(missing)) => {
                warn!(city = %missing, "weather city not found");
                self.metrics
                    .inc_provider_failure(ProviderKind::Weather.as_str(), "city_not_found");
                Dispatched::fallback(replies::WEATHER_CITY_NOT_FOUND, ProviderKind::Weather)
            }
            Err(error) => {
                self.record_failure(ProviderKind::Weather, &error);
                Dispatched::fallback(replies::WEATHER_UNAVAILABLE, ProviderKind::Weather)
            }
        }
    }

    async fn hotels(&self, city: &str) -> Dispatched {
        self.metrics.inc_provider_call(ProviderKind::Hotel.as_str());
        match self.providers.hotels.search(city).await {
            Ok(hotels) if !hotels.is_empty() => Dispatched::answered(
                replies::hotels_reply(city, &hotels),
                Some(ProviderKind::Hotel),
            ),
            Ok(_) => Dispatched::fallback(replies::NO_HOTELS, ProviderKind::Hotel),
            Err(error) => {
                self.record_failure(ProviderKind::Hotel, &error);
                Dispatched::fallback(replies::NO_HOTELS, ProviderKind::Hotel)
            }
        }
    }

    async fn cars(&self, city: &str) -> Dispatched {
        self.metrics.inc_provider_call(ProviderKind::Car.as_str());
        match self.providers.cars.search(&CarSearch::for_city(city)).await {
            Ok(cars) if !cars.is_empty() => {
                Dispatched::answered(replies::cars_reply(city, &cars), Some(ProviderKind::Car))
            }
            Ok(_) => Dispatched::fallback(replies::NO_CARS, ProviderKind::Car),
            Err(error) => {
                self.record_failure(ProviderKind::Car, &error);
                Dispatched::fallback(replies::NO_CARS, ProviderKind::Car)
            }
        }
    }

    async fn general(&self, question: &str) -> Dispatched {
        self.metrics.inc_provider_call(ProviderKind::Llm.as_str());
        match self
            .providers
            .llm
            .complete(&replies::travel_prompt(question))
            .await
        {
            Ok(text) if !text.trim().is_empty() => {
                Dispatched::answered(text, Some(ProviderKind::Llm))
            }
            Ok(_) => Dispatched::fallback(replies::LLM_FAILURE, ProviderKind::Llm),
            Err(error) => {
                self.record_failure(ProviderKind::Llm, &error);
                Dispatched::fallback(replies::LLM_FAILURE, ProviderKind::Llm)
            }
        }
    }

    fn record_failure(&self, provider: ProviderKind, error: &ProviderError) {
        warn!(
            provider = provider.as_str(),
            error_kind = error.kind(),
            error = %error,
            "provider call failed"
        );
        self.metrics
            .inc_provider_failure(provider.as_str(), error.kind());
    }
}
