use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Timelike, Utc};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use tracing::debug;
use wayfarer_core::ForecastEntry;

use crate::config::WeatherConfig;
use crate::error::{ensure_success, ProviderError};
use crate::WeatherProvider;

const FORECAST_DAYS: usize = 3;

#[derive(Debug, Deserialize)]
struct ForecastResponse {
    #[serde(default)]
    list: Vec<ForecastSlot>,
}

#[derive(Debug, Deserialize)]
struct ForecastSlot {
    dt: i64,
    main: SlotTemperatures,
    #[serde(default)]
    weather: Vec<SlotCondition>,
}

#[derive(Debug, Deserialize)]
struct SlotTemperatures {
    temp_min: f64,
    temp_max: f64,
}

#[derive(Debug, Deserialize)]
struct SlotCondition {
    description: String,
}

/// OpenWeatherMap 5-day / 3-hour forecast, folded into daily entries.
#[derive(Debug, Clone)]
pub struct OpenWeatherMapProvider {
    client: Client,
    config: WeatherConfig,
}

impl OpenWeatherMapProvider {
    pub fn new(client: Client, config: WeatherConfig) -> Self {
        Self { client, config }
    }
}

#[async_trait]
impl WeatherProvider for OpenWeatherMapProvider {
    async fn forecast(&self, city: &str) -> Result<Vec<ForecastEntry>, ProviderError> {
        let url = format!(
            "{}/data/2.5/forecast",
            self.config.base_url.trim_end_matches('/')
        );
        let response = self
            .client
            .get(url)
            .query(&[
                ("q", city),
                ("appid", self.config.api_key.as_str()),
                ("units", "metric"),
            ])
            .send()
            .await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Err(ProviderError::CityNotFound(city.to_string()));
        }

        let body: ForecastResponse = ensure_success(response, "openweathermap")
            .await?
            .json()
            .await?;
        debug!(city = %city, slots = body.list.len(), "forecast received");

        let daily = fold_daily(&body.list);
        if daily.is_empty() {
            return Err(ProviderError::Malformed(
                "forecast contained no usable entries".to_string(),
            ));
        }
        Ok(daily)
    }
}

struct DayAccumulator {
    min_temp: f64,
    max_temp: f64,
    description: String,
    distance_from_noon: u32,
}

fn fold_daily(slots: &[ForecastSlot]) -> Vec<ForecastEntry> {
    let mut days: BTreeMap<NaiveDate, DayAccumulator> = BTreeMap::new();

    for slot in slots {
        let Some(at) = DateTime::<Utc>::from_timestamp(slot.dt, 0) else {
            continue;
        };
        let description = slot
            .weather
            .first()
            .map(|condition| condition.description.clone())
            .unwrap_or_default();
        let distance_from_noon = at.hour().abs_diff(12);

        days.entry(at.date_naive())
            .and_modify(|day| {
                day.min_temp = day.min_temp.min(slot.main.temp_min);
                day.max_temp = day.max_temp.max(slot.main.temp_max);
                if distance_from_noon < day.distance_from_noon && !description.is_empty() {
                    day.description = description.clone();
                    day.distance_from_noon = distance_from_noon;
                }
            })
            .or_insert_with(|| DayAccumulator {
                min_temp: slot.main.temp_min,
                max_temp: slot.main.temp_max,
                description: description.clone(),
                distance_from_noon,
            });
    }

    days.into_iter()
        .take(FORECAST_DAYS)
        .map(|(date, day)| ForecastEntry {
            date,
            min_temp: day.min_temp,
            max_temp: day.max_temp,
            description: day.description,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use wiremock::{matchers, Mock, MockServer, ResponseTemplate};

    use super::*;

    fn slot(dt: i64, min: f64, max: f64, description: &str) -> serde_json::Value {
        json!({
            "dt": dt,
            "main": { "temp_min": min, "temp_max": max },
            "weather": [{ "description": description }]
        })
    }

    fn provider(server: &MockServer) -> OpenWeatherMapProvider {
        OpenWeatherMapProvider::new(
            Client::new(),
            WeatherConfig {
                base_url: server.uri(),
                api_key: "test-key".to_string(),
            },
        )
    }

    // 2025-01-01T00:00:00Z
    const DAY_ONE: i64 = 1_735_689_600;
    const HOUR: i64 = 3_600;

    #[tokio::test]
    async fn folds_slots_into_three_daily_entries() {
        let server = MockServer::start().await;
        let mut list = Vec::new();
        for day in 0..4 {
            let base = DAY_ONE + day * 24 * HOUR;
            list.push(slot(base + 3 * HOUR, 10.0 + day as f64, 15.0, "mist"));
            list.push(slot(base + 12 * HOUR, 14.0, 25.0 + day as f64, "clear sky"));
        }

        Mock::given(matchers::method("GET"))
            .and(matchers::path("/data/2.5/forecast"))
            .and(matchers::query_param("q", "Jaipur"))
            .and(matchers::query_param("units", "metric"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "list": list })))
            .mount(&server)
            .await;

        let forecast = provider(&server).forecast("Jaipur").await.unwrap();
        assert_eq!(forecast.len(), 3);
        assert_eq!(forecast[0].date.to_string(), "2025-01-01");
        assert_eq!(forecast[0].min_temp, 10.0);
        assert_eq!(forecast[0].max_temp, 25.0);
        assert_eq!(forecast[0].description, "clear sky");
        assert_eq!(forecast[2].max_temp, 27.0);
    }

    #[tokio::test]
    async fn unknown_city_maps_to_city_not_found() {
        let server = MockServer::start().await;
        Mock::given(matchers::method("GET"))
            .respond_with(
                ResponseTemplate::new(404)
                    .set_body_json(json!({ "cod": "404", "message": "city not found" })),
            )
            .mount(&server)
            .await;

        let error = provider(&server).forecast("Atlantis").await.unwrap_err();
        assert!(matches!(error, ProviderError::CityNotFound(city) if city == "Atlantis"));
    }

    #[tokio::test]
    async fn quota_errors_are_unavailable() {
        let server = MockServer::start().await;
        Mock::given(matchers::method("GET"))
            .respond_with(ResponseTemplate::new(429).set_body_string("slow down"))
            .mount(&server)
            .await;

        let error = provider(&server).forecast("Jaipur").await.unwrap_err();
        assert_eq!(error.kind(), "unavailable");
    }
}
