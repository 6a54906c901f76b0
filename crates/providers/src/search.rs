use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;
use wayfarer_core::{CarListing, HotelListing};

use crate::config::SearchApiConfig;
use crate::error::{ensure_success, ProviderError};
use crate::{CarProvider, HotelProvider};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

const CITY_COORDINATES: &[(&str, GeoPoint)] = &[
    ("jaipur", GeoPoint { lat: 26.9124, lng: 75.7873 }),
    ("udaipur", GeoPoint { lat: 24.5854, lng: 73.7125 }),
    ("delhi", GeoPoint { lat: 28.6139, lng: 77.2090 }),
    ("new delhi", GeoPoint { lat: 28.6139, lng: 77.2090 }),
    ("mumbai", GeoPoint { lat: 19.0760, lng: 72.8777 }),
    ("agra", GeoPoint { lat: 27.1767, lng: 78.0081 }),
    ("goa", GeoPoint { lat: 15.2993, lng: 74.1240 }),
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CarSearch {
    pub pickup: GeoPoint,
    pub dropoff: GeoPoint,
    pub pickup_time: String,
    pub dropoff_time: String,
    pub driver_age: u8,
}

impl CarSearch {
    /// Round trip from the city centre; unknown cities fall back to Jaipur.
    pub fn for_city(city: &str) -> Self {
        let point = city_coordinates(city);
        Self {
            pickup: point,
            dropoff: point,
            pickup_time: "10:00".to_string(),
            dropoff_time: "10:00".to_string(),
            driver_age: 30,
        }
    }
}

pub fn city_coordinates(city: &str) -> GeoPoint {
    let key = city.trim().to_lowercase();
    CITY_COORDINATES
        .iter()
        .find(|(name, _)| *name == key)
        .or_else(|| CITY_COORDINATES.first())
        .map(|(_, point)| *point)
        .unwrap_or(GeoPoint {
            lat: 26.9124,
            lng: 75.7873,
        })
}

#[derive(Debug, Clone)]
pub struct HttpHotelProvider {
    client: Client,
    config: SearchApiConfig,
}

impl HttpHotelProvider {
    pub fn new(client: Client, config: SearchApiConfig) -> Self {
        Self { client, config }
    }
}

#[async_trait]
impl HotelProvider for HttpHotelProvider {
    async fn search(&self, city: &str) -> Result<Vec<HotelListing>, ProviderError> {
        let request = self.client.get(&self.config.url).query(&[("city", city)]);
        let payload = send_json(with_api_key(request, &self.config), "hotel search").await?;

        let hotels = result_items(&payload)
            .iter()
            .filter_map(|item| {
                let name = first_str(item, &["/hotel_name", "/name", "/property/name"])?;
                let address =
                    first_str(item, &["/address", "/address_trans", "/city"]).unwrap_or_default();
                Some(HotelListing { name, address })
            })
            .collect::<Vec<_>>();
        debug!(city = %city, hits = hotels.len(), "hotel search finished");
        Ok(hotels)
    }
}

#[derive(Debug, Clone)]
pub struct HttpCarProvider {
    client: Client,
    config: SearchApiConfig,
}

impl HttpCarProvider {
    pub fn new(client: Client, config: SearchApiConfig) -> Self {
        Self { client, config }
    }
}

#[async_trait]
impl CarProvider for HttpCarProvider {
    async fn search(&self, search: &CarSearch) -> Result<Vec<CarListing>, ProviderError> {
        let request = self.client.get(&self.config.url).query(&[
            ("pickUpLat", search.pickup.lat.to_string()),
            ("pickUpLng", search.pickup.lng.to_string()),
            ("dropOffLat", search.dropoff.lat.to_string()),
            ("dropOffLng", search.dropoff.lng.to_string()),
            ("pickUpTime", search.pickup_time.clone()),
            ("dropOffTime", search.dropoff_time.clone()),
            ("driverAge", search.driver_age.to_string()),
        ]);
        let payload = send_json(with_api_key(request, &self.config), "car search").await?;

        let cars = result_items(&payload)
            .iter()
            .map(|item| CarListing {
                model: first_str(item, &["/car_name", "/model", "/vehicle_info/v_name"])
                    .unwrap_or_else(|| "Car".to_string()),
                company: first_str(item, &["/company", "/supplier_name", "/supplier_info/name"])
                    .unwrap_or_default(),
            })
            .collect::<Vec<_>>();
        debug!(hits = cars.len(), "car search finished");
        Ok(cars)
    }
}

fn with_api_key(request: RequestBuilder, config: &SearchApiConfig) -> RequestBuilder {
    match config.api_key.as_deref() {
        Some(key) => request.header(config.api_key_header.as_str(), key),
        None => request,
    }
}

async fn send_json(request: RequestBuilder, label: &str) -> Result<Value, ProviderError> {
    let response = request.send().await?;
    Ok(ensure_success(response, label).await?.json().await?)
}

// Search APIs either return a bare array or wrap it in `data` / `result`.
fn result_items(payload: &Value) -> &[Value] {
    ["", "/data", "/result", "/data/result", "/results"]
        .iter()
        .find_map(|pointer| payload.pointer(pointer).and_then(Value::as_array))
        .map(Vec::as_slice)
        .unwrap_or(&[])
}

fn first_str(item: &Value, pointers: &[&str]) -> Option<String> {
    pointers.iter().find_map(|pointer| {
        item.pointer(pointer)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(ToString::to_string)
    })
}
