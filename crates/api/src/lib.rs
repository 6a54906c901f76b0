mod config;
mod rate_limit;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use axum::body::Body;
use axum::extract::{Json, Path, Query, State};
use axum::http::{header, HeaderMap, HeaderValue, Method, Request, StatusCode};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::Router;
use serde::{Deserialize, Serialize};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use wayfarer_agents::{ChatRouter, RouterError};
use wayfarer_core::intent::DEFAULT_LODGING_CITY;
use wayfarer_core::replies::MAX_LISTINGS;
use wayfarer_core::{format_reply_with, ChatInput, ChatReply, FormatOptions, ProviderKind};
use wayfarer_observability::{AppMetrics, MetricsSnapshot};
use wayfarer_providers::{
    build_http_client, CarSearch, ProviderCapabilities, ProviderError, Providers,
};
use wayfarer_storage::Store;

pub use crate::config::AppConfig;
pub use crate::rate_limit::IpRateLimiter;

const MAX_BODY_BYTES: usize = 64 * 1024;
const SESSION_REQUIRED: &str = "Please start a session before chatting.";

#[derive(Clone)]
pub struct ApiState {
    pub router: Arc<ChatRouter<Store>>,
    pub metrics: Arc<AppMetrics>,
    pub limiter: IpRateLimiter,
    pub capabilities: ProviderCapabilities,
    pub storage_backend: &'static str,
    pub allowed_origins: Arc<Vec<String>>,
    pub session_ttl: Duration,
    pub cookie_name: String,
    pub cookie_secure: bool,
    pub cookie_same_site: String,
    pub format_replies: bool,
    pub format_options: FormatOptions,
}

impl ApiState {
    fn render(&self, reply: &ChatReply) -> String {
        if self.format_replies {
            format_reply_with(&reply.reply_text, self.format_options)
        } else {
            reply.reply_text.clone()
        }
    }

    fn providers(&self) -> &Providers {
        self.router.dispatcher().providers()
    }
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    timestamp_utc: String,
    storage: &'static str,
    metrics: MetricsSnapshot,
    capabilities: ProviderCapabilities,
}

#[derive(Debug, Deserialize)]
struct ChatRequest {
    #[serde(default)]
    question: String,
}

#[derive(Debug, Serialize)]
struct ChatResponse {
    answer: String,
}

#[derive(Debug, Default, Deserialize)]
struct SessionRequest {
    #[serde(default)]
    user_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct MessageRequest {
    #[serde(default)]
    message: String,
}

#[derive(Debug, Serialize)]
struct MessageResponse {
    success: bool,
    reply: String,
}

#[derive(Debug, Deserialize)]
struct CarsQuery {
    city: Option<String>,
}

/// Wires HTTP providers and the session store from `config`, then starts the
/// expired-session sweeper.
pub async fn build_app(config: AppConfig) -> Result<Router> {
    let client = build_http_client().context("failed to build HTTP client")?;
    let providers = Providers::from_config(client, &config.providers);
    let sweep_interval = config.session_sweep_interval;

    let state = build_state(config, providers).await?;
    spawn_session_sweeper(state.clone(), sweep_interval);

    Ok(build_router(state))
}

pub async fn build_app_with(config: AppConfig, providers: Providers) -> Result<Router> {
    let state = build_state(config, providers).await?;
    Ok(build_router(state))
}

pub async fn build_state(config: AppConfig, providers: Providers) -> Result<ApiState> {
    let metrics = AppMetrics::shared();

    let store = match config.database_url.as_deref() {
        Some(database_url) => Store::sqlite(database_url).await?,
        None => Store::memory(),
    };
    let storage_backend = store.backend();

    let session_ttl =
        chrono::Duration::from_std(config.session_ttl).context("session ttl out of range")?;
    let router = ChatRouter::new(Arc::new(store), providers, metrics.clone())
        .with_policy(config.moderation)
        .with_session_ttl(session_ttl);

    Ok(ApiState {
        router: Arc::new(router),
        metrics,
        limiter: IpRateLimiter::new(config.rate_limit_window, config.rate_limit_max),
        capabilities: config.providers.capabilities(),
        storage_backend,
        allowed_origins: Arc::new(config.allowed_origins),
        session_ttl: config.session_ttl,
        cookie_name: config.cookie_name,
        cookie_secure: config.cookie_secure,
        cookie_same_site: config.cookie_same_site,
        format_replies: config.format_replies,
        format_options: FormatOptions {
            keyword_emojis: config.keyword_emojis,
        },
    })
}

pub fn build_router(state: ApiState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/chat", post(chat))
        .route("/api/session", post(open_session))
        .route("/api/message", post(message))
        .route("/api/weather/:city", get(weather_lookup))
        .route("/api/hotels/:city", get(hotel_lookup))
        .route("/api/cars", get(car_lookup))
        .layer(build_cors_layer(&state.allowed_origins))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            security_headers_middleware,
        ))
        .layer(TraceLayer::new_for_http())
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            rate_limit_middleware,
        ))
        .with_state(state)
}

fn spawn_session_sweeper(state: ApiState, every: Duration) {
    let every = every.max(Duration::from_secs(1));
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        // The first tick completes immediately.
        ticker.tick().await;
        loop {
            ticker.tick().await;
            match state.router.purge_expired_sessions().await {
                Ok(0) => {}
                Ok(purged) => info!(purged, "expired sessions purged"),
                Err(error) => warn!(error = %error, "session purge failed"),
            }
            state.limiter.prune();
        }
    });
}

async fn health(State(state): State<ApiState>) -> impl IntoResponse {
    let payload = HealthResponse {
        status: "ok",
        timestamp_utc: chrono::Utc::now().to_rfc3339(),
        storage: state.storage_backend,
        metrics: state.metrics.snapshot(),
        capabilities: state.capabilities,
    };
    (StatusCode::OK, Json(payload))
}

async fn chat(
    State(state): State<ApiState>,
    headers: HeaderMap,
    Json(request): Json<ChatRequest>,
) -> Response {
    let cookie_session = read_cookie_value(&headers, &state.cookie_name);
    let input = ChatInput::new(cookie_session.clone(), request.question);

    match state.router.handle_message(input).await {
        Ok(reply) => {
            let answer = state.render(&reply);
            let mut response = (StatusCode::OK, Json(ChatResponse { answer })).into_response();
            if cookie_session.as_deref() != Some(reply.session_id.as_str()) {
                info!(session_id = %reply.session_id, "issued session cookie");
            }
            // Re-issued on every reply so Max-Age follows the sliding expiry.
            attach_session_cookie(&state, &mut response, &reply.session_id);
            response
        }
        Err(error) => router_error_response(error),
    }
}

async fn open_session(
    State(state): State<ApiState>,
    request: Option<Json<SessionRequest>>,
) -> Response {
    let user_id = request
        .map(|Json(request)| request)
        .unwrap_or_default()
        .user_id
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty());

    match state.router.open_session(user_id).await {
        Ok(session) => {
            let mut response = (
                StatusCode::OK,
                Json(serde_json::json!({
                    "success": true,
                    "session_id": session.session_id,
                })),
            )
                .into_response();
            attach_session_cookie(&state, &mut response, &session.session_id);
            response
        }
        Err(error) => router_error_response(error),
    }
}

async fn message(
    State(state): State<ApiState>,
    headers: HeaderMap,
    Json(request): Json<MessageRequest>,
) -> Response {
    let Some(session_id) = read_cookie_value(&headers, &state.cookie_name) else {
        return message_response(StatusCode::UNAUTHORIZED, false, SESSION_REQUIRED);
    };

    let session = match state.router.live_session(&session_id).await {
        Ok(Some(session)) => session,
        Ok(None) => return message_response(StatusCode::UNAUTHORIZED, false, SESSION_REQUIRED),
        Err(error) => return router_error_response(error),
    };

    let mut input = ChatInput::new(Some(session.session_id), request.message);
    input.user_id = session.user_id;

    match state.router.handle_message(input).await {
        Ok(reply) => {
            let mut response = message_response(StatusCode::OK, true, &state.render(&reply));
            attach_session_cookie(&state, &mut response, &reply.session_id);
            response
        }
        Err(RouterError::InvalidInput(reason)) => {
            message_response(StatusCode::BAD_REQUEST, false, &reason)
        }
        Err(error) => router_error_response(error),
    }
}

async fn weather_lookup(State(state): State<ApiState>, Path(city): Path<String>) -> Response {
    let Some(city) = clean_city(Some(city)) else {
        return json_error(StatusCode::BAD_REQUEST, "invalid_city", "city is required");
    };

    state
        .metrics
        .inc_provider_call(ProviderKind::Weather.as_str());
    match state.providers().weather.forecast(&city).await {
        Ok(forecast) => (
            StatusCode::OK,
            Json(serde_json::json!({ "city": city, "forecast": forecast })),
        )
            .into_response(),
        Err(error) => provider_error_response(&state, ProviderKind::Weather, error),
    }
}

async fn hotel_lookup(State(state): State<ApiState>, Path(city): Path<String>) -> Response {
    let Some(city) = clean_city(Some(city)) else {
        return json_error(StatusCode::BAD_REQUEST, "invalid_city", "city is required");
    };

    state.metrics.inc_provider_call(ProviderKind::Hotel.as_str());
    match state.providers().hotels.search(&city).await {
        Ok(mut hotels) => {
            hotels.truncate(MAX_LISTINGS);
            (
                StatusCode::OK,
                Json(serde_json::json!({ "city": city, "hotels": hotels })),
            )
                .into_response()
        }
        Err(error) => provider_error_response(&state, ProviderKind::Hotel, error),
    }
}

async fn car_lookup(State(state): State<ApiState>, Query(query): Query<CarsQuery>) -> Response {
    let city = clean_city(query.city).unwrap_or_else(|| DEFAULT_LODGING_CITY.to_string());
    let search = CarSearch::for_city(&city);

    state.metrics.inc_provider_call(ProviderKind::Car.as_str());
    match state.providers().cars.search(&search).await {
        Ok(mut cars) => {
            cars.truncate(MAX_LISTINGS);
            (
                StatusCode::OK,
                Json(serde_json::json!({ "city": city, "search": search, "cars": cars })),
            )
                .into_response()
        }
        Err(error) => provider_error_response(&state, ProviderKind::Car, error),
    }
}

fn clean_city(city: Option<String>) -> Option<String> {
    city.map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn message_response(status: StatusCode, success: bool, reply: &str) -> Response {
    (
        status,
        Json(MessageResponse {
            success,
            reply: reply.to_string(),
        }),
    )
        .into_response()
}

fn json_error(status: StatusCode, error: &str, message: &str) -> Response {
    (
        status,
        Json(serde_json::json!({
            "error": error,
            "message": message
        })),
    )
        .into_response()
}

fn router_error_response(error: RouterError) -> Response {
    match error {
        RouterError::InvalidInput(reason) => {
            json_error(StatusCode::BAD_REQUEST, "invalid_input", &reason)
        }
        RouterError::Storage(error) => {
            warn!(error = %format!("{error:#}"), "session storage failed");
            json_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "storage_unavailable",
                "session storage is unavailable",
            )
        }
    }
}

fn provider_error_response(
    state: &ApiState,
    provider: ProviderKind,
    error: ProviderError,
) -> Response {
    warn!(
        provider = provider.as_str(),
        error_kind = error.kind(),
        error = %error,
        "direct provider lookup failed"
    );
    state
        .metrics
        .inc_provider_failure(provider.as_str(), error.kind());

    let status = match &error {
        ProviderError::CityNotFound(_) => StatusCode::NOT_FOUND,
        ProviderError::NotConfigured(_) => StatusCode::SERVICE_UNAVAILABLE,
        ProviderError::Unavailable(_) | ProviderError::Malformed(_) => StatusCode::BAD_GATEWAY,
    };
    json_error(status, error.kind(), &error.to_string())
}

fn attach_session_cookie(state: &ApiState, response: &mut Response, session_id: &str) {
    let cookie = build_session_cookie(
        &state.cookie_name,
        session_id,
        state.session_ttl.as_secs(),
        state.cookie_secure,
        &state.cookie_same_site,
    );
    match HeaderValue::from_str(&cookie) {
        Ok(value) => {
            response.headers_mut().append(header::SET_COOKIE, value);
        }
        Err(error) => warn!(error = %error, "session cookie is not a valid header value"),
    }
}

fn read_cookie_value(headers: &HeaderMap, cookie_name: &str) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|raw| raw.split(';'))
        .find_map(|part| {
            let (key, value) = part.trim().split_once('=')?;
            let value = value.trim();
            (key.trim() == cookie_name && !value.is_empty()).then(|| value.to_string())
        })
}

fn cookie_same_site_attr(value: &str) -> &'static str {
    match value.trim().to_ascii_lowercase().as_str() {
        "none" => "None",
        "strict" => "Strict",
        _ => "Lax",
    }
}

fn build_session_cookie(
    cookie_name: &str,
    session_id: &str,
    max_age_seconds: u64,
    secure: bool,
    same_site: &str,
) -> String {
    let mut segments = vec![
        format!("{cookie_name}={session_id}"),
        "Path=/".to_string(),
        "HttpOnly".to_string(),
        format!("SameSite={}", cookie_same_site_attr(same_site)),
        format!("Max-Age={max_age_seconds}"),
    ];
    // Browsers reject SameSite=None without Secure.
    if secure || cookie_same_site_attr(same_site) == "None" {
        segments.push("Secure".to_string());
    }
    segments.join("; ")
}

fn build_cors_layer(allowed_origins: &Arc<Vec<String>>) -> CorsLayer {
    let origins = allowed_origins
        .iter()
        .filter_map(|origin| HeaderValue::from_str(origin).ok())
        .collect::<Vec<_>>();
    let origins = if origins.is_empty() {
        vec![HeaderValue::from_static("http://localhost:5500")]
    } else {
        origins
    };

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE])
        .allow_credentials(true)
}

async fn rate_limit_middleware(
    State(state): State<ApiState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    if request.method() == Method::OPTIONS || request.uri().path() == "/health" {
        return next.run(request).await;
    }

    let ip = request_ip(&request);
    if !state.limiter.allow(&ip) {
        return json_error(
            StatusCode::TOO_MANY_REQUESTS,
            "rate_limited",
            "rate limit exceeded for this IP",
        );
    }

    next.run(request).await
}

fn request_ip(request: &Request<Body>) -> String {
    request
        .headers()
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .unwrap_or_else(|| "local".to_string())
}

async fn security_headers_middleware(
    State(state): State<ApiState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let mut response = next.run(request).await;
    let headers = response.headers_mut();

    headers.insert(
        header::X_CONTENT_TYPE_OPTIONS,
        HeaderValue::from_static("nosniff"),
    );
    headers.insert(header::X_FRAME_OPTIONS, HeaderValue::from_static("DENY"));
    headers.insert(
        header::REFERRER_POLICY,
        HeaderValue::from_static("strict-origin-when-cross-origin"),
    );
    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-store"));
    headers.insert(
        header::CONTENT_SECURITY_POLICY,
        HeaderValue::from_static("default-src 'none'; frame-ancestors 'none'"),
    );
    if state.cookie_secure {
        headers.insert(
            header::STRICT_TRANSPORT_SECURITY,
            HeaderValue::from_static("max-age=31536000; includeSubDomains"),
        );
    }

    response
}
