use std::env;
use std::time::Duration;

use wayfarer_core::ModerationPolicy;
use wayfarer_providers::ProvidersConfig;

const DEFAULT_ALLOWED_ORIGINS: &[&str] = &[
    "http://localhost:5500",
    "http://127.0.0.1:5500",
    "http://localhost:3000",
    "http://127.0.0.1:3000",
];

/// Everything the HTTP surface reads from the environment, resolved once at
/// startup.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind: String,
    pub database_url: Option<String>,
    pub session_ttl: Duration,
    pub session_sweep_interval: Duration,
    pub cookie_name: String,
    pub cookie_secure: bool,
    pub cookie_same_site: String,
    pub allowed_origins: Vec<String>,
    pub rate_limit_window: Duration,
    pub rate_limit_max: usize,
    pub format_replies: bool,
    pub keyword_emojis: bool,
    pub moderation: ModerationPolicy,
    pub providers: ProvidersConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0:8080".to_string(),
            database_url: None,
            session_ttl: Duration::from_secs(60 * 60 * 24),
            session_sweep_interval: Duration::from_secs(10 * 60),
            cookie_name: "wayfarer_session".to_string(),
            cookie_secure: true,
            cookie_same_site: "lax".to_string(),
            allowed_origins: parse_allowed_origins(None),
            rate_limit_window: Duration::from_secs(60),
            rate_limit_max: 60,
            format_replies: true,
            keyword_emojis: false,
            moderation: ModerationPolicy::default(),
            providers: ProvidersConfig::default(),
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            bind: env::var("WAYFARER_BIND").unwrap_or(defaults.bind),
            database_url: env::var("WAYFARER_DATABASE_URL")
                .ok()
                .filter(|value| !value.trim().is_empty()),
            session_ttl: env_seconds("WAYFARER_SESSION_TTL_SECONDS")
                .unwrap_or(defaults.session_ttl),
            session_sweep_interval: env_seconds("WAYFARER_SESSION_SWEEP_SECONDS")
                .unwrap_or(defaults.session_sweep_interval),
            cookie_name: env::var("WAYFARER_SESSION_COOKIE_NAME")
                .ok()
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
                .unwrap_or(defaults.cookie_name),
            cookie_secure: env::var("WAYFARER_COOKIE_SECURE")
                .ok()
                .and_then(|value| parse_bool(&value))
                .unwrap_or(defaults.cookie_secure),
            cookie_same_site: sanitize_same_site(
                env::var("WAYFARER_COOKIE_SAMESITE")
                    .ok()
                    .as_deref()
                    .unwrap_or(&defaults.cookie_same_site),
            ),
            allowed_origins: parse_allowed_origins(
                env::var("WAYFARER_ALLOWED_ORIGINS").ok().as_deref(),
            ),
            rate_limit_window: env_seconds("WAYFARER_RATE_LIMIT_WINDOW_SECONDS")
                .unwrap_or(defaults.rate_limit_window),
            rate_limit_max: env::var("WAYFARER_RATE_LIMIT_MAX")
                .ok()
                .and_then(|value| value.parse::<usize>().ok())
                .unwrap_or(defaults.rate_limit_max),
            format_replies: env::var("WAYFARER_FORMAT_REPLIES")
                .ok()
                .and_then(|value| parse_bool(&value))
                .unwrap_or(defaults.format_replies),
            keyword_emojis: env::var("WAYFARER_KEYWORD_EMOJIS")
                .ok()
                .and_then(|value| parse_bool(&value))
                .unwrap_or(defaults.keyword_emojis),
            moderation: parse_moderation_policy(
                env::var("WAYFARER_ABUSIVE_TERMS").ok().as_deref(),
                env::var("WAYFARER_APOLOGY_MARKER").ok().as_deref(),
            ),
            providers: ProvidersConfig::from_env(),
        }
    }
}

pub(crate) fn parse_allowed_origins(raw: Option<&str>) -> Vec<String> {
    let configured = raw
        .map(|value| {
            value
                .split(',')
                .map(|origin| origin.trim().trim_end_matches('/').to_string())
                .filter(|origin| !origin.is_empty())
                .collect::<Vec<_>>()
        })
        .unwrap_or_default();

    if configured.is_empty() {
        DEFAULT_ALLOWED_ORIGINS
            .iter()
            .map(|value| value.to_string())
            .collect()
    } else {
        configured
    }
}

/// Comma separated terms replace the built-in list; blank values keep the defaults.
fn parse_moderation_policy(terms: Option<&str>, apology: Option<&str>) -> ModerationPolicy {
    let mut policy = ModerationPolicy::default();

    let terms = terms
        .map(|value| {
            value
                .split(',')
                .map(|term| term.trim().to_string())
                .filter(|term| !term.is_empty())
                .collect::<Vec<_>>()
        })
        .unwrap_or_default();
    if !terms.is_empty() {
        policy.abusive_terms = terms;
    }

    if let Some(marker) = apology.map(str::trim).filter(|value| !value.is_empty()) {
        policy.apology_marker = marker.to_string();
    }

    policy
}

fn env_seconds(name: &str) -> Option<Duration> {
    env::var(name)
        .ok()
        .and_then(|value| value.trim().parse::<u64>().ok())
        .map(Duration::from_secs)
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn sanitize_same_site(value: &str) -> String {
    match value.trim().to_ascii_lowercase().as_str() {
        "strict" => "strict",
        "none" => "none",
        _ => "lax",
    }
    .to_string()
}
