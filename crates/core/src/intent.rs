use once_cell::sync::Lazy;
use regex::Regex;

use crate::models::Intent;

pub const DEFAULT_WEATHER_CITY: &str = "Udaipur";
pub const DEFAULT_LODGING_CITY: &str = "Jaipur";

const THANKS_MARKERS: &[&str] = &["thank you", "thanks", "thx"];
const GREETINGS: &[&str] = &[
    "hi",
    "hello",
    "hey",
    "good morning",
    "good afternoon",
    "good evening",
];
const WEATHER_MARKERS: &[&str] = &["weather", "temperature", "climate"];
const HOTEL_MARKERS: &[&str] = &["hotel", "stay"];
const CAR_MARKERS: &[&str] = &["car", "rent"];

static IN_CITY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\bin\s+(\w[\w ]*)").expect("valid city pattern"));
static WEATHER_CITY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\bweather\s+(?:in\s+)?(\w[\w ]*)").expect("valid weather pattern")
});
static HOTEL_CITY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)hotels?\s+in\s+(\w[\w ]*)").expect("valid hotel pattern"));

struct IntentRule {
    matches: fn(&str) -> bool,
    build: fn(&str) -> Intent,
}

// Evaluated top to bottom, first match wins.
const RULES: &[IntentRule] = &[
    IntentRule {
        matches: |lower| contains_any(lower, THANKS_MARKERS),
        build: |_| Intent::ThanksAcknowledgement,
    },
    IntentRule {
        matches: is_greeting,
        build: |_| Intent::Greeting,
    },
    IntentRule {
        matches: |lower| contains_any(lower, WEATHER_MARKERS),
        build: |text| Intent::WeatherQuery {
            city: extract_city(text, &[&*IN_CITY, &*WEATHER_CITY], DEFAULT_WEATHER_CITY),
        },
    },
    IntentRule {
        matches: |lower| contains_any(lower, HOTEL_MARKERS),
        build: |text| Intent::HotelQuery {
            city: extract_city(text, &[&*HOTEL_CITY], DEFAULT_LODGING_CITY),
        },
    },
    IntentRule {
        matches: |lower| contains_any(lower, CAR_MARKERS),
        build: |text| Intent::CarQuery {
            city: extract_city(text, &[&*IN_CITY], DEFAULT_LODGING_CITY),
        },
    },
];

pub fn normalize_text(input: &str) -> String {
    input
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .trim()
        .to_string()
}

/// Maps text that already cleared moderation onto exactly one intent.
pub fn classify_intent(text: &str) -> Intent {
    let normalized = normalize_text(text);
    let lower = normalized.to_lowercase();

    RULES
        .iter()
        .find(|rule| (rule.matches)(&lower))
        .map(|rule| (rule.build)(&normalized))
        .unwrap_or(Intent::GeneralTravelQuery)
}

fn is_greeting(lower: &str) -> bool {
    GREETINGS.iter().any(|greeting| {
        lower == *greeting
            || lower
                .strip_prefix(greeting)
                .is_some_and(|rest| rest.starts_with(' '))
    })
}

fn extract_city(text: &str, patterns: &[&Regex], default_city: &str) -> String {
    patterns
        .iter()
        .find_map(|pattern| {
            pattern
                .captures(text)
                .and_then(|caps| caps.get(1))
                .map(|city| city.as_str().trim().to_string())
                .filter(|city| !city.is_empty())
        })
        .unwrap_or_else(|| default_city.to_string())
}

fn contains_any(input: &str, needles: &[&str]) -> bool {
    needles.iter().any(|needle| input.contains(needle))
}
