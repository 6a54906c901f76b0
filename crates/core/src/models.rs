use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Intent {
    Greeting,
    Apology,
    Abuse,
    WeatherQuery { city: String },
    HotelQuery { city: String },
    CarQuery { city: String },
    GeneralTravelQuery,
    ThanksAcknowledgement,
}

impl Intent {
    pub fn kind(&self) -> IntentKind {
        match self {
            Self::Greeting => IntentKind::Greeting,
            Self::Apology => IntentKind::Apology,
            Self::Abuse => IntentKind::Abuse,
            Self::WeatherQuery { .. } => IntentKind::WeatherQuery,
            Self::HotelQuery { .. } => IntentKind::HotelQuery,
            Self::CarQuery { .. } => IntentKind::CarQuery,
            Self::GeneralTravelQuery => IntentKind::GeneralTravelQuery,
            Self::ThanksAcknowledgement => IntentKind::ThanksAcknowledgement,
        }
    }

    pub fn city(&self) -> Option<&str> {
        match self {
            Self::WeatherQuery { city } | Self::HotelQuery { city } | Self::CarQuery { city } => {
                Some(city.as_str())
            }
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntentKind {
    Greeting,
    Apology,
    Abuse,
    WeatherQuery,
    HotelQuery,
    CarQuery,
    GeneralTravelQuery,
    ThanksAcknowledgement,
}

impl IntentKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Greeting => "greeting",
            Self::Apology => "apology",
            Self::Abuse => "abuse",
            Self::WeatherQuery => "weather_query",
            Self::HotelQuery => "hotel_query",
            Self::CarQuery => "car_query",
            Self::GeneralTravelQuery => "general_travel_query",
            Self::ThanksAcknowledgement => "thanks_acknowledgement",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
    Weather,
    Hotel,
    Car,
    Llm,
}

impl ProviderKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Weather => "weather",
            Self::Hotel => "hotel",
            Self::Car => "car",
            Self::Llm => "llm",
        }
    }
}

/// Moderation lock of one conversation. Only [`crate::ModerationGate`] flips it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModerationState {
    blocked: bool,
}

impl ModerationState {
    /// Rehydrates a flag previously written by a session repository.
    pub fn restore(blocked: bool) -> Self {
        Self { blocked }
    }

    pub fn is_blocked(&self) -> bool {
        self.blocked
    }

    pub(crate) fn set_blocked(&mut self, blocked: bool) {
        self.blocked = blocked;
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationSession {
    pub session_id: String,
    pub user_id: Option<String>,
    pub moderation: ModerationState,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl ConversationSession {
    pub fn new(session_id: impl Into<String>, ttl: Duration) -> Self {
        let now = Utc::now();
        Self {
            session_id: session_id.into(),
            user_id: None,
            moderation: ModerationState::default(),
            created_at: now,
            expires_at: now + ttl,
        }
    }

    pub fn is_blocked(&self) -> bool {
        self.moderation.is_blocked()
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }

    /// Slides expiry to `ttl` from now.
    pub fn touch(&mut self, ttl: Duration) {
        self.expires_at = Utc::now() + ttl;
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatInput {
    pub session_id: Option<String>,
    pub text: String,
    pub user_id: Option<String>,
}

impl ChatInput {
    pub fn new(session_id: Option<String>, text: impl Into<String>) -> Self {
        Self {
            session_id,
            text: text.into(),
            user_id: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastEntry {
    pub date: NaiveDate,
    pub min_temp: f64,
    pub max_temp: f64,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HotelListing {
    pub name: String,
    pub address: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CarListing {
    pub model: String,
    pub company: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReplyOutcome {
    /// The moderation gate answered; classification never ran.
    Moderated,
    Answered,
    /// A provider failed or returned nothing and a fixed message was used.
    ProviderFallback,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatReply {
    pub session_id: String,
    pub reply_text: String,
    pub intent: IntentKind,
    pub outcome: ReplyOutcome,
    pub provider: Option<ProviderKind>,
    pub blocked: bool,
}
