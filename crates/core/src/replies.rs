use crate::models::{CarListing, ForecastEntry, HotelListing};

pub const MODERATION_NOTICE: &str = "⛔ That language is not acceptable. Say 'sorry' to continue.";
pub const BLOCKED_REFUSAL: &str = "⛔ I won't respond until you apologize by saying 'sorry'.";
pub const APOLOGY_ACCEPTED: &str =
    "✅ Thank you for apologizing. How can I help with your travel plans? ✈️";
pub const GREETING: &str = "👋 Hello! How can I help you plan your next trip today?";
pub const THANKS: &str = "😊 You're welcome! Happy travels, and ask me anytime. ✈️";
pub const TRAVEL_ONLY: &str = "❌ I can only help with travel-related queries. ✈️";
pub const LLM_FAILURE: &str = "Error occurred while generating response.";
pub const WEATHER_CITY_NOT_FOUND: &str = "🌦️ City not found. Please check the city name.";
pub const WEATHER_UNAVAILABLE: &str = "🌦️ Unable to fetch the weather right now.";
pub const NO_HOTELS: &str = "🏨 No hotels found or API limit reached.";
pub const NO_CARS: &str = "🚗 No cars found or API limit reached.";
pub const EMPTY_MESSAGE: &str = "Please type a message first.";

pub const MAX_FORECAST_DAYS: usize = 3;
pub const MAX_LISTINGS: usize = 5;

const TRAVEL_GUIDE_INSTRUCTIONS: &str = "You are a friendly, expert travel guide chatbot.
You must ONLY answer questions related to travel (trips, destinations, itineraries, hotels, flights, food, sightseeing, budgets, tips, etc.).
If the question is NOT about travel, respond exactly with:
\"❌ I can only help with travel-related queries. ✈️\"

When the question IS about travel:
- Always provide a complete, structured, day-by-day itinerary without asking for more details.
- Include attractions, food recommendations, budget estimates, and tips.
- Minimum 3 days plan if duration is not specified.
- Use bullet points, clear headings and a few emojis.";

pub fn travel_prompt(question: &str) -> String {
    format!("{TRAVEL_GUIDE_INSTRUCTIONS}\n\nUser's question: \"{question}\"")
}

pub fn weather_reply(city: &str, forecast: &[ForecastEntry]) -> String {
    let mut lines = vec![format!("🌦️ Weather forecast for {city}:")];
    lines.extend(forecast.iter().take(MAX_FORECAST_DAYS).map(|entry| {
        format!(
            "📅 {}: 🌡️ {:.1}°C - {:.1}°C, {}",
            entry.date.format("%Y-%m-%d"),
            entry.min_temp,
            entry.max_temp,
            entry.description
        )
    }));
    lines.join("\n")
}

pub fn hotels_reply(city: &str, hotels: &[HotelListing]) -> String {
    let mut lines = vec![format!("🏨 Top hotels in {city}:")];
    lines.extend(
        hotels
            .iter()
            .take(MAX_LISTINGS)
            .enumerate()
            .map(|(idx, hotel)| numbered(idx, &hotel.name, &hotel.address)),
    );
    lines.join("\n")
}

pub fn cars_reply(city: &str, cars: &[CarListing]) -> String {
    let mut lines = vec![format!("🚗 Top car rentals in {city}:")];
    lines.extend(
        cars.iter()
            .take(MAX_LISTINGS)
            .enumerate()
            .map(|(idx, car)| numbered(idx, &car.model, &car.company)),
    );
    lines.join("\n")
}

fn numbered(idx: usize, primary: &str, secondary: &str) -> String {
    if secondary.trim().is_empty() {
        format!("{}. {}", idx + 1, primary)
    } else {
        format!("{}. {} - {}", idx + 1, primary, secondary)
    }
}
