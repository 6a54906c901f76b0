use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::response::Response;
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;
use wayfarer_api::{build_app_with, AppConfig};
use wayfarer_core::{replies, ModerationPolicy};
use wayfarer_tests::ScriptedProviders;

fn test_config() -> AppConfig {
    AppConfig {
        rate_limit_max: 1_000,
        ..AppConfig::default()
    }
}

async fn app_with(config: AppConfig) -> (Router, Arc<ScriptedProviders>) {
    let providers = ScriptedProviders::shared();
    let app = build_app_with(config, providers.bundle())
        .await
        .expect("app should build");
    (app, providers)
}

fn post_json(uri: &str, body: Value, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json");
    if let Some(cookie) = cookie {
        builder = builder.header("cookie", cookie);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn cookie_pair(response: &Response) -> String {
    response
        .headers()
        .get("set-cookie")
        .and_then(|value| value.to_str().ok())
        .expect("set-cookie header should be present")
        .split(';')
        .next()
        .expect("cookie pair should be present")
        .to_string()
}

async fn json_body(response: Response) -> Value {
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&body).unwrap()
}

async fn ask(app: &Router, question: &str, cookie: &str) -> String {
    let response = app
        .clone()
        .oneshot(post_json("/api/chat", json!({ "question": question }), Some(cookie)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    json_body(response).await["answer"]
        .as_str()
        .unwrap()
        .to_string()
}

#[tokio::test]
async fn health_reports_storage_and_metrics() {
    let (app, _) = app_with(test_config()).await;

    let response = app.oneshot(get("/health")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get("x-content-type-options").unwrap(),
        "nosniff"
    );
    assert!(response.headers().get("x-request-id").is_some());

    let body = json_body(response).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["storage"], "memory");
    assert_eq!(body["metrics"]["requests_total"], 0);
    assert_eq!(body["capabilities"]["llm"], false);
}

#[tokio::test]
async fn moderation_follows_the_session_cookie() {
    let (app, providers) = app_with(test_config()).await;

    let first = app
        .clone()
        .oneshot(post_json(
            "/api/chat",
            json!({ "question": "You are stupid" }),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(first.status(), StatusCode::OK);
    let cookie = cookie_pair(&first);
    assert!(cookie.starts_with("wayfarer_session="));
    assert_eq!(json_body(first).await["answer"], replies::MODERATION_NOTICE);

    assert_eq!(
        ask(&app, "weather in Jaipur", &cookie).await,
        replies::BLOCKED_REFUSAL
    );
    assert_eq!(ask(&app, "sorry", &cookie).await, replies::APOLOGY_ACCEPTED);
    assert_eq!(ask(&app, "hello", &cookie).await, replies::GREETING);
    assert_eq!(providers.calls(), 0);
}

#[tokio::test]
async fn blocked_client_does_not_block_another() {
    let (app, _) = app_with(test_config()).await;

    let rude = app
        .clone()
        .oneshot(post_json("/api/chat", json!({ "question": "dumb bot" }), None))
        .await
        .unwrap();
    let rude_cookie = cookie_pair(&rude);

    let polite = app
        .clone()
        .oneshot(post_json("/api/chat", json!({ "question": "hi there" }), None))
        .await
        .unwrap();
    let polite_cookie = cookie_pair(&polite);
    assert_ne!(rude_cookie, polite_cookie);
    assert_eq!(json_body(polite).await["answer"], replies::GREETING);

    assert_eq!(ask(&app, "hello", &rude_cookie).await, replies::BLOCKED_REFUSAL);
    assert_eq!(ask(&app, "hello", &polite_cookie).await, replies::GREETING);
}

#[tokio::test]
async fn itinerary_is_formatted_for_the_browser() {
    let (app, providers) = app_with(test_config()).await;

    let answer = ask(&app, "Plan me a trip", "wayfarer_session=planner").await;
    assert_eq!(
        answer,
        "🌟 <h3>Day 1</h3>: Pink City<br>\
         <ul><li>Visit <strong>Amber Fort</strong></li><li>Dinner at Chokhi Dhani</li></ul><br>\
         📍 <h4>Tips</h4><br>Carry water."
    );
    assert_eq!(providers.calls(), 1);
}

#[tokio::test]
async fn weather_answer_lists_three_days() {
    let (app, _) = app_with(test_config()).await;

    let answer = ask(&app, "weather in Jaipur", "wayfarer_session=forecast").await;
    assert!(answer.starts_with("🌦️ Weather forecast for Jaipur:<br>"));
    assert_eq!(answer.matches("📅").count(), 3);
    assert!(answer.contains("📅 2025-04-10: 🌡️ 22.0°C - 35.5°C, haze"));
}

#[tokio::test]
async fn raw_replies_when_formatting_is_off() {
    let (app, _) = app_with(AppConfig {
        format_replies: false,
        ..test_config()
    })
    .await;

    let answer = ask(&app, "Plan me a trip", "wayfarer_session=raw").await;
    assert_eq!(answer, wayfarer_tests::ITINERARY);
}

#[tokio::test]
async fn empty_question_is_rejected() {
    let (app, providers) = app_with(test_config()).await;

    let response = app
        .oneshot(post_json("/api/chat", json!({ "question": "   " }), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = json_body(response).await;
    assert_eq!(body["error"], "invalid_input");
    assert_eq!(body["message"], replies::EMPTY_MESSAGE);
    assert_eq!(providers.calls(), 0);
}

#[tokio::test]
async fn message_requires_a_live_session() {
    let (app, _) = app_with(test_config()).await;

    let anonymous = app
        .clone()
        .oneshot(post_json("/api/message", json!({ "message": "hello" }), None))
        .await
        .unwrap();
    assert_eq!(anonymous.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(json_body(anonymous).await["success"], false);

    let forged = app
        .oneshot(post_json(
            "/api/message",
            json!({ "message": "hello" }),
            Some("wayfarer_session=never-issued"),
        ))
        .await
        .unwrap();
    assert_eq!(forged.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn chat_does_not_adopt_a_forged_cookie() {
    let (app, _) = app_with(test_config()).await;
    let forged = "wayfarer_session=never-issued";

    let chatted = app
        .clone()
        .oneshot(post_json("/api/chat", json!({ "question": "hello" }), Some(forged)))
        .await
        .unwrap();
    assert_eq!(chatted.status(), StatusCode::OK);
    let issued = cookie_pair(&chatted);
    assert_ne!(issued, forged);

    let message = app
        .clone()
        .oneshot(post_json("/api/message", json!({ "message": "hello" }), Some(forged)))
        .await
        .unwrap();
    assert_eq!(message.status(), StatusCode::UNAUTHORIZED);

    let message = app
        .oneshot(post_json("/api/message", json!({ "message": "hello" }), Some(&issued)))
        .await
        .unwrap();
    assert_eq!(message.status(), StatusCode::OK);
    assert_eq!(cookie_pair(&message), issued);
}

#[tokio::test]
async fn keyword_emojis_follow_config() {
    let (app, _) = app_with(AppConfig {
        keyword_emojis: true,
        ..test_config()
    })
    .await;

    let answer = ask(&app, "Plan me a trip", "wayfarer_session=emoji").await;
    assert!(answer.contains("📍 <h4>💡 Tips</h4>"));
}

#[tokio::test]
async fn configured_terms_replace_the_default_list() {
    let (app, _) = app_with(AppConfig {
        moderation: ModerationPolicy {
            abusive_terms: vec!["moron".to_string()],
            ..ModerationPolicy::default()
        },
        ..test_config()
    })
    .await;

    assert_eq!(
        ask(&app, "you moron", "wayfarer_session=a").await,
        replies::MODERATION_NOTICE
    );
    assert_ne!(
        ask(&app, "you are stupid", "wayfarer_session=b").await,
        replies::MODERATION_NOTICE
    );
}

#[tokio::test]
async fn session_then_message_flow() {
    let (app, _) = app_with(test_config()).await;

    let opened = app
        .clone()
        .oneshot(post_json("/api/session", json!({ "user_id": "traveller-1" }), None))
        .await
        .unwrap();
    assert_eq!(opened.status(), StatusCode::OK);
    let cookie = cookie_pair(&opened);
    let body = json_body(opened).await;
    assert_eq!(body["success"], true);
    assert_eq!(
        cookie,
        format!("wayfarer_session={}", body["session_id"].as_str().unwrap())
    );

    let reply = app
        .clone()
        .oneshot(post_json(
            "/api/message",
            json!({ "message": "hotels in Udaipur" }),
            Some(&cookie),
        ))
        .await
        .unwrap();
    assert_eq!(reply.status(), StatusCode::OK);
    let body = json_body(reply).await;
    assert_eq!(body["success"], true);
    let text = body["reply"].as_str().unwrap();
    assert!(text.starts_with("🏨 Top hotels in Udaipur:<br>1. Udaipur Haveli 1 - MI Road"));
    assert!(text.contains("5. Udaipur Haveli 5"));
    assert!(!text.contains("Haveli 6"));

    let empty = app
        .oneshot(post_json("/api/message", json!({ "message": "" }), Some(&cookie)))
        .await
        .unwrap();
    assert_eq!(empty.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(empty).await["reply"], replies::EMPTY_MESSAGE);
}

#[tokio::test]
async fn direct_lookups_return_json_lists() {
    let (app, _) = app_with(test_config()).await;

    let hotels = app.clone().oneshot(get("/api/hotels/Jaipur")).await.unwrap();
    assert_eq!(hotels.status(), StatusCode::OK);
    let body = json_body(hotels).await;
    assert_eq!(body["city"], "Jaipur");
    assert_eq!(body["hotels"].as_array().unwrap().len(), 5);

    let cars = app.clone().oneshot(get("/api/cars")).await.unwrap();
    assert_eq!(cars.status(), StatusCode::OK);
    let body = json_body(cars).await;
    assert_eq!(body["city"], "Jaipur");
    assert_eq!(body["search"]["driver_age"], 30);
    assert_eq!(body["cars"][0]["model"], "Swift Dzire");

    let weather = app.oneshot(get("/api/weather/Udaipur")).await.unwrap();
    assert_eq!(weather.status(), StatusCode::OK);
    assert_eq!(
        json_body(weather).await["forecast"].as_array().unwrap().len(),
        3
    );
}

#[tokio::test]
async fn direct_lookup_failures_map_to_status_codes() {
    let (app, _) = app_with(test_config()).await;

    let unavailable = app.clone().oneshot(get("/api/hotels/nowhere")).await.unwrap();
    assert_eq!(unavailable.status(), StatusCode::BAD_GATEWAY);
    assert_eq!(json_body(unavailable).await["error"], "unavailable");

    let missing = app.oneshot(get("/api/weather/Atlantis")).await.unwrap();
    assert_eq!(missing.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn rate_limit_applies_per_client() {
    let (app, _) = app_with(AppConfig {
        rate_limit_max: 2,
        ..AppConfig::default()
    })
    .await;

    let from = |ip: &str| {
        Request::builder()
            .uri("/api/cars?city=Goa")
            .header("x-forwarded-for", ip)
            .body(Body::empty())
            .unwrap()
    };

    for _ in 0..2 {
        let response = app.clone().oneshot(from("198.51.100.7")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
    let limited = app.clone().oneshot(from("198.51.100.7")).await.unwrap();
    assert_eq!(limited.status(), StatusCode::TOO_MANY_REQUESTS);

    let other = app.clone().oneshot(from("198.51.100.8")).await.unwrap();
    assert_eq!(other.status(), StatusCode::OK);

    let health = app.oneshot(get("/health")).await.unwrap();
    assert_eq!(health.status(), StatusCode::OK);
}
