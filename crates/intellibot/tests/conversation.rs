use chrono::NaiveDate;
use intellibot::SessionBuilder;
use intellibot::clock::FixedClock;
use intellibot::tools::{JOKES, QUOTES};
use intellibot_model::{ModelMessage, ToolCallRequest};
use intellibot_test_model::{PresetEvent, PresetResponse, TestModelProvider};
use serde_json::{Value, json};

fn call(id: &str, name: &str, arguments: Value) -> PresetEvent {
    PresetEvent::ToolCall(ToolCallRequest {
        id: id.to_owned(),
        name: name.to_owned(),
        arguments,
    })
}

fn tool_results(provider: &TestModelProvider, request: usize) -> Vec<String> {
    provider.requests()[request]
        .messages
        .iter()
        .filter_map(|msg| match msg {
            ModelMessage::Tool(result) => Some(result.content.clone()),
            _ => None,
        })
        .collect()
}

#[tokio::test]
async fn every_tool_answers_through_the_agent() {
    let provider = TestModelProvider::default();
    provider.add_response(PresetResponse::with_events([
        call("1", "basic_math", json!({ "operation": "add", "a": 2, "b": 3 })),
        call(
            "2",
            "unit_converter",
            json!({ "unit_from": "c", "unit_to": "f", "value": 37 }),
        ),
        call("3", "current_datetime", json!({})),
        call(
            "4",
            "days_between",
            json!({ "start_date": "2024-01-10", "end_date": "2024-01-01" }),
        ),
        call("5", "password_strength", json!({ "password": "Password1" })),
        call("6", "joke_generator", Value::Null),
        call("7", "quote_of_the_day", json!({})),
        call("8", "weather", json!({ "city": "Oslo" })),
    ]));
    provider.add_response(PresetResponse::text("Here is everything."));

    let now = NaiveDate::from_ymd_opt(2024, 1, 10)
        .and_then(|date| date.and_hms_opt(9, 0, 0))
        .unwrap();
    let mut session = SessionBuilder::with_model_provider(provider.clone())
        .with_clock(FixedClock::new(now))
        .with_rng_seed(2024)
        .build();
    let reply = session.send_message("Do it all").await.unwrap();
    assert_eq!(reply, "Here is everything.");

    let results = tool_results(&provider, 1);
    assert_eq!(results.len(), 8);
    assert_eq!(results[0], "2.0 + 3.0 = 5.0");
    assert_eq!(results[1], "37.0 c is 98.6 f");
    assert_eq!(results[2], "Current date and time: 2024-01-10 09:00:00");
    assert_eq!(
        results[3],
        "There are 9 days between 2024-01-10 and 2024-01-01."
    );
    assert_eq!(
        results[4],
        "🟡 Moderate password. Consider adding more symbols or uppercase letters."
    );
    assert!(JOKES.contains(&results[5].as_str()));
    assert!(QUOTES.contains(&results[6].as_str()));
    assert_eq!(results[7], "Error: Tool not found: no tool named `weather`");
}

#[tokio::test]
async fn seeded_sessions_tell_the_same_jokes() {
    let mut picks = vec![];
    for _ in 0..2 {
        let provider = TestModelProvider::default();
        provider.add_response(PresetResponse::with_events(
            (0..5)
                .map(|i| call(&i.to_string(), "joke_generator", json!({})))
                .collect::<Vec<_>>(),
        ));
        provider.add_response(PresetResponse::text("Ha!"));

        let mut session = SessionBuilder::with_model_provider(provider.clone())
            .with_rng_seed(99)
            .build();
        session.send_message("Five jokes please").await.unwrap();
        picks.push(tool_results(&provider, 1));
    }
    assert_eq!(picks[0], picks[1]);
}

#[tokio::test]
async fn history_carries_over_between_turns() {
    let provider = TestModelProvider::default();
    provider.add_response(PresetResponse::text("Nice to meet you, Ada."));
    provider.add_response(PresetResponse::text("Your name is Ada."));

    let mut session =
        SessionBuilder::with_model_provider(provider.clone()).build();
    session.send_message("I am Ada").await.unwrap();
    session.send_message("What is my name?").await.unwrap();

    let second = &provider.requests()[1];
    let users: Vec<_> = second
        .messages
        .iter()
        .filter_map(|msg| match msg {
            ModelMessage::User(text) => Some(text.as_str()),
            _ => None,
        })
        .collect();
    assert_eq!(users, ["I am Ada", "What is my name?"]);
    assert_eq!(session.agent().conversation().len(), 4);
}
