mod common;

use chrono::DateTime;
use common::{channel, drain, test_catalog, types_of};
use waveradio::relay::{handle_client_message, handle_client_text};
use waveradio::station::Station;
use waveradio::types::ClientMessage;

#[test]
fn test_ping_is_answered_to_sender_only() {
    let station = Station::new(test_catalog(), 16);
    let rock = channel("rock");

    let (a, mut rx_a) = station.connect(&rock);
    let (_b, mut rx_b) = station.connect(&rock);
    drain(&mut rx_a);
    drain(&mut rx_b);

    handle_client_text(&station, &rock, &a, r#"{"type": "ping"}"#);

    assert_eq!(drain(&mut rx_a), vec![serde_json::json!({"type": "pong"})]);
    assert!(drain(&mut rx_b).is_empty());
}

#[test]
fn test_unknown_message_type_is_ignored() {
    let station = Station::new(test_catalog(), 16);
    let rock = channel("rock");

    let (a, mut rx_a) = station.connect(&rock);
    let (_b, mut rx_b) = station.connect(&rock);
    drain(&mut rx_a);
    drain(&mut rx_b);

    handle_client_text(&station, &rock, &a, r#"{"type": "frobnicate"}"#);

    assert!(drain(&mut rx_a).is_empty());
    assert!(drain(&mut rx_b).is_empty());
    assert_eq!(station.listener_count(&rock), 2);
}

#[test]
fn test_malformed_messages_are_ignored() {
    let station = Station::new(test_catalog(), 16);
    let rock = channel("rock");

    let (a, mut rx_a) = station.connect(&rock);
    drain(&mut rx_a);

    for text in [
        "not json at all",
        r#"{"content": "no type"}"#,
        r#"{"type": "user_message"}"#,
        r#"{"type": "track_like", "user_id": "u1"}"#,
    ] {
        handle_client_text(&station, &rock, &a, text);
    }

    assert!(drain(&mut rx_a).is_empty());
    assert_eq!(station.listener_count(&rock), 1);
}

#[test]
fn test_user_message_is_relayed_to_channel() {
    let station = Station::new(test_catalog(), 16);
    let rock = channel("rock");
    let quiet = channel("quiet");

    let (a, mut rx_a) = station.connect(&rock);
    let (_b, mut rx_b) = station.connect(&rock);
    let (_other, mut rx_other) = station.connect(&quiet);
    drain(&mut rx_a);
    drain(&mut rx_b);
    drain(&mut rx_other);

    handle_client_text(
        &station,
        &rock,
        &a,
        r#"{"type": "user_message", "content": "This one is for Sam", "user_id": "dj-fan"}"#,
    );

    for rx in [&mut rx_a, &mut rx_b] {
        let events = drain(rx);
        assert_eq!(types_of(&events), vec!["user_message"]);
        assert_eq!(events[0]["user_id"], "dj-fan");
        assert_eq!(events[0]["content"], "This one is for Sam");
        let timestamp = events[0]["timestamp"].as_str().unwrap();
        assert!(DateTime::parse_from_rfc3339(timestamp).is_ok());
    }
    assert!(drain(&mut rx_other).is_empty());
}

#[test]
fn test_missing_user_id_defaults_to_anonymous() {
    let station = Station::new(test_catalog(), 16);
    let rock = channel("rock");

    let (a, mut rx_a) = station.connect(&rock);
    drain(&mut rx_a);

    handle_client_message(
        &station,
        &rock,
        &a,
        ClientMessage::UserMessage {
            content: "hello".to_string(),
            user_id: None,
        },
    );
    handle_client_text(&station, &rock, &a, r#"{"type": "track_like", "track_id": "B"}"#);

    let events = drain(&mut rx_a);
    assert_eq!(types_of(&events), vec!["user_message", "track_like"]);
    assert_eq!(events[0]["user_id"], "anonymous");
    assert_eq!(events[1]["user_id"], "anonymous");
    assert_eq!(events[1]["track_id"], "B");
}

#[test]
fn test_likes_are_not_deduplicated() {
    let station = Station::new(test_catalog(), 16);
    let rock = channel("rock");

    let (a, mut rx_a) = station.connect(&rock);
    let (_b, mut rx_b) = station.connect(&rock);
    drain(&mut rx_a);
    drain(&mut rx_b);

    for _ in 0..3 {
        handle_client_text(
            &station,
            &rock,
            &a,
            r#"{"type": "track_like", "track_id": "A", "user_id": "fan"}"#,
        );
    }

    assert_eq!(types_of(&drain(&mut rx_b)), vec!["track_like"; 3]);
}

#[test]
fn test_connect_pushes_count_and_current_track() {
    let station = Station::new(test_catalog(), 16);
    let rock = channel("rock");

    // Nothing on air yet: only the listener count
    let (_a, mut rx_a) = station.connect(&rock);
    assert_eq!(types_of(&drain(&mut rx_a)), vec!["listener_count"]);

    let track = station.advance_rotation(&rock).unwrap();
    station.set_now_playing(&rock, track, chrono::Utc::now());

    let (_b, mut rx_b) = station.connect(&rock);
    let events = drain(&mut rx_b);
    assert_eq!(types_of(&events), vec!["listener_count", "now_playing"]);
    assert_eq!(events[0]["count"], 2);
    assert_eq!(events[1]["channel_id"], "rock");
    assert_eq!(events[1]["track"]["id"], "A");
    assert_eq!(events[1]["progress"], 0);

    // The earlier listener only hears the count change
    let events = drain(&mut rx_a);
    assert_eq!(types_of(&events), vec!["listener_count"]);
}

#[test]
fn test_shutdown_closes_connections() {
    let station = Station::new(test_catalog(), 16);
    let rock = channel("rock");

    let (a, mut rx_a) = station.connect(&rock);
    let weak = a.downgrade();
    drop(a);
    drain(&mut rx_a);

    station.shutdown();

    assert!(station.is_shutting_down());
    assert!(station.stop_token().is_cancelled());
    assert_eq!(station.listener_count(&rock), 0);
    assert!(weak.upgrade().is_none());
    assert!(matches!(
        rx_a.try_recv(),
        Err(tokio::sync::mpsc::error::TryRecvError::Disconnected)
    ));
}
