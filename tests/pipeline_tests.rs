//! End-to-end tests for the submission pipeline, follow-up conversation and
//! entry analysis over a real SQLite store and a mock inference endpoint.


use mockito::Server;
use moodlog::config::{ClassifierKind, Config};
use moodlog::db::{Database, EntryStore};
use moodlog::errors::{AppError, DatabaseError, InferenceError};
use moodlog::journal::{AnalysisStatus, MessageBody, MessageRole, Reply, ReplyStatus, TimeRange};
use moodlog::mood::MoodLabel;
use serde_json::json;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use test_helpers::silent_endpoint;

fn open_store(dir: &Path) -> Arc<Database> {
    let db = Database::open(&dir.join("moodlog.db")).expect("open database");
    db.initialize_schema().expect("initialize schema");
    Arc::new(db)
}

fn config_for(dir: &Path, endpoint: &str) -> Config {
    Config {
        db_path: dir.join("moodlog.db"),
        endpoint: endpoint.to_string(),
        timeout: Duration::from_secs(2),
        max_attempts: 2,
        backoff_base: Duration::from_millis(1),
        backoff_max: Duration::from_millis(2),
        ..Config::default()
    }
}

#[test]
fn test_generated_reply_round_trip() {
    let temp_dir = TempDir::new().expect("create temp dir");
    let mut server = Server::new();
    let mock = server
        .mock("POST", "/api/generate")
        .with_status(200)
        .with_body(json!({ "response": "That's wonderful, enjoy it!" }).to_string())
        .expect(1)
        .create();

    let store = open_store(temp_dir.path());
    let config = config_for(temp_dir.path(), &server.url());
    let pipeline = config.build_pipeline(store.clone()).expect("build pipeline");

    let receipt = pipeline
        .submit_entry("alice", "I feel great today")
        .expect("submit entry");

    mock.assert();
    assert_eq!(receipt.mood, MoodLabel::Joy);
    assert_eq!(receipt.reply_status(), ReplyStatus::Generated);
    assert_eq!(receipt.reply_text(), Some("That's wonderful, enjoy it!"));

    let stored = store
        .get(receipt.entry_id)
        .expect("read entry")
        .expect("entry exists");
    assert_eq!(stored.text, "I feel great today");
    assert_eq!(stored.mood, MoodLabel::Joy);
    assert_eq!(stored.reply_text(), receipt.reply_text());
}

#[test]
fn test_exhausted_retries_store_fallback() {
    let temp_dir = TempDir::new().expect("create temp dir");
    let mut server = Server::new();
    let mock = server
        .mock("POST", "/api/generate")
        .with_status(503)
        .expect(2)
        .create();

    let store = open_store(temp_dir.path());
    let config = config_for(temp_dir.path(), &server.url());
    let pipeline = config.build_pipeline(store.clone()).expect("build pipeline");

    let receipt = pipeline
        .submit_entry("alice", "I feel great today")
        .expect("submit entry");

    mock.assert();
    assert_eq!(receipt.reply_status(), ReplyStatus::Fallback);
    assert!(receipt.reply_text().expect("fallback text").contains("joy"));

    let entries = store
        .list_by_owner("alice", &TimeRange::all())
        .expect("list entries");
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].reply_status(), ReplyStatus::Fallback);
}

#[test]
fn test_silent_endpoint_stores_fallback() {
    let temp_dir = TempDir::new().expect("create temp dir");
    let store = open_store(temp_dir.path());
    let config = Config {
        timeout: Duration::from_millis(300),
        ..config_for(temp_dir.path(), &silent_endpoint())
    };
    let pipeline = config.build_pipeline(store.clone()).expect("build pipeline");

    let receipt = pipeline
        .submit_entry("alice", "A calm and quiet afternoon")
        .expect("submit entry");

    assert_eq!(receipt.mood, MoodLabel::Calm);
    assert_eq!(receipt.reply_status(), ReplyStatus::Fallback);
    let stored = store
        .get(receipt.entry_id)
        .expect("read entry")
        .expect("entry exists");
    assert_eq!(stored.reply_status(), ReplyStatus::Fallback);
    assert!(stored.reply_text().expect("fallback text").contains("calm"));
}

#[test]
fn test_empty_template_stores_failed_reply() {
    let temp_dir = TempDir::new().expect("create temp dir");
    let store = open_store(temp_dir.path());
    let config = Config {
        fallback_template: String::new(),
        ..config_for(temp_dir.path(), "http://127.0.0.1:1")
    };
    let pipeline = config.build_pipeline(store.clone()).expect("build pipeline");

    let receipt = pipeline
        .submit_entry("alice", "so worried about everything")
        .expect("submit entry");

    assert_eq!(receipt.mood, MoodLabel::Fear);
    assert_eq!(receipt.reply_status(), ReplyStatus::Failed);
    assert_eq!(receipt.reply_text(), None);
}

#[test]
fn test_model_classifier_failure_stores_nothing() {
    let temp_dir = TempDir::new().expect("create temp dir");
    let store = open_store(temp_dir.path());
    let config = Config {
        classifier: ClassifierKind::Model,
        ..config_for(temp_dir.path(), "http://127.0.0.1:1")
    };
    let pipeline = config.build_pipeline(store.clone()).expect("build pipeline");

    let result = pipeline.submit_entry("alice", "I feel great today");

    assert!(matches!(result, Err(AppError::ClassificationFailed(_))));
    assert!(store
        .list_by_owner("alice", &TimeRange::all())
        .expect("list entries")
        .is_empty());
}

#[test]
fn test_trend_after_several_submissions() {
    let temp_dir = TempDir::new().expect("create temp dir");
    let store = open_store(temp_dir.path());
    let config = config_for(temp_dir.path(), "http://127.0.0.1:1");
    let pipeline = config.build_pipeline(store).expect("build pipeline");

    for text in [
        "I feel great today",
        "Had a wonderful dinner with friends",
        "Feeling lonely tonight",
        "A calm and quiet afternoon",
    ] {
        pipeline.submit_entry("alice", text).expect("submit entry");
    }
    pipeline.submit_entry("bob", "furious about the delay").expect("submit entry");

    let snapshot = pipeline
        .get_trend("alice", &TimeRange::all())
        .expect("compute trend");

    assert_eq!(snapshot.total, 4);
    assert_eq!(snapshot.count(MoodLabel::Joy), 2);
    assert_eq!(snapshot.count(MoodLabel::Sadness), 1);
    assert_eq!(snapshot.count(MoodLabel::Calm), 1);
    assert_eq!(snapshot.count(MoodLabel::Anger), 0);
    assert_eq!(snapshot.dominant, Some(MoodLabel::Joy));
    assert_eq!(snapshot.polarity.positive, 3);

    let empty = pipeline
        .get_trend("carol", &TimeRange::all())
        .expect("compute trend");
    assert_eq!(empty.total, 0);
    assert!(empty.moods.iter().all(|share| share.count == 0));
}

#[test]
fn test_follow_up_round_trip() {
    let temp_dir = TempDir::new().expect("create temp dir");
    let mut server = Server::new();
    let mock = server
        .mock("POST", "/api/generate")
        .with_status(200)
        .with_body(json!({ "response": "I'm glad you shared that." }).to_string())
        .expect(3)
        .create();

    let store = open_store(temp_dir.path());
    let config = config_for(temp_dir.path(), &server.url());
    let pipeline = config.build_pipeline(store.clone()).expect("build pipeline");

    let receipt = pipeline
        .submit_entry("alice", "Feeling lonely tonight")
        .expect("submit entry");
    pipeline
        .follow_up("alice", receipt.entry_id, "My friends moved away")
        .expect("first follow-up");
    let exchange = pipeline
        .follow_up("alice", receipt.entry_id, "I should call them")
        .expect("second follow-up");

    mock.assert();
    assert_eq!(exchange.reply_status(), ReplyStatus::Generated);
    assert_eq!(exchange.conversation.len(), 4);

    let stored = store.list_messages(receipt.entry_id).expect("list messages");
    assert_eq!(stored, exchange.conversation);
    let roles: Vec<_> = stored.iter().map(|m| m.role()).collect();
    assert_eq!(
        roles,
        vec![MessageRole::User, MessageRole::Assistant, MessageRole::User, MessageRole::Assistant]
    );
    assert_eq!(stored[2].body, MessageBody::User("I should call them".to_string()));
}

#[test]
fn test_follow_up_on_silent_endpoint_stores_fallback() {
    let temp_dir = TempDir::new().expect("create temp dir");
    let store = open_store(temp_dir.path());
    let config = Config {
        timeout: Duration::from_millis(300),
        ..config_for(temp_dir.path(), &silent_endpoint())
    };
    let pipeline = config.build_pipeline(store.clone()).expect("build pipeline");

    let receipt = pipeline
        .submit_entry("alice", "So anxious about tomorrow")
        .expect("submit entry");
    let exchange = pipeline
        .follow_up("alice", receipt.entry_id, "Still can't sleep")
        .expect("follow-up");

    assert_eq!(exchange.reply_status(), ReplyStatus::Fallback);
    let stored = store.list_messages(receipt.entry_id).expect("list messages");
    assert_eq!(stored.len(), 2);
    match &stored[1].body {
        MessageBody::Assistant(Reply::Fallback(text)) => assert!(text.contains("fear")),
        other => panic!("Expected fallback assistant turn, got {:?}", other),
    }
}

#[test]
fn test_follow_up_on_unknown_entry_stores_nothing() {
    let temp_dir = TempDir::new().expect("create temp dir");
    let store = open_store(temp_dir.path());
    let config = config_for(temp_dir.path(), "http://127.0.0.1:1");
    let pipeline = config.build_pipeline(store.clone()).expect("build pipeline");

    let receipt = pipeline
        .submit_entry("alice", "A calm and quiet afternoon")
        .expect("submit entry");

    for (owner, entry_id) in [("alice", receipt.entry_id + 1), ("bob", receipt.entry_id)] {
        match pipeline.follow_up(owner, entry_id, "hello") {
            Err(AppError::Database(DatabaseError::NotFound(_))) => {}
            other => panic!("Expected NotFound, got {:?}", other),
        }
    }
    assert!(store
        .list_messages(receipt.entry_id)
        .expect("list messages")
        .is_empty());
}

#[test]
fn test_analysis_round_trip() {
    let temp_dir = TempDir::new().expect("create temp dir");
    let store = open_store(temp_dir.path());
    let offline = config_for(temp_dir.path(), "http://127.0.0.1:1")
        .build_pipeline(store.clone())
        .expect("build pipeline");
    let receipt = offline
        .submit_entry("alice", "Had a wonderful dinner with friends")
        .expect("submit entry");

    let mut server = Server::new();
    let mock = server
        .mock("POST", "/api/generate")
        .with_status(200)
        .with_body(
            json!({ "response": "{\"summary\": \"Dinner with friends.\", \"tags\": [\"Friends\", \"food\"]}" })
                .to_string(),
        )
        .expect(1)
        .create();
    let pipeline = config_for(temp_dir.path(), &server.url())
        .build_pipeline(store.clone())
        .expect("build pipeline");

    let analysis = pipeline
        .analyze_entry("alice", receipt.entry_id)
        .expect("analyze entry");

    mock.assert();
    assert_eq!(analysis.status, AnalysisStatus::Generated);
    assert_eq!(analysis.summary, "Dinner with friends.");
    assert_eq!(analysis.tags, vec!["friends", "food"]);
    assert_eq!(
        store.latest_analysis(receipt.entry_id).expect("read analysis"),
        Some(analysis)
    );
}

#[test]
fn test_analysis_endpoint_failure_is_an_inference_error() {
    let temp_dir = TempDir::new().expect("create temp dir");
    let mut server = Server::new();
    let mock = server
        .mock("POST", "/api/generate")
        .with_status(503)
        .expect(2)
        .create();

    let store = open_store(temp_dir.path());
    let receipt = config_for(temp_dir.path(), "http://127.0.0.1:1")
        .build_pipeline(store.clone())
        .expect("build pipeline")
        .submit_entry("alice", "I feel great today")
        .expect("submit entry");

    let pipeline = config_for(temp_dir.path(), &server.url())
        .build_pipeline(store.clone())
        .expect("build pipeline");

    match pipeline.analyze_entry("alice", receipt.entry_id) {
        Err(AppError::Inference(InferenceError::Upstream { status: Some(503), .. })) => {}
        other => panic!("Expected Inference error, got {:?}", other),
    }
    mock.assert();
    assert!(store
        .latest_analysis(receipt.entry_id)
        .expect("read analysis")
        .is_none());
}
