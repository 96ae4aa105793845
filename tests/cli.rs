use assert_cmd::Command;
use predicates::prelude::*;
use std::fs::{read_to_string, write};
use std::sync::{Arc, Mutex};
use tempfile::tempdir;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{layer::Context, Layer, Registry};

const COFFEE_SHOP: &str = r#"{
  "filename": "coffee_shop.fountain",
  "source_text": "INT. COFFEE SHOP - DAY\n\nJOHN\nHello, how are you?\n\nSARAH\nI'm doing great, thanks!",
  "elements": [
    {"id": "e0", "element_type": {"kind": "scene_heading"}, "element_text": "INT. COFFEE SHOP - DAY",
     "location": {"lighting_code": "INT", "scene_name": "COFFEE SHOP", "time_of_day": "DAY"}},
    {"id": "e1", "element_type": {"kind": "character"}, "element_text": "JOHN"},
    {"id": "e2", "element_type": {"kind": "dialogue"}, "element_text": "Hello, how are you?"},
    {"id": "e3", "element_type": {"kind": "character"}, "element_text": "SARAH"},
    {"id": "e4", "element_type": {"kind": "dialogue"}, "element_text": "I'm doing great, thanks!"}
  ]
}"#;

#[test]
fn generate_cli_writes_items_and_reports_summary() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("coffee_shop.json");
    let output = dir.path().join("items.jsonl");
    let config = dir.path().join("config.yaml");
    write(&input, COFFEE_SHOP).unwrap();
    write(&config, "generation:\n  save_interval: 2\n").unwrap();

    let mut cmd = Command::cargo_bin("script-speech").expect("Binary exists");
    cmd.arg("generate")
        .arg("--config")
        .arg(&config)
        .arg("--input")
        .arg(&input)
        .arg("--output")
        .arg(&output)
        .env_remove("SCRIPT_SPEECH_SAVE_INTERVAL");

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("Completed: 3 items processed"));

    let lines: Vec<serde_json::Value> = read_to_string(&output)
        .unwrap()
        .lines()
        .map(|l| serde_json::from_str(l).unwrap())
        .collect();
    assert_eq!(lines.len(), 3);
    assert_eq!(lines[0]["speakable_text"], "Interior. COFFEE SHOP. DAY.");
    assert_eq!(lines[1]["speakable_text"], "JOHN says: Hello, how are you?");
    assert_eq!(lines[1]["screenplay_id"], "coffee_shop");
    assert_eq!(lines[2]["character_name"], "sarah");
    assert_eq!(lines[2]["status"], "text_generated");
}

#[test]
fn generate_cli_fails_for_unreadable_document() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("broken.json");
    write(&input, "{ nope").unwrap();

    let mut cmd = Command::cargo_bin("script-speech").expect("Binary exists");
    cmd.arg("generate")
        .arg("--input")
        .arg(&input)
        .arg("--output")
        .arg(dir.path().join("items.jsonl"));

    cmd.assert().failure();
}

/// Custom Layer to collect emitted event messages.
struct EventCollector {
    events: Arc<Mutex<Vec<String>>>,
}

impl<S> Layer<S> for EventCollector
where
    S: tracing::Subscriber,
{
    fn on_event(&self, event: &tracing::Event<'_>, _ctx: Context<'_, S>) {
        self.events.lock().unwrap().push(format!("{:?}", event));
    }
}

#[tokio::test]
async fn emits_trace_initialised_event() {
    let events = Arc::new(Mutex::new(Vec::new()));
    let collector = EventCollector {
        events: events.clone(),
    };
    let subscriber = Registry::default().with(collector);
    let _guard = tracing::subscriber::set_default(subscriber);

    use script_speech::cli::{run, Cli, Commands};

    let cli = Cli {
        command: Commands::Generate {
            config: None,
            input: std::path::PathBuf::from("missing-document.json"),
            output: None,
        },
    };

    let result = run(cli).await;
    assert!(result.is_err());

    let event_msgs = events.lock().unwrap();
    assert!(
        event_msgs.iter().any(|msg| msg.contains("trace_initialised")),
        "Expected a 'trace_initialised' trace event, got: {:?}",
        event_msgs
    );
}
