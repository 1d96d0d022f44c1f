//! Black-box end-to-end tests driving `ProtocolEngine::serve` over a real
//! TCP socket, playing the part of the emulator-side Lua script. Modeled on
//! the teacher's `queue_integration_tests.rs` placement convention (a
//! dedicated integration file alongside, not nested inside, the module it
//! exercises) and its `ws_integration_tests` style of scripting a fake peer
//! against a real server task.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

use mgba_bridge_config::SqliteConfigStore;
use mgba_bridge_detect::GameDetector;
use mgba_bridge_engine::buffer::ChatBuffer;
use mgba_bridge_engine::session::ProtocolEngine;
use mgba_bridge_llm::{GenerateRequest, GenerateResponse, LlmAdapter, LlmError, LlmProvider, ToolCall};

struct StubProvider;

#[async_trait]
impl LlmProvider for StubProvider {
    async fn generate(&self, _request: GenerateRequest) -> Result<GenerateResponse, LlmError> {
        Ok(GenerateResponse {
            text: "Heading toward the door.".to_string(),
            tool_calls: vec![ToolCall {
                name: "press_button".to_string(),
                arguments: json!({"buttons": ["A"]}),
            }],
        })
    }
}

async fn spawn_engine(bind_addr: &'static str) -> Arc<ProtocolEngine> {
    let buffer = ChatBuffer::with_default_capacity();
    let config_store = Arc::new(SqliteConfigStore::in_memory().await.unwrap());
    let detector = Arc::new(GameDetector::with_builtin_games());
    let llm = Arc::new(LlmAdapter::new(
        Arc::new(StubProvider),
        "/nonexistent/prompt_template.txt",
    ));

    let engine = ProtocolEngine::new(
        buffer,
        config_store,
        detector,
        llm,
        Duration::from_secs(5),
        8,
        Duration::from_secs(60),
    );

    let serving = engine.clone();
    tokio::spawn(async move {
        serving.serve(bind_addr).await.ok();
    });
    // Give the listener a moment to bind before the test dials in.
    tokio::time::sleep(Duration::from_millis(50)).await;
    engine
}

async fn read_line(stream: &mut TcpStream) -> String {
    let mut buf = [0u8; 4096];
    let mut collected = Vec::new();
    loop {
        let n = stream.read(&mut buf).await.expect("socket read failed");
        assert!(n > 0, "peer closed before sending a line");
        collected.extend_from_slice(&buf[..n]);
        if let Some(pos) = collected.iter().position(|b| *b == b'\n') {
            return String::from_utf8_lossy(&collected[..pos]).into_owned();
        }
    }
}

#[tokio::test]
async fn happy_path_completes_a_full_cycle() {
    let _engine = spawn_engine("127.0.0.1:18881").await;

    let dir = tempfile::tempdir().unwrap();
    let screenshot = dir.path().join("cur.png");
    tokio::fs::write(&screenshot, b"\x89PNG").await.unwrap();

    let mut stream = TcpStream::connect("127.0.0.1:18881").await.unwrap();

    stream.write_all(b"ready||true\n").await.unwrap();

    let config_line = read_line(&mut stream).await;
    assert!(config_line.starts_with("game_config||"));

    stream.write_all(b"config_loaded||true\n").await.unwrap();

    let request_line = read_line(&mut stream).await;
    assert_eq!(request_line, "request_screenshot");

    let frame = format!(
        "screenshot_with_state||{}||UP||5||6||1\n",
        screenshot.to_str().unwrap()
    );
    stream.write_all(frame.as_bytes()).await.unwrap();

    let button_line = read_line(&mut stream).await;
    assert_eq!(button_line, "0"); // A = code 0, default duration omitted on the wire
}

#[tokio::test]
async fn split_screenshot_frame_reassembles_across_two_writes() {
    let _engine = spawn_engine("127.0.0.1:18882").await;

    let dir = tempfile::tempdir().unwrap();
    let current = dir.path().join("cur.png");
    let previous = dir.path().join("prev.png");
    tokio::fs::write(&current, b"\x89PNG").await.unwrap();
    tokio::fs::write(&previous, b"\x89PNG").await.unwrap();

    let mut stream = TcpStream::connect("127.0.0.1:18882").await.unwrap();
    stream.write_all(b"ready||true\n").await.unwrap();
    read_line(&mut stream).await; // game_config
    stream.write_all(b"config_loaded||true\n").await.unwrap();
    read_line(&mut stream).await; // request_screenshot

    let first_half = format!(
        "enhanced_screenshot_with_state||{}||{}||DOWN||",
        current.to_str().unwrap(),
        previous.to_str().unwrap()
    );
    stream.write_all(first_half.as_bytes()).await.unwrap();
    tokio::time::sleep(Duration::from_millis(20)).await;
    stream.write_all(b"12||5||1||2\n").await.unwrap();

    let button_line = read_line(&mut stream).await;
    assert_eq!(button_line, "0");
}
