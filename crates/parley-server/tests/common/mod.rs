//! Shared harness for WebSocket integration tests: in-memory engines and a
//! real server bound to an ephemeral port.

#![allow(dead_code)]

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use futures_util::{SinkExt, StreamExt};
use parley_server::{app, AppState};
use parley_types::{Message, VoiceProfile};
use parley_voice::{
    ChatModel, RetryPolicy, ServiceKind, SpeechSynthesizer, Transcriber, VoiceError,
    VoiceServices, WebSearch,
};
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::{
    connect_async, tungstenite::protocol::Message as WsMessage, MaybeTlsStream, WebSocketStream,
};

pub type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

pub const SPEECH: &[u8] = b"ID3\x04\x00fake-mp3-frames";
pub const SEARCH_ANSWER: &str = "It is sunny and 21 degrees in Lisbon.";

/// Returns queued transcripts in order, repeating the last one.
/// A transcript of `"PANIC"` panics inside the turn; `"SLOW_FAIL"` fails
/// after a short delay.
pub struct ScriptedTranscriber {
    transcripts: Mutex<Vec<String>>,
    pub calls: AtomicUsize,
}

impl ScriptedTranscriber {
    pub fn new(transcripts: &[&str]) -> Self {
        Self {
            transcripts: Mutex::new(transcripts.iter().rev().map(|s| s.to_string()).collect()),
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl Transcriber for ScriptedTranscriber {
    async fn transcribe(&self, _audio: &[u8], _extension: &str) -> Result<String, VoiceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let text = {
            let mut queue = self.transcripts.lock().unwrap();
            if queue.len() > 1 {
                queue.pop().unwrap()
            } else {
                queue.last().cloned().unwrap_or_default()
            }
        };
        if text == "PANIC" {
            panic!("transcriber blew up");
        }
        if text == "SLOW_FAIL" {
            tokio::time::sleep(Duration::from_millis(300)).await;
            return Err(VoiceError::unavailable(
                ServiceKind::Transcription,
                "request timed out",
            ));
        }
        if text.is_empty() {
            return Err(VoiceError::invalid(
                ServiceKind::Transcription,
                "empty transcription",
            ));
        }
        Ok(text)
    }
}

/// Replies with the number of messages it was shown. Panics when the
/// latest message is `"explode"`.
pub struct CountingChat {
    pub calls: AtomicUsize,
}

#[async_trait]
impl ChatModel for CountingChat {
    async fn reply(&self, history: &[Message]) -> Result<String, VoiceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if history.last().is_some_and(|m| m.content == "explode") {
            panic!("chat model blew up");
        }
        Ok(format!("I saw {} messages.", history.len()))
    }
}

pub struct CannedSearch;

#[async_trait]
impl WebSearch for CannedSearch {
    async fn search(&self, _query: &str) -> Result<String, VoiceError> {
        Ok(SEARCH_ANSWER.to_string())
    }
}

pub struct StubSynth {
    pub fail: bool,
}

#[async_trait]
impl SpeechSynthesizer for StubSynth {
    async fn synthesize(&self, _text: &str, _profile: &VoiceProfile) -> Result<Vec<u8>, VoiceError> {
        if self.fail {
            Err(VoiceError::unavailable(ServiceKind::Synthesis, "tts down"))
        } else {
            Ok(SPEECH.to_vec())
        }
    }
}

pub struct TestServer {
    pub addr: SocketAddr,
    pub scratch_root: tempfile::TempDir,
    pub transcriber: Arc<ScriptedTranscriber>,
    pub chat: Arc<CountingChat>,
}

pub struct ServerOptions<'a> {
    pub transcripts: &'a [&'a str],
    pub search: bool,
    pub synth_fails: bool,
}

impl Default for ServerOptions<'_> {
    fn default() -> Self {
        Self {
            transcripts: &["tell me a joke"],
            search: true,
            synth_fails: false,
        }
    }
}

pub async fn spawn_server(options: ServerOptions<'_>) -> TestServer {
    let scratch_root = tempfile::tempdir().unwrap();
    let transcriber = Arc::new(ScriptedTranscriber::new(options.transcripts));
    let chat = Arc::new(CountingChat {
        calls: AtomicUsize::new(0),
    });

    let mut services = VoiceServices::new(
        transcriber.clone(),
        chat.clone(),
        Arc::new(StubSynth {
            fail: options.synth_fails,
        }),
    )
    .with_retry_policy(RetryPolicy {
        max_attempts: 2,
        delay: Duration::from_millis(1),
    });
    if options.search {
        services = services.with_search(Arc::new(CannedSearch));
    }

    let state = AppState::new(services, scratch_root.path());
    let app = app(state);
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .await
        .unwrap();
    });

    TestServer {
        addr,
        scratch_root,
        transcriber,
        chat,
    }
}

pub async fn connect(addr: SocketAddr) -> Client {
    let (ws, _) = connect_async(format!("ws://{}/ws", addr))
        .await
        .expect("failed to connect");
    ws
}

pub fn audio_event(len: usize) -> WsMessage {
    let payload = BASE64.encode(vec![0x1au8; len]);
    WsMessage::Text(
        json!({ "type": "audio", "mime": "audio/webm;codecs=opus", "audio": payload })
            .to_string()
            .into(),
    )
}

pub async fn send(ws: &mut Client, message: WsMessage) {
    ws.send(message).await.expect("failed to send frame");
}

/// Next JSON event from the server, skipping control frames.
pub async fn next_event(ws: &mut Client) -> Value {
    loop {
        let frame = tokio::time::timeout(Duration::from_secs(5), ws.next())
            .await
            .expect("timed out waiting for server event")
            .expect("stream ended")
            .expect("websocket error");
        match frame {
            WsMessage::Text(text) => return serde_json::from_str(text.as_str()).unwrap(),
            WsMessage::Ping(_) | WsMessage::Pong(_) => continue,
            other => panic!("unexpected frame: {:?}", other),
        }
    }
}

/// Collects events until (and including) the turn's `audio` or `error` event.
pub async fn turn_events(ws: &mut Client) -> Vec<Value> {
    let mut events = Vec::new();
    loop {
        let event = next_event(ws).await;
        let done = matches!(event["type"].as_str(), Some("audio") | Some("error"));
        events.push(event);
        if done {
            return events;
        }
    }
}

pub fn kinds(events: &[Value]) -> Vec<&str> {
    events
        .iter()
        .map(|e| e["type"].as_str().unwrap_or_default())
        .collect()
}

/// Waits until the server has closed the connection.
pub async fn expect_closed(ws: &mut Client) {
    loop {
        match tokio::time::timeout(Duration::from_secs(5), ws.next())
            .await
            .expect("timed out waiting for close")
        {
            None | Some(Err(_)) | Some(Ok(WsMessage::Close(_))) => return,
            Some(Ok(WsMessage::Ping(_))) | Some(Ok(WsMessage::Pong(_))) => continue,
            Some(Ok(other)) => panic!("expected close, got {:?}", other),
        }
    }
}

pub fn entries(dir: &Path) -> usize {
    std::fs::read_dir(dir).map(|d| d.count()).unwrap_or(0)
}

/// Polls until the directory has `expected` entries.
pub async fn wait_for_entries(dir: &Path, expected: usize) {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    while entries(dir) != expected {
        assert!(
            tokio::time::Instant::now() < deadline,
            "expected {} entries in {}, found {}",
            expected,
            dir.display(),
            entries(dir)
        );
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
}
