#![allow(dead_code)]

use futures_util::StreamExt;
use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::net::TcpListener;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async, tungstenite::Message};
use verbotron::GameSettings;
use verbotron::game::core::{ChallengeItem, Expected, Step};
use verbotron::game::engine::{ItemSource, LanguageModel, ModelError, SessionConfig, SourceError};
use verbotron::game::modes::GameMode;
use verbotron::messages::{ClientMessage, ServerMessage};

pub type WsStream = WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>;

pub struct TestServer {
    base_url: String,
}

impl TestServer {
    pub fn play_url(&self) -> String {
        format!("{}/ws/play", self.base_url)
    }

    pub fn http_url(&self, path: &str) -> String {
        format!(
            "http://{}{}",
            self.base_url.strip_prefix("ws://").unwrap(),
            path
        )
    }
}

/// Short pacing so WebSocket games finish quickly in real time
pub fn fast_settings() -> GameSettings {
    GameSettings {
        session: SessionConfig {
            pacing: Duration::from_millis(10),
            countdown_ticks: 0,
            ..SessionConfig::default()
        },
        ..GameSettings::default()
    }
}

pub async fn spawn_test_server() -> TestServer {
    spawn_test_server_with(fast_settings()).await
}

pub async fn spawn_test_server_with(settings: GameSettings) -> TestServer {
    let pool = sqlx::SqlitePool::connect(":memory:").await.unwrap();
    sqlx::migrate!().run(&pool).await.unwrap();

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        let app = verbotron::app_with_config(pool, settings);
        axum::serve(listener, app).await.unwrap();
    });

    TestServer {
        base_url: format!("ws://{}", addr),
    }
}

pub async fn connect_play(server: &TestServer) -> WsStream {
    let (ws, _) = connect_async(&server.play_url()).await.expect("Failed to connect");
    ws
}

fn to_message(msg: &ClientMessage) -> Message {
    Message::Text(serde_json::to_string(msg).unwrap().into())
}

pub fn start_msg(mode: GameMode, filter_key: &str) -> Message {
    to_message(&ClientMessage::Start {
        mode,
        filter_key: filter_key.to_string(),
    })
}

pub fn submit_msg(response: &str) -> Message {
    to_message(&ClientMessage::Submit {
        response: response.to_string(),
    })
}

pub fn reset_msg() -> Message {
    to_message(&ClientMessage::Reset)
}

pub async fn recv(ws: &mut WsStream) -> ServerMessage {
    let msg = ws.next().await.unwrap().unwrap();
    serde_json::from_str(msg.to_text().unwrap()).unwrap()
}

/// Receive until a message other than a clock tick arrives
pub async fn recv_skipping_ticks(ws: &mut WsStream) -> ServerMessage {
    loop {
        let msg = recv(ws).await;
        if !matches!(msg, ServerMessage::Tick { .. }) {
            return msg;
        }
    }
}

/// Look up the correct answer from seed data
pub fn answer_for(sentence: &str) -> &'static str {
    match sentence {
        "The cat slept on the warm __ all afternoon." => "mat",
        "She drank a glass of cold __ after the race." => "water",
        "We __ to the park every Sunday morning." => "walk",
        "The scientist tried to __ the results of the experiment." => "replicate",
        "His __ attitude made the meeting last twice as long." => "stubborn",
        "The old bridge was too __ to carry heavy trucks." => "fragile",
        "After weeks of rain, the river began to __ its banks." => "overflow",
        "The committee will __ the proposal next week." => "review",
        "Her argument was so __ that nobody dared to object." => "cogent",
        "The diplomat chose an __ reply to avoid offending either side." => "equivocal",
        _ => panic!("Unknown sentence: {}", sentence),
    }
}

/// `count` single-step literal items: "prompt N" is answered by "answer N"
pub fn literal_items(count: usize) -> Vec<ChallengeItem> {
    (1..=count)
        .map(|i| {
            ChallengeItem::single(
                format!("item-{i}"),
                Step::new(format!("prompt {i}"), Expected::literal(format!("answer {i}"))),
            )
        })
        .collect()
}

/// `count` clue items judged against their category
pub fn clue_items(count: usize) -> Vec<ChallengeItem> {
    (1..=count)
        .map(|i| {
            ChallengeItem::single(
                format!("clue-{i}"),
                Step::new(
                    format!("prompt {i}"),
                    Expected::criterion("emotion", Some(format!("answer {i}"))),
                )
                .with_context("clue", format!("prompt {i}"))
                .with_context("category", "emotion"),
            )
        })
        .collect()
}

pub fn answer_to(prompt: &str) -> String {
    prompt.replace("prompt", "answer")
}

/// In-memory item source
pub enum TestSource {
    Items(Vec<ChallengeItem>),
    Failing,
    /// Fails on the first fetch, then serves the items
    FailsOnce {
        failed: AtomicBool,
        items: Vec<ChallengeItem>,
    },
}

impl TestSource {
    pub fn fails_once(items: Vec<ChallengeItem>) -> Self {
        TestSource::FailsOnce {
            failed: AtomicBool::new(false),
            items,
        }
    }
}

impl ItemSource for TestSource {
    async fn fetch(
        &self,
        _mode: GameMode,
        _filter_key: &str,
    ) -> Result<Vec<ChallengeItem>, SourceError> {
        match self {
            TestSource::Items(items) => Ok(items.clone()),
            TestSource::Failing => Err(SourceError::Status(503)),
            TestSource::FailsOnce { failed, items } => {
                if failed.swap(true, Ordering::SeqCst) {
                    Ok(items.clone())
                } else {
                    Err(SourceError::Status(503))
                }
            }
        }
    }
}

pub struct Scripted {
    pub delay: Duration,
    pub reply: Result<String, ModelError>,
}

pub fn reply(text: &str) -> Scripted {
    Scripted {
        delay: Duration::ZERO,
        reply: Ok(text.to_string()),
    }
}

pub fn delayed(text: &str, delay: Duration) -> Scripted {
    Scripted {
        delay,
        reply: Ok(text.to_string()),
    }
}

pub fn failure(error: ModelError) -> Scripted {
    Scripted {
        delay: Duration::ZERO,
        reply: Err(error),
    }
}

/// Language model answering warm-ups with "1" and everything else from a script
#[derive(Default)]
pub struct ScriptedModel {
    script: Mutex<VecDeque<Scripted>>,
    requests: Mutex<Vec<String>>,
}

impl ScriptedModel {
    pub fn new(script: Vec<Scripted>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Requests other than warm-ups
    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }

    fn is_warm_up(user: &str) -> bool {
        [GameMode::VocabHit, GameMode::WordForge, GameMode::WordVerseInput]
            .into_iter()
            .filter_map(GameMode::prompts)
            .any(|p| p.warm_up == user)
    }
}

impl LanguageModel for ScriptedModel {
    async fn complete(&self, _system: &str, user: &str) -> Result<String, ModelError> {
        if Self::is_warm_up(user) {
            return Ok("1".to_string());
        }
        self.requests.lock().unwrap().push(user.to_string());
        let next = self.script.lock().unwrap().pop_front();
        let Some(Scripted { delay, reply }) = next else {
            return Err(ModelError::EmptyReply);
        };
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        reply
    }
}
