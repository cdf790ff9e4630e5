use super::judge::Judge;
use super::model::LanguageModel;
use super::source::{ItemSource, SourceError};
use crate::game::core::messages::ServerMessage;
use crate::game::core::{
    Advance, ChallengeItem, ClockTick, Example, GameOverEntry, ItemPool, Judged, PendingJudgment,
    ResultLog, RoundController, RoundView, SessionClock, Verdict,
};
use crate::game::modes::GameMode;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

pub const DEFAULT_SESSION_SECONDS: u32 = 60;
pub const DEFAULT_COUNTDOWN_TICKS: u32 = 3;
pub const DEFAULT_PACING: Duration = Duration::from_millis(800);
pub const DEFAULT_RETRY_BACKOFF: Duration = Duration::from_secs(1);

/// Timing knobs for a session
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub session_seconds: u32,
    pub countdown_ticks: u32,
    pub tick: Duration,
    /// Delay between a resolved round and the next one
    pub pacing: Duration,
    pub retry_backoff: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            session_seconds: DEFAULT_SESSION_SECONDS,
            countdown_ticks: DEFAULT_COUNTDOWN_TICKS,
            tick: Duration::from_secs(1),
            pacing: DEFAULT_PACING,
            retry_backoff: DEFAULT_RETRY_BACKOFF,
        }
    }
}

/// Presentation-level lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Idle,
    Loading,
    Failed,
    Countdown,
    Playing,
    Finalizing,
    Summary,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionSnapshot {
    pub phase: Phase,
    pub mode: Option<GameMode>,
    pub filter_key: Option<String>,
    pub round: u32,
    pub score: u32,
    pub remaining_seconds: u32,
    pub awaiting_judgment: bool,
    pub rounds_logged: usize,
    pub items_remaining: usize,
}

#[derive(Debug, Error, PartialEq)]
pub enum SessionError {
    #[error("{key:?} is not a valid filter for {mode}")]
    InvalidFilter { mode: GameMode, key: String },
    #[error("session has shut down")]
    Closed,
}

enum Command {
    Start { mode: GameMode, filter_key: String },
    Submit { response: String },
    Reset,
    Snapshot { reply: oneshot::Sender<SessionSnapshot> },
}

/// Results of suspended work, tagged with the epoch that started it
enum Internal {
    Loaded {
        epoch: u64,
        result: Result<Vec<ChallengeItem>, SourceError>,
    },
    CountdownTick {
        epoch: u64,
        remaining: u32,
    },
    Tick {
        epoch: u64,
    },
    Judged {
        epoch: u64,
        round: u32,
        verdict: Verdict,
    },
    PacingElapsed {
        epoch: u64,
    },
    Finalized {
        epoch: u64,
        examples: Vec<(u32, Example)>,
    },
}

impl Internal {
    fn epoch(&self) -> u64 {
        match self {
            Internal::Loaded { epoch, .. }
            | Internal::CountdownTick { epoch, .. }
            | Internal::Tick { epoch }
            | Internal::Judged { epoch, .. }
            | Internal::PacingElapsed { epoch }
            | Internal::Finalized { epoch, .. } => *epoch,
        }
    }
}

/// Cheap handle to a running session. The session stops when every handle is dropped.
#[derive(Clone)]
pub struct SessionHandle {
    commands: mpsc::Sender<Command>,
    events: broadcast::Sender<ServerMessage>,
}

impl SessionHandle {
    pub async fn start(
        &self,
        mode: GameMode,
        filter_key: impl Into<String>,
    ) -> Result<(), SessionError> {
        let filter_key = filter_key.into();
        if !mode.accepts_filter(&filter_key) {
            return Err(SessionError::InvalidFilter {
                mode,
                key: filter_key,
            });
        }
        self.send(Command::Start { mode, filter_key }).await
    }

    pub async fn submit(&self, response: impl Into<String>) -> Result<(), SessionError> {
        self.send(Command::Submit {
            response: response.into(),
        })
        .await
    }

    pub async fn reset(&self) -> Result<(), SessionError> {
        self.send(Command::Reset).await
    }

    pub async fn snapshot(&self) -> Result<SessionSnapshot, SessionError> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::Snapshot { reply }).await?;
        rx.await.map_err(|_| SessionError::Closed)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ServerMessage> {
        self.events.subscribe()
    }

    async fn send(&self, command: Command) -> Result<(), SessionError> {
        self.commands
            .send(command)
            .await
            .map_err(|_| SessionError::Closed)
    }
}

/// One player's game: owns the pool, judge, round controller, clock and log.
/// All state lives inside a single task; timers, fetches and judgments report back as messages.
pub struct GameSession<S, M> {
    source: Arc<S>,
    model: Option<Arc<M>>,
    config: SessionConfig,
    events: broadcast::Sender<ServerMessage>,
    internal_tx: mpsc::UnboundedSender<Internal>,

    epoch: u64,
    phase: Phase,
    mode: Option<GameMode>,
    filter_key: Option<String>,
    judge: Judge<M>,
    pool: ItemPool,
    controller: RoundController,
    clock: SessionClock,
    log: ResultLog,
    ticker: Option<JoinHandle<()>>,
    countdown: Option<JoinHandle<()>>,
}

impl<S: ItemSource, M: LanguageModel> GameSession<S, M> {
    /// Spawn a session task. `model` is used by remotely judged modes; without one they judge locally.
    pub fn spawn(source: Arc<S>, model: Option<Arc<M>>, config: SessionConfig) -> SessionHandle {
        let (commands_tx, commands_rx) = mpsc::channel(32);
        let (internal_tx, internal_rx) = mpsc::unbounded_channel();
        let (events, _) = broadcast::channel(64);

        let session = Self {
            source,
            model,
            clock: SessionClock::new(config.session_seconds),
            config,
            events: events.clone(),
            internal_tx,
            epoch: 0,
            phase: Phase::Idle,
            mode: None,
            filter_key: None,
            judge: Judge::Local,
            pool: ItemPool::new(),
            controller: RoundController::new(),
            log: ResultLog::new(),
            ticker: None,
            countdown: None,
        };
        tokio::spawn(session.run(commands_rx, internal_rx));

        SessionHandle {
            commands: commands_tx,
            events,
        }
    }

    async fn run(
        mut self,
        mut commands: mpsc::Receiver<Command>,
        mut internal: mpsc::UnboundedReceiver<Internal>,
    ) {
        loop {
            tokio::select! {
                command = commands.recv() => {
                    let Some(command) = command else { break };
                    self.handle_command(command);
                }
                Some(msg) = internal.recv() => {
                    if msg.epoch() != self.epoch {
                        debug!(stale = msg.epoch(), current = self.epoch, "Dropping stale session message");
                        continue;
                    }
                    self.handle_internal(msg);
                }
            }
        }

        self.stop_timers();
        debug!("Session closed");
    }

    fn handle_command(&mut self, command: Command) {
        match command {
            Command::Start { mode, filter_key } => self.begin(mode, filter_key),
            Command::Submit { response } => self.submit(response),
            Command::Reset => {
                let (Some(mode), Some(filter_key)) = (self.mode, self.filter_key.clone()) else {
                    debug!("Reset before start, ignoring");
                    return;
                };
                info!(%mode, filter_key = %filter_key, "Resetting session");
                self.begin(mode, filter_key);
            }
            Command::Snapshot { reply } => {
                let _ = reply.send(self.snapshot());
            }
        }
    }

    fn handle_internal(&mut self, msg: Internal) {
        match msg {
            Internal::Loaded { result, .. } => self.on_loaded(result),
            Internal::CountdownTick { remaining, .. } => {
                if remaining > 0 {
                    self.emit(ServerMessage::Countdown { remaining });
                } else {
                    self.countdown = None;
                    self.begin_play();
                }
            }
            Internal::Tick { .. } => self.on_tick(),
            Internal::Judged { round, verdict, .. } => self.on_judged(round, verdict),
            Internal::PacingElapsed { .. } => {
                if !self.controller.is_terminal() {
                    self.next_round();
                }
            }
            Internal::Finalized { examples, .. } => self.complete(examples),
        }
    }

    fn emit(&self, msg: ServerMessage) {
        let _ = self.events.send(msg);
    }

    fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            phase: self.phase,
            mode: self.mode,
            filter_key: self.filter_key.clone(),
            round: self.controller.round(),
            score: self.controller.score(),
            remaining_seconds: self.clock.remaining(),
            awaiting_judgment: self.controller.is_judging(),
            rounds_logged: self.log.len(),
            items_remaining: self.pool.remaining(),
        }
    }

    fn stop_timers(&mut self) {
        if let Some(ticker) = self.ticker.take() {
            ticker.abort();
        }
        if let Some(countdown) = self.countdown.take() {
            countdown.abort();
        }
    }

    fn judge_for(&self, mode: GameMode) -> Judge<M> {
        let Some(prompts) = mode.prompts() else {
            return Judge::Local;
        };
        match &self.model {
            Some(model) => Judge::remote(Arc::clone(model), prompts, self.config.retry_backoff),
            None => {
                warn!(%mode, "No language model configured, judging against reference answers");
                Judge::Local
            }
        }
    }

    /// Fresh session state, then load items in the background
    fn begin(&mut self, mode: GameMode, filter_key: String) {
        self.epoch += 1;
        self.stop_timers();

        self.mode = Some(mode);
        self.filter_key = Some(filter_key.clone());
        self.judge = self.judge_for(mode);
        self.pool.clear();
        self.controller = RoundController::new();
        self.clock = SessionClock::new(self.config.session_seconds);
        self.log.clear();
        self.phase = Phase::Loading;

        info!(epoch = self.epoch, %mode, filter_key = %filter_key, "Loading session");
        self.emit(ServerMessage::Loading {
            mode,
            filter_key: filter_key.clone(),
        });

        let source = Arc::clone(&self.source);
        let judge = self.judge.clone();
        let tx = self.internal_tx.clone();
        let epoch = self.epoch;
        tokio::spawn(async move {
            let (result, warm_up) = tokio::join!(source.fetch(mode, &filter_key), judge.warm_up());
            if let Err(e) = warm_up {
                warn!(error = %e, "Judge warm-up failed");
            }
            let _ = tx.send(Internal::Loaded { epoch, result });
        });
    }

    fn on_loaded(&mut self, result: Result<Vec<ChallengeItem>, SourceError>) {
        let items = match result {
            Ok(items) => items,
            Err(e) => {
                warn!(error = %e, "Failed to load challenge items");
                self.phase = Phase::Failed;
                self.emit(ServerMessage::InitFailed {
                    message: e.to_string(),
                });
                return;
            }
        };

        self.pool.load(items);
        info!(items = self.pool.len(), "Session ready");
        self.emit(ServerMessage::Ready {
            items: self.pool.len(),
        });

        if self.pool.is_empty() {
            self.game_over();
            return;
        }

        let ticks = self.config.countdown_ticks;
        let uses_countdown = self.mode.is_some_and(GameMode::uses_countdown);
        if !uses_countdown || ticks == 0 {
            self.begin_play();
            return;
        }

        self.phase = Phase::Countdown;
        self.emit(ServerMessage::Countdown { remaining: ticks });
        let tx = self.internal_tx.clone();
        let epoch = self.epoch;
        let tick = self.config.tick;
        self.countdown = Some(tokio::spawn(async move {
            for remaining in (0..ticks).rev() {
                tokio::time::sleep(tick).await;
                if tx.send(Internal::CountdownTick { epoch, remaining }).is_err() {
                    break;
                }
            }
        }));
    }

    fn begin_play(&mut self) {
        self.phase = Phase::Playing;
        self.clock.start();

        let tx = self.internal_tx.clone();
        let epoch = self.epoch;
        let tick = self.config.tick;
        self.ticker = Some(tokio::spawn(async move {
            loop {
                tokio::time::sleep(tick).await;
                if tx.send(Internal::Tick { epoch }).is_err() {
                    break;
                }
            }
        }));

        self.next_round();
    }

    fn next_round(&mut self) {
        match self.controller.advance(&mut self.pool) {
            Advance::Presented(view) => {
                info!(round = view.round, steps = view.steps, "Round started");
                let RoundView {
                    round,
                    step,
                    steps,
                    prompt,
                    options,
                } = view;
                self.emit(ServerMessage::RoundStart {
                    round,
                    prompt,
                    options,
                    step,
                    steps,
                });
            }
            Advance::Exhausted => {
                info!(rounds = self.log.len(), "Item pool exhausted");
                self.game_over();
            }
            Advance::Busy | Advance::Closed => {}
        }
    }

    fn submit(&mut self, response: String) {
        if self.phase != Phase::Playing {
            debug!(phase = ?self.phase, "Submission outside play, ignoring");
            return;
        }

        let pending = match self.controller.submit(&response) {
            Ok(pending) => pending,
            Err(rejection) => {
                debug!(?rejection, "Submission rejected");
                return;
            }
        };

        if let Some(verdict) = self.judge.immediate(&pending.step, &pending.response) {
            self.on_judged(pending.round, verdict);
            return;
        }

        self.emit(ServerMessage::Judging {
            round: pending.round,
        });
        let judge = self.judge.clone();
        let tx = self.internal_tx.clone();
        let epoch = self.epoch;
        tokio::spawn(async move {
            let PendingJudgment {
                round,
                step,
                response,
                ..
            } = pending;
            let verdict = judge.evaluate(&step, &response).await;
            let _ = tx.send(Internal::Judged {
                epoch,
                round,
                verdict,
            });
        });
    }

    fn on_judged(&mut self, round: u32, verdict: Verdict) {
        match self.controller.apply_verdict(round, verdict, &mut self.log) {
            Judged::Stale => debug!(round, "Verdict for a closed round, ignoring"),
            Judged::NextStep(view) => {
                self.emit(ServerMessage::StepStart {
                    round: view.round,
                    step: view.step,
                    prompt: view.prompt,
                    options: view.options,
                });
            }
            Judged::Resolved { outcome, game_over } => {
                let score = self.controller.score();
                info!(round, result = ?outcome.result, score, "Round resolved");
                self.emit(ServerMessage::RoundResult { outcome, score });

                if game_over {
                    self.finalize();
                    return;
                }

                let tx = self.internal_tx.clone();
                let epoch = self.epoch;
                let pacing = self.config.pacing;
                tokio::spawn(async move {
                    tokio::time::sleep(pacing).await;
                    let _ = tx.send(Internal::PacingElapsed { epoch });
                });
            }
        }
    }

    fn on_tick(&mut self) {
        match self.clock.tick() {
            ClockTick::Running(remaining) => self.emit(ServerMessage::Tick { remaining }),
            ClockTick::Expired => {
                info!("Session clock expired");
                self.emit(ServerMessage::Tick { remaining: 0 });
                self.game_over();
            }
            ClockTick::Idle => {}
        }
    }

    fn game_over(&mut self) {
        self.clock.stop();
        self.stop_timers();

        match self.controller.enter_game_over() {
            GameOverEntry::Entered => self.finalize(),
            GameOverEntry::AwaitingJudgment => {
                info!("Game over, waiting for in-flight judgment");
            }
            GameOverEntry::AlreadyEntered => debug!("Game over already entered"),
        }
    }

    /// Enrich the log if the mode asks for it, then publish the summary
    fn finalize(&mut self) {
        self.clock.stop();
        self.stop_timers();
        self.phase = Phase::Finalizing;
        self.emit(ServerMessage::Finalizing);

        let enriches = self.mode.is_some_and(GameMode::enriches);
        let pairs = self.log.example_pairs();
        if !enriches || pairs.is_empty() {
            self.complete(Vec::new());
            return;
        }

        let judge = self.judge.clone();
        let tx = self.internal_tx.clone();
        let epoch = self.epoch;
        tokio::spawn(async move {
            let generated = judge.generate_examples(&pairs).await;
            let examples = pairs.iter().map(|p| p.sequence).zip(generated).collect();
            let _ = tx.send(Internal::Finalized { epoch, examples });
        });
    }

    fn complete(&mut self, examples: Vec<(u32, Example)>) {
        for (sequence, example) in examples {
            self.log.enrich(sequence, example);
        }

        let summary = self.log.summary();
        info!(
            attempted = summary.attempted,
            correct = summary.correct,
            accuracy = summary.accuracy,
            "Game over"
        );
        self.phase = Phase::Summary;
        self.emit(ServerMessage::GameEnd {
            score: self.controller.score(),
            summary,
            outcomes: self.log.outcomes().to_vec(),
        });
    }
}
