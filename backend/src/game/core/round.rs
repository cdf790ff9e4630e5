use super::item::{ChallengeItem, Step};
use super::log::{Example, ResultLog, RoundOutcome, RoundResult};
use super::pool::{Draw, ItemPool};
use super::verdict::Verdict;
use chrono::Utc;
use serde::{Deserialize, Serialize};

/// Where the current round is in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoundState {
    Idle,
    Presenting,
    AwaitingResponse,
    Judging,
    Resolved,
    GameOver,
}

/// What the player sees for the active step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoundView {
    pub round: u32,
    pub step: usize,
    pub steps: usize,
    pub prompt: String,
    pub options: Vec<String>,
}

/// Result of trying to present the next round
#[derive(Debug, PartialEq)]
pub enum Advance {
    Presented(RoundView),
    Exhausted,
    /// A round is still in progress
    Busy,
    /// Game over has been entered
    Closed,
}

/// Why a submission was ignored
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    Empty,
    NotAccepting,
    AlreadyJudging,
    GameOver,
}

/// A submission accepted for judging
#[derive(Debug, Clone, PartialEq)]
pub struct PendingJudgment {
    pub round: u32,
    pub step_index: usize,
    pub step: Step,
    pub response: String,
}

/// Result of applying a verdict
#[derive(Debug, PartialEq)]
pub enum Judged {
    /// Chain round: the step was correct, the next one is up
    NextStep(RoundView),
    Resolved {
        outcome: RoundOutcome,
        game_over: bool,
    },
    /// The verdict does not belong to the round being judged
    Stale,
}

/// Result of requesting game over
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameOverEntry {
    Entered,
    /// A judgment is in flight and must land before finalization
    AwaitingJudgment,
    AlreadyEntered,
}

struct CurrentRound {
    sequence: u32,
    item: ChallengeItem,
    step: usize,
    responses: Vec<String>,
}

impl CurrentRound {
    fn view(&self) -> RoundView {
        let step = &self.item.steps[self.step];
        RoundView {
            round: self.sequence,
            step: self.step,
            steps: self.item.steps.len(),
            prompt: step.prompt.clone(),
            options: step.options.clone(),
        }
    }
}

/// Round state machine shared by every mini-game (pure logic, no I/O)
pub struct RoundController {
    state: RoundState,
    current: Option<CurrentRound>,
    next_sequence: u32,
    score: u32,
    terminal: bool,
}

impl Default for RoundController {
    fn default() -> Self {
        Self::new()
    }
}

impl RoundController {
    pub fn new() -> Self {
        Self {
            state: RoundState::Idle,
            current: None,
            next_sequence: 1,
            score: 0,
            terminal: false,
        }
    }

    pub fn state(&self) -> RoundState {
        self.state
    }

    pub fn score(&self) -> u32 {
        self.score
    }

    /// Number of the round on screen, or of the next one to be drawn
    pub fn round(&self) -> u32 {
        self.current
            .as_ref()
            .map_or(self.next_sequence, |c| c.sequence)
    }

    pub fn rounds_resolved(&self) -> u32 {
        self.next_sequence - 1
    }

    pub fn is_judging(&self) -> bool {
        self.state == RoundState::Judging
    }

    pub fn is_terminal(&self) -> bool {
        self.terminal
    }

    pub fn current_view(&self) -> Option<RoundView> {
        self.current.as_ref().map(CurrentRound::view)
    }

    /// Draw the next item and open it for a response
    pub fn advance(&mut self, pool: &mut ItemPool) -> Advance {
        if self.terminal {
            return Advance::Closed;
        }
        if !matches!(self.state, RoundState::Idle | RoundState::Resolved) {
            return Advance::Busy;
        }

        let Draw::Item(item) = pool.draw() else {
            self.state = RoundState::Idle;
            return Advance::Exhausted;
        };

        self.state = RoundState::Presenting;
        let current = CurrentRound {
            sequence: self.next_sequence,
            item,
            step: 0,
            responses: Vec::new(),
        };
        let view = current.view();
        self.current = Some(current);
        self.state = RoundState::AwaitingResponse;

        Advance::Presented(view)
    }

    /// Accept one response for the active step
    pub fn submit(&mut self, response: &str) -> Result<PendingJudgment, Rejection> {
        if self.terminal {
            return Err(Rejection::GameOver);
        }
        match self.state {
            RoundState::AwaitingResponse => {}
            RoundState::Judging => return Err(Rejection::AlreadyJudging),
            _ => return Err(Rejection::NotAccepting),
        }
        if response.trim().is_empty() {
            return Err(Rejection::Empty);
        }

        let Some(current) = self.current.as_mut() else {
            return Err(Rejection::NotAccepting);
        };

        current.responses.push(response.to_string());
        self.state = RoundState::Judging;

        Ok(PendingJudgment {
            round: current.sequence,
            step_index: current.step,
            step: current.item.steps[current.step].clone(),
            response: response.to_string(),
        })
    }

    /// Apply the judge's verdict for `round`, logging the outcome when the round ends
    pub fn apply_verdict(&mut self, round: u32, verdict: Verdict, log: &mut ResultLog) -> Judged {
        if self.state != RoundState::Judging {
            return Judged::Stale;
        }
        let Some(current) = self.current.as_mut() else {
            return Judged::Stale;
        };
        if current.sequence != round {
            return Judged::Stale;
        }

        let more_steps = current.step + 1 < current.item.steps.len();
        if verdict == Verdict::Correct && more_steps && !self.terminal {
            current.step += 1;
            self.state = RoundState::AwaitingResponse;
            return Judged::NextStep(current.view());
        }

        // A chain cut short by game over counts as not answered
        let result = if verdict == Verdict::Correct && more_steps {
            RoundResult::Incorrect
        } else {
            RoundResult::from(verdict)
        };

        let Some(finished) = self.current.take() else {
            return Judged::Stale;
        };
        let outcome = RoundOutcome {
            sequence: finished.sequence,
            prompt: finished.item.prompt(),
            response: finished.responses.join(" → "),
            result,
            answer: finished.item.canonical(),
            example: Example::None,
            resolved_at: Utc::now(),
        };

        if result == RoundResult::Correct {
            self.score += 1;
        }
        log.append(outcome.clone());
        self.next_sequence += 1;
        self.state = if self.terminal {
            RoundState::GameOver
        } else {
            RoundState::Resolved
        };

        Judged::Resolved {
            outcome,
            game_over: self.terminal,
        }
    }

    /// Guarded transition to game over. Only the first call enters.
    pub fn enter_game_over(&mut self) -> GameOverEntry {
        if self.terminal {
            return GameOverEntry::AlreadyEntered;
        }
        self.terminal = true;

        if self.state == RoundState::Judging {
            return GameOverEntry::AwaitingJudgment;
        }
        self.current = None;
        self.state = RoundState::GameOver;
        GameOverEntry::Entered
    }
}
