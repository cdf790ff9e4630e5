use super::log::{RoundOutcome, Summary};
use crate::game::modes::GameMode;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    Start { mode: GameMode, filter_key: String },
    Submit { response: String },
    Reset,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    // Initialization
    Loading {
        mode: GameMode,
        filter_key: String,
    },
    InitFailed {
        message: String,
    },
    Ready {
        items: usize,
    },
    Countdown {
        remaining: u32,
    },

    // Round flow
    RoundStart {
        round: u32,
        prompt: String,
        options: Vec<String>,
        step: usize,
        steps: usize,
    },
    StepStart {
        round: u32,
        step: usize,
        prompt: String,
        options: Vec<String>,
    },
    Judging {
        round: u32,
    },
    RoundResult {
        outcome: RoundOutcome,
        score: u32,
    },
    Tick {
        remaining: u32,
    },

    // End of game
    Finalizing,
    GameEnd {
        score: u32,
        summary: Summary,
        outcomes: Vec<RoundOutcome>,
    },
    Error {
        message: String,
    },
}
