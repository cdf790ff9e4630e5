use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// How a round ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoundResult {
    Correct,
    Incorrect,
    /// The judge could not produce a verdict
    Error,
}

/// Example usage backfilled at game end
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "status", content = "text", rename_all = "snake_case")]
pub enum Example {
    /// Mode does not generate examples
    #[default]
    None,
    Generated(String),
    Unavailable,
}

/// Record of one resolved round
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoundOutcome {
    pub sequence: u32,
    pub prompt: String,
    pub response: String,
    pub result: RoundResult,
    pub answer: Option<String>,
    #[serde(default)]
    pub example: Example,
    pub resolved_at: DateTime<Utc>,
}

/// (prompt, canonical answer) pair sent for example generation
#[derive(Debug, Clone, PartialEq)]
pub struct ExamplePair {
    pub sequence: u32,
    pub prompt: String,
    pub answer: String,
}

/// End-of-game numbers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    pub attempted: usize,
    pub correct: usize,
    pub incorrect: usize,
    pub errors: usize,
    pub score: usize,
    pub accuracy: f64,
}

/// Append-only log of round outcomes for one session
#[derive(Debug, Default)]
pub struct ResultLog {
    outcomes: Vec<RoundOutcome>,
}

impl ResultLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, outcome: RoundOutcome) {
        self.outcomes.push(outcome);
    }

    /// Backfill the example for the round with the given sequence number
    pub fn enrich(&mut self, sequence: u32, example: Example) -> bool {
        let Some(outcome) = self.outcomes.iter_mut().find(|o| o.sequence == sequence) else {
            return false;
        };
        outcome.example = example;
        true
    }

    pub fn outcomes(&self) -> &[RoundOutcome] {
        &self.outcomes
    }

    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    pub fn clear(&mut self) {
        self.outcomes.clear();
    }

    pub fn attempted(&self) -> usize {
        self.outcomes.len()
    }

    pub fn correct(&self) -> usize {
        self.count(RoundResult::Correct)
    }

    fn count(&self, result: RoundResult) -> usize {
        self.outcomes.iter().filter(|o| o.result == result).count()
    }

    /// Percentage of correct rounds, one decimal. Zero when nothing was attempted.
    pub fn accuracy(&self) -> f64 {
        let attempted = self.attempted();
        if attempted == 0 {
            return 0.0;
        }
        let percent = self.correct() as f64 / attempted as f64 * 100.0;
        (percent * 10.0).round() / 10.0
    }

    pub fn summary(&self) -> Summary {
        Summary {
            attempted: self.attempted(),
            correct: self.correct(),
            incorrect: self.count(RoundResult::Incorrect),
            errors: self.count(RoundResult::Error),
            score: self.correct(),
            accuracy: self.accuracy(),
        }
    }

    /// Rounds that carry a canonical answer, in log order
    pub fn example_pairs(&self) -> Vec<ExamplePair> {
        self.outcomes
            .iter()
            .filter_map(|o| {
                Some(ExamplePair {
                    sequence: o.sequence,
                    prompt: o.prompt.clone(),
                    answer: o.answer.clone()?,
                })
            })
            .collect()
    }
}
