use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// What a response is checked against
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Expected {
    /// The response must equal `answer` exactly
    Literal { answer: String },
    /// The response is judged against a criterion; `reference` is a known good answer, if any
    Criterion {
        criterion: String,
        reference: Option<String>,
    },
}

impl Expected {
    pub fn literal(answer: impl Into<String>) -> Self {
        Self::Literal {
            answer: answer.into(),
        }
    }

    pub fn criterion(criterion: impl Into<String>, reference: Option<String>) -> Self {
        Self::Criterion {
            criterion: criterion.into(),
            reference,
        }
    }

    /// The answer shown in the summary, if the item carries one
    pub fn canonical(&self) -> Option<&str> {
        match self {
            Self::Literal { answer } => Some(answer),
            Self::Criterion { reference, .. } => reference.as_deref(),
        }
    }

    pub fn is_literal(&self) -> bool {
        matches!(self, Self::Literal { .. })
    }
}

/// One prompt within a challenge. Chain challenges have two.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Step {
    pub prompt: String,
    pub expected: Expected,
    #[serde(default)]
    pub options: Vec<String>,
    #[serde(default)]
    pub context: BTreeMap<String, String>,
}

impl Step {
    pub fn new(prompt: impl Into<String>, expected: Expected) -> Self {
        Self {
            prompt: prompt.into(),
            expected,
            options: Vec::new(),
            context: BTreeMap::new(),
        }
    }

    pub fn with_options(mut self, options: Vec<String>) -> Self {
        self.options = options;
        self
    }

    pub fn with_context(mut self, key: &str, value: impl Into<String>) -> Self {
        self.context.insert(key.to_string(), value.into());
        self
    }
}

/// A single unit of game content
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChallengeItem {
    pub id: String,
    pub steps: Vec<Step>,
}

impl ChallengeItem {
    pub fn single(id: impl Into<String>, step: Step) -> Self {
        Self {
            id: id.into(),
            steps: vec![step],
        }
    }

    pub fn chain(id: impl Into<String>, first: Step, second: Step) -> Self {
        Self {
            id: id.into(),
            steps: vec![first, second],
        }
    }

    pub fn step(&self, index: usize) -> Option<&Step> {
        self.steps.get(index)
    }

    pub fn is_chain(&self) -> bool {
        self.steps.len() > 1
    }

    /// Prompt text for the whole item, steps joined in order
    pub fn prompt(&self) -> String {
        self.steps
            .iter()
            .map(|s| s.prompt.as_str())
            .collect::<Vec<_>>()
            .join(" → ")
    }

    /// Canonical answer for the whole item, if every step has one
    pub fn canonical(&self) -> Option<String> {
        let answers: Option<Vec<&str>> = self.steps.iter().map(|s| s.expected.canonical()).collect();
        answers.map(|a| a.join(" → "))
    }
}
