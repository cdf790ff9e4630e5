use super::item::{Expected, Step};
use super::log::{Example, RoundResult};

/// A judge's decision on one response
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Correct,
    Incorrect,
    /// No decision could be made (service down, malformed reply)
    Error,
}

impl From<Verdict> for RoundResult {
    fn from(verdict: Verdict) -> Self {
        match verdict {
            Verdict::Correct => RoundResult::Correct,
            Verdict::Incorrect => RoundResult::Incorrect,
            Verdict::Error => RoundResult::Error,
        }
    }
}

/// Compare a response against a step without any remote call.
///
/// Literal answers need an exact match. Criterion steps fall back to a
/// case-insensitive match on the reference answer, or `Error` if there is none.
pub fn evaluate_locally(step: &Step, response: &str) -> Verdict {
    match &step.expected {
        Expected::Literal { answer } => {
            if response == answer {
                Verdict::Correct
            } else {
                Verdict::Incorrect
            }
        }
        Expected::Criterion {
            reference: Some(reference),
            ..
        } => {
            if response.trim().eq_ignore_ascii_case(reference.trim()) {
                Verdict::Correct
            } else {
                Verdict::Incorrect
            }
        }
        Expected::Criterion {
            reference: None, ..
        } => Verdict::Error,
    }
}

/// Interpret a judgment reply. Only the sentinels `1` and `0` are accepted.
pub fn parse_verdict(reply: &str) -> Option<Verdict> {
    let token = reply
        .trim()
        .trim_matches(|c| c == '"' || c == '\'' || c == '`')
        .trim_end_matches('.')
        .trim();

    match token {
        "1" => Some(Verdict::Correct),
        "0" => Some(Verdict::Incorrect),
        _ => None,
    }
}

/// Split a `a|b|c` generation reply into `expected` examples.
/// Missing or blank segments become `Unavailable`.
pub fn split_examples(reply: &str, expected: usize) -> Vec<Example> {
    let segments: Vec<&str> = reply.split('|').map(str::trim).collect();

    (0..expected)
        .map(|i| match segments.get(i) {
            Some(text) if !text.is_empty() => Example::Generated(text.to_string()),
            _ => Example::Unavailable,
        })
        .collect()
}
