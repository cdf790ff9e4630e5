use super::model::{LanguageModel, ModelError};
use crate::game::core::verdict::{evaluate_locally, parse_verdict, split_examples};
use crate::game::core::{Example, ExamplePair, Expected, Step, Verdict};
use crate::game::modes::JudgePrompts;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Error)]
pub enum JudgeError {
    #[error("warm-up request failed: {0}")]
    WarmUp(#[from] ModelError),
    #[error("warm-up reply was not a verdict: {0:?}")]
    UnexpectedReply(String),
}

/// Decides whether a response satisfies a step
pub enum Judge<M> {
    Local,
    Remote(RemoteJudge<M>),
}

impl<M> Clone for Judge<M> {
    fn clone(&self) -> Self {
        match self {
            Judge::Local => Judge::Local,
            Judge::Remote(remote) => Judge::Remote(remote.clone()),
        }
    }
}

pub struct RemoteJudge<M> {
    model: Arc<M>,
    prompts: JudgePrompts,
    retry_backoff: Duration,
}

impl<M> Clone for RemoteJudge<M> {
    fn clone(&self) -> Self {
        Self {
            model: Arc::clone(&self.model),
            prompts: self.prompts,
            retry_backoff: self.retry_backoff,
        }
    }
}

impl<M: LanguageModel> Judge<M> {
    pub fn remote(model: Arc<M>, prompts: JudgePrompts, retry_backoff: Duration) -> Self {
        Judge::Remote(RemoteJudge {
            model,
            prompts,
            retry_backoff,
        })
    }

    /// Verdict available without a remote call. Literal steps are always
    /// compared locally, even by a remote judge.
    pub fn immediate(&self, step: &Step, response: &str) -> Option<Verdict> {
        match self {
            Judge::Remote(_) if !step.expected.is_literal() => None,
            _ => Some(evaluate_locally(step, response)),
        }
    }

    pub async fn evaluate(&self, step: &Step, response: &str) -> Verdict {
        match self {
            Judge::Remote(remote) if !step.expected.is_literal() => {
                remote.evaluate(step, response).await
            }
            _ => evaluate_locally(step, response),
        }
    }

    /// Probe the model once before the first round
    pub async fn warm_up(&self) -> Result<(), JudgeError> {
        let Judge::Remote(remote) = self else {
            return Ok(());
        };
        let reply = remote
            .model
            .complete(remote.prompts.system, remote.prompts.warm_up)
            .await?;
        match parse_verdict(&reply) {
            Some(_) => Ok(()),
            None => Err(JudgeError::UnexpectedReply(reply)),
        }
    }

    /// One example sentence per pair, in order. Single attempt.
    pub async fn generate_examples(&self, pairs: &[ExamplePair]) -> Vec<Example> {
        let Judge::Remote(remote) = self else {
            return vec![Example::Unavailable; pairs.len()];
        };
        if pairs.is_empty() {
            return Vec::new();
        }

        let request = generation_request(pairs);
        match remote.model.complete(remote.prompts.system, &request).await {
            Ok(reply) => split_examples(&reply, pairs.len()),
            Err(e) => {
                warn!(error = %e, pairs = pairs.len(), "Example generation failed");
                vec![Example::Unavailable; pairs.len()]
            }
        }
    }
}

impl<M: LanguageModel> RemoteJudge<M> {
    async fn evaluate(&self, step: &Step, response: &str) -> Verdict {
        let check = render_check(self.prompts.check, step, response);

        let reply = match self.model.complete(self.prompts.system, &check).await {
            Ok(reply) => reply,
            Err(e) if e.is_transient() => {
                debug!(error = %e, "Transient judge failure, retrying once");
                tokio::time::sleep(self.retry_backoff).await;
                match self.model.complete(self.prompts.system, &check).await {
                    Ok(reply) => reply,
                    Err(e) => {
                        warn!(error = %e, "Judgment failed after retry");
                        return Verdict::Error;
                    }
                }
            }
            Err(e) => {
                warn!(error = %e, "Judgment failed");
                return Verdict::Error;
            }
        };

        parse_verdict(&reply).unwrap_or_else(|| {
            warn!(reply = %reply, "Malformed judgment reply");
            Verdict::Error
        })
    }
}

/// Replace `{key}` placeholders with the given values
pub fn fill_template(template: &str, pairs: &[(&str, &str)]) -> String {
    let mut out = template.to_string();
    for (key, value) in pairs {
        out = out.replace(&format!("{{{key}}}"), value);
    }
    out
}

fn render_check(template: &str, step: &Step, response: &str) -> String {
    let criterion = match &step.expected {
        Expected::Criterion { criterion, .. } => criterion.as_str(),
        Expected::Literal { .. } => "",
    };
    let mut pairs: Vec<(&str, &str)> = step
        .context
        .iter()
        .map(|(k, v)| (k.as_str(), v.as_str()))
        .collect();
    pairs.push(("prompt", &step.prompt));
    pairs.push(("criterion", criterion));
    pairs.push(("response", response));
    fill_template(template, &pairs)
}

fn generation_request(pairs: &[ExamplePair]) -> String {
    let mut request = String::from("Generate Sentences:\n");
    for (i, pair) in pairs.iter().enumerate() {
        request.push_str(&format!(
            "{}. {} | Answer: {}\n",
            i + 1,
            pair.prompt.replace('\n', " "),
            pair.answer
        ));
    }
    request.push_str(&format!(
        "Return exactly {} sentences as \"sentence1|sentence2|...\".",
        pairs.len()
    ));
    request
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::modes::GameMode;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    #[derive(Default)]
    struct ScriptedModel {
        replies: Mutex<VecDeque<Result<String, ModelError>>>,
        requests: Mutex<Vec<String>>,
    }

    impl ScriptedModel {
        fn with(replies: Vec<Result<String, ModelError>>) -> Arc<Self> {
            Arc::new(Self {
                replies: Mutex::new(replies.into()),
                requests: Mutex::new(Vec::new()),
            })
        }

        fn calls(&self) -> usize {
            self.requests.lock().unwrap().len()
        }
    }

    impl LanguageModel for ScriptedModel {
        async fn complete(&self, _system: &str, user: &str) -> Result<String, ModelError> {
            self.requests.lock().unwrap().push(user.to_string());
            self.replies
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(Err(ModelError::EmptyReply))
        }
    }

    fn ok(text: &str) -> Result<String, ModelError> {
        Ok(text.to_string())
    }

    fn judge(model: &Arc<ScriptedModel>) -> Judge<ScriptedModel> {
        let prompts = GameMode::VocabHit.prompts().unwrap();
        Judge::remote(Arc::clone(model), prompts, Duration::from_millis(500))
    }

    fn clue_step() -> Step {
        Step::new(
            "a feeling of great happiness",
            Expected::criterion("emotion", Some("joy".to_string())),
        )
        .with_context("clue", "a feeling of great happiness")
        .with_context("category", "emotion")
    }

    #[tokio::test(start_paused = true)]
    async fn sentinel_replies_map_to_verdicts() {
        let model = ScriptedModel::with(vec![ok("1"), ok("0")]);
        let judge = judge(&model);

        assert_eq!(judge.evaluate(&clue_step(), "delight").await, Verdict::Correct);
        assert_eq!(judge.evaluate(&clue_step(), "table").await, Verdict::Incorrect);
    }

    #[tokio::test(start_paused = true)]
    async fn check_prompt_carries_context_and_response() {
        let model = ScriptedModel::with(vec![ok("1")]);
        judge(&model).evaluate(&clue_step(), "delight").await;

        let sent = model.requests.lock().unwrap()[0].clone();
        assert!(sent.contains("a feeling of great happiness"));
        assert!(sent.contains(r#"Category: "emotion""#));
        assert!(sent.contains(r#"Input: "delight""#));
    }

    #[tokio::test(start_paused = true)]
    async fn malformed_reply_is_an_error() {
        let model = ScriptedModel::with(vec![ok("yes, that fits")]);
        assert_eq!(judge(&model).evaluate(&clue_step(), "joy").await, Verdict::Error);
        assert_eq!(model.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn transient_failure_is_retried_once() {
        let model = ScriptedModel::with(vec![Err(ModelError::RateLimited), ok("1")]);
        assert_eq!(judge(&model).evaluate(&clue_step(), "joy").await, Verdict::Correct);
        assert_eq!(model.calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn second_transient_failure_is_an_error() {
        let model = ScriptedModel::with(vec![
            Err(ModelError::RateLimited),
            Err(ModelError::RateLimited),
            ok("1"),
        ]);
        assert_eq!(judge(&model).evaluate(&clue_step(), "joy").await, Verdict::Error);
        assert_eq!(model.calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn permanent_failure_is_not_retried() {
        let model = ScriptedModel::with(vec![
            Err(ModelError::Http {
                status: 401,
                message: "bad key".to_string(),
            }),
            ok("1"),
        ]);
        assert_eq!(judge(&model).evaluate(&clue_step(), "joy").await, Verdict::Error);
        assert_eq!(model.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn literal_steps_skip_the_model() {
        let model = ScriptedModel::with(vec![]);
        let step = Step::new("Synonym of \"happy\"", Expected::literal("joyful"));

        assert_eq!(judge(&model).evaluate(&step, "joyful").await, Verdict::Correct);
        assert_eq!(judge(&model).immediate(&step, "sad"), Some(Verdict::Incorrect));
        assert_eq!(judge(&model).immediate(&clue_step(), "joy"), None);
        assert_eq!(model.calls(), 0);
    }

    #[tokio::test]
    async fn local_judge_uses_reference() {
        let judge: Judge<ScriptedModel> = Judge::Local;
        assert_eq!(judge.evaluate(&clue_step(), "JOY").await, Verdict::Correct);
        assert!(judge.warm_up().await.is_ok());
    }

    #[tokio::test]
    async fn warm_up_requires_sentinel() {
        let model = ScriptedModel::with(vec![ok("1"), ok("hello")]);
        let judge = judge(&model);

        assert!(judge.warm_up().await.is_ok());
        assert!(matches!(
            judge.warm_up().await,
            Err(JudgeError::UnexpectedReply(_))
        ));
    }

    fn pairs(n: u32) -> Vec<ExamplePair> {
        (1..=n)
            .map(|i| ExamplePair {
                sequence: i,
                prompt: format!("paragraph {i}"),
                answer: format!("word{i}"),
            })
            .collect()
    }

    #[tokio::test]
    async fn generation_splits_reply() {
        let model = ScriptedModel::with(vec![ok("One.|Two.")]);
        let examples = judge(&model).generate_examples(&pairs(3)).await;

        assert_eq!(
            examples,
            vec![
                Example::Generated("One.".to_string()),
                Example::Generated("Two.".to_string()),
                Example::Unavailable,
            ]
        );
        let sent = model.requests.lock().unwrap()[0].clone();
        assert!(sent.contains("3. paragraph 3 | Answer: word3"));
    }

    #[tokio::test]
    async fn generation_failure_marks_all_unavailable() {
        let model = ScriptedModel::with(vec![Err(ModelError::RateLimited), ok("late")]);
        let examples = judge(&model).generate_examples(&pairs(2)).await;

        assert_eq!(examples, vec![Example::Unavailable; 2]);
        assert_eq!(model.calls(), 1);
    }

    #[test]
    fn fills_placeholders() {
        let out = fill_template("{a} and {b} and {a}", &[("a", "x"), ("b", "y")]);
        assert_eq!(out, "x and y and x");
    }
}
