use crate::game::core::ChallengeItem;
use crate::game::modes::{
    self, ClueRecord, ForgeRecord, GameMode, VerseRecord, chain_item, clue_item, forge_item,
    sentence_item,
};
use crate::repository::{Sentence, SentenceRepository};
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("item service returned HTTP {0}")]
    Status(u16),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("could not read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid catalog {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Produces the challenge items for a mode and filter key
pub trait ItemSource: Send + Sync + 'static {
    fn fetch(
        &self,
        mode: GameMode,
        filter_key: &str,
    ) -> impl Future<Output = Result<Vec<ChallengeItem>, SourceError>> + Send;
}

/// Client for a remote `GET /api/sentences/:difficulty` endpoint
#[derive(Clone)]
pub struct SentenceApi {
    client: reqwest::Client,
    base_url: String,
}

impl SentenceApi {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, SourceError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub async fn by_difficulty(&self, difficulty: &str) -> Result<Vec<Sentence>, SourceError> {
        let url = format!("{}/api/sentences/{}", self.base_url, difficulty);
        let res = self.client.get(&url).send().await?;

        let status = res.status();
        if !status.is_success() {
            return Err(SourceError::Status(status.as_u16()));
        }
        Ok(res.json().await?)
    }
}

/// Where fill-in-the-blank sentences come from
#[derive(Clone)]
pub enum SentenceBackend {
    Database(SentenceRepository),
    Api(SentenceApi),
}

impl SentenceBackend {
    async fn by_difficulty(&self, difficulty: &str) -> Result<Vec<Sentence>, SourceError> {
        match self {
            SentenceBackend::Database(repo) => Ok(repo.by_difficulty(difficulty).await?),
            SentenceBackend::Api(api) => api.by_difficulty(difficulty).await,
        }
    }
}

/// Sentences from the store, everything else from JSON catalogs on disk
#[derive(Clone)]
pub struct ContentSource {
    sentences: SentenceBackend,
    data_dir: PathBuf,
}

impl ContentSource {
    pub fn new(sentences: SentenceBackend, data_dir: impl Into<PathBuf>) -> Self {
        Self {
            sentences,
            data_dir: data_dir.into(),
        }
    }

    async fn catalog<T: DeserializeOwned>(&self, file: &str) -> Result<T, SourceError> {
        let path = self.data_dir.join(file);
        let raw = tokio::fs::read_to_string(&path)
            .await
            .map_err(|source| SourceError::Io {
                path: display(&path),
                source,
            })?;
        serde_json::from_str(&raw).map_err(|source| SourceError::Parse {
            path: display(&path),
            source,
        })
    }
}

fn display(path: &Path) -> String {
    path.display().to_string()
}

impl ItemSource for ContentSource {
    async fn fetch(
        &self,
        mode: GameMode,
        filter_key: &str,
    ) -> Result<Vec<ChallengeItem>, SourceError> {
        let items = match mode {
            GameMode::MissingWord => self
                .sentences
                .by_difficulty(filter_key)
                .await?
                .into_iter()
                .map(sentence_item)
                .collect(),
            GameMode::VocabHit => {
                let clues: Vec<ClueRecord> = self.catalog("vocab_hit.json").await?;
                clues
                    .into_iter()
                    .filter(|c| c.category == filter_key)
                    .map(clue_item)
                    .collect()
            }
            GameMode::WordForge => {
                let mut styles: HashMap<String, Vec<ForgeRecord>> =
                    self.catalog("word_forge.json").await?;
                styles
                    .remove(filter_key)
                    .unwrap_or_default()
                    .into_iter()
                    .map(|r| forge_item(r, filter_key))
                    .collect()
            }
            GameMode::WordVerseInput | GameMode::WordVerseOptions | GameMode::WordChain => {
                let mut levels: HashMap<String, Vec<VerseRecord>> =
                    self.catalog("word_verse.json").await?;
                verse_items(mode, levels.remove(filter_key).unwrap_or_default())
            }
        };

        debug!(%mode, filter_key = %filter_key, count = items.len(), "Fetched challenge items");
        Ok(items)
    }
}

fn verse_items(mode: GameMode, records: Vec<VerseRecord>) -> Vec<ChallengeItem> {
    let mut rng = rand::rng();
    records
        .into_iter()
        .map(|r| match mode {
            GameMode::WordVerseInput => modes::verse_input_item(r, &mut rng),
            GameMode::WordChain => chain_item(r),
            _ => modes::verse_options_item(r, &mut rng),
        })
        .collect()
}
