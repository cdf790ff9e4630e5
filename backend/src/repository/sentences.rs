use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use tracing::warn;

/// A curated fill-in-the-blank sentence, as stored and as served over HTTP
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Sentence {
    pub id: i64,
    pub sentence: String,
    pub options: Vec<String>,
    pub correct_answer: String,
    pub difficulty: String,
}

#[derive(Clone)]
pub struct SentenceRepository {
    pool: SqlitePool,
}

impl SentenceRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// All sentences for a difficulty, in insertion order
    pub async fn by_difficulty(&self, difficulty: &str) -> Result<Vec<Sentence>, sqlx::Error> {
        let rows: Vec<(i64, String, String, String, String)> = sqlx::query_as(
            "SELECT id, sentence, options, correct_answer, difficulty
             FROM sentences WHERE difficulty = ? ORDER BY id",
        )
        .bind(difficulty)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .filter_map(|(id, sentence, options, correct_answer, difficulty)| {
                let Ok(options) = serde_json::from_str(&options) else {
                    warn!(id, "Skipping sentence with malformed options");
                    return None;
                };
                Some(Sentence {
                    id,
                    sentence,
                    options,
                    correct_answer,
                    difficulty,
                })
            })
            .collect())
    }

    pub async fn count(&self) -> Result<i64, sqlx::Error> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM sentences")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn repository() -> SentenceRepository {
        let pool = SqlitePool::connect(":memory:").await.unwrap();
        sqlx::migrate!().run(&pool).await.unwrap();
        SentenceRepository::new(pool)
    }

    #[tokio::test]
    async fn filters_by_difficulty() {
        let repo = repository().await;

        let easy = repo.by_difficulty("easy").await.unwrap();
        assert_eq!(easy.len(), 3);
        assert!(easy.iter().all(|s| s.difficulty == "easy"));
        assert_eq!(easy[0].correct_answer, "mat");
        assert_eq!(easy[0].options.len(), 4);
    }

    #[tokio::test]
    async fn unknown_difficulty_is_empty() {
        let repo = repository().await;
        assert!(repo.by_difficulty("impossible").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn malformed_options_are_skipped() {
        let repo = repository().await;
        sqlx::query(
            "INSERT INTO sentences (sentence, options, correct_answer, difficulty)
             VALUES ('Broken __.', 'not json', 'x', 'hard')",
        )
        .execute(&repo.pool)
        .await
        .unwrap();

        assert_eq!(repo.by_difficulty("hard").await.unwrap().len(), 2);
        assert_eq!(repo.count().await.unwrap(), 11);
    }

    #[test]
    fn serializes_camel_case() {
        let sentence = Sentence {
            id: 1,
            sentence: "The cat sat on the __.".to_string(),
            options: vec!["mat".to_string()],
            correct_answer: "mat".to_string(),
            difficulty: "easy".to_string(),
        };
        let json = serde_json::to_string(&sentence).unwrap();
        assert!(json.contains(r#""correctAnswer":"mat""#));
    }
}
