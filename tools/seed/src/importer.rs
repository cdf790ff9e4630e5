use serde::Deserialize;
use sqlx::SqlitePool;

const DIFFICULTIES: &[&str] = &["easy", "medium", "hard"];

/// Statistics from an upload
#[derive(Debug, Default, PartialEq)]
pub struct ImportStats {
    /// Records read from the file
    pub parsed: usize,
    /// Rows inserted into the database
    pub inserted: usize,
    /// Records rejected by validation
    pub skipped: usize,
}

/// One entry of the sentences JSON file
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SentenceRecord {
    pub sentence: String,
    pub options: Vec<String>,
    pub correct_answer: String,
    pub difficulty: String,
}

impl SentenceRecord {
    /// A playable record has a sentence, at least two options including the
    /// answer, and a known difficulty
    pub fn is_valid(&self) -> bool {
        !self.sentence.trim().is_empty()
            && self.options.len() >= 2
            && self.options.contains(&self.correct_answer)
            && DIFFICULTIES.contains(&self.difficulty.as_str())
    }
}

pub fn parse_records(raw: &str) -> Result<Vec<SentenceRecord>, serde_json::Error> {
    serde_json::from_str(raw)
}

/// Insert valid records in batches. Invalid records are skipped and counted.
pub async fn upload_sentences(
    pool: &SqlitePool,
    records: Vec<SentenceRecord>,
) -> Result<ImportStats, Box<dyn std::error::Error>> {
    let mut stats = ImportStats {
        parsed: records.len(),
        ..ImportStats::default()
    };

    let valid: Vec<SentenceRecord> = records
        .into_iter()
        .filter(|record| {
            let ok = record.is_valid();
            if !ok {
                stats.skipped += 1;
            }
            ok
        })
        .collect();

    const BATCH_SIZE: usize = 200;

    for chunk in valid.chunks(BATCH_SIZE) {
        let mut query = String::from(
            "INSERT INTO sentences (sentence, options, correct_answer, difficulty) VALUES ",
        );

        for (i, _) in chunk.iter().enumerate() {
            if i > 0 {
                query.push_str(", ");
            }
            query.push_str("(?, ?, ?, ?)");
        }

        let mut q = sqlx::query(&query);
        for record in chunk {
            q = q
                .bind(&record.sentence)
                .bind(serde_json::to_string(&record.options)?)
                .bind(&record.correct_answer)
                .bind(&record.difficulty);
        }

        let result = q.execute(pool).await?;
        stats.inserted += result.rows_affected() as usize;
    }

    Ok(stats)
}

/// Remove every sentence, returning how many were deleted
pub async fn delete_sentences(pool: &SqlitePool) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("DELETE FROM sentences").execute(pool).await?;
    Ok(result.rows_affected())
}
