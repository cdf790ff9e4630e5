use crate::game::core::{ChallengeItem, Expected, Step};
use crate::repository::Sentence;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// The mini-games sharing the round engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GameMode {
    MissingWord,
    VocabHit,
    WordForge,
    WordVerseInput,
    WordVerseOptions,
    WordChain,
}

const DIFFICULTIES: &[&str] = &["easy", "medium", "hard"];
const CATEGORIES: &[&str] = &["emotion", "action", "general"];
const STYLES: &[&str] = &["literal", "figurative"];

impl GameMode {
    pub fn as_str(self) -> &'static str {
        match self {
            GameMode::MissingWord => "missing_word",
            GameMode::VocabHit => "vocab_hit",
            GameMode::WordForge => "word_forge",
            GameMode::WordVerseInput => "word_verse_input",
            GameMode::WordVerseOptions => "word_verse_options",
            GameMode::WordChain => "word_chain",
        }
    }

    /// Filter keys the mode can be started with
    pub fn filter_keys(self) -> &'static [&'static str] {
        match self {
            GameMode::VocabHit => CATEGORIES,
            GameMode::WordForge => STYLES,
            GameMode::MissingWord
            | GameMode::WordVerseInput
            | GameMode::WordVerseOptions
            | GameMode::WordChain => DIFFICULTIES,
        }
    }

    pub fn accepts_filter(self, key: &str) -> bool {
        self.filter_keys().contains(&key)
    }

    /// Free-text modes whose answers need the language model
    pub fn judged_remotely(self) -> bool {
        matches!(
            self,
            GameMode::VocabHit | GameMode::WordForge | GameMode::WordVerseInput
        )
    }

    /// Whether the summary is enriched with generated example sentences
    pub fn enriches(self) -> bool {
        self == GameMode::WordForge
    }

    pub fn uses_countdown(self) -> bool {
        self == GameMode::WordForge
    }

    /// Judge prompts for remotely judged modes
    pub fn prompts(self) -> Option<JudgePrompts> {
        match self {
            GameMode::VocabHit => Some(JudgePrompts {
                system: VOCAB_HIT_SYSTEM,
                check: r#"Clue: "{clue}" | Category: "{category}" | Input: "{response}""#,
                warm_up: r#"Clue: "a feeling of great happiness" | Category: "emotion" | Input: "joy""#,
            }),
            GameMode::WordForge => Some(JudgePrompts {
                system: WORD_FORGE_SYSTEM,
                check: r#"{style}: Check Fit | Paragraph: "{paragraph}" | Word: "{word}" | Sentence: "{response}""#,
                warm_up: r#"literal: Check Fit | Paragraph: "The harbor was quiet before dawn." | Word: "anchor" | Sentence: "The captain lowered the anchor and waited for the tide.""#,
            }),
            GameMode::WordVerseInput => Some(JudgePrompts {
                system: WORD_VERSE_SYSTEM,
                check: r#"Word: "{word}" | Type: "{relation}" | Input: "{response}""#,
                warm_up: r#"Word: "happy" | Type: "Synonym" | Input: "joyful""#,
            }),
            _ => None,
        }
    }
}

impl fmt::Display for GameMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Prompt templates for one mode. `{key}` placeholders are filled from the step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JudgePrompts {
    pub system: &'static str,
    pub check: &'static str,
    pub warm_up: &'static str,
}

const VOCAB_HIT_SYSTEM: &str = r#"You check whether a player's word matches a clue within a category.
Categories: "emotion" (a feeling), "action" (a verb), "general" (anything that is neither).
Reply "1" if the input matches the clue's meaning or is a clear synonym, fits the category,
and is not a word used in the clue itself. Reply "0" otherwise.
Ignore case. Reply with the single character only."#;

const WORD_FORGE_SYSTEM: &str = r#"You assist a vocabulary game where a player continues a short paragraph.
Check Fit: reply "1" if the sentence uses the word correctly for the style ("literal" for the
dictionary meaning, "figurative" for metaphorical or idiomatic use), believably continues the
paragraph, and is a complete, grammatical sentence. Otherwise reply "0".
Generate Sentences: for numbered paragraph and word pairs, return one realistic sentence of at
most ten words per pair, in order, in the format "sentence1|sentence2|...|sentenceN"."#;

const WORD_VERSE_SYSTEM: &str = r#"You check whether a word is a valid synonym or antonym of a given word.
It must reflect one of the word's standard dictionary meanings for the requested type.
Reply "1" if it does and "0" if it does not. Reply with the single character only."#;

/// Synonym or antonym, for the word-verse family
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Relation {
    Synonym,
    Antonym,
}

impl Relation {
    pub fn random<R: Rng + ?Sized>(rng: &mut R) -> Self {
        if rng.random_bool(0.5) {
            Relation::Synonym
        } else {
            Relation::Antonym
        }
    }
}

impl fmt::Display for Relation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Relation::Synonym => f.write_str("Synonym"),
            Relation::Antonym => f.write_str("Antonym"),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ClueRecord {
    pub clue: String,
    pub word: String,
    pub category: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ForgeRecord {
    pub paragraph: String,
    pub word: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerseRecord {
    pub word: String,
    pub synonyms: Vec<String>,
    pub antonyms: Vec<String>,
    pub synonym_correct: String,
    pub antonym_correct: String,
}

impl VerseRecord {
    fn step(&self, relation: Relation) -> Step {
        let (options, answer) = match relation {
            Relation::Synonym => (&self.synonyms, &self.synonym_correct),
            Relation::Antonym => (&self.antonyms, &self.antonym_correct),
        };
        Step::new(
            format!("{relation} of \"{}\"", self.word),
            Expected::literal(answer.as_str()),
        )
        .with_options(options.clone())
        .with_context("word", self.word.as_str())
        .with_context("relation", relation.to_string())
    }
}

fn new_id(prefix: &str) -> String {
    format!("{prefix}-{}", Uuid::new_v4())
}

/// Multiple-choice fill-in-the-blank
pub fn sentence_item(sentence: Sentence) -> ChallengeItem {
    let step = Step::new(sentence.sentence, Expected::literal(sentence.correct_answer))
        .with_options(sentence.options)
        .with_context("difficulty", sentence.difficulty);
    ChallengeItem::single(format!("sentence-{}", sentence.id), step)
}

/// Typed word for a clue, judged against the category
pub fn clue_item(record: ClueRecord) -> ChallengeItem {
    let step = Step::new(
        record.clue.as_str(),
        Expected::criterion(record.category.as_str(), Some(record.word)),
    )
    .with_context("clue", record.clue)
    .with_context("category", record.category);
    ChallengeItem::single(new_id("clue"), step)
}

/// Sentence continuing a paragraph with the given word
pub fn forge_item(record: ForgeRecord, style: &str) -> ChallengeItem {
    let step = Step::new(
        format!("{}\nWord: {}", record.paragraph, record.word),
        Expected::criterion(style, Some(record.word.clone())),
    )
    .with_context("paragraph", record.paragraph)
    .with_context("word", record.word)
    .with_context("style", style);
    ChallengeItem::single(new_id("forge"), step)
}

/// Typed synonym or antonym, relation picked at random
pub fn verse_input_item<R: Rng + ?Sized>(record: VerseRecord, rng: &mut R) -> ChallengeItem {
    let relation = Relation::random(rng);
    let reference = match relation {
        Relation::Synonym => record.synonym_correct.clone(),
        Relation::Antonym => record.antonym_correct.clone(),
    };
    let step = Step::new(
        format!("{relation} of \"{}\"", record.word),
        Expected::criterion(relation.to_string(), Some(reference)),
    )
    .with_context("word", record.word)
    .with_context("relation", relation.to_string());
    ChallengeItem::single(new_id("verse"), step)
}

/// Synonym or antonym picked from options, relation picked at random
pub fn verse_options_item<R: Rng + ?Sized>(record: VerseRecord, rng: &mut R) -> ChallengeItem {
    let step = record.step(Relation::random(rng));
    ChallengeItem::single(new_id("verse"), step)
}

/// Synonym then antonym of the same word
pub fn chain_item(record: VerseRecord) -> ChallengeItem {
    let first = record.step(Relation::Synonym);
    let second = record.step(Relation::Antonym);
    ChallengeItem::chain(new_id("chain"), first, second)
}
