mod sentences;

pub use sentences::{Sentence, SentenceRepository};
