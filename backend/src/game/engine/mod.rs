pub mod judge;
pub mod model;
pub mod session;
pub mod source;

pub use judge::{Judge, JudgeError};
pub use model::{ChatModel, LanguageModel, ModelError};
pub use session::{GameSession, Phase, SessionConfig, SessionError, SessionHandle, SessionSnapshot};
pub use source::{ContentSource, ItemSource, SentenceApi, SentenceBackend, SourceError};
