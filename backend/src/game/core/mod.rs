pub mod clock;
pub mod item;
pub mod log;
pub mod messages;
pub mod pool;
pub mod round;
pub mod verdict;

pub use clock::{ClockTick, SessionClock};
pub use item::{ChallengeItem, Expected, Step};
pub use log::{Example, ExamplePair, ResultLog, RoundOutcome, RoundResult, Summary};
pub use pool::{Draw, ItemPool};
pub use round::{
    Advance, GameOverEntry, Judged, PendingJudgment, Rejection, RoundController, RoundState,
    RoundView,
};
pub use verdict::Verdict;
