//! Chat domain: history persistence, prompt construction, users and the
//! advisor flow tying them together.

pub mod advisor;
pub mod core;
pub mod evaluation;
pub mod history;
pub mod prompt;
pub mod users;

pub use advisor::{AdvisorBackends, FinanceAdvisor};
pub use self::core::{ChatError, ChatResult, ProfileType, User, UserId};
pub use evaluation::{EvaluationAnswer, EvaluationOutcome, apply_evaluation, evaluate};
pub use history::{HistoryMessage, HistoryPage, HistoryStore};
