//! Prompt construction modules.

pub mod template;
pub mod window;

pub use template::{PromptTemplate, UserContext, format_income_pt_br};
pub use window::{ChatMessage, ChatRole, DEFAULT_MAX_MESSAGES, build_window};
