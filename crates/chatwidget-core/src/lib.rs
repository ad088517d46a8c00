pub mod completion;
pub mod config;
pub mod corpus;
pub mod error;
pub mod fallback;
pub mod matcher;
pub mod rate_limit;
pub mod sanitize;
pub mod session;
pub mod shaper;
pub mod state;

// Re-export main types for convenience
pub use completion::{Completer, CompletionClient, CompletionError};
pub use config::Config;
pub use corpus::{CorpusError, CorpusLoad, FaqEntry, KnowledgeEntry, TrainingCorpus};
pub use error::{ChatError, ValidationError};
pub use fallback::FallbackResponder;
pub use matcher::{match_faq, match_knowledge, MatchResult, MatchedEntry, MATCH_THRESHOLD};
pub use rate_limit::{Admission, RateLimiter};
pub use sanitize::{is_valid_message, sanitize};
pub use session::{ChatSession, ReplySource, ResolutionOutcome};
pub use shaper::{Pacing, ResponseShaper};
pub use state::{History, Message, Sender};
