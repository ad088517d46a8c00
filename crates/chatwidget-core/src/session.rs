//! Session-scoped reply pipeline.
//!
//! One `ChatSession` per widget session: it owns its rate limiter and
//! history, and resolves one message at a time. Stages run in a fixed
//! order (validate, rate check, corpus match, completion, canned fallback,
//! shaping) and every accepted message ends with a reply.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use crate::completion::{Completer, CompletionClient, CONTEXT_MESSAGES};
use crate::config::Config;
use crate::corpus::TrainingCorpus;
use crate::error::ChatError;
use crate::fallback::FallbackResponder;
use crate::matcher::{match_faq, match_knowledge};
use crate::rate_limit::{Admission, RateLimiter};
use crate::sanitize::{sanitize, validate_message};
use crate::shaper::{Pacing, ResponseShaper};
use crate::state::{History, Message};

/// Where a reply came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReplySource {
    Faq,
    Knowledge,
    Completion,
    Fallback,
}

impl ReplySource {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReplySource::Faq => "faq",
            ReplySource::Knowledge => "knowledge",
            ReplySource::Completion => "completion",
            ReplySource::Fallback => "fallback",
        }
    }
}

impl fmt::Display for ReplySource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A shaped bot reply, ready for the rendering layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolutionOutcome {
    pub text: String,
    pub source: ReplySource,
    /// How long the host may show a typing indicator first.
    pub delay: Duration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    Validating,
    RateChecking,
    Matching,
    Completing,
    Fallback,
    Shaping,
    Done,
}

pub struct ChatSession {
    limiter: RateLimiter,
    history: History,
    completer: Option<Box<dyn Completer>>,
    completion_timeout: Duration,
    fallback: FallbackResponder,
    shaper: ResponseShaper,
}

impl ChatSession {
    /// The HTTP completer is only wired in when completion is enabled and
    /// holds a real key.
    pub fn new(config: &Config) -> Self {
        let completer: Option<Box<dyn Completer>> = if config.completion.is_configured() {
            Some(Box::new(CompletionClient::new(&config.completion)))
        } else {
            None
        };

        Self {
            limiter: RateLimiter::new(config.rate_limit.clone()),
            history: History::new(config.max_stored_messages),
            completer,
            completion_timeout: Duration::from_millis(config.completion.timeout_ms),
            fallback: FallbackResponder::new(),
            shaper: ResponseShaper::new(config.response.clone()),
        }
    }

    pub fn with_completer(mut self, completer: Box<dyn Completer>) -> Self {
        self.completer = Some(completer);
        self
    }

    pub fn without_completer(mut self) -> Self {
        self.completer = None;
        self
    }

    pub fn with_pacing(mut self, pacing: Pacing) -> Self {
        self.shaper = self.shaper.with_pacing(pacing);
        self
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn clear_history(&mut self) {
        self.history.clear();
    }

    pub fn has_completer(&self) -> bool {
        self.completer.is_some()
    }

    pub async fn resolve(
        &mut self,
        raw: &str,
        corpus: &TrainingCorpus,
    ) -> Result<ResolutionOutcome, ChatError> {
        self.resolve_at(raw, corpus, Instant::now()).await
    }

    /// Resolve `raw` as if it arrived at `now`.
    ///
    /// Errors are the two warnings (invalid input, rate limited); neither
    /// touches history or the limiter's count.
    pub async fn resolve_at(
        &mut self,
        raw: &str,
        corpus: &TrainingCorpus,
        now: Instant,
    ) -> Result<ResolutionOutcome, ChatError> {
        enter(Stage::Validating);
        validate_message(raw)?;

        enter(Stage::RateChecking);
        if let Admission::Denied {
            reason,
            retry_after_secs,
        } = self.limiter.can_send(now)
        {
            debug!(retry_after_secs, "message throttled");
            return Err(ChatError::RateLimited {
                reason,
                retry_after_secs,
            });
        }
        self.limiter.record_message(now);

        let sanitized = sanitize(raw);
        let context: Vec<Message> = self.history.recent(CONTEXT_MESSAGES).to_vec();
        self.history.push(Message::user(sanitized.clone()));

        enter(Stage::Matching);
        let (text, source) = match Self::match_corpus(&sanitized, corpus) {
            Some(hit) => hit,
            None => match self.try_completion(&corpus.instructions, &context, &sanitized).await {
                Some(text) => (text, ReplySource::Completion),
                None => {
                    enter(Stage::Fallback);
                    (self.fallback.respond(&sanitized), ReplySource::Fallback)
                }
            },
        };

        enter(Stage::Shaping);
        let text = self.shaper.limit(&text);
        let delay = self.shaper.thinking_delay(&text);
        self.history.push(Message::bot(text.clone()));

        enter(Stage::Done);
        info!(source = source.as_str(), chars = text.chars().count(), "reply ready");
        Ok(ResolutionOutcome {
            text,
            source,
            delay,
        })
    }

    /// FAQ first, knowledge only when no FAQ is accepted.
    fn match_corpus(query: &str, corpus: &TrainingCorpus) -> Option<(String, ReplySource)> {
        let faq = match_faq(query, &corpus.faqs);
        let hit = faq
            .filter(|m| !m.entry.answer().trim().is_empty())
            .or_else(|| {
                match_knowledge(query, &corpus.knowledge)
                    .filter(|m| !m.entry.answer().trim().is_empty())
            })?;
        Some((hit.entry.answer().to_string(), hit.entry.source()))
    }

    async fn try_completion(
        &self,
        instructions: &str,
        context: &[Message],
        message: &str,
    ) -> Option<String> {
        let completer = self.completer.as_ref()?;
        enter(Stage::Completing);
        match completer
            .complete(instructions, context, message, self.completion_timeout)
            .await
        {
            Ok(text) => Some(text),
            Err(e) => {
                warn!("completion unavailable, using fallback: {}", e);
                None
            }
        }
    }
}

fn enter(stage: Stage) {
    debug!(?stage, "pipeline stage");
}
