//! Output shaping: length limiting and the "thinking" delay.

use rand::Rng;
use std::time::Duration;

use crate::config::ResponseSettings;

const ELLIPSIS: &str = "...";

/// Smallest usable limit: one character plus the ellipsis.
pub const MIN_MAX_LENGTH: usize = ELLIPSIS.len() + 1;
const JITTER_MS: f64 = 300.0;

/// Whether thinking delays are real or always zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Pacing {
    #[default]
    Interactive,
    /// For tests and non-interactive hosts.
    Instant,
}

#[derive(Debug, Clone)]
pub struct ResponseShaper {
    settings: ResponseSettings,
    pacing: Pacing,
}

impl ResponseShaper {
    pub fn new(settings: ResponseSettings) -> Self {
        Self {
            settings,
            pacing: Pacing::default(),
        }
    }

    pub fn with_pacing(mut self, pacing: Pacing) -> Self {
        self.pacing = pacing;
        self
    }

    /// Configured limits below `MIN_MAX_LENGTH` are raised to it so a
    /// non-empty reply never shapes down to nothing.
    pub fn limit(&self, text: &str) -> String {
        limit_response(text, self.settings.max_length.max(MIN_MAX_LENGTH))
    }

    /// Delay before showing `response`, proportional to its length plus a
    /// little jitter, clamped to the configured bounds.
    pub fn thinking_delay(&self, response: &str) -> Duration {
        if self.pacing == Pacing::Instant {
            return Duration::ZERO;
        }
        let jitter = rand::thread_rng().gen_range(-JITTER_MS..=JITTER_MS);
        let ms = pace_millis(&self.settings, response.chars().count(), jitter);
        Duration::from_millis(ms)
    }
}

fn pace_millis(settings: &ResponseSettings, chars: usize, jitter: f64) -> u64 {
    let min = settings.min_thinking_ms as f64;
    let max = settings.max_thinking_ms as f64;
    let ms = min + chars as f64 * settings.words_per_ms + jitter;
    ms.max(min).min(max).round() as u64
}

/// Cut `text` to at most `max_length` characters.
///
/// Prefers the last sentence end past the halfway mark, then the last
/// whitespace past the halfway mark (with an ellipsis), then a hard cut.
pub fn limit_response(text: &str, max_length: usize) -> String {
    let chars: Vec<char> = text.chars().collect();
    if chars.len() <= max_length {
        return text.to_string();
    }
    if max_length <= ELLIPSIS.len() {
        return chars[..max_length].iter().collect();
    }

    let past_half = |idx: usize| idx * 2 > max_length;

    let window = &chars[..max_length];
    if let Some(end) = window.iter().rposition(|c| matches!(c, '.' | '?' | '!')) {
        if past_half(end) {
            return window[..=end].iter().collect();
        }
    }

    let head = max_length - ELLIPSIS.len();
    if let Some(space) = chars[..head].iter().rposition(|c| c.is_whitespace()) {
        if past_half(space) {
            let mut cut: String = chars[..space].iter().collect();
            cut.push_str(ELLIPSIS);
            return cut;
        }
    }

    let mut cut: String = chars[..head].iter().collect();
    cut.push_str(ELLIPSIS);
    cut
}
