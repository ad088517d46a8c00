//! Canned replies for when neither the corpus nor the completion service
//! produced an answer. Never fails.

use rand::Rng;
use regex::Regex;
use std::sync::LazyLock;

pub const GREETING_REPLY: &str = "Hello! 👋 How can I assist you today?";
pub const HELP_REPLY: &str = "I'm here to help! What do you need?";
pub const FEATURES_REPLY: &str =
    "✨ I can answer questions, provide info, and assist with various topics!";
pub const PRICING_REPLY: &str = "💰 Please contact our sales team for pricing info.";
pub const CONTACT_REPLY: &str = "📧 You can reach us at support@example.com";
pub const FAREWELL_REPLY: &str = "Goodbye! 👋 Have a great day!";
pub const THANKS_REPLY: &str = "You're welcome! 😊";

/// Picked at random when no rule applies.
pub const CLARIFICATION_REPLIES: [&str; 3] = [
    "I'm not sure about that. Could you rephrase?",
    "Thanks for sharing! What can I help you with?",
    "Got it! Is there anything specific you'd like help with?",
];

/// Checked in order; the first matching rule answers.
static RULES: LazyLock<Vec<(Regex, &'static str)>> = LazyLock::new(|| {
    [
        (r"^(hi|hello|hey)", GREETING_REPLY),
        (r"help|assist", HELP_REPLY),
        (r"feature|capabilit", FEATURES_REPLY),
        (r"pricing|price|cost", PRICING_REPLY),
        (r"contact|email|phone", CONTACT_REPLY),
        (r"bye|goodbye", FAREWELL_REPLY),
        (r"thank", THANKS_REPLY),
    ]
    .into_iter()
    .map(|(pattern, reply)| (Regex::new(&format!("(?i){}", pattern)).unwrap(), reply))
    .collect()
});

#[derive(Debug, Clone, Copy, Default)]
pub struct FallbackResponder;

impl FallbackResponder {
    pub fn new() -> Self {
        Self
    }

    /// Rule-based reply for a sanitized message.
    pub fn respond(&self, message: &str) -> String {
        let lower = message.to_lowercase();
        if let Some(reply) = Self::rule_reply(&lower) {
            return reply.to_string();
        }
        let pick = rand::thread_rng().gen_range(0..CLARIFICATION_REPLIES.len());
        CLARIFICATION_REPLIES[pick].to_string()
    }

    fn rule_reply(lower: &str) -> Option<&'static str> {
        RULES
            .iter()
            .find(|(pattern, _)| pattern.is_match(lower))
            .map(|(_, reply)| *reply)
    }
}
