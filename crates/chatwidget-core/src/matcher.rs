//! Heuristic corpus matching.
//!
//! Scores favour exact and substring hits, then FAQ keywords, then plain
//! word overlap. Scoring is pure and deterministic; ties keep the entry that
//! appears first in the corpus.

use tracing::debug;

use crate::corpus::{FaqEntry, KnowledgeEntry};
use crate::session::ReplySource;

/// Minimum score a match needs to be used as a reply.
pub const MATCH_THRESHOLD: u8 = 30;

/// Words of this many characters or fewer are ignored for overlap.
const SHORT_WORD_CHARS: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MatchedEntry<'a> {
    Faq(&'a FaqEntry),
    Knowledge(&'a KnowledgeEntry),
}

impl<'a> MatchedEntry<'a> {
    pub fn answer(&self) -> &'a str {
        match *self {
            MatchedEntry::Faq(faq) => &faq.answer,
            MatchedEntry::Knowledge(item) => &item.content,
        }
    }

    pub fn source(&self) -> ReplySource {
        match self {
            MatchedEntry::Faq(_) => ReplySource::Faq,
            MatchedEntry::Knowledge(_) => ReplySource::Knowledge,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MatchResult<'a> {
    pub entry: MatchedEntry<'a>,
    /// Always within `0..=100`.
    pub score: u8,
}

/// Best FAQ entry for an already-sanitized query, compared on `question`.
pub fn match_faq<'a>(query: &str, faqs: &'a [FaqEntry]) -> Option<MatchResult<'a>> {
    let query = normalize(query);
    let query_words = significant_words(&query);

    let (faq, score) = best_scoring(faqs, |faq| {
        let question = faq.question.to_lowercase();
        if question.trim().is_empty() {
            debug!("skipping faq with blank question");
            return None;
        }

        let mut score = substring_score(&query, &question);
        if score == 0 {
            let hits = faq
                .keywords()
                .filter(|kw| kw.chars().count() > SHORT_WORD_CHARS && query.contains(kw.as_str()))
                .count() as u32;
            if hits > 0 {
                score = 40 + 10 * hits;
            }
        }

        let common = common_words(&query_words, &question);
        if common >= 2 {
            score = score.max(30 + 10 * common);
        }
        Some(score)
    })?;

    accept(MatchedEntry::Faq(faq), score)
}

/// Best knowledge entry for an already-sanitized query, compared on `title`.
pub fn match_knowledge<'a>(
    query: &str,
    knowledge: &'a [KnowledgeEntry],
) -> Option<MatchResult<'a>> {
    let query = normalize(query);
    let query_words = significant_words(&query);

    let (item, score) = best_scoring(knowledge, |item| {
        let title = item.title.to_lowercase();
        if title.trim().is_empty() {
            debug!("skipping knowledge entry with blank title");
            return None;
        }

        let mut score = substring_score(&query, &title);
        let common = common_words(&query_words, &title);
        if common >= 1 {
            score = score.max(40 + 15 * common);
        }
        Some(score)
    })?;

    accept(MatchedEntry::Knowledge(item), score)
}

fn normalize(query: &str) -> String {
    query.trim().to_lowercase()
}

/// Exact, query-contains-candidate, candidate-contains-query.
fn substring_score(query: &str, candidate: &str) -> u32 {
    if query == candidate {
        100
    } else if query.contains(candidate) {
        80
    } else if candidate.contains(query) && query.chars().count() > 3 {
        60
    } else {
        0
    }
}

/// Distinct words longer than two characters, in first-seen order.
fn significant_words(text: &str) -> Vec<&str> {
    let mut words: Vec<&str> = Vec::new();
    for word in text.split_whitespace() {
        if word.chars().count() > SHORT_WORD_CHARS && !words.contains(&word) {
            words.push(word);
        }
    }
    words
}

fn common_words(query_words: &[&str], candidate: &str) -> u32 {
    let candidate_words = significant_words(candidate);
    query_words
        .iter()
        .filter(|w| candidate_words.contains(*w))
        .count() as u32
}

/// Highest-scoring entry; only a strictly higher score replaces the leader.
fn best_scoring<T, F>(entries: &[T], mut score: F) -> Option<(&T, u32)>
where
    F: FnMut(&T) -> Option<u32>,
{
    let mut best: Option<(&T, u32)> = None;
    for entry in entries {
        let Some(candidate) = score(entry) else {
            continue;
        };
        let candidate = candidate.min(100);
        let leader = best.map(|(_, s)| s).unwrap_or(0);
        if candidate > leader {
            best = Some((entry, candidate));
        }
    }
    best
}

fn accept(entry: MatchedEntry<'_>, score: u32) -> Option<MatchResult<'_>> {
    let score = score.min(100) as u8;
    debug!(score, source = entry.source().as_str(), "best corpus candidate");
    if score >= MATCH_THRESHOLD {
        Some(MatchResult { entry, score })
    } else {
        None
    }
}
