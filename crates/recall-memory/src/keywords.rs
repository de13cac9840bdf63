// SPDX-FileCopyrightText: 2026 Recall Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Deterministic keyword extraction.
//!
//! Text is split on every non-alphanumeric character, lowercased, optionally
//! folded from plural to singular, and filtered against a fixed English
//! stopword list. The same input always yields the same set, and extracting
//! from the space-joined output reproduces it exactly.

use std::collections::{BTreeMap, BTreeSet};

use recall_config::model::KeywordsConfig;

const MIN_KEYWORD_CHARS: usize = 2;
const MAX_KEYWORD_CHARS: usize = 64;

/// Sorted for binary search.
const STOPWORDS: &[&str] = &[
    "a", "about", "above", "after", "again", "against", "all", "also", "am", "an", "and", "any",
    "are", "as", "at", "be", "because", "been", "before", "being", "below", "between", "both",
    "but", "by", "can", "could", "did", "do", "does", "doing", "done", "down", "during", "each",
    "else", "few", "for", "from", "further", "get", "got", "had", "has", "have", "having", "he",
    "her", "here", "hers", "herself", "him", "himself", "his", "how", "i", "if", "in", "into",
    "is", "it", "its", "itself", "just", "let", "like", "me", "more", "most", "much", "my",
    "myself", "no", "nor", "not", "now", "of", "off", "on", "once", "only", "or", "other", "our",
    "ours", "ourselves", "out", "over", "own", "please", "same", "she", "should", "so", "some",
    "such", "tell", "than", "that", "the", "their", "theirs", "them", "themselves", "then",
    "there", "these", "they", "this", "those", "through", "to", "too", "under", "until", "up",
    "us", "very", "was", "we", "were", "what", "when", "where", "which", "while", "who", "whom",
    "why", "will", "with", "would", "yes", "you", "your", "yours", "yourself", "yourselves",
];

fn is_stopword(word: &str) -> bool {
    STOPWORDS.binary_search(&word).is_ok()
}

/// Fold simple English plurals: `cities -> city`, `countries -> country`,
/// `kenyans -> kenyan`. Words ending in `ss`, `us` or `is` are left alone.
fn stem(word: &str) -> String {
    let chars = word.chars().count();
    if chars > 4
        && let Some(root) = word.strip_suffix("ies")
    {
        return format!("{root}y");
    }
    if chars > 3
        && word.ends_with('s')
        && !word.ends_with("ss")
        && !word.ends_with("us")
        && !word.ends_with("is")
    {
        return word[..word.len() - 1].to_string();
    }
    word.to_string()
}

/// Split into `(lowercased, surface)` token pairs.
///
/// Lowercasing can expand a character into several (some of them not
/// alphanumeric); those act as separators so the output is closed under
/// re-tokenization.
fn tokenize(text: &str) -> Vec<(String, String)> {
    let mut tokens = Vec::new();
    let mut lower = String::new();
    let mut surface = String::new();

    let mut flush = |lower: &mut String, surface: &mut String| {
        if !lower.is_empty() {
            tokens.push((std::mem::take(lower), std::mem::take(surface)));
        } else {
            surface.clear();
        }
    };

    for ch in text.chars() {
        if !ch.is_alphanumeric() {
            flush(&mut lower, &mut surface);
            continue;
        }
        surface.push(ch);
        for lc in ch.to_lowercase() {
            if lc.is_alphanumeric() {
                lower.push(lc);
            } else {
                flush(&mut lower, &mut surface);
            }
        }
    }
    flush(&mut lower, &mut surface);
    tokens
}

/// Pure, deterministic keyword extractor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeywordExtractor {
    stemming: bool,
}

impl Default for KeywordExtractor {
    fn default() -> Self {
        Self { stemming: true }
    }
}

impl KeywordExtractor {
    /// Builds an extractor from the `[keywords]` config section.
    pub fn new(config: &KeywordsConfig) -> Self {
        Self {
            stemming: config.stemming,
        }
    }

    /// Builds an extractor with plural folding switched on or off.
    pub fn with_stemming(stemming: bool) -> Self {
        Self { stemming }
    }

    /// Canonical form of one lowercased token, or `None` if it is filtered out.
    fn canonicalize(&self, token: &str) -> Option<String> {
        if is_stopword(token) {
            return None;
        }
        let key = if self.stemming {
            stem(token)
        } else {
            token.to_string()
        };
        let len = key.chars().count();
        if !(MIN_KEYWORD_CHARS..=MAX_KEYWORD_CHARS).contains(&len) || is_stopword(&key) {
            return None;
        }
        Some(key)
    }

    /// The set of canonical keywords in `text`.
    pub fn extract(&self, text: &str) -> BTreeSet<String> {
        tokenize(text)
            .into_iter()
            .filter_map(|(lower, _)| self.canonicalize(&lower))
            .collect()
    }

    /// Canonical keywords mapped to the surface form of their first occurrence.
    pub fn extract_with_display(&self, text: &str) -> BTreeMap<String, String> {
        let mut out = BTreeMap::new();
        for (lower, surface) in tokenize(text) {
            if let Some(key) = self.canonicalize(&lower) {
                out.entry(key).or_insert(surface);
            }
        }
        out
    }
}
