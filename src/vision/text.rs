// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Canonical label normalization for recognized sign text

use crate::config::TextConfig;

/// Cleans raw OCR output and snaps it to a known sign label
///
/// Known patterns are normalized with the same rules at construction, so
/// `normalize(normalize(s)) == normalize(s)` holds for every input.
#[derive(Debug, Clone)]
pub struct TextNormalizer {
    remove_special_chars: bool,
    patterns: Vec<String>,
}

impl TextNormalizer {
    pub fn new(config: &TextConfig) -> Self {
        let mut normalizer = Self {
            remove_special_chars: config.remove_special_chars,
            patterns: Vec::new(),
        };
        normalizer.patterns = config
            .known_patterns
            .iter()
            .map(|p| normalizer.clean(p))
            .filter(|p| !p.is_empty())
            .collect();
        normalizer
    }

    /// Patterns as they are matched, in priority order
    pub fn patterns(&self) -> &[String] {
        &self.patterns
    }

    pub fn normalize(&self, raw_text: &str) -> String {
        let cleaned = self.clean(raw_text);

        // first pattern wins
        for pattern in &self.patterns {
            if cleaned.contains(pattern.as_str()) {
                return pattern.clone();
            }
        }
        cleaned
    }

    /// Upper-case, drop disallowed characters, collapse whitespace
    fn clean(&self, text: &str) -> String {
        let upper = text.to_uppercase();
        let kept: String = if self.remove_special_chars {
            upper.chars().filter(|c| is_allowed(*c)).collect()
        } else {
            upper
        };
        kept.split_whitespace().collect::<Vec<_>>().join(" ")
    }
}

fn is_allowed(c: char) -> bool {
    c.is_alphanumeric() || c.is_whitespace() || c == '-' || c == '/'
}
