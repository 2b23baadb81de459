use crate::text::normalize;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Learned question/answer pairs, keyed by the normalized question so
/// lookups ignore case, punctuation and spacing.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Knowledge {
    entries: BTreeMap<String, String>,
}

impl Knowledge {
    /// Starter entries for a fresh data directory.
    pub fn seeded() -> Self {
        let mut knowledge = Knowledge::default();
        for (question, answer) in [
            ("what is your name", "I am Quip, your local chat companion."),
            ("hello", "Hello! How can I help you today?"),
            ("how are you", "I'm always running fine!"),
            (
                "help",
                "Try: math expressions, teach:question=>answer, show knowledge, save conversation.",
            ),
        ] {
            knowledge
                .entries
                .insert(question.to_string(), answer.to_string());
        }
        knowledge
    }

    pub fn lookup(&self, question: &str) -> Option<&str> {
        self.entries.get(&normalize(question)).map(String::as_str)
    }

    /// Stores an answer under the normalized question and returns the key it
    /// was stored under. Returns None when either side reduces to nothing,
    /// so callers can reject unteachable input.
    pub fn teach(&mut self, question: &str, answer: &str) -> Option<String> {
        let key = normalize(question);
        let answer = answer.trim();
        if key.is_empty() || answer.is_empty() {
            return None;
        }
        self.entries.insert(key.clone(), answer.to_string());
        Some(key)
    }

    /// Removes an entry, returning its answer if it existed.
    pub fn forget(&mut self, question: &str) -> Option<String> {
        self.entries.remove(&normalize(question))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(q, a)| (q.as_str(), a.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
