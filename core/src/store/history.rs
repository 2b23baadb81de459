use serde::{Deserialize, Serialize};

/// One user message and the reply it got. The timestamp is RFC 3339; files
/// written before timestamps existed still load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Exchange {
    pub user: String,
    #[serde(rename = "ai")]
    pub reply: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub timestamp: String,
}

/// Ordered conversation log, oldest first.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct History {
    exchanges: Vec<Exchange>,
}

impl History {
    /// Appends an exchange, dropping the oldest entries once `limit` is
    /// exceeded.
    pub fn push(&mut self, user: impl Into<String>, reply: impl Into<String>, limit: usize) {
        self.exchanges.push(Exchange {
            user: user.into(),
            reply: reply.into(),
            timestamp: chrono::Local::now().to_rfc3339(),
        });
        if self.exchanges.len() > limit {
            let excess = self.exchanges.len() - limit;
            self.exchanges.drain(..excess);
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Exchange> {
        self.exchanges.iter()
    }

    /// The most recent `count` exchanges, oldest first.
    pub fn tail(&self, count: usize) -> &[Exchange] {
        let skip = self.exchanges.len().saturating_sub(count);
        &self.exchanges[skip..]
    }

    pub fn len(&self) -> usize {
        self.exchanges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.exchanges.is_empty()
    }

    pub fn clear(&mut self) {
        self.exchanges.clear();
    }
}
