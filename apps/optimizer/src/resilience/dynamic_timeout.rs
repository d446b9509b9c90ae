use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Content at or under this many characters gets the bare category base.
const FREE_CHARS: u64 = 1000;
/// Milliseconds added per character beyond `FREE_CHARS`.
const MS_PER_EXTRA_CHAR: u64 = 1;
/// No derived timeout ever exceeds five minutes.
pub const TIMEOUT_CEILING_MS: u64 = 300_000;

/// The kind of dependency an operation talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeoutCategory {
    Ai,
    File,
    Email,
    Payment,
    Database,
    Default,
}

impl TimeoutCategory {
    pub const ALL: [TimeoutCategory; 6] = [
        TimeoutCategory::Ai,
        TimeoutCategory::File,
        TimeoutCategory::Email,
        TimeoutCategory::Payment,
        TimeoutCategory::Database,
        TimeoutCategory::Default,
    ];

    /// Case-insensitive lookup. Unknown keys fall back to `Default`.
    #[allow(dead_code)]
    pub fn parse(key: &str) -> Self {
        match key.trim().to_ascii_lowercase().as_str() {
            "ai" => TimeoutCategory::Ai,
            "file" => TimeoutCategory::File,
            "email" => TimeoutCategory::Email,
            "payment" => TimeoutCategory::Payment,
            "database" => TimeoutCategory::Database,
            _ => TimeoutCategory::Default,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TimeoutCategory::Ai => "ai",
            TimeoutCategory::File => "file",
            TimeoutCategory::Email => "email",
            TimeoutCategory::Payment => "payment",
            TimeoutCategory::Database => "database",
            TimeoutCategory::Default => "default",
        }
    }
}

impl fmt::Display for TimeoutCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Base timeout per category, in milliseconds. Swappable without touching
/// any caller of `calculate_timeout`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeoutTable {
    pub ai: u64,
    pub file: u64,
    pub email: u64,
    pub payment: u64,
    pub database: u64,
    pub default: u64,
}

impl Default for TimeoutTable {
    fn default() -> Self {
        Self {
            ai: 30_000,
            file: 60_000,
            email: 20_000,
            payment: 15_000,
            database: 10_000,
            default: 15_000,
        }
    }
}

impl TimeoutTable {
    pub fn base_ms(&self, category: TimeoutCategory) -> u64 {
        match category {
            TimeoutCategory::Ai => self.ai,
            TimeoutCategory::File => self.file,
            TimeoutCategory::Email => self.email,
            TimeoutCategory::Payment => self.payment,
            TimeoutCategory::Database => self.database,
            TimeoutCategory::Default => self.default,
        }
    }

    pub fn set_base_ms(&mut self, category: TimeoutCategory, base_ms: u64) {
        let slot = match category {
            TimeoutCategory::Ai => &mut self.ai,
            TimeoutCategory::File => &mut self.file,
            TimeoutCategory::Email => &mut self.email,
            TimeoutCategory::Payment => &mut self.payment,
            TimeoutCategory::Database => &mut self.database,
            TimeoutCategory::Default => &mut self.default,
        };
        *slot = base_ms;
    }

    /// Timeout for an input of `len` units (characters, or bytes for binary
    /// payloads): `min(base + max(0, len - 1000) * 1ms, 300000)`.
    pub fn timeout_for_len(&self, len: usize, category: TimeoutCategory) -> u64 {
        let extra = (len as u64).saturating_sub(FREE_CHARS) * MS_PER_EXTRA_CHAR;
        self.base_ms(category)
            .saturating_add(extra)
            .min(TIMEOUT_CEILING_MS)
    }

    pub fn calculate_timeout_ms(&self, content: &str, category: TimeoutCategory) -> u64 {
        self.timeout_for_len(content.chars().count(), category)
    }

    #[allow(dead_code)]
    pub fn calculate_timeout(&self, content: &str, category: TimeoutCategory) -> Duration {
        Duration::from_millis(self.calculate_timeout_ms(content, category))
    }
}

/// `TimeoutTable::calculate_timeout` against the default table.
#[allow(dead_code)]
pub fn calculate_timeout(content: &str, category: TimeoutCategory) -> Duration {
    TimeoutTable::default().calculate_timeout(content, category)
}
