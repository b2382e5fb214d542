use std::env;

use crate::sampler::DEFAULT_DISTRACTORS;

/// Characters offered in a "learn new" session.
pub const DEFAULT_NEW_BATCH: u32 = 10;
/// Rows shown in the dashboard's recent activity list.
pub const DEFAULT_RECENT_LIMIT: u32 = 5;

/// Tunables for starting practice sessions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PracticeConfig {
    pub new_batch: u32,
    pub distractors: usize,
    pub shuffle: bool,
    pub recent_limit: u32,
}

impl Default for PracticeConfig {
    fn default() -> Self {
        Self {
            new_batch: DEFAULT_NEW_BATCH,
            distractors: DEFAULT_DISTRACTORS,
            shuffle: false,
            recent_limit: DEFAULT_RECENT_LIMIT,
        }
    }
}

impl PracticeConfig {
    /// Read `HANZI_NEW_BATCH`, `HANZI_DISTRACTORS` and `HANZI_SHUFFLE`.
    ///
    /// Unset or unparsable values fall back to the defaults.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_vars(|key| env::var(key).ok())
    }

    #[must_use]
    pub fn from_vars(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let new_batch = lookup("HANZI_NEW_BATCH")
            .and_then(|raw| raw.trim().parse::<u32>().ok())
            .filter(|n| *n > 0)
            .unwrap_or(defaults.new_batch);
        let distractors = lookup("HANZI_DISTRACTORS")
            .and_then(|raw| raw.trim().parse::<usize>().ok())
            .unwrap_or(defaults.distractors);
        let shuffle = lookup("HANZI_SHUFFLE")
            .and_then(|raw| parse_flag(&raw))
            .unwrap_or(defaults.shuffle);
        Self {
            new_batch,
            distractors,
            shuffle,
            recent_limit: defaults.recent_limit,
        }
    }
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
