//! Vote policy parameters.
//!
//! The current policy is a fixed set of constants. They live in one struct so
//! that a future, more sophisticated policy can replace them without touching
//! the orchestrator.

use serde::{Deserialize, Serialize};

/// 72 hours.
pub const DEFAULT_REPEAT_VOTE_WINDOW_SECS: u64 = 72 * 3600;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VotePolicy {
    /// Tabcoins charged to the voter per vote.
    #[serde(default = "default_vote_cost")]
    pub vote_cost: i64,

    /// Tabcash credited to the voter per vote.
    #[serde(default = "default_vote_reward")]
    pub vote_reward: i64,

    /// Maximum votes by one voter on one content within the window.
    #[serde(default = "default_repeat_vote_limit")]
    pub repeat_vote_limit: u32,

    /// Length of the rolling repeat-vote window in seconds.
    #[serde(default = "default_repeat_vote_window_secs")]
    pub repeat_vote_window_secs: u64,
}

fn default_vote_cost() -> i64 {
    2
}

fn default_vote_reward() -> i64 {
    1
}

fn default_repeat_vote_limit() -> u32 {
    3
}

fn default_repeat_vote_window_secs() -> u64 {
    DEFAULT_REPEAT_VOTE_WINDOW_SECS
}

impl Default for VotePolicy {
    fn default() -> Self {
        Self {
            vote_cost: default_vote_cost(),
            vote_reward: default_vote_reward(),
            repeat_vote_limit: default_repeat_vote_limit(),
            repeat_vote_window_secs: default_repeat_vote_window_secs(),
        }
    }
}
