use crate::config::default_overrun_secs;

use serde::{Deserialize, Serialize};

/// Driver behaviour not owned by the recorder itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BehaviourConfig {
    /// Overrun applied to `start` commands that do not name one.
    #[serde(default = "default_overrun_secs")]
    pub default_overrun_secs: u64,
}

impl Default for BehaviourConfig {
    fn default() -> Self {
        Self {
            default_overrun_secs: default_overrun_secs(),
        }
    }
}
