//! Relay limits (normative defaults).

use serde::{Deserialize, Serialize};

/// Bounds enforced when external peers announce sessions. Defaults follow
/// the historical protocol limits.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Limits {
    pub max_session_name_len: usize,
    pub max_hostname_len: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_session_name_len: 255,
            max_hostname_len: 64,
        }
    }
}
