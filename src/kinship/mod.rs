pub mod arena;
pub mod engine;
pub mod matrix;
pub mod pair;
pub mod state;

pub use engine::KinshipEngine;
pub use matrix::KinshipMatrix;
pub use state::KinshipStats;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Strategy for keeping computed kinship rows during a sweep
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum KinshipMode {
    /// Keep every computed row until the end of the call
    FullRetention,
    /// Drop a vertex's row once all of its children have been processed
    #[default]
    IncrementalEviction,
}

impl fmt::Display for KinshipMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KinshipMode::FullRetention => write!(f, "full-retention"),
            KinshipMode::IncrementalEviction => write!(f, "incremental-eviction"),
        }
    }
}

impl FromStr for KinshipMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "full" | "full-retention" | "memory" => Ok(KinshipMode::FullRetention),
            "eviction" | "incremental-eviction" | "speed" => Ok(KinshipMode::IncrementalEviction),
            other => Err(format!(
                "unknown kinship mode '{}', expected 'full-retention' or 'incremental-eviction'",
                other
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_parsing() {
        assert_eq!("memory".parse::<KinshipMode>().unwrap(), KinshipMode::FullRetention);
        assert_eq!("SPEED".parse::<KinshipMode>().unwrap(), KinshipMode::IncrementalEviction);
        assert_eq!(
            "full-retention".parse::<KinshipMode>().unwrap(),
            KinshipMode::FullRetention
        );
        assert!("fast".parse::<KinshipMode>().is_err());
    }

    #[test]
    fn test_mode_display_round_trips() {
        for mode in [KinshipMode::FullRetention, KinshipMode::IncrementalEviction] {
            assert_eq!(mode.to_string().parse::<KinshipMode>().unwrap(), mode);
        }
        assert_eq!(KinshipMode::default(), KinshipMode::IncrementalEviction);
    }
}
