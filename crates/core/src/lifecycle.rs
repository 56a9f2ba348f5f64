//! Processing task lifecycle.
//!
//! ```text
//! DISCOVERED ──> IN_QUEUE ──> PROCESSING ──> REDACTED
//!     │                            └───────> REJECTED
//!     └──> INVALID_DOCUMENT
//! ```

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::{CoreError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProcessingState {
    Discovered,
    InQueue,
    Processing,
    Redacted,
    Rejected,
    InvalidDocument,
}

impl ProcessingState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProcessingState::Discovered => "DISCOVERED",
            ProcessingState::InQueue => "IN_QUEUE",
            ProcessingState::Processing => "PROCESSING",
            ProcessingState::Redacted => "REDACTED",
            ProcessingState::Rejected => "REJECTED",
            ProcessingState::InvalidDocument => "INVALID_DOCUMENT",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ProcessingState::Redacted | ProcessingState::Rejected | ProcessingState::InvalidDocument
        )
    }

    pub fn can_transition_to(&self, next: ProcessingState) -> bool {
        use ProcessingState::*;
        matches!(
            (self, next),
            (Discovered, InQueue)
                | (Discovered, InvalidDocument)
                | (InQueue, Processing)
                | (Processing, Redacted)
                | (Processing, Rejected)
        )
    }

    /// Validates a transition and returns the new state.
    pub fn transition(self, next: ProcessingState) -> Result<ProcessingState> {
        if self.can_transition_to(next) {
            Ok(next)
        } else {
            Err(CoreError::InvalidTransition {
                from: self,
                to: next,
            })
        }
    }
}

impl fmt::Display for ProcessingState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProcessingState {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            // uploaders write IN_PROGRESS for freshly stored files
            "DISCOVERED" | "IN_PROGRESS" => Ok(ProcessingState::Discovered),
            "IN_QUEUE" => Ok(ProcessingState::InQueue),
            "PROCESSING" => Ok(ProcessingState::Processing),
            "REDACTED" => Ok(ProcessingState::Redacted),
            "REJECTED" => Ok(ProcessingState::Rejected),
            "INVALID_DOCUMENT" => Ok(ProcessingState::InvalidDocument),
            other => Err(CoreError::UnknownState(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ProcessingState::*;

    const ALL: [ProcessingState; 6] = [
        Discovered,
        InQueue,
        Processing,
        Redacted,
        Rejected,
        InvalidDocument,
    ];

    #[test]
    fn test_happy_path() {
        let state = Discovered
            .transition(InQueue)
            .and_then(|s| s.transition(Processing))
            .and_then(|s| s.transition(Redacted))
            .unwrap();
        assert!(state.is_terminal());
    }

    #[test]
    fn test_terminal_states_never_move() {
        for from in ALL.iter().filter(|s| s.is_terminal()) {
            for to in ALL {
                assert!(from.transition(to).is_err(), "{from} -> {to}");
            }
        }
    }

    #[test]
    fn test_no_skips_or_cycles() {
        assert!(Discovered.transition(Processing).is_err());
        assert!(Discovered.transition(Redacted).is_err());
        assert!(InQueue.transition(Discovered).is_err());
        assert!(InQueue.transition(InvalidDocument).is_err());
        assert!(Processing.transition(InQueue).is_err());
        assert!(Processing.transition(InvalidDocument).is_err());
    }

    #[test]
    fn test_parse_round_trip_and_legacy_alias() {
        for state in ALL {
            assert_eq!(state.as_str().parse::<ProcessingState>().unwrap(), state);
        }
        assert_eq!("IN_PROGRESS".parse::<ProcessingState>().unwrap(), Discovered);
        assert!("DONE".parse::<ProcessingState>().is_err());
    }
}
