//! Agent lifecycle states and transition rules.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle state of an agent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentState {
    Created,
    Initialized,
    Running,
    Stopped,
}

/// Requested lifecycle transition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Initialize,
    Start,
    Stop,
}

impl AgentState {
    /// Target state of a transition, or `None` when the transition is invalid.
    ///
    /// `Start` from `Created` is valid because starting initializes implicitly.
    pub fn next(self, transition: Transition) -> Option<AgentState> {
        match (self, transition) {
            (AgentState::Created, Transition::Initialize) => Some(AgentState::Initialized),
            (AgentState::Created, Transition::Start)
            | (AgentState::Initialized, Transition::Start)
            | (AgentState::Stopped, Transition::Start) => Some(AgentState::Running),
            (AgentState::Running, Transition::Stop) => Some(AgentState::Stopped),
            _ => None,
        }
    }

    pub fn is_running(self) -> bool {
        self == AgentState::Running
    }

    /// Whether capabilities have been registered
    pub fn is_initialized(self) -> bool {
        self != AgentState::Created
    }
}

impl fmt::Display for AgentState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AgentState::Created => "created",
            AgentState::Initialized => "initialized",
            AgentState::Running => "running",
            AgentState::Stopped => "stopped",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_transitions() {
        assert_eq!(
            AgentState::Created.next(Transition::Initialize),
            Some(AgentState::Initialized)
        );
        assert_eq!(
            AgentState::Created.next(Transition::Start),
            Some(AgentState::Running)
        );
        assert_eq!(
            AgentState::Running.next(Transition::Stop),
            Some(AgentState::Stopped)
        );
        assert_eq!(
            AgentState::Stopped.next(Transition::Start),
            Some(AgentState::Running)
        );
    }

    #[test]
    fn test_invalid_transitions() {
        assert_eq!(AgentState::Created.next(Transition::Stop), None);
        assert_eq!(AgentState::Running.next(Transition::Start), None);
        assert_eq!(AgentState::Running.next(Transition::Initialize), None);
        assert_eq!(AgentState::Stopped.next(Transition::Stop), None);
    }

    #[test]
    fn test_serialized_names() {
        assert_eq!(
            serde_json::to_value(AgentState::Running).unwrap(),
            serde_json::json!("running")
        );
        assert_eq!(AgentState::Initialized.to_string(), "initialized");
    }
}
