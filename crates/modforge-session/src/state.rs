use serde::{Deserialize, Serialize};
use std::fmt;

/// Where a session is in the develop pipeline.
///
/// ```text
/// IDLE → THINKING → GENERATING → SYNTAX_CHECKING ⇄ FIXING
///                                      ↓
///                              SECURITY_SCANNING → COMPLETED
/// ```
/// ERROR is reachable from every state. A new request may start from IDLE,
/// COMPLETED or ERROR. A rule-based repair run enters at SYNTAX_CHECKING and
/// may complete straight from it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[allow(missing_docs)]
pub enum AgentState {
    #[default]
    Idle,
    Thinking,
    Generating,
    SyntaxChecking,
    Fixing,
    SecurityScanning,
    Completed,
    Error,
}

impl AgentState {
    /// Whether the pipeline may move from `self` to `next`.
    pub fn can_transition_to(self, next: AgentState) -> bool {
        use AgentState::*;
        match (self, next) {
            (_, Error) => true,
            (Idle | Completed | Error, Thinking | SyntaxChecking) => true,
            (Thinking, Generating) => true,
            (Generating, SyntaxChecking) => true,
            (SyntaxChecking, Fixing | SecurityScanning | Completed) => true,
            (Fixing, SyntaxChecking) => true,
            (SecurityScanning, Completed) => true,
            (_, Idle) => true,
            _ => false,
        }
    }

    /// True for COMPLETED and ERROR.
    pub fn is_terminal(self) -> bool {
        matches!(self, AgentState::Completed | AgentState::Error)
    }

    /// True while a develop run is in flight.
    pub fn is_busy(self) -> bool {
        !matches!(self, AgentState::Idle) && !self.is_terminal()
    }

    /// Wire tag.
    pub fn as_str(self) -> &'static str {
        match self {
            AgentState::Idle => "IDLE",
            AgentState::Thinking => "THINKING",
            AgentState::Generating => "GENERATING",
            AgentState::SyntaxChecking => "SYNTAX_CHECKING",
            AgentState::Fixing => "FIXING",
            AgentState::SecurityScanning => "SECURITY_SCANNING",
            AgentState::Completed => "COMPLETED",
            AgentState::Error => "ERROR",
        }
    }
}

impl fmt::Display for AgentState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle of one recorded tool call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ToolStatus {
    /// Recorded, not yet running.
    Pending,
    /// Running.
    Executing,
    /// Finished successfully.
    Success,
    /// Finished with an error.
    Failed,
}

impl ToolStatus {
    /// True for SUCCESS and FAILED.
    pub fn is_finished(self) -> bool {
        matches!(self, ToolStatus::Success | ToolStatus::Failed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_happy_path_transitions() {
        let path = [
            AgentState::Idle,
            AgentState::Thinking,
            AgentState::Generating,
            AgentState::SyntaxChecking,
            AgentState::Fixing,
            AgentState::SyntaxChecking,
            AgentState::SecurityScanning,
            AgentState::Completed,
        ];
        for pair in path.windows(2) {
            assert!(pair[0].can_transition_to(pair[1]), "{} -> {}", pair[0], pair[1]);
        }
    }

    #[test]
    fn test_rule_repair_transitions() {
        let path = [
            AgentState::Idle,
            AgentState::SyntaxChecking,
            AgentState::Fixing,
            AgentState::SyntaxChecking,
            AgentState::Completed,
        ];
        for pair in path.windows(2) {
            assert!(pair[0].can_transition_to(pair[1]), "{} -> {}", pair[0], pair[1]);
        }
        assert!(!AgentState::Generating.can_transition_to(AgentState::Completed));
    }

    #[test]
    fn test_error_reachable_from_everywhere() {
        for state in [
            AgentState::Idle,
            AgentState::Generating,
            AgentState::Fixing,
            AgentState::Completed,
        ] {
            assert!(state.can_transition_to(AgentState::Error));
        }
    }

    #[test]
    fn test_skipping_steps_rejected() {
        assert!(!AgentState::Thinking.can_transition_to(AgentState::Completed));
        assert!(!AgentState::Generating.can_transition_to(AgentState::Fixing));
        assert!(!AgentState::Fixing.can_transition_to(AgentState::SecurityScanning));
    }

    #[test]
    fn test_busy_and_terminal() {
        assert!(AgentState::Fixing.is_busy());
        assert!(!AgentState::Idle.is_busy());
        assert!(AgentState::Error.is_terminal());
        assert_eq!(
            serde_json::to_string(&AgentState::SyntaxChecking).unwrap_or_default(),
            "\"SYNTAX_CHECKING\""
        );
    }
}
