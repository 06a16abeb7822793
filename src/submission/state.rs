//! Pipeline states for one submission run

use crate::error::{TransferError, TransferResult};

use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmissionState {
    Start,
    AddressDerived,
    NonceFetched,
    GasPriceFetched,
    Built,
    Signed,
    Broadcast,
    Verified,
    /// Terminal failure; `stage` is the last state reached before it
    Failed { stage: &'static str, reason: String },
}

impl SubmissionState {
    /// Position in the pipeline, `None` for the failure state
    fn step(&self) -> Option<u8> {
        match self {
            SubmissionState::Start => Some(0),
            SubmissionState::AddressDerived => Some(1),
            SubmissionState::NonceFetched => Some(2),
            SubmissionState::GasPriceFetched => Some(3),
            SubmissionState::Built => Some(4),
            SubmissionState::Signed => Some(5),
            SubmissionState::Broadcast => Some(6),
            SubmissionState::Verified => Some(7),
            SubmissionState::Failed { .. } => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            SubmissionState::Start => "Start",
            SubmissionState::AddressDerived => "AddressDerived",
            SubmissionState::NonceFetched => "NonceFetched",
            SubmissionState::GasPriceFetched => "GasPriceFetched",
            SubmissionState::Built => "Built",
            SubmissionState::Signed => "Signed",
            SubmissionState::Broadcast => "Broadcast",
            SubmissionState::Verified => "Verified",
            SubmissionState::Failed { .. } => "Failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            SubmissionState::Verified | SubmissionState::Failed { .. }
        )
    }

    /// Move to `next`: the following pipeline state, or `Failed` from any
    /// non-terminal state
    pub fn transition(&mut self, next: SubmissionState) -> TransferResult<()> {
        let allowed = match (self.step(), next.step()) {
            (Some(current), Some(target)) => target == current + 1,
            (Some(_), None) => !self.is_terminal(),
            (None, _) => false,
        };

        if !allowed {
            return Err(TransferError::InvalidStateTransition {
                from: self.name().to_string(),
                to: next.name().to_string(),
            });
        }

        *self = next;
        Ok(())
    }
}

impl fmt::Display for SubmissionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SubmissionState::Failed { stage, reason } => {
                write!(f, "Failed after {}: {}", stage, reason)
            }
            other => f.write_str(other.name()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PIPELINE: [SubmissionState; 8] = [
        SubmissionState::Start,
        SubmissionState::AddressDerived,
        SubmissionState::NonceFetched,
        SubmissionState::GasPriceFetched,
        SubmissionState::Built,
        SubmissionState::Signed,
        SubmissionState::Broadcast,
        SubmissionState::Verified,
    ];

    fn failed() -> SubmissionState {
        SubmissionState::Failed {
            stage: "Signed",
            reason: "rejected".to_string(),
        }
    }

    #[test]
    fn test_walks_pipeline_in_order() {
        let mut state = SubmissionState::Start;
        for next in PIPELINE.iter().skip(1) {
            state.transition(next.clone()).unwrap();
        }
        assert_eq!(state, SubmissionState::Verified);
        assert!(state.is_terminal());
    }

    #[test]
    fn test_rejects_skips_and_reentry() {
        let mut state = SubmissionState::Start;
        assert!(state.transition(SubmissionState::Built).is_err());

        state.transition(SubmissionState::AddressDerived).unwrap();
        let err = state
            .transition(SubmissionState::AddressDerived)
            .unwrap_err();
        assert!(matches!(err, TransferError::InvalidStateTransition { .. }));
        assert_eq!(state, SubmissionState::AddressDerived);
    }

    #[test]
    fn test_any_running_state_can_fail() {
        for running in PIPELINE.iter().take(7) {
            let mut state = running.clone();
            state.transition(failed()).unwrap();
            assert!(state.is_terminal());
        }
    }

    #[test]
    fn test_terminal_states_are_final() {
        let mut verified = SubmissionState::Verified;
        assert!(verified.transition(failed()).is_err());

        let mut state = failed();
        assert!(state.transition(SubmissionState::Start).is_err());
        assert!(state.transition(failed()).is_err());
    }

    #[test]
    fn test_display() {
        assert_eq!(SubmissionState::Broadcast.to_string(), "Broadcast");
        assert_eq!(failed().to_string(), "Failed after Signed: rejected");
    }
}
