//! Link state machine

use std::fmt;

/// Bring-up state of a device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum LinkState {
    /// Created, bring-up not started
    #[default]
    Uninitialized,
    /// Hardware reset in progress
    Resetting,
    /// Checking chip identity and configuring the data path
    Verifying,
    /// Usable
    Ready,
    /// Bring-up failed; resources have been released
    Failed,
}

impl LinkState {
    /// Returns true if the state machine allows moving from `self` to `next`
    pub fn can_transition_to(self, next: LinkState) -> bool {
        use LinkState::*;
        match (self, next) {
            (Failed, _) => false,
            (_, Failed) => true,
            (Uninitialized, Resetting) | (Uninitialized, Verifying) => true,
            (Resetting, Verifying) => true,
            (Verifying, Ready) => true,
            _ => false,
        }
    }
}

impl fmt::Display for LinkState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Uninitialized => "uninitialized",
            Self::Resetting => "resetting",
            Self::Verifying => "verifying",
            Self::Ready => "ready",
            Self::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// One recorded state change
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    /// State before
    pub from: LinkState,
    /// State after
    pub to: LinkState,
}

impl fmt::Display for Transition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.from, self.to)
    }
}

/// Current state plus the history of how it got there
#[derive(Debug, Default)]
pub(crate) struct StateLog {
    current: LinkState,
    history: Vec<Transition>,
}

impl StateLog {
    pub(crate) fn current(&self) -> LinkState {
        self.current
    }

    pub(crate) fn history(&self) -> &[Transition] {
        &self.history
    }

    /// Move to `next` if allowed; returns false (and changes nothing) otherwise
    pub(crate) fn advance(&mut self, next: LinkState) -> bool {
        if !self.current.can_transition_to(next) {
            return false;
        }
        self.history.push(Transition {
            from: self.current,
            to: next,
        });
        self.current = next;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allowed_transitions() {
        use LinkState::*;
        assert!(Uninitialized.can_transition_to(Resetting));
        assert!(Uninitialized.can_transition_to(Verifying));
        assert!(Resetting.can_transition_to(Verifying));
        assert!(Verifying.can_transition_to(Ready));
        for state in [Uninitialized, Resetting, Verifying, Ready] {
            assert!(state.can_transition_to(Failed));
        }
    }

    #[test]
    fn test_rejected_transitions() {
        use LinkState::*;
        assert!(!Uninitialized.can_transition_to(Ready));
        assert!(!Resetting.can_transition_to(Ready));
        assert!(!Ready.can_transition_to(Verifying));
        assert!(!Failed.can_transition_to(Failed));
        assert!(!Failed.can_transition_to(Uninitialized));
    }

    #[test]
    fn test_state_log() {
        let mut log = StateLog::default();
        assert!(log.advance(LinkState::Verifying));
        assert!(!log.advance(LinkState::Resetting));
        assert!(log.advance(LinkState::Ready));
        assert_eq!(log.current(), LinkState::Ready);
        assert_eq!(
            log.history(),
            &[
                Transition {
                    from: LinkState::Uninitialized,
                    to: LinkState::Verifying
                },
                Transition {
                    from: LinkState::Verifying,
                    to: LinkState::Ready
                },
            ]
        );
    }
}
