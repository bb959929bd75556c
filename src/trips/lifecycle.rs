use crate::errors::{Result, RideError};
use crate::types::TripStatus;

/// every permitted (from, to) pair; anything else is rejected
pub const TRANSITIONS: &[(TripStatus, TripStatus)] = &[
    (TripStatus::Pending, TripStatus::Accepted),
    (TripStatus::Pending, TripStatus::InProgress),
    (TripStatus::Pending, TripStatus::Canceled),
    (TripStatus::Accepted, TripStatus::InProgress),
    (TripStatus::Accepted, TripStatus::Completed),
    (TripStatus::Accepted, TripStatus::Canceled),
    (TripStatus::InProgress, TripStatus::Completed),
    (TripStatus::InProgress, TripStatus::Canceled),
];

/// status a newly created trip starts in; there is no separate accept step
pub const INITIAL_STATUS: TripStatus = TripStatus::InProgress;

impl TripStatus {
    /// counts against the one-active-trip-per-passenger rule
    pub fn is_active(&self) -> bool {
        matches!(
            self,
            TripStatus::Pending | TripStatus::Accepted | TripStatus::InProgress
        )
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, TripStatus::Completed | TripStatus::Canceled)
    }

    pub fn can_transition_to(&self, next: TripStatus) -> bool {
        TRANSITIONS.contains(&(*self, next))
    }

    /// statuses reachable in one step
    pub fn next_statuses(&self) -> Vec<TripStatus> {
        TRANSITIONS
            .iter()
            .filter(|(from, _)| from == self)
            .map(|(_, to)| *to)
            .collect()
    }

    pub fn transition(self, next: TripStatus) -> Result<TripStatus> {
        if self.can_transition_to(next) {
            Ok(next)
        } else {
            Err(RideError::InvalidTransition {
                from: self,
                to: next,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [TripStatus; 5] = [
        TripStatus::Pending,
        TripStatus::Accepted,
        TripStatus::InProgress,
        TripStatus::Completed,
        TripStatus::Canceled,
    ];

    #[test]
    fn test_terminal_states_have_no_exit() {
        for terminal in [TripStatus::Completed, TripStatus::Canceled] {
            assert!(terminal.is_terminal());
            assert!(terminal.next_statuses().is_empty());
            for next in ALL {
                assert!(terminal.transition(next).is_err());
            }
        }
    }

    #[test]
    fn test_active_statuses() {
        let active: Vec<_> = ALL.into_iter().filter(|s| s.is_active()).collect();
        assert_eq!(
            active,
            vec![TripStatus::Pending, TripStatus::Accepted, TripStatus::InProgress]
        );
        assert!(INITIAL_STATUS.is_active());
    }

    #[test]
    fn test_completion_paths() {
        assert!(TripStatus::InProgress.can_transition_to(TripStatus::Completed));
        assert!(TripStatus::Accepted.can_transition_to(TripStatus::Completed));
        assert!(!TripStatus::Pending.can_transition_to(TripStatus::Completed));

        assert_eq!(
            TripStatus::Pending.transition(TripStatus::Completed),
            Err(RideError::InvalidTransition {
                from: TripStatus::Pending,
                to: TripStatus::Completed,
            })
        );
    }

    #[test]
    fn test_every_active_status_can_cancel() {
        for status in ALL.into_iter().filter(|s| s.is_active()) {
            assert_eq!(status.transition(TripStatus::Canceled), Ok(TripStatus::Canceled));
        }
    }
}
