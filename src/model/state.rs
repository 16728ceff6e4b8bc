use std::fmt;

use tokio::sync::watch;

/// Unified driver state across all cluster managers.
///
/// Manager-specific vocabularies (standalone driver states, YARN application
/// reports, Kubernetes pod phases) are mapped into this enum inside the
/// status backends; nothing outside that layer branches on the manager kind.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    #[default]
    NotSubmitted,
    Submitted,
    Running,
    Finished,
    Failed,
    Killed,
    /// The state could not be determined, e.g. a poll cycle failed.
    /// Not terminal: the next cycle may recover.
    Unknown,
}

impl JobState {
    /// Terminal states conclude a job; no transition leaves them.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Finished | Self::Failed | Self::Killed)
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::NotSubmitted => "NOT_SUBMITTED",
            Self::Submitted => "SUBMITTED",
            Self::Running => "RUNNING",
            Self::Finished => "FINISHED",
            Self::Failed => "FAILED",
            Self::Killed => "KILLED",
            Self::Unknown => "UNKNOWN",
        })
    }
}

/// Moves the shared state cell forward, refusing any transition out of a
/// terminal state. All writers (capture task, poller, controller) go through
/// here so terminal states stay sticky.
pub(crate) fn advance(cell: &watch::Sender<JobState>, next: JobState) {
    cell.send_if_modified(|current| {
        if current.is_terminal() || *current == next {
            return false;
        }
        *current = next;
        true
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminal_states() {
        assert!(JobState::Finished.is_terminal());
        assert!(JobState::Failed.is_terminal());
        assert!(JobState::Killed.is_terminal());
        assert!(!JobState::NotSubmitted.is_terminal());
        assert!(!JobState::Submitted.is_terminal());
        assert!(!JobState::Running.is_terminal());
        assert!(!JobState::Unknown.is_terminal());
    }

    #[test]
    fn advance_is_sticky_after_conclusion() {
        let (tx, rx) = watch::channel(JobState::NotSubmitted);
        advance(&tx, JobState::Submitted);
        advance(&tx, JobState::Running);
        advance(&tx, JobState::Finished);
        assert_eq!(*rx.borrow(), JobState::Finished);

        advance(&tx, JobState::Running);
        advance(&tx, JobState::Unknown);
        advance(&tx, JobState::Killed);
        assert_eq!(*rx.borrow(), JobState::Finished);
    }

    #[test]
    fn advance_allows_recovery_from_unknown() {
        let (tx, rx) = watch::channel(JobState::Submitted);
        advance(&tx, JobState::Unknown);
        advance(&tx, JobState::Running);
        assert_eq!(*rx.borrow(), JobState::Running);
    }

    #[test]
    fn display_matches_driver_vocabulary() {
        assert_eq!(JobState::NotSubmitted.to_string(), "NOT_SUBMITTED");
        assert_eq!(JobState::Killed.to_string(), "KILLED");
    }
}
