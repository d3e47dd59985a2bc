use crate::recommendations::RecommendationStatus;

/// Service for managing recommendation status transitions
///
/// The lifecycle is a lookup table from each state to its set of legal next
/// states; absence from that set is the only failure condition.
pub struct StatusMachine;

impl StatusMachine {
    /// Legal next states for a given status
    ///
    /// - Pending → Scheduled, Dismissed
    /// - Scheduled → Completed, Dismissed
    /// - Completed → (terminal, no transitions)
    /// - Dismissed → (terminal, no transitions)
    pub fn allowed_transitions(from: RecommendationStatus) -> &'static [RecommendationStatus] {
        match from {
            RecommendationStatus::Pending => &[
                RecommendationStatus::Scheduled,
                RecommendationStatus::Dismissed,
            ],
            RecommendationStatus::Scheduled => &[
                RecommendationStatus::Completed,
                RecommendationStatus::Dismissed,
            ],
            RecommendationStatus::Completed => &[],
            RecommendationStatus::Dismissed => &[],
        }
    }

    /// Check if a status transition is valid
    pub fn is_valid_transition(from: RecommendationStatus, to: RecommendationStatus) -> bool {
        Self::allowed_transitions(from).contains(&to)
    }

    /// Attempt to transition from one status to another
    ///
    /// # Returns
    /// `Ok(to)` if the transition is valid, `Err(message)` otherwise. The
    /// error for a terminal state names the current state and that it is
    /// terminal.
    pub fn transition(
        from: RecommendationStatus,
        to: RecommendationStatus,
    ) -> Result<RecommendationStatus, String> {
        if Self::is_valid_transition(from, to) {
            return Ok(to);
        }

        if from.is_terminal() {
            Err(format!(
                "Cannot transition from {}: {} is a terminal state",
                from, from
            ))
        } else {
            Err(format!(
                "Invalid status transition from {} to {}",
                from, to
            ))
        }
    }
}
