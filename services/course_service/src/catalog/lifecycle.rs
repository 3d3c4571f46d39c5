use chrono::{DateTime, Utc};
use thiserror::Error;

use super::types::{Course, CourseStatus};

#[derive(Debug, Error, PartialEq, Eq)]
#[error("Cannot move a course from {from:?} to {to:?}.")]
pub struct InvalidTransition {
    pub from: CourseStatus,
    pub to: CourseStatus,
}

impl CourseStatus {
    pub fn can_transition_to(self, to: CourseStatus) -> bool {
        use CourseStatus::*;

        matches!(
            (self, to),
            (Draft, PendingApproval)
                | (PendingApproval, Active)
                | (PendingApproval, Draft)
                | (Active, Inactive)
                | (Inactive, Active)
                | (Draft | PendingApproval | Active | Inactive, Archived)
        )
    }

    /// Approval, rejection and reactivation are reserved to administrators.
    pub fn requires_admin(self, to: CourseStatus) -> bool {
        use CourseStatus::*;

        matches!(
            (self, to),
            (PendingApproval, Active) | (PendingApproval, Draft) | (Inactive, Active)
        )
    }
}

impl Course {
    pub fn transition_to(&mut self, to: CourseStatus, at: DateTime<Utc>) -> Result<(), InvalidTransition> {
        if !self.status.can_transition_to(to) {
            return Err(InvalidTransition { from: self.status, to });
        }

        self.status = to;
        self.updated_at = at;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::CourseStatus::*;
    use super::*;

    #[rstest]
    #[case(Draft, PendingApproval, true)]
    #[case(Draft, Active, false)]
    #[case(PendingApproval, Active, true)]
    #[case(PendingApproval, Draft, true)]
    #[case(PendingApproval, Inactive, false)]
    #[case(Active, Inactive, true)]
    #[case(Active, PendingApproval, false)]
    #[case(Inactive, Active, true)]
    #[case(Inactive, Archived, true)]
    #[case(Archived, Active, false)]
    #[case(Archived, Draft, false)]
    #[case(Active, Active, false)]
    fn transitions(#[case] from: CourseStatus, #[case] to: CourseStatus, #[case] allowed: bool) {
        assert_eq!(from.can_transition_to(to), allowed);
    }

    #[test]
    fn admin_only_transitions() {
        assert!(PendingApproval.requires_admin(Active));
        assert!(Inactive.requires_admin(Active));
        assert!(!Draft.requires_admin(PendingApproval));
        assert!(!Active.requires_admin(Archived));
    }
}
