//! Status and role gate for timesheet and time-off mutations.
//!
//! Handlers consult the gate before touching storage and the client consults
//! it before issuing a request, so a forbidden action is refused on both
//! sides.

use derive_more::Display;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::model::role::Role;

#[derive(
    Debug,
    Copy,
    Clone,
    Eq,
    PartialEq,
    Serialize,
    Deserialize,
    ToSchema,
    strum_macros::EnumString,
    strum_macros::AsRefStr,
    strum_macros::Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum TimesheetStatus {
    Draft,
    Submitted,
    Approved,
    Rejected,
}

impl TimesheetStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, TimesheetStatus::Approved | TimesheetStatus::Rejected)
    }
}

#[derive(
    Debug,
    Copy,
    Clone,
    Eq,
    PartialEq,
    Serialize,
    Deserialize,
    ToSchema,
    strum_macros::EnumString,
    strum_macros::AsRefStr,
    strum_macros::Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum TimeOffStatus {
    Pending,
    Approved,
    Rejected,
}

/// Who is asking.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Actor {
    pub employee_id: u64,
    pub role: Role,
    pub client_id: Option<u64>,
}

/// Who owns the record being acted on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Owner {
    pub employee_id: u64,
    pub client_id: Option<u64>,
}

impl Actor {
    pub fn owns(&self, owner: &Owner) -> bool {
        self.employee_id == owner.employee_id
    }

    /// Admins manage everyone; managers manage employees of their own client.
    pub fn manages(&self, owner: &Owner) -> bool {
        match self.role {
            Role::DewAdmin => true,
            Role::ClientManager => self.client_id.is_some() && self.client_id == owner.client_id,
            Role::Consultant => false,
        }
    }

    pub fn can_view(&self, owner: &Owner) -> bool {
        self.owns(owner) || self.manages(owner)
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Display)]
pub enum TimesheetAction {
    #[display(fmt = "add an entry to")]
    AddEntry,
    #[display(fmt = "delete an entry from")]
    DeleteEntry,
    #[display(fmt = "edit")]
    Edit,
    #[display(fmt = "delete")]
    Delete,
    #[display(fmt = "submit")]
    Submit,
    #[display(fmt = "approve")]
    Approve,
    #[display(fmt = "reject")]
    Reject,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Display)]
pub enum TimeOffAction {
    #[display(fmt = "update")]
    Update,
    #[display(fmt = "delete")]
    Delete,
    #[display(fmt = "approve")]
    Approve,
    #[display(fmt = "reject")]
    Reject,
}

#[derive(Debug, Clone, PartialEq, Eq, Display)]
pub enum GateError {
    /// Wrong actor for the action.
    #[display(fmt = "Not authorized to {} this {}", action, subject)]
    Forbidden { action: String, subject: &'static str },
    /// Right actor, wrong status.
    #[display(fmt = "Cannot {} a {} {}", action, status, subject)]
    InvalidStatus {
        action: String,
        status: String,
        subject: &'static str,
    },
}

impl std::error::Error for GateError {}

impl GateError {
    pub fn is_forbidden(&self) -> bool {
        matches!(self, GateError::Forbidden { .. })
    }
}

impl TimesheetAction {
    pub fn required_status(&self) -> TimesheetStatus {
        match self {
            TimesheetAction::Approve | TimesheetAction::Reject => TimesheetStatus::Submitted,
            _ => TimesheetStatus::Draft,
        }
    }

    /// Status after the action succeeds; `None` for actions that leave the
    /// status alone.
    pub fn next_status(&self) -> Option<TimesheetStatus> {
        match self {
            TimesheetAction::Submit => Some(TimesheetStatus::Submitted),
            TimesheetAction::Approve => Some(TimesheetStatus::Approved),
            TimesheetAction::Reject => Some(TimesheetStatus::Rejected),
            _ => None,
        }
    }

    fn actor_allowed(&self, actor: &Actor, owner: &Owner) -> bool {
        match self {
            // Admins may edit anyone's entries; everyone else only their own.
            TimesheetAction::AddEntry
            | TimesheetAction::DeleteEntry
            | TimesheetAction::Edit
            | TimesheetAction::Delete => actor.owns(owner) || actor.role.is_admin(),
            TimesheetAction::Submit => actor.owns(owner),
            TimesheetAction::Approve | TimesheetAction::Reject => actor.manages(owner),
        }
    }
}

/// Checks whether `actor` may perform `action` on a timesheet currently in
/// `status`, returning the status it moves to (if any).
pub fn authorize_timesheet(
    action: TimesheetAction,
    status: TimesheetStatus,
    actor: &Actor,
    owner: &Owner,
) -> Result<Option<TimesheetStatus>, GateError> {
    if !action.actor_allowed(actor, owner) {
        return Err(GateError::Forbidden {
            action: action.to_string(),
            subject: "timesheet",
        });
    }

    if status != action.required_status() {
        return Err(GateError::InvalidStatus {
            action: action.to_string(),
            status: status.to_string(),
            subject: "timesheet",
        });
    }

    Ok(action.next_status())
}

/// Maps a requested status on `PUT /timesheets/{id}` to the transition that
/// produces it.
pub fn action_for_target(target: TimesheetStatus) -> Option<TimesheetAction> {
    match target {
        TimesheetStatus::Submitted => Some(TimesheetAction::Submit),
        TimesheetStatus::Approved => Some(TimesheetAction::Approve),
        TimesheetStatus::Rejected => Some(TimesheetAction::Reject),
        TimesheetStatus::Draft => None,
    }
}

impl TimeOffAction {
    pub fn next_status(&self) -> Option<TimeOffStatus> {
        match self {
            TimeOffAction::Approve => Some(TimeOffStatus::Approved),
            TimeOffAction::Reject => Some(TimeOffStatus::Rejected),
            _ => None,
        }
    }
}

/// Every time-off action requires a pending request. Update and delete are
/// reserved for the owner; decisions for a manager of the owner's client or
/// an admin.
pub fn authorize_time_off(
    action: TimeOffAction,
    status: TimeOffStatus,
    actor: &Actor,
    owner: &Owner,
) -> Result<Option<TimeOffStatus>, GateError> {
    let allowed = match action {
        TimeOffAction::Update | TimeOffAction::Delete => actor.owns(owner),
        TimeOffAction::Approve | TimeOffAction::Reject => actor.manages(owner),
    };
    if !allowed {
        return Err(GateError::Forbidden {
            action: action.to_string(),
            subject: "time off request",
        });
    }

    if status != TimeOffStatus::Pending {
        return Err(GateError::InvalidStatus {
            action: action.to_string(),
            status: status.to_string(),
            subject: "time off request",
        });
    }

    Ok(action.next_status())
}

#[cfg(test)]
mod tests {
    use super::*;

    const OWNER: Owner = Owner {
        employee_id: 10,
        client_id: Some(1),
    };

    fn consultant(id: u64) -> Actor {
        Actor {
            employee_id: id,
            role: Role::Consultant,
            client_id: Some(1),
        }
    }

    fn manager(client_id: u64) -> Actor {
        Actor {
            employee_id: 20,
            role: Role::ClientManager,
            client_id: Some(client_id),
        }
    }

    fn admin() -> Actor {
        Actor {
            employee_id: 30,
            role: Role::DewAdmin,
            client_id: None,
        }
    }

    #[test]
    fn owner_adds_entries_only_in_draft() {
        let owner = consultant(10);
        assert_eq!(
            authorize_timesheet(TimesheetAction::AddEntry, TimesheetStatus::Draft, &owner, &OWNER),
            Ok(None)
        );

        let err = authorize_timesheet(
            TimesheetAction::AddEntry,
            TimesheetStatus::Submitted,
            &owner,
            &OWNER,
        )
        .unwrap_err();
        assert!(!err.is_forbidden());
        assert_eq!(err.to_string(), "Cannot add an entry to a submitted timesheet");
    }

    #[test]
    fn other_consultant_cannot_touch_entries() {
        let err = authorize_timesheet(
            TimesheetAction::DeleteEntry,
            TimesheetStatus::Draft,
            &consultant(11),
            &OWNER,
        )
        .unwrap_err();
        assert!(err.is_forbidden());
    }

    #[test]
    fn admin_bypasses_owner_check_but_not_status() {
        assert!(
            authorize_timesheet(TimesheetAction::DeleteEntry, TimesheetStatus::Draft, &admin(), &OWNER)
                .is_ok()
        );
        assert!(
            authorize_timesheet(TimesheetAction::AddEntry, TimesheetStatus::Approved, &admin(), &OWNER)
                .is_err()
        );
    }

    #[test]
    fn submit_moves_draft_to_submitted_once() {
        let owner = consultant(10);
        let next =
            authorize_timesheet(TimesheetAction::Submit, TimesheetStatus::Draft, &owner, &OWNER).unwrap();
        assert_eq!(next, Some(TimesheetStatus::Submitted));

        // Second submit sees the new status and is refused.
        let again = authorize_timesheet(TimesheetAction::Submit, next.unwrap(), &owner, &OWNER);
        assert!(matches!(again, Err(GateError::InvalidStatus { .. })));
    }

    #[test]
    fn only_owner_submits() {
        assert!(
            authorize_timesheet(TimesheetAction::Submit, TimesheetStatus::Draft, &admin(), &OWNER)
                .unwrap_err()
                .is_forbidden()
        );
    }

    #[test]
    fn decisions_need_submitted_and_a_manager_of_the_client() {
        assert_eq!(
            authorize_timesheet(TimesheetAction::Approve, TimesheetStatus::Submitted, &manager(1), &OWNER),
            Ok(Some(TimesheetStatus::Approved))
        );
        assert_eq!(
            authorize_timesheet(TimesheetAction::Reject, TimesheetStatus::Submitted, &admin(), &OWNER),
            Ok(Some(TimesheetStatus::Rejected))
        );
        assert!(
            authorize_timesheet(TimesheetAction::Approve, TimesheetStatus::Submitted, &manager(2), &OWNER)
                .unwrap_err()
                .is_forbidden()
        );
        assert!(
            authorize_timesheet(TimesheetAction::Approve, TimesheetStatus::Submitted, &consultant(10), &OWNER)
                .unwrap_err()
                .is_forbidden()
        );
        assert!(matches!(
            authorize_timesheet(TimesheetAction::Approve, TimesheetStatus::Draft, &manager(1), &OWNER),
            Err(GateError::InvalidStatus { .. })
        ));
    }

    #[test]
    fn approved_and_rejected_are_terminal() {
        for status in [TimesheetStatus::Approved, TimesheetStatus::Rejected] {
            assert!(status.is_terminal());
            for action in [
                TimesheetAction::AddEntry,
                TimesheetAction::Submit,
                TimesheetAction::Approve,
                TimesheetAction::Reject,
            ] {
                assert!(authorize_timesheet(action, status, &admin(), &OWNER).is_err());
            }
        }
    }

    #[test]
    fn put_targets_map_to_transitions() {
        assert_eq!(action_for_target(TimesheetStatus::Rejected), Some(TimesheetAction::Reject));
        assert_eq!(action_for_target(TimesheetStatus::Draft), None);
    }

    #[test]
    fn time_off_gate() {
        let owner = consultant(10);
        assert_eq!(
            authorize_time_off(TimeOffAction::Delete, TimeOffStatus::Pending, &owner, &OWNER),
            Ok(None)
        );
        assert!(matches!(
            authorize_time_off(TimeOffAction::Delete, TimeOffStatus::Approved, &owner, &OWNER),
            Err(GateError::InvalidStatus { .. })
        ));
        assert!(
            authorize_time_off(TimeOffAction::Delete, TimeOffStatus::Pending, &manager(1), &OWNER)
                .unwrap_err()
                .is_forbidden()
        );
        assert_eq!(
            authorize_time_off(TimeOffAction::Approve, TimeOffStatus::Pending, &manager(1), &OWNER),
            Ok(Some(TimeOffStatus::Approved))
        );
        assert!(
            authorize_time_off(TimeOffAction::Reject, TimeOffStatus::Pending, &owner, &OWNER)
                .unwrap_err()
                .is_forbidden()
        );
    }
}
