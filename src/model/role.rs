use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(
    Debug,
    Copy,
    Clone,
    Eq,
    PartialEq,
    Hash,
    Serialize,
    Deserialize,
    ToSchema,
    strum_macros::EnumString,
    strum_macros::AsRefStr,
    strum_macros::Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Role {
    /// Logs time and requests time off for one client.
    Consultant,
    /// Approves timesheets and time off within one client.
    ClientManager,
    /// Unscoped administrator.
    DewAdmin,
}

impl Role {
    pub fn is_admin(&self) -> bool {
        *self == Role::DewAdmin
    }

    pub fn is_manager_or_admin(&self) -> bool {
        matches!(self, Role::ClientManager | Role::DewAdmin)
    }

    /// Admins are never tied to a client; everybody else must be.
    pub fn requires_client(&self) -> bool {
        !self.is_admin()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn role_strings_match_wire_format() {
        assert_eq!(Role::from_str("client_manager").unwrap(), Role::ClientManager);
        assert_eq!(Role::DewAdmin.as_ref(), "dew_admin");
        assert_eq!(serde_json::to_string(&Role::Consultant).unwrap(), "\"consultant\"");
        assert!(Role::from_str("hr").is_err());
    }
}
