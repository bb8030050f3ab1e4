use crate::model::employee::Employee;
use crate::model::role::Role;
use crate::models::TokenResponse;
use crate::timekeeping::Actor;

/// The signed-in user. Created at sign-in, dropped at sign-out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub access_token: String,
    /// Absent when the session was resumed from a bare access token.
    pub refresh_token: Option<String>,
    pub employee_id: u64,
    pub email: String,
    pub full_name: String,
    pub role: Role,
    pub client_id: Option<u64>,
}

impl Session {
    pub fn from_tokens(tokens: TokenResponse) -> Self {
        Self {
            access_token: tokens.access_token,
            refresh_token: Some(tokens.refresh_token),
            employee_id: tokens.user_id,
            email: tokens.email,
            full_name: tokens.full_name,
            role: tokens.role,
            client_id: tokens.client_id,
        }
    }

    /// Builds a session from an access token and the `/auth/me` profile it
    /// resolved to.
    pub fn from_profile(access_token: String, profile: Employee) -> Self {
        Self {
            access_token,
            refresh_token: None,
            employee_id: profile.id,
            email: profile.email,
            full_name: profile.full_name,
            role: profile.role,
            client_id: profile.client_id,
        }
    }

    pub fn actor(&self) -> Actor {
        Actor {
            employee_id: self.employee_id,
            role: self.role,
            client_id: self.client_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_from_tokens_keeps_identity() {
        let session = Session::from_tokens(TokenResponse {
            access_token: "a".into(),
            refresh_token: "r".into(),
            token_type: "bearer".into(),
            user_id: 7,
            email: "jane@dewsoftware.com".into(),
            role: Role::ClientManager,
            full_name: "Jane Doe".into(),
            client_id: Some(3),
        });

        assert_eq!(session.refresh_token.as_deref(), Some("r"));
        assert_eq!(
            session.actor(),
            Actor {
                employee_id: 7,
                role: Role::ClientManager,
                client_id: Some(3),
            }
        );
    }
}
