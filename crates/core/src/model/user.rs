use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::model::ids::UserId;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum UserError {
    #[error("first name cannot be empty")]
    EmptyFirstName,

    #[error("last name cannot be empty")]
    EmptyLastName,

    #[error("email cannot be empty")]
    EmptyEmail,

    #[error("email is not a valid address")]
    InvalidEmail,
}

//
// ─── USER ──────────────────────────────────────────────────────────────────────
//

/// A learner account, identified for progress tracking and the leaderboard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    id: UserId,
    first_name: String,
    last_name: String,
    email: String,
    created_at: DateTime<Utc>,
}

impl User {
    /// Creates a new User.
    ///
    /// # Errors
    ///
    /// Returns `UserError` if a name is empty after trimming or the email
    /// does not look like an address.
    pub fn new(
        id: UserId,
        first_name: impl Into<String>,
        last_name: impl Into<String>,
        email: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> Result<Self, UserError> {
        let first_name = first_name.into().trim().to_owned();
        if first_name.is_empty() {
            return Err(UserError::EmptyFirstName);
        }

        let last_name = last_name.into().trim().to_owned();
        if last_name.is_empty() {
            return Err(UserError::EmptyLastName);
        }

        let email = email.into().trim().to_owned();
        if email.is_empty() {
            return Err(UserError::EmptyEmail);
        }
        if !email.contains('@') {
            return Err(UserError::InvalidEmail);
        }

        Ok(Self {
            id,
            first_name,
            last_name,
            email,
            created_at,
        })
    }

    // Accessors
    #[must_use]
    pub fn id(&self) -> UserId {
        self.id
    }

    #[must_use]
    pub fn first_name(&self) -> &str {
        &self.first_name
    }

    #[must_use]
    pub fn last_name(&self) -> &str {
        &self.last_name
    }

    #[must_use]
    pub fn email(&self) -> &str {
        &self.email
    }

    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Display name used by leaderboard rows.
    #[must_use]
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::fixed_now;

    #[test]
    fn user_new_rejects_empty_first_name() {
        let err = User::new(UserId::new(1), "  ", "Doe", "jane@example.com", fixed_now())
            .unwrap_err();
        assert_eq!(err, UserError::EmptyFirstName);
    }

    #[test]
    fn user_new_rejects_bad_email() {
        let err = User::new(UserId::new(1), "Jane", "Doe", "not-an-email", fixed_now())
            .unwrap_err();
        assert_eq!(err, UserError::InvalidEmail);
    }

    #[test]
    fn user_trims_fields_and_builds_full_name() {
        let user = User::new(
            UserId::new(7),
            "  Jane ",
            " Doe ",
            " jane@example.com ",
            fixed_now(),
        )
        .unwrap();

        assert_eq!(user.first_name(), "Jane");
        assert_eq!(user.last_name(), "Doe");
        assert_eq!(user.email(), "jane@example.com");
        assert_eq!(user.full_name(), "Jane Doe");
    }
}
