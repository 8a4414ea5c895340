//! Entitlement gate
//!
//! Decides whether a profile bypasses battery gating entirely. Admins and
//! profiles flagged to always see answers are treated as free and
//! always-permitted; everyone else goes through the battery checks.

use serde::{Deserialize, Serialize};

use crate::core::types::UserId;

/// Account role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    Student,
    Admin,
}

/// The slice of the user profile the gate needs
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: UserId,
    pub role: UserRole,
    /// Support/testing flag: answers are always visible for this account
    pub always_show_answers: bool,
}

/// Whether this profile bypasses all battery gating
pub fn has_full_access(profile: &UserProfile) -> bool {
    profile.role == UserRole::Admin || profile.always_show_answers
}

#[cfg(test)]
mod tests {
    use super::*;

    fn student() -> UserProfile {
        UserProfile {
            id: UserId::new(),
            role: UserRole::Student,
            always_show_answers: false,
        }
    }

    #[test]
    fn test_student_has_no_full_access() {
        assert!(!has_full_access(&student()));
    }

    #[test]
    fn test_admin_has_full_access() {
        let profile = UserProfile {
            role: UserRole::Admin,
            ..student()
        };
        assert!(has_full_access(&profile));
    }

    #[test]
    fn test_always_show_answers_grants_full_access() {
        let profile = UserProfile {
            always_show_answers: true,
            ..student()
        };
        assert!(has_full_access(&profile));
    }
}
