//! Role lookups shared by the project and document checks.

use uuid::Uuid;

use crate::storage::models::{Participant, Role};

/// The role `user_id` holds among `participants`, if any.
pub fn role_of(user_id: Uuid, participants: &[Participant]) -> Option<Role> {
    participants
        .iter()
        .find(|p| p.user_id == user_id)
        .map(|p| p.role)
}

/// Any role grants read access.
pub fn can_read(role: Option<Role>) -> bool {
    role.is_some()
}

/// Only owners may modify or delete.
pub fn can_write(role: Option<Role>) -> bool {
    role == Some(Role::Owner)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn participant(user_id: Uuid, role: Role) -> Participant {
        Participant {
            user_id,
            role,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_role_of_finds_each_participant() {
        let owner = Uuid::new_v4();
        let guest = Uuid::new_v4();
        let participants = vec![
            participant(owner, Role::Owner),
            participant(guest, Role::Participant),
        ];

        assert_eq!(role_of(owner, &participants), Some(Role::Owner));
        assert_eq!(role_of(guest, &participants), Some(Role::Participant));
        assert_eq!(role_of(Uuid::new_v4(), &participants), None);
    }

    #[test]
    fn test_role_of_empty_list() {
        assert_eq!(role_of(Uuid::new_v4(), &[]), None);
    }

    #[test]
    fn test_read_and_write_rights() {
        assert!(can_read(Some(Role::Owner)));
        assert!(can_read(Some(Role::Participant)));
        assert!(!can_read(None));

        assert!(can_write(Some(Role::Owner)));
        assert!(!can_write(Some(Role::Participant)));
        assert!(!can_write(None));
    }
}
