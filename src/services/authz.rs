// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Authorization guard: callers may only act as themselves.

use crate::error::{AppError, Result};

/// Verify that the authenticated caller is accessing their own resources.
///
/// Must run before any read, write, or delete that names a target user id
/// distinct from the session identity.
pub fn authorize(authenticated_user_id: &str, target_user_id: &str) -> Result<()> {
    if authenticated_user_id.is_empty() || target_user_id.is_empty() {
        return Err(AppError::InvalidInput("user_id cannot be empty".to_string()));
    }
    if authenticated_user_id != target_user_id {
        return Err(AppError::Forbidden);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_user_allowed() {
        authorize("alice", "alice").unwrap();
        authorize("b", "b").unwrap();
    }

    #[test]
    fn test_different_user_rejected() {
        assert!(matches!(
            authorize("alice", "bob"),
            Err(AppError::Forbidden)
        ));
        assert!(matches!(
            authorize("bob", "alice"),
            Err(AppError::Forbidden)
        ));
    }

    #[test]
    fn test_empty_ids_rejected() {
        assert!(matches!(authorize("", "alice"), Err(AppError::InvalidInput(_))));
        assert!(matches!(authorize("alice", ""), Err(AppError::InvalidInput(_))));
        assert!(matches!(authorize("", ""), Err(AppError::InvalidInput(_))));
    }
}
