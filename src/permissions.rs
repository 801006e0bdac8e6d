//! Authorization policy, kept as pure functions over the caller's account
//! so every rule is unit-testable without HTTP plumbing.

use crate::error::ApiError;
use crate::models::users;

/// User administration (list/create/modify/delete accounts) is admin-only.
pub fn can_manage_users(user: &users::Model) -> bool {
    user.role.is_admin()
}

/// Catalog writes (categories, genres, titles) are admin-only.
pub fn can_manage_catalog(user: &users::Model) -> bool {
    user.role.is_admin()
}

/// Reviews and comments may be edited or deleted by their author, a
/// moderator, or an admin.
pub fn can_edit_content(user: &users::Model, author_id: i32) -> bool {
    user.id == author_id || user.role.is_moderator() || user.role.is_admin()
}

pub fn require_user_admin(user: &users::Model) -> Result<(), ApiError> {
    if can_manage_users(user) {
        Ok(())
    } else {
        Err(ApiError::Forbidden)
    }
}

pub fn require_catalog_admin(user: &users::Model) -> Result<(), ApiError> {
    if can_manage_catalog(user) {
        Ok(())
    } else {
        Err(ApiError::Forbidden)
    }
}

pub fn require_content_editor(user: &users::Model, author_id: i32) -> Result<(), ApiError> {
    if can_edit_content(user, author_id) {
        Ok(())
    } else {
        Err(ApiError::Forbidden)
    }
}
