//! Mutation authorization.
//!
//! Every check here runs before the corresponding write. A denial never
//! leaves a partial write behind.

use crate::{
    error::AppError,
    models::{Institute, Role, Scholarship, ScholarshipDraft},
    scope::Scope,
    visibility::ScholarshipFilter,
};

fn allow_if(allowed: bool) -> Result<(), AppError> {
    if allowed { Ok(()) } else { Err(AppError::Forbidden) }
}

fn may_write(role: Role, scope: Scope, draft: &ScholarshipDraft) -> bool {
    ScholarshipFilter::manageable_by(role, scope).matches_owner(
        draft.scholarship_type,
        draft.university_id,
        draft.institute_id,
    )
}

/// Students are rejected before any record is looked at.
pub fn require_mutating_role(role: Role) -> Result<(), AppError> {
    allow_if(role.can_mutate())
}

/// Only `super_admin` and `admin`.
pub fn require_platform_admin(role: Role) -> Result<(), AppError> {
    allow_if(role.is_platform_admin())
}

/// authorize_scholarship_create
///
/// Checked against the payload before the insert.
pub fn authorize_scholarship_create(
    role: Role,
    scope: Scope,
    draft: &ScholarshipDraft,
) -> Result<(), AppError> {
    require_mutating_role(role)?;
    allow_if(may_write(role, scope, draft))
}

/// authorize_scholarship_update
///
/// The stored record decides first; the merged result must stay in scope too,
/// so an update cannot move a record out of the caller's authority.
pub fn authorize_scholarship_update(
    role: Role,
    scope: Scope,
    stored: &Scholarship,
    proposed: &ScholarshipDraft,
) -> Result<(), AppError> {
    require_mutating_role(role)?;
    allow_if(may_write(role, scope, &stored.draft()))?;
    allow_if(may_write(role, scope, proposed))
}

/// authorize_scholarship_delete
///
/// Checked against the stored record only.
pub fn authorize_scholarship_delete(
    role: Role,
    scope: Scope,
    stored: &Scholarship,
) -> Result<(), AppError> {
    require_mutating_role(role)?;
    allow_if(may_write(role, scope, &stored.draft()))
}

/// authorize_institute_write
///
/// Platform admins manage any institute; a university admin only manages
/// institutes of its own university, before and after the change.
pub fn authorize_institute_write(
    role: Role,
    scope: Scope,
    stored: Option<&Institute>,
    proposed_university: i64,
) -> Result<(), AppError> {
    match (role, scope) {
        (Role::SuperAdmin | Role::Admin, Scope::Unrestricted) => Ok(()),
        (Role::UniversityAdmin, Scope::University(university_id)) => {
            let stored_ok = stored.is_none_or(|i| i.university_id == university_id);
            allow_if(stored_ok && proposed_university == university_id)
        }
        _ => Err(AppError::Forbidden),
    }
}

/// authorize_role_assignment
///
/// Platform admins assign roles; only a `super_admin` may grant, or touch an
/// account holding, `super_admin` or `admin`.
pub fn authorize_role_assignment(
    caller: Role,
    target_current: Role,
    requested: Role,
) -> Result<(), AppError> {
    require_platform_admin(caller)?;
    let privileged = target_current.is_platform_admin() || requested.is_platform_admin();
    allow_if(!privileged || caller == Role::SuperAdmin)
}
