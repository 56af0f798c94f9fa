//! Resolution of a caller's organizational scope.
//!
//! Every read and write in the portal is narrowed by the [`Scope`] computed
//! here. Resolution runs fresh for every request from the caller's stored
//! affiliation, so a role or affiliation change applies on the next request.

use async_trait::async_trait;
use uuid::Uuid;

use crate::models::Role;

/// Actor
///
/// The authenticated caller, as loaded from `users` for this request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actor {
    pub id: Uuid,
    pub role: Role,
    pub institute_id: Option<i64>,
    pub university_id: Option<i64>,
}

/// Scope
///
/// The organizational boundary an actor reads and writes within.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    /// `super_admin` and `admin`: no restriction.
    Unrestricted,
    /// A university admin's resolved university.
    University(i64),
    /// An institute admin's institute, or a student's.
    Institute(i64),
    /// A student without an institute, or an anonymous caller. Public data only.
    Unaffiliated,
    /// An admin account missing the affiliation its role needs. Sees nothing.
    Unresolvable,
}

/// UniversityLookup
///
/// Resolves the university that owns an institute. Implemented by the
/// repository; returns `None` when the institute is unknown or the lookup fails.
#[async_trait]
pub trait UniversityLookup: Send + Sync {
    async fn university_for_institute(&self, institute_id: i64) -> Option<i64>;
}

/// resolve_scope
///
/// Maps an actor onto its effective scope. Performs at most one lookup, and
/// only for a `university_admin` whose university is not stored directly.
pub async fn resolve_scope<L>(actor: &Actor, lookup: &L) -> Scope
where
    L: UniversityLookup + ?Sized,
{
    match actor.role {
        Role::SuperAdmin | Role::Admin => Scope::Unrestricted,
        Role::UniversityAdmin => match (actor.university_id, actor.institute_id) {
            (Some(university_id), _) => Scope::University(university_id),
            (None, Some(institute_id)) => match lookup.university_for_institute(institute_id).await
            {
                Some(university_id) => Scope::University(university_id),
                None => {
                    tracing::warn!(
                        user_id = %actor.id,
                        institute_id,
                        "university admin's institute has no owning university"
                    );
                    Scope::Unresolvable
                }
            },
            (None, None) => {
                tracing::warn!(user_id = %actor.id, "university admin has no affiliation");
                Scope::Unresolvable
            }
        },
        Role::InstituteAdmin => match actor.institute_id {
            Some(institute_id) => Scope::Institute(institute_id),
            None => {
                tracing::warn!(user_id = %actor.id, "institute admin has no institute");
                Scope::Unresolvable
            }
        },
        Role::Student => actor
            .institute_id
            .map_or(Scope::Unaffiliated, Scope::Institute),
    }
}

/// Scope for endpoints that also serve anonymous callers.
pub async fn resolve_optional_scope<L>(actor: Option<&Actor>, lookup: &L) -> Scope
where
    L: UniversityLookup + ?Sized,
{
    match actor {
        Some(actor) => resolve_scope(actor, lookup).await,
        None => Scope::Unaffiliated,
    }
}
