//! HTTP handlers, grouped by resource.
//!
//! Each handler follows the same order: resolve the caller's scope, derive the
//! filter or run the guard, and only then touch the repository.

use crate::{
    AppState,
    scope::{Actor, Scope, resolve_scope},
};

pub mod applications;
pub mod organizations;
pub mod scholarships;
pub mod users;

/// Scope of an authenticated caller, recomputed for this request.
pub(crate) async fn scope_of(state: &AppState, actor: &Actor) -> Scope {
    resolve_scope(actor, &*state.repo).await
}
