/// Router Module Index
///
/// Splits the routing table by access level. Authentication is applied per
/// module (via Axum layers) in `create_router`; organizational scope is
/// enforced inside the handlers.

/// Routes reachable without credentials. Scholarship reads take optional
/// authentication and narrow to public types for anonymous callers.
pub mod public;

/// Routes protected by the `AuthUser` extractor middleware.
pub mod authenticated;

/// Platform administration, nested under `/admin`.
pub mod admin;
