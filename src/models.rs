use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use ts_rs::TS;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{error::AppError, scope::Actor};

// --- Roles ---

/// Role
///
/// The five roles the portal knows. Stored as text in `users.role`; any value
/// the portal does not recognise is read back as `Student`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum Role {
    SuperAdmin,
    Admin,
    UniversityAdmin,
    InstituteAdmin,
    #[default]
    Student,
}

impl Role {
    pub fn parse(value: &str) -> Self {
        match value {
            "super_admin" => Role::SuperAdmin,
            "admin" => Role::Admin,
            "university_admin" => Role::UniversityAdmin,
            "institute_admin" => Role::InstituteAdmin,
            _ => Role::Student,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::SuperAdmin => "super_admin",
            Role::Admin => "admin",
            Role::UniversityAdmin => "university_admin",
            Role::InstituteAdmin => "institute_admin",
            Role::Student => "student",
        }
    }

    /// `super_admin` and `admin`: no organizational restriction.
    pub fn is_platform_admin(&self) -> bool {
        matches!(self, Role::SuperAdmin | Role::Admin)
    }

    /// Every role except `student` may write scholarships (within scope).
    pub fn can_mutate(&self) -> bool {
        !matches!(self, Role::Student)
    }
}

// --- Accounts ---

/// User
///
/// Row of the `users` table. The id is shared with the external auth provider.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub full_name: String,
    // Raw role text; interpret through `Role::parse`.
    pub role: String,
    pub institute_id: Option<i64>,
    pub university_id: Option<i64>,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
}

impl User {
    /// Builds the per-request caller identity from the stored row.
    pub fn actor(&self) -> Actor {
        Actor {
            id: self.id,
            role: Role::parse(&self.role),
            institute_id: self.institute_id,
            university_id: self.university_id,
        }
    }
}

/// NewUser
///
/// Profile row inserted after the auth provider accepted a signup.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub id: Uuid,
    pub email: String,
    pub full_name: String,
    pub role: Role,
    pub institute_id: Option<i64>,
}

/// RegisterUserRequest
///
/// Input payload for `POST /register`. The password is forwarded to the auth
/// provider and never stored or logged here. There is no role field: every
/// self-registered account is a student.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct RegisterUserRequest {
    pub email: String,
    pub password: String,
    pub full_name: String,
    pub institute_id: Option<i64>,
}

/// AssignRoleRequest
///
/// Input payload for `PUT /admin/users/{id}/role`.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct AssignRoleRequest {
    pub role: Role,
    pub institute_id: Option<i64>,
    pub university_id: Option<i64>,
}

/// UserProfile
///
/// Output of `GET /me`.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct UserProfile {
    pub id: Uuid,
    pub email: String,
    pub full_name: String,
    pub role: Role,
    pub institute_id: Option<i64>,
    pub university_id: Option<i64>,
}

impl From<User> for UserProfile {
    fn from(user: User) -> Self {
        Self {
            role: Role::parse(&user.role),
            id: user.id,
            email: user.email,
            full_name: user.full_name,
            institute_id: user.institute_id,
            university_id: user.university_id,
        }
    }
}

// --- Organizations ---

/// University
///
/// Top-level organizational unit.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct University {
    pub id: i64,
    pub name: String,
    pub code: Option<String>,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "string")]
    pub updated_at: DateTime<Utc>,
}

/// Institute
///
/// Belongs to exactly one university.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct Institute {
    pub id: i64,
    pub university_id: i64,
    pub name: String,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "string")]
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct CreateUniversityRequest {
    pub name: String,
    pub code: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct UpdateUniversityRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct CreateInstituteRequest {
    pub university_id: i64,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct UpdateInstituteRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub university_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// OptionItem
///
/// Id/label pair for dashboard dropdowns (`/institutes/options`, `/universities/options`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct OptionItem {
    pub id: i64,
    pub name: String,
}

// --- Scholarships ---

/// ScholarshipType
///
/// Decides who can see a scholarship: `Government` and `Private` are public,
/// `University` and `Institute` are limited to the owning organization.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    TS,
    ToSchema,
    sqlx::Type,
    Default,
)]
#[sqlx(type_name = "scholarship_type", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum ScholarshipType {
    #[default]
    Government,
    Private,
    University,
    Institute,
}

/// Scholarship
///
/// Row of the `scholarships` table.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct Scholarship {
    pub id: i64,
    pub title: String,
    pub description: String,

    // `type` is a Rust keyword; keep the wire and column name as "type".
    #[serde(rename = "type")]
    #[sqlx(rename = "type")]
    pub scholarship_type: ScholarshipType,

    pub university_id: Option<i64>,
    pub institute_id: Option<i64>,
    pub amount: Option<i64>,
    #[ts(type = "string | null")]
    pub deadline: Option<NaiveDate>,
    pub created_by: Option<Uuid>,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "string")]
    pub updated_at: DateTime<Utc>,
}

impl Scholarship {
    /// The stored values as a draft, before any payload is applied.
    pub fn draft(&self) -> ScholarshipDraft {
        ScholarshipDraft {
            title: self.title.clone(),
            description: self.description.clone(),
            scholarship_type: self.scholarship_type,
            university_id: self.university_id,
            institute_id: self.institute_id,
            amount: self.amount,
            deadline: self.deadline,
        }
    }

    /// The record as it would look after `changes` were written.
    pub fn merged(&self, changes: UpdateScholarshipRequest) -> ScholarshipDraft {
        let stored = self.draft();
        let scholarship_type = changes.scholarship_type.unwrap_or(stored.scholarship_type);
        // Stored owner ids only carry over while the type stays the same.
        let retyped = scholarship_type != stored.scholarship_type;
        ScholarshipDraft {
            title: changes.title.unwrap_or(stored.title),
            description: changes.description.unwrap_or(stored.description),
            scholarship_type,
            university_id: changes
                .university_id
                .or(stored.university_id.filter(|_| !retyped)),
            institute_id: changes
                .institute_id
                .or(stored.institute_id.filter(|_| !retyped)),
            amount: changes.amount.or(stored.amount),
            deadline: changes.deadline.or(stored.deadline),
        }
        .with_owner_for_type()
    }
}

/// ScholarshipDraft
///
/// Full set of writable scholarship fields, used for inserts and for the
/// merged result of an update.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ScholarshipDraft {
    pub title: String,
    pub description: String,
    pub scholarship_type: ScholarshipType,
    pub university_id: Option<i64>,
    pub institute_id: Option<i64>,
    pub amount: Option<i64>,
    pub deadline: Option<NaiveDate>,
}

impl ScholarshipDraft {
    /// Keeps only the owner id that applies to the type.
    pub fn with_owner_for_type(mut self) -> Self {
        match self.scholarship_type {
            ScholarshipType::Government | ScholarshipType::Private => {
                self.university_id = None;
                self.institute_id = None;
            }
            ScholarshipType::University => self.institute_id = None,
            ScholarshipType::Institute => self.university_id = None,
        }
        self
    }

    /// Owner consistency: organization-typed scholarships must name their owner.
    pub fn validate_owner(&self) -> Result<(), AppError> {
        match self.scholarship_type {
            ScholarshipType::University if self.university_id.is_none() => Err(
                AppError::BadRequest("university scholarships require university_id".to_string()),
            ),
            ScholarshipType::Institute if self.institute_id.is_none() => Err(
                AppError::BadRequest("institute scholarships require institute_id".to_string()),
            ),
            _ => Ok(()),
        }
    }
}

/// CreateScholarshipRequest
///
/// Input payload for `POST /scholarships`.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct CreateScholarshipRequest {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(rename = "type")]
    pub scholarship_type: ScholarshipType,
    pub university_id: Option<i64>,
    pub institute_id: Option<i64>,
    pub amount: Option<i64>,
    #[ts(type = "string | null")]
    pub deadline: Option<NaiveDate>,
}

impl From<CreateScholarshipRequest> for ScholarshipDraft {
    fn from(req: CreateScholarshipRequest) -> Self {
        Self {
            title: req.title,
            description: req.description,
            scholarship_type: req.scholarship_type,
            university_id: req.university_id,
            institute_id: req.institute_id,
            amount: req.amount,
            deadline: req.deadline,
        }
        .with_owner_for_type()
    }
}

/// UpdateScholarshipRequest
///
/// Partial update payload for `PUT /scholarships/{id}`. Absent fields keep
/// their stored value.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct UpdateScholarshipRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub scholarship_type: Option<ScholarshipType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub university_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub institute_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[ts(type = "string | null")]
    pub deadline: Option<NaiveDate>,
}

/// ScholarshipQuery
///
/// Query parameters for `GET /scholarships`. Both only narrow the caller's
/// visibility filter, never widen it.
#[derive(Debug, Clone, Deserialize, Default, utoipa::IntoParams)]
pub struct ScholarshipQuery {
    /// Restrict to one scholarship type.
    #[serde(rename = "type")]
    pub scholarship_type: Option<ScholarshipType>,
    /// Case-insensitive match on title or description.
    pub search: Option<String>,
}

// --- Applications ---

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    TS,
    ToSchema,
    sqlx::Type,
    Default,
)]
#[sqlx(type_name = "application_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum ApplicationStatus {
    #[default]
    Pending,
    Approved,
    Rejected,
}

/// Application
///
/// A student's application to a scholarship. The scholarship's owner fields
/// are joined in so listings can be scoped without a second query.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct Application {
    pub id: i64,
    pub scholarship_id: i64,
    pub student_id: Uuid,
    pub statement: String,
    pub status: ApplicationStatus,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "string")]
    pub updated_at: DateTime<Utc>,
    // Loaded via JOIN on scholarships.
    pub scholarship_title: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct CreateApplicationRequest {
    #[serde(default)]
    pub statement: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct UpdateApplicationStatusRequest {
    pub status: ApplicationStatus,
}

// --- Dashboard ---

/// DashboardStats
///
/// Output of `GET /admin/stats`. Every counter is computed under the caller's filters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct DashboardStats {
    pub total_scholarships: i64,
    pub total_users: i64,
    pub total_applications: i64,
    pub pending_applications: i64,
}
