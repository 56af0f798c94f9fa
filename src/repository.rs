use crate::{
    models::{
        Application, ApplicationStatus, AssignRoleRequest, CreateInstituteRequest,
        CreateUniversityRequest, DashboardStats, Institute, NewUser, OptionItem, Scholarship,
        ScholarshipDraft, ScholarshipQuery, University, UpdateInstituteRequest,
        UpdateUniversityRequest, User,
    },
    scope::UniversityLookup,
    visibility::{
        ApplicationFilter, InstituteFilter, ScholarshipFilter, UniversityFilter, UserFilter,
    },
};
use async_trait::async_trait;
use sqlx::{PgPool, Postgres, query_builder::QueryBuilder};
use std::sync::Arc;
use uuid::Uuid;

/// Repository Trait
///
/// Contract for all persistence operations. Every read that returns
/// organization-owned data takes the caller's filter, so the storage layer can
/// never be asked for an unscoped listing by accident.
///
/// The repository is also the `UniversityLookup` the scope resolver depends on.
#[async_trait]
pub trait Repository: UniversityLookup + Send + Sync {
    // --- Users ---
    async fn get_user(&self, id: Uuid) -> Result<Option<User>, sqlx::Error>;
    async fn create_user(&self, user: NewUser) -> Result<User, sqlx::Error>;
    async fn list_users(&self, filter: UserFilter) -> Result<Vec<User>, sqlx::Error>;
    async fn find_user(&self, id: Uuid, filter: UserFilter) -> Result<Option<User>, sqlx::Error>;
    async fn assign_role(
        &self,
        id: Uuid,
        req: &AssignRoleRequest,
    ) -> Result<Option<User>, sqlx::Error>;

    // --- Universities ---
    async fn list_universities(
        &self,
        filter: UniversityFilter,
    ) -> Result<Vec<University>, sqlx::Error>;
    async fn get_university(
        &self,
        id: i64,
        filter: UniversityFilter,
    ) -> Result<Option<University>, sqlx::Error>;
    async fn university_options(
        &self,
        filter: UniversityFilter,
    ) -> Result<Vec<OptionItem>, sqlx::Error>;
    async fn create_university(&self, req: CreateUniversityRequest)
    -> Result<University, sqlx::Error>;
    async fn update_university(
        &self,
        id: i64,
        req: UpdateUniversityRequest,
    ) -> Result<Option<University>, sqlx::Error>;
    async fn delete_university(&self, id: i64) -> Result<bool, sqlx::Error>;

    // --- Institutes ---
    async fn list_institutes(&self, filter: InstituteFilter)
    -> Result<Vec<Institute>, sqlx::Error>;
    async fn get_institute(
        &self,
        id: i64,
        filter: InstituteFilter,
    ) -> Result<Option<Institute>, sqlx::Error>;
    async fn institute_options(
        &self,
        filter: InstituteFilter,
    ) -> Result<Vec<OptionItem>, sqlx::Error>;
    async fn create_institute(&self, req: CreateInstituteRequest) -> Result<Institute, sqlx::Error>;
    async fn update_institute(
        &self,
        id: i64,
        req: UpdateInstituteRequest,
        filter: InstituteFilter,
    ) -> Result<Option<Institute>, sqlx::Error>;
    async fn delete_institute(&self, id: i64) -> Result<bool, sqlx::Error>;

    // --- Scholarships ---
    async fn list_scholarships(
        &self,
        filter: ScholarshipFilter,
        query: ScholarshipQuery,
    ) -> Result<Vec<Scholarship>, sqlx::Error>;
    async fn get_scholarship(
        &self,
        id: i64,
        filter: ScholarshipFilter,
    ) -> Result<Option<Scholarship>, sqlx::Error>;
    async fn create_scholarship(
        &self,
        draft: ScholarshipDraft,
        created_by: Uuid,
    ) -> Result<Scholarship, sqlx::Error>;
    // Writes only if the row still matches `filter` (the caller's manage filter).
    async fn update_scholarship(
        &self,
        id: i64,
        draft: ScholarshipDraft,
        filter: ScholarshipFilter,
    ) -> Result<Option<Scholarship>, sqlx::Error>;
    async fn delete_scholarship(
        &self,
        id: i64,
        filter: ScholarshipFilter,
    ) -> Result<bool, sqlx::Error>;

    // --- Applications ---
    // Returns None when the student already applied.
    async fn create_application(
        &self,
        scholarship_id: i64,
        student_id: Uuid,
        statement: String,
    ) -> Result<Option<Application>, sqlx::Error>;
    async fn list_applications(
        &self,
        filter: ApplicationFilter,
    ) -> Result<Vec<Application>, sqlx::Error>;
    async fn set_application_status(
        &self,
        id: i64,
        status: ApplicationStatus,
        filter: ApplicationFilter,
    ) -> Result<Option<Application>, sqlx::Error>;

    // --- Dashboard ---
    async fn get_stats(
        &self,
        scholarships: ScholarshipFilter,
        users: UserFilter,
        applications: ApplicationFilter,
    ) -> Result<DashboardStats, sqlx::Error>;
}

/// RepositoryState
///
/// The concrete type used to share the persistence layer across the application state.
pub type RepositoryState = Arc<dyn Repository>;

const USER_COLUMNS: &str =
    "u.id, u.email, u.full_name, u.role, u.institute_id, u.university_id, u.created_at";
const UNIVERSITY_COLUMNS: &str = "un.id, un.name, un.code, un.created_at, un.updated_at";
const INSTITUTE_COLUMNS: &str = "i.id, i.university_id, i.name, i.created_at, i.updated_at";
const SCHOLARSHIP_COLUMNS: &str = "s.id, s.title, s.description, s.type, s.university_id, \
     s.institute_id, s.amount, s.deadline, s.created_by, s.created_at, s.updated_at";
const APPLICATION_COLUMNS: &str = "a.id, a.scholarship_id, a.student_id, a.statement, a.status, \
     a.created_at, a.updated_at, s.title AS scholarship_title";

/// Escapes `ILIKE` wildcards so search text matches literally.
fn escape_like(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// PostgresRepository
///
/// `Repository` backed by PostgreSQL. Filters are rendered into the `WHERE`
/// clause with `QueryBuilder`, so every id reaches the database as a bound parameter.
pub struct PostgresRepository {
    pool: PgPool,
}

impl PostgresRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UniversityLookup for PostgresRepository {
    /// A failed lookup is logged and treated as "no owner", which resolves to
    /// the most restrictive scope.
    async fn university_for_institute(&self, institute_id: i64) -> Option<i64> {
        sqlx::query_scalar::<_, i64>("SELECT university_id FROM institutes WHERE id = $1")
            .bind(institute_id)
            .fetch_optional(&self.pool)
            .await
            .unwrap_or_else(|e| {
                tracing::error!("university_for_institute error: {:?}", e);
                None
            })
    }
}

#[async_trait]
impl Repository for PostgresRepository {
    // --- USERS ---

    async fn get_user(&self, id: Uuid) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users u WHERE u.id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
    }

    /// create_user
    ///
    /// Mirrors an account accepted by the auth provider into `users`.
    async fn create_user(&self, user: NewUser) -> Result<User, sqlx::Error> {
        sqlx::query_as::<_, User>(&format!(
            "INSERT INTO users AS u (id, email, full_name, role, institute_id) \
             VALUES ($1, $2, $3, $4, $5) RETURNING {USER_COLUMNS}"
        ))
        .bind(user.id)
        .bind(user.email)
        .bind(user.full_name)
        .bind(user.role.as_str())
        .bind(user.institute_id)
        .fetch_one(&self.pool)
        .await
    }

    async fn list_users(&self, filter: UserFilter) -> Result<Vec<User>, sqlx::Error> {
        let mut builder: QueryBuilder<Postgres> =
            QueryBuilder::new(format!("SELECT {USER_COLUMNS} FROM users u WHERE "));
        filter.push_condition(&mut builder, "u");
        builder.push(" ORDER BY u.email");
        builder.build_query_as::<User>().fetch_all(&self.pool).await
    }

    async fn find_user(&self, id: Uuid, filter: UserFilter) -> Result<Option<User>, sqlx::Error> {
        let mut builder: QueryBuilder<Postgres> =
            QueryBuilder::new(format!("SELECT {USER_COLUMNS} FROM users u WHERE u.id = "));
        builder.push_bind(id);
        builder.push(" AND ");
        filter.push_condition(&mut builder, "u");
        builder.build_query_as::<User>().fetch_optional(&self.pool).await
    }

    async fn assign_role(
        &self,
        id: Uuid,
        req: &AssignRoleRequest,
    ) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as::<_, User>(&format!(
            "UPDATE users AS u SET role = $2, institute_id = $3, university_id = $4 \
             WHERE u.id = $1 RETURNING {USER_COLUMNS}"
        ))
        .bind(id)
        .bind(req.role.as_str())
        .bind(req.institute_id)
        .bind(req.university_id)
        .fetch_optional(&self.pool)
        .await
    }

    // --- UNIVERSITIES ---

    async fn list_universities(
        &self,
        filter: UniversityFilter,
    ) -> Result<Vec<University>, sqlx::Error> {
        let mut builder: QueryBuilder<Postgres> =
            QueryBuilder::new(format!("SELECT {UNIVERSITY_COLUMNS} FROM universities un WHERE "));
        filter.push_condition(&mut builder, "un");
        builder.push(" ORDER BY un.name");
        builder.build_query_as::<University>().fetch_all(&self.pool).await
    }

    async fn get_university(
        &self,
        id: i64,
        filter: UniversityFilter,
    ) -> Result<Option<University>, sqlx::Error> {
        let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(format!(
            "SELECT {UNIVERSITY_COLUMNS} FROM universities un WHERE un.id = "
        ));
        builder.push_bind(id);
        builder.push(" AND ");
        filter.push_condition(&mut builder, "un");
        builder.build_query_as::<University>().fetch_optional(&self.pool).await
    }

    async fn university_options(
        &self,
        filter: UniversityFilter,
    ) -> Result<Vec<OptionItem>, sqlx::Error> {
        let mut builder: QueryBuilder<Postgres> =
            QueryBuilder::new("SELECT un.id, un.name FROM universities un WHERE ");
        filter.push_condition(&mut builder, "un");
        builder.push(" ORDER BY un.name");
        builder.build_query_as::<OptionItem>().fetch_all(&self.pool).await
    }

    async fn create_university(
        &self,
        req: CreateUniversityRequest,
    ) -> Result<University, sqlx::Error> {
        sqlx::query_as::<_, University>(&format!(
            "INSERT INTO universities AS un (name, code) VALUES ($1, $2) \
             RETURNING {UNIVERSITY_COLUMNS}"
        ))
        .bind(req.name)
        .bind(req.code)
        .fetch_one(&self.pool)
        .await
    }

    async fn update_university(
        &self,
        id: i64,
        req: UpdateUniversityRequest,
    ) -> Result<Option<University>, sqlx::Error> {
        sqlx::query_as::<_, University>(&format!(
            "UPDATE universities AS un \
             SET name = COALESCE($2, name), code = COALESCE($3, code), updated_at = NOW() \
             WHERE un.id = $1 RETURNING {UNIVERSITY_COLUMNS}"
        ))
        .bind(id)
        .bind(req.name)
        .bind(req.code)
        .fetch_optional(&self.pool)
        .await
    }

    async fn delete_university(&self, id: i64) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM universities WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    // --- INSTITUTES ---

    async fn list_institutes(
        &self,
        filter: InstituteFilter,
    ) -> Result<Vec<Institute>, sqlx::Error> {
        let mut builder: QueryBuilder<Postgres> =
            QueryBuilder::new(format!("SELECT {INSTITUTE_COLUMNS} FROM institutes i WHERE "));
        filter.push_condition(&mut builder, "i");
        builder.push(" ORDER BY i.name");
        builder.build_query_as::<Institute>().fetch_all(&self.pool).await
    }

    async fn get_institute(
        &self,
        id: i64,
        filter: InstituteFilter,
    ) -> Result<Option<Institute>, sqlx::Error> {
        let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(format!(
            "SELECT {INSTITUTE_COLUMNS} FROM institutes i WHERE i.id = "
        ));
        builder.push_bind(id);
        builder.push(" AND ");
        filter.push_condition(&mut builder, "i");
        builder.build_query_as::<Institute>().fetch_optional(&self.pool).await
    }

    async fn institute_options(
        &self,
        filter: InstituteFilter,
    ) -> Result<Vec<OptionItem>, sqlx::Error> {
        let mut builder: QueryBuilder<Postgres> =
            QueryBuilder::new("SELECT i.id, i.name FROM institutes i WHERE ");
        filter.push_condition(&mut builder, "i");
        builder.push(" ORDER BY i.name");
        builder.build_query_as::<OptionItem>().fetch_all(&self.pool).await
    }

    async fn create_institute(
        &self,
        req: CreateInstituteRequest,
    ) -> Result<Institute, sqlx::Error> {
        sqlx::query_as::<_, Institute>(&format!(
            "INSERT INTO institutes AS i (university_id, name) VALUES ($1, $2) \
             RETURNING {INSTITUTE_COLUMNS}"
        ))
        .bind(req.university_id)
        .bind(req.name)
        .fetch_one(&self.pool)
        .await
    }

    async fn update_institute(
        &self,
        id: i64,
        req: UpdateInstituteRequest,
        filter: InstituteFilter,
    ) -> Result<Option<Institute>, sqlx::Error> {
        let mut builder: QueryBuilder<Postgres> =
            QueryBuilder::new("UPDATE institutes AS i SET university_id = COALESCE(");
        builder.push_bind(req.university_id);
        builder.push(", university_id), name = COALESCE(");
        builder.push_bind(req.name);
        builder.push(", name), updated_at = NOW() WHERE i.id = ");
        builder.push_bind(id);
        builder.push(" AND ");
        filter.push_condition(&mut builder, "i");
        builder.push(format!(" RETURNING {INSTITUTE_COLUMNS}"));
        builder.build_query_as::<Institute>().fetch_optional(&self.pool).await
    }

    async fn delete_institute(&self, id: i64) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM institutes WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    // --- SCHOLARSHIPS ---

    /// list_scholarships
    ///
    /// The visibility filter is always the first condition; the optional type
    /// and search parameters can only narrow it further.
    async fn list_scholarships(
        &self,
        filter: ScholarshipFilter,
        query: ScholarshipQuery,
    ) -> Result<Vec<Scholarship>, sqlx::Error> {
        let mut builder: QueryBuilder<Postgres> =
            QueryBuilder::new(format!("SELECT {SCHOLARSHIP_COLUMNS} FROM scholarships s WHERE "));
        filter.push_condition(&mut builder, "s");

        if let Some(scholarship_type) = query.scholarship_type {
            builder.push(" AND s.type = ");
            builder.push_bind(scholarship_type);
        }

        if let Some(search) = query.search.filter(|s| !s.trim().is_empty()) {
            let pattern = format!("%{}%", escape_like(search.trim()));
            builder.push(" AND (s.title ILIKE ");
            builder.push_bind(pattern.clone());
            builder.push(" OR s.description ILIKE ");
            builder.push_bind(pattern);
            builder.push(")");
        }

        builder.push(" ORDER BY s.deadline ASC NULLS LAST, s.created_at DESC");
        builder.build_query_as::<Scholarship>().fetch_all(&self.pool).await
    }

    /// get_scholarship
    ///
    /// A row that exists but fails `filter` comes back as `None`, exactly like a missing row.
    async fn get_scholarship(
        &self,
        id: i64,
        filter: ScholarshipFilter,
    ) -> Result<Option<Scholarship>, sqlx::Error> {
        let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(format!(
            "SELECT {SCHOLARSHIP_COLUMNS} FROM scholarships s WHERE s.id = "
        ));
        builder.push_bind(id);
        builder.push(" AND ");
        filter.push_condition(&mut builder, "s");
        builder.build_query_as::<Scholarship>().fetch_optional(&self.pool).await
    }

    async fn create_scholarship(
        &self,
        draft: ScholarshipDraft,
        created_by: Uuid,
    ) -> Result<Scholarship, sqlx::Error> {
        sqlx::query_as::<_, Scholarship>(&format!(
            "INSERT INTO scholarships AS s \
             (title, description, type, university_id, institute_id, amount, deadline, created_by) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8) RETURNING {SCHOLARSHIP_COLUMNS}"
        ))
        .bind(draft.title)
        .bind(draft.description)
        .bind(draft.scholarship_type)
        .bind(draft.university_id)
        .bind(draft.institute_id)
        .bind(draft.amount)
        .bind(draft.deadline)
        .bind(created_by)
        .fetch_one(&self.pool)
        .await
    }

    async fn update_scholarship(
        &self,
        id: i64,
        draft: ScholarshipDraft,
        filter: ScholarshipFilter,
    ) -> Result<Option<Scholarship>, sqlx::Error> {
        let mut builder: QueryBuilder<Postgres> =
            QueryBuilder::new("UPDATE scholarships AS s SET title = ");
        builder.push_bind(draft.title);
        builder.push(", description = ");
        builder.push_bind(draft.description);
        builder.push(", type = ");
        builder.push_bind(draft.scholarship_type);
        builder.push(", university_id = ");
        builder.push_bind(draft.university_id);
        builder.push(", institute_id = ");
        builder.push_bind(draft.institute_id);
        builder.push(", amount = ");
        builder.push_bind(draft.amount);
        builder.push(", deadline = ");
        builder.push_bind(draft.deadline);
        builder.push(", updated_at = NOW() WHERE s.id = ");
        builder.push_bind(id);
        builder.push(" AND ");
        filter.push_condition(&mut builder, "s");
        builder.push(format!(" RETURNING {SCHOLARSHIP_COLUMNS}"));
        builder.build_query_as::<Scholarship>().fetch_optional(&self.pool).await
    }

    async fn delete_scholarship(
        &self,
        id: i64,
        filter: ScholarshipFilter,
    ) -> Result<bool, sqlx::Error> {
        let mut builder: QueryBuilder<Postgres> =
            QueryBuilder::new("DELETE FROM scholarships AS s WHERE s.id = ");
        builder.push_bind(id);
        builder.push(" AND ");
        filter.push_condition(&mut builder, "s");
        let result = builder.build().execute(&self.pool).await?;
        Ok(result.rows_affected() > 0)
    }

    // --- APPLICATIONS ---

    /// create_application
    ///
    /// `ON CONFLICT DO NOTHING` on (scholarship_id, student_id) keeps one
    /// application per student; a duplicate yields `None`.
    async fn create_application(
        &self,
        scholarship_id: i64,
        student_id: Uuid,
        statement: String,
    ) -> Result<Option<Application>, sqlx::Error> {
        sqlx::query_as::<_, Application>(&format!(
            r#"
            WITH a AS (
                INSERT INTO applications (scholarship_id, student_id, statement)
                VALUES ($1, $2, $3)
                ON CONFLICT (scholarship_id, student_id) DO NOTHING
                RETURNING id, scholarship_id, student_id, statement, status, created_at, updated_at
            )
            SELECT {APPLICATION_COLUMNS} FROM a JOIN scholarships s ON s.id = a.scholarship_id
            "#
        ))
        .bind(scholarship_id)
        .bind(student_id)
        .bind(statement)
        .fetch_optional(&self.pool)
        .await
    }

    async fn list_applications(
        &self,
        filter: ApplicationFilter,
    ) -> Result<Vec<Application>, sqlx::Error> {
        let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(format!(
            "SELECT {APPLICATION_COLUMNS} FROM applications a \
             JOIN scholarships s ON s.id = a.scholarship_id WHERE "
        ));
        filter.push_condition(&mut builder, "a", "s");
        builder.push(" ORDER BY a.created_at DESC");
        builder.build_query_as::<Application>().fetch_all(&self.pool).await
    }

    async fn set_application_status(
        &self,
        id: i64,
        status: ApplicationStatus,
        filter: ApplicationFilter,
    ) -> Result<Option<Application>, sqlx::Error> {
        let mut builder: QueryBuilder<Postgres> =
            QueryBuilder::new("UPDATE applications AS a SET status = ");
        builder.push_bind(status);
        builder.push(
            ", updated_at = NOW() FROM scholarships s \
             WHERE s.id = a.scholarship_id AND a.id = ",
        );
        builder.push_bind(id);
        builder.push(" AND ");
        filter.push_condition(&mut builder, "a", "s");
        builder.push(format!(" RETURNING {APPLICATION_COLUMNS}"));
        builder.build_query_as::<Application>().fetch_optional(&self.pool).await
    }

    // --- DASHBOARD ---

    /// get_stats
    ///
    /// Each counter runs under the caller's own filter.
    async fn get_stats(
        &self,
        scholarships: ScholarshipFilter,
        users: UserFilter,
        applications: ApplicationFilter,
    ) -> Result<DashboardStats, sqlx::Error> {
        let mut builder: QueryBuilder<Postgres> =
            QueryBuilder::new("SELECT COUNT(*) FROM scholarships s WHERE ");
        scholarships.push_condition(&mut builder, "s");
        let total_scholarships = builder.build_query_scalar::<i64>().fetch_one(&self.pool).await?;

        let mut builder: QueryBuilder<Postgres> =
            QueryBuilder::new("SELECT COUNT(*) FROM users u WHERE ");
        users.push_condition(&mut builder, "u");
        let total_users = builder.build_query_scalar::<i64>().fetch_one(&self.pool).await?;

        let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(
            "SELECT COUNT(*), COUNT(*) FILTER (WHERE a.status = 'pending') \
             FROM applications a JOIN scholarships s ON s.id = a.scholarship_id WHERE ",
        );
        applications.push_condition(&mut builder, "a", "s");
        let (total_applications, pending_applications) = builder
            .build_query_as::<(i64, i64)>()
            .fetch_one(&self.pool)
            .await?;

        Ok(DashboardStats {
            total_scholarships,
            total_users,
            total_applications,
            pending_applications,
        })
    }
}
