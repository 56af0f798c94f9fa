//! Query filters derived from a [`Scope`].
//!
//! Each filter has two renderings that must agree: `push_condition` appends a
//! boolean SQL expression (with bound parameters) to a `QueryBuilder`, and
//! `matches` evaluates the same rule against a loaded row.

use sqlx::{Postgres, QueryBuilder};
use uuid::Uuid;

use crate::{
    models::{Institute, Role, Scholarship, ScholarshipType, University, User},
    scope::{Actor, Scope, UniversityLookup},
};

// --- Scholarships ---

/// ScholarshipFilter
///
/// Which scholarships a caller may see (`visible_to`) or write (`manageable_by`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScholarshipFilter {
    All,
    Nothing,
    /// Disjunction of: public types, the university's own, the institute's own.
    Scoped {
        include_public: bool,
        university_id: Option<i64>,
        institute_id: Option<i64>,
    },
}

impl ScholarshipFilter {
    pub fn visible_to(scope: Scope) -> Self {
        match scope {
            Scope::Unrestricted => ScholarshipFilter::All,
            Scope::Unresolvable => ScholarshipFilter::Nothing,
            Scope::University(university_id) => ScholarshipFilter::Scoped {
                include_public: true,
                university_id: Some(university_id),
                institute_id: None,
            },
            Scope::Institute(institute_id) => ScholarshipFilter::Scoped {
                include_public: true,
                university_id: None,
                institute_id: Some(institute_id),
            },
            Scope::Unaffiliated => ScholarshipFilter::Scoped {
                include_public: true,
                university_id: None,
                institute_id: None,
            },
        }
    }

    /// The scholarships a caller may create, update or delete. Public
    /// scholarships are only writable by platform admins.
    pub fn manageable_by(role: Role, scope: Scope) -> Self {
        if !role.can_mutate() {
            return ScholarshipFilter::Nothing;
        }
        match scope {
            Scope::Unrestricted => ScholarshipFilter::All,
            Scope::University(university_id) => ScholarshipFilter::Scoped {
                include_public: false,
                university_id: Some(university_id),
                institute_id: None,
            },
            Scope::Institute(institute_id) => ScholarshipFilter::Scoped {
                include_public: false,
                university_id: None,
                institute_id: Some(institute_id),
            },
            Scope::Unaffiliated | Scope::Unresolvable => ScholarshipFilter::Nothing,
        }
    }

    pub fn matches_owner(
        &self,
        scholarship_type: ScholarshipType,
        owner_university: Option<i64>,
        owner_institute: Option<i64>,
    ) -> bool {
        match *self {
            ScholarshipFilter::All => true,
            ScholarshipFilter::Nothing => false,
            ScholarshipFilter::Scoped {
                include_public,
                university_id,
                institute_id,
            } => match scholarship_type {
                ScholarshipType::Government | ScholarshipType::Private => include_public,
                ScholarshipType::University => {
                    university_id.is_some() && university_id == owner_university
                }
                ScholarshipType::Institute => {
                    institute_id.is_some() && institute_id == owner_institute
                }
            },
        }
    }

    pub fn matches(&self, scholarship: &Scholarship) -> bool {
        self.matches_owner(
            scholarship.scholarship_type,
            scholarship.university_id,
            scholarship.institute_id,
        )
    }

    /// Appends the filter as a parenthesised condition on the table aliased `alias`.
    pub fn push_condition(&self, builder: &mut QueryBuilder<'_, Postgres>, alias: &str) {
        let ScholarshipFilter::Scoped {
            include_public,
            university_id,
            institute_id,
        } = *self
        else {
            builder.push(if *self == ScholarshipFilter::All { "TRUE" } else { "FALSE" });
            return;
        };

        let mut clauses = 0;
        builder.push("(");
        if include_public {
            builder.push(format!("{alias}.type IN ('government', 'private')"));
            clauses += 1;
        }
        if let Some(university_id) = university_id {
            if clauses > 0 {
                builder.push(" OR ");
            }
            builder.push(format!(
                "({alias}.type = 'university' AND {alias}.university_id = "
            ));
            builder.push_bind(university_id);
            builder.push(")");
            clauses += 1;
        }
        if let Some(institute_id) = institute_id {
            if clauses > 0 {
                builder.push(" OR ");
            }
            builder.push(format!(
                "({alias}.type = 'institute' AND {alias}.institute_id = "
            ));
            builder.push_bind(institute_id);
            builder.push(")");
            clauses += 1;
        }
        if clauses == 0 {
            builder.push("FALSE");
        }
        builder.push(")");
    }
}

// --- Organizations ---

/// InstituteFilter
///
/// Institutes a caller may list or pick from `/institutes/options`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstituteFilter {
    All,
    Nothing,
    OfUniversity(i64),
    Only(i64),
}

impl InstituteFilter {
    pub fn for_scope(scope: Scope) -> Self {
        match scope {
            Scope::Unrestricted => InstituteFilter::All,
            Scope::University(university_id) => InstituteFilter::OfUniversity(university_id),
            Scope::Institute(institute_id) => InstituteFilter::Only(institute_id),
            Scope::Unaffiliated | Scope::Unresolvable => InstituteFilter::Nothing,
        }
    }

    pub fn matches(&self, institute: &Institute) -> bool {
        match *self {
            InstituteFilter::All => true,
            InstituteFilter::Nothing => false,
            InstituteFilter::OfUniversity(university_id) => {
                institute.university_id == university_id
            }
            InstituteFilter::Only(institute_id) => institute.id == institute_id,
        }
    }

    pub fn push_condition(&self, builder: &mut QueryBuilder<'_, Postgres>, alias: &str) {
        match *self {
            InstituteFilter::All => {
                builder.push("TRUE");
            }
            InstituteFilter::Nothing => {
                builder.push("FALSE");
            }
            InstituteFilter::OfUniversity(university_id) => {
                builder.push(format!("{alias}.university_id = "));
                builder.push_bind(university_id);
            }
            InstituteFilter::Only(institute_id) => {
                builder.push(format!("{alias}.id = "));
                builder.push_bind(institute_id);
            }
        }
    }
}

/// UniversityFilter
///
/// Universities a caller may list or pick from `/universities/options`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UniversityFilter {
    All,
    Nothing,
    Only(i64),
}

impl UniversityFilter {
    /// An institute scope sees its parent university, which costs one lookup.
    pub async fn for_scope<L>(scope: Scope, lookup: &L) -> Self
    where
        L: UniversityLookup + ?Sized,
    {
        match scope {
            Scope::Unrestricted => UniversityFilter::All,
            Scope::University(university_id) => UniversityFilter::Only(university_id),
            Scope::Institute(institute_id) => lookup
                .university_for_institute(institute_id)
                .await
                .map_or(UniversityFilter::Nothing, UniversityFilter::Only),
            Scope::Unaffiliated | Scope::Unresolvable => UniversityFilter::Nothing,
        }
    }

    pub fn matches(&self, university: &University) -> bool {
        match *self {
            UniversityFilter::All => true,
            UniversityFilter::Nothing => false,
            UniversityFilter::Only(university_id) => university.id == university_id,
        }
    }

    pub fn push_condition(&self, builder: &mut QueryBuilder<'_, Postgres>, alias: &str) {
        match *self {
            UniversityFilter::All => {
                builder.push("TRUE");
            }
            UniversityFilter::Nothing => {
                builder.push("FALSE");
            }
            UniversityFilter::Only(university_id) => {
                builder.push(format!("{alias}.id = "));
                builder.push_bind(university_id);
            }
        }
    }
}

// --- Users ---

/// UserFilter
///
/// Accounts a caller may list. Students only ever see themselves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserFilter {
    All,
    Nothing,
    /// Users affiliated with the university directly or through one of its institutes.
    University(i64),
    Institute(i64),
    OnlySelf(Uuid),
}

impl UserFilter {
    pub fn for_actor(actor: &Actor, scope: Scope) -> Self {
        if actor.role == Role::Student {
            return UserFilter::OnlySelf(actor.id);
        }
        match scope {
            Scope::Unrestricted => UserFilter::All,
            Scope::University(university_id) => UserFilter::University(university_id),
            Scope::Institute(institute_id) => UserFilter::Institute(institute_id),
            Scope::Unaffiliated | Scope::Unresolvable => UserFilter::Nothing,
        }
    }

    /// `owner_of` maps an institute id to its university.
    pub fn matches<F>(&self, user: &User, owner_of: F) -> bool
    where
        F: Fn(i64) -> Option<i64>,
    {
        match *self {
            UserFilter::All => true,
            UserFilter::Nothing => false,
            UserFilter::University(university_id) => {
                user.university_id == Some(university_id)
                    || user.institute_id.and_then(owner_of) == Some(university_id)
            }
            UserFilter::Institute(institute_id) => user.institute_id == Some(institute_id),
            UserFilter::OnlySelf(id) => user.id == id,
        }
    }

    pub fn push_condition(&self, builder: &mut QueryBuilder<'_, Postgres>, alias: &str) {
        match *self {
            UserFilter::All => {
                builder.push("TRUE");
            }
            UserFilter::Nothing => {
                builder.push("FALSE");
            }
            UserFilter::University(university_id) => {
                builder.push(format!("({alias}.university_id = "));
                builder.push_bind(university_id);
                builder.push(format!(
                    " OR {alias}.institute_id IN (SELECT id FROM institutes WHERE university_id = "
                ));
                builder.push_bind(university_id);
                builder.push("))");
            }
            UserFilter::Institute(institute_id) => {
                builder.push(format!("{alias}.institute_id = "));
                builder.push_bind(institute_id);
            }
            UserFilter::OnlySelf(id) => {
                builder.push(format!("{alias}.id = "));
                builder.push_bind(id);
            }
        }
    }
}

// --- Applications ---

/// ApplicationFilter
///
/// Students see their own applications; admin roles see applications to the
/// scholarships they manage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplicationFilter {
    OwnedBy(Uuid),
    Managed(ScholarshipFilter),
}

impl ApplicationFilter {
    pub fn for_actor(actor: &Actor, scope: Scope) -> Self {
        match actor.role {
            Role::Student => ApplicationFilter::OwnedBy(actor.id),
            role => ApplicationFilter::Managed(ScholarshipFilter::manageable_by(role, scope)),
        }
    }

    pub fn matches(&self, student_id: Uuid, scholarship: &Scholarship) -> bool {
        match self {
            ApplicationFilter::OwnedBy(id) => student_id == *id,
            ApplicationFilter::Managed(filter) => filter.matches(scholarship),
        }
    }

    /// `application` and `scholarship` are the aliases of the joined tables.
    pub fn push_condition(
        &self,
        builder: &mut QueryBuilder<'_, Postgres>,
        application: &str,
        scholarship: &str,
    ) {
        match self {
            ApplicationFilter::OwnedBy(id) => {
                builder.push(format!("{application}.student_id = "));
                builder.push_bind(*id);
            }
            ApplicationFilter::Managed(filter) => filter.push_condition(builder, scholarship),
        }
    }
}
