#![allow(dead_code)]

use async_trait::async_trait;
use chrono::Utc;
use scholarship_portal::{
    AppConfig, AppState, RepositoryState,
    auth::AuthUser,
    models::{
        Application, ApplicationStatus, AssignRoleRequest, CreateInstituteRequest,
        CreateUniversityRequest, DashboardStats, Institute, NewUser, OptionItem, Scholarship,
        ScholarshipDraft, ScholarshipQuery, ScholarshipType, University, UpdateInstituteRequest,
        UpdateUniversityRequest, User,
    },
    repository::Repository,
    scope::UniversityLookup,
    visibility::{
        ApplicationFilter, InstituteFilter, ScholarshipFilter, UniversityFilter, UserFilter,
    },
};
use std::sync::{
    Arc, Mutex,
    atomic::{AtomicUsize, Ordering},
};
use uuid::Uuid;

// --- Fixture ids ---

pub const NORTHFIELD: i64 = 1;
pub const SOUTHGATE: i64 = 2;
pub const NORTHFIELD_ENGINEERING: i64 = 10;
pub const NORTHFIELD_BUSINESS: i64 = 11;
pub const SOUTHGATE_MEDICINE: i64 = 20;

pub const NATIONAL_MERIT: i64 = 1;
pub const ACME_FOUNDATION: i64 = 2;
pub const NORTHFIELD_EXCELLENCE: i64 = 3;
pub const SOUTHGATE_EXCELLENCE: i64 = 4;
pub const ENGINEERING_BURSARY: i64 = 5;
pub const MEDICINE_BURSARY: i64 = 6;

pub const SUPER_ADMIN: Uuid = Uuid::from_u128(1);
pub const PLATFORM_ADMIN: Uuid = Uuid::from_u128(2);
/// university_admin with `university_id` stored directly.
pub const NORTHFIELD_ADMIN: Uuid = Uuid::from_u128(3);
/// university_admin known only through an institute of Northfield.
pub const NORTHFIELD_ADMIN_VIA_INSTITUTE: Uuid = Uuid::from_u128(4);
pub const ENGINEERING_ADMIN: Uuid = Uuid::from_u128(5);
pub const ENGINEERING_STUDENT: Uuid = Uuid::from_u128(6);
pub const MEDICINE_STUDENT: Uuid = Uuid::from_u128(7);
/// university_admin with no affiliation at all.
pub const ORPHAN_ADMIN: Uuid = Uuid::from_u128(8);
pub const UNAFFILIATED_STUDENT: Uuid = Uuid::from_u128(9);

// --- In-memory repository ---

#[derive(Default)]
struct Store {
    users: Vec<User>,
    universities: Vec<University>,
    institutes: Vec<Institute>,
    scholarships: Vec<Scholarship>,
    applications: Vec<Application>,
    next_id: i64,
}

impl Store {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn owner_of(&self, institute_id: i64) -> Option<i64> {
        self.institutes
            .iter()
            .find(|i| i.id == institute_id)
            .map(|i| i.university_id)
    }
}

/// InMemoryRepository
///
/// `Repository` over plain vectors. Every scoped method evaluates the filter
/// through its `matches` rendering, so handler tests exercise the same rules
/// the SQL rendering encodes.
#[derive(Default)]
pub struct InMemoryRepository {
    store: Mutex<Store>,
    lookups: AtomicUsize,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self {
            store: Mutex::new(Store {
                next_id: 100,
                ..Store::default()
            }),
            lookups: AtomicUsize::new(0),
        }
    }

    /// Two universities, three institutes, one scholarship of every kind, and
    /// one user per role and affiliation shape.
    pub fn seeded() -> Self {
        let repo = Self::new();
        repo.add_university(NORTHFIELD, "Northfield University");
        repo.add_university(SOUTHGATE, "Southgate University");
        repo.add_institute(NORTHFIELD_ENGINEERING, NORTHFIELD, "Northfield Engineering");
        repo.add_institute(NORTHFIELD_BUSINESS, NORTHFIELD, "Northfield Business School");
        repo.add_institute(SOUTHGATE_MEDICINE, SOUTHGATE, "Southgate Medicine");

        repo.add_scholarship(
            NATIONAL_MERIT,
            "National Merit",
            ScholarshipType::Government,
            None,
            None,
        );
        repo.add_scholarship(
            ACME_FOUNDATION,
            "Acme Foundation Grant",
            ScholarshipType::Private,
            None,
            None,
        );
        repo.add_scholarship(
            NORTHFIELD_EXCELLENCE,
            "Northfield Excellence",
            ScholarshipType::University,
            Some(NORTHFIELD),
            None,
        );
        repo.add_scholarship(
            SOUTHGATE_EXCELLENCE,
            "Southgate Excellence",
            ScholarshipType::University,
            Some(SOUTHGATE),
            None,
        );
        repo.add_scholarship(
            ENGINEERING_BURSARY,
            "Engineering Bursary",
            ScholarshipType::Institute,
            None,
            Some(NORTHFIELD_ENGINEERING),
        );
        repo.add_scholarship(
            MEDICINE_BURSARY,
            "Medicine Bursary",
            ScholarshipType::Institute,
            None,
            Some(SOUTHGATE_MEDICINE),
        );

        repo.add_user(SUPER_ADMIN, "super_admin", None, None);
        repo.add_user(PLATFORM_ADMIN, "admin", None, None);
        repo.add_user(NORTHFIELD_ADMIN, "university_admin", None, Some(NORTHFIELD));
        repo.add_user(
            NORTHFIELD_ADMIN_VIA_INSTITUTE,
            "university_admin",
            Some(NORTHFIELD_ENGINEERING),
            None,
        );
        repo.add_user(ENGINEERING_ADMIN, "institute_admin", Some(NORTHFIELD_ENGINEERING), None);
        repo.add_user(ENGINEERING_STUDENT, "student", Some(NORTHFIELD_ENGINEERING), None);
        repo.add_user(MEDICINE_STUDENT, "student", Some(SOUTHGATE_MEDICINE), None);
        repo.add_user(ORPHAN_ADMIN, "university_admin", None, None);
        repo.add_user(UNAFFILIATED_STUDENT, "student", None, None);
        repo
    }

    pub fn add_university(&self, id: i64, name: &str) {
        self.store.lock().unwrap().universities.push(University {
            id,
            name: name.to_string(),
            code: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        });
    }

    pub fn add_institute(&self, id: i64, university_id: i64, name: &str) {
        self.store.lock().unwrap().institutes.push(Institute {
            id,
            university_id,
            name: name.to_string(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        });
    }

    pub fn add_scholarship(
        &self,
        id: i64,
        title: &str,
        scholarship_type: ScholarshipType,
        university_id: Option<i64>,
        institute_id: Option<i64>,
    ) {
        self.store.lock().unwrap().scholarships.push(Scholarship {
            id,
            title: title.to_string(),
            description: format!("{title} description"),
            scholarship_type,
            university_id,
            institute_id,
            created_at: Utc::now(),
            updated_at: Utc::now(),
            ..Scholarship::default()
        });
    }

    pub fn add_user(
        &self,
        id: Uuid,
        role: &str,
        institute_id: Option<i64>,
        university_id: Option<i64>,
    ) {
        self.store.lock().unwrap().users.push(User {
            id,
            email: format!("{id}@portal.test"),
            full_name: format!("{role} {}", id.as_u128()),
            role: role.to_string(),
            institute_id,
            university_id,
            created_at: Utc::now(),
        });
    }

    pub fn scholarship(&self, id: i64) -> Option<Scholarship> {
        let store = self.store.lock().unwrap();
        store.scholarships.iter().find(|s| s.id == id).cloned()
    }

    pub fn institute(&self, id: i64) -> Option<Institute> {
        let store = self.store.lock().unwrap();
        store.institutes.iter().find(|i| i.id == id).cloned()
    }

    pub fn user(&self, id: Uuid) -> Option<User> {
        let store = self.store.lock().unwrap();
        store.users.iter().find(|u| u.id == id).cloned()
    }

    pub fn set_deadline(&self, id: i64, deadline: chrono::NaiveDate) {
        let mut store = self.store.lock().unwrap();
        if let Some(s) = store.scholarships.iter_mut().find(|s| s.id == id) {
            s.deadline = Some(deadline);
        }
    }

    /// Number of institute-to-university lookups served so far.
    pub fn lookup_count(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl UniversityLookup for InMemoryRepository {
    async fn university_for_institute(&self, institute_id: i64) -> Option<i64> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        self.store.lock().unwrap().owner_of(institute_id)
    }
}

#[async_trait]
impl Repository for InMemoryRepository {
    async fn get_user(&self, id: Uuid) -> Result<Option<User>, sqlx::Error> {
        Ok(self.user(id))
    }

    async fn create_user(&self, user: NewUser) -> Result<User, sqlx::Error> {
        let created = User {
            id: user.id,
            email: user.email,
            full_name: user.full_name,
            role: user.role.as_str().to_string(),
            institute_id: user.institute_id,
            university_id: None,
            created_at: Utc::now(),
        };
        self.store.lock().unwrap().users.push(created.clone());
        Ok(created)
    }

    async fn list_users(&self, filter: UserFilter) -> Result<Vec<User>, sqlx::Error> {
        let store = self.store.lock().unwrap();
        Ok(store
            .users
            .iter()
            .filter(|u| filter.matches(u, |i| store.owner_of(i)))
            .cloned()
            .collect())
    }

    async fn find_user(&self, id: Uuid, filter: UserFilter) -> Result<Option<User>, sqlx::Error> {
        let store = self.store.lock().unwrap();
        Ok(store
            .users
            .iter()
            .find(|u| u.id == id && filter.matches(u, |i| store.owner_of(i)))
            .cloned())
    }

    async fn assign_role(
        &self,
        id: Uuid,
        req: &AssignRoleRequest,
    ) -> Result<Option<User>, sqlx::Error> {
        let mut store = self.store.lock().unwrap();
        Ok(store.users.iter_mut().find(|u| u.id == id).map(|u| {
            u.role = req.role.as_str().to_string();
            u.institute_id = req.institute_id;
            u.university_id = req.university_id;
            u.clone()
        }))
    }

    async fn list_universities(
        &self,
        filter: UniversityFilter,
    ) -> Result<Vec<University>, sqlx::Error> {
        let store = self.store.lock().unwrap();
        Ok(store
            .universities
            .iter()
            .filter(|u| filter.matches(u))
            .cloned()
            .collect())
    }

    async fn get_university(
        &self,
        id: i64,
        filter: UniversityFilter,
    ) -> Result<Option<University>, sqlx::Error> {
        let store = self.store.lock().unwrap();
        Ok(store
            .universities
            .iter()
            .find(|u| u.id == id && filter.matches(u))
            .cloned())
    }

    async fn university_options(
        &self,
        filter: UniversityFilter,
    ) -> Result<Vec<OptionItem>, sqlx::Error> {
        let universities = self.list_universities(filter).await?;
        Ok(universities
            .into_iter()
            .map(|u| OptionItem { id: u.id, name: u.name })
            .collect())
    }

    async fn create_university(
        &self,
        req: CreateUniversityRequest,
    ) -> Result<University, sqlx::Error> {
        let mut store = self.store.lock().unwrap();
        let university = University {
            id: store.next_id(),
            name: req.name,
            code: req.code,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        store.universities.push(university.clone());
        Ok(university)
    }

    async fn update_university(
        &self,
        id: i64,
        req: UpdateUniversityRequest,
    ) -> Result<Option<University>, sqlx::Error> {
        let mut store = self.store.lock().unwrap();
        Ok(store.universities.iter_mut().find(|u| u.id == id).map(|u| {
            if let Some(name) = req.name {
                u.name = name;
            }
            if req.code.is_some() {
                u.code = req.code;
            }
            u.updated_at = Utc::now();
            u.clone()
        }))
    }

    async fn delete_university(&self, id: i64) -> Result<bool, sqlx::Error> {
        let mut store = self.store.lock().unwrap();
        let before = store.universities.len();
        store.universities.retain(|u| u.id != id);
        store.institutes.retain(|i| i.university_id != id);
        Ok(store.universities.len() < before)
    }

    async fn list_institutes(
        &self,
        filter: InstituteFilter,
    ) -> Result<Vec<Institute>, sqlx::Error> {
        let store = self.store.lock().unwrap();
        Ok(store
            .institutes
            .iter()
            .filter(|i| filter.matches(i))
            .cloned()
            .collect())
    }

    async fn get_institute(
        &self,
        id: i64,
        filter: InstituteFilter,
    ) -> Result<Option<Institute>, sqlx::Error> {
        let store = self.store.lock().unwrap();
        Ok(store
            .institutes
            .iter()
            .find(|i| i.id == id && filter.matches(i))
            .cloned())
    }

    async fn institute_options(
        &self,
        filter: InstituteFilter,
    ) -> Result<Vec<OptionItem>, sqlx::Error> {
        let institutes = self.list_institutes(filter).await?;
        Ok(institutes
            .into_iter()
            .map(|i| OptionItem { id: i.id, name: i.name })
            .collect())
    }

    async fn create_institute(
        &self,
        req: CreateInstituteRequest,
    ) -> Result<Institute, sqlx::Error> {
        let mut store = self.store.lock().unwrap();
        let institute = Institute {
            id: store.next_id(),
            university_id: req.university_id,
            name: req.name,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        store.institutes.push(institute.clone());
        Ok(institute)
    }

    async fn update_institute(
        &self,
        id: i64,
        req: UpdateInstituteRequest,
        filter: InstituteFilter,
    ) -> Result<Option<Institute>, sqlx::Error> {
        let mut store = self.store.lock().unwrap();
        Ok(store
            .institutes
            .iter_mut()
            .find(|i| i.id == id && filter.matches(i))
            .map(|i| {
                if let Some(university_id) = req.university_id {
                    i.university_id = university_id;
                }
                if let Some(name) = req.name {
                    i.name = name;
                }
                i.updated_at = Utc::now();
                i.clone()
            }))
    }

    async fn delete_institute(&self, id: i64) -> Result<bool, sqlx::Error> {
        let mut store = self.store.lock().unwrap();
        let before = store.institutes.len();
        store.institutes.retain(|i| i.id != id);
        Ok(store.institutes.len() < before)
    }

    async fn list_scholarships(
        &self,
        filter: ScholarshipFilter,
        query: ScholarshipQuery,
    ) -> Result<Vec<Scholarship>, sqlx::Error> {
        let search = query
            .search
            .map(|s| s.trim().to_lowercase())
            .filter(|s| !s.is_empty());
        let store = self.store.lock().unwrap();
        Ok(store
            .scholarships
            .iter()
            .filter(|s| filter.matches(s))
            .filter(|s| query.scholarship_type.is_none_or(|t| s.scholarship_type == t))
            .filter(|s| {
                search.as_ref().is_none_or(|needle| {
                    s.title.to_lowercase().contains(needle)
                        || s.description.to_lowercase().contains(needle)
                })
            })
            .cloned()
            .collect())
    }

    async fn get_scholarship(
        &self,
        id: i64,
        filter: ScholarshipFilter,
    ) -> Result<Option<Scholarship>, sqlx::Error> {
        Ok(self.scholarship(id).filter(|s| filter.matches(s)))
    }

    async fn create_scholarship(
        &self,
        draft: ScholarshipDraft,
        created_by: Uuid,
    ) -> Result<Scholarship, sqlx::Error> {
        let mut store = self.store.lock().unwrap();
        let scholarship = Scholarship {
            id: store.next_id(),
            title: draft.title,
            description: draft.description,
            scholarship_type: draft.scholarship_type,
            university_id: draft.university_id,
            institute_id: draft.institute_id,
            amount: draft.amount,
            deadline: draft.deadline,
            created_by: Some(created_by),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        store.scholarships.push(scholarship.clone());
        Ok(scholarship)
    }

    async fn update_scholarship(
        &self,
        id: i64,
        draft: ScholarshipDraft,
        filter: ScholarshipFilter,
    ) -> Result<Option<Scholarship>, sqlx::Error> {
        let mut store = self.store.lock().unwrap();
        Ok(store
            .scholarships
            .iter_mut()
            .find(|s| s.id == id && filter.matches(s))
            .map(|s| {
                s.title = draft.title;
                s.description = draft.description;
                s.scholarship_type = draft.scholarship_type;
                s.university_id = draft.university_id;
                s.institute_id = draft.institute_id;
                s.amount = draft.amount;
                s.deadline = draft.deadline;
                s.updated_at = Utc::now();
                s.clone()
            }))
    }

    async fn delete_scholarship(
        &self,
        id: i64,
        filter: ScholarshipFilter,
    ) -> Result<bool, sqlx::Error> {
        let mut store = self.store.lock().unwrap();
        let before = store.scholarships.len();
        store
            .scholarships
            .retain(|s| !(s.id == id && filter.matches(s)));
        let deleted = store.scholarships.len() < before;
        if deleted {
            store.applications.retain(|a| a.scholarship_id != id);
        }
        Ok(deleted)
    }

    async fn create_application(
        &self,
        scholarship_id: i64,
        student_id: Uuid,
        statement: String,
    ) -> Result<Option<Application>, sqlx::Error> {
        let mut store = self.store.lock().unwrap();
        if store
            .applications
            .iter()
            .any(|a| a.scholarship_id == scholarship_id && a.student_id == student_id)
        {
            return Ok(None);
        }
        let scholarship_title = store
            .scholarships
            .iter()
            .find(|s| s.id == scholarship_id)
            .map(|s| s.title.clone())
            .unwrap_or_default();
        let application = Application {
            id: store.next_id(),
            scholarship_id,
            student_id,
            statement,
            status: ApplicationStatus::Pending,
            created_at: Utc::now(),
            updated_at: Utc::now(),
            scholarship_title,
        };
        store.applications.push(application.clone());
        Ok(Some(application))
    }

    async fn list_applications(
        &self,
        filter: ApplicationFilter,
    ) -> Result<Vec<Application>, sqlx::Error> {
        let store = self.store.lock().unwrap();
        Ok(store
            .applications
            .iter()
            .filter(|a| {
                store
                    .scholarships
                    .iter()
                    .find(|s| s.id == a.scholarship_id)
                    .is_some_and(|s| filter.matches(a.student_id, s))
            })
            .cloned()
            .collect())
    }

    async fn set_application_status(
        &self,
        id: i64,
        status: ApplicationStatus,
        filter: ApplicationFilter,
    ) -> Result<Option<Application>, sqlx::Error> {
        let mut store = self.store.lock().unwrap();
        let Store {
            applications,
            scholarships,
            ..
        } = &mut *store;
        Ok(applications
            .iter_mut()
            .find(|a| {
                a.id == id
                    && scholarships
                        .iter()
                        .find(|s| s.id == a.scholarship_id)
                        .is_some_and(|s| filter.matches(a.student_id, s))
            })
            .map(|a| {
                a.status = status;
                a.updated_at = Utc::now();
                a.clone()
            }))
    }

    async fn get_stats(
        &self,
        scholarships: ScholarshipFilter,
        users: UserFilter,
        applications: ApplicationFilter,
    ) -> Result<DashboardStats, sqlx::Error> {
        let total_scholarships = self
            .list_scholarships(scholarships, ScholarshipQuery::default())
            .await?
            .len() as i64;
        let total_users = self.list_users(users).await?.len() as i64;
        let visible = self.list_applications(applications).await?;
        Ok(DashboardStats {
            total_scholarships,
            total_users,
            total_applications: visible.len() as i64,
            pending_applications: visible
                .iter()
                .filter(|a| a.status == ApplicationStatus::Pending)
                .count() as i64,
        })
    }
}

// --- State helpers ---

/// Wraps `repo` in an `AppState` with the default (local) configuration.
pub fn create_test_state(repo: Arc<InMemoryRepository>) -> AppState {
    AppState {
        repo: repo as RepositoryState,
        config: AppConfig::default(),
    }
}

/// The stored user `id` as an authenticated caller.
pub fn caller(repo: &InMemoryRepository, id: Uuid) -> AuthUser {
    let user = repo.user(id).expect("fixture user exists");
    AuthUser(user.actor())
}
