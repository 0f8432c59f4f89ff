use crate::models::{
    Comment, Contributor, Issue, Project, UpdateIssueRequest, UpdateProjectRequest,
    UpdateUserRequest, User,
};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::PgPool;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use uuid::Uuid;

/// Repository Trait
///
/// Defines the abstract contract for all persistence operations, allowing the
/// handlers to interact with the data layer without knowing the specific
/// implementation (Postgres in production, in-memory in tests).
///
/// **Send + Sync + async_trait** are required to make the trait object
/// (`Arc<dyn Repository>`) safely shareable across Axum's async task
/// boundaries.
///
/// Convention: read methods return `Option`/`Vec`, write methods return the
/// written row (`Option`, `None` on conflict or failure) or a `bool`
/// (`rows_affected > 0`). Database errors are logged where they occur.
#[async_trait]
pub trait Repository: Send + Sync {
    // --- Users ---
    /// Inserts a user row. Returns `None` when the username or email is
    /// already taken (handlers pre-check to attribute the right field, this
    /// is the backstop).
    async fn create_user(&self, user: User) -> Option<User>;
    async fn get_user(&self, id: Uuid) -> Option<User>;
    async fn get_user_by_username(&self, username: &str) -> Option<User>;
    async fn get_user_by_email(&self, email: &str) -> Option<User>;
    async fn list_users(&self) -> Vec<User>;
    /// Partial update; only fields present in `req` change.
    async fn update_user(&self, id: Uuid, req: UpdateUserRequest) -> Option<User>;
    /// Removes the account and everything hanging off it (authored projects,
    /// memberships, authored issues/comments) via relational cascade.
    async fn delete_user(&self, id: Uuid) -> bool;

    // --- Projects ---
    async fn create_project(&self, project: Project) -> Option<Project>;
    async fn list_projects(&self) -> Vec<Project>;
    async fn get_project(&self, id: Uuid) -> Option<Project>;
    /// Partial update of the project row. Roster changes go through the
    /// contributor methods; the `contributors` field of `req` is ignored here.
    async fn update_project(&self, id: Uuid, req: UpdateProjectRequest) -> Option<Project>;
    async fn delete_project(&self, id: Uuid) -> bool;

    // --- Contributors ---
    async fn list_contributors(&self, project_id: Uuid) -> Vec<Contributor>;
    async fn contributor_user_ids(&self, project_id: Uuid) -> Vec<Uuid>;
    async fn is_contributor(&self, project_id: Uuid, user_id: Uuid) -> bool;
    /// Idempotent membership insert: returns true only if a new row was
    /// written, false on a duplicate (user, project) pair.
    async fn add_contributor(&self, project_id: Uuid, user_id: Uuid) -> bool;
    async fn remove_contributor(&self, project_id: Uuid, user_id: Uuid) -> bool;

    // --- Issues ---
    async fn create_issue(&self, issue: Issue) -> Option<Issue>;
    async fn list_issues(&self, project_id: Uuid) -> Vec<Issue>;
    async fn get_issue(&self, id: Uuid) -> Option<Issue>;
    /// Partial update; always advances `updated_time`.
    async fn update_issue(&self, id: Uuid, req: UpdateIssueRequest) -> Option<Issue>;
    async fn delete_issue(&self, id: Uuid) -> bool;

    // --- Comments ---
    /// Inserts a comment and advances the parent issue's `updated_time`.
    async fn create_comment(&self, comment: Comment) -> Option<Comment>;
    async fn list_comments(&self, issue_id: Uuid) -> Vec<Comment>;
    async fn get_comment(&self, id: Uuid) -> Option<Comment>;
    /// Rewrites the comment body and advances both the comment's and the
    /// parent issue's `updated_time`.
    async fn update_comment(&self, id: Uuid, description: String) -> Option<Comment>;
    async fn delete_comment(&self, id: Uuid) -> bool;
}

/// RepositoryState
///
/// The concrete type used to share the persistence layer across the
/// application state.
pub type RepositoryState = Arc<dyn Repository>;

/// PostgresRepository
///
/// The concrete implementation of the `Repository` trait, backed by
/// PostgreSQL.
pub struct PostgresRepository {
    pool: PgPool,
}

const USER_COLUMNS: &str =
    "id, username, email, password_hash, age, can_be_contacted, can_data_be_shared, created_time";
const PROJECT_COLUMNS: &str = "id, author_id, name, description, category, created_time";
const ISSUE_COLUMNS: &str =
    "id, project_id, author_id, title, description, status, priority, tag, created_time, updated_time";
const COMMENT_COLUMNS: &str =
    "id, issue_id, author_id, description, created_time, updated_time";

impl PostgresRepository {
    /// Creates a new repository instance using the initialized connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// run_migrations
    ///
    /// Creates the schema if it does not exist. Idempotent; called once at
    /// startup before the server binds.
    pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS users (
                id UUID PRIMARY KEY,
                username TEXT NOT NULL UNIQUE,
                email TEXT NOT NULL UNIQUE,
                password_hash TEXT NOT NULL,
                age INTEGER NOT NULL,
                can_be_contacted BOOLEAN NOT NULL,
                can_data_be_shared BOOLEAN NOT NULL,
                created_time TIMESTAMPTZ NOT NULL DEFAULT NOW()
            )
            "#,
        )
        .execute(pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS projects (
                id UUID PRIMARY KEY,
                author_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                name TEXT NOT NULL,
                description TEXT NOT NULL,
                category TEXT NOT NULL,
                created_time TIMESTAMPTZ NOT NULL DEFAULT NOW()
            )
            "#,
        )
        .execute(pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS contributors (
                user_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                project_id UUID NOT NULL REFERENCES projects(id) ON DELETE CASCADE,
                created_time TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                PRIMARY KEY (user_id, project_id)
            )
            "#,
        )
        .execute(pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS issues (
                id UUID PRIMARY KEY,
                project_id UUID NOT NULL REFERENCES projects(id) ON DELETE CASCADE,
                author_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                title TEXT NOT NULL,
                description TEXT NOT NULL,
                status TEXT NOT NULL,
                priority TEXT NOT NULL,
                tag TEXT NOT NULL,
                created_time TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                updated_time TIMESTAMPTZ NOT NULL DEFAULT NOW()
            )
            "#,
        )
        .execute(pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS comments (
                id UUID PRIMARY KEY,
                issue_id UUID NOT NULL REFERENCES issues(id) ON DELETE CASCADE,
                author_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                description TEXT NOT NULL,
                created_time TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                updated_time TIMESTAMPTZ NOT NULL DEFAULT NOW()
            )
            "#,
        )
        .execute(pool)
        .await?;

        Ok(())
    }
}

#[async_trait]
impl Repository for PostgresRepository {
    // --- USERS ---

    /// create_user
    ///
    /// `ON CONFLICT DO NOTHING` covers the race between the handler's
    /// duplicate pre-check and the insert: a concurrent duplicate yields
    /// `None` instead of an error.
    async fn create_user(&self, user: User) -> Option<User> {
        sqlx::query_as::<_, User>(&format!(
            "INSERT INTO users ({USER_COLUMNS}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8) \
             ON CONFLICT DO NOTHING RETURNING {USER_COLUMNS}"
        ))
        .bind(user.id)
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(user.age)
        .bind(user.can_be_contacted)
        .bind(user.can_data_be_shared)
        .bind(user.created_time)
        .fetch_optional(&self.pool)
        .await
        .unwrap_or_else(|e| {
            tracing::error!("create_user error: {:?}", e);
            None
        })
    }

    async fn get_user(&self, id: Uuid) -> Option<User> {
        sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .unwrap_or_else(|e| {
                tracing::error!("get_user error: {:?}", e);
                None
            })
    }

    async fn get_user_by_username(&self, username: &str) -> Option<User> {
        sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE username = $1"
        ))
        .bind(username)
        .fetch_optional(&self.pool)
        .await
        .unwrap_or_else(|e| {
            tracing::error!("get_user_by_username error: {:?}", e);
            None
        })
    }

    async fn get_user_by_email(&self, email: &str) -> Option<User> {
        sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1"))
            .bind(email)
            .fetch_optional(&self.pool)
            .await
            .unwrap_or_else(|e| {
                tracing::error!("get_user_by_email error: {:?}", e);
                None
            })
    }

    async fn list_users(&self) -> Vec<User> {
        sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users ORDER BY created_time ASC"
        ))
        .fetch_all(&self.pool)
        .await
        .unwrap_or_else(|e| {
            tracing::error!("list_users error: {:?}", e);
            vec![]
        })
    }

    /// update_user
    ///
    /// Uses `COALESCE` so only the fields present in `req` change.
    async fn update_user(&self, id: Uuid, req: UpdateUserRequest) -> Option<User> {
        sqlx::query_as::<_, User>(&format!(
            "UPDATE users SET \
                username = COALESCE($2, username), \
                email = COALESCE($3, email), \
                age = COALESCE($4, age), \
                can_be_contacted = COALESCE($5, can_be_contacted), \
                can_data_be_shared = COALESCE($6, can_data_be_shared) \
             WHERE id = $1 RETURNING {USER_COLUMNS}"
        ))
        .bind(id)
        .bind(req.username)
        .bind(req.email)
        .bind(req.age)
        .bind(req.can_be_contacted)
        .bind(req.can_data_be_shared)
        .fetch_optional(&self.pool)
        .await
        .unwrap_or_else(|e| {
            tracing::error!("update_user error: {:?}", e);
            None
        })
    }

    async fn delete_user(&self, id: Uuid) -> bool {
        match sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
        {
            Ok(res) => res.rows_affected() > 0,
            Err(e) => {
                tracing::error!("delete_user error: {:?}", e);
                false
            }
        }
    }

    // --- PROJECTS ---

    async fn create_project(&self, project: Project) -> Option<Project> {
        sqlx::query_as::<_, Project>(&format!(
            "INSERT INTO projects ({PROJECT_COLUMNS}) VALUES ($1, $2, $3, $4, $5, $6) \
             RETURNING {PROJECT_COLUMNS}"
        ))
        .bind(project.id)
        .bind(project.author_id)
        .bind(&project.name)
        .bind(&project.description)
        .bind(&project.category)
        .bind(project.created_time)
        .fetch_optional(&self.pool)
        .await
        .unwrap_or_else(|e| {
            tracing::error!("create_project error: {:?}", e);
            None
        })
    }

    async fn list_projects(&self) -> Vec<Project> {
        sqlx::query_as::<_, Project>(&format!(
            "SELECT {PROJECT_COLUMNS} FROM projects ORDER BY created_time DESC"
        ))
        .fetch_all(&self.pool)
        .await
        .unwrap_or_else(|e| {
            tracing::error!("list_projects error: {:?}", e);
            vec![]
        })
    }

    async fn get_project(&self, id: Uuid) -> Option<Project> {
        sqlx::query_as::<_, Project>(&format!(
            "SELECT {PROJECT_COLUMNS} FROM projects WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .unwrap_or_else(|e| {
            tracing::error!("get_project error: {:?}", e);
            None
        })
    }

    async fn update_project(&self, id: Uuid, req: UpdateProjectRequest) -> Option<Project> {
        sqlx::query_as::<_, Project>(&format!(
            "UPDATE projects SET \
                name = COALESCE($2, name), \
                description = COALESCE($3, description), \
                category = COALESCE($4, category) \
             WHERE id = $1 RETURNING {PROJECT_COLUMNS}"
        ))
        .bind(id)
        .bind(req.name)
        .bind(req.description)
        .bind(req.category.map(|c| c.as_str()))
        .fetch_optional(&self.pool)
        .await
        .unwrap_or_else(|e| {
            tracing::error!("update_project error: {:?}", e);
            None
        })
    }

    async fn delete_project(&self, id: Uuid) -> bool {
        match sqlx::query("DELETE FROM projects WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
        {
            Ok(res) => res.rows_affected() > 0,
            Err(e) => {
                tracing::error!("delete_project error: {:?}", e);
                false
            }
        }
    }

    // --- CONTRIBUTORS ---

    async fn list_contributors(&self, project_id: Uuid) -> Vec<Contributor> {
        sqlx::query_as::<_, Contributor>(
            "SELECT user_id, project_id, created_time FROM contributors \
             WHERE project_id = $1 ORDER BY created_time ASC",
        )
        .bind(project_id)
        .fetch_all(&self.pool)
        .await
        .unwrap_or_else(|e| {
            tracing::error!("list_contributors error: {:?}", e);
            vec![]
        })
    }

    async fn contributor_user_ids(&self, project_id: Uuid) -> Vec<Uuid> {
        sqlx::query_scalar::<_, Uuid>(
            "SELECT user_id FROM contributors WHERE project_id = $1 ORDER BY created_time ASC",
        )
        .bind(project_id)
        .fetch_all(&self.pool)
        .await
        .unwrap_or_else(|e| {
            tracing::error!("contributor_user_ids error: {:?}", e);
            vec![]
        })
    }

    async fn is_contributor(&self, project_id: Uuid, user_id: Uuid) -> bool {
        sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM contributors WHERE project_id = $1 AND user_id = $2",
        )
        .bind(project_id)
        .bind(user_id)
        .fetch_one(&self.pool)
        .await
        .map(|count| count > 0)
        .unwrap_or_else(|e| {
            tracing::error!("is_contributor error: {:?}", e);
            false
        })
    }

    /// add_contributor
    ///
    /// `ON CONFLICT DO NOTHING` on the composite primary key keeps the pair
    /// unique; true only if a new row was inserted.
    async fn add_contributor(&self, project_id: Uuid, user_id: Uuid) -> bool {
        let result = sqlx::query(
            "INSERT INTO contributors (user_id, project_id) VALUES ($1, $2) \
             ON CONFLICT DO NOTHING",
        )
        .bind(user_id)
        .bind(project_id)
        .execute(&self.pool)
        .await;
        match result {
            Ok(res) => res.rows_affected() > 0,
            Err(e) => {
                tracing::error!("add_contributor error: {:?}", e);
                false
            }
        }
    }

    async fn remove_contributor(&self, project_id: Uuid, user_id: Uuid) -> bool {
        match sqlx::query("DELETE FROM contributors WHERE project_id = $1 AND user_id = $2")
            .bind(project_id)
            .bind(user_id)
            .execute(&self.pool)
            .await
        {
            Ok(res) => res.rows_affected() > 0,
            Err(e) => {
                tracing::error!("remove_contributor error: {:?}", e);
                false
            }
        }
    }

    // --- ISSUES ---

    async fn create_issue(&self, issue: Issue) -> Option<Issue> {
        sqlx::query_as::<_, Issue>(&format!(
            "INSERT INTO issues ({ISSUE_COLUMNS}) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10) RETURNING {ISSUE_COLUMNS}"
        ))
        .bind(issue.id)
        .bind(issue.project_id)
        .bind(issue.author_id)
        .bind(&issue.title)
        .bind(&issue.description)
        .bind(&issue.status)
        .bind(&issue.priority)
        .bind(&issue.tag)
        .bind(issue.created_time)
        .bind(issue.updated_time)
        .fetch_optional(&self.pool)
        .await
        .unwrap_or_else(|e| {
            tracing::error!("create_issue error: {:?}", e);
            None
        })
    }

    async fn list_issues(&self, project_id: Uuid) -> Vec<Issue> {
        sqlx::query_as::<_, Issue>(&format!(
            "SELECT {ISSUE_COLUMNS} FROM issues WHERE project_id = $1 ORDER BY created_time ASC"
        ))
        .bind(project_id)
        .fetch_all(&self.pool)
        .await
        .unwrap_or_else(|e| {
            tracing::error!("list_issues error: {:?}", e);
            vec![]
        })
    }

    async fn get_issue(&self, id: Uuid) -> Option<Issue> {
        sqlx::query_as::<_, Issue>(&format!("SELECT {ISSUE_COLUMNS} FROM issues WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .unwrap_or_else(|e| {
                tracing::error!("get_issue error: {:?}", e);
                None
            })
    }

    async fn update_issue(&self, id: Uuid, req: UpdateIssueRequest) -> Option<Issue> {
        sqlx::query_as::<_, Issue>(&format!(
            "UPDATE issues SET \
                title = COALESCE($2, title), \
                description = COALESCE($3, description), \
                priority = COALESCE($4, priority), \
                tag = COALESCE($5, tag), \
                status = COALESCE($6, status), \
                updated_time = NOW() \
             WHERE id = $1 RETURNING {ISSUE_COLUMNS}"
        ))
        .bind(id)
        .bind(req.title)
        .bind(req.description)
        .bind(req.priority.map(|p| p.as_str()))
        .bind(req.tag.map(|t| t.as_str()))
        .bind(req.status.map(|s| s.as_str()))
        .fetch_optional(&self.pool)
        .await
        .unwrap_or_else(|e| {
            tracing::error!("update_issue error: {:?}", e);
            None
        })
    }

    async fn delete_issue(&self, id: Uuid) -> bool {
        match sqlx::query("DELETE FROM issues WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
        {
            Ok(res) => res.rows_affected() > 0,
            Err(e) => {
                tracing::error!("delete_issue error: {:?}", e);
                false
            }
        }
    }

    // --- COMMENTS ---

    /// create_comment
    ///
    /// The parent issue's `updated_time` is advanced in a follow-up
    /// statement; there is no surrounding transaction, so a failure between
    /// the two leaves the comment in place with a stale issue timestamp.
    async fn create_comment(&self, comment: Comment) -> Option<Comment> {
        let inserted = sqlx::query_as::<_, Comment>(&format!(
            "INSERT INTO comments ({COMMENT_COLUMNS}) VALUES ($1, $2, $3, $4, $5, $6) \
             RETURNING {COMMENT_COLUMNS}"
        ))
        .bind(comment.id)
        .bind(comment.issue_id)
        .bind(comment.author_id)
        .bind(&comment.description)
        .bind(comment.created_time)
        .bind(comment.updated_time)
        .fetch_optional(&self.pool)
        .await
        .unwrap_or_else(|e| {
            tracing::error!("create_comment error: {:?}", e);
            None
        })?;

        if let Err(e) = sqlx::query("UPDATE issues SET updated_time = NOW() WHERE id = $1")
            .bind(inserted.issue_id)
            .execute(&self.pool)
            .await
        {
            tracing::error!("create_comment touch issue error: {:?}", e);
        }

        Some(inserted)
    }

    async fn list_comments(&self, issue_id: Uuid) -> Vec<Comment> {
        sqlx::query_as::<_, Comment>(&format!(
            "SELECT {COMMENT_COLUMNS} FROM comments WHERE issue_id = $1 ORDER BY created_time ASC"
        ))
        .bind(issue_id)
        .fetch_all(&self.pool)
        .await
        .unwrap_or_else(|e| {
            tracing::error!("list_comments error: {:?}", e);
            vec![]
        })
    }

    async fn get_comment(&self, id: Uuid) -> Option<Comment> {
        sqlx::query_as::<_, Comment>(&format!(
            "SELECT {COMMENT_COLUMNS} FROM comments WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .unwrap_or_else(|e| {
            tracing::error!("get_comment error: {:?}", e);
            None
        })
    }

    async fn update_comment(&self, id: Uuid, description: String) -> Option<Comment> {
        let updated = sqlx::query_as::<_, Comment>(&format!(
            "UPDATE comments SET description = $2, updated_time = NOW() \
             WHERE id = $1 RETURNING {COMMENT_COLUMNS}"
        ))
        .bind(id)
        .bind(description)
        .fetch_optional(&self.pool)
        .await
        .unwrap_or_else(|e| {
            tracing::error!("update_comment error: {:?}", e);
            None
        })?;

        if let Err(e) = sqlx::query("UPDATE issues SET updated_time = NOW() WHERE id = $1")
            .bind(updated.issue_id)
            .execute(&self.pool)
            .await
        {
            tracing::error!("update_comment touch issue error: {:?}", e);
        }

        Some(updated)
    }

    async fn delete_comment(&self, id: Uuid) -> bool {
        match sqlx::query("DELETE FROM comments WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
        {
            Ok(res) => res.rows_affected() > 0,
            Err(e) => {
                tracing::error!("delete_comment error: {:?}", e);
                false
            }
        }
    }
}

// --- In-Memory Implementation (For Tests) ---

/// MemoryRepository
///
/// An in-memory implementation of `Repository` used by the test suite. It
/// reproduces the uniqueness rules and cascade behavior of the Postgres
/// schema so the integration tests can exercise the full router without a
/// database.
#[derive(Default)]
pub struct MemoryRepository {
    inner: RwLock<MemoryState>,
}

#[derive(Default)]
struct MemoryState {
    users: HashMap<Uuid, User>,
    projects: HashMap<Uuid, Project>,
    contributors: Vec<Contributor>,
    issues: HashMap<Uuid, Issue>,
    comments: HashMap<Uuid, Comment>,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

impl MemoryState {
    /// Cascade for a project removal: roster, issues, and their comments.
    fn remove_project_tree(&mut self, project_id: Uuid) {
        self.contributors.retain(|c| c.project_id != project_id);
        let issue_ids: Vec<Uuid> = self
            .issues
            .values()
            .filter(|i| i.project_id == project_id)
            .map(|i| i.id)
            .collect();
        for issue_id in issue_ids {
            self.remove_issue_tree(issue_id);
        }
        self.projects.remove(&project_id);
    }

    /// Cascade for an issue removal: its comments.
    fn remove_issue_tree(&mut self, issue_id: Uuid) {
        self.comments.retain(|_, c| c.issue_id != issue_id);
        self.issues.remove(&issue_id);
    }
}

#[async_trait]
impl Repository for MemoryRepository {
    async fn create_user(&self, user: User) -> Option<User> {
        let mut state = self.inner.write().unwrap();
        let taken = state
            .users
            .values()
            .any(|u| u.username == user.username || u.email == user.email);
        if taken {
            return None;
        }
        state.users.insert(user.id, user.clone());
        Some(user)
    }

    async fn get_user(&self, id: Uuid) -> Option<User> {
        self.inner.read().unwrap().users.get(&id).cloned()
    }

    async fn get_user_by_username(&self, username: &str) -> Option<User> {
        self.inner
            .read()
            .unwrap()
            .users
            .values()
            .find(|u| u.username == username)
            .cloned()
    }

    async fn get_user_by_email(&self, email: &str) -> Option<User> {
        self.inner
            .read()
            .unwrap()
            .users
            .values()
            .find(|u| u.email == email)
            .cloned()
    }

    async fn list_users(&self) -> Vec<User> {
        let mut users: Vec<User> = self.inner.read().unwrap().users.values().cloned().collect();
        users.sort_by_key(|u| u.created_time);
        users
    }

    async fn update_user(&self, id: Uuid, req: UpdateUserRequest) -> Option<User> {
        let mut state = self.inner.write().unwrap();
        let user = state.users.get_mut(&id)?;
        if let Some(username) = req.username {
            user.username = username;
        }
        if let Some(email) = req.email {
            user.email = email;
        }
        if let Some(age) = req.age {
            user.age = age;
        }
        if let Some(flag) = req.can_be_contacted {
            user.can_be_contacted = flag;
        }
        if let Some(flag) = req.can_data_be_shared {
            user.can_data_be_shared = flag;
        }
        Some(user.clone())
    }

    async fn delete_user(&self, id: Uuid) -> bool {
        let mut state = self.inner.write().unwrap();
        if state.users.remove(&id).is_none() {
            return false;
        }
        // Mirror the FK cascades: authored projects fall with their trees,
        // then memberships, authored issues, and authored comments.
        let project_ids: Vec<Uuid> = state
            .projects
            .values()
            .filter(|p| p.author_id == id)
            .map(|p| p.id)
            .collect();
        for project_id in project_ids {
            state.remove_project_tree(project_id);
        }
        state.contributors.retain(|c| c.user_id != id);
        let issue_ids: Vec<Uuid> = state
            .issues
            .values()
            .filter(|i| i.author_id == id)
            .map(|i| i.id)
            .collect();
        for issue_id in issue_ids {
            state.remove_issue_tree(issue_id);
        }
        state.comments.retain(|_, c| c.author_id != id);
        true
    }

    async fn create_project(&self, project: Project) -> Option<Project> {
        let mut state = self.inner.write().unwrap();
        state.projects.insert(project.id, project.clone());
        Some(project)
    }

    async fn list_projects(&self) -> Vec<Project> {
        let mut projects: Vec<Project> = self
            .inner
            .read()
            .unwrap()
            .projects
            .values()
            .cloned()
            .collect();
        projects.sort_by_key(|p| std::cmp::Reverse(p.created_time));
        projects
    }

    async fn get_project(&self, id: Uuid) -> Option<Project> {
        self.inner.read().unwrap().projects.get(&id).cloned()
    }

    async fn update_project(&self, id: Uuid, req: UpdateProjectRequest) -> Option<Project> {
        let mut state = self.inner.write().unwrap();
        let project = state.projects.get_mut(&id)?;
        if let Some(name) = req.name {
            project.name = name;
        }
        if let Some(description) = req.description {
            project.description = description;
        }
        if let Some(category) = req.category {
            project.category = category.as_str().to_string();
        }
        Some(project.clone())
    }

    async fn delete_project(&self, id: Uuid) -> bool {
        let mut state = self.inner.write().unwrap();
        if !state.projects.contains_key(&id) {
            return false;
        }
        state.remove_project_tree(id);
        true
    }

    async fn list_contributors(&self, project_id: Uuid) -> Vec<Contributor> {
        let mut rows: Vec<Contributor> = self
            .inner
            .read()
            .unwrap()
            .contributors
            .iter()
            .filter(|c| c.project_id == project_id)
            .cloned()
            .collect();
        rows.sort_by_key(|c| c.created_time);
        rows
    }

    async fn contributor_user_ids(&self, project_id: Uuid) -> Vec<Uuid> {
        self.list_contributors(project_id)
            .await
            .into_iter()
            .map(|c| c.user_id)
            .collect()
    }

    async fn is_contributor(&self, project_id: Uuid, user_id: Uuid) -> bool {
        self.inner
            .read()
            .unwrap()
            .contributors
            .iter()
            .any(|c| c.project_id == project_id && c.user_id == user_id)
    }

    async fn add_contributor(&self, project_id: Uuid, user_id: Uuid) -> bool {
        let mut state = self.inner.write().unwrap();
        let exists = state
            .contributors
            .iter()
            .any(|c| c.project_id == project_id && c.user_id == user_id);
        if exists {
            return false;
        }
        state.contributors.push(Contributor {
            user_id,
            project_id,
            created_time: Utc::now(),
        });
        true
    }

    async fn remove_contributor(&self, project_id: Uuid, user_id: Uuid) -> bool {
        let mut state = self.inner.write().unwrap();
        let before = state.contributors.len();
        state
            .contributors
            .retain(|c| !(c.project_id == project_id && c.user_id == user_id));
        state.contributors.len() < before
    }

    async fn create_issue(&self, issue: Issue) -> Option<Issue> {
        let mut state = self.inner.write().unwrap();
        state.issues.insert(issue.id, issue.clone());
        Some(issue)
    }

    async fn list_issues(&self, project_id: Uuid) -> Vec<Issue> {
        let mut issues: Vec<Issue> = self
            .inner
            .read()
            .unwrap()
            .issues
            .values()
            .filter(|i| i.project_id == project_id)
            .cloned()
            .collect();
        issues.sort_by_key(|i| i.created_time);
        issues
    }

    async fn get_issue(&self, id: Uuid) -> Option<Issue> {
        self.inner.read().unwrap().issues.get(&id).cloned()
    }

    async fn update_issue(&self, id: Uuid, req: UpdateIssueRequest) -> Option<Issue> {
        let mut state = self.inner.write().unwrap();
        let issue = state.issues.get_mut(&id)?;
        if let Some(title) = req.title {
            issue.title = title;
        }
        if let Some(description) = req.description {
            issue.description = description;
        }
        if let Some(priority) = req.priority {
            issue.priority = priority.as_str().to_string();
        }
        if let Some(tag) = req.tag {
            issue.tag = tag.as_str().to_string();
        }
        if let Some(status) = req.status {
            issue.status = status.as_str().to_string();
        }
        issue.updated_time = Utc::now();
        Some(issue.clone())
    }

    async fn delete_issue(&self, id: Uuid) -> bool {
        let mut state = self.inner.write().unwrap();
        if !state.issues.contains_key(&id) {
            return false;
        }
        state.remove_issue_tree(id);
        true
    }

    async fn create_comment(&self, comment: Comment) -> Option<Comment> {
        let mut state = self.inner.write().unwrap();
        if let Some(issue) = state.issues.get_mut(&comment.issue_id) {
            issue.updated_time = Utc::now();
        }
        state.comments.insert(comment.id, comment.clone());
        Some(comment)
    }

    async fn list_comments(&self, issue_id: Uuid) -> Vec<Comment> {
        let mut comments: Vec<Comment> = self
            .inner
            .read()
            .unwrap()
            .comments
            .values()
            .filter(|c| c.issue_id == issue_id)
            .cloned()
            .collect();
        comments.sort_by_key(|c| c.created_time);
        comments
    }

    async fn get_comment(&self, id: Uuid) -> Option<Comment> {
        self.inner.read().unwrap().comments.get(&id).cloned()
    }

    async fn update_comment(&self, id: Uuid, description: String) -> Option<Comment> {
        let mut state = self.inner.write().unwrap();
        let issue_id = {
            let comment = state.comments.get_mut(&id)?;
            comment.description = description;
            comment.updated_time = Utc::now();
            comment.issue_id
        };
        if let Some(issue) = state.issues.get_mut(&issue_id) {
            issue.updated_time = Utc::now();
        }
        state.comments.get(&id).cloned()
    }

    async fn delete_comment(&self, id: Uuid) -> bool {
        self.inner.write().unwrap().comments.remove(&id).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{IssuePriority, IssueStatus, IssueTag, ProjectCategory};

    fn sample_user(name: &str) -> User {
        User {
            id: Uuid::new_v4(),
            username: name.to_string(),
            email: format!("{name}@example.com"),
            password_hash: "$argon2id$stub".to_string(),
            age: 30,
            can_be_contacted: true,
            can_data_be_shared: true,
            created_time: Utc::now(),
        }
    }

    fn sample_project(author_id: Uuid) -> Project {
        Project {
            id: Uuid::new_v4(),
            author_id,
            name: "tracker".to_string(),
            description: "issue tracker".to_string(),
            category: ProjectCategory::BackEnd.as_str().to_string(),
            created_time: Utc::now(),
        }
    }

    fn sample_issue(project_id: Uuid, author_id: Uuid) -> Issue {
        Issue {
            id: Uuid::new_v4(),
            project_id,
            author_id,
            title: "crash".to_string(),
            description: "boom".to_string(),
            status: IssueStatus::Todo.as_str().to_string(),
            priority: IssuePriority::High.as_str().to_string(),
            tag: IssueTag::Bug.as_str().to_string(),
            created_time: Utc::now(),
            updated_time: Utc::now(),
        }
    }

    #[tokio::test]
    async fn duplicate_username_is_rejected() {
        let repo = MemoryRepository::new();
        assert!(repo.create_user(sample_user("alice")).await.is_some());
        let mut dup = sample_user("alice");
        dup.email = "other@example.com".to_string();
        assert!(repo.create_user(dup).await.is_none());
    }

    #[tokio::test]
    async fn contributor_pair_is_unique() {
        let repo = MemoryRepository::new();
        let user = repo.create_user(sample_user("alice")).await.unwrap();
        let project = repo.create_project(sample_project(user.id)).await.unwrap();

        assert!(repo.add_contributor(project.id, user.id).await);
        assert!(!repo.add_contributor(project.id, user.id).await);
        assert_eq!(repo.contributor_user_ids(project.id).await, vec![user.id]);
    }

    #[tokio::test]
    async fn deleting_project_cascades_to_issues_and_comments() {
        let repo = MemoryRepository::new();
        let user = repo.create_user(sample_user("alice")).await.unwrap();
        let project = repo.create_project(sample_project(user.id)).await.unwrap();
        repo.add_contributor(project.id, user.id).await;
        let issue = repo
            .create_issue(sample_issue(project.id, user.id))
            .await
            .unwrap();
        let comment = repo
            .create_comment(Comment {
                id: Uuid::new_v4(),
                issue_id: issue.id,
                author_id: user.id,
                description: "me too".to_string(),
                created_time: Utc::now(),
                updated_time: Utc::now(),
            })
            .await
            .unwrap();

        assert!(repo.delete_project(project.id).await);
        assert!(repo.get_issue(issue.id).await.is_none());
        assert!(repo.get_comment(comment.id).await.is_none());
        assert!(!repo.is_contributor(project.id, user.id).await);
    }

    #[tokio::test]
    async fn comment_touches_parent_issue() {
        let repo = MemoryRepository::new();
        let user = repo.create_user(sample_user("alice")).await.unwrap();
        let project = repo.create_project(sample_project(user.id)).await.unwrap();
        let issue = repo
            .create_issue(sample_issue(project.id, user.id))
            .await
            .unwrap();
        let before = repo.get_issue(issue.id).await.unwrap().updated_time;

        // Sleep so the touch lands on a strictly later timestamp.
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        repo.create_comment(Comment {
            id: Uuid::new_v4(),
            issue_id: issue.id,
            author_id: user.id,
            description: "me too".to_string(),
            created_time: Utc::now(),
            updated_time: Utc::now(),
        })
        .await
        .unwrap();

        let after = repo.get_issue(issue.id).await.unwrap().updated_time;
        assert!(after > before);
    }
}
