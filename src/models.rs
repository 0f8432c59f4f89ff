use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use ts_rs::TS;
use utoipa::ToSchema;
use uuid::Uuid;

/// Minimum age accepted at registration. Younger users are rejected with a
/// field-level validation error.
pub const MIN_REGISTRATION_AGE: i32 = 15;

// --- Wire Enums ---

// Request payloads deserialize into these enums so invalid values are
// rejected at the boundary; rows store the canonical kebab-case string
// (`as_str`), which is identical to the wire value.

/// ProjectCategory
///
/// The kind of project being tracked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
#[serde(rename_all = "kebab-case")]
pub enum ProjectCategory {
    #[default]
    BackEnd,
    FrontEnd,
    Ios,
    Android,
}

impl ProjectCategory {
    /// The string stored in the `category` column.
    pub fn as_str(self) -> &'static str {
        match self {
            ProjectCategory::BackEnd => "back-end",
            ProjectCategory::FrontEnd => "front-end",
            ProjectCategory::Ios => "ios",
            ProjectCategory::Android => "android",
        }
    }
}

/// IssueStatus
///
/// Workflow state of an issue. New issues default to `todo`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
#[serde(rename_all = "kebab-case")]
pub enum IssueStatus {
    #[default]
    Todo,
    InProgress,
    Finished,
}

impl IssueStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            IssueStatus::Todo => "todo",
            IssueStatus::InProgress => "in-progress",
            IssueStatus::Finished => "finished",
        }
    }
}

/// IssuePriority
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
#[serde(rename_all = "kebab-case")]
pub enum IssuePriority {
    Low,
    #[default]
    Medium,
    High,
}

impl IssuePriority {
    pub fn as_str(self) -> &'static str {
        match self {
            IssuePriority::Low => "low",
            IssuePriority::Medium => "medium",
            IssuePriority::High => "high",
        }
    }
}

/// IssueTag
///
/// Classifies what kind of work an issue represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
#[serde(rename_all = "kebab-case")]
pub enum IssueTag {
    #[default]
    Bug,
    Feature,
    Task,
}

impl IssueTag {
    pub fn as_str(self) -> &'static str {
        match self {
            IssueTag::Bug => "bug",
            IssueTag::Feature => "feature",
            IssueTag::Task => "task",
        }
    }
}

// --- Core Application Schemas (Mapped to Database) ---

/// User
///
/// The canonical account record from the `users` table. This struct is never
/// serialized directly: all outbound user data goes through [`UserView`] so
/// the privacy flags are honored and the password hash cannot leak.
#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    // Argon2 PHC string. Never serialized, never logged.
    pub password_hash: String,
    pub age: i32,
    // Consent flag: may this user be contacted (controls email visibility).
    pub can_be_contacted: bool,
    // Consent flag: may this user's personal data be shared at all.
    pub can_data_be_shared: bool,
    pub created_time: DateTime<Utc>,
}

/// Project
///
/// A project record from the `projects` table. The contributor roster lives in
/// the `contributors` join table and is attached by [`ProjectView`].
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct Project {
    pub id: Uuid,
    // FK to users.id (the owning author).
    pub author_id: Uuid,
    pub name: String,
    pub description: String,
    // Canonical string of a [`ProjectCategory`].
    pub category: String,
    #[ts(type = "string")]
    pub created_time: DateTime<Utc>,
}

/// Contributor
///
/// Membership record linking a user to a project. Unique per (user, project)
/// pair; the project author always has one.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct Contributor {
    pub user_id: Uuid,
    pub project_id: Uuid,
    #[ts(type = "string")]
    pub created_time: DateTime<Utc>,
}

/// Issue
///
/// An issue filed against a project. The author must hold a contributor record
/// for the project at creation time.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct Issue {
    pub id: Uuid,
    pub project_id: Uuid,
    pub author_id: Uuid,
    pub title: String,
    pub description: String,
    // Canonical strings of [`IssueStatus`], [`IssuePriority`], [`IssueTag`].
    pub status: String,
    pub priority: String,
    pub tag: String,
    #[ts(type = "string")]
    pub created_time: DateTime<Utc>,
    // Advanced whenever the issue itself or one of its comments changes.
    #[ts(type = "string")]
    pub updated_time: DateTime<Utc>,
}

/// Comment
///
/// A comment on an issue. Creating or updating one touches the parent issue's
/// `updated_time`.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct Comment {
    pub id: Uuid,
    pub issue_id: Uuid,
    pub author_id: Uuid,
    pub description: String,
    #[ts(type = "string")]
    pub created_time: DateTime<Utc>,
    #[ts(type = "string")]
    pub updated_time: DateTime<Utc>,
}

// --- Output Schemas (Views) ---

/// UserView
///
/// Privacy-aware projection of a [`User`]. Field visibility depends on the
/// user's own consent flags, not on who is asking:
/// - `email` is present only if the user can be contacted;
/// - for fully private users (`can_data_be_shared == false`), `age`,
///   `can_be_contacted`, and `email` are all omitted.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct UserView {
    pub id: Uuid,
    pub username: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub age: Option<i32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub can_be_contacted: Option<bool>,

    pub can_data_be_shared: bool,

    #[ts(type = "string")]
    pub created_time: DateTime<Utc>,
}

impl UserView {
    /// Applies the privacy flags to produce the serializable projection.
    pub fn from_user(user: &User) -> Self {
        let shareable = user.can_data_be_shared;
        Self {
            id: user.id,
            username: user.username.clone(),
            email: (shareable && user.can_be_contacted).then(|| user.email.clone()),
            age: shareable.then_some(user.age),
            can_be_contacted: shareable.then_some(user.can_be_contacted),
            can_data_be_shared: user.can_data_be_shared,
            created_time: user.created_time,
        }
    }
}

/// ProjectView
///
/// A [`Project`] together with its deduplicated contributor user-id roster,
/// the shape every project endpoint returns.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct ProjectView {
    pub id: Uuid,
    pub author_id: Uuid,
    pub name: String,
    pub description: String,
    pub category: String,
    pub contributors: Vec<Uuid>,
    #[ts(type = "string")]
    pub created_time: DateTime<Utc>,
}

impl ProjectView {
    pub fn from_parts(project: Project, contributors: Vec<Uuid>) -> Self {
        Self {
            id: project.id,
            author_id: project.author_id,
            name: project.name,
            description: project.description,
            category: project.category,
            contributors,
            created_time: project.created_time,
        }
    }
}

// --- Request Payloads (Input Schemas) ---

/// RegisterUserRequest
///
/// Input payload for the public registration endpoint (POST /users).
/// The password pair is checked for equality and the age against
/// [`MIN_REGISTRATION_AGE`] before anything is persisted.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct RegisterUserRequest {
    pub username: String,
    pub email: String,
    pub password: String,
    pub password_confirm: String,
    pub age: i32,
    pub can_be_contacted: bool,
    pub can_data_be_shared: bool,
}

/// UpdateUserRequest
///
/// Partial update payload for a user's own account (PUT /users/{id}).
/// Uses `Option<T>` with `skip_serializing_if` so only provided fields are
/// touched.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct UpdateUserRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub age: Option<i32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub can_be_contacted: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub can_data_be_shared: Option<bool>,
}

/// LoginRequest
///
/// Credentials presented to POST /login.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// TokenPairResponse
///
/// Output of a successful login: a short-lived access token plus a
/// longer-lived refresh token.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct TokenPairResponse {
    pub access: String,
    pub refresh: String,
}

/// RefreshRequest
///
/// Input payload for POST /token/refresh.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct RefreshRequest {
    pub refresh: String,
}

/// AccessTokenResponse
///
/// Output of a successful refresh. Refresh tokens are not rotated.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct AccessTokenResponse {
    pub access: String,
}

/// CreateProjectRequest
///
/// Input payload for submitting a new project (POST /projects). The creator
/// becomes the author and is added to the roster regardless of the supplied
/// contributor list; the list itself is deduplicated and validated.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct CreateProjectRequest {
    pub name: String,
    pub description: String,
    pub category: ProjectCategory,
    #[serde(default)]
    pub contributors: Vec<Uuid>,
}

/// UpdateProjectRequest
///
/// Partial update payload for a project (PUT /projects/{id}). When
/// `contributors` is present the roster is diffed against it (the author is
/// always kept); when absent the roster is left untouched.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct UpdateProjectRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<ProjectCategory>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub contributors: Option<Vec<Uuid>>,
}

/// AddContributorRequest
///
/// Input payload for POST /projects/{id}/contributors.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct AddContributorRequest {
    pub user_id: Uuid,
}

/// CreateIssueRequest
///
/// Input payload for filing a new issue. `status` defaults to `todo` when
/// omitted.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct CreateIssueRequest {
    pub title: String,
    pub description: String,
    pub priority: IssuePriority,
    pub tag: IssueTag,
    #[serde(default)]
    pub status: IssueStatus,
}

/// UpdateIssueRequest
///
/// Partial update payload for an issue (PUT /issues/{id}).
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct UpdateIssueRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<IssuePriority>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub tag: Option<IssueTag>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<IssueStatus>,
}

/// CreateCommentRequest
///
/// Input payload for posting a new comment on an issue.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct CreateCommentRequest {
    pub description: String,
}

/// UpdateCommentRequest
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct UpdateCommentRequest {
    pub description: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(can_be_contacted: bool, can_data_be_shared: bool) -> User {
        User {
            id: Uuid::new_v4(),
            username: "sam".to_string(),
            email: "sam@example.com".to_string(),
            password_hash: "$argon2id$stub".to_string(),
            age: 27,
            can_be_contacted,
            can_data_be_shared,
            created_time: Utc::now(),
        }
    }

    #[test]
    fn contactable_user_exposes_email_and_age() {
        let view = UserView::from_user(&user(true, true));
        assert_eq!(view.email.as_deref(), Some("sam@example.com"));
        assert_eq!(view.age, Some(27));
        assert_eq!(view.can_be_contacted, Some(true));
    }

    #[test]
    fn non_contactable_user_hides_email_only() {
        let view = UserView::from_user(&user(false, true));
        assert!(view.email.is_none());
        assert_eq!(view.age, Some(27));
        assert_eq!(view.can_be_contacted, Some(false));
    }

    #[test]
    fn private_user_hides_email_age_and_contact_flag() {
        let view = UserView::from_user(&user(true, false));
        let json = serde_json::to_value(&view).unwrap();
        assert!(json.get("email").is_none());
        assert!(json.get("age").is_none());
        assert!(json.get("can_be_contacted").is_none());
        // Identity fields always survive.
        assert_eq!(json["username"], "sam");
    }

    #[test]
    fn password_hash_never_reaches_the_wire() {
        let view = UserView::from_user(&user(true, true));
        let json = serde_json::to_string(&view).unwrap();
        assert!(!json.contains("argon2"));
        assert!(!json.contains("password"));
    }

    #[test]
    fn wire_enums_use_kebab_case() {
        assert_eq!(
            serde_json::to_value(ProjectCategory::BackEnd).unwrap(),
            "back-end"
        );
        assert_eq!(
            serde_json::to_value(IssueStatus::InProgress).unwrap(),
            "in-progress"
        );
        assert_eq!(serde_json::to_value(IssuePriority::High).unwrap(), "high");
        assert_eq!(serde_json::to_value(IssueTag::Feature).unwrap(), "feature");
    }

    #[test]
    fn stored_strings_match_wire_values() {
        // Rows persist `as_str()`; it must never drift from the serde name,
        // or stored data would stop matching what clients send and read.
        for category in [
            ProjectCategory::BackEnd,
            ProjectCategory::FrontEnd,
            ProjectCategory::Ios,
            ProjectCategory::Android,
        ] {
            assert_eq!(serde_json::to_value(category).unwrap(), category.as_str());
        }
        for status in [
            IssueStatus::Todo,
            IssueStatus::InProgress,
            IssueStatus::Finished,
        ] {
            assert_eq!(serde_json::to_value(status).unwrap(), status.as_str());
        }
        for priority in [
            IssuePriority::Low,
            IssuePriority::Medium,
            IssuePriority::High,
        ] {
            assert_eq!(serde_json::to_value(priority).unwrap(), priority.as_str());
        }
        for tag in [IssueTag::Bug, IssueTag::Feature, IssueTag::Task] {
            assert_eq!(serde_json::to_value(tag).unwrap(), tag.as_str());
        }
    }

    #[test]
    fn create_issue_status_defaults_to_todo() {
        let req: CreateIssueRequest = serde_json::from_value(serde_json::json!({
            "title": "crash on save",
            "description": "stack trace attached",
            "priority": "high",
            "tag": "bug"
        }))
        .unwrap();
        assert_eq!(req.status, IssueStatus::Todo);
    }
}
