use crate::{
    AppState,
    auth::{self, AuthUser, TokenKind},
    errors::ApiError,
    models::{
        self, AccessTokenResponse, AddContributorRequest, Comment, Contributor,
        CreateCommentRequest, CreateIssueRequest, CreateProjectRequest, Issue, LoginRequest,
        MIN_REGISTRATION_AGE, Project, ProjectView, RefreshRequest, RegisterUserRequest,
        TokenPairResponse, UpdateCommentRequest, UpdateIssueRequest, UpdateProjectRequest,
        UpdateUserRequest, UserView,
    },
    permissions::{ensure_author, ensure_contributor, fetch_comment_checked, fetch_issue_checked},
};
use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use chrono::Utc;
use std::collections::HashSet;
use uuid::Uuid;

// --- Helpers ---

/// Assembles the deduplicated desired roster for a project: the supplied
/// user ids plus, always, the author. Every id must name an existing user,
/// otherwise the whole request is rejected with a `contributors` field error.
async fn resolve_roster(
    state: &AppState,
    supplied: &[Uuid],
    author_id: Uuid,
) -> Result<HashSet<Uuid>, ApiError> {
    let mut desired: HashSet<Uuid> = supplied.iter().copied().collect();
    desired.insert(author_id);

    for user_id in &desired {
        if state.repo.get_user(*user_id).await.is_none() {
            return Err(ApiError::validation(
                "contributors",
                format!("unknown user: {user_id}"),
            ));
        }
    }
    Ok(desired)
}

/// Attaches the contributor user-id roster to a project row.
async fn project_view(state: &AppState, project: Project) -> ProjectView {
    let contributors = state.repo.contributor_user_ids(project.id).await;
    ProjectView::from_parts(project, contributors)
}

// --- Auth Handlers ---

/// register_user
///
/// [Public Route] Creates a new account.
///
/// *Validation*: the password pair must match, the age must be at least the
/// registration minimum, and username/email must be unused. All failures are
/// 400s attributed to the offending field.
#[utoipa::path(
    post,
    path = "/users",
    request_body = RegisterUserRequest,
    responses(
        (status = 201, description = "Registered", body = UserView),
        (status = 400, description = "Validation failed")
    )
)]
pub async fn register_user(
    State(state): State<AppState>,
    Json(payload): Json<RegisterUserRequest>,
) -> Result<(StatusCode, Json<UserView>), ApiError> {
    if payload.password != payload.password_confirm {
        return Err(ApiError::validation(
            "password_confirm",
            "passwords do not match",
        ));
    }
    if payload.age < MIN_REGISTRATION_AGE {
        return Err(ApiError::validation(
            "age",
            format!("you must be at least {MIN_REGISTRATION_AGE} years old to register"),
        ));
    }
    if state
        .repo
        .get_user_by_username(&payload.username)
        .await
        .is_some()
    {
        return Err(ApiError::validation("username", "username already taken"));
    }
    if state.repo.get_user_by_email(&payload.email).await.is_some() {
        return Err(ApiError::validation("email", "email already registered"));
    }

    let user = models::User {
        id: Uuid::new_v4(),
        username: payload.username,
        email: payload.email,
        password_hash: auth::hash_password(&payload.password)?,
        age: payload.age,
        can_be_contacted: payload.can_be_contacted,
        can_data_be_shared: payload.can_data_be_shared,
        created_time: Utc::now(),
    };

    // The insert re-checks uniqueness; a concurrent registration of the same
    // name lands here.
    let created = state
        .repo
        .create_user(user)
        .await
        .ok_or_else(|| ApiError::validation("username", "username already taken"))?;

    Ok((StatusCode::CREATED, Json(UserView::from_user(&created))))
}

/// login
///
/// [Public Route] Verifies credentials and returns an access/refresh token
/// pair. Unknown usernames and bad passwords are indistinguishable to the
/// client.
#[utoipa::path(
    post,
    path = "/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Token pair", body = TokenPairResponse),
        (status = 401, description = "Bad credentials")
    )
)]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<TokenPairResponse>, ApiError> {
    let user = state
        .repo
        .get_user_by_username(&payload.username)
        .await
        .ok_or(ApiError::Unauthorized)?;

    if !auth::verify_password(&payload.password, &user.password_hash) {
        return Err(ApiError::Unauthorized);
    }

    Ok(Json(auth::issue_token_pair(user.id, &state.config)?))
}

/// refresh_token
///
/// [Public Route] Exchanges a valid refresh token for a fresh access token.
/// The subject must still exist; access tokens are rejected here.
#[utoipa::path(
    post,
    path = "/token/refresh",
    request_body = RefreshRequest,
    responses(
        (status = 200, description = "New access token", body = AccessTokenResponse),
        (status = 401, description = "Invalid refresh token")
    )
)]
pub async fn refresh_token(
    State(state): State<AppState>,
    Json(payload): Json<RefreshRequest>,
) -> Result<Json<AccessTokenResponse>, ApiError> {
    let claims = auth::decode_token(&payload.refresh, TokenKind::Refresh, &state.config)?;

    // A deleted account must not be able to mint new access tokens.
    state
        .repo
        .get_user(claims.sub)
        .await
        .ok_or(ApiError::Unauthorized)?;

    let access = auth::issue_token(claims.sub, TokenKind::Access, &state.config)?;
    Ok(Json(AccessTokenResponse { access }))
}

// --- User Handlers ---

/// list_users
///
/// [Authenticated Route] Lists all accounts through the privacy-aware view:
/// what each entry exposes is governed by that user's own consent flags.
#[utoipa::path(
    get,
    path = "/users",
    responses((status = 200, description = "Users", body = [UserView]))
)]
pub async fn list_users(
    _caller: AuthUser,
    State(state): State<AppState>,
) -> Json<Vec<UserView>> {
    let users = state.repo.list_users().await;
    Json(users.iter().map(UserView::from_user).collect())
}

/// get_user
///
/// [Authenticated Route] Single-account view, same privacy rules as the
/// listing.
#[utoipa::path(
    get,
    path = "/users/{id}",
    params(("id" = Uuid, Path, description = "User ID")),
    responses(
        (status = 200, description = "User", body = UserView),
        (status = 404, description = "Not Found")
    )
)]
pub async fn get_user(
    _caller: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<UserView>, ApiError> {
    let user = state
        .repo
        .get_user(id)
        .await
        .ok_or_else(|| ApiError::NotFound("user not found".to_string()))?;
    Ok(Json(UserView::from_user(&user)))
}

/// update_user
///
/// [Authenticated Route] Account self-service: only the account owner may
/// change it. Field validation matches registration.
#[utoipa::path(
    put,
    path = "/users/{id}",
    params(("id" = Uuid, Path, description = "User ID")),
    request_body = UpdateUserRequest,
    responses(
        (status = 200, description = "Updated", body = UserView),
        (status = 403, description = "Not Your Account"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn update_user(
    AuthUser { id: caller_id, .. }: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateUserRequest>,
) -> Result<Json<UserView>, ApiError> {
    let existing = state
        .repo
        .get_user(id)
        .await
        .ok_or_else(|| ApiError::NotFound("user not found".to_string()))?;
    ensure_author(existing.id, caller_id)?;

    if let Some(age) = payload.age {
        if age < MIN_REGISTRATION_AGE {
            return Err(ApiError::validation(
                "age",
                format!("you must be at least {MIN_REGISTRATION_AGE} years old"),
            ));
        }
    }
    if let Some(ref username) = payload.username {
        if let Some(other) = state.repo.get_user_by_username(username).await {
            if other.id != id {
                return Err(ApiError::validation("username", "username already taken"));
            }
        }
    }
    if let Some(ref email) = payload.email {
        if let Some(other) = state.repo.get_user_by_email(email).await {
            if other.id != id {
                return Err(ApiError::validation("email", "email already registered"));
            }
        }
    }

    let updated = state
        .repo
        .update_user(id, payload)
        .await
        .ok_or_else(|| ApiError::NotFound("user not found".to_string()))?;
    Ok(Json(UserView::from_user(&updated)))
}

/// delete_user
///
/// [Authenticated Route] Deletes the caller's own account. Everything the
/// account authored goes with it.
#[utoipa::path(
    delete,
    path = "/users/{id}",
    params(("id" = Uuid, Path, description = "User ID")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 403, description = "Not Your Account"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn delete_user(
    AuthUser { id: caller_id, .. }: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    let existing = state
        .repo
        .get_user(id)
        .await
        .ok_or_else(|| ApiError::NotFound("user not found".to_string()))?;
    ensure_author(existing.id, caller_id)?;

    if state.repo.delete_user(id).await {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound("user not found".to_string()))
    }
}

// --- Project Handlers ---

/// list_projects
///
/// [Authenticated Route] Lists every project with its contributor roster.
/// Listing requires authentication only; membership gates the detail view.
#[utoipa::path(
    get,
    path = "/projects",
    responses((status = 200, description = "Projects", body = [ProjectView]))
)]
pub async fn list_projects(
    _caller: AuthUser,
    State(state): State<AppState>,
) -> Json<Vec<ProjectView>> {
    let projects = state.repo.list_projects().await;
    let mut views = Vec::with_capacity(projects.len());
    for project in projects {
        views.push(project_view(&state, project).await);
    }
    Json(views)
}

/// create_project
///
/// [Authenticated Route] Creates a project owned by the caller.
///
/// *Roster*: the caller is added as a contributor regardless of the supplied
/// list; the list is deduplicated and each id must name a real user.
/// Memberships are written individually, no batch guarantee.
#[utoipa::path(
    post,
    path = "/projects",
    request_body = CreateProjectRequest,
    responses(
        (status = 201, description = "Created", body = ProjectView),
        (status = 400, description = "Unknown contributor")
    )
)]
pub async fn create_project(
    AuthUser { id: author_id, .. }: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<CreateProjectRequest>,
) -> Result<(StatusCode, Json<ProjectView>), ApiError> {
    let roster = resolve_roster(&state, &payload.contributors, author_id).await?;

    let project = Project {
        id: Uuid::new_v4(),
        author_id,
        name: payload.name,
        description: payload.description,
        category: payload.category.as_str().to_string(),
        created_time: Utc::now(),
    };
    let project = state
        .repo
        .create_project(project)
        .await
        .ok_or_else(|| ApiError::Internal("project insert failed".to_string()))?;

    for user_id in roster {
        state.repo.add_contributor(project.id, user_id).await;
    }

    Ok((
        StatusCode::CREATED,
        Json(project_view(&state, project).await),
    ))
}

/// get_project
///
/// [Authenticated Route] Project detail, contributors only. A project that
/// exists but is foreign to the caller is a 403, a missing one a 404.
#[utoipa::path(
    get,
    path = "/projects/{id}",
    params(("id" = Uuid, Path, description = "Project ID")),
    responses(
        (status = 200, description = "Found", body = ProjectView),
        (status = 403, description = "Not A Contributor"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn get_project(
    AuthUser { id: caller_id, .. }: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ProjectView>, ApiError> {
    let project = state
        .repo
        .get_project(id)
        .await
        .ok_or_else(|| ApiError::NotFound("project not found".to_string()))?;
    ensure_contributor(state.repo.as_ref(), project.id, caller_id).await?;
    Ok(Json(project_view(&state, project).await))
}

/// update_project
///
/// [Authenticated Route] Author-only partial update. When the payload carries
/// a contributor list, the roster is diffed against it: additions and
/// removals are applied one by one, and the author is kept no matter what
/// the list says.
#[utoipa::path(
    put,
    path = "/projects/{id}",
    params(("id" = Uuid, Path, description = "Project ID")),
    request_body = UpdateProjectRequest,
    responses(
        (status = 200, description = "Updated", body = ProjectView),
        (status = 403, description = "Not The Author"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn update_project(
    AuthUser { id: caller_id, .. }: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateProjectRequest>,
) -> Result<Json<ProjectView>, ApiError> {
    let project = state
        .repo
        .get_project(id)
        .await
        .ok_or_else(|| ApiError::NotFound("project not found".to_string()))?;
    ensure_author(project.author_id, caller_id)?;

    // Validate the new roster before touching anything.
    let desired = match &payload.contributors {
        Some(list) => Some(resolve_roster(&state, list, project.author_id).await?),
        None => None,
    };

    let updated = state
        .repo
        .update_project(id, payload)
        .await
        .ok_or_else(|| ApiError::NotFound("project not found".to_string()))?;

    if let Some(desired) = desired {
        let current: HashSet<Uuid> = state
            .repo
            .contributor_user_ids(id)
            .await
            .into_iter()
            .collect();

        // Applied individually; a failure mid-diff leaves a partial roster.
        for user_id in desired.difference(&current) {
            state.repo.add_contributor(id, *user_id).await;
        }
        for user_id in current.difference(&desired) {
            state.repo.remove_contributor(id, *user_id).await;
        }
    }

    Ok(Json(project_view(&state, updated).await))
}

/// delete_project
///
/// [Authenticated Route] Author-only. Contributors, issues, and comments go
/// with the project.
#[utoipa::path(
    delete,
    path = "/projects/{id}",
    params(("id" = Uuid, Path, description = "Project ID")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 403, description = "Not The Author"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn delete_project(
    AuthUser { id: caller_id, .. }: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    let project = state
        .repo
        .get_project(id)
        .await
        .ok_or_else(|| ApiError::NotFound("project not found".to_string()))?;
    ensure_author(project.author_id, caller_id)?;

    if state.repo.delete_project(id).await {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound("project not found".to_string()))
    }
}

// --- Contributor Handlers ---

/// list_contributors
///
/// [Authenticated Route] Roster of a project, visible to its contributors.
#[utoipa::path(
    get,
    path = "/projects/{id}/contributors",
    params(("id" = Uuid, Path, description = "Project ID")),
    responses(
        (status = 200, description = "Contributors", body = [Contributor]),
        (status = 403, description = "Not A Contributor"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn list_contributors(
    AuthUser { id: caller_id, .. }: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<Contributor>>, ApiError> {
    let project = state
        .repo
        .get_project(id)
        .await
        .ok_or_else(|| ApiError::NotFound("project not found".to_string()))?;
    ensure_contributor(state.repo.as_ref(), project.id, caller_id).await?;
    Ok(Json(state.repo.list_contributors(id).await))
}

/// add_contributor
///
/// [Authenticated Route] Author-only roster management. The user must exist
/// and must not already be on the roster.
#[utoipa::path(
    post,
    path = "/projects/{id}/contributors",
    params(("id" = Uuid, Path, description = "Project ID")),
    request_body = AddContributorRequest,
    responses(
        (status = 201, description = "Added", body = [Contributor]),
        (status = 400, description = "Unknown user or duplicate"),
        (status = 403, description = "Not The Author"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn add_contributor(
    AuthUser { id: caller_id, .. }: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<AddContributorRequest>,
) -> Result<(StatusCode, Json<Vec<Contributor>>), ApiError> {
    let project = state
        .repo
        .get_project(id)
        .await
        .ok_or_else(|| ApiError::NotFound("project not found".to_string()))?;
    ensure_author(project.author_id, caller_id)?;

    if state.repo.get_user(payload.user_id).await.is_none() {
        return Err(ApiError::validation(
            "user_id",
            format!("unknown user: {}", payload.user_id),
        ));
    }
    if !state.repo.add_contributor(id, payload.user_id).await {
        return Err(ApiError::validation(
            "user_id",
            "user is already a contributor",
        ));
    }

    Ok((
        StatusCode::CREATED,
        Json(state.repo.list_contributors(id).await),
    ))
}

/// remove_contributor
///
/// [Authenticated Route] Author-only. The author's own membership cannot be
/// removed; the project invariant keeps the author on the roster for the
/// project's whole lifetime.
#[utoipa::path(
    delete,
    path = "/projects/{id}/contributors/{user_id}",
    params(
        ("id" = Uuid, Path, description = "Project ID"),
        ("user_id" = Uuid, Path, description = "User ID to remove")
    ),
    responses(
        (status = 204, description = "Removed"),
        (status = 400, description = "Cannot remove the author"),
        (status = 403, description = "Not The Author"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn remove_contributor(
    AuthUser { id: caller_id, .. }: AuthUser,
    State(state): State<AppState>,
    Path((id, user_id)): Path<(Uuid, Uuid)>,
) -> Result<StatusCode, ApiError> {
    let project = state
        .repo
        .get_project(id)
        .await
        .ok_or_else(|| ApiError::NotFound("project not found".to_string()))?;
    ensure_author(project.author_id, caller_id)?;

    if user_id == project.author_id {
        return Err(ApiError::validation(
            "user_id",
            "the author cannot be removed from the project",
        ));
    }
    if state.repo.remove_contributor(id, user_id).await {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound("contributor not found".to_string()))
    }
}

// --- Issue Handlers ---

/// list_issues
///
/// [Authenticated Route] Issues of a project, visible to its contributors.
#[utoipa::path(
    get,
    path = "/projects/{id}/issues",
    params(("id" = Uuid, Path, description = "Project ID")),
    responses(
        (status = 200, description = "Issues", body = [Issue]),
        (status = 403, description = "Not A Contributor"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn list_issues(
    AuthUser { id: caller_id, .. }: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<Issue>>, ApiError> {
    let project = state
        .repo
        .get_project(id)
        .await
        .ok_or_else(|| ApiError::NotFound("project not found".to_string()))?;
    ensure_contributor(state.repo.as_ref(), project.id, caller_id).await?;
    Ok(Json(state.repo.list_issues(id).await))
}

/// create_issue
///
/// [Authenticated Route] Files an issue against a project. The membership
/// check doubles as the invariant that issue authors are contributors.
#[utoipa::path(
    post,
    path = "/projects/{id}/issues",
    params(("id" = Uuid, Path, description = "Project ID")),
    request_body = CreateIssueRequest,
    responses(
        (status = 201, description = "Created", body = Issue),
        (status = 403, description = "Not A Contributor"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn create_issue(
    AuthUser { id: caller_id, .. }: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<CreateIssueRequest>,
) -> Result<(StatusCode, Json<Issue>), ApiError> {
    let project = state
        .repo
        .get_project(id)
        .await
        .ok_or_else(|| ApiError::NotFound("project not found".to_string()))?;
    ensure_contributor(state.repo.as_ref(), project.id, caller_id).await?;

    let now = Utc::now();
    let issue = Issue {
        id: Uuid::new_v4(),
        project_id: id,
        author_id: caller_id,
        title: payload.title,
        description: payload.description,
        status: payload.status.as_str().to_string(),
        priority: payload.priority.as_str().to_string(),
        tag: payload.tag.as_str().to_string(),
        created_time: now,
        updated_time: now,
    };
    let issue = state
        .repo
        .create_issue(issue)
        .await
        .ok_or_else(|| ApiError::Internal("issue insert failed".to_string()))?;

    Ok((StatusCode::CREATED, Json(issue)))
}

/// get_issue
///
/// [Authenticated Route] Issue detail; membership is resolved via the
/// issue's project.
#[utoipa::path(
    get,
    path = "/issues/{id}",
    params(("id" = Uuid, Path, description = "Issue ID")),
    responses(
        (status = 200, description = "Found", body = Issue),
        (status = 403, description = "Not A Contributor"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn get_issue(
    AuthUser { id: caller_id, .. }: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Issue>, ApiError> {
    let issue = fetch_issue_checked(state.repo.as_ref(), id, caller_id).await?;
    Ok(Json(issue))
}

/// update_issue
///
/// [Authenticated Route] Author-only partial update; always advances the
/// issue's `updated_time`.
#[utoipa::path(
    put,
    path = "/issues/{id}",
    params(("id" = Uuid, Path, description = "Issue ID")),
    request_body = UpdateIssueRequest,
    responses(
        (status = 200, description = "Updated", body = Issue),
        (status = 403, description = "Not The Author"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn update_issue(
    AuthUser { id: caller_id, .. }: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateIssueRequest>,
) -> Result<Json<Issue>, ApiError> {
    let issue = state
        .repo
        .get_issue(id)
        .await
        .ok_or_else(|| ApiError::NotFound("issue not found".to_string()))?;
    ensure_author(issue.author_id, caller_id)?;

    let updated = state
        .repo
        .update_issue(id, payload)
        .await
        .ok_or_else(|| ApiError::NotFound("issue not found".to_string()))?;
    Ok(Json(updated))
}

/// delete_issue
///
/// [Authenticated Route] Author-only; the issue's comments go with it.
#[utoipa::path(
    delete,
    path = "/issues/{id}",
    params(("id" = Uuid, Path, description = "Issue ID")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 403, description = "Not The Author"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn delete_issue(
    AuthUser { id: caller_id, .. }: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    let issue = state
        .repo
        .get_issue(id)
        .await
        .ok_or_else(|| ApiError::NotFound("issue not found".to_string()))?;
    ensure_author(issue.author_id, caller_id)?;

    if state.repo.delete_issue(id).await {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound("issue not found".to_string()))
    }
}

// --- Comment Handlers ---

/// list_comments
///
/// [Authenticated Route] Comments of an issue, visible to contributors of
/// the issue's project.
#[utoipa::path(
    get,
    path = "/issues/{id}/comments",
    params(("id" = Uuid, Path, description = "Issue ID")),
    responses(
        (status = 200, description = "Comments", body = [Comment]),
        (status = 403, description = "Not A Contributor"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn list_comments(
    AuthUser { id: caller_id, .. }: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<Comment>>, ApiError> {
    let issue = fetch_issue_checked(state.repo.as_ref(), id, caller_id).await?;
    Ok(Json(state.repo.list_comments(issue.id).await))
}

/// create_comment
///
/// [Authenticated Route] Posts a comment on an issue. The write also
/// advances the parent issue's `updated_time`.
#[utoipa::path(
    post,
    path = "/issues/{id}/comments",
    params(("id" = Uuid, Path, description = "Issue ID")),
    request_body = CreateCommentRequest,
    responses(
        (status = 201, description = "Created", body = Comment),
        (status = 403, description = "Not A Contributor"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn create_comment(
    AuthUser { id: caller_id, .. }: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<CreateCommentRequest>,
) -> Result<(StatusCode, Json<Comment>), ApiError> {
    let issue = fetch_issue_checked(state.repo.as_ref(), id, caller_id).await?;

    let now = Utc::now();
    let comment = Comment {
        id: Uuid::new_v4(),
        issue_id: issue.id,
        author_id: caller_id,
        description: payload.description,
        created_time: now,
        updated_time: now,
    };
    let comment = state
        .repo
        .create_comment(comment)
        .await
        .ok_or_else(|| ApiError::Internal("comment insert failed".to_string()))?;

    Ok((StatusCode::CREATED, Json(comment)))
}

/// get_comment
///
/// [Authenticated Route] Comment detail; membership resolved transitively
/// via the issue's project.
#[utoipa::path(
    get,
    path = "/comments/{id}",
    params(("id" = Uuid, Path, description = "Comment ID")),
    responses(
        (status = 200, description = "Found", body = Comment),
        (status = 403, description = "Not A Contributor"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn get_comment(
    AuthUser { id: caller_id, .. }: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Comment>, ApiError> {
    let comment = fetch_comment_checked(state.repo.as_ref(), id, caller_id).await?;
    Ok(Json(comment))
}

/// update_comment
///
/// [Authenticated Route] Author-only rewrite of the comment body; the parent
/// issue's `updated_time` advances too.
#[utoipa::path(
    put,
    path = "/comments/{id}",
    params(("id" = Uuid, Path, description = "Comment ID")),
    request_body = UpdateCommentRequest,
    responses(
        (status = 200, description = "Updated", body = Comment),
        (status = 403, description = "Not The Author"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn update_comment(
    AuthUser { id: caller_id, .. }: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateCommentRequest>,
) -> Result<Json<Comment>, ApiError> {
    let comment = state
        .repo
        .get_comment(id)
        .await
        .ok_or_else(|| ApiError::NotFound("comment not found".to_string()))?;
    ensure_author(comment.author_id, caller_id)?;

    let updated = state
        .repo
        .update_comment(id, payload.description)
        .await
        .ok_or_else(|| ApiError::NotFound("comment not found".to_string()))?;
    Ok(Json(updated))
}

/// delete_comment
///
/// [Authenticated Route] Author-only.
#[utoipa::path(
    delete,
    path = "/comments/{id}",
    params(("id" = Uuid, Path, description = "Comment ID")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 403, description = "Not The Author"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn delete_comment(
    AuthUser { id: caller_id, .. }: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    let comment = state
        .repo
        .get_comment(id)
        .await
        .ok_or_else(|| ApiError::NotFound("comment not found".to_string()))?;
    ensure_author(comment.author_id, caller_id)?;

    if state.repo.delete_comment(id).await {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound("comment not found".to_string()))
    }
}
