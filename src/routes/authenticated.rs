use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{delete, get, post, put},
};

/// Authenticated Router Module
///
/// Defines the routes accessible to any user who has passed the
/// authentication layer. Listing and creation need nothing beyond that;
/// retrieval of a specific project (or anything nested under one) needs
/// contributor membership, and update/delete need authorship. Those two
/// checks live in the permission layer and are applied inside the handlers,
/// after the resource has been resolved.
///
/// Every handler here relies on the `AuthUser` extractor middleware being
/// present on the router layer above this module, so each one receives a
/// validated identity for its authorization checks.
pub fn authenticated_routes() -> Router<AppState> {
    Router::<AppState>::new()
        // --- Accounts ---
        // GET /users
        // Privacy-aware account listing; per-user consent flags decide which
        // fields each entry exposes.
        .route("/users", get(handlers::list_users))
        // GET/PUT/DELETE /users/{id}
        // Single-account view plus self-service update/delete. Only the
        // account owner may mutate it.
        .route(
            "/users/{id}",
            get(handlers::get_user)
                .put(handlers::update_user)
                .delete(handlers::delete_user),
        )
        // --- Projects ---
        // GET /projects lists; POST /projects creates (caller becomes
        // author and first contributor).
        .route(
            "/projects",
            get(handlers::list_projects).post(handlers::create_project),
        )
        // GET/PUT/DELETE /projects/{id}
        // Detail for contributors; update/delete for the author only. PUT
        // also resynchronizes the contributor roster when one is supplied.
        .route(
            "/projects/{id}",
            get(handlers::get_project)
                .put(handlers::update_project)
                .delete(handlers::delete_project),
        )
        // --- Contributor roster ---
        .route(
            "/projects/{id}/contributors",
            get(handlers::list_contributors).post(handlers::add_contributor),
        )
        .route(
            "/projects/{id}/contributors/{user_id}",
            delete(handlers::remove_contributor),
        )
        // --- Issues ---
        // Nested list/create under the project; item operations are flat.
        .route(
            "/projects/{id}/issues",
            get(handlers::list_issues).post(handlers::create_issue),
        )
        .route(
            "/issues/{id}",
            get(handlers::get_issue)
                .put(handlers::update_issue)
                .delete(handlers::delete_issue),
        )
        // --- Comments ---
        // Posting or editing a comment also advances the parent issue's
        // updated_time.
        .route(
            "/issues/{id}/comments",
            get(handlers::list_comments).post(handlers::create_comment),
        )
        .route(
            "/comments/{id}",
            get(handlers::get_comment)
                .put(handlers::update_comment)
                .delete(handlers::delete_comment),
        )
}
