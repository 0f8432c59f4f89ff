use uuid::Uuid;

use crate::{
    errors::ApiError,
    models::{Comment, Issue},
    repository::Repository,
};

/// Permission layer
///
/// Two checks cover every protected operation in the system:
/// - authorship: the object's author is the caller (update/delete);
/// - membership: the caller holds a contributor record for the resource's
///   project (retrieve), resolved transitively for issues via their project
///   and for comments via their issue's project.
///
/// Handlers look the resource up first (missing resources are 404 regardless
/// of who asks) and then call into here, so a present-but-foreign resource is
/// a 403.

/// ensure_author
///
/// Authorship check: update/delete are reserved to whoever created the
/// resource.
pub fn ensure_author(author_id: Uuid, caller_id: Uuid) -> Result<(), ApiError> {
    if author_id == caller_id {
        Ok(())
    } else {
        Err(ApiError::Forbidden(
            "only the author may perform this action".to_string(),
        ))
    }
}

/// ensure_contributor
///
/// Membership check against a project's contributor roster.
pub async fn ensure_contributor(
    repo: &dyn Repository,
    project_id: Uuid,
    caller_id: Uuid,
) -> Result<(), ApiError> {
    if repo.is_contributor(project_id, caller_id).await {
        Ok(())
    } else {
        Err(ApiError::Forbidden(
            "you are not a contributor of this project".to_string(),
        ))
    }
}

/// fetch_issue_checked
///
/// Resolves an issue and verifies the caller may see it (membership of the
/// owning project). 404 before 403.
pub async fn fetch_issue_checked(
    repo: &dyn Repository,
    issue_id: Uuid,
    caller_id: Uuid,
) -> Result<Issue, ApiError> {
    let issue = repo
        .get_issue(issue_id)
        .await
        .ok_or_else(|| ApiError::NotFound("issue not found".to_string()))?;
    ensure_contributor(repo, issue.project_id, caller_id).await?;
    Ok(issue)
}

/// fetch_comment_checked
///
/// Resolves a comment and verifies the caller may see it. Membership is
/// resolved transitively: comment -> issue -> project.
pub async fn fetch_comment_checked(
    repo: &dyn Repository,
    comment_id: Uuid,
    caller_id: Uuid,
) -> Result<Comment, ApiError> {
    let comment = repo
        .get_comment(comment_id)
        .await
        .ok_or_else(|| ApiError::NotFound("comment not found".to_string()))?;
    let issue = repo
        .get_issue(comment.issue_id)
        .await
        .ok_or_else(|| ApiError::NotFound("issue not found".to_string()))?;
    ensure_contributor(repo, issue.project_id, caller_id).await?;
    Ok(comment)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::MemoryRepository;
    use chrono::Utc;

    async fn seeded_user(repo: &MemoryRepository, name: &str) -> Uuid {
        let user = crate::models::User {
            id: Uuid::new_v4(),
            username: name.to_string(),
            email: format!("{name}@example.com"),
            password_hash: "$argon2id$stub".to_string(),
            age: 30,
            can_be_contacted: true,
            can_data_be_shared: true,
            created_time: Utc::now(),
        };
        repo.create_user(user).await.unwrap().id
    }

    #[test]
    fn author_check_is_strict_equality() {
        let author = Uuid::new_v4();
        assert!(ensure_author(author, author).is_ok());
        assert!(ensure_author(author, Uuid::new_v4()).is_err());
    }

    #[tokio::test]
    async fn membership_check_consults_the_roster() {
        let repo = MemoryRepository::new();
        let author = seeded_user(&repo, "author").await;
        let outsider = seeded_user(&repo, "outsider").await;

        let project = crate::models::Project {
            id: Uuid::new_v4(),
            author_id: author,
            name: "tracker".to_string(),
            description: "d".to_string(),
            category: crate::models::ProjectCategory::BackEnd.as_str().to_string(),
            created_time: Utc::now(),
        };
        let project = repo.create_project(project).await.unwrap();
        assert!(repo.add_contributor(project.id, author).await);

        assert!(ensure_contributor(&repo, project.id, author).await.is_ok());
        assert!(
            ensure_contributor(&repo, project.id, outsider)
                .await
                .is_err()
        );
    }
}
