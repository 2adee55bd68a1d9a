use crate::auth::{Actor, Role};
use crate::models::Comment;

/// Action
///
/// Every operation the resolution layer can perform, from the policy's point
/// of view. Ownership-sensitive actions carry the resource they target so the
/// rule can compare against the actor.
#[derive(Debug, Clone, Copy)]
pub enum Action<'a> {
    /// Listing, fetching, searching articles and reading comments.
    ReadContent,
    CreateArticle,
    DeleteArticle,
    AddComment,
    EditComment(&'a Comment),
    DeleteComment(&'a Comment),
    /// The admin REST listing, which includes unpublished articles.
    ModerateArticles,
    /// The `me` query.
    ReadOwnProfile,
    /// Profile, password, avatar and account-deletion mutations. These only
    /// ever operate on the actor's own record.
    UpdateSelf,
}

/// allow
///
/// The centralized authorization rule table: (actor, action, resource) →
/// allow/deny. Pure function; it never touches storage, and every mutation in
/// the resolution layer consults it instead of inlining role checks.
///
/// | action                         | rule                          |
/// |--------------------------------|-------------------------------|
/// | read content                   | always, including anonymous   |
/// | create/delete article          | admin                         |
/// | moderate (list all) articles   | admin                         |
/// | add comment                    | any authenticated actor       |
/// | edit comment                   | comment owner                 |
/// | delete comment                 | comment owner or admin        |
/// | read own profile / update self | any authenticated actor       |
pub fn allow(actor: Option<&Actor>, action: Action<'_>) -> bool {
    match action {
        Action::ReadContent => true,
        Action::CreateArticle | Action::DeleteArticle | Action::ModerateArticles => {
            matches!(actor, Some(a) if a.role == Role::Admin)
        }
        Action::AddComment | Action::ReadOwnProfile | Action::UpdateSelf => actor.is_some(),
        Action::EditComment(comment) => {
            matches!(actor, Some(a) if a.id == comment.user_id)
        }
        Action::DeleteComment(comment) => {
            matches!(actor, Some(a) if a.id == comment.user_id || a.role == Role::Admin)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn actor(role: Role) -> Actor {
        Actor {
            id: Uuid::new_v4(),
            email: "someone@example.com".to_string(),
            role,
        }
    }

    fn comment_by(user_id: Uuid) -> Comment {
        Comment {
            id: Uuid::new_v4(),
            article_id: Uuid::new_v4(),
            user_id,
            ..Comment::default()
        }
    }

    #[test]
    fn reads_are_open_to_everyone() {
        assert!(allow(None, Action::ReadContent));
        assert!(allow(Some(&actor(Role::Reader)), Action::ReadContent));
        assert!(allow(Some(&actor(Role::Admin)), Action::ReadContent));
    }

    #[test]
    fn article_writes_require_admin() {
        assert!(!allow(None, Action::CreateArticle));
        assert!(!allow(Some(&actor(Role::Reader)), Action::CreateArticle));
        assert!(!allow(Some(&actor(Role::Contributor)), Action::DeleteArticle));
        assert!(allow(Some(&actor(Role::Admin)), Action::CreateArticle));
        assert!(allow(Some(&actor(Role::Admin)), Action::DeleteArticle));
    }

    #[test]
    fn commenting_requires_any_identity() {
        assert!(!allow(None, Action::AddComment));
        assert!(allow(Some(&actor(Role::Reader)), Action::AddComment));
    }

    #[test]
    fn comment_edits_are_owner_only() {
        let owner = actor(Role::Reader);
        let admin = actor(Role::Admin);
        let stranger = actor(Role::Reader);
        let comment = comment_by(owner.id);

        assert!(allow(Some(&owner), Action::EditComment(&comment)));
        assert!(!allow(Some(&stranger), Action::EditComment(&comment)));
        // Editing is personal: even an admin does not rewrite someone's words.
        assert!(!allow(Some(&admin), Action::EditComment(&comment)));
    }

    #[test]
    fn comment_deletion_allows_owner_or_admin() {
        let owner = actor(Role::Reader);
        let admin = actor(Role::Admin);
        let stranger = actor(Role::Contributor);
        let comment = comment_by(owner.id);

        assert!(allow(Some(&owner), Action::DeleteComment(&comment)));
        assert!(allow(Some(&admin), Action::DeleteComment(&comment)));
        assert!(!allow(Some(&stranger), Action::DeleteComment(&comment)));
        assert!(!allow(None, Action::DeleteComment(&comment)));
    }

    #[test]
    fn self_operations_require_identity() {
        assert!(!allow(None, Action::ReadOwnProfile));
        assert!(!allow(None, Action::UpdateSelf));
        assert!(allow(Some(&actor(Role::Reader)), Action::ReadOwnProfile));
        assert!(allow(Some(&actor(Role::Reader)), Action::UpdateSelf));
    }
}
