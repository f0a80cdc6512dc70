//! Access policy: who may see an article, and who only gets a preview.

use serde::{Deserialize, Serialize};

use crate::ArticleVisibility;

/// Capabilities of an authenticated requester. A guest is `None` wherever a
/// viewer is accepted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Viewer {
    /// Holds the `admin` role.
    pub is_admin: bool,
    /// Holds the `member` role or an unexpired membership.
    pub is_member: bool,
}

impl Viewer {
    /// Plain signed-in user without extra capabilities.
    pub const USER: Viewer = Viewer {
        is_admin: false,
        is_member: false,
    };
    /// Member without admin rights.
    pub const MEMBER: Viewer = Viewer {
        is_admin: false,
        is_member: true,
    };
    /// Administrator.
    pub const ADMIN: Viewer = Viewer {
        is_admin: true,
        is_member: false,
    };
}

fn is_admin(viewer: Option<&Viewer>) -> bool {
    viewer.is_some_and(|v| v.is_admin)
}

/// Whether the article exists at all for this viewer.
pub fn can_view(visibility: ArticleVisibility, viewer: Option<&Viewer>) -> bool {
    match visibility {
        ArticleVisibility::PublicFull | ArticleVisibility::MemberFull => true,
        ArticleVisibility::Hidden | ArticleVisibility::Unrecognized => is_admin(viewer),
    }
}

/// Whether the viewer must receive a preview instead of the full body.
pub fn should_mask(visibility: ArticleVisibility, viewer: Option<&Viewer>) -> bool {
    match visibility {
        ArticleVisibility::PublicFull => false,
        ArticleVisibility::MemberFull => !viewer.is_some_and(|v| v.is_admin || v.is_member),
        // Only admins get past can_view for hidden articles.
        ArticleVisibility::Hidden => false,
        ArticleVisibility::Unrecognized => true,
    }
}
