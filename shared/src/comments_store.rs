//! Threaded comments with soft deletion.

use std::collections::{HashMap, HashSet};

use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::{Deserialize, Serialize};

use crate::{
    db::{now_ms, SharedConnection},
    error::BlogResult,
    BlogError, Comment, CommentNode,
};

/// Shortest accepted comment, in code points after trimming.
pub const COMMENT_MIN_CHARS: usize = 1;
/// Longest accepted comment, in code points after trimming.
pub const COMMENT_MAX_CHARS: usize = 500;
/// Text shown in place of a deleted comment.
pub const DELETED_COMMENT_PLACEHOLDER: &str = "[This comment has been deleted]";

const COMMENT_COLUMNS: &str = "c.id, c.article_id, c.user_id, u.email, c.parent_id, c.content, \
                               c.is_deleted, c.created_at, c.updated_at";

/// Input for [`CommentStore::create`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewCommentInput {
    /// Comment text.
    pub content: String,
    /// Comment being replied to.
    #[serde(default)]
    pub parent_id: Option<i64>,
}

/// Store for article comments.
#[derive(Clone)]
pub struct CommentStore {
    db: SharedConnection,
}

impl CommentStore {
    /// Wraps the shared connection.
    pub fn new(db: SharedConnection) -> Self {
        Self { db }
    }

    /// Adds a comment (or a reply when `parent_id` is set) to an existing
    /// article. The text is trimmed before the length check.
    pub fn create(
        &self,
        article_id: i64,
        user_id: i64,
        input: NewCommentInput,
    ) -> BlogResult<Comment> {
        let content = validate_content(&input.content)?;

        let conn = self.db.lock();
        let article_exists = conn
            .query_row("SELECT 1 FROM articles WHERE id = ?1", params![article_id], |_| Ok(()))
            .optional()?
            .is_some();
        if !article_exists {
            return Err(BlogError::NotFound);
        }

        if let Some(parent_id) = input.parent_id {
            let parent_article: Option<i64> = conn
                .query_row(
                    "SELECT article_id FROM comments WHERE id = ?1",
                    params![parent_id],
                    |row| row.get(0),
                )
                .optional()?;
            if parent_article != Some(article_id) {
                return Err(BlogError::ParentCommentNotFound);
            }
        }

        let now = now_ms();
        conn.execute(
            "INSERT INTO comments (article_id, user_id, parent_id, content, is_deleted, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, 0, ?5, ?5)",
            params![article_id, user_id, input.parent_id, content, now],
        )?;
        let id = conn.last_insert_rowid();
        tracing::debug!(comment_id = id, article_id, user_id, "comment created");

        load_comment(&conn, id)?.ok_or(BlogError::CommentNotFound)
    }

    /// Looks a comment up by id.
    pub fn get(&self, id: i64) -> BlogResult<Option<Comment>> {
        let conn = self.db.lock();
        load_comment(&conn, id)
    }

    /// All comments of an article, oldest first, deleted ones included with
    /// their placeholder text.
    pub fn list_for_article(&self, article_id: i64) -> BlogResult<Vec<Comment>> {
        let conn = self.db.lock();
        let mut stmt = conn.prepare(&format!(
            "SELECT {COMMENT_COLUMNS} FROM comments c
             LEFT JOIN users u ON u.id = c.user_id
             WHERE c.article_id = ?1
             ORDER BY c.created_at ASC, c.id ASC"
        ))?;
        let rows = stmt
            .query_map(params![article_id], comment_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    /// Marks the comment deleted and replaces its text. Replies stay.
    pub fn soft_delete(&self, id: i64) -> BlogResult<Comment> {
        let conn = self.db.lock();
        let changed = conn.execute(
            "UPDATE comments SET is_deleted = 1, content = ?1, updated_at = ?2 WHERE id = ?3",
            params![DELETED_COMMENT_PLACEHOLDER, now_ms(), id],
        )?;
        if changed == 0 {
            return Err(BlogError::CommentNotFound);
        }
        tracing::info!(comment_id = id, "comment soft-deleted");
        load_comment(&conn, id)?.ok_or(BlogError::CommentNotFound)
    }

    /// Like [`CommentStore::soft_delete`], but only for the comment's author.
    pub fn soft_delete_by_owner(&self, id: i64, user_id: i64) -> BlogResult<Comment> {
        let owner = self.get(id)?.ok_or(BlogError::CommentNotFound)?.user_id;
        if owner != user_id {
            return Err(BlogError::NotCommentOwner);
        }
        self.soft_delete(id)
    }
}

/// Nests replies under their parents. Replies whose parent is missing from
/// `comments` are promoted to roots, as is the first comment of any parent
/// cycle. Order within each level follows the input order.
pub fn build_comment_tree(comments: Vec<Comment>) -> Vec<CommentNode> {
    let ids: HashSet<i64> = comments.iter().map(|c| c.id).collect();
    let position: HashMap<i64, usize> = comments
        .iter()
        .enumerate()
        .map(|(index, c)| (c.id, index))
        .collect();

    let mut children: HashMap<i64, Vec<Comment>> = HashMap::new();
    let mut roots = Vec::new();
    for comment in comments {
        match comment.parent_id {
            Some(parent) if parent != comment.id && ids.contains(&parent) => {
                children.entry(parent).or_default().push(comment);
            },
            _ => roots.push(comment),
        }
    }

    let mut tree: Vec<CommentNode> = roots
        .into_iter()
        .map(|comment| attach_replies(comment, &mut children))
        .collect();

    // Whatever is left never reached a root.
    loop {
        let next = children
            .iter()
            .flat_map(|(parent, replies)| {
                replies
                    .iter()
                    .enumerate()
                    .map(move |(index, reply)| (*parent, index, reply.id))
            })
            .min_by_key(|(_, _, id)| position.get(id).copied().unwrap_or(usize::MAX));
        let Some((parent, index, id)) = next else {
            break;
        };
        let Some(bucket) = children.get_mut(&parent) else {
            break;
        };
        let comment = bucket.remove(index);
        if bucket.is_empty() {
            children.remove(&parent);
        }
        tracing::debug!(
            comment_id = id,
            parent_id = parent,
            "promoting comment from a reply cycle"
        );
        tree.push(attach_replies(comment, &mut children));
    }

    tree
}

fn attach_replies(comment: Comment, children: &mut HashMap<i64, Vec<Comment>>) -> CommentNode {
    let replies = children
        .remove(&comment.id)
        .unwrap_or_default()
        .into_iter()
        .map(|reply| attach_replies(reply, children))
        .collect();
    CommentNode { comment, replies }
}

fn validate_content(raw: &str) -> BlogResult<String> {
    let content = raw.trim();
    let len = content.chars().count();
    if len < COMMENT_MIN_CHARS {
        return Err(BlogError::CommentTooShort);
    }
    if len > COMMENT_MAX_CHARS {
        return Err(BlogError::CommentTooLong);
    }
    Ok(content.to_string())
}

fn load_comment(conn: &Connection, id: i64) -> BlogResult<Option<Comment>> {
    Ok(conn
        .query_row(
            &format!(
                "SELECT {COMMENT_COLUMNS} FROM comments c
                 LEFT JOIN users u ON u.id = c.user_id
                 WHERE c.id = ?1"
            ),
            params![id],
            comment_from_row,
        )
        .optional()?)
}

fn comment_from_row(row: &Row<'_>) -> rusqlite::Result<Comment> {
    Ok(Comment {
        id: row.get(0)?,
        article_id: row.get(1)?,
        user_id: row.get(2)?,
        author_email: row.get(3)?,
        parent_id: row.get(4)?,
        content: row.get(5)?,
        is_deleted: row.get::<_, i64>(6)? != 0,
        created_at: row.get(7)?,
        updated_at: row.get(8)?,
    })
}

#[cfg(test)]
mod tests {
    use anyhow::Result;

    use super::{
        build_comment_tree, CommentStore, NewCommentInput, COMMENT_MAX_CHARS,
        DELETED_COMMENT_PLACEHOLDER,
    };
    use crate::{
        article_store::{ArticleInput, ArticleStore},
        db::open_in_memory,
        user_store::{NewUserInput, UserStore},
        BlogError, Comment, CommentNode,
    };

    struct Fixture {
        comments: CommentStore,
        article_id: i64,
        alice: i64,
        bob: i64,
    }

    fn fixture() -> Result<Fixture> {
        let db = open_in_memory()?;
        let users = UserStore::new(db.clone());
        let alice = users
            .create_user(NewUserInput {
                email: "alice@example.com".to_string(),
                ..Default::default()
            })?
            .id;
        let bob = users
            .create_user(NewUserInput {
                email: "bob@example.com".to_string(),
                ..Default::default()
            })?
            .id;
        let article_id = ArticleStore::new(db.clone())
            .create(
                alice,
                ArticleInput {
                    title: "Hello".to_string(),
                    content: "Body".to_string(),
                    ..Default::default()
                },
            )?
            .id;
        Ok(Fixture {
            comments: CommentStore::new(db),
            article_id,
            alice,
            bob,
        })
    }

    fn text(content: &str) -> NewCommentInput {
        NewCommentInput {
            content: content.to_string(),
            parent_id: None,
        }
    }

    #[test]
    fn create_trims_and_validates_length() -> Result<()> {
        let f = fixture()?;
        let comment = f.comments.create(f.article_id, f.alice, text("  nice post \n"))?;
        assert_eq!(comment.content, "nice post");
        assert_eq!(comment.author_email.as_deref(), Some("alice@example.com"));

        assert!(matches!(
            f.comments.create(f.article_id, f.alice, text("   ")),
            Err(BlogError::CommentTooShort)
        ));
        let max = "字".repeat(COMMENT_MAX_CHARS);
        assert!(f.comments.create(f.article_id, f.alice, text(&max)).is_ok());
        assert!(matches!(
            f.comments.create(f.article_id, f.alice, text(&format!("{max}!"))),
            Err(BlogError::CommentTooLong)
        ));
        Ok(())
    }

    #[test]
    fn create_requires_article_and_same_article_parent() -> Result<()> {
        let f = fixture()?;
        assert!(matches!(
            f.comments.create(f.article_id + 100, f.alice, text("hi")),
            Err(BlogError::NotFound)
        ));
        let reply = NewCommentInput {
            content: "reply".to_string(),
            parent_id: Some(999),
        };
        assert!(matches!(
            f.comments.create(f.article_id, f.bob, reply),
            Err(BlogError::ParentCommentNotFound)
        ));
        Ok(())
    }

    #[test]
    fn owner_soft_delete_keeps_replies() -> Result<()> {
        let f = fixture()?;
        let root = f.comments.create(f.article_id, f.alice, text("root"))?;
        f.comments.create(
            f.article_id,
            f.bob,
            NewCommentInput {
                content: "reply".to_string(),
                parent_id: Some(root.id),
            },
        )?;

        assert!(matches!(
            f.comments.soft_delete_by_owner(root.id, f.bob),
            Err(BlogError::NotCommentOwner)
        ));
        let deleted = f.comments.soft_delete_by_owner(root.id, f.alice)?;
        assert!(deleted.is_deleted);
        assert_eq!(deleted.content, DELETED_COMMENT_PLACEHOLDER);
        assert!(matches!(f.comments.soft_delete(12345), Err(BlogError::CommentNotFound)));

        let tree = build_comment_tree(f.comments.list_for_article(f.article_id)?);
        assert_eq!(tree.len(), 1);
        assert!(tree[0].comment.is_deleted);
        assert_eq!(tree[0].replies.len(), 1);
        assert_eq!(tree[0].replies[0].comment.content, "reply");
        Ok(())
    }

    fn comment(id: i64, parent_id: Option<i64>) -> Comment {
        Comment {
            id,
            article_id: 1,
            user_id: 1,
            author_email: None,
            parent_id,
            content: format!("c{id}"),
            is_deleted: false,
            created_at: id,
            updated_at: id,
        }
    }

    #[test]
    fn tree_nests_deeply_and_promotes_orphans() {
        let tree = build_comment_tree(vec![
            comment(1, None),
            comment(2, Some(1)),
            comment(3, Some(2)),
            comment(4, Some(42)),
            comment(5, Some(1)),
        ]);

        let roots: Vec<i64> = tree.iter().map(|n| n.comment.id).collect();
        assert_eq!(roots, vec![1, 4]);
        let replies: Vec<i64> = tree[0].replies.iter().map(|n| n.comment.id).collect();
        assert_eq!(replies, vec![2, 5]);
        assert_eq!(tree[0].replies[0].replies[0].comment.id, 3);
    }

    fn count(nodes: &[CommentNode]) -> usize {
        nodes.iter().map(|n| 1 + count(&n.replies)).sum()
    }

    #[test]
    fn tree_keeps_comments_caught_in_a_parent_cycle() {
        let tree = build_comment_tree(vec![
            comment(1, None),
            comment(2, Some(3)),
            comment(3, Some(2)),
            comment(4, Some(3)),
        ]);

        assert_eq!(count(&tree), 4);
        let roots: Vec<i64> = tree.iter().map(|n| n.comment.id).collect();
        assert_eq!(roots, vec![1, 2]);
        assert_eq!(tree[1].replies[0].comment.id, 3);
        let under_three: Vec<i64> =
            tree[1].replies[0].replies.iter().map(|n| n.comment.id).collect();
        assert_eq!(under_three, vec![4]);
    }
}
