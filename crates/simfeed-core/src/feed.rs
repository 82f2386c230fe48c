// ABOUTME: Feed entity types shared between the store and the action set.
// ABOUTME: Posts, comments, per-follow activity items, and resolved post authors.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A post row. Exactly one of `author` (a simulated persona) and
/// `user_author` (a real user) is populated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Post {
    pub id: i64,
    pub title: String,
    pub body: String,
    pub author: Option<i64>,
    pub user_author: Option<i64>,
    pub created_at: DateTime<Utc>,
}

/// A post together with its like count, for popularity rankings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostWithLikes {
    #[serde(flatten)]
    pub post: Post,
    pub like_count: i64,
}

/// A post together with its comment count, for discussion rankings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostWithComments {
    #[serde(flatten)]
    pub post: Post,
    pub comment_count: i64,
}

/// A comment row. `author_id` is always a persona.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Comment {
    pub id: i64,
    pub post_id: i64,
    pub author_id: i64,
    pub body: String,
    pub created_at: DateTime<Utc>,
}

/// The kind of a followed persona's recent activity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActivityKind {
    Post,
    Comment,
    Like,
}

/// One recent action by a followed persona. For likes, `content` carries
/// the body of the liked post rather than anything the liker wrote.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivityItem {
    pub activity_type: ActivityKind,
    pub activity_id: i64,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

/// Discriminator for the two disjoint author kinds a post can have.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthorKind {
    Persona,
    User,
}

/// A post's resolved author. The identity fields for the kind not matching
/// `author_type` are None.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostAuthor {
    pub author_type: AuthorKind,
    pub persona_id: Option<i64>,
    pub username: Option<String>,
    pub user_id: Option<i64>,
}
