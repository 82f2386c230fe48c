// ABOUTME: The SocialStore: schema bootstrap plus every parameterized query the action set issues.
// ABOUTME: One shared connection, acquired per call and released on completion; each call is its own atomic unit.

use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{Connection, params};
use thiserror::Error;

use simfeed_core::feed::{
    ActivityItem, ActivityKind, AuthorKind, Comment, Post, PostAuthor, PostWithComments,
    PostWithLikes,
};
use simfeed_core::persona::Persona;

/// Errors that can occur during store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("store connection lock poisoned")]
    Poisoned,
}

/// How many recent posts, comments, and likes to surface per followed persona.
const ACTIVITY_PER_KIND: i64 = 5;

/// Shared handle to the social-graph database. Cloning is cheap; all clones
/// use the same underlying connection, acquired per call so no lock spans a
/// turn or a run.
#[derive(Clone)]
pub struct SocialStore {
    conn: Arc<Mutex<Connection>>,
}

impl SocialStore {
    /// Open or create the database at the given path and run schema bootstrap.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        Self::bootstrap(conn)
    }

    /// Open a private in-memory database, for tests.
    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        Self::bootstrap(conn)
    }

    fn bootstrap(conn: Connection) -> Result<Self, StoreError> {
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;

        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS personas (
                persona_id INTEGER PRIMARY KEY AUTOINCREMENT,
                username TEXT NOT NULL UNIQUE,
                bio TEXT NOT NULL DEFAULT '',
                created_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS users (
                user_id INTEGER PRIMARY KEY AUTOINCREMENT,
                username TEXT NOT NULL UNIQUE,
                created_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS posts (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                title TEXT NOT NULL,
                body TEXT NOT NULL,
                author INTEGER REFERENCES personas(persona_id),
                user_author INTEGER REFERENCES users(user_id),
                created_at TEXT NOT NULL,
                CHECK ((author IS NULL) <> (user_author IS NULL))
            );

            CREATE TABLE IF NOT EXISTS comments (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                post_id INTEGER NOT NULL REFERENCES posts(id),
                author_id INTEGER NOT NULL REFERENCES personas(persona_id),
                body TEXT NOT NULL,
                created_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS likes (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                post_id INTEGER NOT NULL REFERENCES posts(id),
                persona_id INTEGER NOT NULL REFERENCES personas(persona_id),
                created_at TEXT NOT NULL,
                UNIQUE (post_id, persona_id)
            );

            CREATE TABLE IF NOT EXISTS follows (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                follower INTEGER NOT NULL REFERENCES personas(persona_id),
                followed INTEGER NOT NULL REFERENCES personas(persona_id),
                created_at TEXT NOT NULL,
                UNIQUE (follower, followed)
            );",
        )?;

        tracing::debug!("social store schema ensured");
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn acquire(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn.lock().map_err(|_| StoreError::Poisoned)
    }

    /// Insert a persona row. Used by the seeding/CRUD layer and by tests;
    /// agent actions never create personas.
    pub fn insert_persona(&self, username: &str, bio: &str) -> Result<i64, StoreError> {
        let conn = self.acquire()?;
        conn.execute(
            "INSERT INTO personas (username, bio, created_at) VALUES (?1, ?2, ?3)",
            params![username, bio, now_text()],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// Insert a real-user row so posts can carry a non-persona author.
    pub fn insert_user(&self, username: &str) -> Result<i64, StoreError> {
        let conn = self.acquire()?;
        conn.execute(
            "INSERT INTO users (username, created_at) VALUES (?1, ?2)",
            params![username, now_text()],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// All personas, in insertion order. Fetched once per batch.
    pub fn list_personas(&self) -> Result<Vec<Persona>, StoreError> {
        let conn = self.acquire()?;
        let mut stmt = conn.prepare(
            "SELECT persona_id, username, bio, created_at FROM personas ORDER BY persona_id",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok(Persona {
                persona_id: row.get(0)?,
                username: row.get(1)?,
                bio: row.get(2)?,
                created_at: parse_timestamp(row.get(3)?)?,
            })
        })?;

        let mut personas = Vec::new();
        for row in rows {
            personas.push(row?);
        }
        Ok(personas)
    }

    /// Insert a persona-authored post with a server-assigned timestamp.
    pub fn create_post(
        &self,
        persona_id: i64,
        title: &str,
        body: &str,
    ) -> Result<i64, StoreError> {
        let conn = self.acquire()?;
        conn.execute(
            "INSERT INTO posts (title, body, author, created_at) VALUES (?1, ?2, ?3, ?4)",
            params![title, body, persona_id, now_text()],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// Insert a real-user-authored post.
    pub fn create_user_post(
        &self,
        user_id: i64,
        title: &str,
        body: &str,
    ) -> Result<i64, StoreError> {
        let conn = self.acquire()?;
        conn.execute(
            "INSERT INTO posts (title, body, user_author, created_at) VALUES (?1, ?2, ?3, ?4)",
            params![title, body, user_id, now_text()],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// Record a like. Double-liking is a silent no-op via the
    /// (post_id, persona_id) uniqueness constraint.
    pub fn like_post(&self, post_id: i64, persona_id: i64) -> Result<(), StoreError> {
        let conn = self.acquire()?;
        conn.execute(
            "INSERT OR IGNORE INTO likes (post_id, persona_id, created_at) VALUES (?1, ?2, ?3)",
            params![post_id, persona_id, now_text()],
        )?;
        Ok(())
    }

    /// Insert a comment. Comments are never deduplicated.
    pub fn comment_on_post(
        &self,
        post_id: i64,
        author_id: i64,
        body: &str,
    ) -> Result<i64, StoreError> {
        let conn = self.acquire()?;
        conn.execute(
            "INSERT INTO comments (post_id, author_id, body, created_at) VALUES (?1, ?2, ?3, ?4)",
            params![post_id, author_id, body, now_text()],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// Record a follow edge. Re-following is a silent no-op. Self-follow
    /// rejection happens in the action layer, before this is reached.
    pub fn follow(&self, follower: i64, followed: i64) -> Result<(), StoreError> {
        let conn = self.acquire()?;
        conn.execute(
            "INSERT OR IGNORE INTO follows (follower, followed, created_at) VALUES (?1, ?2, ?3)",
            params![follower, followed, now_text()],
        )?;
        Ok(())
    }

    /// Overwrite a persona's bio. Length validation happens in the action layer.
    pub fn update_bio(&self, persona_id: i64, bio: &str) -> Result<(), StoreError> {
        let conn = self.acquire()?;
        conn.execute(
            "UPDATE personas SET bio = ?1 WHERE persona_id = ?2",
            params![bio, persona_id],
        )?;
        Ok(())
    }

    /// Fetch a persona's current bio, None if the persona does not exist.
    pub fn persona_bio(&self, persona_id: i64) -> Result<Option<String>, StoreError> {
        let conn = self.acquire()?;
        let mut stmt = conn.prepare("SELECT bio FROM personas WHERE persona_id = ?1")?;
        match stmt.query_row(params![persona_id], |row| row.get::<_, String>(0)) {
            Ok(bio) => Ok(Some(bio)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(StoreError::Sqlite(e)),
        }
    }

    /// The newest posts, capped at `limit`, newest first.
    pub fn recent_posts(&self, limit: i64) -> Result<Vec<Post>, StoreError> {
        let conn = self.acquire()?;
        let mut stmt = conn.prepare(
            "SELECT id, title, body, author, user_author, created_at
             FROM posts ORDER BY created_at DESC, id DESC LIMIT ?1",
        )?;
        let rows = stmt.query_map(params![limit], map_post)?;

        let mut posts = Vec::new();
        for row in rows {
            posts.push(row?);
        }
        Ok(posts)
    }

    /// Posts ranked by like count, highest first, capped at `limit`.
    /// Posts with zero likes still appear.
    pub fn popular_posts(&self, limit: i64) -> Result<Vec<PostWithLikes>, StoreError> {
        let conn = self.acquire()?;
        let mut stmt = conn.prepare(
            "SELECT p.id, p.title, p.body, p.author, p.user_author, p.created_at,
                    COUNT(l.id) AS like_count
             FROM posts p
             LEFT JOIN likes l ON p.id = l.post_id
             GROUP BY p.id
             ORDER BY like_count DESC, p.id DESC
             LIMIT ?1",
        )?;
        let rows = stmt.query_map(params![limit], |row| {
            Ok(PostWithLikes {
                post: map_post(row)?,
                like_count: row.get(6)?,
            })
        })?;

        let mut posts = Vec::new();
        for row in rows {
            posts.push(row?);
        }
        Ok(posts)
    }

    /// Posts ranked by comment count, highest first, capped at `limit`.
    pub fn most_commented_posts(&self, limit: i64) -> Result<Vec<PostWithComments>, StoreError> {
        let conn = self.acquire()?;
        let mut stmt = conn.prepare(
            "SELECT p.id, p.title, p.body, p.author, p.user_author, p.created_at,
                    COUNT(c.id) AS comment_count
             FROM posts p
             LEFT JOIN comments c ON p.id = c.post_id
             GROUP BY p.id
             ORDER BY comment_count DESC, p.id DESC
             LIMIT ?1",
        )?;
        let rows = stmt.query_map(params![limit], |row| {
            Ok(PostWithComments {
                post: map_post(row)?,
                comment_count: row.get(6)?,
            })
        })?;

        let mut posts = Vec::new();
        for row in rows {
            posts.push(row?);
        }
        Ok(posts)
    }

    /// All comments on a post, newest first. Empty when the post has no
    /// comments or does not exist.
    pub fn comments_on_post(&self, post_id: i64) -> Result<Vec<Comment>, StoreError> {
        let conn = self.acquire()?;
        let mut stmt = conn.prepare(
            "SELECT id, post_id, author_id, body, created_at
             FROM comments WHERE post_id = ?1
             ORDER BY created_at DESC, id DESC",
        )?;
        let rows = stmt.query_map(params![post_id], |row| {
            Ok(Comment {
                id: row.get(0)?,
                post_id: row.get(1)?,
                author_id: row.get(2)?,
                body: row.get(3)?,
                created_at: parse_timestamp(row.get(4)?)?,
            })
        })?;

        let mut comments = Vec::new();
        for row in rows {
            comments.push(row?);
        }
        Ok(comments)
    }

    /// Persona ids the given persona follows.
    pub fn followed_ids(&self, persona_id: i64) -> Result<Vec<i64>, StoreError> {
        let conn = self.acquire()?;
        let mut stmt = conn.prepare("SELECT followed FROM follows WHERE follower = ?1")?;
        let rows = stmt.query_map(params![persona_id], |row| row.get::<_, i64>(0))?;

        let mut ids = Vec::new();
        for row in rows {
            ids.push(row?);
        }
        Ok(ids)
    }

    /// One followed persona's recent activity: up to 5 posts, 5 comments,
    /// and 5 likes, merged and ordered newest first. For likes the content
    /// is the liked post's body.
    pub fn recent_activity(&self, persona_id: i64) -> Result<Vec<ActivityItem>, StoreError> {
        let conn = self.acquire()?;
        let mut stmt = conn.prepare(
            "SELECT activity_type, activity_id, content, created_at FROM (
                SELECT 'post' AS activity_type, p.id AS activity_id,
                       p.body AS content, p.created_at AS created_at
                FROM posts p WHERE p.author = ?1
                ORDER BY p.created_at DESC, p.id DESC LIMIT ?2
             )
             UNION ALL
             SELECT activity_type, activity_id, content, created_at FROM (
                SELECT 'comment' AS activity_type, c.id AS activity_id,
                       c.body AS content, c.created_at AS created_at
                FROM comments c WHERE c.author_id = ?1
                ORDER BY c.created_at DESC, c.id DESC LIMIT ?2
             )
             UNION ALL
             SELECT activity_type, activity_id, content, created_at FROM (
                SELECT 'like' AS activity_type, l.id AS activity_id,
                       p.body AS content, l.created_at AS created_at
                FROM likes l JOIN posts p ON l.post_id = p.id
                WHERE l.persona_id = ?1
                ORDER BY l.created_at DESC, l.id DESC LIMIT ?2
             )
             ORDER BY created_at DESC, activity_id DESC",
        )?;
        let rows = stmt.query_map(params![persona_id, ACTIVITY_PER_KIND], |row| {
            let kind: String = row.get(0)?;
            Ok(ActivityItem {
                activity_type: match kind.as_str() {
                    "post" => ActivityKind::Post,
                    "comment" => ActivityKind::Comment,
                    _ => ActivityKind::Like,
                },
                activity_id: row.get(1)?,
                content: row.get(2)?,
                created_at: parse_timestamp(row.get(3)?)?,
            })
        })?;

        let mut items = Vec::new();
        for row in rows {
            items.push(row?);
        }
        Ok(items)
    }

    /// Resolve a post's author, tagging which of the two disjoint author
    /// kinds it is. Ok(None) when the post does not exist.
    pub fn post_author(&self, post_id: i64) -> Result<Option<PostAuthor>, StoreError> {
        let conn = self.acquire()?;
        let mut stmt = conn.prepare(
            "SELECT p.author, per.username, p.user_author
             FROM posts p
             LEFT JOIN personas per ON p.author = per.persona_id
             WHERE p.id = ?1",
        )?;
        let result = stmt.query_row(params![post_id], |row| {
            let persona_id: Option<i64> = row.get(0)?;
            let username: Option<String> = row.get(1)?;
            let user_id: Option<i64> = row.get(2)?;
            Ok((persona_id, username, user_id))
        });

        match result {
            Ok((persona_id, username, user_id)) => {
                let author = if persona_id.is_some() {
                    PostAuthor {
                        author_type: AuthorKind::Persona,
                        persona_id,
                        username,
                        user_id: None,
                    }
                } else {
                    PostAuthor {
                        author_type: AuthorKind::User,
                        persona_id: None,
                        username: None,
                        user_id,
                    }
                };
                Ok(Some(author))
            }
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(StoreError::Sqlite(e)),
        }
    }

    /// Number of like rows for a (post, persona) pair. Used to verify
    /// idempotency from tests and diagnostics.
    pub fn like_count(&self, post_id: i64, persona_id: i64) -> Result<i64, StoreError> {
        let conn = self.acquire()?;
        let count = conn.query_row(
            "SELECT COUNT(*) FROM likes WHERE post_id = ?1 AND persona_id = ?2",
            params![post_id, persona_id],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    /// Number of follow rows for a (follower, followed) pair.
    pub fn follow_count(&self, follower: i64, followed: i64) -> Result<i64, StoreError> {
        let conn = self.acquire()?;
        let count = conn.query_row(
            "SELECT COUNT(*) FROM follows WHERE follower = ?1 AND followed = ?2",
            params![follower, followed],
            |row| row.get(0),
        )?;
        Ok(count)
    }
}

/// Map the common post column prefix (id, title, body, author, user_author,
/// created_at) from a row.
fn map_post(row: &rusqlite::Row<'_>) -> rusqlite::Result<Post> {
    Ok(Post {
        id: row.get(0)?,
        title: row.get(1)?,
        body: row.get(2)?,
        author: row.get(3)?,
        user_author: row.get(4)?,
        created_at: parse_timestamp(row.get(5)?)?,
    })
}

/// Timestamps are stored as fixed-width RFC 3339 text so lexicographic
/// ordering in SQL matches chronological ordering.
fn now_text() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_timestamp(raw: String) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(&raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(5, rusqlite::types::Type::Text, Box::new(e))
        })
}
