// ABOUTME: The action set: every registry tool mapped onto store operations.
// ABOUTME: Arguments are decoded and validated before any handler runs; failures become status values, never errors.

use serde_json::{Map, Value, json};
use thiserror::Error;

use simfeed_store::SocialStore;

use crate::registry::{ParamKind, ToolSpec};

const RECENT_POSTS_LIMIT: i64 = 25;
const RANKED_POSTS_LIMIT: i64 = 10;
const BIO_MAX_CHARS: usize = 200;

/// A positional argument list that failed validation against the tool's
/// declared parameters. Distinct from "unknown tool": the tool exists, the
/// arguments don't fit it.
#[derive(Debug, Error)]
pub enum ArgError {
    #[error("{tool} expects {expected} argument(s) but got {got}")]
    Count {
        tool: &'static str,
        expected: usize,
        got: usize,
    },

    #[error("{tool} argument '{name}' must be a {expected}")]
    Type {
        tool: &'static str,
        name: &'static str,
        expected: &'static str,
    },
}

/// An argument decoded to its declared primitive type.
#[derive(Debug, Clone)]
enum ArgValue {
    Id(i64),
    Text(String),
}

/// Decode a raw positional argument list against the tool's parameter specs.
/// The underlying handler is never called with raw untyped values.
fn decode_args(spec: &ToolSpec, raw: &[Value]) -> Result<Vec<ArgValue>, ArgError> {
    if raw.len() != spec.params.len() {
        return Err(ArgError::Count {
            tool: spec.tool.as_str(),
            expected: spec.params.len(),
            got: raw.len(),
        });
    }

    let mut decoded = Vec::with_capacity(raw.len());
    for (param, value) in spec.params.iter().zip(raw) {
        let arg = match param.kind {
            ParamKind::Id => value.as_i64().map(ArgValue::Id),
            ParamKind::Text => value.as_str().map(|s| ArgValue::Text(s.to_string())),
        };
        match arg {
            Some(arg) => decoded.push(arg),
            None => {
                return Err(ArgError::Type {
                    tool: spec.tool.as_str(),
                    name: param.name,
                    expected: param.kind.label(),
                });
            }
        }
    }
    Ok(decoded)
}

/// Run one tool against the store. Always returns a result value with a
/// `status` field; validation failures and store failures are encoded in the
/// status so one failed action never aborts the surrounding turn or run.
pub fn run_action(spec: &ToolSpec, raw_args: &[Value], store: &SocialStore) -> Value {
    let args = match decode_args(spec, raw_args) {
        Ok(args) => args,
        Err(e) => return json!({ "status": format!("{e}. Try another action") }),
    };

    use crate::registry::ToolName::*;
    use ArgValue::{Id, Text};

    match (spec.tool, args.as_slice()) {
        (ViewMostRecentPosts, []) => view_most_recent_posts(store),
        (ViewFollowsRecentActions, [Id(persona_id)]) => {
            view_follows_recent_actions(store, *persona_id)
        }
        (LikePost, [Id(post_id), Id(persona_id)]) => like_post(store, *post_id, *persona_id),
        (CommentOnPost, [Id(post_id), Id(persona_id), Text(body)]) => {
            comment_on_post(store, *post_id, *persona_id, body)
        }
        (ViewMostPopularPosts, []) => view_most_popular_posts(store),
        (ViewMostCommentedPosts, []) => view_most_commented_posts(store),
        (ViewCommentsOnPost, [Id(post_id)]) => view_comments_on_post(store, *post_id),
        (CreatePost, [Id(persona_id), Text(title), Text(body)]) => {
            create_post(store, *persona_id, title, body)
        }
        (FindPostAuthor, [Id(post_id)]) => find_post_author(store, *post_id),
        (UpdateBio, [Id(persona_id), Text(bio)]) => update_bio(store, *persona_id, bio),
        (FollowUser, [Id(persona_id), Id(target_id)]) => {
            follow_user(store, *persona_id, *target_id)
        }
        // decode_args guarantees arity and kinds match the spec, so this arm
        // is unreachable in practice; report rather than panic if it isn't.
        _ => json!({ "status": "Invalid arguments. Try another action" }),
    }
}

fn payload<T: serde::Serialize>(value: &T) -> Value {
    serde_json::to_value(value).unwrap_or(Value::Null)
}

fn view_most_recent_posts(store: &SocialStore) -> Value {
    match store.recent_posts(RECENT_POSTS_LIMIT) {
        Ok(posts) => json!({
            "status": "posts successfully fetched",
            "posts_found": payload(&posts),
        }),
        Err(e) => json!({
            "status": format!("failed to fetch recent posts due to {e}. Try another action"),
        }),
    }
}

fn view_follows_recent_actions(store: &SocialStore, persona_id: i64) -> Value {
    let followed = match store.followed_ids(persona_id) {
        Ok(ids) => ids,
        Err(e) => {
            return json!({
                "status": format!("failed to fetch follows due to {e}. Try another action"),
            });
        }
    };

    let mut activity = Map::new();
    for followed_id in followed {
        match store.recent_activity(followed_id) {
            Ok(items) => {
                activity.insert(followed_id.to_string(), payload(&items));
            }
            Err(e) => {
                return json!({
                    "status": format!(
                        "failed to fetch activity for persona {followed_id} due to {e}. Try another action"
                    ),
                });
            }
        }
    }

    json!({
        "status": "follows activity successfully fetched",
        "follows_activity": Value::Object(activity),
    })
}

fn like_post(store: &SocialStore, post_id: i64, persona_id: i64) -> Value {
    match store.like_post(post_id, persona_id) {
        Ok(()) => json!({ "status": format!("{post_id} liked successfully") }),
        Err(e) => json!({
            "status": format!("failed to like post {post_id} due to {e}. Try another action"),
        }),
    }
}

fn comment_on_post(store: &SocialStore, post_id: i64, persona_id: i64, body: &str) -> Value {
    match store.comment_on_post(post_id, persona_id, body) {
        Ok(_) => json!({ "status": format!("{post_id} commented successfully") }),
        Err(e) => json!({
            "status": format!("failed to comment on post {post_id} due to {e}. Try another action"),
        }),
    }
}

fn view_most_popular_posts(store: &SocialStore) -> Value {
    match store.popular_posts(RANKED_POSTS_LIMIT) {
        Ok(posts) => json!({
            "status": "Most popular posts retrieved successfully",
            "posts": payload(&posts),
        }),
        Err(e) => json!({
            "status": format!("failed to retrieve most popular posts due to {e}. Try another action"),
        }),
    }
}

fn view_most_commented_posts(store: &SocialStore) -> Value {
    match store.most_commented_posts(RANKED_POSTS_LIMIT) {
        Ok(posts) => json!({
            "status": "Most commented posts retrieved successfully",
            "posts": payload(&posts),
        }),
        Err(e) => json!({
            "status": format!("failed to retrieve most commented posts due to {e}. Try another action"),
        }),
    }
}

fn view_comments_on_post(store: &SocialStore, post_id: i64) -> Value {
    match store.comments_on_post(post_id) {
        Ok(comments) => json!({
            "status": format!("Successfully fetched all comments for post {post_id}"),
            "comments_found": payload(&comments),
        }),
        Err(e) => json!({
            "status": format!(
                "Failed to fetch all comments for post {post_id} due to {e}. Try another action"
            ),
        }),
    }
}

fn create_post(store: &SocialStore, persona_id: i64, title: &str, body: &str) -> Value {
    match store.create_post(persona_id, title, body) {
        Ok(_) => json!({ "status": "New post created successfully" }),
        Err(e) => json!({
            "status": format!("failed to create post due to {e}. Try another action"),
        }),
    }
}

fn find_post_author(store: &SocialStore, post_id: i64) -> Value {
    match store.post_author(post_id) {
        Ok(Some(author)) => json!({
            "status": "Author information successfully fetched",
            "author_info": payload(&author),
        }),
        Ok(None) => json!({
            "status": format!("No author was found with post_id {post_id}. Try another action"),
        }),
        Err(e) => json!({
            "status": format!("Failed to fetch author information due to {e}. Try another action"),
        }),
    }
}

fn update_bio(store: &SocialStore, persona_id: i64, bio: &str) -> Value {
    // Validation runs before any write touches the store.
    if bio.is_empty() {
        return json!({ "status": "Error. Bio cannot be empty. Try another action" });
    }
    if bio.chars().count() > BIO_MAX_CHARS {
        return json!({
            "status": "Error. Bio cannot be longer than 200 characters. Try another action",
        });
    }

    match store.update_bio(persona_id, bio) {
        Ok(()) => json!({ "status": "Bio updated successfully" }),
        Err(e) => json!({
            "status": format!("Failed to update bio due to {e}. Try another action"),
        }),
    }
}

fn follow_user(store: &SocialStore, persona_id: i64, target_id: i64) -> Value {
    // Self-follow is rejected before the store is touched.
    if persona_id == target_id {
        return json!({ "status": "Error. You cannot follow yourself. Try another action" });
    }

    match store.follow(persona_id, target_id) {
        Ok(()) => json!({ "status": format!("{target_id} followed successfully") }),
        Err(e) => json!({
            "status": format!("failed to follow user {target_id} due to {e}. Try another action"),
        }),
    }
}
