// ABOUTME: The canonical tool registry: one source list driving both name dispatch
// ABOUTME: and the serialized function descriptions injected into agent prompts.

use serde_json::{Value, json};
use thiserror::Error;

/// Every tool an agent can invoke, as a typed tag. Dispatch resolves a
/// model-supplied name to one of these before any handler runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolName {
    ViewMostRecentPosts,
    ViewFollowsRecentActions,
    LikePost,
    CommentOnPost,
    ViewMostPopularPosts,
    ViewMostCommentedPosts,
    ViewCommentsOnPost,
    CreatePost,
    FindPostAuthor,
    UpdateBio,
    FollowUser,
}

impl ToolName {
    pub const ALL: [ToolName; 11] = [
        ToolName::ViewMostRecentPosts,
        ToolName::ViewFollowsRecentActions,
        ToolName::LikePost,
        ToolName::CommentOnPost,
        ToolName::ViewMostPopularPosts,
        ToolName::ViewMostCommentedPosts,
        ToolName::ViewCommentsOnPost,
        ToolName::CreatePost,
        ToolName::FindPostAuthor,
        ToolName::UpdateBio,
        ToolName::FollowUser,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ToolName::ViewMostRecentPosts => "view_most_recent_posts",
            ToolName::ViewFollowsRecentActions => "view_follows_recent_actions",
            ToolName::LikePost => "like_post",
            ToolName::CommentOnPost => "comment_on_post",
            ToolName::ViewMostPopularPosts => "view_most_popular_posts",
            ToolName::ViewMostCommentedPosts => "view_most_commented_posts",
            ToolName::ViewCommentsOnPost => "view_comments_on_post",
            ToolName::CreatePost => "create_post",
            ToolName::FindPostAuthor => "find_post_author",
            ToolName::UpdateBio => "update_bio",
            ToolName::FollowUser => "follow_user",
        }
    }
}

/// Primitive parameter types an action can take from the model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    Id,
    Text,
}

impl ParamKind {
    pub fn label(&self) -> &'static str {
        match self {
            ParamKind::Id => "integer",
            ParamKind::Text => "string",
        }
    }
}

/// One declared parameter of a tool. Parameters are positional: the model
/// sends a plain argument array ordered to match this list.
#[derive(Debug, Clone, Copy)]
pub struct ParamSpec {
    pub name: &'static str,
    pub kind: ParamKind,
}

/// A registry entry: the typed tag plus the description and parameter list
/// shown to the model. The implicit datastore handle is not a parameter.
#[derive(Debug, Clone, Copy)]
pub struct ToolSpec {
    pub tool: ToolName,
    pub description: &'static str,
    pub params: &'static [ParamSpec],
}

const fn id(name: &'static str) -> ParamSpec {
    ParamSpec {
        name,
        kind: ParamKind::Id,
    }
}

const fn text(name: &'static str) -> ParamSpec {
    ParamSpec {
        name,
        kind: ParamKind::Text,
    }
}

/// The single source list. Both `resolve` and `describe` derive from this;
/// there is no second list to fall out of sync.
const TOOLS: &[ToolSpec] = &[
    ToolSpec {
        tool: ToolName::ViewMostRecentPosts,
        description: "Fetch the 25 most recently created posts, newest first. \
            Use this to discover recent activity in the feed.",
        params: &[],
    },
    ToolSpec {
        tool: ToolName::ViewFollowsRecentActions,
        description: "Fetch up to 5 recent posts, 5 recent comments, and 5 recent likes \
            from every persona you follow, merged newest first. Returns an empty mapping \
            if you follow no one.",
        params: &[id("persona_id")],
    },
    ToolSpec {
        tool: ToolName::LikePost,
        description: "Like a post. Liking a post you already liked is a harmless no-op.",
        params: &[id("post_id"), id("persona_id")],
    },
    ToolSpec {
        tool: ToolName::CommentOnPost,
        description: "Write a comment on a post.",
        params: &[id("post_id"), id("persona_id"), text("body")],
    },
    ToolSpec {
        tool: ToolName::ViewMostPopularPosts,
        description: "Fetch the 10 posts with the most likes, most liked first.",
        params: &[],
    },
    ToolSpec {
        tool: ToolName::ViewMostCommentedPosts,
        description: "Fetch the 10 posts with the most comments, most discussed first.",
        params: &[],
    },
    ToolSpec {
        tool: ToolName::ViewCommentsOnPost,
        description: "Fetch all comments on a post, newest first.",
        params: &[id("post_id")],
    },
    ToolSpec {
        tool: ToolName::CreatePost,
        description: "Create a new post with a title and body, authored by you.",
        params: &[id("persona_id"), text("post_title"), text("post_body")],
    },
    ToolSpec {
        tool: ToolName::FindPostAuthor,
        description: "Look up who wrote a post. The author is either a persona or a \
            real user, tagged by an author_type field.",
        params: &[id("post_id")],
    },
    ToolSpec {
        tool: ToolName::UpdateBio,
        description: "Replace your bio. The new bio must be non-empty and at most \
            200 characters.",
        params: &[id("persona_id"), text("updated_bio")],
    },
    ToolSpec {
        tool: ToolName::FollowUser,
        description: "Follow another persona. You cannot follow yourself; re-following \
            is a harmless no-op.",
        params: &[id("persona_id"), id("user_id")],
    },
];

/// Errors raised when the registry's entries diverge from the tool set.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("duplicate tool name in registry: {0}")]
    DuplicateName(&'static str),

    #[error("tool {0} has no registry entry")]
    MissingTool(&'static str),
}

/// The tool registry. Validated once at construction: every `ToolName`
/// variant has exactly one entry, so everything the model is told about is
/// resolvable and everything resolvable is described.
pub struct Registry {
    specs: &'static [ToolSpec],
}

impl Registry {
    pub fn new() -> Result<Self, RegistryError> {
        validate(TOOLS)?;
        Ok(Self { specs: TOOLS })
    }

    /// Look up a tool by its wire name. None means "unknown tool", which the
    /// dispatcher reports back to the model without failing the run.
    pub fn resolve(&self, name: &str) -> Option<&ToolSpec> {
        self.specs.iter().find(|spec| spec.tool.as_str() == name)
    }

    /// The ordered description list injected into every seed prompt.
    pub fn describe(&self) -> Value {
        let entries: Vec<Value> = self
            .specs
            .iter()
            .map(|spec| {
                let params: Vec<Value> = spec
                    .params
                    .iter()
                    .map(|p| json!({"name": p.name, "type": p.kind.label()}))
                    .collect();
                json!({
                    "name": spec.tool.as_str(),
                    "description": spec.description,
                    "parameters": params,
                })
            })
            .collect();
        Value::Array(entries)
    }

    /// All wire names, in registry order. Used for "unknown tool" observations.
    pub fn tool_names(&self) -> Vec<&'static str> {
        self.specs.iter().map(|spec| spec.tool.as_str()).collect()
    }
}

fn validate(specs: &[ToolSpec]) -> Result<(), RegistryError> {
    for (i, spec) in specs.iter().enumerate() {
        if specs[..i].iter().any(|other| other.tool == spec.tool) {
            return Err(RegistryError::DuplicateName(spec.tool.as_str()));
        }
    }
    for tool in ToolName::ALL {
        if !specs.iter().any(|spec| spec.tool == tool) {
            return Err(RegistryError::MissingTool(tool.as_str()));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_constructs_cleanly() {
        let registry = Registry::new().expect("canonical registry must validate");
        assert_eq!(registry.tool_names().len(), ToolName::ALL.len());
    }

    #[test]
    fn resolve_known_and_unknown_names() {
        let registry = Registry::new().unwrap();

        let spec = registry.resolve("like_post").expect("like_post registered");
        assert_eq!(spec.tool, ToolName::LikePost);
        assert_eq!(spec.params.len(), 2);

        assert!(registry.resolve("delete_everything").is_none());
    }

    #[test]
    fn describe_covers_every_resolvable_tool() {
        let registry = Registry::new().unwrap();
        let described = registry.describe();
        let entries = described.as_array().unwrap();

        assert_eq!(entries.len(), ToolName::ALL.len());
        for entry in entries {
            let name = entry["name"].as_str().unwrap();
            assert!(
                registry.resolve(name).is_some(),
                "described tool {name} must be resolvable"
            );
            assert!(!entry["description"].as_str().unwrap().is_empty());
            assert!(entry["parameters"].is_array());
        }
    }

    #[test]
    fn describe_lists_typed_positional_parameters() {
        let registry = Registry::new().unwrap();
        let described = registry.describe();
        let comment = described
            .as_array()
            .unwrap()
            .iter()
            .find(|e| e["name"] == "comment_on_post")
            .unwrap();

        let params = comment["parameters"].as_array().unwrap();
        assert_eq!(params[0]["name"], "post_id");
        assert_eq!(params[0]["type"], "integer");
        assert_eq!(params[2]["name"], "body");
        assert_eq!(params[2]["type"], "string");
    }

    #[test]
    fn validation_rejects_duplicate_entries() {
        let mut specs: Vec<ToolSpec> = TOOLS.to_vec();
        specs.push(specs[0]);

        let err = validate(&specs).unwrap_err();
        assert!(matches!(err, RegistryError::DuplicateName(_)));
    }

    #[test]
    fn validation_rejects_missing_tool() {
        let specs: Vec<ToolSpec> = TOOLS[1..].to_vec();

        let err = validate(&specs).unwrap_err();
        assert!(matches!(err, RegistryError::MissingTool(_)));
        assert!(err.to_string().contains("view_most_recent_posts"));
    }
}
