// ABOUTME: Core library for simfeed, containing the shared domain types.
// ABOUTME: Defines personas, feed entities, and transcript types used across all engine components.

pub mod feed;
pub mod persona;
pub mod transcript;

pub use feed::{ActivityItem, ActivityKind, AuthorKind, Comment, Post, PostAuthor, PostWithComments, PostWithLikes};
pub use persona::Persona;
pub use transcript::{Message, Role, ToolCall, Transcript};
