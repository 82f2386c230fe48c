// ABOUTME: SQLite-backed storage for the simfeed social graph.
// ABOUTME: Exposes the SocialStore handle shared by all concurrently running agents.

pub mod social;

pub use social::{SocialStore, StoreError};
