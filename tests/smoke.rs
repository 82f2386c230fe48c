// ABOUTME: End-to-end smoke test for a full simfeed batch against a real database file.
// ABOUTME: Drives several personas through scripted runs and verifies transcript shape and feed side effects.

use std::sync::Arc;

use serde_json::json;

use simfeed_agent::{BatchOutcome, Orchestrator, Registry};
use simfeed_agent::testing::{StubModelClient, tool_call_json};
use simfeed_store::SocialStore;

const TURN_LIMIT: u32 = 3;

#[tokio::test]
async fn smoke_test_full_batch() {
    // 1. Open a store on a real file in a temp dir.
    let dir = tempfile::TempDir::new().unwrap();
    let store = SocialStore::open(&dir.path().join("simfeed.db")).unwrap();

    // 2. Seed personas and one existing post to interact with.
    let ada = store.insert_persona("ada", "likes compilers").unwrap();
    let brian = store.insert_persona("brian", "likes databases").unwrap();
    let clara = store.insert_persona("clara", "likes networks").unwrap();
    let post = store.create_post(ada, "hello", "first post").unwrap();

    // 3. Every run follows the same script: look, like, then post.
    let script = vec![
        tool_call_json("view_most_recent_posts", vec![], "see the feed"),
        tool_call_json("like_post", vec![json!(post), json!(brian)], "nice post"),
        tool_call_json(
            "create_post",
            vec![json!(clara), json!("thoughts"), json!("networks are fun")],
            "sharing",
        ),
    ];
    let model = Arc::new(StubModelClient::scripted(script));

    // 4. Run one batch across all three personas.
    let orchestrator = Orchestrator::new(
        store.clone(),
        Registry::new().unwrap(),
        model,
        TURN_LIMIT,
    );
    let outcome = orchestrator.run_batch().await.unwrap();

    match outcome {
        BatchOutcome::Completed {
            completed, failed, ..
        } => {
            assert_eq!(completed, 3, "every persona gets a run");
            assert_eq!(failed, 0);
        }
        BatchOutcome::Skipped => panic!("fresh orchestrator must not skip"),
    }

    // 5. The like is recorded once even though the stub cursor is shared
    // across runs and may replay the like turn several times.
    assert_eq!(store.like_count(post, brian).unwrap(), 1);

    // 6. Posts created during the batch show up in the feed, newest first.
    let posts = store.recent_posts(50).unwrap();
    assert!(posts.len() > 1, "batch should have created posts");
    assert!(posts.iter().any(|p| p.title == "thoughts"));
    assert_eq!(posts.last().unwrap().title, "hello", "seed post is oldest");

    // 7. A second trigger works once the first batch has finished.
    let outcome = orchestrator.run_batch().await.unwrap();
    assert!(matches!(outcome, BatchOutcome::Completed { .. }));
}
