// ABOUTME: Batch orchestrator: fans one agent run per persona out across tasks and waits for all of them.
// ABOUTME: An atomic in-flight guard makes overlapping batch triggers skip instead of stacking.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use futures::future::join_all;
use rand::seq::SliceRandom;
use tracing::{error, info, warn};
use ulid::Ulid;

use simfeed_store::{SocialStore, StoreError};

use crate::model::ModelClient;
use crate::registry::Registry;
use crate::run::AgentRun;

/// What one batch trigger amounted to. A skipped trigger is not a failure;
/// it means the previous batch was still in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchOutcome {
    Skipped,
    Completed {
        batch_id: Ulid,
        completed: usize,
        failed: usize,
    },
}

/// Drives batches of agent runs against a shared store and model client.
/// Cloning is cheap and clones share the in-flight guard, so a clone handed
/// to a scheduler task still refuses to overlap batches.
#[derive(Clone)]
pub struct Orchestrator {
    store: SocialStore,
    registry: Arc<Registry>,
    model: Arc<dyn ModelClient>,
    turn_limit: u32,
    in_flight: Arc<AtomicBool>,
}

impl Orchestrator {
    pub fn new(
        store: SocialStore,
        registry: Registry,
        model: Arc<dyn ModelClient>,
        turn_limit: u32,
    ) -> Self {
        Self {
            store,
            registry: Arc::new(registry),
            model,
            turn_limit,
            in_flight: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Run one batch: every persona gets its own concurrently-progressing
    /// run, shuffled so no persona always acts first on a quiet feed. If the
    /// previous batch has not finished, this trigger is skipped outright.
    pub async fn run_batch(&self) -> Result<BatchOutcome, StoreError> {
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            warn!("previous batch still in flight, skipping this trigger");
            return Ok(BatchOutcome::Skipped);
        }

        let result = self.run_batch_inner().await;
        self.in_flight.store(false, Ordering::SeqCst);
        result
    }

    async fn run_batch_inner(&self) -> Result<BatchOutcome, StoreError> {
        let batch_id = Ulid::new();
        let mut personas = self.store.list_personas()?;
        personas.shuffle(&mut rand::rng());

        info!(batch = %batch_id, personas = personas.len(), "starting batch");

        let handles: Vec<_> = personas
            .into_iter()
            .map(|persona| {
                let store = self.store.clone();
                let registry = Arc::clone(&self.registry);
                let model = Arc::clone(&self.model);
                let turn_limit = self.turn_limit;
                tokio::spawn(async move {
                    let run = AgentRun::with_turn_limit(persona, &registry, turn_limit);
                    run.run(model.as_ref(), &registry, &store).await
                })
            })
            .collect();

        let mut completed = 0;
        let mut failed = 0;
        for outcome in join_all(handles).await {
            match outcome {
                Ok(_transcript) => completed += 1,
                // One panicked run must not take the batch down with it.
                Err(e) => {
                    error!(batch = %batch_id, error = %e, "agent run task failed");
                    failed += 1;
                }
            }
        }

        info!(batch = %batch_id, completed, failed, "batch complete");
        Ok(BatchOutcome::Completed {
            batch_id,
            completed,
            failed,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use async_trait::async_trait;
    use serde_json::json;

    use simfeed_core::Transcript;

    use crate::model::ModelError;
    use crate::testing::{StubModelClient, tool_call_json};

    struct SlowModelClient;

    #[async_trait]
    impl ModelClient for SlowModelClient {
        async fn complete(&self, _transcript: &Transcript) -> Result<String, ModelError> {
            tokio::time::sleep(Duration::from_millis(200)).await;
            Ok(tool_call_json("view_most_recent_posts", vec![], "looking"))
        }
    }

    fn store_with_personas(count: usize) -> SocialStore {
        let store = SocialStore::open_in_memory().unwrap();
        for i in 0..count {
            store.insert_persona(&format!("persona{i}"), "").unwrap();
        }
        store
    }

    #[tokio::test]
    async fn batch_runs_one_agent_per_persona() {
        let store = store_with_personas(3);
        let first = store.list_personas().unwrap()[0].persona_id;
        let model = Arc::new(StubModelClient::repeating(&tool_call_json(
            "create_post",
            vec![json!(first), json!("title"), json!("body")],
            "posting",
        )));

        let orchestrator = Orchestrator::new(store.clone(), Registry::new().unwrap(), model, 2);
        let outcome = orchestrator.run_batch().await.unwrap();

        match outcome {
            BatchOutcome::Completed {
                completed, failed, ..
            } => {
                assert_eq!(completed, 3);
                assert_eq!(failed, 0);
            }
            BatchOutcome::Skipped => panic!("batch unexpectedly skipped"),
        }
        // 3 personas, 2 turns each, every turn creates a post.
        assert_eq!(store.recent_posts(50).unwrap().len(), 6);
    }

    #[tokio::test]
    async fn empty_persona_list_completes_with_zero_runs() {
        let store = SocialStore::open_in_memory().unwrap();
        let model = Arc::new(StubModelClient::repeating("{}"));

        let orchestrator = Orchestrator::new(store, Registry::new().unwrap(), model, 2);
        let outcome = orchestrator.run_batch().await.unwrap();

        assert!(matches!(
            outcome,
            BatchOutcome::Completed {
                completed: 0,
                failed: 0,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn overlapping_trigger_is_skipped() {
        let store = store_with_personas(1);
        let orchestrator =
            Orchestrator::new(store, Registry::new().unwrap(), Arc::new(SlowModelClient), 1);

        let background = orchestrator.clone();
        let slow_batch = tokio::spawn(async move { background.run_batch().await });

        // Give the slow batch time to take the guard.
        tokio::time::sleep(Duration::from_millis(50)).await;
        let overlapping = orchestrator.run_batch().await.unwrap();
        assert_eq!(overlapping, BatchOutcome::Skipped);

        let finished = slow_batch.await.unwrap().unwrap();
        assert!(matches!(finished, BatchOutcome::Completed { .. }));
    }

    #[tokio::test]
    async fn guard_releases_after_batch_finishes() {
        let store = store_with_personas(1);
        let model = Arc::new(StubModelClient::repeating(&tool_call_json(
            "view_most_recent_posts",
            vec![],
            "looking",
        )));
        let orchestrator = Orchestrator::new(store, Registry::new().unwrap(), model, 1);

        for _ in 0..2 {
            let outcome = orchestrator.run_batch().await.unwrap();
            assert!(matches!(outcome, BatchOutcome::Completed { .. }));
        }
    }
}
