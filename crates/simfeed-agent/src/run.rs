// ABOUTME: One persona's agent run: a seeded transcript driven through a fixed number of turns.
// ABOUTME: Turns are strictly sequential and the ceiling is unconditional, there is no early exit.

use serde_json::{Map, Value, json};
use tracing::warn;

use simfeed_core::{Message, Persona, Transcript};
use simfeed_store::SocialStore;

use crate::dispatch::run_turn;
use crate::model::ModelClient;
use crate::registry::Registry;

pub const DEFAULT_TURN_LIMIT: u32 = 10;

const ROLE_DESCRIPTION: &str = "You are an agent tasked with taking on your given persona and \
    interacting with SimFeed, a social network. You have been given a set of functions you can \
    use to interact with SimFeed. You must stay in character at all times. When responding, use \
    only the provided functions to accomplish tasks. Always respond in the specified JSON format. \
    Start with one of the viewing functions (view_most_recent_posts, view_most_popular_posts, \
    view_most_commented_posts, or view_follows_recent_actions) to see what is happening before \
    you post, like, comment, or follow.";

/// One persona's pass through the simulation. Owns the transcript; the model,
/// registry, and store are shared and borrowed per call.
pub struct AgentRun {
    persona: Persona,
    transcript: Transcript,
    turn_limit: u32,
}

impl AgentRun {
    pub fn new(persona: Persona, registry: &Registry) -> Self {
        Self::with_turn_limit(persona, registry, DEFAULT_TURN_LIMIT)
    }

    pub fn with_turn_limit(persona: Persona, registry: &Registry, turn_limit: u32) -> Self {
        let transcript = Transcript::seeded(seed_message(&persona, registry));
        Self {
            persona,
            transcript,
            turn_limit,
        }
    }

    pub fn persona(&self) -> &Persona {
        &self.persona
    }

    /// Drive the run to its turn ceiling and hand back the finished
    /// transcript. A transport failure consumes its turn: the next turn
    /// starts fresh against the unchanged transcript rather than aborting
    /// the run.
    pub async fn run(
        mut self,
        model: &dyn ModelClient,
        registry: &Registry,
        store: &SocialStore,
    ) -> Transcript {
        for turn in 0..self.turn_limit {
            if let Err(e) = run_turn(model, &mut self.transcript, registry, store).await {
                warn!(
                    persona_id = self.persona.persona_id,
                    turn,
                    error = %e,
                    "model call failed, turn consumed"
                );
            }
        }
        self.transcript
    }

    #[cfg(test)]
    fn transcript(&self) -> &Transcript {
        &self.transcript
    }
}

/// The system message seeding every run: behavior instructions, the persona's
/// own fields with temporal values flattened to text, and the full tool list.
fn seed_message(persona: &Persona, registry: &Registry) -> Message {
    let mut context = Map::new();
    context.insert(
        "role_description".to_string(),
        Value::String(ROLE_DESCRIPTION.to_string()),
    );
    if let Value::Object(fields) = persona.prompt_fields() {
        context.extend(fields);
    }
    context.insert("functions".to_string(), registry.describe());

    Message::system(&json!(context).to_string())
}
