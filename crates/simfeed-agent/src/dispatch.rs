// ABOUTME: The turn dispatcher: one model call, one parse, at most one action.
// ABOUTME: Every outcome appends exactly one observation so the transcript grows by two messages per turn.

use serde_json::Value;
use tracing::debug;

use simfeed_core::{Message, ToolCall, Transcript};
use simfeed_store::SocialStore;

use crate::actions::run_action;
use crate::model::{ModelClient, ModelError};
use crate::registry::Registry;

/// Run one turn of the agent loop. The model sees the whole transcript and
/// replies once; the reply is appended verbatim as the assistant message, and
/// whatever happens next (parse failure, unknown tool, executed action) is
/// appended as the observation. Only a transport failure returns Err, and in
/// that case the transcript is left untouched.
pub async fn run_turn(
    model: &dyn ModelClient,
    transcript: &mut Transcript,
    registry: &Registry,
    store: &SocialStore,
) -> Result<(), ModelError> {
    let reply = model.complete(transcript).await?;
    transcript.push(Message::assistant(&reply));

    let observation = observe(&reply, registry, store);
    transcript.push(Message::user(&observation));
    Ok(())
}

/// Parse and act on one raw model reply, producing the observation text.
/// Malformed output never errors out of the turn; the observation tells the
/// model what went wrong so the next turn can correct it.
fn observe(reply: &str, registry: &Registry, store: &SocialStore) -> String {
    let parsed: Value = match serde_json::from_str(reply) {
        Ok(value) => value,
        Err(e) => {
            debug!(error = %e, "model reply failed to parse");
            return "Invalid JSON. Reply with a single tool call in the specified JSON format. \
                Try another action"
                .to_string();
        }
    };

    let Some(object) = parsed.as_object() else {
        return narrative_instruction();
    };

    let Some(function_name) = object.get("function_name").and_then(Value::as_str) else {
        // A reply carrying tool-call fields but no name is a broken tool
        // call; a reply with none of them is the model talking in prose.
        if object.contains_key("arguments") || object.contains_key("reasoning") {
            return invalid_response();
        }
        return narrative_instruction();
    };

    let arguments = object.get("arguments").and_then(Value::as_array);
    let reasoning = object.get("reasoning").and_then(Value::as_str);
    let (Some(arguments), Some(reasoning)) = (arguments, reasoning) else {
        return invalid_response();
    };
    let call = ToolCall {
        function_name: function_name.to_string(),
        arguments: arguments.clone(),
        reasoning: reasoning.to_string(),
    };

    let Some(spec) = registry.resolve(&call.function_name) else {
        return format!(
            "Function {} doesn't exist. Valid functions are: {}. Try another action",
            call.function_name,
            registry.tool_names().join(", ")
        );
    };

    debug!(
        tool = %call.function_name,
        reasoning = %call.reasoning,
        "dispatching tool call"
    );
    run_action(spec, &call.arguments, store).to_string()
}

fn invalid_response() -> String {
    "Invalid response. A tool call must include function_name, arguments, and reasoning. \
        Try another action"
        .to_string()
}

fn narrative_instruction() -> String {
    "You provided narrative text instead of a tool call. Reply with a single tool call in \
        the specified JSON format. Try another action"
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    use crate::testing::{FailingModelClient, StubModelClient, tool_call_json};

    fn setup() -> (SocialStore, Registry, Transcript) {
        (
            SocialStore::open_in_memory().unwrap(),
            Registry::new().unwrap(),
            Transcript::seeded(Message::system("{}")),
        )
    }

    fn last_content(transcript: &Transcript) -> &str {
        &transcript.last().expect("transcript non-empty").content
    }

    #[tokio::test]
    async fn dispatches_a_valid_tool_call() {
        let (store, registry, mut transcript) = setup();
        let persona = store.insert_persona("ada", "").unwrap();
        let post = store.create_post(persona, "t", "b").unwrap();

        let stub = StubModelClient::repeating(&tool_call_json(
            "like_post",
            vec![json!(post), json!(persona)],
            "test dispatch",
        ));

        run_turn(&stub, &mut transcript, &registry, &store)
            .await
            .unwrap();

        assert_eq!(store.like_count(post, persona).unwrap(), 1);
        assert_eq!(transcript.len(), 3, "system + assistant + observation");
        assert!(last_content(&transcript).contains("liked successfully"));
    }

    #[tokio::test]
    async fn unknown_function_name_lists_valid_tools() {
        let (store, registry, mut transcript) = setup();
        let stub = StubModelClient::repeating(&tool_call_json(
            "non_existent_function",
            vec![],
            "testing invalid function",
        ));

        run_turn(&stub, &mut transcript, &registry, &store)
            .await
            .unwrap();

        let observation = last_content(&transcript);
        assert!(observation.contains("doesn't exist"));
        assert!(observation.contains("like_post"));
        assert!(observation.ends_with("Try another action"));
    }

    #[tokio::test]
    async fn missing_function_name_is_invalid_response() {
        let (store, registry, mut transcript) = setup();
        let reply = json!({
            "arguments": [],
            "reasoning": "forgot function name",
        })
        .to_string();
        let stub = StubModelClient::repeating(&reply);

        run_turn(&stub, &mut transcript, &registry, &store)
            .await
            .unwrap();

        assert!(last_content(&transcript).contains("Invalid response"));
    }

    #[tokio::test]
    async fn missing_arguments_is_invalid_response() {
        let (store, registry, mut transcript) = setup();
        let reply = json!({
            "function_name": "view_most_recent_posts",
            "reasoning": "forgot the arguments array",
        })
        .to_string();
        let stub = StubModelClient::repeating(&reply);

        run_turn(&stub, &mut transcript, &registry, &store)
            .await
            .unwrap();

        assert!(last_content(&transcript).contains("Invalid response"));
    }

    #[tokio::test]
    async fn unparseable_reply_is_invalid_json() {
        let (store, registry, mut transcript) = setup();
        let stub = StubModelClient::repeating("{this is not valid json");

        run_turn(&stub, &mut transcript, &registry, &store)
            .await
            .unwrap();

        assert!(last_content(&transcript).contains("Invalid JSON"));
    }

    #[tokio::test]
    async fn narrative_reply_is_rejected_with_instruction() {
        let (store, registry, mut transcript) = setup();
        let reply = json!({
            "response": "Here is a narrative explanation instead of a tool call."
        })
        .to_string();
        let stub = StubModelClient::repeating(&reply);

        run_turn(&stub, &mut transcript, &registry, &store)
            .await
            .unwrap();

        assert!(last_content(&transcript).contains("You provided narrative text"));
    }

    #[tokio::test]
    async fn turn_appends_exactly_two_messages_and_executes_once() {
        let (store, registry, mut transcript) = setup();
        let persona = store.insert_persona("ada", "").unwrap();
        let post = store.create_post(persona, "t", "b").unwrap();

        let stub = StubModelClient::repeating(&tool_call_json(
            "like_post",
            vec![json!(post), json!(persona)],
            "like once",
        ));

        run_turn(&stub, &mut transcript, &registry, &store)
            .await
            .unwrap();

        assert_eq!(store.like_count(post, persona).unwrap(), 1);
        assert_eq!(transcript.len(), 3);
    }

    #[tokio::test]
    async fn bad_argument_types_reject_without_executing() {
        let (store, registry, mut transcript) = setup();
        let persona = store.insert_persona("ada", "").unwrap();
        let post = store.create_post(persona, "t", "b").unwrap();

        let stub = StubModelClient::repeating(&tool_call_json(
            "like_post",
            vec![json!(post.to_string()), json!(persona)],
            "stringly typed id",
        ));

        run_turn(&stub, &mut transcript, &registry, &store)
            .await
            .unwrap();

        assert_eq!(store.like_count(post, persona).unwrap(), 0);
        assert!(last_content(&transcript).contains("must be a integer"));
    }

    #[tokio::test]
    async fn transport_failure_propagates_and_leaves_transcript_untouched() {
        let (store, registry, mut transcript) = setup();

        let result = run_turn(&FailingModelClient, &mut transcript, &registry, &store).await;

        assert!(matches!(result, Err(ModelError::Provider(_))));
        assert_eq!(transcript.len(), 1, "only the seed message remains");
    }
}
