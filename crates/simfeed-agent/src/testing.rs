// ABOUTME: Test utilities for simfeed-agent, including a stub model client.
// ABOUTME: Used in tests to simulate model replies without real API calls.

use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::{Value, json};

use simfeed_core::Transcript;

use crate::model::{ModelClient, ModelError};

/// Build the wire form of a tool call the way a well-behaved model would.
pub fn tool_call_json(function_name: &str, arguments: Vec<Value>, reasoning: &str) -> String {
    json!({
        "function_name": function_name,
        "arguments": arguments,
        "reasoning": reasoning,
    })
    .to_string()
}

/// A stub model client that replays a fixed script of replies.
///
/// Useful in tests to drive a full agent run without making real API calls.
/// When the script runs out the last reply repeats, so a one-entry script
/// behaves as "always reply with this".
pub struct StubModelClient {
    script: Vec<String>,
    cursor: Mutex<usize>,
}

impl StubModelClient {
    /// Create a stub that always returns the given reply text.
    pub fn repeating(reply: &str) -> Self {
        Self::scripted(vec![reply.to_owned()])
    }

    /// Create a stub that replays the given replies in order.
    ///
    /// Panics if the script is empty; a model that never answers is not a
    /// scenario the dispatcher can represent.
    pub fn scripted(script: Vec<String>) -> Self {
        assert!(!script.is_empty(), "stub script must not be empty");
        Self {
            script,
            cursor: Mutex::new(0),
        }
    }
}

#[async_trait]
impl ModelClient for StubModelClient {
    async fn complete(&self, _transcript: &Transcript) -> Result<String, ModelError> {
        let mut cursor = self
            .cursor
            .lock()
            .map_err(|_| ModelError::Provider("stub cursor poisoned".to_string()))?;
        let index = (*cursor).min(self.script.len() - 1);
        *cursor += 1;
        Ok(self.script[index].clone())
    }
}

/// A stub that always fails with a provider error. For exercising the
/// transport-failure path without a network.
pub struct FailingModelClient;

#[async_trait]
impl ModelClient for FailingModelClient {
    async fn complete(&self, _transcript: &Transcript) -> Result<String, ModelError> {
        Err(ModelError::Provider("stub transport failure".to_string()))
    }
}
