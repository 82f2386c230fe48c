// ABOUTME: Agent system for simfeed: the tool registry, action set, turn dispatcher,
// ABOUTME: per-persona agent runs, and the concurrent batch orchestrator.

pub mod actions;
pub mod dispatch;
pub mod model;
pub mod orchestrator;
pub mod registry;
pub mod run;
pub mod testing;

pub use dispatch::run_turn;
pub use model::{DeepSeekClient, ModelClient, ModelError};
pub use orchestrator::{BatchOutcome, Orchestrator};
pub use registry::{Registry, RegistryError, ToolName};
pub use run::{AgentRun, DEFAULT_TURN_LIMIT};
