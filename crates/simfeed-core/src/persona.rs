// ABOUTME: Defines the Persona struct representing a simulated social-network identity.
// ABOUTME: Persona rows are created by the CRUD layer; the engine only reads them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

/// A simulated identity driven by the model. The engine copies persona
/// fields into each agent run's seed message and never mutates a live
/// Persona value; bio changes go through the `update_bio` action.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Persona {
    pub persona_id: i64,
    pub username: String,
    pub bio: String,
    pub created_at: DateTime<Utc>,
}

impl Persona {
    /// Render the persona's fields as a JSON object suitable for embedding
    /// in a prompt. Temporal fields are flattened to RFC 3339 text since the
    /// seed message is plain serialized text.
    pub fn prompt_fields(&self) -> Value {
        json!({
            "persona_id": self.persona_id,
            "username": self.username,
            "bio": self.bio,
            "created_at": self.created_at.to_rfc3339(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_persona() -> Persona {
        Persona {
            persona_id: 7,
            username: "ada".to_string(),
            bio: "Curious about everything".to_string(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn prompt_fields_flattens_timestamp_to_text() {
        let persona = make_persona();
        let fields = persona.prompt_fields();

        assert_eq!(fields["persona_id"], json!(7));
        assert_eq!(fields["username"], json!("ada"));
        assert!(
            fields["created_at"].is_string(),
            "created_at must be plain text in prompt fields"
        );
    }

    #[test]
    fn persona_round_trips_through_serde() {
        let persona = make_persona();
        let json = serde_json::to_string(&persona).expect("serialize");
        let deser: Persona = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(deser.persona_id, persona.persona_id);
        assert_eq!(deser.username, "ada");
    }
}
