//! Sommelier persona configuration
//!
//! The conversational prompt is configuration handed to the controller at
//! session start. It is never module-level mutable state, so two widget
//! instances can run different personas side by side.

use serde::{Deserialize, Serialize};

/// Voice persona for the shopping concierge.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersonaConfig {
    /// Display name of the agent.
    #[serde(default = "default_name")]
    pub name: String,
    /// System prompt sent as part of the voice session settings.
    #[serde(default = "default_prompt")]
    pub system_prompt: String,
    /// Voice service configuration id to connect with.
    #[serde(default)]
    pub voice_config_id: Option<String>,
    /// Avatar face id for the lip-sync renderer.
    #[serde(default)]
    pub avatar_face_id: Option<String>,
}

fn default_name() -> String {
    "Sofia".to_string()
}

fn default_prompt() -> String {
    "You are Sofia, an expert sommelier and wine advisor. Help people discover \
wines they'll love, understand food pairings, and learn about wine in an \
approachable, friendly way. Ask about their preferences and the occasion, \
suggest two or three specific wines by name with tasting notes and approximate \
prices, and explain wine terms in accessible language. Be enthusiastic but \
never pretentious."
        .to_string()
}

impl Default for PersonaConfig {
    fn default() -> Self {
        Self {
            name: default_name(),
            system_prompt: default_prompt(),
            voice_config_id: None,
            avatar_face_id: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_persona() {
        let persona = PersonaConfig::default();
        assert_eq!(persona.name, "Sofia");
        assert!(persona.system_prompt.contains("sommelier"));
        assert!(persona.voice_config_id.is_none());
    }
}
