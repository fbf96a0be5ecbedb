use crate::embedding::Embedder;
use crate::error::EngineError;
use crate::mental_state::{Changes, MentalState};
use crate::role::{Role, NARRATOR_LABEL};
use crate::trigger::{TriggerFiring, TriggerSet};
use anyhow::{Context, Result};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use tokio::fs;

pub const DEFAULT_PROFILE_PIC: &str = "https://example.com/default.png";

/// In-character instruction appended to every prompt built for `username`.
fn instruction_for(username: &str) -> String {
    format!(
        "Respond solely in the voice of {name} as if messaging live in an online chat. \
Respond according to your mental state (where 0 is the lowest and 10 is the highest per attribute). \
Provide only your final, concise answer, with no greetings, self-introductions, or repetition of prior conversation. \
Do NOT echo instructions, the user's words, or any external context. \
Avoid starting your response with '{name}:' or your own name. \
Stay entirely in character, using only the knowledge and style inherent to your persona. \
Do not speak from the perspective of the Player.",
        name = username
    )
}

/// `order` is free text in most persona files but some authors write a number.
fn deserialize_order<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Order {
        Text(String),
        Number(serde_json::Number),
    }
    Ok(match Order::deserialize(deserializer)? {
        Order::Text(s) => s,
        Order::Number(n) => n.to_string(),
    })
}

// ============================================================================
// Definition (as authored)
// ============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TriggerSpec {
    #[serde(default)]
    pub trigger: Option<String>,
    #[serde(default)]
    pub changes: Changes,
}

/// Persona definition exactly as it appears in the JSON file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PersonaDefinition {
    pub username: Option<String>,
    pub backstory: String,
    pub important_details: String,
    pub system_message: String,
    pub user_message: String,
    pub typing_style: String,
    #[serde(deserialize_with = "deserialize_order")]
    pub order: String,
    pub profile_pic: Option<String>,
    /// Overrides or extends the default attributes. Values are clamped.
    pub mental_state: Option<BTreeMap<String, i32>>,
    pub triggers: Vec<TriggerSpec>,
}

impl PersonaDefinition {
    pub fn from_json(json: &str) -> Result<Self, EngineError> {
        let def: Self = serde_json::from_str(json)
            .map_err(|e| EngineError::config(format!("invalid persona definition: {}", e)))?;
        def.validate()?;
        Ok(def)
    }

    pub fn validate(&self) -> Result<(), EngineError> {
        match self.username.as_deref() {
            Some(name) if !name.trim().is_empty() => {}
            _ => return Err(EngineError::config("persona is missing 'username'")),
        }
        if self.username.as_deref().map(str::trim) == Some(NARRATOR_LABEL) {
            return Err(EngineError::config(format!(
                "username '{}' is reserved for the narrator",
                NARRATOR_LABEL
            )));
        }
        for (i, spec) in self.triggers.iter().enumerate() {
            match spec.trigger.as_deref() {
                Some(text) if !text.trim().is_empty() => {}
                _ => {
                    return Err(EngineError::config(format!(
                        "trigger {} is missing 'trigger' text",
                        i
                    )))
                }
            }
        }
        Ok(())
    }
}

// ============================================================================
// Live persona
// ============================================================================

/// A loaded persona: immutable configuration, embedded triggers, and the one
/// live mental state that mutates over a session.
#[derive(Debug, Clone)]
pub struct Persona {
    username: String,
    backstory: String,
    important_details: String,
    system_message: String,
    user_message: String,
    typing_style: String,
    order: String,
    profile_pic: String,
    instruction: String,
    triggers: TriggerSet,
    mental_state: MentalState,
}

impl Persona {
    /// Validate `def` and embed its triggers once with `embedder`.
    pub fn from_definition(def: PersonaDefinition, embedder: &dyn Embedder) -> Result<Self> {
        def.validate()?;
        let username = def.username.unwrap_or_default();

        let mut mental_state = MentalState::default();
        if let Some(overrides) = &def.mental_state {
            for (name, value) in overrides {
                mental_state.set(name.clone(), *value);
            }
        }

        let triggers = TriggerSet::embed(
            def.triggers
                .iter()
                .map(|t| (t.trigger.as_deref().unwrap_or_default(), &t.changes)),
            embedder,
        )
        .with_context(|| format!("Failed to embed triggers for persona '{}'", username))?;

        tracing::info!(
            "Loaded persona '{}' with {} trigger(s) and {} attribute(s)",
            username,
            triggers.len(),
            mental_state.len()
        );

        Ok(Self {
            instruction: instruction_for(&username),
            username,
            backstory: def.backstory,
            important_details: def.important_details,
            system_message: def.system_message,
            user_message: def.user_message,
            typing_style: def.typing_style,
            order: def.order,
            profile_pic: def
                .profile_pic
                .unwrap_or_else(|| DEFAULT_PROFILE_PIC.to_string()),
            triggers,
            mental_state,
        })
    }

    /// Read a persona JSON file and build it.
    pub async fn load<P: AsRef<Path>>(path: P, embedder: &dyn Embedder) -> Result<Self> {
        let path = path.as_ref();
        let json = fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read persona file: {}", path.display()))?;
        let def = PersonaDefinition::from_json(&json)
            .with_context(|| format!("Failed to load persona: {}", path.display()))?;
        Self::from_definition(def, embedder)
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn role(&self) -> Role {
        Role::participant(self.username.clone())
    }

    pub fn backstory(&self) -> &str {
        &self.backstory
    }

    pub fn important_details(&self) -> &str {
        &self.important_details
    }

    pub fn system_message(&self) -> &str {
        &self.system_message
    }

    pub fn user_message(&self) -> &str {
        &self.user_message
    }

    pub fn typing_style(&self) -> &str {
        &self.typing_style
    }

    pub fn order(&self) -> &str {
        &self.order
    }

    pub fn profile_pic(&self) -> &str {
        &self.profile_pic
    }

    pub fn instruction(&self) -> &str {
        &self.instruction
    }

    pub fn triggers(&self) -> &TriggerSet {
        &self.triggers
    }

    pub fn mental_state(&self) -> &MentalState {
        &self.mental_state
    }

    pub fn update_mental_state(&mut self, changes: &Changes) -> MentalState {
        self.mental_state.update(changes)
    }

    /// Run the trigger set against `embedding`, mutating this persona's state.
    pub fn check_triggers(
        &mut self,
        embedding: &[f32],
        threshold: f32,
    ) -> Result<Vec<TriggerFiring>, EngineError> {
        self.triggers.check(embedding, threshold, &mut self.mental_state)
    }

    /// Extend the backstory, newline-separated; sets it outright when empty.
    pub fn append_to_backstory(&mut self, text: &str) {
        if self.backstory.is_empty() {
            self.backstory = text.to_string();
        } else {
            self.backstory.push('\n');
            self.backstory.push_str(text);
        }
    }

    /// Format the sectioned prompt block handed to the generation collaborator.
    pub fn formatted_context(&self) -> String {
        let state =
            serde_json::to_string(&self.mental_state).unwrap_or_else(|_| "{}".to_string());
        format!(
            "[System Message]\n{}\n\n\
[Persona Backstory]\n{}\n\n\
[Important Details]\n{}\n\n\
[User Message]\n{}\n\n\
[Typing Style]\n{}\n\n\
[Mental State]\n{}\n\n\
[Order]\n{}\n\n\
[Instruction]\n{}\n",
            self.system_message,
            self.backstory,
            self.important_details,
            self.user_message,
            self.typing_style,
            state,
            self.order,
            self.instruction,
        )
    }
}
