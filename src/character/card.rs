use serde::{Deserialize, Deserializer, Serialize};

/// One interviewable persona from the character list.
///
/// Field names follow the bundled asset: `Personaggio` is the display name and
/// selection key, `guida` the behavioural instructions sent verbatim as the
/// system prompt, `initialMessage` the optional opening line.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CharacterRecord {
    #[serde(rename = "Personaggio")]
    pub name: String,
    #[serde(
        rename = "guida",
        default,
        deserialize_with = "string_or_none",
        skip_serializing_if = "Option::is_none"
    )]
    pub guidance: Option<String>,
    #[serde(
        rename = "initialMessage",
        default,
        deserialize_with = "string_or_none",
        skip_serializing_if = "Option::is_none"
    )]
    pub opening_line: Option<String>,
}

/// Treat a non-string JSON value the same as a missing field.
fn string_or_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(match value {
        serde_json::Value::String(text) => Some(text),
        _ => None,
    })
}

impl CharacterRecord {
    pub fn new(name: impl Into<String>, guidance: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            guidance: Some(guidance.into()),
            opening_line: None,
        }
    }

    pub fn with_opening_line(mut self, line: impl Into<String>) -> Self {
        self.opening_line = Some(line.into());
        self
    }

    /// Build the system prompt for a session with this character
    pub fn build_system_prompt(&self) -> String {
        match &self.guidance {
            Some(guidance) => guidance.clone(),
            None => format!(
                "You are an interviewer and your name is {}. Always answer only with the defined personality.",
                self.name
            ),
        }
    }

    /// Get the first greeting message
    pub fn get_greeting(&self) -> String {
        match &self.opening_line {
            Some(line) => line.clone(),
            None => format!(
                "Hello! I'm ready for the interview. Let's begin! (I'm playing {})",
                self.name
            ),
        }
    }
}
