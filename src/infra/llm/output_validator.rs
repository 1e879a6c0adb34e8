use serde_json::{Map, Value, json};

use crate::domain::{
    Difficulty, HabitAction, MAX_ACTIONS, MIN_ACTIONS, ValidatedArtifact, ViolationReason,
};

/// JSON schema of a habit series, as requested from the normalization pass.
pub fn habit_series_schema() -> Value {
    let difficulties: Vec<&str> = Difficulty::ALL
        .iter()
        .map(|difficulty| difficulty.label())
        .collect();

    json!({
        "$schema": "https://json-schema.org/draft/2020-12/schema",
        "type": "object",
        "required": ["title", "description", "actions"],
        "properties": {
            "title": { "type": "string", "minLength": 1 },
            "description": { "type": "string", "minLength": 1 },
            "actions": {
                "type": "array",
                "minItems": MIN_ACTIONS,
                "maxItems": MAX_ACTIONS,
                "items": {
                    "type": "object",
                    "required": ["name", "description", "difficulty"],
                    "properties": {
                        "name": { "type": "string", "minLength": 1 },
                        "description": { "type": "string", "minLength": 1 },
                        "difficulty": { "type": "string", "enum": difficulties }
                    }
                }
            }
        }
    })
}

/// Structural gate between untrusted normalization output and the domain.
///
/// Checks run in a fixed order and stop at the first violation, so the same
/// candidate always yields the same reason.
#[derive(Debug, Default, Clone, Copy)]
pub struct OutputValidator;

impl OutputValidator {
    pub fn new() -> Self {
        Self
    }

    pub fn validate(&self, candidate: &Value) -> Result<ValidatedArtifact, ViolationReason> {
        let object = candidate.as_object().ok_or(ViolationReason::NotAnObject)?;

        let title = required_text(object, "title", "title")?;
        let description = required_text(object, "description", "description")?;

        let entries = object
            .get("actions")
            .and_then(Value::as_array)
            .ok_or(ViolationReason::ActionsNotAnArray)?;
        if !(MIN_ACTIONS..=MAX_ACTIONS).contains(&entries.len()) {
            return Err(ViolationReason::ActionCount {
                count: entries.len(),
                min: MIN_ACTIONS,
                max: MAX_ACTIONS,
            });
        }

        let actions = entries
            .iter()
            .enumerate()
            .map(|(index, entry)| validate_action(index, entry))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(ValidatedArtifact::new(title, description, actions))
    }
}

fn validate_action(index: usize, entry: &Value) -> Result<HabitAction, ViolationReason> {
    let action = entry
        .as_object()
        .ok_or(ViolationReason::ActionNotAnObject { index })?;

    let name = required_text(action, "name", &format!("actions[{index}].name"))?;
    let description = required_text(
        action,
        "description",
        &format!("actions[{index}].description"),
    )?;
    let label = required_text(
        action,
        "difficulty",
        &format!("actions[{index}].difficulty"),
    )?;
    let difficulty =
        Difficulty::parse(&label).ok_or_else(|| ViolationReason::UnknownDifficulty {
            index,
            value: label.clone(),
            allowed: Difficulty::labels(),
        })?;

    Ok(HabitAction {
        name,
        description,
        difficulty,
    })
}

fn required_text(
    object: &Map<String, Value>,
    key: &str,
    field_path: &str,
) -> Result<String, ViolationReason> {
    object
        .get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|text| !text.is_empty())
        .map(str::to_string)
        .ok_or_else(|| ViolationReason::empty_string(field_path))
}
