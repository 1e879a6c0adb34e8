use crate::domain::{Difficulty, Language, MAX_ACTIONS, MIN_ACTIONS, MessageEnvelope};

use super::output_validator::habit_series_schema;

pub const DESCRIPTION_MAX_CHARS: usize = 240;
pub const ACTION_NAME_MAX_CHARS: usize = 60;

/// Pure message builders for the three pipeline passes.
///
/// None of these touch the network or validate anything; they only shape
/// the conversation each pass sends to its provider.
pub struct PromptBuilder;

impl PromptBuilder {
    pub fn creative(
        language: Language,
        answers: &[(String, String)],
        assistant_context: Option<&str>,
    ) -> MessageEnvelope {
        let system = format!(
            "You are a habit coach who designs short habit series.
Write every word of your answer in {language_name} ({language_code}), even if the answers below use another language.

Output format (plain text only):
- Exactly one title line.
- Exactly one description of at most {description_max} characters.
- Between {min_actions} and {max_actions} actions. Each action has a name of at most {name_max} characters, a one-sentence description, and a difficulty.
- Difficulty must be one of: {difficulties}.

Do not output JSON, markdown tables, code fences, or any other structural markup.",
            language_name = language.display_name(),
            language_code = language.code(),
            description_max = DESCRIPTION_MAX_CHARS,
            min_actions = MIN_ACTIONS,
            max_actions = MAX_ACTIONS,
            name_max = ACTION_NAME_MAX_CHARS,
            difficulties = Difficulty::labels(),
        );

        let mut user = format!("User answers: {}", flatten_answers(answers));
        if let Some(context) = assistant_context.map(str::trim).filter(|context| !context.is_empty())
        {
            user.push_str("\nAdditional context: ");
            user.push_str(context);
        }

        MessageEnvelope::system_and_user(system, user)
    }

    pub fn structure(language: Language, creative_output: &str) -> MessageEnvelope {
        let system = format!(
            "You consolidate a draft habit series into a stable layout. Keep the content, fix only its shape.
Keep the text in {language_name} ({language_code}).

Use exactly this layout:
Title: <title>
Description: <description, at most {description_max} characters>
Actions:
1. <name> | <one-sentence description> | <difficulty>

List between {min_actions} and {max_actions} actions. Difficulty must be one of: {difficulties}.
If the draft has more actions, keep the first {max_actions}. Do not output JSON or code fences.",
            language_name = language.display_name(),
            language_code = language.code(),
            description_max = DESCRIPTION_MAX_CHARS,
            min_actions = MIN_ACTIONS,
            max_actions = MAX_ACTIONS,
            difficulties = Difficulty::labels(),
        );

        MessageEnvelope::system_and_user(system, format!("Draft:\n{}", creative_output.trim()))
    }

    pub fn normalize(language: Language, structured_output: &str) -> MessageEnvelope {
        let schema = habit_series_schema();
        let system = format!(
            "You convert a habit series into strict JSON.
Return exactly one JSON object and nothing else. Do not output markdown fences, prose, comments, or trailing text.
Keep every string in {language_name}. Difficulty values stay lowercase English labels: {difficulties}.

The object must satisfy this JSON schema:
{schema:#}",
            language_name = language.display_name(),
            difficulties = Difficulty::labels(),
        );

        MessageEnvelope::system_and_user(system, structured_output.trim().to_string())
    }
}

fn flatten_answers(answers: &[(String, String)]) -> String {
    answers
        .iter()
        .map(|(key, value)| format!("{}: {}", key.trim(), value.trim()))
        .collect::<Vec<_>>()
        .join("; ")
}

#[cfg(test)]
mod tests {
    use super::PromptBuilder;
    use crate::domain::{Language, MessageRole};

    fn answers() -> Vec<(String, String)> {
        vec![
            ("habit".to_string(), "reading".to_string()),
            ("time".to_string(), " mornings ".to_string()),
            ("goal".to_string(), "finish one book a month".to_string()),
        ]
    }

    #[test]
    fn creative_flattens_answers_in_input_order() {
        let envelope = PromptBuilder::creative(Language::En, &answers(), None);
        let messages = envelope.messages();

        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, MessageRole::System);
        assert_eq!(messages[1].role, MessageRole::User);
        assert_eq!(
            messages[1].content,
            "User answers: habit: reading; time: mornings; goal: finish one book a month"
        );
    }

    #[test]
    fn creative_system_message_pins_language_and_difficulty_labels() {
        let envelope = PromptBuilder::creative(Language::Es, &answers(), None);
        let system = &envelope.messages()[0].content;

        assert!(system.contains("Spanish (es)"));
        assert!(system.contains("easy, moderate, challenging"));
        assert!(system.contains("Between 3 and 5 actions"));
        assert!(system.contains("Do not output JSON"));
    }

    #[test]
    fn creative_appends_non_blank_assistant_context() {
        let with_context =
            PromptBuilder::creative(Language::En, &answers(), Some("  prefers audiobooks "));
        let blank_context = PromptBuilder::creative(Language::En, &answers(), Some("   "));

        assert!(
            with_context.messages()[1]
                .content
                .ends_with("\nAdditional context: prefers audiobooks")
        );
        assert!(!blank_context.messages()[1].content.contains("Additional context"));
    }

    #[test]
    fn structure_wraps_creative_text_without_requesting_json() {
        let envelope = PromptBuilder::structure(Language::Fr, "  Lire chaque jour\n...  ");
        let messages = envelope.messages();

        assert!(messages[0].content.contains("French (fr)"));
        assert!(messages[0].content.contains("Do not output JSON"));
        assert_eq!(messages[1].content, "Draft:\nLire chaque jour\n...");
    }

    #[test]
    fn normalize_embeds_schema_with_shared_difficulty_enum() {
        let envelope = PromptBuilder::normalize(Language::En, "Title: Read Daily");
        let system = &envelope.messages()[0].content;

        assert!(system.contains("Return exactly one JSON object"));
        assert!(system.contains("\"required\""));
        assert!(system.contains("\"challenging\""));
        assert_eq!(envelope.messages()[1].content, "Title: Read Daily");
    }

    #[test]
    fn builders_are_deterministic() {
        assert_eq!(
            PromptBuilder::creative(Language::De, &answers(), Some("ctx")),
            PromptBuilder::creative(Language::De, &answers(), Some("ctx"))
        );
        assert_eq!(
            PromptBuilder::normalize(Language::It, "x"),
            PromptBuilder::normalize(Language::It, "x")
        );
    }
}
