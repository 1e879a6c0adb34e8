use crate::domain::{LlmError, PassConfigTable, PassId, PersistencePolicy};
use crate::infra::llm::read_env_var;

const ENV_CREATIVE_MODEL: &str = "HABITLOOM_CREATIVE_MODEL";
const ENV_STRUCTURE_MODEL: &str = "HABITLOOM_STRUCTURE_MODEL";
const ENV_NORMALIZE_MODEL: &str = "HABITLOOM_NORMALIZE_MODEL";
const ENV_FINAL_PASS: &str = "HABITLOOM_FINAL_PASS";

/// Pass table and persistence designation, with environment overrides.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PipelineConfig {
    pub passes: PassConfigTable,
    pub persistence: PersistencePolicy,
}

impl PipelineConfig {
    pub fn from_env() -> Result<Self, LlmError> {
        Self::from_lookup(read_env_var)
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, LlmError>
    where
        F: Fn(&str) -> Result<Option<String>, LlmError>,
    {
        let mut passes = PassConfigTable::default();
        for (pass, name) in [
            (PassId::Creative, ENV_CREATIVE_MODEL),
            (PassId::Structure, ENV_STRUCTURE_MODEL),
            (PassId::Normalize, ENV_NORMALIZE_MODEL),
        ] {
            if let Some(model_id) = lookup(name)? {
                passes = passes.with_model(pass, model_id.trim());
            }
        }

        let persistence = match lookup(ENV_FINAL_PASS)? {
            Some(value) => PersistencePolicy::new(parse_final_pass(value.trim())?),
            None => PersistencePolicy::default(),
        };

        Ok(Self {
            passes,
            persistence,
        })
    }
}

fn parse_final_pass(value: &str) -> Result<PassId, LlmError> {
    match PassId::parse(value) {
        Some(pass @ (PassId::Structure | PassId::Normalize)) => Ok(pass),
        _ => Err(LlmError::validation(format!(
            "{ENV_FINAL_PASS} must be '{}' or '{}' (got '{value}')",
            PassId::Structure.as_str(),
            PassId::Normalize.as_str()
        ))),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::PipelineConfig;
    use crate::domain::{LlmError, PassId, PersistencePolicy};

    fn config_from(pairs: &[(&str, &str)]) -> Result<PipelineConfig, LlmError> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(name, value)| (name.to_string(), value.to_string()))
            .collect();
        PipelineConfig::from_lookup(|name| Ok(vars.get(name).cloned()))
    }

    #[test]
    fn defaults_apply_without_overrides() {
        let config = config_from(&[]).expect("empty environment should load");

        assert_eq!(config, PipelineConfig::default());
        assert_eq!(config.passes.get(PassId::Creative).model_id, "gpt-4o-mini");
        assert_eq!(config.persistence.final_pass(), PassId::Structure);
    }

    #[test]
    fn model_overrides_replace_only_the_model_id() {
        let config = config_from(&[("HABITLOOM_NORMALIZE_MODEL", " gpt-4o ")])
            .expect("override should load");
        let normalize = config.passes.get(PassId::Normalize);

        assert_eq!(normalize.model_id, "gpt-4o");
        assert_eq!(normalize.temperature, 0.0);
        assert!(normalize.force_strict_json);
        assert_eq!(
            config.passes.get(PassId::Structure).model_id,
            "gemini-2.5-flash"
        );
    }

    #[test]
    fn final_pass_accepts_structure_or_normalize_only() {
        let normalize = config_from(&[("HABITLOOM_FINAL_PASS", "json_conversion")])
            .expect("json_conversion should be accepted");
        assert_eq!(normalize.persistence, PersistencePolicy::new(PassId::Normalize));

        let error = config_from(&[("HABITLOOM_FINAL_PASS", "habit_series_creative")])
            .expect_err("creative pass cannot be final");
        assert!(matches!(
            error,
            LlmError::Validation { message }
            if message.starts_with("HABITLOOM_FINAL_PASS must be 'habit_series_structure'")
        ));
    }
}
