use super::{PassConfig, PassId};

/// Pass whose content is domain-final unless configured otherwise.
pub const DEFAULT_FINAL_PASS: PassId = PassId::Structure;

const CREATIVE_MODEL: &str = "gpt-4o-mini";
const STRUCTURE_MODEL: &str = "gemini-2.5-flash";
const NORMALIZE_MODEL: &str = "gemini-2.5-flash";

/// True only for the structure pass. Normalization is a transform of the
/// structure pass content, not a final pass of its own.
pub fn is_final(pass: PassId) -> bool {
    pass == DEFAULT_FINAL_PASS
}

pub fn config_for(pass: PassId) -> PassConfig {
    match pass {
        PassId::Creative => PassConfig {
            model_id: CREATIVE_MODEL.to_string(),
            temperature: 0.9,
            max_output_tokens: 1200,
            force_strict_json: false,
        },
        PassId::Structure => PassConfig {
            model_id: STRUCTURE_MODEL.to_string(),
            temperature: 0.3,
            max_output_tokens: 1000,
            force_strict_json: false,
        },
        PassId::Normalize => PassConfig {
            model_id: NORMALIZE_MODEL.to_string(),
            temperature: 0.0,
            max_output_tokens: 800,
            force_strict_json: true,
        },
    }
}

/// Decides whether an artifact derived from `origin` content may be persisted.
/// Without an explicit designation the domain rule in [`is_final`] applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PersistencePolicy {
    final_pass: Option<PassId>,
}

impl PersistencePolicy {
    pub fn new(final_pass: PassId) -> Self {
        Self {
            final_pass: Some(final_pass),
        }
    }

    pub fn final_pass(&self) -> PassId {
        self.final_pass.unwrap_or(DEFAULT_FINAL_PASS)
    }

    pub fn is_persist_eligible(&self, origin: PassId) -> bool {
        match self.final_pass {
            Some(final_pass) => origin == final_pass,
            None => is_final(origin),
        }
    }
}

/// Per-pass configuration resolved once per pipeline run.
#[derive(Debug, Clone, PartialEq)]
pub struct PassConfigTable {
    creative: PassConfig,
    structure: PassConfig,
    normalize: PassConfig,
}

impl PassConfigTable {
    pub fn get(&self, pass: PassId) -> &PassConfig {
        match pass {
            PassId::Creative => &self.creative,
            PassId::Structure => &self.structure,
            PassId::Normalize => &self.normalize,
        }
    }

    pub fn with_model(mut self, pass: PassId, model_id: impl Into<String>) -> Self {
        let config = match pass {
            PassId::Creative => &mut self.creative,
            PassId::Structure => &mut self.structure,
            PassId::Normalize => &mut self.normalize,
        };
        config.model_id = model_id.into();
        self
    }
}

impl Default for PassConfigTable {
    fn default() -> Self {
        Self {
            creative: config_for(PassId::Creative),
            structure: config_for(PassId::Structure),
            normalize: config_for(PassId::Normalize),
        }
    }
}
