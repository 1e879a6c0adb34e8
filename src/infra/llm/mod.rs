mod accounting;
mod env;
mod gemini;
mod openai;
pub mod output_validator;
pub mod prompt_builder;
mod provider;
mod response_parsing;
mod router;
mod sanitize;

pub use accounting::{CostFormula, GEMINI_COST, OPENAI_COST, estimate_tokens};
pub(crate) use env::read_env_var;
pub use gemini::GeminiProvider;
pub use openai::OpenAiProvider;
pub use output_validator::OutputValidator;
pub use prompt_builder::PromptBuilder;
pub use provider::AiProvider;
pub use router::{GEMINI_FAMILY, OPENAI_FAMILY, ProviderRouter};
pub use sanitize::sanitize_user_content;
