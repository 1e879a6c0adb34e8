use std::io::Read;
use std::process::ExitCode;
use std::sync::Arc;

use habitloom::{
    app::{
        AllowAllPolicy, CreateHabitSeriesHandler, CreateHabitSeriesUseCase, ErrorResponse,
        InMemoryHabitSeriesRepository, InMemoryUserState, PipelineCollaborators,
    },
    config::PipelineConfig,
    domain::{LlmError, PipelineError, PipelineRequestDto},
    infra::llm::{GeminiProvider, OpenAiProvider, ProviderRouter},
};
use tracing_subscriber::EnvFilter;

const LOG_ENV: &str = "HABITLOOM_LOG";
const DEFAULT_USER_ID: &str = "local-user";
const USAGE: &str = "usage: habitloom [--user <id>] [request.json]
Reads a create request ({\"language\", \"testData\", \"assistantContext\"}) from the
file argument or stdin and prints the pipeline response as JSON.";

struct CliArgs {
    user_id: String,
    request_path: Option<String>,
}

fn main() -> ExitCode {
    init_tracing();

    let args = match parse_args(std::env::args().skip(1)) {
        Ok(args) => args,
        Err(message) => {
            eprintln!("{message}\n{USAGE}");
            return ExitCode::from(2);
        }
    };

    let request = match read_request(args.request_path.as_deref()) {
        Ok(request) => request,
        Err(message) => {
            eprintln!("{message}");
            return ExitCode::from(2);
        }
    };

    let handler = match build_handler() {
        Ok(handler) => handler,
        Err(error) => {
            tracing::error!(error = %error, "failed to configure the habit series pipeline");
            print_json(&ErrorResponse::from_error(&error));
            return ExitCode::FAILURE;
        }
    };

    match handler.handle_create_request(&args.user_id, request) {
        Ok(response) => {
            print_json(&response);
            ExitCode::SUCCESS
        }
        Err(error) => {
            print_json(&ErrorResponse::from_error(&error));
            ExitCode::FAILURE
        }
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn parse_args<I>(mut args: I) -> Result<CliArgs, String>
where
    I: Iterator<Item = String>,
{
    let mut user_id = DEFAULT_USER_ID.to_string();
    let mut request_path = None;

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--user" => {
                user_id = args
                    .next()
                    .filter(|value| !value.trim().is_empty())
                    .ok_or_else(|| "--user requires a non-empty id".to_string())?;
            }
            "-h" | "--help" => return Err("help requested".to_string()),
            flag if flag.starts_with("--") => return Err(format!("unknown flag '{flag}'")),
            _ if request_path.is_none() => request_path = Some(arg),
            _ => return Err(format!("unexpected argument '{arg}'")),
        }
    }

    Ok(CliArgs {
        user_id,
        request_path,
    })
}

fn read_request(path: Option<&str>) -> Result<PipelineRequestDto, String> {
    let body = match path {
        Some(path) => std::fs::read_to_string(path)
            .map_err(|err| format!("failed to read request file '{path}': {err}"))?,
        None => {
            let mut body = String::new();
            std::io::stdin()
                .read_to_string(&mut body)
                .map_err(|err| format!("failed to read request from stdin: {err}"))?;
            body
        }
    };

    serde_json::from_str(&body).map_err(|err| format!("request is not valid JSON: {err}"))
}

fn build_handler() -> Result<CreateHabitSeriesHandler, PipelineError> {
    let config = PipelineConfig::from_env().map_err(config_error)?;
    let openai = OpenAiProvider::from_env().map_err(config_error)?;
    let gemini = GeminiProvider::from_env().map_err(config_error)?;
    let router =
        ProviderRouter::standard(Arc::new(openai), Arc::new(gemini)).map_err(config_error)?;

    let collaborators = PipelineCollaborators::new()
        .with_router(router)
        .with_repository(Arc::new(InMemoryHabitSeriesRepository::new()))
        .with_user_state(Arc::new(InMemoryUserState::new()))
        .with_policy(Arc::new(AllowAllPolicy));
    let use_case = CreateHabitSeriesUseCase::new(collaborators)
        .with_pass_configs(config.passes)
        .with_persistence_policy(config.persistence);

    Ok(CreateHabitSeriesHandler::new(use_case))
}

fn config_error(error: LlmError) -> PipelineError {
    PipelineError::internal(error.to_string())
}

fn print_json<T: serde::Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(body) => println!("{body}"),
        Err(err) => tracing::error!(error = %err, "failed to serialize response"),
    }
}
