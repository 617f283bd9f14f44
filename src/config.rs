use clap::Parser;
use std::path::PathBuf;
use yt_oauth::AuthMode;

use crate::error::AppError;

/// Inclusive bounds for `--max-comments`
pub const MAX_COMMENTS_RANGE: std::ops::RangeInclusive<u32> = 1..=100;

/// YouTube Comment Responder - Generate and post an AI reply to the comments of a YouTube video
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Args {
    /// YouTube video URL
    pub video_url: String,

    /// Number of comments to analyze (1-100)
    #[arg(long, default_value = "20")]
    pub max_comments: u32,

    /// OpenAI model
    #[arg(long, env = "OPENAI_MODEL", default_value = "gpt-4.1-mini")]
    pub model: String,

    /// OpenAI API key
    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    pub openai_api_key: Option<String>,

    /// Path to Google OAuth client secrets JSON
    #[arg(long, default_value = "client_secrets.json")]
    pub client_secrets: PathBuf,

    /// Path to store OAuth token
    #[arg(long, default_value = "token.json")]
    pub token_file: PathBuf,

    /// OAuth flow mode (use console for headless shells)
    #[arg(long, value_enum, default_value_t = AuthMode::Auto)]
    pub auth_mode: AuthMode,

    /// Do not post; only print generated comment
    #[arg(long)]
    pub dry_run: bool,

    /// YouTube REST API base address
    #[arg(long, env = "REST_API_ADDRESS", default_value = "https://www.googleapis.com")]
    pub rest_api_address: String,

    /// OpenAI API base address
    #[arg(long, env = "OPENAI_BASE_URL", default_value = "https://api.openai.com/v1")]
    pub openai_base_url: String,

    /// Enable debug logging
    #[arg(short, long)]
    pub verbose: bool,
}

/// Validated settings for one run
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub openai_api_key: String,
    pub openai_model: String,
    pub openai_base_url: String,
    pub client_secrets_file: PathBuf,
    pub token_file: PathBuf,
    pub max_comments: u32,
    pub dry_run: bool,
    pub auth_mode: AuthMode,
    pub rest_api_address: String,
}

/// Validate arguments before anything touches the network.
pub fn load_config(args: &Args) -> Result<AppConfig, AppError> {
    let openai_api_key = args
        .openai_api_key
        .as_deref()
        .map(str::trim)
        .filter(|key| !key.is_empty())
        .ok_or_else(|| {
            AppError::Configuration(
                "OPENAI_API_KEY is not set. Add it to your environment before running.".to_string(),
            )
        })?
        .to_string();

    if !MAX_COMMENTS_RANGE.contains(&args.max_comments) {
        return Err(AppError::Configuration(format!(
            "--max-comments must be between {} and {}.",
            MAX_COMMENTS_RANGE.start(),
            MAX_COMMENTS_RANGE.end()
        )));
    }

    if !args.client_secrets.exists() {
        return Err(AppError::Configuration(format!(
            "Google OAuth client secrets file not found: {}. Download it from Google Cloud Console.",
            args.client_secrets.display()
        )));
    }

    Ok(AppConfig {
        openai_api_key,
        openai_model: args.model.clone(),
        openai_base_url: args.openai_base_url.trim_end_matches('/').to_string(),
        client_secrets_file: args.client_secrets.clone(),
        token_file: args.token_file.clone(),
        max_comments: args.max_comments,
        dry_run: args.dry_run,
        auth_mode: args.auth_mode,
        rest_api_address: args.rest_api_address.trim_end_matches('/').to_string(),
    })
}
