use clap::Parser;
use std::process::ExitCode;
use yt_oauth::{
    ClientSecrets, CredentialManager, CredentialStore, HttpTokenEndpoint, InteractiveConsent,
    YOUTUBE_FORCE_SSL_SCOPE,
};

mod config;
mod error;
mod logging;
mod openai;
mod responder;
mod video_id;
mod youtube;

use config::{Args, load_config};
use error::AppError;
use openai::OpenAiClient;
use youtube::YouTubeClient;

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(e) => {
            // --help and --version land here too
            let _ = e.print();
            return if e.use_stderr() {
                ExitCode::FAILURE
            } else {
                ExitCode::SUCCESS
            };
        }
    };

    logging::init(args.verbose);

    match run(&args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::debug!(error = ?e, "Run failed");
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(args: &Args) -> Result<(), AppError> {
    let video_id = video_id::extract_video_id(&args.video_url)
        .ok_or_else(|| AppError::InvalidVideoUrl(args.video_url.clone()))?;
    let config = load_config(args)?;
    tracing::debug!(%video_id, model = %config.openai_model, "Configuration loaded");

    let secrets = ClientSecrets::from_file(&config.client_secrets_file)?;
    let manager = CredentialManager::new(
        CredentialStore::new(&config.token_file),
        secrets,
        vec![YOUTUBE_FORCE_SSL_SCOPE.to_string()],
        config.auth_mode,
        HttpTokenEndpoint::default(),
        InteractiveConsent::default(),
    );
    let credential = manager.authenticate().await?;

    let http = reqwest::Client::new();
    let youtube = YouTubeClient::new(
        http.clone(),
        &config.rest_api_address,
        &credential.access_token,
    );
    let model = OpenAiClient::new(
        http,
        &config.openai_base_url,
        &config.openai_api_key,
        &config.openai_model,
    );

    responder::respond(
        &youtube,
        &model,
        &video_id,
        config.max_comments as usize,
        config.dry_run,
    )
    .await?;
    Ok(())
}
