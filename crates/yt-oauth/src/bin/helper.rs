use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::{filter::EnvFilter, fmt, prelude::*};
use yt_oauth::{
    AuthMode, ClientSecrets, CredentialManager, CredentialStore, HttpTokenEndpoint,
    InteractiveConsent, YOUTUBE_FORCE_SSL_SCOPE,
};

/// OAuth 2.0 helper tool for YouTube API authentication
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to Google OAuth client secrets JSON
    #[arg(long, default_value = "client_secrets.json")]
    client_secrets: PathBuf,

    /// Path to save the OAuth token file
    #[arg(long, default_value = "token.json")]
    token_path: PathBuf,

    /// OAuth flow mode (use console for headless shells)
    #[arg(long, value_enum, default_value_t = AuthMode::Auto)]
    auth_mode: AuthMode,

    /// Port for the local callback listener (0 picks a free port)
    #[arg(long, default_value = "0")]
    callback_port: u16,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let args = Args::parse();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("warn,yt_oauth=info"));
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    match run(&args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(args: &Args) -> Result<(), yt_oauth::OAuthError> {
    let secrets = ClientSecrets::from_file(&args.client_secrets)?;
    let consent = InteractiveConsent {
        callback_port: args.callback_port,
        ..InteractiveConsent::default()
    };
    let manager = CredentialManager::new(
        CredentialStore::new(&args.token_path),
        secrets,
        vec![YOUTUBE_FORCE_SSL_SCOPE.to_string()],
        args.auth_mode,
        HttpTokenEndpoint::default(),
        consent,
    );

    let credential = manager.authenticate().await?;

    eprintln!("\nOAuth token stored at: {}", args.token_path.display());
    eprintln!("Valid until (Unix time): {}", credential.expires_at);
    eprintln!("You can now use this token with yt-comment-responder");

    Ok(())
}
