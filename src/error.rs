use thiserror::Error;
use yt_oauth::OAuthError;

/// Every fatal condition of a run. All of them end the process with status 1.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Could not extract a valid YouTube video ID from the URL: {0}")]
    InvalidVideoUrl(String),

    #[error("{0}")]
    Configuration(String),

    #[error("Authorization failed: {0}")]
    Authorization(#[source] OAuthError),

    #[error("{service} API error (status {status}): {body}")]
    RemoteApi {
        service: &'static str,
        status: u16,
        body: String,
    },

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Unexpected {service} response: {message}")]
    InvalidResponse {
        service: &'static str,
        message: String,
    },

    #[error("No comments found or unable to fetch comments.")]
    NoComments,
}

impl From<OAuthError> for AppError {
    fn from(err: OAuthError) -> Self {
        if err.is_configuration() {
            Self::Configuration(err.to_string())
        } else {
            Self::Authorization(err)
        }
    }
}

/// Turn a non-success response into [`AppError::RemoteApi`].
pub async fn check_status(
    service: &'static str,
    response: reqwest::Response,
) -> Result<reqwest::Response, AppError> {
    if response.status().is_success() {
        return Ok(response);
    }
    let status = response.status().as_u16();
    let body = response.text().await?;
    Err(AppError::RemoteApi {
        service,
        status,
        body,
    })
}
