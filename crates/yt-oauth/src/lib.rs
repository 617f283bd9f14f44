//! OAuth 2.0 credential lifecycle for the YouTube Data API.
//!
//! [`CredentialManager`] loads a stored [`Credential`], refreshes it when it
//! has expired, or walks the user through consent (see [`AuthMode`]), and
//! persists the result.

mod credential;
mod endpoint;
mod error;
mod flow;
mod manager;
mod pkce;
mod secrets;
mod state;

pub use credential::{Credential, CredentialStore, EXPIRY_SKEW_SECS, unix_now};
pub use endpoint::{HttpTokenEndpoint, TokenEndpoint};
pub use error::{LocalFlowError, OAuthError};
pub use flow::{
    AuthMode, CONSENT_TIMEOUT, CallbackListener, ConsentFlow, InteractiveConsent,
    parse_console_response,
};
pub use manager::CredentialManager;
pub use pkce::{AuthorizationGrant, AuthorizationRequest, Pkce};
pub use secrets::ClientSecrets;
pub use state::{CredentialState, evaluate};

/// Scope needed to read and post comments
pub const YOUTUBE_FORCE_SSL_SCOPE: &str = "https://www.googleapis.com/auth/youtube.force-ssl";

/// Google's consent page
pub const GOOGLE_AUTH_URI: &str = "https://accounts.google.com/o/oauth2/v2/auth";

/// Google's token endpoint
pub const GOOGLE_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";

/// Path the local flow's redirect lands on
pub const OAUTH_CALLBACK_PATH: &str = "/oauth2callback";

/// Production manager: HTTP token endpoint and terminal-driven consent
pub type DefaultCredentialManager = CredentialManager<HttpTokenEndpoint, InteractiveConsent>;
