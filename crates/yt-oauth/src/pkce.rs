use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rand::Rng;
use rand::distributions::Alphanumeric;
use sha2::{Digest, Sha256};

use crate::secrets::ClientSecrets;

/// Random alphanumeric string from a cryptographically secure RNG
fn random_string(len: usize) -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}

/// PKCE verifier and its S256 challenge
#[derive(Debug, Clone)]
pub struct Pkce {
    pub verifier: String,
    pub challenge: String,
}

impl Pkce {
    pub fn generate() -> Self {
        // RFC 7636 allows 43-128 characters
        let verifier = random_string(64);
        let challenge = Self::challenge_for(&verifier);
        Self {
            verifier,
            challenge,
        }
    }

    /// base64url(SHA256(verifier))
    pub fn challenge_for(verifier: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(verifier.as_bytes());
        URL_SAFE_NO_PAD.encode(hasher.finalize())
    }
}

/// Everything a single consent round trip needs
#[derive(Debug, Clone)]
pub struct AuthorizationRequest {
    pub client_id: String,
    pub auth_uri: String,
    pub scopes: Vec<String>,
    pub pkce: Pkce,
    pub state: String,
    /// Where the console flow sends the browser after consent
    pub console_redirect_uri: String,
}

impl AuthorizationRequest {
    pub fn new(secrets: &ClientSecrets, scopes: &[String]) -> Self {
        Self {
            client_id: secrets.client_id.clone(),
            auth_uri: secrets.auth_uri.clone(),
            scopes: scopes.to_vec(),
            pkce: Pkce::generate(),
            state: random_string(32),
            console_redirect_uri: secrets.console_redirect_uri().to_string(),
        }
    }

    /// Consent URL redirecting back to `redirect_uri`
    pub fn authorization_url(&self, redirect_uri: &str) -> String {
        format!(
            "{}?\
            client_id={}&\
            redirect_uri={}&\
            response_type=code&\
            scope={}&\
            state={}&\
            code_challenge={}&\
            code_challenge_method=S256&\
            access_type=offline&\
            prompt=consent",
            self.auth_uri,
            urlencoding::encode(&self.client_id),
            urlencoding::encode(redirect_uri),
            urlencoding::encode(&self.scopes.join(" ")),
            urlencoding::encode(&self.state),
            urlencoding::encode(&self.pkce.challenge),
        )
    }
}

/// Authorization code plus what the token endpoint needs to redeem it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorizationGrant {
    pub code: String,
    pub verifier: String,
    pub redirect_uri: String,
}

impl AuthorizationGrant {
    pub fn new(request: &AuthorizationRequest, code: String, redirect_uri: &str) -> Self {
        Self {
            code,
            verifier: request.pkce.verifier.clone(),
            redirect_uri: redirect_uri.to_string(),
        }
    }
}
