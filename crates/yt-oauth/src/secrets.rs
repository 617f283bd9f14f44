use serde::Deserialize;
use std::path::Path;

use crate::error::OAuthError;
use crate::{GOOGLE_AUTH_URI, GOOGLE_TOKEN_URI};

/// OAuth client registration, as downloaded from the Google Cloud console
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ClientSecrets {
    /// OAuth client ID
    pub client_id: String,
    /// OAuth client secret
    #[serde(default)]
    pub client_secret: String,
    /// Consent page
    #[serde(default = "default_auth_uri")]
    pub auth_uri: String,
    /// Token endpoint for code exchange and refresh
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
    /// Redirect URIs registered for the client
    #[serde(default)]
    pub redirect_uris: Vec<String>,
}

fn default_auth_uri() -> String {
    GOOGLE_AUTH_URI.to_string()
}

fn default_token_uri() -> String {
    GOOGLE_TOKEN_URI.to_string()
}

/// The file wraps the registration in an `installed` or `web` object.
#[derive(Deserialize)]
struct ClientSecretsFile {
    installed: Option<ClientSecrets>,
    web: Option<ClientSecrets>,
}

impl ClientSecrets {
    /// Create a registration with Google's default endpoints
    pub fn new(client_id: String, client_secret: String) -> Self {
        Self {
            client_id,
            client_secret,
            auth_uri: default_auth_uri(),
            token_uri: default_token_uri(),
            redirect_uris: Vec::new(),
        }
    }

    /// Load a `client_secrets.json` file
    pub fn from_file(path: &Path) -> Result<Self, OAuthError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            OAuthError::Configuration(format!(
                "Google OAuth client secrets file not found: {} ({}). Download it from Google Cloud Console.",
                path.display(),
                e
            ))
        })?;
        Self::from_json(&content).map_err(|e| {
            OAuthError::Configuration(format!(
                "Failed to parse client secrets file '{}': {}",
                path.display(),
                e
            ))
        })
    }

    fn from_json(content: &str) -> Result<Self, String> {
        let file: ClientSecretsFile = serde_json::from_str(content).map_err(|e| e.to_string())?;
        let secrets = file
            .installed
            .or(file.web)
            .ok_or("expected an \"installed\" or \"web\" client")?;
        if secrets.client_id.trim().is_empty() {
            return Err("client_id is empty".to_string());
        }
        Ok(secrets)
    }

    /// Redirect URI for the console flow, where the user copies the code by hand
    pub fn console_redirect_uri(&self) -> &str {
        self.redirect_uris
            .iter()
            .find(|uri| uri.starts_with("http://localhost") || uri.starts_with("http://127.0.0.1"))
            .map(String::as_str)
            .unwrap_or("http://localhost")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_installed_client() {
        let secrets = ClientSecrets::from_json(
            r#"{"installed":{"client_id":"id.apps.googleusercontent.com","project_id":"demo",
                "auth_uri":"https://accounts.google.com/o/oauth2/auth",
                "token_uri":"https://oauth2.googleapis.com/token",
                "client_secret":"shh","redirect_uris":["http://localhost"]}}"#,
        )
        .unwrap();
        assert_eq!(secrets.client_id, "id.apps.googleusercontent.com");
        assert_eq!(secrets.client_secret, "shh");
        assert_eq!(secrets.auth_uri, "https://accounts.google.com/o/oauth2/auth");
        assert_eq!(secrets.console_redirect_uri(), "http://localhost");
    }

    #[test]
    fn web_client_gets_default_endpoints() {
        let secrets =
            ClientSecrets::from_json(r#"{"web":{"client_id":"id","client_secret":"s"}}"#).unwrap();
        assert_eq!(secrets.token_uri, GOOGLE_TOKEN_URI);
        assert_eq!(secrets.auth_uri, GOOGLE_AUTH_URI);
        assert_eq!(secrets.console_redirect_uri(), "http://localhost");
    }

    #[test]
    fn rejects_unknown_layout() {
        assert!(ClientSecrets::from_json(r#"{"client_id":"id"}"#).is_err());
        assert!(ClientSecrets::from_json(r#"{"installed":{"client_id":" "}}"#).is_err());
    }

    #[test]
    fn missing_file_is_a_configuration_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = ClientSecrets::from_file(&dir.path().join("client_secrets.json")).unwrap_err();
        assert!(err.is_configuration());
    }
}
