use serde::Deserialize;

use crate::credential::{Credential, unix_now};
use crate::error::OAuthError;
use crate::pkce::AuthorizationGrant;
use crate::secrets::ClientSecrets;

/// The issuing authority's token endpoint.
#[allow(async_fn_in_trait)]
pub trait TokenEndpoint {
    /// Trade the credential's refresh token for a fresh access token.
    async fn refresh(
        &self,
        secrets: &ClientSecrets,
        credential: &Credential,
    ) -> Result<Credential, OAuthError>;

    /// Redeem an authorization code for a new credential.
    async fn exchange_code(
        &self,
        secrets: &ClientSecrets,
        grant: &AuthorizationGrant,
        scopes: &[String],
    ) -> Result<Credential, OAuthError>;
}

impl<T: TokenEndpoint + ?Sized> TokenEndpoint for &T {
    async fn refresh(
        &self,
        secrets: &ClientSecrets,
        credential: &Credential,
    ) -> Result<Credential, OAuthError> {
        (**self).refresh(secrets, credential).await
    }

    async fn exchange_code(
        &self,
        secrets: &ClientSecrets,
        grant: &AuthorizationGrant,
        scopes: &[String],
    ) -> Result<Credential, OAuthError> {
        (**self).exchange_code(secrets, grant, scopes).await
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: u64,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    token_type: Option<String>,
    /// Space separated
    #[serde(default)]
    scope: Option<String>,
}

impl TokenResponse {
    fn granted_scopes(&self) -> Option<Vec<String>> {
        self.scope
            .as_deref()
            .map(|scope| scope.split_whitespace().map(str::to_string).collect())
    }
}

/// Token endpoint spoken to over HTTP form posts
#[derive(Debug, Clone, Default)]
pub struct HttpTokenEndpoint {
    client: reqwest::Client,
}

impl HttpTokenEndpoint {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }

    async fn post(&self, token_uri: &str, params: &[(&str, &str)]) -> Result<TokenResponse, OAuthError> {
        let response = self.client.post(token_uri).form(params).send().await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await?;
            return Err(OAuthError::TokenEndpoint { status, body });
        }

        let body = response.text().await?;
        let token: TokenResponse = serde_json::from_str(&body)
            .map_err(|e| OAuthError::InvalidTokenResponse(e.to_string()))?;
        if token.access_token.is_empty() {
            return Err(OAuthError::InvalidTokenResponse(
                "empty access_token".to_string(),
            ));
        }
        Ok(token)
    }
}

impl TokenEndpoint for HttpTokenEndpoint {
    async fn refresh(
        &self,
        secrets: &ClientSecrets,
        credential: &Credential,
    ) -> Result<Credential, OAuthError> {
        let refresh_token = credential
            .refresh_token
            .as_deref()
            .ok_or_else(|| OAuthError::InvalidTokenResponse("no refresh token".to_string()))?;

        tracing::info!("Refreshing OAuth token...");

        let params = [
            ("client_id", secrets.client_id.as_str()),
            ("client_secret", secrets.client_secret.as_str()),
            ("refresh_token", refresh_token),
            ("grant_type", "refresh_token"),
        ];
        let response = self.post(&credential.token_uri, &params).await?;

        let scopes = response
            .granted_scopes()
            .unwrap_or_else(|| credential.scopes.clone());
        let refreshed = Credential {
            access_token: response.access_token,
            // Keep the existing refresh token unless the authority rotated it
            refresh_token: response
                .refresh_token
                .or_else(|| credential.refresh_token.clone()),
            token_type: response.token_type.unwrap_or_else(|| "Bearer".to_string()),
            expires_at: unix_now().saturating_add(response.expires_in),
            scopes,
            token_uri: credential.token_uri.clone(),
            client_id: credential.client_id.clone(),
        };

        tracing::info!("OAuth token refreshed successfully");
        Ok(refreshed)
    }

    async fn exchange_code(
        &self,
        secrets: &ClientSecrets,
        grant: &AuthorizationGrant,
        scopes: &[String],
    ) -> Result<Credential, OAuthError> {
        tracing::info!("Exchanging authorization code for tokens...");

        let params = [
            ("client_id", secrets.client_id.as_str()),
            ("client_secret", secrets.client_secret.as_str()),
            ("code", grant.code.as_str()),
            ("code_verifier", grant.verifier.as_str()),
            ("grant_type", "authorization_code"),
            ("redirect_uri", grant.redirect_uri.as_str()),
        ];
        let response = self.post(&secrets.token_uri, &params).await?;

        if response.refresh_token.is_none() {
            tracing::warn!("Token response carried no refresh token; re-authorization will be needed on expiry");
        }

        let granted = response.granted_scopes().unwrap_or_else(|| scopes.to_vec());
        let credential = Credential {
            access_token: response.access_token,
            refresh_token: response.refresh_token,
            token_type: response.token_type.unwrap_or_else(|| "Bearer".to_string()),
            expires_at: unix_now().saturating_add(response.expires_in),
            scopes: granted,
            token_uri: secrets.token_uri.clone(),
            client_id: secrets.client_id.clone(),
        };

        tracing::info!("Successfully obtained OAuth tokens");
        Ok(credential)
    }
}
