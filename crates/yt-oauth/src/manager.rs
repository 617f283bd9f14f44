use crate::credential::{Credential, CredentialStore, unix_now};
use crate::endpoint::TokenEndpoint;
use crate::error::OAuthError;
use crate::flow::{AuthMode, ConsentFlow};
use crate::pkce::AuthorizationRequest;
use crate::secrets::ClientSecrets;
use crate::state::{CredentialState, evaluate};

/// Credential manager: loads, refreshes or re-authorizes, and persists.
///
/// Constructed once by the entry point; the credential it returns is handed
/// explicitly to whatever needs to authenticate.
pub struct CredentialManager<E, C> {
    store: CredentialStore,
    secrets: ClientSecrets,
    scopes: Vec<String>,
    mode: AuthMode,
    endpoint: E,
    consent: C,
}

impl<E: TokenEndpoint, C: ConsentFlow> CredentialManager<E, C> {
    pub fn new(
        store: CredentialStore,
        secrets: ClientSecrets,
        scopes: Vec<String>,
        mode: AuthMode,
        endpoint: E,
        consent: C,
    ) -> Self {
        Self {
            store,
            secrets,
            scopes,
            mode,
            endpoint,
            consent,
        }
    }

    pub fn store(&self) -> &CredentialStore {
        &self.store
    }

    /// Return a valid credential, persisted to the store.
    ///
    /// A valid stored credential is returned untouched. An expired one is
    /// refreshed at most once; if that fails, or the refreshed credential is
    /// still not valid, or nothing refreshable was stored, the interactive
    /// authorization flow runs. The token file is checked for writability
    /// before any of that.
    pub async fn authenticate(&self) -> Result<Credential, OAuthError> {
        let stored = self.store.load();
        let state = evaluate(stored.as_ref(), &self.scopes, unix_now());
        tracing::debug!(?state, path = %self.store.path().display(), "Evaluated stored OAuth token");

        if let (CredentialState::Valid, Some(credential)) = (state, &stored) {
            tracing::info!("Using stored OAuth token");
            return Ok(credential.clone());
        }

        self.store.ensure_writable()?;

        let refreshed = match (state, stored) {
            (CredentialState::ExpiredRefreshable, Some(credential)) => {
                self.refresh(&credential).await
            }
            (state, _) => {
                tracing::info!(?state, "Authorization required");
                None
            }
        };
        let credential = match refreshed {
            Some(credential) => credential,
            None => self.authorize().await?,
        };

        self.store.save(&credential)?;
        tracing::info!(path = %self.store.path().display(), "OAuth token saved");
        Ok(credential)
    }

    /// The single refresh attempt of a run. `None` means authorize instead.
    async fn refresh(&self, credential: &Credential) -> Option<Credential> {
        tracing::info!("Access token expired, refreshing...");
        let refreshed = match self.endpoint.refresh(&self.secrets, credential).await {
            Ok(refreshed) => refreshed,
            Err(e) => {
                tracing::warn!(error = %e, "Token refresh failed, authorization required");
                return None;
            }
        };

        match evaluate(Some(&refreshed), &self.scopes, unix_now()) {
            CredentialState::Valid => Some(refreshed),
            state => {
                tracing::warn!(?state, "Refreshed OAuth token is not usable, authorization required");
                None
            }
        }
    }

    /// Run the consent flow selected by the auth mode and redeem its code.
    async fn authorize(&self) -> Result<Credential, OAuthError> {
        let request = AuthorizationRequest::new(&self.secrets, &self.scopes);

        let grant = match self.mode {
            AuthMode::Console => self.consent.console(&request).await?,
            AuthMode::Local => self.consent.local(&request).await?,
            AuthMode::Auto => match self.consent.local(&request).await {
                Ok(grant) => grant,
                Err(e) if e.is_recoverable() => {
                    tracing::warn!(error = %e, "Local authorization unavailable, falling back to console");
                    self.consent.console(&request).await?
                }
                Err(e) => return Err(e.into()),
            },
        };

        let credential = self
            .endpoint
            .exchange_code(&self.secrets, &grant, &self.scopes)
            .await?;

        if !credential.has_scopes(&self.scopes) {
            let missing = self
                .scopes
                .iter()
                .filter(|scope| !credential.scopes.contains(scope))
                .cloned()
                .collect();
            return Err(OAuthError::InsufficientScope { missing });
        }
        if credential.is_expired(unix_now()) {
            return Err(OAuthError::InvalidTokenResponse(
                "newly issued access token is already expired".to_string(),
            ));
        }
        Ok(credential)
    }
}
