use crate::credential::Credential;

/// Where a stored credential leaves the acquisition process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialState {
    /// Nothing usable was loaded.
    NoCredential,
    /// Unexpired and carrying every required scope.
    Valid,
    /// Expired, but a refresh token can mint a new access token.
    ExpiredRefreshable,
    /// Needs a full authorization: expired without a refresh token, or
    /// missing scopes that a refresh cannot add.
    ExpiredUnrefreshable,
}

/// Classify a loaded credential at time `now` (Unix seconds).
pub fn evaluate(
    credential: Option<&Credential>,
    required_scopes: &[String],
    now: u64,
) -> CredentialState {
    let Some(credential) = credential else {
        return CredentialState::NoCredential;
    };

    if !credential.has_scopes(required_scopes) {
        return CredentialState::ExpiredUnrefreshable;
    }

    if !credential.is_expired(now) {
        CredentialState::Valid
    } else if credential.has_refresh_token() {
        CredentialState::ExpiredRefreshable
    } else {
        CredentialState::ExpiredUnrefreshable
    }
}
