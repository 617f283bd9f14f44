use serde::Deserialize;
use std::fmt;
use std::time::Duration;
use tokio::io::AsyncBufReadExt;
use tokio::sync::mpsc;

use crate::OAUTH_CALLBACK_PATH;
use crate::error::{LocalFlowError, OAuthError};
use crate::pkce::{AuthorizationGrant, AuthorizationRequest};

/// How the interactive consent step is driven
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum AuthMode {
    /// Try the local callback flow, fall back to the console flow
    #[default]
    Auto,
    /// Local callback server only
    Local,
    /// Paste the code by hand (headless or remote shells)
    Console,
}

impl fmt::Display for AuthMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Auto => "auto",
            Self::Local => "local",
            Self::Console => "console",
        };
        f.write_str(name)
    }
}

/// The user-facing half of authorization: obtain an authorization code.
#[allow(async_fn_in_trait)]
pub trait ConsentFlow {
    /// Consent through a loopback redirect to a local callback listener.
    async fn local(
        &self,
        request: &AuthorizationRequest,
    ) -> Result<AuthorizationGrant, LocalFlowError>;

    /// Consent by printing the URL and reading the code from the terminal.
    async fn console(
        &self,
        request: &AuthorizationRequest,
    ) -> Result<AuthorizationGrant, OAuthError>;
}

impl<T: ConsentFlow + ?Sized> ConsentFlow for &T {
    async fn local(
        &self,
        request: &AuthorizationRequest,
    ) -> Result<AuthorizationGrant, LocalFlowError> {
        (**self).local(request).await
    }

    async fn console(
        &self,
        request: &AuthorizationRequest,
    ) -> Result<AuthorizationGrant, OAuthError> {
        (**self).console(request).await
    }
}

/// Default consent timeout for the local flow
pub const CONSENT_TIMEOUT: Duration = Duration::from_secs(300);

/// Consent driven from the terminal the program runs in
#[derive(Debug, Clone)]
pub struct InteractiveConsent {
    /// Callback port for the local flow; 0 picks an ephemeral port
    pub callback_port: u16,
    pub timeout: Duration,
}

impl Default for InteractiveConsent {
    fn default() -> Self {
        Self {
            callback_port: 0,
            timeout: CONSENT_TIMEOUT,
        }
    }
}

fn print_banner(auth_url: &str, waiting_for: &str) {
    eprintln!("\n=================================================");
    eprintln!("OAuth 2.0 Authorization Required");
    eprintln!("=================================================");
    eprintln!("\nPlease visit the following URL to authorize the application:\n");
    eprintln!("{}\n", auth_url);
    eprintln!("{}", waiting_for);
    eprintln!("=================================================\n");
}

impl ConsentFlow for InteractiveConsent {
    async fn local(
        &self,
        request: &AuthorizationRequest,
    ) -> Result<AuthorizationGrant, LocalFlowError> {
        let listener = CallbackListener::bind(self.callback_port).await?;
        let redirect_uri = listener.redirect_uri().to_string();

        print_banner(
            &request.authorization_url(&redirect_uri),
            "Waiting for authorization...",
        );

        let code = listener.wait_for_code(&request.state, self.timeout).await?;
        Ok(AuthorizationGrant::new(request, code, &redirect_uri))
    }

    async fn console(
        &self,
        request: &AuthorizationRequest,
    ) -> Result<AuthorizationGrant, OAuthError> {
        let redirect_uri = &request.console_redirect_uri;

        print_banner(
            &request.authorization_url(redirect_uri),
            "After approving, your browser is redirected to a page that may fail to load.\n\
            Copy the full address from the browser (or just the `code` value) and paste it here.",
        );
        eprint!("Enter the authorization code: ");

        let mut line = String::new();
        let read = tokio::io::BufReader::new(tokio::io::stdin())
            .read_line(&mut line)
            .await
            .map_err(|e| OAuthError::Console(format!("failed to read standard input: {e}")))?;
        if read == 0 {
            return Err(OAuthError::Console(
                "standard input closed before a code was entered".to_string(),
            ));
        }

        let code = parse_console_response(&line, &request.state)?;
        Ok(AuthorizationGrant::new(request, code, redirect_uri))
    }
}

/// Extract the authorization code from what the user pasted.
///
/// Accepts either the bare code or the whole redirect URL. A URL carrying
/// `error` is a denial; a URL carrying a foreign `state` is refused.
pub fn parse_console_response(input: &str, expected_state: &str) -> Result<String, OAuthError> {
    let input = input.trim();
    if input.is_empty() {
        return Err(OAuthError::Console("no authorization code entered".to_string()));
    }

    let Ok(url) = url::Url::parse(input) else {
        return Ok(input.to_string());
    };

    let mut code = None;
    let mut state = None;
    for (key, value) in url.query_pairs() {
        match key.as_ref() {
            "code" => code = Some(value.into_owned()),
            "state" => state = Some(value.into_owned()),
            "error" => return Err(OAuthError::Denied(value.into_owned())),
            _ => {}
        }
    }

    if state.is_some_and(|state| state != expected_state) {
        return Err(OAuthError::Console(
            "redirect URL belongs to a different authorization request".to_string(),
        ));
    }

    code.filter(|code| !code.is_empty())
        .ok_or_else(|| OAuthError::Console("redirect URL carries no `code` parameter".to_string()))
}

/// Loopback listener that receives the consent redirect
pub struct CallbackListener {
    listener: tokio::net::TcpListener,
    redirect_uri: String,
}

#[derive(Deserialize)]
struct AuthCallback {
    code: Option<String>,
    error: Option<String>,
    state: Option<String>,
}

impl CallbackListener {
    /// Bind on 127.0.0.1; port 0 lets the OS choose.
    pub async fn bind(port: u16) -> Result<Self, LocalFlowError> {
        let addr = format!("127.0.0.1:{}", port);
        let listener = tokio::net::TcpListener::bind(&addr)
            .await
            .map_err(|source| LocalFlowError::Bind {
                addr: addr.clone(),
                source,
            })?;
        let bound = listener
            .local_addr()
            .map_err(|source| LocalFlowError::Bind { addr, source })?;

        tracing::debug!(%bound, "OAuth callback listener bound");
        Ok(Self {
            listener,
            redirect_uri: format!("http://{}{}", bound, OAUTH_CALLBACK_PATH),
        })
    }

    pub fn redirect_uri(&self) -> &str {
        &self.redirect_uri
    }

    /// Serve the callback until one redirect arrives or `timeout` elapses.
    /// The listener is released before returning.
    pub async fn wait_for_code(
        self,
        expected_state: &str,
        timeout: Duration,
    ) -> Result<String, LocalFlowError> {
        use axum::{
            Router,
            extract::Query,
            response::{Html, IntoResponse},
            routing::get,
        };

        let (sender, mut receiver) = mpsc::channel::<Result<String, LocalFlowError>>(1);
        let expected_state = expected_state.to_string();

        let callback_handler = move |Query(params): Query<AuthCallback>| {
            let sender = sender.clone();
            let expected_state = expected_state.clone();
            async move {
                let outcome = if let Some(error) = params.error {
                    Err(LocalFlowError::Denied(error))
                } else if params.state.as_deref() != Some(expected_state.as_str()) {
                    Err(LocalFlowError::StateMismatch)
                } else if let Some(code) = params.code {
                    Ok(code)
                } else {
                    Err(LocalFlowError::MissingCode)
                };

                let page = match &outcome {
                    Ok(_) => "<html><body><h1>Authorization Successful!</h1>\
                        <p>You can close this window and return to the application.</p></body></html>"
                        .to_string(),
                    Err(e) => format!(
                        "<html><body><h1>Authorization Failed</h1><p>Error: {}</p>\
                        <p>You can close this window.</p></body></html>",
                        e
                    ),
                };

                // Only the first callback counts
                let _ = sender.try_send(outcome);
                Html(page).into_response()
            }
        };

        let app = Router::new().route(OAUTH_CALLBACK_PATH, get(callback_handler));
        let server = axum::serve(self.listener, app);
        let server_handle = tokio::spawn(async move {
            if let Err(e) = server.await {
                tracing::warn!(error = %e, "OAuth callback server stopped");
            }
        });

        let outcome = tokio::time::timeout(timeout, receiver.recv()).await;

        // Stop server
        server_handle.abort();

        match outcome {
            Err(_) => Err(LocalFlowError::Timeout(timeout)),
            Ok(None) => Err(LocalFlowError::Server(
                "callback channel closed".to_string(),
            )),
            Ok(Some(result)) => result,
        }
    }
}
