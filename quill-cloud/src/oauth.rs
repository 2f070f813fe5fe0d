//! OAuth2 authorization-code and refresh flows.
//!
//! One `OAuthFlow` instance per connected provider. The flow owns the
//! code-exchange and refresh steps only — the surrounding application
//! captures the redirect callback and hands the authorization code back
//! via [`OAuthFlow::complete_authorization`]. Consent UI is reached
//! through injected ports, never platform globals.
//!
//! Per-attempt state machine:
//! `Idle → AwaitingUserConsent → ExchangingCode → {Authorized | Failed}`.
//! A single pending-attempt slot holds the PKCE verifier; starting a new
//! authorization while one is pending cancels and replaces the old one.

use crate::error::{CloudError, CloudResult};
use crate::token_store::{CloudTokenInfo, TokenStore};
use async_trait::async_trait;
use oauth2::basic::BasicClient;
use oauth2::{
    AuthUrl, AuthorizationCode, ClientId, ClientSecret, CsrfToken, EndpointNotSet, EndpointSet,
    PkceCodeChallenge, PkceCodeVerifier, RedirectUrl, RefreshToken, RequestTokenError, Scope,
    TokenResponse, TokenUrl,
};
use quill_types::{now_millis, Provider};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};

/// Configured OAuth2 client with auth and token endpoints set (v5 typestates).
type ConfiguredClient =
    BasicClient<EndpointSet, EndpointNotSet, EndpointNotSet, EndpointNotSet, EndpointSet>;

/// Fallback access-token lifetime when the token endpoint omits
/// `expires_in`.
const DEFAULT_TOKEN_LIFETIME: Duration = Duration::from_secs(3600);

/// Opens the provider consent URL in the platform browser. Injected by
/// the application layer; fire-and-forget.
pub trait ConsentLauncher: Send + Sync {
    fn open_auth_url(&self, url: &str);
}

/// Optional browser-less consent path (platform authorization broker).
/// When present it is preferred; any error fails over to the browser path.
#[async_trait]
pub trait NativeConsentBroker: Send + Sync {
    async fn authorize(&self) -> CloudResult<CloudTokenInfo>;
}

/// State of the current authorization attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthState {
    Idle,
    AwaitingUserConsent,
    ExchangingCode,
    Authorized,
    Failed,
}

/// How a `connect` call proceeded.
#[derive(Debug)]
pub enum ConnectOutcome {
    /// The native broker produced tokens directly; nothing else to do.
    Authorized(CloudTokenInfo),
    /// The browser consent page was opened; the app must deliver the
    /// redirect's code to [`OAuthFlow::complete_authorization`].
    ConsentOpened { url: String, state: String },
}

/// OAuth2 endpoints and identity for one provider.
#[derive(Debug, Clone)]
pub struct OAuthConfig {
    pub provider: Provider,
    pub client_id: String,
    pub client_secret: Option<String>,
    pub auth_url: String,
    pub token_url: String,
    pub scopes: Vec<String>,
    /// Fixed, provider- and build-target-specific redirect URI.
    pub redirect_uri: String,
    /// Extra authorization URL parameters (e.g. offline access grants).
    pub extra_auth_params: Vec<(String, String)>,
}

impl OAuthConfig {
    /// Google Drive, scoped to the hidden application data folder.
    pub fn google_drive(client_id: &str, client_secret: &str) -> Self {
        Self {
            provider: Provider::GoogleDrive,
            client_id: client_id.to_string(),
            client_secret: Some(client_secret.to_string()),
            auth_url: "https://accounts.google.com/o/oauth2/v2/auth".to_string(),
            token_url: "https://oauth2.googleapis.com/token".to_string(),
            scopes: vec!["https://www.googleapis.com/auth/drive.appdata".to_string()],
            redirect_uri: "com.quillapp.journal:/oauth2redirect".to_string(),
            extra_auth_params: vec![
                ("access_type".to_string(), "offline".to_string()),
                ("prompt".to_string(), "consent".to_string()),
            ],
        }
    }

    /// Dropbox, scoped to the app folder. Public PKCE client — Dropbox
    /// issues no secret for the code flow.
    pub fn dropbox(app_key: &str) -> Self {
        Self {
            provider: Provider::Dropbox,
            client_id: app_key.to_string(),
            client_secret: None,
            auth_url: "https://www.dropbox.com/oauth2/authorize".to_string(),
            token_url: "https://api.dropboxapi.com/oauth2/token".to_string(),
            scopes: vec![
                "account_info.read".to_string(),
                "files.content.read".to_string(),
                "files.content.write".to_string(),
            ],
            redirect_uri: format!("db-{app_key}://oauth2redirect"),
            extra_auth_params: vec![("token_access_type".to_string(), "offline".to_string())],
        }
    }

    pub fn redirect_uri(&self) -> &str {
        &self.redirect_uri
    }
}

/// A started authorization attempt awaiting its redirect.
struct PendingAttempt {
    state: String,
    verifier: PkceCodeVerifier,
}

/// Provider-agnostic authorization-code exchange and refresh.
pub struct OAuthFlow {
    config: OAuthConfig,
    token_store: Arc<TokenStore>,
    launcher: Arc<dyn ConsentLauncher>,
    native_broker: Option<Arc<dyn NativeConsentBroker>>,
    http: reqwest::Client,
    /// Single-slot completion handle; replaced (cancelling the old
    /// attempt) if a second authorization starts while one is pending.
    pending: Mutex<Option<PendingAttempt>>,
    state: RwLock<AuthState>,
}

impl OAuthFlow {
    pub fn new(
        config: OAuthConfig,
        token_store: Arc<TokenStore>,
        launcher: Arc<dyn ConsentLauncher>,
    ) -> Self {
        // The oauth2 crate requires redirects disabled on the token client.
        let http = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .timeout(Duration::from_secs(30))
            .build()
            .expect("failed to build HTTP client");

        Self {
            config,
            token_store,
            launcher,
            native_broker: None,
            http,
            pending: Mutex::new(None),
            state: RwLock::new(AuthState::Idle),
        }
    }

    pub fn with_native_broker(mut self, broker: Arc<dyn NativeConsentBroker>) -> Self {
        self.native_broker = Some(broker);
        self
    }

    pub fn provider(&self) -> Provider {
        self.config.provider
    }

    pub fn config(&self) -> &OAuthConfig {
        &self.config
    }

    pub async fn state(&self) -> AuthState {
        *self.state.read().await
    }

    /// Connects this provider: the native broker when available, falling
    /// back to the browser consent flow on any native failure.
    pub async fn connect(&self) -> CloudResult<ConnectOutcome> {
        if let Some(broker) = &self.native_broker {
            match broker.authorize().await {
                Ok(tokens) => {
                    self.token_store.save_tokens(self.config.provider, &tokens)?;
                    *self.state.write().await = AuthState::Authorized;
                    info!("native consent authorized {}", self.config.provider);
                    return Ok(ConnectOutcome::Authorized(tokens));
                }
                Err(e) => {
                    warn!(
                        "native consent failed for {}, falling back to browser: {e}",
                        self.config.provider
                    );
                }
            }
        }

        let (url, state) = self.begin_authorization().await?;
        Ok(ConnectOutcome::ConsentOpened { url, state })
    }

    /// Builds the consent URL (PKCE + CSRF state), records the pending
    /// attempt, and fires the URL into the platform browser. Returns the
    /// URL and the state token the redirect must echo.
    pub async fn begin_authorization(&self) -> CloudResult<(String, String)> {
        let client = self.oauth_client()?;

        let (pkce_challenge, pkce_verifier) = PkceCodeChallenge::new_random_sha256();

        let mut request = client
            .authorize_url(CsrfToken::new_random)
            .set_pkce_challenge(pkce_challenge);
        for scope in &self.config.scopes {
            request = request.add_scope(Scope::new(scope.clone()));
        }
        for (key, value) in &self.config.extra_auth_params {
            request = request.add_extra_param(key, value);
        }
        let (url, csrf_token) = request.url();
        let state = csrf_token.secret().clone();

        {
            let mut pending = self.pending.lock().await;
            if pending.is_some() {
                debug!(
                    "replacing pending authorization attempt for {}",
                    self.config.provider
                );
            }
            *pending = Some(PendingAttempt {
                state: state.clone(),
                verifier: pkce_verifier,
            });
        }
        *self.state.write().await = AuthState::AwaitingUserConsent;

        self.launcher.open_auth_url(url.as_str());
        debug!("opened consent URL for {}", self.config.provider);

        Ok((url.to_string(), state))
    }

    /// Exchanges the redirect's authorization code for tokens and persists
    /// them. `state` must match the pending attempt.
    pub async fn complete_authorization(
        &self,
        code: &str,
        state: &str,
    ) -> CloudResult<CloudTokenInfo> {
        let attempt = {
            let mut pending = self.pending.lock().await;
            match pending.take() {
                Some(attempt) if attempt.state == state => attempt,
                other => {
                    // A mismatched state belongs to a cancelled or foreign
                    // attempt; keep whatever is actually pending.
                    *pending = other;
                    return Err(CloudError::InvalidState(
                        "no matching authorization attempt".to_string(),
                    ));
                }
            }
        };

        *self.state.write().await = AuthState::ExchangingCode;

        let client = self.oauth_client()?;
        let result = client
            .exchange_code(AuthorizationCode::new(code.to_string()))
            .set_pkce_verifier(attempt.verifier)
            .request_async(&self.http)
            .await;

        match result {
            Ok(resp) => {
                let tokens = token_info_from_response(&resp, None);
                self.token_store.save_tokens(self.config.provider, &tokens)?;
                *self.state.write().await = AuthState::Authorized;
                info!("authorized {}", self.config.provider);
                Ok(tokens)
            }
            Err(e) => {
                *self.state.write().await = AuthState::Failed;
                // Cause kept for diagnostics; the raw response body is
                // never propagated outward.
                debug!("code exchange failed for {}: {e}", self.config.provider);
                Err(CloudError::AuthorizationFailed(
                    "authorization code exchange failed".to_string(),
                ))
            }
        }
    }

    /// Refresh sub-flow: exchanges the stored refresh token and updates
    /// the token store in place. A definitive server rejection (revoked or
    /// invalid grant) clears the provider's tokens and reports
    /// reauthorization required — a terminal condition, not a transient
    /// error.
    pub async fn refresh(&self) -> CloudResult<CloudTokenInfo> {
        let provider = self.config.provider;
        let current = self
            .token_store
            .get_token_info(provider)?
            .ok_or(CloudError::AuthorizationRequired(provider))?;
        let Some(refresh_token) = current.refresh_token.clone() else {
            self.token_store.clear_tokens(provider)?;
            return Err(CloudError::AuthorizationRequired(provider));
        };

        let client = self.oauth_client()?;
        let result = client
            .exchange_refresh_token(&RefreshToken::new(refresh_token.clone()))
            .request_async(&self.http)
            .await;

        match result {
            Ok(resp) => {
                // Providers may omit the refresh token on rotation — keep
                // the old one in that case.
                let tokens = token_info_from_response(&resp, Some(refresh_token));
                self.token_store.save_tokens(provider, &tokens)?;
                debug!("refreshed access token for {provider}");
                Ok(tokens)
            }
            Err(e) if is_definitive_rejection(&e) => {
                warn!("refresh token rejected for {provider}, reauthorization required");
                self.token_store.clear_tokens(provider)?;
                Err(CloudError::AuthorizationRequired(provider))
            }
            Err(e) => {
                debug!("token refresh transport failure for {provider}: {e}");
                Err(CloudError::AuthorizationFailed(
                    "token refresh failed".to_string(),
                ))
            }
        }
    }

    /// Returns a currently valid access token, running the refresh
    /// sub-flow first when the stored one is expired.
    pub async fn authorized_access_token(&self) -> CloudResult<String> {
        let provider = self.config.provider;
        let tokens = self
            .token_store
            .get_token_info(provider)?
            .ok_or(CloudError::AuthorizationRequired(provider))?;

        if !tokens.is_expired(now_millis()) {
            return Ok(tokens.access_token);
        }
        if tokens.refresh_token.is_none() {
            self.token_store.clear_tokens(provider)?;
            return Err(CloudError::AuthorizationRequired(provider));
        }

        debug!("access token expired for {provider}, refreshing");
        Ok(self.refresh().await?.access_token)
    }

    /// Explicit disconnect: drops tokens and any pending attempt.
    pub async fn disconnect(&self) -> CloudResult<()> {
        self.token_store.clear_tokens(self.config.provider)?;
        *self.pending.lock().await = None;
        *self.state.write().await = AuthState::Idle;
        info!("disconnected {}", self.config.provider);
        Ok(())
    }

    fn oauth_client(&self) -> CloudResult<ConfiguredClient> {
        let auth_url = AuthUrl::new(self.config.auth_url.clone())
            .map_err(|e| CloudError::Provider(format!("invalid auth URL: {e}")))?;
        let token_url = TokenUrl::new(self.config.token_url.clone())
            .map_err(|e| CloudError::Provider(format!("invalid token URL: {e}")))?;
        let redirect_url = RedirectUrl::new(self.config.redirect_uri.clone())
            .map_err(|e| CloudError::Provider(format!("invalid redirect URL: {e}")))?;

        let mut client = BasicClient::new(ClientId::new(self.config.client_id.clone()))
            .set_auth_uri(auth_url)
            .set_token_uri(token_url)
            .set_redirect_uri(redirect_url);

        if let Some(ref secret) = self.config.client_secret {
            client = client.set_client_secret(ClientSecret::new(secret.clone()));
        }

        Ok(client)
    }
}

/// Converts a token endpoint response, falling back to `previous_refresh`
/// when the server omits a refresh token.
fn token_info_from_response<T: TokenResponse>(
    resp: &T,
    previous_refresh: Option<String>,
) -> CloudTokenInfo {
    let expires_in = resp.expires_in().unwrap_or(DEFAULT_TOKEN_LIFETIME);
    CloudTokenInfo {
        access_token: resp.access_token().secret().clone(),
        refresh_token: resp
            .refresh_token()
            .map(|t| t.secret().clone())
            .or(previous_refresh),
        expires_at: now_millis() + expires_in.as_millis() as i64,
    }
}

/// True when the token endpoint itself rejected the grant, as opposed to a
/// transport or parse failure.
fn is_definitive_rejection<RE, T>(err: &RequestTokenError<RE, T>) -> bool
where
    RE: std::error::Error + 'static,
    T: oauth2::ErrorResponse + 'static,
{
    matches!(err, RequestTokenError::ServerResponse(_))
}
