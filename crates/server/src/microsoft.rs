//! Azure AD authorization-code client and Microsoft Graph profile fetcher.
//!
//! One [`MicrosoftOAuth`] is built at startup from [`AppConfig`] and shared
//! read-only by every request; there is no per-request reconfiguration.

use oauth2::basic::BasicClient;
use oauth2::{
    AuthType, AuthUrl, AuthorizationCode, ClientId, ClientSecret, CsrfToken, EndpointNotSet,
    EndpointSet, RedirectUrl, RequestTokenError, Scope, TokenResponse, TokenUrl,
};
use reqwest::{Client, redirect};
use url::Url;

use crate::config::{AppConfig, ConfigError};
use crate::error::LoginError;
use crate::profile::UserProfile;

/// Delegated Graph permission requested at consent.
pub const USER_READ_SCOPE: &str = "https://graph.microsoft.com/User.Read";

/// Upper bound on the Graph profile body we are willing to buffer.
const MAX_PROFILE_BYTES: usize = 64 * 1024;

type AzureAdClient =
    BasicClient<EndpointSet, EndpointNotSet, EndpointNotSet, EndpointNotSet, EndpointSet>;

/// The provider redirect produced for one login attempt.
#[derive(Debug)]
pub struct AuthorizationRequest {
    pub url: Url,
    pub state: CsrfToken,
}

#[derive(Clone, Debug)]
pub struct MicrosoftOAuth {
    client: AzureAdClient,
    http: Client,
    graph_me_url: Url,
}

impl MicrosoftOAuth {
    /// Builds the client for the configured tenant.
    ///
    /// Endpoints are `{authority}/{tenant}/oauth2/v2.0/{authorize,token}`.
    /// An empty `redirect_url` leaves `redirect_uri` off the requests and the
    /// provider falls back to the application's registered default.
    pub fn from_config(config: &AppConfig) -> Result<Self, ConfigError> {
        let authority = config.authority_url.trim_end_matches('/');
        let tenant = config.tenant_id.trim();

        let auth_url = AuthUrl::new(format!("{authority}/{tenant}/oauth2/v2.0/authorize"))
            .map_err(|e| ConfigError::Validation(format!("authorize endpoint: {e}")))?;
        let token_url = TokenUrl::new(format!("{authority}/{tenant}/oauth2/v2.0/token"))
            .map_err(|e| ConfigError::Validation(format!("token endpoint: {e}")))?;
        let graph_me_url = Url::parse(&config.graph_me_url)
            .map_err(|e| ConfigError::Validation(format!("graph endpoint: {e}")))?;

        let mut client = BasicClient::new(ClientId::new(config.client_id.clone()))
            .set_client_secret(ClientSecret::new(config.client_secret.clone()))
            // Azure AD expects client credentials in the form body.
            .set_auth_type(AuthType::RequestBody)
            .set_auth_uri(auth_url)
            .set_token_uri(token_url);

        if !config.redirect_url.trim().is_empty() {
            let redirect_url = RedirectUrl::new(config.redirect_url.clone())
                .map_err(|e| ConfigError::Validation(format!("redirect url: {e}")))?;
            client = client.set_redirect_uri(redirect_url);
        }

        // Following redirects from the token endpoint would leak the code.
        let http = Client::builder()
            .redirect(redirect::Policy::none())
            .timeout(config.http_timeout())
            .build()
            .map_err(|e| ConfigError::Validation(format!("http client: {e}")))?;

        Ok(Self {
            client,
            http,
            graph_me_url,
        })
    }

    /// Authorize URL for a new login attempt, tagged with a fresh random state.
    pub fn authorization_request(&self) -> AuthorizationRequest {
        let (url, state) = self
            .client
            .authorize_url(CsrfToken::new_random)
            .add_scope(Scope::new(USER_READ_SCOPE.to_string()))
            .url();
        AuthorizationRequest { url, state }
    }

    /// Trades an authorization code for a Graph access token.
    #[tracing::instrument(skip_all)]
    pub async fn exchange_code(&self, code: &str) -> Result<String, LoginError> {
        let token = self
            .client
            .exchange_code(AuthorizationCode::new(code.to_string()))
            .request_async(&self.http)
            .await
            .map_err(|e| {
                let detail = match &e {
                    RequestTokenError::ServerResponse(err) => match err.error_description() {
                        Some(description) => format!("{}: {description}", err.error()),
                        None => err.error().to_string(),
                    },
                    RequestTokenError::Request(err) => format!("request failed: {err}"),
                    RequestTokenError::Parse(err, _) => format!("unparseable response: {err}"),
                    RequestTokenError::Other(msg) => msg.clone(),
                };
                LoginError::Exchange(detail)
            })?;

        Ok(token.access_token().secret().clone())
    }

    /// Fetches the signed-in user's profile from Graph.
    #[tracing::instrument(skip_all)]
    pub async fn fetch_profile(&self, access_token: &str) -> Result<UserProfile, LoginError> {
        let response = self
            .http
            .get(self.graph_me_url.clone())
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| LoginError::Upstream(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(LoginError::Upstream(format!("Graph responded with {status}")));
        }

        if response
            .content_length()
            .is_some_and(|len| len > MAX_PROFILE_BYTES as u64)
        {
            return Err(LoginError::ProfileRead("profile body too large".into()));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| LoginError::ProfileRead(e.to_string()))?;
        if body.len() > MAX_PROFILE_BYTES {
            return Err(LoginError::ProfileRead("profile body too large".into()));
        }

        Ok(serde_json::from_slice(&body)?)
    }

    /// Exchange then fetch: the callback half of the flow.
    pub async fn complete_login(&self, code: &str) -> Result<UserProfile, LoginError> {
        let access_token = self.exchange_code(code).await?;
        let profile = self.fetch_profile(&access_token).await?;
        tracing::info!(user_id = %profile.id, "fetched Microsoft profile");
        Ok(profile)
    }
}
