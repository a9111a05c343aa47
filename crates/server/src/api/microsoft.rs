//! Microsoft login redirect endpoints.
//!
//! - `GET /oauth/microsoft?source=...` - start a login, redirect to Azure AD
//! - `GET /callback/microsoft?code=...&state=...` - finish it, redirect to `source`
//!
//! The return address and the CSRF state travel between the two requests in
//! HTTP-only cookies scoped to the callback path. Both are cleared once the
//! callback succeeds.

use axum::{
    extract::{Query, State},
    response::Redirect,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::Deserialize;
use utoipa::IntoParams;
use utoipa_axum::{router::OpenApiRouter, routes};

use crate::AppState;
use crate::error::LoginError;
use crate::redirect::with_token;

/// Tag for OpenAPI documentation.
pub const MICROSOFT_TAG: &str = "Microsoft Login";

pub const LOGIN_PATH: &str = "/oauth/microsoft";
pub const CALLBACK_PATH: &str = "/callback/microsoft";

/// Cookie holding the caller's return address. `CookieJar` percent-encodes
/// the value, so URLs containing `;` or `,` survive the round trip.
pub const SOURCE_COOKIE: &str = "sourceURL";
/// Cookie holding the `state` sent to Azure AD.
pub const STATE_COOKIE: &str = "oauthState";

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct LoginParams {
    /// Absolute URL the browser returns to with `token` appended.
    pub source: Option<String>,
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct CallbackParams {
    /// Authorization code issued by Azure AD.
    pub code: Option<String>,
    /// State echoed back by Azure AD.
    pub state: Option<String>,
    /// Set by Azure AD when the user declined or the request was invalid.
    pub error: Option<String>,
    pub error_description: Option<String>,
}

pub fn router(state: AppState) -> OpenApiRouter {
    OpenApiRouter::new()
        .routes(routes!(login))
        .routes(routes!(callback))
        .with_state(state)
}

/// Session cookie carried across the provider round trip.
fn flow_cookie(name: &'static str, value: String) -> Cookie<'static> {
    Cookie::build((name, value))
        .path(CALLBACK_PATH)
        .secure(true)
        .http_only(true)
        // Lax still sends the cookie on Azure AD's top-level redirect back.
        .same_site(SameSite::Lax)
        .build()
}

/// An empty expected state never matches.
fn states_match(expected: &str, returned: &str) -> bool {
    let (a, b) = (expected.as_bytes(), returned.as_bytes());
    !a.is_empty()
        && a.len() == b.len()
        && a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

/// Start a Microsoft login.
#[tracing::instrument(skip(state, jar))]
#[utoipa::path(
    get,
    path = "/oauth/microsoft",
    tag = MICROSOFT_TAG,
    operation_id = "Microsoft Login",
    summary = "Redirect the browser to Azure AD",
    description = "Remembers `source` and a fresh CSRF state in HTTP-only cookies, then redirects to the \
                   tenant's authorize endpoint requesting the `User.Read` Graph permission.",
    params(LoginParams),
    responses(
        (status = 303, description = "Redirect to the Azure AD authorize endpoint"),
        (status = 400, description = "`source` missing or not an allowed URL", body = crate::error::ErrorBody),
    )
)]
pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    Query(params): Query<LoginParams>,
) -> Result<(CookieJar, Redirect), LoginError> {
    let source = params
        .source
        .filter(|s| !s.trim().is_empty())
        .ok_or(LoginError::MissingSource)?;
    state.redirect_policy.check(&source)?;

    let request = state.oauth.authorization_request();
    let jar = jar
        .add(flow_cookie(SOURCE_COOKIE, source))
        .add(flow_cookie(STATE_COOKIE, request.state.secret().clone()));

    tracing::debug!(authorize_url = %request.url, "redirecting to Azure AD");
    Ok((jar, Redirect::to(request.url.as_str())))
}

/// Finish a Microsoft login.
#[tracing::instrument(skip(state, jar, params))]
#[utoipa::path(
    get,
    path = "/callback/microsoft",
    tag = MICROSOFT_TAG,
    operation_id = "Microsoft Callback",
    summary = "Exchange the code and return to the caller",
    description = "Verifies `state`, exchanges `code` for a Graph access token, reads `/me`, mints an HS256 \
                   application token from the profile and redirects to the remembered `source` with `token` \
                   appended to its query.",
    params(CallbackParams),
    responses(
        (status = 303, description = "Redirect to the source URL with `token` appended"),
        (status = 400, description = "State mismatch, missing flow cookies or code, or Graph request failed", body = crate::error::ErrorBody),
        (status = 401, description = "Azure AD rejected the authorization code", body = crate::error::ErrorBody),
        (status = 500, description = "Profile could not be decoded or the token could not be signed", body = crate::error::ErrorBody),
    )
)]
pub async fn callback(
    State(state): State<AppState>,
    jar: CookieJar,
    Query(params): Query<CallbackParams>,
) -> Result<(CookieJar, Redirect), LoginError> {
    if let Some(error) = params.error {
        let detail = match params.error_description {
            Some(description) => format!("{error}: {description}"),
            None => error,
        };
        return Err(LoginError::Exchange(detail));
    }

    let expected_state = jar
        .get(STATE_COOKIE)
        .map(|c| c.value().to_string())
        .ok_or(LoginError::MissingFlowCookie)?;
    let source = jar
        .get(SOURCE_COOKIE)
        .map(|c| c.value().to_string())
        .ok_or(LoginError::MissingFlowCookie)?;

    let returned_state = params.state.unwrap_or_default();
    if !states_match(&expected_state, &returned_state) {
        return Err(LoginError::StateMismatch);
    }

    let code = params
        .code
        .filter(|c| !c.is_empty())
        .ok_or(LoginError::MissingCode)?;
    let source_url = state.redirect_policy.check(&source)?;

    let mut profile = state.oauth.complete_login(&code).await?;
    profile.token = state.minter.mint(&profile)?;

    let target = with_token(source_url, &profile.token);
    let jar = jar
        .remove(flow_cookie(SOURCE_COOKIE, String::new()))
        .remove(flow_cookie(STATE_COOKIE, String::new()));

    tracing::info!(user_id = %profile.id, host = ?target.host_str(), "login completed");
    Ok((jar, Redirect::to(target.as_str())))
}
