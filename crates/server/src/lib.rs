//! A "login with Microsoft" broker.
//!
//! The broker sends the browser through the Azure AD authorization-code flow,
//! reads the user's Microsoft Graph profile, mints an application JWT from it
//! and hands that token back to the caller-supplied `source` URL.

use std::sync::Arc;

use crate::config::{AppConfig, ConfigError};
use crate::microsoft::MicrosoftOAuth;
use crate::redirect::RedirectPolicy;
use crate::token::TokenMinter;

pub mod api;
pub mod config;
pub mod error;
pub mod microsoft;
pub mod profile;
pub mod redirect;
pub mod token;

/// Immutable per-process state shared by the handlers.
#[derive(Clone, Debug)]
pub struct AppState {
    pub oauth: Arc<MicrosoftOAuth>,
    pub minter: TokenMinter,
    pub redirect_policy: Arc<RedirectPolicy>,
}

impl AppState {
    pub fn from_config(config: &AppConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            oauth: Arc::new(MicrosoftOAuth::from_config(config)?),
            minter: TokenMinter::new(config.jwt_secret.as_bytes()),
            redirect_policy: Arc::new(RedirectPolicy::new(&config.allowed_redirect_hosts)),
        })
    }
}
