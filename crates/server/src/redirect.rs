//! Validation of caller-supplied return addresses.

use url::Url;

use crate::error::LoginError;

/// Decides which `source` URLs the broker will send a token to.
///
/// A source must be an absolute `http`/`https` URL without embedded
/// credentials. With a non-empty allow-list its host must also match one
/// of the listed hosts exactly (case-insensitive).
#[derive(Clone, Debug, Default)]
pub struct RedirectPolicy {
    allowed_hosts: Vec<String>,
}

impl RedirectPolicy {
    pub fn new<I, S>(allowed_hosts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            allowed_hosts: allowed_hosts
                .into_iter()
                .map(|h| h.as_ref().trim().to_ascii_lowercase())
                .filter(|h| !h.is_empty())
                .collect(),
        }
    }

    /// True when every well-formed http(s) URL is accepted.
    pub fn is_open(&self) -> bool {
        self.allowed_hosts.is_empty()
    }

    pub fn check(&self, source: &str) -> Result<Url, LoginError> {
        let url = Url::parse(source).map_err(|e| LoginError::InvalidSource(e.to_string()))?;

        if !matches!(url.scheme(), "http" | "https") {
            return Err(LoginError::InvalidSource(format!(
                "unsupported scheme `{}`",
                url.scheme()
            )));
        }
        if !url.username().is_empty() || url.password().is_some() {
            return Err(LoginError::InvalidSource(
                "credentials are not allowed in the URL".into(),
            ));
        }

        let host = url
            .host_str()
            .ok_or_else(|| LoginError::InvalidSource("URL has no host".into()))?
            .to_ascii_lowercase();

        if !self.is_open() && !self.allowed_hosts.iter().any(|h| *h == host) {
            return Err(LoginError::InvalidSource(format!(
                "host `{host}` is not allowed"
            )));
        }

        Ok(url)
    }
}

/// Appends `token` to the source URL's query, leaving existing pairs as they are.
pub fn with_token(mut source: Url, token: &str) -> Url {
    source.query_pairs_mut().append_pair("token", token);
    source
}
