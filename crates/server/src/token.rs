//! Application token minting.
//!
//! The token is an HS256 JWT carrying the profile fields the front-end needs.
//! It carries no `exp`, `iat` or `jti`, so minting is a pure function of the
//! profile and the secret.

use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::profile::UserProfile;

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("failed to sign application token: {0}")]
    Signing(#[source] jsonwebtoken::errors::Error),
    #[error("invalid application token: {0}")]
    Invalid(#[source] jsonwebtoken::errors::Error),
}

/// Claims embedded in the application token.
///
/// `mail` duplicates `email`; consumers read either.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileClaims {
    pub email: String,
    pub display_name: String,
    pub job_title: String,
    pub id: String,
    pub mail: String,
    pub office_location: String,
}

impl From<&UserProfile> for ProfileClaims {
    fn from(profile: &UserProfile) -> Self {
        Self {
            email: profile.mail.clone(),
            display_name: profile.display_name.clone(),
            job_title: profile.job_title.clone(),
            id: profile.id.clone(),
            mail: profile.mail.clone(),
            office_location: profile.office_location.clone(),
        }
    }
}

/// Signs and verifies application tokens with a shared HMAC secret.
#[derive(Clone)]
pub struct TokenMinter {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl std::fmt::Debug for TokenMinter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenMinter").finish_non_exhaustive()
    }
}

impl TokenMinter {
    pub fn new(secret: &[u8]) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
        }
    }

    #[tracing::instrument(skip_all, fields(user_id = %profile.id))]
    pub fn mint(&self, profile: &UserProfile) -> Result<String, TokenError> {
        let claims = ProfileClaims::from(profile);
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding).map_err(TokenError::Signing)
    }

    /// Checks the signature and returns the embedded claims.
    pub fn verify(&self, token: &str) -> Result<ProfileClaims, TokenError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.required_spec_claims.clear();
        validation.validate_exp = false;

        decode::<ProfileClaims>(token, &self.decoding, &validation)
            .map(|data| data.claims)
            .map_err(TokenError::Invalid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{Value, json};

    fn sample_profile() -> UserProfile {
        UserProfile {
            id: "1".into(),
            display_name: "A B".into(),
            mail: "a@b.com".into(),
            job_title: "Eng".into(),
            office_location: "HQ".into(),
            token: String::new(),
        }
    }

    fn raw_payload(token: &str, secret: &[u8]) -> Value {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.required_spec_claims.clear();
        validation.validate_exp = false;
        decode::<Value>(token, &DecodingKey::from_secret(secret), &validation)
            .unwrap()
            .claims
    }

    #[test]
    fn payload_contains_exactly_the_profile_claims() {
        let minter = TokenMinter::new(b"secret");
        let token = minter.mint(&sample_profile()).unwrap();

        assert_eq!(
            raw_payload(&token, b"secret"),
            json!({
                "email": "a@b.com",
                "displayName": "A B",
                "jobTitle": "Eng",
                "id": "1",
                "mail": "a@b.com",
                "officeLocation": "HQ"
            })
        );
    }

    #[test]
    fn minting_is_deterministic() {
        let minter = TokenMinter::new(b"secret");
        let first = minter.mint(&sample_profile()).unwrap();
        let second = minter.mint(&sample_profile()).unwrap();
        assert_eq!(first, second);

        let other = TokenMinter::new(b"other-secret")
            .mint(&sample_profile())
            .unwrap();
        let (signed_a, sig_a) = first.rsplit_once('.').unwrap();
        let (signed_b, sig_b) = other.rsplit_once('.').unwrap();
        assert_eq!(signed_a, signed_b);
        assert_ne!(sig_a, sig_b);
    }

    #[test]
    fn verify_round_trips_claims() {
        let minter = TokenMinter::new(b"secret");
        let token = minter.mint(&sample_profile()).unwrap();
        let claims = minter.verify(&token).unwrap();
        assert_eq!(claims, ProfileClaims::from(&sample_profile()));
    }

    #[test]
    fn verify_rejects_foreign_secret() {
        let token = TokenMinter::new(b"secret").mint(&sample_profile()).unwrap();
        let result = TokenMinter::new(b"not-the-secret").verify(&token);
        assert!(matches!(result, Err(TokenError::Invalid(_))));
    }

    #[test]
    fn header_is_hs256() {
        let token = TokenMinter::new(b"secret").mint(&sample_profile()).unwrap();
        let header = jsonwebtoken::decode_header(&token).unwrap();
        assert_eq!(header.alg, Algorithm::HS256);
    }
}
