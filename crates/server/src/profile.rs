//! Microsoft Graph user profile as returned by `GET /v1.0/me`.

use serde::{Deserialize, Deserializer};

/// The signed-in user's profile.
///
/// Graph reports unset attributes (job title, office location, mail for
/// accounts without a mailbox) as `null`; those decode to empty strings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    #[serde(default, deserialize_with = "nullable")]
    pub id: String,
    #[serde(default, deserialize_with = "nullable")]
    pub display_name: String,
    #[serde(default, deserialize_with = "nullable")]
    pub mail: String,
    #[serde(default, deserialize_with = "nullable")]
    pub job_title: String,
    #[serde(default, deserialize_with = "nullable")]
    pub office_location: String,
    /// Application token minted for this profile; never part of the Graph response.
    #[serde(default, skip_deserializing)]
    pub token: String,
}

fn nullable<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}
