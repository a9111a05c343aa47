//! OpenAPI/Utoipa configuration.

use crate::api::{health::MISC_TAG, microsoft::MICROSOFT_TAG};
use crate::microsoft::USER_READ_SCOPE;
use utoipa::{
    Modify, OpenApi,
    openapi::security::{AuthorizationCode, Flow, OAuth2, Scopes, SecurityScheme},
};

/// Describes the upstream Azure AD flow the login routes drive.
pub struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            let oauth2 = OAuth2::with_description(
                [Flow::AuthorizationCode(AuthorizationCode::new(
                    "https://login.microsoftonline.com/{tenant}/oauth2/v2.0/authorize",
                    "https://login.microsoftonline.com/{tenant}/oauth2/v2.0/token",
                    Scopes::from_iter([(USER_READ_SCOPE, "Read the signed-in user's profile")]),
                ))],
                "Azure AD authorization-code flow performed by the broker on behalf of the browser.",
            );
            components.add_security_scheme("AzureAD", SecurityScheme::OAuth2(oauth2));
        }
    }
}

/// OpenAPI documentation configuration.
#[derive(OpenApi)]
#[openapi(
    modifiers(&SecurityAddon),
    info(
        title = "Microsoft Login Broker",
        version = "1.0.0",
        description = "Redirect-based \"login with Microsoft\" that returns an application JWT to the caller."
    ),
    components(schemas(crate::error::ErrorBody)),
    tags(
        (name = MISC_TAG, description = "Miscellaneous endpoints"),
        (name = MICROSOFT_TAG, description = "Microsoft login redirect flow")
    )
)]
pub struct ApiDoc;
