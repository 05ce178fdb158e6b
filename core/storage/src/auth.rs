//! OAuth2 token exchange shared by the bearer-token providers.

use oauth2::basic::BasicTokenResponse;
use oauth2::{AccessToken, TokenResponse};
use tracing::info;

use cloudface_common::{Error, Result};

use crate::transport::{HttpRequest, Transport};

/// Exchange a grant for a bearer access token.
///
/// `form` carries the grant (`grant_type` plus its fields); it is posted
/// form-encoded to `token_url`.
///
/// # Errors
/// - [`Error::InvalidRequest`] if the token endpoint rejects the grant
/// - [`Error::Serialization`] if the response is not a token response
pub async fn exchange_token(
    transport: &dyn Transport,
    token_url: &str,
    form: &[(&str, &str)],
) -> Result<AccessToken> {
    let grant_type = form
        .iter()
        .find(|(key, _)| *key == "grant_type")
        .map(|(_, value)| *value)
        .unwrap_or("unknown");
    info!("Requesting access token ({} grant)", grant_type);

    let response = transport
        .send(HttpRequest::post(token_url).form(form))
        .await?
        .require_success()?;

    let token: BasicTokenResponse = response.json()?;
    Ok(token.access_token().clone())
}

/// The stored bearer token, or `NotAuthorized` for `provider`.
pub fn bearer<'a>(token: &'a Option<AccessToken>, provider: &str) -> Result<&'a str> {
    token
        .as_ref()
        .map(|token| token.secret().as_str())
        .ok_or_else(|| Error::NotAuthorized {
            provider: provider.to_string(),
        })
}
