//! Bearer tokens for the tool gateway.

use serde::Deserialize;

use crate::config::{GatewayConfig, OAuthConfig};
use crate::error::{AgentError, Result};

#[derive(Debug, Clone)]
pub enum TokenSource {
    /// A token issued out of band.
    Static(String),
    /// OAuth2 client-credentials grant, run on every `fetch`.
    ClientCredentials(OAuthConfig),
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
}

impl TokenSource {
    pub fn from_config(config: &GatewayConfig) -> Result<Self> {
        match (&config.token, &config.oauth) {
            (Some(token), _) => Ok(TokenSource::Static(token.clone())),
            (None, Some(oauth)) => Ok(TokenSource::ClientCredentials(oauth.clone())),
            (None, None) => Err(AgentError::InvalidConfig(
                "gateway needs either a token or oauth credentials".to_string(),
            )),
        }
    }

    pub async fn fetch(&self, client: &reqwest::Client) -> Result<String> {
        let oauth = match self {
            TokenSource::Static(token) => return Ok(token.clone()),
            TokenSource::ClientCredentials(oauth) => oauth,
        };

        let mut form = vec![("grant_type", "client_credentials")];
        if !oauth.scope.is_empty() {
            form.push(("scope", oauth.scope.as_str()));
        }

        let response = client
            .post(&oauth.token_url)
            .basic_auth(&oauth.client_id, Some(&oauth.client_secret))
            .form(&form)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            tracing::warn!(target: "gateway", %status, "Token request rejected");
            return Err(AgentError::Authentication(format!(
                "token endpoint returned {}: {}",
                status, detail
            )));
        }

        let token: TokenResponse = response.json().await?;
        tracing::debug!(target: "gateway", "Obtained access token");
        Ok(token.access_token)
    }
}
