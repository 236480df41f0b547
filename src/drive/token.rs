use serde::Deserialize;

use super::DriveError;

pub const DRIVE_READONLY_SCOPE: &str = "https://www.googleapis.com/auth/drive.readonly";

/// Default service-account token endpoint on Google-hosted runtimes.
pub const METADATA_TOKEN_URL: &str =
    "http://metadata.google.internal/computeMetadata/v1/instance/service-accounts/default/token";

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct AccessToken {
    pub access_token: String,
    #[serde(default)]
    pub expires_in: Option<u64>,
    #[serde(default = "default_token_type")]
    pub token_type: String,
}

fn default_token_type() -> String { "Bearer".to_string() }

/// Where the read-only credential for one invocation comes from.
#[derive(Debug, Clone)]
pub enum TokenSource {
    /// Pre-minted bearer token (env or config). Useful locally and behind token brokers.
    Static(String),
    /// Runtime metadata server, asked on every invocation.
    MetadataServer { url: String },
}

impl TokenSource {
    pub async fn fetch(&self, http: &reqwest::Client) -> Result<AccessToken, DriveError> {
        match self {
            TokenSource::Static(token) => {
                if token.trim().is_empty() {
                    return Err(DriveError::Token("static access token is empty".into()));
                }
                Ok(AccessToken { access_token: token.trim().to_string(), expires_in: None, token_type: default_token_type() })
            }
            TokenSource::MetadataServer { url } => {
                let resp = http
                    .get(url)
                    .header("Metadata-Flavor", "Google")
                    .query(&[("scopes", DRIVE_READONLY_SCOPE)])
                    .send()
                    .await
                    .map_err(|e| DriveError::Token(e.to_string()))?;
                let status = resp.status();
                if !status.is_success() {
                    let body = resp.text().await.unwrap_or_default();
                    return Err(DriveError::Token(format!("metadata server HTTP {}: {}", status.as_u16(), body)));
                }
                let token: AccessToken = resp.json().await.map_err(|e| DriveError::Token(e.to_string()))?;
                if token.access_token.is_empty() {
                    return Err(DriveError::Token("metadata server returned an empty token".into()));
                }
                Ok(token)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn static_token_is_trimmed() {
        let http = reqwest::Client::new();
        let tok = TokenSource::Static("  ya29.abc \n".into()).fetch(&http).await.unwrap();
        assert_eq!(tok.access_token, "ya29.abc");
        assert_eq!(tok.token_type, "Bearer");
    }

    #[tokio::test]
    async fn empty_static_token_is_rejected() {
        let http = reqwest::Client::new();
        let err = TokenSource::Static("   ".into()).fetch(&http).await.unwrap_err();
        assert!(matches!(err, DriveError::Token(_)));
    }

    #[test]
    fn metadata_token_shape_decodes() {
        let tok: AccessToken = serde_json::from_str(r#"{"access_token":"t","expires_in":3599,"token_type":"Bearer"}"#).unwrap();
        assert_eq!(tok.expires_in, Some(3599));
    }
}
