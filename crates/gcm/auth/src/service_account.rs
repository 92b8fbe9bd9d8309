//! Service account token exchange.

use std::path::Path;

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::{AuthError, ServiceAccountKey, TokenSource};

/// Tokens with less validity left than this many seconds are refreshed.
const REFRESH_MARGIN_SECS: i64 = 60;

/// Lifetime requested for the signed assertion, in seconds.
const ASSERTION_LIFETIME_SECS: i64 = 3600;

const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";

#[derive(Debug, Serialize)]
struct Claims<'a> {
    iss: &'a str,
    sub: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: i64,
}

#[derive(Debug, Clone)]
struct CachedToken {
    access_token: String,
    expires_at: DateTime<Utc>,
}

impl CachedToken {
    fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        self.expires_at - now > Duration::seconds(REFRESH_MARGIN_SECS)
    }
}

/// Bearer tokens minted from a service account key via the JWT-bearer grant.
pub struct ServiceAccountAuth {
    key: ServiceAccountKey,
    encoding_key: EncodingKey,
    scope: String,
    http: reqwest::Client,
    cache: Mutex<Option<CachedToken>>,
}

impl ServiceAccountAuth {
    /// Create an authenticator for a key and OAuth scope.
    pub fn new(
        key: ServiceAccountKey,
        scope: impl Into<String>,
        http: reqwest::Client,
    ) -> Result<Self, AuthError> {
        let encoding_key =
            EncodingKey::from_rsa_pem(key.private_key.as_bytes()).map_err(AuthError::KeyParse)?;

        Ok(Self {
            key,
            encoding_key,
            scope: scope.into(),
            http,
            cache: Mutex::new(None),
        })
    }

    /// Load the key from a credentials file.
    pub fn from_file(
        path: &Path,
        scope: impl Into<String>,
        http: reqwest::Client,
    ) -> Result<Self, AuthError> {
        let key = ServiceAccountKey::from_file(path)?;
        Self::new(key, scope, http)
    }

    fn assertion(&self, now: DateTime<Utc>) -> Result<String, AuthError> {
        let claims = Claims {
            iss: &self.key.client_email,
            sub: &self.key.client_email,
            scope: &self.scope,
            aud: &self.key.token_uri,
            iat: now.timestamp(),
            exp: (now + Duration::seconds(ASSERTION_LIFETIME_SECS)).timestamp(),
        };

        let mut header = Header::new(Algorithm::RS256);
        header.kid = self.key.private_key_id.clone();

        jsonwebtoken::encode(&header, &claims, &self.encoding_key).map_err(AuthError::JwtEncode)
    }

    async fn fetch(&self) -> Result<CachedToken, AuthError> {
        let now = Utc::now();
        let assertion = self.assertion(now)?;

        tracing::debug!(
            client_email = %self.key.client_email,
            token_uri = %self.key.token_uri,
            "requesting access token"
        );

        let response = self
            .http
            .post(&self.key.token_uri)
            .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())])
            .send()
            .await
            .map_err(AuthError::Request)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AuthError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        let token: TokenResponse = response.json().await.map_err(AuthError::ResponseParse)?;

        Ok(CachedToken {
            access_token: token.access_token,
            expires_at: now + Duration::seconds(token.expires_in),
        })
    }
}

impl TokenSource for ServiceAccountAuth {
    fn project_id(&self) -> &str {
        &self.key.project_id
    }

    async fn access_token(&self) -> color_eyre::eyre::Result<String> {
        let mut cache = self.cache.lock().await;

        if let Some(cached) = cache.as_ref() {
            if cached.is_fresh(Utc::now()) {
                return Ok(cached.access_token.clone());
            }
        }

        let fresh = self.fetch().await?;
        tracing::info!(expires_at = %fresh.expires_at, "refreshed access token");

        let token = fresh.access_token.clone();
        *cache = Some(fresh);

        Ok(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::StaticToken;

    const TEST_KEY: &str = include_str!("testdata/test-key.pem");
    const SCOPE: &str = "https://www.googleapis.com/auth/firebase.messaging";

    fn key(token_uri: String) -> ServiceAccountKey {
        ServiceAccountKey {
            project_id: "demo-project".to_string(),
            private_key_id: Some("kid-1".to_string()),
            private_key: TEST_KEY.to_string(),
            client_email: "push@demo-project.iam.gserviceaccount.com".to_string(),
            client_id: None,
            token_uri,
        }
    }

    fn auth(server: &mockito::Server) -> ServiceAccountAuth {
        let key = key(format!("{}/token", server.url()));
        ServiceAccountAuth::new(key, SCOPE, reqwest::Client::new()).unwrap()
    }

    #[tokio::test]
    async fn test_token_is_cached() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/token")
            .match_body(mockito::Matcher::UrlEncoded(
                "grant_type".into(),
                JWT_BEARER_GRANT.into(),
            ))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"access_token": "ya29.first", "expires_in": 3600, "token_type": "Bearer"}"#)
            .expect(1)
            .create_async()
            .await;

        let auth = auth(&server);
        assert_eq!(auth.project_id(), "demo-project");
        assert_eq!(auth.access_token().await.unwrap(), "ya29.first");
        assert_eq!(auth.access_token().await.unwrap(), "ya29.first");

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_stale_token_is_refreshed() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/token")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"access_token": "ya29.short", "expires_in": 30, "token_type": "Bearer"}"#)
            .expect(2)
            .create_async()
            .await;

        let auth = auth(&server);
        auth.access_token().await.unwrap();
        auth.access_token().await.unwrap();

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_rejected_exchange() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/token")
            .with_status(400)
            .with_body(r#"{"error": "invalid_grant"}"#)
            .create_async()
            .await;

        let err = auth(&server).access_token().await.unwrap_err();
        match err.downcast_ref::<AuthError>() {
            Some(AuthError::Rejected { status, body }) => {
                assert_eq!(*status, 400);
                assert!(body.contains("invalid_grant"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_invalid_private_key() {
        let mut key = key("http://127.0.0.1/token".to_string());
        key.private_key = "not a pem".to_string();

        let result = ServiceAccountAuth::new(key, SCOPE, reqwest::Client::new());
        assert!(matches!(result, Err(AuthError::KeyParse(_))));
    }

    #[test]
    fn test_assertion_claims() {
        let key = key("https://oauth2.googleapis.com/token".to_string());
        let auth = ServiceAccountAuth::new(key, SCOPE, reqwest::Client::new()).unwrap();
        let now = Utc::now();
        let jwt = auth.assertion(now).unwrap();

        let header = jsonwebtoken::decode_header(&jwt).unwrap();
        assert_eq!(header.alg, Algorithm::RS256);
        assert_eq!(header.kid.as_deref(), Some("kid-1"));
        assert_eq!(jwt.split('.').count(), 3);
    }

    #[test]
    fn test_cached_token_freshness() {
        let now = Utc::now();
        let token = CachedToken {
            access_token: "t".into(),
            expires_at: now + Duration::seconds(61),
        };
        assert!(token.is_fresh(now));
        assert!(!token.is_fresh(now + Duration::seconds(2)));
    }

    #[tokio::test]
    async fn test_static_token() {
        let source = StaticToken::new("p", "tok");
        assert_eq!(source.project_id(), "p");
        assert_eq!(source.access_token().await.unwrap(), "tok");
    }
}
