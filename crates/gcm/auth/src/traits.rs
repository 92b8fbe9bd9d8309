//! Token source traits.

/// Supplies bearer tokens for gateway requests.
#[trait_variant::make(Send)]
pub trait TokenSource: Send + Sync {
    /// Firebase project the tokens are valid for.
    fn project_id(&self) -> &str;

    /// Get a bearer token, refreshing it if needed.
    async fn access_token(&self) -> color_eyre::eyre::Result<String>;
}

/// Fixed token, for pre-provisioned credentials and tests.
#[derive(Debug, Clone)]
pub struct StaticToken {
    project_id: String,
    token: String,
}

impl StaticToken {
    pub fn new(project_id: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            project_id: project_id.into(),
            token: token.into(),
        }
    }
}

impl TokenSource for StaticToken {
    fn project_id(&self) -> &str {
        &self.project_id
    }

    async fn access_token(&self) -> color_eyre::eyre::Result<String> {
        Ok(self.token.clone())
    }
}
