//! Configuration for the REST gateway.

/// A previously-issued refresh token to recover a session from.
#[derive(Debug, Clone)]
pub struct PersistedSession {
    /// Refresh token from an earlier sign-in.
    pub refresh_token: String,
}

/// Connection settings for the hosted backend.
#[derive(Debug, Clone)]
pub struct RestConfig {
    /// Base URL of the project (e.g. "https://project.example.co").
    pub base_url: String,
    /// Public API key sent with every request.
    pub api_key: String,
    /// Optional persisted session to recover during connect.
    /// Where this token is stored between runs is the embedder's concern.
    pub persisted: Option<PersistedSession>,
}

impl RestConfig {
    /// Create a configuration with the given base URL and API key.
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            persisted: None,
        }
    }

    /// Attach a persisted session for recovery.
    pub fn with_persisted_session(mut self, refresh_token: impl Into<String>) -> Self {
        self.persisted = Some(PersistedSession {
            refresh_token: refresh_token.into(),
        });
        self
    }

    /// Data endpoint for a table.
    pub fn rest_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.base_url, table)
    }

    /// Auth endpoint for an operation (e.g. "token", "signup", "logout").
    pub fn auth_url(&self, op: &str) -> String {
        format!("{}/auth/v1/{}", self.base_url, op)
    }

    /// Storage endpoint for an object.
    pub fn storage_url(&self, bucket: &str, path: &str) -> String {
        format!("{}/storage/v1/object/{}/{}", self.base_url, bucket, path)
    }

    /// Public (unauthenticated) address of a stored object.
    pub fn public_object_url(&self, bucket: &str, path: &str) -> String {
        format!("{}/storage/v1/object/public/{}/{}", self.base_url, bucket, path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_urls() {
        let config = RestConfig::new("https://x.example.co/", "key");
        assert_eq!(config.rest_url("friends"), "https://x.example.co/rest/v1/friends");
        assert_eq!(
            config.auth_url("token"),
            "https://x.example.co/auth/v1/token"
        );
        assert_eq!(
            config.storage_url("postcards", "u1/a.png"),
            "https://x.example.co/storage/v1/object/postcards/u1/a.png"
        );
        assert_eq!(
            config.public_object_url("postcards", "u1/a.png"),
            "https://x.example.co/storage/v1/object/public/postcards/u1/a.png"
        );
    }
}
