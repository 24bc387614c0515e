//! The REST gateway client.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::Deserialize;
use tokio::sync::{broadcast, RwLock};
use tracing::{debug, info, warn};

use store_core::{AuthError, Filter, Query, Row, Session, StoreError, StoreGateway};

use crate::config::RestConfig;
use crate::postgrest::{filter_params, query_params};

/// Token payload returned by the auth endpoints.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    user: AuthUser,
}

#[derive(Debug, Deserialize)]
struct AuthUser {
    id: String,
}

/// Sign-up may return a full token payload, or just the pending user when
/// the project requires confirmation first.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum SignUpResponse {
    Token(TokenResponse),
    Pending {
        #[allow(dead_code)]
        id: String,
    },
}

/// Error payload shapes the backend uses across its endpoints.
#[derive(Debug, Deserialize, Default)]
struct ErrorBody {
    #[serde(default)]
    error_description: Option<String>,
    #[serde(default)]
    msg: Option<String>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

impl ErrorBody {
    fn into_message(self) -> Option<String> {
        self.error_description
            .or(self.msg)
            .or(self.message)
            .or(self.error)
    }
}

/// Classify an auth failure response into the shared error kinds.
///
/// Unrecognized messages pass through verbatim.
fn classify_auth_failure(status: StatusCode, message: &str) -> AuthError {
    if status == StatusCode::TOO_MANY_REQUESTS {
        return AuthError::RateLimited;
    }
    let lower = message.to_lowercase();
    if lower.contains("invalid login credentials") {
        AuthError::InvalidCredentials
    } else if lower.contains("not confirmed") {
        AuthError::AccountUnconfirmed
    } else if lower.contains("already registered") || lower.contains("already exists") {
        AuthError::AccountAlreadyExists
    } else if lower.contains("rate limit") || lower.contains("too many requests") {
        AuthError::RateLimited
    } else {
        AuthError::Backend(message.to_string())
    }
}

struct AuthState {
    session: Session,
    refresh_token: Option<String>,
}

/// Client for the hosted backend's data, auth, and storage endpoints.
pub struct RestStore {
    http: Client,
    config: RestConfig,
    auth: RwLock<Option<AuthState>>,
    sessions_tx: broadcast::Sender<Option<Session>>,
}

impl RestStore {
    /// Connect to the backend.
    ///
    /// If the configuration carries a persisted refresh token, a session
    /// recovery is attempted; recovery failure leaves the store signed
    /// out rather than failing the connect.
    pub async fn connect(config: RestConfig) -> Result<Self, StoreError> {
        let http = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| StoreError::Read(format!("http client: {}", e)))?;
        let (sessions_tx, _) = broadcast::channel(16);

        let store = Self {
            http,
            config,
            auth: RwLock::new(None),
            sessions_tx,
        };

        if let Some(persisted) = store.config.persisted.clone() {
            match store.refresh_session(&persisted.refresh_token).await {
                Ok(session) => {
                    info!(user = %session.user_id, "recovered persisted session");
                }
                Err(err) => {
                    warn!("session recovery failed, starting signed out: {}", err);
                }
            }
        }

        Ok(store)
    }

    async fn bearer(&self) -> Option<String> {
        self.auth
            .read()
            .await
            .as_ref()
            .map(|state| state.session.access_token.clone())
    }

    /// Attach the API key and the strongest available bearer token.
    async fn authed(&self, request: RequestBuilder) -> RequestBuilder {
        let bearer = self
            .bearer()
            .await
            .unwrap_or_else(|| self.config.api_key.clone());
        request
            .header("apikey", &self.config.api_key)
            .bearer_auth(bearer)
    }

    async fn install_session(&self, token: TokenResponse) -> Session {
        let session = Session::new(token.user.id.as_str(), token.access_token);
        *self.auth.write().await = Some(AuthState {
            session: session.clone(),
            refresh_token: token.refresh_token,
        });
        let _ = self.sessions_tx.send(Some(session.clone()));
        session
    }

    async fn refresh_session(&self, refresh_token: &str) -> Result<Session, AuthError> {
        let response = self
            .http
            .post(self.config.auth_url("token"))
            .query(&[("grant_type", "refresh_token")])
            .header("apikey", &self.config.api_key)
            .json(&serde_json::json!({ "refresh_token": refresh_token }))
            .send()
            .await
            .map_err(|e| AuthError::Backend(e.to_string()))?;
        let token = Self::read_auth_body::<TokenResponse>(response).await?;
        Ok(self.install_session(token).await)
    }

    /// Read an auth response, classifying failures.
    async fn read_auth_body<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, AuthError> {
        let status = response.status();
        if status.is_success() {
            response
                .json::<T>()
                .await
                .map_err(|e| AuthError::Backend(e.to_string()))
        } else {
            let message = response
                .json::<ErrorBody>()
                .await
                .ok()
                .and_then(ErrorBody::into_message)
                .unwrap_or_else(|| format!("auth request failed with status {}", status));
            Err(classify_auth_failure(status, &message))
        }
    }

    /// Read a data response body, folding failures into one error kind.
    async fn read_data_body<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
        on_error: fn(String) -> StoreError,
    ) -> Result<T, StoreError> {
        let status = response.status();
        if status.is_success() {
            response.json::<T>().await.map_err(|e| on_error(e.to_string()))
        } else {
            let body = response.text().await.unwrap_or_default();
            Err(on_error(format!("status {}: {}", status, body)))
        }
    }
}

#[async_trait]
impl StoreGateway for RestStore {
    async fn current_session(&self) -> Option<Session> {
        self.auth.read().await.as_ref().map(|s| s.session.clone())
    }

    fn subscribe_sessions(&self) -> broadcast::Receiver<Option<Session>> {
        self.sessions_tx.subscribe()
    }

    async fn sign_in(&self, identifier: &str, secret: &str) -> Result<Session, AuthError> {
        let response = self
            .http
            .post(self.config.auth_url("token"))
            .query(&[("grant_type", "password")])
            .header("apikey", &self.config.api_key)
            .json(&serde_json::json!({ "email": identifier, "password": secret }))
            .send()
            .await
            .map_err(|e| AuthError::Backend(e.to_string()))?;
        let token = Self::read_auth_body::<TokenResponse>(response).await?;
        let session = self.install_session(token).await;
        info!(user = %session.user_id, "signed in");
        Ok(session)
    }

    async fn sign_up(&self, identifier: &str, secret: &str) -> Result<Session, AuthError> {
        let response = self
            .http
            .post(self.config.auth_url("signup"))
            .header("apikey", &self.config.api_key)
            .json(&serde_json::json!({ "email": identifier, "password": secret }))
            .send()
            .await
            .map_err(|e| AuthError::Backend(e.to_string()))?;
        match Self::read_auth_body::<SignUpResponse>(response).await? {
            SignUpResponse::Token(token) => {
                let session = self.install_session(token).await;
                info!(user = %session.user_id, "signed up");
                Ok(session)
            }
            // Account created but no session issued: confirmation pending.
            SignUpResponse::Pending { .. } => Err(AuthError::AccountUnconfirmed),
        }
    }

    async fn sign_out(&self) -> Result<(), AuthError> {
        let Some(bearer) = self.bearer().await else {
            return Ok(());
        };
        let response = self
            .http
            .post(self.config.auth_url("logout"))
            .header("apikey", &self.config.api_key)
            .bearer_auth(&bearer)
            .send()
            .await
            .map_err(|e| AuthError::Backend(e.to_string()))?;
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AuthError::Backend(format!(
                "logout failed with status {}: {}",
                status, body
            )));
        }
        // Identity clears only now that the backend confirmed invalidation.
        *self.auth.write().await = None;
        let _ = self.sessions_tx.send(None);
        info!("signed out");
        Ok(())
    }

    async fn query_rows(&self, query: Query) -> Result<Vec<Row>, StoreError> {
        let params = query_params(&query);
        debug!(table = %query.table, "query");
        let request = self.http.get(self.config.rest_url(&query.table)).query(&params);
        let response = self
            .authed(request)
            .await
            .send()
            .await
            .map_err(|e| StoreError::Read(e.to_string()))?;
        Self::read_data_body(response, StoreError::Read).await
    }

    async fn insert_row(&self, table: &str, row: Row) -> Result<Row, StoreError> {
        let request = self
            .http
            .post(self.config.rest_url(table))
            .header("Prefer", "return=representation")
            .json(&row);
        let response = self
            .authed(request)
            .await
            .send()
            .await
            .map_err(|e| StoreError::Write(e.to_string()))?;
        let mut rows: Vec<Row> = Self::read_data_body(response, StoreError::Write).await?;
        rows.pop()
            .ok_or_else(|| StoreError::Write(format!("{}: empty insert response", table)))
    }

    async fn update_rows(
        &self,
        table: &str,
        filter: Filter,
        changes: Row,
    ) -> Result<u64, StoreError> {
        let params = filter_params(&filter);
        let request = self
            .http
            .patch(self.config.rest_url(table))
            .query(&params)
            .header("Prefer", "return=representation")
            .json(&changes);
        let response = self
            .authed(request)
            .await
            .send()
            .await
            .map_err(|e| StoreError::Write(e.to_string()))?;
        let rows: Vec<Row> = Self::read_data_body(response, StoreError::Write).await?;
        Ok(rows.len() as u64)
    }

    async fn delete_rows(&self, table: &str, filter: Filter) -> Result<u64, StoreError> {
        let params = filter_params(&filter);
        let request = self
            .http
            .delete(self.config.rest_url(table))
            .query(&params)
            .header("Prefer", "return=representation");
        let response = self
            .authed(request)
            .await
            .send()
            .await
            .map_err(|e| StoreError::Write(e.to_string()))?;
        let rows: Vec<Row> = Self::read_data_body(response, StoreError::Write).await?;
        Ok(rows.len() as u64)
    }

    async fn upload_blob(
        &self,
        bucket: &str,
        path: &str,
        bytes: Vec<u8>,
    ) -> Result<(), StoreError> {
        if self.bearer().await.is_none() {
            return Err(StoreError::Write("upload requires a session".to_string()));
        }
        let request = self
            .http
            .post(self.config.storage_url(bucket, path))
            .header("Content-Type", "application/octet-stream")
            // Re-uploads to an existing path overwrite (avatar replacement).
            .header("x-upsert", "true")
            .body(bytes);
        let response = self
            .authed(request)
            .await
            .send()
            .await
            .map_err(|e| StoreError::Write(e.to_string()))?;
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(StoreError::Write(format!(
                "upload failed with status {}: {}",
                status, body
            )));
        }
        Ok(())
    }

    fn public_url(&self, bucket: &str, path: &str) -> String {
        self.config.public_object_url(bucket, path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auth_classification() {
        assert_eq!(
            classify_auth_failure(StatusCode::BAD_REQUEST, "Invalid login credentials"),
            AuthError::InvalidCredentials
        );
        assert_eq!(
            classify_auth_failure(StatusCode::BAD_REQUEST, "Email not confirmed"),
            AuthError::AccountUnconfirmed
        );
        assert_eq!(
            classify_auth_failure(StatusCode::UNPROCESSABLE_ENTITY, "User already registered"),
            AuthError::AccountAlreadyExists
        );
        assert_eq!(
            classify_auth_failure(StatusCode::TOO_MANY_REQUESTS, "whatever"),
            AuthError::RateLimited
        );
        // Unrecognized messages pass through verbatim.
        assert_eq!(
            classify_auth_failure(StatusCode::BAD_REQUEST, "Signups not allowed"),
            AuthError::Backend("Signups not allowed".to_string())
        );
    }

    #[test]
    fn test_error_body_precedence() {
        let body: ErrorBody =
            serde_json::from_str(r#"{"error_description":"first","msg":"second"}"#).unwrap();
        assert_eq!(body.into_message().as_deref(), Some("first"));
        let body: ErrorBody = serde_json::from_str(r#"{"message":"only"}"#).unwrap();
        assert_eq!(body.into_message().as_deref(), Some("only"));
    }
}
