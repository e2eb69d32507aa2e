// Zhenwo Engine — Account Auth Client
// Username/password auth against the coaching backend's own account
// system (`/api/auth/login`, `/api/auth/register`). Failures carry the
// backend's error string; passwords are never logged.

use crate::atoms::error::{EngineError, EngineResult};
use crate::atoms::types::UserAccount;
use log::{info, warn};
use reqwest::Client;
use serde::{Deserialize, Serialize};

// ── Wire shapes ────────────────────────────────────────────────────────

#[derive(Serialize)]
struct Credentials<'a> {
    username: &'a str,
    password: &'a str,
}

#[derive(Deserialize)]
struct AuthSuccess {
    uid: String,
    username: String,
}

#[derive(Deserialize, Default)]
struct AuthFailure {
    #[serde(default)]
    error: String,
}

// ── Client ─────────────────────────────────────────────────────────────

pub struct AuthClient {
    client: Client,
    base_url: String,
}

impl AuthClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        AuthClient {
            client: Client::builder()
                .connect_timeout(std::time::Duration::from_secs(10))
                .timeout(std::time::Duration::from_secs(30))
                .build()
                .unwrap_or_default(),
            base_url: base_url.into(),
        }
    }

    pub async fn login(&self, username: &str, password: &str) -> EngineResult<UserAccount> {
        self.post("login", username, password).await
    }

    pub async fn register(&self, username: &str, password: &str) -> EngineResult<UserAccount> {
        self.post("register", username, password).await
    }

    async fn post(
        &self,
        endpoint: &str,
        username: &str,
        password: &str,
    ) -> EngineResult<UserAccount> {
        let url = format!("{}/api/auth/{}", self.base_url.trim_end_matches('/'), endpoint);
        info!("[auth] POST {} user={}", url, username);

        let response = self
            .client
            .post(&url)
            .json(&Credentials { username, password })
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await.unwrap_or_default();

        if !status.is_success() {
            let failure: AuthFailure = serde_json::from_str(&body).unwrap_or_default();
            let message = if failure.error.is_empty() {
                format!("auth request failed ({})", status.as_u16())
            } else {
                failure.error
            };
            warn!("[auth] {} rejected for {}: {}", endpoint, username, message);
            return Err(EngineError::Auth(message));
        }

        let ok: AuthSuccess = serde_json::from_str(&body)?;
        Ok(UserAccount {
            uid: ok.uid,
            display_name: ok.username,
            email: None,
            custom_auth: true,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn credentials_serialize_to_backend_shape() {
        let v = serde_json::to_value(Credentials {
            username: "eason001",
            password: "hunter2",
        })
        .unwrap();
        assert_eq!(v["username"], "eason001");
        assert_eq!(v["password"], "hunter2");
    }

    #[test]
    fn success_body_parses() {
        let ok: AuthSuccess =
            serde_json::from_str(r#"{"uid":"u-7","username":"eason001"}"#).unwrap();
        assert_eq!(ok.uid, "u-7");
        assert_eq!(ok.username, "eason001");
    }

    #[test]
    fn failure_body_tolerates_missing_error_field() {
        let f: AuthFailure = serde_json::from_str("{}").unwrap();
        assert!(f.error.is_empty());
        let f: AuthFailure = serde_json::from_str(r#"{"error":"密码错误"}"#).unwrap();
        assert_eq!(f.error, "密码错误");
    }
}
