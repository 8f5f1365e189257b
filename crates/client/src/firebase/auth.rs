//! Identity Toolkit REST client

use async_trait::async_trait;
use gamescout_core::{AuthUser, GoogleCredential, IdentityProvider, ProviderError};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::sync::watch;
use tracing::{debug, instrument};

use super::FirebaseSession;

/// Redirect URI sent with IdP sign-ins; any authorized URI will do for ID tokens
const IDP_REQUEST_URI: &str = "http://localhost";

/// Account fields returned by every `accounts:*` endpoint
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AccountResponse {
    local_id: String,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    display_name: Option<String>,
    #[serde(default)]
    photo_url: Option<String>,
    #[serde(default)]
    id_token: Option<String>,
}

impl AccountResponse {
    fn into_user(self) -> (AuthUser, Option<String>) {
        let non_empty = |value: Option<String>| value.filter(|v| !v.is_empty());
        let user = AuthUser {
            uid: self.local_id,
            email: non_empty(self.email),
            display_name: non_empty(self.display_name),
            photo_url: non_empty(self.photo_url),
        };
        (user, self.id_token)
    }
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PasswordRequest<'a> {
    email: &'a str,
    password: &'a str,
    return_secure_token: bool,
}

/// Translate an Identity Toolkit error string such as
/// `WEAK_PASSWORD : Password should be at least 6 characters`
pub fn translate_error(message: &str) -> ProviderError {
    let (reason, detail) = match message.split_once(" : ") {
        Some((reason, detail)) => (reason.trim(), detail.trim()),
        None => (message.trim(), message.trim()),
    };
    let code = match reason {
        "EMAIL_EXISTS" => "auth/email-already-in-use".to_string(),
        "EMAIL_NOT_FOUND" => "auth/user-not-found".to_string(),
        "INVALID_PASSWORD" => "auth/wrong-password".to_string(),
        "USER_DISABLED" => "auth/user-disabled".to_string(),
        "WEAK_PASSWORD" => "auth/weak-password".to_string(),
        "INVALID_EMAIL" | "MISSING_EMAIL" => "auth/invalid-email".to_string(),
        "TOO_MANY_ATTEMPTS_TRY_LATER" => "auth/too-many-requests".to_string(),
        "INVALID_LOGIN_CREDENTIALS" | "INVALID_IDP_RESPONSE" => {
            "auth/invalid-credential".to_string()
        }
        "" => String::new(),
        other => format!("auth/{}", other.to_lowercase().replace('_', "-")),
    };
    ProviderError::new(code, detail)
}

/// Email/password and Google accounts through the Identity Toolkit REST API.
///
/// Sign-in state lives only in this process; `sign_out` forgets the tokens.
pub struct FirebaseAuth {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    session: FirebaseSession,
    state: watch::Sender<Option<AuthUser>>,
}

impl FirebaseAuth {
    pub fn new(
        client: reqwest::Client,
        base_url: &str,
        api_key: &str,
        session: FirebaseSession,
    ) -> Self {
        let (state, _) = watch::channel(None);
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            session,
            state,
        }
    }

    async fn call<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        body: &impl Serialize,
    ) -> Result<T, ProviderError> {
        let url = format!("{}/accounts:{}", self.base_url, endpoint);
        let response = self
            .client
            .post(&url)
            .query(&[("key", self.api_key.as_str())])
            .json(body)
            .send()
            .await
            .map_err(|e| ProviderError::network(e.to_string()))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| ProviderError::network(e.to_string()))?;
        if !status.is_success() {
            debug!(endpoint, status = status.as_u16(), "identity request rejected");
            return Err(match serde_json::from_str::<ErrorEnvelope>(&text) {
                Ok(envelope) => translate_error(&envelope.error.message),
                Err(_) => ProviderError::new("", format!("HTTP {}", status.as_u16())),
            });
        }
        serde_json::from_str(&text)
            .map_err(|e| ProviderError::new("auth/internal-error", e.to_string()))
    }

    /// Remember the tokens and publish the signed-in user
    fn signed_in(&self, response: AccountResponse) -> AuthUser {
        let (user, id_token) = response.into_user();
        if let Some(token) = id_token {
            self.session.store(token);
        }
        self.state.send_replace(Some(user.clone()));
        user
    }
}

#[async_trait]
impl IdentityProvider for FirebaseAuth {
    #[instrument(skip(self, password))]
    async fn create_user(&self, email: &str, password: &str) -> Result<AuthUser, ProviderError> {
        let request = PasswordRequest {
            email,
            password,
            return_secure_token: true,
        };
        let response = self.call("signUp", &request).await?;
        Ok(self.signed_in(response))
    }

    #[instrument(skip(self, user), fields(uid = %user.uid))]
    async fn update_display_name(
        &self,
        user: &AuthUser,
        display_name: &str,
    ) -> Result<AuthUser, ProviderError> {
        let id_token = self
            .session
            .id_token()
            .ok_or_else(|| ProviderError::new("auth/user-token-expired", "No signed-in user"))?;
        let response: AccountResponse = self
            .call(
                "update",
                &json!({
                    "idToken": id_token,
                    "displayName": display_name,
                    "returnSecureToken": true,
                }),
            )
            .await?;

        let (mut updated, new_token) = response.into_user();
        if let Some(token) = new_token {
            self.session.store(token);
        }
        if updated.email.is_none() {
            updated.email = user.email.clone();
        }
        if updated.photo_url.is_none() {
            updated.photo_url = user.photo_url.clone();
        }
        self.state.send_replace(Some(updated.clone()));
        Ok(updated)
    }

    #[instrument(skip(self, password))]
    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthUser, ProviderError> {
        let request = PasswordRequest {
            email,
            password,
            return_secure_token: true,
        };
        let response = self.call("signInWithPassword", &request).await?;
        Ok(self.signed_in(response))
    }

    #[instrument(skip_all)]
    async fn sign_in_with_google(
        &self,
        credential: &GoogleCredential,
    ) -> Result<AuthUser, ProviderError> {
        let post_body = format!(
            "id_token={}&providerId=google.com",
            urlencoding::encode(&credential.id_token)
        );
        let response = self
            .call(
                "signInWithIdp",
                &json!({
                    "postBody": post_body,
                    "requestUri": IDP_REQUEST_URI,
                    "returnSecureToken": true,
                    "returnIdpCredential": true,
                }),
            )
            .await?;
        Ok(self.signed_in(response))
    }

    async fn sign_out(&self) -> Result<(), ProviderError> {
        self.session.clear();
        self.state.send_replace(None);
        Ok(())
    }

    #[instrument(skip(self))]
    async fn send_password_reset(&self, email: &str) -> Result<(), ProviderError> {
        let _: serde_json::Value = self
            .call(
                "sendOobCode",
                &json!({
                    "requestType": "PASSWORD_RESET",
                    "email": email,
                }),
            )
            .await?;
        Ok(())
    }

    fn current_user(&self) -> Option<AuthUser> {
        self.state.borrow().clone()
    }

    fn subscribe(&self) -> watch::Receiver<Option<AuthUser>> {
        self.state.subscribe()
    }
}
