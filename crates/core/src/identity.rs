//! Seams between the account service and the identity/document backends

use async_trait::async_trait;
use tokio::sync::watch;

use crate::error::{ProviderError, StoreError};
use crate::models::{AuthUser, GameId, ProfileField, ProfileUpdate, UserProfile};

/// Google OAuth ID token obtained by the caller's sign-in flow
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GoogleCredential {
    pub id_token: String,
}

/// Identity provider: accounts, sign-in state and password resets.
///
/// Implementations publish every sign-in state change on the channel
/// returned by [`IdentityProvider::subscribe`].
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn create_user(&self, email: &str, password: &str) -> Result<AuthUser, ProviderError>;

    async fn update_display_name(
        &self,
        user: &AuthUser,
        display_name: &str,
    ) -> Result<AuthUser, ProviderError>;

    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthUser, ProviderError>;

    async fn sign_in_with_google(
        &self,
        credential: &GoogleCredential,
    ) -> Result<AuthUser, ProviderError>;

    async fn sign_out(&self) -> Result<(), ProviderError>;

    async fn send_password_reset(&self, email: &str) -> Result<(), ProviderError>;

    fn current_user(&self) -> Option<AuthUser>;

    fn subscribe(&self) -> watch::Receiver<Option<AuthUser>>;
}

/// Document store holding one profile per user id
#[async_trait]
pub trait ProfileStore: Send + Sync {
    async fn get(&self, uid: &str) -> Result<Option<UserProfile>, StoreError>;

    /// Create or replace the whole document
    async fn set(&self, profile: &UserProfile) -> Result<(), StoreError>;

    /// Update the given fields of an existing document
    async fn update(&self, uid: &str, update: &ProfileUpdate) -> Result<(), StoreError>;

    /// Set-add on an array field of an existing document
    async fn array_union(
        &self,
        uid: &str,
        field: ProfileField,
        game_id: GameId,
    ) -> Result<(), StoreError>;

    /// Set-remove on an array field of an existing document
    async fn array_remove(
        &self,
        uid: &str,
        field: ProfileField,
        game_id: GameId,
    ) -> Result<(), StoreError>;
}
