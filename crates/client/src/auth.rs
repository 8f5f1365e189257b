//! Account and profile operations on top of an identity provider and a profile store

use std::sync::Arc;

use chrono::Utc;
use gamescout_core::{
    AuthError, AuthUser, GameId, GoogleCredential, IdentityError, IdentityProvider, ProfileField,
    ProfileStore, ProfileUpdate, UserProfile,
};
use tokio::sync::watch;
use tracing::{info, instrument};

/// Identity and profile service.
///
/// Profile mutations only touch the remote document; keeping a local
/// copy in sync is up to the caller (see [`crate::session::SessionContext`]).
#[derive(Clone)]
pub struct AuthService {
    provider: Arc<dyn IdentityProvider>,
    store: Arc<dyn ProfileStore>,
}

impl AuthService {
    pub fn new(provider: Arc<dyn IdentityProvider>, store: Arc<dyn ProfileStore>) -> Self {
        Self { provider, store }
    }

    /// Create the account, set its display name, then write an empty profile
    #[instrument(skip(self, password))]
    pub async fn register(
        &self,
        email: &str,
        password: &str,
        display_name: &str,
    ) -> Result<AuthUser, IdentityError> {
        let user = self
            .provider
            .create_user(email, password)
            .await
            .map_err(AuthError::from)?;
        let user = self
            .provider
            .update_display_name(&user, display_name)
            .await
            .map_err(AuthError::from)?;
        self.create_user_profile(&user, Some(display_name)).await?;
        info!(uid = %user.uid, "registered new account");
        Ok(user)
    }

    #[instrument(skip(self, password))]
    pub async fn login(&self, email: &str, password: &str) -> Result<AuthUser, IdentityError> {
        Ok(self
            .provider
            .sign_in(email, password)
            .await
            .map_err(AuthError::from)?)
    }

    /// Sign in with Google; the profile is created on first sign-in only
    #[instrument(skip_all)]
    pub async fn login_with_google(
        &self,
        credential: &GoogleCredential,
    ) -> Result<AuthUser, IdentityError> {
        let user = self
            .provider
            .sign_in_with_google(credential)
            .await
            .map_err(AuthError::from)?;
        if self.get_user_profile(&user.uid).await?.is_none() {
            self.create_user_profile(&user, None).await?;
        }
        Ok(user)
    }

    pub async fn logout(&self) -> Result<(), IdentityError> {
        Ok(self.provider.sign_out().await.map_err(AuthError::from)?)
    }

    /// Ask the provider to email a password reset link
    pub async fn reset_password(&self, email: &str) -> Result<(), IdentityError> {
        Ok(self
            .provider
            .send_password_reset(email)
            .await
            .map_err(AuthError::from)?)
    }

    pub async fn create_user_profile(
        &self,
        user: &AuthUser,
        display_name: Option<&str>,
    ) -> Result<UserProfile, IdentityError> {
        let profile = UserProfile::new(user, display_name, Utc::now());
        self.store
            .set(&profile)
            .await
            .map_err(IdentityError::profile("create user profile"))?;
        Ok(profile)
    }

    pub async fn get_user_profile(&self, uid: &str) -> Result<Option<UserProfile>, IdentityError> {
        self.store
            .get(uid)
            .await
            .map_err(IdentityError::profile("get user profile"))
    }

    pub async fn update_user_profile(
        &self,
        uid: &str,
        update: &ProfileUpdate,
    ) -> Result<(), IdentityError> {
        self.store
            .update(uid, update)
            .await
            .map_err(IdentityError::profile("update user profile"))
    }

    pub async fn add_to_favorites(&self, uid: &str, game_id: GameId) -> Result<(), IdentityError> {
        self.store
            .array_union(uid, ProfileField::Favorites, game_id)
            .await
            .map_err(IdentityError::profile("add to favorites"))
    }

    pub async fn remove_from_favorites(
        &self,
        uid: &str,
        game_id: GameId,
    ) -> Result<(), IdentityError> {
        self.store
            .array_remove(uid, ProfileField::Favorites, game_id)
            .await
            .map_err(IdentityError::profile("remove from favorites"))
    }

    pub async fn add_to_game_history(
        &self,
        uid: &str,
        game_id: GameId,
    ) -> Result<(), IdentityError> {
        self.store
            .array_union(uid, ProfileField::GameHistory, game_id)
            .await
            .map_err(IdentityError::profile("add to game history"))
    }

    /// Sign-in state stream; the current value is available immediately
    pub fn on_auth_state_change(&self) -> watch::Receiver<Option<AuthUser>> {
        self.provider.subscribe()
    }

    pub fn current_user(&self) -> Option<AuthUser> {
        self.provider.current_user()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{MemoryIdentity, MemoryProfiles};

    fn service() -> (AuthService, Arc<MemoryIdentity>, Arc<MemoryProfiles>) {
        let identity = Arc::new(MemoryIdentity::new());
        let profiles = Arc::new(MemoryProfiles::new());
        (
            AuthService::new(identity.clone(), profiles.clone()),
            identity,
            profiles,
        )
    }

    #[tokio::test]
    async fn test_register_creates_empty_profile() {
        let (auth, _, profiles) = service();
        let user = auth
            .register("ann@example.com", "hunter22", "Ann")
            .await
            .expect("register");
        assert_eq!(user.display_name.as_deref(), Some("Ann"));

        let profile = profiles.document(&user.uid).expect("profile");
        assert_eq!(profile.display_name, "Ann");
        assert_eq!(profile.email, "ann@example.com");
        assert!(profile.favorites.is_empty());
        assert!(profile.game_history.is_empty());
        assert_eq!(auth.current_user(), Some(user));
    }

    #[tokio::test]
    async fn test_register_duplicate_email() {
        let (auth, _, _) = service();
        auth.register("ann@example.com", "hunter22", "Ann")
            .await
            .expect("register");
        let err = auth
            .register("ann@example.com", "another1", "Imposter")
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "An account with this email already exists.");
    }

    #[tokio::test]
    async fn test_login_errors_are_mapped() {
        let (auth, identity, _) = service();
        auth.register("ann@example.com", "hunter22", "Ann")
            .await
            .expect("register");
        auth.logout().await.expect("logout");
        assert!(auth.current_user().is_none());

        let err = auth.login("ann@example.com", "wrong!!").await.unwrap_err();
        assert_eq!(err.to_string(), "Incorrect password.");
        let err = auth.login("bob@example.com", "hunter22").await.unwrap_err();
        assert_eq!(err.to_string(), "No user found with this email address.");

        identity.set_offline(true);
        let err = auth.login("ann@example.com", "hunter22").await.unwrap_err();
        assert_eq!(err.to_string(), "Network error. Please check your connection.");
    }

    #[tokio::test]
    async fn test_google_login_creates_profile_once() {
        let (auth, _, profiles) = service();
        let credential = GoogleCredential {
            id_token: "google-token-1".to_string(),
        };
        let user = auth.login_with_google(&credential).await.expect("google");
        auth.add_to_favorites(&user.uid, 3328).await.expect("favorite");

        auth.logout().await.expect("logout");
        let again = auth.login_with_google(&credential).await.expect("google");
        assert_eq!(again.uid, user.uid);

        let profile = profiles.document(&user.uid).expect("profile");
        assert!(profile.is_favorite(3328));
    }

    #[tokio::test]
    async fn test_favorite_mutations_are_set_operations() {
        let (auth, _, profiles) = service();
        let user = auth
            .register("ann@example.com", "hunter22", "Ann")
            .await
            .expect("register");

        auth.add_to_favorites(&user.uid, 3328).await.expect("add");
        auth.add_to_favorites(&user.uid, 3328).await.expect("add again");
        auth.remove_from_favorites(&user.uid, 4200).await.expect("remove absent");
        auth.add_to_game_history(&user.uid, 13536).await.expect("history");

        let profile = profiles.document(&user.uid).expect("profile");
        assert_eq!(profile.favorites.len(), 1);
        assert!(profile.game_history.contains(&13536));
    }

    #[tokio::test]
    async fn test_store_failures_name_the_action() {
        let (auth, _, profiles) = service();
        let user = auth
            .register("ann@example.com", "hunter22", "Ann")
            .await
            .expect("register");
        profiles.set_failing(true);

        let err = auth.add_to_favorites(&user.uid, 1).await.unwrap_err();
        assert!(err.to_string().starts_with("Failed to add to favorites: "));
        let err = auth.get_user_profile(&user.uid).await.unwrap_err();
        assert!(err.to_string().starts_with("Failed to get user profile: "));
    }

    #[tokio::test]
    async fn test_update_profile_requires_document() {
        let (auth, _, _) = service();
        let update = ProfileUpdate {
            display_name: Some("Ghost".to_string()),
            ..Default::default()
        };
        let err = auth.update_user_profile("nobody", &update).await.unwrap_err();
        assert!(matches!(err, IdentityError::Profile { .. }));
    }
}
