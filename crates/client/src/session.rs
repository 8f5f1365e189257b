//! Signed-in user and profile mirror shared by the rest of the application

use std::sync::Arc;

use gamescout_core::{
    AuthUser, GameId, GoogleCredential, IdentityError, ProfileField, UserProfile,
};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use crate::auth::AuthService;

/// What the application knows about the current user
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSnapshot {
    pub user: Option<AuthUser>,
    pub profile: Option<UserProfile>,
    /// True until the first sign-in state has been resolved
    pub loading: bool,
}

impl Default for SessionSnapshot {
    fn default() -> Self {
        Self {
            user: None,
            profile: None,
            loading: true,
        }
    }
}

impl SessionSnapshot {
    pub fn is_signed_in(&self) -> bool {
        self.user.is_some()
    }

    pub fn is_favorite(&self, game_id: GameId) -> bool {
        self.profile
            .as_ref()
            .is_some_and(|profile| profile.is_favorite(game_id))
    }
}

/// Owns the sign-in observer and the local profile mirror.
///
/// Create one with [`SessionContext::start`] inside a tokio runtime; the
/// observer task stops on [`SessionContext::shutdown`] or drop. Favorite and
/// history changes patch the mirror only after the remote write succeeded.
pub struct SessionContext {
    auth: AuthService,
    state: Arc<watch::Sender<SessionSnapshot>>,
    observer: JoinHandle<()>,
}

impl SessionContext {
    pub fn start(auth: AuthService) -> Self {
        let (state, _) = watch::channel(SessionSnapshot::default());
        let state = Arc::new(state);
        let changes = auth.on_auth_state_change();
        let observer = tokio::spawn(observe(auth.clone(), state.clone(), changes));
        Self {
            auth,
            state,
            observer,
        }
    }

    pub fn auth(&self) -> &AuthService {
        &self.auth
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.state.subscribe()
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.state.borrow().clone()
    }

    /// Resolves once `ready` holds for the published snapshot
    pub async fn wait_for(&self, ready: impl FnMut(&SessionSnapshot) -> bool) -> SessionSnapshot {
        let mut changes = self.state.subscribe();
        let snapshot = match changes.wait_for(ready).await {
            Ok(snapshot) => snapshot.clone(),
            Err(_) => self.snapshot(),
        };
        snapshot
    }

    /// The provider's view of the signed-in user
    pub fn current_user(&self) -> Option<AuthUser> {
        self.auth.current_user()
    }

    pub fn user_profile(&self) -> Option<UserProfile> {
        self.state.borrow().profile.clone()
    }

    pub fn loading(&self) -> bool {
        self.state.borrow().loading
    }

    pub fn is_favorite(&self, game_id: GameId) -> bool {
        self.state.borrow().is_favorite(game_id)
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<AuthUser, IdentityError> {
        let user = self.auth.login(email, password).await?;
        self.signed_in(&user).await;
        Ok(user)
    }

    pub async fn register(
        &self,
        email: &str,
        password: &str,
        display_name: &str,
    ) -> Result<AuthUser, IdentityError> {
        let user = self.auth.register(email, password, display_name).await?;
        self.signed_in(&user).await;
        Ok(user)
    }

    pub async fn login_with_google(
        &self,
        credential: &GoogleCredential,
    ) -> Result<AuthUser, IdentityError> {
        let user = self.auth.login_with_google(credential).await?;
        self.signed_in(&user).await;
        Ok(user)
    }

    pub async fn logout(&self) -> Result<(), IdentityError> {
        self.auth.logout().await?;
        self.state.send_modify(|snapshot| {
            snapshot.user = None;
            snapshot.profile = None;
            snapshot.loading = false;
        });
        Ok(())
    }

    pub async fn reset_password(&self, email: &str) -> Result<(), IdentityError> {
        self.auth.reset_password(email).await
    }

    /// Reload the profile of the signed-in user into the mirror
    pub async fn refresh_profile(&self) -> Result<Option<UserProfile>, IdentityError> {
        let Some(user) = self.current_user() else {
            return Ok(None);
        };
        let profile = self.auth.get_user_profile(&user.uid).await?;
        if let Some(profile) = &profile {
            apply_profile(&self.state, profile.clone());
        }
        Ok(profile)
    }

    pub async fn add_to_favorites(&self, game_id: GameId) -> Result<(), IdentityError> {
        let user = self.current_user().ok_or(IdentityError::NotAuthenticated)?;
        self.auth.add_to_favorites(&user.uid, game_id).await?;
        self.patch(&user.uid, |profile| profile.insert(ProfileField::Favorites, game_id));
        Ok(())
    }

    pub async fn remove_from_favorites(&self, game_id: GameId) -> Result<(), IdentityError> {
        let user = self.current_user().ok_or(IdentityError::NotAuthenticated)?;
        self.auth.remove_from_favorites(&user.uid, game_id).await?;
        self.patch(&user.uid, |profile| profile.remove(ProfileField::Favorites, game_id));
        Ok(())
    }

    /// Record a viewed game; does nothing while signed out
    pub async fn add_to_game_history(&self, game_id: GameId) -> Result<(), IdentityError> {
        let Some(user) = self.current_user() else {
            return Ok(());
        };
        self.auth.add_to_game_history(&user.uid, game_id).await?;
        self.patch(&user.uid, |profile| profile.insert(ProfileField::GameHistory, game_id));
        Ok(())
    }

    /// Stop observing sign-in changes
    pub fn shutdown(self) {
        self.observer.abort();
    }

    /// Mirror a fresh sign-in without waiting for the observer
    async fn signed_in(&self, user: &AuthUser) {
        set_user(&self.state, user);
        if let Err(err) = self.refresh_profile().await {
            error!(uid = %user.uid, error = %err, "failed to load user profile");
        }
    }

    fn patch(&self, uid: &str, change: impl FnOnce(&mut UserProfile) -> bool) {
        self.state.send_if_modified(|snapshot| match snapshot.profile.as_mut() {
            Some(profile) if profile.uid == uid => change(profile),
            _ => false,
        });
    }
}

impl Drop for SessionContext {
    fn drop(&mut self) {
        self.observer.abort();
    }
}

/// Publish `user` as signed in, dropping a profile that belongs to someone else
fn set_user(state: &watch::Sender<SessionSnapshot>, user: &AuthUser) {
    state.send_if_modified(|snapshot| {
        if snapshot.user.as_ref() == Some(user) {
            return false;
        }
        if snapshot.profile.as_ref().is_some_and(|p| p.uid != user.uid) {
            snapshot.profile = None;
        }
        snapshot.user = Some(user.clone());
        true
    });
}

/// Store `profile` unless its owner signed out in the meantime
fn apply_profile(state: &watch::Sender<SessionSnapshot>, profile: UserProfile) {
    state.send_if_modified(|snapshot| {
        let current = snapshot.user.as_ref().is_some_and(|u| u.uid == profile.uid);
        if !current || snapshot.profile.as_ref() == Some(&profile) {
            return false;
        }
        snapshot.profile = Some(profile);
        true
    });
}

async fn observe(
    auth: AuthService,
    state: Arc<watch::Sender<SessionSnapshot>>,
    mut changes: watch::Receiver<Option<AuthUser>>,
) {
    loop {
        let user = changes.borrow_and_update().clone();
        match user {
            Some(user) => {
                debug!(uid = %user.uid, "signed in");
                set_user(&state, &user);
                match auth.get_user_profile(&user.uid).await {
                    Ok(Some(profile)) => apply_profile(&state, profile),
                    Ok(None) => debug!(uid = %user.uid, "no profile document yet"),
                    Err(err) => error!(uid = %user.uid, error = %err, "failed to load user profile"),
                }
            }
            None => {
                state.send_if_modified(|snapshot| {
                    let changed = snapshot.user.is_some() || snapshot.profile.is_some();
                    snapshot.user = None;
                    snapshot.profile = None;
                    changed
                });
            }
        }
        state.send_if_modified(|snapshot| std::mem::replace(&mut snapshot.loading, false));

        if changes.changed().await.is_err() {
            info!("identity provider closed, session observer stopping");
            break;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{MemoryIdentity, MemoryProfiles};
    use gamescout_core::IdentityProvider;
    use std::time::Duration;

    struct Fixture {
        session: SessionContext,
        identity: Arc<MemoryIdentity>,
        profiles: Arc<MemoryProfiles>,
    }

    fn fixture() -> Fixture {
        let identity = Arc::new(MemoryIdentity::new());
        let profiles = Arc::new(MemoryProfiles::new());
        let auth = AuthService::new(identity.clone(), profiles.clone());
        Fixture {
            session: SessionContext::start(auth),
            identity,
            profiles,
        }
    }

    async fn settle(
        session: &SessionContext,
        ready: impl FnMut(&SessionSnapshot) -> bool,
    ) -> SessionSnapshot {
        tokio::time::timeout(Duration::from_secs(2), session.wait_for(ready))
            .await
            .expect("session never reached the expected state")
    }

    #[tokio::test]
    async fn test_initial_state_resolves_to_signed_out() {
        let f = fixture();
        let snapshot = settle(&f.session, |s| !s.loading).await;
        assert!(!snapshot.is_signed_in());
        assert!(snapshot.profile.is_none());
    }

    #[tokio::test]
    async fn test_register_loads_profile() {
        let f = fixture();
        let user = f
            .session
            .register("ann@example.com", "hunter22", "Ann")
            .await
            .expect("register");
        let profile = f.session.user_profile().expect("profile");
        assert_eq!(profile.uid, user.uid);
        assert_eq!(profile.display_name, "Ann");
        assert!(profile.favorites.is_empty());
    }

    #[tokio::test]
    async fn test_favorites_update_remote_then_mirror() {
        let f = fixture();
        let user = f
            .session
            .register("ann@example.com", "hunter22", "Ann")
            .await
            .expect("register");

        f.session.add_to_favorites(3328).await.expect("add");
        assert!(f.session.is_favorite(3328));
        assert!(f.profiles.document(&user.uid).expect("doc").is_favorite(3328));

        f.session.remove_from_favorites(3328).await.expect("remove");
        assert!(!f.session.is_favorite(3328));

        f.session.add_to_game_history(4200).await.expect("history");
        let profile = f.session.user_profile().expect("profile");
        assert!(profile.game_history.contains(&4200));
    }

    #[tokio::test]
    async fn test_failed_write_leaves_mirror_untouched() {
        let f = fixture();
        f.session
            .register("ann@example.com", "hunter22", "Ann")
            .await
            .expect("register");
        f.profiles.set_failing(true);

        let err = f.session.add_to_favorites(3328).await.unwrap_err();
        assert!(err.to_string().starts_with("Failed to add to favorites"));
        assert!(!f.session.is_favorite(3328));
    }

    #[tokio::test]
    async fn test_signed_out_mutations() {
        let f = fixture();
        settle(&f.session, |s| !s.loading).await;

        let err = f.session.add_to_favorites(3328).await.unwrap_err();
        assert!(matches!(err, IdentityError::NotAuthenticated));
        assert_eq!(err.to_string(), "User not authenticated");
        let err = f.session.remove_from_favorites(3328).await.unwrap_err();
        assert!(matches!(err, IdentityError::NotAuthenticated));

        f.session.add_to_game_history(3328).await.expect("no-op");
        assert!(f.session.user_profile().is_none());
    }

    #[tokio::test]
    async fn test_logout_clears_mirror() {
        let f = fixture();
        f.session
            .register("ann@example.com", "hunter22", "Ann")
            .await
            .expect("register");
        f.session.add_to_favorites(3328).await.expect("add");

        f.session.logout().await.expect("logout");
        let snapshot = f.session.snapshot();
        assert!(!snapshot.is_signed_in());
        assert!(snapshot.profile.is_none());
        assert!(!f.session.is_favorite(3328));
    }

    #[tokio::test]
    async fn test_observer_follows_provider_sign_in() {
        let f = fixture();
        let ann = f
            .session
            .register("ann@example.com", "hunter22", "Ann")
            .await
            .expect("register");
        f.session.add_to_favorites(3328).await.expect("add");
        f.session.logout().await.expect("logout");

        let bob = f
            .session
            .register("bob@example.com", "hunter22", "Bob")
            .await
            .expect("register");
        assert_eq!(f.session.user_profile().map(|p| p.uid), Some(bob.uid.clone()));

        // Sign in behind the session's back; the observer picks it up
        f.identity
            .sign_in("ann@example.com", "hunter22")
            .await
            .expect("sign in");
        let snapshot = settle(&f.session, |s| {
            s.profile.as_ref().is_some_and(|p| p.uid == ann.uid)
        })
        .await;
        assert_eq!(snapshot.user.map(|u| u.uid), Some(ann.uid));
        assert!(f.session.is_favorite(3328));

        f.identity.sign_out().await.expect("sign out");
        let snapshot = settle(&f.session, |s| !s.is_signed_in()).await;
        assert!(snapshot.profile.is_none());
    }

    #[tokio::test]
    async fn test_profile_load_failure_keeps_user() {
        let f = fixture();
        f.session
            .register("ann@example.com", "hunter22", "Ann")
            .await
            .expect("register");
        f.session.logout().await.expect("logout");
        f.profiles.set_failing(true);

        f.session
            .login("ann@example.com", "hunter22")
            .await
            .expect("login");
        let snapshot = f.session.snapshot();
        assert!(snapshot.is_signed_in());
        assert!(snapshot.profile.is_none());
    }
}
