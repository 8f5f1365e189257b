//! In-process identity provider and profile store

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use gamescout_core::{
    AuthUser, GameId, GoogleCredential, IdentityProvider, ProfileField, ProfileStore,
    ProfileUpdate, ProviderError, StoreError, UserProfile,
};
use tokio::sync::watch;

const MIN_PASSWORD_LEN: usize = 6;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

struct Account {
    password: String,
    user: AuthUser,
}

/// Identity provider keeping accounts in memory.
///
/// Google sign-in treats the ID token as the Google account identifier.
pub struct MemoryIdentity {
    accounts: Mutex<HashMap<String, Account>>,
    google_accounts: Mutex<HashMap<String, AuthUser>>,
    state: watch::Sender<Option<AuthUser>>,
    offline: AtomicBool,
    next_uid: AtomicU64,
}

impl Default for MemoryIdentity {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryIdentity {
    pub fn new() -> Self {
        let (state, _) = watch::channel(None);
        Self {
            accounts: Mutex::new(HashMap::new()),
            google_accounts: Mutex::new(HashMap::new()),
            state,
            offline: AtomicBool::new(false),
            next_uid: AtomicU64::new(1),
        }
    }

    /// While offline every call fails with `auth/network-request-failed`
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    fn check_online(&self) -> Result<(), ProviderError> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(ProviderError::network("network unreachable"));
        }
        Ok(())
    }

    fn new_uid(&self) -> String {
        format!("user-{}", self.next_uid.fetch_add(1, Ordering::SeqCst))
    }

    fn publish(&self, user: Option<AuthUser>) {
        self.state.send_replace(user);
    }
}

fn normalize_email(email: &str) -> Result<String, ProviderError> {
    let email = email.trim().to_lowercase();
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && domain.contains('.') => Ok(email),
        _ => Err(ProviderError::new(
            "auth/invalid-email",
            "The email address is badly formatted.",
        )),
    }
}

#[async_trait]
impl IdentityProvider for MemoryIdentity {
    async fn create_user(&self, email: &str, password: &str) -> Result<AuthUser, ProviderError> {
        self.check_online()?;
        let email = normalize_email(email)?;
        if password.len() < MIN_PASSWORD_LEN {
            return Err(ProviderError::new(
                "auth/weak-password",
                "Password should be at least 6 characters",
            ));
        }

        let user = {
            let mut accounts = lock(&self.accounts);
            if accounts.contains_key(&email) {
                return Err(ProviderError::new(
                    "auth/email-already-in-use",
                    "The email address is already in use by another account.",
                ));
            }
            let user = AuthUser {
                uid: self.new_uid(),
                email: Some(email.clone()),
                display_name: None,
                photo_url: None,
            };
            accounts.insert(
                email,
                Account {
                    password: password.to_string(),
                    user: user.clone(),
                },
            );
            user
        };
        self.publish(Some(user.clone()));
        Ok(user)
    }

    async fn update_display_name(
        &self,
        user: &AuthUser,
        display_name: &str,
    ) -> Result<AuthUser, ProviderError> {
        self.check_online()?;
        let mut updated = user.clone();
        updated.display_name = Some(display_name.to_string());

        if let Some(email) = &user.email {
            if let Some(account) = lock(&self.accounts).get_mut(email) {
                account.user = updated.clone();
            }
        }
        self.state.send_if_modified(|current| match current {
            Some(signed_in) if signed_in.uid == updated.uid => {
                *signed_in = updated.clone();
                true
            }
            _ => false,
        });
        Ok(updated)
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthUser, ProviderError> {
        self.check_online()?;
        let email = normalize_email(email)?;
        let user = {
            let accounts = lock(&self.accounts);
            let account = accounts.get(&email).ok_or_else(|| {
                ProviderError::new(
                    "auth/user-not-found",
                    "There is no user record corresponding to this identifier.",
                )
            })?;
            if account.password != password {
                return Err(ProviderError::new(
                    "auth/wrong-password",
                    "The password is invalid.",
                ));
            }
            account.user.clone()
        };
        self.publish(Some(user.clone()));
        Ok(user)
    }

    async fn sign_in_with_google(
        &self,
        credential: &GoogleCredential,
    ) -> Result<AuthUser, ProviderError> {
        self.check_online()?;
        if credential.id_token.is_empty() {
            return Err(ProviderError::new(
                "auth/invalid-credential",
                "Missing Google ID token.",
            ));
        }
        let user = lock(&self.google_accounts)
            .entry(credential.id_token.clone())
            .or_insert_with(|| AuthUser {
                uid: self.new_uid(),
                email: None,
                display_name: None,
                photo_url: None,
            })
            .clone();
        self.publish(Some(user.clone()));
        Ok(user)
    }

    async fn sign_out(&self) -> Result<(), ProviderError> {
        self.check_online()?;
        self.publish(None);
        Ok(())
    }

    async fn send_password_reset(&self, email: &str) -> Result<(), ProviderError> {
        self.check_online()?;
        let email = normalize_email(email)?;
        if !lock(&self.accounts).contains_key(&email) {
            return Err(ProviderError::new(
                "auth/user-not-found",
                "There is no user record corresponding to this identifier.",
            ));
        }
        Ok(())
    }

    fn current_user(&self) -> Option<AuthUser> {
        self.state.borrow().clone()
    }

    fn subscribe(&self) -> watch::Receiver<Option<AuthUser>> {
        self.state.subscribe()
    }
}

/// Profile store keeping documents in memory
#[derive(Default)]
pub struct MemoryProfiles {
    documents: Mutex<HashMap<String, UserProfile>>,
    failing: AtomicBool,
}

impl MemoryProfiles {
    pub fn new() -> Self {
        Self::default()
    }

    /// While failing every call returns a backend error
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Copy of the stored document
    pub fn document(&self, uid: &str) -> Option<UserProfile> {
        lock(&self.documents).get(uid).cloned()
    }

    fn check_available(&self) -> Result<(), StoreError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(StoreError::Backend("store unavailable".to_string()));
        }
        Ok(())
    }

    fn modify(
        &self,
        uid: &str,
        change: impl FnOnce(&mut UserProfile),
    ) -> Result<(), StoreError> {
        self.check_available()?;
        let mut documents = lock(&self.documents);
        let profile = documents
            .get_mut(uid)
            .ok_or_else(|| StoreError::NotFound(format!("users/{}", uid)))?;
        change(profile);
        Ok(())
    }
}

#[async_trait]
impl ProfileStore for MemoryProfiles {
    async fn get(&self, uid: &str) -> Result<Option<UserProfile>, StoreError> {
        self.check_available()?;
        Ok(self.document(uid))
    }

    async fn set(&self, profile: &UserProfile) -> Result<(), StoreError> {
        self.check_available()?;
        lock(&self.documents).insert(profile.uid.clone(), profile.clone());
        Ok(())
    }

    async fn update(&self, uid: &str, update: &ProfileUpdate) -> Result<(), StoreError> {
        self.modify(uid, |profile| update.apply(profile))
    }

    async fn array_union(
        &self,
        uid: &str,
        field: ProfileField,
        game_id: GameId,
    ) -> Result<(), StoreError> {
        self.modify(uid, |profile| {
            profile.insert(field, game_id);
        })
    }

    async fn array_remove(
        &self,
        uid: &str,
        field: ProfileField,
        game_id: GameId,
    ) -> Result<(), StoreError> {
        self.modify(uid, |profile| {
            profile.remove(field, game_id);
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_sign_in_state_is_published() {
        let identity = MemoryIdentity::new();
        let mut changes = identity.subscribe();
        assert!(changes.borrow_and_update().is_none());

        let user = identity
            .create_user("ann@example.com", "hunter22")
            .await
            .expect("create");
        changes.changed().await.expect("changed");
        assert_eq!(changes.borrow_and_update().as_ref(), Some(&user));

        identity.sign_out().await.expect("sign out");
        changes.changed().await.expect("changed");
        assert!(changes.borrow().is_none());
    }

    #[tokio::test]
    async fn test_account_validation() {
        let identity = MemoryIdentity::new();
        let err = identity.create_user("not-an-email", "hunter22").await.unwrap_err();
        assert_eq!(err.code, "auth/invalid-email");
        let err = identity.create_user("ann@example.com", "123").await.unwrap_err();
        assert_eq!(err.code, "auth/weak-password");
        let err = identity.send_password_reset("bob@example.com").await.unwrap_err();
        assert_eq!(err.code, "auth/user-not-found");
    }

    #[tokio::test]
    async fn test_array_ops_need_existing_document() {
        let store = MemoryProfiles::new();
        let err = store
            .array_union("ghost", ProfileField::Favorites, 1)
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
    }
}
