//! Firebase REST backends: Identity Toolkit for accounts, Firestore for profiles

pub mod auth;
pub mod firestore;

use std::sync::{Arc, PoisonError, RwLock};

pub use auth::FirebaseAuth;
pub use firestore::FirestoreProfiles;

pub const IDENTITY_TOOLKIT_URL: &str = "https://identitytoolkit.googleapis.com/v1";
pub const FIRESTORE_URL: &str = "https://firestore.googleapis.com/v1";

/// ID token of the signed-in account.
///
/// Written by [`FirebaseAuth`], read by [`FirestoreProfiles`] to authorize
/// document requests. Clones share the same slot.
#[derive(Clone, Default)]
pub struct FirebaseSession {
    id_token: Arc<RwLock<Option<String>>>,
}

impl FirebaseSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn id_token(&self) -> Option<String> {
        self.id_token
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn is_signed_in(&self) -> bool {
        self.id_token().is_some()
    }

    fn store(&self, id_token: String) {
        *self.id_token.write().unwrap_or_else(PoisonError::into_inner) = Some(id_token);
    }

    fn clear(&self) {
        *self.id_token.write().unwrap_or_else(PoisonError::into_inner) = None;
    }
}

/// Identity and profile backends sharing one session
pub fn connect(
    config: &crate::config::FirebaseConfig,
) -> Result<(Arc<FirebaseAuth>, Arc<FirestoreProfiles>), reqwest::Error> {
    let client = reqwest::Client::builder().build()?;
    let session = FirebaseSession::new();
    let auth = FirebaseAuth::new(
        client.clone(),
        IDENTITY_TOOLKIT_URL,
        &config.api_key,
        session.clone(),
    );
    let profiles = FirestoreProfiles::new(client, FIRESTORE_URL, &config.project_id, session);
    Ok((Arc::new(auth), Arc::new(profiles)))
}
