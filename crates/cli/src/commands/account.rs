//! Account commands: registration, sign-in, favorites and history.
//!
//! Nothing persists between runs, so every command signs in first.

use gamescout_client::{
    firebase, AuthService, CatalogClient, Config, FavoritesFeed, GameDetailsFeed, SessionContext,
};
use gamescout_core::{GameId, GoogleCredential, ScoutError, UserProfile};
use thiserror::Error;

use crate::output::{self, CliResult};
use crate::Credentials;

#[derive(Debug, Error)]
pub enum AccountError {
    #[error("Pass --email and --password, or --google-token")]
    MissingCredentials,

    #[error("No profile found for this account")]
    MissingProfile,
}

pub struct Account {
    session: SessionContext,
    catalog: CatalogClient,
}

impl Account {
    pub fn connect(config: &Config) -> Result<Self, Box<dyn std::error::Error>> {
        if !config.has_firebase() {
            return Err(ScoutError::Config(
                "Firebase is not configured; set FIREBASE_API_KEY and FIREBASE_PROJECT_ID"
                    .to_string(),
            )
            .into());
        }
        let (identity, profiles) = firebase::connect(&config.firebase)?;
        Ok(Self {
            session: SessionContext::start(AuthService::new(identity, profiles)),
            catalog: CatalogClient::new(&config.catalog)?,
        })
    }

    pub fn close(self) {
        self.session.shutdown();
    }

    async fn sign_in(
        &self,
        credentials: &Credentials,
    ) -> Result<UserProfile, Box<dyn std::error::Error>> {
        match (&credentials.google_token, &credentials.email, &credentials.password) {
            (Some(token), _, _) => {
                let credential = GoogleCredential {
                    id_token: token.clone(),
                };
                self.session.login_with_google(&credential).await?;
            }
            (None, Some(email), Some(password)) => {
                self.session.login(email, password).await?;
            }
            _ => return Err(AccountError::MissingCredentials.into()),
        }
        // The session logs a failed profile load; surface it here
        match self.session.user_profile() {
            Some(profile) => Ok(profile),
            None => Ok(self
                .session
                .refresh_profile()
                .await?
                .ok_or(AccountError::MissingProfile)?),
        }
    }

    pub async fn register(
        &self,
        email: &str,
        password: &str,
        name: &str,
        json: bool,
    ) -> CliResult {
        let user = self.session.register(email, password, name).await?;
        tracing::info!(uid = %user.uid, "Account created");
        match self.session.user_profile() {
            Some(profile) => output::print_profile(&profile, json),
            None => Err(AccountError::MissingProfile.into()),
        }
    }

    pub async fn login(&self, credentials: &Credentials, json: bool) -> CliResult {
        let profile = self.sign_in(credentials).await?;
        output::print_profile(&profile, json)
    }

    pub async fn reset_password(&self, email: &str) -> CliResult {
        self.session.reset_password(email).await?;
        println!("Password reset email sent to {}", email);
        Ok(())
    }

    pub async fn favorites(&self, credentials: &Credentials, json: bool) -> CliResult {
        self.sign_in(credentials).await?;
        let feed = FavoritesFeed::new(self.catalog.clone());
        feed.load_for(&self.session).await;
        let state = feed.snapshot();
        if let Some(message) = state.status.error() {
            return Err(message.into());
        }
        output::print_games(&state.games, json)
    }

    pub async fn set_favorite(
        &self,
        credentials: &Credentials,
        id: GameId,
        favorite: bool,
    ) -> CliResult {
        self.sign_in(credentials).await?;
        let already = self.session.is_favorite(id);
        if favorite {
            self.session.add_to_favorites(id).await?;
        } else {
            self.session.remove_from_favorites(id).await?;
        }
        match (favorite, already) {
            (true, true) => println!("Game {} was already a favorite", id),
            (true, false) => println!("Added game {} to favorites", id),
            (false, true) => println!("Removed game {} from favorites", id),
            (false, false) => println!("Game {} was not a favorite", id),
        }
        Ok(())
    }

    pub async fn view(&self, credentials: &Credentials, id: GameId, json: bool) -> CliResult {
        self.sign_in(credentials).await?;
        let feed = GameDetailsFeed::new(self.catalog.clone());
        feed.load_and_record(id, &self.session).await;
        let state = feed.snapshot();
        if let Some(message) = state.status.error() {
            return Err(message.into());
        }
        match &state.game {
            Some(game) => output::print_game(game, &state.screenshots, json),
            None => Err(format!("Game {} not found", id).into()),
        }
    }

    pub async fn history(&self, credentials: &Credentials, json: bool) -> CliResult {
        let profile = self.sign_in(credentials).await?;
        let mut games = Vec::with_capacity(profile.game_history.len());
        for id in &profile.game_history {
            match self.catalog.game_details(*id).await {
                Ok(game) => games.push(game),
                Err(e) => tracing::warn!(game_id = id, error = %e, "skipping unavailable game"),
            }
        }
        output::print_games(&games, json)
    }
}
