use std::{collections::HashMap, sync::Arc};

use axum::extract::FromRef;
use axum_extra::extract::cookie::Key;
use sha2::{Digest, Sha512};
use tokio::sync::{Mutex, RwLock};
use uuid::Uuid;

use crate::{
    auth::IdentityProvider,
    config::AppConfig,
    services::storage::{KeyValueStore, TripStorage, TripStores},
    views::editor::TripEditor,
};

/// In-progress planner state per user. Lost on restart.
///
/// Each editor has its own lock, so one user's save never holds up another
/// user's planner requests. The map lock is only held to look an editor up.
#[derive(Clone, Default)]
pub struct Drafts {
    open: Arc<RwLock<HashMap<Uuid, Arc<Mutex<TripEditor>>>>>,
}

impl Drafts {
    pub async fn for_user(&self, user_id: Uuid) -> Arc<Mutex<TripEditor>> {
        if let Some(editor) = self.open.read().await.get(&user_id) {
            return editor.clone();
        }
        self.open
            .write()
            .await
            .entry(user_id)
            .or_default()
            .clone()
    }
}

#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub trips: TripStores,
    pub identity: Arc<dyn IdentityProvider>,
    pub drafts: Drafts,
    pub cookie_key: Key,
}

impl AppState {
    pub fn new(
        config: AppConfig,
        store: Arc<dyn KeyValueStore>,
        identity: Arc<dyn IdentityProvider>,
    ) -> Self {
        let digest = Sha512::digest(config.cookie_secret.as_bytes());
        let cookie_key = Key::from(&digest[..]);
        Self {
            config,
            trips: TripStores::new(store),
            identity,
            drafts: Drafts::default(),
            cookie_key,
        }
    }

    pub async fn trip_storage(&self, user_id: Uuid) -> TripStorage {
        self.trips.for_user(user_id).await
    }
}

impl FromRef<AppState> for Key {
    fn from_ref(state: &AppState) -> Self {
        state.cookie_key.clone()
    }
}
