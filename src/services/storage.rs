use std::{
    collections::HashMap,
    fmt,
    path::{Path, PathBuf},
    sync::Arc,
};

use async_trait::async_trait;
use sha2::{Digest, Sha256};
use tokio::{
    fs,
    sync::{Mutex, RwLock},
};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::{error::AppError, models::trip::Trip};

pub const TRIPS_SLOT: &str = "trips";

/// String slots addressed by key, the server-side stand-in for browser local storage.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, AppError>;

    async fn set(&self, key: &str, value: &str) -> Result<(), AppError>;
}

/// Keeps each slot in `<root>/<key>.json`. Keys may contain `/` to nest slots in directories.
#[derive(Clone)]
pub struct FileKeyValueStore {
    root: Arc<PathBuf>,
}

impl FileKeyValueStore {
    pub fn new(root: PathBuf) -> Self {
        Self {
            root: Arc::new(root),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub async fn ensure_structure(&self) -> Result<(), AppError> {
        fs::create_dir_all(self.root().join("users")).await?;
        Ok(())
    }

    fn slot_path(&self, key: &str) -> Result<PathBuf, AppError> {
        let mut path = self.root().to_path_buf();
        for part in key.split('/') {
            if part.is_empty() || part == "." || part == ".." {
                return Err(AppError::Config(format!("invalid storage key: {key:?}")));
            }
            path.push(part);
        }
        path.set_extension("json");
        Ok(path)
    }
}

#[async_trait]
impl KeyValueStore for FileKeyValueStore {
    async fn get(&self, key: &str) -> Result<Option<String>, AppError> {
        let path = self.slot_path(key)?;
        if !fs::try_exists(&path).await? {
            return Ok(None);
        }
        Ok(Some(fs::read_to_string(&path).await?))
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), AppError> {
        let path = self.slot_path(key)?;
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir).await?;
        }
        // write-then-rename so a crashed write never leaves half a file behind
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, value).await?;
        fs::rename(&tmp, &path).await?;
        Ok(())
    }
}

#[derive(Clone, Default)]
pub struct MemoryKeyValueStore {
    slots: Arc<RwLock<HashMap<String, String>>>,
}

impl MemoryKeyValueStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KeyValueStore for MemoryKeyValueStore {
    async fn get(&self, key: &str) -> Result<Option<String>, AppError> {
        Ok(self.slots.read().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), AppError> {
        self.slots
            .write()
            .await
            .insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// Digest of a slot's raw content at the time it was read.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Version([u8; 32]);

impl Version {
    pub const EMPTY: Version = Version([0; 32]);

    fn of(raw: Option<&str>) -> Self {
        match raw {
            None => Self::EMPTY,
            Some(raw) => Self(Sha256::digest(raw.as_bytes()).into()),
        }
    }
}

impl fmt::Debug for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in &self.0[..6] {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct TripSnapshot {
    pub trips: Vec<Trip>,
    pub version: Version,
}

/// Owns the persisted trip collection of one slot.
#[derive(Clone)]
pub struct TripStorage {
    store: Arc<dyn KeyValueStore>,
    key: String,
    write_lock: Arc<Mutex<()>>,
}

impl TripStorage {
    pub fn new(store: Arc<dyn KeyValueStore>, key: impl Into<String>) -> Self {
        Self {
            store,
            key: key.into(),
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Malformed slot content reads as an empty collection.
    pub async fn load(&self) -> Result<TripSnapshot, AppError> {
        let raw = self.store.get(&self.key).await?;
        let version = Version::of(raw.as_deref());
        let trips = match raw.as_deref() {
            None => Vec::new(),
            Some(raw) if raw.trim().is_empty() => Vec::new(),
            Some(raw) => match serde_json::from_str::<Vec<Trip>>(raw) {
                Ok(trips) => trips,
                Err(err) => {
                    warn!(slot = %self.key, "ignoring unreadable trip data: {err}");
                    Vec::new()
                }
            },
        };
        Ok(TripSnapshot { trips, version })
    }

    pub async fn load_trips(&self) -> Result<Vec<Trip>, AppError> {
        Ok(self.load().await?.trips)
    }

    /// Overwrites the slot only if it still holds the content `expected` was taken from.
    pub async fn save(&self, trips: &[Trip], expected: Version) -> Result<Version, AppError> {
        let _guard = self.write_lock.lock().await;
        let current = Version::of(self.store.get(&self.key).await?.as_deref());
        if current != expected {
            warn!(slot = %self.key, ?expected, ?current, "rejecting stale trip save");
            return Err(AppError::Conflict);
        }
        self.write(trips).await
    }

    /// Unconditional overwrite, last writer wins.
    pub async fn save_trips(&self, trips: &[Trip]) -> Result<Version, AppError> {
        let _guard = self.write_lock.lock().await;
        self.write(trips).await
    }

    pub async fn append_trip(&self, trip: Trip) -> Result<Trip, AppError> {
        self.update(|trips| {
            trips.push(trip.clone());
            Ok(())
        })
        .await?;
        Ok(trip)
    }

    /// Load, apply `f` and write back, all under the write lock. Two updates
    /// through the same adapter run one after the other.
    pub async fn update<F>(&self, f: F) -> Result<Vec<Trip>, AppError>
    where
        F: FnOnce(&mut Vec<Trip>) -> Result<(), AppError>,
    {
        let _guard = self.write_lock.lock().await;
        let mut trips = self.load().await?.trips;
        f(&mut trips)?;
        self.write(&trips).await?;
        Ok(trips)
    }

    async fn write(&self, trips: &[Trip]) -> Result<Version, AppError> {
        let data = serde_json::to_string(trips)?;
        self.store.set(&self.key, &data).await?;
        debug!(slot = %self.key, count = trips.len(), "saved trips");
        Ok(Version::of(Some(data.as_str())))
    }
}

pub fn user_trips_key(user_id: &Uuid) -> String {
    format!("users/{user_id}/{TRIPS_SLOT}")
}

/// Hands out one `TripStorage` per user so saves to a slot share a write lock.
#[derive(Clone)]
pub struct TripStores {
    store: Arc<dyn KeyValueStore>,
    open: Arc<RwLock<HashMap<Uuid, TripStorage>>>,
}

impl TripStores {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            store,
            open: Arc::default(),
        }
    }

    pub async fn for_user(&self, user_id: Uuid) -> TripStorage {
        if let Some(storage) = self.open.read().await.get(&user_id) {
            return storage.clone();
        }
        self.open
            .write()
            .await
            .entry(user_id)
            .or_insert_with(|| TripStorage::new(self.store.clone(), user_trips_key(&user_id)))
            .clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn trip(id: i64, name: &str) -> Trip {
        Trip {
            id,
            name: name.into(),
            start_date: NaiveDate::from_ymd_opt(2024, 5, 1).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2024, 5, 3).unwrap(),
            locations: Vec::new(),
        }
    }

    fn storage() -> (MemoryKeyValueStore, TripStorage) {
        let store = MemoryKeyValueStore::new();
        let storage = TripStorage::new(Arc::new(store.clone()), TRIPS_SLOT);
        (store, storage)
    }

    #[tokio::test]
    async fn missing_and_malformed_slots_read_as_empty() {
        let (store, storage) = storage();
        let snapshot = storage.load().await.unwrap();
        assert!(snapshot.trips.is_empty());
        assert_eq!(snapshot.version, Version::EMPTY);

        store.set(TRIPS_SLOT, "{not json").await.unwrap();
        let snapshot = storage.load().await.unwrap();
        assert!(snapshot.trips.is_empty());
        assert_ne!(snapshot.version, Version::EMPTY);
    }

    #[tokio::test]
    async fn stale_save_is_rejected() {
        let (_store, storage) = storage();
        let first = storage.load().await.unwrap();
        storage.append_trip(trip(1, "Paris Trip")).await.unwrap();

        let err = storage.save(&[trip(2, "Rome")], first.version).await;
        assert!(matches!(err, Err(AppError::Conflict)));
        assert_eq!(storage.load_trips().await.unwrap(), vec![trip(1, "Paris Trip")]);
    }

    #[tokio::test]
    async fn reload_then_save_leaves_content_unchanged() {
        let (store, storage) = storage();
        storage
            .save_trips(&[trip(1, "Paris Trip"), trip(2, "Rome")])
            .await
            .unwrap();
        let before = store.get(TRIPS_SLOT).await.unwrap();

        let snapshot = storage.load().await.unwrap();
        storage.save(&snapshot.trips, snapshot.version).await.unwrap();
        assert_eq!(store.get(TRIPS_SLOT).await.unwrap(), before);
    }

    #[tokio::test]
    async fn users_get_separate_slots_sharing_one_store() {
        let store = MemoryKeyValueStore::new();
        let stores = TripStores::new(Arc::new(store.clone()));
        let alice = Uuid::new_v4();
        let bob = Uuid::new_v4();

        stores.for_user(alice).await.append_trip(trip(1, "Paris Trip")).await.unwrap();
        assert!(stores.for_user(bob).await.load_trips().await.unwrap().is_empty());
        assert_eq!(stores.for_user(alice).await.load_trips().await.unwrap().len(), 1);
        assert!(store.get(&user_trips_key(&alice)).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn concurrent_updates_on_disk_both_land() {
        let root = tempfile::tempdir().unwrap();
        let store = FileKeyValueStore::new(root.path().to_path_buf());
        let storage = TripStorage::new(Arc::new(store), TRIPS_SLOT);

        let (first, second, cleanup) = tokio::join!(
            storage.append_trip(trip(1, "Paris Trip")),
            storage.append_trip(trip(2, "Rome")),
            storage.update(|trips| {
                trips.retain(|t| t.id != 99);
                Ok(())
            }),
        );
        first.unwrap();
        second.unwrap();
        cleanup.unwrap();

        let mut ids: Vec<_> = storage.load_trips().await.unwrap().iter().map(|t| t.id).collect();
        ids.sort();
        assert_eq!(ids, vec![1, 2]);
    }

    #[test]
    fn file_keys_cannot_escape_the_root() {
        let store = FileKeyValueStore::new(PathBuf::from("/tmp/travel"));
        assert!(store.slot_path("../etc/passwd").is_err());
        assert_eq!(
            store.slot_path("users/abc/trips").unwrap(),
            PathBuf::from("/tmp/travel/users/abc/trips.json")
        );
    }
}
