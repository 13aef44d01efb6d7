use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::{Duration, Instant};

use uuid::Uuid;

use crate::models::{Profile, SkinProperty};

/// Storage for positive lookup results.
///
/// Reads and writes only need to be individually atomic. Two concurrent misses
/// for the same key may both write; writes are idempotent.
#[async_trait::async_trait]
pub trait ProfileCache: Send + Sync {
    /// Look up a profile by player name
    async fn get_by_name(&self, name: &str) -> Option<Profile>;

    /// Remember a profile resolved from the provider
    async fn add(&self, profile: &Profile);

    /// Look up the textures property of a player
    async fn get_skin(&self, id: &Uuid) -> Option<SkinProperty>;

    /// Remember the textures property of a player
    async fn add_skin(&self, id: &Uuid, property: &SkinProperty);
}

#[derive(Debug, Clone)]
struct Entry<T> {
    value: T,
    stored_at: Instant,
}

/// In-memory cache, optionally expiring entries after a fixed age
#[derive(Debug, Clone, Default)]
pub struct MemoryCache {
    expire_after: Option<Duration>,
    profiles: Arc<RwLock<HashMap<String, Entry<Profile>>>>,
    skins: Arc<RwLock<HashMap<Uuid, Entry<SkinProperty>>>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Names can be rebound to other accounts, so long-lived caches should expire
    pub fn with_expiry(expire_after: Duration) -> Self {
        Self {
            expire_after: Some(expire_after),
            ..Self::default()
        }
    }

    fn is_fresh<T>(&self, entry: &Entry<T>) -> bool {
        self.expire_after
            .is_none_or(|max_age| entry.stored_at.elapsed() < max_age)
    }

    fn name_key(name: &str) -> String {
        name.to_ascii_lowercase()
    }

    /// Drop every expired entry
    pub fn purge_expired(&self) {
        self.profiles
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .retain(|_, entry| self.is_fresh(entry));
        self.skins
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .retain(|_, entry| self.is_fresh(entry));
    }

    pub fn len(&self) -> usize {
        let profiles = self.profiles.read().unwrap_or_else(PoisonError::into_inner).len();
        let skins = self.skins.read().unwrap_or_else(PoisonError::into_inner).len();
        profiles + skins
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait::async_trait]
impl ProfileCache for MemoryCache {
    async fn get_by_name(&self, name: &str) -> Option<Profile> {
        let profiles = self.profiles.read().unwrap_or_else(PoisonError::into_inner);
        profiles
            .get(&Self::name_key(name))
            .filter(|entry| self.is_fresh(entry))
            .map(|entry| entry.value.clone())
    }

    async fn add(&self, profile: &Profile) {
        let entry = Entry {
            value: profile.clone(),
            stored_at: Instant::now(),
        };
        self.profiles
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(Self::name_key(&profile.name), entry);
    }

    async fn get_skin(&self, id: &Uuid) -> Option<SkinProperty> {
        let skins = self.skins.read().unwrap_or_else(PoisonError::into_inner);
        skins
            .get(id)
            .filter(|entry| self.is_fresh(entry))
            .map(|entry| entry.value.clone())
    }

    async fn add_skin(&self, id: &Uuid, property: &SkinProperty) {
        let entry = Entry {
            value: property.clone(),
            stored_at: Instant::now(),
        };
        self.skins
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(*id, entry);
    }
}
