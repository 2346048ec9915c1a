//! Keeps one slice of a user's document mirrored across process memory, the
//! local cache and the remote document store.
//!
//! Reads go through [`SyncedRepository::snapshot`], writes through
//! [`SyncedRepository::update`]. Every committed update is written to the
//! local cache right away and merge-written to the remote document in a
//! spawned task. Remote changes arrive through a polling subscription and are
//! reconciled according to the configured [`ConflictPolicy`].

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;

use serde::{de::DeserializeOwned, Serialize};
use serde_json::{Map, Value};
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use shared_config::{AppConfig, ConflictPolicy};
use shared_models::session::UserSession;

use crate::cache::{FileCache, LocalCache};
use crate::document::{DocumentRef, DocumentStore, InMemoryDocumentStore, SupabaseDocumentStore};

/// The top-level document fields one page owns.
///
/// The type must serialize to a JSON object; each of its keys is a field of
/// the remote document named by `COLLECTION` and the user id.
pub trait DocumentSlice: Serialize + DeserializeOwned + Clone + Default + Send + Sync + 'static {
    /// Local cache key, fixed per page.
    const CACHE_KEY: &'static str;
    /// Remote collection holding the document.
    const COLLECTION: &'static str;
}

/// Everything a repository needs besides the session it serves.
#[derive(Clone)]
pub struct SyncContext {
    pub store: Arc<dyn DocumentStore>,
    pub cache: Arc<dyn LocalCache>,
    pub policy: ConflictPolicy,
    pub poll_interval: Option<Duration>,
}

impl SyncContext {
    pub fn new(store: Arc<dyn DocumentStore>, cache: Arc<dyn LocalCache>) -> Self {
        Self {
            store,
            cache,
            policy: ConflictPolicy::default(),
            poll_interval: None,
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        let store: Arc<dyn DocumentStore> = if config.is_configured() {
            info!("Using Supabase document store at {}", config.supabase_url);
            Arc::new(SupabaseDocumentStore::new(config))
        } else {
            warn!("Using in-memory document store");
            Arc::new(InMemoryDocumentStore::new())
        };

        Self {
            store,
            cache: Arc::new(FileCache::new(&config.local_cache_dir)),
            policy: config.conflict_policy,
            poll_interval: config.remote_poll_interval(),
        }
    }

    pub fn with_policy(mut self, policy: ConflictPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_poll_interval(mut self, poll_interval: Option<Duration>) -> Self {
        self.poll_interval = poll_interval;
        self
    }
}

/// Result of a committed update. The remote merge-write is still running in
/// `remote_write`; awaiting it is optional.
#[derive(Debug)]
pub struct Committed<R> {
    pub value: R,
    pub remote_write: JoinHandle<()>,
}

/// Handle to a remote change poller. Dropping it stops the poller.
#[derive(Debug)]
pub struct Subscription {
    handle: JoinHandle<()>,
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

pub struct SyncedRepository<T: DocumentSlice> {
    session: UserSession,
    doc: DocumentRef,
    store: Arc<dyn DocumentStore>,
    cache: Arc<dyn LocalCache>,
    policy: ConflictPolicy,
    state: RwLock<T>,
    writes_in_flight: AtomicUsize,
    /// Bumped on every committed update, under the state lock.
    commits: AtomicU64,
    last_remote: Mutex<Option<Value>>,
    subscription: StdMutex<Option<Subscription>>,
}

impl<T: DocumentSlice> SyncedRepository<T> {
    /// Starts from the cached value (or the slice default), then reads the
    /// remote document once and subscribes to it when polling is enabled.
    pub async fn open(ctx: &SyncContext, session: &UserSession) -> Arc<Self> {
        let initial = read_cached::<T>(ctx.cache.as_ref(), session.user_id()).unwrap_or_default();

        let repo = Arc::new(Self {
            session: session.clone(),
            doc: DocumentRef::new(T::COLLECTION, session.user_id()),
            store: Arc::clone(&ctx.store),
            cache: Arc::clone(&ctx.cache),
            policy: ctx.policy,
            state: RwLock::new(initial),
            writes_in_flight: AtomicUsize::new(0),
            commits: AtomicU64::new(0),
            last_remote: Mutex::new(None),
            subscription: StdMutex::new(None),
        });

        repo.poll_remote().await;

        if let Some(every) = ctx.poll_interval {
            repo.subscribe(every);
        }

        debug!("Opened {} for {}", T::CACHE_KEY, repo.doc);
        repo
    }

    pub fn session(&self) -> &UserSession {
        &self.session
    }

    pub fn document(&self) -> &DocumentRef {
        &self.doc
    }

    pub fn writes_in_flight(&self) -> usize {
        self.writes_in_flight.load(Ordering::SeqCst)
    }

    pub async fn snapshot(&self) -> T {
        self.state.read().await.clone()
    }

    /// Applies `mutate` to a copy of the current state. On success the copy
    /// becomes the new state, is written to the local cache and is handed to
    /// a background merge-write. On error nothing changes.
    pub async fn update<F, R, E>(self: &Arc<Self>, mutate: F) -> Result<Committed<R>, E>
    where
        F: FnOnce(&mut T) -> Result<R, E>,
    {
        let (value, next) = {
            let mut state = self.state.write().await;
            let mut next = state.clone();
            let value = mutate(&mut next)?;
            *state = next.clone();
            // Cache writes happen in commit order.
            self.write_cache(&next);
            // Counted before the lock is released so a concurrent poll
            // always sees this write as pending.
            self.writes_in_flight.fetch_add(1, Ordering::SeqCst);
            self.commits.fetch_add(1, Ordering::SeqCst);
            (value, next)
        };

        let remote_write = self.spawn_remote_write(next);

        Ok(Committed { value, remote_write })
    }

    /// Reads the remote document and reconciles it with local state if it
    /// changed since the last read. Returns whether local state changed.
    ///
    /// A snapshot that is held back, or that was loaded before a commit it
    /// did not see, is not recorded as seen; the next poll looks at it again.
    pub async fn poll_remote(&self) -> bool {
        let loaded_at = self.commits.load(Ordering::SeqCst);
        let remote = match self.store.load(&self.doc).await {
            Ok(Some(remote)) => remote,
            Ok(None) => {
                debug!("No remote document at {}", self.doc);
                return false;
            }
            Err(e) => {
                warn!("Failed to load {}: {}", self.doc, e);
                return false;
            }
        };

        let mut last = self.last_remote.lock().await;
        if last.as_ref() == Some(&remote) {
            return false;
        }

        match self.apply_remote(&remote, loaded_at).await {
            Reconcile::Applied => {
                *last = Some(remote);
                true
            }
            Reconcile::Unchanged => {
                *last = Some(remote);
                false
            }
            Reconcile::Held | Reconcile::Stale => {
                *last = None;
                false
            }
        }
    }

    pub fn subscribe(self: &Arc<Self>, every: Duration) {
        let weak = Arc::downgrade(self);
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            // The first tick fires immediately; open() has just read the document.
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let Some(repo) = weak.upgrade() else { break };
                repo.poll_remote().await;
            }
        });

        if let Ok(mut slot) = self.subscription.lock() {
            *slot = Some(Subscription { handle });
        }
    }

    pub fn unsubscribe(&self) {
        if let Ok(mut slot) = self.subscription.lock() {
            slot.take();
        }
    }

    pub fn is_subscribed(&self) -> bool {
        self.subscription
            .lock()
            .map(|slot| slot.is_some())
            .unwrap_or(false)
    }

    async fn apply_remote(&self, remote: &Value, loaded_at: u64) -> Reconcile {
        let mut state = self.state.write().await;

        if self.commits.load(Ordering::SeqCst) != loaded_at {
            debug!("Dropping remote snapshot of {}: loaded before a local commit", self.doc);
            return Reconcile::Stale;
        }

        if self.policy == ConflictPolicy::HoldWhileWriting && self.writes_in_flight() > 0 {
            debug!("Holding remote snapshot of {}: local write in flight", self.doc);
            return Reconcile::Held;
        }

        match overlay_remote(&*state, remote) {
            Some(next) => {
                self.write_cache(&next);
                *state = next;
                debug!("Applied remote snapshot of {}", self.doc);
                Reconcile::Applied
            }
            None => Reconcile::Unchanged,
        }
    }

    fn write_cache(&self, value: &T) {
        let result = serde_json::to_string(value)
            .map_err(anyhow::Error::from)
            .and_then(|raw| self.cache.set(self.session.user_id(), T::CACHE_KEY, &raw));

        if let Err(e) = result {
            debug!("Ignoring cache write failure for {}: {}", T::CACHE_KEY, e);
        }
    }

    fn spawn_remote_write(self: &Arc<Self>, value: T) -> JoinHandle<()> {
        let repo = Arc::clone(self);
        tokio::spawn(async move {
            match to_fields(&value) {
                Some(fields) => {
                    if let Err(e) = repo.store.merge(&repo.doc, fields).await {
                        error!("Failed to merge-write {}: {}", repo.doc, e);
                    } else {
                        debug!("Merge-wrote {} into {}", T::CACHE_KEY, repo.doc);
                    }
                }
                None => error!("{} does not serialize to a JSON object", T::CACHE_KEY),
            }
            repo.writes_in_flight.fetch_sub(1, Ordering::SeqCst);
        })
    }
}

enum Reconcile {
    Applied,
    Unchanged,
    Held,
    Stale,
}

/// Lazily opened repositories, one per session.
pub struct SessionRepositories<T: DocumentSlice> {
    ctx: SyncContext,
    open: RwLock<HashMap<String, Arc<SyncedRepository<T>>>>,
}

impl<T: DocumentSlice> SessionRepositories<T> {
    pub fn new(ctx: SyncContext) -> Self {
        Self {
            ctx,
            open: RwLock::new(HashMap::new()),
        }
    }

    pub async fn get(&self, session: &UserSession) -> Arc<SyncedRepository<T>> {
        if let Some(repo) = self.open.read().await.get(session.user_id()) {
            return Arc::clone(repo);
        }

        // Opened without holding the map so a slow remote read for one user
        // does not block the others. A repository opened twice is dropped.
        let repo = SyncedRepository::open(&self.ctx, session).await;

        let mut open = self.open.write().await;
        Arc::clone(open.entry(session.user_id().to_string()).or_insert(repo))
    }
}

fn read_cached<T: DocumentSlice>(cache: &dyn LocalCache, scope: &str) -> Option<T> {
    let raw = cache.get(scope, T::CACHE_KEY)?;
    match serde_json::from_str(&raw) {
        Ok(value) => Some(value),
        Err(e) => {
            debug!("Ignoring unparseable cache entry {}: {}", T::CACHE_KEY, e);
            None
        }
    }
}

fn to_fields<T: Serialize>(value: &T) -> Option<Map<String, Value>> {
    match serde_json::to_value(value) {
        Ok(Value::Object(fields)) => Some(fields),
        _ => None,
    }
}

/// Replaces each field of `current` with the remote document's value for
/// it, skipping fields that are absent, null, or do not deserialize into the
/// slice. Returns `None` when no field changed.
fn overlay_remote<T: DocumentSlice>(current: &T, remote: &Value) -> Option<T> {
    let remote = remote.as_object()?;
    let mut fields = to_fields(current)?;
    let keys: Vec<String> = fields.keys().cloned().collect();
    let mut changed = false;

    for key in keys {
        let incoming = match remote.get(&key) {
            Some(value) if !value.is_null() => value,
            _ => continue,
        };
        if fields.get(&key) == Some(incoming) {
            continue;
        }

        let mut candidate = fields.clone();
        candidate.insert(key.clone(), incoming.clone());
        if serde_json::from_value::<T>(Value::Object(candidate.clone())).is_ok() {
            fields = candidate;
            changed = true;
        } else {
            warn!("Ignoring remote field {} of {}: unexpected shape", key, T::CACHE_KEY);
        }
    }

    if !changed {
        return None;
    }

    serde_json::from_value(Value::Object(fields)).ok()
}
