//! Shared test fixtures: in-memory repositories, a canned content source,
//! a capturing render transport and a fully wired engine harness.

use std::collections::{HashMap, HashSet};
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::Router;
use time::{Duration, OffsetDateTime};
use url::Url;

use specchio::application::content::ContentSource;
use specchio::application::dispatcher::{
    DispatchSettings, RenderDispatcher, RenderPayload, RenderTransport, TransportError,
};
use specchio::application::prerender::PrerenderService;
use specchio::application::queue::RenderQueue;
use specchio::application::repos::{
    EntriesRepo, OptionsRepo, RepoError, SecretsRepo,
};
use specchio::application::scheduler::{Scheduler, SchedulerPolicy};
use specchio::application::templates::TemplateRegistry;
use specchio::cache::{EntryStore, SecretsManager, VersionCounter};
use specchio::domain::entry::EntryRecord;
use specchio::domain::template::DateId;
use specchio::infra::http::{self, HttpState};

pub const HOME: &str = "https://example.test/";

// ============================================================================
// In-memory repositories
// ============================================================================

#[derive(Default)]
pub struct MemoryEntries {
    rows: Mutex<HashMap<(String, i64), EntryRecord>>,
    next_id: AtomicI64,
    pub fail_writes: AtomicBool,
}

impl MemoryEntries {
    pub fn row(&self, kind: &str, object_id: i64) -> Option<EntryRecord> {
        self.rows
            .lock()
            .expect("entries lock")
            .get(&(kind.to_string(), object_id))
            .cloned()
    }
}

#[async_trait]
impl EntriesRepo for MemoryEntries {
    async fn find(&self, kind: &str, object_id: i64) -> Result<Option<EntryRecord>, RepoError> {
        Ok(self.row(kind, object_id))
    }

    async fn upsert(
        &self,
        html: &str,
        version: &str,
        kind: &str,
        object_id: i64,
    ) -> Result<EntryRecord, RepoError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(RepoError::from_persistence("entry table unavailable"));
        }

        let now = OffsetDateTime::now_utc();
        let mut rows = self.rows.lock().expect("entries lock");
        let key = (kind.to_string(), object_id);

        let record = match rows.get(&key) {
            Some(existing) => EntryRecord {
                html: html.to_string(),
                version: version.to_string(),
                updated: now,
                ..existing.clone()
            },
            None => EntryRecord {
                id: self.next_id.fetch_add(1, Ordering::SeqCst) + 1,
                kind: kind.to_string(),
                object_id,
                html: html.to_string(),
                version: version.to_string(),
                created: now,
                updated: now,
            },
        };

        rows.insert(key, record.clone());
        Ok(record)
    }

    async fn delete(&self, kind: &str, object_id: i64) -> Result<bool, RepoError> {
        Ok(self
            .rows
            .lock()
            .expect("entries lock")
            .remove(&(kind.to_string(), object_id))
            .is_some())
    }
}

#[derive(Default)]
pub struct MemorySecrets {
    rows: Mutex<HashMap<(String, String), (Vec<u8>, OffsetDateTime)>>,
}

impl MemorySecrets {
    /// Backdates every stored secret past its TTL.
    pub fn expire_all(&self) {
        let mut rows = self.rows.lock().expect("secrets lock");
        let expired = OffsetDateTime::now_utc() - Duration::minutes(1);
        for (_, expires) in rows.values_mut() {
            *expires = expired;
        }
    }

    pub fn len(&self) -> usize {
        self.rows.lock().expect("secrets lock").len()
    }
}

#[async_trait]
impl SecretsRepo for MemorySecrets {
    async fn put(
        &self,
        template: &str,
        id: &str,
        hash: &[u8],
        expires: OffsetDateTime,
    ) -> Result<(), RepoError> {
        self.rows
            .lock()
            .expect("secrets lock")
            .insert((template.to_string(), id.to_string()), (hash.to_vec(), expires));
        Ok(())
    }

    async fn find(
        &self,
        template: &str,
        id: &str,
        now: OffsetDateTime,
    ) -> Result<Option<Vec<u8>>, RepoError> {
        Ok(self
            .rows
            .lock()
            .expect("secrets lock")
            .get(&(template.to_string(), id.to_string()))
            .filter(|(_, expires)| *expires > now)
            .map(|(hash, _)| hash.clone()))
    }

    async fn delete(&self, template: &str, id: &str) -> Result<bool, RepoError> {
        Ok(self
            .rows
            .lock()
            .expect("secrets lock")
            .remove(&(template.to_string(), id.to_string()))
            .is_some())
    }

    async fn delete_expired(&self, now: OffsetDateTime) -> Result<u64, RepoError> {
        let mut rows = self.rows.lock().expect("secrets lock");
        let before = rows.len();
        rows.retain(|_, (_, expires)| *expires > now);
        Ok((before - rows.len()) as u64)
    }

    async fn delete_all(&self) -> Result<u64, RepoError> {
        let mut rows = self.rows.lock().expect("secrets lock");
        let count = rows.len() as u64;
        rows.clear();
        Ok(count)
    }
}

#[derive(Default)]
pub struct MemoryOptions {
    rows: Mutex<HashMap<String, String>>,
}

#[async_trait]
impl OptionsRepo for MemoryOptions {
    async fn get_option(&self, name: &str) -> Result<Option<String>, RepoError> {
        Ok(self.rows.lock().expect("options lock").get(name).cloned())
    }

    async fn set_option(&self, name: &str, value: &str) -> Result<(), RepoError> {
        self.rows
            .lock()
            .expect("options lock")
            .insert(name.to_string(), value.to_string());
        Ok(())
    }
}

// ============================================================================
// Canned content source
// ============================================================================

/// A site with two archive-enabled post types (`post`, `product`), one whose
/// archive resolves to the site root (`news`), and one with no archive
/// (`page`).
pub struct FakeContent {
    home: Url,
    deleted_posts: Mutex<HashSet<i64>>,
}

impl Default for FakeContent {
    fn default() -> Self {
        Self {
            home: Url::parse(HOME).expect("home url"),
            deleted_posts: Mutex::new(HashSet::new()),
        }
    }
}

impl FakeContent {
    pub fn mark_post_deleted(&self, post_id: i64) {
        self.deleted_posts
            .lock()
            .expect("deleted posts lock")
            .insert(post_id);
    }
}

#[async_trait]
impl ContentSource for FakeContent {
    async fn home_url(&self) -> Url {
        self.home.clone()
    }

    async fn post_url(&self, post_id: i64) -> Option<Url> {
        if self
            .deleted_posts
            .lock()
            .expect("deleted posts lock")
            .contains(&post_id)
        {
            return None;
        }
        self.home.join(&format!("?p={post_id}")).ok()
    }

    async fn author_url(&self, author_id: i64) -> Option<Url> {
        self.home.join(&format!("author/{author_id}/")).ok()
    }

    async fn term_url(&self, term_id: i64) -> Option<Url> {
        self.home.join(&format!("term/{term_id}/")).ok()
    }

    async fn post_type_archive_url(&self, post_type: &str) -> Option<Url> {
        match post_type {
            "post" => self.home.join("archive/").ok(),
            "product" => self.home.join("products/").ok(),
            "news" => Some(self.home.clone()),
            _ => None,
        }
    }

    async fn date_archive_url(&self, date: &DateId) -> Option<Url> {
        self.home.join(&format!("{}/", date.compact())).ok()
    }

    async fn post_type_exists(&self, post_type: &str) -> bool {
        matches!(post_type, "post" | "product" | "news" | "page")
    }
}

// ============================================================================
// Capturing render transport
// ============================================================================

#[derive(Default)]
pub struct CapturingTransport {
    pub sent: Mutex<Vec<RenderPayload>>,
    pub reject: AtomicBool,
}

impl CapturingTransport {
    pub fn payloads(&self) -> Vec<RenderPayload> {
        self.sent.lock().expect("transport lock").clone()
    }

    pub fn last_payload(&self) -> Option<RenderPayload> {
        self.payloads().last().cloned()
    }
}

#[async_trait]
impl RenderTransport for CapturingTransport {
    async fn send(&self, payload: &RenderPayload) -> Result<(), TransportError> {
        if self.reject.load(Ordering::SeqCst) {
            return Err(TransportError::Rejected { status: 503 });
        }
        self.sent.lock().expect("transport lock").push(payload.clone());
        Ok(())
    }
}

// ============================================================================
// Engine harness
// ============================================================================

pub struct Harness {
    pub entries_repo: Arc<MemoryEntries>,
    pub secrets_repo: Arc<MemorySecrets>,
    pub options_repo: Arc<MemoryOptions>,
    pub entries: Arc<EntryStore>,
    pub secrets: Arc<SecretsManager>,
    pub html_version: Arc<VersionCounter>,
    pub registry: Arc<TemplateRegistry>,
    pub content: Arc<FakeContent>,
    pub queue: Arc<RenderQueue>,
    pub scheduler: Arc<Scheduler>,
    pub transport: Arc<CapturingTransport>,
    pub dispatcher: Arc<RenderDispatcher>,
    pub prerender: Arc<PrerenderService>,
}

impl Harness {
    pub async fn new() -> Self {
        Self::with_policy(SchedulerPolicy::default()).await
    }

    pub async fn with_policy(policy: SchedulerPolicy) -> Self {
        let entries_repo = Arc::new(MemoryEntries::default());
        let secrets_repo = Arc::new(MemorySecrets::default());
        let options_repo = Arc::new(MemoryOptions::default());

        let entries = Arc::new(EntryStore::new(
            entries_repo.clone(),
            NonZeroUsize::new(64).expect("cache capacity"),
        ));
        let secrets = Arc::new(SecretsManager::new(secrets_repo.clone()));
        let html_version = Arc::new(VersionCounter::html(options_repo.clone()));
        html_version.init().await.expect("init html version");

        let registry = Arc::new(TemplateRegistry::with_builtins());
        let content = Arc::new(FakeContent::default());
        let queue = Arc::new(RenderQueue::new());

        let scheduler = Arc::new(Scheduler::new(
            entries.clone(),
            registry.clone(),
            content.clone(),
            queue.clone(),
            policy,
        ));

        let transport = Arc::new(CapturingTransport::default());
        let dispatcher = Arc::new(RenderDispatcher::new(
            registry.clone(),
            content.clone(),
            secrets.clone(),
            html_version.clone(),
            transport.clone(),
            DispatchSettings {
                return_url: Url::parse(HOME)
                    .and_then(|home| home.join("specchio/v1/prerender"))
                    .expect("return url"),
                selector: "#app".to_string(),
                variable: "specchioPrerender".to_string(),
                cache_buster: "specchio_prerender".to_string(),
            },
        ));

        let prerender = Arc::new(PrerenderService::new(
            entries.clone(),
            registry.clone(),
            content.clone(),
            html_version.clone(),
            scheduler.clone(),
        ));

        Self {
            entries_repo,
            secrets_repo,
            options_repo,
            entries,
            secrets,
            html_version,
            registry,
            content,
            queue,
            scheduler,
            transport,
            dispatcher,
            prerender,
        }
    }

    pub fn router(&self) -> Router {
        http::router(HttpState {
            prerender: self.prerender.clone(),
            scheduler: self.scheduler.clone(),
            secrets: self.secrets.clone(),
            html_version: self.html_version.clone(),
        })
    }

    pub async fn current_version(&self) -> String {
        self.html_version
            .current()
            .await
            .expect("current version")
            .expect("version initialized")
    }

    /// Drains the queue and fires every job, as the dispatch loop would.
    pub async fn dispatch_all(&self) {
        for job in self.queue.drain(usize::MAX) {
            self.dispatcher
                .invoke(&job)
                .await
                .expect("dispatch render job");
        }
    }

    /// Jobs currently pending, as `(template, id)` pairs.
    pub fn pending_jobs(&self) -> Vec<(String, String)> {
        let jobs = self.queue.drain(usize::MAX);
        let pairs = jobs
            .iter()
            .map(|job| (job.template.clone(), job.id.to_string()))
            .collect();
        for job in jobs {
            self.queue.push(job);
        }
        pairs
    }
}
