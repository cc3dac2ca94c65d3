//! HTTP fetch discipline + the deduplicating job record store.

use std::collections::{BTreeMap, HashSet};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use jobradar_core::{
    NormalizedJobRecord, NotificationLogEntry, SourceRunStatus, SourceStatus, StoredJobRecord,
};
use sha2::{Digest, Sha256};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use thiserror::Error;
use tokio::sync::Mutex;
use tokio::time::Instant;
use uuid::Uuid;

pub const CRATE_NAME: &str = "jobradar-storage";

/// Deterministic dedup key: SHA-256 over (url, title, company).
///
/// Records that agree on those three fields collapse to one stored row no
/// matter which source reported them or what the optional fields say.
pub fn identity_hash(record: &NormalizedJobRecord) -> String {
    let mut hasher = Sha256::new();
    hasher.update(record.url.as_bytes());
    hasher.update(record.title.as_bytes());
    hasher.update(record.company.as_bytes());
    hex::encode(hasher.finalize())
}

#[derive(Debug, Clone, Copy)]
pub struct BackoffPolicy {
    pub max_attempts: usize,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
        }
    }
}

impl BackoffPolicy {
    pub fn delay_for_attempt(&self, attempt_index: usize) -> Duration {
        let factor = 1u32.checked_shl(attempt_index as u32).unwrap_or(u32::MAX);
        let delay = self.base_delay.saturating_mul(factor);
        delay.min(self.max_delay)
    }
}

/// Serializes outbound requests so that at least `min_delay` elapses between
/// any two of them, retries included.
#[derive(Debug)]
pub struct RequestPacer {
    min_delay: Duration,
    last_request: Mutex<Option<Instant>>,
}

impl RequestPacer {
    pub fn new(min_delay: Duration) -> Self {
        Self {
            min_delay,
            last_request: Mutex::new(None),
        }
    }

    /// Blocks until the pacing window has passed, then claims the slot.
    pub async fn wait(&self) {
        let mut last = self.last_request.lock().await;
        if let Some(prev) = *last {
            let elapsed = prev.elapsed();
            if elapsed < self.min_delay {
                tokio::time::sleep(self.min_delay - elapsed).await;
            }
        }
        *last = Some(Instant::now());
    }
}

#[derive(Debug, Clone)]
pub struct HttpClientConfig {
    pub timeout: Duration,
    pub user_agent: String,
    pub min_request_delay: Duration,
    pub backoff: BackoffPolicy,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(15),
            user_agent: "jobradar-bot/0.1 (job listing aggregator)".to_string(),
            min_request_delay: Duration::from_secs(2),
            backoff: BackoffPolicy::default(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct FetchedResponse {
    pub status: reqwest::StatusCode,
    pub final_url: String,
    pub body: String,
}

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request failed after retries: {0}")]
    Request(#[from] reqwest::Error),
    #[error("http status {status} for {url}")]
    HttpStatus { status: u16, url: String },
}

/// Page fetcher with bounded retries, exponential backoff, and a mandatory
/// inter-request delay shared across every caller.
#[derive(Debug)]
pub struct HttpFetcher {
    client: reqwest::Client,
    pacer: RequestPacer,
    backoff: BackoffPolicy,
}

impl HttpFetcher {
    pub fn new(config: HttpClientConfig) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .gzip(true)
            .brotli(true)
            .timeout(config.timeout)
            .user_agent(config.user_agent.clone())
            .build()?;
        let mut backoff = config.backoff;
        backoff.max_attempts = backoff.max_attempts.max(1);
        Ok(Self {
            client,
            pacer: RequestPacer::new(config.min_request_delay),
            backoff,
        })
    }

    /// Fetch one page. An `Err` here means "no response for this page" —
    /// callers skip the page and continue, they do not abort.
    pub async fn fetch(&self, url: &str) -> Result<FetchedResponse, FetchError> {
        let mut last_error: Option<FetchError> = None;

        for attempt in 0..self.backoff.max_attempts {
            self.pacer.wait().await;

            match self.client.get(url).send().await {
                Ok(resp) => {
                    let status = resp.status();
                    let final_url = resp.url().to_string();
                    if status.is_success() {
                        let body = resp.text().await?;
                        return Ok(FetchedResponse {
                            status,
                            final_url,
                            body,
                        });
                    }
                    last_error = Some(FetchError::HttpStatus {
                        status: status.as_u16(),
                        url: final_url,
                    });
                }
                Err(err) => last_error = Some(FetchError::Request(err)),
            }

            if attempt + 1 < self.backoff.max_attempts {
                tokio::time::sleep(self.backoff.delay_for_attempt(attempt)).await;
            }
        }

        let err = last_error.expect("retry loop always records an error");
        tracing::warn!(url, attempts = self.backoff.max_attempts, %err, "fetch exhausted retries");
        Err(err)
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Substring filters for `list_all`. `source_platform` is an exact match,
/// everything else is a case-insensitive substring.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JobFilter {
    pub search: Option<String>,
    pub location: Option<String>,
    pub experience_level: Option<String>,
    pub job_type: Option<String>,
    pub source_platform: Option<String>,
}

/// Persistent record store contract. `insert_if_absent` is the single
/// source of truth for "is this posting new"; its check-then-insert is
/// atomic with respect to concurrent callers.
#[async_trait]
pub trait JobStore: Send + Sync {
    async fn insert_if_absent(
        &self,
        record: NormalizedJobRecord,
    ) -> Result<Option<StoredJobRecord>, StoreError>;

    async fn list_all(&self, filter: &JobFilter) -> Result<Vec<StoredJobRecord>, StoreError>;

    async fn list_unseen(&self) -> Result<Vec<StoredJobRecord>, StoreError>;

    async fn mark_all_seen(&self) -> Result<(), StoreError>;

    async fn upsert_source_status(
        &self,
        platform: &str,
        status: SourceStatus,
    ) -> Result<(), StoreError>;

    async fn source_statuses(&self) -> Result<Vec<SourceRunStatus>, StoreError>;

    async fn append_notification_log(
        &self,
        job_id: Uuid,
        recipient: &str,
        subject: &str,
    ) -> Result<(), StoreError>;
}

#[derive(Default)]
struct MemoryInner {
    jobs: Vec<StoredJobRecord>,
    hashes: HashSet<String>,
    statuses: BTreeMap<String, SourceRunStatus>,
    notifications: Vec<NotificationLogEntry>,
}

/// In-memory store. The mutex held across check-then-insert makes the
/// dedup gate atomic even when sources run concurrently.
#[derive(Default)]
pub struct MemoryJobStore {
    inner: Mutex<MemoryInner>,
}

impl MemoryJobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Test/diagnostic view of the append-only notification log.
    pub async fn notification_log(&self) -> Vec<NotificationLogEntry> {
        self.inner.lock().await.notifications.clone()
    }
}

fn record_matches(stored: &StoredJobRecord, filter: &JobFilter) -> bool {
    fn contains_ci(haystack: &str, needle: &str) -> bool {
        haystack.to_lowercase().contains(&needle.to_lowercase())
    }

    if let Some(search) = &filter.search {
        if !contains_ci(&stored.record.title, search) && !contains_ci(&stored.record.company, search)
        {
            return false;
        }
    }
    if let Some(location) = &filter.location {
        if !contains_ci(&stored.record.location, location) {
            return false;
        }
    }
    if let Some(experience) = &filter.experience_level {
        if !contains_ci(&stored.record.experience_level, experience) {
            return false;
        }
    }
    if let Some(job_type) = &filter.job_type {
        if !contains_ci(&stored.record.job_type, job_type) {
            return false;
        }
    }
    if let Some(platform) = &filter.source_platform {
        if &stored.record.source_platform != platform {
            return false;
        }
    }
    true
}

#[async_trait]
impl JobStore for MemoryJobStore {
    async fn insert_if_absent(
        &self,
        record: NormalizedJobRecord,
    ) -> Result<Option<StoredJobRecord>, StoreError> {
        let mut inner = self.inner.lock().await;
        let hash = identity_hash(&record);
        if inner.hashes.contains(&hash) {
            return Ok(None);
        }
        let now = Utc::now();
        let stored = StoredJobRecord {
            id: Uuid::new_v4(),
            record,
            unseen: true,
            created_at: now,
            updated_at: now,
        };
        inner.hashes.insert(hash);
        inner.jobs.push(stored.clone());
        Ok(Some(stored))
    }

    async fn list_all(&self, filter: &JobFilter) -> Result<Vec<StoredJobRecord>, StoreError> {
        let inner = self.inner.lock().await;
        Ok(inner
            .jobs
            .iter()
            .rev()
            .filter(|stored| record_matches(stored, filter))
            .cloned()
            .collect())
    }

    async fn list_unseen(&self) -> Result<Vec<StoredJobRecord>, StoreError> {
        let inner = self.inner.lock().await;
        Ok(inner
            .jobs
            .iter()
            .rev()
            .filter(|stored| stored.unseen)
            .cloned()
            .collect())
    }

    async fn mark_all_seen(&self) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().await;
        let now = Utc::now();
        for stored in inner.jobs.iter_mut().filter(|stored| stored.unseen) {
            stored.unseen = false;
            stored.updated_at = now;
        }
        Ok(())
    }

    async fn upsert_source_status(
        &self,
        platform: &str,
        status: SourceStatus,
    ) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().await;
        inner.statuses.insert(
            platform.to_string(),
            SourceRunStatus {
                platform: platform.to_string(),
                last_run: Utc::now(),
                status,
            },
        );
        Ok(())
    }

    async fn source_statuses(&self) -> Result<Vec<SourceRunStatus>, StoreError> {
        let inner = self.inner.lock().await;
        Ok(inner.statuses.values().cloned().collect())
    }

    async fn append_notification_log(
        &self,
        job_id: Uuid,
        recipient: &str,
        subject: &str,
    ) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().await;
        inner.notifications.push(NotificationLogEntry {
            job_id,
            recipient: recipient.to_string(),
            subject: subject.to_string(),
            sent_at: Utc::now(),
        });
        Ok(())
    }
}

const SCHEMA_STATEMENTS: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS jobs (
        id UUID PRIMARY KEY,
        job_title TEXT NOT NULL,
        company_name TEXT NOT NULL,
        location TEXT NOT NULL DEFAULT '',
        experience_level TEXT NOT NULL DEFAULT '',
        job_type TEXT NOT NULL DEFAULT '',
        posted_date TEXT NOT NULL DEFAULT '',
        job_url TEXT NOT NULL,
        source_platform TEXT NOT NULL,
        job_hash TEXT NOT NULL UNIQUE,
        unseen BOOLEAN NOT NULL DEFAULT TRUE,
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS job_sources (
        platform_name TEXT PRIMARY KEY,
        last_run TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        status TEXT NOT NULL DEFAULT 'active'
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS notification_log (
        id UUID PRIMARY KEY,
        job_id UUID NOT NULL REFERENCES jobs(id),
        recipient TEXT NOT NULL,
        subject TEXT NOT NULL,
        sent_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_jobs_hash ON jobs(job_hash)",
    "CREATE INDEX IF NOT EXISTS idx_jobs_unseen ON jobs(unseen)",
    "CREATE INDEX IF NOT EXISTS idx_jobs_platform ON jobs(source_platform)",
];

const STORED_COLUMNS: &str = "id, job_title, company_name, location, experience_level, \
     job_type, posted_date, job_url, source_platform, unseen, created_at, updated_at";

/// Postgres-backed store. Dedup rides on the `job_hash` unique constraint:
/// one `INSERT .. ON CONFLICT DO NOTHING RETURNING` per record.
#[derive(Debug, Clone)]
pub struct PgJobStore {
    pool: PgPool,
}

impl PgJobStore {
    pub async fn connect(database_url: &str) -> Result<Self, StoreError> {
        let pool = PgPool::connect(database_url).await?;
        Ok(Self { pool })
    }

    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn init_schema(&self) -> Result<(), StoreError> {
        for statement in SCHEMA_STATEMENTS {
            sqlx::query(statement).execute(&self.pool).await?;
        }
        Ok(())
    }
}

fn row_to_stored(row: &PgRow) -> Result<StoredJobRecord, sqlx::Error> {
    Ok(StoredJobRecord {
        id: row.try_get("id")?,
        record: NormalizedJobRecord {
            title: row.try_get("job_title")?,
            company: row.try_get("company_name")?,
            location: row.try_get("location")?,
            experience_level: row.try_get("experience_level")?,
            job_type: row.try_get("job_type")?,
            posted_date: row.try_get("posted_date")?,
            url: row.try_get("job_url")?,
            source_platform: row.try_get("source_platform")?,
        },
        unseen: row.try_get("unseen")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

#[async_trait]
impl JobStore for PgJobStore {
    async fn insert_if_absent(
        &self,
        record: NormalizedJobRecord,
    ) -> Result<Option<StoredJobRecord>, StoreError> {
        let hash = identity_hash(&record);
        let id = Uuid::new_v4();
        let row = sqlx::query(
            r#"
            INSERT INTO jobs (
                id, job_title, company_name, location, experience_level,
                job_type, posted_date, job_url, source_platform, job_hash, unseen
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, TRUE)
            ON CONFLICT (job_hash) DO NOTHING
            RETURNING unseen, created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(&record.title)
        .bind(&record.company)
        .bind(&record.location)
        .bind(&record.experience_level)
        .bind(&record.job_type)
        .bind(&record.posted_date)
        .bind(&record.url)
        .bind(&record.source_platform)
        .bind(&hash)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Ok(Some(StoredJobRecord {
                id,
                record,
                unseen: row.try_get("unseen")?,
                created_at: row.try_get("created_at")?,
                updated_at: row.try_get("updated_at")?,
            })),
            None => Ok(None),
        }
    }

    async fn list_all(&self, filter: &JobFilter) -> Result<Vec<StoredJobRecord>, StoreError> {
        let mut sql = format!("SELECT {STORED_COLUMNS} FROM jobs WHERE 1=1");
        let mut binds: Vec<&String> = Vec::new();

        if let Some(search) = &filter.search {
            binds.push(search);
            let n = binds.len();
            sql.push_str(&format!(
                " AND (job_title ILIKE '%' || ${n} || '%' OR company_name ILIKE '%' || ${n} || '%')"
            ));
        }
        if let Some(location) = &filter.location {
            binds.push(location);
            sql.push_str(&format!(" AND location ILIKE '%' || ${} || '%'", binds.len()));
        }
        if let Some(experience) = &filter.experience_level {
            binds.push(experience);
            sql.push_str(&format!(
                " AND experience_level ILIKE '%' || ${} || '%'",
                binds.len()
            ));
        }
        if let Some(job_type) = &filter.job_type {
            binds.push(job_type);
            sql.push_str(&format!(" AND job_type ILIKE '%' || ${} || '%'", binds.len()));
        }
        if let Some(platform) = &filter.source_platform {
            binds.push(platform);
            sql.push_str(&format!(" AND source_platform = ${}", binds.len()));
        }
        sql.push_str(" ORDER BY created_at DESC, posted_date DESC");

        let mut query = sqlx::query(&sql);
        for bind in binds {
            query = query.bind(bind);
        }
        let rows = query.fetch_all(&self.pool).await?;
        rows.iter()
            .map(|row| row_to_stored(row).map_err(StoreError::from))
            .collect()
    }

    async fn list_unseen(&self) -> Result<Vec<StoredJobRecord>, StoreError> {
        let rows = sqlx::query(&format!(
            "SELECT {STORED_COLUMNS} FROM jobs WHERE unseen ORDER BY created_at DESC"
        ))
        .fetch_all(&self.pool)
        .await?;
        rows.iter()
            .map(|row| row_to_stored(row).map_err(StoreError::from))
            .collect()
    }

    async fn mark_all_seen(&self) -> Result<(), StoreError> {
        sqlx::query("UPDATE jobs SET unseen = FALSE, updated_at = NOW() WHERE unseen")
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn upsert_source_status(
        &self,
        platform: &str,
        status: SourceStatus,
    ) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO job_sources (platform_name, last_run, status)
            VALUES ($1, NOW(), $2)
            ON CONFLICT (platform_name)
            DO UPDATE SET last_run = NOW(), status = EXCLUDED.status
            "#,
        )
        .bind(platform)
        .bind(status.as_str())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn source_statuses(&self) -> Result<Vec<SourceRunStatus>, StoreError> {
        let rows = sqlx::query(
            "SELECT platform_name, last_run, status FROM job_sources ORDER BY platform_name",
        )
        .fetch_all(&self.pool)
        .await?;
        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            let status: String = row.try_get("status")?;
            out.push(SourceRunStatus {
                platform: row.try_get("platform_name")?,
                last_run: row.try_get("last_run")?,
                status: if status == "error" {
                    SourceStatus::Error
                } else {
                    SourceStatus::Active
                },
            });
        }
        Ok(out)
    }

    async fn append_notification_log(
        &self,
        job_id: Uuid,
        recipient: &str,
        subject: &str,
    ) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO notification_log (id, job_id, recipient, subject) VALUES ($1, $2, $3, $4)",
        )
        .bind(Uuid::new_v4())
        .bind(job_id)
        .bind(recipient)
        .bind(subject)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jobradar_core::RawPosting;

    fn record(url: &str, title: &str, company: &str) -> NormalizedJobRecord {
        NormalizedJobRecord::from_raw(
            RawPosting {
                title: title.to_string(),
                company: company.to_string(),
                url: url.to_string(),
                ..Default::default()
            },
            "LinkedIn",
        )
    }

    #[test]
    fn identity_hash_depends_only_on_url_title_company() {
        let mut a = record("https://example.com/1", "Engineer", "Acme");
        let mut b = record("https://example.com/1", "Engineer", "Acme");
        a.location = "Berlin".into();
        b.location = "Remote".into();
        b.source_platform = "Indeed".into();
        assert_eq!(identity_hash(&a), identity_hash(&b));

        let c = record("https://example.com/1", "Engineer", "Other Co");
        assert_ne!(identity_hash(&a), identity_hash(&c));
    }

    #[test]
    fn backoff_is_exponential_and_capped() {
        let policy = BackoffPolicy {
            max_attempts: 5,
            base_delay: Duration::from_millis(100),
            max_delay: Duration::from_millis(350),
        };
        assert_eq!(policy.delay_for_attempt(0), Duration::from_millis(100));
        assert_eq!(policy.delay_for_attempt(1), Duration::from_millis(200));
        assert_eq!(policy.delay_for_attempt(2), Duration::from_millis(350));
        assert_eq!(policy.delay_for_attempt(5), Duration::from_millis(350));
    }

    #[tokio::test]
    async fn pacer_enforces_minimum_gap() {
        let pacer = RequestPacer::new(Duration::from_millis(40));
        pacer.wait().await;
        let started = Instant::now();
        pacer.wait().await;
        assert!(started.elapsed() >= Duration::from_millis(35));
    }

    #[tokio::test]
    async fn duplicate_insert_collapses_to_one_record() {
        let store = MemoryJobStore::new();
        let first = store
            .insert_if_absent(record("https://example.com/1", "Engineer", "Acme"))
            .await
            .unwrap();
        assert!(first.is_some());
        let stored = first.unwrap();
        assert!(stored.unseen);

        let second = store
            .insert_if_absent(record("https://example.com/1", "Engineer", "Acme"))
            .await
            .unwrap();
        assert!(second.is_none());

        let all = store.list_all(&JobFilter::default()).await.unwrap();
        assert_eq!(all.len(), 1);
    }

    #[tokio::test]
    async fn mark_all_seen_then_later_inserts_stay_unseen() {
        let store = MemoryJobStore::new();
        store
            .insert_if_absent(record("https://example.com/1", "Engineer", "Acme"))
            .await
            .unwrap();
        store
            .insert_if_absent(record("https://example.com/2", "Analyst", "Acme"))
            .await
            .unwrap();
        assert_eq!(store.list_unseen().await.unwrap().len(), 2);

        store.mark_all_seen().await.unwrap();
        assert!(store.list_unseen().await.unwrap().is_empty());

        store
            .insert_if_absent(record("https://example.com/3", "Manager", "Acme"))
            .await
            .unwrap();
        let unseen = store.list_unseen().await.unwrap();
        assert_eq!(unseen.len(), 1);
        assert_eq!(unseen[0].record.title, "Manager");
    }

    #[tokio::test]
    async fn filters_are_substring_except_platform() {
        let store = MemoryJobStore::new();
        store
            .insert_if_absent(record("https://a.example/1", "Senior Python Developer", "Acme"))
            .await
            .unwrap();
        let mut other = record("https://b.example/2", "Java Engineer", "Globex");
        other.location = "Remote, EU".into();
        other.source_platform = "Indeed".into();
        store.insert_if_absent(other).await.unwrap();

        let by_search = store
            .list_all(&JobFilter {
                search: Some("python".into()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(by_search.len(), 1);
        assert_eq!(by_search[0].record.company, "Acme");

        let by_company = store
            .list_all(&JobFilter {
                search: Some("globex".into()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(by_company.len(), 1);

        let by_location = store
            .list_all(&JobFilter {
                location: Some("remote".into()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(by_location.len(), 1);

        let by_platform = store
            .list_all(&JobFilter {
                source_platform: Some("Indeed".into()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(by_platform.len(), 1);

        let exact_mismatch = store
            .list_all(&JobFilter {
                source_platform: Some("Inde".into()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert!(exact_mismatch.is_empty());
    }

    #[tokio::test]
    async fn source_status_upsert_overwrites_in_place() {
        let store = MemoryJobStore::new();
        store
            .upsert_source_status("LinkedIn", SourceStatus::Active)
            .await
            .unwrap();
        store
            .upsert_source_status("LinkedIn", SourceStatus::Error)
            .await
            .unwrap();
        store
            .upsert_source_status("Indeed", SourceStatus::Active)
            .await
            .unwrap();

        let statuses = store.source_statuses().await.unwrap();
        assert_eq!(statuses.len(), 2);
        let linkedin = statuses.iter().find(|s| s.platform == "LinkedIn").unwrap();
        assert_eq!(linkedin.status, SourceStatus::Error);
    }

    #[tokio::test]
    async fn notification_log_is_append_only() {
        let store = MemoryJobStore::new();
        let stored = store
            .insert_if_absent(record("https://example.com/1", "Engineer", "Acme"))
            .await
            .unwrap()
            .unwrap();

        store
            .append_notification_log(stored.id, "me@example.com", "Job Alert: 1 New Job(s) Found")
            .await
            .unwrap();
        store
            .append_notification_log(stored.id, "me@example.com", "Job Alert: 1 New Job(s) Found")
            .await
            .unwrap();

        let log = store.notification_log().await;
        assert_eq!(log.len(), 2);
        assert_eq!(log[0].job_id, stored.id);
        assert_eq!(log[0].recipient, "me@example.com");
    }
}
